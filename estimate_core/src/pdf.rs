//! # Estimate Documents
//!
//! Turns a persisted estimate into a printable PDF.
//!
//! ## Architecture
//!
//! - [`DocumentRenderer`] is the rendering collaborator seen by the editor
//! - [`TypstRenderer`] renders locally: the Typst template is an embedded
//!   string constant, data is injected by placeholder replacement, output is
//!   raw PDF bytes
//! - [`crate::store::HttpStore`] renders remotely through the estimate API
//!
//! ## Example
//!
//! ```rust,no_run
//! use estimate_core::pdf::{document_file_name, TypstRenderer};
//! use estimate_core::settings::EstimateSettings;
//! # fn run(estimate: &estimate_core::estimate::PersistedEstimate) -> estimate_core::errors::EstimateResult<()> {
//! let renderer = TypstRenderer::new(EstimateSettings::default());
//! let bytes = renderer.render_pdf(estimate)?;
//! std::fs::write(document_file_name(estimate), bytes).unwrap();
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use chrono::Utc;
use rust_decimal::Decimal;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::PersistedEstimate;
use crate::line_item::{LineItem, Unit};
use crate::settings::EstimateSettings;
use crate::totals::{format_currency, format_quantity};

/// Produces a document for a persisted estimate.
pub trait DocumentRenderer {
    /// PDF bytes for `estimate`
    fn render(&self, estimate: &PersistedEstimate) -> impl Future<Output = EstimateResult<Vec<u8>>> + Send;
}

/// `Estimate_{number}.pdf`, or `Estimate_{id}.pdf` when the estimate has no
/// number. Characters that are unsafe in file names become `_`.
pub fn document_file_name(estimate: &PersistedEstimate) -> String {
    let stem: String = estimate
        .display_number()
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Estimate_{}.pdf", stem)
}

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A minimal Typst world for compiling documents without external files.
struct PdfWorld {
    main: Source,
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
    library: LazyHash<Library>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        let fonts = Self::load_fonts();
        let book = FontBook::from_fonts(&fonts);

        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(book),
            fonts,
            library: LazyHash::new(Library::default()),
        }
    }

    /// Fonts bundled with typst-assets
    fn load_fonts() -> Vec<Font> {
        typst_assets::fonts()
            .flat_map(|font_bytes| Font::iter(Bytes::new(font_bytes.to_vec())))
            .collect()
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// Template
// ============================================================================

const ESTIMATE_TEMPLATE: &str = r##"
#set page(paper: "a4", margin: (top: 0.6in, bottom: 0.6in, left: 0.6in, right: 0.6in))
#set text(size: 10pt)

#align(center)[
  #text(size: 24pt, weight: "bold", fill: rgb("#1e3a5f"))[{{COMPANY_NAME}}]
  #v(2pt)
  #text(size: 11pt, fill: rgb("#666666"))[{{COMPANY_TAGLINE}}]
  #v(2pt)
  #text(size: 9pt, fill: rgb("#666666"))[{{COMPANY_CONTACT}}]
]

#v(16pt)

#table(
  columns: (auto, 1fr, auto, 1fr),
  stroke: none,
  inset: 4pt,
  [*Estimate No:*], [{{NUMBER}}], [*Date:*], [{{DATE}}],
  [*Client Name:*], [{{CLIENT_NAME}}], [], [],
  [*Address:*], [{{CLIENT_ADDRESS}}], [], [],
  [*Phone:*], [{{CLIENT_PHONE}}], [], [],
)

#v(12pt)

#table(
  columns: (0.5in, 1fr, 0.8in, 0.6in, 1in, 1.2in),
  inset: 6pt,
  stroke: 0.5pt + rgb("#cccccc"),
  align: (center, left, right, center, right, right),
  fill: (_, row) => if row == 0 { rgb("#1e3a5f") },
  table.header(
    text(fill: white, weight: "bold")[Sn],
    text(fill: white, weight: "bold")[Particulars],
    text(fill: white, weight: "bold")[Qty],
    text(fill: white, weight: "bold")[Unit],
    text(fill: white, weight: "bold")[Rate ({{CURRENCY}})],
    text(fill: white, weight: "bold")[Amount ({{CURRENCY}})],
  ),
{{ITEM_ROWS}}
)

#v(12pt)

#align(right)[
  #table(
    columns: (1.5in, 1.5in),
    inset: 6pt,
    stroke: none,
    align: (right, right),
    [*Subtotal:*], [{{SUBTOTAL}}],
    [*Tax ({{TAX_RATE}}%):*], [{{TAX_AMOUNT}}],
    table.hline(stroke: 1pt),
    [#text(size: 12pt, weight: "bold")[Total:]], [#text(size: 12pt, weight: "bold")[{{TOTAL}}]],
  )
]

#v(24pt)

#align(center)[
  #text(size: 9pt, fill: rgb("#666666"))[
    Thank you for choosing {{COMPANY_DISPLAY}}!
    #linebreak()
    This estimate is valid for {{VALIDITY_DAYS}} days.
  ]
]
"##;

/// Local PDF renderer built on Typst.
#[derive(Debug, Clone, Default)]
pub struct TypstRenderer {
    settings: EstimateSettings,
}

impl TypstRenderer {
    pub fn new(settings: EstimateSettings) -> Self {
        TypstRenderer { settings }
    }

    /// The Typst markup for `estimate`, before compilation.
    pub fn document_source(&self, estimate: &PersistedEstimate) -> String {
        let symbol = &self.settings.currency_symbol;
        let company = &self.settings.company;
        let draft = &estimate.draft;
        let money = |value: Decimal| escape_typst(&format_currency(value, symbol));

        let values = [
            ("COMPANY_NAME", escape_typst(&company.name)),
            ("COMPANY_TAGLINE", escape_typst(&company.tagline)),
            ("COMPANY_CONTACT", escape_typst(&company.contact)),
            ("COMPANY_DISPLAY", escape_typst(&title_case(&company.name))),
            ("NUMBER", escape_typst(estimate.display_number())),
            ("DATE", draft.date.format("%Y-%m-%d").to_string()),
            ("CLIENT_NAME", escape_typst(&draft.client_name)),
            ("CLIENT_ADDRESS", escape_typst(&draft.client_address)),
            ("CLIENT_PHONE", escape_typst(&draft.client_phone)),
            ("CURRENCY", escape_typst(symbol.trim())),
            ("ITEM_ROWS", build_item_rows(draft.line_items(), symbol)),
            ("SUBTOTAL", money(estimate.totals.subtotal)),
            ("TAX_RATE", draft.tax_rate.normalize().to_string()),
            ("TAX_AMOUNT", money(estimate.totals.tax_amount)),
            ("TOTAL", money(estimate.totals.total_amount)),
            ("VALIDITY_DAYS", self.settings.validity_days.to_string()),
        ];
        fill_template(ESTIMATE_TEMPLATE, &values)
    }

    /// Compile `estimate` to PDF bytes.
    pub fn render_pdf(&self, estimate: &PersistedEstimate) -> EstimateResult<Vec<u8>> {
        let world = PdfWorld::new(self.document_source(estimate));

        let warned = typst::compile(&world);

        let document = warned.output.map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            EstimateError::render_failed(format!("Typst compilation failed: {}", error_msgs.join("; ")))
        })?;

        typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            EstimateError::render_failed(format!("PDF rendering failed: {}", error_msgs.join("; ")))
        })
    }
}

impl DocumentRenderer for TypstRenderer {
    async fn render(&self, estimate: &PersistedEstimate) -> EstimateResult<Vec<u8>> {
        self.render_pdf(estimate)
    }
}

/// Quantity shown on the document. Measured area items show the area
/// re-resolved from their dimensions; everything else shows the stored
/// quantity.
fn printed_quantity(item: &LineItem) -> Decimal {
    if item.unit() == Unit::Area && item.length().feet > 0 {
        item.length().area_with(item.width())
    } else {
        item.quantity()
    }
}

fn build_item_rows(items: &[LineItem], symbol: &str) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "  [{}], [{}], [{}], [{}], [{}], [{}],",
                i + 1,
                escape_typst(item.particulars()),
                format_quantity(printed_quantity(item)),
                item.unit().label(),
                escape_typst(&format_currency(item.rate(), symbol)),
                escape_typst(&format_currency(item.amount(), symbol)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HAVN CUBE` -> `Havn Cube`
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Replace every `{{NAME}}` in `template` with its value in one pass.
///
/// Substituted text is never scanned again, so user input that looks like a
/// placeholder is printed as typed. Unknown placeholders are left in place.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Escape special characters for Typst markup
fn escape_typst(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            '=' => "\\=".to_string(),
            '~' => "\\~".to_string(),
            '/' => "\\/".to_string(),
            '-' => "\\-".to_string(),
            '+' => "\\+".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            '\n' => " #linebreak() ".to_string(),
            _ => c.to_string(),
        })
        .collect()
}
