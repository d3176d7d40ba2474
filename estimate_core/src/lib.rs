//! # estimate_core - Interior Design Estimate Engine
//!
//! `estimate_core` computes and edits priced estimates for interior design
//! work: line items measured in feet and inches or counted in pieces,
//! aggregated into subtotal, tax and total, edited as a draft and persisted
//! through a storage collaborator. All data types are JSON-serializable in
//! the shape of the estimate REST API.
//!
//! ## Design Philosophy
//!
//! - **Exact money**: every quantity and amount is a `rust_decimal::Decimal`
//! - **Derived, never stored**: quantities, amounts and totals are recomputed
//!   from their inputs on every change
//! - **Lenient input**: garbled numbers become zero instead of errors
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use estimate_core::line_item::LineItemField;
//! use estimate_core::session::EstimateSession;
//! use rust_decimal::Decimal;
//!
//! let mut session = EstimateSession::default();
//! session.open_new(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
//! session.add_line_item().unwrap();
//! session.change_line_item(0, LineItemField::LengthFeet(10)).unwrap();
//! session.change_line_item(0, LineItemField::LengthInches(6)).unwrap();
//! session.change_line_item(0, LineItemField::WidthFeet(8)).unwrap();
//! session.change_line_item(0, LineItemField::Rate(Decimal::from(50))).unwrap();
//!
//! let totals = session.totals().unwrap();
//! assert_eq!(totals.subtotal, Decimal::from(4200));
//! assert_eq!(totals.total_amount, Decimal::from(4956));
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Feet+inches resolution to lengths and areas
//! - [`line_item`] - Line items and their derived quantity and amount
//! - [`totals`] - Subtotal, tax and total; money formatting
//! - [`estimate`] - Draft, payload and persisted estimate types
//! - [`session`] - Draft lifecycle (new, edit, save, discard)
//! - [`editor`] - Session plus storage and rendering collaborators
//! - [`store`] - Storage backends (memory, JSON file, REST API)
//! - [`pdf`] - Estimate documents
//! - [`settings`] - Business defaults loaded from TOML
//! - [`errors`] - Structured error types

pub mod editor;
pub mod errors;
pub mod estimate;
pub mod line_item;
pub mod pdf;
pub mod session;
pub mod settings;
pub mod store;
pub mod totals;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use editor::{DeleteConfirmation, EstimateEditor, RenderedDocument};
pub use errors::{EstimateError, EstimateResult, SaveBlocker};
pub use estimate::{DraftField, EstimateDraft, EstimatePayload, PersistedEstimate};
pub use line_item::{ItemKey, LineItem, LineItemField, Unit};
pub use pdf::{DocumentRenderer, TypstRenderer};
pub use session::{EstimateSession, SaveRequest, SaveTarget};
pub use settings::EstimateSettings;
pub use store::{EstimateStore, HttpStore, MemoryStore};
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileStore;
pub use totals::{compute_totals, EstimateTotals};
