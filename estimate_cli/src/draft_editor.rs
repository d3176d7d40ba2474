//! Line-oriented draft editor.
//!
//! Reads one command per line until the draft is saved or cancelled.
//! Item numbers are 1-based here and converted to positions for the core.
//! A mistyped command prints an error and the loop carries on; end of input
//! discards the draft.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use estimate_core::editor::EstimateEditor;
use estimate_core::errors::{EstimateError, EstimateResult};
use estimate_core::estimate::DraftField;
use estimate_core::line_item::LineItemField;
use estimate_core::pdf::DocumentRenderer;
use estimate_core::store::EstimateStore;
use estimate_core::totals::format_currency;

use crate::format;

const HELP: &str = "\
Commands:
  client <name>             set client name
  address <text>            set client address
  phone <text>              set client phone
  number <text>             set estimate number (empty = auto)
  date <YYYY-MM-DD>         set estimate date (DD/MM/YYYY also accepted)
  tax <percent>             set tax rate
  add                       add a line item (SQFT, zeroed)
  set <n> <field> <value>   change item n; fields: particulars, unit,
                            length_feet, length_inches, width_feet,
                            width_inches, quantity, rate
  del <n>                   delete item n
  show                      print the draft with totals
  save                      save and exit
  cancel                    discard and exit
  help                      show this help";

/// How an editing session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { id: String, number: String },
    Discarded,
}

enum Step {
    Continue,
    Done(Outcome),
}

/// Drive the active draft from `input` until save, cancel or end of input.
pub async fn run<S, R>(editor: &mut EstimateEditor<S, R>, input: impl BufRead) -> Result<Outcome>
where
    S: EstimateStore,
    R: DocumentRenderer,
{
    println!("Type 'help' for commands.");
    let mut lines = input.lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            editor.discard();
            println!();
            println!("End of input; draft discarded.");
            return Ok(Outcome::Discarded);
        };
        let line = line?;

        match execute(editor, line.trim()).await {
            Ok(Step::Continue) => {}
            Ok(Step::Done(outcome)) => return Ok(outcome),
            Err(error) => eprintln!("Error: {}", error),
        }
    }
}

async fn execute<S, R>(editor: &mut EstimateEditor<S, R>, line: &str) -> EstimateResult<Step>
where
    S: EstimateStore,
    R: DocumentRenderer,
{
    let (command, rest) = split_word(line);
    let symbol = editor.settings().currency_symbol.clone();

    match command {
        "" => {}
        "help" | "?" => println!("{}", HELP),
        "client" => set_field(editor, "client_name", rest)?,
        "address" => set_field(editor, "client_address", rest)?,
        "phone" => set_field(editor, "client_phone", rest)?,
        "number" => set_field(editor, "estimate_number", rest)?,
        "date" => set_field(editor, "date", rest)?,
        "tax" => set_field(editor, "tax_rate", rest)?,
        "add" => {
            let session = editor.session_mut();
            session.add_line_item()?;
            let count = session.draft().map_or(0, |d| d.item_count());
            println!("Added item {}", count);
        }
        "set" => {
            let (number, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            let index = item_index(number)?;
            let change = LineItemField::parse(field, value)?;
            let item = editor.session_mut().change_line_item(index, change)?;
            println!("{}", format::item_row(index + 1, item, &symbol));
        }
        "del" | "delete" => {
            let index = item_index(rest)?;
            let removed = editor.session_mut().delete_line_item(index)?;
            println!("Deleted item {} ({})", index + 1, removed.particulars());
        }
        "show" => {
            if let Some(draft) = editor.draft() {
                print!("{}", format::draft(draft, &symbol));
            }
            if let Ok(blockers) = editor.session().save_readiness() {
                for blocker in blockers {
                    println!("  cannot save yet: {}", blocker.describe());
                }
            }
        }
        "save" => {
            let saved = editor.save().await?;
            println!(
                "Saved estimate {} (total {})",
                saved.display_number(),
                format_currency(saved.totals.total_amount, &symbol)
            );
            println!("id: {}", saved.id);
            return Ok(Step::Done(Outcome::Saved {
                number: saved.display_number().to_string(),
                id: saved.id,
            }));
        }
        "cancel" | "quit" | "exit" => {
            editor.discard();
            println!("Draft discarded.");
            return Ok(Step::Done(Outcome::Discarded));
        }
        other => {
            return Err(EstimateError::invalid_input("command", other, "type 'help' for commands"));
        }
    }
    Ok(Step::Continue)
}

fn set_field<S, R>(editor: &mut EstimateEditor<S, R>, name: &str, raw: &str) -> EstimateResult<()>
where
    S: EstimateStore,
    R: DocumentRenderer,
{
    editor.session_mut().set_draft_field(DraftField::parse(name, raw)?)
}

/// `"3"` -> position 2
fn item_index(raw: &str) -> EstimateResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(EstimateError::invalid_input("item", raw, "item numbers start at 1")),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("client Asha Rao"), ("client", "Asha Rao"));
        assert_eq!(split_word("  show  "), ("show", ""));
        assert_eq!(split_word(""), ("", ""));
    }

    #[test]
    fn test_item_index_is_one_based() {
        assert_eq!(item_index("1").unwrap(), 0);
        assert_eq!(item_index("12").unwrap(), 11);
        assert!(item_index("0").is_err());
        assert!(item_index("first").is_err());
    }
}
