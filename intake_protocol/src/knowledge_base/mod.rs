//! Knowledge Base module - the static emergency guidance table.
//!
//! The knowledge base consists of:
//! - **Categories**: case-folded keys naming a known emergency
//! - **Entries**: a category, its alias match terms and its canonical guidance
//! - **Lookup**: read-only, insertion-ordered access used by the classifier

mod category;
mod table;

pub use category::*;
pub use table::*;

/// Fold text for case-insensitive matching.
///
/// Lowercases and maps typographic apostrophes to `'` so "Can’t" matches "can't".
pub fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}
