//! Command Classifier
//!
//! Splits a selection into an optional RP command token (`/me`, `/do`, ...),
//! its mode and the body that actually gets translated.
//!
//! Pure: the result depends on the text alone. Parenthesized spans inside a
//! dialogue body are left intact here; selections may contain unbalanced
//! parentheses, so parenthetical actions are handled by the dialogue prompt.

use crate::types::{Classification, Mode, ParsedSelection};

/// Classify a selection, flagging command tokens that carry no body
pub fn classify(text: &str) -> Classification {
    let parsed = parse_selection(text);
    if parsed.body.is_empty() {
        Classification::NothingToTranslate(parsed)
    } else {
        Classification::Translatable(parsed)
    }
}

/// Split a selection into command token, mode and body
pub fn parse_selection(text: &str) -> ParsedSelection {
    let text = text.trim();

    let (first_word, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], Some(&text[idx..])),
        None => (text, None),
    };

    if is_command_token(first_word) {
        return ParsedSelection {
            command_token: Some(first_word.to_string()),
            mode: Mode::from_command(first_word),
            body: rest.map(str::trim).unwrap_or_default().to_string(),
        };
    }

    ParsedSelection {
        command_token: None,
        mode: Mode::Dialogue,
        body: text.to_string(),
    }
}

/// `/` followed by a letter, e.g. `/me` or `/shout`
fn is_command_token(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next() == Some('/') && chars.next().is_some_and(char::is_alphabetic)
}
