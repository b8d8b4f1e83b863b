//! Stacked glyphs built from Unicode combining marks.
//!
//! A [`GlyphRecipe`] names a base character and three groups of mark layers.
//! Building it appends the groups in a fixed order (enclosing "walls", then
//! marks above, then marks below) so the result renders as one tall grapheme.
//!
//! ```
//! use gf_glyph::presets;
//!
//! let glyph = presets::monster().build().unwrap();
//! assert_eq!(gf_glyph::strip_marks(&glyph), "\u{0E01}");
//! ```

pub mod marks;
pub mod presets;
pub mod recipe;

pub use marks::{classify, is_combining, strip_marks, MarkClass};
pub use recipe::{parse_codepoint, GlyphRecipe, Layer, MAX_MARKS};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlyphError {
    #[error("{} at position {position} is not a combining mark", code_of(.ch))]
    NotCombining { ch: char, position: usize },
    #[error("base {} is itself a combining mark", code_of(.0))]
    BaseIsCombining(char),
    #[error("recipe stacks {count} marks (limit {limit})")]
    TooManyMarks { count: usize, limit: usize },
    #[error("invalid codepoint '{0}' (expected a character, U+XXXX or 0xXXXX)")]
    InvalidCodepoint(String),
    #[error(
        "unknown preset '{0}' (built-in: {builtin}; `stack --list` also shows custom recipes)",
        builtin = presets::names().join(", ")
    )]
    UnknownPreset(String),
    #[error("invalid recipe: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn code_of(ch: &char) -> String {
    CodepointInfo::new(*ch).code()
}

/// One character of a string, annotated for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodepointInfo {
    pub ch: char,
    pub class: Option<MarkClass>,
}

impl CodepointInfo {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            class: classify(ch),
        }
    }

    /// `U+XXXX` notation, at least four hex digits.
    pub fn code(&self) -> String {
        format!("U+{:04X}", self.ch as u32)
    }

    /// The character as it can be shown on its own. Marks are drawn on a
    /// dotted circle so they have something to attach to.
    pub fn display_char(&self) -> String {
        match self.class {
            Some(_) => format!("\u{25CC}{}", self.ch),
            None => self.ch.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.class.map(|c| c.as_str()).unwrap_or("base")
    }
}

impl fmt::Display for CodepointInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}", self.code(), self.display_char(), self.label())
    }
}

/// Annotate every character of `text`.
pub fn explain(text: &str) -> Vec<CodepointInfo> {
    text.chars().map(CodepointInfo::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explain_labels_each_char() {
        let info = explain("a\u{0301}");
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].label(), "base");
        assert_eq!(info[1].class, Some(MarkClass::Above));
        assert_eq!(info[1].code(), "U+0301");
    }

    #[test]
    fn codepoint_display_line() {
        assert_eq!(CodepointInfo::new('\u{0E01}').to_string(), "U+0E01  \u{0E01}  base");
        assert_eq!(
            CodepointInfo::new('\u{0E38}').to_string(),
            "U+0E38  \u{25CC}\u{0E38}  below"
        );
    }

    #[test]
    fn code_pads_and_widens() {
        assert_eq!(CodepointInfo::new('a').code(), "U+0061");
        assert_eq!(CodepointInfo::new('🍌').code(), "U+1F34C");
    }

    #[test]
    fn error_messages_use_codepoint_notation() {
        let err = GlyphError::NotCombining {
            ch: 'z',
            position: 3,
        };
        assert_eq!(err.to_string(), "U+007A at position 3 is not a combining mark");
        let err = GlyphError::BaseIsCombining('\u{0301}');
        assert_eq!(err.to_string(), "base U+0301 is itself a combining mark");
    }
}
