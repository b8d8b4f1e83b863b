//! Glyph recipes: a base character plus layered runs of combining marks.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::marks::is_combining;
use crate::GlyphError;

/// Upper bound on marks stacked onto a single base.
pub const MAX_MARKS: usize = 4096;

/// A run of marks repeated as a whole: `[a, b] x 2` yields `a b a b`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Layer {
    #[serde(deserialize_with = "deserialize_marks")]
    pub marks: Vec<char>,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

impl Layer {
    pub fn new(marks: impl IntoIterator<Item = char>, repeat: usize) -> Self {
        Self {
            marks: marks.into_iter().collect(),
            repeat,
        }
    }

    /// A single mark repeated `repeat` times.
    pub fn single(mark: char, repeat: usize) -> Self {
        Self::new([mark], repeat)
    }

    pub fn mark_count(&self) -> usize {
        self.marks.len().saturating_mul(self.repeat)
    }

    fn expand(&self) -> impl Iterator<Item = char> + '_ {
        (0..self.repeat).flat_map(move |_| self.marks.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlyphRecipe {
    #[serde(deserialize_with = "deserialize_codepoint")]
    pub base: char,
    /// Enclosing marks, applied first.
    #[serde(default)]
    pub side_wall: Vec<Layer>,
    #[serde(default)]
    pub up_stack: Vec<Layer>,
    #[serde(default)]
    pub down_stack: Vec<Layer>,
}

impl GlyphRecipe {
    pub fn new(base: char) -> Self {
        Self {
            base,
            side_wall: Vec::new(),
            up_stack: Vec::new(),
            down_stack: Vec::new(),
        }
    }

    pub fn with_side_wall(mut self, layers: Vec<Layer>) -> Self {
        self.side_wall = layers;
        self
    }

    pub fn with_up_stack(mut self, layers: Vec<Layer>) -> Self {
        self.up_stack = layers;
        self
    }

    pub fn with_down_stack(mut self, layers: Vec<Layer>) -> Self {
        self.down_stack = layers;
        self
    }

    pub fn with_base(mut self, base: char) -> Self {
        self.base = base;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, GlyphError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, GlyphError> {
        let contents = std::fs::read_to_string(path).map_err(|source| GlyphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.side_wall
            .iter()
            .chain(self.up_stack.iter())
            .chain(self.down_stack.iter())
    }

    /// Total number of marks appended to the base.
    pub fn mark_count(&self) -> usize {
        self.layers()
            .map(Layer::mark_count)
            .fold(0, usize::saturating_add)
    }

    /// Check the marks without building anything. The base is not checked;
    /// `apply_to` ignores it.
    fn validate_marks(&self) -> Result<(), GlyphError> {
        let count = self.mark_count();
        if count > MAX_MARKS {
            return Err(GlyphError::TooManyMarks {
                count,
                limit: MAX_MARKS,
            });
        }

        // Position is reported in the flattened sequence, so account for
        // repeats of the layers before the offending one.
        let mut position = 0;
        for layer in self.layers() {
            if layer.repeat > 0 {
                if let Some(i) = layer.marks.iter().position(|&c| !is_combining(c)) {
                    return Err(GlyphError::NotCombining {
                        ch: layer.marks[i],
                        position: position + i,
                    });
                }
            }
            position += layer.mark_count();
        }
        Ok(())
    }

    /// The marks alone, in stacking order.
    pub fn marks(&self) -> Result<String, GlyphError> {
        self.validate_marks()?;
        Ok(self.layers().flat_map(|l| l.expand()).collect())
    }

    /// Build the stacked glyph: base, side wall, up stack, down stack.
    pub fn build(&self) -> Result<String, GlyphError> {
        if is_combining(self.base) {
            return Err(GlyphError::BaseIsCombining(self.base));
        }
        let marks = self.marks()?;
        let mut out = String::with_capacity(self.base.len_utf8() + marks.len());
        out.push(self.base);
        out.push_str(&marks);
        Ok(out)
    }

    /// Stack this recipe's marks onto every non-whitespace character of
    /// `text`. Marks already present in `text` follow the new ones.
    pub fn apply_to(&self, text: &str) -> Result<String, GlyphError> {
        let marks = self.marks()?;
        let mut out = String::with_capacity(text.len().saturating_mul(1 + marks.len()));
        for c in text.chars() {
            out.push(c);
            if !c.is_whitespace() && !is_combining(c) {
                out.push_str(&marks);
            }
        }
        Ok(out)
    }
}

/// Parse a codepoint written as a literal character, `U+XXXX` or `0xXXXX`.
pub fn parse_codepoint(s: &str) -> Result<char, GlyphError> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(c);
    }

    let hex = s
        .strip_prefix("U+")
        .or_else(|| s.strip_prefix("u+"))
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| GlyphError::InvalidCodepoint(s.to_string()))?;

    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(GlyphError::InvalidCodepoint(s.to_string()));
    }
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| GlyphError::InvalidCodepoint(s.to_string()))
}

/// Expand one `marks` entry: a codepoint notation yields one char, any other
/// string contributes each of its characters.
fn parse_mark_entry(entry: &str) -> Result<Vec<char>, GlyphError> {
    let is_notation = ["U+", "u+", "0x", "0X"]
        .iter()
        .any(|p| entry.starts_with(p) && entry.len() > p.len());
    if is_notation {
        Ok(vec![parse_codepoint(entry)?])
    } else {
        Ok(entry.chars().collect())
    }
}

fn deserialize_codepoint<'de, D: Deserializer<'de>>(d: D) -> Result<char, D::Error> {
    let s = String::deserialize(d)?;
    parse_codepoint(&s).map_err(serde::de::Error::custom)
}

fn deserialize_marks<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<char>, D::Error> {
    let entries = Vec::<String>::deserialize(d)?;
    let mut marks = Vec::new();
    for entry in &entries {
        marks.extend(parse_mark_entry(entry).map_err(serde::de::Error::custom)?);
    }
    Ok(marks)
}
