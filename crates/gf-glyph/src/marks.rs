//! Combining-mark classification.
//!
//! Placement follows the canonical combining class where the block assigns
//! one (220/202 below, 230 above, 1 overlay). The extended blocks are
//! covered at range granularity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a combining mark renders relative to its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkClass {
    /// Surrounds the base (circle, square, diamond...).
    Enclosing,
    Above,
    Below,
    /// Drawn through the base, or invisible joiners.
    Overlay,
}

impl MarkClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkClass::Enclosing => "enclosing",
            MarkClass::Above => "above",
            MarkClass::Below => "below",
            MarkClass::Overlay => "overlay",
        }
    }
}

impl fmt::Display for MarkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use self::MarkClass::{Above as A, Below as B, Enclosing as E, Overlay as O};

/// Inclusive codepoint ranges, sorted and non-overlapping.
const MARK_RANGES: &[(u32, u32, MarkClass)] = &[
    // Combining Diacritical Marks
    (0x0300, 0x0315, A),
    (0x0316, 0x0319, B),
    (0x031A, 0x031B, A),
    (0x031C, 0x0333, B),
    (0x0334, 0x0338, O),
    (0x0339, 0x033C, B),
    (0x033D, 0x0344, A),
    (0x0345, 0x0345, B),
    (0x0346, 0x0346, A),
    (0x0347, 0x0349, B),
    (0x034A, 0x034C, A),
    (0x034D, 0x034E, B),
    (0x034F, 0x034F, O),
    (0x0350, 0x0352, A),
    (0x0353, 0x0356, B),
    (0x0357, 0x0358, A),
    (0x0359, 0x035A, B),
    (0x035B, 0x035B, A),
    (0x035C, 0x035C, B),
    (0x035D, 0x035E, A),
    (0x035F, 0x035F, B),
    (0x0360, 0x0361, A),
    (0x0362, 0x0362, B),
    (0x0363, 0x036F, A),
    // Cyrillic
    (0x0483, 0x0487, A),
    (0x0488, 0x0489, E),
    // Thai
    (0x0E31, 0x0E31, A),
    (0x0E34, 0x0E37, A),
    (0x0E38, 0x0E3A, B),
    (0x0E47, 0x0E4E, A),
    // Combining Diacritical Marks Extended
    (0x1AB0, 0x1AB4, A),
    (0x1AB5, 0x1ABA, B),
    (0x1ABB, 0x1ABC, A),
    (0x1ABD, 0x1ABD, B),
    (0x1ABE, 0x1ABE, E),
    (0x1ABF, 0x1AC0, B),
    (0x1AC1, 0x1AC2, A),
    (0x1AC3, 0x1AC4, B),
    (0x1AC5, 0x1AC9, A),
    (0x1ACA, 0x1ACA, B),
    (0x1ACB, 0x1ACE, A),
    // Combining Diacritical Marks Supplement
    (0x1DC0, 0x1DC1, A),
    (0x1DC2, 0x1DC2, B),
    (0x1DC3, 0x1DC9, A),
    (0x1DCA, 0x1DCA, B),
    (0x1DCB, 0x1DCE, A),
    (0x1DCF, 0x1DCF, B),
    (0x1DD0, 0x1DD0, B),
    (0x1DD1, 0x1DF8, A),
    (0x1DF9, 0x1DFA, B),
    (0x1DFB, 0x1DFB, A),
    (0x1DFC, 0x1DFC, B),
    (0x1DFD, 0x1DFD, B),
    (0x1DFE, 0x1DFE, A),
    (0x1DFF, 0x1DFF, B),
    // Combining Diacritical Marks for Symbols
    (0x20D0, 0x20D1, A),
    (0x20D2, 0x20D3, O),
    (0x20D4, 0x20D7, A),
    (0x20D8, 0x20DA, O),
    (0x20DB, 0x20DC, A),
    (0x20DD, 0x20E0, E),
    (0x20E1, 0x20E1, A),
    (0x20E2, 0x20E4, E),
    (0x20E5, 0x20E6, O),
    (0x20E7, 0x20E7, A),
    (0x20E8, 0x20E8, B),
    (0x20E9, 0x20E9, A),
    (0x20EA, 0x20EB, O),
    (0x20EC, 0x20EF, B),
    (0x20F0, 0x20F0, A),
    // Combining Half Marks
    (0xFE20, 0xFE26, A),
    (0xFE27, 0xFE2D, B),
    (0xFE2E, 0xFE2F, A),
];

/// Classify `ch` as a combining mark, or `None` if it is not one we know.
pub fn classify(ch: char) -> Option<MarkClass> {
    let cp = ch as u32;
    MARK_RANGES
        .binary_search_by(|&(lo, hi, _)| {
            if hi < cp {
                std::cmp::Ordering::Less
            } else if lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok()
        .map(|i| MARK_RANGES[i].2)
}

pub fn is_combining(ch: char) -> bool {
    classify(ch).is_some()
}

/// Remove every recognised combining mark from `text`.
pub fn strip_marks(text: &str) -> String {
    text.chars().filter(|&c| !is_combining(c)).collect()
}
