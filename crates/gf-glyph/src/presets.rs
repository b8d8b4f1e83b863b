//! Built-in recipes.

use crate::recipe::{GlyphRecipe, Layer};
use crate::GlyphError;

/// Thai ko kai: tall enough that both stacks stay legible.
const KO_KAI: char = '\u{0E01}';
const MAI_TAIKHU: char = '\u{0E47}';
const SARA_U: char = '\u{0E38}';

const ENCLOSING_CIRCLE: char = '\u{20DD}';
const ENCLOSING_SQUARE: char = '\u{20DE}';
const ENCLOSING_DIAMOND: char = '\u{20DF}';

/// Macron, overline, vertical line, perispomeni, zigzag, fermata.
const LATIN_ABOVE: [char; 6] = [
    '\u{0304}', '\u{0305}', '\u{030D}', '\u{0342}', '\u{035B}', '\u{0352}',
];
/// Acute, grave, minus, vertical line, bridge, tilde; all below.
const LATIN_BELOW: [char; 6] = [
    '\u{0317}', '\u{0316}', '\u{0320}', '\u{0329}', '\u{032A}', '\u{0330}',
];

const NAMES: [&str; 5] = ["monster", "tower", "abyss", "boxed", "whisper"];

fn walls() -> Vec<Layer> {
    vec![
        Layer::single(ENCLOSING_CIRCLE, 5),
        Layer::single(ENCLOSING_SQUARE, 5),
        Layer::single(ENCLOSING_DIAMOND, 5),
    ]
}

fn upward() -> Vec<Layer> {
    vec![Layer::single(MAI_TAIKHU, 10), Layer::new(LATIN_ABOVE, 3)]
}

fn downward() -> Vec<Layer> {
    vec![Layer::single(SARA_U, 5), Layer::new(LATIN_BELOW, 2)]
}

/// Walls, a tall upward stack, and a shorter downward support: 60 marks.
pub fn monster() -> GlyphRecipe {
    GlyphRecipe::new(KO_KAI)
        .with_side_wall(walls())
        .with_up_stack(upward())
        .with_down_stack(downward())
}

pub fn tower() -> GlyphRecipe {
    GlyphRecipe::new(KO_KAI).with_up_stack(upward())
}

pub fn abyss() -> GlyphRecipe {
    GlyphRecipe::new(KO_KAI).with_down_stack(downward())
}

pub fn boxed() -> GlyphRecipe {
    GlyphRecipe::new(KO_KAI).with_side_wall(walls())
}

/// One mark from each group.
pub fn whisper() -> GlyphRecipe {
    GlyphRecipe::new(KO_KAI)
        .with_side_wall(vec![Layer::single(ENCLOSING_CIRCLE, 1)])
        .with_up_stack(vec![Layer::single(MAI_TAIKHU, 1)])
        .with_down_stack(vec![Layer::single(SARA_U, 1)])
}

pub fn names() -> &'static [&'static str] {
    &NAMES
}

pub fn by_name(name: &str) -> Result<GlyphRecipe, GlyphError> {
    match name {
        "monster" => Ok(monster()),
        "tower" => Ok(tower()),
        "abyss" => Ok(abyss()),
        "boxed" => Ok(boxed()),
        "whisper" => Ok(whisper()),
        _ => Err(GlyphError::UnknownPreset(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::{classify, MarkClass};

    #[test]
    fn monster_mark_count() {
        let recipe = monster();
        assert_eq!(recipe.mark_count(), 60);
        assert_eq!(recipe.build().unwrap().chars().count(), 61);
    }

    #[test]
    fn monster_groups_have_expected_classes() {
        let recipe = monster();
        for layer in &recipe.side_wall {
            assert!(layer.marks.iter().all(|&c| classify(c) == Some(MarkClass::Enclosing)));
        }
        for layer in &recipe.up_stack {
            assert!(layer.marks.iter().all(|&c| classify(c) == Some(MarkClass::Above)));
        }
        for layer in &recipe.down_stack {
            assert!(layer.marks.iter().all(|&c| classify(c) == Some(MarkClass::Below)));
        }
    }

    #[test]
    fn every_name_resolves_and_builds() {
        for name in names() {
            let recipe = by_name(name).unwrap();
            assert!(recipe.build().is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_preset() {
        let err = by_name("kraken").unwrap_err();
        assert!(matches!(err, GlyphError::UnknownPreset(ref n) if n == "kraken"));
        let msg = err.to_string();
        for name in names() {
            assert!(msg.contains(name), "{msg}");
        }
        assert!(msg.contains("stack --list"));
    }

    #[test]
    fn whisper_is_three_marks() {
        assert_eq!(
            whisper().build().unwrap(),
            "\u{0E01}\u{20DD}\u{0E47}\u{0E38}"
        );
    }
}
