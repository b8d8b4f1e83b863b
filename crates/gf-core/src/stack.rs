//! The `stack` command: build, explain, strip and list glyphs offline.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use gf_glyph::{explain, parse_codepoint, presets, strip_marks, GlyphError, GlyphRecipe};
use thiserror::Error;

use crate::config::GlyphConfig;

#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Glyph(#[from] GlyphError),
    #[error("cannot read stdin: {0}")]
    Stdin(#[from] io::Error),
    #[error("--strip needs text: pass --text or pipe it on stdin")]
    NothingToStrip,
}

#[derive(Debug, Clone, Default)]
pub struct StackOptions {
    pub preset: Option<String>,
    pub recipe: Option<PathBuf>,
    pub base: Option<String>,
    pub text: Option<String>,
    pub explain: bool,
    pub strip: bool,
    pub list: bool,
}

/// Produce the text `stack` prints, without the trailing newline.
pub fn render(
    opts: &StackOptions,
    config: &GlyphConfig,
    stdin: &mut impl Read,
) -> Result<String, StackError> {
    if opts.list {
        return Ok(list_recipes(&config.resolve_recipes_dir()).join("\n"));
    }

    if opts.strip {
        let text = match &opts.text {
            Some(t) => t.clone(),
            None => {
                let mut buf = String::new();
                stdin.read_to_string(&mut buf)?;
                buf.trim_end_matches(['\r', '\n']).to_string()
            }
        };
        if text.is_empty() {
            return Err(StackError::NothingToStrip);
        }
        return Ok(strip_marks(&text));
    }

    let recipe = resolve_recipe(opts, config)?;
    let glyph = match &opts.text {
        Some(text) => recipe.apply_to(text)?,
        None => recipe.build()?,
    };

    if opts.explain {
        let lines: Vec<String> = explain(&glyph).iter().map(ToString::to_string).collect();
        return Ok(lines.join("\n"));
    }
    Ok(glyph)
}

/// `--recipe` file, else `<recipes_dir>/<name>.toml`, else a built-in preset.
/// `--base` is applied last.
pub fn resolve_recipe(opts: &StackOptions, config: &GlyphConfig) -> Result<GlyphRecipe, GlyphError> {
    let recipe = match &opts.recipe {
        Some(path) => GlyphRecipe::load(path)?,
        None => {
            let name = opts.preset.as_deref().unwrap_or(&config.default_preset);
            let custom = config.resolve_recipes_dir().join(format!("{name}.toml"));
            if custom.is_file() {
                tracing::debug!(path = %custom.display(), "using custom recipe");
                GlyphRecipe::load(&custom)?
            } else {
                presets::by_name(name)?
            }
        }
    };

    match &opts.base {
        Some(base) => Ok(recipe.with_base(parse_codepoint(base)?)),
        None => Ok(recipe),
    }
}

/// Built-in preset names followed by custom recipes found in `dir`.
fn list_recipes(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = presets::names().iter().map(|n| n.to_string()).collect();

    let mut custom: Vec<String> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|e| e == "toml"))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .filter(|name| !names.contains(name))
        .collect();
    custom.sort();

    names.extend(custom.into_iter().map(|n| format!("{n} (custom)")));
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> GlyphConfig {
        GlyphConfig {
            recipes_dir: Some(dir.to_string_lossy().into_owned()),
            ..GlyphConfig::default()
        }
    }

    fn render_with(opts: StackOptions, config: &GlyphConfig) -> Result<String, StackError> {
        render(&opts, config, &mut io::empty())
    }

    #[test]
    fn default_is_monster() {
        let dir = tempfile::tempdir().unwrap();
        let out = render_with(StackOptions::default(), &config_in(dir.path())).unwrap();
        assert_eq!(out, presets::monster().build().unwrap());
    }

    #[test]
    fn default_preset_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = GlyphConfig {
            default_preset: "whisper".to_string(),
            ..config_in(dir.path())
        };
        let out = render_with(StackOptions::default(), &config).unwrap();
        assert_eq!(out, "\u{0E01}\u{20DD}\u{0E47}\u{0E38}");
    }

    #[test]
    fn custom_recipe_shadows_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tower.toml"),
            "base = \"T\"\n[[up_stack]]\nmarks = [\"U+0301\"]\nrepeat = 2\n",
        )
        .unwrap();
        let opts = StackOptions {
            preset: Some("tower".to_string()),
            ..Default::default()
        };
        assert_eq!(
            render_with(opts, &config_in(dir.path())).unwrap(),
            "T\u{0301}\u{0301}"
        );
    }

    #[test]
    fn recipe_file_and_base_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mine.toml");
        std::fs::write(&path, "base = \"a\"\n[[down_stack]]\nmarks = [\"U+0316\"]\n").unwrap();
        let opts = StackOptions {
            recipe: Some(path),
            base: Some("U+0042".to_string()),
            ..Default::default()
        };
        assert_eq!(
            render_with(opts, &config_in(dir.path())).unwrap(),
            "B\u{0316}"
        );
    }

    #[test]
    fn text_is_stacked_per_character() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            preset: Some("whisper".to_string()),
            text: Some("hi there".to_string()),
            ..Default::default()
        };
        let out = render_with(opts, &config_in(dir.path())).unwrap();
        assert_eq!(strip_marks(&out), "hi there");
        assert_eq!(out.chars().count(), 8 + 7 * 3);
    }

    #[test]
    fn explain_lists_codepoints() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            preset: Some("whisper".to_string()),
            explain: true,
            ..Default::default()
        };
        let out = render_with(opts, &config_in(dir.path())).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "U+0E01  \u{0E01}  base");
    }

    #[test]
    fn strip_reads_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            strip: true,
            ..Default::default()
        };
        let mut input = "z\u{0301}\u{0316}a\u{20DD}lgo\n".as_bytes();
        let out = render(&opts, &config_in(dir.path()), &mut input).unwrap();
        assert_eq!(out, "zalgo");
    }

    #[test]
    fn strip_prefers_text_flag() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            strip: true,
            text: Some("o\u{0308}k".to_string()),
            ..Default::default()
        };
        assert_eq!(render_with(opts, &config_in(dir.path())).unwrap(), "ok");
    }

    #[test]
    fn strip_without_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            strip: true,
            ..Default::default()
        };
        assert!(matches!(
            render_with(opts, &config_in(dir.path())),
            Err(StackError::NothingToStrip)
        ));
    }

    #[test]
    fn list_includes_custom_recipes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("crown.toml"), "base = \"W\"\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let opts = StackOptions {
            list: true,
            ..Default::default()
        };
        let out = render_with(opts, &config_in(dir.path())).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "monster");
        assert_eq!(lines.last(), Some(&"crown (custom)"));
        assert_eq!(lines.len(), presets::names().len() + 1);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            preset: Some("kraken".to_string()),
            ..Default::default()
        };
        let err = render_with(opts, &config_in(dir.path())).unwrap_err();
        assert!(err.to_string().contains("unknown preset 'kraken'"));
    }

    #[test]
    fn bad_base_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = StackOptions {
            base: Some("U+ZZZZ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            render_with(opts, &config_in(dir.path())),
            Err(StackError::Glyph(GlyphError::InvalidCodepoint(_)))
        ));
    }
}
