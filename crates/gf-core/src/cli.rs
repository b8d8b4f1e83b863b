//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use gf_protocol::AspectRatio;

use crate::imagine::ImagineOptions;
use crate::stack::StackOptions;
use crate::viewer::ShowMode;

#[derive(Parser, Debug)]
#[command(
    name = "glyphforge",
    version,
    about = "Stack combining marks into towering glyphs, and generate images with Gemini"
)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/glyphforge/config.toml).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a stacked glyph.
    Stack(StackArgs),
    /// Generate images from a text prompt.
    Imagine(ImagineArgs),
}

#[derive(Args, Debug)]
pub struct StackArgs {
    /// Preset or custom recipe name.
    #[arg(long, value_name = "NAME", conflicts_with = "recipe")]
    pub preset: Option<String>,

    /// Recipe file to build.
    #[arg(long, value_name = "FILE")]
    pub recipe: Option<PathBuf>,

    /// Base character, literal or U+XXXX.
    #[arg(long, value_name = "CHAR")]
    pub base: Option<String>,

    /// Stack onto every character of TEXT instead of the base.
    #[arg(long)]
    pub text: Option<String>,

    /// Print one line per codepoint instead of the glyph.
    #[arg(long)]
    pub explain: bool,

    /// Remove combining marks from --text or stdin.
    #[arg(long, conflicts_with_all = ["explain", "list"])]
    pub strip: bool,

    /// List available recipes.
    #[arg(long)]
    pub list: bool,
}

impl From<StackArgs> for StackOptions {
    fn from(a: StackArgs) -> Self {
        Self {
            preset: a.preset,
            recipe: a.recipe,
            base: a.base,
            text: a.text,
            explain: a.explain,
            strip: a.strip,
            list: a.list,
        }
    }
}

#[derive(Args, Debug)]
pub struct ImagineArgs {
    /// Prompt text. Read from stdin when omitted and stdin is piped.
    pub prompt: Option<String>,

    /// Reference image to send with the prompt (repeatable).
    #[arg(long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,

    #[arg(long, value_name = "RATIO")]
    pub aspect_ratio: Option<AspectRatio>,

    #[arg(long)]
    pub model: Option<String>,

    /// Output directory.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub show: Option<ShowMode>,

    /// Wait for the full response instead of streaming.
    #[arg(long)]
    pub no_stream: bool,

    /// Ask for text only.
    #[arg(long)]
    pub text_only: bool,
}

impl ImagineArgs {
    /// Build run options once the prompt is known.
    pub fn into_options(self, prompt: String) -> ImagineOptions {
        ImagineOptions {
            prompt,
            images: self.images,
            aspect_ratio: self.aspect_ratio,
            model: self.model,
            out_dir: self.out,
            show: self.show,
            no_stream: self.no_stream,
            text_only: self.text_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_stack_flags() {
        let cli = Cli::try_parse_from([
            "glyphforge", "-vv", "stack", "--preset", "tower", "--base", "U+0041", "--explain",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Stack(args) = cli.command else {
            panic!("expected stack");
        };
        let opts = StackOptions::from(args);
        assert_eq!(opts.preset.as_deref(), Some("tower"));
        assert_eq!(opts.base.as_deref(), Some("U+0041"));
        assert!(opts.explain);
    }

    #[test]
    fn preset_and_recipe_conflict() {
        let result = Cli::try_parse_from([
            "glyphforge", "stack", "--preset", "tower", "--recipe", "x.toml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_imagine_flags() {
        let cli = Cli::try_parse_from([
            "glyphforge",
            "imagine",
            "a neon banana",
            "--image",
            "a.png",
            "--image",
            "b.jpg",
            "--aspect-ratio",
            "16:9",
            "--show",
            "none",
            "--no-stream",
            "--config",
            "/tmp/gf.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gf.toml")));
        let Command::Imagine(args) = cli.command else {
            panic!("expected imagine");
        };
        assert_eq!(args.prompt.as_deref(), Some("a neon banana"));
        let opts = args.into_options("a neon banana".to_string());
        assert_eq!(opts.images.len(), 2);
        assert_eq!(opts.aspect_ratio, Some(AspectRatio::Landscape16x9));
        assert_eq!(opts.show, Some(ShowMode::None));
        assert!(opts.no_stream);
        assert!(!opts.text_only);
    }

    #[test]
    fn bad_aspect_ratio_is_rejected() {
        let result = Cli::try_parse_from(["glyphforge", "imagine", "x", "--aspect-ratio", "7:3"]);
        assert!(result.is_err());
    }
}
