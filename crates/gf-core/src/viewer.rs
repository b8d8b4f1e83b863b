//! Showing saved images: hand them to the desktop viewer, or draw them
//! straight into the terminal with an inline graphics protocol.

use std::io::{self, Cursor, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use base64::Engine;
use image::ImageFormat;
use serde::Deserialize;
use thiserror::Error;

use crate::output::DecodedImage;

/// Kitty caps each escape payload at 4096 bytes of base64.
const KITTY_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShowMode {
    /// Only save the file.
    None,
    /// Launch the platform image viewer.
    Open,
    /// Draw the image in the terminal.
    Inline,
    /// Inline when the terminal supports it, otherwise open.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineProtocol {
    Kitty,
    Iterm,
}

/// What to actually do once `Auto` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Skip,
    Open,
    Inline(InlineProtocol),
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to launch {program}: {source}")]
    Launch { program: String, source: io::Error },
    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),
    #[error("cannot convert image for the terminal: {0}")]
    Image(#[from] image::ImageError),
}

/// Terminal facts that decide how an image can be shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalEnv {
    pub stdout_is_tty: bool,
    pub term: Option<String>,
    pub term_program: Option<String>,
    pub kitty_window_id: Option<String>,
}

impl TerminalEnv {
    pub fn detect() -> Self {
        use std::io::IsTerminal;
        Self {
            stdout_is_tty: io::stdout().is_terminal(),
            term: std::env::var("TERM").ok(),
            term_program: std::env::var("TERM_PROGRAM").ok(),
            kitty_window_id: std::env::var("KITTY_WINDOW_ID").ok(),
        }
    }

    /// The inline protocol this terminal speaks, if any we know of.
    pub fn inline_protocol(&self) -> Option<InlineProtocol> {
        if self.kitty_window_id.is_some() {
            return Some(InlineProtocol::Kitty);
        }
        let term = self.term.as_deref().unwrap_or("");
        if term.contains("kitty") || term.contains("ghostty") {
            return Some(InlineProtocol::Kitty);
        }
        match self.term_program.as_deref() {
            Some("ghostty") => Some(InlineProtocol::Kitty),
            Some("iTerm.app" | "WezTerm" | "vscode" | "mintty") => Some(InlineProtocol::Iterm),
            _ => None,
        }
    }

    pub fn resolve(&self, mode: ShowMode) -> Presentation {
        match mode {
            ShowMode::None => Presentation::Skip,
            ShowMode::Open => Presentation::Open,
            ShowMode::Inline => {
                Presentation::Inline(self.inline_protocol().unwrap_or(InlineProtocol::Iterm))
            }
            ShowMode::Auto => match self.inline_protocol() {
                Some(p) if self.stdout_is_tty => Presentation::Inline(p),
                _ => Presentation::Open,
            },
        }
    }
}

/// Show a saved image according to `presentation`.
pub fn show(
    presentation: Presentation,
    path: &Path,
    image: &DecodedImage,
    out: &mut impl Write,
) -> Result<(), ViewerError> {
    match presentation {
        Presentation::Skip => Ok(()),
        Presentation::Open => open_with_system_viewer(path),
        Presentation::Inline(InlineProtocol::Iterm) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image");
            out.write_all(encode_iterm(name, &image.bytes).as_bytes())?;
            out.write_all(b"\n")?;
            out.flush()?;
            Ok(())
        }
        Presentation::Inline(InlineProtocol::Kitty) => {
            let png = to_png(image)?;
            out.write_all(encode_kitty(&png).as_bytes())?;
            out.write_all(b"\n")?;
            out.flush()?;
            Ok(())
        }
    }
}

fn opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    }
}

/// Launch the platform viewer on `path` without waiting for it to exit.
pub fn open_with_system_viewer(path: &Path) -> Result<(), ViewerError> {
    let (program, args) = opener();
    tracing::debug!(program, path = %path.display(), "launching viewer");
    Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
        .map_err(|source| ViewerError::Launch {
            program: program.to_string(),
            source,
        })
}

/// Kitty only accepts PNG or raw pixels; re-encode anything else.
fn to_png(image: &DecodedImage) -> Result<Vec<u8>, ViewerError> {
    if image.format == ImageFormat::Png {
        return Ok(image.bytes.clone());
    }
    let decoded = image::load_from_memory_with_format(&image.bytes, image.format)?;
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// iTerm2 `OSC 1337 File=` sequence.
pub fn encode_iterm(name: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD;
    format!(
        "\x1b]1337;File=name={};size={};inline=1;preserveAspectRatio=1:{}\x07",
        b64.encode(name),
        bytes.len(),
        b64.encode(bytes)
    )
}

/// Kitty graphics protocol: transmit-and-display a PNG in 4096-byte chunks.
pub fn encode_kitty(png: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(png);
    let chunks: Vec<&[u8]> = payload.as_bytes().chunks(KITTY_CHUNK).collect();

    let mut out = String::with_capacity(payload.len() + chunks.len() * 16);
    for (i, chunk) in chunks.iter().enumerate() {
        let more = u8::from(i + 1 < chunks.len());
        // Base64 output is ASCII, so every chunk boundary is a char boundary.
        let chunk = std::str::from_utf8(chunk).unwrap_or_default();
        if i == 0 {
            out.push_str(&format!("\x1b_Ga=T,f=100,m={more};{chunk}\x1b\\"));
        } else {
            out.push_str(&format!("\x1b_Gm={more};{chunk}\x1b\\"));
        }
    }
    out
}
