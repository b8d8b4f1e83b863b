//! Progress reporting for `imagine` on stderr.
//!
//! TTY output uses compact, single-line overwrite between persistent boundaries.
//! Non-TTY output uses plain text with one line per event and no ANSI codes.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use gf_protocol::Usage;

use crate::style::{format_tokens, truncate_to_width, Style};

const PREFIX: &str = "[gf]";
const SUMMARY_WIDTH: usize = 60;

pub struct ImagineOutput<W: Write> {
    writer: W,
    is_tty: bool,
    style: Style,
    start_time: Instant,
    prompt_summary: String,
    images_saved: usize,
    term_width: u16,
}

impl<W: Write> ImagineOutput<W> {
    pub fn new(writer: W, is_tty: bool, prompt: &str) -> Self {
        let term_width = if is_tty {
            crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80)
        } else {
            80
        };
        // Newlines in a piped prompt would break the single-line layout.
        let flat: String = prompt.split_whitespace().collect::<Vec<_>>().join(" ");

        Self {
            writer,
            is_tty,
            style: if is_tty { Style::new() } else { Style::disabled() },
            start_time: Instant::now(),
            prompt_summary: truncate_to_width(&flat, SUMMARY_WIDTH),
            images_saved: 0,
            term_width,
        }
    }

    pub fn images_saved(&self) -> usize {
        self.images_saved
    }

    fn prefix(&self) -> String {
        let s = self.style;
        format!("{}{}{PREFIX}{}", s.dim_start(), s.magenta_start(), s.reset())
    }

    fn fit(&self, text: &str) -> String {
        let max = (self.term_width as usize).saturating_sub(PREFIX.len() + 1);
        truncate_to_width(text, max)
    }

    /// Start boundary (persists).
    pub fn emit_start(&mut self, model: &str) {
        let s = self.style;
        let _ = writeln!(
            self.writer,
            "{} {}---{} {}\"{}\"{} {}({model}){}",
            self.prefix(),
            s.magenta_start(),
            s.reset(),
            s.bold_start(),
            self.prompt_summary,
            s.reset(),
            s.dim_start(),
            s.reset(),
        );
    }

    /// Waiting indicator (overwritten in TTY mode).
    pub fn emit_waiting(&mut self) {
        if self.is_tty {
            let _ = write!(
                self.writer,
                "\r\x1b[K{} {}generating...{}",
                self.prefix(),
                self.style.dim_start(),
                self.style.reset(),
            );
        } else {
            let _ = writeln!(self.writer, "{PREFIX} generating...");
        }
        let _ = self.writer.flush();
    }

    /// A saved image (persists).
    pub fn emit_saved(&mut self, path: &Path, width: u32, height: u32) {
        self.images_saved += 1;
        let line = self.fit(&format!(
            "saved {} ({width}x{height})",
            path.display()
        ));
        let clear = if self.is_tty { "\r\x1b[K" } else { "" };
        let _ = writeln!(
            self.writer,
            "{clear}{} {}{line}{}",
            self.prefix(),
            self.style.green_start(),
            self.style.reset(),
        );
    }

    /// Non-fatal problem (persists, yellow).
    pub fn emit_warning(&mut self, msg: &str) {
        let clear = if self.is_tty { "\r\x1b[K" } else { "" };
        let _ = writeln!(
            self.writer,
            "{clear}{} {}warning: {msg}{}",
            self.prefix(),
            self.style.yellow_start(),
            self.style.reset(),
        );
    }

    /// Fatal problem (persists, red).
    pub fn emit_error(&mut self, msg: &str) {
        let clear = if self.is_tty { "\r\x1b[K" } else { "" };
        let _ = writeln!(
            self.writer,
            "{clear}{} {}error: {msg}{}",
            self.prefix(),
            self.style.red_start(),
            self.style.reset(),
        );
    }

    /// End boundary (persists).
    pub fn emit_done(&mut self, usage: Option<Usage>) {
        let elapsed = self.start_time.elapsed().as_secs();
        let n = self.images_saved;
        let noun = if n == 1 { "image" } else { "images" };
        let tokens = usage
            .map(|u| {
                format!(
                    ", {} in / {} out",
                    format_tokens(u.prompt_tokens),
                    format_tokens(u.output_tokens)
                )
            })
            .unwrap_or_default();
        let clear = if self.is_tty { "\r\x1b[K" } else { "" };
        let s = self.style;
        let _ = writeln!(
            self.writer,
            "{clear}{} {}---{} {}done ({elapsed}s, {n} {noun}{tokens}){}",
            self.prefix(),
            s.magenta_start(),
            s.reset(),
            s.dim_start(),
            s.reset(),
        );
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(is_tty: bool, prompt: &str) -> ImagineOutput<Vec<u8>> {
        let mut out = ImagineOutput::new(Vec::new(), is_tty, prompt);
        // Color depends on NO_COLOR in the test environment; pin it.
        out.style = if is_tty {
            Style::force_enabled()
        } else {
            Style::disabled()
        };
        out
    }

    fn text(out: ImagineOutput<Vec<u8>>) -> String {
        String::from_utf8(out.into_writer()).unwrap()
    }

    #[test]
    fn non_tty_start_is_plain() {
        let mut out = make(false, "a banana");
        out.emit_start("gemini-2.5-flash-image");
        assert_eq!(
            text(out),
            "[gf] --- \"a banana\" (gemini-2.5-flash-image)\n"
        );
    }

    #[test]
    fn tty_start_is_colored() {
        let mut out = make(true, "a banana");
        out.emit_start("m");
        let s = text(out);
        assert!(s.contains("\x1b["));
        assert!(s.contains("\x1b[1m\"a banana\"\x1b[0m"));
        assert!(s.ends_with('\n'));
    }

    #[test]
    fn tty_waiting_overwrites() {
        let mut out = make(true, "x");
        out.emit_waiting();
        let s = text(out);
        assert!(s.starts_with("\r\x1b[K"));
        assert!(s.contains("generating"));
        assert!(!s.ends_with('\n'));
    }

    #[test]
    fn non_tty_waiting_is_a_line() {
        let mut out = make(false, "x");
        out.emit_waiting();
        assert_eq!(text(out), "[gf] generating...\n");
    }

    #[test]
    fn saved_counts_images() {
        let mut out = make(false, "x");
        out.emit_saved(Path::new("out/gf-1.png"), 1024, 768);
        out.emit_saved(Path::new("out/gf-2.png"), 1024, 768);
        assert_eq!(out.images_saved(), 2);
        let s = text(out);
        assert!(s.contains("[gf] saved out/gf-1.png (1024x768)\n"));
    }

    #[test]
    fn warning_and_error_lines() {
        let mut out = make(false, "x");
        out.emit_warning("xdg-open missing");
        out.emit_error("HTTP 403");
        assert_eq!(
            text(out),
            "[gf] warning: xdg-open missing\n[gf] error: HTTP 403\n"
        );
    }

    #[test]
    fn tty_error_is_red() {
        let mut out = make(true, "x");
        out.emit_error("boom");
        let s = text(out);
        assert!(s.contains("\x1b[31m"));
        assert!(s.ends_with('\n'));
    }

    #[test]
    fn done_reports_images_and_tokens() {
        let mut out = make(false, "x");
        out.emit_saved(Path::new("a.png"), 1, 1);
        out.emit_done(Some(Usage {
            prompt_tokens: 12,
            output_tokens: 1290,
        }));
        let s = text(out);
        assert!(s.contains("--- done ("));
        assert!(s.contains("s, 1 image, 12 in / 1.3k out)"));
    }

    #[test]
    fn done_without_usage() {
        let mut out = make(false, "x");
        out.emit_done(None);
        assert!(text(out).contains("s, 0 images)"));
    }

    #[test]
    fn prompt_summary_is_flattened_and_truncated() {
        let long = "a futuristic banana\nwith neon lights ".repeat(5);
        let out = make(false, &long);
        assert!(!out.prompt_summary.contains('\n'));
        assert!(out.prompt_summary.ends_with("..."));
        assert_eq!(out.prompt_summary.chars().count(), SUMMARY_WIDTH);
    }
}
