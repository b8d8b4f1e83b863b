//! The `imagine` command: prompt in, images out.
//!
//! Model text goes to stdout as it arrives. Progress, warnings and errors go
//! to stderr through [`ImagineOutput`]. Each image is decoded, saved and then
//! shown; a viewer failure never costs the saved file or the exit code.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use futures::{Stream, StreamExt};
use gf_backend::GeminiClient;
use gf_protocol::{AspectRatio, ImageRequest, InlineImage, Modality, StreamEvent, Usage};

use crate::attachment::load_all;
use crate::config::Config;
use crate::output::{decode_image, save_image};
use crate::progress::ImagineOutput;
use crate::viewer::{self, Presentation, ShowMode, TerminalEnv};

/// Command-line overrides for one `imagine` run.
#[derive(Debug, Clone, Default)]
pub struct ImagineOptions {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub aspect_ratio: Option<AspectRatio>,
    pub model: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub show: Option<ShowMode>,
    pub no_stream: bool,
    pub text_only: bool,
}

/// Where and how received images end up.
#[derive(Debug, Clone)]
pub struct ImageSink {
    pub dir: PathBuf,
    pub prefix: String,
    pub presentation: Presentation,
    /// Shared by every file of a run so they sort together.
    pub started: DateTime<Local>,
}

/// What a finished event stream amounted to.
#[derive(Debug, Default, PartialEq)]
pub struct StreamOutcome {
    pub images_saved: usize,
    pub text_received: bool,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
    pub error: Option<String>,
}

impl StreamOutcome {
    /// 0 when the run produced what was asked for, 1 otherwise.
    pub fn exit_code(&self, text_only: bool) -> i32 {
        if self.error.is_some() {
            return 1;
        }
        let satisfied = if text_only {
            self.text_received
        } else {
            self.images_saved > 0
        };
        if satisfied {
            0
        } else {
            1
        }
    }

    /// Why the run failed, for runs that ended without a stream error.
    fn shortfall(&self, text_only: bool) -> String {
        let what = if text_only { "text" } else { "image" };
        match self.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => {
                format!("model returned no {what} (finish reason {reason})")
            }
            _ => format!("model returned no {what}"),
        }
    }
}

/// Run `imagine` end to end and return the process exit code.
pub async fn run_imagine(config: &Config, opts: ImagineOptions) -> i32 {
    let is_tty = std::io::stderr().is_terminal();
    let mut progress = ImagineOutput::new(std::io::stderr(), is_tty, &opts.prompt);

    let gemini = &config.backend.gemini;
    let api_key = match gemini.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            progress.emit_error(&e.to_string());
            return 1;
        }
    };

    let model = opts.model.as_deref().unwrap_or(&gemini.model);
    let client = match GeminiClient::with_model(api_key, model) {
        Ok(c) => c,
        Err(e) => {
            progress.emit_error(&e.to_string());
            return 1;
        }
    };
    let client = match &gemini.base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    };

    let attachments = match load_all(&opts.images) {
        Ok(a) => a,
        Err(e) => {
            progress.emit_error(&e.to_string());
            return 1;
        }
    };

    let mut request = ImageRequest::new(&opts.prompt).with_attachments(attachments);
    if let Some(ratio) = opts.aspect_ratio {
        request = request.with_aspect_ratio(ratio);
    }
    if opts.text_only {
        request = request.with_modalities(vec![Modality::Text]);
    }

    let show_mode = opts.show.unwrap_or(config.output.show);
    let sink = ImageSink {
        dir: opts
            .out_dir
            .clone()
            .unwrap_or_else(|| config.output.resolve_dir()),
        prefix: config.output.filename_prefix.clone(),
        presentation: TerminalEnv::detect().resolve(show_mode),
        started: Local::now(),
    };
    tracing::info!(
        model = client.model(),
        attachments = request.attachments.len(),
        aspect_ratio = ?request.aspect_ratio,
        presentation = ?sink.presentation,
        "starting generation"
    );

    progress.emit_start(client.model());
    progress.emit_waiting();

    let mut stdout = std::io::stdout();
    let outcome = if opts.no_stream {
        let events = match client.generate(&request).await {
            Ok(response) => response.into_events(),
            Err(e) => vec![StreamEvent::Error(e.to_string())],
        };
        consume_events(futures::stream::iter(events), &sink, &mut progress, &mut stdout).await
    } else {
        consume_events(client.send(&request), &sink, &mut progress, &mut stdout).await
    };

    finish(&outcome, !request.wants_image(), &mut progress)
}

/// Report the end of a run and compute its exit code.
pub fn finish<E: Write>(
    outcome: &StreamOutcome,
    text_only: bool,
    progress: &mut ImagineOutput<E>,
) -> i32 {
    let code = outcome.exit_code(text_only);
    if outcome.error.is_none() && code != 0 {
        progress.emit_error(&outcome.shortfall(text_only));
    }
    progress.emit_done(outcome.usage);
    code
}

/// Drain a generation stream: text to `stdout`, images to `sink`.
pub async fn consume_events<S, E, O>(
    events: S,
    sink: &ImageSink,
    progress: &mut ImagineOutput<E>,
    stdout: &mut O,
) -> StreamOutcome
where
    S: Stream<Item = StreamEvent>,
    E: Write,
    O: Write,
{
    let mut events = std::pin::pin!(events);
    let mut outcome = StreamOutcome::default();
    let saved_before = progress.images_saved();
    let mut image_index = 0usize;
    let mut open_line = false;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta(text) => {
                if text.is_empty() {
                    continue;
                }
                outcome.text_received = true;
                open_line = !text.ends_with('\n');
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            StreamEvent::Image(img) => {
                if open_line {
                    let _ = stdout.write_all(b"\n");
                    open_line = false;
                }
                image_index += 1;
                handle_image(&img, image_index, sink, progress, stdout);
            }
            StreamEvent::Usage(usage) => outcome.usage = Some(usage),
            StreamEvent::Finished(reason) => {
                tracing::debug!(%reason, "generation finished");
                outcome.finish_reason = Some(reason);
            }
            StreamEvent::Done => break,
            StreamEvent::Error(e) => {
                progress.emit_error(&e);
                outcome.error = Some(e);
                break;
            }
        }
    }

    if open_line {
        let _ = stdout.write_all(b"\n");
        let _ = stdout.flush();
    }
    outcome.images_saved = progress.images_saved() - saved_before;
    outcome
}

/// Decode, save and show one image. Saved images are counted by `progress`.
fn handle_image<E: Write, O: Write>(
    img: &InlineImage,
    index: usize,
    sink: &ImageSink,
    progress: &mut ImagineOutput<E>,
    stdout: &mut O,
) {
    let decoded = match decode_image(img) {
        Ok(d) => d,
        Err(e) => {
            progress.emit_warning(&format!("skipping image {index}: {e}"));
            return;
        }
    };

    let path = match save_image(&sink.dir, &sink.prefix, index, &decoded, sink.started) {
        Ok(p) => p,
        Err(e) => {
            progress.emit_error(&e.to_string());
            return;
        }
    };
    progress.emit_saved(&path, decoded.width, decoded.height);

    if let Err(e) = viewer::show(sink.presentation, &path, &decoded, stdout) {
        tracing::warn!(path = %path.display(), error = %e, "could not show image");
        progress.emit_warning(&format!("could not show {}: {e}", path.display()));
    }
}
