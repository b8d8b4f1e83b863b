//! Mock provider for testing.
//!
//! Produces the same `StreamEvent` sequence as the real Gemini adapter, so
//! the core can be exercised without network access.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use gf_protocol::{InlineImage, StreamEvent, Usage};
use tokio::time::sleep;

/// Smallest valid PNG: a single transparent pixel.
pub const ONE_PIXEL_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Configurable mock responses for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit a text delta.
    Text { content: String },
    /// Emit an inline image.
    Image { mime_type: String, data: String },
    /// Emit usage information.
    Usage {
        prompt_tokens: u32,
        output_tokens: u32,
    },
    /// Emit an error and end the stream.
    Error { message: String },
    /// Delay before next event (for timing tests).
    Delay { ms: u64 },
}

/// Configuration for mock stream.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of responses to emit.
    pub responses: Vec<MockResponse>,
    /// Optional delay between each event (ms).
    pub chunk_delay_ms: Option<u64>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }
}

/// Create a stream of StreamEvents from mock config.
///
/// Like the real adapter, an `Error` ends the stream without a `Done`.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = StreamEvent> {
    stream! {
        let mut finished = false;
        for response in config.responses {
            if let Some(delay_ms) = config.chunk_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match response {
                MockResponse::Text { content } => {
                    yield StreamEvent::TextDelta(content);
                }
                MockResponse::Image { mime_type, data } => {
                    yield StreamEvent::Image(InlineImage { mime_type, data });
                }
                MockResponse::Usage { prompt_tokens, output_tokens } => {
                    yield StreamEvent::Usage(Usage { prompt_tokens, output_tokens });
                }
                MockResponse::Error { message } => {
                    yield StreamEvent::Error(message);
                    return;
                }
                MockResponse::Delay { ms } => {
                    sleep(Duration::from_millis(ms)).await;
                }
            }
            finished = true;
        }

        if finished {
            yield StreamEvent::Finished("STOP".to_string());
        }
        yield StreamEvent::Done;
    }
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    /// A caption followed by one PNG image.
    pub fn caption_then_image(caption: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: caption.to_string(),
            },
            MockResponse::Image {
                mime_type: "image/png".to_string(),
                data: ONE_PIXEL_PNG_BASE64.to_string(),
            },
            MockResponse::Usage {
                prompt_tokens: 12,
                output_tokens: 1290,
            },
        ])
    }

    /// `count` PNG images with no text.
    pub fn images(count: usize) -> MockConfig {
        let responses = (0..count)
            .map(|_| MockResponse::Image {
                mime_type: "image/png".to_string(),
                data: ONE_PIXEL_PNG_BASE64.to_string(),
            })
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// The model declined to draw and only answered in text.
    pub fn text_only(chunks: &[&str]) -> MockConfig {
        let responses = chunks
            .iter()
            .map(|chunk| MockResponse::Text {
                content: (*chunk).to_string(),
            })
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// Text, then an error before any image arrives.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: text_before.to_string(),
            },
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }
}
