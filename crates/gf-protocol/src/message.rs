//! Response types and streaming events.

use serde::{Deserialize, Serialize};

/// An image returned inline by the model, still base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// One part of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    Image(InlineImage),
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

/// A complete (non-streaming) generation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub parts: Vec<ResponsePart>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

impl GenerationResponse {
    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.parts.iter().filter_map(|p| match p {
            ResponsePart::Image(img) => Some(img),
            ResponsePart::Text(_) => None,
        })
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text(t) => Some(t.as_str()),
                ResponsePart::Image(_) => None,
            })
            .collect()
    }

    /// Replay this response as the event sequence a stream would produce.
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .parts
            .into_iter()
            .map(|p| match p {
                ResponsePart::Text(t) => StreamEvent::TextDelta(t),
                ResponsePart::Image(img) => StreamEvent::Image(img),
            })
            .collect();
        if let Some(usage) = self.usage {
            events.push(StreamEvent::Usage(usage));
        }
        if let Some(reason) = self.finish_reason {
            events.push(StreamEvent::Finished(reason));
        }
        events.push(StreamEvent::Done);
        events
    }
}

/// Events emitted during a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of response text.
    TextDelta(String),

    /// A complete inline image.
    Image(InlineImage),

    /// Token usage so far. Later values supersede earlier ones.
    Usage(Usage),

    /// The candidate reported a finish reason (e.g. "STOP").
    Finished(String),

    /// Stream has completed successfully.
    Done,

    /// An error occurred during streaming.
    Error(String),
}
