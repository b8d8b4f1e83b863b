//! gf-protocol: Shared types and message definitions for glyphforge.
//!
//! This crate defines the request and response types passed between the
//! core binary and image-generation backends.

pub mod message;
pub mod request;

pub use message::{GenerationResponse, InlineImage, ResponsePart, StreamEvent, Usage};
pub use request::{AspectRatio, Attachment, ImageRequest, Modality, ParseAspectRatioError};
