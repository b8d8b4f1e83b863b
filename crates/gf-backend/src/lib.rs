//! gf-backend: image-generation provider adapters for glyphforge.
//!
//! Talks to the Gemini `generateContent` API, either waiting for the full
//! response or streaming it over Server-Sent Events.

pub mod gemini;
pub mod mock;
pub mod sse;

pub use gemini::{GeminiClient, GeminiError};
pub use mock::{MockConfig, MockResponse};
