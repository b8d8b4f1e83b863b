//! Google Gemini `generateContent` client with SSE streaming support.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use gf_protocol::{
    GenerationResponse, ImageRequest, InlineImage, Modality, ResponsePart, StreamEvent, Usage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sse::{parse_sse_stream, SseEvent};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("prompt blocked: {0}")]
    Blocked(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

/// Build an HTTP client with appropriate timeouts and connection limits.
fn build_http_client() -> Result<Client, GeminiError> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| GeminiError::Client(e.to_string()))
}

impl GeminiClient {
    /// Create a new client with the given API key and the default image model.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create a new client with a custom model.
    pub fn with_model(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: build_http_client()?,
        })
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        endpoint_url(&self.base_url, &self.model, method)
    }

    /// Send a request and wait for the complete response.
    pub async fn generate(&self, request: &ImageRequest) -> Result<GenerationResponse, GeminiError> {
        let url = self.endpoint("generateContent");
        tracing::debug!(%url, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&build_request_body(request))
            .send()
            .await?;

        parse_generate_response(response).await
    }

    /// Send a request and return a stream of events.
    pub fn send(&self, request: &ImageRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let api_key = self.api_key.clone();
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let http = self.http.clone();
        let body = build_request_body(request);

        stream! {
            tracing::debug!(%url, "sending streamGenerateContent request");
            match send_streaming(&http, &api_key, &url, &body).await {
                Ok(response) => {
                    let byte_stream = response.bytes_stream();
                    let mut sse_stream = parse_sse_stream(byte_stream);
                    let mut processor = ChunkProcessor::new();

                    use futures::StreamExt;

                    while let Some(result) = sse_stream.next().await {
                        match result {
                            Ok(sse_event) => {
                                for stream_event in processor.process(&sse_event) {
                                    let fatal = matches!(stream_event, StreamEvent::Error(_));
                                    yield stream_event;
                                    if fatal {
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                yield StreamEvent::Error(format!("Stream error: {e}"));
                                return;
                            }
                        }
                    }

                    yield StreamEvent::Done;
                }
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                }
            }
        }
    }
}

fn endpoint_url(base_url: &str, model: &str, method: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{}/models/{model}:{method}", base_url.trim_end_matches('/'))
}

async fn send_streaming(
    http: &Client,
    api_key: &str,
    url: &str,
    body: &ApiRequest,
) -> Result<reqwest::Response, GeminiError> {
    let response = http
        .post(url)
        .header("x-goog-api-key", api_key)
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    Ok(response)
}

/// Turn a non-2xx response into an `Api` error, preferring the message from
/// the JSON error envelope over the raw body.
async fn api_error(response: reqwest::Response) -> GeminiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .unwrap_or(body);
    GeminiError::Api(format!("{status}: {message}"))
}

async fn parse_generate_response(
    response: reqwest::Response,
) -> Result<GenerationResponse, GeminiError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let resp: ApiResponse = response.json().await?;
    convert_response(resp)
}

fn convert_response(resp: ApiResponse) -> Result<GenerationResponse, GeminiError> {
    if let Some(err) = resp.error {
        return Err(GeminiError::Api(err.message));
    }

    let block_reason = resp.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return match block_reason {
            Some(reason) => Err(GeminiError::Blocked(reason)),
            None => Err(GeminiError::Api("response contained no candidates".to_string())),
        };
    };

    let parts = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(ApiResponsePart::into_part)
        .collect();

    Ok(GenerationResponse {
        parts,
        usage: resp.usage_metadata.map(ApiUsage::into_usage),
        finish_reason: candidate.finish_reason,
    })
}

fn build_request_body(request: &ImageRequest) -> ApiRequest {
    let mut parts = vec![ApiPart::Text {
        text: request.prompt.clone(),
    }];
    for att in &request.attachments {
        parts.push(ApiPart::InlineData {
            inline_data: ApiBlob {
                mime_type: att.media_type.clone(),
                data: att.data.clone(),
            },
        });
    }

    ApiRequest {
        contents: vec![ApiContent {
            role: "user".to_string(),
            parts,
        }],
        generation_config: ApiGenerationConfig {
            response_modalities: request.modalities.clone(),
            image_config: request.aspect_ratio.map(|r| ApiImageConfig {
                aspect_ratio: r.as_str().to_string(),
            }),
        },
    }
}

/// Maps streamed response chunks to [`StreamEvent`]s.
///
/// Every SSE event carries a full `GenerateContentResponse` holding only the
/// parts produced since the previous chunk. Usage metadata is cumulative,
/// so each report replaces the last.
struct ChunkProcessor {
    finished: bool,
}

impl ChunkProcessor {
    fn new() -> Self {
        Self { finished: false }
    }

    fn process(&mut self, event: &SseEvent) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let chunk: ApiResponse = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed stream chunk");
                return events;
            }
        };

        if let Some(err) = chunk.error {
            events.push(StreamEvent::Error(err.message));
            return events;
        }

        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            events.push(StreamEvent::Error(format!("prompt blocked: {reason}")));
            return events;
        }

        if let Some(candidate) = chunk.candidates.into_iter().next() {
            if let Some(content) = candidate.content {
                for part in content.parts.into_iter().filter_map(ApiResponsePart::into_part) {
                    events.push(match part {
                        ResponsePart::Text(t) => StreamEvent::TextDelta(t),
                        ResponsePart::Image(img) => StreamEvent::Image(img),
                    });
                }
            }
            if let Some(reason) = candidate.finish_reason {
                if !self.finished {
                    self.finished = true;
                    events.push(StreamEvent::Finished(reason));
                }
            }
        }

        if let Some(usage) = chunk.usage_metadata {
            events.push(StreamEvent::Usage(usage.into_usage()));
        }

        events
    }
}

// API request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: String,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: ApiBlob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBlob {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    response_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ApiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    prompt_feedback: Option<ApiPromptFeedback>,
    usage_metadata: Option<ApiUsage>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    content: Option<ApiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseContent {
    #[serde(default)]
    parts: Vec<ApiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponsePart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<ApiBlob>,
    #[serde(default)]
    thought: bool,
}

impl ApiResponsePart {
    fn into_part(self) -> Option<ResponsePart> {
        if self.thought {
            return None;
        }
        if let Some(blob) = self.inline_data {
            return Some(ResponsePart::Image(InlineImage {
                mime_type: blob.mime_type,
                data: blob.data,
            }));
        }
        self.text
            .filter(|t| !t.is_empty())
            .map(ResponsePart::Text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl ApiUsage {
    fn into_usage(self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_token_count,
            output_tokens: self.candidates_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
