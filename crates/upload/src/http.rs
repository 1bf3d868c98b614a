//! reqwest implementation of [`UploadApi`].
//!
//! Init, chunk and cancel requests carry the configured request timeout.
//! Finalize carries none: the client is built without a global timeout
//! and the deadline is applied per request.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use seeker_protocol::{
    CancelUploadRequest, CancelUploadResponse, DEFAULT_REQUEST_TIMEOUT, Endpoint, FIELD_CHUNK,
    FIELD_CHUNK_INDEX, FIELD_UPLOAD_ID, FinalizeUploadRequest, FinalizeUploadResponse,
    InitUploadRequest, InitUploadResponse,
};
use seeker_transfer::ChunkProgress;

use crate::api::{ApiFuture, UploadApi};
use crate::error::UploadError;

/// Granularity of chunk upload-progress reports.
const PROGRESS_FRAME: usize = 64 * 1024;

/// Builder for [`HttpUploadApi`].
#[derive(Debug, Clone)]
pub struct HttpUploadApiBuilder {
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl HttpUploadApiBuilder {
    /// Bearer token attached to every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Timeout for init, chunk and cancel requests.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpUploadApi, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| UploadError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.request_timeout)
            .build()?;

        Ok(HttpUploadApi {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            request_timeout: self.request_timeout,
        })
    }
}

/// Upload API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUploadApi {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpUploadApi {
    /// Starts building a client for the API rooted at `base_url`
    /// (e.g. `https://files.example.com/api`).
    pub fn builder(base_url: impl Into<String>) -> HttpUploadApiBuilder {
        HttpUploadApiBuilder {
            base_url: base_url.into(),
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates an unauthenticated client with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, UploadError> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// Posts a JSON body and decodes a JSON response.
    async fn post_json<Req, Resp>(&self, endpoint: Endpoint, body: &Req) -> Result<Resp, UploadError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut request = self.http.post(self.url(endpoint)).json(body);
        if endpoint.has_timeout() {
            request = request.timeout(self.request_timeout);
        }

        let resp = request.send().await?;
        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl UploadApi for HttpUploadApi {
    fn init_upload(&self, req: &InitUploadRequest) -> ApiFuture<'_, InitUploadResponse> {
        let req = req.clone();
        Box::pin(async move { self.post_json(Endpoint::Init, &req).await })
    }

    fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u64,
        data: Bytes,
        progress: Arc<ChunkProgress>,
    ) -> ApiFuture<'_, ()> {
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let len = data.len() as u64;
            let part = Part::stream_with_length(progress_body(data, progress), len)
                .file_name("blob")
                .mime_str("application/octet-stream")?;
            let form = Form::new()
                .text(FIELD_UPLOAD_ID, upload_id.clone())
                .text(FIELD_CHUNK_INDEX, chunk_index.to_string())
                .part(FIELD_CHUNK, part);

            let resp = self
                .http
                .post(self.url(Endpoint::Chunk))
                .multipart(form)
                .timeout(self.request_timeout)
                .send()
                .await?;
            check_status(resp).await?;

            debug!(upload_id = %upload_id, chunk = chunk_index, bytes = len, "chunk accepted");
            Ok(())
        })
    }

    fn finalize_upload(&self, req: &FinalizeUploadRequest) -> ApiFuture<'_, FinalizeUploadResponse> {
        let req = req.clone();
        Box::pin(async move { self.post_json(Endpoint::Finalize, &req).await })
    }

    fn cancel_upload(&self, upload_id: &str) -> ApiFuture<'_, CancelUploadResponse> {
        let req = CancelUploadRequest {
            upload_id: upload_id.to_string(),
        };
        Box::pin(async move { self.post_json(Endpoint::Cancel, &req).await })
    }
}

/// Wraps chunk bytes in a streaming body that reports each frame as sent.
fn progress_body(data: Bytes, progress: Arc<ChunkProgress>) -> reqwest::Body {
    let frames: Vec<Bytes> = (0..data.len())
        .step_by(PROGRESS_FRAME)
        .map(|start| data.slice(start..(start + PROGRESS_FRAME).min(data.len())))
        .collect();

    let mut sent = 0u64;
    let stream = futures_util::stream::iter(frames).map(move |frame| {
        sent += frame.len() as u64;
        progress.observe(sent);
        Ok::<_, std::io::Error>(frame)
    });
    reqwest::Body::wrap_stream(stream)
}

/// Turns a non-2xx response into [`UploadError::Api`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(UploadError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Picks the most useful message out of an error body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str())
                && !msg.is_empty()
            {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
