use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};

/// Multipart form field robots expect uploaded files under.
pub const MEDIA_FIELD: &str = "media";

/// A file staged for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw HTTP outcome; interpretation of status and body is left to the client.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// One POST per call, nothing retried. Implementations surface network
/// failures as [`BridgeError::Transport`].
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse>;

    async fn post_multipart(
        &self,
        url: &str,
        upload: MediaUpload,
        timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

async fn collect(response: reqwest::Response) -> BridgeResult<TransportResponse> {
    let status = response.status();
    let body = response.bytes().await.map_err(BridgeError::Transport)?;
    Ok(TransportResponse { status, body })
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse> {
        let mut request = self.http.post(url).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(BridgeError::Transport)?;
        collect(response).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        upload: MediaUpload,
        timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/octet-stream")
            .map_err(BridgeError::Transport)?;
        let form = Form::new().part(MEDIA_FIELD, part);
        let mut request = self.http.post(url).multipart(form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(BridgeError::Transport)?;
        collect(response).await
    }
}

/// Request captured by [`RecordingTransport`].
#[cfg(any(test, feature = "testkit"))]
#[derive(Debug, Clone)]
pub enum RecordedRequest {
    Json { url: String, payload: Value },
    Multipart { url: String, upload: MediaUpload },
}

#[cfg(any(test, feature = "testkit"))]
impl RecordedRequest {
    pub fn url(&self) -> &str {
        match self {
            RecordedRequest::Json { url, .. } | RecordedRequest::Multipart { url, .. } => url,
        }
    }
}

/// In-memory transport that records every call and answers with a canned response.
#[cfg(any(test, feature = "testkit"))]
pub struct RecordingTransport {
    requests: std::sync::Mutex<Vec<RecordedRequest>>,
    status: StatusCode,
    body: Bytes,
}

#[cfg(any(test, feature = "testkit"))]
impl RecordingTransport {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            requests: std::sync::Mutex::new(Vec::new()),
            status,
            body: body.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK, r#"{"errcode":0,"errmsg":"ok"}"#)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("transport lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("transport lock").len()
    }

    fn record(&self, request: RecordedRequest) -> TransportResponse {
        self.requests.lock().expect("transport lock").push(request);
        TransportResponse {
            status: self.status,
            body: self.body.clone(),
        }
    }
}

#[cfg(any(test, feature = "testkit"))]
#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        _timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse> {
        Ok(self.record(RecordedRequest::Json {
            url: url.to_string(),
            payload: payload.clone(),
        }))
    }

    async fn post_multipart(
        &self,
        url: &str,
        upload: MediaUpload,
        _timeout: Option<Duration>,
    ) -> BridgeResult<TransportResponse> {
        Ok(self.record(RecordedRequest::Multipart {
            url: url.to_string(),
            upload,
        }))
    }
}
