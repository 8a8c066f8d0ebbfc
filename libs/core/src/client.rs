use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::credentials::Credentials;
use crate::error::{BridgeError, BridgeResult, require};
use crate::message::{Article, Image, Link, Markdown, Mentions, Message, News, TemplateCard, Text};
use crate::platforms::{Endpoint, WebhookPlatform};
use crate::signing::{SignedQuery, compute_signature};
use crate::transport::{MediaUpload, ReqwestTransport, TransportResponse, WebhookTransport};

/// Media id returned by uploads in dry-run mode.
pub const DRY_RUN_MEDIA_ID: &str = "dry-run-media-id";

const MAX_ERROR_BODY: usize = 512;

/// Opaque identifier of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId(String);

impl MediaId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    media_id: Option<String>,
}

enum RequestBody<'a> {
    Json(&'a Value),
    Multipart(MediaUpload),
}

/// Webhook robot client for one channel.
///
/// Immutable after construction; every call builds its own URL, signature and
/// body, so a shared client is safe to use from concurrent tasks.
pub struct WebhookClient<P> {
    platform: P,
    credentials: Credentials,
    transport: Arc<dyn WebhookTransport>,
    timeout: Option<Duration>,
    dry_run: bool,
}

impl<P: WebhookPlatform> WebhookClient<P> {
    pub fn new(platform: P, credentials: Credentials) -> Self {
        Self {
            platform,
            credentials,
            transport: Arc::new(ReqwestTransport::default()),
            timeout: None,
            dry_run: false,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn WebhookTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates and renders every call but never touches the transport.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn secret(&self) -> Option<&str> {
        if self.platform.signs_requests() {
            self.credentials.signing_secret()
        } else {
            None
        }
    }

    /// Signature for `timestamp_ms`, or `None` when signing is disabled.
    pub fn compute_signature(&self, timestamp_ms: i64) -> Option<String> {
        compute_signature(self.secret(), timestamp_ms)
    }

    /// Unsigned URL for `endpoint`, credential included.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        let base = if self.credentials.base_url.is_empty() {
            self.platform.default_base_url()
        } else {
            self.credentials.base_url.as_str()
        };
        let mut url = format!(
            "{}/{}?{}={}",
            base.trim_end_matches('/'),
            self.platform.endpoint_path(endpoint),
            self.platform.token_param(),
            urlencoding::encode(&self.credentials.access_token),
        );
        if endpoint == Endpoint::Upload {
            url.push_str("&type=file");
        }
        url
    }

    fn request_url(&self, endpoint: Endpoint) -> String {
        let mut url = self.endpoint_url(endpoint);
        if let Some(query) = SignedQuery::now(self.secret()) {
            query.append_to(&mut url);
        }
        url
    }

    pub async fn send(&self, msg: &Message) -> BridgeResult<()> {
        let payload = self.platform.render(msg)?;
        let kind = msg.kind();

        if self.dry_run {
            info!(
                platform = %self.platform.kind(),
                kind = %kind,
                payload = %payload,
                "dry run: webhook message not sent"
            );
            return Ok(());
        }

        self.dispatch(Endpoint::Send, RequestBody::Json(&payload))
            .await?;
        debug!(platform = %self.platform.kind(), kind = %kind, "webhook message sent");
        Ok(())
    }

    pub async fn send_text(&self, content: impl Into<String>, mentions: Mentions) -> BridgeResult<()> {
        self.send(&Message::Text(Text {
            content: content.into(),
            mentions,
        }))
        .await
    }

    pub async fn send_markdown(
        &self,
        title: Option<String>,
        body: impl Into<String>,
        mentions: Mentions,
    ) -> BridgeResult<()> {
        self.send(&Message::Markdown(Markdown {
            title,
            body: body.into(),
            mentions,
        }))
        .await
    }

    pub async fn send_image(
        &self,
        base64: impl Into<String>,
        md5: impl Into<String>,
    ) -> BridgeResult<()> {
        self.send(&Message::Image(Image {
            base64: base64.into(),
            md5: md5.into(),
        }))
        .await
    }

    pub async fn send_link(&self, link: Link) -> BridgeResult<()> {
        self.send(&Message::Link(link)).await
    }

    pub async fn send_news(&self, articles: Vec<Article>) -> BridgeResult<()> {
        self.send(&Message::News(News { articles })).await
    }

    pub async fn send_template_card(&self, card: TemplateCard) -> BridgeResult<()> {
        self.send(&Message::TemplateCard(card)).await
    }

    /// Uploads a file and returns the media id the service assigned to it.
    ///
    /// The multipart filename is the path exactly as given, not its base name.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> BridgeResult<MediaId> {
        let path = path.as_ref();
        let file_name = path.to_string_lossy().into_owned();
        require("file_path", &file_name)?;

        if self.dry_run {
            info!(
                platform = %self.platform.kind(),
                file = %file_name,
                "dry run: file not uploaded"
            );
            return Ok(MediaId(DRY_RUN_MEDIA_ID.to_string()));
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let size = bytes.len();

        let reply = self
            .dispatch(
                Endpoint::Upload,
                RequestBody::Multipart(MediaUpload { file_name, bytes }),
            )
            .await?;
        let media_id = reply
            .media_id
            .filter(|id| !id.is_empty())
            .ok_or(BridgeError::MissingMediaId)?;
        debug!(platform = %self.platform.kind(), size, "webhook file uploaded");
        Ok(MediaId(media_id))
    }

    async fn dispatch(
        &self,
        endpoint: Endpoint,
        body: RequestBody<'_>,
    ) -> BridgeResult<WebhookReply> {
        let url = self.request_url(endpoint);
        let response = match body {
            RequestBody::Json(payload) => {
                self.transport.post_json(&url, payload, self.timeout).await?
            }
            RequestBody::Multipart(upload) => {
                self.transport
                    .post_multipart(&url, upload, self.timeout)
                    .await?
            }
        };
        debug!(
            platform = %self.platform.kind(),
            endpoint = %endpoint.as_str(),
            status = response.status.as_u16(),
            "webhook request answered"
        );
        self.interpret(response)
    }

    fn interpret(&self, response: TransportResponse) -> BridgeResult<WebhookReply> {
        let TransportResponse { status, body } = response;
        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(BridgeError::Status { status, body: text });
        }

        let reply: WebhookReply = serde_json::from_slice(&body).map_err(BridgeError::Decode)?;
        if reply.errcode != 0 {
            return Err(BridgeError::Remote {
                platform: self.platform.kind(),
                code: reply.errcode,
                message: reply.errmsg,
            });
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ActionCard, CardAction, NoticeCard};
    use crate::platforms::{DingTalk, WeCom};
    use crate::transport::{RecordedRequest, RecordingTransport};
    use reqwest::StatusCode;

    fn dingtalk(secret: Option<&str>, transport: Arc<RecordingTransport>) -> WebhookClient<DingTalk> {
        WebhookClient::new(
            DingTalk,
            Credentials::new("https://robot.test/robot", "tok-1", secret.map(String::from)),
        )
        .with_transport(transport)
    }

    fn wecom(transport: Arc<RecordingTransport>) -> WebhookClient<WeCom> {
        WebhookClient::new(
            WeCom,
            Credentials::new("https://robot.test/webhook/", "key-1", None),
        )
        .with_transport(transport)
    }

    fn dingtalk_messages() -> Vec<Message> {
        vec![
            Message::text("hello"),
            Message::markdown(Some("Title".into()), "# body"),
            Message::Image(Image {
                base64: "SGVsbG8=".into(),
                md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            }),
            Message::Link(Link {
                title: "Test News".into(),
                text: "Test Description".into(),
                url: "https://example.com".into(),
                pic_url: Some("https://example.com/image.jpg".into()),
            }),
            Message::TemplateCard(TemplateCard::Action(ActionCard {
                title: "Card".into(),
                text: "Body".into(),
                single_title: "View".into(),
                single_url: "https://example.com".into(),
                btn_orientation: "0".into(),
            })),
        ]
    }

    fn wecom_messages() -> Vec<Message> {
        vec![
            Message::text("hello"),
            Message::markdown(None, "## Hello"),
            Message::Image(Image {
                base64: "SGVsbG8=".into(),
                md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            }),
            Message::News(News {
                articles: vec![Article {
                    title: "News Title".into(),
                    description: "News Description".into(),
                    url: "https://example.com".into(),
                    pic_url: String::new(),
                }],
            }),
            Message::TemplateCard(TemplateCard::Notice(NoticeCard {
                card_type: "text_notice".into(),
                main_title: "Main Title".into(),
                main_desc: "Main Description".into(),
                card_action: CardAction {
                    kind: 1,
                    url: "https://example.com".into(),
                    ..Default::default()
                },
            })),
        ]
    }

    #[test]
    fn builds_endpoint_urls_per_call() {
        let client = wecom(Arc::new(RecordingTransport::ok()));
        assert_eq!(
            client.endpoint_url(Endpoint::Send),
            "https://robot.test/webhook/send?key=key-1"
        );
        assert_eq!(
            client.endpoint_url(Endpoint::Upload),
            "https://robot.test/webhook/upload_media?key=key-1&type=file"
        );
    }

    #[test]
    fn empty_base_url_falls_back_to_service_default() {
        let client = WebhookClient::new(DingTalk, Credentials::new("", "abc", None));
        assert_eq!(
            client.endpoint_url(Endpoint::Send),
            "https://oapi.dingtalk.com/robot/send?access_token=abc"
        );
    }

    #[test]
    fn signature_follows_secret_and_platform() {
        let transport = Arc::new(RecordingTransport::ok());
        let signed = dingtalk(Some("SECret"), transport.clone());
        let first = signed.compute_signature(1_700_000_000_000).unwrap();
        assert_eq!(signed.compute_signature(1_700_000_000_000).unwrap(), first);

        assert!(dingtalk(None, transport.clone()).compute_signature(1).is_none());
        assert!(dingtalk(Some(""), transport.clone()).compute_signature(1).is_none());

        let wecom_with_secret = WebhookClient::new(
            WeCom,
            Credentials::new("https://robot.test", "k", Some("SECret".into())),
        )
        .with_transport(transport);
        assert!(wecom_with_secret.compute_signature(1).is_none());
    }

    #[tokio::test]
    async fn unsigned_requests_carry_no_signature_params() {
        let transport = Arc::new(RecordingTransport::ok());
        dingtalk(None, transport.clone())
            .send(&Message::text("hi"))
            .await
            .unwrap();
        let url = transport.requests()[0].url().to_string();
        assert_eq!(url, "https://robot.test/robot/send?access_token=tok-1");
        assert!(!url.contains("timestamp="));
        assert!(!url.contains("sign="));
    }

    #[tokio::test]
    async fn signed_requests_reuse_one_timestamp() {
        let transport = Arc::new(RecordingTransport::ok());
        let client = dingtalk(Some("SECret"), transport.clone());
        client.send(&Message::text("hi")).await.unwrap();

        let url = transport.requests()[0].url().to_string();
        let query = url.split_once('?').unwrap().1;
        let params: Vec<(&str, &str)> = query
            .split('&')
            .map(|kv| kv.split_once('=').unwrap())
            .collect();
        let ts: i64 = params
            .iter()
            .find(|(k, _)| *k == "timestamp")
            .unwrap()
            .1
            .parse()
            .unwrap();
        let sign = params.iter().find(|(k, _)| *k == "sign").unwrap().1;
        let expected = client.compute_signature(ts).unwrap();
        assert_eq!(urlencoding::decode(sign).unwrap(), expected);
    }

    #[tokio::test]
    async fn every_send_succeeds_on_errcode_zero() {
        let transport = Arc::new(RecordingTransport::ok());
        let client = dingtalk(None, transport.clone());
        for msg in dingtalk_messages() {
            client.send(&msg).await.unwrap();
        }
        let wecom_transport = Arc::new(RecordingTransport::ok());
        let client = wecom(wecom_transport.clone());
        for msg in wecom_messages() {
            client.send(&msg).await.unwrap();
        }
        assert_eq!(transport.calls(), 5);
        assert_eq!(wecom_transport.calls(), 5);
    }

    #[tokio::test]
    async fn every_send_reports_remote_errmsg() {
        let body = r#"{"errcode":123,"errmsg":"boom"}"#;
        let transport = Arc::new(RecordingTransport::new(StatusCode::OK, body));
        let client = dingtalk(None, transport.clone());
        for msg in dingtalk_messages() {
            let err = client.send(&msg).await.expect_err("remote failure");
            assert!(matches!(err, BridgeError::Remote { code: 123, .. }));
            assert!(err.to_string().contains("boom"));
        }

        let transport = Arc::new(RecordingTransport::new(StatusCode::OK, body));
        let client = wecom(transport);
        for msg in wecom_messages() {
            let err = client.send(&msg).await.expect_err("remote failure");
            assert!(err.to_string().contains("boom"));
        }
    }

    #[tokio::test]
    async fn server_error_is_a_status_failure_whatever_the_body() {
        let transport = Arc::new(RecordingTransport::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"errcode":0,"errmsg":"ok"}"#,
        ));
        let err = dingtalk(None, transport)
            .send(&Message::text("hi"))
            .await
            .expect_err("500");
        match err {
            BridgeError::Status { status, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_reply_is_a_protocol_error() {
        let transport = Arc::new(RecordingTransport::new(StatusCode::OK, "<html>oops</html>"));
        let err = wecom(transport)
            .send(&Message::text("hi"))
            .await
            .expect_err("not json");
        assert!(matches!(err, BridgeError::Decode(_)));
        assert_eq!(err.code(), "protocol");
    }

    #[tokio::test]
    async fn missing_errcode_counts_as_success() {
        let transport = Arc::new(RecordingTransport::new(StatusCode::OK, "{}"));
        dingtalk(None, transport)
            .send(&Message::text("hi"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validation_fails_before_any_request() {
        let transport = Arc::new(RecordingTransport::ok());
        let client = dingtalk(None, transport.clone());
        let invalid = vec![
            Message::text(""),
            Message::markdown(Some("t".into()), ""),
            Message::markdown(Some(String::new()), "body"),
            Message::Image(Image {
                base64: String::new(),
                md5: "x".into(),
            }),
            Message::Image(Image {
                base64: "x".into(),
                md5: String::new(),
            }),
            Message::Link(Link {
                title: String::new(),
                text: String::new(),
                url: "https://example.com".into(),
                pic_url: None,
            }),
            Message::TemplateCard(TemplateCard::Action(ActionCard {
                title: "t".into(),
                text: String::new(),
                single_title: "s".into(),
                single_url: "u".into(),
                btn_orientation: String::new(),
            })),
        ];
        for msg in &invalid {
            let err = client.send(msg).await.expect_err("invalid message");
            assert!(err.is_local(), "{err}");
        }
        let err = client.upload_file("").await.expect_err("empty path");
        assert!(matches!(err, BridgeError::Validation { field: "file_path" }));
        assert_eq!(transport.calls(), 0);

        let transport = Arc::new(RecordingTransport::ok());
        let client = wecom(transport.clone());
        for msg in [
            Message::text(""),
            Message::markdown(None, ""),
            Message::News(News { articles: vec![] }),
        ] {
            assert!(client.send(&msg).await.unwrap_err().is_local());
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn dry_run_never_reaches_transport() {
        let transport = Arc::new(RecordingTransport::ok());
        let client = dingtalk(Some("SECret"), transport.clone()).with_dry_run(true);
        for msg in dingtalk_messages() {
            client.send(&msg).await.unwrap();
        }
        let media = client.upload_file("does/not/exist.txt").await.unwrap();
        assert_eq!(media.as_str(), DRY_RUN_MEDIA_ID);
        assert!(client.send(&Message::text("")).await.is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn dry_run_logs_rendered_payload() {
        let client = wecom(Arc::new(RecordingTransport::ok())).with_dry_run(true);
        client.send(&Message::text("dry hello")).await.unwrap();
        assert!(logs_contain("dry run: webhook message not sent"));
        assert!(logs_contain("dry hello"));
    }

    #[tokio::test]
    async fn upload_posts_file_bytes_under_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, b"Hello, WeCom!").unwrap();

        let transport = Arc::new(RecordingTransport::new(
            StatusCode::OK,
            r#"{"errcode":0,"errmsg":"ok","type":"file","media_id":"3a8asd892asd8asd"}"#,
        ));
        let media = wecom(transport.clone()).upload_file(&path).await.unwrap();
        assert_eq!(media.as_str(), "3a8asd892asd8asd");

        match &transport.requests()[0] {
            RecordedRequest::Multipart { url, upload } => {
                assert_eq!(url, "https://robot.test/webhook/upload_media?key=key-1&type=file");
                assert_eq!(upload.bytes, b"Hello, WeCom!");
                assert_eq!(upload.file_name, path.to_string_lossy());
            }
            other => panic!("expected multipart upload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_an_io_error() {
        let transport = Arc::new(RecordingTransport::ok());
        let err = wecom(transport.clone())
            .upload_file("/definitely/not/here.bin")
            .await
            .expect_err("missing file");
        assert!(matches!(err, BridgeError::Io { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn upload_without_media_id_is_a_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let transport = Arc::new(RecordingTransport::ok());
        let err = dingtalk(None, transport)
            .upload_file(&path)
            .await
            .expect_err("no media id");
        assert!(matches!(err, BridgeError::MissingMediaId));
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let transport = Arc::new(RecordingTransport::new(
            StatusCode::BAD_GATEWAY,
            "é".repeat(600),
        ));
        let err = wecom(transport).send(&Message::text("x")).await.unwrap_err();
        let BridgeError::Status { body, .. } = err else {
            panic!("expected status error");
        };
        assert!(body.len() <= MAX_ERROR_BODY);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_sent() {
        let transport = Arc::new(RecordingTransport::ok());
        let client = dingtalk(None, transport.clone());
        client.send(&Message::text(" ")).await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let RecordedRequest::Json { payload, .. } = &requests[0] else {
            panic!("expected json request");
        };
        assert_eq!(payload["text"]["content"], " ");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn dispatch_logs_the_endpoint() {
        let transport = Arc::new(RecordingTransport::new(
            StatusCode::OK,
            r#"{"errcode":0,"errmsg":"ok","media_id":"m-7"}"#,
        ));
        let client = wecom(transport);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"a").unwrap();
        client.upload_file(&path).await.unwrap();
        assert!(logs_contain("webhook request answered"));
        assert!(logs_contain("endpoint=upload"));
    }
}
