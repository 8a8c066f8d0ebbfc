//! Webhook robot clients for DingTalk and WeCom group chats.
//!
//! A [`WebhookClient`] pairs channel [`Credentials`] with a [`WebhookPlatform`]
//! strategy. Every call validates its input, renders one JSON (or multipart)
//! body, optionally signs the URL and performs a single POST whose
//! `{errcode, errmsg}` reply decides success.
pub mod client;
pub mod credentials;
pub mod error;
pub mod message;
pub mod platforms;
pub mod signing;
pub mod transport;

pub use client::{DRY_RUN_MEDIA_ID, MediaId, WebhookClient};
pub use credentials::Credentials;
pub use error::{BridgeError, BridgeResult};
pub use message::{
    ActionCard, Article, CardAction, Image, Link, Markdown, Mentions, Message, MessageKind, News,
    NoticeCard, TemplateCard, Text,
};
pub use platforms::{DingTalk, Endpoint, PlatformKind, WeCom, WebhookPlatform};
pub use signing::{SignedQuery, compute_signature};
pub use transport::{MEDIA_FIELD, MediaUpload, ReqwestTransport, TransportResponse, WebhookTransport};
#[cfg(any(test, feature = "testkit"))]
pub use transport::{RecordedRequest, RecordingTransport};
