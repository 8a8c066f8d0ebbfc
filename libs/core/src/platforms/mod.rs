//! Per-service payload strategies sharing one dispatch skeleton.

use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::error::{BridgeError, BridgeResult};
use crate::message::{
    Image, Link, Markdown, Message, MessageKind, News, TemplateCard, Text,
};

pub mod dingtalk;
pub mod wecom;

pub use dingtalk::DingTalk;
pub use wecom::WeCom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    DingTalk,
    WeCom,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::DingTalk => "dingtalk",
            PlatformKind::WeCom => "wecom",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dingtalk" | "dingding" => Ok(PlatformKind::DingTalk),
            "wecom" | "wework" => Ok(PlatformKind::WeCom),
            other => Err(format!("unknown platform `{other}`")),
        }
    }
}

/// Which robot endpoint a call targets. Chosen per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Send,
    Upload,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Send => "send",
            Endpoint::Upload => "upload",
        }
    }
}

/// Payload strategy for one webhook service: one method per message kind.
///
/// Kinds a service does not offer keep the default implementation, which
/// fails locally with [`BridgeError::Unsupported`].
pub trait WebhookPlatform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    fn default_base_url(&self) -> &'static str;

    /// Query parameter that carries the access token.
    fn token_param(&self) -> &'static str;

    fn endpoint_path(&self, endpoint: Endpoint) -> &'static str;

    /// Whether the service verifies `timestamp`/`sign` parameters.
    fn signs_requests(&self) -> bool {
        true
    }

    fn text(&self, _msg: &Text) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::Text))
    }

    fn markdown(&self, _msg: &Markdown) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::Markdown))
    }

    fn image(&self, _msg: &Image) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::Image))
    }

    fn link(&self, _msg: &Link) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::Link))
    }

    fn news(&self, _msg: &News) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::News))
    }

    fn template_card(&self, _msg: &TemplateCard) -> BridgeResult<Value> {
        Err(unsupported(self.kind(), MessageKind::TemplateCard))
    }

    fn render(&self, msg: &Message) -> BridgeResult<Value> {
        match msg {
            Message::Text(m) => self.text(m),
            Message::Markdown(m) => self.markdown(m),
            Message::Image(m) => self.image(m),
            Message::Link(m) => self.link(m),
            Message::News(m) => self.news(m),
            Message::TemplateCard(m) => self.template_card(m),
        }
    }
}

pub(crate) fn unsupported(platform: PlatformKind, kind: MessageKind) -> BridgeError {
    BridgeError::Unsupported { platform, kind }
}

/// `{"msgtype": tag, tag: body}`
pub(crate) fn envelope(tag: &str, body: Value) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("msgtype".into(), Value::String(tag.to_string()));
    obj.insert(tag.to_string(), body);
    Value::Object(obj)
}

pub(crate) fn image_body(msg: &Image) -> BridgeResult<Value> {
    crate::error::require("base64", &msg.base64)?;
    crate::error::require("md5", &msg.md5)?;
    Ok(envelope(
        "image",
        json!({
            "base64": msg.base64,
            "md5": msg.md5,
        }),
    ))
}
