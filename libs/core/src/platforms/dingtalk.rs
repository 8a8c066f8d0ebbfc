use serde_json::{Value, json};

use super::{Endpoint, PlatformKind, WebhookPlatform, envelope, image_body};
use crate::error::{BridgeResult, require};
use crate::message::{Image, Link, Markdown, Mentions, TemplateCard, Text};

pub const DINGTALK_API_BASE: &str = "https://oapi.dingtalk.com/robot";

/// DingTalk custom robot: `access_token` credential, optional request signing,
/// `link` and `actionCard` messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DingTalk;

fn at_block(mentions: &Mentions) -> Value {
    json!({
        "atMobiles": mentions.mobiles,
        "atUserIds": mentions.user_ids,
        "isAtAll": mentions.all,
    })
}

fn with_at(mut payload: Value, mentions: &Mentions) -> Value {
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("at".into(), at_block(mentions));
    }
    payload
}

impl WebhookPlatform for DingTalk {
    fn kind(&self) -> PlatformKind {
        PlatformKind::DingTalk
    }

    fn default_base_url(&self) -> &'static str {
        DINGTALK_API_BASE
    }

    fn token_param(&self) -> &'static str {
        "access_token"
    }

    fn endpoint_path(&self, endpoint: Endpoint) -> &'static str {
        match endpoint {
            Endpoint::Send => "send",
            Endpoint::Upload => "upload_media",
        }
    }

    fn text(&self, msg: &Text) -> BridgeResult<Value> {
        require("content", &msg.content)?;
        Ok(with_at(
            envelope("text", json!({ "content": msg.content })),
            &msg.mentions,
        ))
    }

    fn markdown(&self, msg: &Markdown) -> BridgeResult<Value> {
        let title = msg.title.as_deref().unwrap_or_default();
        require("title", title)?;
        require("content", &msg.body)?;
        Ok(with_at(
            envelope(
                "markdown",
                json!({
                    "title": title,
                    "text": msg.body,
                }),
            ),
            &msg.mentions,
        ))
    }

    fn image(&self, msg: &Image) -> BridgeResult<Value> {
        image_body(msg)
    }

    fn link(&self, msg: &Link) -> BridgeResult<Value> {
        require("title", &msg.title)?;
        require("messageUrl", &msg.url)?;
        Ok(envelope(
            "link",
            json!({
                "title": msg.title,
                "text": msg.text,
                "messageUrl": msg.url,
                "picUrl": msg.pic_url.as_deref().unwrap_or_default(),
            }),
        ))
    }

    fn template_card(&self, msg: &TemplateCard) -> BridgeResult<Value> {
        let TemplateCard::Action(card) = msg else {
            return Err(super::unsupported(
                self.kind(),
                crate::message::MessageKind::TemplateCard,
            ));
        };
        require("title", &card.title)?;
        require("text", &card.text)?;
        require("singleTitle", &card.single_title)?;
        require("singleURL", &card.single_url)?;
        let orientation = if card.btn_orientation.is_empty() {
            "0"
        } else {
            card.btn_orientation.as_str()
        };
        Ok(envelope(
            "actionCard",
            json!({
                "title": card.title,
                "text": card.text,
                "singleTitle": card.single_title,
                "singleURL": card.single_url,
                "btnOrientation": orientation,
            }),
        ))
    }
}
