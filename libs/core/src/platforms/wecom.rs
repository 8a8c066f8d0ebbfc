use serde_json::{Value, json};

use super::{Endpoint, PlatformKind, WebhookPlatform, envelope, image_body};
use crate::error::{BridgeResult, require};
use crate::message::{Image, Markdown, MessageKind, News, TemplateCard, Text};

pub const WECOM_API_BASE: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook";

const MENTION_ALL: &str = "@all";

/// WeCom group robot: `key` credential, no request signing, multi-article
/// `news` and `template_card` messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeCom;

impl WebhookPlatform for WeCom {
    fn kind(&self) -> PlatformKind {
        PlatformKind::WeCom
    }

    fn default_base_url(&self) -> &'static str {
        WECOM_API_BASE
    }

    fn token_param(&self) -> &'static str {
        "key"
    }

    fn endpoint_path(&self, endpoint: Endpoint) -> &'static str {
        match endpoint {
            Endpoint::Send => "send",
            Endpoint::Upload => "upload_media",
        }
    }

    fn signs_requests(&self) -> bool {
        false
    }

    fn text(&self, msg: &Text) -> BridgeResult<Value> {
        require("content", &msg.content)?;
        let mut mentioned = msg.mentions.user_ids.clone();
        if msg.mentions.all && !mentioned.iter().any(|id| id == MENTION_ALL) {
            mentioned.push(MENTION_ALL.to_string());
        }
        Ok(envelope(
            "text",
            json!({
                "content": msg.content,
                "mentioned_list": mentioned,
                "mentioned_mobile_list": msg.mentions.mobiles,
            }),
        ))
    }

    fn markdown(&self, msg: &Markdown) -> BridgeResult<Value> {
        require("content", &msg.body)?;
        Ok(envelope("markdown", json!({ "content": msg.body })))
    }

    fn image(&self, msg: &Image) -> BridgeResult<Value> {
        image_body(msg)
    }

    fn news(&self, msg: &News) -> BridgeResult<Value> {
        if msg.articles.is_empty() {
            return Err(crate::error::BridgeError::empty("articles"));
        }
        for article in &msg.articles {
            require("title", &article.title)?;
            require("url", &article.url)?;
        }
        Ok(envelope("news", json!({ "articles": msg.articles })))
    }

    fn template_card(&self, msg: &TemplateCard) -> BridgeResult<Value> {
        let TemplateCard::Notice(card) = msg else {
            return Err(super::unsupported(self.kind(), MessageKind::TemplateCard));
        };
        require("card_type", &card.card_type)?;
        require("main_title", &card.main_title)?;
        Ok(envelope(
            "template_card",
            json!({
                "card_type": card.card_type,
                "main_title": {
                    "title": card.main_title,
                    "desc": card.main_desc,
                },
                "card_action": {
                    "type": card.card_action.kind,
                    "url": card.card_action.url,
                    "appid": card.card_action.appid,
                    "pagepath": card.card_action.pagepath,
                },
            }),
        ))
    }
}
