//! Outbound message model. Each variant is rendered into exactly one JSON
//! shape by the target platform.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentions {
    #[serde(default)]
    pub mobiles: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub all: bool,
}

impl Mentions {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub content: String,
    pub mentions: Mentions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markdown {
    pub title: Option<String>,
    pub body: String,
    pub mentions: Mentions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub base64: String,
    pub md5: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub title: String,
    pub text: String,
    pub url: String,
    pub pic_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, rename = "picurl")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct News {
    pub articles: Vec<Article>,
}

/// Single-button card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCard {
    pub title: String,
    pub text: String,
    pub single_title: String,
    pub single_url: String,
    /// `"0"` stacks buttons vertically, `"1"` lays them out horizontally.
    pub btn_orientation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardAction {
    /// 0 = none, 1 = open url, 2 = open mini program.
    pub kind: i64,
    pub url: String,
    pub appid: String,
    pub pagepath: String,
}

/// Text-notice style template card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeCard {
    pub card_type: String,
    pub main_title: String,
    pub main_desc: String,
    pub card_action: CardAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateCard {
    Action(ActionCard),
    Notice(NoticeCard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(Text),
    Markdown(Markdown),
    Image(Image),
    Link(Link),
    News(News),
    TemplateCard(TemplateCard),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    Markdown,
    Image,
    Link,
    News,
    TemplateCard,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Markdown => "markdown",
            MessageKind::Image => "image",
            MessageKind::Link => "link",
            MessageKind::News => "news",
            MessageKind::TemplateCard => "template_card",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Text(_) => MessageKind::Text,
            Message::Markdown(_) => MessageKind::Markdown,
            Message::Image(_) => MessageKind::Image,
            Message::Link(_) => MessageKind::Link,
            Message::News(_) => MessageKind::News,
            Message::TemplateCard(_) => MessageKind::TemplateCard,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Message::Text(Text {
            content: content.into(),
            mentions: Mentions::none(),
        })
    }

    pub fn markdown(title: Option<String>, body: impl Into<String>) -> Self {
        Message::Markdown(Markdown {
            title,
            body: body.into(),
            mentions: Mentions::none(),
        })
    }
}
