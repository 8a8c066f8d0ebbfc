//! Tool catalogue and argument extraction. Arguments are only pulled out and
//! type-checked here; non-empty checks belong to the robot client.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::{Map, Value, json};
use wbb_core::{
    ActionCard, Article, CardAction, Image, Link, Markdown, Mentions, Message, NoticeCard,
    PlatformKind, TemplateCard, Text,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Send(Message),
    Upload(PathBuf),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("missing required argument `{0}`")]
    Missing(&'static str),
    #[error("argument `{name}` must be {expected}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },
}

fn schema(properties: Value, required: &[&str]) -> Arc<JsonObject> {
    let mut schema = JsonObject::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), properties);
    schema.insert("required".into(), json!(required));
    Arc::new(schema)
}

fn string_prop(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn mention_props(mut props: Value) -> Value {
    if let Some(obj) = props.as_object_mut() {
        obj.insert(
            "at_mobiles".into(),
            string_prop("Mobile numbers to mention, comma separated, e.g. 13800138000,13800138001"),
        );
        obj.insert(
            "at_user_ids".into(),
            string_prop("User IDs to mention, comma separated"),
        );
        obj.insert(
            "is_at_all".into(),
            json!({"type": "boolean", "description": "Whether to mention everyone in the group"}),
        );
    }
    props
}

fn text_tool(group: &'static str) -> Tool {
    Tool::new(
        "send_text",
        format!("Send a text message to the {group} group"),
        schema(
            mention_props(json!({"content": string_prop("Text content to send")})),
            &["content"],
        ),
    )
}

fn image_tool(group: &'static str) -> Tool {
    Tool::new(
        "send_image",
        format!("Send an image message to the {group} group"),
        schema(
            json!({
                "base64_data": string_prop("Base64 encoded image data"),
                "md5": string_prop("MD5 hash of the image before encoding"),
            }),
            &["base64_data", "md5"],
        ),
    )
}

fn upload_tool(group: &'static str) -> Tool {
    Tool::new(
        "upload_file",
        format!("Upload a file to {group}"),
        schema(
            json!({"file_path": string_prop("Path to the file to upload")}),
            &["file_path"],
        ),
    )
}

/// Tools offered for `platform`, in a stable order.
pub fn tool_specs(platform: PlatformKind) -> Vec<Tool> {
    match platform {
        PlatformKind::DingTalk => vec![
            text_tool("DingTalk"),
            Tool::new(
                "send_markdown",
                "Send a markdown message to the DingTalk group",
                schema(
                    mention_props(json!({
                        "title": string_prop("Title shown in the conversation list"),
                        "content": string_prop("Markdown content to send"),
                    })),
                    &["title", "content"],
                ),
            ),
            image_tool("DingTalk"),
            Tool::new(
                "send_news",
                "Send a link message to the DingTalk group",
                schema(
                    json!({
                        "title": string_prop("Title of the link message"),
                        "text": string_prop("Text content of the link message"),
                        "message_url": string_prop("URL opened when the message is clicked"),
                        "pic_url": string_prop("Picture URL of the link message"),
                    }),
                    &["title", "text", "message_url"],
                ),
            ),
            Tool::new(
                "send_template_card",
                "Send an action card message to the DingTalk group",
                schema(
                    json!({
                        "title": string_prop("Title of the action card"),
                        "text": string_prop("Markdown text of the action card"),
                        "single_title": string_prop("Title of the single button"),
                        "single_url": string_prop("URL opened by the single button"),
                        "btn_orientation": string_prop("Button orientation, 0: vertical, 1: horizontal"),
                    }),
                    &["title", "text", "single_title", "single_url"],
                ),
            ),
            upload_tool("DingTalk"),
        ],
        PlatformKind::WeCom => vec![
            text_tool("WeCom"),
            Tool::new(
                "send_markdown",
                "Send a markdown message to the WeCom group",
                schema(
                    json!({"content": string_prop("Markdown content to send")}),
                    &["content"],
                ),
            ),
            image_tool("WeCom"),
            Tool::new(
                "send_news",
                "Send a single-article news message to the WeCom group",
                schema(
                    json!({
                        "title": string_prop("Article title"),
                        "description": string_prop("Article description"),
                        "url": string_prop("URL opened when the article is clicked"),
                        "pic_url": string_prop("Picture URL of the article"),
                    }),
                    &["title", "url"],
                ),
            ),
            Tool::new(
                "send_template_card",
                "Send a text notice template card to the WeCom group",
                schema(
                    json!({
                        "card_type": string_prop("Card type, e.g. text_notice"),
                        "main_title": string_prop("Main title of the card"),
                        "main_desc": string_prop("Description under the main title"),
                        "card_action_type": {
                            "type": "integer",
                            "description": "Click action, 0: none, 1: open url, 2: open mini program",
                        },
                        "card_action_url": string_prop("URL opened when the card is clicked"),
                        "card_action_appid": string_prop("Mini program app id"),
                        "card_action_pagepath": string_prop("Mini program page path"),
                    }),
                    &["card_type", "main_title"],
                ),
            ),
            upload_tool("WeCom"),
        ],
    }
}

struct Args<'a>(&'a Map<String, Value>);

impl Args<'_> {
    fn opt_str(&self, name: &'static str) -> Result<Option<String>, ArgError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ArgError::WrongType {
                name,
                expected: "a string",
            }),
        }
    }

    fn str(&self, name: &'static str) -> Result<String, ArgError> {
        self.opt_str(name)?.ok_or(ArgError::Missing(name))
    }

    fn str_or_default(&self, name: &'static str) -> Result<String, ArgError> {
        Ok(self.opt_str(name)?.unwrap_or_default())
    }

    fn bool(&self, name: &'static str) -> Result<bool, ArgError> {
        let wrong = ArgError::WrongType {
            name,
            expected: "a boolean",
        };
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                _ => Err(wrong),
            },
            Some(_) => Err(wrong),
        }
    }

    fn int(&self, name: &'static str) -> Result<i64, ArgError> {
        let wrong = ArgError::WrongType {
            name,
            expected: "an integer",
        };
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => n.as_i64().ok_or(wrong),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| wrong),
            Some(_) => Err(wrong),
        }
    }

    /// Comma separated list; blanks between commas are dropped.
    fn list(&self, name: &'static str) -> Result<Vec<String>, ArgError> {
        Ok(split_list(&self.opt_str(name)?.unwrap_or_default()))
    }

    fn mentions(&self) -> Result<Mentions, ArgError> {
        Ok(Mentions {
            mobiles: self.list("at_mobiles")?,
            user_ids: self.list("at_user_ids")?,
            all: self.bool("is_at_all")?,
        })
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turns a `tools/call` request into a robot call for `platform`.
pub fn parse_call(
    platform: PlatformKind,
    name: &str,
    arguments: &Map<String, Value>,
) -> Result<ToolCall, ArgError> {
    let args = Args(arguments);
    let message = match (name, platform) {
        ("upload_file", _) => return Ok(ToolCall::Upload(PathBuf::from(args.str("file_path")?))),
        ("send_text", _) => Message::Text(Text {
            content: args.str("content")?,
            mentions: args.mentions()?,
        }),
        ("send_markdown", PlatformKind::DingTalk) => Message::Markdown(Markdown {
            title: Some(args.str("title")?),
            body: args.str("content")?,
            mentions: args.mentions()?,
        }),
        ("send_markdown", PlatformKind::WeCom) => Message::Markdown(Markdown {
            title: args.opt_str("title")?,
            body: args.str("content")?,
            mentions: Mentions::none(),
        }),
        ("send_image", _) => Message::Image(Image {
            base64: args.str("base64_data")?,
            md5: args.str("md5")?,
        }),
        ("send_news", PlatformKind::DingTalk) => Message::Link(Link {
            title: args.str("title")?,
            text: args.str("text")?,
            url: args.str("message_url")?,
            pic_url: args.opt_str("pic_url")?,
        }),
        ("send_news", PlatformKind::WeCom) => Message::News(wbb_core::News {
            articles: vec![Article {
                title: args.str("title")?,
                description: args.str_or_default("description")?,
                url: args.str("url")?,
                pic_url: args.str_or_default("pic_url")?,
            }],
        }),
        ("send_template_card", PlatformKind::DingTalk) => {
            Message::TemplateCard(TemplateCard::Action(ActionCard {
                title: args.str("title")?,
                text: args.str("text")?,
                single_title: args.str("single_title")?,
                single_url: args.str("single_url")?,
                btn_orientation: args
                    .opt_str("btn_orientation")?
                    .unwrap_or_else(|| "0".into()),
            }))
        }
        ("send_template_card", PlatformKind::WeCom) => {
            Message::TemplateCard(TemplateCard::Notice(NoticeCard {
                card_type: args.str("card_type")?,
                main_title: args.str("main_title")?,
                main_desc: args.str_or_default("main_desc")?,
                card_action: CardAction {
                    kind: args.int("card_action_type")?,
                    url: args.str_or_default("card_action_url")?,
                    appid: args.str_or_default("card_action_appid")?,
                    pagepath: args.str_or_default("card_action_pagepath")?,
                },
            }))
        }
        (other, _) => return Err(ArgError::UnknownTool(other.to_string())),
    };
    Ok(ToolCall::Send(message))
}

/// Human readable label used in tool result text.
pub fn describe(name: &str) -> &'static str {
    match name {
        "send_text" => "text message",
        "send_markdown" => "markdown message",
        "send_image" => "image message",
        "send_news" => "news message",
        "send_template_card" => "template card message",
        _ => "message",
    }
}
