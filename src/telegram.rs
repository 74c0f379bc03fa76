//! Telegram Bot API message source.

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::Credentials;

/// `getUpdates` refuses larger batches.
pub const MAX_UPDATES: u16 = 100;

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Texts (bodies and captions) of the most recent messages, at most `limit`.
    async fn recent_texts(&self, limit: u16) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct BotApiSource {
    client: reqwest::Client,
    endpoint: Url,
    chat: ChatFilter,
}

impl BotApiSource {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        credentials: &Credentials,
    ) -> anyhow::Result<Self> {
        let endpoint = updates_endpoint(api_base, &credentials.token)?;
        Ok(Self {
            client,
            endpoint,
            chat: ChatFilter::parse(&credentials.chat_id),
        })
    }
}

/// `{base}/bot{token}/getUpdates`. The token is part of the path, so this URL
/// must never be logged.
fn updates_endpoint(api_base: &str, token: &str) -> anyhow::Result<Url> {
    let api_base = api_base.trim_end_matches('/');
    Url::parse(&format!("{api_base}/bot{token}/getUpdates"))
        .map_err(|err| anyhow::anyhow!("build Telegram endpoint from {api_base}: {err}"))
}

#[async_trait]
impl MessageSource for BotApiSource {
    async fn recent_texts(&self, limit: u16) -> anyhow::Result<Vec<String>> {
        let requested = limit;
        let limit = limit.clamp(1, MAX_UPDATES);
        if limit != requested {
            tracing::debug!(requested, limit, "clamped update batch size");
        }

        // A negative offset selects the newest updates of the pending queue;
        // without it the Bot API answers with the oldest ones.
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("offset", &(-i64::from(limit)).to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair(
                "allowed_updates",
                r#"["message","edited_message","channel_post","edited_channel_post"]"#,
            );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("GET getUpdates")?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("read getUpdates body")?;

        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(&raw)
            .with_context(|| format!("parse getUpdates response ({status})"))?;
        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| "no description".to_owned());
            anyhow::bail!("Telegram API error ({status}): {description}");
        }

        let updates = envelope.result.unwrap_or_default();
        let texts = texts_for_chat(&updates, &self.chat);
        tracing::info!(
            updates = updates.len(),
            messages = texts.len(),
            "fetched channel messages"
        );
        Ok(texts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatFilter {
    Id(i64),
    Username(String),
}

impl ChatFilter {
    fn parse(chat_id: &str) -> Self {
        let chat_id = chat_id.trim();
        match chat_id.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Username(chat_id.trim_start_matches('@').to_ascii_lowercase()),
        }
    }

    fn matches(&self, chat: &Chat) -> bool {
        match self {
            Self::Id(id) => chat.id == *id,
            Self::Username(name) => chat
                .username
                .as_deref()
                .is_some_and(|username| username.eq_ignore_ascii_case(name)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    edited_message: Option<Message>,
    #[serde(default)]
    channel_post: Option<Message>,
    #[serde(default)]
    edited_channel_post: Option<Message>,
}

impl Update {
    fn messages(&self) -> impl Iterator<Item = &Message> {
        [
            &self.message,
            &self.edited_message,
            &self.channel_post,
            &self.edited_channel_post,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

fn texts_for_chat(updates: &[Update], chat: &ChatFilter) -> Vec<String> {
    updates
        .iter()
        .flat_map(Update::messages)
        .filter(|message| chat.matches(&message.chat))
        .flat_map(|message| [message.text.as_deref(), message.caption.as_deref()])
        .flatten()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
        .collect()
}
