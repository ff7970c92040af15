use async_trait::async_trait;
use hadx_core::config::TelegramConfig;
use hadx_core::notify::error::NotifyError;
use hadx_core::notify::port::Notifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const API_URL: &str = "https://api.telegram.org";
const CHANNEL: &str = "telegram";

/// Maximum length of a single `sendMessage` text.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// # Summary
/// A notifier implementation that sends messages via Telegram Bot API.
///
/// # Invariants
/// * `bot_token` and `chat_id` are non-empty.
/// * Messages longer than `MAX_MESSAGE_LEN` are sent as several ordered parts.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    base_url: String,
    client: reqwest::Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Error body returned by the Bot API.
#[derive(Deserialize, Default)]
struct TelegramErrorBody {
    #[serde(default)]
    description: String,
    parameters: Option<TelegramErrorParameters>,
}

#[derive(Deserialize)]
struct TelegramErrorParameters {
    retry_after: Option<u64>,
}

impl TelegramNotifier {
    /// # Summary
    /// Creates a new `TelegramNotifier`.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    /// * `chat_id` - The target chat ID to send messages to.
    ///
    /// # Returns
    /// * `Err(NotifyError::Config)` if either credential is empty or the HTTP client cannot be built.
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() {
            return Err(NotifyError::Config("telegram bot_token is empty".to_string()));
        }
        if chat_id.trim().is_empty() {
            return Err(NotifyError::Config("telegram chat_id is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            bot_token,
            chat_id,
            base_url: API_URL.to_string(),
            client,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        Self::new(config.bot_token.clone(), config.chat_id.clone())
    }

    /// Points the notifier at a different Bot API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: TelegramErrorBody = response.json().await.unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = body
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or(1);
            warn!(retry_after, "telegram rate limit hit");
            return Err(NotifyError::RateLimited { retry_after });
        }

        Err(NotifyError::Rejected {
            channel: CHANNEL,
            reason: format!("{} {}", status.as_u16(), body.description),
        })
    }
}

/// Escapes the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// # Summary
/// Splits a message into parts no longer than `limit` characters.
///
/// # Logic
/// 1. Greedily packs whole lines into each part.
/// 2. A single line longer than `limit` is cut at character boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut chunks = chars.chunks(limit).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                parts.push(piece);
            } else {
                current_len = chunk.len();
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL
    }

    /// # Summary
    /// Sends a notification to the configured Telegram chat.
    ///
    /// # Logic
    /// 1. Escapes subject and content, formatting the subject in bold.
    /// 2. Splits the text into parts within the API limit.
    /// 3. Sends the parts in order, stopping at the first failure.
    ///
    /// # Returns
    /// * `Err(NotifyError::RateLimited)` when the API answers 429.
    /// * `Err(NotifyError::Rejected)` for any other non-success status.
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError> {
        let text = format!("*{}*\n{}", escape_markdown(subject), escape_markdown(content));
        let parts = split_message(&text, MAX_MESSAGE_LEN);

        for (i, part) in parts.iter().enumerate() {
            self.send(part).await?;
            debug!(part = i + 1, total = parts.len(), "telegram message sent");
        }
        Ok(())
    }
}
