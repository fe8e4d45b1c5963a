use crate::types::{Destination, Entry, NotifyError, RelayError, Result};
use async_trait::async_trait;
use interfaces::Notifier;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Newspaper emoji that opens every message.
pub const MESSAGE_MARKER: &str = "\u{1F4F0}";
/// "GPT summary"
pub const SUMMARY_LABEL: &str = "GPT 요약";

/// The message layout channels already receive; keep it byte-for-byte.
pub fn compose_message(entry: &Entry, summary: &str) -> String {
    format!(
        "{}  |  {}\n\n{}: {}\n\n{}",
        MESSAGE_MARKER, entry.title, SUMMARY_LABEL, summary, entry.link
    )
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    name: Option<String>,
}

/// Discord bot posting through the REST API.
pub struct DiscordNotifier {
    client: Client,
    bot_token: String,
    api_base: String,
}

impl DiscordNotifier {
    pub fn new(client: Client, bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Name of the bot account the token belongs to.
    pub async fn current_user(&self) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .header("Authorization", self.authorization())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(RelayError::General(format!("Discord API returned HTTP {}: {}", status, error_text)));
        }

        let user: DiscordUser = resp.json().await?;
        Ok(user.username)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, destination: Destination, message: &str) -> std::result::Result<(), NotifyError> {
        let url = format!("{}/channels/{}/messages", self.api_base, destination);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.authorization())
            .json(&json!({ "content": message }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                destination,
                reason: e.to_string(),
            })?;

        match resp.status() {
            status if status.is_success() => Ok(()),
            StatusCode::FORBIDDEN => Err(NotifyError::PermissionDenied { destination }),
            status => {
                let error_text = resp.text().await.unwrap_or_default();
                Err(NotifyError::DeliveryFailed {
                    destination,
                    reason: format!("HTTP {}: {}", status, error_text),
                })
            }
        }
    }

    async fn describe(&self, destination: Destination) -> Option<String> {
        let resp = self
            .client
            .get(format!("{}/channels/{}", self.api_base, destination))
            .header("Authorization", self.authorization())
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            debug!("Channel lookup for {} returned HTTP {}", destination, resp.status());
            return None;
        }

        resp.json::<DiscordChannel>().await.ok()?.name
    }
}
