use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::alert::{AlertRecord, AlertSink};

const DISCORD_CONTENT_LIMIT: usize = 2000;
const TRUNCATION_SUFFIX: &str = "\n... (truncated)";

pub(crate) struct DiscordAlertSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

#[async_trait]
impl AlertSink for DiscordAlertSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, record: &AlertRecord) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(record) }))
            .send()
            .await
            // reqwest errors embed the URL, which carries the webhook secret.
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "discord webhook returned status {}",
                response.status()
            ));
        }

        Ok(())
    }
}

pub(crate) fn render(record: &AlertRecord) -> String {
    let identity = &record.identity;
    let mut lines = vec![
        format!(
            "**{}** `{}` `{}` `{}`",
            identity.service_name,
            identity.stage,
            identity.component,
            record.level.as_str()
        ),
        format!(
            "`{}` `{}`{}",
            record.occurred_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.target,
            record
                .location
                .as_ref()
                .map(|loc| format!(" `{loc}`"))
                .unwrap_or_default()
        ),
    ];

    if let Some(message) = record.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !record.span_path.is_empty() {
        lines.push(format!("spans: `{}`", record.span_path.join(" > ")));
    }

    for (key, value) in &record.fields {
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let keep = DISCORD_CONTENT_LIMIT - TRUNCATION_SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}
