use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use super::ReportSink;

/// Telegram rejects messages above 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4096;
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramSink {
    token: String,
    chat_ids: Vec<String>,
    /// `owner/name`, used to link the committed report.
    repository: Option<String>,
    server_url: String,
    git_ref: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramSink {
    pub fn new(token: String, chat_ids: Vec<String>) -> Self {
        Self {
            token,
            chat_ids,
            repository: None,
            server_url: "https://github.com".to_string(),
            git_ref: "main".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// `None` unless both the bot token and at least one chat id are configured.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        let chat_ids = parse_chat_ids(&std::env::var("TELEGRAM_CHAT_IDS").unwrap_or_default());
        if chat_ids.is_empty() {
            return None;
        }
        let mut sink = Self::new(token, chat_ids);
        sink.repository = std::env::var("GITHUB_REPOSITORY").ok().filter(|r| !r.is_empty());
        if let Ok(url) = std::env::var("GITHUB_SERVER_URL") {
            sink.server_url = url;
        }
        if let Ok(r) = std::env::var("GITHUB_REF_NAME") {
            sink.git_ref = r;
        }
        Some(sink)
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_string());
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn chat_count(&self) -> usize {
        self.chat_ids.len()
    }

    /// Web link to the report in the repository, e.g. `.../blob/main/2024-03-05/supply-chain-report.md`.
    pub fn report_link(&self, report_path: &Path) -> Option<String> {
        let repo = self.repository.as_deref()?;
        let rel = relative_report_path(report_path);
        Some(format!(
            "{}/{}/blob/{}/{}",
            self.server_url.trim_end_matches('/'),
            repo,
            self.git_ref,
            rel
        ))
    }

    pub fn build_message(&self, report_path: &Path, report: &str) -> String {
        let mut header = format!(
            "Supply chain security report: {}",
            report_date(report_path).unwrap_or("latest")
        );
        if let Some(link) = self.report_link(report_path) {
            header.push('\n');
            header.push_str(&link);
        }
        header.push_str("\n\n");

        let room = MAX_MESSAGE_CHARS.saturating_sub(header.chars().count());
        if report.chars().count() <= room {
            header.push_str(report);
        } else {
            let body: String = report.chars().take(room.saturating_sub(4)).collect();
            header.push_str(&body);
            header.push_str("\n...");
        }
        header
    }

    /// Errors never carry the request URL: it embeds the bot token.
    async fn send_to(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        self.client
            .post(&url)
            .timeout(self.timeout)
            .json(&SendMessage {
                chat_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("telegram post")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("telegram non-2xx")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportSink for TelegramSink {
    async fn on_report_ready(&self, report_path: &Path) -> Result<()> {
        let report = tokio::fs::read_to_string(report_path)
            .await
            .with_context(|| format!("reading {}", report_path.display()))?;
        let text = self.build_message(report_path, &report);

        let mut failed = Vec::new();
        for chat_id in &self.chat_ids {
            if let Err(e) = self.send_to(chat_id, &text).await {
                tracing::warn!(target: "digest", chat_id = %chat_id, error = ?e, "telegram send failed");
                failed.push(chat_id.clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "telegram delivery failed for {} of {} chats",
                failed.len(),
                self.chat_ids.len()
            ))
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

pub fn parse_chat_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<date>/<file>`: the last two path components.
fn relative_report_path(report_path: &Path) -> String {
    let parts: Vec<_> = report_path
        .components()
        .rev()
        .take(2)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.into_iter().rev().collect::<Vec<_>>().join("/")
}

fn report_date(report_path: &Path) -> Option<&str> {
    report_path.parent()?.file_name()?.to_str()
}
