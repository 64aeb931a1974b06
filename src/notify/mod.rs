// src/notify/mod.rs
//! Report-ready notification capability.
//!
//! The sink is resolved once at startup (`sink_from_env`) and defaults to
//! `NoopSink`, so the run itself never branches on notifier availability.

pub mod telegram;

use anyhow::Result;
use std::path::Path;

pub use telegram::TelegramSink;

#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    async fn on_report_ready(&self, report_path: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Sink used when no notification channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait::async_trait]
impl ReportSink for NoopSink {
    async fn on_report_ready(&self, _report_path: &Path) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Telegram when `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_IDS` are set, else no-op.
pub fn sink_from_env() -> Box<dyn ReportSink> {
    match TelegramSink::from_env() {
        Some(tg) => {
            tracing::info!(target: "digest", chats = tg.chat_count(), "telegram notifications enabled");
            Box::new(tg)
        }
        None => {
            tracing::debug!(target: "digest", "notifications disabled (no telegram config)");
            Box::new(NoopSink)
        }
    }
}

/// Hand the report to the sink. Failures are logged and never propagated.
pub async fn dispatch(sink: &dyn ReportSink, report_path: &Path) -> bool {
    match sink.on_report_ready(report_path).await {
        Ok(()) => {
            tracing::info!(target: "digest", sink = sink.name(), "notification sent");
            true
        }
        Err(e) => {
            tracing::warn!(target: "digest", sink = sink.name(), error = ?e, "notification failed");
            false
        }
    }
}
