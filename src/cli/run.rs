use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::gdocs::{GDocsClient, Theme};
use crate::ledger::{Ledger, LedgerLock};
use crate::notify;
use crate::pipeline::Pipeline;
use crate::summarizer::GeminiSummarizer;
use crate::zoom::ZoomClient;

/// One scheduled batch: lock the ledger, process the lookback window and
/// record what was published.
pub async fn handle_run_command(config: Config) -> Result<()> {
    config.validate()?;

    let ledger_path = config.ledger_path()?;
    let _lock = LedgerLock::acquire(&ledger_path)?;
    let mut ledger = Ledger::load(&ledger_path)?;

    let theme = Theme::from_kind(config.document.theme, config.document.font_family.clone());
    let source = ZoomClient::new(&config.zoom)?;
    let publisher = GDocsClient::new(&config.google, theme)?;
    let notifier = notify::from_config(&config.discord)?;

    let mut pipeline = Pipeline::new(
        Box::new(source),
        Box::new(publisher),
        notifier,
        &config.zoom.transcript_language,
    )?;
    if let Some(summarizer) = GeminiSummarizer::from_config(&config.gemini)? {
        info!("Gemini fallback summaries enabled");
        pipeline = pipeline.with_summarizer(Box::new(summarizer));
    }

    let today = Utc::now().date_naive();
    pipeline
        .run(&mut ledger, today, config.zoom.lookback_days)
        .await?;
    Ok(())
}
