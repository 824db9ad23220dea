//! Submits one document package to the batch intake service.
//!
//! Usage: `intake-submit <package.zip> [part-count]`

mod config;

use std::sync::Arc;

use anyhow::Context;
use intake_certs::{CacheConfig, CertificateMaterialCache};
use intake_client::IntakeClient;
use intake_session::{SessionEncryptionPlanner, SessionTransferOrchestrator, TransferEvent};
use tracing_subscriber::EnvFilter;

use config::SubmitConfig;

const USAGE: &str = "usage: intake-submit <package.zip> [part-count]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let package_path = args.next().context(USAGE)?;
    let part_count_arg = args
        .next()
        .map(|s| s.parse::<usize>())
        .transpose()
        .context("part count must be a positive number")?;

    let config = SubmitConfig::load()?;
    let payload = tokio::fs::read(&package_path)
        .await
        .with_context(|| format!("failed to read {package_path}"))?;

    let part_count = match part_count_arg.or(config.part_count) {
        Some(n) => n,
        None => intake_transfer::recommended_part_count(payload.len() as u64)?,
    };

    let client = Arc::new(IntakeClient::new(&config.client_config())?);
    let cache = Arc::new(CertificateMaterialCache::new(
        client.clone(),
        CacheConfig::default(),
    ));
    cache
        .warmup()
        .await
        .context("failed to load service certificates")?;

    let mut orchestrator = SessionTransferOrchestrator::new(
        SessionEncryptionPlanner::new(cache.clone()),
        client.clone(),
        client,
        config.transfer_config(),
    );

    if let Some(mut events) = orchestrator.take_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                log_event(event);
            }
        });
    }

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling transfer");
            cancel.cancel();
        }
    });

    tracing::info!(
        path = %package_path,
        size = payload.len(),
        parts = part_count,
        "submitting package"
    );
    let result = orchestrator.transfer(&payload, part_count).await;
    cache.shutdown().await;
    let status = result?;

    match status.failure_kind() {
        None => {
            tracing::info!(
                successful = status.successful_count,
                failed = status.failed_count,
                "session accepted"
            );
            Ok(())
        }
        Some(kind) => {
            for detail in &status.details {
                tracing::error!(%detail, "session detail");
            }
            anyhow::bail!(
                "session rejected with status {} ({kind:?}): {}",
                status.code,
                status.description
            )
        }
    }
}

fn log_event(event: TransferEvent) {
    match event {
        TransferEvent::PhaseChanged { phase } => tracing::debug!(%phase, "phase changed"),
        TransferEvent::SessionOpened {
            reference_number,
            parts,
        } => tracing::info!(%reference_number, parts, "session opened"),
        TransferEvent::PartUploaded {
            ordinal,
            size_bytes,
        } => tracing::info!(ordinal, size_bytes, "part uploaded"),
        TransferEvent::PartFailed { ordinal, error } => {
            tracing::warn!(ordinal, %error, "part upload failed")
        }
        TransferEvent::StatusPolled { code, description } => {
            tracing::debug!(code, %description, "status polled")
        }
    }
}
