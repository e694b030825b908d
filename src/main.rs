//! storecheck - Run the entity store conformance suites
//!
//! Runs the selected suites one after another against a backend, then hands
//! the backend to the shutdown coordinator, which closes it once every suite
//! has signalled completion (or the retry budget runs out).
//!
//! Exit status is non-zero when any suite fails.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use storecheck::{
    CompletionTracker, EntityStore, HarnessConfig, MemoryStore, MemoryStoreConfig,
    ShutdownCoordinator, ShutdownReport, SuiteKind, SuiteReport, APP_NAME, APP_VERSION,
    SHUTDOWN_POLL_INTERVAL_MS_MAX, SHUTDOWN_RETRY_COUNT_MAX,
};

#[cfg(feature = "postgres")]
use storecheck::PostgresStore;

// =============================================================================
// CLI
// =============================================================================

/// Conformance suites for pluggable entity-storage backends
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Verify an entity-storage backend against the store contract")]
#[command(version)]
struct Cli {
    /// Suite to run; repeat for several (default: STORECHECK_SUITES, else all)
    #[arg(short, long, value_enum)]
    suite: Vec<SuiteKind>,

    /// Backend merges saved fields instead of replacing them
    #[arg(long)]
    merge: bool,

    /// Run against PostgreSQL instead of the in-memory store
    #[cfg(feature = "postgres")]
    #[arg(long)]
    postgres_url: Option<String>,

    /// Shutdown poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Shutdown polls before closing regardless
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Apply flags on top of the environment configuration.
    fn apply(&self, config: &mut HarnessConfig) -> anyhow::Result<()> {
        if self.merge {
            config.settings.must_merge = true;
        }
        if !self.suite.is_empty() {
            config.suites = self.suite.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            anyhow::ensure!(
                ms <= SHUTDOWN_POLL_INTERVAL_MS_MAX,
                "--poll-interval-ms {ms} exceeds {SHUTDOWN_POLL_INTERVAL_MS_MAX}"
            );
            config.shutdown.poll_interval = Duration::from_millis(ms);
        }
        if let Some(limit) = self.retry_limit {
            anyhow::ensure!(
                limit <= SHUTDOWN_RETRY_COUNT_MAX,
                "--retry-limit {limit} exceeds {SHUTDOWN_RETRY_COUNT_MAX}"
            );
            config.shutdown.retry_limit = limit;
        }
        Ok(())
    }
}

// =============================================================================
// Backend selection
// =============================================================================

async fn open_store(cli: &Cli, config: &mut HarnessConfig) -> anyhow::Result<Arc<dyn EntityStore>> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &cli.postgres_url {
        let store = PostgresStore::new(url)
            .await?
            .with_merge(config.settings.must_merge);
        config.settings.raw_queries = PostgresStore::raw_queries();
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "postgres"))]
    let _ = cli;

    Ok(Arc::new(MemoryStore::with_config(MemoryStoreConfig {
        merge: config.settings.must_merge,
    })))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("storecheck v{}", APP_VERSION);

    let mut config = HarnessConfig::from_env()?;
    cli.apply(&mut config)?;

    let store = open_store(&cli, &mut config).await?;
    tracing::info!(
        backend = store.name(),
        must_merge = config.settings.must_merge,
        "backend ready"
    );

    let suites: Vec<SuiteKind> = config
        .suites
        .iter()
        .copied()
        .filter(|kind| {
            let runnable = !kind.requires_raw_queries() || store.supports_raw_queries();
            if !runnable {
                tracing::warn!(suite = %kind, backend = store.name(), "skipped: no raw query support");
            }
            runnable
        })
        .collect();

    let tracker = CompletionTracker::new();
    let signals: Vec<_> = suites
        .iter()
        .map(|kind| (*kind, tracker.signal(kind.name())))
        .collect();
    let expected = signals.len();

    // Suites share namespaces, so they run in order on one task.
    let runner = tokio::spawn({
        let store = Arc::clone(&store);
        let settings = config.settings.clone();
        async move {
            let mut reports = Vec::with_capacity(signals.len());
            for (kind, signal) in signals {
                reports.push(
                    kind.run_signaled(Arc::clone(&store), settings.clone(), signal)
                        .await,
                );
            }
            reports
        }
    });

    let shutdown = ShutdownCoordinator::new(tracker, config.shutdown)
        .close(store.as_ref(), expected)
        .await;
    let reports = runner.await?;

    summarize(&reports);
    conclude(&reports, &shutdown, store.name())
}

/// Report an early close, then fail if any suite failed.
fn conclude(
    reports: &[SuiteReport],
    shutdown: &ShutdownReport,
    backend: &str,
) -> anyhow::Result<()> {
    let closed_early = if shutdown.confirmed {
        String::new()
    } else {
        tracing::warn!(
            completed = shutdown.completed,
            expected = shutdown.expected,
            "store closed before every suite confirmed completion"
        );
        format!(
            "; store closed early after {} of {} suites",
            shutdown.completed, shutdown.expected
        )
    };

    let failed = reports.iter().filter(|r| !r.passed()).count();
    anyhow::ensure!(
        failed == 0,
        "{failed} of {} suites failed against {backend}{closed_early}",
        reports.len()
    );
    Ok(())
}

fn summarize(reports: &[SuiteReport]) {
    for report in reports {
        match &report.failure {
            None => tracing::info!(
                suite = %report.suite,
                steps = report.passed_count(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "PASSED"
            ),
            Some(failure) => tracing::error!(
                suite = %report.suite,
                step = %failure.step,
                error = %failure.error,
                "FAILED"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storecheck::SuiteSettings;

    fn shutdown(confirmed: bool) -> ShutdownReport {
        ShutdownReport {
            confirmed,
            completed: 1,
            expected: 2,
            retries: 11,
            close_error: None,
        }
    }

    #[tokio::test]
    async fn test_conclude_reports_early_close_with_failures() {
        let failing = SuiteKind::RawQuery
            .run(Arc::new(MemoryStore::new()), SuiteSettings::default())
            .await;

        let err = conclude(&[failing.clone()], &shutdown(false), "memory").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 of 1 suites failed against memory"), "{message}");
        assert!(message.contains("closed early after 1 of 2 suites"), "{message}");

        let err = conclude(&[failing], &shutdown(true), "memory").unwrap_err();
        assert!(!err.to_string().contains("closed early"));
    }

    #[tokio::test]
    async fn test_conclude_passes_when_every_suite_passes() {
        let passing = SuiteKind::Sort
            .run(Arc::new(MemoryStore::new()), SuiteSettings::default())
            .await;
        assert!(conclude(&[passing.clone()], &shutdown(true), "memory").is_ok());
        assert!(conclude(&[passing], &shutdown(false), "memory").is_ok());
    }
}
