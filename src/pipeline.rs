//! The run stages, composed over a [`BlobStore`].
//!
//! ```text
//! generate:  check landing ─▶ load store ─▶ orchestrate ─▶ write bundle ─▶ append
//! publish:   load store ─▶ synthesize ─▶ publish
//! check:     load store ─▶ synthesize ─▶ prepare (no writes)
//! ```
//!
//! Generation validates everything it can before the model call and writes
//! the store last: the bundle sources live nowhere else, so a record is only
//! committed once its exercise files are on disk.
//!
//! Every stage reloads the store, so `publish` after `generate` in the same
//! process renders what was actually persisted.

use crate::blob::BlobStore;
use crate::config::SiteConfig;
use crate::generator::{ContentService, GenerateError, Orchestrator};
use crate::publish::{PlannedWrite, PublishError, PublishReport, Publisher};
use crate::store::{ContentStore, StoreError};
use crate::synth::{Synthesis, synthesize_entries};
use crate::types::ContentRecord;
use chrono::NaiveDate;
use rand::Rng;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Failed to write exercise bundle to {dir}: {source}")]
    Bundle {
        dir: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of the generate stage.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub record: ContentRecord,
    pub attempt: u32,
    pub store_key: String,
    pub store_len: usize,
    pub bundle_files: Vec<String>,
}

/// Result of the publish stage.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub synthesis: Synthesis,
    pub report: PublishReport,
}

/// Result of a dry run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub records: usize,
    pub synthesis: Synthesis,
    pub planned: Vec<PlannedWrite>,
}

/// Generate today's challenge, write its bundle, then persist the record.
pub async fn run_generate<S, B, R>(
    blobs: &B,
    config: &SiteConfig,
    orchestrator: &Orchestrator<S>,
    today: NaiveDate,
    rng: &mut R,
) -> Result<GenerateOutcome, PipelineError>
where
    S: ContentService,
    B: BlobStore,
    R: Rng + ?Sized,
{
    Publisher::new(blobs).check_landing(&config.paths.index)?;

    let mut store = ContentStore::load(blobs, config.paths.store.as_str())?;
    info!(key = %store.key(), records = store.len(), "Loaded store");
    let date = today.format("%Y-%m-%d").to_string();
    if store.contains_date(&date) {
        return Err(GenerateError::AlreadyGenerated(date).into());
    }

    let generated = orchestrator.generate(&store.records(), today, rng).await?;

    let bundle_files = generated
        .bundle
        .write_to(blobs, &config.paths.bundle_dir)
        .map_err(|source| PipelineError::Bundle {
            dir: config.paths.bundle_dir.clone(),
            source,
        })?;

    store.append(generated.record.clone())?;
    info!(date = %generated.record.date, records = store.len(), "Appended challenge");

    Ok(GenerateOutcome {
        record: generated.record,
        attempt: generated.attempt,
        store_key: store.key().to_string(),
        store_len: store.len(),
        bundle_files,
    })
}

/// Re-render the site from the store and write whatever changed.
pub fn run_publish<B: BlobStore>(
    blobs: &B,
    config: &SiteConfig,
) -> Result<PublishOutcome, PipelineError> {
    let store = ContentStore::load(blobs, config.paths.store.as_str())?;
    let synthesis = synthesize_entries(store.entries(), config);
    let report = Publisher::new(blobs).publish(&synthesis)?;
    Ok(PublishOutcome { synthesis, report })
}

/// Load, render and splice without writing anything.
pub fn check<B: BlobStore>(blobs: &B, config: &SiteConfig) -> Result<CheckReport, PipelineError> {
    let store = ContentStore::load(blobs, config.paths.store.as_str())?;
    let synthesis = synthesize_entries(store.entries(), config);
    let planned = Publisher::new(blobs).prepare(&synthesis)?;
    Ok(CheckReport {
        records: store.len(),
        synthesis,
        planned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::generator::contract::tests::{response_with, valid_input};
    use crate::generator::{ServiceError, ServiceRequest, ServiceResponse};
    use crate::synth::{CHALLENGE_END, CHALLENGE_START};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io;

    struct FixedService;

    impl ContentService for FixedService {
        async fn submit(&self, _request: &ServiceRequest) -> Result<ServiceResponse, ServiceError> {
            Ok(response_with(valid_input()))
        }
    }

    fn landing() -> String {
        format!("<body>{CHALLENGE_START}{CHALLENGE_END}</body>")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    /// Fails every write under `prefix`.
    struct FailingUnder {
        inner: MemoryBlobStore,
        prefix: &'static str,
    }

    impl BlobStore for FailingUnder {
        fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
            if key.starts_with(self.prefix) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.inner.write(key, bytes)
        }
    }

    #[tokio::test]
    async fn generate_appends_and_writes_bundle() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap();

        assert_eq!(outcome.record.date, "2026-04-09");
        assert_eq!(outcome.store_len, 1);
        assert_eq!(outcome.bundle_files.len(), 6);
        let stored = ContentStore::load(&blobs, "challenges.json").unwrap();
        assert_eq!(stored.latest(), Some(outcome.record.clone()));
        assert!(blobs.text("challenge-output/challenge.ts").is_some());
    }

    #[tokio::test]
    async fn second_generate_same_day_is_refused() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);

        run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap();
        let err = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Generate(GenerateError::AlreadyGenerated(_))
        ));
        assert_eq!(ContentStore::load(&blobs, "challenges.json").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecodable_entry_for_today_blocks_generation() {
        let blobs = MemoryBlobStore::new()
            .with_blob("index.html", landing())
            .with_blob("challenges.json", r#"[{"date": "2026-04-09", "name": "Hand Edited"}]"#);
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);

        let err = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Generate(GenerateError::AlreadyGenerated(_))
        ));
        assert_eq!(blobs.keys().len(), 2);
    }

    #[tokio::test]
    async fn markerless_landing_page_persists_nothing() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", "<html>no markers</html>");
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);

        let err = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Publish(PublishError::Splice { .. })
        ));
        assert!(blobs.text("challenges.json").is_none());
        assert_eq!(blobs.keys(), vec!["index.html".to_string()]);
    }

    #[tokio::test]
    async fn bundle_write_failure_leaves_store_unchanged() {
        let blobs = FailingUnder {
            inner: MemoryBlobStore::new().with_blob("index.html", landing()),
            prefix: "challenge-output/",
        };
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);

        let err = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Bundle { .. }));
        assert!(blobs.inner.text("challenges.json").is_none());
    }

    #[tokio::test]
    async fn publish_renders_persisted_records() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let config = SiteConfig::default();
        let orchestrator = Orchestrator::new(FixedService, config.generator.clone());
        let mut rng = StdRng::seed_from_u64(1);
        let generated = run_generate(&blobs, &config, &orchestrator, day(9), &mut rng)
            .await
            .unwrap();

        let outcome = run_publish(&blobs, &config).unwrap();

        assert_eq!(outcome.report.written.len(), 3);
        assert!(
            blobs
                .text("index.html")
                .unwrap()
                .contains(&generated.record.description)
        );
    }

    #[test]
    fn check_writes_nothing() {
        let blobs = MemoryBlobStore::new()
            .with_blob("index.html", landing())
            .with_blob("challenges.json", "[]");
        let config = SiteConfig::default();

        let err = check(&blobs, &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Publish(PublishError::NoHomeFragment)
        ));
        assert_eq!(blobs.keys().len(), 2);
    }

    #[test]
    fn publish_skips_hand_edited_entries() {
        let store = r#"[
  {"date": "2026-04-07", "name": "Event Bus", "difficulty": "easy", "description": "d", "snippet": "s"},
  {"date": "2026-04-08", "name": "Lost Snippet", "difficulty": "Hard", "description": "d"},
  {"date": "2026-04-09", "name": "Retry Queue", "difficulty": "Medium", "description": "d", "snippet": "s"}
]"#;
        let blobs = MemoryBlobStore::new()
            .with_blob("index.html", landing())
            .with_blob("challenges.json", store);

        let outcome = run_publish(&blobs, &SiteConfig::default()).unwrap();

        assert_eq!(outcome.synthesis.skipped.len(), 1);
        assert_eq!(outcome.synthesis.skipped[0].title, "Lost Snippet");
        assert!(blobs.text("archive/2026-04-07/event-bus.html").is_some());
        assert!(blobs.text("index.html").unwrap().contains("Retry Queue"));
        assert_eq!(blobs.text("challenges.json").unwrap(), store);
    }

    #[test]
    fn malformed_store_is_fatal() {
        let blobs = MemoryBlobStore::new()
            .with_blob("index.html", landing())
            .with_blob("challenges.json", "{not json");
        let err = run_publish(&blobs, &SiteConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Json { .. })));
        assert_eq!(blobs.text("index.html").unwrap(), landing());
    }
}
