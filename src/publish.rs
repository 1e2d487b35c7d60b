//! Writes a [`Synthesis`] into the site root.
//!
//! Publishing happens in two phases. [`Publisher::prepare`] reads the landing
//! page, splices the home fragment and diffs every artifact against what is
//! already stored; any failure there (missing markers, no renderable latest
//! record) aborts before a single byte is written. [`Publisher::publish`] then
//! writes only the artifacts whose content changed, landing page last.
//!
//! Writes are not transactional across blobs. If one fails partway, the
//! archive and detail pages already written stay updated while the landing
//! page still shows the previous card; rerunning publish converges.
//!
//! [`Publisher::check_landing`] runs the marker validation on its own so the
//! generate stage can refuse to persist anything for a site it cannot publish.

use crate::blob::BlobStore;
use crate::synth::{ArtifactKind, SpliceError, Synthesis, splice_fragment};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Landing page {0} does not exist")]
    MissingIndex(String),
    #[error("Landing page {0} is not valid UTF-8")]
    NotUtf8(String),
    #[error("No renderable latest challenge to place on the landing page")]
    NoHomeFragment,
    #[error("Cannot update {key}: {source}")]
    Splice {
        key: String,
        #[source]
        source: SpliceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    New,
    Changed,
    Unchanged,
}

/// One blob the publisher intends to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub key: String,
    pub content: String,
    pub status: WriteStatus,
}

/// Outcome of [`Publisher::publish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
}

pub struct Publisher<B> {
    blobs: B,
}

impl<B: BlobStore> Publisher<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    /// Compute every write without performing any.
    pub fn prepare(&self, synthesis: &Synthesis) -> Result<Vec<PlannedWrite>, PublishError> {
        let home = synthesis
            .home_fragment()
            .ok_or(PublishError::NoHomeFragment)?;
        let index_key = home.target.clone();
        let document = self.landing_document(&index_key)?;
        let spliced =
            splice_fragment(&document, &home.content).map_err(|source| PublishError::Splice {
                key: index_key.clone(),
                source,
            })?;

        let mut planned = Vec::with_capacity(synthesis.artifacts.len());
        for artifact in synthesis
            .artifacts
            .iter()
            .filter(|a| a.kind != ArtifactKind::HomeFragment)
        {
            planned.push(self.plan_write(&artifact.target, artifact.content.clone())?);
        }
        planned.push(PlannedWrite {
            status: if spliced == document {
                WriteStatus::Unchanged
            } else {
                WriteStatus::Changed
            },
            key: index_key,
            content: spliced,
        });
        Ok(planned)
    }

    /// Write every changed artifact.
    pub fn publish(&self, synthesis: &Synthesis) -> Result<PublishReport, PublishError> {
        let planned = self.prepare(synthesis)?;
        let mut report = PublishReport::default();
        for write in planned {
            if write.status == WriteStatus::Unchanged {
                debug!(key = %write.key, "Unchanged, skipping");
                report.unchanged.push(write.key);
                continue;
            }
            self.blobs
                .write(&write.key, write.content.as_bytes())
                .map_err(|source| PublishError::Io {
                    key: write.key.clone(),
                    source,
                })?;
            debug!(key = %write.key, status = ?write.status, "Wrote artifact");
            report.written.push(write.key);
        }
        info!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            "Published site"
        );
        Ok(report)
    }

    /// Fail unless the landing page exists and carries both sentinels.
    pub fn check_landing(&self, index_key: &str) -> Result<(), PublishError> {
        let document = self.landing_document(index_key)?;
        splice_fragment(&document, "")
            .map(|_| ())
            .map_err(|source| PublishError::Splice {
                key: index_key.to_string(),
                source,
            })
    }

    fn landing_document(&self, index_key: &str) -> Result<String, PublishError> {
        self.read_text(index_key)?
            .ok_or_else(|| PublishError::MissingIndex(index_key.to_string()))
    }

    fn plan_write(&self, key: &str, content: String) -> Result<PlannedWrite, PublishError> {
        let status = match self.read_bytes(key)? {
            None => WriteStatus::New,
            Some(existing) if existing == content.as_bytes() => WriteStatus::Unchanged,
            Some(_) => WriteStatus::Changed,
        };
        Ok(PlannedWrite {
            key: key.to_string(),
            content,
            status,
        })
    }

    fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, PublishError> {
        self.blobs.read(key).map_err(|source| PublishError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn read_text(&self, key: &str) -> Result<Option<String>, PublishError> {
        self.read_bytes(key)?
            .map(|bytes| String::from_utf8(bytes).map_err(|_| PublishError::NotUtf8(key.to_string())))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::config::SiteConfig;
    use crate::synth::{CHALLENGE_END, CHALLENGE_START, synthesize};
    use crate::types::{ContentRecord, Difficulty};

    fn record(date: &str, title: &str) -> ContentRecord {
        ContentRecord {
            date: date.to_string(),
            title: title.to_string(),
            difficulty: Difficulty::Medium,
            description: "desc".to_string(),
            snippet: "type X = 1;".to_string(),
            goals: vec![],
            hints: vec![],
            docs: vec![],
        }
    }

    fn landing() -> String {
        format!("<html><body>\n    {CHALLENGE_START}\n    {CHALLENGE_END}\n</body></html>\n")
    }

    fn synthesis(records: &[ContentRecord]) -> Synthesis {
        synthesize(records, &SiteConfig::default())
    }

    #[test]
    fn publish_writes_every_artifact() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let publisher = Publisher::new(&blobs);

        let report = publisher
            .publish(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap();

        assert_eq!(
            report.written,
            vec![
                "archive.html".to_string(),
                "archive/2026-05-01/event-bus.html".to_string(),
                "index.html".to_string(),
            ]
        );
        assert!(report.unchanged.is_empty());
        let index = blobs.text("index.html").unwrap();
        assert!(index.starts_with("<html><body>\n    "));
        assert!(index.contains("Event Bus"));
        assert!(index.ends_with(&format!("{CHALLENGE_END}\n</body></html>\n")));
    }

    #[test]
    fn republish_skips_unchanged() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let publisher = Publisher::new(&blobs);
        let s = synthesis(&[record("2026-05-01", "Event Bus")]);

        publisher.publish(&s).unwrap();
        let report = publisher.publish(&s).unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.unchanged.len(), 3);
    }

    #[test]
    fn new_record_rewrites_only_what_changed() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let publisher = Publisher::new(&blobs);
        let mut records = vec![record("2026-05-01", "Event Bus")];
        publisher.publish(&synthesis(&records)).unwrap();

        records.push(record("2026-05-02", "Retry Queue"));
        let report = publisher.publish(&synthesis(&records)).unwrap();

        assert_eq!(
            report.written,
            vec![
                "archive.html".to_string(),
                "archive/2026-05-02/retry-queue.html".to_string(),
                "index.html".to_string(),
            ]
        );
        assert_eq!(report.unchanged, vec!["archive/2026-05-01/event-bus.html".to_string()]);
    }

    #[test]
    fn missing_markers_abort_before_any_write() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", "<html>no markers</html>");
        let publisher = Publisher::new(&blobs);

        let err = publisher
            .publish(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::Splice {
                source: SpliceError::MissingStart,
                ..
            }
        ));
        assert_eq!(blobs.keys(), vec!["index.html".to_string()]);
        assert_eq!(blobs.text("index.html").unwrap(), "<html>no markers</html>");
    }

    #[test]
    fn missing_landing_page_is_fatal() {
        let blobs = MemoryBlobStore::new();
        let err = Publisher::new(&blobs)
            .publish(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingIndex(ref key) if key == "index.html"));
        assert!(blobs.keys().is_empty());
    }

    #[test]
    fn empty_synthesis_is_fatal() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let err = Publisher::new(&blobs).publish(&synthesis(&[])).unwrap_err();
        assert!(matches!(err, PublishError::NoHomeFragment));
    }

    #[test]
    fn prepare_reports_statuses_without_writing() {
        let blobs = MemoryBlobStore::new().with_blob("index.html", landing());
        let planned = Publisher::new(&blobs)
            .prepare(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap();

        let statuses: Vec<_> = planned.iter().map(|w| w.status).collect();
        assert_eq!(
            statuses,
            vec![WriteStatus::New, WriteStatus::New, WriteStatus::Changed]
        );
        assert_eq!(blobs.keys(), vec!["index.html".to_string()]);
    }

    struct IndexWriteFails(MemoryBlobStore);

    impl BlobStore for IndexWriteFails {
        fn read(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
            self.0.read(key)
        }

        fn write(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
            if key == "index.html" {
                return Err(std::io::Error::other("disk full"));
            }
            self.0.write(key, bytes)
        }
    }

    #[test]
    fn failed_landing_write_leaves_pages_updated() {
        let blobs = IndexWriteFails(MemoryBlobStore::new().with_blob("index.html", landing()));

        let err = Publisher::new(&blobs)
            .publish(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap_err();

        assert!(matches!(err, PublishError::Io { ref key, .. } if key == "index.html"));
        assert!(blobs.0.text("archive.html").is_some());
        assert!(blobs.0.text("archive/2026-05-01/event-bus.html").is_some());
        assert_eq!(blobs.0.text("index.html").unwrap(), landing());
        // Rerunning against a healthy store converges.
        Publisher::new(&blobs.0)
            .publish(&synthesis(&[record("2026-05-01", "Event Bus")]))
            .unwrap();
        assert!(blobs.0.text("index.html").unwrap().contains("Event Bus"));
    }

    #[test]
    fn check_landing_validates_markers_only() {
        let blobs = MemoryBlobStore::new()
            .with_blob("index.html", landing())
            .with_blob("bare.html", format!("<html>{CHALLENGE_START}</html>"));
        let publisher = Publisher::new(&blobs);

        assert!(publisher.check_landing("index.html").is_ok());
        assert!(matches!(
            publisher.check_landing("bare.html"),
            Err(PublishError::Splice {
                source: SpliceError::MissingEnd,
                ..
            })
        ));
        assert!(matches!(
            publisher.check_landing("missing.html"),
            Err(PublishError::MissingIndex(_))
        ));
        assert_eq!(blobs.text("index.html").unwrap(), landing());
    }
}
