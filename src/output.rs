//! CLI output formatting for every stage.
//!
//! Output is **challenge-centric**: each record is shown by date and title
//! first, with the blob it landed in as an indented secondary line.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! 2026-03-14 [Medium] Typed Retry Queue
//!     Attempt: 2
//!     Store: challenges.json (12 challenges)
//!     Bundle: 6 files
//! ```
//!
//! ## Publish
//!
//! ```text
//! Home → index.html
//! Archive → archive.html (12 challenges)
//! 001 2026-03-03 Typed Event Bus → archive/2026-03-03/typed-event-bus.html
//! 002 2026-03-04 Retry Queue → archive/2026-03-04/retry-queue.html
//! Skipped 2026-03-05 "???": title "???" produces an empty slug
//!
//! Wrote 3 files, 10 unchanged
//! ```
//!
//! ## Check
//!
//! ```text
//! Store: 12 challenges
//!     new       archive/2026-03-14/typed-retry-queue.html
//!     changed   archive.html
//!     unchanged archive/2026-03-03/typed-event-bus.html
//! 2 to write, 1 unchanged
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::pipeline::{CheckReport, GenerateOutcome, PublishOutcome};
use crate::publish::WriteStatus;
use crate::synth::{ArtifactKind, SkippedRecord, Synthesis};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn skipped_line(skipped: &SkippedRecord) -> String {
    format!(
        "Skipped {} {:?}: {}",
        skipped.date, skipped.title, skipped.issue
    )
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_generate_output(outcome: &GenerateOutcome) -> Vec<String> {
    vec![
        format!(
            "{} [{}] {}",
            outcome.record.date, outcome.record.difficulty, outcome.record.title
        ),
        format!("    Attempt: {}", outcome.attempt),
        format!(
            "    Store: {} ({})",
            outcome.store_key,
            plural(outcome.store_len, "challenge")
        ),
        format!("    Bundle: {}", plural(outcome.bundle_files.len(), "file")),
    ]
}

pub fn print_generate_output(outcome: &GenerateOutcome) {
    for line in format_generate_output(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Publish
// ============================================================================

/// Artifact inventory shared by publish and check.
fn synthesis_lines(synthesis: &Synthesis) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(home) = synthesis.home_fragment() {
        lines.push(format!("Home → {}", home.target));
    }
    let details: Vec<_> = synthesis.of_kind(ArtifactKind::DetailPage).collect();
    for archive in synthesis.of_kind(ArtifactKind::ArchivePage) {
        lines.push(format!(
            "Archive → {} ({})",
            archive.target,
            plural(details.len(), "challenge")
        ));
    }
    for (i, detail) in details.iter().enumerate() {
        // Detail keys are `{archive_dir}/{date}/{slug}.html`.
        let mut segments = detail.target.rsplit('/');
        let slug = segments.next().unwrap_or_default().trim_end_matches(".html");
        let date = segments.next().unwrap_or_default();
        lines.push(format!(
            "{} {} {} → {}",
            format_index(i + 1),
            date,
            slug,
            detail.target
        ));
    }
    lines.extend(synthesis.skipped.iter().map(skipped_line));
    lines
}

pub fn format_publish_output(outcome: &PublishOutcome) -> Vec<String> {
    let mut lines = synthesis_lines(&outcome.synthesis);
    lines.push(String::new());
    lines.push(format!(
        "Wrote {}, {} unchanged",
        plural(outcome.report.written.len(), "file"),
        outcome.report.unchanged.len()
    ));
    lines
}

pub fn print_publish_output(outcome: &PublishOutcome) {
    for line in format_publish_output(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

fn status_label(status: WriteStatus) -> &'static str {
    match status {
        WriteStatus::New => "new",
        WriteStatus::Changed => "changed",
        WriteStatus::Unchanged => "unchanged",
    }
}

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!("Store: {}", plural(report.records, "challenge"))];
    for write in &report.planned {
        lines.push(format!("    {:<9} {}", status_label(write.status), write.key));
    }
    lines.extend(report.synthesis.skipped.iter().map(skipped_line));
    let pending = report
        .planned
        .iter()
        .filter(|w| w.status != WriteStatus::Unchanged)
        .count();
    lines.push(format!(
        "{} to write, {} unchanged",
        pending,
        report.planned.len() - pending
    ));
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::publish::{PlannedWrite, PublishReport};
    use crate::synth::{RenderIssue, synthesize};
    use crate::types::{ContentRecord, Difficulty};

    fn record(date: &str, title: &str) -> ContentRecord {
        ContentRecord {
            date: date.to_string(),
            title: title.to_string(),
            difficulty: Difficulty::Medium,
            description: "d".to_string(),
            snippet: String::new(),
            goals: vec![],
            hints: vec![],
            docs: vec![],
        }
    }

    #[test]
    fn index_is_zero_padded() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn generate_output_lines() {
        let outcome = GenerateOutcome {
            record: record("2026-03-14", "Typed Retry Queue"),
            attempt: 2,
            store_key: "challenges.json".to_string(),
            store_len: 1,
            bundle_files: vec!["challenge-output/challenge.ts".to_string()],
        };
        assert_eq!(
            format_generate_output(&outcome),
            vec![
                "2026-03-14 [Medium] Typed Retry Queue",
                "    Attempt: 2",
                "    Store: challenges.json (1 challenge)",
                "    Bundle: 1 file",
            ]
        );
    }

    #[test]
    fn publish_output_lists_artifacts() {
        let mut records = vec![
            record("2026-03-03", "Typed Event Bus"),
            record("2026-03-04", "Retry Queue"),
        ];
        records.push(record("2026-03-05", "???"));
        let synthesis = synthesize(&records, &SiteConfig::default());
        let outcome = PublishOutcome {
            synthesis,
            report: PublishReport {
                written: vec!["archive.html".to_string()],
                unchanged: vec!["a".to_string(), "b".to_string()],
            },
        };

        let lines = format_publish_output(&outcome);

        // Latest record is unrenderable, so there is no home line.
        assert_eq!(lines[0], "Archive → archive.html (2 challenges)");
        assert_eq!(
            lines[1],
            "001 2026-03-03 typed-event-bus → archive/2026-03-03/typed-event-bus.html"
        );
        assert_eq!(
            lines[3],
            format!(
                "Skipped 2026-03-05 \"???\": {}",
                RenderIssue::EmptySlug("???".to_string())
            )
        );
        assert_eq!(lines.last().unwrap(), "Wrote 1 file, 2 unchanged");
    }

    #[test]
    fn check_output_counts_pending() {
        let report = CheckReport {
            records: 2,
            synthesis: Synthesis::default(),
            planned: vec![
                PlannedWrite {
                    key: "archive.html".to_string(),
                    content: String::new(),
                    status: WriteStatus::Changed,
                },
                PlannedWrite {
                    key: "index.html".to_string(),
                    content: String::new(),
                    status: WriteStatus::Unchanged,
                },
            ],
        };
        assert_eq!(
            format_check_output(&report),
            vec![
                "Store: 2 challenges",
                "    changed   archive.html",
                "    unchanged index.html",
                "1 to write, 1 unchanged",
            ]
        );
    }
}
