//! Site synthesis: store state → HTML artifacts.
//!
//! A pure function of the record list and the site config. Running it twice
//! over the same store yields byte-identical output; nothing is patched
//! incrementally, every page is rebuilt from scratch each run.
//!
//! ## Generated Artifacts
//!
//! - **Home fragment** (`index.html`, between the sentinel comments): card for
//!   the latest challenge
//! - **Archive page** (`archive.html`): one table row per challenge, newest first
//! - **Detail pages** (`archive/{date}/{slug}.html`): one standalone page per
//!   challenge, built from the same card as the home fragment
//!
//! ## Escaping
//!
//! Every string that comes from a record was written by a model and is
//! treated as hostile. Record text reaches markup only through [`Text`],
//! which runs [`escape_html`]; values that become URL path segments go
//! through [`sanitize_attr`]; link targets go through [`safe_url`]. Maud
//! escapes any other splice by default, and the only pre-escaped content is
//! compile-time constants.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::config::SiteConfig;
use crate::types::{ContentRecord, Difficulty};
use maud::{DOCTYPE, Markup, Render, html};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Opening sentinel of the spliced region in the landing page.
pub const CHALLENGE_START: &str = "<!-- CHALLENGE_START -->";
/// Closing sentinel of the spliced region in the landing page.
pub const CHALLENGE_END: &str = "<!-- CHALLENGE_END -->";

const FONT_PRECONNECT: &str = "https://fonts.googleapis.com";
const FONT_STATIC_PRECONNECT: &str = "https://fonts.gstatic.com";
const FONT_DISPLAY: &str =
    "https://fonts.googleapis.com/css2?family=Permanent+Marker&display=swap";
const FONT_MONO_400: &str =
    "https://cdn.jsdelivr.net/fontsource/fonts/0x-proto@latest/latin-400-normal.css";
const FONT_MONO_700: &str =
    "https://cdn.jsdelivr.net/fontsource/fonts/0x-proto@latest/latin-700-normal.css";
const PRISM_THEME: &str = "https://cdn.jsdelivr.net/npm/prismjs@1/themes/prism-tomorrow.min.css";
const PRISM_CORE: &str = "https://cdn.jsdelivr.net/npm/prismjs@1/prism.min.js";
const PRISM_TS: &str = "https://cdn.jsdelivr.net/npm/prismjs@1/components/prism-typescript.min.js";
const ANALYTICS_SCRIPT: &str = "//gc.zgo.at/count.js";
const STACKBLITZ_ICON: &str = "https://cdn.simpleicons.org/stackblitz/e0e0e0";
const CODESANDBOX_ICON: &str = "https://cdn.simpleicons.org/codesandbox/e0e0e0";

const COPY_SCRIPT: &str = "navigator.clipboard.writeText(document.getElementById('clone-cmd').textContent).then(()=>{this.textContent='Copied!';this.classList.add('copied');setTimeout(()=>{this.textContent='Copy';this.classList.remove('copied')},2000)})";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("Start marker <!-- CHALLENGE_START --> not found")]
    MissingStart,
    #[error("End marker <!-- CHALLENGE_END --> not found after the start marker")]
    MissingEnd,
}

/// Why a record was left out of the rendered site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderIssue {
    #[error("date is empty or has no path-safe characters")]
    UnusableDate,
    #[error("title is empty")]
    EmptyTitle,
    #[error("title {0:?} produces an empty slug")]
    EmptySlug(String),
    #[error("entry does not decode: {0}")]
    Malformed(String),
    #[error("another challenge already publishes under date {0:?}")]
    DuplicateDate(String),
}

// ============================================================================
// Escaping and slugs
// ============================================================================

/// Escape text for HTML body and quoted attribute contexts.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep only ASCII letters, digits and `-`. For URL path segments and ids.
pub fn sanitize_attr(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Link targets must be plain http(s); anything else becomes `#`.
pub fn safe_url(url: &str) -> &str {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        trimmed
    } else {
        "#"
    }
}

/// URL slug for a title.
///
/// Lowercase, `&` spelled out as `and`, everything outside `[a-z0-9\s-]`
/// dropped, whitespace runs turned into one `-`, repeated `-` collapsed,
/// leading and trailing `-` trimmed.
///
/// - `"A & B"` → `"a-and-b"`
/// - `"Typed  Event Bus!"` → `"typed-event-bus"`
/// - `"--Retry -- Logic--"` → `"retry-logic"`
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase().replace('&', "and");
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

/// Badge CSS class for a tier.
pub fn difficulty_class(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

/// Record text, escaped with [`escape_html`] when rendered.
pub struct Text<'a>(pub &'a str);

impl Render for Text<'_> {
    fn render_to(&self, buffer: &mut String) {
        buffer.push_str(&escape_html(self.0));
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Blob key of a record's detail page: `{archive_dir}/{date}/{slug}.html`.
pub fn detail_path(record: &ContentRecord, config: &SiteConfig) -> String {
    format!(
        "{}/{}/{}.html",
        config.paths.archive_dir.trim_end_matches('/'),
        sanitize_attr(&record.date),
        slugify(&record.title)
    )
}

/// Relative prefix from a page at `key` back to the site root.
fn root_prefix(key: &str) -> String {
    "../".repeat(key.trim_start_matches('/').matches('/').count())
}

/// Reject records that cannot produce a well-formed page.
pub fn check_renderable(record: &ContentRecord) -> Result<(), RenderIssue> {
    if sanitize_attr(&record.date).is_empty() {
        return Err(RenderIssue::UnusableDate);
    }
    if record.title.trim().is_empty() {
        return Err(RenderIssue::EmptyTitle);
    }
    if slugify(&record.title).is_empty() {
        return Err(RenderIssue::EmptySlug(record.title.clone()));
    }
    Ok(())
}

// ============================================================================
// HTML Components
// ============================================================================

/// Shared `<head>` links. `root` is the relative path to the site root.
fn head_links(root: &str, with_prism: bool) -> Markup {
    html! {
        link rel="preconnect" href=(FONT_PRECONNECT);
        link rel="preconnect" href=(FONT_STATIC_PRECONNECT) crossorigin;
        link rel="stylesheet" href=(FONT_DISPLAY);
        link rel="stylesheet" href=(FONT_MONO_400);
        link rel="stylesheet" href=(FONT_MONO_700);
        @if with_prism {
            link rel="stylesheet" href=(PRISM_THEME);
        }
        link rel="icon" href={ (root) "misc/favicon.svg" } type="image/svg+xml";
        link rel="stylesheet" href={ (root) "style.css" };
    }
}

/// Renders the base HTML document structure
fn base_document(
    config: &SiteConfig,
    root: &str,
    title: &str,
    tagline: Markup,
    with_prism: bool,
    content: Markup,
    footer: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (config.site.name) " — " (Text(title)) }
                (head_links(root, with_prism))
            }
            body {
                main {
                    header {
                        h1 {
                            a href={ (root) (config.paths.index) } style="color: inherit; text-decoration: none;" {
                                (config.site.name)
                            }
                        }
                        p.tagline { (tagline) }
                    }
                    (content)
                    footer { (footer) }
                }
                @if with_prism {
                    script src=(PRISM_CORE) {}
                    script src=(PRISM_TS) {}
                }
                @if let Some(endpoint) = &config.site.analytics_endpoint {
                    script data-goatcounter=(safe_url(endpoint)) async src=(ANALYTICS_SCRIPT) {}
                }
            }
        }
    }
}

/// Titled bullet list; renders nothing for an empty list.
fn render_list(items: &[String], class: &str, heading: &str) -> Markup {
    html! {
        @if !items.is_empty() {
            div class=(class) {
                h3 { (heading) }
                ul {
                    @for item in items {
                        li { (Text(item)) }
                    }
                }
            }
        }
    }
}

fn render_docs(record: &ContentRecord) -> Markup {
    html! {
        @if !record.docs.is_empty() {
            div.challenge-docs {
                h3 { "Useful resources" }
                ul {
                    @for doc in &record.docs {
                        li {
                            a href=(safe_url(&doc.url)) target="_blank" rel="noopener noreferrer" {
                                (Text(&doc.title))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_badge(difficulty: Difficulty) -> Markup {
    html! {
        span class={ "badge " (difficulty_class(difficulty)) } { (Text(difficulty.as_str())) }
    }
}

/// Challenge card shared by the home fragment and every detail page.
pub fn render_card(record: &ContentRecord, config: &SiteConfig) -> Markup {
    let owner = sanitize_attr(&config.site.repo_owner);
    let repo = sanitize_attr(&config.site.repo_name);
    let branch = format!("challenge/{}", sanitize_attr(&record.date));
    let stackblitz_url = format!("https://stackblitz.com/github/{owner}/{repo}/tree/{branch}");
    let sandbox_url =
        format!("https://codesandbox.io/p/devbox/github/{owner}/{repo}/tree/{branch}");
    let clone_command = format!("git clone -b {branch} https://github.com/{owner}/{repo}.git");

    html! {
        section.challenge-card {
            div.challenge-header {
                span.challenge-date { (Text(&record.date)) }
                (render_badge(record.difficulty))
            }
            h2 { (Text(&record.title)) }
            p { (Text(&record.description)) }
            (render_list(&record.goals, "challenge-goals", "Goals"))
            div.code-block {
                div.code-block-header {
                    span.dot.red {}
                    span.dot.yellow {}
                    span.dot.green {}
                    span.code-block-title { "challenge.ts" }
                }
                pre { code.language-typescript { (Text(&record.snippet)) } }
            }
            details.challenge-hints-details {
                summary { "Hints (click to reveal)" }
                (render_list(&record.hints, "challenge-hints", "Hints"))
            }
            (render_docs(record))
            div.cta-row {
                a.cta-button.cta-primary href=(stackblitz_url) target="_blank" rel="noopener noreferrer" {
                    img.sb-icon src=(STACKBLITZ_ICON) alt="";
                    " StackBlitz"
                }
                a.cta-button href=(sandbox_url) target="_blank" rel="noopener noreferrer" {
                    img.csb-icon src=(CODESANDBOX_ICON) alt="";
                    " CodeSandbox"
                }
            }
            div.clone-section {
                h3 { "Or clone locally" }
                div.clone-box {
                    code id="clone-cmd" { (clone_command) }
                    button.clone-copy-btn onclick=(COPY_SCRIPT) { "Copy" }
                }
            }
        }
    }
}

// ============================================================================
// Artifact Renderers
// ============================================================================

/// Home fragment: the latest challenge's card, spliced into the landing page.
pub fn render_home_fragment(latest: &ContentRecord, config: &SiteConfig) -> String {
    render_card(latest, config).into_string()
}

/// Archive page with one row per record, newest first.
pub fn render_archive_page(records: &[ContentRecord], config: &SiteConfig) -> String {
    let root = root_prefix(&config.paths.archive);
    let content = html! {
        section.challenge-card {
            table.archive-table {
                thead {
                    tr {
                        th { "Date" }
                        th { "Difficulty" }
                        th { "Challenge" }
                        th { "Description" }
                        th {}
                    }
                }
                tbody {
                    @for record in records.iter().rev() {
                        tr {
                            td { (Text(&record.date)) }
                            td { (render_badge(record.difficulty)) }
                            td { (Text(&record.title)) }
                            td { (Text(&record.description)) }
                            td { a href={ (root) (detail_path(record, config)) } { "See" } }
                        }
                    }
                }
            }
        }
    };
    let footer = html! {
        p { a href={ (root) (config.paths.index) } { "← Back to today's challenge" } }
    };
    base_document(
        config,
        &root,
        "Challenge Archive",
        html! { "Challenge Archive" },
        false,
        content,
        footer,
    )
    .into_string()
}

/// Standalone page for one challenge.
pub fn render_detail_page(record: &ContentRecord, config: &SiteConfig) -> String {
    let root = root_prefix(&detail_path(record, config));
    let footer = html! {
        p {
            a href={ (root) (config.paths.index) } { "← Today's challenge" }
            " · "
            a href={ (root) (config.paths.archive) } { "Archive" }
        }
    };
    base_document(
        config,
        &root,
        &record.title,
        html! { (Text(&record.date)) " Challenge" },
        true,
        render_card(record, config),
        footer,
    )
    .into_string()
}

// ============================================================================
// Synthesis
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Spliced into the landing page rather than written whole.
    HomeFragment,
    ArchivePage,
    DetailPage,
}

/// One rendered output, keyed by its blob path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteArtifact {
    pub kind: ArtifactKind,
    pub target: String,
    pub content: String,
}

/// A record left out of the site, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub date: String,
    pub title: String,
    pub issue: RenderIssue,
}

/// Everything rendered from one store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Synthesis {
    pub artifacts: Vec<SiteArtifact>,
    pub skipped: Vec<SkippedRecord>,
}

impl Synthesis {
    pub fn home_fragment(&self) -> Option<&SiteArtifact> {
        self.of_kind(ArtifactKind::HomeFragment).next()
    }

    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &SiteArtifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Render every artifact for the given records.
///
/// Records that fail [`check_renderable`] are skipped with a warning. An
/// empty store renders nothing.
pub fn synthesize(records: &[ContentRecord], config: &SiteConfig) -> Synthesis {
    render_candidates(records.iter().cloned().map(Ok).collect(), config)
}

/// Render every artifact straight from raw store entries.
///
/// Entries that do not decode as a [`ContentRecord`] are skipped like any
/// other unrenderable record; one bad entry never hides the rest.
pub fn synthesize_entries(entries: &[Value], config: &SiteConfig) -> Synthesis {
    let candidates = entries
        .iter()
        .map(|entry| {
            ContentRecord::from_entry(entry).map_err(|e| SkippedRecord {
                date: entry_str(entry, "date"),
                title: entry_str(entry, "name"),
                issue: RenderIssue::Malformed(e.to_string()),
            })
        })
        .collect();
    render_candidates(candidates, config)
}

fn entry_str(entry: &Value, field: &str) -> String {
    entry
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn skip(record: &ContentRecord, issue: RenderIssue) -> SkippedRecord {
    SkippedRecord {
        date: record.date.clone(),
        title: record.title.clone(),
        issue,
    }
}

fn render_candidates(
    candidates: Vec<Result<ContentRecord, SkippedRecord>>,
    config: &SiteConfig,
) -> Synthesis {
    let mut synthesis = Synthesis::default();
    if candidates.is_empty() {
        warn!("Store is empty; nothing to render");
        return synthesis;
    }

    let last = candidates.len() - 1;
    let mut renderable = Vec::with_capacity(candidates.len());
    let mut latest = None;
    // Detail paths are keyed on the sanitized date; the first record wins it.
    let mut seen_dates = HashSet::new();
    for (i, candidate) in candidates.into_iter().enumerate() {
        let accepted = candidate.and_then(|record| match check_renderable(&record) {
            Err(issue) => Err(skip(&record, issue)),
            Ok(()) => {
                let path_date = sanitize_attr(&record.date);
                if seen_dates.insert(path_date.clone()) {
                    Ok(record)
                } else {
                    Err(skip(&record, RenderIssue::DuplicateDate(path_date)))
                }
            }
        });
        match accepted {
            Ok(record) => {
                if i == last {
                    latest = Some(record.clone());
                }
                renderable.push(record);
            }
            Err(skipped) => {
                warn!(
                    date = %skipped.date,
                    title = %skipped.title,
                    issue = %skipped.issue,
                    "Skipping challenge that cannot be rendered"
                );
                synthesis.skipped.push(skipped);
            }
        }
    }

    // The home card shows the newest record only; an older one would be stale.
    if let Some(latest) = &latest {
        synthesis.artifacts.push(SiteArtifact {
            kind: ArtifactKind::HomeFragment,
            target: config.paths.index.clone(),
            content: render_home_fragment(latest, config),
        });
    }

    synthesis.artifacts.push(SiteArtifact {
        kind: ArtifactKind::ArchivePage,
        target: config.paths.archive.clone(),
        content: render_archive_page(&renderable, config),
    });

    for record in &renderable {
        synthesis.artifacts.push(SiteArtifact {
            kind: ArtifactKind::DetailPage,
            target: detail_path(record, config),
            content: render_detail_page(record, config),
        });
    }

    synthesis
}

/// Replace the region between the sentinels with `fragment`.
///
/// Text before the start marker and after the end marker is kept byte for
/// byte. Only the first marked region is replaced.
pub fn splice_fragment(document: &str, fragment: &str) -> Result<String, SpliceError> {
    let start = document
        .find(CHALLENGE_START)
        .ok_or(SpliceError::MissingStart)?;
    let after_start = start + CHALLENGE_START.len();
    let end = document[after_start..]
        .find(CHALLENGE_END)
        .map(|offset| after_start + offset)
        .ok_or(SpliceError::MissingEnd)?;

    let mut out = String::with_capacity(document.len() + fragment.len());
    out.push_str(&document[..start]);
    out.push_str(CHALLENGE_START);
    out.push('\n');
    out.push_str(fragment);
    out.push_str("\n    ");
    out.push_str(&document[end..]);
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
