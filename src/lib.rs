//! # TypeDrop
//!
//! A daily TypeScript challenge generator and static site publisher. Each run
//! asks a generative model for one new challenge, appends it to a JSON store,
//! and re-renders the whole site from that store.
//!
//! # Architecture: Generate, Then Publish
//!
//! ```text
//! 1. Generate  history  →  challenges.json + challenge-output/   (model → record + bundle)
//! 2. Publish   store    →  index.html + archive.html + archive/  (record list → HTML)
//! ```
//!
//! The two stages share nothing but the store. Publishing is a pure function of
//! the record list, so it can be re-run at any time (after a template change,
//! or to repair a hand-edited page) without calling the model.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generator`] | Prompt construction, service call, payload validation, retry loop |
//! | [`store`] | Append-only challenge sequence persisted as one JSON blob |
//! | [`synth`] | Renders the home fragment, archive page and detail pages using Maud |
//! | [`publish`] | Splices the landing page and writes changed artifacts |
//! | [`bundle`] | Exercise files for the solver's branch (sources, README, tooling config) |
//! | [`pipeline`] | Composes the stages: `run_generate`, `run_publish`, `check` |
//! | [`blob`] | Key-value storage seam: filesystem and in-memory implementations |
//! | [`config`] | `typedrop.toml` loading, merging onto defaults, and validation |
//! | [`types`] | Persisted record types (`ContentRecord`, `Difficulty`, `DocLink`) |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## Persist Before Render
//!
//! A generated record is written to the store before any page is rendered, and
//! rendering reads it back from the store. A failed write aborts the run, so the
//! site never shows a challenge that is not persisted.
//!
//! Generation first checks that the landing page can be spliced, and the
//! record is appended only after its exercise bundle is on disk. A store
//! entry therefore always has a publishable site and bundle behind it.
//!
//! ## Tolerant Store Reads
//!
//! The store keeps entries as raw JSON. A hand-edited entry that no longer
//! decodes is skipped with a warning at render time and written back
//! untouched on the next append.
//!
//! ## Model Output Is Untrusted
//!
//! The tool input the model returns is validated field by field before it
//! becomes a record, and every record string is escaped when rendered. Maud
//! escapes interpolations by default; record text additionally goes through
//! [`synth::escape_html`], and URL path segments through
//! [`synth::sanitize_attr`].
//!
//! ## Landing Page Is Hand-Written
//!
//! `index.html` belongs to the site author. Only the region between
//! `<!-- CHALLENGE_START -->` and `<!-- CHALLENGE_END -->` is replaced, and a
//! landing page without both markers stops the publish before anything is
//! written.

pub mod blob;
pub mod bundle;
pub mod config;
pub mod generator;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod store;
pub mod synth;
pub mod types;
