//! Challenge generation: one validated record per run.
//!
//! ```text
//! history ──▶ plan (tier + summary + request) ──▶ submit ──▶ validate ──▶ Generated
//!                                                   ▲            │
//!                                                   └─ backoff ◀─┘ (up to max_attempts)
//! ```
//!
//! The module is split into:
//! - **Service**: [`ContentService`] trait + wire types
//! - **Anthropic**: [`AnthropicService`], the production HTTP client
//! - **Prompt**: system prompt, history summary, difficulty rotation
//! - **Contract**: tool schema and field-by-field payload validation
//!
//! [`Orchestrator`] ties them together. Nothing here touches the store; the
//! caller appends the returned record.

pub mod anthropic;
pub mod contract;
pub mod prompt;
pub mod service;

pub use anthropic::AnthropicService;
pub use contract::{ChallengePayload, ContractError, extract_payload, validate_payload};
pub use prompt::{build_request, pick_difficulty, summarize_recent};
pub use service::{ContentService, ServiceError, ServiceRequest, ServiceResponse};

use crate::bundle::ExerciseBundle;
use crate::config::GeneratorConfig;
use crate::types::{ContentRecord, Difficulty};
use chrono::NaiveDate;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Why a single attempt failed. Every variant is retried.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractError),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("A challenge for {0} already exists; refusing to generate another")]
    AlreadyGenerated(String),
    #[error("Generation failed after {attempts} attempts: {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

/// Everything decided before the first network call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    /// `YYYY-MM-DD`
    pub date: String,
    pub difficulty: Difficulty,
    pub previous: Option<Difficulty>,
    pub request: ServiceRequest,
}

/// A successful generation: the store record plus the exercise files.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub record: ContentRecord,
    pub bundle: ExerciseBundle,
    /// 1-based attempt that produced the payload.
    pub attempt: u32,
}

impl Generated {
    fn from_payload(payload: ChallengePayload, date: &str, attempt: u32) -> Self {
        let bundle = ExerciseBundle::from_payload(&payload, date);
        let record = ContentRecord {
            date: date.to_string(),
            title: payload.title,
            difficulty: payload.difficulty,
            description: payload.scenario,
            snippet: payload.snippet,
            goals: payload.goals,
            hints: payload.hints,
            docs: payload.docs,
        };
        Self {
            record,
            bundle,
            attempt,
        }
    }
}

/// Runs the request/validate/retry loop against a [`ContentService`].
pub struct Orchestrator<S> {
    service: S,
    config: GeneratorConfig,
}

impl<S: ContentService> Orchestrator<S> {
    pub fn new(service: S, config: GeneratorConfig) -> Self {
        Self { service, config }
    }

    /// Choose today's tier and build the request from recent history.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        history: &[ContentRecord],
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<GenerationPlan, GenerateError> {
        let date = today.format("%Y-%m-%d").to_string();
        if history.iter().any(|r| r.date == date) {
            return Err(GenerateError::AlreadyGenerated(date));
        }

        let previous = history.last().map(|r| r.difficulty);
        let difficulty = pick_difficulty(previous, rng);
        let summary = summarize_recent(history, self.config.history_len);
        let request = build_request(&self.config, &date, difficulty, &summary);

        info!(
            target_difficulty = %difficulty,
            last = previous.map(Difficulty::as_str).unwrap_or("none"),
            "Planned generation"
        );
        Ok(GenerationPlan {
            date,
            difficulty,
            previous,
            request,
        })
    }

    /// Submit the planned request until a payload validates or attempts run out.
    ///
    /// Attempt `n` that fails is followed by a wait of `backoff_secs * n`.
    pub async fn execute(&self, plan: &GenerationPlan) -> Result<Generated, GenerateError> {
        let max_attempts = self.config.max_attempts.max(1);
        let backoff = Duration::from_secs(self.config.backoff_secs);

        let mut attempt = 1;
        loop {
            info!(attempt, max_attempts, "Requesting challenge");
            match self.attempt(&plan.request).await {
                Ok(payload) => {
                    if payload.difficulty != plan.difficulty {
                        warn!(
                            requested = %plan.difficulty,
                            returned = %payload.difficulty,
                            "Model ignored the mandated difficulty"
                        );
                    }
                    info!(
                        title = %payload.title,
                        difficulty = %payload.difficulty,
                        attempt,
                        "Challenge generated"
                    );
                    return Ok(Generated::from_payload(payload, &plan.date, attempt));
                }
                Err(e) if attempt >= max_attempts => {
                    return Err(GenerateError::AttemptsExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = backoff * attempt;
                    warn!(
                        attempt,
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// [`plan`](Self::plan) then [`execute`](Self::execute).
    pub async fn generate<R: Rng + ?Sized>(
        &self,
        history: &[ContentRecord],
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<Generated, GenerateError> {
        let plan = self.plan(history, today, rng)?;
        self.execute(&plan).await
    }

    async fn attempt(&self, request: &ServiceRequest) -> Result<ChallengePayload, AttemptError> {
        let response = self.service.submit(request).await?;
        Ok(extract_payload(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::contract::tests::{response_with, valid_input};
    use crate::generator::service::ContentBlock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses, one per call.
    struct ScriptedService {
        responses: Mutex<VecDeque<Result<ServiceResponse, ServiceError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedService {
        fn new(responses: Vec<Result<ServiceResponse, ServiceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl ContentService for &ScriptedService {
        async fn submit(&self, _request: &ServiceRequest) -> Result<ServiceResponse, ServiceError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(server_error()))
        }
    }

    fn server_error() -> ServiceError {
        ServiceError::Status {
            status: 529,
            body: "overloaded".to_string(),
        }
    }

    fn text_only() -> ServiceResponse {
        ServiceResponse {
            content: vec![ContentBlock::Text {
                text: "no tool".to_string(),
            }],
            stop_reason: Some("end_turn".to_string()),
            usage: None,
        }
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            backoff_secs: 2,
            ..GeneratorConfig::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn history_record(date: &str, difficulty: Difficulty) -> ContentRecord {
        ContentRecord {
            date: date.to_string(),
            title: "Earlier".to_string(),
            difficulty,
            description: "earlier challenge".to_string(),
            snippet: String::new(),
            goals: vec![],
            hints: vec![],
            docs: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success() {
        let service = ScriptedService::new(vec![Ok(response_with(valid_input()))]);
        let orchestrator = Orchestrator::new(&service, config());
        let mut rng = StdRng::seed_from_u64(1);

        let generated = orchestrator.generate(&[], today(), &mut rng).await.unwrap();

        assert_eq!(service.calls(), 1);
        assert_eq!(generated.attempt, 1);
        assert_eq!(generated.record.date, "2026-03-14");
        assert_eq!(generated.record.title, "Typed Retry Queue");
        assert_eq!(generated.record.description, "A payment service retries failed webhooks.");
        assert_eq!(generated.bundle.date, "2026-03-14");
        assert_eq!(generated.bundle.challenge_source, "export function retry() {}");
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_mixed_failures() {
        let mut missing_title = valid_input();
        missing_title.as_object_mut().unwrap().remove("title");
        let service = ScriptedService::new(vec![
            Err(server_error()),
            Ok(response_with(missing_title)),
            Ok(response_with(valid_input())),
        ]);
        let orchestrator = Orchestrator::new(&service, config());
        let mut rng = StdRng::seed_from_u64(1);

        let started = tokio::time::Instant::now();
        let generated = orchestrator.generate(&[], today(), &mut rng).await.unwrap();

        assert_eq!(service.calls(), 3);
        assert_eq!(generated.attempt, 3);
        // Linear backoff: 2s after attempt 1, 4s after attempt 2.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_is_fatal() {
        let service = ScriptedService::new(vec![Ok(text_only()), Ok(text_only()), Ok(text_only())]);
        let orchestrator = Orchestrator::new(&service, config());
        let mut rng = StdRng::seed_from_u64(1);

        let result = orchestrator.generate(&[], today(), &mut rng).await;

        assert_eq!(service.calls(), 3);
        match result {
            Err(GenerateError::AttemptsExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(last, AttemptError::Contract(ContractError::NoToolUse(_))));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_difficulty_is_retried() {
        let mut bad = valid_input();
        bad["difficulty"] = json!("Impossible");
        let service = ScriptedService::new(vec![Ok(response_with(bad)), Ok(response_with(valid_input()))]);
        let orchestrator = Orchestrator::new(&service, config());
        let mut rng = StdRng::seed_from_u64(1);

        let generated = orchestrator.generate(&[], today(), &mut rng).await.unwrap();
        assert_eq!(generated.attempt, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_date_refuses_before_any_call() {
        let service = ScriptedService::new(vec![Ok(response_with(valid_input()))]);
        let orchestrator = Orchestrator::new(&service, config());
        let mut rng = StdRng::seed_from_u64(1);
        let history = vec![history_record("2026-03-14", Difficulty::Easy)];

        let result = orchestrator.generate(&history, today(), &mut rng).await;

        assert!(matches!(result, Err(GenerateError::AlreadyGenerated(d)) if d == "2026-03-14"));
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn plan_avoids_previous_tier_and_summarizes_history() {
        let service = ScriptedService::new(vec![]);
        let orchestrator = Orchestrator::new(&service, config());
        let history = vec![
            history_record("2026-03-12", Difficulty::Easy),
            history_record("2026-03-13", Difficulty::Hard),
        ];

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = orchestrator.plan(&history, today(), &mut rng).unwrap();
            assert_eq!(plan.previous, Some(Difficulty::Hard));
            assert_ne!(plan.difficulty, Difficulty::Hard);
            let turn = &plan.request.messages[0].content;
            assert!(turn.contains("- Earlier (Hard): earlier challenge"));
        }
    }
}
