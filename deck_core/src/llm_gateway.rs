use crate::circuit_breaker::CircuitBreakerSet;
use crate::config::{ModelCatalog, ModelSpec, ModelTier, TuningTable};
use crate::contracts::{PipelineError, StageResult};
use crate::cost_tracker::CostTracker;
use crate::data_models::metrics::ActivityKind;
use crate::json_recovery::{recover_json, recover_json_report, ParseFailureKind};
use crate::utils::logger::{log_llm_call, ActivityLog};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const JSON_MIME: &str = "application/json";
const REPAIR_DEADLINE: Duration = Duration::from_secs(30);

/// Requested reasoning depth; stripped below the tier that supports it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingLevel {
    Low,
    Medium,
    High,
}

/// Inline media attachment for vision-capable calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaPart {
    pub mime_type: String,
    pub data_base64: String,
}

/// # NDOC
/// component: `llm_gateway`
/// purpose: Wire request for the chat-completion endpoint.
/// invariants:
///   - Field names are the external protocol; renames require compatibility review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    #[serde(default)]
    pub usage_metadata: UsageMetadata,
}

/// # NDOC
/// component: `llm_gateway`
/// purpose: Transport seam for chat completion; tests inject scripted fakes.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> StageResult<ChatResponse>;
}

/// Production transport speaking the chat-completion protocol over HTTPS.
pub struct HttpChatClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl HttpChatClient {
    pub fn new(base: Url, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            api_key,
        }
    }

    fn endpoint(&self, model: &str) -> StageResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::config("API base URL cannot be a base"))?
            .push("v1beta")
            .push("models")
            .push(&format!("{model}:generateContent"));
        Ok(url)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> StageResult<ChatResponse> {
        let url = self.endpoint(&request.model)?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error body".to_string());
            return Err(classify_status(status, &body));
        }
        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| PipelineError::provider(format!("malformed response envelope: {e}"), false))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::timeout(format!("request timed out: {err}"))
    } else if err.is_connect() {
        PipelineError::overloaded(format!("connection failed: {err}"))
    } else {
        PipelineError::provider(err.to_string(), false)
    }
}

fn classify_status(status: StatusCode, body: &str) -> PipelineError {
    match status.as_u16() {
        429 => PipelineError::rate_limit(format!("quota exhausted: {body}")),
        408 => PipelineError::timeout(format!("provider timeout: {body}")),
        503 | 529 => PipelineError::overloaded(format!("service unavailable: {body}")),
        _ => PipelineError::provider(format!("provider returned {status}: {body}"), false),
    }
}

/// Options a caller may set per call; everything else comes from the model spec.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub thinking_level: Option<ThinkingLevel>,
    pub media: Option<MediaPart>,
}

#[derive(Debug, Default)]
struct GatewayCounters {
    retries: AtomicU32,
    downgrades: AtomicU32,
    breaker_trips: AtomicU32,
    repairs: AtomicU32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayStats {
    pub retries: u32,
    pub downgrades: u32,
    pub breaker_trips: u32,
    pub repairs: u32,
}

/// # NDOC
/// component: `llm_gateway`
/// purpose: Typed JSON calls to chat models with retry, fallback chain,
/// circuit breaker, and cost accounting.
/// invariants:
///   - Retries happen only for transient failures, at most
///     `max_same_model_retries` per model, then the chain descends one step.
///   - Token usage is recorded against the cost tracker after every success.
///   - Breaker state is shared across the whole deck generation.
pub struct LlmGateway {
    client: Arc<dyn ChatClient>,
    catalog: ModelCatalog,
    breakers: Mutex<CircuitBreakerSet>,
    tracker: Arc<Mutex<CostTracker>>,
    activity: Arc<ActivityLog>,
    counters: GatewayCounters,
    call_timeout: Duration,
    retry_base: Duration,
    max_same_model_retries: u32,
}

impl LlmGateway {
    pub fn new(
        client: Arc<dyn ChatClient>,
        catalog: ModelCatalog,
        tracker: Arc<Mutex<CostTracker>>,
        activity: Arc<ActivityLog>,
        tuning: &TuningTable,
    ) -> Self {
        Self {
            client,
            catalog,
            breakers: Mutex::new(CircuitBreakerSet::new(
                tuning.breaker_threshold,
                tuning.breaker_cooldown_secs,
            )),
            tracker,
            activity,
            counters: GatewayCounters::default(),
            call_timeout: Duration::from_secs(tuning.call_timeout_secs),
            retry_base: Duration::from_millis(tuning.retry_base_ms),
            max_same_model_retries: tuning.max_same_model_retries,
        }
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            retries: self.counters.retries.load(Ordering::SeqCst),
            downgrades: self.counters.downgrades.load(Ordering::SeqCst),
            breaker_trips: self.counters.breaker_trips.load(Ordering::SeqCst),
            repairs: self.counters.repairs.load(Ordering::SeqCst),
        }
    }

    /// Plain-text call through the fallback chain.
    pub async fn text_call(
        &self,
        agent_name: &str,
        tier: ModelTier,
        prompt: &str,
        opts: CallOptions,
    ) -> StageResult<String> {
        let (text, _model) = self.call_chain(agent_name, tier, prompt, None, &opts).await?;
        Ok(text)
    }

    /// JSON-mode call: the raw text is handed to JSON recovery before return.
    /// Persistent `MALFORMED` payloads get one model-assisted repair attempt.
    pub async fn typed_json_call(
        &self,
        agent_name: &str,
        tier: ModelTier,
        prompt: &str,
        schema: Value,
        opts: CallOptions,
    ) -> StageResult<Value> {
        self.typed_json_call_reporting(agent_name, tier, prompt, schema, opts)
            .await
            .map(|(value, _)| value)
    }

    /// Like `typed_json_call`, but also reports whether the auto-closer had
    /// to repair a truncated envelope.
    pub async fn typed_json_call_reporting(
        &self,
        agent_name: &str,
        tier: ModelTier,
        prompt: &str,
        schema: Value,
        opts: CallOptions,
    ) -> StageResult<(Value, bool)> {
        let (text, model_used) = self
            .call_chain(agent_name, tier, prompt, Some(schema.clone()), &opts)
            .await?;
        match recover_json_report(&text) {
            Ok(recovery) => Ok((recovery.value, recovery.auto_closed)),
            Err(failure) if failure.kind == ParseFailureKind::Malformed => {
                let value = self
                    .model_assisted_repair(agent_name, &text, &schema, &model_used)
                    .await?;
                Ok((value, false))
            }
            Err(failure) => Err(PipelineError::contract(format!(
                "model output unrecoverable: {failure}"
            ))
            .with_details(json!({
                "kind": failure.kind,
                "excerpt": failure.excerpt,
            }))),
        }
    }

    /// Deserializing convenience over `typed_json_call`.
    pub async fn typed_json_call_as<T: serde::de::DeserializeOwned>(
        &self,
        agent_name: &str,
        tier: ModelTier,
        prompt: &str,
        schema: Value,
        opts: CallOptions,
    ) -> StageResult<T> {
        let value = self
            .typed_json_call(agent_name, tier, prompt, schema, opts)
            .await?;
        serde_json::from_value(value.clone()).map_err(|e| {
            PipelineError::contract(format!("schema mismatch: {e}")).with_details(value)
        })
    }

    async fn call_chain(
        &self,
        agent_name: &str,
        tier: ModelTier,
        prompt: &str,
        schema: Option<Value>,
        opts: &CallOptions,
    ) -> StageResult<(String, String)> {
        let chain = self.catalog.chain();
        let start = self.catalog.chain_start(tier);
        let mut last_transient: Option<PipelineError> = None;

        for model in chain.iter().skip(start) {
            if opts.media.is_some() && !model.supports_vision {
                continue;
            }
            {
                let breakers = self.breakers.lock().expect("breaker lock poisoned");
                if breakers.is_open(&model.id, Utc::now()) {
                    log::info!(target: "llm_gateway", model = model.id.as_str(); "breaker open, downgrading");
                    continue;
                }
            }

            match self
                .call_one_model(agent_name, model, prompt, schema.clone(), opts)
                .await
            {
                Ok(text) => return Ok((text, model.id.clone())),
                Err(err) if err.is_transient() => {
                    self.counters.downgrades.fetch_add(1, Ordering::SeqCst);
                    self.activity.push(
                        ActivityKind::Info,
                        Some(agent_name),
                        format!("model {} exhausted retries, descending fallback chain", model.id),
                    );
                    last_transient = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let mut error = PipelineError::service_unavailable(
            "all models in the fallback chain are unhealthy",
        );
        if let Some(last) = last_transient {
            error = error.with_details(json!({"last_error": last.message}));
        }
        Err(error)
    }

    async fn call_one_model(
        &self,
        agent_name: &str,
        model: &ModelSpec,
        prompt: &str,
        schema: Option<Value>,
        opts: &CallOptions,
    ) -> StageResult<String> {
        let request = self.build_request(model, prompt, schema, opts);
        let mut last_err = PipelineError::internal("no attempt made");

        for attempt in 0..=self.max_same_model_retries {
            let outcome = tokio::time::timeout(self.call_timeout, self.client.complete(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(PipelineError::timeout(format!(
                        "call exceeded {}s wall clock",
                        self.call_timeout.as_secs()
                    )))
                });

            match outcome {
                Ok(response) => {
                    {
                        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
                        breakers.record_success(&model.id);
                    }
                    let usage = &response.usage_metadata;
                    {
                        let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
                        tracker.record_usage(
                            &model.id,
                            usage.prompt_token_count,
                            usage.candidates_token_count,
                        );
                    }
                    log_llm_call(
                        agent_name,
                        &model.id,
                        usage.prompt_token_count,
                        usage.candidates_token_count,
                    );
                    return Ok(response.text);
                }
                Err(err) => {
                    if !err.is_transient() {
                        return Err(err);
                    }
                    let tripped = {
                        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
                        breakers.record_failure(&model.id, Utc::now())
                    };
                    if tripped {
                        self.counters.breaker_trips.fetch_add(1, Ordering::SeqCst);
                        let cooldown = self
                            .breakers
                            .lock()
                            .expect("breaker lock poisoned")
                            .cooldown_secs();
                        self.activity.push(
                            ActivityKind::Error,
                            Some(agent_name),
                            format!(
                                "CIRCUIT BREAKER {} TRIPPED (cooldown {}s)",
                                model.id, cooldown
                            ),
                        );
                    }
                    last_err = err;
                    if attempt < self.max_same_model_retries && !tripped {
                        self.counters.retries.fetch_add(1, Ordering::SeqCst);
                        let delay = self.backoff_delay(attempt);
                        tokio::time::sleep(delay).await;
                    } else {
                        break;
                    }
                }
            }
        }
        Err(last_err)
    }

    /// Exponential backoff, base doubled per attempt, with jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_base.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(8));
        let jitter = rand::thread_rng().gen_range(0..=base.max(1) / 4);
        Duration::from_millis(exp + jitter)
    }

    fn build_request(
        &self,
        model: &ModelSpec,
        prompt: &str,
        schema: Option<Value>,
        opts: &CallOptions,
    ) -> ChatRequest {
        let thinking_level = if model.supports_thinking {
            opts.thinking_level
        } else {
            None
        };
        ChatRequest {
            model: model.id.clone(),
            prompt: prompt.to_string(),
            system: opts.system.clone(),
            response_mime_type: schema.as_ref().map(|_| JSON_MIME.to_string()),
            response_schema: schema,
            temperature: opts.temperature,
            max_output_tokens: Some(
                opts.max_output_tokens
                    .unwrap_or(model.default_max_output_tokens),
            ),
            thinking_level,
            media: opts.media.clone(),
        }
    }

    /// One bounded repair attempt on the lite model, temperature zero. Never
    /// invoked when the degeneration guard matched upstream.
    async fn model_assisted_repair(
        &self,
        agent_name: &str,
        broken: &str,
        schema: &Value,
        source_model: &str,
    ) -> StageResult<Value> {
        self.counters.repairs.fetch_add(1, Ordering::SeqCst);
        self.activity.push(
            ActivityKind::Info,
            Some(agent_name),
            format!("attempting model-assisted JSON repair for {source_model} output"),
        );
        let prompt = crate::prompts::render(
            crate::prompts::prompt_for("json_repair"),
            &[
                ("broken_payload", broken),
                ("schema", &schema.to_string()),
            ],
        );
        let request = ChatRequest {
            model: self.catalog.lite.id.clone(),
            prompt,
            system: None,
            response_mime_type: Some(JSON_MIME.to_string()),
            response_schema: Some(schema.clone()),
            temperature: Some(0.0),
            max_output_tokens: Some(self.catalog.lite.default_max_output_tokens),
            thinking_level: None,
            media: None,
        };
        let outcome = tokio::time::timeout(REPAIR_DEADLINE, self.client.complete(&request))
            .await
            .unwrap_or_else(|_| Err(PipelineError::timeout("JSON repair call timed out")));

        let response = outcome.map_err(|e| {
            PipelineError::contract(format!("model output unrecoverable after repair: {e}"))
        })?;
        {
            let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
            tracker.record_usage(
                &self.catalog.lite.id,
                response.usage_metadata.prompt_token_count,
                response.usage_metadata.candidates_token_count,
            );
        }
        recover_json(&response.text).map_err(|failure| {
            PipelineError::contract(format!("repair output still invalid: {failure}")).with_details(
                json!({
                    "kind": failure.kind,
                    "excerpt": failure.excerpt,
                }),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingTable;
    use std::collections::VecDeque;

    /// Scripted transport: pops one reply per call, records every request.
    struct ScriptedClient {
        replies: Mutex<VecDeque<StageResult<ChatResponse>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<StageResult<ChatResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn ok(text: &str) -> StageResult<ChatResponse> {
            Ok(ChatResponse {
                text: text.to_string(),
                usage_metadata: UsageMetadata {
                    prompt_token_count: 100,
                    candidates_token_count: 50,
                },
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn complete(&self, request: &ChatRequest) -> StageResult<ChatResponse> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PipelineError::internal("script exhausted")))
        }
    }

    fn fast_tuning() -> TuningTable {
        TuningTable {
            retry_base_ms: 1,
            ..TuningTable::default()
        }
    }

    fn gateway_with(
        client: Arc<ScriptedClient>,
        tuning: TuningTable,
    ) -> (LlmGateway, Arc<ActivityLog>) {
        let activity = Arc::new(ActivityLog::new(None));
        let tracker = Arc::new(Mutex::new(CostTracker::new(PricingTable::builtin())));
        let gateway = LlmGateway::new(
            client,
            ModelCatalog::from_env(),
            tracker,
            Arc::clone(&activity),
            &tuning,
        );
        (gateway, activity)
    }

    #[tokio::test]
    async fn success_records_usage_and_returns_value() {
        let client = Arc::new(ScriptedClient::new(vec![ScriptedClient::ok(
            r#"{"facts": []}"#,
        )]));
        let (gateway, _) = gateway_with(client, fast_tuning());
        let value = gateway
            .typed_json_call(
                "researcher",
                ModelTier::Agentic,
                "facts please",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect("call");
        assert_eq!(value["facts"], json!([]));
        let tracker = gateway.tracker.lock().unwrap();
        assert!(tracker.total_cost() > rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn transient_failure_retries_then_descends_chain() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(PipelineError::rate_limit("429")),
            Err(PipelineError::rate_limit("429")),
            Err(PipelineError::rate_limit("429")),
            ScriptedClient::ok(r#"{"ok": true}"#),
        ]));
        let (gateway, _) = gateway_with(client, fast_tuning());
        let value = gateway
            .typed_json_call(
                "router",
                ModelTier::Agentic,
                "route",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect("call");
        assert_eq!(value["ok"], json!(true));
        let stats = gateway.stats();
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.downgrades, 1);
    }

    #[tokio::test]
    async fn exhausted_chain_raises_service_unavailable() {
        // Agentic tier touches fast, backup, lite: 3 models x 3 attempts.
        let replies: Vec<StageResult<ChatResponse>> = (0..9)
            .map(|_| Err(PipelineError::overloaded("503")))
            .collect();
        let client = Arc::new(ScriptedClient::new(replies));
        let (gateway, _) = gateway_with(client, fast_tuning());
        let err = gateway
            .text_call("router", ModelTier::Agentic, "route", CallOptions::default())
            .await
            .expect_err("must fail");
        assert_eq!(
            err.kind,
            crate::contracts::PipelineErrorKind::ServiceUnavailable
        );
    }

    #[tokio::test]
    async fn breaker_trip_is_logged_and_skips_model() {
        // Threshold 3: three consecutive 429s on the fast model trip its
        // breaker; the follow-up call must route straight to backup.
        let client = Arc::new(ScriptedClient::new(vec![
            Err(PipelineError::rate_limit("429")),
            Err(PipelineError::rate_limit("429")),
            Err(PipelineError::rate_limit("429")),
            ScriptedClient::ok(r#"{"first": true}"#),
            ScriptedClient::ok(r#"{"second": true}"#),
        ]));
        let (gateway, activity) = gateway_with(Arc::clone(&client), fast_tuning());
        let first = gateway
            .typed_json_call(
                "router",
                ModelTier::Agentic,
                "route",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect("first call");
        assert_eq!(first["first"], json!(true));
        assert!(activity.contains("CIRCUIT BREAKER"));
        assert!(activity.contains("TRIPPED"));

        let second = gateway
            .typed_json_call(
                "router",
                ModelTier::Agentic,
                "route",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect("second call");
        assert_eq!(second["second"], json!(true));

        // Fast model saw exactly the three failing attempts; both successes
        // came from the backup model.
        let catalog = ModelCatalog::from_env();
        let requests = client.requests();
        let fast_calls = requests.iter().filter(|r| r.model == catalog.fast.id).count();
        assert_eq!(fast_calls, 3);
        let backup_calls = requests
            .iter()
            .filter(|r| r.model == catalog.backup.id)
            .count();
        assert_eq!(backup_calls, 2);
    }

    #[tokio::test]
    async fn thinking_is_stripped_below_supported_tier() {
        let client = Arc::new(ScriptedClient::new(vec![ScriptedClient::ok("plain text")]));
        let (gateway, _) = gateway_with(Arc::clone(&client), fast_tuning());
        let opts = CallOptions {
            thinking_level: Some(ThinkingLevel::High),
            ..CallOptions::default()
        };
        gateway
            .text_call("simple", ModelTier::Simple, "classify", opts)
            .await
            .expect("call");
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].thinking_level.is_none());
    }

    #[tokio::test]
    async fn repetition_failure_is_contract_violation() {
        let bullet = format!(r#"{{"points": ["{}"]}}"#, "growth ".repeat(40));
        let client = Arc::new(ScriptedClient::new(vec![ScriptedClient::ok(&bullet)]));
        let (gateway, _) = gateway_with(client, fast_tuning());
        let err = gateway
            .typed_json_call(
                "generator",
                ModelTier::Agentic,
                "slide",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect_err("must fail");
        assert_eq!(err.kind, crate::contracts::PipelineErrorKind::ContractViolation);
        let details = err.details.expect("details");
        assert_eq!(details["kind"], "REPETITION");
    }

    #[tokio::test]
    async fn malformed_payload_gets_model_assisted_repair() {
        let client = Arc::new(ScriptedClient::new(vec![
            ScriptedClient::ok(r#"{"title" "missing colon"}"#),
            ScriptedClient::ok(r#"{"title": "fixed"}"#),
        ]));
        let (gateway, _) = gateway_with(Arc::clone(&client), fast_tuning());
        let value = gateway
            .typed_json_call(
                "generator",
                ModelTier::Agentic,
                "slide",
                json!({"type": "object"}),
                CallOptions::default(),
            )
            .await
            .expect("repaired");
        assert_eq!(value["title"], "fixed");
        assert_eq!(gateway.stats().repairs, 1);
        let requests = client.requests();
        let catalog = ModelCatalog::from_env();
        assert_eq!(requests[1].model, catalog.lite.id);
        assert_eq!(requests[1].temperature, Some(0.0));
    }
}
