use crate::data_models::metrics::{ActivityKind, ActivityLogItem};
use log::kv::{self, Key, Value, Visitor};
use log::{Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// --- Structured pipeline log record ---

/// # NDOC
/// component: `utils::logger::record`
/// purpose: One structured line of pipeline telemetry.
/// invariants:
///   - `stage` is the log target: an agent name or subsystem.
///   - Deck, slide, model, and agent ids are promoted out of the key-value
///     pairs into typed slots so downstream tooling filters without parsing
///     the remaining `fields`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineLogRecord {
    pub timestamp: String,
    pub level: String,
    pub stage: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// Routes well-known keys into the record's typed slots; everything else
/// lands in the flattened `fields` map.
struct FieldRouter<'a>(&'a mut PipelineLogRecord);

impl<'a, 'kvs> Visitor<'kvs> for FieldRouter<'a> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        let rendered = value.to_string();
        match key.as_str() {
            "deck_id" => self.0.deck_id = Some(rendered),
            "slide_id" => self.0.slide_id = Some(rendered),
            "model" => self.0.model = Some(rendered),
            "agent" => self.0.agent = Some(rendered),
            other => {
                self.0.fields.insert(other.to_string(), json!(rendered));
            }
        }
        Ok(())
    }
}

// --- Logger implementation ---

struct PipelineLogger;

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = PipelineLogRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: record.level().to_string(),
            stage: record.target().to_string(),
            message: format!("{}", record.args()),
            deck_id: None,
            slide_id: None,
            model: None,
            agent: None,
            fields: HashMap::new(),
        };
        let mut router = FieldRouter(&mut line);
        if let Err(e) = record.key_values().visit(&mut router) {
            eprintln!("Error visiting key-value pairs: {:?}", e);
        }

        match serde_json::to_string(&line) {
            Ok(encoded) => println!("{encoded}"),
            Err(e) => eprintln!("Failed to serialize log record: {e}"),
        }
    }

    fn flush(&self) {}
}

static LOGGER: PipelineLogger = PipelineLogger;
static INIT_LOGGER_ONCE: OnceCell<()> = OnceCell::new();

/// Initializes the pipeline logger. Call once at application start.
pub fn init_logger() -> Result<(), SetLoggerError> {
    INIT_LOGGER_ONCE
        .get_or_try_init(|| {
            log::set_logger(&LOGGER)?;
            log::set_max_level(log::LevelFilter::Info);
            Ok(())
        })
        .map(|_| ())
}

// --- Specific logging functions ---

/// Marks a lifecycle moment of one agent stage: completion, fallback, or
/// revision. Payload details ride as structured fields.
pub fn log_agent_event(agent_name: &str, event_type: &str, details: &serde_json::Value) {
    let details_str = details.to_string();
    log::info!(
        target: agent_name,
        agent = agent_name,
        event_type = event_type,
        details = details_str.as_str();
        "Agent Event"
    );
}

/// Logs one LLM call summary (never the full prompt body).
pub fn log_llm_call(agent_name: &str, model: &str, input_tokens: u32, output_tokens: u32) {
    log::info!(
        target: agent_name,
        agent = agent_name,
        model = model,
        input_tokens = input_tokens,
        output_tokens = output_tokens;
        "LLM Call"
    );
}

/// Logs a validation verdict for one slide.
pub fn log_validation_event(slide_id: &str, tier: &str, passed: bool, detail: &str) {
    log::info!(
        target: "visual_validation",
        slide_id = slide_id,
        tier = tier,
        passed = passed,
        detail = detail;
        "Validation"
    );
}

// --- Activity feed delivered to the caller ---

pub type ProgressSink = dyn Fn(&ActivityLogItem) + Send + Sync;

/// # NDOC
/// component: `utils::logger::activity`
/// purpose: Ordered, append-only activity feed for one deck generation.
/// invariants:
///   - Item ids are strictly monotonic; consumers may sort by id.
///   - Safe to share across cooperative tasks; all mutation is behind a lock.
pub struct ActivityLog {
    next_id: AtomicU64,
    items: Mutex<Vec<ActivityLogItem>>,
    sink: Option<Arc<ProgressSink>>,
}

impl ActivityLog {
    pub fn new(sink: Option<Arc<ProgressSink>>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            items: Mutex::new(Vec::new()),
            sink,
        }
    }

    pub fn push(&self, kind: ActivityKind, agent_name: Option<&str>, message: impl Into<String>) {
        let item = ActivityLogItem {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
            agent_name: agent_name.map(|s| s.to_string()),
        };
        log::info!(target: "activity", "{}", item.message);
        if let Some(sink) = &self.sink {
            sink(&item);
        }
        self.items.lock().expect("activity lock poisoned").push(item);
    }

    pub fn items(&self) -> Vec<ActivityLogItem> {
        self.items.lock().expect("activity lock poisoned").clone()
    }

    /// True when any pushed message contains the needle. Used by tests and
    /// the orchestrator's coherence checks.
    pub fn contains(&self, needle: &str) -> bool {
        self.items
            .lock()
            .expect("activity lock poisoned")
            .iter()
            .any(|item| item.message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_promotes_known_keys_and_flattens_the_rest() {
        let mut fields = HashMap::new();
        fields.insert("event_type".to_string(), json!("layout_chosen"));
        let record = PipelineLogRecord {
            timestamp: "2026-08-01T00:00:00Z".to_string(),
            level: "INFO".to_string(),
            stage: "router".to_string(),
            message: "Agent Event".to_string(),
            deck_id: Some("deck-abc123".to_string()),
            slide_id: Some("deck-abc123-s2".to_string()),
            model: None,
            agent: Some("router".to_string()),
            fields,
        };
        let encoded = serde_json::to_string(&record).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&encoded).expect("reparse");
        assert_eq!(value["slide_id"], "deck-abc123-s2");
        assert_eq!(value["agent"], "router");
        assert_eq!(value["event_type"], "layout_chosen");
        assert!(value.get("fields").is_none(), "fields must flatten");
        assert!(value.get("model").is_none(), "empty slots stay absent");
    }

    #[test]
    fn helper_functions_emit_through_the_pipeline_logger() {
        let _ = init_logger();
        log_agent_event("researcher", "fact_sheet_ready", &json!({"fact_count": 10}));
        log_llm_call("generator", "gemini-2.5-flash", 120, 80);
        log_validation_event("deck-abc-s1", "logic_gate", true, "deterministic fit check");
    }

    #[test]
    fn activity_ids_are_monotonic() {
        let log = ActivityLog::new(None);
        log.push(ActivityKind::Info, None, "first");
        log.push(ActivityKind::Agent, Some("researcher"), "second");
        let items = log.items();
        assert_eq!(items.len(), 2);
        assert!(items[0].id < items[1].id);
        assert_eq!(items[1].agent_name.as_deref(), Some("researcher"));
    }

    #[test]
    fn sink_receives_every_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink: Arc<ProgressSink> = Arc::new(move |item: &ActivityLogItem| {
            seen_clone.lock().unwrap().push(item.message.clone());
        });
        let log = ActivityLog::new(Some(sink));
        log.push(ActivityKind::Success, None, "done");
        assert_eq!(seen.lock().unwrap().as_slice(), ["done".to_string()]);
    }

    #[test]
    fn contains_matches_substrings() {
        let log = ActivityLog::new(None);
        log.push(ActivityKind::Error, None, "CIRCUIT BREAKER gemini-2.5-pro TRIPPED");
        assert!(log.contains("CIRCUIT BREAKER"));
        assert!(!log.contains("REROUTE"));
    }
}
