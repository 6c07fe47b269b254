use crate::config::ModelTier;
use crate::contracts::{PipelineError, StageResult};
use crate::data_models::research::ResearchFact;
use crate::llm_gateway::{CallOptions, LlmGateway, ThinkingLevel};
use crate::prompts;
use crate::utils::logger::log_agent_event;
use serde_json::json;

pub const AGENT_NAME: &str = "researcher";
pub const MIN_FACTS: usize = 8;
pub const MAX_FACTS: usize = 12;

fn facts_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "facts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "category": {"type": "string"},
                        "claim": {"type": "string"},
                        "value": {},
                        "source": {"type": "string"},
                        "confidence": {"enum": ["high", "medium", "low"]}
                    },
                    "required": ["id", "category", "claim", "source", "confidence"]
                }
            }
        },
        "required": ["facts"]
    })
}

/// # NDOC
/// component: `agents::researcher`
/// purpose: Produce the verified fact sheet for a topic.
/// invariants:
///   - Output is trimmed to at most 12 facts; ids are unique after repair.
///   - An empty sheet is a contract violation, not an empty deck.
pub async fn research_topic(
    gateway: &LlmGateway,
    topic: &str,
) -> StageResult<Vec<ResearchFact>> {
    let prompt = prompts::render(prompts::prompt_for(AGENT_NAME), &[("topic", topic)]);
    let opts = CallOptions {
        temperature: Some(0.3),
        max_output_tokens: Some(2_048),
        thinking_level: Some(ThinkingLevel::Low),
        ..CallOptions::default()
    };
    let value = gateway
        .typed_json_call(AGENT_NAME, ModelTier::Smart, &prompt, facts_schema(), opts)
        .await?;

    let facts_value = match value.get("facts") {
        Some(v) => v.clone(),
        None => value,
    };
    let mut facts: Vec<ResearchFact> = serde_json::from_value(facts_value)
        .map_err(|e| PipelineError::contract(format!("fact sheet schema mismatch: {e}")))?;

    facts.retain(|f| !f.claim.trim().is_empty());
    if facts.is_empty() {
        return Err(PipelineError::contract("researcher returned no usable facts"));
    }
    // Stable, unique ids even when the model repeats itself.
    let mut seen = std::collections::HashSet::new();
    for (idx, fact) in facts.iter_mut().enumerate() {
        if fact.id.trim().is_empty() || !seen.insert(fact.id.clone()) {
            fact.id = format!("fact-{:02}", idx + 1);
            seen.insert(fact.id.clone());
        }
    }
    facts.truncate(MAX_FACTS);
    if facts.len() < MIN_FACTS {
        log::info!(
            target: AGENT_NAME,
            count = facts.len();
            "fact sheet below preferred minimum"
        );
    }
    log_agent_event(
        AGENT_NAME,
        "fact_sheet_ready",
        &json!({"fact_count": facts.len()}),
    );
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelCatalog, PricingTable, TuningTable};
    use crate::cost_tracker::CostTracker;
    use crate::llm_gateway::{ChatClient, ChatRequest, ChatResponse, UsageMetadata};
    use crate::utils::logger::ActivityLog;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct OneShot(String);

    #[async_trait]
    impl ChatClient for OneShot {
        async fn complete(&self, _request: &ChatRequest) -> StageResult<ChatResponse> {
            Ok(ChatResponse {
                text: self.0.clone(),
                usage_metadata: UsageMetadata {
                    prompt_token_count: 10,
                    candidates_token_count: 10,
                },
            })
        }
    }

    fn gateway(reply: &str) -> LlmGateway {
        LlmGateway::new(
            Arc::new(OneShot(reply.to_string())),
            ModelCatalog::from_env(),
            Arc::new(Mutex::new(CostTracker::new(PricingTable::builtin()))),
            Arc::new(ActivityLog::new(None)),
            &TuningTable::default(),
        )
    }

    fn fact_json(id: &str, claim: &str) -> serde_json::Value {
        json!({
            "id": id,
            "category": "milestone",
            "claim": claim,
            "value": 1903,
            "source": "https://example.org",
            "confidence": "high"
        })
    }

    #[tokio::test]
    async fn duplicate_ids_are_rewritten() {
        let reply = json!({
            "facts": [fact_json("f1", "first flight"), fact_json("f1", "second milestone")]
        });
        let gateway = gateway(&reply.to_string());
        let facts = research_topic(&gateway, "aviation").await.expect("facts");
        assert_eq!(facts.len(), 2);
        assert_ne!(facts[0].id, facts[1].id);
    }

    #[tokio::test]
    async fn oversized_sheet_is_trimmed() {
        let many: Vec<serde_json::Value> = (0..20)
            .map(|i| fact_json(&format!("f{i}"), &format!("claim {i}")))
            .collect();
        let gateway = gateway(&json!({"facts": many}).to_string());
        let facts = research_topic(&gateway, "aviation").await.expect("facts");
        assert_eq!(facts.len(), MAX_FACTS);
    }

    #[tokio::test]
    async fn bare_array_reply_is_accepted() {
        let reply = json!([fact_json("f1", "first"), fact_json("f2", "second")]);
        let gateway = gateway(&reply.to_string());
        let facts = research_topic(&gateway, "aviation").await.expect("facts");
        assert_eq!(facts.len(), 2);
    }
}
