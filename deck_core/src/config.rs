use crate::contracts::PipelineError;
use crate::data_models::slide::LayoutVariant;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use url::Url;

pub const API_KEY_ENV: &str = "API_KEY";
pub const API_BASE_ENV: &str = "DECK_API_BASE";
pub const PRICING_FILE_ENV: &str = "DECK_PRICING_FILE";
pub const TUNING_FILE_ENV: &str = "DECK_TUNING_FILE";
pub const DEADLINE_ENV: &str = "DECK_DEADLINE_SECS";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// # NDOC
/// component: `config`
/// purpose: Abstract capability tier requested by an agent.
/// invariants:
///   - `Smart` is never used by the slide generator (truncation risk).
///   - `Image` routes to the image service, not the chat chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Smart,
    Agentic,
    Simple,
    Image,
}

/// # NDOC
/// component: `config`
/// purpose: One chat model with its capability flags for feature stripping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSpec {
    pub id: String,
    pub supports_thinking: bool,
    pub supports_vision: bool,
    pub default_max_output_tokens: u32,
}

/// # NDOC
/// component: `config`
/// purpose: The fallback chain `smart -> fast -> backup -> lite` plus image pair.
/// invariants:
///   - Chain order is fixed; tiers map to a starting position, never a subset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelCatalog {
    pub smart: ModelSpec,
    pub fast: ModelSpec,
    pub backup: ModelSpec,
    pub lite: ModelSpec,
    pub image_fast: String,
    pub image_pro: String,
}

impl ModelCatalog {
    pub fn from_env() -> Self {
        let id = |var: &str, default: &str| env::var(var).unwrap_or_else(|_| default.to_string());
        Self {
            smart: ModelSpec {
                id: id("DECK_MODEL_SMART", "gemini-2.5-pro"),
                supports_thinking: true,
                supports_vision: true,
                default_max_output_tokens: 16_384,
            },
            fast: ModelSpec {
                id: id("DECK_MODEL_FAST", "gemini-2.5-flash"),
                supports_thinking: true,
                supports_vision: true,
                default_max_output_tokens: 8_192,
            },
            backup: ModelSpec {
                id: id("DECK_MODEL_BACKUP", "gemini-2.0-flash"),
                supports_thinking: false,
                supports_vision: false,
                default_max_output_tokens: 8_192,
            },
            lite: ModelSpec {
                id: id("DECK_MODEL_LITE", "gemini-2.5-flash-lite"),
                supports_thinking: false,
                supports_vision: false,
                default_max_output_tokens: 4_096,
            },
            image_fast: id("DECK_MODEL_IMAGE_FAST", "imagen-3.0-fast"),
            image_pro: id("DECK_MODEL_IMAGE_PRO", "imagen-3.0"),
        }
    }

    pub fn chain(&self) -> [&ModelSpec; 4] {
        [&self.smart, &self.fast, &self.backup, &self.lite]
    }

    /// Position in the fallback chain where calls for a tier begin.
    pub fn chain_start(&self, tier: ModelTier) -> usize {
        match tier {
            ModelTier::Smart => 0,
            ModelTier::Agentic | ModelTier::Image => 1,
            ModelTier::Simple => 3,
        }
    }
}

/// Per-model price envelope, USD per 1k tokens. Mirrors the shape of the
/// pricing override file so one serde type covers both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPrice {
    #[serde(default)]
    pub input_per_1k: Decimal,
    #[serde(default)]
    pub output_per_1k: Decimal,
    #[serde(default)]
    pub per_image: Option<Decimal>,
}

/// # NDOC
/// component: `config`
/// purpose: Immutable pricing table keyed by model id.
/// invariants:
///   - Unknown model ids fall back to the default price; cost accounting never fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTable {
    prices: HashMap<String, ModelPrice>,
    default_price: ModelPrice,
}

impl PricingTable {
    pub fn builtin() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            "gemini-2.5-pro".to_string(),
            ModelPrice {
                input_per_1k: Decimal::new(125, 5),
                output_per_1k: Decimal::new(1, 2),
                per_image: None,
            },
        );
        prices.insert(
            "gemini-2.5-flash".to_string(),
            ModelPrice {
                input_per_1k: Decimal::new(3, 4),
                output_per_1k: Decimal::new(25, 4),
                per_image: None,
            },
        );
        prices.insert(
            "gemini-2.0-flash".to_string(),
            ModelPrice {
                input_per_1k: Decimal::new(1, 4),
                output_per_1k: Decimal::new(4, 4),
                per_image: None,
            },
        );
        prices.insert(
            "gemini-2.5-flash-lite".to_string(),
            ModelPrice {
                input_per_1k: Decimal::new(1, 4),
                output_per_1k: Decimal::new(4, 4),
                per_image: None,
            },
        );
        prices.insert(
            "imagen-3.0-fast".to_string(),
            ModelPrice {
                input_per_1k: Decimal::ZERO,
                output_per_1k: Decimal::ZERO,
                per_image: Some(Decimal::new(2, 2)),
            },
        );
        prices.insert(
            "imagen-3.0".to_string(),
            ModelPrice {
                input_per_1k: Decimal::ZERO,
                output_per_1k: Decimal::ZERO,
                per_image: Some(Decimal::new(4, 2)),
            },
        );
        Self {
            prices,
            default_price: ModelPrice {
                input_per_1k: Decimal::new(5, 4),
                output_per_1k: Decimal::new(2, 3),
                per_image: Some(Decimal::new(3, 2)),
            },
        }
    }

    /// Builtin table with any entries from the override file merged on top.
    pub fn from_env() -> Result<Self, PipelineError> {
        let mut table = Self::builtin();
        if let Ok(path) = env::var(PRICING_FILE_ENV) {
            table.merge_file(Path::new(&path))?;
        }
        Ok(table)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<(), PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("cannot read pricing file {}: {e}", path.display()))
        })?;
        let overrides: HashMap<String, ModelPrice> = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::config(format!("invalid pricing file: {e}")))?;
        self.prices.extend(overrides);
        Ok(())
    }

    pub fn price_for(&self, model_id: &str) -> &ModelPrice {
        self.prices.get(model_id).unwrap_or(&self.default_price)
    }

    pub fn token_cost(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> Decimal {
        let price = self.price_for(model_id);
        let per_k = Decimal::from(1000u32);
        Decimal::from(input_tokens) / per_k * price.input_per_1k
            + Decimal::from(output_tokens) / per_k * price.output_per_1k
    }

    pub fn image_cost(&self, model_id: &str) -> Decimal {
        let price = self.price_for(model_id);
        price
            .per_image
            .or(self.default_price.per_image)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Tier-1 fit maxima for one layout variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutMaxima {
    pub max_bullets: usize,
    pub max_total_chars: usize,
}

/// # NDOC
/// component: `config`
/// purpose: Tunable thresholds for fit scoring, retries, and validation.
/// invariants:
///   - Every field has a compiled-in default; the override file is optional.
///   - Values are data, not code: changing them requires no recompilation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuningTable {
    pub fit_perfect: f64,
    pub fit_good: f64,
    pub fit_tight: f64,
    pub action_keep: f64,
    pub action_scale_down: f64,
    pub action_reroute: f64,
    pub reroute_bound: u32,
    pub call_timeout_secs: u64,
    pub retry_base_ms: u64,
    pub max_same_model_retries: u32,
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: i64,
    pub deck_deadline_secs: u64,
    pub max_bullet_chars: usize,
    pub layout_maxima: HashMap<LayoutVariant, LayoutMaxima>,
}

impl Default for TuningTable {
    fn default() -> Self {
        let mut layout_maxima = HashMap::new();
        let mut put = |variant: LayoutVariant, max_bullets: usize, max_total_chars: usize| {
            layout_maxima.insert(
                variant,
                LayoutMaxima {
                    max_bullets,
                    max_total_chars,
                },
            );
        };
        put(LayoutVariant::StandardVertical, 6, 560);
        put(LayoutVariant::SplitLeftText, 5, 420);
        put(LayoutVariant::SplitRightText, 5, 420);
        put(LayoutVariant::HeroCentered, 3, 260);
        put(LayoutVariant::BentoGrid, 4, 360);
        put(LayoutVariant::TimelineHorizontal, 5, 400);
        put(LayoutVariant::DashboardTiles, 4, 380);
        put(LayoutVariant::MetricsRail, 5, 420);
        put(LayoutVariant::AsymmetricGrid, 5, 430);
        Self {
            fit_perfect: 0.85,
            fit_good: 0.75,
            fit_tight: 0.6,
            action_keep: 0.85,
            action_scale_down: 0.7,
            action_reroute: 0.5,
            reroute_bound: 1,
            call_timeout_secs: 180,
            retry_base_ms: 2000,
            max_same_model_retries: 2,
            breaker_threshold: 3,
            breaker_cooldown_secs: 60,
            deck_deadline_secs: 480,
            max_bullet_chars: 60,
            layout_maxima,
        }
    }
}

impl TuningTable {
    pub fn from_env() -> Result<Self, PipelineError> {
        let mut table = Self::default();
        if let Ok(path) = env::var(TUNING_FILE_ENV) {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                PipelineError::config(format!("cannot read tuning file {path}: {e}"))
            })?;
            table = serde_json::from_str(&raw)
                .map_err(|e| PipelineError::config(format!("invalid tuning file: {e}")))?;
        }
        if let Ok(deadline) = env::var(DEADLINE_ENV) {
            table.deck_deadline_secs = deadline
                .parse()
                .map_err(|_| PipelineError::config(format!("{DEADLINE_ENV} must be seconds")))?;
        }
        Ok(table)
    }

    pub fn maxima_for(&self, variant: LayoutVariant) -> LayoutMaxima {
        self.layout_maxima
            .get(&variant)
            .copied()
            .unwrap_or(LayoutMaxima {
                max_bullets: 5,
                max_total_chars: 420,
            })
    }
}

/// # NDOC
/// component: `config`
/// purpose: Full engine configuration resolved once at entry.
/// invariants:
///   - A missing `API_KEY` is fatal here, with an actionable message.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: String,
    pub api_base: Url,
    pub models: ModelCatalog,
    pub pricing: PricingTable,
    pub tuning: TuningTable,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenv::dotenv().ok();
        let api_key = env::var(API_KEY_ENV).map_err(|_| {
            PipelineError::config(format!(
                "{API_KEY_ENV} is not set; export {API_KEY_ENV}=<your key> before generating decks"
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(PipelineError::config(format!(
                "{API_KEY_ENV} is empty; provide a real credential"
            )));
        }
        let base = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&base)
            .map_err(|e| PipelineError::config(format!("invalid {API_BASE_ENV} '{base}': {e}")))?;
        Ok(Self {
            api_key,
            api_base,
            models: ModelCatalog::from_env(),
            pricing: PricingTable::from_env()?,
            tuning: TuningTable::from_env()?,
        })
    }
}
