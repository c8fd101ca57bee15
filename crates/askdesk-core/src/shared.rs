//! Configuration shared by the core, the skills crate and the gateway.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session memory bounds and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Exchanges kept per session; the history holds `2 * max_turns` turns.
    pub max_turns: usize,
    /// Seconds of inactivity after which a session is swept.
    pub session_ttl_secs: u64,
    /// How often the gateway runs the expiry sweep.
    pub sweep_interval_secs: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_turns: 5,
            session_ttl_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

impl MemorySettings {
    pub fn history_capacity(&self) -> usize {
        self.max_turns.max(1) * 2
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Thresholds and timeouts used by the routing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Word-overlap score at or above which a match is answered straight from the KB.
    pub strong_word_score: usize,
    pub generation_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub search_max_results: usize,
    /// When false, unmatched questions go straight to the generative backend.
    pub web_search_enabled: bool,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            strong_word_score: 3,
            generation_timeout_secs: 20,
            search_timeout_secs: 10,
            search_max_results: 3,
            web_search_enabled: true,
        }
    }
}

impl RoutingSettings {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs.max(1))
    }
}

/// Generative backend selection (`mock` or `gemini`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub mode: String,
    pub api_key: Option<String>,
    pub api_base: String,
    /// Candidate models, tried in order until one answers.
    pub models: Vec<String>,
    pub system_instruction: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            mode: "mock".to_string(),
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            models: vec!["gemini-2.5-flash".to_string(), "gemini-1.5-flash".to_string()],
            system_instruction: "You are the campus help desk assistant. Answer politely, concisely and accurately. \
                Use the provided context when it is relevant; if it does not contain the answer, say so and give a general helpful response."
                .to_string(),
        }
    }
}

/// Web search provider selection (`disabled`, `serpapi` or `duckduckgo`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub provider: String,
    pub api_key: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            api_key: None,
        }
    }
}

/// Global application configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// JSON file with the static knowledge entries.
    pub knowledge_path: String,
    /// Optional sled directory with entries managed by the admin dashboard.
    #[serde(default)]
    pub knowledge_db_path: Option<String>,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "AskDesk Gateway".to_string(),
            port: 8010,
            knowledge_path: "./data/knowledge.json".to_string(),
            knowledge_db_path: None,
            memory: MemorySettings::default(),
            routing: RoutingSettings::default(),
            llm: LlmSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `ASKDESK__*` > file at
    /// `ASKDESK_CONFIG` (or `config/askdesk.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("ASKDESK_CONFIG").unwrap_or_else(|_| "config/askdesk.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = CoreConfig::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("knowledge_path", defaults.knowledge_path)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("ASKDESK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut cfg: CoreConfig = built.try_deserialize()?;
        cfg.memory.max_turns = cfg.memory.max_turns.max(1);
        cfg.routing.strong_word_score = cfg.routing.strong_word_score.max(1);
        cfg.routing.search_max_results = cfg.routing.search_max_results.max(1);
        Ok(cfg)
    }
}
