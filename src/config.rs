use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// LLM completion service API key
    pub llm_api_key: String,

    /// LLM completion service base URL
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,

    /// Model name sent to the completion service
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Book catalog service base URL
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Book metadata service base URL (enrichment)
    #[serde(default = "default_metadata_api_url")]
    pub metadata_api_url: String,

    /// Timeout for a single LLM call, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Timeout for a single catalog call, in seconds
    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,

    /// Timeout for a single metadata lookup, in seconds
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// Retries for failed external calls. 0 keeps latency bounded:
    /// one failure is one fallback.
    #[serde(default)]
    pub max_retries: u32,

    /// Result cache time-to-live, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Delay between sequential enrichment calls, in milliseconds
    #[serde(default = "default_enrichment_delay_ms")]
    pub enrichment_delay_ms: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_llm_api_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_catalog_api_url() -> String {
    "https://bookcatalog.p.rapidapi.com".to_string()
}

fn default_metadata_api_url() -> String {
    "https://www.googleapis.com/books/v1".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_metadata_timeout_secs() -> u64 {
    5
}

fn default_cache_ttl_secs() -> u64 {
    7200 // 2 hours
}

fn default_enrichment_delay_ms() -> u64 {
    150
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
