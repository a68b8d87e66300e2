use std::env;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load an explicit env file. Unlike [`load_dotenv`], a missing file is an error.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Key lookup with profile prefixing: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
/// Empty values count as unset.
struct Profiled<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Profiled<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|s| !s.trim().is_empty())
    }

    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            if let Some(v) = self.raw(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        self.raw(key)
    }

    /// First key that resolves wins.
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.opt(k))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr + Copy>(&self, key: &str, default: T) -> T {
        match self.opt(key) {
            Some(v) => v.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %v, "unparseable config value, using default");
                default
            }),
            None => default,
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub environment: Environment,
    pub supabase: SupabaseConfig,
    pub gemini: GeminiConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Build config from process environment variables (call `load_dotenv()` first).
    /// Profile is read from `SEMDOC_PROFILE`. When set (e.g. `PROD`), every key is
    /// first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let lookup = |key: &str| env::var(key).ok();
        let profile = lookup("SEMDOC_PROFILE").unwrap_or_default();
        Self::from_lookup(&profile, &lookup)
    }

    /// Build config for a specific profile from an arbitrary key lookup.
    pub fn from_lookup(profile: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let profile = profile.trim().to_uppercase();
        let p = Profiled {
            profile: &profile,
            lookup,
        };
        Self {
            environment: Environment::from_env_profiled(&p),
            supabase: SupabaseConfig::from_env_profiled(&p),
            gemini: GeminiConfig::from_env_profiled(&p),
            embedding: EmbeddingConfig::from_env_profiled(&p),
            search: SearchConfig::from_env_profiled(&p),
            llm: LlmConfig::from_env_profiled(&p),
            http: HttpConfig::from_env_profiled(&p),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Names of required variables that are unset.
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.supabase.url.is_none() {
            missing.push("SUPABASE_URL".to_string());
        }
        if self.supabase.service_role_key.is_none() {
            missing.push("SUPABASE_SERVICE_ROLE_KEY".to_string());
        }
        if self.gemini.api_key.is_none() {
            missing.push("GEMINI_API_KEY".to_string());
        }
        missing
    }

    /// Check required credentials.
    ///
    /// In development a missing credential is fatal. In production it is logged
    /// and the affected clients come up disabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            tracing::info!("configuration complete");
            return Ok(());
        }
        match self.environment {
            Environment::Production => {
                tracing::warn!(
                    missing = %missing.join(", "),
                    "missing credentials in production, affected tools will report a configuration error"
                );
                Ok(())
            }
            Environment::Development => Err(ConfigError::MissingVars(missing)),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}, env: {}):", self.profile_label(), self.environment);
        tracing::info!(
            "  supabase:   url={}, table={}, rpc={}, key={}",
            self.supabase.url.as_deref().unwrap_or("(none)"),
            self.supabase.table,
            self.supabase.match_function,
            if self.supabase.service_role_key.is_some() { "set" } else { "unset" },
        );
        tracing::info!(
            "  gemini:     model={}, embed_model={}, key={}",
            self.gemini.model,
            self.gemini.embed_model,
            if self.gemini.api_key.is_some() { "set" } else { "unset" },
        );
        tracing::info!("  embedding:  dimensions={}", self.embedding.dimensions);
        tracing::info!(
            "  search:     top_k={}, threshold={}",
            self.search.top_k,
            self.search.similarity_threshold
        );
        tracing::info!(
            "  llm:        temperature={}, max_tokens={}, http_timeout={}s",
            self.llm.temperature,
            self.llm.max_tokens,
            self.http.timeout_secs
        );
    }
}

// ── Deployment mode ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        match p.first_of(&["DEPLOY_ENV", "NODE_ENV"]) {
            Some(v) => v.parse().unwrap_or(Environment::Development),
            None => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

// ── Supabase (vector table + match RPC) ───────────────────────

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub table: String,
    pub match_function: String,
}

impl SupabaseConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            url: p.opt("SUPABASE_URL"),
            service_role_key: p.first_of(&["SUPABASE_SERVICE_ROLE_KEY", "SUPABASE_KEY"]),
            table: p.or("SUPABASE_TABLE", "documents"),
            match_function: p.or("SUPABASE_MATCH_FUNCTION", "match_documents"),
        }
    }

    /// Base URL and key, or the list of what is missing.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        match (self.url.as_deref(), self.service_role_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("SUPABASE_URL".to_string());
                }
                if key.is_none() {
                    missing.push("SUPABASE_SERVICE_ROLE_KEY".to_string());
                }
                Err(ConfigError::MissingVars(missing))
            }
        }
    }
}

// ── Gemini (embeddings + generation) ──────────────────────────

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Text-generation model.
    pub model: String,
    pub embed_model: String,
}

impl GeminiConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            api_key: p.opt("GEMINI_API_KEY"),
            base_url: p.or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
            model: p.or("GEMINI_MODEL", "gemini-2.0-flash"),
            embed_model: p.or("GEMINI_EMBED_MODEL", "models/text-embedding-004"),
        }
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVars(vec!["GEMINI_API_KEY".to_string()]))
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            dimensions: p.parsed("EMBED_DIM", 768),
        }
    }
}

// ── Search defaults ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl SearchConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            similarity_threshold: p.parsed("SIMILARITY_THRESHOLD", 0.6),
            top_k: p.parsed("TOPK_DOCUMENTS", 6),
        }
    }
}

// ── Text generation ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            temperature: p.parsed("LLM_TEMPERATURE", 0.2),
            max_tokens: p.parsed("LLM_MAX_TOKENS", 1024),
        }
    }
}

// ── HTTP clients ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl HttpConfig {
    fn from_env_profiled(p: &Profiled<'_>) -> Self {
        Self {
            timeout_secs: p.parsed("HTTP_TIMEOUT_SECS", 60),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
