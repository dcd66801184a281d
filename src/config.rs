use secrecy::Secret;
use std::env;
use std::time::Duration;

/// Process-wide settings, loaded once at startup and held by `main` as the single
/// source of truth for every service constructed there (see "Global singletons" in
/// the design notes — nothing here is a lazily-initialized global).
#[derive(Clone)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub maps_api_key: Option<Secret<String>>,
    pub maps_api_base_url: String,
    pub llm_api_key: Option<Secret<String>>,
    pub llm_fallback_api_key: Option<Secret<String>>,
    pub llm_api_base_url: String,
    pub llm_model: String,
    pub llm_fallback_model: String,
    pub session_ttl: Duration,
    pub rate_limit_max_messages: u32,
    pub rate_limit_window: Duration,
    pub hold_expiry: Duration,
    pub profiler_tables_path: Option<String>,
}

impl Settings {
    /// Mirrors the teacher's `AppConfig::default()` — required values panic early with
    /// a descriptive message, optional ones fall back to sane defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let maps_api_key = env::var("GOOGLE_MAPS_API_KEY").ok().map(Secret::new);
        let maps_api_base_url = env::var("GOOGLE_MAPS_API_URL")
            .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string());

        let llm_api_key = env::var("LLM_API_KEY").ok().map(Secret::new);
        let llm_fallback_api_key = env::var("LLM_FALLBACK_API_KEY").ok().map(Secret::new);
        let llm_api_base_url =
            env::var("LLM_API_URL").unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
        let llm_fallback_model =
            env::var("LLM_FALLBACK_MODEL").unwrap_or_else(|_| "llama-3.1-8b-instant".to_string());

        let session_ttl_hours: u64 = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        let rate_limit_max_messages = env::var("RATE_LIMIT_MAX_MESSAGES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let rate_limit_window_minutes: u64 = env::var("RATE_LIMIT_WINDOW_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let hold_expiry_minutes: u64 = env::var("HOLD_EXPIRY_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            database_url,
            port,
            maps_api_key,
            maps_api_base_url,
            llm_api_key,
            llm_fallback_api_key,
            llm_api_base_url,
            llm_model,
            llm_fallback_model,
            session_ttl: Duration::from_secs(session_ttl_hours * 3600),
            rate_limit_max_messages,
            rate_limit_window: Duration::from_secs(rate_limit_window_minutes * 60),
            hold_expiry: Duration::from_secs(hold_expiry_minutes * 60),
            profiler_tables_path: env::var("PROFILER_TABLES_PATH").ok(),
        }
    }

    pub fn maps_configured(&self) -> bool {
        self.maps_api_key.is_some()
    }

    pub fn llm_configured(&self) -> bool {
        self.llm_api_key.is_some()
    }
}
