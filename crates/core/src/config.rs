use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => default,
    }
}

/// Values of `TMPLSYNC_ENV` that select the production configuration set.
const PRODUCTION_ENVS: &[&str] = &["production", "prod", "p"];

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Real endpoints and authentication when true; synthetic records otherwise.
    pub production: bool,
    pub bus: BusConfig,
    pub upstream: UpstreamConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TMPLSYNC_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TMPLSYNC_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let production = is_production_env(&profiled_env_or(p, "TMPLSYNC_ENV", "local"));
        Self {
            profile: p.to_string(),
            production,
            bus: BusConfig::from_env_profiled(p, production),
            upstream: UpstreamConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
        }
    }

    /// Reject combinations the worker cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.scheduler.poll_interval_secs == 0 {
            return Err(CoreError::Config("POLL_INTERVAL_SECS must be > 0".into()));
        }
        if self.scheduler.reset_interval_secs == 0 {
            return Err(CoreError::Config("RESET_INTERVAL_SECS must be > 0".into()));
        }
        if self.bus.message_ttl_secs == 0 {
            return Err(CoreError::Config("BUS_MESSAGE_TTL_SECS must be > 0".into()));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(CoreError::Config("UPSTREAM_TIMEOUT_SECS must be > 0".into()));
        }
        if self.bus.routing_key.is_empty() {
            return Err(CoreError::Config("BUS_ROUTING_KEY must not be empty".into()));
        }
        if self.production && !self.upstream.has_credentials() {
            return Err(CoreError::Config(
                "production mode requires UPSTREAM_USERNAME and UPSTREAM_PASSWORD".into(),
            ));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    pub fn mode_label(&self) -> &str {
        if self.production { "production" } else { "local" }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}, mode: {}):", self.profile_label(), self.mode_label());
        tracing::info!("  bus:        endpoint={}, bind={}, exchange={}, routing_key={}, ttl={}s",
            self.bus.endpoint, self.bus.bind, self.bus.exchange, self.bus.routing_key, self.bus.message_ttl_secs);
        tracing::info!("  upstream:   templates={}, existing_ids={}, login={}, user={}",
            self.upstream.templates_url, self.upstream.existing_ids_url, self.upstream.login_url,
            self.upstream.username.as_deref().unwrap_or("(none)"));
        tracing::info!("  scheduler:  poll={}s, reset={}s",
            self.scheduler.poll_interval_secs, self.scheduler.reset_interval_secs);
    }
}

pub fn is_production_env(value: &str) -> bool {
    PRODUCTION_ENVS.contains(&value.trim().to_ascii_lowercase().as_str())
}

// ── Message bus ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// ZeroMQ endpoint (`tcp://127.0.0.1:5555`) or AMQP broker URI (`amqp://...`).
    pub endpoint: String,
    /// Bind the endpoint ourselves instead of connecting to a broker frontend.
    pub bind: bool,
    pub exchange: String,
    pub routing_key: String,
    pub message_ttl_secs: u64,
}

impl BusConfig {
    fn from_env_profiled(p: &str, production: bool) -> Self {
        Self {
            endpoint: profiled_env_or(p, "BUS_ENDPOINT", "tcp://127.0.0.1:5555"),
            // Local runs have no broker to connect to.
            bind: profiled_env_bool(p, "BUS_BIND", !production),
            exchange: profiled_env_or(p, "BUS_EXCHANGE", "templates"),
            routing_key: profiled_env_or(p, "BUS_ROUTING_KEY", "templates.update"),
            message_ttl_secs: profiled_env_u64(p, "BUS_MESSAGE_TTL_SECS", 60 * 60),
        }
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }
}

// ── Upstream template service ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub templates_url: String,
    pub existing_ids_url: String,
    pub login_url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            templates_url: profiled_env_or(p, "UPSTREAM_TEMPLATES_URL", "http://localhost:8080/templates"),
            existing_ids_url: profiled_env_or(
                p,
                "UPSTREAM_EXISTING_IDS_URL",
                "http://localhost:8080/templates/external-ids",
            ),
            login_url: profiled_env_or(p, "UPSTREAM_LOGIN_URL", "http://localhost:8080/login"),
            username: profiled_env_opt(p, "UPSTREAM_USERNAME"),
            password: profiled_env_opt(p, "UPSTREAM_PASSWORD"),
            timeout_secs: profiled_env_u64(p, "UPSTREAM_TIMEOUT_SECS", 30),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub reset_interval_secs: u64,
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            poll_interval_secs: profiled_env_u64(p, "POLL_INTERVAL_SECS", 60),
            reset_interval_secs: profiled_env_u64(p, "RESET_INTERVAL_SECS", 24 * 60 * 60),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reset_interval(&self) -> Duration {
        Duration::from_secs(self.reset_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            reset_interval_secs: 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests never share keys.

    #[test]
    fn defaults_select_local_mode() {
        let cfg = Config::for_profile("CFGTESTDEFAULTS");
        assert_eq!(cfg.bus.exchange, "templates");
        assert_eq!(cfg.bus.routing_key, "templates.update");
        assert_eq!(cfg.bus.message_ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.scheduler.reset_interval(), Duration::from_secs(86_400));
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("CFGTESTPROF_TMPLSYNC_ENV", "prod");
        env::set_var("CFGTESTPROF_UPSTREAM_USERNAME", "svc");
        env::set_var("CFGTESTPROF_UPSTREAM_PASSWORD", "hunter2");
        env::set_var("CFGTESTPROF_POLL_INTERVAL_SECS", "5");

        let cfg = Config::for_profile("cfgtestprof");
        assert_eq!(cfg.profile, "CFGTESTPROF");
        assert!(cfg.production);
        assert_eq!(cfg.scheduler.poll_interval_secs, 5);
        assert!(cfg.validate().is_ok());

        env::remove_var("CFGTESTPROF_TMPLSYNC_ENV");
        env::remove_var("CFGTESTPROF_UPSTREAM_USERNAME");
        env::remove_var("CFGTESTPROF_UPSTREAM_PASSWORD");
        env::remove_var("CFGTESTPROF_POLL_INTERVAL_SECS");
    }

    #[test]
    fn production_without_credentials_is_rejected() {
        let mut cfg = Config::for_profile("CFGTESTNOCREDS");
        cfg.production = true;
        cfg.upstream.username = None;
        cfg.upstream.password = None;
        match cfg.validate() {
            Err(CoreError::Config(msg)) => assert!(msg.contains("UPSTREAM_USERNAME")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut cfg = Config::for_profile("CFGTESTZERO");
        cfg.production = false;
        cfg.scheduler.poll_interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_ttl_and_zero_timeout_are_rejected() {
        let mut cfg = Config::for_profile("CFGTESTZEROTTL");
        cfg.production = false;
        cfg.bus.message_ttl_secs = 0;
        match cfg.validate() {
            Err(CoreError::Config(msg)) => assert!(msg.contains("BUS_MESSAGE_TTL_SECS")),
            other => panic!("expected config error, got {other:?}"),
        }

        cfg.bus.message_ttl_secs = 3600;
        cfg.upstream.timeout_secs = 0;
        match cfg.validate() {
            Err(CoreError::Config(msg)) => assert!(msg.contains("UPSTREAM_TIMEOUT_SECS")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn production_env_values() {
        assert!(is_production_env("production"));
        assert!(is_production_env("PROD"));
        assert!(is_production_env(" p "));
        assert!(!is_production_env("local"));
        assert!(!is_production_env(""));
    }
}
