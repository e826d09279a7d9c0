use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use crate::types::Config;

pub const DEFAULT_AI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_HISTORY_PATH: &str = "triage-history.json";
pub const DEFAULT_REPORT_PATH: &str = "triage-report.json";
pub const DEFAULT_LOG_TAIL_LINES: i64 = 100;
pub const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 30;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

// Blank values count as unset.
fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let ai_api_key = non_empty(env, "AI_API_KEY")
        .ok_or_else(|| anyhow!("AI_API_KEY must be provided via Secret env"))?;

    let ai_api_url = non_empty(env, "AI_API_URL").unwrap_or_else(|| DEFAULT_AI_API_URL.to_string());
    let ai_model = non_empty(env, "AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string());

    // Repeated namespaces would list the same pods twice.
    let mut namespaces: Vec<String> = Vec::new();
    for ns in env.get_var("NAMESPACES").unwrap_or_default().split(',') {
        let ns = ns.trim();
        if !ns.is_empty() && !namespaces.iter().any(|n| n == ns) {
            namespaces.push(ns.to_string());
        }
    }

    let history_path = non_empty(env, "HISTORY_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH));
    let report_path = non_empty(env, "REPORT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

    let log_tail_lines: i64 = env.get_var("LOG_TAIL_LINES")
        .and_then(|v| v.trim().parse().ok())
        .filter(|n: &i64| *n > 0)
        .unwrap_or(DEFAULT_LOG_TAIL_LINES);

    let call_timeout_seconds: u64 = env.get_var("CALL_TIMEOUT_SECONDS")
        .unwrap_or_else(|| DEFAULT_CALL_TIMEOUT_SECONDS.to_string())
        .trim()
        .parse()
        .context("Invalid CALL_TIMEOUT_SECONDS")?;
    if call_timeout_seconds == 0 {
        return Err(anyhow!("CALL_TIMEOUT_SECONDS must be greater than zero"));
    }

    Ok(Config {
        namespaces,
        cluster_name: non_empty(env, "CLUSTER_NAME"),
        ai_api_url,
        ai_api_key,
        ai_model,
        slack_webhook_url: non_empty(env, "SLACK_WEBHOOK_URL"),
        history_path,
        report_path,
        log_tail_lines,
        call_timeout_seconds,
    })
}
