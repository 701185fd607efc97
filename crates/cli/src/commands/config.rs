use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use stowaway_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let seeded = config
        .session
        .seed_containers
        .iter()
        .map(|items| items.len().to_string())
        .collect::<Vec<_>>();

    vec![
        Field {
            key: "llm.api_key",
            value: api_key,
            env_keys: &["STOWAWAY_LLM_API_KEY", "GEMINI_API_KEY"],
        },
        Field { key: "llm.model", value: config.llm.model.clone(), env_keys: &["STOWAWAY_LLM_MODEL"] },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["STOWAWAY_LLM_BASE_URL"],
        },
        Field {
            key: "llm.timeout_secs",
            value: config
                .llm
                .timeout_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "<none>".to_string()),
            env_keys: &["STOWAWAY_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "speech.enabled",
            value: config.speech.enabled.to_string(),
            env_keys: &["STOWAWAY_SPEECH_ENABLED"],
        },
        Field {
            key: "speech.command",
            value: config.speech.command.clone(),
            env_keys: &["STOWAWAY_SPEECH_COMMAND"],
        },
        Field { key: "speech.args", value: format!("{:?}", config.speech.args), env_keys: &[] },
        Field {
            key: "session.seed_containers",
            value: format!("{} containers (item counts: [{}])", seeded.len(), seeded.join(", ")),
            env_keys: &[],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["STOWAWAY_LOGGING_LEVEL", "STOWAWAY_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["STOWAWAY_LOGGING_FORMAT", "STOWAWAY_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of long keys so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() > 12 {
        let prefix = trimmed.chars().take(4).collect::<String>();
        return format!("{prefix}***");
    }
    "<redacted>".to_string()
}
