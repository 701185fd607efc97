pub mod chat;
pub mod config;
pub mod doctor;

use serde::Serialize;

pub const EXIT_CHECKS_FAILED: u8 = 1;
pub const EXIT_CONFIG_INVALID: u8 = 2;
pub const EXIT_RUNTIME_UNAVAILABLE: u8 = 3;
pub const EXIT_SESSION_FAILED: u8 = 4;

/// What a subcommand prints to stdout and the process exit code.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Machine-readable failure line, so scripts can branch on `error_class`.
#[derive(Debug, Serialize)]
struct FailurePayload<'a> {
    command: &'a str,
    status: &'static str,
    error_class: &'a str,
    message: String,
}

impl CommandResult {
    pub fn completed(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload =
            FailurePayload { command, status: "error", error_class, message: message.into() };
        let output = serde_json::to_string(&payload).unwrap_or_else(|error| {
            format!("{command}: {error_class}: {} ({error})", payload.message)
        });
        Self { exit_code, output }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{CommandResult, EXIT_CONFIG_INVALID};

    #[test]
    fn failure_is_a_single_json_line() {
        let result = CommandResult::failure(
            "chat",
            "config_validation",
            "llm.api_key is \"missing\"",
            EXIT_CONFIG_INVALID,
        );

        assert_eq!(result.exit_code, 2);
        assert_eq!(result.output.lines().count(), 1);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(payload["message"], "llm.api_key is \"missing\"");
    }

    #[test]
    fn completed_exits_zero() {
        let result = CommandResult::completed("");

        assert_eq!(result.exit_code, 0);
        assert!(result.output.is_empty());
    }
}
