use serde::Serialize;
use stowaway_core::config::{AppConfig, LoadOptions};

use crate::commands::{CommandResult, EXIT_CHECKS_FAILED};
use crate::speech::command_available;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 0 when every check passes or is skipped, 1 otherwise.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code =
        if report.overall_status == CheckStatus::Fail { EXIT_CHECKS_FAILED } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(DoctorCheck {
                name: "llm_api_key",
                status: CheckStatus::Pass,
                details: format!("API key present for model `{}`", config.llm.model),
            });
            checks.push(check_speech_command(&config));
        }
        Err(error) => {
            let message = error.to_string();
            let key_missing = message.contains("llm.api_key");
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: message,
            });
            checks.push(DoctorCheck {
                name: "llm_api_key",
                status: if key_missing { CheckStatus::Fail } else { CheckStatus::Skipped },
                details: if key_missing {
                    "no API key configured; set STOWAWAY_LLM_API_KEY or GEMINI_API_KEY".to_string()
                } else {
                    "skipped because configuration did not load".to_string()
                },
            });
            checks.push(DoctorCheck {
                name: "speech_command",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Speech is optional, so a missing program only fails when speech is enabled.
fn check_speech_command(config: &AppConfig) -> DoctorCheck {
    let command = config.speech.command.as_str();
    let available = command_available(command);

    match (config.speech.enabled, available) {
        (_, true) => DoctorCheck {
            name: "speech_command",
            status: CheckStatus::Pass,
            details: format!("`{command}` found"),
        },
        (true, false) => DoctorCheck {
            name: "speech_command",
            status: CheckStatus::Fail,
            details: format!("speech is enabled but `{command}` was not found on PATH"),
        },
        (false, false) => DoctorCheck {
            name: "speech_command",
            status: CheckStatus::Skipped,
            details: format!("`{command}` not found; speech output will be unavailable"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
