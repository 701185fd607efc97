//! Speech output backed by an external text-to-speech program such as `espeak`.

use std::env;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use stowaway_agent::speech::SpeechOutput;
use stowaway_core::config::SpeechConfig;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Runs `<command> <args...> <text>` per utterance. At most one child is alive;
/// a new utterance or `cancel` kills the previous one.
pub struct CommandSpeechOutput {
    program: String,
    args: Vec<String>,
    supported: bool,
    current: Mutex<Option<Child>>,
}

impl CommandSpeechOutput {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            supported: command_available(&config.command),
            current: Mutex::new(None),
        }
    }

    fn stop_current(&self) {
        let previous = self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut child) = previous {
            if let Err(error) = child.start_kill() {
                debug!(event_name = "speech.cancel.noop", error = %error, "utterance already ended");
            }
        }
    }
}

impl SpeechOutput for CommandSpeechOutput {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn speak(&self, text: &str) {
        self.stop_current();

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(child);
            }
            Err(error) => {
                warn!(
                    event_name = "speech.spawn.failed",
                    program = %self.program,
                    error = %error,
                    "failed to start speech program"
                );
            }
        }
    }

    fn cancel(&self) {
        self.stop_current();
    }
}

/// Whether `program` is an existing path or resolves through `PATH`.
pub fn command_available(program: &str) -> bool {
    let program = program.trim();
    if program.is_empty() {
        return false;
    }
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }

    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
