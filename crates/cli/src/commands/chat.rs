//! Interactive terminal session.
//!
//! Plain lines are commands for the assistant. Slash commands drive the rest of
//! the session: `/scan` stands in for the camera, `/speak` toggles read-aloud.
//! Ctrl-C cancels a running scan; at the prompt or during a text turn it ends
//! the session.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use stowaway_agent::controller::{ConversationController, TurnOutcome};
use stowaway_agent::gemini::GeminiClient;
use stowaway_agent::vision::ScanImage;
use stowaway_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use stowaway_core::domain::container::{Container, ContainerId};
use stowaway_core::store::ContainerStore;
use stowaway_core::transcript::{Message, Sender};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::commands::{
    CommandResult, EXIT_CONFIG_INVALID, EXIT_RUNTIME_UNAVAILABLE, EXIT_SESSION_FAILED,
};
use crate::logging::init_logging;
use crate::speech::CommandSpeechOutput;

const HELP: &str = "Type a command, for example \"add skis to container 1\" or \"what's in container 2?\".
  /scan <container> <image>  identify items in a photo and pick which to add
  /containers                show every container
  /speak                     toggle reading replies aloud
  /help                      show this help
  /quit                      leave";

const SCAN_USAGE: &str = "Usage: /scan <container number> <path to image>";

#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Empty,
    Message(String),
    Scan { container: ContainerId, path: PathBuf },
    Containers,
    Speak,
    Help,
    Quit,
    Invalid(String),
}

pub fn run(speak: bool) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides { speech_enabled: speak.then_some(true) },
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG_INVALID,
            );
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME_UNAVAILABLE,
            );
        }
    };

    match runtime.block_on(run_session(config)) {
        Ok(()) => CommandResult::completed(String::new()),
        Err(error) => {
            CommandResult::failure("chat", "session", format!("{error:#}"), EXIT_SESSION_FAILED)
        }
    }
}

async fn run_session(config: AppConfig) -> anyhow::Result<()> {
    let llm = GeminiClient::from_config(&config.llm).context("failed to build the LLM client")?;
    let model = llm.model().to_string();
    let speech = Arc::new(CommandSpeechOutput::from_config(&config.speech));
    let store = ContainerStore::seeded(config.session.seed_containers.clone());
    let container_count = store.len();
    let controller = Arc::new(ConversationController::with_llm(store, Arc::new(llm), speech));

    info!(
        event_name = "chat.session.started",
        model = %model,
        containers = container_count,
        "chat session started"
    );

    println!("stowaway: {container_count} containers ready. Type /help for commands.");
    if config.speech.enabled && !controller.set_speech_output(true) {
        println!(
            "! Speech output is unavailable: `{}` was not found.",
            config.speech.command
        );
    }

    let mut interrupts = Interrupts::install();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rendered = 0;
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            () = interrupts.next() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Invalid(reason) => println!("! {reason}"),
            ChatInput::Containers => {
                println!("{}", render_containers(&controller.snapshot().containers));
            }
            ChatInput::Speak => {
                if controller.toggle_speech_output() {
                    println!("! Speech output on.");
                } else {
                    println!("! Speech output off.");
                }
            }
            ChatInput::Message(text) => {
                let outcome = tokio::select! {
                    outcome = controller.send_message(&text) => Some(outcome),
                    () = interrupts.next() => None,
                };
                match outcome {
                    Some(TurnOutcome::Ignored) => {
                        println!("! Still working on the previous request.");
                    }
                    Some(_) => {}
                    None => {
                        println!("! Interrupted.");
                        break;
                    }
                }
            }
            ChatInput::Scan { container, path } => {
                scan(&controller, &mut interrupts, container, &path).await;
            }
        }

        let messages = controller.snapshot().messages;
        for message in settled(&messages, &mut rendered) {
            if let Some(line) = render_message(message) {
                println!("{line}");
            }
        }
    }

    controller.set_speech_output(false);
    info!(event_name = "chat.session.ended", "chat session ended");
    Ok(())
}

/// Opens the camera for one capture; Ctrl-C while analyzing closes it.
async fn scan(
    controller: &Arc<ConversationController>,
    interrupts: &mut Interrupts,
    container: ContainerId,
    path: &Path,
) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) => {
            println!("! Could not read {}: {error}", path.display());
            return;
        }
    };
    let image = ScanImage { mime_type: mime_type_for(path).to_string(), bytes };

    let ticket = controller.open_camera();
    let mut capture = tokio::spawn({
        let controller = controller.clone();
        async move { controller.capture_scan(ticket, image, container).await }
    });

    let outcome = tokio::select! {
        joined = &mut capture => joined.ok(),
        () = interrupts.next() => {
            controller.dismiss_camera();
            capture.await.ok()
        }
    };
    controller.dismiss_camera();

    if outcome == Some(TurnOutcome::Ignored) {
        println!("! Still working on the previous request.");
    }
}

/// Session-wide Ctrl-C listener, installed once so no press is lost between
/// awaits. Presses made while one is still unread are dropped.
struct Interrupts {
    receiver: mpsc::Receiver<()>,
    listener: Option<JoinHandle<()>>,
}

impl Interrupts {
    fn install() -> Self {
        let (sender, receiver) = mpsc::channel(1);
        let listener = tokio::spawn(async move {
            loop {
                if let Err(error) = tokio::signal::ctrl_c().await {
                    warn!(event_name = "chat.signal.unavailable", error = %error, "cannot listen for Ctrl-C");
                    break;
                }
                if sender.is_closed() {
                    break;
                }
                let _ = sender.try_send(());
            }
        });
        Self { receiver, listener: Some(listener) }
    }

    /// Resolves on the next Ctrl-C; never resolves once the listener is gone.
    async fn next(&mut self) {
        if self.receiver.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn parse_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatInput::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ChatInput::Message(trimmed.to_string());
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match name.to_ascii_lowercase().as_str() {
        "quit" | "exit" => ChatInput::Quit,
        "help" => ChatInput::Help,
        "containers" => ChatInput::Containers,
        "speak" => ChatInput::Speak,
        "scan" => parse_scan(args.trim()),
        other => ChatInput::Invalid(format!("Unknown command /{other}. Type /help for commands.")),
    }
}

fn parse_scan(args: &str) -> ChatInput {
    let Some((number, path)) = args.split_once(char::is_whitespace) else {
        return ChatInput::Invalid(SCAN_USAGE.to_string());
    };
    let path = path.trim();
    match number.trim_start_matches('#').parse::<u32>() {
        Ok(number) if number > 0 && !path.is_empty() => {
            ChatInput::Scan { container: ContainerId(number), path: PathBuf::from(path) }
        }
        _ => ChatInput::Invalid(SCAN_USAGE.to_string()),
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension =
        path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Messages not yet printed, up to the first one still loading.
fn settled<'a>(messages: &'a [Message], rendered: &mut usize) -> &'a [Message] {
    let start = (*rendered).min(messages.len());
    let end = messages[start..]
        .iter()
        .position(|message| message.is_loading)
        .map(|offset| start + offset)
        .unwrap_or(messages.len());
    *rendered = end;
    &messages[start..end]
}

/// The user's own lines are already on screen.
fn render_message(message: &Message) -> Option<String> {
    match message.sender {
        Sender::User => None,
        Sender::Ai => Some(format!("stowaway: {}", message.text)),
        Sender::System => Some(format!("! {}", message.text)),
    }
}

fn render_containers(containers: &[Container]) -> String {
    if containers.is_empty() {
        return "No containers yet.".to_string();
    }
    containers
        .iter()
        .map(|container| {
            let items =
                if container.is_empty() { "(empty)".to_string() } else { container.item_list() };
            format!("  #{}: {items}", container.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use stowaway_core::domain::container::{Container, ContainerId};
    use stowaway_core::transcript::{Sender, Transcript};

    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::{
        mime_type_for, parse_input, render_containers, render_message, settled, ChatInput,
        Interrupts, SCAN_USAGE,
    };

    #[tokio::test]
    async fn interrupts_are_delivered_once_each() {
        let (sender, receiver) = mpsc::channel(1);
        let mut interrupts = Interrupts { receiver, listener: None };

        sender.try_send(()).expect("first press");
        assert!(sender.try_send(()).is_err(), "unread press should absorb the next one");

        tokio::time::timeout(Duration::from_secs(1), interrupts.next())
            .await
            .expect("buffered press should be delivered");
        assert!(tokio::time::timeout(Duration::from_millis(50), interrupts.next())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn closed_listener_never_interrupts() {
        let (sender, receiver) = mpsc::channel::<()>(1);
        drop(sender);
        let mut interrupts = Interrupts { receiver, listener: None };

        assert!(tokio::time::timeout(Duration::from_millis(50), interrupts.next())
            .await
            .is_err());
    }

    #[test]
    fn plain_lines_are_messages_and_blank_lines_are_empty() {
        assert_eq!(
            parse_input("  add skis to container 1 "),
            ChatInput::Message("add skis to container 1".to_string())
        );
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }

    #[test]
    fn slash_commands_are_recognized() {
        assert_eq!(parse_input("/quit"), ChatInput::Quit);
        assert_eq!(parse_input("/EXIT"), ChatInput::Quit);
        assert_eq!(parse_input("/help"), ChatInput::Help);
        assert_eq!(parse_input("/containers"), ChatInput::Containers);
        assert_eq!(parse_input("/speak"), ChatInput::Speak);
        assert!(matches!(parse_input("/dance"), ChatInput::Invalid(reason) if reason.contains("/dance")));
    }

    #[test]
    fn scan_takes_container_number_and_path() {
        assert_eq!(
            parse_input("/scan #2 photos/shelf one.jpg"),
            ChatInput::Scan { container: ContainerId(2), path: PathBuf::from("photos/shelf one.jpg") }
        );
        assert_eq!(parse_input("/scan"), ChatInput::Invalid(SCAN_USAGE.to_string()));
        assert_eq!(parse_input("/scan two shelf.jpg"), ChatInput::Invalid(SCAN_USAGE.to_string()));
        assert_eq!(parse_input("/scan 0 shelf.jpg"), ChatInput::Invalid(SCAN_USAGE.to_string()));
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("capture")), "image/jpeg");
    }

    #[test]
    fn settled_stops_at_loading_message_and_resumes() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::User, "list");
        let placeholder = transcript.push_loading();
        let mut rendered = 0;

        assert_eq!(settled(transcript.messages(), &mut rendered).len(), 1);
        assert_eq!(rendered, 1);

        transcript.resolve(&placeholder, Sender::Ai, "Here are your containers:");
        let fresh = settled(transcript.messages(), &mut rendered);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].text, "Here are your containers:");
        assert!(settled(transcript.messages(), &mut rendered).is_empty());
    }

    #[test]
    fn user_lines_are_not_echoed() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::User, "hi");
        transcript.push(Sender::System, "Scan discarded because the camera was closed.");
        let messages = transcript.messages();

        assert_eq!(render_message(&messages[0]), None);
        assert_eq!(
            render_message(&messages[1]).as_deref(),
            Some("! Scan discarded because the camera was closed.")
        );
    }

    #[test]
    fn containers_render_with_empty_marker() {
        let containers = vec![
            Container::new(ContainerId(1), vec!["Skis".to_string(), "Poles".to_string()]),
            Container::new(ContainerId(3), Vec::new()),
        ];

        assert_eq!(render_containers(&containers), "  #1: Skis, Poles\n  #3: (empty)");
        assert_eq!(render_containers(&[]), "No containers yet.");
    }
}
