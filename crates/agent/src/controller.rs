//! Conversation controller: one session, one in-flight turn at a time.
//!
//! The controller owns the container store, the transcript and the pending
//! scan. Interpreter calls run as spawned tasks; session state is only touched
//! between awaits, so the state mutex is never held across a suspension point.
//! A second turn started while one is outstanding is ignored, not queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stowaway_core::domain::container::{Container, ContainerId, PendingScan};
use stowaway_core::executor::ActionExecutor;
use stowaway_core::store::ContainerStore;
use stowaway_core::transcript::{Message, Sender, Transcript};
use thiserror::Error;
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, error, info, warn};

use crate::intent::IntentInterpreter;
use crate::llm::LlmClient;
use crate::speech::SpeechOutput;
use crate::vision::{ImageInterpreter, ScanImage};

pub const GENERIC_ERROR_TEXT: &str = "Sorry, something went wrong. Please try again.";
pub const NO_ITEMS_FOUND_TEXT: &str = "I couldn't identify any items in that image.";
pub const SCAN_DISCARDED_TEXT: &str = "Scan discarded because the camera was closed.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant answered; the text is also in the transcript.
    Responded(String),
    /// The turn failed unexpectedly; a system message was appended.
    Failed(String),
    /// A scan finished after the camera was closed and its result was dropped.
    Discarded,
    /// Nothing happened: blank input, a stale camera ticket, or another turn in flight.
    Ignored,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("command interpretation task failed: {0}")]
    Interpretation(#[source] JoinError),
    #[error("image analysis task failed: {0}")]
    Analysis(#[source] JoinError),
}

impl TurnError {
    pub fn user_message(&self) -> &'static str {
        GENERIC_ERROR_TEXT
    }
}

/// Identifies one camera session; invalidated by `dismiss_camera` or a newer `open_camera`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanTicket(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub containers: Vec<Container>,
    pub messages: Vec<Message>,
    pub pending_scan: Option<PendingScan>,
    pub is_processing: bool,
    pub speech_enabled: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    store: ContainerStore,
    transcript: Transcript,
    pending_scan: Option<PendingScan>,
}

pub struct ConversationController {
    state: Mutex<SessionState>,
    processing: AtomicBool,
    speech_enabled: AtomicBool,
    camera_generation: AtomicU64,
    scan_task: Mutex<Option<AbortHandle>>,
    intents: IntentInterpreter,
    images: ImageInterpreter,
    executor: ActionExecutor,
    speech: Arc<dyn SpeechOutput>,
}

/// Holds the busy flag for the lifetime of a turn, including early returns and
/// a dropped turn future.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl ConversationController {
    pub fn new(
        store: ContainerStore,
        intents: IntentInterpreter,
        images: ImageInterpreter,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState { store, ..SessionState::default() }),
            processing: AtomicBool::new(false),
            speech_enabled: AtomicBool::new(false),
            camera_generation: AtomicU64::new(0),
            scan_task: Mutex::new(None),
            intents,
            images,
            executor: ActionExecutor::new(),
            speech,
        }
    }

    /// Uses one LLM client for both command and image interpretation.
    pub fn with_llm(
        store: ContainerStore,
        llm: Arc<dyn LlmClient>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        Self::new(
            store,
            IntentInterpreter::new(llm.clone()),
            ImageInterpreter::new(llm),
            speech,
        )
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            containers: state.store.snapshot(),
            messages: state.transcript.messages().to_vec(),
            pending_scan: state.pending_scan.clone(),
            is_processing: self.is_processing(),
            speech_enabled: self.speech_enabled.load(Ordering::SeqCst),
        }
    }

    /// Runs one text turn: interpret, execute, answer.
    pub async fn send_message(&self, text: &str) -> TurnOutcome {
        let command = text.trim();
        if command.is_empty() {
            return TurnOutcome::Ignored;
        }
        let Some(_busy) = BusyGuard::acquire(&self.processing) else {
            debug!(event_name = "session.turn.ignored_busy", "turn already in flight");
            return TurnOutcome::Ignored;
        };

        let (placeholder, containers, pending_scan) = {
            let mut state = self.lock_state();
            state.transcript.push(Sender::User, command);
            let placeholder = state.transcript.push_loading();
            // Consumed by this turn whatever the outcome.
            let pending_scan = state.pending_scan.take();
            (placeholder, state.store.snapshot(), pending_scan)
        };
        info!(
            event_name = "session.turn.started",
            correlation_id = %placeholder,
            pending_scan = pending_scan.is_some(),
            "interpreting command"
        );

        let interpreter = self.intents.clone();
        let owned_command = command.to_string();
        let task = tokio::spawn(async move {
            interpreter.interpret(&owned_command, &containers, pending_scan.as_ref()).await
        });

        match task.await {
            Ok(action) => {
                let reply = {
                    let mut state = self.lock_state();
                    let reply = self.executor.execute(&mut state.store, action);
                    state.transcript.resolve(&placeholder, Sender::Ai, reply.clone());
                    reply
                };
                info!(
                    event_name = "session.turn.completed",
                    correlation_id = %placeholder,
                    "turn completed"
                );
                self.announce(&reply);
                TurnOutcome::Responded(reply)
            }
            Err(join_error) => {
                let failure = TurnError::Interpretation(join_error);
                error!(
                    event_name = "session.turn.failed",
                    correlation_id = %placeholder,
                    error = %failure,
                    "turn failed"
                );
                let mut state = self.lock_state();
                state.pending_scan = None;
                state.transcript.resolve(&placeholder, Sender::System, failure.user_message());
                TurnOutcome::Failed(failure.user_message().to_string())
            }
        }
    }

    /// Starts a camera session; any earlier session becomes stale.
    pub fn open_camera(&self) -> ScanTicket {
        let generation = self.camera_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(event_name = "session.camera.opened", generation, "camera opened");
        ScanTicket(generation)
    }

    /// Closes the camera, aborting an outstanding analysis and invalidating its ticket.
    pub fn dismiss_camera(&self) {
        self.camera_generation.fetch_add(1, Ordering::SeqCst);
        let outstanding = self.scan_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = outstanding {
            handle.abort();
            info!(event_name = "session.camera.scan_aborted", "outstanding scan aborted");
        }
    }

    /// Analyzes a captured image and, if items are found, holds them as the
    /// pending scan for the next command to choose from.
    pub async fn capture_scan(
        &self,
        ticket: ScanTicket,
        image: ScanImage,
        container_id: ContainerId,
    ) -> TurnOutcome {
        if !self.ticket_is_current(ticket) {
            return TurnOutcome::Ignored;
        }
        let Some(_busy) = BusyGuard::acquire(&self.processing) else {
            debug!(event_name = "session.scan.ignored_busy", "turn already in flight");
            return TurnOutcome::Ignored;
        };

        let placeholder = {
            let mut state = self.lock_state();
            state
                .transcript
                .push(Sender::User, format!("Scanned an image for container #{container_id}."));
            let placeholder = state.transcript.push_loading();
            if state.store.find(container_id).is_none() {
                let reply = format!("Sorry, I couldn't find container #{container_id}.");
                state.transcript.resolve(&placeholder, Sender::Ai, reply.clone());
                drop(state);
                self.announce(&reply);
                return TurnOutcome::Responded(reply);
            }
            placeholder
        };
        info!(
            event_name = "session.scan.started",
            correlation_id = %placeholder,
            container = container_id.0,
            image_bytes = image.bytes.len(),
            "analyzing captured image"
        );

        let interpreter = self.images.clone();
        let task = tokio::spawn(async move { interpreter.analyze(&image).await });
        *self.scan_task.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(task.abort_handle());
        let result = task.await;
        self.scan_task.lock().unwrap_or_else(PoisonError::into_inner).take();

        let current = self.ticket_is_current(ticket);
        match result {
            Ok(items) if current => {
                let reply = if items.is_empty() {
                    NO_ITEMS_FOUND_TEXT.to_string()
                } else {
                    format!(
                        "I found: {}. Which of these should I add to container #{container_id}? \
                         Say \"add all\", name the ones you want, or \"none\".",
                        items.join(", ")
                    )
                };
                {
                    let mut state = self.lock_state();
                    if !items.is_empty() {
                        state.pending_scan = Some(PendingScan { container_id, items });
                    }
                    state.transcript.resolve(&placeholder, Sender::Ai, reply.clone());
                }
                info!(
                    event_name = "session.scan.completed",
                    correlation_id = %placeholder,
                    "scan completed"
                );
                self.announce(&reply);
                TurnOutcome::Responded(reply)
            }
            Ok(_) => self.discard_scan(&placeholder),
            Err(join_error) if join_error.is_cancelled() => self.discard_scan(&placeholder),
            Err(join_error) => {
                let failure = TurnError::Analysis(join_error);
                error!(
                    event_name = "session.scan.failed",
                    correlation_id = %placeholder,
                    error = %failure,
                    "scan failed"
                );
                let mut state = self.lock_state();
                state.pending_scan = None;
                state.transcript.resolve(&placeholder, Sender::System, failure.user_message());
                TurnOutcome::Failed(failure.user_message().to_string())
            }
        }
    }

    /// Flips speech output; returns the new setting. Stays off when unsupported.
    pub fn toggle_speech_output(&self) -> bool {
        if !self.speech.is_supported() {
            warn!(event_name = "session.speech.unsupported", "speech output is not available");
            self.speech_enabled.store(false, Ordering::SeqCst);
            return false;
        }
        let enabled = !self.speech_enabled.fetch_xor(true, Ordering::SeqCst);
        if !enabled {
            self.speech.cancel();
        }
        enabled
    }

    pub fn set_speech_output(&self, enabled: bool) -> bool {
        let enabled = enabled && self.speech.is_supported();
        self.speech_enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.speech.cancel();
        }
        enabled
    }

    fn discard_scan(&self, placeholder: &str) -> TurnOutcome {
        warn!(
            event_name = "session.scan.discarded",
            correlation_id = %placeholder,
            "scan result arrived after the camera was closed"
        );
        self.lock_state().transcript.resolve(placeholder, Sender::System, SCAN_DISCARDED_TEXT);
        TurnOutcome::Discarded
    }

    fn ticket_is_current(&self, ticket: ScanTicket) -> bool {
        self.camera_generation.load(Ordering::SeqCst) == ticket.0
    }

    fn announce(&self, text: &str) {
        if self.speech_enabled.load(Ordering::SeqCst) && self.speech.is_supported() {
            self.speech.speak(text);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use stowaway_core::domain::container::ContainerId;
    use stowaway_core::executor::UNKNOWN_RESPONSE;
    use stowaway_core::store::ContainerStore;
    use stowaway_core::transcript::Sender;
    use tokio::sync::Notify;

    use super::{
        ConversationController, TurnOutcome, GENERIC_ERROR_TEXT, NO_ITEMS_FOUND_TEXT,
        SCAN_DISCARDED_TEXT,
    };
    use crate::llm::{LlmClient, LlmError, LlmRequest};
    use crate::speech::{NoopSpeechOutput, SpeechOutput};
    use crate::testing::{ok, ScriptedLlm};
    use crate::vision::ScanImage;

    fn seeded_store() -> ContainerStore {
        ContainerStore::seeded(vec![vec!["Skis".to_string()], Vec::new()])
    }

    fn controller(llm: Arc<ScriptedLlm>) -> ConversationController {
        ConversationController::with_llm(seeded_store(), llm, Arc::new(NoopSpeechOutput))
    }

    async fn wait_for_calls(llm: &ScriptedLlm, expected: usize) {
        while llm.calls() < expected {
            tokio::task::yield_now().await;
        }
    }

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
        cancels: Mutex<usize>,
    }

    impl SpeechOutput for RecordingSpeech {
        fn is_supported(&self) -> bool {
            true
        }

        fn speak(&self, text: &str) {
            if let Ok(mut spoken) = self.spoken.lock() {
                spoken.push(text.to_string());
            }
        }

        fn cancel(&self) {
            if let Ok(mut cancels) = self.cancels.lock() {
                *cancels += 1;
            }
        }
    }

    struct PanickingLlm;

    #[async_trait]
    impl LlmClient for PanickingLlm {
        async fn generate(&self, _request: &LlmRequest) -> Result<String, LlmError> {
            panic!("interpreter bug");
        }
    }

    #[tokio::test]
    async fn text_turn_executes_action_and_resolves_placeholder() {
        let llm = Arc::new(ScriptedLlm::replying([ok(
            r#"{"action":"UPDATE_ITEMS","containerNumber":1,"itemsToAdd":["Poles"]}"#,
        )]));
        let controller = controller(llm);

        let outcome = controller.send_message("add poles to container 1").await;

        assert_eq!(outcome, TurnOutcome::Responded("Added Poles to container #1.".to_string()));
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.containers[0].items, vec!["Skis", "Poles"]);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].sender, Sender::User);
        assert_eq!(snapshot.messages[1].sender, Sender::Ai);
        assert!(snapshot.messages.iter().all(|message| !message.is_loading));
        assert!(!snapshot.is_processing);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let llm = Arc::new(ScriptedLlm::default());
        let controller = controller(llm.clone());

        assert_eq!(controller.send_message("   ").await, TurnOutcome::Ignored);
        assert!(controller.snapshot().messages.is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_message_while_in_flight_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let llm = Arc::new(
            ScriptedLlm::replying([ok(r#"{"action":"LIST_ALL_CONTAINERS"}"#)]).gated(gate.clone()),
        );
        let controller = Arc::new(controller(llm.clone()));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.send_message("what do I have?").await }
        });
        wait_for_calls(&llm, 1).await;
        assert!(controller.is_processing());
        let messages_before = controller.snapshot().messages.len();

        let second = controller.send_message("add skis to container 1").await;

        assert_eq!(second, TurnOutcome::Ignored);
        assert_eq!(controller.snapshot().messages.len(), messages_before);
        assert_eq!(llm.calls(), 1);

        gate.notify_one();
        let first = first.await.expect("first turn should join");
        assert!(matches!(first, TurnOutcome::Responded(ref text) if text.contains("Container #1: Skis")));
        assert!(!controller.is_processing());
    }

    #[tokio::test]
    async fn malformed_reply_answers_with_unknown_text() {
        let controller = controller(Arc::new(ScriptedLlm::replying([ok("{\"action\":")])));

        let outcome = controller.send_message("do the thing").await;

        assert_eq!(outcome, TurnOutcome::Responded(UNKNOWN_RESPONSE.to_string()));
    }

    #[tokio::test]
    async fn scan_then_selection_adds_only_selected_items() {
        let llm = Arc::new(ScriptedLlm::replying([
            ok(r#"{"items":["Remote","Box"]}"#),
            ok(r#"{"action":"UPDATE_ITEMS","containerNumber":2,"itemsToAdd":["Remote"]}"#),
        ]));
        let controller = controller(llm.clone());

        let ticket = controller.open_camera();
        let scanned =
            controller.capture_scan(ticket, ScanImage::jpeg(vec![0xFF]), ContainerId(2)).await;

        assert!(matches!(scanned, TurnOutcome::Responded(ref text) if text.contains("Remote, Box")));
        let pending = controller.snapshot().pending_scan.expect("pending scan");
        assert_eq!(pending.container_id, ContainerId(2));
        assert_eq!(pending.items, vec!["Remote", "Box"]);

        let outcome = controller.send_message("only the remote").await;

        assert_eq!(outcome, TurnOutcome::Responded("Added Remote to container #2.".to_string()));
        let snapshot = controller.snapshot();
        assert!(snapshot.pending_scan.is_none());
        assert_eq!(snapshot.containers[1].items, vec!["Remote"]);
        let instruction = llm.requests()[1].system_instruction.clone().unwrap_or_default();
        assert!(instruction.contains("Remote, Box"));
    }

    #[tokio::test]
    async fn pending_scan_is_cleared_even_when_interpretation_fails() {
        let llm = Arc::new(ScriptedLlm::replying([
            ok(r#"{"items":["Remote"]}"#),
            Err(LlmError::Transport("offline".to_string())),
            ok(r#"{"action":"LIST_ITEMS","containerNumber":2}"#),
        ]));
        let controller = controller(llm.clone());

        let ticket = controller.open_camera();
        controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(2)).await;
        assert!(controller.snapshot().pending_scan.is_some());

        let outcome = controller.send_message("the remote please").await;

        assert_eq!(outcome, TurnOutcome::Responded(UNKNOWN_RESPONSE.to_string()));
        assert!(controller.snapshot().pending_scan.is_none());

        controller.send_message("what's in container 2?").await;
        let third_instruction = llm.requests()[2].system_instruction.clone().unwrap_or_default();
        assert!(!third_instruction.contains("scanned"));
    }

    #[tokio::test]
    async fn scan_without_items_sets_no_pending_scan() {
        let controller = controller(Arc::new(ScriptedLlm::replying([ok(r#"{"items":[]}"#)])));

        let ticket = controller.open_camera();
        let outcome =
            controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(1)).await;

        assert_eq!(outcome, TurnOutcome::Responded(NO_ITEMS_FOUND_TEXT.to_string()));
        assert!(controller.snapshot().pending_scan.is_none());
    }

    #[tokio::test]
    async fn scan_for_missing_container_skips_analysis() {
        let llm = Arc::new(ScriptedLlm::default());
        let controller = controller(llm.clone());

        let ticket = controller.open_camera();
        let outcome =
            controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(9)).await;

        assert_eq!(
            outcome,
            TurnOutcome::Responded("Sorry, I couldn't find container #9.".to_string())
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dismissing_camera_discards_outstanding_scan() {
        let gate = Arc::new(Notify::new());
        let llm = Arc::new(
            ScriptedLlm::replying([ok(r#"{"items":["Remote"]}"#)]).gated(gate.clone()),
        );
        let controller = Arc::new(controller(llm.clone()));

        let ticket = controller.open_camera();
        let scan = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(1)).await
            }
        });
        wait_for_calls(&llm, 1).await;

        controller.dismiss_camera();
        gate.notify_one();

        let outcome = scan.await.expect("scan should join");
        assert_eq!(outcome, TurnOutcome::Discarded);
        let snapshot = controller.snapshot();
        assert!(snapshot.pending_scan.is_none());
        let last = snapshot.messages.last().expect("message");
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.text, SCAN_DISCARDED_TEXT);
        assert!(!last.is_loading);
        assert!(!snapshot.is_processing);
    }

    #[tokio::test]
    async fn stale_ticket_capture_is_ignored() {
        let llm = Arc::new(ScriptedLlm::default());
        let controller = controller(llm.clone());

        let ticket = controller.open_camera();
        controller.dismiss_camera();
        let outcome =
            controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(1)).await;

        assert_eq!(outcome, TurnOutcome::Ignored);
        assert_eq!(llm.calls(), 0);
        assert!(controller.snapshot().messages.is_empty());
    }

    /// Answers the first call with one scanned item, then panics.
    #[derive(Default)]
    struct PanicsAfterFirstScan {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for PanicsAfterFirstScan {
        async fn generate(&self, _request: &LlmRequest) -> Result<String, LlmError> {
            if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                return ok(r#"{"items":["Remote"]}"#);
            }
            panic!("analysis bug");
        }
    }

    #[tokio::test]
    async fn analysis_panic_clears_pending_scan() {
        let controller = ConversationController::with_llm(
            seeded_store(),
            Arc::new(PanicsAfterFirstScan::default()),
            Arc::new(NoopSpeechOutput),
        );

        let ticket = controller.open_camera();
        controller.capture_scan(ticket, ScanImage::jpeg(vec![1]), ContainerId(2)).await;
        assert!(controller.snapshot().pending_scan.is_some());

        let outcome =
            controller.capture_scan(ticket, ScanImage::jpeg(vec![2]), ContainerId(1)).await;

        assert_eq!(outcome, TurnOutcome::Failed(GENERIC_ERROR_TEXT.to_string()));
        let snapshot = controller.snapshot();
        assert!(snapshot.pending_scan.is_none());
        let last = snapshot.messages.last().expect("message");
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.text, GENERIC_ERROR_TEXT);
        assert!(!snapshot.is_processing);
    }

    #[tokio::test]
    async fn interpreter_panic_surfaces_as_system_error_message() {
        let controller = ConversationController::with_llm(
            seeded_store(),
            Arc::new(PanickingLlm),
            Arc::new(NoopSpeechOutput),
        );

        let outcome = controller.send_message("add skis to container 1").await;

        assert_eq!(outcome, TurnOutcome::Failed(GENERIC_ERROR_TEXT.to_string()));
        let snapshot = controller.snapshot();
        let last = snapshot.messages.last().expect("message");
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.text, GENERIC_ERROR_TEXT);
        assert_eq!(snapshot.containers[0].items, vec!["Skis"]);
        assert!(!controller.is_processing());
    }

    #[tokio::test]
    async fn replies_are_spoken_only_when_enabled() {
        let speech = Arc::new(RecordingSpeech::default());
        let controller = ConversationController::with_llm(
            seeded_store(),
            Arc::new(ScriptedLlm::replying([
                ok(r#"{"action":"LIST_ITEMS","containerNumber":1}"#),
                ok(r#"{"action":"LIST_ITEMS","containerNumber":2}"#),
            ])),
            speech.clone(),
        );

        controller.send_message("what's in one?").await;
        assert!(controller.toggle_speech_output());
        controller.send_message("what's in two?").await;
        assert!(!controller.toggle_speech_output());

        let spoken = speech.spoken.lock().expect("lock").clone();
        assert_eq!(spoken, vec!["Container #2 has no items. It's empty.".to_string()]);
        assert_eq!(*speech.cancels.lock().expect("lock"), 1);
    }

    #[test]
    fn speech_toggle_stays_off_when_unsupported() {
        let controller = controller(Arc::new(ScriptedLlm::default()));

        assert!(!controller.toggle_speech_output());
        assert!(!controller.snapshot().speech_enabled);
    }
}
