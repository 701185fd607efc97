/// Text-to-speech sink.
///
/// `speak` is fire-and-forget and replaces any utterance still playing, so at
/// most one utterance is active at a time.
pub trait SpeechOutput: Send + Sync {
    fn is_supported(&self) -> bool;
    fn speak(&self, text: &str);
    fn cancel(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSpeechOutput;

impl SpeechOutput for NoopSpeechOutput {
    fn is_supported(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str) {}

    fn cancel(&self) {}
}
