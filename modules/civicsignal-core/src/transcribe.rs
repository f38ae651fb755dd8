//! Speech-to-text seam for voice reports. The engine only needs text back;
//! the actual recognizer lives behind this trait.

use async_trait::async_trait;

use civicsignal_common::{CivicError, Language};

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio at `audio_url` in the given language.
    async fn transcribe(&self, audio_url: &str, language: Language) -> Result<String, CivicError>;
}

/// Returns a fixed transcript. Used in tests and local development where no
/// recognizer is wired up.
pub struct FixedTranscriber {
    transcript: String,
}

impl FixedTranscriber {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self { transcript: transcript.into() }
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio_url: &str, _language: Language) -> Result<String, CivicError> {
        Ok(self.transcript.clone())
    }
}
