//! Intake: turning images, audio, and typed text into submissions.
//!
//! OCR and transcription are external collaborators behind one narrow
//! seam: bytes in, text plus confidence out. The confidence travels on the
//! submission so the orchestrator can gate low-quality extractions into
//! review before parsing.

use std::sync::Arc;

use async_trait::async_trait;
use mentor_common::{MentorError, ProblemSubmission, Result, SourceModality};
use tracing::info;

/// OCR/transcription seam: extract text and a confidence from raw bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, payload: &[u8]) -> Result<(String, f32)>;
}

/// Builds [`ProblemSubmission`]s from the supported input modalities.
#[derive(Default)]
pub struct Intake {
    ocr: Option<Arc<dyn TextExtractor>>,
    transcriber: Option<Arc<dyn TextExtractor>>,
}

impl Intake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn TextExtractor>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn TextExtractor>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Typed text needs no extraction and carries no confidence.
    pub fn from_text(&self, text: impl Into<String>) -> ProblemSubmission {
        ProblemSubmission::text(text)
    }

    pub async fn from_image(&self, payload: &[u8]) -> Result<ProblemSubmission> {
        let ocr = self
            .ocr
            .as_ref()
            .ok_or_else(|| MentorError::Config("no OCR extractor configured".into()))?;
        let (text, confidence) = ocr.extract(payload).await?;
        info!(confidence, chars = text.len(), "Extracted text from image");
        Ok(ProblemSubmission::extracted(
            text,
            SourceModality::Image,
            confidence,
        ))
    }

    pub async fn from_audio(&self, payload: &[u8]) -> Result<ProblemSubmission> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| MentorError::Config("no transcriber configured".into()))?;
        let (text, confidence) = transcriber.extract(payload).await?;
        info!(confidence, chars = text.len(), "Transcribed audio");
        Ok(ProblemSubmission::extracted(
            text,
            SourceModality::Audio,
            confidence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor {
        text: &'static str,
        confidence: f32,
    }

    #[async_trait]
    impl TextExtractor for FixedExtractor {
        async fn extract(&self, _payload: &[u8]) -> Result<(String, f32)> {
            Ok((self.text.to_string(), self.confidence))
        }
    }

    #[tokio::test]
    async fn text_submission_has_no_confidence() {
        let intake = Intake::new();
        let submission = intake.from_text("solve x + 1 = 2");
        assert_eq!(submission.source_modality, SourceModality::Text);
        assert!(submission.input_confidence.is_none());
    }

    #[tokio::test]
    async fn image_submission_carries_ocr_confidence() {
        let intake = Intake::new().with_ocr(Arc::new(FixedExtractor {
            text: "x^2 = 4",
            confidence: 0.62,
        }));

        let submission = intake.from_image(b"fake-image").await.unwrap();
        assert_eq!(submission.source_modality, SourceModality::Image);
        assert_eq!(submission.raw_text, "x^2 = 4");
        assert_eq!(submission.input_confidence, Some(0.62));
    }

    #[tokio::test]
    async fn audio_without_transcriber_is_a_config_error() {
        let intake = Intake::new();
        let err = intake.from_audio(b"fake-audio").await.unwrap_err();
        assert!(matches!(err, MentorError::Config(_)));
    }
}
