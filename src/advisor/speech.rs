//! Voice note transcription

use super::chat::non_empty;
use super::{Advisor, AdvisorError, BASE_LANGUAGE, decode_payload};
use crate::process::{TRANSCODE_TIMEOUT, transcode_to_wav};
use crate::providers::{ProviderError, SAMPLE_RATE_HZ, Transcript};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechRequest {
    /// Base64 M4A recording, optionally as a `data:` URL
    #[serde(default)]
    pub audio: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechReply {
    pub text: String,
    pub language: String,
    pub confidence: &'static str,
}

/// Speech failures, each reported to the client with an `error_type`
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Could not understand the audio. Please speak clearly and try again.")]
    RecognitionFailed,

    #[error("Speech recognition service is currently unavailable. Please try again later.")]
    ServiceUnavailable(#[source] ProviderError),

    #[error("Speech processing failed: {0}")]
    Processing(String),
}

impl SpeechError {
    pub fn error_type(&self) -> &'static str {
        match self {
            SpeechError::RecognitionFailed => "recognition_failed",
            SpeechError::ServiceUnavailable(_) => "service_unavailable",
            SpeechError::Processing(_) => "processing_error",
        }
    }

    fn processing(e: impl std::fmt::Display) -> Self {
        SpeechError::Processing(e.to_string())
    }
}

/// Recognition locale for a client language code
pub fn speech_language_code(language: &str) -> &'static str {
    match language {
        "hi" => "hi-IN",
        "pa" => "pa-IN",
        _ => "en-US",
    }
}

impl Advisor {
    pub async fn speech_to_text(&self, request: &SpeechRequest) -> Result<SpeechReply, AdvisorError> {
        let Some(payload) = non_empty(request.audio.as_deref()) else {
            return Err(AdvisorError::validation("Audio data is required"));
        };
        let language = non_empty(request.language.as_deref()).unwrap_or(BASE_LANGUAGE);

        let media = decode_payload(payload).map_err(SpeechError::processing)?;
        let transcript = self.transcribe(&media.bytes, language).await?;

        tracing::info!(
            language = %language,
            chars = transcript.text.chars().count(),
            confidence = ?transcript.confidence,
            "Transcribed voice note"
        );

        Ok(SpeechReply {
            text: transcript.text,
            language: language.to_string(),
            confidence: "high",
        })
    }

    /// Write, transcode and recognise; both temporary files are removed on
    /// every path, including when the request is dropped part way
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<Transcript, SpeechError> {
        let audio_path = write_temp_audio(audio).await.map_err(SpeechError::processing)?;
        let wav_path = TempPath::from_path(audio_path.with_extension("wav"));

        let result = self.recognize_file(&audio_path, &wav_path, language).await;

        remove_temp(audio_path);
        remove_temp(wav_path);

        result
    }

    async fn recognize_file(
        &self,
        audio_path: &Path,
        wav_path: &Path,
        language: &str,
    ) -> Result<Transcript, SpeechError> {
        transcode_to_wav(
            &self.ffmpeg,
            audio_path,
            wav_path,
            SAMPLE_RATE_HZ,
            TRANSCODE_TIMEOUT,
        )
        .await
        .map_err(SpeechError::processing)?;

        let wav = tokio::fs::read(wav_path)
            .await
            .map_err(SpeechError::processing)?;

        match self
            .providers
            .speech
            .recognize(&wav, speech_language_code(language))
            .await
        {
            Ok(Some(transcript)) if !transcript.text.trim().is_empty() => Ok(transcript),
            Ok(_) => Err(SpeechError::RecognitionFailed),
            Err(e) => {
                tracing::warn!(error = %e, "Speech recognition request failed");
                Err(SpeechError::ServiceUnavailable(e))
            }
        }
    }
}

async fn write_temp_audio(audio: &[u8]) -> std::io::Result<TempPath> {
    let path = tempfile::Builder::new()
        .prefix("krishi-")
        .suffix(".m4a")
        .tempfile()?
        .into_temp_path();
    tokio::fs::write(&path, audio).await?;
    Ok(path)
}

/// Delete a temporary file now; a file that was never created is not an error
fn remove_temp(path: TempPath) {
    let path_display = path.display().to_string();
    match path.close() {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path_display, error = %e, "Failed to remove temporary audio");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_codes() {
        assert_eq!(speech_language_code("en"), "en-US");
        assert_eq!(speech_language_code("hi"), "hi-IN");
        assert_eq!(speech_language_code("pa"), "pa-IN");
        assert_eq!(speech_language_code("ta"), "en-US");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(SpeechError::RecognitionFailed.error_type(), "recognition_failed");
        assert_eq!(
            SpeechError::ServiceUnavailable(ProviderError::network("down")).error_type(),
            "service_unavailable"
        );
        let err = SpeechError::processing("bad input");
        assert_eq!(err.error_type(), "processing_error");
        assert_eq!(err.to_string(), "Speech processing failed: bad input");
    }

    #[tokio::test]
    async fn test_audio_required() {
        let (advisor, _fakes) = default_advisor();
        let err = advisor
            .speech_to_text(&SpeechRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Audio data is required");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_processing_error() {
        let (advisor, _fakes) = default_advisor();
        let advisor = advisor.with_ffmpeg("krishi-no-such-ffmpeg");
        let err = advisor
            .speech_to_text(&SpeechRequest {
                audio: Some("data:audio/m4a;base64,AAAAGGZ0eXBNNEEg".into()),
                language: None,
            })
            .await
            .unwrap_err();
        match err {
            AdvisorError::Speech(e) => assert_eq!(e.error_type(), "processing_error"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// A stand-in for ffmpeg that copies its input to the output path and
    /// records the input path next to itself
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        fake_ffmpeg_then(dir, "")
    }

    /// Like [`fake_ffmpeg`], running `tail` after the copy
    #[cfg(unix)]
    fn fake_ffmpeg_then(dir: &Path, tail: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg");
        let log = dir.join("last_input");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nwhile [ \"$#\" -gt 1 ]; do\n  if [ \"$1\" = \"-i\" ]; then in=\"$2\"; fi\n  shift\ndone\necho \"$in\" > '{}'\ncp \"$in\" \"$1\"\n{}\n",
                log.display(),
                tail
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transcribes_and_cleans_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path());
        let (advisor, fakes) = default_advisor();
        let advisor = advisor.with_ffmpeg(ffmpeg.display().to_string());

        let reply = advisor
            .speech_to_text(&SpeechRequest {
                audio: Some("data:audio/m4a;base64,AAAAGGZ0eXBNNEEg".into()),
                language: Some("hi".into()),
            })
            .await
            .unwrap();

        assert_eq!(reply.text, "gehun kab boyen");
        assert_eq!(reply.language, "hi");
        assert_eq!(reply.confidence, "high");
        assert_eq!(fakes.speech.languages.lock().unwrap().as_slice(), ["hi-IN"]);

        let input = std::fs::read_to_string(dir.path().join("last_input")).unwrap();
        let input = PathBuf::from(input.trim());
        assert_eq!(input.extension().and_then(|e| e.to_str()), Some("m4a"));
        assert!(!input.exists());
        assert!(!input.with_extension("wav").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_transcript_is_recognition_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path());
        let (set, _fakes) = provider_set(
            FakeModel::replying("ok"),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech {
                result: Ok(None),
                languages: Default::default(),
            },
        );
        let advisor = advisor(set).with_ffmpeg(ffmpeg.display().to_string());

        let err = advisor
            .speech_to_text(&SpeechRequest {
                audio: Some("AAAAGGZ0eXBNNEEg".into()),
                language: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Speech(SpeechError::RecognitionFailed)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_provider_error_is_service_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path());
        let (set, _fakes) = provider_set(
            FakeModel::replying("ok"),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech {
                result: Err(ProviderError::network("HTTP 503")),
                languages: Default::default(),
            },
        );
        let advisor = advisor(set).with_ffmpeg(ffmpeg.display().to_string());

        let err = advisor
            .speech_to_text(&SpeechRequest {
                audio: Some("AAAAGGZ0eXBNNEEg".into()),
                language: Some("en".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::Speech(SpeechError::ServiceUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_request_still_cleans_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg_then(dir.path(), "sleep 5");
        let (advisor, _fakes) = default_advisor();
        let advisor = advisor.with_ffmpeg(ffmpeg.display().to_string());

        let request = SpeechRequest {
            audio: Some("AAAAGGZ0eXBNNEEg".into()),
            language: None,
        };
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(1000),
            advisor.speech_to_text(&request),
        )
        .await;
        assert!(outcome.is_err());

        let input = std::fs::read_to_string(dir.path().join("last_input")).unwrap();
        let input = PathBuf::from(input.trim());
        assert!(!input.exists());
        assert!(!input.with_extension("wav").exists());
    }
}
