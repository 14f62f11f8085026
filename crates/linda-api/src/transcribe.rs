//! Speech-to-text for voice notes. The audio is fetched from its stored URL and forwarded to an
//! OpenAI-compatible `/audio/transcriptions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use linda_types::models::Language;

pub const MAX_AUDIO_BYTES: usize = 16 * 1024 * 1024;

/// Failures surface to the caller verbatim, so the messages are written for end users.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Invalid audio URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to download audio: {0}")]
    Download(String),

    #[error("Audio file exceeds maximum size of 16MB (got {size_mb:.2}MB)")]
    FileTooLarge { size_mb: f64 },

    #[error("Transcription service error: {0}")]
    Service(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str, language: Language) -> Result<String, TranscriptionError>;
}

pub struct WhisperTranscriber {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            client,
        }
    }

    async fn download(&self, audio_url: &str) -> Result<(Vec<u8>, String), TranscriptionError> {
        let url = reqwest::Url::parse(audio_url)
            .map_err(|e| TranscriptionError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TranscriptionError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TranscriptionError::Download(e.to_string()))?;
        if !res.status().is_success() {
            return Err(TranscriptionError::Download(format!("HTTP {}", res.status())));
        }

        if let Some(len) = res.content_length() {
            check_size(len as usize)?;
        }

        let mime = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        // Content-Length may be absent or wrong, so the cap is enforced per chunk.
        let mut audio = Vec::new();
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TranscriptionError::Download(e.to_string()))?;
            check_size(audio.len() + chunk.len())?;
            audio.extend_from_slice(&chunk);
        }

        Ok((audio, mime))
    }
}

fn check_size(len: usize) -> Result<(), TranscriptionError> {
    if len > MAX_AUDIO_BYTES {
        return Err(TranscriptionError::FileTooLarge {
            size_mb: len as f64 / (1024.0 * 1024.0),
        });
    }
    Ok(())
}

/// File extension the transcription API uses to sniff the container format.
fn extension_for(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or("").trim() {
        "audio/webm" => "webm",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        _ => "mp3",
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_url: &str, language: Language) -> Result<String, TranscriptionError> {
        let (audio, mime) = self.download(audio_url).await?;
        debug!("Transcribing {} bytes of {} ({})", audio.len(), mime, language);

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(format!("audio.{}", extension_for(&mime)))
            .mime_str(&mime)
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.as_str())
            .text("response_format", "json");

        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(&url).multipart(form);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TranscriptionError::Service(format!("{} {}", status, body)));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| TranscriptionError::Service("Invalid transcription response".to_string()))?
            .trim()
            .to_string();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit() {
        assert!(check_size(MAX_AUDIO_BYTES).is_ok());
        let err = check_size(MAX_AUDIO_BYTES + 1).unwrap_err();
        assert!(matches!(err, TranscriptionError::FileTooLarge { .. }));
        assert!(err.to_string().starts_with("Audio file exceeds maximum size of 16MB"));
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for("audio/x-wav"), "wav");
        assert_eq!(extension_for("application/octet-stream"), "mp3");
    }

    #[tokio::test]
    async fn oversized_chunked_download_is_cut_off() {
        use axum::{Router, body::Body, routing::get};

        // 17 one-megabyte chunks without a Content-Length header.
        let app = Router::new().route(
            "/voice.webm",
            get(|| async {
                let chunks = futures_util::stream::iter(
                    (0..17).map(|_| Ok::<_, std::io::Error>(vec![0u8; 1024 * 1024])),
                );
                Body::from_stream(chunks)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let stt = WhisperTranscriber::new("http://127.0.0.1:9", "", "whisper-1");
        let err = stt
            .transcribe(&format!("http://{}/voice.webm", addr), Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::FileTooLarge { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let stt = WhisperTranscriber::new("http://127.0.0.1:9", "", "whisper-1");
        let err = stt.transcribe("file:///etc/passwd", Language::En).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::InvalidUrl(_)));

        let err = stt.transcribe("not a url", Language::Sw).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::InvalidUrl(_)));
    }
}
