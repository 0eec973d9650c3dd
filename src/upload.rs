//! Client for the backend's whole-file transcription endpoint
//!
//! This is the external upload collaborator: a plain request/response call
//! whose result seeds the transcript store. It shares nothing with the live
//! streaming path.

use crate::transcript::{TimedSegment, TimedWord, TranscriptStore};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Response from `POST /upload-audio`
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub transcript: String,
    pub session_id: String,
    /// Word-level timestamps, when the backend produced them
    pub words: Option<Vec<TimedWord>>,
    pub segments: Option<Vec<TimedSegment>>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    detail: Option<String>,
}

pub struct UploadClient {
    http: reqwest::Client,
    upload_url: String,
}

impl UploadClient {
    pub fn new(base_url: String) -> Self {
        let upload_url = format!("{}/upload-audio", base_url.trim_end_matches('/'));
        Self {
            http: reqwest::Client::new(),
            upload_url,
        }
    }

    /// Upload an audio file for transcription, optionally biased toward the
    /// given keywords.
    pub async fn transcribe_file(
        &self,
        path: &Path,
        session_id: Option<&str>,
        bias_keywords: &[String],
    ) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        if let Some(id) = session_id {
            form = form.text("session_id", id.to_string());
        }
        if !bias_keywords.is_empty() {
            form = form.text("bias_keywords", bias_keywords.join(","));
        }

        info!("Uploading {} for transcription", path.display());
        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<UploadErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| format!("upload failed ({})", status));
            anyhow::bail!(detail);
        }

        response
            .json::<UploadResponse>()
            .await
            .context("failed to parse upload response")
    }
}

/// Seed the transcript store from an upload result: timed results keep their
/// word timings for playback sync, plain ones are split into sentence items.
pub async fn seed_transcript(store: &TranscriptStore, response: &UploadResponse) {
    match &response.words {
        Some(words) if !words.is_empty() => {
            store
                .seed_timed(
                    &response.transcript,
                    words.clone(),
                    response.segments.clone().unwrap_or_default(),
                )
                .await;
        }
        _ => store.seed_plain(&response.transcript).await,
    }
}
