//! Client for the voice-synthesis backend.
//!
//! The backend lists voice models, renders text to a WAV file on its side, and
//! serves the file from `/static/{filename}`. This client wraps those three
//! calls; playback is left to the caller.

mod types;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use vidpack_shared::{Result, VidPackError};

pub use types::{SpeechRequest, SpeechResult, SynthesizedSpeech, VoiceModel};

/// User-Agent string for speech backend requests.
const USER_AGENT: &str = concat!("VidPack/", env!("CARGO_PKG_VERSION"));

/// Client bound to one voice-synthesis backend.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: Client,
    endpoint: String,
}

impl SpeechClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint).map_err(|e| {
            VidPackError::config(format!("invalid speech endpoint '{endpoint}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| VidPackError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `GET /models`
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn list_models(&self) -> Result<Vec<VoiceModel>> {
        let url = self.url_for(&["models"])?;
        let response = self.get(&url).await?;

        if !response.status().is_success() {
            return Err(VidPackError::Speech(format!(
                "Failed to fetch voice models (HTTP {})",
                response.status()
            )));
        }

        let models: Vec<VoiceModel> = response
            .json()
            .await
            .map_err(|e| VidPackError::Speech(format!("invalid voice model list: {e}")))?;

        info!(count = models.len(), "voice models loaded");
        Ok(models)
    }

    /// `GET /models/{id}`
    #[instrument(skip_all, fields(model_id = %model_id))]
    pub async fn get_model(&self, model_id: &str) -> Result<VoiceModel> {
        let url = self.url_for(&["models", model_id])?;
        let response = self.get(&url).await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(VidPackError::Speech(format!(
                "Model with ID {model_id} not found"
            )));
        }
        if !status.is_success() {
            return Err(VidPackError::Speech(format!(
                "Failed to fetch voice model {model_id} (HTTP {status})"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VidPackError::Speech(format!("invalid voice model: {e}")))
    }

    /// `POST /tts`. Succeeds only when the backend reports success and names an output file.
    #[instrument(skip_all, fields(model_id = %model_id, text_len = text.len()))]
    pub async fn synthesize(
        &self,
        text: &str,
        model_id: &str,
        output_filename: Option<&str>,
    ) -> Result<SpeechResult> {
        if text.trim().is_empty() {
            return Err(VidPackError::validation("text to synthesize must not be empty"));
        }
        if model_id.is_empty() {
            return Err(VidPackError::validation("a voice model must be selected"));
        }

        let url = self.url_for(&["tts"])?;
        let request = SpeechRequest {
            text,
            model_id,
            output_filename,
        };

        let response = self
            .client
            .post(url.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| VidPackError::Speech(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| "Failed to generate speech".to_string());
            return Err(VidPackError::Speech(detail));
        }

        let result: SpeechResult = response
            .json()
            .await
            .map_err(|e| VidPackError::Speech(format!("invalid speech response: {e}")))?;

        if !result.success || result.output_file.is_none() {
            return Err(VidPackError::Speech("Speech generation failed".into()));
        }

        debug!(output_file = ?result.output_file, "speech generated");
        Ok(result)
    }

    /// URL under which the backend serves a generated file.
    ///
    /// Only the file name is used; the backend reports absolute server paths.
    pub fn audio_url(&self, output_file: &str) -> Result<Url> {
        let filename = output_file
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                VidPackError::Speech(format!("no file name in output path '{output_file}'"))
            })?;
        self.url_for(&["static", filename])
    }

    /// Download a generated audio file.
    pub async fn download_audio(&self, output_file: &str) -> Result<Bytes> {
        let url = self.audio_url(output_file)?;
        let response = self.get(&url).await?;

        if !response.status().is_success() {
            return Err(VidPackError::Speech(
                "Failed to load generated audio file".into(),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| VidPackError::Speech(format!("{url}: {e}")))
    }

    /// Synthesize `text` and download the resulting audio.
    pub async fn speak(&self, text: &str, model_id: &str) -> Result<SynthesizedSpeech> {
        let result = self.synthesize(text, model_id, None).await?;
        let output_file = result
            .output_file
            .ok_or_else(|| VidPackError::Speech("Speech generation failed".into()))?;
        let audio = self.download_audio(&output_file).await?;

        info!(bytes = audio.len(), "audio downloaded");
        Ok(SynthesizedSpeech { output_file, audio })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        self.client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| VidPackError::Speech(format!("{url}: {e}")))
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            VidPackError::config(format!("invalid speech endpoint '{}': {e}", self.endpoint))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                VidPackError::config(format!("speech endpoint '{}' cannot have a path", self.endpoint))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

/// The model selected when the user has not picked one: the first listed.
pub fn default_model(models: &[VoiceModel]) -> Option<&str> {
    models.first().map(|m| m.id.as_str())
}
