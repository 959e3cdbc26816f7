use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{SpeechSynthesizer, SynthesizedSpeech};
use crate::synthesis::wav_duration;

/// Public Cloud Text-to-Speech endpoint
pub const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com";

/// Google Cloud Text-to-Speech client
#[derive(Debug)]
pub struct GoogleTts {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL
    endpoint: String,
    /// BCP-47 language code sent with every request
    language_code: String,
    /// Output sample rate
    sample_rate_hertz: u32,
    /// Speaking rate, 1.0 is normal speed
    speaking_rate: f64,
}

/// Text-to-speech request body
#[derive(Debug, Serialize)]
pub struct SynthesizeRequest {
    pub input: SynthesisInput,
    pub voice: VoiceSelection,
    #[serde(rename = "audioConfig")]
    pub audio_config: AudioConfig,
}

/// Text to speak
#[derive(Debug, Serialize)]
pub struct SynthesisInput {
    pub text: String,
}

/// Voice selection
#[derive(Debug, Serialize)]
pub struct VoiceSelection {
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// Voice name, e.g. `es-ES-Neural2-A`
    pub name: String,
}

/// Audio encoding options
#[derive(Debug, Serialize)]
pub struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    pub audio_encoding: String,
    #[serde(rename = "sampleRateHertz")]
    pub sample_rate_hertz: u32,
    #[serde(rename = "speakingRate")]
    pub speaking_rate: f64,
}

/// Text-to-speech response
#[derive(Debug, Deserialize)]
pub struct SynthesizeResponse {
    /// Base64-encoded audio
    #[serde(rename = "audioContent")]
    pub audio_content: String,
}

impl GoogleTts {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        language_code: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            language_code: language_code.into(),
            sample_rate_hertz: 24_000,
            speaking_rate: 1.0,
        }
    }

    /// Set the output sample rate
    pub fn sample_rate(mut self, sample_rate_hertz: u32) -> Self {
        self.sample_rate_hertz = sample_rate_hertz;
        self
    }

    /// Set the speaking rate
    pub fn speaking_rate(mut self, speaking_rate: f64) -> Self {
        self.speaking_rate = speaking_rate;
        self
    }

    /// Full URL of the synthesize method, with the API key attached
    pub fn synthesize_url(&self) -> Result<Url, ProviderError> {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };

        let mut url = Url::parse(&format!("{}/v1/text:synthesize", base))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", base, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Build the request body for `text` spoken by `voice`
    pub fn build_request(&self, text: &str, voice: &str) -> SynthesizeRequest {
        SynthesizeRequest {
            input: SynthesisInput {
                text: text.to_string(),
            },
            voice: VoiceSelection {
                language_code: self.language_code.clone(),
                name: voice.to_string(),
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16".to_string(),
                sample_rate_hertz: self.sample_rate_hertz,
                speaking_rate: self.speaking_rate,
            },
        }
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy
pub fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedSpeech, ProviderError> {
        let url = self.synthesize_url()?;
        let request = self.build_request(text, voice);

        debug!("Requesting {} characters of speech with voice {}", text.chars().count(), voice);

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            if status != StatusCode::TOO_MANY_REQUESTS {
                error!("Text-to-Speech API error ({}): {}", status, error_text);
            }
            return Err(classify_status(status, error_text));
        }

        let body = response
            .json::<SynthesizeResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Invalid synthesize response: {}", e)))?;

        let audio = BASE64
            .decode(body.audio_content.as_bytes())
            .map_err(|e| ProviderError::ParseError(format!("Invalid audio content: {}", e)))?;

        let duration = wav_duration(&audio).ok_or_else(|| {
            ProviderError::ParseError("Audio content is not a readable WAV stream".to_string())
        })?;

        Ok(SynthesizedSpeech {
            audio: Bytes::from(audio),
            duration,
        })
    }
}
