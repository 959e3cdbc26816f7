/*!
 * Mock speech synthesizer for testing.
 *
 * The mock returns real (silent) WAV audio so the duration measured from the
 * stored file matches the scripted one. Behaviours:
 * - `MockSynthesizer::working(durations)` - Always succeeds
 * - `MockSynthesizer::rate_limited(times, durations)` - Rate limited `times` calls, then succeeds
 * - `MockSynthesizer::failing()` - Always fails with a fatal error
 * - `MockSynthesizer::fail_at(call, durations)` - Fails fatally on one call
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{SpeechSynthesizer, SynthesizedSpeech};

/// Sample rate of the generated audio
pub const MOCK_SAMPLE_RATE: u32 = 8_000;

/// Behaviour mode for the mock synthesizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Reports rate limiting on the first `times` calls
    RateLimited { times: usize },
    /// Always fails with a non-retryable error
    Failing,
    /// Fails with a non-retryable error on the zero-based call `call`
    FailAt { call: usize },
}

/// Scripted synthesizer
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    /// Duration of each successful response, in order; the last one repeats
    durations: Vec<f64>,
    calls: Arc<AtomicUsize>,
    successes: Arc<AtomicUsize>,
    /// Texts received, one entry per call
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior, durations: Vec<f64>) -> Self {
        Self {
            behavior,
            durations,
            calls: Arc::new(AtomicUsize::new(0)),
            successes: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always succeeds with the scripted durations
    pub fn working(durations: Vec<f64>) -> Self {
        Self::new(MockBehavior::Working, durations)
    }

    /// Rate limited on the first `times` calls
    pub fn rate_limited(times: usize, durations: Vec<f64>) -> Self {
        Self::new(MockBehavior::RateLimited { times }, durations)
    }

    /// Always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, vec![1.0])
    }

    /// Fails on call number `call`
    pub fn fail_at(call: usize, durations: Vec<f64>) -> Self {
        Self::new(MockBehavior::FailAt { call }, durations)
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(text, voice)` of every call received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }

    fn next_duration(&self) -> f64 {
        let n = self.successes.fetch_add(1, Ordering::SeqCst);
        match self.durations.get(n).or_else(|| self.durations.last()) {
            Some(duration) => *duration,
            None => 1.0,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedSpeech, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((text.to_string(), voice.to_string()));

        match self.behavior {
            MockBehavior::Working => {}
            MockBehavior::RateLimited { times } if call < times => {
                return Err(ProviderError::RateLimitExceeded(format!(
                    "Simulated rate limit (call {})",
                    call
                )));
            }
            MockBehavior::RateLimited { .. } => {}
            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "Simulated failure".to_string(),
                });
            }
            MockBehavior::FailAt { call: target } if call == target => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("Simulated failure on call {}", call),
                });
            }
            MockBehavior::FailAt { .. } => {}
        }

        let duration = self.next_duration();
        let audio = silent_wav(duration, MOCK_SAMPLE_RATE)
            .map_err(|e| ProviderError::ParseError(format!("Failed to build mock audio: {}", e)))?;

        Ok(SynthesizedSpeech {
            audio: Bytes::from(audio),
            duration,
        })
    }
}

/// Mono 16-bit silence of the given duration, as WAV bytes
pub fn silent_wav(duration: f64, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = (duration.max(0.0) * f64::from(sample_rate)).round() as u64;

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for _ in 0..samples {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}
