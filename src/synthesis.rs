/*!
 * Retry policy and audio handling around the speech synthesizer.
 *
 * Rate-limit failures are retried with exponential backoff; every other
 * provider failure propagates on the first attempt. The policy sleeps through
 * a [`Sleeper`] so tests can substitute a fake clock.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use std::future::Future;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use crate::errors::{AssemblyError, ProviderError, SynthesisError};
use crate::ledger::ResourceLedger;
use crate::providers::{SpeechSynthesizer, SynthesizedSpeech};
use crate::timeline::{frame_interval, AudioSegment};

/// Default number of retries after a rate-limited attempt
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay, doubled on every retry
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Default cap on a single backoff delay
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded exponential-backoff retry for rate-limited calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BACKOFF_BASE,
            max_delay: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt + 1`: `min(base * 2^attempt, max)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Total attempts the policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `operation` until it succeeds, fails fatally, or retries run out
    pub async fn run<T, F, Fut>(
        &self,
        chunk_index: usize,
        sleeper: &dyn Sleeper,
        mut operation: F,
    ) -> Result<T, SynthesisError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limit() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            "Chunk {}: rate limited on all {} attempts, giving up",
                            chunk_index, attempt
                        );
                        return Err(SynthesisError::Exhausted {
                            chunk_index,
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.backoff(attempt - 1);
                    warn!(
                        "Chunk {}: rate limited (attempt {}/{}), retrying in {:?}",
                        chunk_index,
                        attempt,
                        self.max_attempts(),
                        delay
                    );
                    sleeper.sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        "Chunk {}: synthesis failed on attempt {}: {}",
                        chunk_index,
                        attempt + 1,
                        e
                    );
                    return Err(SynthesisError::Failed {
                        chunk_index,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Synthesize one chunk with retries and store the audio as a tracked file
pub async fn synthesize_chunk(
    synthesizer: &dyn SpeechSynthesizer,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    ledger: &mut ResourceLedger,
    chunk_index: usize,
    text: &str,
    voice: &str,
) -> Result<AudioSegment, AssemblyError> {
    let speech: SynthesizedSpeech = policy
        .run(chunk_index, sleeper, || synthesizer.synthesize(text, voice))
        .await?;

    let path = ledger.write_temp(&format!("audio_{:04}", chunk_index), "wav", &speech.audio)?;
    let duration = resolve_duration(&path, speech.duration, chunk_index)?;

    debug!("Chunk {}: {:.3}s of audio in {:?}", chunk_index, duration, path);

    Ok(AudioSegment {
        chunk_index,
        path,
        duration,
    })
}

/// Read the stored audio back and settle on its duration.
///
/// A WAV header is authoritative; other formats fall back to the duration
/// the synthesizer reported.
fn resolve_duration(path: &Path, reported: f64, chunk_index: usize) -> Result<f64, SynthesisError> {
    let bytes = std::fs::read(path).map_err(|e| SynthesisError::InvalidAudio {
        chunk_index,
        reason: format!("cannot read back {:?}: {}", path, e),
    })?;

    let duration = match wav_duration(&bytes) {
        Some(measured) => {
            if reported > 0.0 && (measured - reported).abs() > frame_interval() {
                warn!(
                    "Chunk {}: provider reported {:.3}s but audio measures {:.3}s",
                    chunk_index, reported, measured
                );
            }
            measured
        }
        None => reported,
    };

    if !duration.is_finite() || duration <= 0.0 {
        return Err(SynthesisError::InvalidAudio {
            chunk_index,
            reason: format!("non-positive duration {:.3}s", duration),
        });
    }

    Ok(duration)
}

/// Duration of a WAV payload, or `None` if the bytes are not WAV
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}
