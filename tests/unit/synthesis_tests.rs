/*!
 * Tests for the synthesis retry policy and audio handling
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use textreel::errors::{AssemblyError, ProviderError, SynthesisError};
use textreel::ledger::ResourceLedger;
use textreel::providers::mock::{silent_wav, MockSynthesizer, MOCK_SAMPLE_RATE};
use textreel::providers::{SpeechSynthesizer, SynthesizedSpeech};
use textreel::synthesis::{synthesize_chunk, wav_duration, RetryPolicy};

use crate::common::create_temp_dir;
use crate::common::fakes::RecordingSleeper;

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(100), Duration::from_secs(10))
}

/// Returns fixed bytes with a fixed reported duration
#[derive(Debug)]
struct FixedSynthesizer {
    audio: &'static [u8],
    duration: f64,
}

#[async_trait]
impl SpeechSynthesizer for FixedSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<SynthesizedSpeech, ProviderError> {
        Ok(SynthesizedSpeech {
            audio: Bytes::from_static(self.audio),
            duration: self.duration,
        })
    }
}

#[test]
fn test_backoff_withGrowingAttempts_shouldDoubleUntilCap() {
    let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(5));

    assert_eq!(policy.backoff(0), Duration::from_secs(1));
    assert_eq!(policy.backoff(1), Duration::from_secs(2));
    assert_eq!(policy.backoff(2), Duration::from_secs(4));
    assert_eq!(policy.backoff(3), Duration::from_secs(5));
    assert_eq!(policy.backoff(40), Duration::from_secs(5));
    assert_eq!(policy.max_attempts(), 11);
}

#[tokio::test]
async fn test_run_withRateLimitsWithinBudget_shouldSucceed() {
    let synth = MockSynthesizer::rate_limited(3, vec![1.0]);
    let sleeper = RecordingSleeper::new();

    let result = policy(3)
        .run(0, &sleeper, || synth.synthesize("Hola.", "es-ES-Neural2-A"))
        .await;

    assert!(result.is_ok());
    assert_eq!(synth.call_count(), 4);
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

#[tokio::test]
async fn test_run_withRateLimitsBeyondBudget_shouldReturnExhausted() {
    let synth = MockSynthesizer::rate_limited(4, vec![1.0]);
    let sleeper = RecordingSleeper::new();

    let result = policy(3)
        .run(7, &sleeper, || synth.synthesize("Hola.", "es-ES-Neural2-A"))
        .await;

    match result {
        Err(SynthesisError::Exhausted { chunk_index, attempts, last_error }) => {
            assert_eq!(chunk_index, 7);
            assert_eq!(attempts, 4);
            assert!(last_error.contains("Rate limit"));
        }
        other => panic!("expected Exhausted, got {:?}", other.map(|_| ())),
    }
    assert_eq!(synth.call_count(), 4);
    assert_eq!(sleeper.delays().len(), 3);
}

#[tokio::test]
async fn test_run_withFatalError_shouldFailWithoutRetry() {
    let synth = MockSynthesizer::failing();
    let sleeper = RecordingSleeper::new();

    let result = policy(5)
        .run(2, &sleeper, || synth.synthesize("Hola.", "es-ES-Neural2-A"))
        .await;

    assert!(matches!(
        result,
        Err(SynthesisError::Failed {
            chunk_index: 2,
            source: ProviderError::ApiError { status_code: 500, .. }
        })
    ));
    assert_eq!(synth.call_count(), 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn test_run_withZeroRetries_shouldGiveUpOnFirstRateLimit() {
    let synth = MockSynthesizer::rate_limited(1, vec![1.0]);
    let sleeper = RecordingSleeper::new();

    let result = tokio_test::block_on(
        policy(0).run(0, &sleeper, || synth.synthesize("Hola.", "es-ES-Neural2-A")),
    );

    assert!(matches!(result, Err(SynthesisError::Exhausted { attempts: 1, .. })));
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_synthesize_chunk_withWorkingSynth_shouldStoreTrackedAudio() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    let synth = MockSynthesizer::working(vec![2.5]);
    let sleeper = RecordingSleeper::new();

    let audio = synthesize_chunk(&synth, &policy(0), &sleeper, &mut ledger, 3, "Hola.", "es-ES-Neural2-A")
        .await
        .unwrap();

    assert_eq!(audio.chunk_index, 3);
    assert_eq!(audio.duration, 2.5);
    assert!(audio.path.is_file());
    assert!(audio.path.starts_with(ledger.workspace()));
    assert!(ledger.tracked().contains(&audio.path));
    assert_eq!(synth.requests(), vec![("Hola.".to_string(), "es-ES-Neural2-A".to_string())]);
}

#[tokio::test]
async fn test_synthesize_chunk_withNonWavAudio_shouldUseReportedDuration() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    let synth = FixedSynthesizer {
        audio: b"ID3 not really audio",
        duration: 1.25,
    };

    let audio = synthesize_chunk(&synth, &policy(0), &RecordingSleeper::new(), &mut ledger, 0, "Hola.", "v")
        .await
        .unwrap();

    assert_eq!(audio.duration, 1.25);
}

#[tokio::test]
async fn test_synthesize_chunk_withZeroDuration_shouldReturnInvalidAudio() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    let synth = MockSynthesizer::working(vec![0.0]);

    let result = synthesize_chunk(&synth, &policy(0), &RecordingSleeper::new(), &mut ledger, 1, "Hola.", "v").await;

    assert!(matches!(
        result,
        Err(AssemblyError::Synthesis(SynthesisError::InvalidAudio { chunk_index: 1, .. }))
    ));
}

#[test]
fn test_wav_duration_withSilentWav_shouldMeasureSamples() {
    let wav = silent_wav(1.5, MOCK_SAMPLE_RATE).unwrap();
    assert_eq!(wav_duration(&wav), Some(1.5));
}

#[test]
fn test_wav_duration_withGarbage_shouldReturnNone() {
    assert_eq!(wav_duration(b"definitely not RIFF"), None);
    assert_eq!(wav_duration(&[]), None);
}
