/*!
 * Tests for narration text segmentation
 */

use textreel::errors::SegmentationError;
use textreel::segmenter::{normalize_whitespace, segment, TextSegmenter};

const NARRATION: &str = "Había una vez un pueblo pequeño junto al mar. Cada mañana los pescadores \
    salían antes del amanecer! ¿Volverían con las redes llenas? Nadie lo sabía…  \
    Pero   todos esperaban en el muelle,\n\ncon los ojos puestos en el horizonte. \
    \"Hoy será un buen día\", decía la abuela. Y casi siempre tenía razón.";

#[test]
fn test_segment_withTwoShortSentences_shouldSplitOnSentenceBoundary() {
    let chunks = segment("Hola. Mundo.", 8).unwrap();

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Hola.", "Mundo."]);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[1].index, 1);
}

#[test]
fn test_segment_withLargeLimit_shouldPackSentencesIntoOneChunk() {
    let chunks = segment("Hola. Mundo.", 4500).unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hola. Mundo.");
    assert_eq!(chunks[0].char_len, 12);
    let captions: Vec<&str> = chunks[0].captions.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(captions, vec!["Hola.", "Mundo."]);
}

#[test]
fn test_segment_withVariousLimits_shouldNeverExceedLimit() {
    for max_chars in [20, 35, 60, 120, 4500] {
        let chunks = segment(NARRATION, max_chars).unwrap();
        for chunk in &chunks {
            assert!(
                chunk.char_len <= max_chars,
                "chunk {} has {} chars with limit {}",
                chunk.index,
                chunk.char_len,
                max_chars
            );
            assert_eq!(chunk.char_len, chunk.text.chars().count());
        }
    }
}

#[test]
fn test_segment_withVariousLimits_shouldReconstructNormalizedText() {
    let expected = normalize_whitespace(NARRATION);
    for max_chars in [20, 35, 60, 120, 4500] {
        let chunks = segment(NARRATION, max_chars).unwrap();
        let rebuilt = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rebuilt, expected, "limit {}", max_chars);
    }
}

#[test]
fn test_segment_withVariousLimits_shouldNumberChunksInOrder() {
    let chunks = segment(NARRATION, 40).unwrap();
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }
}

#[test]
fn test_segment_withSentenceLongerThanLimit_shouldFallBackToWhitespace() {
    let chunks = segment("uno dos tres cuatro cinco", 9).unwrap();

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["uno dos", "tres", "cuatro", "cinco"]);
}

#[test]
fn test_segment_withMultibyteText_shouldCountCharactersNotBytes() {
    let chunks = segment("¿Qué tal? Año nuevo.", 9).unwrap();

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["¿Qué tal?", "Año", "nuevo."]);
    assert_eq!(chunks[0].char_len, 9);
    assert!(chunks[0].text.len() > 9);
}

#[test]
fn test_segment_withBlankInput_shouldReturnEmptyInput() {
    assert_eq!(segment("", 100), Err(SegmentationError::EmptyInput));
    assert_eq!(segment("  \n\t ", 100), Err(SegmentationError::EmptyInput));
}

#[test]
fn test_segment_withZeroLimit_shouldReturnInvalidLimit() {
    assert_eq!(segment("Hola.", 0), Err(SegmentationError::InvalidLimit));
}

#[test]
fn test_segment_withWordLongerThanLimit_shouldReportWordPosition() {
    let result = segment("hola supercalifragilistico", 10);

    assert_eq!(
        result,
        Err(SegmentationError::UnsplittableWord {
            position: 5,
            length: 21,
            max_chars: 10,
        })
    );
}

#[test]
fn test_segment_withCaptionLimit_shouldSplitCaptionsOnWhitespace() {
    let chunks = TextSegmenter::new(100)
        .with_caption_limit(10)
        .segment("uno dos tres cuatro.")
        .unwrap();

    assert_eq!(chunks.len(), 1);
    let captions: Vec<&str> = chunks[0].captions.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(captions, vec!["uno dos", "tres", "cuatro."]);
    assert!(chunks[0].captions.iter().all(|c| c.char_len <= 10));
}

#[test]
fn test_normalize_whitespace_withMixedWhitespace_shouldCollapseRuns() {
    assert_eq!(normalize_whitespace("  a\n\nb \t c  "), "a b c");
}
