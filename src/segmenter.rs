/*!
 * Narration text segmentation.
 *
 * Splits raw narration into chunks small enough for a single synthesis call,
 * and each chunk into sentence-level caption units for on-screen text.
 * Chunk boundaries always fall between words: sentences are packed greedily,
 * and only a sentence that alone exceeds the limit is broken on whitespace.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SegmentationError;

/// Default upper bound for the text shown by a single caption cue
pub const DEFAULT_MAX_CAPTION_CHARS: usize = 90;

/// Characters that end a sentence
const TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Closing quotes and brackets allowed after a terminator
const CLOSERS: [char; 8] = ['"', '\'', '»', '”', '’', ')', ']', '}'];

/// A synthesis-sized slice of the input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position of the chunk in the narration
    pub index: usize,
    /// Chunk text, words separated by single spaces
    pub text: String,
    /// Length of `text` in characters
    pub char_len: usize,
    /// Sentence-level units displayed while this chunk is spoken
    pub captions: Vec<CaptionUnit>,
}

/// A sentence-level slice of a chunk used for on-screen text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionUnit {
    /// Caption text
    pub text: String,
    /// Length of `text` in characters
    pub char_len: usize,
}

impl CaptionUnit {
    fn new(text: String) -> Self {
        let char_len = text.chars().count();
        Self { text, char_len }
    }
}

/// Splits narration into [`TextChunk`]s
#[derive(Debug, Clone)]
pub struct TextSegmenter {
    max_chars: usize,
    max_caption_chars: usize,
}

/// A word of the normalized text with its character offset
#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    text: &'a str,
    position: usize,
    len: usize,
}

impl TextSegmenter {
    /// Create a segmenter producing chunks of at most `max_chars` characters
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            max_caption_chars: DEFAULT_MAX_CAPTION_CHARS,
        }
    }

    /// Set the caption unit length limit
    pub fn with_caption_limit(mut self, max_caption_chars: usize) -> Self {
        self.max_caption_chars = max_caption_chars.max(1);
        self
    }

    /// Maximum chunk length in characters
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into ordered chunks
    pub fn segment(&self, text: &str) -> Result<Vec<TextChunk>, SegmentationError> {
        if self.max_chars == 0 {
            return Err(SegmentationError::InvalidLimit);
        }

        let words = split_words(text);
        if words.is_empty() {
            return Err(SegmentationError::EmptyInput);
        }

        // Fail before doing any packing work
        if let Some(word) = words.iter().find(|w| w.len > self.max_chars) {
            return Err(SegmentationError::UnsplittableWord {
                position: word.position,
                length: word.len,
                max_chars: self.max_chars,
            });
        }

        let mut groups: Vec<Vec<Vec<Word<'_>>>> = Vec::new();
        let mut current: Vec<Vec<Word<'_>>> = Vec::new();
        let mut current_len = 0;

        for sentence in split_sentences(&words) {
            let sentence_len = span_len(&sentence);

            if sentence_len > self.max_chars {
                // No terminator within the limit: fall back to whitespace
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                for piece in pack_words(&sentence, self.max_chars) {
                    groups.push(vec![piece]);
                }
                continue;
            }

            let joined_len = if current.is_empty() {
                sentence_len
            } else {
                current_len + 1 + sentence_len
            };

            if joined_len > self.max_chars {
                groups.push(std::mem::take(&mut current));
                current_len = sentence_len;
            } else {
                current_len = joined_len;
            }
            current.push(sentence);
        }

        if !current.is_empty() {
            groups.push(current);
        }

        let chunks: Vec<TextChunk> = groups
            .into_iter()
            .enumerate()
            .map(|(index, spans)| self.build_chunk(index, &spans))
            .collect();

        debug!(
            "Segmented {} words into {} chunks (max {} chars)",
            words.len(),
            chunks.len(),
            self.max_chars
        );

        Ok(chunks)
    }

    fn build_chunk(&self, index: usize, spans: &[Vec<Word<'_>>]) -> TextChunk {
        let text = spans
            .iter()
            .map(|span| join_words(span))
            .collect::<Vec<_>>()
            .join(" ");

        let captions = spans
            .iter()
            .flat_map(|span| pack_words(span, self.max_caption_chars))
            .map(|piece| CaptionUnit::new(join_words(&piece)))
            .collect();

        TextChunk {
            index,
            char_len: text.chars().count(),
            text,
            captions,
        }
    }
}

/// Split `text` into chunks of at most `max_chars` characters
pub fn segment(text: &str, max_chars: usize) -> Result<Vec<TextChunk>, SegmentationError> {
    TextSegmenter::new(max_chars).segment(text)
}

/// Collapse all whitespace runs to single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_words(text: &str) -> Vec<Word<'_>> {
    let mut position = 0;
    text.split_whitespace()
        .map(|word| {
            let len = word.chars().count();
            let entry = Word {
                text: word,
                position,
                len,
            };
            position += len + 1;
            entry
        })
        .collect()
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(CLOSERS)
        .ends_with(TERMINATORS)
}

fn split_sentences<'a>(words: &[Word<'a>]) -> Vec<Vec<Word<'a>>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for word in words {
        current.push(*word);
        if ends_sentence(word.text) {
            sentences.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

fn span_len(words: &[Word<'_>]) -> usize {
    let chars: usize = words.iter().map(|w| w.len).sum();
    chars + words.len().saturating_sub(1)
}

fn join_words(words: &[Word<'_>]) -> String {
    words.iter().map(|w| w.text).collect::<Vec<_>>().join(" ")
}

/// Greedily pack words into pieces of at most `limit` characters.
/// A single word longer than `limit` becomes its own piece.
fn pack_words<'a>(words: &[Word<'a>], limit: usize) -> Vec<Vec<Word<'a>>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Word<'a>> = Vec::new();
    let mut current_len = 0;

    for word in words {
        let joined_len = if current.is_empty() {
            word.len
        } else {
            current_len + 1 + word.len
        };

        if joined_len > limit && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current_len = word.len;
        } else {
            current_len = joined_len;
        }
        current.push(*word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
