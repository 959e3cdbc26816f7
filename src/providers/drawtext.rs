/*!
 * Caption assets for ffmpeg's `drawtext` filter.
 *
 * Each cue's text is wrapped to the configured line width and written to its
 * own text file inside the attempt workspace; the encoder points `drawtext`
 * at those files, which sidesteps filtergraph escaping of arbitrary text.
 */

use log::debug;
use std::fs;
use std::path::PathBuf;

use crate::errors::RenderError;
use crate::providers::{CaptionRenderer, CaptionRequest};
use crate::timeline::{CaptionCue, CaptionOverlay, CaptionRegion};

/// Lowest opacity accepted, so captions never vanish entirely
const MIN_OPACITY: f64 = 0.05;

/// Highest opacity accepted, so footage always shows through
const MAX_OPACITY: f64 = 0.95;

/// Visual style applied to every caption
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    /// Blend opacity in (0, 1)
    pub opacity: f64,
    /// Font size as a fraction of the frame height
    pub font_size_ratio: f64,
    pub region: CaptionRegion,
    /// Characters per caption line before wrapping
    pub max_line_chars: usize,
    pub font_color: String,
    pub box_color: String,
    pub font_file: Option<PathBuf>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            opacity: 0.85,
            font_size_ratio: 0.05,
            region: CaptionRegion::Bottom,
            max_line_chars: 42,
            font_color: "white".to_string(),
            box_color: "black".to_string(),
            font_file: None,
        }
    }
}

/// Writes one text asset per cue for the encoder's `drawtext` filter
#[derive(Debug, Clone, Default)]
pub struct DrawTextRenderer {
    style: CaptionStyle,
}

impl DrawTextRenderer {
    pub fn new(style: CaptionStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    /// Font size in pixels for a frame `height` pixels tall
    pub fn font_size(&self, height: u32) -> u32 {
        ((f64::from(height) * self.style.font_size_ratio).round() as u32).max(1)
    }
}

impl CaptionRenderer for DrawTextRenderer {
    fn render(&self, request: &CaptionRequest) -> Result<CaptionOverlay, RenderError> {
        if !request.frame_size.is_valid() {
            return Err(RenderError::InvalidRequest(format!(
                "frame size {} cannot hold a caption",
                request.frame_size
            )));
        }
        if !request.duration.is_finite() || request.duration <= 0.0 {
            return Err(RenderError::InvalidRequest(format!(
                "segment duration {:.3}s is not positive",
                request.duration
            )));
        }

        let mut cues = Vec::with_capacity(request.cues.len());
        for (i, cue) in request.cues.iter().enumerate() {
            let text = wrap_lines(&cue.text, self.style.max_line_chars);
            let path = request
                .workspace
                .join(format!("caption_{:04}_{:02}.txt", request.segment_index, i));
            fs::write(&path, text.as_bytes()).map_err(|source| RenderError::Asset {
                path: path.clone(),
                source,
            })?;

            cues.push(CaptionCue {
                text: cue.text.clone(),
                start: cue.start.clamp(0.0, request.duration),
                end: cue.end.clamp(0.0, request.duration),
                asset: Some(path),
            });
        }

        debug!(
            "Segment {}: {} caption cues for a {} frame",
            request.segment_index,
            cues.len(),
            request.frame_size
        );

        Ok(CaptionOverlay {
            cues,
            frame_size: request.frame_size,
            region: self.style.region,
            font_size: self.font_size(request.frame_size.height),
            opacity: self.style.opacity.clamp(MIN_OPACITY, MAX_OPACITY),
            font_color: self.style.font_color.clone(),
            box_color: self.style.box_color.clone(),
            font_file: self.style.font_file.clone(),
        })
    }
}

/// Greedy word wrap to lines of at most `width` characters.
///
/// A single word longer than `width` gets a line of its own.
pub fn wrap_lines(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += len;
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}
