//! Narration voice table
//!
//! The fixed set of Spanish (Spain) Cloud Text-to-Speech voices offered for
//! narration, with helpers to accept the `"<id> (<gender>)"` display form
//! and to resolve the spoken language.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Voice gender, labelled as the voice picker shows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Label used in the voice display form
    pub fn label(&self) -> &'static str {
        match self {
            Self::Female => "Femenino",
            Self::Male => "Masculino",
        }
    }
}

/// A narration voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    /// Provider voice name, e.g. `es-ES-Neural2-A`
    pub id: &'static str,
    pub gender: Gender,
}

impl Voice {
    const fn female(id: &'static str) -> Self {
        Self { id, gender: Gender::Female }
    }

    const fn male(id: &'static str) -> Self {
        Self { id, gender: Gender::Male }
    }

    /// `"es-ES-Neural2-A (Femenino)"`
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.id, self.gender.label())
    }

    /// BCP-47 language code the voice speaks, e.g. `es-ES`
    pub fn language_code(&self) -> &'static str {
        language_code_of(self.id)
    }
}

/// Every voice offered for narration
pub const VOICES: [Voice; 23] = [
    Voice::male("es-ES-Journey-D"),
    Voice::female("es-ES-Journey-F"),
    Voice::female("es-ES-Journey-O"),
    Voice::female("es-ES-Neural2-A"),
    Voice::male("es-ES-Neural2-B"),
    Voice::female("es-ES-Neural2-C"),
    Voice::female("es-ES-Neural2-D"),
    Voice::female("es-ES-Neural2-E"),
    Voice::male("es-ES-Neural2-F"),
    Voice::male("es-ES-Polyglot-1"),
    Voice::female("es-ES-Standard-A"),
    Voice::male("es-ES-Standard-B"),
    Voice::female("es-ES-Standard-C"),
    Voice::female("es-ES-Standard-D"),
    Voice::male("es-ES-Standard-E"),
    Voice::female("es-ES-Standard-F"),
    Voice::female("es-ES-Studio-C"),
    Voice::male("es-ES-Studio-F"),
    Voice::male("es-ES-Wavenet-B"),
    Voice::female("es-ES-Wavenet-C"),
    Voice::female("es-ES-Wavenet-D"),
    Voice::male("es-ES-Wavenet-E"),
    Voice::female("es-ES-Wavenet-F"),
];

/// Position of the default voice in [`VOICES`]
pub const DEFAULT_VOICE_INDEX: usize = 3;

/// The voice used when none is configured
pub fn default_voice() -> &'static Voice {
    &VOICES[DEFAULT_VOICE_INDEX]
}

/// Reduce a voice selection to its id.
///
/// Accepts both the bare id and the display form; the id is everything
/// before the first space.
pub fn normalize_voice(input: &str) -> &str {
    input.trim().split(' ').next().unwrap_or_default()
}

/// Look a voice up by id or display form, ignoring ASCII case
pub fn find_voice(input: &str) -> Option<&'static Voice> {
    let id = normalize_voice(input);
    VOICES.iter().find(|voice| voice.id.eq_ignore_ascii_case(id))
}

/// Resolve a selection to a known voice or explain why it is not one
pub fn resolve_voice(input: &str) -> Result<&'static Voice> {
    find_voice(input).ok_or_else(|| {
        anyhow!(
            "Unknown voice '{}'. Run `textreel voices` to list the available voices",
            input
        )
    })
}

/// Language code prefix of a voice id: `es-ES-Neural2-A` gives `es-ES`
pub fn language_code_of(voice_id: &str) -> &str {
    let mut dashes = voice_id.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice_id[..second],
        _ => voice_id,
    }
}

/// English name of the language in a BCP-47 code such as `es-ES`
pub fn get_language_name(code: &str) -> Result<String> {
    let primary = code.trim().split(['-', '_']).next().unwrap_or_default().to_lowercase();

    let language = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    };

    language
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Native name of the language in a BCP-47 code, falling back to the English name
pub fn get_native_language_name(code: &str) -> Result<String> {
    let primary = code.trim().split(['-', '_']).next().unwrap_or_default().to_lowercase();
    match Language::from_639_1(&primary).and_then(|lang| lang.to_autonym()) {
        Some(name) => Ok(name.to_string()),
        None => get_language_name(code),
    }
}
