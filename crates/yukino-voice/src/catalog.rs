//! VOICEVOX speaker catalog.
//!
//! The engine exposes its installed voices as `name` → styled variants, each
//! style carrying the numeric speaker id the synthesis API expects. The
//! catalog is fetched once at startup and consulted by the voice-settings
//! command to translate a human-readable name/style pair into an id.

use serde::Deserialize;

use crate::error::VoiceError;

/// Style name used when a command names a speaker without a style.
pub const DEFAULT_STYLE: &str = "ノーマル";

/// One styled variant of a speaker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeakerStyle {
    pub name: String,
    pub id: i64,
}

/// One installed speaker with its styled variants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub styles: Vec<SpeakerStyle>,
}

/// The installed speakers of a VOICEVOX engine.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    speakers: Vec<Speaker>,
}

impl VoiceCatalog {
    /// Builds a catalog from an already-known speaker list (tests, fixtures).
    pub fn from_speakers(speakers: Vec<Speaker>) -> Self {
        Self { speakers }
    }

    /// Fetches the catalog from a running engine.
    pub async fn fetch(client: &reqwest::Client, base_url: &str) -> Result<Self, VoiceError> {
        let speakers: Vec<Speaker> = client
            .get(format!("{}/speakers", base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!(count = speakers.len(), "fetched voicevox speaker catalog");
        Ok(Self { speakers })
    }

    /// Resolves a speaker name and style to a numeric speaker id.
    ///
    /// An unknown style falls back to the speaker's first style; an unknown
    /// speaker name resolves to nothing.
    pub fn style_id(&self, name: &str, style: &str) -> Option<i64> {
        let speaker = self.speakers.iter().find(|s| s.name == name)?;
        speaker
            .styles
            .iter()
            .find(|s| s.name == style)
            .or_else(|| speaker.styles.first())
            .map(|s| s.id)
    }

    /// Returns all installed speakers.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}
