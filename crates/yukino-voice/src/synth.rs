//! Speech-synthesis engine clients.
//!
//! Two engines are supported: Open JTalk as a local child process (WAV on
//! stdout) and VOICEVOX over its HTTP API. Both are invoked from the relay
//! worker off the event-handling path; neither blocks the async scheduler —
//! the child process is awaited through tokio and VOICEVOX through reqwest.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use yukino_types::{SynthesisEngine, VoiceProfile};

use crate::error::VoiceError;

/// Maximum text input size for synthesis (64 KiB). Prevents resource
/// exhaustion from oversized requests.
const MAX_SYNTH_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for a single synthesis call (process or HTTP).
const SYNTH_TIMEOUT: Duration = Duration::from_secs(60);

/// VOICEVOX rejects very long query texts; cap before building the query.
const MAX_VOICEVOX_QUERY_CHARS: usize = 120;

/// Open JTalk expresses pitch as a half-tone shift; the profile's
/// -0.5..=1.0 range is scaled onto half-tones.
const PITCH_HALF_TONES: f32 = 12.0;

/// Parameters for one synthesis call, resolved from the speaking user's
/// profile (or the guild default) at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechRequest {
    pub engine: SynthesisEngine,
    pub speaker_id: i64,
    pub speed: f32,
    pub pitch: f32,
}

impl SpeechRequest {
    /// Builds a request from a stored voice profile.
    pub fn from_profile(profile: &VoiceProfile) -> Self {
        Self {
            engine: profile.engine,
            speaker_id: profile.speaker_id,
            speed: profile.speed,
            pitch: profile.pitch,
        }
    }

    /// Builds a default-engine request for the given speaker id.
    pub fn for_speaker(speaker_id: i64) -> Self {
        Self::from_profile(&VoiceProfile {
            speaker_id,
            ..VoiceProfile::default()
        })
    }
}

/// A speech-synthesis engine: sanitized text in, audio bytes out.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesizes `text` into audio. Safe to call concurrently for
    /// different guilds; a single call may take seconds.
    async fn synthesize(&self, text: &str, request: &SpeechRequest) -> Result<Vec<u8>, VoiceError>;
}

fn check_input_size(text: &str) -> Result<(), VoiceError> {
    if text.len() > MAX_SYNTH_INPUT_BYTES {
        return Err(VoiceError::Synthesis(format!(
            "text exceeds maximum size: {} bytes (limit: {} bytes)",
            text.len(),
            MAX_SYNTH_INPUT_BYTES
        )));
    }
    Ok(())
}

fn check_speed(speed: f32) -> Result<(), VoiceError> {
    if !(0.1..=10.0).contains(&speed) {
        return Err(VoiceError::Config(
            "Speed must be between 0.1 and 10.0".to_string(),
        ));
    }
    Ok(())
}

/// Open JTalk client. Runs the binary with text on stdin and collects the
/// WAV output from stdout.
#[derive(Debug, Clone)]
pub struct OpenJtalkSynthesizer {
    binary: PathBuf,
    dictionary_dir: PathBuf,
    voice: PathBuf,
}

impl OpenJtalkSynthesizer {
    pub fn new(
        binary: impl AsRef<Path>,
        dictionary_dir: impl AsRef<Path>,
        voice: impl AsRef<Path>,
    ) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            dictionary_dir: dictionary_dir.as_ref().to_path_buf(),
            voice: voice.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Synthesizer for OpenJtalkSynthesizer {
    async fn synthesize(&self, text: &str, request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        check_input_size(text)?;
        check_speed(request.speed)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-x")
            .arg(&self.dictionary_dir)
            .arg("-m")
            .arg(&self.voice)
            .arg("-r")
            .arg(request.speed.to_string())
            .arg("-fm")
            .arg((request.pitch * PITCH_HALF_TONES).to_string())
            .arg("-ow")
            .arg("/dev/stdout")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Synthesis(format!("Failed to spawn open_jtalk: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Synthesis("Failed to open stdin".to_string()))?;
        let text_owned = text.to_string();

        // Spawn a task to write to stdin to avoid deadlock if the output
        // buffer fills up before the input is fully written.
        let write_task = tokio::spawn(async move { stdin.write_all(text_owned.as_bytes()).await });

        let output = tokio::time::timeout(SYNTH_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Synthesis(format!(
                    "synthesis process timed out after {} seconds",
                    SYNTH_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Synthesis(format!("Failed to wait for open_jtalk: {}", e)))?;

        match write_task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Synthesis(format!(
                    "Failed to write to open_jtalk stdin: {}",
                    e
                )))
            }
            Err(e) => return Err(VoiceError::Synthesis(format!("Stdin task failed: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Synthesis(format!(
                "open_jtalk failed: {}",
                stderr
            )));
        }

        Ok(output.stdout)
    }
}

/// VOICEVOX HTTP client. Builds an audio query, patches in the speed and
/// pitch scales, and requests synthesis.
#[derive(Debug, Clone)]
pub struct VoicevoxSynthesizer {
    base_url: String,
    client: reqwest::Client,
}

impl VoicevoxSynthesizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SYNTH_TIMEOUT)
            .build()
            .expect("failed to build HTTP client for VOICEVOX");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Returns the HTTP client (shared with the speaker catalog fetch).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Returns the engine base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Synthesizer for VoicevoxSynthesizer {
    async fn synthesize(&self, text: &str, request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        check_input_size(text)?;
        check_speed(request.speed)?;

        let limited: String = text.chars().take(MAX_VOICEVOX_QUERY_CHARS).collect();
        let speaker = request.speaker_id.to_string();

        let mut query: serde_json::Value = self
            .client
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", limited.as_str()), ("speaker", speaker.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        query["speedScale"] = serde_json::json!(request.speed);
        query["pitchScale"] = serde_json::json!(request.pitch);

        let audio = self
            .client
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker.as_str())])
            .json(&query)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(audio.to_vec())
    }
}

/// Dispatches synthesis calls to the engine named by the request.
pub struct EngineRouter {
    openjtalk: Arc<dyn Synthesizer>,
    voicevox: Arc<dyn Synthesizer>,
}

impl EngineRouter {
    pub fn new(openjtalk: Arc<dyn Synthesizer>, voicevox: Arc<dyn Synthesizer>) -> Self {
        Self {
            openjtalk,
            voicevox,
        }
    }
}

#[async_trait]
impl Synthesizer for EngineRouter {
    async fn synthesize(&self, text: &str, request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        match request.engine {
            SynthesisEngine::OpenJtalk => self.openjtalk.synthesize(text, request).await,
            SynthesisEngine::Voicevox => self.voicevox.synthesize(text, request).await,
        }
    }
}
