//! Shared mock platform for the command and dispatch tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use yukino_bot::config::SpeakerGate;
use yukino_bot::AppState;
use yukino_db::{DbPool, DbRuntimeSettings};
use yukino_types::{ChannelId, GuildId, UserId};
use yukino_voice::{
    GuildRoster, Speaker, SpeakerStyle, SpeechRequest, Synthesizer, VoiceCatalog, VoiceError,
    VoiceGateway, VoiceMember,
};

pub const OWNER: UserId = 999;

#[derive(Default)]
struct PlatformState {
    connected: HashMap<GuildId, ChannelId>,
    manually_playing: HashSet<GuildId>,
    played: Vec<Vec<u8>>,
    names: HashMap<UserId, String>,
    voice: Vec<VoiceMember>,
    disconnect_calls: usize,
    move_calls: usize,
}

/// One object standing in for the whole chat platform: voice gateway plus
/// roster. Played buffers finish instantly unless a guild is marked as
/// manually playing.
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<PlatformState>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_member(&self, user_id: UserId, name: &str) {
        self.state
            .lock()
            .unwrap()
            .names
            .insert(user_id, name.to_string());
    }

    pub fn put_in_voice(&self, user_id: UserId, channel_id: ChannelId) {
        let mut state = self.state.lock().unwrap();
        state.voice.retain(|member| member.user_id != user_id);
        state.voice.push(VoiceMember {
            user_id,
            channel_id,
        });
    }

    pub fn set_connected(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, channel_id);
    }

    pub fn set_playing(&self, guild_id: GuildId, playing: bool) {
        let mut state = self.state.lock().unwrap();
        if playing {
            state.manually_playing.insert(guild_id);
        } else {
            state.manually_playing.remove(&guild_id);
        }
    }

    pub fn played_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .played
            .iter()
            .map(|audio| String::from_utf8_lossy(audio).into_owned())
            .collect()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state.lock().unwrap().disconnect_calls
    }

    pub fn move_calls(&self) -> usize {
        self.state.lock().unwrap().move_calls
    }
}

#[async_trait]
impl VoiceGateway for MockPlatform {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError> {
        self.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.connected.remove(&guild_id);
        state.disconnect_calls += 1;
        Ok(())
    }

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.connected.insert(guild_id, channel_id);
        state.move_calls += 1;
        Ok(())
    }

    async fn play(&self, _guild_id: GuildId, audio: Vec<u8>, _volume: f32) -> Result<(), VoiceError> {
        self.state.lock().unwrap().played.push(audio);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        self.state.lock().unwrap().manually_playing.remove(&guild_id);
        Ok(())
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.state.lock().unwrap().connected.contains_key(&guild_id)
    }

    fn is_playing(&self, guild_id: GuildId) -> bool {
        self.state
            .lock()
            .unwrap()
            .manually_playing
            .contains(&guild_id)
    }

    fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.state.lock().unwrap().connected.get(&guild_id).copied()
    }
}

impl GuildRoster for MockPlatform {
    fn guild_exists(&self, _guild_id: GuildId) -> bool {
        true
    }

    fn display_name(&self, _guild_id: GuildId, user_id: UserId) -> Option<String> {
        self.state.lock().unwrap().names.get(&user_id).cloned()
    }

    fn channel_name(&self, _guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
        Some(format!("vc-{channel_id}"))
    }

    fn voice_members(&self, _guild_id: GuildId) -> Vec<VoiceMember> {
        self.state.lock().unwrap().voice.clone()
    }
}

/// Synthesizer that returns the input text as the audio bytes.
pub struct EchoSynthesizer;

#[async_trait]
impl Synthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str, _request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        Ok(text.as_bytes().to_vec())
    }
}

pub fn test_catalog() -> VoiceCatalog {
    VoiceCatalog::from_speakers(vec![Speaker {
        name: "ずんだもん".to_string(),
        styles: vec![
            SpeakerStyle {
                name: "ノーマル".to_string(),
                id: 3,
            },
            SpeakerStyle {
                name: "あまあま".to_string(),
                id: 1,
            },
        ],
    }])
}

/// Builds a full application state over a temp database and the mock
/// platform. The tempdir must outlive the state.
pub fn test_state(
    platform: Arc<MockPlatform>,
    speaker_gate: SpeakerGate,
) -> (tempfile::TempDir, DbPool, AppState) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("test.db");
    let pool = yukino_db::create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("should create pool");
    {
        let conn = pool.get().expect("should get connection");
        yukino_db::run_migrations(&conn).expect("migrations should succeed");
    }

    let state = AppState::new(
        pool.clone(),
        platform.clone(),
        platform,
        Arc::new(EchoSynthesizer),
        Arc::new(test_catalog()),
        OWNER,
        speaker_gate,
    );

    (dir, pool, state)
}
