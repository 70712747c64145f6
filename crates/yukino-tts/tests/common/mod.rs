//! Shared mock collaborators for the relay integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use yukino_db::{DbPool, DbRuntimeSettings};
use yukino_types::{ChannelId, GuildId, UserId};
use yukino_voice::{GuildRoster, SpeechRequest, Synthesizer, VoiceError, VoiceGateway, VoiceMember};

/// Polls a condition with short sleeps until it holds, up to a generous
/// bound. Returns the final state of the condition.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cond()
}

/// Creates an on-disk test database with migrations applied. The returned
/// tempdir must be kept alive for the pool's lifetime.
pub fn test_pool() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("test.db");
    let pool = yukino_db::create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("should create pool");
    {
        let conn = pool.get().expect("should get connection");
        yukino_db::run_migrations(&conn).expect("migrations should succeed");
    }
    (dir, pool)
}

#[derive(Default)]
struct GatewayState {
    connected: HashMap<GuildId, ChannelId>,
    playing: Option<tokio::time::Instant>,
    played: Vec<Vec<u8>>,
    stop_calls: usize,
    connect_calls: Vec<(GuildId, ChannelId)>,
}

/// In-memory voice gateway. With `auto_finish` set, a played buffer counts
/// as finished once that much time has passed; otherwise playback continues
/// until [`MockGateway::finish_playback`] or `stop`.
pub struct MockGateway {
    state: Mutex<GatewayState>,
    auto_finish: Option<Duration>,
}

impl MockGateway {
    pub fn new(auto_finish: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            auto_finish,
        }
    }

    pub fn set_connected(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, channel_id);
    }

    pub fn drop_connection(&self, guild_id: GuildId) {
        let mut state = self.state.lock().unwrap();
        state.connected.remove(&guild_id);
        state.playing = None;
    }

    pub fn finish_playback(&self) {
        self.state.lock().unwrap().playing = None;
    }

    /// Played buffers decoded as UTF-8, in play order.
    pub fn played_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .played
            .iter()
            .map(|audio| String::from_utf8_lossy(audio).into_owned())
            .collect()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().unwrap().stop_calls
    }

    pub fn connect_calls(&self) -> Vec<(GuildId, ChannelId)> {
        self.state.lock().unwrap().connect_calls.clone()
    }
}

#[async_trait]
impl VoiceGateway for MockGateway {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls.push((guild_id, channel_id));
        state.connected.insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.connected.remove(&guild_id);
        state.playing = None;
        Ok(())
    }

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError> {
        self.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, channel_id);
        Ok(())
    }

    async fn play(&self, _guild_id: GuildId, audio: Vec<u8>, _volume: f32) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.played.push(audio);
        state.playing = Some(tokio::time::Instant::now());
        Ok(())
    }

    async fn stop(&self, _guild_id: GuildId) -> Result<(), VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.stop_calls += 1;
        state.playing = None;
        Ok(())
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.state.lock().unwrap().connected.contains_key(&guild_id)
    }

    fn is_playing(&self, _guild_id: GuildId) -> bool {
        let state = self.state.lock().unwrap();
        match (state.playing, self.auto_finish) {
            (Some(started), Some(finish_after)) => started.elapsed() < finish_after,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.state.lock().unwrap().connected.get(&guild_id).copied()
    }
}

/// In-memory guild roster.
pub struct MockRoster {
    pub exists: bool,
    names: HashMap<UserId, String>,
    members: Mutex<Vec<VoiceMember>>,
}

impl MockRoster {
    pub fn new(names: &[(UserId, &str)], members: &[(UserId, ChannelId)]) -> Self {
        Self {
            exists: true,
            names: names
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
            members: Mutex::new(
                members
                    .iter()
                    .map(|(user_id, channel_id)| VoiceMember {
                        user_id: *user_id,
                        channel_id: *channel_id,
                    })
                    .collect(),
            ),
        }
    }

    pub fn set_members(&self, members: &[(UserId, ChannelId)]) {
        *self.members.lock().unwrap() = members
            .iter()
            .map(|(user_id, channel_id)| VoiceMember {
                user_id: *user_id,
                channel_id: *channel_id,
            })
            .collect();
    }
}

impl GuildRoster for MockRoster {
    fn guild_exists(&self, _guild_id: GuildId) -> bool {
        self.exists
    }

    fn display_name(&self, _guild_id: GuildId, user_id: UserId) -> Option<String> {
        self.names.get(&user_id).cloned()
    }

    fn channel_name(&self, _guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
        Some(format!("vc-{channel_id}"))
    }

    fn voice_members(&self, _guild_id: GuildId) -> Vec<VoiceMember> {
        self.members.lock().unwrap().clone()
    }
}

/// Synthesizer that returns the input text as the audio bytes, optionally
/// after a fixed delay (to hold items in the synthesis stage).
pub struct EchoSynthesizer {
    pub delay: Duration,
}

impl EchoSynthesizer {
    pub fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Synthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str, _request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Synthesizer that always fails, for error-path tests.
pub struct FailingSynthesizer;

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _request: &SpeechRequest,
    ) -> Result<Vec<u8>, VoiceError> {
        Err(VoiceError::Synthesis("engine unavailable".to_string()))
    }
}
