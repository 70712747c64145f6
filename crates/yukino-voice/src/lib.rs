//! Voice infrastructure boundary for YukinoBot.
//!
//! Everything the bot needs from the outside world to speak lives behind
//! this crate: the chat-platform voice gateway (connect/play/stop on a
//! guild's voice channel plus the member roster), and the speech-synthesis
//! engines (Open JTalk as a local process, VOICEVOX over HTTP).
//!
//! The gateway is a trait because the platform SDK owns the actual socket;
//! the relay pipeline and the reconnect watchdog only ever talk to these
//! interfaces, which is also what makes them testable without a live
//! connection.

pub mod catalog;
pub mod error;
pub mod gateway;
pub mod synth;

pub use catalog::{Speaker, SpeakerStyle, VoiceCatalog, DEFAULT_STYLE};
pub use error::VoiceError;
pub use gateway::{GuildRoster, VoiceGateway, VoiceMember};
pub use synth::{
    EngineRouter, OpenJtalkSynthesizer, SpeechRequest, Synthesizer, VoicevoxSynthesizer,
};
