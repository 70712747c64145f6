//! The TTS relay core for YukinoBot.
//!
//! Chat text flows through here on its way to a voice channel: the sanitizer
//! turns arbitrary message content into speech-safe text, the per-guild
//! worker pipeline synthesizes and plays it in message order, the registry
//! keeps at most one pipeline alive per guild, and the watchdog restores a
//! dropped voice connection and re-arms the pipeline.
//!
//! Guild pipelines are fully independent: each owns its queues and flags,
//! and the registry map is only mutated from the command/event-handling
//! context, never from worker tasks.

pub mod registry;
pub mod sanitize;
mod session;
pub mod watchdog;
pub mod worker;

pub use registry::TtsRelay;
pub use watchdog::WatchdogSet;
pub use worker::RelayContext;
