//! Per-guild relay session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use yukino_voice::SpeechRequest;

/// One text item awaiting synthesis.
pub(crate) struct SpeechItem {
    pub text: String,
    pub request: SpeechRequest,
}

/// One synthesized item awaiting playback.
pub(crate) struct PlaybackItem {
    pub audio: Vec<u8>,
    /// Short prefix of the spoken text, for logs only.
    pub preview: String,
}

/// The live pipeline for one guild: two running tasks and the channels that
/// feed them. Dropping the senders alone is not enough to tear the pipeline
/// down promptly (the playback stage may be mid-buffer), so teardown aborts
/// both tasks.
pub(crate) struct GuildVoiceSession {
    pub(crate) text_tx: mpsc::UnboundedSender<SpeechItem>,
    pub(crate) skip: Arc<AtomicBool>,
    pub(crate) synthesis_task: JoinHandle<()>,
    pub(crate) playback_task: JoinHandle<()>,
}

impl GuildVoiceSession {
    /// Queues text for synthesis. Returns false when the pipeline is gone.
    pub(crate) fn enqueue(&self, item: SpeechItem) -> bool {
        self.text_tx.send(item).is_ok()
    }

    /// Signals the playback stage to drop the current item and everything
    /// already buffered. Consumed at most once by the playback loop.
    pub(crate) fn request_skip(&self) {
        self.skip.store(true, Ordering::SeqCst);
    }

    /// Cancels both tasks and discards the queues.
    pub(crate) fn shutdown(self) {
        self.synthesis_task.abort();
        self.playback_task.abort();
    }
}
