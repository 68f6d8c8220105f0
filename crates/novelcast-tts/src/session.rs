//! Per-stream synthesis state.

use bytes::Bytes;
use novelcast_core::SynthesisResult;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::reorder::ReorderBuffer;

/// State of one synthesis stream, owned by the engine's driver task.
///
/// Completions are recorded one at a time; the reorder buffer is the only
/// thing that decides what may be written out.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    buffer: ReorderBuffer,
    bytes_flushed: usize,
    succeeded: usize,
    failed: usize,
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new(segments: usize, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            buffer: ReorderBuffer::new(segments),
            bytes_flushed: 0,
            succeeded: 0,
            failed: 0,
            cancel,
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Record a completion and return the audio that became releasable.
    pub fn record(&mut self, result: SynthesisResult) -> Vec<Bytes> {
        if result.is_failed() {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
        if !self.buffer.complete(result) {
            return Vec::new();
        }
        let ready = self.buffer.drain_ready();
        self.bytes_flushed += ready.iter().map(Bytes::len).sum::<usize>();
        ready
    }

    pub fn segments(&self) -> usize {
        self.buffer.segments()
    }

    pub const fn bytes_flushed(&self) -> usize {
        self.bytes_flushed
    }

    pub const fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub const fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.buffer.is_complete()
    }

    /// All segments are terminal and none produced audio.
    pub fn produced_nothing(&self) -> bool {
        self.is_complete() && self.succeeded == 0
    }
}
