//! Head-of-line reorder buffer.
//!
//! Segments complete in arbitrary order. The buffer keeps one slot per
//! segment and a cursor to the next slot to flush. The cursor only moves over
//! a contiguous run of terminal slots, so audio for segment `i` is never
//! released before every segment `< i` is either released or failed.

use bytes::Bytes;
use novelcast_core::SynthesisResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Pending,
    Ready(Bytes),
    Failed,
    Flushed,
}

#[derive(Debug)]
pub struct ReorderBuffer {
    slots: Vec<Slot>,
    next: usize,
}

impl ReorderBuffer {
    pub fn new(segments: usize) -> Self {
        Self {
            slots: vec![Slot::Pending; segments],
            next: 0,
        }
    }

    /// Number of segments tracked.
    pub fn segments(&self) -> usize {
        self.slots.len()
    }

    /// Index of the next slot to flush.
    pub const fn cursor(&self) -> usize {
        self.next
    }

    /// Record a terminal result.
    ///
    /// Returns `true` if this unblocked the head, i.e. [`Self::drain_ready`]
    /// now has something to release or skip. Results for unknown or already
    /// terminal slots are ignored.
    pub fn complete(&mut self, result: SynthesisResult) -> bool {
        let Some(slot) = self.slots.get_mut(result.index) else {
            tracing::warn!(index = result.index, "Result for unknown segment ignored");
            return false;
        };
        if *slot != Slot::Pending {
            tracing::warn!(index = result.index, "Duplicate segment result ignored");
            return false;
        }
        *slot = result.audio.map_or(Slot::Failed, Slot::Ready);
        result.index == self.next
    }

    /// Advance the cursor over every contiguous terminal slot, returning the
    /// audio of the ready ones in order. Failed slots are skipped.
    pub fn drain_ready(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Some(slot) = self.slots.get_mut(self.next) {
            match std::mem::replace(slot, Slot::Flushed) {
                Slot::Ready(bytes) => out.push(bytes),
                Slot::Failed | Slot::Flushed => {}
                Slot::Pending => {
                    *slot = Slot::Pending;
                    break;
                }
            }
            self.next += 1;
        }
        out
    }

    /// Every slot has been flushed or skipped.
    pub fn is_complete(&self) -> bool {
        self.next >= self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(index: usize, tag: &'static [u8]) -> SynthesisResult {
        SynthesisResult::success(index, Bytes::from_static(tag))
    }

    #[test]
    fn holds_back_until_head_completes() {
        let mut buf = ReorderBuffer::new(3);
        assert!(!buf.complete(ok(2, b"c")));
        assert!(!buf.complete(ok(1, b"b")));
        assert!(buf.drain_ready().is_empty());
        assert_eq!(buf.cursor(), 0);

        assert!(buf.complete(ok(0, b"a")));
        assert_eq!(
            buf.drain_ready(),
            vec![
                Bytes::from_static(b"a"),
                Bytes::from_static(b"b"),
                Bytes::from_static(b"c"),
            ]
        );
        assert!(buf.is_complete());
    }

    #[test]
    fn failed_slots_are_skipped() {
        let mut buf = ReorderBuffer::new(3);
        buf.complete(SynthesisResult::failed(0));
        buf.complete(ok(2, b"c"));
        assert!(buf.drain_ready().is_empty());
        assert_eq!(buf.cursor(), 1);

        buf.complete(SynthesisResult::failed(1));
        assert_eq!(buf.drain_ready(), vec![Bytes::from_static(b"c")]);
        assert!(buf.is_complete());
    }

    #[test]
    fn duplicate_and_unknown_results_are_ignored() {
        let mut buf = ReorderBuffer::new(1);
        assert!(!buf.complete(ok(5, b"x")));
        assert!(buf.complete(ok(0, b"a")));
        assert!(!buf.complete(ok(0, b"again")));
        assert_eq!(buf.drain_ready(), vec![Bytes::from_static(b"a")]);
    }

    #[test]
    fn empty_buffer_is_complete() {
        assert!(ReorderBuffer::new(0).is_complete());
    }
}
