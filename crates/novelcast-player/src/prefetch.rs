//! Prefetch coordinator.
//!
//! While the current chapter plays out, the next chapter's conversion is
//! opened in the background and its body drained into an ordered chunk
//! buffer. On chapter end the session takes the buffered chunks *and* the
//! live reader, so the new chapter continues from exactly where the
//! prefetch stopped.
//!
//! The handoff is a two-step exchange with the drain task: the coordinator
//! sends a reply channel, the task answers with the reader and exits. Only
//! then are the chunks read, so no chunk is lost or seen twice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures_util::StreamExt;
use novelcast_core::{ChapterNavigation, ChapterRef, VoiceOptions};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::client::{ByteStream, ClientError, ConvertApi, ConvertRequest, OpenedStream};

type ReaderReply = oneshot::Sender<Option<ByteStream>>;

#[derive(Default)]
struct Drained {
    chunks: Vec<Bytes>,
    navigation: Option<ChapterNavigation>,
    completed: bool,
    error: Option<ClientError>,
}

struct ActivePrefetch {
    chapter: ChapterRef,
    cancel: CancellationToken,
    drained: Arc<Mutex<Drained>>,
    handoff: oneshot::Sender<ReaderReply>,
}

/// Everything a prefetch produced, transferred to the buffer controller.
pub struct PrefetchedData {
    pub chapter: ChapterRef,
    /// Chunks received so far, in order.
    pub chunks: Vec<Bytes>,
    /// Navigation headers; `None` if no response was obtained.
    pub navigation: Option<ChapterNavigation>,
    /// The live body, if it was still open at handoff.
    pub reader: Option<ByteStream>,
    /// Owns the transferred read.
    pub cancel: CancellationToken,
    /// The body ended cleanly before handoff.
    pub completed: bool,
    pub error: Option<ClientError>,
}

impl PrefetchedData {
    pub const fn has_response(&self) -> bool {
        self.navigation.is_some()
    }
}

impl std::fmt::Debug for PrefetchedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchedData")
            .field("chapter", &self.chapter)
            .field("chunks", &self.chunks.len())
            .field("has_reader", &self.reader.is_some())
            .field("completed", &self.completed)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// At most one background prefetch at a time.
pub struct PrefetchCoordinator {
    api: Arc<dyn ConvertApi>,
    active: Mutex<Option<ActivePrefetch>>,
}

impl std::fmt::Debug for PrefetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchCoordinator")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl PrefetchCoordinator {
    pub fn new(api: Arc<dyn ConvertApi>) -> Self {
        Self {
            api,
            active: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActivePrefetch>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A prefetch exists (running, finished or failed) and has not been
    /// taken or reset.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn chapter(&self) -> Option<ChapterRef> {
        self.lock().as_ref().map(|p| p.chapter.clone())
    }

    /// Start prefetching `next`. Returns `false` if a prefetch already exists
    /// or `next` has no URL.
    pub fn start_prefetch(&self, next: &ChapterRef, voice: VoiceOptions) -> bool {
        let Some(url) = next.url.as_deref().filter(|_| next.has_url()) else {
            return false;
        };
        let mut active = self.lock();
        if active.is_some() {
            return false;
        }

        tracing::info!(chapter = ?next.title, %url, "Prefetching next chapter");
        let cancel = CancellationToken::new();
        let drained = Arc::new(Mutex::new(Drained::default()));
        let (handoff_tx, handoff_rx) = oneshot::channel();

        tokio::spawn(drain(
            Arc::clone(&self.api),
            ConvertRequest::chapter(url, voice),
            cancel.clone(),
            Arc::clone(&drained),
            handoff_rx,
        ));

        *active = Some(ActivePrefetch {
            chapter: next.clone(),
            cancel,
            drained,
            handoff: handoff_tx,
        });
        true
    }

    /// Take over the prefetch, live reader included.
    ///
    /// Returns `None` if there is no prefetch. If the request had not been
    /// answered yet it is cancelled and the result has no response.
    pub async fn take_prefetched(&self) -> Option<PrefetchedData> {
        let active = self.lock().take()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let reader = if active.handoff.send(reply_tx).is_ok() {
            reply_rx.await.ok().flatten()
        } else {
            None
        };

        let drained = std::mem::take(&mut *lock_drained(&active.drained));
        tracing::debug!(
            chapter = ?active.chapter.title,
            chunks = drained.chunks.len(),
            live_reader = reader.is_some(),
            completed = drained.completed,
            "Prefetch handed off"
        );
        Some(PrefetchedData {
            chapter: active.chapter,
            chunks: drained.chunks,
            navigation: drained.navigation,
            reader,
            cancel: active.cancel,
            completed: drained.completed,
            error: drained.error,
        })
    }

    /// Cancel and discard the prefetch. Safe to call repeatedly.
    pub fn reset_prefetch(&self) {
        if let Some(active) = self.lock().take() {
            tracing::debug!(chapter = ?active.chapter.title, "Prefetch discarded");
            active.cancel.cancel();
        }
    }
}

fn lock_drained(drained: &Mutex<Drained>) -> MutexGuard<'_, Drained> {
    drained.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Background task: open the request, then buffer chunks until the body ends,
/// the prefetch is cancelled, or a handoff asks for the reader.
async fn drain(
    api: Arc<dyn ConvertApi>,
    request: ConvertRequest,
    cancel: CancellationToken,
    drained: Arc<Mutex<Drained>>,
    mut handoff: oneshot::Receiver<ReaderReply>,
) {
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        reply = &mut handoff => {
            // Handoff before the response arrived: give up on this request.
            cancel.cancel();
            if let Ok(reply) = reply {
                let _ = reply.send(None);
            }
            return;
        }
        opened = api.open(&request, cancel.clone()) => opened,
    };

    let OpenedStream { navigation, mut body } = match opened {
        Ok(opened) => opened,
        Err(e) => {
            if !e.is_abort() {
                tracing::warn!(error = %e, "Prefetch request failed");
            }
            lock_drained(&drained).error = Some(e);
            return;
        }
    };
    lock_drained(&drained).navigation = Some(navigation);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            reply = &mut handoff => {
                if let Ok(reply) = reply {
                    let _ = reply.send(Some(body));
                }
                return;
            }
            next = body.next() => match next {
                Some(Ok(chunk)) => lock_drained(&drained).chunks.push(chunk),
                Some(Err(e)) => {
                    if !e.is_abort() {
                        tracing::warn!(error = %e, "Prefetch body failed");
                    }
                    lock_drained(&drained).error = Some(e);
                    return;
                }
                None => {
                    let mut drained = lock_drained(&drained);
                    drained.completed = true;
                    tracing::debug!(chunks = drained.chunks.len(), "Prefetch body complete");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::client::abortable;

    /// How the fake server answers one `open` call.
    pub(crate) enum Reply {
        /// Respond with these chunks; keep the body open afterwards if `hold`.
        Stream {
            navigation: ChapterNavigation,
            chunks: Vec<Bytes>,
            hold: bool,
        },
        /// Respond with whatever the test sends; the body ends when the
        /// sender is dropped.
        Live {
            navigation: ChapterNavigation,
            rx: mpsc::UnboundedReceiver<Bytes>,
        },
        Fail(ClientError),
        /// Never answer (until cancelled).
        Hang,
    }

    #[derive(Default)]
    pub(crate) struct FakeApi {
        replies: Mutex<VecDeque<Reply>>,
        pub(crate) opens: AtomicUsize,
        pub(crate) requests: Mutex<Vec<ConvertRequest>>,
    }

    impl FakeApi {
        pub(crate) fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            })
        }

        pub(crate) fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConvertApi for FakeApi {
        async fn open(
            &self,
            request: &ConvertRequest,
            cancel: CancellationToken,
        ) -> Result<OpenedStream, ClientError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Hang);
            match reply {
                Reply::Stream {
                    navigation,
                    chunks,
                    hold,
                } => {
                    let head = stream::iter(chunks.into_iter().map(Ok));
                    let body = if hold {
                        abortable(head.chain(stream::pending()), cancel)
                    } else {
                        abortable(head, cancel)
                    };
                    Ok(OpenedStream { navigation, body })
                }
                Reply::Live { navigation, rx } => {
                    let live = stream::unfold(rx, |mut rx| async move {
                        let chunk = rx.recv().await?;
                        Some((Ok::<_, ClientError>(chunk), rx))
                    });
                    Ok(OpenedStream {
                        navigation,
                        body: abortable(live, cancel),
                    })
                }
                Reply::Fail(e) => Err(e),
                Reply::Hang => {
                    cancel.cancelled().await;
                    Err(ClientError::Aborted)
                }
            }
        }
    }

    pub(crate) fn chapter(n: u32) -> ChapterRef {
        ChapterRef::new(format!("https://bnsach.com/c/{n}"), format!("Chương {n}"))
    }

    pub(crate) fn navigation(n: u32) -> ChapterNavigation {
        ChapterNavigation {
            current: Some(chapter(n)),
            next: Some(chapter(n + 1)),
            prev: (n > 1).then(|| chapter(n - 1)),
        }
    }

    fn chunks(count: u8) -> Vec<Bytes> {
        (0..count).map(|i| Bytes::from(vec![i; 4])).collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_prefetch_at_a_time() {
        let api = FakeApi::with_replies(vec![Reply::Hang]);
        let coordinator = PrefetchCoordinator::new(api.clone());

        assert!(!coordinator.start_prefetch(&ChapterRef::default(), VoiceOptions::default()));
        assert!(coordinator.start_prefetch(&chapter(2), VoiceOptions::default()));
        assert!(!coordinator.start_prefetch(&chapter(2), VoiceOptions::default()));
        settle().await;
        assert_eq!(api.opens(), 1);
        assert_eq!(
            api.requests.lock().unwrap()[0].chapter_url.as_deref(),
            Some("https://bnsach.com/c/2")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completed_body_is_handed_over_without_reader() {
        let api = FakeApi::with_replies(vec![Reply::Stream {
            navigation: navigation(2),
            chunks: chunks(3),
            hold: false,
        }]);
        let coordinator = PrefetchCoordinator::new(api);
        coordinator.start_prefetch(&chapter(2), VoiceOptions::default());
        settle().await;

        let data = coordinator.take_prefetched().await.unwrap();
        assert!(data.has_response());
        assert!(data.completed);
        assert!(data.reader.is_none());
        assert_eq!(data.chunks, chunks(3));
        assert_eq!(data.navigation, Some(navigation(2)));
        assert!(!coordinator.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn open_body_hands_over_live_reader() {
        let api = FakeApi::with_replies(vec![Reply::Stream {
            navigation: navigation(2),
            chunks: chunks(2),
            hold: true,
        }]);
        let coordinator = PrefetchCoordinator::new(api);
        coordinator.start_prefetch(&chapter(2), VoiceOptions::default());
        settle().await;

        let data = coordinator.take_prefetched().await.unwrap();
        assert!(!data.completed);
        assert_eq!(data.chunks, chunks(2));
        assert!(!data.cancel.is_cancelled());

        let mut reader = data.reader.expect("live reader");
        data.cancel.cancel();
        assert_eq!(reader.next().await, Some(Err(ClientError::Aborted)));
    }

    #[tokio::test(start_paused = true)]
    async fn handoff_while_opening_has_no_response() {
        let api = FakeApi::with_replies(vec![Reply::Hang]);
        let coordinator = PrefetchCoordinator::new(api.clone());
        coordinator.start_prefetch(&chapter(2), VoiceOptions::default());
        settle().await;

        let data = coordinator.take_prefetched().await.unwrap();
        assert!(!data.has_response());
        assert!(data.reader.is_none());
        assert!(data.cancel.is_cancelled());
        assert_eq!(api.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prefetch_is_kept_until_taken() {
        let api = FakeApi::with_replies(vec![Reply::Fail(ClientError::Server {
            status: 404,
            message: "missing".into(),
        })]);
        let coordinator = PrefetchCoordinator::new(api.clone());
        coordinator.start_prefetch(&chapter(2), VoiceOptions::default());
        settle().await;

        assert!(coordinator.is_active());
        assert!(!coordinator.start_prefetch(&chapter(2), VoiceOptions::default()));
        assert_eq!(api.opens(), 1);

        let data = coordinator.take_prefetched().await.unwrap();
        assert!(!data.has_response());
        assert!(matches!(data.error, Some(ClientError::Server { status: 404, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_and_is_idempotent() {
        let api = FakeApi::with_replies(vec![Reply::Stream {
            navigation: navigation(2),
            chunks: chunks(1),
            hold: true,
        }]);
        let coordinator = PrefetchCoordinator::new(api);
        coordinator.start_prefetch(&chapter(2), VoiceOptions::default());
        settle().await;

        coordinator.reset_prefetch();
        coordinator.reset_prefetch();
        assert!(!coordinator.is_active());
        assert!(coordinator.take_prefetched().await.is_none());
    }
}
