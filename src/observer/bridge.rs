//! Request/reply handoff between callers and the observer actor.
//!
//! Every request carries a correlation id. Replies are routed back by id; a
//! caller that gives up after the reply timeout forgets its id, and a reply that
//! arrives later is discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::actor::{ObserverActor, ObserverMessage};
use super::events::PageEvent;
use super::state::ObserverReport;
use crate::error_handling::AnalysisError;

/// Routes replies to waiting callers by correlation id.
pub struct ReplyRouter<T> {
    pending: Mutex<HashMap<u64, oneshot::Sender<T>>>,
    next_id: AtomicU64,
    late_replies: AtomicUsize,
    timeout: Duration,
}

impl<T: Send + 'static> ReplyRouter<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            late_replies: AtomicUsize::new(0),
            timeout,
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<T>>> {
        // The map holds no invariants a panicking holder could break
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocates a correlation id and the receiver its reply will arrive on.
    pub fn register(&self) -> (u64, oneshot::Receiver<T>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending().insert(id, tx);
        (id, rx)
    }

    /// Forgets an id whose request could not be sent.
    pub fn cancel(&self, correlation_id: u64) {
        self.pending().remove(&correlation_id);
    }

    /// Hands a reply to its caller. Returns `false` if nobody is waiting for it.
    pub fn deliver(&self, correlation_id: u64, reply: T) -> bool {
        let waiting = self.pending().remove(&correlation_id);
        let delivered = match waiting {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        };
        if !delivered {
            debug!("Discarding late reply for observer request {}", correlation_id);
            self.late_replies.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    /// Waits for the reply to `correlation_id`, up to the router's timeout.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ObserverTimeout` if the reply does not arrive in
    /// time or the replying side went away.
    pub async fn wait(
        &self,
        correlation_id: u64,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, AnalysisError> {
        let timeout_error = AnalysisError::ObserverTimeout {
            correlation_id,
            timeout_ms: self.timeout.as_millis() as u64,
        };
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                warn!("Observer dropped request {} without replying", correlation_id);
                self.cancel(correlation_id);
                Err(timeout_error)
            }
            Err(_) => {
                warn!(
                    "Observer request {} timed out after {:?}",
                    correlation_id, self.timeout
                );
                self.cancel(correlation_id);
                Err(timeout_error)
            }
        }
    }

    pub fn late_replies(&self) -> usize {
        self.late_replies.load(Ordering::Relaxed)
    }

    /// Spawns the task that routes replies from `replies` until the channel closes.
    pub fn spawn_dispatcher(
        self: &Arc<Self>,
        mut replies: mpsc::UnboundedReceiver<(u64, T)>,
    ) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            while let Some((correlation_id, reply)) = replies.recv().await {
                router.deliver(correlation_id, reply);
            }
        })
    }
}

/// Caller-side handle to one observer actor.
///
/// A fresh handle (and actor) is created for every analysis.
pub struct ObserverHandle {
    mailbox: mpsc::UnboundedSender<ObserverMessage>,
    router: Arc<ReplyRouter<ObserverReport>>,
}

impl ObserverHandle {
    /// Spawns an observer for a page session starting at `start_url`.
    ///
    /// `location` is the environment's location snapshot, polled by the observer.
    pub fn spawn(start_url: &str, location: watch::Receiver<String>, reply_timeout: Duration) -> Self {
        let (mailbox, mailbox_rx) = mpsc::unbounded_channel();
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        let router = Arc::new(ReplyRouter::new(reply_timeout));
        router.spawn_dispatcher(replies_rx);
        tokio::spawn(ObserverActor::new(start_url, mailbox_rx, location, replies_tx).run());
        Self { mailbox, router }
    }

    /// Delivers a page event to the observer.
    pub fn send(&self, event: PageEvent) {
        if self.mailbox.send(ObserverMessage::Event(event)).is_err() {
            debug!("Observer already stopped; dropping page event");
        }
    }

    async fn request(&self, finish: bool) -> Result<ObserverReport, AnalysisError> {
        let (correlation_id, rx) = self.router.register();
        if self
            .mailbox
            .send(ObserverMessage::Report {
                correlation_id,
                finish,
            })
            .is_err()
        {
            self.router.cancel(correlation_id);
            return Err(AnalysisError::ObserverTimeout {
                correlation_id,
                timeout_ms: 0,
            });
        }
        self.router.wait(correlation_id, rx).await
    }

    /// Returns what the observer has confirmed so far without stopping it.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ObserverTimeout` if the observer does not answer in time.
    pub async fn get_analysis_results(&self) -> Result<ObserverReport, AnalysisError> {
        self.request(false).await
    }

    /// Runs retrospective confirmation, returns the final report, and stops the observer.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ObserverTimeout` if the observer does not answer in time.
    pub async fn finish(&self) -> Result<ObserverReport, AnalysisError> {
        self.request(true).await
    }

    /// Replies that arrived after their caller had given up.
    pub fn late_replies(&self) -> usize {
        self.router.late_replies()
    }
}
