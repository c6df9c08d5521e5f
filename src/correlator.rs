//! Clipboard request/response correlation.
//!
//! The host answers `read-clipboard` commands on a dedicated entry point that
//! carries only the text, with no request id. Responses are therefore matched
//! to requests strictly by arrival order: the oldest pending request receives
//! the next response.
//!
//! A request that gave up waiting (timeout, or its future was dropped) keeps
//! its queue slot. When the host's late answer arrives it is consumed by that
//! slot and discarded, so later requests still line up with their own
//! responses.

use crate::transport::MessageBus;
use crate::types::{BridgeError, Envelope};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// FIFO queue of outstanding clipboard reads
pub struct ClipboardCorrelator {
    pending: Mutex<VecDeque<(u64, oneshot::Sender<String>)>>,
    next_seq: AtomicU64,
    timeout: Option<Duration>,
}

impl ClipboardCorrelator {
    /// Create a correlator; `timeout` of `None` waits forever
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            next_seq: AtomicU64::new(1),
            timeout,
        }
    }

    /// Queue a pending read and send the `read-clipboard` command.
    ///
    /// Returns as soon as the command is handed to the host; await
    /// [`PendingRead::recv`] for the text. If the host is unreachable the
    /// queue slot is withdrawn and the error returned.
    pub fn request(&self, bus: &MessageBus) -> Result<PendingRead, BridgeError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        // Queue before sending: a synchronous host may answer from inside send
        self.pending.lock().push_back((seq, tx));

        if let Err(e) = bus.send(&Envelope::read_clipboard()) {
            self.pending.lock().retain(|(id, _)| *id != seq);
            return Err(e);
        }

        trace!(seq, "Clipboard read requested");

        Ok(PendingRead {
            seq,
            rx,
            timeout: self.timeout,
        })
    }

    /// Resolve the oldest pending read with `text`
    pub fn resolve(&self, text: String) {
        let entry = self.pending.lock().pop_front();

        match entry {
            Some((seq, tx)) => {
                if tx.send(text).is_err() {
                    debug!(seq, "Clipboard response arrived after requester gave up, discarded");
                } else {
                    trace!(seq, "Clipboard read resolved");
                }
            }
            None => debug!("Clipboard response with no pending request, ignored"),
        }
    }

    /// Number of reads still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// An outstanding clipboard read
#[derive(Debug)]
pub struct PendingRead {
    seq: u64,
    rx: oneshot::Receiver<String>,
    timeout: Option<Duration>,
}

impl PendingRead {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the host's response
    pub async fn recv(self) -> Result<String, BridgeError> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(result) => result.map_err(|_| BridgeError::RequestDropped),
                Err(_) => {
                    debug!(seq = self.seq, "Clipboard read timed out");
                    Err(BridgeError::Timeout(limit))
                }
            },
            None => self.rx.await.map_err(|_| BridgeError::RequestDropped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingHost;
    use std::sync::Arc;

    fn bus() -> (Arc<RecordingHost>, MessageBus) {
        let host = Arc::new(RecordingHost::default());
        (host.clone(), MessageBus::new(host))
    }

    #[tokio::test]
    async fn test_fifo_resolution_ignores_ids() {
        let (host, bus) = bus();
        let correlator = ClipboardCorrelator::new(None);

        let r1 = correlator.request(&bus).unwrap();
        let r2 = correlator.request(&bus).unwrap();
        assert_eq!(host.sent().len(), 2);
        assert_eq!(correlator.pending_count(), 2);

        correlator.resolve("A".to_string());
        correlator.resolve("B".to_string());

        // Await in reverse to show ordering comes from the queue, not polling
        assert_eq!(r2.recv().await.unwrap(), "B");
        assert_eq!(r1.recv().await.unwrap(), "A");
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_request_sends_read_clipboard_command() {
        let (host, bus) = bus();
        let correlator = ClipboardCorrelator::new(None);

        let _pending = correlator.request(&bus).unwrap();
        let sent = host.sent();
        let envelope = Envelope::from_json(&sent[0]).unwrap();
        assert_eq!(envelope.name(), Some("read-clipboard"));
        assert_eq!(envelope.kind(), 6);
    }

    #[tokio::test]
    async fn test_unavailable_host_withdraws_slot() {
        let (host, bus) = bus();
        host.unavailable.store(true, Ordering::SeqCst);
        let correlator = ClipboardCorrelator::new(None);

        assert!(matches!(
            correlator.request(&bus),
            Err(BridgeError::HostUnavailable)
        ));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_keeps_fifo_for_answered_requests() {
        let (_host, bus) = bus();
        let correlator = ClipboardCorrelator::new(Some(Duration::from_millis(20)));

        let r1 = correlator.request(&bus).unwrap();
        let r2 = correlator.request(&bus).unwrap();

        assert!(matches!(r1.recv().await, Err(BridgeError::Timeout(_))));

        // Host answers both, late for the first one
        correlator.resolve("late-for-r1".to_string());
        correlator.resolve("for-r2".to_string());

        assert_eq!(r2.recv().await.unwrap(), "for-r2");
    }

    #[test]
    fn test_unsolicited_response_is_ignored() {
        let correlator = ClipboardCorrelator::new(None);
        correlator.resolve("nobody asked".to_string());
        assert_eq!(correlator.pending_count(), 0);
    }
}
