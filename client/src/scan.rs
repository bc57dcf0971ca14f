//! Hand-off between a code scanner and the check-in flow.
//!
//! The scanner owns a [`ScanSession`] and reports at most one outcome; the
//! flow awaits the paired [`ScanReceiver`]. The scanned text is opaque and is
//! forwarded as the guest payload untouched.

use std::sync::Mutex;

use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Scanned(String),
    Cancelled,
}

pub struct ScanSession {
    sender: Mutex<Option<oneshot::Sender<ScanOutcome>>>,
}

pub struct ScanReceiver {
    inner: oneshot::Receiver<ScanOutcome>,
}

impl ScanSession {
    pub fn new() -> (Self, ScanReceiver) {
        let (sender, inner) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(sender)),
            },
            ScanReceiver { inner },
        )
    }

    /// Returns `true` only for the call that delivered the outcome.
    pub fn on_code_scanned(&self, text: impl Into<String>) -> bool {
        self.deliver(ScanOutcome::Scanned(text.into()))
    }

    pub fn on_cancelled(&self) -> bool {
        self.deliver(ScanOutcome::Cancelled)
    }

    fn deliver(&self, outcome: ScanOutcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    tracing::debug!("Scan outcome dropped, nobody is waiting");
                }
                true
            }
            None => false,
        }
    }
}

impl ScanReceiver {
    pub async fn outcome(self) -> ScanOutcome {
        self.inner.await.unwrap_or(ScanOutcome::Cancelled)
    }
}
