use crate::tts::UtteranceId;

/// Why the controller cancelled an utterance. Every cancellation the
/// controller performs carries one of these, so the completion callback the
/// synthesizer fires afterwards can be told apart from a real failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    UserPaused,
    UserStopped,
    SeekRequested,
    SpeedChanged,
    PageHidden,
    ClockElapsed,
    PostChanged,
    Teardown,
    /// A newer utterance replaced one that was still in flight.
    Superseded,
    /// The platform cut the current utterance short on its own.
    PlatformInterrupted,
}

impl CancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelReason::UserPaused => "user-paused",
            CancelReason::UserStopped => "user-stopped",
            CancelReason::SeekRequested => "seek-requested",
            CancelReason::SpeedChanged => "speed-changed",
            CancelReason::PageHidden => "page-hidden",
            CancelReason::ClockElapsed => "clock-elapsed",
            CancelReason::PostChanged => "post-changed",
            CancelReason::Teardown => "teardown",
            CancelReason::Superseded => "superseded",
            CancelReason::PlatformInterrupted => "platform-interrupted",
        }
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An utterance the controller cancelled on purpose and whose trailing
/// `Ended`/`Failed` event has not arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation {
    pub utterance: UtteranceId,
    pub reason: CancelReason,
}

/// Some synthesizers never report anything for a cancelled utterance, so
/// the ledger only remembers the most recent few.
const MAX_PENDING: usize = 8;

/// Outstanding intentional cancellations. Usually zero or one entry: a
/// cancel followed straight away by a new `speak` leaves the old id here
/// until its event is drained.
#[derive(Debug, Clone, Default)]
pub struct CancellationLedger {
    pending: Vec<Cancellation>,
}

impl CancellationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, utterance: UtteranceId, reason: CancelReason) {
        if self.pending.len() >= MAX_PENDING {
            self.pending.remove(0);
        }
        self.pending.push(Cancellation { utterance, reason });
    }

    /// Remove and return the cancellation recorded for `utterance`.
    pub fn take(&mut self, utterance: UtteranceId) -> Option<CancelReason> {
        let pos = self
            .pending
            .iter()
            .position(|entry| entry.utterance == utterance)?;
        Some(self.pending.remove(pos).reason)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
