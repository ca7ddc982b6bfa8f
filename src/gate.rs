use crate::resolver::Resolution;
use crate::session::{PendingResolution, PendingToken, SessionId};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::debug;

pub const DEFAULT_MIN_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LatencyProfile {
    min: Duration,
    max: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_LATENCY,
            max: DEFAULT_MAX_LATENCY,
        }
    }
}

impl LatencyProfile {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResolutionEvent {
    pub session: SessionId,
    pub token: PendingToken,
    pub resolution: Resolution,
}

/// Delivers each pending resolution back to the event loop after a random delay.
///
/// A scheduled delivery always fires once; whether it still applies is decided
/// by the receiver, which checks the session id and pending token.
#[derive(Debug, Clone)]
pub struct ProcessingGate {
    latency: LatencyProfile,
    tx: mpsc::UnboundedSender<ResolutionEvent>,
}

impl ProcessingGate {
    pub fn new(latency: LatencyProfile) -> (Self, mpsc::UnboundedReceiver<ResolutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { latency, tx }, rx)
    }

    pub fn latency(&self) -> LatencyProfile {
        self.latency
    }

    pub fn schedule(&self, session: SessionId, pending: PendingResolution) -> JoinHandle<()> {
        let delay = self.latency.sample(&mut rand::thread_rng());
        let tx = self.tx.clone();
        debug!(
            session = session.0,
            delay_ms = delay.as_millis() as u64,
            command = %pending.command,
            "scheduling resolution"
        );

        tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(ResolutionEvent {
                session,
                token: pending.token,
                resolution: pending.resolution,
            });
        })
    }
}
