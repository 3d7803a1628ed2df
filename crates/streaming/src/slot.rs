use std::sync::Arc;

use tracing::warn;

use foundation::time::Time;

use crate::backoff::RetryPolicy;
use crate::cache::FetchError;
use crate::request::Request;

#[derive(Debug)]
enum SlotState<T> {
    Empty,
    InFlight(Request),
    Ready(Arc<T>),
    Backoff { retry_at: Time },
    Failed,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SlotEvent {
    Ready,
    Retrying { retry_at: Time },
    Failed,
    Stale,
}

/// A single lazily fetched resource with the same dispatch and retry rules
/// as [`crate::cache::TileCache`] (used for constellation data).
#[derive(Debug)]
pub struct SingleFlight<T> {
    policy: RetryPolicy,
    next_request: u64,
    state: SlotState<T>,
    transient_failures: u32,
    malformed_failures: u32,
}

impl<T> SingleFlight<T> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            next_request: 1,
            state: SlotState::Empty,
            transient_failures: 0,
            malformed_failures: 0,
        }
    }

    /// Returns a request id if a fetch should start now.
    pub fn begin(&mut self, now: Time) -> Option<Request> {
        let due = match self.state {
            SlotState::Empty => true,
            SlotState::Backoff { retry_at } => now >= retry_at,
            _ => false,
        };
        if !due {
            return None;
        }
        let request = Request(self.next_request);
        self.next_request += 1;
        self.state = SlotState::InFlight(request);
        Some(request)
    }

    pub fn complete(
        &mut self,
        request: Request,
        result: Result<T, FetchError>,
        now: Time,
    ) -> SlotEvent {
        if !matches!(self.state, SlotState::InFlight(r) if r == request) {
            return SlotEvent::Stale;
        }
        let err = match result {
            Ok(value) => {
                self.state = SlotState::Ready(Arc::new(value));
                return SlotEvent::Ready;
            }
            Err(err) => err,
        };

        let failures = if err.is_transient() {
            self.transient_failures += 1;
            self.transient_failures
        } else {
            self.malformed_failures += 1;
            if self.policy.malformed_exhausted(self.malformed_failures) {
                warn!(error = %err, "giving up on resource");
                self.state = SlotState::Failed;
                return SlotEvent::Failed;
            }
            self.malformed_failures
        };
        let retry_at = now.after(self.policy.delay_after(failures));
        self.state = SlotState::Backoff { retry_at };
        SlotEvent::Retrying { retry_at }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        match &self.state {
            SlotState::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SlotState::InFlight(_) | SlotState::Backoff { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{SingleFlight, SlotEvent};
    use crate::backoff::RetryPolicy;
    use crate::cache::FetchError;
    use crate::request::Request;
    use foundation::time::Time;

    #[test]
    fn fetches_once() {
        let mut slot: SingleFlight<u32> = SingleFlight::new(RetryPolicy::default());
        let req = slot.begin(Time::ZERO).expect("first begin");
        assert_eq!(slot.begin(Time::ZERO), None);
        assert_eq!(slot.complete(req, Ok(7), Time::ZERO), SlotEvent::Ready);
        assert_eq!(slot.get().as_deref(), Some(&7));
        assert_eq!(slot.begin(Time(5.0)), None);
        assert_eq!(slot.complete(Request(99), Ok(8), Time::ZERO), SlotEvent::Stale);
    }

    #[test]
    fn retries_then_fails() {
        let mut slot: SingleFlight<u32> = SingleFlight::new(RetryPolicy {
            max_malformed_attempts: 1,
            ..RetryPolicy::default()
        });
        let req = slot.begin(Time::ZERO).unwrap();
        let ev = slot.complete(req, Err(FetchError::Transport("down".into())), Time::ZERO);
        assert_eq!(ev, SlotEvent::Retrying { retry_at: Time(0.5) });
        assert!(slot.is_pending());
        assert_eq!(slot.begin(Time(0.4)), None);

        let req = slot.begin(Time(0.5)).unwrap();
        assert_eq!(slot.complete(req, Err(FetchError::Status(404)), Time(0.6)), SlotEvent::Failed);
        assert!(!slot.is_pending());
        assert_eq!(slot.begin(Time(100.0)), None);
    }
}
