use std::sync::Arc;

use foundation::time::Time;

use crate::protocol::SkyTile;
use crate::request::Request;

/// Lifecycle of one tile key.
///
/// `Absent → InFlight → Resident`, or `InFlight → Backoff → InFlight ...`
/// on failure, ending in `Discarded` once a malformed payload has used up its
/// attempts. `Resident` and `Discarded` are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Residency {
    InFlight,
    Resident,
    Backoff,
    Discarded,
}

#[derive(Debug, Clone)]
pub(crate) enum EntryState {
    InFlight(Request),
    Resident(Arc<SkyTile>),
    Backoff { retry_at: Time },
    Discarded,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) state: EntryState,
    pub(crate) transient_failures: u32,
    pub(crate) malformed_failures: u32,
}

impl Entry {
    pub(crate) fn in_flight(request: Request) -> Self {
        Self {
            state: EntryState::InFlight(request),
            transient_failures: 0,
            malformed_failures: 0,
        }
    }

    pub(crate) fn residency(&self) -> Residency {
        match self.state {
            EntryState::InFlight(_) => Residency::InFlight,
            EntryState::Resident(_) => Residency::Resident,
            EntryState::Backoff { .. } => Residency::Backoff,
            EntryState::Discarded => Residency::Discarded,
        }
    }

    /// Whether a new fetch may be dispatched at `now`.
    pub(crate) fn wants_fetch(&self, now: Time) -> bool {
        match self.state {
            EntryState::Backoff { retry_at } => now >= retry_at,
            _ => false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::InFlight(_) | EntryState::Backoff { .. })
    }
}
