use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use foundation::time::Time;
use foundation::view::ViewState;

use crate::backoff::RetryPolicy;
use crate::protocol::{PayloadError, SkyTile, decode_tile};
use crate::request::{FetchTicket, Request};
use crate::residency::{Entry, EntryState, Residency};
use crate::selection::{SkyTileKey, TileIndex, required_tiles};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, DNS, timeout or body read failure.
    Transport(String),
    /// Non-success HTTP status.
    Status(u16),
    Malformed(PayloadError),
}

impl FetchError {
    /// Transient failures are retried without limit.
    ///
    /// Client errors other than 408/429 are treated like malformed payloads:
    /// asking again will not change the answer.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            FetchError::Malformed(_) => false,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status(code) => write!(f, "unexpected http status {code}"),
            FetchError::Malformed(err) => write!(f, "malformed payload: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PayloadError> for FetchError {
    fn from(err: PayloadError) -> Self {
        FetchError::Malformed(err)
    }
}

/// What a completion did to the cache.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Completion {
    /// Tile is now resident; the chart should redraw.
    Inserted(SkyTileKey),
    /// Fetch failed; the key becomes eligible again at `retry_at`.
    Retrying { key: SkyTileKey, retry_at: Time },
    /// Malformed too many times; the key will not be fetched again.
    Discarded(SkyTileKey),
    /// No live request matched. Ignored.
    Stale,
}

/// Per-chart tile cache with single-flight dispatch.
///
/// Notes on determinism:
/// - Entries are keyed in a `BTreeMap`, so tickets come out in key order.
/// - Time is passed in; the cache never reads a clock.
///
/// Resident tiles are never evicted during a chart's lifetime.
#[derive(Debug)]
pub struct TileCache {
    policy: RetryPolicy,
    next_request: u64,
    index: Option<TileIndex>,
    entries: BTreeMap<SkyTileKey, Entry>,
    requests: BTreeMap<Request, SkyTileKey>,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl TileCache {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            next_request: 1,
            index: None,
            entries: BTreeMap::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Level table, known once the root tile is resident.
    pub fn index(&self) -> Option<&TileIndex> {
        self.index.as_ref()
    }

    /// Keys the cache wants for `view`, given what it knows of the index.
    pub fn required(&self, view: &ViewState, grid: u32) -> BTreeSet<SkyTileKey> {
        required_tiles(self.index.as_ref(), view, grid)
    }

    pub fn residency(&self, key: &SkyTileKey) -> Option<Residency> {
        self.entries.get(key).map(Entry::residency)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_request(&mut self, key: SkyTileKey) -> Request {
        let request = Request(self.next_request);
        self.next_request += 1;
        self.requests.insert(request, key);
        request
    }

    /// Marks every missing or retry-eligible key in flight and returns one
    /// ticket per key marked.
    ///
    /// Resident, in-flight, discarded and still-backing-off keys yield
    /// nothing, so calling this repeatedly before completions arrive never
    /// duplicates a fetch.
    pub fn ensure_loaded<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a SkyTileKey>,
        now: Time,
    ) -> Vec<FetchTicket> {
        let mut tickets = Vec::new();
        for &key in keys {
            let dispatch = match self.entries.get(&key) {
                None => true,
                Some(entry) => entry.wants_fetch(now),
            };
            if !dispatch {
                continue;
            }

            let request = self.next_request(key);
            match self.entries.get_mut(&key) {
                Some(entry) => entry.state = EntryState::InFlight(request),
                None => {
                    self.entries.insert(key, Entry::in_flight(request));
                }
            }
            debug!(tile = %key, request = request.0, "dispatching tile fetch");
            tickets.push(FetchTicket { request, key });
        }
        tickets
    }

    /// Applies the result of a fetch started by [`TileCache::ensure_loaded`].
    pub fn complete(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, FetchError>,
        now: Time,
    ) -> Completion {
        let Some(key) = self.requests.remove(&request) else {
            return Completion::Stale;
        };
        let policy = self.policy;
        let Some(entry) = self.entries.get_mut(&key) else {
            return Completion::Stale;
        };
        if !matches!(entry.state, EntryState::InFlight(r) if r == request) {
            return Completion::Stale;
        }

        let err = match result.and_then(|body| decode_tile(key, &body).map_err(FetchError::from)) {
            Ok(decoded) => {
                debug!(
                    tile = %key,
                    stars = decoded.tile.stars.len(),
                    dsos = decoded.tile.dsos.len(),
                    "tile resident"
                );
                entry.state = EntryState::Resident(Arc::new(decoded.tile));
                if key == SkyTileKey::ROOT {
                    if let Some(index) = decoded.index {
                        self.index = Some(index);
                    }
                }
                return Completion::Inserted(key);
            }
            Err(err) => err,
        };

        if err.is_transient() {
            entry.transient_failures += 1;
            let retry_at = now.after(policy.delay_after(entry.transient_failures));
            entry.state = EntryState::Backoff { retry_at };
            debug!(
                tile = %key,
                error = %err,
                retry_at = retry_at.seconds(),
                "tile fetch failed; backing off"
            );
            return Completion::Retrying { key, retry_at };
        }

        entry.malformed_failures += 1;
        if policy.malformed_exhausted(entry.malformed_failures) {
            entry.state = EntryState::Discarded;
            warn!(
                tile = %key,
                error = %err,
                attempts = entry.malformed_failures,
                "discarding tile"
            );
            return Completion::Discarded(key);
        }
        let retry_at = now.after(policy.delay_after(entry.malformed_failures));
        entry.state = EntryState::Backoff { retry_at };
        warn!(
            tile = %key,
            error = %err,
            attempts = entry.malformed_failures,
            "bad tile payload; will retry"
        );
        Completion::Retrying { key, retry_at }
    }

    /// Resident tiles among `keys`, in key order.
    pub fn visible_tiles<'a>(
        &'a self,
        keys: impl IntoIterator<Item = &'a SkyTileKey> + 'a,
    ) -> impl Iterator<Item = &'a Arc<SkyTile>> + 'a {
        keys.into_iter()
            .filter_map(|key| match &self.entries.get(key)?.state {
                EntryState::Resident(tile) => Some(tile),
                _ => None,
            })
    }

    pub fn tile(&self, key: &SkyTileKey) -> Option<Arc<SkyTile>> {
        match &self.entries.get(key)?.state {
            EntryState::Resident(tile) => Some(Arc::clone(tile)),
            _ => None,
        }
    }

    /// Any of `keys` in flight or waiting out a backoff.
    ///
    /// Entries outside `keys` are ignored: a key that fails while off view
    /// stays in backoff until a later view asks for it again.
    pub fn has_pending_in<'a>(&self, keys: impl IntoIterator<Item = &'a SkyTileKey>) -> bool {
        keys.into_iter().any(|key| self.entries.get(key).is_some_and(Entry::is_pending))
    }

    /// Every key in `keys` has reached a terminal state.
    pub fn is_settled<'a>(&self, keys: impl IntoIterator<Item = &'a SkyTileKey>) -> bool {
        keys.into_iter().all(|key| {
            matches!(
                self.residency(key),
                Some(Residency::Resident | Residency::Discarded)
            )
        })
    }
}
