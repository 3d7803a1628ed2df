use crate::selection::SkyTileKey;

/// Identifies one dispatched fetch.
///
/// Small and copyable so completions can be matched back to their key
/// without holding on to the key itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

/// A fetch the caller must perform and report back through
/// [`crate::cache::TileCache::complete`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub request: Request,
    pub key: SkyTileKey,
}
