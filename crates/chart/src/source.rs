//! Where chart data comes from.
//!
//! Charts run on a single thread, so sources hand back `!Send` futures and
//! the chart drives them with `spawn_local`.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use tracing::debug;

use streaming::{FetchError, SkyTileKey};

/// Boxed future that stays on the current thread.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Raw tile and constellation payloads. Decoding happens in the cache.
pub trait TileSource {
    fn fetch_tile(&self, key: SkyTileKey) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>>;

    fn fetch_constellations(&self) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>>;
}

impl<T: TileSource + ?Sized> TileSource for Rc<T> {
    fn fetch_tile(&self, key: SkyTileKey) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
        (**self).fetch_tile(key)
    }

    fn fetch_constellations(&self) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
        (**self).fetch_constellations()
    }
}

/// Tile server reached over HTTP:
/// `{base}/tiles/{level}_{ra}_{dec}.json` and `{base}/constellations.json`.
pub struct HttpTileSource {
    base: String,
    client: reqwest::Client,
}

impl HttpTileSource {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(base, reqwest::Client::new())
    }

    pub fn with_client(base: impl Into<String>, client: reqwest::Client) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { base, client }
    }

    pub fn tile_url(&self, key: SkyTileKey) -> String {
        format!("{}/tiles/{}.json", self.base, key.path())
    }

    pub fn constellations_url(&self) -> String {
        format!("{}/constellations.json", self.base)
    }

    async fn get(&self, url: String) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl TileSource for HttpTileSource {
    fn fetch_tile(&self, key: SkyTileKey) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
        Box::pin(self.get(self.tile_url(key)))
    }

    fn fetch_constellations(&self) -> LocalBoxFuture<'_, Result<Vec<u8>, FetchError>> {
        Box::pin(self.get(self.constellations_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTileSource;
    use streaming::SkyTileKey;

    #[test]
    fn urls_follow_tile_layout() {
        let source = HttpTileSource::new("https://sky.example/data/");
        assert_eq!(
            source.tile_url(SkyTileKey::new(1, 12, 3)),
            "https://sky.example/data/tiles/1_12_3.json"
        );
        assert_eq!(
            source.constellations_url(),
            "https://sky.example/data/constellations.json"
        );
    }
}
