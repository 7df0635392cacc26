//! Fetch-merge-store of verifier records.
//!
//! Every request runs on its own tokio task. A task owns one [`Variant`] slot
//! while it is in flight; issuing a new request into the same slot cancels the
//! old one. Completed requests write into the [`VerifierCache`], flush it to
//! disk and refresh the [`View`] if it still shows the same key.

mod slot;
mod view;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cache::entry::now_secs;
use crate::cache::{CacheEntry, CacheError, DiskCache, VerifierCache};
use crate::config::{EndpointSettings, Settings};
use crate::error::TransportError;
use crate::key::{CacheKey, Endpoint, LevelRequest, Variant};
use crate::remote::{HttpClient, HttpResponse, LevelResponse};

use slot::{Claim, SlotTable};
pub use view::{Headless, View};

/// How a fetch task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The level document was parsed and stored
    Resolved(CacheEntry),
    /// Transport or HTTP failure; a negative entry was stored
    Failed(CacheEntry),
    /// The body was not valid JSON; nothing was stored
    Discarded,
    /// A newer request took over the slot before this one completed
    Superseded,
    /// Level id `<= 0`; no request was made
    Invalid,
}

/// Result of [`Fetcher::resolve`]
#[derive(Debug)]
pub enum Lookup {
    /// Level id `<= 0`
    Invalid,
    Cached(CacheEntry),
    /// Below the difficulty threshold, never fetched
    Ineligible,
    /// The same key is already being fetched in its slot
    InFlight,
    Pending(JoinHandle<FetchOutcome>),
}

struct Inner {
    cache: Arc<VerifierCache>,
    disk: Arc<DiskCache>,
    client: Arc<dyn HttpClient>,
    view: Arc<dyn View>,
    endpoints: EndpointSettings,
    min_difficulty: u8,
    slots: SlotTable,
}

/// Resolves verifier info through the cache, fetching on a miss
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<Inner>,
}

impl Fetcher {
    pub fn new(
        cache: Arc<VerifierCache>,
        disk: Arc<DiskCache>,
        client: Arc<dyn HttpClient>,
        view: Arc<dyn View>,
        settings: &Settings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                disk,
                client,
                view,
                endpoints: settings.endpoints.clone(),
                min_difficulty: settings.min_difficulty,
                slots: SlotTable::default(),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<VerifierCache> {
        &self.inner.cache
    }

    pub fn url_for(&self, request: &LevelRequest) -> String {
        let base = match request.endpoint() {
            Endpoint::Classic => &self.inner.endpoints.classic,
            Endpoint::Platformer => &self.inner.endpoints.platformer,
        };
        format!("{}/{}", base.trim_end_matches('/'), request.key())
    }

    /// Key currently being fetched in `variant`'s slot
    pub fn pending(&self, variant: Variant) -> Option<CacheKey> {
        self.inner.slots.pending_key(variant)
    }

    /// Look up `request`, starting a fetch on an eligible miss.
    pub fn resolve(&self, request: &LevelRequest) -> Lookup {
        if !request.is_valid() {
            warn!("Invalid level ID: {}", request.level_id);
            return Lookup::Invalid;
        }

        let key = request.key();
        if let Some(entry) = self.inner.cache.get(&key) {
            return Lookup::Cached(entry);
        }

        if !request.is_eligible(self.inner.min_difficulty) {
            debug!(
                "Level {} below difficulty {}, not fetching",
                key, self.inner.min_difficulty
            );
            return Lookup::Ineligible;
        }

        if self.pending(request.variant).as_ref() == Some(&key) {
            return Lookup::InFlight;
        }

        Lookup::Pending(self.fetch(request))
    }

    /// Fetch `request` in the background, superseding whatever its slot held.
    ///
    /// Must be called within a tokio runtime.
    pub fn fetch(&self, request: &LevelRequest) -> JoinHandle<FetchOutcome> {
        if !request.is_valid() {
            warn!("Invalid level ID: {}", request.level_id);
            return tokio::spawn(async { FetchOutcome::Invalid });
        }

        let key = request.key();
        let url = self.url_for(request);
        let claim = self.inner.slots.claim(request.variant, key.clone());
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let outcome = inner.run(&key, &url, &claim).await;
            inner.slots.release(&claim);
            outcome
        })
    }

    /// Drop every entry, in memory and on disk, and cancel pending requests.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        self.inner.slots.cancel_all();
        self.inner.cache.clear();
        self.inner.disk.remove()
    }
}

impl Inner {
    async fn run(&self, key: &CacheKey, url: &str, claim: &Claim) -> FetchOutcome {
        let result = tokio::select! {
            biased;
            _ = claim.token.cancelled() => None,
            result = self.client.get(url) => Some(result),
        };
        let Some(result) = result else {
            debug!("Request for {} cancelled", key);
            return FetchOutcome::Superseded;
        };

        let (entry, failed) = match interpret(key, result) {
            Some(parsed) => parsed,
            None => return FetchOutcome::Discarded,
        };

        // the response may land between cancellation and this point
        if claim.token.is_cancelled() {
            debug!("Dropping superseded response for {}", key);
            return FetchOutcome::Superseded;
        }

        self.store(key, entry.clone(), claim).await;

        if failed {
            FetchOutcome::Failed(entry)
        } else {
            FetchOutcome::Resolved(entry)
        }
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry, claim: &Claim) {
        self.cache.insert(key.clone(), entry.clone());

        let cache = Arc::clone(&self.cache);
        let disk = Arc::clone(&self.disk);
        let token = claim.token.clone();
        // a clear_all that ran meanwhile has already deleted the file
        let flush = move || disk.flush_if(&cache, || !token.is_cancelled());
        if let Err(e) = tokio::task::spawn_blocking(flush).await {
            error!("Cache flush task failed: {}", e);
        }

        if self.view.displayed_key().as_ref() == Some(key) {
            self.view.refresh(key, &entry);
        } else {
            debug!("View moved on, not refreshing for {}", key);
        }
    }
}

/// Turns a transfer result into the entry to store, and whether it is a
/// failure marker. `None` means the body could not be parsed.
fn interpret(
    key: &CacheKey,
    result: Result<HttpResponse, TransportError>,
) -> Option<(CacheEntry, bool)> {
    let response = match result {
        Ok(response) if response.ok() => response,
        Ok(response) => {
            warn!("API request failed for level {}: {}", key, response.status);
            return Some((CacheEntry::negative(now_secs()), true));
        }
        Err(e) => {
            warn!("API request failed for level {}: {}", key, e);
            return Some((CacheEntry::negative(now_secs()), true));
        }
    };

    match LevelResponse::parse(&response.body) {
        Ok(level) => Some((level.into_entry(now_secs()), false)),
        Err(e) => {
            error!("Failed to parse JSON response for level {}: {}", key, e);
            None
        }
    }
}
