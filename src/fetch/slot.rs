use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::key::{CacheKey, Variant};

struct Slot {
    key: CacheKey,
    token: CancellationToken,
    generation: u64,
}

/// Ticket handed to the task that owns a slot
#[derive(Debug, Clone)]
pub(crate) struct Claim {
    pub variant: Variant,
    pub generation: u64,
    pub token: CancellationToken,
}

/// One request handle per [`Variant`].
///
/// Claiming an occupied slot cancels the previous holder's token, so at most
/// one request per slot is ever live.
#[derive(Default)]
pub(crate) struct SlotTable {
    slots: DashMap<Variant, Slot>,
    next_generation: AtomicU64,
}

impl SlotTable {
    pub fn claim(&self, variant: Variant, key: CacheKey) -> Claim {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let slot = Slot {
            key,
            token: token.clone(),
            generation,
        };
        if let Some(previous) = self.slots.insert(variant, slot) {
            debug!("Superseding pending request for {}", previous.key);
            previous.token.cancel();
        }
        Claim {
            variant,
            generation,
            token,
        }
    }

    /// Frees the slot unless a newer claim already took it over.
    pub fn release(&self, claim: &Claim) {
        self.slots
            .remove_if(&claim.variant, |_, slot| slot.generation == claim.generation);
    }

    pub fn pending_key(&self, variant: Variant) -> Option<CacheKey> {
        self.slots.get(&variant).map(|slot| slot.key.clone())
    }

    pub fn cancel_all(&self) {
        self.slots.retain(|_, slot| {
            slot.token.cancel();
            false
        });
    }
}
