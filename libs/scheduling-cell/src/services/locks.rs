use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// In-process critical sections keyed by staff member. Held across
/// "re-check conflicts, then write" so two requests for the same staff
/// cannot both pass the check.
#[derive(Default)]
pub struct StaffLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl StaffLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, staff_id: Uuid) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self.locks.entry(staff_id).or_default().value().clone();
        debug!("Waiting for staff lock {}", staff_id);
        mutex.lock_owned().await
    }
}
