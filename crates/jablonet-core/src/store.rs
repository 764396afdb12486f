// ── Snapshot store and control reconciliation ──
//
// Holds the latest delivered snapshot behind a `watch` channel. A control
// epoch counter orders fetches against control patches: a fetch records
// the epoch when it starts, and if a control completed in the meantime
// the fetch result is dropped in favour of the patched snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::model::{PointState, Snapshot};

/// Marks the moment a fetch started.
#[derive(Debug, Clone, Copy)]
pub struct FetchTicket {
    epoch: u64,
}

pub struct SnapshotStore {
    current: watch::Sender<Option<Arc<Snapshot>>>,
    control_epoch: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            control_epoch: AtomicU64::new(0),
        }
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.current.subscribe()
    }

    /// Call before the fetch is issued.
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket {
            epoch: self.control_epoch.load(Ordering::SeqCst),
        }
    }

    /// Publish a fetched snapshot unless a control completed after `ticket`
    /// was taken. Returns whichever snapshot is current afterwards.
    pub fn apply_fetch(&self, ticket: FetchTicket, snapshot: Snapshot) -> Arc<Snapshot> {
        let fresh = Arc::new(snapshot);
        let mut kept = None;

        self.current.send_if_modified(|current| {
            if ticket.epoch != self.control_epoch.load(Ordering::SeqCst) {
                if let Some(patched) = current.as_ref() {
                    kept = Some(Arc::clone(patched));
                    return false;
                }
            }
            *current = Some(Arc::clone(&fresh));
            true
        });

        match kept {
            Some(patched) => {
                debug!("discarding fetch that started before a control command");
                patched
            }
            None => fresh,
        }
    }

    /// Patch one programmable output with an authoritative control result.
    ///
    /// Always advances the control epoch, so fetches already in flight are
    /// discarded even when the point is not in the current snapshot.
    pub fn apply_control(
        &self,
        point_id: &str,
        state: PointState,
        changed_at: Option<DateTime<Utc>>,
    ) -> bool {
        self.current.send_if_modified(|current| {
            self.control_epoch.fetch_add(1, Ordering::SeqCst);
            let Some(snapshot) = current.as_ref() else {
                return false;
            };
            let mut next = Snapshot::clone(snapshot);
            if !next.patch_output(point_id, state, changed_at) {
                return false;
            }
            *current = Some(Arc::new(next));
            true
        })
    }

    pub fn clear(&self) {
        self.current.send_replace(None);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Category, PointRecord};

    fn snapshot_with_output(state: PointState) -> Snapshot {
        let point = PointRecord {
            state: Some(state),
            ..PointRecord::default()
        };
        Snapshot {
            categories: BTreeMap::from([(
                Category::ProgrammableOutputs,
                BTreeMap::from([("1".to_owned(), point)]),
            )]),
            permissions: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    fn output_state(snapshot: &Snapshot) -> Option<PointState> {
        snapshot.programmable_output("1").and_then(|p| p.state)
    }

    #[test]
    fn fetch_replaces_snapshot_wholesale() {
        let store = SnapshotStore::new();
        store.apply_fetch(store.begin_fetch(), snapshot_with_output(PointState::OFF));
        let delivered = store.apply_fetch(store.begin_fetch(), snapshot_with_output(PointState::ON));

        assert_eq!(output_state(&delivered), Some(PointState::ON));
        assert_eq!(store.latest().as_deref(), Some(&*delivered));
    }

    #[test]
    fn fetch_started_before_control_is_discarded() {
        let store = SnapshotStore::new();
        store.apply_fetch(store.begin_fetch(), snapshot_with_output(PointState::OFF));

        let stale = store.begin_fetch();
        assert!(store.apply_control("1", PointState::ON, None));
        let delivered = store.apply_fetch(stale, snapshot_with_output(PointState::OFF));

        assert_eq!(output_state(&delivered), Some(PointState::ON));
        assert_eq!(store.latest().as_deref().and_then(output_state), Some(PointState::ON));
    }

    #[test]
    fn fetch_started_after_control_wins() {
        let store = SnapshotStore::new();
        store.apply_fetch(store.begin_fetch(), snapshot_with_output(PointState::OFF));
        store.apply_control("1", PointState::ON, None);

        let fresh = store.begin_fetch();
        let delivered = store.apply_fetch(fresh, snapshot_with_output(PointState::OFF));

        assert_eq!(output_state(&delivered), Some(PointState::OFF));
    }

    #[test]
    fn stale_fetch_is_kept_when_nothing_was_delivered_yet() {
        let store = SnapshotStore::new();
        let stale = store.begin_fetch();
        assert!(!store.apply_control("1", PointState::ON, None));

        let delivered = store.apply_fetch(stale, snapshot_with_output(PointState::OFF));
        assert_eq!(output_state(&delivered), Some(PointState::OFF));
    }

    #[test]
    fn subscribers_see_control_patch() {
        let store = SnapshotStore::new();
        store.apply_fetch(store.begin_fetch(), snapshot_with_output(PointState::OFF));
        let mut rx = store.subscribe();
        rx.mark_unchanged();

        store.apply_control("1", PointState::ON, None);

        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow().as_deref().and_then(output_state), Some(PointState::ON));
    }
}
