//! Copy-on-write registry of renderable pairs keyed by target.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::renderable::{OccluderCube, RenderablePair, StrokedCube, TransformSnapshot};
use crate::target::TargetId;

type EntryMap = HashMap<TargetId, Arc<RenderablePair>>;

/// Concurrency-safe mapping from target to its renderable pair.
///
/// An entry exists exactly while its target is tracked. Writers publish a
/// fresh map per change; readers clone the committed `Arc` and never wait
/// for a writer to finish building the next one.
///
/// Sized for a handful of simultaneously tracked targets: every write
/// clones the map of `Arc`s.
///
/// ## Usage
///
/// ```rust
/// use wititude_core::{RenderablePair, RenderableRegistry, TransformSnapshot};
///
/// let registry = RenderableRegistry::new();
///
/// // Tracking thread
/// registry.put("bottle", RenderablePair::new());
/// registry.update_transform("bottle", &TransformSnapshot::IDENTITY);
///
/// // Render thread
/// let frame = registry.snapshot();
/// for (id, pair) in frame.iter() {
///     assert!(pair.is_coherent());
///     let _ = id;
/// }
/// ```
pub struct RenderableRegistry {
    /// Last committed map. Held only for the duration of an `Arc` clone or swap.
    committed: RwLock<Arc<EntryMap>>,
    /// Serializes writers so concurrent copy-on-write never drops an update.
    writer: Mutex<()>,
    /// Incremented on every committed change.
    generation: AtomicU64,
}

impl RenderableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Arc::new(EntryMap::new())),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Inserts or replaces the pair for `id`.
    ///
    /// Returns `true` if an existing pair was replaced. The replaced pair is
    /// released as soon as no in-flight frame still holds it.
    pub fn put(&self, id: impl Into<TargetId>, pair: RenderablePair) -> bool {
        let id = id.into();
        let replaced = self.commit(|entries| entries.insert(id.clone(), Arc::new(pair)).is_some());
        if replaced {
            tracing::debug!(target_id = %id, "replaced renderable pair");
        } else {
            tracing::debug!(target_id = %id, "inserted renderable pair");
        }
        replaced
    }

    /// Applies `snapshot` to both halves of the pair for `id`.
    ///
    /// Readers see either the old pair or the new one, never a mix. A no-op
    /// returning `false` when `id` is not tracked.
    pub fn update_transform(&self, id: &str, snapshot: &TransformSnapshot) -> bool {
        let _writer = self.writer.lock();
        let current = self.committed_arc();
        let Some(existing) = current.get(id) else {
            return false;
        };

        let mut pair = RenderablePair::clone(existing);
        pair.apply(snapshot);

        let mut next = EntryMap::clone(&current);
        if let Some(slot) = next.get_mut(id) {
            *slot = Arc::new(pair);
        }
        self.publish(next);
        true
    }

    /// Removes the pair for `id`. Returns `false` if it was not present.
    pub fn remove(&self, id: &str) -> bool {
        let _writer = self.writer.lock();
        let current = self.committed_arc();
        if !current.contains_key(id) {
            return false;
        }

        let mut next = EntryMap::clone(&current);
        next.remove(id);
        self.publish(next);
        tracing::debug!(target_id = id, "removed renderable pair");
        true
    }

    /// Removes every pair. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let _writer = self.writer.lock();
        let removed = self.committed_arc().len();
        if removed > 0 {
            self.publish(EntryMap::new());
            tracing::debug!(removed, "cleared renderable registry");
        }
        removed
    }

    /// Current pair for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<RenderablePair>> {
        self.committed_arc().get(id).cloned()
    }

    /// Current pair for `id`, falling back to `committed` instead of waiting
    /// if a writer is mid-swap.
    #[must_use]
    pub fn get_or_committed(&self, id: &str, committed: &RegistrySnapshot) -> Option<Arc<RenderablePair>> {
        match self.committed.try_read() {
            Some(guard) => guard.get(id).cloned(),
            None => committed.get(id).cloned(),
        }
    }

    /// Current visible model for `id`.
    ///
    /// Each call reads the committed map on its own, so this and
    /// [`get_occluder`](Self::get_occluder) called back to back may see
    /// different writes. Reach the occluder through [`PrimaryRef::pair`], or
    /// read both halves from one [`RegistrySnapshot`].
    #[must_use]
    pub fn get_primary(&self, id: &str) -> Option<PrimaryRef> {
        self.get(id).map(PrimaryRef)
    }

    /// Current occluder for `id`. See [`get_primary`](Self::get_primary)
    /// for reading both halves consistently.
    #[must_use]
    pub fn get_occluder(&self, id: &str) -> Option<OccluderRef> {
        self.get(id).map(OccluderRef)
    }

    /// Returns true if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.committed.read().contains_key(id)
    }

    /// Number of tracked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.read().len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.read().is_empty()
    }

    /// Generation of the committed map (incremented on each change).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Point-in-time view of every tracked pair.
    ///
    /// Later writes do not affect a snapshot already taken.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guard = self.committed.read();
        RegistrySnapshot {
            entries: Arc::clone(&guard),
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    fn committed_arc(&self) -> Arc<EntryMap> {
        Arc::clone(&self.committed.read())
    }

    fn commit<R>(&self, edit: impl FnOnce(&mut EntryMap) -> R) -> R {
        let _writer = self.writer.lock();
        let mut next = EntryMap::clone(&self.committed_arc());
        let out = edit(&mut next);
        self.publish(next);
        out
    }

    /// Swaps in `next`. Caller must hold `writer`.
    fn publish(&self, next: EntryMap) {
        let retired = {
            let mut committed = self.committed.write();
            std::mem::replace(&mut *committed, Arc::new(next))
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        // Dropped outside the write lock so releasing pairs never delays readers.
        drop(retired);
    }
}

impl Default for RenderableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableRegistry")
            .field("len", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Immutable view of the registry at one generation.
#[derive(Clone, Debug)]
pub struct RegistrySnapshot {
    entries: Arc<EntryMap>,
    generation: u64,
}

impl RegistrySnapshot {
    /// Generation this snapshot was taken at.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pair for `id` as of this snapshot.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<RenderablePair>> {
        self.entries.get(id)
    }

    /// Visible model for `id` as of this snapshot.
    #[must_use]
    pub fn primary(&self, id: &str) -> Option<PrimaryRef> {
        self.get(id).cloned().map(PrimaryRef)
    }

    /// Occluder for `id` as of this snapshot. Always from the same pair as
    /// [`primary`](Self::primary).
    #[must_use]
    pub fn occluder(&self, id: &str) -> Option<OccluderRef> {
        self.get(id).cloned().map(OccluderRef)
    }

    /// Tracked targets as of this snapshot, sorted for stable draw order.
    #[must_use]
    pub fn ids(&self) -> Vec<TargetId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterates over every pair.
    pub fn iter(&self) -> impl Iterator<Item = (&TargetId, &Arc<RenderablePair>)> {
        self.entries.iter()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to the visible model of a pair.
///
/// Keeps the whole pair alive, so the matching occluder can be reached
/// through [`PrimaryRef::pair`] with the same transform.
#[derive(Clone, Debug)]
pub struct PrimaryRef(Arc<RenderablePair>);

impl PrimaryRef {
    /// The pair this model belongs to.
    #[must_use]
    pub fn pair(&self) -> &Arc<RenderablePair> {
        &self.0
    }
}

impl Deref for PrimaryRef {
    type Target = StrokedCube;

    fn deref(&self) -> &StrokedCube {
        &self.0.primary
    }
}

/// Shared handle to the occluder of a pair.
#[derive(Clone, Debug)]
pub struct OccluderRef(Arc<RenderablePair>);

impl OccluderRef {
    /// The pair this occluder belongs to.
    #[must_use]
    pub fn pair(&self) -> &Arc<RenderablePair> {
        &self.0
    }
}

impl Deref for OccluderRef {
    type Target = OccluderCube;

    fn deref(&self) -> &OccluderCube {
        &self.0.occluder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, Vec3};
    use crate::renderable::Drawable;

    fn snapshot(x: f32) -> TransformSnapshot {
        TransformSnapshot::new(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), Vec3::splat(x))
    }

    #[test]
    fn test_put_and_get() {
        let registry = RenderableRegistry::new();
        assert!(!registry.put("bottle", RenderablePair::with_snapshot(&snapshot(1.0))));

        assert_eq!(registry.len(), 1);
        let primary = registry.get_primary("bottle").unwrap();
        let occluder = registry.get_occluder("bottle").unwrap();
        assert_eq!(primary.transform(), &snapshot(1.0));
        assert_eq!(occluder.transform(), &snapshot(1.0));
    }

    #[test]
    fn test_update_before_put_is_noop() {
        let registry = RenderableRegistry::new();
        assert!(!registry.update_transform("bottle", &snapshot(1.0)));
        assert!(registry.is_empty());
        assert!(registry.get("bottle").is_none());
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn test_put_replaces_and_releases() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::with_snapshot(&snapshot(1.0)));
        let first = Arc::downgrade(&registry.get("bottle").unwrap());

        assert!(registry.put("bottle", RenderablePair::with_snapshot(&snapshot(2.0))));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("bottle").unwrap().snapshot(), &snapshot(2.0));
        assert!(first.upgrade().is_none(), "replaced pair must be released");
    }

    #[test]
    fn test_update_applies_to_both() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::new());
        assert!(registry.update_transform("bottle", &snapshot(3.0)));

        let pair = registry.get("bottle").unwrap();
        assert!(pair.is_coherent());
        assert_eq!(pair.snapshot(), &snapshot(3.0));
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::new());
        registry.put("firetruck", RenderablePair::new());

        assert!(registry.remove("bottle"));
        assert!(!registry.remove("bottle"));
        assert!(!registry.contains("bottle"));

        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.clear(), 0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::with_snapshot(&snapshot(1.0)));
        let frame = registry.snapshot();

        registry.update_transform("bottle", &snapshot(2.0));
        registry.remove("bottle");

        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get("bottle").unwrap().snapshot(), &snapshot(1.0));
        assert!(registry.get("bottle").is_none());
        assert!(registry.generation() > frame.generation());
    }

    #[test]
    fn test_get_or_committed_prefers_live_value() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::with_snapshot(&snapshot(1.0)));
        let frame = registry.snapshot();
        registry.update_transform("bottle", &snapshot(2.0));

        let live = registry.get_or_committed("bottle", &frame).unwrap();
        assert_eq!(live.snapshot(), &snapshot(2.0));
    }

    #[test]
    fn test_primary_ref_reaches_matching_occluder() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::with_snapshot(&snapshot(4.0)));
        let primary = registry.get_primary("bottle").unwrap();
        assert_eq!(primary.pair().occluder.transform(), primary.transform());
    }

    #[test]
    fn test_snapshot_halves_come_from_one_pair() {
        let registry = RenderableRegistry::new();
        registry.put("bottle", RenderablePair::with_snapshot(&snapshot(1.0)));
        let frame = registry.snapshot();

        let primary = frame.primary("bottle").unwrap();
        // A write between the two reads must not split the pair.
        registry.update_transform("bottle", &snapshot(2.0));
        let occluder = frame.occluder("bottle").unwrap();

        assert!(Arc::ptr_eq(primary.pair(), occluder.pair()));
        assert_eq!(occluder.transform(), primary.transform());
        assert_eq!(primary.pair().snapshot(), &snapshot(1.0));
        assert!(frame.primary("mug").is_none());

        let live = registry.get_occluder("bottle").unwrap();
        assert!(!Arc::ptr_eq(primary.pair(), live.pair()));
    }
}
