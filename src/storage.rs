//! Storage port abstraction.
//!
//! The proximity engine keeps no state of its own: it annotates the owning
//! entity's record with [`EncodedKeys`] and reads them back through ordered
//! range scans. [`RangeScanPort`] is that boundary; [`MemoryBackend`] is an
//! in-process implementation backed by ordered maps.

use crate::encoding::{AxisKey, EncodedKeys};
use crate::error::{Result, SpatialError};
use crate::grid::Axis;
use crate::planner::{ScanOrder, ScanSpec};
use crate::spatial::Point;
use crate::types::{Consistency, EntityId};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An ordered range scan over one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub axis: Axis,
    /// Inclusive lower bound; `None` scans from the first key.
    pub lower: Option<AxisKey>,
    /// Inclusive upper bound; `None` scans to the last key.
    pub upper: Option<AxisKey>,
    pub order: ScanOrder,
    pub limit: usize,
    pub consistency: Consistency,
}

impl ScanRequest {
    pub fn from_spec(spec: &ScanSpec, consistency: Consistency) -> Self {
        Self {
            axis: spec.axis,
            lower: spec.lower,
            upper: spec.upper,
            order: spec.order,
            limit: spec.limit,
            consistency,
        }
    }
}

/// One index hit: the entity and everything stored for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub id: EntityId,
    pub keys: EncodedKeys,
}

impl IndexedEntry {
    pub fn point(&self) -> Point {
        self.keys.coordinates
    }
}

/// Trait for the ordered storage the engine runs on.
///
/// Implementations must return scan results in the requested order, honour
/// open-ended bounds and never return more than `limit` entries. Scans may
/// be issued from several threads at once.
pub trait RangeScanPort: Send + Sync {
    /// Range scan over one axis.
    fn scan(&self, request: &ScanRequest) -> Result<Vec<IndexedEntry>>;

    /// Insert or replace the keys stored for `id`.
    fn put(&self, id: &EntityId, keys: &EncodedKeys) -> Result<()>;

    /// Remove every key stored for `id`; returns whether anything was removed.
    fn delete(&self, id: &EntityId) -> Result<bool>;

    /// Whether scans can be served at `consistency`.
    fn supports(&self, consistency: Consistency) -> bool {
        consistency == Consistency::Eventual
    }
}

impl<P: RangeScanPort + ?Sized> RangeScanPort for std::sync::Arc<P> {
    fn scan(&self, request: &ScanRequest) -> Result<Vec<IndexedEntry>> {
        (**self).scan(request)
    }

    fn put(&self, id: &EntityId, keys: &EncodedKeys) -> Result<()> {
        (**self).put(id, keys)
    }

    fn delete(&self, id: &EntityId) -> Result<bool> {
        (**self).delete(id)
    }

    fn supports(&self, consistency: Consistency) -> bool {
        (**self).supports(consistency)
    }
}

/// Storage backend statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of indexed entities
    pub entity_count: usize,
    /// Number of keys across both axes
    pub key_count: usize,
    /// Number of scans served
    pub scan_count: u64,
    /// Number of entries returned by scans
    pub entries_read: u64,
    /// Number of put and delete operations
    pub write_count: u64,
}

#[derive(Default)]
struct MemoryInner {
    records: BTreeMap<EntityId, EncodedKeys>,
    north_south: BTreeSet<(AxisKey, EntityId)>,
    east_west: BTreeSet<(AxisKey, EntityId)>,
    write_count: u64,
}

impl MemoryInner {
    fn axis_index(&mut self, axis: Axis) -> &mut BTreeSet<(AxisKey, EntityId)> {
        match axis {
            Axis::NorthSouth => &mut self.north_south,
            Axis::EastWest => &mut self.east_west,
        }
    }

    fn unlink(&mut self, id: &EntityId) -> Option<EncodedKeys> {
        let old = self.records.remove(id)?;
        for axis in [Axis::NorthSouth, Axis::EastWest] {
            let index = self.axis_index(axis);
            for key in old.keys(axis) {
                index.remove(&(*key, id.clone()));
            }
        }
        Some(old)
    }
}

/// In-memory storage backend using ordered sets per axis.
///
/// Writes are immediately visible, so every consistency mode is supported.
#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<MemoryInner>,
    scan_count: AtomicU64,
    entries_read: AtomicU64,
}

impl MemoryBackend {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EntityId) -> Result<Option<EncodedKeys>> {
        Ok(self.read()?.records.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        let inner = self.read()?;
        Ok(StorageStats {
            entity_count: inner.records.len(),
            key_count: inner.north_south.len() + inner.east_west.len(),
            scan_count: self.scan_count.load(Ordering::Relaxed),
            entries_read: self.entries_read.load(Ordering::Relaxed),
            write_count: inner.write_count,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryInner>> {
        self.inner.read().map_err(|_| SpatialError::Lock)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryInner>> {
        self.inner.write().map_err(|_| SpatialError::Lock)
    }
}

type IndexBound = Bound<(AxisKey, EntityId)>;

fn scan_bounds(request: &ScanRequest) -> (IndexBound, IndexBound) {
    let lower = match request.lower {
        Some(key) => Bound::Included((key, EntityId::default())),
        None => Bound::Unbounded,
    };
    // every (key, id) pair sorts before (key + 1, "")
    let upper = match request.upper.map(|key| key.successor()) {
        Some(Some(next)) => Bound::Excluded((next, EntityId::default())),
        Some(None) | None => Bound::Unbounded,
    };
    (lower, upper)
}

impl RangeScanPort for MemoryBackend {
    fn scan(&self, request: &ScanRequest) -> Result<Vec<IndexedEntry>> {
        if let (Some(lower), Some(upper)) = (request.lower, request.upper) {
            if lower > upper {
                return Ok(Vec::new());
            }
        }

        let inner = self.read()?;
        let index = match request.axis {
            Axis::NorthSouth => &inner.north_south,
            Axis::EastWest => &inner.east_west,
        };
        let range = index.range(scan_bounds(request));
        let ids: Vec<EntityId> = match request.order {
            ScanOrder::Ascending => range.take(request.limit).map(|(_, id)| id.clone()).collect(),
            ScanOrder::Descending => range
                .rev()
                .take(request.limit)
                .map(|(_, id)| id.clone())
                .collect(),
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(keys) = inner.records.get(&id) {
                entries.push(IndexedEntry {
                    keys: keys.clone(),
                    id,
                });
            }
        }

        self.scan_count.fetch_add(1, Ordering::Relaxed);
        self.entries_read
            .fetch_add(entries.len() as u64, Ordering::Relaxed);
        Ok(entries)
    }

    fn put(&self, id: &EntityId, keys: &EncodedKeys) -> Result<()> {
        let mut inner = self.write()?;
        inner.unlink(id);
        for key in &keys.north_south {
            inner.north_south.insert((*key, id.clone()));
        }
        for key in &keys.east_west {
            inner.east_west.insert((*key, id.clone()));
        }
        inner.records.insert(id.clone(), keys.clone());
        inner.write_count += 1;
        Ok(())
    }

    fn delete(&self, id: &EntityId) -> Result<bool> {
        let mut inner = self.write()?;
        let removed = inner.unlink(id).is_some();
        inner.write_count += 1;
        Ok(removed)
    }

    fn supports(&self, _consistency: Consistency) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn keys(lat: f64, ns: &[(i64, f64)], ew: &[(i64, f64)]) -> EncodedKeys {
        EncodedKeys {
            coordinates: Point::new(lat, 0.0),
            north_south: ns.iter().map(|&(t, p)| AxisKey::new(t, p)).collect(),
            east_west: ew.iter().map(|&(t, p)| AxisKey::new(t, p)).collect(),
        }
    }

    fn request(
        lower: Option<AxisKey>,
        upper: Option<AxisKey>,
        order: ScanOrder,
        limit: usize,
    ) -> ScanRequest {
        ScanRequest {
            axis: Axis::NorthSouth,
            lower,
            upper,
            order,
            limit,
            consistency: Consistency::Eventual,
        }
    }

    fn ids(entries: &[IndexedEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id.to_string()).collect()
    }

    fn populated() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.put(&"a".into(), &keys(1.0, &[(0, 1.0), (1, 1.0)], &[])).unwrap();
        backend.put(&"b".into(), &keys(2.0, &[(0, 2.0)], &[])).unwrap();
        backend.put(&"c".into(), &keys(2.0, &[(0, 2.0)], &[])).unwrap();
        backend.put(&"d".into(), &keys(3.0, &[(1, 3.0)], &[])).unwrap();
        backend
    }

    #[test]
    fn test_scan_ascending_within_tile() {
        let backend = populated();
        let entries = backend
            .scan(&request(
                Some(AxisKey::new(0, 1.5)),
                Some(AxisKey::new(0, 10.0)),
                ScanOrder::Ascending,
                10,
            ))
            .unwrap();
        assert_eq!(ids(&entries), vec!["b", "c"]);
    }

    #[test]
    fn test_scan_descending_includes_upper_bound() {
        let backend = populated();
        let entries = backend
            .scan(&request(
                Some(AxisKey::new(0, 0.0)),
                Some(AxisKey::new(0, 2.0)),
                ScanOrder::Descending,
                2,
            ))
            .unwrap();
        assert_eq!(ids(&entries), vec!["c", "b"]);
    }

    #[test]
    fn test_scan_open_bounds() {
        let backend = populated();
        let all = backend
            .scan(&request(None, None, ScanOrder::Ascending, 100))
            .unwrap();
        assert_eq!(ids(&all), vec!["a", "b", "c", "a", "d"]);

        let last = backend
            .scan(&request(None, None, ScanOrder::Descending, 1))
            .unwrap();
        assert_eq!(ids(&last), vec!["d"]);
    }

    #[test]
    fn test_scan_inverted_bounds_is_empty() {
        let backend = populated();
        let entries = backend
            .scan(&request(
                Some(AxisKey::new(1, 0.0)),
                Some(AxisKey::new(0, 0.0)),
                ScanOrder::Ascending,
                10,
            ))
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_put_overwrites_previous_keys() {
        let backend = populated();
        let id: EntityId = "a".into();
        backend.put(&id, &keys(5.0, &[(2, 5.0)], &[])).unwrap();

        let tile0 = backend
            .scan(&request(
                Some(AxisKey::new(0, f64::MIN)),
                Some(AxisKey::new(0, f64::MAX)),
                ScanOrder::Ascending,
                10,
            ))
            .unwrap();
        assert_eq!(ids(&tile0), vec!["b", "c"]);
        assert_eq!(backend.get(&id).unwrap().unwrap().coordinates.lat, 5.0);
        assert_eq!(backend.len().unwrap(), 4);
    }

    #[test]
    fn test_delete_and_stats() {
        let backend = populated();
        assert!(backend.delete(&"b".into()).unwrap());
        assert!(!backend.delete(&"b".into()).unwrap());
        assert!(backend.get(&"b".into()).unwrap().is_none());

        let stats = backend.stats().unwrap();
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.key_count, 4);
        assert_eq!(stats.write_count, 6);
    }

    #[test]
    fn test_scan_counts_reads() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty().unwrap());
        let encoded = EncodedKeys {
            coordinates: Point::new(0.0, 0.0),
            north_south: smallvec![AxisKey::new(0, 0.0)],
            east_west: smallvec![AxisKey::new(0, 0.0)],
        };
        backend.put(&"x".into(), &encoded).unwrap();
        backend
            .scan(&request(None, None, ScanOrder::Ascending, 5))
            .unwrap();
        let stats = backend.stats().unwrap();
        assert_eq!(stats.scan_count, 1);
        assert_eq!(stats.entries_read, 1);
        assert!(backend.supports(Consistency::Strong));
    }
}
