//! Bounded cache of generated voxel fields.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use cgmath::Point2;
use log::trace;
use lru::LruCache;

use crate::core::MtResource;

use super::{TerrainSource, VoxelField};

/// A fixed-capacity, least-recently-used cache of voxel fields, keyed by
/// chunk coordinate.
///
/// Neighboring chunks read overlapping margin columns, so a field generated
/// for one build is frequently wanted again moments later by another worker.
/// The cache is guarded by a single mutex because multiple workers may
/// request fields concurrently; the contained fields are handed out as
/// [`MtResource`] clones so readers share them without holding the cache
/// lock.
///
/// The capacity is a strict bound: inserting over capacity evicts the least
/// recently used field. Downstream code relies on this staying bounded.
pub struct FieldCache {
    fields: Mutex<LruCache<Point2<i32>, MtResource<VoxelField>>>,
}

impl FieldCache {
    /// Creates a cache bounded to `capacity` fields.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        FieldCache {
            fields: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("field cache capacity must be non-zero"),
            )),
        }
    }

    /// Returns the cached field for `coord`, generating and inserting it on a
    /// miss.
    ///
    /// Generation runs outside the cache lock so a slow terrain source never
    /// stalls other workers' lookups. If two workers race to generate the
    /// same coordinate, the first inserted field wins and the duplicate is
    /// discarded.
    pub fn get_or_generate(
        &self,
        coord: Point2<i32>,
        terrain: &dyn TerrainSource,
    ) -> MtResource<VoxelField> {
        if let Some(field) = self.fields.lock().unwrap().get(&coord) {
            return field.clone();
        }

        trace!("generating voxel field for chunk ({}, {})", coord.x, coord.y);
        let generated = MtResource::new(VoxelField::generate(coord, terrain));

        let mut fields = self.fields.lock().unwrap();
        if let Some(existing) = fields.get(&coord) {
            return existing.clone();
        }
        fields.push(coord, generated.clone());
        generated
    }

    /// Returns the cached field for `coord` without generating, promoting it
    /// to most recently used when present.
    pub fn cached(&self, coord: Point2<i32>) -> Option<MtResource<VoxelField>> {
        self.fields.lock().unwrap().get(&coord).cloned()
    }

    /// Drops the cached field for `coord`, if any.
    pub fn remove(&self, coord: Point2<i32>) {
        self.fields.lock().unwrap().pop(&coord);
    }

    /// Number of currently cached fields.
    pub fn len(&self) -> usize {
        self.fields.lock().unwrap().len()
    }

    /// Whether the cache currently holds no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::FlatTerrain;

    #[test]
    fn generates_on_miss_and_hits_afterwards() {
        let cache = FieldCache::new(4);
        let terrain = FlatTerrain::new(3);

        assert!(cache.cached(Point2::new(0, 0)).is_none());
        let field = cache.get_or_generate(Point2::new(0, 0), &terrain);
        assert!(field.get().is_solid(0, 0, 0));
        assert_eq!(cache.len(), 1);
        assert!(cache.cached(Point2::new(0, 0)).is_some());
    }

    #[test]
    fn capacity_is_a_strict_bound() {
        let cache = FieldCache::new(2);
        let terrain = FlatTerrain::new(1);

        cache.get_or_generate(Point2::new(0, 0), &terrain);
        cache.get_or_generate(Point2::new(1, 0), &terrain);
        cache.get_or_generate(Point2::new(2, 0), &terrain);

        assert_eq!(cache.len(), 2);
        // The oldest entry was evicted.
        assert!(cache.cached(Point2::new(0, 0)).is_none());
        assert!(cache.cached(Point2::new(2, 0)).is_some());
    }

    #[test]
    fn remove_discards_the_entry() {
        let cache = FieldCache::new(2);
        let terrain = FlatTerrain::new(1);
        cache.get_or_generate(Point2::new(5, 5), &terrain);
        cache.remove(Point2::new(5, 5));
        assert!(cache.is_empty());
    }
}
