//! Terrain height sources.
//!
//! The streaming core treats terrain as an opaque, deterministic function of
//! a world-space column: same input, same height, no side effects. Anything
//! implementing [`TerrainSource`] can back the world, from procedural noise
//! to test fixtures.

use noise::{NoiseFn, Perlin};

use super::CHUNK_HEIGHT;

/// A deterministic height function over world-space columns.
///
/// Implementations must be pure: the same `(x, z)` always yields the same
/// height, because chunks are regenerated rather than persisted and fields
/// for the same coordinate may be built more than once.
pub trait TerrainSource: Send + Sync {
    /// Terrain height at the column `(x, z)`, in voxels above the world
    /// floor. Values outside `0..=CHUNK_HEIGHT` are clamped by the caller.
    fn height(&self, x: i32, z: i32) -> i32;
}

/// Scaling factor applied to world coordinates when sampling Perlin noise.
const PERLIN_SCALE_FACTOR: f64 = 0.01;

/// Rolling-hills terrain backed by Perlin noise.
pub struct PerlinTerrain {
    perlin: Perlin,
    base_height: f64,
    amplitude: f64,
}

impl PerlinTerrain {
    /// Creates a Perlin terrain with the given seed and default shape.
    pub fn new(seed: u32) -> Self {
        PerlinTerrain {
            perlin: Perlin::new(seed),
            base_height: CHUNK_HEIGHT as f64 * 0.4,
            amplitude: CHUNK_HEIGHT as f64 * 0.3,
        }
    }
}

impl TerrainSource for PerlinTerrain {
    fn height(&self, x: i32, z: i32) -> i32 {
        let sample = self.perlin.get([
            x as f64 * PERLIN_SCALE_FACTOR,
            z as f64 * PERLIN_SCALE_FACTOR,
        ]);
        (self.base_height + sample * self.amplitude).round() as i32
    }
}

/// Uniform-height terrain, useful for tests and benchmarks.
pub struct FlatTerrain {
    height: i32,
}

impl FlatTerrain {
    /// Creates a flat terrain `height` voxels tall everywhere.
    pub fn new(height: i32) -> Self {
        FlatTerrain { height }
    }
}

impl TerrainSource for FlatTerrain {
    fn height(&self, _x: i32, _z: i32) -> i32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perlin_is_deterministic() {
        let a = PerlinTerrain::new(42);
        let b = PerlinTerrain::new(42);
        for (x, z) in [(0, 0), (17, -3), (-1000, 512)] {
            assert_eq!(a.height(x, z), b.height(x, z));
        }
    }

    #[test]
    fn perlin_stays_inside_the_chunk_height() {
        let terrain = PerlinTerrain::new(7);
        for x in -64..64 {
            let h = terrain.height(x * 13, x * 29);
            assert!((0..=CHUNK_HEIGHT as i32).contains(&h));
        }
    }
}
