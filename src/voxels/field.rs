//! Dense voxel storage for one chunk plus its overlap margin.

use cgmath::Point2;

use super::terrain::TerrainSource;
use super::{
    CHUNK_DIMENSION, CHUNK_HEIGHT, FIELD_DIMENSION_WRAPPED, FIELD_PLANE_SIZE_WRAPPED,
    FIELD_SIZE_WRAPPED, MATERIAL_AIR, MATERIAL_DIRT, MATERIAL_GRASS, MATERIAL_STONE,
};

/// Thickness of the dirt layer directly under the grass surface, in voxels.
const DIRT_DEPTH: i32 = 3;

/// Dense 3D voxel content of one chunk, including a one-cell margin on every
/// axis for neighbor lookups during meshing.
///
/// Coordinates passed to [`get`](VoxelField::get) and
/// [`set`](VoxelField::set) are chunk-local and margin-inclusive: `-1` up to
/// and including the chunk extent address the margin cells.
///
/// The field tracks the Y range that contains any non-empty voxel
/// (`y_min`/`y_max`) so the mesher can skip empty horizontal slabs, and a
/// count of occupied cells so completely empty fields short-circuit to a
/// zero-face mesh.
pub struct VoxelField {
    voxels: Box<[u8; FIELD_SIZE_WRAPPED]>,
    y_min: i32,
    y_max: i32,
    occupied_count: u32,
}

#[inline]
fn cell_index(x: i32, y: i32, z: i32) -> usize {
    debug_assert!(
        (-1..=CHUNK_DIMENSION as i32).contains(&x)
            && (-1..=CHUNK_HEIGHT as i32).contains(&y)
            && (-1..=CHUNK_DIMENSION as i32).contains(&z),
        "voxel coordinate ({}, {}, {}) outside margined field",
        x,
        y,
        z
    );
    (x + 1) as usize
        + FIELD_DIMENSION_WRAPPED * (z + 1) as usize
        + FIELD_PLANE_SIZE_WRAPPED * (y + 1) as usize
}

impl VoxelField {
    /// Creates a completely empty field.
    pub fn empty() -> Self {
        VoxelField {
            voxels: vec![MATERIAL_AIR; FIELD_SIZE_WRAPPED]
                .into_boxed_slice()
                .try_into()
                .unwrap(),
            y_min: i32::MAX,
            y_max: i32::MIN,
            occupied_count: 0,
        }
    }

    /// Generates the field for the chunk at `coord` from a terrain source.
    ///
    /// Samples one height column per margined X/Z cell, so margin columns
    /// reflect the neighboring chunks' content and border faces cull
    /// correctly. The bottom Y margin is filled solid wherever the column has
    /// any terrain, which suppresses downward faces at the world floor.
    ///
    /// # Arguments
    /// * `coord` - Chunk grid coordinate (X, Z)
    /// * `terrain` - Height function sampled per column
    pub fn generate(coord: Point2<i32>, terrain: &dyn TerrainSource) -> Self {
        let mut field = VoxelField::empty();
        let origin_x = coord.x * CHUNK_DIMENSION as i32;
        let origin_z = coord.y * CHUNK_DIMENSION as i32;

        for z in -1..=CHUNK_DIMENSION as i32 {
            for x in -1..=CHUNK_DIMENSION as i32 {
                let height = terrain
                    .height(origin_x + x, origin_z + z)
                    .clamp(0, CHUNK_HEIGHT as i32);
                if height == 0 {
                    continue;
                }

                field.set(x, -1, z, MATERIAL_STONE);
                for y in 0..height {
                    let material = if y == height - 1 {
                        MATERIAL_GRASS
                    } else if y >= height - 1 - DIRT_DEPTH {
                        MATERIAL_DIRT
                    } else {
                        MATERIAL_STONE
                    };
                    field.set(x, y, z, material);
                }
            }
        }

        field
    }

    /// Material at a margin-inclusive chunk-local coordinate.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> u8 {
        self.voxels[cell_index(x, y, z)]
    }

    /// Whether the cell at a margin-inclusive coordinate is occupied.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.get(x, y, z) != MATERIAL_AIR
    }

    /// Writes a material into the field, maintaining the occupied Y range and
    /// cell count.
    ///
    /// The Y range only ever widens on writes of solid material; clearing
    /// voxels leaves it conservative, which costs the mesher a few empty rows
    /// but never correctness.
    pub fn set(&mut self, x: i32, y: i32, z: i32, material: u8) {
        let index = cell_index(x, y, z);
        let previous = self.voxels[index];
        self.voxels[index] = material;

        match (previous != MATERIAL_AIR, material != MATERIAL_AIR) {
            (false, true) => self.occupied_count += 1,
            (true, false) => self.occupied_count -= 1,
            _ => {}
        }
        if material != MATERIAL_AIR {
            self.y_min = self.y_min.min(y);
            self.y_max = self.y_max.max(y);
        }
    }

    /// The Y range `(min, max)` containing every occupied cell, or `None`
    /// when the field is completely empty.
    pub fn occupied_range(&self) -> Option<(i32, i32)> {
        if self.occupied_count == 0 {
            None
        } else {
            Some((self.y_min, self.y_max))
        }
    }

    /// Number of occupied cells, margin included.
    pub fn occupied_count(&self) -> u32 {
        self.occupied_count
    }
}
