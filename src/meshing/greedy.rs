//! Greedy meshing over a voxel field.
//!
//! The mesher walks the field one axis at a time. For every pair of
//! axis-adjacent cell layers it builds a 2D mask of visible face boundaries
//! (one cell solid, the other empty), then merges identical mask cells into
//! the largest possible rectangles before emitting them. Identical here is
//! bit-for-bit: material, all four ambient-occlusion corners, and facing
//! direction must match, so merged quads never smear shading across a
//! lighting discontinuity.

use crate::voxels::{VoxelField, CHUNK_DIMENSION, CHUNK_HEIGHT};

use super::face::{FaceSide, FaceValue, AO_RING, AO_TABLE};

/// Upper bound on a merged face's extent along either plane axis, in cells.
///
/// Face extents are stored in fixed-width bit fields downstream, so this is
/// a packing bound rather than a correctness one: longer runs simply split.
pub const MAX_MERGE: usize = 32;

/// One merged rectangular face produced by the mesher.
///
/// `u0..u1` and `v0..v1` are half-open cell ranges in the face's plane;
/// `layer` is the face plane's coordinate along the main axis. The mapping
/// of (u, v, layer) onto world axes depends on `side.axis()`: X faces use
/// (u, v) = (Z, Y), Y faces (X, Z), Z faces (X, Y).
#[derive(Clone, Copy, Debug)]
pub struct FaceRect {
    /// Inclusive start of the face along the plane's first axis.
    pub u0: u32,
    /// Inclusive start of the face along the plane's second axis.
    pub v0: u32,
    /// Exclusive end of the face along the plane's first axis.
    pub u1: u32,
    /// Exclusive end of the face along the plane's second axis.
    pub v1: u32,
    /// Face plane coordinate along the main axis.
    pub layer: u32,
    /// Orientation of the face.
    pub side: FaceSide,
    /// Packed material and ambient-occlusion value.
    pub value: FaceValue,
}

impl FaceRect {
    /// Face extent along the plane's first axis, in cells.
    pub fn width(&self) -> u32 {
        self.u1 - self.u0
    }

    /// Face extent along the plane's second axis, in cells.
    pub fn height(&self) -> u32 {
        self.v1 - self.v0
    }
}

/// Greedy mesher entry point.
pub struct GreedyMesher;

impl GreedyMesher {
    /// Meshes a voxel field, invoking `emit` once per merged face.
    ///
    /// # Arguments
    /// * `field` - The voxel content to mesh, margins included
    /// * `emit` - Callback receiving every merged face
    ///
    /// # Returns
    /// The number of faces emitted.
    ///
    /// A field with no occupied cells emits nothing; otherwise each of the
    /// three axis passes is limited to the field's occupied Y range, so a
    /// mostly-empty chunk costs little.
    pub fn mesh<F: FnMut(FaceRect)>(field: &VoxelField, mut emit: F) -> usize {
        let Some((y_min, y_max)) = field.occupied_range() else {
            return 0;
        };

        let mut faces = 0;
        for axis in 0..3 {
            faces += mesh_axis(field, axis, y_min, y_max, &mut emit);
        }
        faces
    }
}

/// Maps plane coordinates back to field coordinates for a given main axis.
#[inline]
fn cell(axis: usize, main: i32, u: i32, v: i32) -> (i32, i32, i32) {
    match axis {
        0 => (main, v, u),
        1 => (u, main, v),
        _ => (u, v, main),
    }
}

/// Builds the mask value for one visible face boundary: material in the low
/// byte, the ambient-occlusion byte above it, sampled from the ring of eight
/// cells around the face on its empty side.
fn mask_value(field: &VoxelField, axis: usize, empty_main: i32, u: i32, v: i32, material: u8) -> i32 {
    let mut ring = 0usize;
    for (bit, (du, dv)) in AO_RING.iter().enumerate() {
        let (x, y, z) = cell(axis, empty_main, u + du, v + dv);
        if field.is_solid(x, y, z) {
            ring |= 1 << bit;
        }
    }
    material as i32 | (AO_TABLE[ring] as i32) << 8
}

fn mesh_axis<F: FnMut(FaceRect)>(
    field: &VoxelField,
    axis: usize,
    y_min: i32,
    y_max: i32,
    emit: &mut F,
) -> usize {
    let n_main = if axis == 1 { CHUNK_HEIGHT } else { CHUNK_DIMENSION } as i32;
    let (nu, nv) = match axis {
        0 => (CHUNK_DIMENSION as i32, CHUNK_HEIGHT as i32),
        1 => (CHUNK_DIMENSION as i32, CHUNK_DIMENSION as i32),
        _ => (CHUNK_DIMENSION as i32, CHUNK_HEIGHT as i32),
    };

    // Y is the main axis of pass 1 and the v axis of the other two; in both
    // cases the occupied Y range bounds the work.
    let (s_lo, s_hi, v_lo, v_hi) = if axis == 1 {
        ((y_min - 1).max(-1), y_max.min(n_main - 1), 0, nv - 1)
    } else {
        (-1, n_main - 1, y_min.max(0), y_max.min(nv - 1))
    };
    if s_lo > s_hi || v_lo > v_hi {
        return 0;
    }

    let mut mask = vec![0i32; (nu * nv) as usize];
    let mut faces = 0;

    for s in s_lo..=s_hi {
        // Mask generation: a cell is non-zero exactly when the two
        // main-axis-adjacent cells differ in occupancy. The sign records
        // which of the two was solid. Faces whose solid cell lies in the
        // margin belong to a neighboring chunk and are skipped.
        for v in v_lo..=v_hi {
            for u in 0..nu {
                let (ax, ay, az) = cell(axis, s, u, v);
                let (bx, by, bz) = cell(axis, s + 1, u, v);
                let a_solid = field.is_solid(ax, ay, az);
                let b_solid = field.is_solid(bx, by, bz);

                mask[(v * nu + u) as usize] = if a_solid == b_solid {
                    0
                } else if a_solid {
                    if s < 0 {
                        0
                    } else {
                        mask_value(field, axis, s + 1, u, v, field.get(ax, ay, az))
                    }
                } else if s + 1 >= n_main {
                    0
                } else {
                    -mask_value(field, axis, s, u, v, field.get(bx, by, bz))
                };
            }
        }

        // Merge: extend a run rightwards while the mask repeats exactly,
        // then extend the run's height a full row at a time. Every consumed
        // cell is zeroed so the mask is clean for the next slice.
        for v0 in v_lo..=v_hi {
            let mut u0 = 0;
            while u0 < nu {
                let value = mask[(v0 * nu + u0) as usize];
                if value == 0 {
                    u0 += 1;
                    continue;
                }

                let mut width = 1;
                while u0 + width < nu
                    && (width as usize) < MAX_MERGE
                    && mask[(v0 * nu + u0 + width) as usize] == value
                {
                    width += 1;
                }

                let mut height = 1;
                'expand: while v0 + height <= v_hi && (height as usize) < MAX_MERGE {
                    for du in 0..width {
                        if mask[((v0 + height) * nu + u0 + du) as usize] != value {
                            break 'expand;
                        }
                    }
                    height += 1;
                }

                for dv in 0..height {
                    for du in 0..width {
                        mask[((v0 + dv) * nu + u0 + du) as usize] = 0;
                    }
                }

                emit(FaceRect {
                    u0: u0 as u32,
                    v0: v0 as u32,
                    u1: (u0 + width) as u32,
                    v1: (v0 + height) as u32,
                    layer: (s + 1) as u32,
                    side: FaceSide::from_axis(axis, value > 0),
                    value: FaceValue::from_raw(value.unsigned_abs()),
                });
                faces += 1;
                u0 += width;
            }
        }
    }

    faces
}
