//! Packing of merged faces into GPU-ready vertices and indices.

use bytemuck::{Pod, Zeroable};
use cgmath::Point2;

use crate::voxels::CHUNK_DIMENSION;

use super::greedy::FaceRect;

/// One mesh vertex: a world-space cell-corner position and the packed face
/// value the shader unpacks into material, occlusion, corner and side.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshVertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// [`FaceValue`](super::FaceValue) bits in the low half, the corner index
    /// at bits 16..18, the [`FaceSide`](super::FaceSide) discriminant at bits
    /// 18..21.
    pub value: u32,
}

/// Byte size of one face's four vertices in a vertex buffer.
pub const VERTEX_BYTES_PER_FACE: u64 = (4 * std::mem::size_of::<MeshVertex>()) as u64;

/// Byte size of one face's six indices in a 32-bit index buffer.
pub const INDEX_BYTES_PER_FACE: u64 = (6 * std::mem::size_of::<u32>()) as u64;

/// Bit offset of the corner index within [`MeshVertex::value`].
const CORNER_SHIFT: u32 = 16;

/// Bit offset of the face side within [`MeshVertex::value`].
const SIDE_SHIFT: u32 = 18;

/// Builds the four vertices of a merged face, in corner order `(u0, v0)`,
/// `(u1, v0)`, `(u1, v1)`, `(u0, v1)`.
///
/// # Arguments
/// * `chunk_coord` - Chunk grid coordinate, used to offset X and Z into
///   world space
/// * `face` - The merged face to expand
pub fn face_vertices(chunk_coord: Point2<i32>, face: &FaceRect) -> [MeshVertex; 4] {
    let corners = [
        (face.u0, face.v0),
        (face.u1, face.v0),
        (face.u1, face.v1),
        (face.u0, face.v1),
    ];

    let side_bits = (face.side as u32) << SIDE_SHIFT;
    let mut vertices = [MeshVertex::zeroed(); 4];
    for (corner, &(u, v)) in corners.iter().enumerate() {
        let (x, y, z) = match face.side.axis() {
            0 => (face.layer, v, u),
            1 => (u, face.layer, v),
            _ => (u, v, face.layer),
        };
        vertices[corner] = MeshVertex {
            x: x as i32 + chunk_coord.x * CHUNK_DIMENSION as i32,
            y: y as i32,
            z: z as i32 + chunk_coord.y * CHUNK_DIMENSION as i32,
            value: face.value.raw() | (corner as u32) << CORNER_SHIFT | side_bits,
        };
    }
    vertices
}

/// Builds the six indices of the `face_slot`-th face in a buffer, two
/// counterclockwise triangles over that face's four vertices.
pub fn face_indices(face_slot: u32) -> [u32; 6] {
    let base = face_slot * 4;
    [base, base + 1, base + 2, base, base + 2, base + 3]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::{FaceSide, FaceValue};

    fn sample_face(side: FaceSide) -> FaceRect {
        FaceRect {
            u0: 1,
            v0: 2,
            u1: 4,
            v1: 3,
            layer: 5,
            side,
            value: FaceValue::new(2, 0b01_00_00_11),
        }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 16);
        assert_eq!(VERTEX_BYTES_PER_FACE, 64);
        assert_eq!(INDEX_BYTES_PER_FACE, 24);
    }

    #[test]
    fn top_face_lies_in_its_layer_plane() {
        let vertices = face_vertices(Point2::new(0, 0), &sample_face(FaceSide::YPos));
        for vertex in &vertices {
            assert_eq!(vertex.y, 5);
        }
        assert_eq!((vertices[0].x, vertices[0].z), (1, 2));
        assert_eq!((vertices[2].x, vertices[2].z), (4, 3));
    }

    #[test]
    fn chunk_coordinate_offsets_x_and_z_only() {
        let face = sample_face(FaceSide::XNeg);
        let origin = face_vertices(Point2::new(0, 0), &face);
        let moved = face_vertices(Point2::new(2, -1), &face);
        for (a, b) in origin.iter().zip(moved.iter()) {
            assert_eq!(b.x - a.x, 2 * CHUNK_DIMENSION as i32);
            assert_eq!(b.z - a.z, -(CHUNK_DIMENSION as i32));
            assert_eq!(b.y, a.y);
            assert_eq!(b.value, a.value);
        }
    }

    #[test]
    fn value_bits_carry_face_corner_and_side() {
        let face = sample_face(FaceSide::ZPos);
        let vertices = face_vertices(Point2::new(0, 0), &face);
        for (corner, vertex) in vertices.iter().enumerate() {
            assert_eq!(vertex.value & 0xFFFF, face.value.raw());
            assert_eq!((vertex.value >> 16) & 0b11, corner as u32);
            assert_eq!(vertex.value >> 18, FaceSide::ZPos as u32);
        }
    }

    #[test]
    fn indices_form_two_triangles_per_slot() {
        assert_eq!(face_indices(0), [0, 1, 2, 0, 2, 3]);
        assert_eq!(face_indices(3), [12, 13, 14, 12, 14, 15]);
    }
}
