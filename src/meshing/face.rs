//! Face orientation and the packed per-face value.

use cgmath::Vector3;

/// The six possible orientations of a voxel face.
///
/// The discriminant encodes axis and direction as `axis * 2 + positive`:
/// even values face the negative axis direction, odd values the positive
/// one. This matches the packed encoding used in mesh output, so the
/// discriminant itself is part of the interface.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum FaceSide {
    /// Facing negative X
    XNeg = 0,
    /// Facing positive X
    XPos = 1,
    /// Facing negative Y (down)
    YNeg = 2,
    /// Facing positive Y (up)
    YPos = 3,
    /// Facing negative Z
    ZNeg = 4,
    /// Facing positive Z
    ZPos = 5,
}

impl FaceSide {
    /// Returns all six face orientations.
    pub fn all() -> [FaceSide; 6] {
        [
            FaceSide::XNeg,
            FaceSide::XPos,
            FaceSide::YNeg,
            FaceSide::YPos,
            FaceSide::ZNeg,
            FaceSide::ZPos,
        ]
    }

    /// Builds a side from an axis index (0 = X, 1 = Y, 2 = Z) and direction.
    pub fn from_axis(axis: usize, positive: bool) -> FaceSide {
        match (axis, positive) {
            (0, false) => FaceSide::XNeg,
            (0, true) => FaceSide::XPos,
            (1, false) => FaceSide::YNeg,
            (1, true) => FaceSide::YPos,
            (2, false) => FaceSide::ZNeg,
            (2, true) => FaceSide::ZPos,
            _ => panic!("invalid face axis {}", axis),
        }
    }

    /// The main axis this face is perpendicular to: 0 = X, 1 = Y, 2 = Z.
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// Whether the face points in the positive axis direction.
    pub fn is_positive(self) -> bool {
        self as usize % 2 == 1
    }

    /// Unit normal of the face, in voxel space.
    pub fn normal(self) -> Vector3<i32> {
        let sign = if self.is_positive() { 1 } else { -1 };
        match self.axis() {
            0 => Vector3::new(sign, 0, 0),
            1 => Vector3::new(0, sign, 0),
            _ => Vector3::new(0, 0, sign),
        }
    }
}

/// Number of ambient-occlusion levels per face corner (2 bits).
const AO_CORNER_BITS: u32 = 2;

/// Bit-packed per-face value: material id in the low byte, four 2-bit
/// ambient-occlusion corner codes in the next byte.
///
/// The packed form travels all the way into the vertex stream, so it is kept
/// as a tagged integer with named accessors rather than being expanded into
/// a struct before emission.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FaceValue(u32);

impl FaceValue {
    /// Packs a material id and an ambient-occlusion byte.
    ///
    /// # Arguments
    /// * `material` - Non-zero voxel material id
    /// * `ao` - Four 2-bit corner codes, corner 0 in the low bits
    pub fn new(material: u8, ao: u8) -> FaceValue {
        FaceValue(material as u32 | (ao as u32) << 8)
    }

    /// Reconstructs a value from its packed representation.
    pub fn from_raw(raw: u32) -> FaceValue {
        FaceValue(raw)
    }

    /// The packed integer representation.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The voxel material id.
    pub fn material(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// All four corner codes as one byte.
    pub fn ao_byte(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// The 2-bit occlusion code of one corner.
    ///
    /// Corners are numbered counterclockwise in the face's (u, v) plane:
    /// 0 = (u0, v0), 1 = (u1, v0), 2 = (u1, v1), 3 = (u0, v1).
    pub fn ao_corner(self, corner: usize) -> u8 {
        debug_assert!(corner < 4);
        ((self.0 >> (8 + AO_CORNER_BITS * corner as u32)) & 0b11) as u8
    }
}

/// Ring order of the eight cells neighboring a face in its plane, as
/// `(du, dv)` offsets. Bit `i` of an occupancy mask refers to `AO_RING[i]`.
pub(crate) const AO_RING: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

const fn ring_bit(mask: usize, bit: usize) -> u8 {
    ((mask >> bit) & 1) as u8
}

/// Occlusion code for one corner given its two orthogonal neighbors and the
/// diagonal between them. A corner walled in by both orthogonal cells is
/// fully occluded no matter what the diagonal holds; otherwise the strength
/// is the number of occupied cells among the three.
const fn corner_code(orth_a: u8, orth_b: u8, diagonal: u8) -> u8 {
    if orth_a == 1 && orth_b == 1 {
        3
    } else {
        orth_a + orth_b + diagonal
    }
}

const fn build_ao_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut mask = 0;
    while mask < 256 {
        // Corner 0 = (-u, -v), then counterclockwise. Orthogonal neighbors
        // sit at the even ring positions around each diagonal.
        let c0 = corner_code(ring_bit(mask, 7), ring_bit(mask, 1), ring_bit(mask, 0));
        let c1 = corner_code(ring_bit(mask, 1), ring_bit(mask, 3), ring_bit(mask, 2));
        let c2 = corner_code(ring_bit(mask, 3), ring_bit(mask, 5), ring_bit(mask, 4));
        let c3 = corner_code(ring_bit(mask, 5), ring_bit(mask, 7), ring_bit(mask, 6));
        table[mask] = c0 | c1 << 2 | c2 << 4 | c3 << 6;
        mask += 1;
    }
    table
}

/// Ambient occlusion per neighbor-occupancy mask, one entry per possible
/// 8-bit ring. Indexing replaces per-face corner arithmetic in the mesher's
/// inner loop.
pub(crate) const AO_TABLE: [u8; 256] = build_ao_table();
