//! View frustum extraction and box intersection tests.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Vector4};

/// A plane in `normal . p + d >= 0` half-space form.
#[derive(Clone, Copy, Debug)]
struct Plane {
    normal: Vector3<f32>,
    d: f32,
}

impl Plane {
    fn from_vector(v: Vector4<f32>) -> Self {
        let normal = v.truncate();
        let magnitude = normal.magnitude();
        if magnitude > 0.0 {
            Plane {
                normal: normal / magnitude,
                d: v.w / magnitude,
            }
        } else {
            Plane { normal, d: v.w }
        }
    }
}

/// The six clipping planes of a camera, extracted from its combined
/// view-projection matrix. Used to prioritize streaming towards chunks the
/// camera can actually see.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the six planes from a view-projection matrix by summing and
    /// differencing the matrix rows against the fourth row.
    pub fn from_matrix(m: Matrix4<f32>) -> Self {
        let row = |i: usize| Vector4::new(m[0][i], m[1][i], m[2][i], m[3][i]);
        let planes = [
            row(3) + row(0), // left
            row(3) - row(0), // right
            row(3) + row(1), // bottom
            row(3) - row(1), // top
            row(3) + row(2), // near
            row(3) - row(2), // far
        ]
        .map(Plane::from_vector);
        Frustum { planes }
    }

    /// A frustum that classifies every box as visible. Useful when no camera
    /// exists yet or culling is disabled.
    pub fn everything() -> Self {
        Frustum {
            planes: [Plane {
                normal: Vector3::new(0.0, 0.0, 0.0),
                d: 1.0,
            }; 6],
        }
    }

    /// Whether an axis-aligned box touches the frustum volume.
    ///
    /// Tests each plane against the box corner furthest along the plane
    /// normal; conservative in the usual way (a box outside the volume but
    /// inside all six half-spaces still reports true).
    pub fn intersects_aabb(&self, min: Point3<f32>, max: Point3<f32>) -> bool {
        for plane in &self.planes {
            let far_corner = Vector3::new(
                if plane.normal.x >= 0.0 { max.x } else { min.x },
                if plane.normal.y >= 0.0 { max.y } else { min.y },
                if plane.normal.z >= 0.0 { max.z } else { min.z },
            );
            if plane.normal.dot(far_corner) + plane.d < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{perspective, Deg};

    fn looking_down_negative_z() -> Frustum {
        let projection = perspective(Deg(90.0), 1.0, 0.1, 100.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        Frustum::from_matrix(projection * view)
    }

    #[test]
    fn everything_accepts_any_box() {
        let frustum = Frustum::everything();
        assert!(frustum.intersects_aabb(
            Point3::new(-1e6, -1e6, -1e6),
            Point3::new(1e6, 1e6, 1e6),
        ));
    }

    #[test]
    fn box_in_front_of_camera_is_visible() {
        let frustum = looking_down_negative_z();
        assert!(frustum.intersects_aabb(Point3::new(-1.0, -1.0, -10.0), Point3::new(1.0, 1.0, -5.0)));
    }

    #[test]
    fn box_behind_camera_is_culled() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.intersects_aabb(Point3::new(-1.0, -1.0, 5.0), Point3::new(1.0, 1.0, 10.0)));
    }

    #[test]
    fn box_past_the_far_plane_is_culled() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.intersects_aabb(
            Point3::new(-1.0, -1.0, -300.0),
            Point3::new(1.0, 1.0, -200.0),
        ));
    }
}
