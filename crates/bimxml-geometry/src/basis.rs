// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-triangle planar UV bases

use crate::{Point3, Vector3};

/// Below this squared cross-product length a triangle has no usable plane
const AREA_EPSILON: f64 = 1e-12;

/// Triangle normal, inverted relative to the point winding
///
/// BIM XML lists corners clockwise when seen from outside, so the
/// outward normal is `-(B - A) x (C - A)`. Returns `None` for zero-area
/// triangles.
#[inline]
pub fn triangle_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Vector3<f64>> {
    let cross = (b - a).cross(&(c - a));
    if cross.norm_squared() < AREA_EPSILON {
        return None;
    }
    Some(-cross.normalize())
}

/// Orthonormal (u, v, normal) frame of one triangle's plane
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanarBasis {
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl PlanarBasis {
    /// Build a basis in the plane orthogonal to `normal`
    ///
    /// The u axis is the world axis least parallel to the normal, projected
    /// into the plane, so the projection never degenerates.
    pub fn from_normal(normal: Vector3<f64>) -> Self {
        let abs = normal.abs();
        let axis = if abs.x <= abs.y && abs.x <= abs.z {
            Vector3::x()
        } else if abs.y <= abs.z {
            Vector3::y()
        } else {
            Vector3::z()
        };

        let u = (axis - normal * normal.dot(&axis)).normalize();
        let v = u.cross(&normal);
        Self { u, v, normal }
    }

    /// Basis of the triangle ABC, `None` if it has zero area
    pub fn of_triangle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        triangle_normal(a, b, c).map(Self::from_normal)
    }

    /// UV of `point`, given that `anchor` sits at `origin`
    #[inline]
    pub fn project(&self, origin: [f64; 2], anchor: &Point3<f64>, point: &Point3<f64>) -> [f64; 2] {
        let d = point - anchor;
        [origin[0] + d.dot(&self.u), origin[1] + d.dot(&self.v)]
    }

    /// Tangent along u with bitangent sign -1
    #[inline]
    pub fn tangent(&self) -> [f32; 4] {
        [self.u.x as f32, self.u.y as f32, self.u.z as f32, -1.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_is_inverted() {
        let n = triangle_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(n, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_zero_area() {
        let n = triangle_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
        );
        assert!(n.is_none());
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for normal in [
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(1.0, 2.0, 3.0).normalize(),
        ] {
            let basis = PlanarBasis::from_normal(normal);
            assert_relative_eq!(basis.u.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(basis.v.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(basis.u.dot(&basis.v), 0.0, epsilon = 1e-12);
            assert_relative_eq!(basis.u.dot(&normal), 0.0, epsilon = 1e-12);
            assert_relative_eq!(basis.v.dot(&normal), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_projection_in_xy_plane() {
        let basis = PlanarBasis::from_normal(Vector3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(basis.u, Vector3::x());
        assert_relative_eq!(basis.v, Vector3::y());

        let uv = basis.project(
            [0.5, 0.5],
            &Point3::new(1.0, 1.0, 0.0),
            &Point3::new(2.0, 3.0, 0.0),
        );
        assert_relative_eq!(uv[0], 1.5);
        assert_relative_eq!(uv[1], 2.5);
        assert_eq!(basis.tangent(), [1.0, 0.0, 0.0, -1.0]);
    }
}
