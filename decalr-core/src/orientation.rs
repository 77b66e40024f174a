//! Decal orientation from a surface point and the viewer
use nalgebra::{Matrix3, Point3, Rotation3, Unit, UnitQuaternion, Vector3};

use crate::error::{DecalError, Result};

/// Reference up vector for decal look-at frames. Points down, not +Y.
pub const DECAL_UP: Vector3<f32> = Vector3::new(0.0, -1.0, 0.0);

/// Orientation of a decal placed at `surface_point` and facing `viewer_position`.
///
/// The returned rotation maps the decal's local frame to world space. Its
/// local `-Z` axis (the forward axis) points from the surface toward the
/// viewer. `in_plane_rotation_degrees` spins the decal about that axis
/// without changing where it faces.
pub fn solve_orientation(
    surface_point: &Point3<f32>,
    viewer_position: &Point3<f32>,
    in_plane_rotation_degrees: f32,
) -> Result<UnitQuaternion<f32>> {
    let facing = look_at(surface_point, viewer_position, &DECAL_UP)?;
    let spin = UnitQuaternion::from_axis_angle(
        &Vector3::z_axis(),
        -in_plane_rotation_degrees.to_radians(),
    );
    Ok(facing * spin)
}

/// The decal's forward axis in world space
pub fn forward_axis(orientation: &UnitQuaternion<f32>) -> Unit<Vector3<f32>> {
    Unit::new_unchecked(orientation * -Vector3::z())
}

/// Rotation whose local +Z runs from `target` to `eye`.
///
/// When the view direction is parallel to `up` the direction is nudged by
/// 1e-4 so the basis stays defined.
fn look_at(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Result<UnitQuaternion<f32>> {
    let mut z = (eye - target)
        .try_normalize(f32::EPSILON)
        .ok_or(DecalError::DegenerateView)?;

    let mut x = up.cross(&z);
    if x.norm_squared() < f32::EPSILON {
        if (up.z.abs() - 1.0).abs() < f32::EPSILON {
            z.x += 1e-4;
        } else {
            z.z += 1e-4;
        }
        z.normalize_mut();
        x = up.cross(&z);
    }
    x.normalize_mut();
    let y = z.cross(&x);

    let basis = Matrix3::from_columns(&[x, y, z]);
    Ok(UnitQuaternion::from_rotation_matrix(
        &Rotation3::from_matrix_unchecked(basis),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn viewer() -> Point3<f32> {
        Point3::new(-0.07, 3.741, 4.473)
    }

    #[test]
    fn test_forward_points_at_viewer() {
        let surface = Point3::new(0.1, 0.9, 0.0);
        let q = solve_orientation(&surface, &viewer(), 0.0).unwrap();
        let expected = (viewer() - surface).normalize();
        assert_relative_eq!(forward_axis(&q).into_inner(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let surface = Point3::new(0.3, 1.2, 0.4);
        let a = solve_orientation(&surface, &viewer(), 30.0).unwrap();
        let b = solve_orientation(&surface, &viewer(), 30.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let surface = Point3::new(0.3, 1.2, 0.4);
        let zero = solve_orientation(&surface, &viewer(), 0.0).unwrap();
        let turned = solve_orientation(&surface, &viewer(), 360.0).unwrap();
        assert_relative_eq!(
            zero.to_rotation_matrix().into_inner(),
            turned.to_rotation_matrix().into_inner(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_in_plane_rotation_keeps_facing() {
        let surface = Point3::new(0.0, 1.0, 0.0);
        let zero = solve_orientation(&surface, &viewer(), 0.0).unwrap();
        let rotated = solve_orientation(&surface, &viewer(), 45.0).unwrap();
        assert_relative_eq!(
            forward_axis(&zero).into_inner(),
            forward_axis(&rotated).into_inner(),
            epsilon = 1e-5
        );
        assert_relative_eq!(zero.angle_to(&rotated), 45f32.to_radians(), epsilon = 1e-4);
    }

    #[test]
    fn test_vertical_view_is_defined() {
        let surface = Point3::new(0.0, 0.0, 0.0);
        let above = Point3::new(0.0, 5.0, 0.0);
        let q = solve_orientation(&surface, &above, 0.0).unwrap();
        assert!(q.coords.iter().all(|c| c.is_finite()));
        assert!(forward_axis(&q).y > 0.99);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(matches!(solve_orientation(&p, &p, 0.0), Err(DecalError::DegenerateView)));
    }
}
