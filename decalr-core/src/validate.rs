//! Corner validation for decal footprints
//!
//! A footprint is accepted only when every corner, projected along the
//! decal's forward axis, lands on the target mesh. A single miss rejects the
//! whole placement so decals never wrap off the edge of small or curved parts.
use nalgebra::Point3;

use crate::footprint::DecalFootprint;
use crate::orientation::forward_axis;
use crate::ray::Ray;
use crate::raycast::Raycaster;
use crate::scene::MeshInstance;

/// The four surface points of an accepted footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalCorners {
    points: [Point3<f32>; 4],
    footprint: DecalFootprint,
}

impl DecalCorners {
    /// Top-left, top-right, bottom-left, bottom-right
    pub fn points(&self) -> &[Point3<f32>; 4] {
        &self.points
    }

    /// The footprint these corners were validated for
    pub fn footprint(&self) -> &DecalFootprint {
        &self.footprint
    }
}

/// Instrumentation hooks for validation, e.g. to drop debug markers
pub trait ValidationObserver {
    /// Corner `index` found no surface when cast from `origin`
    fn corner_missed(&mut self, _index: usize, _origin: &Point3<f32>) {}

    /// All four corners landed
    fn corners_validated(&mut self, corners: &DecalCorners);
}

/// Collects accepted corners as marker positions
#[derive(Debug, Default)]
pub struct MarkerCollector {
    pub markers: Vec<Point3<f32>>,
}

impl ValidationObserver for MarkerCollector {
    fn corners_validated(&mut self, corners: &DecalCorners) {
        self.markers.extend_from_slice(corners.points());
    }
}

/// Project the footprint's corners onto `target`.
///
/// Rays are limited to `depth`, the length of the projection box, so every
/// accepted corner lies inside the volume the decal geometry is cut from.
pub fn compute_and_validate_corners(
    target: &MeshInstance<'_>,
    footprint: &DecalFootprint,
    mut observer: Option<&mut dyn ValidationObserver>,
) -> Option<DecalCorners> {
    let raycaster = Raycaster::new().with_far(footprint.size.depth);
    let forward = forward_axis(&footprint.orientation);

    let mut points = [Point3::origin(); 4];
    for (index, corner) in footprint.world_corners().into_iter().enumerate() {
        let ray = Ray {
            origin: corner,
            direction: forward,
        };
        match raycaster.cast_ray_against_mesh(&ray, target) {
            Some(hit) => points[index] = hit.point,
            None => {
                log::debug!("decal corner {index} at {corner:?} missed '{}'", target.node.name);
                if let Some(observer) = observer.as_deref_mut() {
                    observer.corner_missed(index, &corner);
                }
                return None;
            }
        }
    }

    let corners = DecalCorners {
        points,
        footprint: *footprint,
    };
    if let Some(observer) = observer {
        observer.corners_validated(&corners);
    }
    Some(corners)
}

/// Validation without instrumentation
pub fn validate_corners(target: &MeshInstance<'_>, footprint: &DecalFootprint) -> Option<DecalCorners> {
    compute_and_validate_corners(target, footprint, None)
}
