// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rigid body motions as rotation matrix and translation pairs.
//!
//! Keyframes keep their pose as an explicit `(R, t)` pair,
//! the pose graph works with isometries. This module converts between both
//! and applies poses to point clouds.

use nalgebra::{Rotation3, Translation3, UnitQuaternion};

use crate::misc::type_aliases::{Iso3, Mat3, Point3, Vec3};

/// Pose of the camera in the world from a PnP solution.
///
/// PnP gives the world to camera motion `(rvec, tvec)`,
/// the camera pose is its inverse: `R = exp(rvec)^T` and `t = -R * tvec`.
pub fn camera_pose_from_pnp(rvec: &Vec3, tvec: &Vec3) -> (Mat3, Vec3) {
    let rotation = Rotation3::new(*rvec).matrix().transpose();
    let translation = -(rotation * tvec);
    (rotation, translation)
}

/// Apply the rigid motion `p' = R * p + t` to every point.
pub fn transform_points(rotation: &Mat3, translation: &Vec3, points: &[Point3]) -> Vec<Point3> {
    points
        .iter()
        .map(|p| Point3::from(rotation * p.coords + translation))
        .collect()
}

/// Isometry of an `(R, t)` pair.
/// `R` is expected to be a rotation matrix, it is not re-orthonormalized.
pub fn isometry(rotation: &Mat3, translation: &Vec3) -> Iso3 {
    let rotation =
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
    Iso3::from_parts(Translation3::from(*translation), rotation)
}

/// Rotation matrix of an isometry.
pub fn rotation_matrix(iso: &Iso3) -> Mat3 {
    *iso.rotation.to_rotation_matrix().matrix()
}

// TESTS #############################################################
