// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contract of the computer vision primitives used by the front end.
//!
//! Optical flow, fundamental matrix RANSAC and PnP RANSAC are provided
//! by an external vision library through the `GeometryEstimator` trait.
//! Only linear triangulation has a default implementation here.

use crate::misc::type_aliases::{Float, Image, Mat3, Mat34, Mat4, Point2, Point3, Vec3, Vec4};

/// Result of tracking one point with optical flow.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct FlowTrack {
    /// Tracked location in the destination image.
    pub location: Point2,
    /// Whether the tracker found the point.
    pub valid: bool,
}

/// Parameters of the fundamental matrix RANSAC filter.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct FundamentalParams {
    /// Maximum distance (pixels) to the epipolar line of an inlier.
    pub threshold: Float,
    /// RANSAC confidence.
    pub confidence: Float,
}

impl Default for FundamentalParams {
    fn default() -> Self {
        FundamentalParams {
            threshold: 3.0,
            confidence: 0.99,
        }
    }
}

/// Parameters of one PnP RANSAC attempt.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PnpParams {
    /// Number of RANSAC iterations.
    pub iterations: usize,
    /// Maximum reprojection error (pixels) of an inlier.
    pub reprojection_threshold: Float,
    /// RANSAC confidence.
    pub confidence: Float,
}

/// Pose returned by the PnP solver.
///
/// As usual for PnP, `rotation` (axis-angle vector) and `translation`
/// map world points into the camera frame.
#[derive(PartialEq, Debug, Clone)]
pub struct PnpSolution {
    /// Rotation vector, axis times angle.
    pub rotation: Vec3,
    /// Translation vector.
    pub translation: Vec3,
    /// Indices of the correspondences consistent with the pose.
    pub inliers: Vec<usize>,
}

impl PnpSolution {
    /// A solution with no inlier, for solvers that failed to find any pose.
    pub fn failed() -> PnpSolution {
        PnpSolution {
            rotation: Vec3::zeros(),
            translation: Vec3::zeros(),
            inliers: Vec::new(),
        }
    }
}

/// Stateless geometric estimators required by the tracking front end.
pub trait GeometryEstimator {
    /// Track `points` from image `from` into image `to`.
    /// Must return exactly one `FlowTrack` per input point, in order.
    fn optical_flow(&self, from: &Image, to: &Image, points: &[Point2]) -> Vec<FlowTrack>;

    /// Inlier mask of the fundamental matrix RANSAC estimated between the matches
    /// `left[i] <-> right[i]`. Must return one flag per match.
    fn fundamental_inliers(
        &self,
        left: &[Point2],
        right: &[Point2],
        params: &FundamentalParams,
    ) -> Vec<bool>;

    /// Solve the camera pose from 3D-2D correspondences with RANSAC.
    fn solve_pnp(
        &self,
        points: &[Point3],
        pixels: &[Point2],
        calibration: &Mat3,
        params: &PnpParams,
    ) -> PnpSolution;

    /// Triangulate the matches `left[i] <-> right[i]` seen by the two projection matrices.
    /// Returns homogeneous points, one per match.
    fn triangulate(
        &self,
        proj_left: &Mat34,
        proj_right: &Mat34,
        left: &[Point2],
        right: &[Point2],
    ) -> Vec<Vec4> {
        left.iter()
            .zip(right.iter())
            .map(|(l, r)| triangulate_linear(proj_left, proj_right, l, r))
            .collect()
    }
}

/// Linear (DLT) triangulation of a single match.
///
/// The homogeneous point is the right singular vector associated with
/// the smallest singular value of the stacked constraints.
pub fn triangulate_linear(
    proj_left: &Mat34,
    proj_right: &Mat34,
    left: &Point2,
    right: &Point2,
) -> Vec4 {
    let mut a = Mat4::zeros();
    a.set_row(0, &(left.x * proj_left.row(2) - proj_left.row(0)));
    a.set_row(1, &(left.y * proj_left.row(2) - proj_left.row(1)));
    a.set_row(2, &(right.x * proj_right.row(2) - proj_right.row(0)));
    a.set_row(3, &(right.y * proj_right.row(2) - proj_right.row(1)));
    let svd = a.svd(false, true);
    match svd.v_t {
        Some(v_t) => {
            let mut smallest = 0;
            for i in 1..4 {
                if svd.singular_values[i] < svd.singular_values[smallest] {
                    smallest = i;
                }
            }
            v_t.row(smallest).transpose()
        }
        None => Vec4::zeros(),
    }
}

/// Normalize a homogeneous point by its fourth coordinate.
/// Coordinates are not finite for a point at infinity.
pub fn from_homogeneous(h: &Vec4) -> Point3 {
    Point3::new(h.x / h.w, h.y / h.w, h.z / h.w)
}

// TESTS #############################################################
