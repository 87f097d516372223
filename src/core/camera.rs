// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rectified stereo camera model.

use crate::misc::type_aliases::{Float, Mat3, Mat34, Point2, Point3};

/// Intrinsic parameters of a pinhole camera.
#[derive(PartialEq, Debug, Clone)]
pub struct Intrinsics {
    /// Principal point (cx, cy) in pixels.
    pub principal_point: (Float, Float),
    /// Focal lengths (fx, fy) in pixels.
    pub focal: (Float, Float),
    /// Skew coefficient, zero for most cameras.
    pub skew: Float,
}

impl Intrinsics {
    /// The 3x3 calibration matrix K.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3 {
        let (fx, fy) = self.focal;
        let (cx, cy) = self.principal_point;
        Mat3::new(
            fx,  self.skew, cx,
            0.0, fy,        cy,
            0.0, 0.0,       1.0,
        )
    }

    /// Project a 3D point expressed in the camera frame onto the image.
    pub fn project(&self, point: &Point3) -> Point2 {
        let (fx, fy) = self.focal;
        let (cx, cy) = self.principal_point;
        let x = point.x / point.z;
        let y = point.y / point.z;
        Point2::new(fx * x + self.skew * y + cx, fy * y + cy)
    }
}

/// A rectified stereo pair: two identical cameras,
/// the right one shifted by `baseline` along the X axis of the left one.
/// Loaded once at startup and never mutated.
#[derive(PartialEq, Debug, Clone)]
pub struct StereoCamera {
    /// Intrinsics shared by both cameras.
    pub intrinsics: Intrinsics,
    /// Distance between the two optical centers (meters).
    pub baseline: Float,
}

impl StereoCamera {
    /// Canonical projection matrices of the left and right cameras,
    /// `K [I | 0]` and `K [I | (-baseline, 0, 0)]`.
    pub fn projections(&self) -> (Mat34, Mat34) {
        let k = self.intrinsics.matrix();
        let left = Mat34::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        );
        let mut right = left;
        right[(0, 3)] = -self.baseline;
        (k * left, k * right)
    }

    /// Project a point of the left camera frame in both images.
    pub fn project_stereo(&self, point: &Point3) -> (Point2, Point2) {
        let right_point = Point3::new(point.x - self.baseline, point.y, point.z);
        (
            self.intrinsics.project(point),
            self.intrinsics.project(&right_point),
        )
    }
}

// TESTS #############################################################
