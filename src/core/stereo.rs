// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fresh 2D/3D correspondences from a single stereo pair.

use log::{debug, warn};

use crate::core::camera::StereoCamera;
use crate::core::correspondence::{self, Correspondence};
use crate::core::features::{FeatureDetector, GridSampler};
use crate::core::geometry::{self, FundamentalParams, GeometryEstimator};
use crate::misc::type_aliases::{Image, Point2};

/// Triangulates the points of a left image matched in the right image.
pub struct StereoTriangulator<D = GridSampler> {
    /// Stereo rig of the sequence.
    pub camera: StereoCamera,
    /// Selection of the points to triangulate.
    pub detector: D,
    /// Outlier rejection of the left/right matches.
    pub fundamental: FundamentalParams,
}

impl<D: FeatureDetector> StereoTriangulator<D> {
    /// Triangulate a stereo pair taken at the same instant.
    ///
    /// Returns left image points paired with 3D points in the left camera frame.
    /// An empty image yields an empty set.
    pub fn triangulate<G: GeometryEstimator>(
        &self,
        geometry: &G,
        left_img: &Image,
        right_img: &Image,
    ) -> Vec<Correspondence> {
        if left_img.is_empty() || right_img.is_empty() {
            warn!("Empty stereo image, nothing to triangulate");
            return Vec::new();
        }

        // Match candidates from left to right with optical flow.
        let candidates = self.detector.detect(left_img);
        let flow = geometry.optical_flow(left_img, right_img, &candidates);
        let (left, right): (Vec<Point2>, Vec<Point2>) = candidates
            .iter()
            .zip(flow.iter())
            .filter(|(_, f)| f.valid)
            .map(|(&l, f)| (l, f.location))
            .unzip();
        if left.is_empty() {
            return Vec::new();
        }

        // Reject outlier matches with the epipolar constraint.
        let mask = geometry.fundamental_inliers(&left, &right, &self.fundamental);
        let left = correspondence::retain_masked(&left, &mask);
        let right = correspondence::retain_masked(&right, &mask);

        // Triangulate the remaining matches.
        let (proj_left, proj_right) = self.camera.projections();
        let homogeneous = geometry.triangulate(&proj_left, &proj_right, &left, &right);
        debug!(
            "Stereo triangulation: {} candidates, {} matched, {} triangulated",
            candidates.len(),
            mask.len(),
            homogeneous.len()
        );
        // Points at infinity (w = 0) or from a failed decomposition are dropped.
        left.iter()
            .zip(homogeneous.iter())
            .map(|(&pixel, h)| Correspondence::new(pixel, geometry::from_homogeneous(h)))
            .filter(|c| c.point.coords.iter().all(|x| x.is_finite()))
            .collect()
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::camera::Intrinsics;
    use crate::core::geometry::{FlowTrack, PnpParams, PnpSolution};
    use crate::misc::type_aliases::{Float, Mat3, Mat34, Point3, Vec4};
    use approx;

    const DISPARITY: Float = 10.0;

    /// Constant disparity between left and right images,
    /// the epipolar filter rejects points in the left half of the image.
    struct ConstantDisparity;

    impl GeometryEstimator for ConstantDisparity {
        fn optical_flow(&self, _: &Image, _: &Image, points: &[Point2]) -> Vec<FlowTrack> {
            points
                .iter()
                .map(|p| FlowTrack {
                    location: Point2::new(p.x - DISPARITY, p.y),
                    valid: p.y < 100.0,
                })
                .collect()
        }

        fn fundamental_inliers(
            &self,
            left: &[Point2],
            _: &[Point2],
            _: &FundamentalParams,
        ) -> Vec<bool> {
            left.iter().map(|p| p.x >= 100.0).collect()
        }

        fn solve_pnp(&self, _: &[Point3], _: &[Point2], _: &Mat3, _: &PnpParams) -> PnpSolution {
            PnpSolution::failed()
        }
    }

    /// Same matches, but every other point is triangulated at infinity.
    struct HalfAtInfinity;

    impl GeometryEstimator for HalfAtInfinity {
        fn optical_flow(&self, from: &Image, to: &Image, points: &[Point2]) -> Vec<FlowTrack> {
            ConstantDisparity.optical_flow(from, to, points)
        }

        fn fundamental_inliers(
            &self,
            left: &[Point2],
            right: &[Point2],
            params: &FundamentalParams,
        ) -> Vec<bool> {
            ConstantDisparity.fundamental_inliers(left, right, params)
        }

        fn solve_pnp(&self, _: &[Point3], _: &[Point2], _: &Mat3, _: &PnpParams) -> PnpSolution {
            PnpSolution::failed()
        }

        fn triangulate(
            &self,
            proj_left: &Mat34,
            proj_right: &Mat34,
            left: &[Point2],
            right: &[Point2],
        ) -> Vec<Vec4> {
            let mut points = ConstantDisparity.triangulate(proj_left, proj_right, left, right);
            for h in points.iter_mut().step_by(2) {
                h.w = 0.0;
            }
            points
        }
    }

    fn triangulator() -> StereoTriangulator {
        StereoTriangulator {
            camera: StereoCamera {
                intrinsics: Intrinsics {
                    principal_point: (100.0, 60.0),
                    focal: (400.0, 400.0),
                    skew: 0.0,
                },
                baseline: 0.5,
            },
            detector: GridSampler { step: 20 },
            fundamental: FundamentalParams::default(),
        }
    }

    #[test]
    fn filtered_matches_are_triangulated_at_disparity_depth() {
        let img = Image::zeros(200, 200);
        let points = triangulator().triangulate(&ConstantDisparity, &img, &img);
        // Rows 20..80 survive the flow, columns 100..160 survive the epipolar filter.
        assert_eq!(points.len(), 4 * 4);
        for c in &points {
            assert!(c.pixel.x >= 100.0 && c.pixel.y < 100.0);
            // z = f * b / d
            assert!(approx::relative_eq!(c.point.z, 20.0, epsilon = 0.1));
        }
    }

    #[test]
    fn empty_image_gives_empty_set() {
        let img = Image::zeros(200, 200);
        let empty = Image::zeros(0, 0);
        assert!(triangulator().triangulate(&ConstantDisparity, &img, &empty).is_empty());
    }

    #[test]
    fn points_at_infinity_are_dropped_with_their_pixel() {
        let img = Image::zeros(200, 200);
        let all = triangulator().triangulate(&ConstantDisparity, &img, &img);
        let finite = triangulator().triangulate(&HalfAtInfinity, &img, &img);
        assert_eq!(finite.len(), all.len() / 2);
        assert!(finite
            .iter()
            .all(|c| c.point.coords.iter().all(|x| x.is_finite())));
        for (kept, c) in finite.iter().zip(all.iter().skip(1).step_by(2)) {
            assert_eq!(kept, c);
        }
    }
}
