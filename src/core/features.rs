// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Candidate points selection for stereo triangulation.

use crate::misc::type_aliases::{Float, Image, Point2};

/// Strategy selecting the image points to triangulate in a fresh keyframe.
pub trait FeatureDetector {
    /// Candidate points of the image, in pixels.
    fn detect(&self, img: &Image) -> Vec<Point2>;
}

/// Uniform grid of points, one every `step` pixels.
/// Points closer than one grid cell to the image border are excluded.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GridSampler {
    /// Grid spacing in pixels.
    pub step: usize,
}

/// Grid spacing used by default.
pub const DEFAULT_GRID_STEP: usize = 20;

impl Default for GridSampler {
    fn default() -> Self {
        GridSampler {
            step: DEFAULT_GRID_STEP,
        }
    }
}

impl FeatureDetector for GridSampler {
    #[allow(clippy::cast_precision_loss)]
    fn detect(&self, img: &Image) -> Vec<Point2> {
        let (nb_rows, nb_cols) = img.shape();
        let step = self.step.max(1);
        let mut points = Vec::new();
        // Row major order, like the image itself.
        for y in (step..nb_rows.saturating_sub(step)).step_by(step) {
            for x in (step..nb_cols.saturating_sub(step)).step_by(step) {
                points.push(Point2::new(x as Float, y as Float));
            }
        }
        points
    }
}

// TESTS #############################################################
