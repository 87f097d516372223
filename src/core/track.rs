// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame to frame tracking of a 2D/3D correspondence set with optical flow.
//!
//! Tracking is a pure filter: only points the optical flow reports as valid
//! survive, each one moved to its location in the current frame.
//! No epipolar filtering happens here, fundamental matrix RANSAC is only
//! applied to fresh stereo matches (see `core::stereo`).

use itertools::izip;

use crate::core::correspondence::{self, Correspondence};
use crate::core::geometry::GeometryEstimator;
use crate::misc::type_aliases::{Image, Point2};

/// Correspondences surviving optical flow tracking into the current frame.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Tracked {
    /// 3D points paired with their tracked location in the current frame.
    pub correspondences: Vec<Correspondence>,
    /// Locations in the previous frame of the surviving points.
    /// Only kept for display of the flow.
    pub previous_pixels: Vec<Point2>,
}

impl Tracked {
    /// Number of surviving correspondences.
    pub fn len(&self) -> usize {
        self.correspondences.len()
    }

    /// True if nothing survived tracking.
    pub fn is_empty(&self) -> bool {
        self.correspondences.is_empty()
    }
}

/// Track the `previous` correspondences from `previous_img` into `current_img`.
///
/// The optical flow is computed once over all previous image points.
pub fn track<G: GeometryEstimator>(
    geometry: &G,
    previous_img: &Image,
    current_img: &Image,
    previous: &[Correspondence],
) -> Tracked {
    if previous.is_empty() {
        return Tracked::default();
    }
    let (pixels, _) = correspondence::unzip(previous);
    let flow = geometry.optical_flow(previous_img, current_img, &pixels);
    let mut tracked = Tracked::default();
    for (c, f) in izip!(previous, &flow) {
        if f.valid {
            tracked
                .correspondences
                .push(Correspondence::new(f.location, c.point));
            tracked.previous_pixels.push(c.pixel);
        }
    }
    tracked
}

// TESTS #############################################################
