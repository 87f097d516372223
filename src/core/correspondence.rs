// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Paired 2D/3D observations.
//!
//! An image point and the 3D point it observes are kept in a single record,
//! so every filtering step drops or keeps both of them together.

use crate::misc::type_aliases::{Point2, Point3};

/// An image point paired with the 3D point it observes.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Correspondence {
    /// Location in the image (pixels).
    pub pixel: Point2,
    /// Associated 3D point.
    pub point: Point3,
}

impl Correspondence {
    /// Pair a pixel with a 3D point.
    pub fn new(pixel: Point2, point: Point3) -> Correspondence {
        Correspondence { pixel, point }
    }
}

/// Split a set of correspondences into its image points and 3D points,
/// index aligned, as expected by the pose solver.
pub fn unzip(correspondences: &[Correspondence]) -> (Vec<Point2>, Vec<Point3>) {
    correspondences.iter().map(|c| (c.pixel, c.point)).unzip()
}

/// Keep only the elements whose mask value is true.
/// Elements past the end of the mask are dropped.
pub fn retain_masked<T: Copy>(items: &[T], mask: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(mask.iter())
        .filter(|(_, &keep)| keep)
        .map(|(&item, _)| item)
        .collect()
}

// TESTS #############################################################
