// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Access to stereo sequences.

pub mod kitti;

use crate::misc::type_aliases::Image;

/// Camera of a stereo rig.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Side {
    /// Reference camera, the one being tracked.
    Left,
    /// Second camera, only used for triangulation.
    Right,
}

/// Indexed access to the frames of a stereo sequence.
pub trait FrameSource {
    /// Load the image of one camera at a given frame index.
    /// A frame that cannot be read is reported as an empty image.
    fn load(&self, side: Side, index: usize) -> Image;
}
