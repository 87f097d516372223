// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors of the visual odometry front end.

use thiserror::Error;

/// Front end errors.
#[derive(Error, Debug)]
pub enum Error {
    /// PnP kept too few inliers, even with relaxed thresholds.
    #[error("Tracking lost at frame {frame}: {inliers} PnP inliers after relaxed retry")]
    TrackingLost { frame: usize, inliers: usize },

    /// Not enough correspondences survived tracking to attempt a pose estimation.
    #[error("Too few correspondences at frame {frame}: {tracked} tracked")]
    InsufficientCorrespondences { frame: usize, tracked: usize },

    /// The optimizer returned a trajectory not matching the keyframe history.
    #[error("Optimized trajectory has {got} poses for {expected} keyframes")]
    TrajectoryMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Parsing error: {0}")]
    Parse(String),
}

impl Error {
    /// Tracking failures end a sequence but keep what was computed so far.
    pub fn is_tracking_loss(&self) -> bool {
        match self {
            Error::TrackingLost { .. } | Error::InsufficientCorrespondences { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
