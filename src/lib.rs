// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stereo visual odometry front end.
//!
//! Frames of a stereo sequence are tracked one after the other,
//! fresh 3D points are triangulated when tracking degrades,
//! loop closures are gated before reaching a pose graph optimizer,
//! and the optimized trajectory is reconciled with the keyframe history.
//!
//! Vision primitives, place recognition and pose graph optimization are
//! external collaborators, plugged in through the traits
//! `core::geometry::GeometryEstimator`, `core::loop_closure::PlaceRecognizer`
//! and `core::pose_graph::PoseGraphOptimizer`.

pub mod core;
pub mod dataset;
pub mod error;
pub mod math;
pub mod misc;
