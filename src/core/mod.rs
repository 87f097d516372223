// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Core functionalities of the stereo visual odometry front end.

pub mod camera;
pub mod correspondence;
pub mod features;
pub mod geometry;
pub mod ledger;
pub mod loop_closure;
pub mod pipeline;
pub mod pose_graph;
pub mod stereo;
pub mod track;
