// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scripted collaborators for pipeline scenarios.
//!
//! The synthetic world is a static scene seen by a static camera:
//! left images are filled with `LEFT_FILL`, right images with `RIGHT_FILL`,
//! and the optical flow moves points by `DISPARITY` between a left and a right image only.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use stereo_vo_rs::core::geometry::{
    FlowTrack, FundamentalParams, GeometryEstimator, PnpParams, PnpSolution,
};
use stereo_vo_rs::core::loop_closure::{Detection, PlaceRecognizer};
use stereo_vo_rs::core::pose_graph::{OdometryChain, PoseGraphOptimizer};
use stereo_vo_rs::dataset::{FrameSource, Side};
use stereo_vo_rs::misc::type_aliases::{Float, Image, Iso3, Mat3, Point2, Point3, Vec3};

pub const LEFT_FILL: u8 = 10;
pub const RIGHT_FILL: u8 = 20;
pub const DISPARITY: Float = 20.0;
pub const IMG_SIZE: usize = 400;

/// Geometry of the synthetic world, with scripted PnP inlier counts.
#[derive(Default)]
pub struct SyntheticGeometry {
    /// Inlier count of successive PnP calls, `None` for all correspondences.
    pub inliers_script: RefCell<VecDeque<Option<usize>>>,
    /// Parameters of every PnP call.
    pub pnp_calls: RefCell<Vec<PnpParams>>,
}

impl SyntheticGeometry {
    pub fn with_script(script: Vec<Option<usize>>) -> SyntheticGeometry {
        SyntheticGeometry {
            inliers_script: RefCell::new(script.into_iter().collect()),
            pnp_calls: RefCell::new(Vec::new()),
        }
    }
}

impl GeometryEstimator for SyntheticGeometry {
    fn optical_flow(&self, from: &Image, to: &Image, points: &[Point2]) -> Vec<FlowTrack> {
        if from.is_empty() || to.is_empty() {
            return points
                .iter()
                .map(|&location| FlowTrack { location, valid: false })
                .collect();
        }
        let stereo = from[(0, 0)] == LEFT_FILL && to[(0, 0)] == RIGHT_FILL;
        let shift = if stereo { DISPARITY } else { 0.0 };
        points
            .iter()
            .map(|p| FlowTrack {
                location: Point2::new(p.x - shift, p.y),
                valid: true,
            })
            .collect()
    }

    fn fundamental_inliers(
        &self,
        left: &[Point2],
        _: &[Point2],
        _: &FundamentalParams,
    ) -> Vec<bool> {
        vec![true; left.len()]
    }

    fn solve_pnp(
        &self,
        points: &[Point3],
        _: &[Point2],
        _: &Mat3,
        params: &PnpParams,
    ) -> PnpSolution {
        self.pnp_calls.borrow_mut().push(*params);
        let scripted = self.inliers_script.borrow_mut().pop_front();
        let nb_inliers = match scripted {
            Some(Some(n)) => n.min(points.len()),
            _ => points.len(),
        };
        PnpSolution {
            rotation: Vec3::zeros(),
            translation: Vec3::zeros(),
            inliers: (0..nb_inliers).collect(),
        }
    }
}

/// Place recognizer answering scripted matches, keyed by query number (starting at 1).
#[derive(Default)]
pub struct ScriptedRecognizer {
    pub matches: HashMap<usize, usize>,
    pub nb_queries: usize,
}

impl ScriptedRecognizer {
    pub fn new(matches: &[(usize, usize)]) -> ScriptedRecognizer {
        ScriptedRecognizer {
            matches: matches.iter().cloned().collect(),
            nb_queries: 0,
        }
    }
}

impl PlaceRecognizer for ScriptedRecognizer {
    type Descriptors = ();

    fn describe(&mut self, _: &Image) {}

    fn detect(&mut self, _: ()) -> Detection {
        self.nb_queries += 1;
        match self.matches.get(&self.nb_queries) {
            Some(&match_index) => Detection {
                is_match: true,
                query_index: self.nb_queries,
                match_index,
            },
            None => Detection::none(self.nb_queries),
        }
    }
}

/// Odometry chain whose "optimization" moves every pose by `offset`.
pub struct ShiftingOptimizer {
    pub chain: OdometryChain,
    pub offset: Vec3,
    pub nb_optimizations: usize,
}

impl ShiftingOptimizer {
    pub fn new(offset: Vec3) -> ShiftingOptimizer {
        ShiftingOptimizer {
            chain: OdometryChain::new(),
            offset,
            nb_optimizations: 0,
        }
    }
}

impl PoseGraphOptimizer for ShiftingOptimizer {
    fn stage_node(&mut self, local: &Iso3, global: &Iso3) {
        self.chain.stage_node(local, global);
    }

    fn stage_loop_edge(&mut self, global: &Iso3, target: usize) {
        self.chain.stage_loop_edge(global, target);
    }

    fn optimize(&mut self) -> Vec<Iso3> {
        self.nb_optimizations += 1;
        let offset = self.offset;
        self.chain
            .optimize()
            .into_iter()
            .map(|mut pose| {
                pose.translation.vector += offset;
                pose
            })
            .collect()
    }
}

/// Static stereo sequence, some left frames may be missing.
#[derive(Default)]
pub struct StaticSequence {
    pub missing: HashSet<usize>,
}

impl FrameSource for StaticSequence {
    fn load(&self, side: Side, index: usize) -> Image {
        match side {
            Side::Left if self.missing.contains(&index) => Image::zeros(0, 0),
            Side::Left => Image::repeat(IMG_SIZE, IMG_SIZE, LEFT_FILL),
            Side::Right => Image::repeat(IMG_SIZE, IMG_SIZE, RIGHT_FILL),
        }
    }
}
