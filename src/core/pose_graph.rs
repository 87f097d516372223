// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contract of the global pose graph optimizer.

use crate::misc::type_aliases::Iso3;

/// Accumulates pose constraints and solves them into a consistent trajectory.
///
/// Calls are blocking, and `optimize` may take a long time.
pub trait PoseGraphOptimizer {
    /// Add a node for a new frame, with its motion relative to the previous node
    /// and its current global pose estimate.
    fn stage_node(&mut self, local: &Iso3, global: &Iso3);

    /// Add a loop closure edge between the latest node and the node `target`.
    fn stage_loop_edge(&mut self, global: &Iso3, target: usize);

    /// Solve the graph. Returns one global pose per staged node, in staging order.
    fn optimize(&mut self) -> Vec<Iso3>;
}

/// Optimizer ignoring every constraint but the staged global poses.
///
/// `optimize` returns the odometry as is, which makes it usable
/// for odometry only runs.
#[derive(Debug, Default, Clone)]
pub struct OdometryChain {
    poses: Vec<Iso3>,
    loop_edges: Vec<(usize, usize)>,
}

impl OdometryChain {
    /// An empty chain.
    pub fn new() -> OdometryChain {
        OdometryChain::default()
    }

    /// Loop edges staged so far, as `(from node, to node)` pairs.
    pub fn loop_edges(&self) -> &[(usize, usize)] {
        &self.loop_edges
    }
}

impl PoseGraphOptimizer for OdometryChain {
    fn stage_node(&mut self, _local: &Iso3, global: &Iso3) {
        self.poses.push(*global);
    }

    fn stage_loop_edge(&mut self, _global: &Iso3, target: usize) {
        let from = self.poses.len().saturating_sub(1);
        self.loop_edges.push((from, target));
    }

    fn optimize(&mut self) -> Vec<Iso3> {
        self.poses.clone()
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::Translation3;

    #[test]
    fn chain_returns_staged_poses_in_order() {
        let mut chain = OdometryChain::new();
        let a = Iso3::identity();
        let b = Iso3::from_parts(Translation3::new(0.0, 0.0, 1.0), a.rotation);
        chain.stage_node(&a, &a);
        chain.stage_node(&b, &b);
        chain.stage_loop_edge(&b, 0);
        assert_eq!(chain.optimize(), vec![a, b]);
        assert_eq!(chain.loop_edges(), &[(1, 0)]);
    }
}
