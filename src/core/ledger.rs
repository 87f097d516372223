// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! History of keyframes, trajectory and map snapshots.
//!
//! The ledger keeps three histories consistent:
//!
//! * one keyframe per processed frame,
//! * the trajectory returned by the last global optimization,
//!   one pose per keyframe at that time,
//! * one map snapshot per keyframe created by a stereo relocalization,
//!   in the same order as those keyframes.
//!
//! The trajectory is only ever replaced as a whole by `reconcile`.
//! Global optimization may revise any past pose,
//! so `reconcile` also rebuilds the map from each keyframe local point cloud,
//! instead of patching previously transformed points.

use log::{debug, info};

use crate::core::correspondence::Correspondence;
use crate::core::features::FeatureDetector;
use crate::core::geometry::GeometryEstimator;
use crate::core::stereo::StereoTriangulator;
use crate::error::{Error, Result};
use crate::math::rigid;
use crate::misc::type_aliases::{Image, Iso3, Mat3, Point3, Vec3};

/// A processed frame retained in history.
#[derive(PartialEq, Debug, Clone)]
pub struct Keyframe {
    /// Index of the frame in the sequence.
    pub index: usize,
    /// Camera orientation in the world.
    pub rotation: Mat3,
    /// Camera position in the world, overwritten by reconciliation.
    pub translation: Vec3,
    /// Points triangulated in this keyframe, in its local camera frame.
    /// Empty unless `retrack` is set.
    pub points3d: Vec<Point3>,
    /// This frame triggered a fresh stereo triangulation.
    pub retrack: bool,
}

/// Owner of the keyframe, trajectory and map histories.
#[derive(Debug, Default)]
pub struct KeyframeLedger {
    keyframes: Vec<Keyframe>,
    trajectory: Vec<Iso3>,
    map_history: Vec<Vec<Point3>>,
}

impl KeyframeLedger {
    /// An empty ledger.
    pub fn new() -> KeyframeLedger {
        KeyframeLedger::default()
    }

    /// Append the keyframe of frame `index`.
    ///
    /// For a retrack keyframe, `local_points` are brought to the world frame
    /// and recorded as a new map snapshot.
    pub fn append(
        &mut self,
        index: usize,
        rotation: Mat3,
        translation: Vec3,
        local_points: Vec<Point3>,
        retrack: bool,
    ) {
        if retrack {
            self.map_history
                .push(rigid::transform_points(&rotation, &translation, &local_points));
        }
        self.keyframes.push(Keyframe {
            index,
            rotation,
            translation,
            points3d: if retrack { local_points } else { Vec::new() },
            retrack,
        });
    }

    /// Triangulate a fresh correspondence set for frame `index`
    /// and append it as a retrack keyframe.
    ///
    /// Returns the new correspondences, with their 3D points in the world frame,
    /// to be used as the tracking reference of the next frame.
    pub fn relocalize<G, D>(
        &mut self,
        geometry: &G,
        triangulator: &StereoTriangulator<D>,
        index: usize,
        stereo_pair: (&Image, &Image),
        rotation: Mat3,
        translation: Vec3,
    ) -> Vec<Correspondence>
    where
        G: GeometryEstimator,
        D: FeatureDetector,
    {
        let (left, right) = stereo_pair;
        let local = triangulator.triangulate(geometry, left, right);
        let local_points: Vec<Point3> = local.iter().map(|c| c.point).collect();
        let world_points = rigid::transform_points(&rotation, &translation, &local_points);
        let reference = local
            .iter()
            .zip(world_points.into_iter())
            .map(|(c, point)| Correspondence::new(c.pixel, point))
            .collect();
        info!(
            "Keyframe at frame {}: {} points triangulated",
            index,
            local_points.len()
        );
        self.append(index, rotation, translation, local_points, true);
        reference
    }

    /// Replace the trajectory by an optimized one and rebuild the map from it.
    ///
    /// Each retrack keyframe keeps its own rotation and takes the optimized translation;
    /// its local point cloud is transformed again from scratch.
    pub fn reconcile(&mut self, optimized: &[Iso3]) -> Result<()> {
        if optimized.len() != self.keyframes.len() {
            return Err(Error::TrajectoryMismatch {
                expected: self.keyframes.len(),
                got: optimized.len(),
            });
        }
        self.trajectory = optimized.to_vec();
        self.map_history.clear();
        for (kf, pose) in self.keyframes.iter_mut().zip(optimized.iter()) {
            kf.translation = pose.translation.vector;
            if kf.retrack {
                let points = rigid::transform_points(&kf.rotation, &kf.translation, &kf.points3d);
                self.map_history.push(points);
            }
        }
        debug!(
            "Reconciled trajectory of {} poses, {} map snapshots",
            self.trajectory.len(),
            self.map_history.len()
        );
        Ok(())
    }

    /// All keyframes, in processing order.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Trajectory of the last global optimization.
    /// Keyframes appended since then have no pose in it yet.
    pub fn trajectory(&self) -> &[Iso3] {
        &self.trajectory
    }

    /// Map snapshot of each retrack keyframe.
    pub fn map_history(&self) -> &[Vec<Point3>] {
        &self.map_history
    }

    /// Number of keyframes.
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// True before the first keyframe.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Pose of the latest keyframe.
    pub fn current_pose(&self) -> Option<Iso3> {
        self.keyframes
            .last()
            .map(|kf| rigid::isometry(&kf.rotation, &kf.translation))
    }

    /// Current pose of every keyframe, optimized or not.
    pub fn poses(&self) -> Vec<Iso3> {
        self.keyframes
            .iter()
            .map(|kf| rigid::isometry(&kf.rotation, &kf.translation))
            .collect()
    }

    /// Whole map, all snapshots concatenated.
    pub fn map_points(&self) -> Vec<Point3> {
        self.map_history.iter().flatten().cloned().collect()
    }
} // impl KeyframeLedger

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{Rotation3, Translation3, UnitQuaternion};
    use quickcheck_macros;

    fn local_cloud(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32, 1.0, 10.0)).collect()
    }

    fn ledger_with(retracks: &[bool]) -> KeyframeLedger {
        let mut ledger = KeyframeLedger::new();
        for (i, &retrack) in retracks.iter().enumerate() {
            let t = Vec3::new(i as f32, 0.0, 0.0);
            ledger.append(i, Mat3::identity(), t, local_cloud(3), retrack);
        }
        ledger
    }

    fn shifted(ledger: &KeyframeLedger, dz: f32) -> Vec<Iso3> {
        ledger
            .poses()
            .iter()
            .map(|pose| Translation3::new(0.0, 0.0, dz) * *pose)
            .collect()
    }

    fn translation(ledger: &KeyframeLedger) -> Option<Vec3> {
        ledger.current_pose().map(|pose| pose.translation.vector)
    }

    #[test]
    fn append_records_map_snapshot_of_retrack_keyframes() {
        let ledger = ledger_with(&[true, false, false, true]);
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.map_history().len(), 2);
        assert_eq!(ledger.keyframes()[3].index, 3);
        assert!(ledger.keyframes()[1].points3d.is_empty());
        // Second snapshot is the cloud of keyframe 3, moved by its translation.
        assert_eq!(ledger.map_history()[1][0], Point3::new(3.0, 1.0, 10.0));
    }

    #[test]
    fn reconcile_uses_own_rotation_and_optimized_translation() {
        let mut ledger = KeyframeLedger::new();
        let rotation = *Rotation3::from_axis_angle(&Vec3::y_axis(), 0.5).matrix();
        ledger.append(0, rotation, Vec3::zeros(), local_cloud(2), true);
        let optimized = vec![Iso3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::identity(),
        )];
        ledger.reconcile(&optimized).unwrap();
        assert_eq!(ledger.keyframes()[0].translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ledger.keyframes()[0].rotation, rotation);
        let expected =
            rigid::transform_points(&rotation, &Vec3::new(1.0, 2.0, 3.0), &local_cloud(2));
        assert_eq!(ledger.map_history()[0], expected);
        assert_eq!(ledger.trajectory(), optimized.as_slice());
    }

    #[test]
    fn reconcile_rejects_trajectory_of_wrong_length() {
        let mut ledger = ledger_with(&[true, false]);
        let optimized = vec![Iso3::identity()];
        match ledger.reconcile(&optimized) {
            Err(Error::TrajectoryMismatch { expected: 2, got: 1 }) => (),
            other => panic!("unexpected reconcile result: {:?}", other),
        }
        assert_eq!(ledger.map_history().len(), 1);
    }

    #[test]
    fn keyframes_keep_their_frame_index() {
        let mut ledger = KeyframeLedger::new();
        ledger.append(0, Mat3::identity(), Vec3::zeros(), local_cloud(2), true);
        ledger.append(5, Mat3::identity(), Vec3::zeros(), Vec::new(), false);
        ledger.append(6, Mat3::identity(), Vec3::zeros(), Vec::new(), false);
        let indices: Vec<usize> = ledger.keyframes().iter().map(|kf| kf.index).collect();
        assert_eq!(indices, vec![0, 5, 6]);
    }

    #[test]
    fn trajectory_only_changes_on_reconcile() {
        let mut ledger = ledger_with(&[true, false]);
        assert!(ledger.trajectory().is_empty());
        assert_eq!(translation(&ledger), Some(Vec3::new(1.0, 0.0, 0.0)));

        let optimized = shifted(&ledger, 1.0);
        ledger.reconcile(&optimized).unwrap();
        let (t2, t3) = (Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));
        ledger.append(2, Mat3::identity(), t2, Vec::new(), false);
        ledger.append(3, Mat3::identity(), t3, local_cloud(1), true);
        assert_eq!(ledger.trajectory(), optimized.as_slice());
        assert_eq!(ledger.poses().len(), 4);
        assert_eq!(translation(&ledger), Some(Vec3::new(3.0, 0.0, 0.0)));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn reconcile_keeps_histories_consistent(retracks: Vec<bool>, dz: f32) -> bool {
        let mut ledger = ledger_with(&retracks);
        let optimized = shifted(&ledger, dz);
        let nb_retrack = retracks.iter().filter(|&&r| r).count();
        ledger.trajectory().is_empty()
            && ledger.reconcile(&optimized).is_ok()
            && ledger.trajectory().len() == ledger.keyframes().len()
            && ledger.map_history().len() == nb_retrack
    }

    #[quickcheck_macros::quickcheck]
    fn reconcile_is_idempotent(retracks: Vec<bool>, dz: f32) -> bool {
        let mut ledger = ledger_with(&retracks);
        let optimized = shifted(&ledger, dz);
        if ledger.reconcile(&optimized).is_err() {
            return false;
        }
        let trajectory = ledger.trajectory().to_vec();
        let map = ledger.map_history().to_vec();
        ledger.reconcile(&optimized).is_ok()
            && ledger.trajectory() == trajectory.as_slice()
            && ledger.map_history() == map.as_slice()
    }
}
