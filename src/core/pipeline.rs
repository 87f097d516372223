// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per frame control loop of the visual odometry front end.
//!
//! Each frame goes through the same states:
//! track, detect loop closure, estimate pose (with one relaxed retry),
//! stage in the pose graph (and optimize on loop closure),
//! decide whether to relocalize, then bookkeeping.
//! A sequence ends when frames are exhausted, tracking is lost,
//! or the observer asks to stop. In every case, `finish` runs a last
//! global optimization and reconciles the ledger with it.

use log::{info, warn};
use std::ops::Range;

use crate::core::camera::StereoCamera;
use crate::core::correspondence::{self, Correspondence};
use crate::core::features::{FeatureDetector, GridSampler, DEFAULT_GRID_STEP};
use crate::core::geometry::{FundamentalParams, GeometryEstimator, PnpParams, PnpSolution};
use crate::core::ledger::KeyframeLedger;
use crate::core::loop_closure::{self, LoopClosureGate, PlaceRecognizer};
use crate::core::pose_graph::PoseGraphOptimizer;
use crate::core::stereo::StereoTriangulator;
use crate::core::track::{self, Tracked};
use crate::dataset::{FrameSource, Side};
use crate::error::{Error, Result};
use crate::math::rigid;
use crate::misc::type_aliases::{Image, Iso3, Mat3, Point3, Vec3};

/// PnP parameters of the first attempt and of the relaxed retry.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PnpSchedule {
    /// Parameters of the first attempt.
    pub primary: PnpParams,
    /// Parameters of the retry, when the first attempt kept too few inliers.
    pub relaxed: PnpParams,
}

impl Default for PnpSchedule {
    fn default() -> Self {
        PnpSchedule {
            primary: PnpParams {
                iterations: 100,
                reprojection_threshold: 1.0,
                confidence: 0.99,
            },
            relaxed: PnpParams {
                iterations: 100,
                reprojection_threshold: 8.0,
                confidence: 0.98,
            },
        }
    }
}

/// Attempt of the pose estimation.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Attempt {
    /// First attempt, strict thresholds.
    Primary,
    /// Retry with relaxed thresholds.
    Relaxed,
}

impl Attempt {
    /// Parameters of this attempt.
    pub fn params(self, schedule: &PnpSchedule) -> &PnpParams {
        match self {
            Attempt::Primary => &schedule.primary,
            Attempt::Relaxed => &schedule.relaxed,
        }
    }

    /// Attempt to make after this one failed, if any.
    pub fn retry(self) -> Option<Attempt> {
        match self {
            Attempt::Primary => Some(Attempt::Relaxed),
            Attempt::Relaxed => None,
        }
    }
}

/// Configuration of the pipeline.
pub struct Config {
    /// Stereo rig of the sequence.
    pub camera: StereoCamera,
    /// Spacing of the grid of points triangulated in keyframes.
    pub grid_step: usize,
    /// Outlier rejection of stereo matches.
    pub fundamental: FundamentalParams,
    /// Pose estimation attempts.
    pub pnp: PnpSchedule,
    /// Minimum number of tracked correspondences to attempt a pose estimation.
    pub min_tracked: usize,
    /// Minimum number of PnP inliers to accept a pose.
    pub min_inliers: usize,
    /// Below this number of PnP inliers, the frame becomes a relocalization keyframe.
    pub keyframe_inliers: usize,
    /// Loop closure gating.
    pub loop_closure: loop_closure::Config,
}

impl Config {
    /// Default configuration for a stereo camera.
    pub fn with_camera(camera: StereoCamera) -> Config {
        Config {
            camera,
            grid_step: DEFAULT_GRID_STEP,
            fundamental: FundamentalParams::default(),
            pnp: PnpSchedule::default(),
            min_tracked: 10,
            min_inliers: 10,
            keyframe_inliers: 200,
            loop_closure: loop_closure::Config::default(),
        }
    }

    /// Initialize a pipeline with the first stereo pair of the sequence.
    pub fn init<G, R, O>(
        self,
        geometry: G,
        recognizer: R,
        optimizer: O,
        stereo_pair: (Image, &Image),
    ) -> Pipeline<G, R, O>
    where
        G: GeometryEstimator,
        R: PlaceRecognizer,
        O: PoseGraphOptimizer,
    {
        let detector = GridSampler {
            step: self.grid_step,
        };
        self.init_with_detector(detector, geometry, recognizer, optimizer, stereo_pair)
    }

    /// Same as `init` with another candidate points detector for keyframes.
    pub fn init_with_detector<G, R, O, D>(
        self,
        detector: D,
        geometry: G,
        recognizer: R,
        mut optimizer: O,
        stereo_pair: (Image, &Image),
    ) -> Pipeline<G, R, O, D>
    where
        G: GeometryEstimator,
        R: PlaceRecognizer,
        O: PoseGraphOptimizer,
        D: FeatureDetector,
    {
        let triangulator = StereoTriangulator {
            camera: self.camera.clone(),
            detector,
            fundamental: self.fundamental,
        };
        let (left, right) = stereo_pair;

        // The first frame defines the world frame.
        let mut ledger = KeyframeLedger::new();
        let reference = ledger.relocalize(
            &geometry,
            &triangulator,
            0,
            (&left, right),
            Mat3::identity(),
            Vec3::zeros(),
        );
        let origin = Iso3::identity();
        optimizer.stage_node(&origin, &origin);

        Pipeline {
            gate: LoopClosureGate::new(recognizer, self.loop_closure),
            config: self,
            geometry,
            optimizer,
            triangulator,
            ledger,
            state: State {
                reference_img: left,
                reference,
            },
        }
    }
} // impl Config

/// Visual odometry pipeline.
/// Can only be constructed by initialization from a `Config`.
pub struct Pipeline<G, R, O, D = GridSampler> {
    config: Config,
    geometry: G,
    gate: LoopClosureGate<R>,
    optimizer: O,
    triangulator: StereoTriangulator<D>,
    ledger: KeyframeLedger,
    state: State,
}

/// Tracking reference carried from one frame to the next.
struct State {
    reference_img: Image,
    reference: Vec<Correspondence>,
}

/// What happened to one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Frame index.
    pub index: usize,
    /// Estimated global pose (optimized translation on loop closure).
    pub pose: Iso3,
    /// Number of PnP inliers of the accepted pose.
    pub inliers: usize,
    /// Attempt that produced the pose.
    pub attempt: Attempt,
    /// The frame was re-triangulated.
    pub retrack: bool,
    /// Ledger index matched by an accepted loop closure.
    pub loop_closure: Option<usize>,
    /// Correspondences tracked from the previous frame.
    pub tracked: Tracked,
}

/// Returned by an observer to let the sequence go on or stop it.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Continue {
    /// Stop processing frames.
    Stop,
    /// Process the next frame.
    Forward,
}

/// Called after every processed frame, typically to display progress.
/// This is also where a user can abort the sequence.
pub trait Observer {
    /// Inspect the frame that was just processed.
    fn frame(&mut self, report: &FrameReport, ledger: &KeyframeLedger) -> Continue;
}

impl Observer for () {
    fn frame(&mut self, _: &FrameReport, _: &KeyframeLedger) -> Continue {
        Continue::Forward
    }
}

/// Reason why a sequence stopped.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Termination {
    /// All frames of the range were processed.
    Exhausted,
    /// Tracking was lost at this frame, which was not processed.
    TrackingLost { frame: usize },
    /// The observer stopped the sequence after this frame.
    Aborted { frame: usize },
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Why the run stopped.
    pub termination: Termination,
    /// Number of keyframes in the ledger, the initial frame included.
    pub nb_keyframes: usize,
    /// Reconciled map, all snapshots concatenated.
    pub map: Vec<Point3>,
}

impl<G, R, O, D> Pipeline<G, R, O, D>
where
    G: GeometryEstimator,
    R: PlaceRecognizer,
    O: PoseGraphOptimizer,
    D: FeatureDetector,
{
    /// Process the frames of `frames` in order, then finish the sequence.
    ///
    /// Tracking loss ends the sequence without error,
    /// partial results are still optimized and reconciled.
    pub fn run<S, B>(
        &mut self,
        source: &S,
        frames: Range<usize>,
        observer: &mut B,
    ) -> Result<Summary>
    where
        S: FrameSource,
        B: Observer,
    {
        let mut termination = Termination::Exhausted;
        for index in frames {
            match self.process(source, index) {
                Ok(report) => {
                    if observer.frame(&report, &self.ledger) == Continue::Stop {
                        info!("Sequence aborted after frame {}", index);
                        termination = Termination::Aborted { frame: index };
                        break;
                    }
                }
                Err(ref err) if err.is_tracking_loss() => {
                    warn!("{}", err);
                    termination = Termination::TrackingLost { frame: index };
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        let map = self.finish()?;
        Ok(Summary {
            termination,
            nb_keyframes: self.ledger.len(),
            map,
        })
    }

    /// Process one frame.
    ///
    /// On tracking loss, an error is returned and neither the ledger
    /// nor the pose graph are modified.
    pub fn process<S: FrameSource>(&mut self, source: &S, index: usize) -> Result<FrameReport> {
        let current_img = source.load(Side::Left, index);

        // Track the reference correspondences into the current frame.
        let tracked = track::track(
            &self.geometry,
            &self.state.reference_img,
            &current_img,
            &self.state.reference,
        );

        // Check for a place revisit.
        let loop_closure = self.gate.check(&current_img, index);

        // Estimate the camera pose.
        if tracked.len() < self.config.min_tracked {
            return Err(Error::InsufficientCorrespondences {
                frame: index,
                tracked: tracked.len(),
            });
        }
        let (solution, attempt) = self.estimate_pose(index, &tracked)?;
        let inliers = solution.inliers.len();
        let (rotation, mut translation) =
            rigid::camera_pose_from_pnp(&solution.rotation, &solution.translation);

        // Stage in the pose graph, and optimize right away on loop closure.
        let pose = rigid::isometry(&rotation, &translation);
        self.optimizer.stage_node(&pose, &pose);
        let optimized = loop_closure.map(|target| {
            self.optimizer.stage_loop_edge(&pose, target);
            let trajectory = self.optimizer.optimize();
            if let Some(latest) = trajectory.last() {
                translation = latest.translation.vector;
            }
            trajectory
        });

        // Keyframe decision.
        let retrack = inliers < self.config.keyframe_inliers || loop_closure.is_some();
        if retrack {
            let right_img = source.load(Side::Right, index);
            self.state.reference = self.ledger.relocalize(
                &self.geometry,
                &self.triangulator,
                index,
                (&current_img, &right_img),
                rotation,
                translation,
            );
        } else {
            self.ledger.append(index, rotation, translation, Vec::new(), false);
            self.state.reference = tracked.correspondences.clone();
        }
        if let Some(trajectory) = optimized {
            self.ledger.reconcile(&trajectory)?;
        }

        // Bookkeeping.
        self.gate.end_frame();
        self.state.reference_img = current_img;

        Ok(FrameReport {
            index,
            pose: rigid::isometry(&rotation, &translation),
            inliers,
            attempt,
            retrack,
            loop_closure,
            tracked,
        })
    }

    /// Estimate the pose from tracked correspondences,
    /// retrying once with relaxed thresholds.
    fn estimate_pose(&self, index: usize, tracked: &Tracked) -> Result<(PnpSolution, Attempt)> {
        let (pixels, points) = correspondence::unzip(&tracked.correspondences);
        let calibration = self.config.camera.intrinsics.matrix();
        let mut attempt = Attempt::Primary;
        loop {
            let params = attempt.params(&self.config.pnp);
            let solution = self
                .geometry
                .solve_pnp(&points, &pixels, &calibration, params);
            let inliers = solution.inliers.len();
            if inliers >= self.config.min_inliers {
                return Ok((solution, attempt));
            }
            match attempt.retry() {
                Some(next) => {
                    info!(
                        "Low inlier count at {}, relaxing reprojection threshold at frame {}",
                        inliers, index
                    );
                    attempt = next;
                }
                None => return Err(Error::TrackingLost { frame: index, inliers }),
            }
        }
    }

    /// Last global optimization of the sequence, reconciled into the ledger.
    /// Returns the reconciled map.
    pub fn finish(&mut self) -> Result<Vec<Point3>> {
        let trajectory = self.optimizer.optimize();
        self.ledger.reconcile(&trajectory)?;
        let map = self.ledger.map_points();
        info!(
            "Sequence finished: {} keyframes, {} map points",
            self.ledger.len(),
            map.len()
        );
        Ok(map)
    }

    /// History of keyframes, trajectory and map.
    pub fn ledger(&self) -> &KeyframeLedger {
        &self.ledger
    }

    /// Loop closure gate state.
    pub fn loop_closure_state(&self) -> loop_closure::State {
        self.gate.state()
    }

    /// The geometry estimator.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// The pose graph optimizer.
    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Correspondences to track in the next frame.
    pub fn reference(&self) -> &[Correspondence] {
        &self.state.reference
    }
} // impl Pipeline

// TESTS #############################################################
