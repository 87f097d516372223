// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rendering of trajectories, maps and feature tracks into images.

use image::{Rgb, RgbImage};
use std::path::Path;

use crate::core::ledger::KeyframeLedger;
use crate::core::pipeline::{Continue, FrameReport, Observer};
use crate::error::Result;
use crate::misc::interop;
use crate::misc::type_aliases::{Float, Image, Point2, Point3};

/// Height of the trajectory canvas.
pub const CANVAS_ROWS: u32 = 1000;
/// Width of the trajectory canvas.
pub const CANVAS_COLS: u32 = 1500;
/// Canvas column of the world origin.
const X_BIAS: Float = 750.0;
/// Canvas row of the world origin.
const Z_BIAS: Float = 200.0;

/// Scale applied to map points published for display.
pub const MAP_DISPLAY_SCALE: Float = 0.1;

const ESTIMATE: Rgb<u8> = Rgb { data: [255, 0, 0] };
const OPTIMIZED: Rgb<u8> = Rgb { data: [0, 0, 255] };
const GROUND_TRUTH: Rgb<u8> = Rgb { data: [0, 255, 0] };
const MAP: Rgb<u8> = Rgb { data: [200, 200, 200] };
const TRACK: Rgb<u8> = Rgb { data: [0, 255, 0] };

/// Top view (X, Z plane) of the camera trajectory and of the map.
pub struct TrajectoryCanvas {
    img: RgbImage,
    ground_truth: Vec<Point3>,
}

impl TrajectoryCanvas {
    /// Blank canvas. Ground truth positions are optional, indexed by frame.
    pub fn new(ground_truth: Vec<Point3>) -> TrajectoryCanvas {
        TrajectoryCanvas {
            img: RgbImage::new(CANVAS_COLS, CANVAS_ROWS),
            ground_truth,
        }
    }

    /// Draw a camera position.
    pub fn draw_position(&mut self, position: &Point3, color: Rgb<u8>) {
        let (u, v) = canvas_coordinates(position);
        for dv in -1..=1 {
            for du in -1..=1 {
                self.put(u + du, v + dv, color);
            }
        }
    }

    /// Draw one every ten map points.
    pub fn draw_map(&mut self, points: &[Point3]) {
        for p in points.iter().step_by(10) {
            let (u, v) = canvas_coordinates(p);
            self.put(u, v, MAP);
        }
    }

    /// Clear the canvas and draw the reconciled map and trajectory of a ledger.
    /// Ground truth is looked up by the frame index of each keyframe.
    pub fn redraw(&mut self, ledger: &KeyframeLedger) {
        self.img = RgbImage::new(CANVAS_COLS, CANVAS_ROWS);
        for snapshot in ledger.map_history() {
            self.draw_map(snapshot);
        }
        let ground_truth = std::mem::replace(&mut self.ground_truth, Vec::new());
        for (kf, pose) in ledger.keyframes().iter().zip(ledger.trajectory()) {
            if let Some(gt) = ground_truth.get(kf.index) {
                self.draw_position(gt, GROUND_TRUTH);
            }
            self.draw_position(&Point3::from(pose.translation.vector), OPTIMIZED);
        }
        self.ground_truth = ground_truth;
    }

    /// Rendered canvas.
    pub fn image(&self) -> &RgbImage {
        &self.img
    }

    /// Write the canvas to an image file.
    pub fn save<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        self.img.save(file_path)?;
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn put(&mut self, u: i64, v: i64, color: Rgb<u8>) {
        if u >= 0 && v >= 0 && u < i64::from(CANVAS_COLS) && v < i64::from(CANVAS_ROWS) {
            self.img.put_pixel(u as u32, v as u32, color);
        }
    }
} // impl TrajectoryCanvas

impl Observer for TrajectoryCanvas {
    fn frame(&mut self, report: &FrameReport, ledger: &KeyframeLedger) -> Continue {
        if let Some(gt) = self.ground_truth.get(report.index).cloned() {
            self.draw_position(&gt, GROUND_TRUTH);
        }
        self.draw_position(&Point3::from(report.pose.translation.vector), ESTIMATE);
        if report.index % 10 == 0 {
            if let Some(snapshot) = ledger.map_history().last() {
                self.draw_map(snapshot);
            }
        }
        Continue::Forward
    }
}

#[allow(clippy::cast_possible_truncation)]
fn canvas_coordinates(p: &Point3) -> (i64, i64) {
    ((p.x + X_BIAS) as i64, (p.z + Z_BIAS) as i64)
}

/// Map points as published for display: scaled, Z up.
pub fn display_cloud(points: &[Point3], scale: Float) -> Vec<Point3> {
    points
        .iter()
        .map(|p| Point3::new(p.x * scale, p.z * scale, -p.y * scale))
        .collect()
}

/// Draw the motion of tracked points over the current frame.
/// Segments start at `from` (red) and end at `to` (blue).
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn tracks_on_image(img: &Image, from: &[Point2], to: &[Point2]) -> RgbImage {
    let mut rgb = interop::rgb_from_matrix(img);
    let (width, height) = rgb.dimensions();
    let mut put = |p: Point2, color: Rgb<u8>| {
        if p.x >= 0.0 && p.y >= 0.0 && (p.x as u32) < width && (p.y as u32) < height {
            rgb.put_pixel(p.x as u32, p.y as u32, color);
        }
    };
    for (a, b) in from.iter().zip(to.iter()) {
        let nb_steps = (b - a).norm().ceil().max(1.0) as usize;
        for i in 0..=nb_steps {
            let s = i as Float / nb_steps as Float;
            put(a + (b - a) * s, TRACK);
        }
        put(*a, ESTIMATE);
        put(*b, OPTIMIZED);
    }
    rgb
}

// TESTS #############################################################
