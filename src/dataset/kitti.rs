// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to handle datasets following the KITTI odometry layout.

use log::warn;
use std::path::Path;

use crate::core::camera::{Intrinsics, StereoCamera};
use crate::dataset::{FrameSource, Side};
use crate::error::{Error, Result};
use crate::math::rigid;
use crate::misc::helper::format_frame_path;
use crate::misc::interop;
use crate::misc::type_aliases::{Float, Image, Iso3, Mat34, Point3};

/// Intrinsics parameters of the gray cameras of KITTI sequences 00 to 02.
#[allow(clippy::excessive_precision)]
pub const INTRINSICS_KITTI_00: Intrinsics = Intrinsics {
    principal_point: (607.192_8, 185.215_7),
    focal: (718.856, 718.856),
    skew: 0.0,
};

/// Distance between the two gray cameras (meters).
pub const BASELINE_KITTI: Float = 0.54;

/// Stereo rig of KITTI sequences 00 to 02.
pub const CAMERA_KITTI_00: StereoCamera = StereoCamera {
    intrinsics: INTRINSICS_KITTI_00,
    baseline: BASELINE_KITTI,
};

/// Stereo sequence of image files named after their zero padded frame index.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    /// Path template of left images, such as `sequences/00/image_0/%06d.png`.
    pub left_template: String,
    /// Path template of right images.
    pub right_template: String,
}

impl ImageSequence {
    /// Sequence `seq` (such as "00") of a KITTI odometry dataset root.
    pub fn kitti<P: AsRef<Path>>(root: P, seq: &str) -> ImageSequence {
        let dir = root.as_ref().join("sequences").join(seq);
        let template = |camera: &str| {
            dir.join(camera)
                .join("%06d.png")
                .to_string_lossy()
                .into_owned()
        };
        ImageSequence {
            left_template: template("image_0"),
            right_template: template("image_1"),
        }
    }

    /// Path of the image of one camera at a given frame.
    pub fn path(&self, side: Side, index: usize) -> String {
        match side {
            Side::Left => format_frame_path(&self.left_template, index),
            Side::Right => format_frame_path(&self.right_template, index),
        }
    }
}

impl FrameSource for ImageSequence {
    fn load(&self, side: Side, index: usize) -> Image {
        let path = self.path(side, index);
        match image::open(&path) {
            Ok(img) => interop::matrix_from_image(img.to_luma()),
            Err(err) => {
                warn!("Failed to read frame {} ({}): {}", index, path, err);
                Image::zeros(0, 0)
            }
        }
    }
}

/// Read a ground truth poses file, and keep the camera positions.
pub fn read_ground_truth<P: AsRef<Path>>(file_path: P) -> Result<Vec<Point3>> {
    let content = std::fs::read_to_string(file_path)?;
    let poses = parse::poses(&content).map_err(Error::Parse)?;
    Ok(poses.iter().map(position).collect())
}

/// Camera position of a pose given as a 3x4 `[R | t]` matrix.
pub fn position(pose: &Mat34) -> Point3 {
    Point3::new(pose[(0, 3)], pose[(1, 3)], pose[(2, 3)])
}

/// Write a trajectory in the KITTI format, one pose per line.
pub fn write_trajectory<P: AsRef<Path>>(file_path: P, trajectory: &[Iso3]) -> Result<()> {
    let lines: Vec<String> = trajectory.iter().map(pose_line).collect();
    std::fs::write(file_path, lines.join("\n") + "\n")?;
    Ok(())
}

/// `r11 r12 r13 t1 r21 r22 r23 t2 r31 r32 r33 t3`
pub fn pose_line(pose: &Iso3) -> String {
    let r = rigid::rotation_matrix(pose);
    let t = pose.translation.vector;
    let rows: Vec<String> = (0..3)
        .map(|i| format!("{} {} {} {}", r[(i, 0)], r[(i, 1)], r[(i, 2)], t[i]))
        .collect();
    rows.join(" ")
}

/// Parse files of a dataset using the KITTI odometry format.
pub mod parse {
    use super::Mat34;
    use nom::{alt, anychar, do_parse, float, many0, map, named, space, tag, types::CompleteStr};

    /// Parse a poses file into a vector of 3x4 `[R | t]` matrices.
    pub fn poses(file_content: &str) -> std::result::Result<Vec<Mat34>, String> {
        let mut vec_data = Vec::new();
        for (line_nb, line) in file_content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match pose_line(CompleteStr(line.trim())) {
                Ok((_, Some(pose))) => vec_data.push(pose),
                Ok(_) => (),
                Err(_) => return Err(format!("Invalid pose at line {}", line_nb + 1)),
            }
        }
        Ok(vec_data)
    }

    // nom parsers #############################################################

    // Pose line is either a comment or 12 numbers.
    named!(pose_line<CompleteStr, Option<Mat34> >,
        alt!( map!(comment, |_| None) | map!(pose, Some) )
    );

    // Parse a comment.
    named!(comment<CompleteStr,()>,
        do_parse!( tag!("#") >> many0!(anychar) >> ())
    );

    // Parse the row major coefficients of a 3x4 matrix.
    named!(pose<CompleteStr, Mat34>,
        do_parse!(
            m11: float >> space >> m12: float >> space >>
            m13: float >> space >> m14: float >> space >>
            m21: float >> space >> m22: float >> space >>
            m23: float >> space >> m24: float >> space >>
            m31: float >> space >> m32: float >> space >>
            m33: float >> space >> m34: float >>
            (Mat34::new(m11, m12, m13, m14, m21, m22, m23, m24, m31, m32, m33, m34))
        )
    );

} // pub mod parse

// TESTS #############################################################
