// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::{GrayImage, Rgb, RgbImage};

use crate::misc::type_aliases::Image;

/// Convert a `GrayImage` into an `u8` matrix (rows = height).
pub fn matrix_from_image(img: GrayImage) -> Image {
    let (width, height) = img.dimensions();
    Image::from_row_slice(height as usize, width as usize, &img.into_raw())
}

/// Convert an `u8` matrix into a gray looking `RgbImage`, to draw colors on top of it.
///
/// Performs a transposition to accomodate for the
/// column major matrix into the row major image.
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_from_matrix(mat: &Image) -> RgbImage {
    let (nb_rows, nb_cols) = mat.shape();
    let mut img_buf = RgbImage::new(nb_cols as u32, nb_rows as u32);
    for (x, y, pixel) in img_buf.enumerate_pixels_mut() {
        let i = mat[(y as usize, x as usize)];
        *pixel = Rgb([i, i, i]);
    }
    img_buf
}

// TESTS #############################################################
