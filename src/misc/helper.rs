// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

/// Substitute a frame index into a printf-like path template.
///
/// The first `%0Nd` (zero padded to N digits), `%Nd` or `%d` placeholder is replaced.
/// A template without placeholder is returned unchanged.
///
/// ```
/// # use stereo_vo_rs::misc::helper::format_frame_path;
/// assert_eq!(format_frame_path("seq/image_0/%06d.png", 42), "seq/image_0/000042.png");
/// ```
pub fn format_frame_path(template: &str, index: usize) -> String {
    if let Some((start, end, width)) = placeholder(template) {
        format!(
            "{}{:0width$}{}",
            &template[..start],
            index,
            &template[end..],
            width = width
        )
    } else {
        template.to_string()
    }
}

/// Locate the placeholder: byte range it covers and requested width.
fn placeholder(template: &str) -> Option<(usize, usize, usize)> {
    let bytes = template.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = template[search_from..].find('%') {
        let start = search_from + offset;
        let digits_end = bytes[start + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |p| start + 1 + p);
        if bytes.get(digits_end) == Some(&b'd') {
            let width = template[start + 1..digits_end].parse().unwrap_or(0);
            return Some((start, digits_end + 1, width));
        }
        search_from = start + 1;
    }
    None
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn zero_padded_index() {
        assert_eq!(format_frame_path("%06d.png", 7), "000007.png");
        assert_eq!(format_frame_path("a/%03d/b.png", 1234), "a/1234/b.png");
    }

    #[test]
    fn plain_and_missing_placeholder() {
        assert_eq!(format_frame_path("img_%d.png", 12), "img_12.png");
        assert_eq!(format_frame_path("100%.png", 3), "100%.png");
        assert_eq!(format_frame_path("static.png", 3), "static.png");
    }
}
