// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Temporal gating of place recognition results.
//!
//! A place recognizer readily matches a frame with its immediate predecessors,
//! and keeps matching the same place for many consecutive frames.
//! The gate only accepts matches far enough in the past,
//! and at most one closure per cooldown window.

use log::info;

use crate::misc::type_aliases::Image;

/// Answer of the place recognizer for one query frame.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Detection {
    /// Whether a previously seen place matched.
    pub is_match: bool,
    /// Index of the query in the recognizer database.
    pub query_index: usize,
    /// Index of the matched entry in the recognizer database.
    pub match_index: usize,
}

impl Detection {
    /// Answer with no match.
    pub fn none(query_index: usize) -> Detection {
        Detection {
            is_match: false,
            query_index,
            match_index: 0,
        }
    }
}

/// Incremental place recognition engine (typically a bag of visual words database).
pub trait PlaceRecognizer {
    /// Descriptors of an image, as understood by the recognizer.
    type Descriptors;

    /// Compute the descriptors of an image.
    fn describe(&mut self, img: &Image) -> Self::Descriptors;

    /// Query the database with the descriptors of a new frame, then add it to the database.
    fn detect(&mut self, descriptors: Self::Descriptors) -> Detection;
}

/// Configuration of the loop closure gate.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Config {
    /// A match is accepted only if `query_index - match_index` is strictly above this gap.
    pub min_index_gap: usize,
    /// Number of processed frames during which new detections are ignored
    /// after an accepted closure.
    pub cooldown_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_index_gap: 100,
            cooldown_frames: 200,
        }
    }
}

/// Loop closure bookkeeping of the gate.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct State {
    /// A closure was accepted this frame and not yet consumed.
    pub pending: bool,
    /// Ledger index of the matched frame of the last accepted closure.
    pub matched_index: usize,
    /// Remaining frames before a new closure can be accepted.
    pub cooldown: usize,
}

/// Place recognizer wrapped with index gap and cooldown checks.
pub struct LoopClosureGate<R> {
    recognizer: R,
    config: Config,
    state: State,
}

impl<R: PlaceRecognizer> LoopClosureGate<R> {
    /// Wrap a place recognizer.
    pub fn new(recognizer: R, config: Config) -> LoopClosureGate<R> {
        LoopClosureGate {
            recognizer,
            config,
            state: State::default(),
        }
    }

    /// Query the recognizer with the current frame.
    ///
    /// Returns the ledger index of the matched frame if a closure is accepted.
    pub fn check(&mut self, img: &Image, frame_index: usize) -> Option<usize> {
        let descriptors = self.recognizer.describe(img);
        let detection = self.recognizer.detect(descriptors);
        self.accept(detection, frame_index)
    }

    /// Apply the gating rules to a detection.
    pub fn accept(&mut self, detection: Detection, frame_index: usize) -> Option<usize> {
        let gap = detection
            .query_index
            .saturating_sub(detection.match_index);
        if detection.is_match && gap > self.config.min_index_gap && self.state.cooldown == 0 {
            info!(
                "Found loop closure between {} and {}",
                frame_index, detection.match_index
            );
            self.state = State {
                pending: true,
                // Recognizer entries are one ahead of the ledger history.
                matched_index: detection.match_index.saturating_sub(1),
                cooldown: self.config.cooldown_frames,
            };
            Some(self.state.matched_index)
        } else {
            None
        }
    }

    /// End of frame bookkeeping: run down the cooldown and consume the pending closure.
    pub fn end_frame(&mut self) {
        self.state.cooldown = self.state.cooldown.saturating_sub(1);
        self.state.pending = false;
    }

    /// Current gate state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The wrapped recognizer.
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }
} // impl LoopClosureGate

// TESTS #############################################################
