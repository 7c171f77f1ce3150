//! Turns per-frame hand skeletons into a smoothed rotate/zoom/explode signal.
//!
//! The right hand steers rotation from the index fingertip's offset to the frame
//! centre. The left hand zooms by pinching: the thumb–index distance relative to
//! the palm length is smoothed and compared against a dead-zone band, so a relaxed
//! pinch holds the current zoom instead of drifting.

use serde::{Deserialize, Serialize};

use crate::types::{HandSkeleton, Handedness, INDEX_TIP, MIDDLE_MCP, THUMB_TIP, WRIST};

pub const BASELINE_ZOOM: f32 = 1.2;
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 12.0;

pub const ROT_SPEED_NORMAL: f32 = 0.08;
pub const ROT_SPEED_PRECISE: f32 = 0.03;
pub const MAX_ZOOM_SPEED: f32 = 0.05;

const THRESH_OUT: f32 = 0.35;
const THRESH_IN: f32 = 0.75;
const ZOOM_IN_RANGE: f32 = 0.4;
const PINCH_SMOOTHING: f32 = 0.9;
const ZOOM_MOMENTUM: f32 = 0.85;
const MIN_HAND_SIZE: f32 = 0.1;
const VELOCITY_EPSILON: f32 = 1e-4;
const ROTATION_EXPONENT: f32 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    #[default]
    Normal,
    Precise,
}

impl Sensitivity {
    pub fn rotation_speed(&self) -> f32 {
        match self {
            Sensitivity::Normal => ROT_SPEED_NORMAL,
            Sensitivity::Precise => ROT_SPEED_PRECISE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Flip landmarks horizontally (selfie-view cameras).
    pub mirror: bool,
    pub sensitivity: Sensitivity,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            sensitivity: Sensitivity::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Live control state read by the renderer every tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureSignal {
    /// Per-frame angular velocity, not an absolute angle.
    pub rotation: Vec2,
    pub scale: f32,
    pub is_tracking: bool,
    pub is_exploding: bool,
}

impl Default for GestureSignal {
    fn default() -> Self {
        Self {
            rotation: Vec2::ZERO,
            scale: BASELINE_ZOOM,
            is_tracking: false,
            is_exploding: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    Lost,
    Tracking,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GestureTrackerState {
    pub smoothed_pinch_ratio: f32,
    pub zoom_level: f32,
    pub zoom_velocity: f32,
    pub rotation_velocity: Vec2,
    pub tracking: TrackingState,
}

impl Default for GestureTrackerState {
    fn default() -> Self {
        Self {
            smoothed_pinch_ratio: 0.5,
            zoom_level: BASELINE_ZOOM,
            zoom_velocity: 0.0,
            rotation_velocity: Vec2::ZERO,
            tracking: TrackingState::Lost,
        }
    }
}

impl GestureTrackerState {
    /// Advances the state machine by one camera frame.
    pub fn step(&mut self, config: &TrackerConfig, hands: &[HandSkeleton]) {
        if hands.is_empty() {
            self.tracking = TrackingState::Lost;
            self.rotation_velocity = Vec2::ZERO;
            self.zoom_velocity = 0.0;
            return;
        }
        self.tracking = TrackingState::Tracking;

        let mirrored: Vec<HandSkeleton>;
        let hands = if config.mirror {
            mirrored = hands.iter().map(HandSkeleton::mirrored).collect();
            mirrored.as_slice()
        } else {
            hands
        };

        self.rotation_velocity = match pick_hand(hands, Handedness::Right) {
            Some(hand) => rotation_from(hand, config.sensitivity.rotation_speed()),
            None => Vec2::ZERO,
        };

        match pick_hand(hands, Handedness::Left) {
            Some(hand) => self.update_zoom(pinch_ratio(hand)),
            None => self.zoom_velocity = 0.0,
        }
    }

    fn update_zoom(&mut self, raw_ratio: f32) {
        self.smoothed_pinch_ratio =
            PINCH_SMOOTHING * self.smoothed_pinch_ratio + (1.0 - PINCH_SMOOTHING) * raw_ratio;

        let target = zoom_target(self.smoothed_pinch_ratio);
        self.zoom_velocity = ZOOM_MOMENTUM * self.zoom_velocity + (1.0 - ZOOM_MOMENTUM) * target;
        if self.zoom_velocity.abs() < VELOCITY_EPSILON {
            self.zoom_velocity = 0.0;
        }
        self.zoom_level = (self.zoom_level + self.zoom_velocity).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn signal(&self, exploding: bool) -> GestureSignal {
        GestureSignal {
            rotation: self.rotation_velocity,
            scale: self.zoom_level,
            is_tracking: self.tracking == TrackingState::Tracking,
            is_exploding: exploding,
        }
    }
}

/// Owns the tracker state plus the externally driven explode trigger.
#[derive(Clone, Debug, Default)]
pub struct GestureTracker {
    config: TrackerConfig,
    state: GestureTrackerState,
    exploding: bool,
}

impl GestureTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: GestureTrackerState::default(),
            exploding: false,
        }
    }

    pub fn update(&mut self, hands: &[HandSkeleton]) -> GestureSignal {
        self.state.step(&self.config, hands);
        self.signal()
    }

    pub fn set_exploding(&mut self, exploding: bool) -> GestureSignal {
        self.exploding = exploding;
        self.signal()
    }

    /// Restores the baseline zoom independent of camera state.
    pub fn reset(&mut self) -> GestureSignal {
        self.state.zoom_level = BASELINE_ZOOM;
        self.state.zoom_velocity = 0.0;
        self.signal()
    }

    pub fn signal(&self) -> GestureSignal {
        self.state.signal(self.exploding)
    }

    pub fn state(&self) -> &GestureTrackerState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

fn pick_hand(hands: &[HandSkeleton], label: Handedness) -> Option<&HandSkeleton> {
    hands
        .iter()
        .filter(|h| h.handedness == label)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

fn rotation_from(hand: &HandSkeleton, speed: f32) -> Vec2 {
    let tip = hand.landmark(INDEX_TIP);
    let dx = ((tip.x - 0.5) * 2.0).clamp(-1.0, 1.0);
    let dy = ((tip.y - 0.5) * 2.0).clamp(-1.0, 1.0);
    Vec2::new(curve(dx) * speed, curve(dy) * speed)
}

fn curve(d: f32) -> f32 {
    d.signum() * d.abs().powf(ROTATION_EXPONENT)
}

fn pinch_ratio(hand: &HandSkeleton) -> f32 {
    let hand_size = hand.landmark(WRIST).distance(hand.landmark(MIDDLE_MCP));
    let pinch = hand.landmark(THUMB_TIP).distance(hand.landmark(INDEX_TIP));
    pinch / hand_size.max(MIN_HAND_SIZE)
}

fn zoom_target(ratio: f32) -> f32 {
    if ratio < THRESH_OUT {
        let t = (THRESH_OUT - ratio) / THRESH_OUT;
        -MAX_ZOOM_SPEED * t * t
    } else if ratio > THRESH_IN {
        let t = ((ratio - THRESH_IN) / ZOOM_IN_RANGE).min(1.0);
        MAX_ZOOM_SPEED * t * t
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::types::{Landmark, NUM_LANDMARKS};

    fn hand(label: Handedness, index_tip: (f32, f32), pinch_ratio: f32) -> HandSkeleton {
        let mut landmarks = [Landmark::new(0.5, 0.7, 0.0); NUM_LANDMARKS];
        landmarks[WRIST] = Landmark::new(0.5, 0.8, 0.0);
        landmarks[MIDDLE_MCP] = Landmark::new(0.5, 0.6, 0.0);
        landmarks[THUMB_TIP] = Landmark::new(index_tip.0 - pinch_ratio * 0.2, index_tip.1, 0.0);
        landmarks[INDEX_TIP] = Landmark::new(index_tip.0, index_tip.1, 0.0);
        HandSkeleton {
            landmarks,
            handedness: label,
            confidence: 0.9,
        }
    }

    fn unmirrored() -> GestureTracker {
        GestureTracker::new(TrackerConfig {
            mirror: false,
            sensitivity: Sensitivity::Normal,
        })
    }

    #[test]
    fn neutral_pinch_holds_zoom() {
        let mut tracker = unmirrored();
        let left = hand(Handedness::Left, (0.5, 0.5), 0.5);
        for _ in 0..120 {
            tracker.update(std::slice::from_ref(&left));
        }
        assert_eq!(tracker.state().zoom_velocity, 0.0);
        assert_relative_eq!(tracker.signal().scale, BASELINE_ZOOM);
    }

    #[test]
    fn inside_band_does_not_drift() {
        let mut tracker = unmirrored();
        let held = hand(Handedness::Left, (0.5, 0.5), 0.7);
        let mut last = tracker.update(std::slice::from_ref(&held)).scale;
        for _ in 0..200 {
            let scale = tracker.update(std::slice::from_ref(&held)).scale;
            assert_eq!(scale, last);
            last = scale;
        }
    }

    #[test]
    fn wide_pinch_zooms_in_with_momentum() {
        let mut tracker = unmirrored();
        let wide = hand(Handedness::Left, (0.6, 0.5), 1.2);

        let first = tracker.update(std::slice::from_ref(&wide));
        assert_eq!(first.scale, BASELINE_ZOOM);

        let mut velocities = Vec::new();
        for _ in 0..60 {
            tracker.update(std::slice::from_ref(&wide));
            velocities.push(tracker.state().zoom_velocity);
        }
        assert!(tracker.signal().scale > BASELINE_ZOOM + 1.0);
        assert!(velocities.windows(2).all(|w| w[1] >= w[0]));
        assert!(tracker.state().zoom_velocity <= MAX_ZOOM_SPEED);
    }

    #[test]
    fn tight_pinch_zooms_out_to_floor() {
        let mut tracker = unmirrored();
        let closed = hand(Handedness::Left, (0.5, 0.5), 0.0);
        for _ in 0..400 {
            tracker.update(std::slice::from_ref(&closed));
        }
        assert_eq!(tracker.signal().scale, MIN_ZOOM);
    }

    #[test]
    fn releasing_zoom_hand_stops_immediately() {
        let mut tracker = unmirrored();
        let wide = hand(Handedness::Left, (0.6, 0.5), 1.2);
        for _ in 0..30 {
            tracker.update(std::slice::from_ref(&wide));
        }
        assert!(tracker.state().zoom_velocity > 0.0);

        let right = hand(Handedness::Right, (0.5, 0.5), 0.5);
        let scale = tracker.update(std::slice::from_ref(&right)).scale;
        assert_eq!(tracker.state().zoom_velocity, 0.0);
        assert_eq!(tracker.update(std::slice::from_ref(&right)).scale, scale);
    }

    #[test]
    fn losing_hands_stops_rotation_but_keeps_zoom() {
        let mut tracker = unmirrored();
        let frame = [
            hand(Handedness::Right, (0.9, 0.2), 0.5),
            hand(Handedness::Left, (0.6, 0.5), 1.2),
        ];
        for _ in 0..40 {
            tracker.update(&frame);
        }
        let zoom = tracker.signal().scale;
        assert!(tracker.signal().is_tracking);

        let lost = tracker.update(&[]);
        assert!(!lost.is_tracking);
        assert_eq!(lost.rotation, Vec2::ZERO);
        assert_eq!(lost.scale, zoom);
        assert_eq!(tracker.state().tracking, TrackingState::Lost);
    }

    #[test]
    fn rotation_follows_power_curve() {
        let mut tracker = unmirrored();
        let signal = tracker.update(&[hand(Handedness::Right, (1.0, 0.5), 0.5)]);
        assert_relative_eq!(signal.rotation.x, ROT_SPEED_NORMAL);
        assert_relative_eq!(signal.rotation.y, 0.0);

        let signal = tracker.update(&[hand(Handedness::Right, (0.75, 0.25), 0.5)]);
        let expected = 0.5f32.powf(1.5) * ROT_SPEED_NORMAL;
        assert_relative_eq!(signal.rotation.x, expected, epsilon = 1e-6);
        assert_relative_eq!(signal.rotation.y, -expected, epsilon = 1e-6);
    }

    #[test]
    fn precise_is_slower_than_normal() {
        let right = [hand(Handedness::Right, (0.8, 0.8), 0.5)];
        let normal = unmirrored().update(&right);
        let precise = GestureTracker::new(TrackerConfig {
            mirror: false,
            sensitivity: Sensitivity::Precise,
        })
        .update(&right);
        assert!(precise.rotation.x.abs() < normal.rotation.x.abs());
    }

    #[test]
    fn mirroring_flips_horizontal_offset() {
        let mut tracker = GestureTracker::new(TrackerConfig::default());
        let signal = tracker.update(&[hand(Handedness::Right, (0.0, 0.5), 0.5)]);
        assert_relative_eq!(signal.rotation.x, ROT_SPEED_NORMAL);
    }

    #[test]
    fn zoom_hand_alone_does_not_rotate() {
        let mut tracker = unmirrored();
        tracker.update(&[hand(Handedness::Right, (1.0, 1.0), 0.5)]);
        let signal = tracker.update(&[hand(Handedness::Left, (1.0, 1.0), 0.5)]);
        assert!(signal.is_tracking);
        assert_eq!(signal.rotation, Vec2::ZERO);
    }

    #[test]
    fn most_confident_hand_takes_the_role() {
        let mut weak = hand(Handedness::Right, (0.0, 0.5), 0.5);
        weak.confidence = 0.3;
        let strong = hand(Handedness::Right, (1.0, 0.5), 0.5);
        let signal = unmirrored().update(&[weak, strong]);
        assert!(signal.rotation.x > 0.0);
    }

    #[test]
    fn degenerate_hand_size_is_floored() {
        let collapsed = HandSkeleton {
            landmarks: [Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS],
            handedness: Handedness::Left,
            confidence: 1.0,
        };
        assert_eq!(pinch_ratio(&collapsed), 0.0);

        let mut tracker = unmirrored();
        let signal = tracker.update(&[collapsed]);
        assert!(signal.scale.is_finite());
        assert!(tracker.state().smoothed_pinch_ratio.is_finite());
    }

    #[test]
    fn reset_restores_baseline_and_explode_passes_through() {
        let mut tracker = unmirrored();
        let closed = hand(Handedness::Left, (0.5, 0.5), 0.0);
        for _ in 0..50 {
            tracker.update(std::slice::from_ref(&closed));
        }
        assert!(tracker.signal().scale < BASELINE_ZOOM);

        assert!(tracker.set_exploding(true).is_exploding);
        let reset = tracker.reset();
        assert_eq!(reset.scale, BASELINE_ZOOM);
        assert_eq!(tracker.state().zoom_velocity, 0.0);
        assert!(reset.is_exploding);
        assert!(!tracker.set_exploding(false).is_exploding);
    }

    #[test]
    fn signal_serializes_camel_case() {
        let json = serde_json::to_value(GestureSignal::default()).unwrap();
        assert_eq!(json["isTracking"], false);
        assert_eq!(json["isExploding"], false);
        assert!(json["rotation"]["x"].is_number());
    }
}
