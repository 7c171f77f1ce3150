//! Renderer-owned animation state driven by the published gesture signal.

use crate::gesture::{BASELINE_ZOOM, GestureSignal, Vec2};

#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig {
    /// Rate `k` in `1 - e^(-k·dt)`.
    pub damping: f32,
    /// Explosion units gained per second while the trigger is held.
    pub explode_rate: f32,
    /// Exponential decay rate once released.
    pub explode_decay: f32,
    pub max_explosion: f32,
    /// Gesture rotation is expressed per frame at this rate.
    pub reference_fps: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            damping: 8.0,
            explode_rate: 2.0,
            explode_decay: 3.0,
            max_explosion: 4.0,
            reference_fps: 60.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub yaw: f32,
    pub pitch: f32,
    pub rotation_velocity: Vec2,
    pub scale: f32,
    pub explosion: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            rotation_velocity: Vec2::ZERO,
            scale: BASELINE_ZOOM,
            explosion: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ViewAnimator {
    config: ViewConfig,
    state: ViewState,
}

impl ViewAnimator {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn tick(&mut self, signal: &GestureSignal, dt: f32) -> &ViewState {
        let dt = dt.max(0.0);
        let cfg = &self.config;
        let s = &mut self.state;
        let damping = 1.0 - (-cfg.damping * dt).exp();

        s.rotation_velocity.x += (signal.rotation.x - s.rotation_velocity.x) * damping;
        s.rotation_velocity.y += (signal.rotation.y - s.rotation_velocity.y) * damping;
        let frames = dt * cfg.reference_fps;
        s.yaw += s.rotation_velocity.x * frames;
        s.pitch += s.rotation_velocity.y * frames;

        s.scale += (signal.scale - s.scale) * damping;

        s.explosion = if signal.is_exploding {
            (s.explosion + cfg.explode_rate * dt).min(cfg.max_explosion)
        } else {
            s.explosion * (-cfg.explode_decay * dt).exp()
        };

        &self.state
    }

    pub fn reset(&mut self) {
        self.state = ViewState::default();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn zoomed(scale: f32) -> GestureSignal {
        GestureSignal {
            scale,
            ..GestureSignal::default()
        }
    }

    #[test]
    fn scale_damping_is_frame_rate_independent() {
        let target = zoomed(4.0);
        let mut fast = ViewAnimator::default();
        let mut slow = ViewAnimator::default();
        for _ in 0..120 {
            fast.tick(&target, 1.0 / 120.0);
        }
        for _ in 0..30 {
            slow.tick(&target, 1.0 / 30.0);
        }
        assert_relative_eq!(fast.state().scale, slow.state().scale, epsilon = 1e-4);
    }

    #[test]
    fn scale_converges_to_signal() {
        let mut view = ViewAnimator::default();
        for _ in 0..600 {
            view.tick(&zoomed(3.0), 1.0 / 60.0);
        }
        assert_relative_eq!(view.state().scale, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn rotation_integrates_velocity() {
        let mut view = ViewAnimator::default();
        let spin = GestureSignal {
            rotation: Vec2::new(0.01, -0.02),
            is_tracking: true,
            ..GestureSignal::default()
        };
        for _ in 0..600 {
            view.tick(&spin, 1.0 / 60.0);
        }
        assert!(view.state().yaw > 0.0);
        assert!(view.state().pitch < 0.0);
        assert_relative_eq!(view.state().rotation_velocity.x, 0.01, epsilon = 1e-5);

        let yaw = view.state().yaw;
        for _ in 0..600 {
            view.tick(&GestureSignal::default(), 1.0 / 60.0);
        }
        let settled = view.state().yaw;
        assert!(settled > yaw);
        view.tick(&GestureSignal::default(), 1.0 / 60.0);
        assert_relative_eq!(view.state().yaw, settled, epsilon = 1e-5);
    }

    #[test]
    fn explosion_ramps_caps_and_decays() {
        let mut view = ViewAnimator::default();
        let held = GestureSignal {
            is_exploding: true,
            ..GestureSignal::default()
        };
        view.tick(&held, 0.5);
        assert_relative_eq!(view.state().explosion, 1.0);
        for _ in 0..10 {
            view.tick(&held, 1.0);
        }
        assert_eq!(view.state().explosion, ViewConfig::default().max_explosion);

        view.tick(&GestureSignal::default(), 1.0);
        assert_relative_eq!(view.state().explosion, 4.0 * (-3.0f32).exp(), epsilon = 1e-5);
        for _ in 0..20 {
            view.tick(&GestureSignal::default(), 1.0);
        }
        assert!(view.state().explosion < 1e-6);
    }

    #[test]
    fn negative_dt_is_ignored() {
        let mut view = ViewAnimator::default();
        let before = view.state().clone();
        view.tick(&zoomed(9.0), -1.0);
        assert_eq!(view.state(), &before);
    }
}
