//! Time-based interpolation of layout values.
//!
//! Nothing in this module reads a clock. Every goal change and every tick is
//! given an explicit [`Instant`], so all values advanced in one frame agree on
//! what time it is.

mod bezier;

use std::{
    fmt,
    time::{Duration, Instant},
};

pub use bezier::BezierCurve;

use crate::geometry::Rect;

/// How one category of animation (enter, exit, movement) is timed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Easing curve; linear when absent.
    pub curve: Option<BezierCurve>,
    pub duration: Duration,
}

impl AnimationConfig {
    pub const fn new(curve: BezierCurve, duration: Duration) -> AnimationConfig {
        AnimationConfig { curve: Some(curve), duration }
    }

    pub const fn linear(duration: Duration) -> AnimationConfig {
        AnimationConfig { curve: None, duration }
    }

    fn ease(&self, progress: f32) -> f32 {
        match &self.curve {
            Some(curve) => curve.evaluate(progress),
            None => progress,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig::linear(Duration::from_millis(300))
    }
}

/// Whether a goal change is interpolated, and from which instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Jump straight to the goal.
    Snap,
    /// Interpolate toward the goal starting at the given instant.
    Animate(Instant),
}

impl Transition {
    /// `Animate(now)` when `animate` is set, otherwise `Snap`.
    pub fn new(animate: bool, now: Instant) -> Transition {
        if animate {
            Transition::Animate(now)
        } else {
            Transition::Snap
        }
    }

    pub fn start(self) -> Option<Instant> {
        match self {
            Transition::Snap => None,
            Transition::Animate(now) => Some(now),
        }
    }
}

/// A value that can be linearly interpolated.
pub trait Animatable: Copy + PartialEq + fmt::Debug {
    fn blend(start: Self, goal: Self, t: f32) -> Self;
}

impl Animatable for f32 {
    fn blend(start: f32, goal: f32, t: f32) -> f32 {
        start + (goal - start) * t
    }
}

impl Animatable for i32 {
    /// Interpolates in floating point, then truncates toward zero.
    fn blend(start: i32, goal: i32, t: f32) -> i32 {
        (start as f32 + (goal - start) as f32 * t) as i32
    }
}

/// A scalar interpolating from a start value toward a goal.
///
/// When no animation is in flight, `value == start == goal`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedValue<T> {
    value: T,
    start: T,
    goal: T,
    config: AnimationConfig,
    started_at: Option<Instant>,
}

impl<T: Animatable> AnimatedValue<T> {
    pub fn new(initial: T) -> Self {
        AnimatedValue {
            value: initial,
            start: initial,
            goal: initial,
            config: AnimationConfig::default(),
            started_at: None,
        }
    }

    /// Changes the curve and duration. The current value is unaffected.
    pub fn configure(&mut self, config: AnimationConfig) {
        self.config = config;
    }

    /// Aims the value at `target`.
    ///
    /// An animated change starts from the current, possibly in-flight value,
    /// so re-targeting mid-animation bends the motion instead of jumping.
    /// Aiming at the goal already being approached is a no-op and leaves the
    /// in-flight animation untouched.
    pub fn set_goal(&mut self, target: T, transition: Transition) {
        match transition.start() {
            Some(now) if !self.config.duration.is_zero() => {
                if target == self.goal {
                    return;
                }
                self.start = self.value;
                self.goal = target;
                self.started_at = Some(now);
            }
            _ => self.warp(target),
        }
    }

    /// Jumps to `value`, cancelling any animation.
    pub fn warp(&mut self, value: T) {
        self.value = value;
        self.start = value;
        self.goal = value;
        self.started_at = None;
    }

    /// Moves the value along its curve. Returns whether it is still animating.
    pub fn advance(&mut self, now: Instant) -> bool {
        let Some(started_at) = self.started_at else {
            return false;
        };
        let progress = if self.config.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(started_at);
            (elapsed.as_secs_f32() / self.config.duration.as_secs_f32()).clamp(0.0, 1.0)
        };
        if progress >= 1.0 {
            self.warp(self.goal);
            return false;
        }
        self.value = T::blend(self.start, self.goal, self.config.ease(progress));
        true
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn goal(&self) -> T {
        self.goal
    }

    pub fn is_animating(&self) -> bool {
        self.started_at.is_some()
    }
}

/// The animated frame of one tree node.
///
/// Position and size follow layout changes; scale and alpha are reserved for
/// the enter and exit effects and animate independently of them.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedRect {
    x: AnimatedValue<i32>,
    y: AnimatedValue<i32>,
    width: AnimatedValue<i32>,
    height: AnimatedValue<i32>,
    scale: AnimatedValue<f32>,
    alpha: AnimatedValue<f32>,
}

impl Default for AnimatedRect {
    fn default() -> Self {
        AnimatedRect {
            x: AnimatedValue::new(0),
            y: AnimatedValue::new(0),
            width: AnimatedValue::new(100),
            height: AnimatedValue::new(100),
            scale: AnimatedValue::new(1.0),
            alpha: AnimatedValue::new(1.0),
        }
    }
}

impl AnimatedRect {
    /// Sets the timing of position and size changes.
    pub fn configure(&mut self, movement: AnimationConfig) {
        self.x.configure(movement);
        self.y.configure(movement);
        self.width.configure(movement);
        self.height.configure(movement);
    }

    pub fn set_goal(&mut self, rect: Rect, transition: Transition) {
        self.x.set_goal(rect.x, transition);
        self.y.set_goal(rect.y, transition);
        self.width.set_goal(rect.width, transition);
        self.height.set_goal(rect.height, transition);
    }

    pub fn warp(&mut self, rect: Rect) {
        self.x.warp(rect.x);
        self.y.warp(rect.y);
        self.width.warp(rect.width);
        self.height.warp(rect.height);
    }

    /// Grows from `from_scale` and fades in.
    pub fn start_enter_effect(&mut self, from_scale: f32, config: AnimationConfig, now: Instant) {
        self.scale.configure(config);
        self.alpha.configure(config);
        self.scale.warp(from_scale);
        self.alpha.warp(0.0);
        self.scale.set_goal(1.0, Transition::Animate(now));
        self.alpha.set_goal(1.0, Transition::Animate(now));
    }

    /// Shrinks toward `to_scale` and fades out.
    pub fn start_exit_effect(&mut self, to_scale: f32, config: AnimationConfig, now: Instant) {
        self.scale.configure(config);
        self.alpha.configure(config);
        self.scale.set_goal(to_scale, Transition::Animate(now));
        self.alpha.set_goal(0.0, Transition::Animate(now));
    }

    /// Advances all six values. Returns whether any of them is still
    /// animating.
    pub fn advance(&mut self, now: Instant) -> bool {
        // Non-short-circuiting: every value must see every tick.
        let frame = self.x.advance(now)
            | self.y.advance(now)
            | self.width.advance(now)
            | self.height.advance(now);
        let effect = self.scale.advance(now) | self.alpha.advance(now);
        frame | effect
    }

    pub fn current(&self) -> Rect {
        Rect::new(
            self.x.value(),
            self.y.value(),
            self.width.value(),
            self.height.value(),
        )
    }

    pub fn goal(&self) -> Rect {
        Rect::new(
            self.x.goal(),
            self.y.goal(),
            self.width.goal(),
            self.height.goal(),
        )
    }

    pub fn scale_alpha(&self) -> (f32, f32) {
        (self.scale.value(), self.alpha.value())
    }

    pub fn is_animating(&self) -> bool {
        [&self.x, &self.y, &self.width, &self.height].iter().any(|v| v.is_animating())
            || self.scale.is_animating()
            || self.alpha.is_animating()
    }
}
