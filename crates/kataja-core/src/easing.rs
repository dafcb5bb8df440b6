#![forbid(unsafe_code)]

//! Easing functions and the precomputed per-frame easing curve.
//!
//! Node movement is frame-counted rather than time-based: a move takes a
//! fixed number of ticks and every tick advances the node by one entry of an
//! [`EasingCurve`]. The curve stores cumulative progress, so the position
//! after `k` ticks is `start + (target - start) * curve.progress(k)`.
//!
//! # Invariants
//!
//! 1. `progress(0) == 0.0` and `progress(frames) == 1.0` exactly.
//! 2. `progress` is non-decreasing in `k`.
//! 3. The per-frame increments sum to 1.
//!
//! The exact final value means a node with both bind flags set lands on its
//! target in exactly `frames` ticks, without floating-point residue.

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f64) -> f64;

/// Identity easing (constant velocity).
#[inline]
#[must_use]
pub fn linear(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
#[must_use]
pub fn ease_in(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
#[must_use]
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out.
#[inline]
#[must_use]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out.
#[inline]
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Cumulative easing table for a fixed number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct EasingCurve {
    cumulative: Vec<f64>,
}

impl EasingCurve {
    /// Sample `easing` into `frames` steps. A zero frame count is treated as one.
    #[must_use]
    pub fn new(frames: u32, easing: EasingFn) -> Self {
        let frames = frames.max(1) as usize;
        let increments: Vec<f64> = (0..frames)
            .map(|k| {
                let a = easing(k as f64 / frames as f64);
                let b = easing((k + 1) as f64 / frames as f64);
                (b - a).max(0.0)
            })
            .collect();
        let total: f64 = increments.iter().sum();
        let mut cumulative = Vec::with_capacity(frames + 1);
        cumulative.push(0.0);
        let mut acc = 0.0;
        for inc in &increments {
            acc += if total > 0.0 {
                inc / total
            } else {
                1.0 / frames as f64
            };
            cumulative.push(acc.min(1.0));
        }
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Self { cumulative }
    }

    /// Default movement curve (quadratic ease-in-out).
    #[must_use]
    pub fn movement(frames: u32) -> Self {
        Self::new(frames, ease_in_out)
    }

    /// Number of frames the curve spans.
    #[must_use]
    pub fn frames(&self) -> u32 {
        (self.cumulative.len() - 1) as u32
    }

    /// Progress after `step` frames, saturating at 1.
    #[must_use]
    pub fn progress(&self, step: u32) -> f64 {
        let idx = (step as usize).min(self.cumulative.len() - 1);
        self.cumulative[idx]
    }

    /// Progress gained during frame `step` (1-based).
    #[must_use]
    pub fn increment(&self, step: u32) -> f64 {
        if step == 0 {
            return 0.0;
        }
        self.progress(step) - self.progress(step - 1)
    }
}
