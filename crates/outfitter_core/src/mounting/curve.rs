//! Normalized animation curves: [0,1] → [0,1]

use bevy::prelude::*;
use bevy_math::curve::easing::{EaseFunction, EasingCurve};
use bevy_math::curve::Curve;

/// Нормализованная кривая для easing mounter'а
///
/// Вход clamp'ится в [0,1].
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedCurve {
    Linear,
    /// Bevy easing function (SmoothStep, QuadraticInOut, ...)
    Ease(EaseFunction),
    /// Piecewise-linear keyframes (time, value), отсортированы по time
    Keyframes(Vec<Vec2>),
}

impl Default for NormalizedCurve {
    fn default() -> Self {
        NormalizedCurve::Ease(EaseFunction::SmoothStep)
    }
}

impl NormalizedCurve {
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            NormalizedCurve::Linear => t,
            NormalizedCurve::Ease(function) => EasingCurve::new(0.0_f32, 1.0_f32, *function).sample_clamped(t),
            NormalizedCurve::Keyframes(keys) => sample_keyframes(keys, t),
        }
    }
}

fn sample_keyframes(keys: &[Vec2], t: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return t;
    };
    if t <= first.x {
        return first.y;
    }
    if t >= last.x {
        return last.y;
    }

    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.x && t <= b.x {
            let span = b.x - a.x;
            if span <= f32::EPSILON {
                return b.y;
            }
            return a.y + (b.y - a.y) * ((t - a.x) / span);
        }
    }
    last.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_clamps() {
        let curve = NormalizedCurve::Linear;
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(0.25), 0.25);
        assert_eq!(curve.evaluate(2.0), 1.0);
    }

    #[test]
    fn test_ease_endpoints() {
        let curve = NormalizedCurve::Ease(EaseFunction::QuadraticInOut);
        assert!(curve.evaluate(0.0).abs() < 1e-5);
        assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-5);
        assert!((curve.evaluate(0.5) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_keyframes_interpolate() {
        let curve = NormalizedCurve::Keyframes(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.8),
            Vec2::new(1.0, 1.0),
        ]);
        assert!((curve.evaluate(0.25) - 0.4).abs() < 1e-5);
        assert!((curve.evaluate(0.75) - 0.9).abs() < 1e-5);
        assert_eq!(curve.evaluate(1.0), 1.0);

        // Пустые keyframes → linear
        assert_eq!(NormalizedCurve::Keyframes(Vec::new()).evaluate(0.3), 0.3);
    }
}
