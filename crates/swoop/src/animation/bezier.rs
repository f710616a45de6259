/// A cubic bezier easing curve.
///
/// The end points are fixed at (0, 0) and (1, 1); only the two control points
/// are configurable, as in CSS `cubic-bezier()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BezierCurve {
    p1: (f32, f32),
    p2: (f32, f32),
}

const NEWTON_ITERATIONS: usize = 8;
const EPSILON: f32 = 1e-4;

impl BezierCurve {
    pub const LINEAR: BezierCurve = BezierCurve::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(p1x: f32, p1y: f32, p2x: f32, p2y: f32) -> BezierCurve {
        BezierCurve { p1: (p1x, p1y), p2: (p2x, p2y) }
    }

    /// Maps linear progress in [0, 1] to eased progress.
    ///
    /// Inputs outside (0, 1) are pinned to the end points.
    pub fn evaluate(&self, progress: f32) -> f32 {
        if progress.is_nan() || progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        self.y_at(self.solve_t(progress))
    }

    fn x_at(&self, t: f32) -> f32 {
        bezier(self.p1.0, self.p2.0, t)
    }

    fn y_at(&self, t: f32) -> f32 {
        bezier(self.p1.1, self.p2.1, t)
    }

    fn dx_dt(&self, t: f32) -> f32 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.p1.0 + 6.0 * mt * t * (self.p2.0 - self.p1.0) + 3.0 * t * t * (1.0 - self.p2.0)
    }

    /// Newton-Raphson for the `t` where x(t) == x.
    fn solve_t(&self, x: f32) -> f32 {
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let dx = self.x_at(t) - x;
            if dx.abs() < EPSILON {
                break;
            }
            let slope = self.dx_dt(t);
            if slope.abs() < EPSILON {
                break;
            }
            t = (t - dx / slope).clamp(0.0, 1.0);
        }
        t
    }
}

impl Default for BezierCurve {
    fn default() -> Self {
        BezierCurve::LINEAR
    }
}

impl From<[f32; 4]> for BezierCurve {
    fn from([p1x, p1y, p2x, p2y]: [f32; 4]) -> Self {
        BezierCurve::new(p1x, p1y, p2x, p2y)
    }
}

fn bezier(c1: f32, c2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * c1 + 3.0 * mt * t * t * c2 + t * t * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_curve_is_linear() {
        let curve = BezierCurve::LINEAR;
        for i in 0..=1000 {
            let p = i as f32 / 1000.0;
            let eased = curve.evaluate(p);
            assert!((eased - p).abs() < 1e-3, "evaluate({p}) = {eased}");
        }
    }

    #[test]
    fn out_of_range_progress_is_pinned() {
        let curve = BezierCurve::new(0.25, 0.1, 0.25, 1.0);
        assert_eq!(curve.evaluate(-0.5), 0.0);
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(1.0), 1.0);
        assert_eq!(curve.evaluate(7.0), 1.0);
        assert_eq!(curve.evaluate(f32::NAN), 0.0);
    }

    #[test]
    fn ease_out_leads_linear() {
        // CSS ease-out.
        let curve = BezierCurve::new(0.0, 0.0, 0.58, 1.0);
        for p in [0.1, 0.25, 0.5, 0.75, 0.9] {
            assert!(curve.evaluate(p) > p, "ease-out at {p}");
        }
    }

    #[test]
    fn ease_in_trails_linear() {
        // CSS ease-in.
        let curve = BezierCurve::new(0.42, 0.0, 1.0, 1.0);
        for p in [0.1, 0.25, 0.5, 0.75, 0.9] {
            assert!(curve.evaluate(p) < p, "ease-in at {p}");
        }
    }

    #[test]
    fn overshooting_curve_exceeds_one() {
        let curve = BezierCurve::new(0.05, 0.9, 0.1, 1.05);
        let peak = (1..100).map(|i| curve.evaluate(i as f32 / 100.0)).fold(0.0, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn is_monotonic_for_standard_ease() {
        let curve = BezierCurve::new(0.25, 0.1, 0.25, 1.0);
        let mut last = 0.0;
        for i in 0..=100 {
            let y = curve.evaluate(i as f32 / 100.0);
            assert!(y + 1e-3 >= last);
            last = y;
        }
    }
}
