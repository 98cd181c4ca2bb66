use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The 29 RPE easing curves, numbered as they appear in chart files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Easing {
    #[default]
    Linear = 1,
    OutSine = 2,
    InSine = 3,
    OutQuad = 4,
    InQuad = 5,
    InOutSine = 6,
    InOutQuad = 7,
    OutCubic = 8,
    InCubic = 9,
    OutQuart = 10,
    InQuart = 11,
    InOutCubic = 12,
    InOutQuart = 13,
    OutQuint = 14,
    InQuint = 15,
    OutExpo = 16,
    InExpo = 17,
    OutCirc = 18,
    InCirc = 19,
    OutBack = 20,
    InBack = 21,
    InOutCirc = 22,
    InOutBack = 23,
    OutElastic = 24,
    InElastic = 25,
    OutBounce = 26,
    InBounce = 27,
    InOutBounce = 28,
    InOutElastic = 29,
}

impl Easing {
    pub const ALL: [Easing; 29] = [
        Self::Linear, Self::OutSine, Self::InSine, Self::OutQuad, Self::InQuad,
        Self::InOutSine, Self::InOutQuad, Self::OutCubic, Self::InCubic, Self::OutQuart,
        Self::InQuart, Self::InOutCubic, Self::InOutQuart, Self::OutQuint, Self::InQuint,
        Self::OutExpo, Self::InExpo, Self::OutCirc, Self::InCirc, Self::OutBack,
        Self::InBack, Self::InOutCirc, Self::InOutBack, Self::OutElastic, Self::InElastic,
        Self::OutBounce, Self::InBounce, Self::InOutBounce, Self::InOutElastic,
    ];

    #[inline(always)]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Evaluates the Penner curve at `x`. No clamping: inputs outside `[0, 1]`
    /// extrapolate (or turn NaN for the circular curves).
    pub fn apply(self, x: f64) -> f64 {
        const C1: f64 = 1.70158;
        const C2: f64 = C1 * 1.525;
        const C3: f64 = C1 + 1.0;
        const C4: f64 = (2.0 * PI) / 3.0;
        const C5: f64 = (2.0 * PI) / 4.5;

        match self {
            Self::Linear => x,
            Self::InSine => 1.0 - (x * PI / 2.0).cos(),
            Self::OutSine => (x * PI / 2.0).sin(),
            Self::InOutSine => -((PI * x).cos() - 1.0) / 2.0,
            Self::InQuad => x * x,
            Self::OutQuad => 1.0 - (1.0 - x) * (1.0 - x),
            Self::InOutQuad => {
                if x < 0.5 { 2.0 * x * x } else { 1.0 - (-2.0 * x + 2.0).powi(2) / 2.0 }
            }
            Self::InCubic => x * x * x,
            Self::OutCubic => 1.0 - (1.0 - x).powi(3),
            Self::InOutCubic => {
                if x < 0.5 { 4.0 * x * x * x } else { 1.0 - (-2.0 * x + 2.0).powi(3) / 2.0 }
            }
            Self::InQuart => x.powi(4),
            Self::OutQuart => 1.0 - (1.0 - x).powi(4),
            Self::InOutQuart => {
                if x < 0.5 { 8.0 * x.powi(4) } else { 1.0 - (-2.0 * x + 2.0).powi(4) / 2.0 }
            }
            Self::InQuint => x.powi(5),
            Self::OutQuint => 1.0 - (1.0 - x).powi(5),
            Self::InExpo => {
                if x == 0.0 { 0.0 } else { 2f64.powf(10.0 * x - 10.0) }
            }
            Self::OutExpo => {
                if x == 1.0 { 1.0 } else { 1.0 - 2f64.powf(-10.0 * x) }
            }
            Self::InCirc => 1.0 - (1.0 - x * x).sqrt(),
            Self::OutCirc => (1.0 - (x - 1.0).powi(2)).sqrt(),
            Self::InOutCirc => {
                if x < 0.5 {
                    (1.0 - (1.0 - (2.0 * x).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * x + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Self::InBack => C3 * x * x * x - C1 * x * x,
            Self::OutBack => 1.0 + C3 * (x - 1.0).powi(3) + C1 * (x - 1.0).powi(2),
            Self::InOutBack => {
                if x < 0.5 {
                    ((2.0 * x).powi(2) * ((C2 + 1.0) * 2.0 * x - C2)) / 2.0
                } else {
                    ((2.0 * x - 2.0).powi(2) * ((C2 + 1.0) * (x * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
            Self::InElastic => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else {
                    -(2f64.powf(10.0 * x - 10.0)) * ((x * 10.0 - 10.75) * C4).sin()
                }
            }
            Self::OutElastic => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else {
                    2f64.powf(-10.0 * x) * ((x * 10.0 - 0.75) * C4).sin() + 1.0
                }
            }
            Self::InOutElastic => {
                if x == 0.0 {
                    0.0
                } else if x == 1.0 {
                    1.0
                } else if x < 0.5 {
                    -(2f64.powf(20.0 * x - 10.0) * ((20.0 * x - 11.125) * C5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * x + 10.0) * ((20.0 * x - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }
            Self::OutBounce => out_bounce(x),
            Self::InBounce => 1.0 - out_bounce(1.0 - x),
            Self::InOutBounce => {
                if x < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * x)) / 2.0
                } else {
                    (1.0 + out_bounce(2.0 * x - 1.0)) / 2.0
                }
            }
        }
    }
}

fn out_bounce(x: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if x < 1.0 / D1 {
        N1 * x * x
    } else if x < 2.0 / D1 {
        let x = x - 1.5 / D1;
        N1 * x * x + 0.75
    } else if x < 2.5 / D1 {
        let x = x - 2.25 / D1;
        N1 * x * x + 0.9375
    } else {
        let x = x - 2.625 / D1;
        N1 * x * x + 0.984375
    }
}

impl TryFrom<u8> for Easing {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Easing::ALL
            .get((id as usize).wrapping_sub(1))
            .copied()
            .ok_or(Error::Easing(id))
    }
}

impl From<Easing> for u8 {
    fn from(e: Easing) -> u8 {
        e.id()
    }
}

/// Cubic Bézier ease through (0,0), `p1`, `p2`, (1,1), as `[p1x, p1y, p2x, p2y]`.
///
/// `x` is the time fraction; the curve is inverted in x first and the
/// resulting parameter is evaluated in y.
pub fn cubic_bezier(points: [f64; 4], x: f64) -> f64 {
    let [p1x, p1y, p2x, p2y] = points;
    // Polynomial coefficients for B(t) = ((a t + b) t + c) t.
    let cx = 3.0 * p1x;
    let bx = 3.0 * (p2x - p1x) - cx;
    let ax = 1.0 - cx - bx;
    let cy = 3.0 * p1y;
    let by = 3.0 * (p2y - p1y) - cy;
    let ay = 1.0 - cy - by;

    let sample_x = |t: f64| ((ax * t + bx) * t + cx) * t;
    let sample_y = |t: f64| ((ay * t + by) * t + cy) * t;
    let slope_x = |t: f64| (3.0 * ax * t + 2.0 * bx) * t + cx;

    const EPSILON: f64 = 1e-7;

    let mut t = x;
    let mut solved = false;
    for _ in 0..8 {
        let err = sample_x(t) - x;
        if err.abs() < EPSILON {
            solved = true;
            break;
        }
        let d = slope_x(t);
        if d.abs() < 1e-6 {
            break;
        }
        t -= err / d;
    }

    if !solved {
        // Bisection fallback for flat spots.
        let (mut lo, mut hi) = (0.0, 1.0);
        t = x.clamp(0.0, 1.0);
        for _ in 0..64 {
            let sx = sample_x(t);
            if (sx - x).abs() < EPSILON {
                break;
            }
            if x > sx {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) / 2.0;
        }
    }

    sample_y(t)
}

#[cfg(test)]
mod tests {
    use super::{Easing, cubic_bezier};

    #[test]
    fn every_curve_hits_its_endpoints() {
        for e in Easing::ALL {
            let a = e.apply(0.0);
            let b = e.apply(1.0);
            assert!(a.abs() <= 1e-9, "{e:?}(0) = {a}");
            assert!((b - 1.0).abs() <= 1e-9, "{e:?}(1) = {b}");
        }
    }

    #[test]
    fn ids_match_chart_numbering() {
        assert_eq!(Easing::try_from(1).ok(), Some(Easing::Linear));
        assert_eq!(Easing::try_from(16).ok(), Some(Easing::OutExpo));
        assert_eq!(Easing::try_from(29).ok(), Some(Easing::InOutElastic));
        assert!(Easing::try_from(0).is_err());
        assert!(matches!(Easing::try_from(30), Err(crate::error::Error::Easing(30))));
        for (i, e) in Easing::ALL.iter().enumerate() {
            assert_eq!(e.id() as usize, i + 1, "{e:?} is out of order");
        }
    }

    #[test]
    fn canonical_midpoints() {
        let cases = [
            (Easing::InQuad, 0.25),
            (Easing::OutQuad, 0.75),
            (Easing::InOutCubic, 0.5),
            (Easing::InSine, 1.0 - (std::f64::consts::FRAC_PI_4).cos()),
            (Easing::InExpo, 2f64.powf(-5.0)),
            (Easing::OutBounce, 0.765625),
        ];
        for (e, expected) in cases {
            let got = e.apply(0.5);
            assert!((got - expected).abs() <= 1e-9, "{e:?}(0.5) = {got}, expected {expected}");
        }
    }

    #[test]
    fn back_curves_overshoot() {
        assert!(Easing::InBack.apply(0.2) < 0.0, "InBack dips below zero early");
        assert!(Easing::OutBack.apply(0.8) > 1.0, "OutBack overshoots late");
    }

    #[test]
    fn linear_bezier_is_identity() {
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            let y = cubic_bezier([0.25, 0.25, 0.75, 0.75], x);
            assert!((y - x).abs() <= 1e-6, "bezier({x}) = {y}");
        }
    }

    #[test]
    fn ease_bezier_matches_css_ease() {
        // CSS `ease` = cubic-bezier(0.25, 0.1, 0.25, 1.0); y(0.5) ~= 0.8024.
        let y = cubic_bezier([0.25, 0.1, 0.25, 1.0], 0.5);
        assert!((y - 0.8024).abs() <= 1e-3, "got {y}");
        assert!(cubic_bezier([0.25, 0.1, 0.25, 1.0], 0.0).abs() <= 1e-9);
        assert!((cubic_bezier([0.25, 0.1, 0.25, 1.0], 1.0) - 1.0).abs() <= 1e-9);
    }
}
