use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Exact rational timeline position, `whole + numerator / denominator`.
///
/// Always stored normalized:
/// - `denominator > 0` (a zero denominator is read as 1),
/// - `numerator / denominator` reduced by their gcd,
/// - `0 <= numerator < denominator`, overflow folded into `whole`.
///
/// Serializes as the `[whole, numerator, denominator]` triple used by chart files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Beats {
    whole: i32,
    numerator: i32,
    denominator: i32,
}

#[inline(always)]
fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Beats {
    pub const ZERO: Beats = Beats { whole: 0, numerator: 0, denominator: 1 };

    pub fn new(whole: i32, numerator: i32, denominator: i32) -> Self {
        Self::from_parts(whole as i128, numerator as i128, denominator as i128)
    }

    pub const fn from_whole(whole: i32) -> Self {
        Beats { whole, numerator: 0, denominator: 1 }
    }

    fn from_parts(whole: i128, mut num: i128, mut den: i128) -> Self {
        if den == 0 {
            den = 1;
        }
        if den < 0 {
            den = -den;
            num = -num;
        }
        let g = gcd(num, den);
        if g > 1 {
            num /= g;
            den /= g;
        }
        let whole = whole + num.div_euclid(den);
        let num = num.rem_euclid(den);
        Beats {
            whole: whole as i32,
            numerator: num as i32,
            denominator: den as i32,
        }
    }

    /// Reduces a floating beat value to a triple on the given grid:
    /// floor for the whole part, rounded fractional part times `denominator`.
    pub fn from_value(value: f64, denominator: i32) -> Self {
        let den = if denominator == 0 { 1 } else { denominator };
        let whole = value.floor();
        let num = ((value - whole) * den as f64).round();
        Self::from_parts(whole as i128, num as i128, den as i128)
    }

    #[inline(always)]
    pub fn whole(&self) -> i32 {
        self.whole
    }

    #[inline(always)]
    pub fn numerator(&self) -> i32 {
        self.numerator
    }

    #[inline(always)]
    pub fn denominator(&self) -> i32 {
        self.denominator
    }

    #[inline(always)]
    pub fn value(&self) -> f64 {
        self.whole as f64 + self.numerator as f64 / self.denominator as f64
    }

    fn as_fraction(&self) -> (i128, i128) {
        let den = self.denominator as i128;
        (self.whole as i128 * den + self.numerator as i128, den)
    }
}

impl Default for Beats {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[i32; 3]> for Beats {
    fn from([whole, numerator, denominator]: [i32; 3]) -> Self {
        Self::new(whole, numerator, denominator)
    }
}

impl From<Beats> for [i32; 3] {
    fn from(b: Beats) -> Self {
        [b.whole, b.numerator, b.denominator]
    }
}

impl Add for Beats {
    type Output = Beats;

    fn add(self, rhs: Beats) -> Beats {
        let (an, ad) = self.as_fraction();
        let (bn, bd) = rhs.as_fraction();
        Beats::from_parts(0, an * bd + bn * ad, ad * bd)
    }
}

impl Sub for Beats {
    type Output = Beats;

    fn sub(self, rhs: Beats) -> Beats {
        let (an, ad) = self.as_fraction();
        let (bn, bd) = rhs.as_fraction();
        Beats::from_parts(0, an * bd - bn * ad, ad * bd)
    }
}

impl PartialOrd for Beats {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Beats {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.as_fraction();
        let (bn, bd) = other.as_fraction();
        (an * bd).cmp(&(bn * ad))
    }
}

impl fmt::Display for Beats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.whole, self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::Beats;

    #[test]
    fn zero_denominator_reads_as_one() {
        let b = Beats::new(2, 0, 0);
        assert_eq!(b.denominator(), 1);
        assert!((b.value() - 2.0).abs() <= 1e-12, "got {}", b.value());
    }

    #[test]
    fn normalization_reduces_and_folds_overflow() {
        let b = Beats::new(1, 6, 4);
        assert_eq!(<[i32; 3]>::from(b), [2, 1, 2], "1 + 6/4 should normalize to 2 + 1/2");
        let neg = Beats::new(0, -1, 4);
        assert_eq!(<[i32; 3]>::from(neg), [-1, 3, 4], "negative numerators borrow from whole");
        let flipped = Beats::new(0, 1, -2);
        assert_eq!(<[i32; 3]>::from(flipped), [-1, 1, 2]);
    }

    #[test]
    fn equal_values_compare_equal_after_normalization() {
        assert_eq!(Beats::new(1, 1, 2), Beats::new(1, 2, 4));
        assert!(Beats::new(1, 1, 3) < Beats::new(1, 1, 2));
    }

    #[test]
    fn from_value_rounds_fraction_onto_grid() {
        let b = Beats::from_value(3.3333, 3);
        assert_eq!(<[i32; 3]>::from(b), [3, 1, 3]);
        let carry = Beats::from_value(1.999, 4);
        assert_eq!(<[i32; 3]>::from(carry), [2, 0, 1], "rounding up to a full beat folds into whole");
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = Beats::new(1, 1, 3);
        let b = Beats::new(0, 1, 6);
        assert_eq!(a + b, Beats::new(1, 1, 2));
        assert_eq!(a - b, Beats::new(1, 1, 6));
        assert_eq!(b - a, Beats::new(-2, 5, 6));
    }

    #[test]
    fn large_triples_compare_without_overflow() {
        let a = Beats::new(1_500_000_000, 1, 2_000_000_011);
        let b = Beats::new(1_500_000_000, 1, 2_000_000_003);
        assert!(a < b, "1/2000000011 is the smaller fraction");
        let c = Beats::new(1_500_000_000, 2, 2_000_000_011);
        assert_eq!(c - a, Beats::new(0, 1, 2_000_000_011));
        assert_eq!(a + Beats::new(0, 1, 2_000_000_011), c);
    }

    #[test]
    fn serializes_as_triple() {
        let b: Beats = serde_json::from_str("[4, 2, 8]").expect("triple should parse");
        assert_eq!(b, Beats::new(4, 1, 4));
        assert_eq!(serde_json::to_string(&b).expect("serialize"), "[4,1,4]");
    }
}
