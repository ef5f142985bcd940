//! Exact rational numbers
//!
//! Every quantity that flows through a solve is a `Rational`: recipe amounts,
//! crafting times, rates, tableau entries and priority weights. Values are
//! always kept in lowest terms with a positive denominator, so structural
//! equality is numeric equality and no comparison ever needs a tolerance.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{FromPrimitive, One, Signed, Zero};

use crate::error::{ConfigError, Error, Result};

/// Scale used when approximating floating-point input.
const FLOAT_SCALE: i64 = 10_000;

/// Distance from a multiple of 1/3 under which a float is read as that third.
const THIRDS_TOLERANCE: f64 = 3e-4;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

impl Rational {
    /// Build `numer / denom`, reduced and with the sign moved to the numerator.
    pub fn new(numer: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self> {
        let denom = denom.into();
        if denom.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(Self(BigRational::new(numer.into(), denom)))
    }

    pub fn from_integer(n: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(n.into()))
    }

    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    pub fn one() -> Self {
        Self(BigRational::one())
    }

    pub fn half() -> Self {
        Self(BigRational::new_raw(BigInt::one(), BigInt::from(2)))
    }

    /// Approximate a float.
    ///
    /// Game data is full of values like `0.3333` that stand for a third, so
    /// anything within a small distance of a multiple of 1/3 becomes that
    /// multiple exactly. Everything else is rounded to four decimal places.
    pub fn from_float(x: f64) -> Result<Self> {
        if !x.is_finite() {
            return Err(ConfigError::InvalidNumber(x.to_string()).into());
        }
        if x.fract() == 0.0 {
            return Self::from_f64_integer(x);
        }
        let thirds = (x * 3.0).round();
        if thirds % 3.0 != 0.0 && (x * 3.0 - thirds).abs() < THIRDS_TOLERANCE {
            return Ok(Self::from_f64_integer(thirds)?.div_int(3));
        }
        let scaled = (x * FLOAT_SCALE as f64).round();
        Ok(Self::from_f64_integer(scaled)?.div_int(FLOAT_SCALE))
    }

    fn from_f64_integer(x: f64) -> Result<Self> {
        BigInt::from_f64(x)
            .map(Self::from_integer)
            .ok_or_else(|| ConfigError::InvalidNumber(x.to_string()).into())
    }

    fn div_int(self, n: i64) -> Self {
        Self(self.0 / BigRational::from_integer(BigInt::from(n)))
    }

    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    pub fn ceil(&self) -> Self {
        Self(self.0.ceil())
    }

    pub fn reciprocal(&self) -> Result<Self> {
        if self.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(Self(self.0.recip()))
    }

    pub fn try_div(&self, other: &Rational) -> Result<Self> {
        if other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(Self(&self.0 / &other.0))
    }

    /// Decimal rendering with at most `digits` fractional digits, rounding
    /// half away from zero. Trailing zeros are dropped.
    pub fn to_decimal(&self, digits: u32) -> String {
        let scaled = self.scaled(digits);
        render_scaled(&scaled.round().to_integer(), digits)
    }

    /// Like [`to_decimal`](Self::to_decimal) but always rounds away from
    /// zero, so a displayed building count never understates what is needed.
    pub fn to_up_decimal(&self, digits: u32) -> String {
        let scaled = self.scaled(digits);
        let rounded = if scaled.is_negative() {
            scaled.floor()
        } else {
            scaled.ceil()
        };
        render_scaled(&rounded.to_integer(), digits)
    }

    /// `2 1/3` style rendering.
    pub fn to_mixed(&self) -> String {
        if self.is_integer() {
            return self.numer().to_string();
        }
        let whole = self.0.trunc().to_integer();
        if whole.is_zero() {
            return self.to_string();
        }
        let fract = self.0.fract().abs();
        format!("{} {}/{}", whole, fract.numer(), fract.denom())
    }

    fn scaled(&self, digits: u32) -> BigRational {
        &self.0 * &BigRational::from_integer(BigInt::from(10u32).pow(digits))
    }
}

fn render_scaled(n: &BigInt, digits: u32) -> String {
    if n.is_zero() {
        return "0".to_string();
    }
    let digits = digits as usize;
    let mut body = n.abs().to_string();
    if body.len() <= digits {
        body = format!("{}{}", "0".repeat(digits + 1 - body.len()), body);
    }
    let point = body.len() - digits;
    let (int_part, frac_part) = body.split_at(point);
    let frac_part = frac_part.trim_end_matches('0');
    let sign = if n.is_negative() { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{frac_part}")
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom().is_one() {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

impl FromStr for Rational {
    type Err = Error;

    /// Accepts `7`, `-2.25`, `3/4` and mixed fractions such as `1 1/2`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::from(ConfigError::InvalidNumber(s.to_string()));

        if let Some((whole, fract)) = s.split_once(char::is_whitespace) {
            let whole: Rational = whole.parse()?;
            let fract: Rational = fract.trim().parse()?;
            if !whole.is_integer() || fract.is_negative() || fract.is_integer() {
                return Err(invalid());
            }
            return Ok(if whole.is_negative() {
                whole - fract
            } else {
                whole + fract
            });
        }

        if let Some((numer, denom)) = s.split_once('/') {
            let numer: BigInt = numer.trim().parse().map_err(|_| invalid())?;
            let denom: BigInt = denom.trim().parse().map_err(|_| invalid())?;
            return Rational::new(numer, denom);
        }

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(invalid());
        }
        let digits = format!("{int_part}{frac_part}");
        let numer: BigInt = digits.parse().map_err(|_| invalid())?;
        let denom = BigInt::from(10u32).pow(frac_part.len() as u32);
        let value = Rational::new(numer, denom)?;
        Ok(if negative { -value } else { value })
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self::from_integer(n)
    }
}

impl From<i32> for Rational {
    fn from(n: i32) -> Self {
        Self::from_integer(n)
    }
}

impl From<BigInt> for Rational {
    fn from(n: BigInt) -> Self {
        Self::from_integer(n)
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                Rational(self.0.$method(rhs.0))
            }
        }

        impl<'a> $trait<&'a Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: &'a Rational) -> Rational {
                Rational(self.0.$method(&rhs.0))
            }
        }

        impl<'a> $trait<Rational> for &'a Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                Rational((&self.0).$method(rhs.0))
            }
        }

        impl<'a, 'b> $trait<&'b Rational> for &'a Rational {
            type Output = Rational;
            fn $method(self, rhs: &'b Rational) -> Rational {
                Rational((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl Neg for Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        Rational(-self.0)
    }
}

impl Neg for &Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        Rational(-&self.0)
    }
}

impl AddAssign<Rational> for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        self.0 += rhs.0;
    }
}

impl AddAssign<&Rational> for Rational {
    fn add_assign(&mut self, rhs: &Rational) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<Rational> for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        self.0 -= rhs.0;
    }
}

impl SubAssign<&Rational> for Rational {
    fn sub_assign(&mut self, rhs: &Rational) {
        self.0 -= &rhs.0;
    }
}

impl Sum for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Self {
        iter.fold(Rational::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        iter.fold(Rational::zero(), |acc, x| acc + x)
    }
}
