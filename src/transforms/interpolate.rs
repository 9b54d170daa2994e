//! Linear interpolation of frame attributes by instance number.
//!
//! Only the two anchor frames of a stack carry real metadata; every frame in
//! between gets values interpolated from them. All kinds use
//! `v1 * (1 - t) + v2 * t`, which returns each anchor's value exactly at its
//! own instance number.

use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// A value attached to an instance number.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor<V> {
    /// Instance number of the frame the value was read from.
    pub instance_number: i32,
    /// The value itself.
    pub value: V,
}

impl<V> Anchor<V> {
    /// Pair `value` with `instance_number`.
    pub fn new(instance_number: i32, value: V) -> Self {
        Self {
            instance_number,
            value,
        }
    }
}

/// DICOM `DA` + `TM` pair, e.g. `("20240131", "093015.250")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    /// `YYYYMMDD`
    pub date: String,
    /// `HHMMSS` with an optional fraction of up to six digits.
    pub time: String,
}

impl DateTime {
    /// Build from date and time strings.
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
        }
    }

    /// Digits after the decimal point of the time string.
    pub fn fraction_digits(&self) -> usize {
        self.time
            .trim()
            .split_once('.')
            .map_or(0, |(_, frac)| frac.len())
    }

    fn parse(&self) -> Result<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y%m%d")
            .map_err(|e| Error::invalid("Date", format!("'{}': {e}", self.date)))?;

        let time = self.time.trim();
        let (whole, frac) = time.split_once('.').unwrap_or((time, ""));
        let hms = NaiveTime::parse_from_str(whole, "%H%M%S")
            .map_err(|e| Error::invalid("Time", format!("'{}': {e}", self.time)))?;
        if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid("Time", format!("bad fraction in '{}'", self.time)));
        }
        let micros = if frac.is_empty() {
            0
        } else {
            frac.parse::<i64>()
                .map_err(|e| Error::invalid("Time", e.to_string()))?
                * 10_i64.pow(6 - frac.len() as u32)
        };
        Ok(date.and_time(hms) + Duration::microseconds(micros))
    }

    fn format(value: NaiveDateTime, digits: usize) -> Self {
        let date = value.format("%Y%m%d").to_string();
        let mut time = value.format("%H%M%S").to_string();
        if digits > 0 {
            let micros = value.nanosecond() / 1_000;
            let frac = micros / 10_u32.pow(6 - digits as u32);
            time.push_str(&format!(".{frac:0digits$}"));
        }
        Self { date, time }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

/// Interpolable attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Single number, e.g. `SliceLocation`.
    Scalar(f64),
    /// Fixed-arity vector, e.g. `ImagePositionPatient`.
    Vector(Vec<f64>),
    /// Combined date and time, e.g. `AcquisitionDate` + `AcquisitionTime`.
    DateTime(DateTime),
}

/// Position of `target` between the anchor instance numbers: 0 at the
/// first, 1 at the second.
pub fn fraction(first: i32, second: i32, target: i32) -> Result<f64> {
    if first == second {
        return Err(Error::DegenerateGeometry(format!(
            "both anchors have instance number {first}"
        )));
    }
    let (first, second, target) = (i64::from(first), i64::from(second), i64::from(target));
    Ok((target - first) as f64 / (second - first) as f64)
}

#[inline]
fn lerp(v1: f64, v2: f64, t: f64) -> f64 {
    v1 * (1.0 - t) + v2 * t
}

/// Interpolate a scalar.
pub fn interpolate_scalar(a1: &Anchor<f64>, a2: &Anchor<f64>, target: i32) -> Result<f64> {
    let t = fraction(a1.instance_number, a2.instance_number, target)?;
    Ok(lerp(a1.value, a2.value, t))
}

/// Interpolate a vector elementwise.
pub fn interpolate_vector(
    a1: &Anchor<Vec<f64>>,
    a2: &Anchor<Vec<f64>>,
    target: i32,
) -> Result<Vec<f64>> {
    let t = fraction(a1.instance_number, a2.instance_number, target)?;
    if a1.value.len() != a2.value.len() {
        return Err(Error::ShapeMismatch(format!(
            "anchor vectors have {} and {} components",
            a1.value.len(),
            a2.value.len()
        )));
    }
    Ok(a1
        .value
        .iter()
        .zip(&a2.value)
        .map(|(&v1, &v2)| lerp(v1, v2, t))
        .collect())
}

/// Interpolate a date-time. The result keeps the fractional-second
/// precision of the first anchor.
pub fn interpolate_datetime(
    a1: &Anchor<DateTime>,
    a2: &Anchor<DateTime>,
    target: i32,
) -> Result<DateTime> {
    let t = fraction(a1.instance_number, a2.instance_number, target)?;
    let digits = a1.value.fraction_digits().min(6);
    let start = a1.value.parse()?;
    let end = a2.value.parse()?;

    let span = (end - start)
        .num_microseconds()
        .ok_or_else(|| Error::invalid("Time", "anchor span overflows"))?;
    let unit = 10_f64.powi(6 - digits as i32);
    let offset = (lerp(0.0, span as f64, t) / unit).round() * unit;
    let instant = start
        .checked_add_signed(Duration::microseconds(offset as i64))
        .ok_or_else(|| Error::invalid("Time", format!("instance {target} is out of range")))?;
    Ok(DateTime::format(instant, digits))
}

/// Interpolate any [`Value`]; both anchors must hold the same kind.
pub fn interpolate(a1: &Anchor<Value>, a2: &Anchor<Value>, target: i32) -> Result<Value> {
    let (n1, n2) = (a1.instance_number, a2.instance_number);
    match (&a1.value, &a2.value) {
        (Value::Scalar(v1), Value::Scalar(v2)) => {
            interpolate_scalar(&Anchor::new(n1, *v1), &Anchor::new(n2, *v2), target)
                .map(Value::Scalar)
        }
        (Value::Vector(v1), Value::Vector(v2)) => interpolate_vector(
            &Anchor::new(n1, v1.clone()),
            &Anchor::new(n2, v2.clone()),
            target,
        )
        .map(Value::Vector),
        (Value::DateTime(v1), Value::DateTime(v2)) => interpolate_datetime(
            &Anchor::new(n1, v1.clone()),
            &Anchor::new(n2, v2.clone()),
            target,
        )
        .map(Value::DateTime),
        (v1, v2) => Err(Error::Configuration(format!(
            "cannot interpolate between {v1:?} and {v2:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar() {
        let a1 = Anchor::new(1, 10.0);
        let a2 = Anchor::new(5, 18.0);
        assert_eq!(interpolate_scalar(&a1, &a2, 1).unwrap(), 10.0);
        assert_eq!(interpolate_scalar(&a1, &a2, 3).unwrap(), 14.0);
        assert_eq!(interpolate_scalar(&a1, &a2, 5).unwrap(), 18.0);
        // extrapolation follows the same line
        assert_eq!(interpolate_scalar(&a1, &a2, 7).unwrap(), 22.0);
    }

    #[test]
    fn test_degenerate_anchors() {
        let a = Anchor::new(4, 1.0);
        assert!(matches!(
            interpolate_scalar(&a, &a.clone(), 4),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_extreme_instance_numbers() {
        let a1 = Anchor::new(-10, 0.0);
        let a2 = Anchor::new(i32::MAX, 1.0);
        let v = interpolate_scalar(&a1, &a2, 5).unwrap();
        assert!(v.is_finite() && v > 0.0 && v < 1e-8);
        assert_eq!(interpolate_scalar(&a1, &a2, i32::MAX).unwrap(), 1.0);
        assert_eq!(fraction(i32::MIN, i32::MAX, i32::MAX).unwrap(), 1.0);

        let d1 = Anchor::new(1, DateTime::new("20240131", "093000"));
        let d2 = Anchor::new(2, DateTime::new("20240131", "093010"));
        assert!(interpolate_datetime(&d1, &d2, i32::MAX).is_ok());
        assert!(interpolate_datetime(&d1, &d2, i32::MIN).is_ok());
    }

    #[test]
    fn test_vector() {
        let a1 = Anchor::new(1, vec![-100.0, -90.0, 0.0]);
        let a2 = Anchor::new(10, vec![-100.0, -90.0, 18.0]);
        assert_eq!(
            interpolate_vector(&a1, &a2, 4).unwrap(),
            vec![-100.0, -90.0, 6.0]
        );
        let short = Anchor::new(10, vec![1.0]);
        assert!(matches!(
            interpolate_vector(&a1, &short, 4),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_datetime_keeps_fraction_digits() {
        let a1 = Anchor::new(1, DateTime::new("20240131", "093000.000"));
        let a2 = Anchor::new(3, DateTime::new("20240131", "093001.500"));
        let mid = interpolate_datetime(&a1, &a2, 2).unwrap();
        assert_eq!(mid, DateTime::new("20240131", "093000.750"));
        assert_eq!(interpolate_datetime(&a1, &a2, 1).unwrap(), a1.value);
        assert_eq!(interpolate_datetime(&a1, &a2, 3).unwrap(), a2.value);
    }

    #[test]
    fn test_datetime_without_fraction() {
        let a1 = Anchor::new(1, DateTime::new("20240131", "235959"));
        let a2 = Anchor::new(3, DateTime::new("20240201", "000001"));
        let mid = interpolate_datetime(&a1, &a2, 2).unwrap();
        assert_eq!(mid, DateTime::new("20240201", "000000"));
    }

    #[test]
    fn test_datetime_mixed_precision() {
        let a1 = Anchor::new(1, DateTime::new("20240131", "120000"));
        let a2 = Anchor::new(2, DateTime::new("20240131", "120002.5"));
        // anchor 1 has no fraction, so neither does the result
        let out = interpolate_datetime(&a1, &a2, 2).unwrap();
        assert_eq!(out.time, "120003");
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        let a1 = Anchor::new(1, DateTime::new("2024-01-31", "120000"));
        let a2 = Anchor::new(2, DateTime::new("20240131", "120000"));
        assert!(matches!(
            interpolate_datetime(&a1, &a2, 2),
            Err(Error::InvalidAttribute { .. })
        ));
        let a1 = Anchor::new(1, DateTime::new("20240131", "1200xx"));
        assert!(interpolate_datetime(&a1, &a2, 2).is_err());
    }

    #[test]
    fn test_mixed_kinds() {
        let a1 = Anchor::new(1, Value::Scalar(1.0));
        let a2 = Anchor::new(2, Value::Vector(vec![1.0]));
        assert!(matches!(
            interpolate(&a1, &a2, 1),
            Err(Error::Configuration(_))
        ));
        let a2 = Anchor::new(3, Value::Scalar(5.0));
        assert_eq!(interpolate(&a1, &a2, 2).unwrap(), Value::Scalar(3.0));
    }
}
