//! Reducers used to collapse a bucket of readings into one value
//!
//! Contains:
//! - `Reducer`: the rule chosen per field (count, sum, mean, max, min)
//! - `Accumulator`: streaming state for one bucket

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation rule applied to the readings of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Number of readings
    Count,
    /// Sum of readings
    Sum,
    /// Arithmetic mean of readings
    Mean,
    /// Largest reading
    Max,
    /// Smallest reading
    Min,
}

impl Reducer {
    /// Reduce a slice in one call. Empty buckets yield `None` except for
    /// `Count`, which yields zero.
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        let mut acc = Accumulator::new(self);
        for &value in values {
            acc.update(value);
        }
        acc.value()
    }

    /// Lowercase name of the rule
    pub fn name(self) -> &'static str {
        match self {
            Reducer::Count => "count",
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Max => "max",
            Reducer::Min => "min",
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reducer {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "count" => Ok(Reducer::Count),
            "sum" => Ok(Reducer::Sum),
            "mean" | "avg" => Ok(Reducer::Mean),
            "max" => Ok(Reducer::Max),
            "min" => Ok(Reducer::Min),
            other => Err(MathError::InvalidInput(format!(
                "Unknown reducer '{}'",
                other
            ))),
        }
    }
}

/// Streaming accumulator for a single bucket
#[derive(Debug, Clone)]
pub struct Accumulator {
    reducer: Reducer,
    count: usize,
    sum: f64,
    max: f64,
    min: f64,
}

impl Accumulator {
    /// Create an empty accumulator for the given rule
    pub fn new(reducer: Reducer) -> Self {
        Self {
            reducer,
            count: 0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }

    /// Add a reading to the bucket
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    /// Number of readings seen so far
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the bucket is still empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current reduced value
    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            return match self.reducer {
                Reducer::Count => Some(0.0),
                _ => None,
            };
        }

        Some(match self.reducer {
            Reducer::Count => self.count as f64,
            Reducer::Sum => self.sum,
            Reducer::Mean => self.sum / self.count as f64,
            Reducer::Max => self.max,
            Reducer::Min => self.min,
        })
    }

    /// Reset the bucket, keeping the rule
    pub fn reset(&mut self) {
        *self = Self::new(self.reducer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_each_reducer() {
        let readings = [3.0, 1.5, 7.0, 2.5];

        assert_eq!(Reducer::Count.reduce(&readings), Some(4.0));
        assert_eq!(Reducer::Sum.reduce(&readings), Some(14.0));
        assert_relative_eq!(Reducer::Mean.reduce(&readings).unwrap(), 3.5);
        assert_eq!(Reducer::Max.reduce(&readings), Some(7.0));
        assert_eq!(Reducer::Min.reduce(&readings), Some(1.5));
    }

    #[test]
    fn test_empty_bucket() {
        assert_eq!(Reducer::Count.reduce(&[]), Some(0.0));
        assert_eq!(Reducer::Sum.reduce(&[]), None);
        assert_eq!(Reducer::Max.reduce(&[]), None);
    }

    #[test]
    fn test_accumulator_reset() {
        let mut acc = Accumulator::new(Reducer::Max);
        acc.update(4.0);
        assert_eq!(acc.len(), 1);
        acc.reset();
        assert!(acc.is_empty());
        assert_eq!(acc.value(), None);
    }

    #[test]
    fn test_parse_reducer() {
        assert_eq!("SUM".parse::<Reducer>().unwrap(), Reducer::Sum);
        assert_eq!("avg".parse::<Reducer>().unwrap(), Reducer::Mean);
        assert!("median".parse::<Reducer>().is_err());
    }
}
