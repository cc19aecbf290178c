// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_RATING_MIN: u8 = 1;
pub const DEFAULT_RATING_MAX: u8 = 5;

/// Inclusive range of plaintexts a contract accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDomain {
    pub min: u32,
    pub max: u32,
}

impl ScoreDomain {
    pub fn new(min: u32, max: u32) -> Result<Self, FlowError> {
        if min > max {
            return Err(FlowError::Validation(format!(
                "Score range {min}..{max} is empty"
            )));
        }
        Ok(Self { min, max })
    }

    /// Option indices of a poll: `0..=options-1`
    pub fn vote(options: u8) -> Result<Self, FlowError> {
        if options == 0 {
            return Err(FlowError::Validation(
                "Poll has no options to vote for".to_string(),
            ));
        }
        Ok(Self {
            min: 0,
            max: options as u32 - 1,
        })
    }

    pub fn rating(min: u8, max: u8) -> Result<Self, FlowError> {
        Self::new(min as u32, max as u32)
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn validate(&self, value: u32) -> Result<u32, FlowError> {
        if !self.contains(value) {
            return Err(FlowError::Validation(format!(
                "Value {value} is outside the allowed range {self}"
            )));
        }
        Ok(value)
    }

    /// Number of distinct values
    pub fn width(&self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

impl Default for ScoreDomain {
    fn default() -> Self {
        Self {
            min: DEFAULT_RATING_MIN as u32,
            max: DEFAULT_RATING_MAX as u32,
        }
    }
}

impl fmt::Display for ScoreDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vote_domain_is_zero_based() {
        let d = ScoreDomain::vote(3).unwrap();
        assert!(d.contains(0));
        assert!(d.contains(2));
        assert!(!d.contains(3));
        assert!(ScoreDomain::vote(0).is_err());
    }

    #[test]
    fn test_default_rating() {
        let d = ScoreDomain::default();
        assert_eq!((d.min, d.max), (1, 5));
        assert!(d.validate(0).is_err());
        assert_eq!(d.validate(5).unwrap(), 5);
        assert_eq!(d.width(), 5);
    }

    proptest! {
        #[test]
        fn validate_agrees_with_bounds(min in 0u8..=255, max in 0u8..=255, v in 0u32..300) {
            prop_assume!(min <= max);
            let d = ScoreDomain::rating(min, max).unwrap();
            let ok = d.validate(v).is_ok();
            prop_assert_eq!(ok, v >= min as u32 && v <= max as u32);
        }
    }
}
