//! Spaced-repetition scheduler
//!
//! The pure update rule applied to a card's scheduling state after each
//! review. Ease drifts toward the grade (floored at 1.3), the interval grows
//! by 50% on successful recall and halves otherwise (floored at 1 day).
//! Due-date computation is a thin wrapper around the numeric rule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ease factor floor. Prevents runaway shortening of future intervals.
pub const MIN_EASE: f64 = 1.3;

/// Review grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Grade {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Grades above the neutral midpoint count as successful recall
    pub fn is_success(&self) -> bool {
        self.as_u8() > 2
    }
}

impl TryFrom<i64> for Grade {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, i64> {
        match value {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            other => Err(other),
        }
    }
}

/// The numeric scheduling state the update rule operates on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrsSnapshot {
    pub ease: f64,
    pub interval_days: i32,
}

impl Default for SrsSnapshot {
    fn default() -> Self {
        Self {
            ease: 2.5,
            interval_days: 0,
        }
    }
}

/// Apply a review grade to a scheduling state.
///
/// - `ease' = max(1.3, ease + (grade - 2.5) * 0.1)`
/// - `interval' = max(1, interval * (success ? 1.5 : 0.5))`, rounded
///   half-away-from-zero to keep integer day storage
///
/// Total over all four grades; callers validate the grade at the boundary.
pub fn grade(state: &SrsSnapshot, grade: Grade) -> SrsSnapshot {
    let ease = (state.ease + (grade.as_u8() as f64 - 2.5) * 0.1).max(MIN_EASE);

    let factor = if grade.is_success() { 1.5 } else { 0.5 };
    let interval_days = (state.interval_days as f64 * factor).max(1.0).round() as i32;

    SrsSnapshot {
        ease,
        interval_days,
    }
}

/// Next due date: today plus the new interval
pub fn next_due(today: NaiveDate, interval_days: i32) -> NaiveDate {
    today + chrono::Duration::days(interval_days as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_again_on_fresh_card() {
        // ease 2.5, interval 1, grade Again -> ease 2.35, interval stays 1
        let state = SrsSnapshot {
            ease: 2.5,
            interval_days: 1,
        };
        let next = grade(&state, Grade::Again);
        assert!(approx(next.ease, 2.35));
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_good_grows_interval() {
        let state = SrsSnapshot {
            ease: 2.5,
            interval_days: 4,
        };
        let next = grade(&state, Grade::Good);
        assert!(approx(next.ease, 2.55));
        assert_eq!(next.interval_days, 6);
    }

    #[test]
    fn test_hard_halves_interval() {
        let state = SrsSnapshot {
            ease: 2.0,
            interval_days: 8,
        };
        let next = grade(&state, Grade::Hard);
        assert!(approx(next.ease, 1.95));
        assert_eq!(next.interval_days, 4);
    }

    #[test]
    fn test_easy_raises_ease() {
        let state = SrsSnapshot {
            ease: 2.5,
            interval_days: 2,
        };
        let next = grade(&state, Grade::Easy);
        assert!(approx(next.ease, 2.65));
        assert_eq!(next.interval_days, 3);
    }

    #[test]
    fn test_ease_floor_holds_for_all_grades() {
        // Property: ease >= 1.3 and interval >= 1 for any input and grade
        let inputs = [
            SrsSnapshot { ease: 1.3, interval_days: 0 },
            SrsSnapshot { ease: 1.31, interval_days: 1 },
            SrsSnapshot { ease: 2.5, interval_days: 0 },
            SrsSnapshot { ease: 3.0, interval_days: 365 },
        ];
        for state in inputs {
            for g in [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy] {
                let next = grade(&state, g);
                assert!(next.ease >= MIN_EASE, "ease {} below floor", next.ease);
                assert!(next.interval_days >= 1, "interval {} below floor", next.interval_days);
            }
        }
    }

    #[test]
    fn test_repeated_failure_converges_to_floor() {
        let mut state = SrsSnapshot {
            ease: 2.5,
            interval_days: 64,
        };
        for _ in 0..20 {
            state = grade(&state, Grade::Again);
        }
        assert!(approx(state.ease, MIN_EASE));
        assert_eq!(state.interval_days, 1);
    }

    #[test]
    fn test_grade_try_from() {
        assert_eq!(Grade::try_from(1), Ok(Grade::Again));
        assert_eq!(Grade::try_from(4), Ok(Grade::Easy));
        assert_eq!(Grade::try_from(0), Err(0));
        assert_eq!(Grade::try_from(5), Err(5));
    }

    #[test]
    fn test_next_due() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            next_due(today, 3),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
    }
}
