use std::{fmt, ops::Sub};

/// A discrete point in time, such as a day number. A difference of `1`
/// represents one unit of time for the Wiener process linking a player's
/// ratings on consecutive time steps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeStep(pub i64);

impl From<TimeStep> for i64 {
    #[inline]
    fn from(TimeStep(step): TimeStep) -> i64 {
        step
    }
}

impl From<i64> for TimeStep {
    #[inline]
    fn from(step: i64) -> TimeStep {
        TimeStep(step)
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TimeStep {
    #[inline]
    pub fn elapsed_since(self, since: TimeStep) -> Steps {
        self - since
    }
}

/// Saturates at the bounds of `i64` for time steps that are too far apart.
impl Sub for TimeStep {
    type Output = Steps;

    #[inline]
    fn sub(self, rhs: TimeStep) -> Steps {
        Steps(self.0.saturating_sub(rhs.0))
    }
}

/// Number of time units between two time steps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i64);

impl From<Steps> for f64 {
    #[inline]
    fn from(Steps(steps): Steps) -> f64 {
        steps as f64
    }
}

impl Steps {
    #[must_use]
    #[inline]
    pub fn abs(self) -> Steps {
        Steps(self.0.saturating_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        assert_eq!(TimeStep(7).elapsed_since(TimeStep(3)), Steps(4));
        assert_eq!(TimeStep(3).elapsed_since(TimeStep(7)).abs(), Steps(4));
        assert_eq!(f64::from(TimeStep(180) - TimeStep(1)), 179.0);
    }

    #[test]
    fn test_extreme_time_steps_saturate() {
        assert_eq!(TimeStep(i64::MAX) - TimeStep(i64::MIN), Steps(i64::MAX));
        assert_eq!(TimeStep(i64::MIN) - TimeStep(i64::MAX), Steps(i64::MIN));
        assert_eq!(Steps(i64::MIN).abs(), Steps(i64::MAX));
    }
}
