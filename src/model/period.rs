//! The (month, year) pair that scopes every time-boxed collection query.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Identifies the scope of a time-boxed collection query: one calendar month.
///
/// Two keys are equal iff both fields match. Synchronized views compare keys
/// by value to decide whether a parameter change must restart the
/// fetch+subscribe pipeline; setting an equal key is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Calendar month, 1 through 12.
    pub month: u32,
    pub year: i32,
}

impl PeriodKey {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }

    /// The current month according to the local clock.
    pub fn current() -> Self {
        let now = chrono::Local::now();
        Self {
            month: now.month(),
            year: now.year(),
        }
    }
}

impl Display for PeriodKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_value() {
        assert_eq!(PeriodKey::new(3, 2025), PeriodKey::new(3, 2025));
        assert_ne!(PeriodKey::new(3, 2025), PeriodKey::new(4, 2025));
        assert_ne!(PeriodKey::new(3, 2025), PeriodKey::new(3, 2024));
    }

    #[test]
    fn test_display() {
        assert_eq!(PeriodKey::new(3, 2025).to_string(), "2025-03");
    }
}
