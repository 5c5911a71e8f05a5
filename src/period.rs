//! Calendar-month sequences over a half-open date range.

use crate::utils::{first_of_month, next_month};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The months `[from, to)`, with `from` aligned to day 1.
///
/// Holds no iteration state: every call to [`MonthPeriod::months`] starts a
/// fresh sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPeriod {
    from: NaiveDate,
    to: NaiveDate,
}

impl MonthPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: first_of_month(from),
            to,
        }
    }

    /// The single month containing `date`.
    pub fn single(date: NaiveDate) -> Self {
        let from = first_of_month(date);
        Self {
            from,
            to: next_month(from),
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn months(&self) -> MonthIter {
        MonthIter {
            next: self.from,
            to: self.to,
        }
    }

    pub fn len(&self) -> usize {
        self.months().count()
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        first_of_month(date) >= self.from && first_of_month(date) < self.to
    }
}

impl IntoIterator for MonthPeriod {
    type Item = NaiveDate;
    type IntoIter = MonthIter;

    fn into_iter(self) -> MonthIter {
        self.months()
    }
}

impl IntoIterator for &MonthPeriod {
    type Item = NaiveDate;
    type IntoIter = MonthIter;

    fn into_iter(self) -> MonthIter {
        self.months()
    }
}

#[derive(Debug, Clone)]
pub struct MonthIter {
    next: NaiveDate,
    to: NaiveDate,
}

impl Iterator for MonthIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.next >= self.to {
            return None;
        }
        let current = self.next;
        let following = next_month(current);
        // next_month saturates at the calendar limit; stop rather than loop.
        self.next = if following > current { following } else { self.to };
        Some(current)
    }
}
