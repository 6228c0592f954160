/// due-date labelling for schedule months; display only
use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// fixed-date public holidays as (month, day)
const DEFAULT_HOLIDAYS: [(u32, u32); 9] = [
    (1, 1),
    (1, 2),
    (1, 7),
    (2, 23),
    (3, 8),
    (5, 1),
    (5, 9),
    (6, 12),
    (11, 4),
];

/// weekends plus fixed public holidays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    pub fixed_holidays: Vec<(u32, u32)>,
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self {
            fixed_holidays: DEFAULT_HOLIDAYS.to_vec(),
        }
    }
}

impl HolidayCalendar {
    /// calendar with weekends only
    pub fn weekends_only() -> Self {
        Self {
            fixed_holidays: Vec::new(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            || self.fixed_holidays.contains(&(date.month(), date.day()))
    }

    /// closest working day strictly before `date`
    pub fn previous_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date - Duration::days(1);
        while self.is_holiday(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// `date` itself when it is a working day, otherwise the previous working day
    pub fn settlement_date(&self, date: NaiveDate) -> NaiveDate {
        if self.is_holiday(date) {
            self.previous_workday(date)
        } else {
            date
        }
    }
}

/// due date of `month` (1-based) counted from the anchor's calendar month
pub fn due_date(anchor: NaiveDate, month: u32, payment_day: u8) -> Result<NaiveDate> {
    if month == 0 {
        return Err(LedgerError::invalid_parameter("month", "months are numbered from 1"));
    }
    NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), payment_day as u32)
        .and_then(|first| first.checked_add_months(Months::new(month - 1)))
        .ok_or_else(|| {
            LedgerError::invalid_parameter(
                "payment_day",
                format!("no day {} in month {} after {}", payment_day, month, anchor),
            )
        })
}
