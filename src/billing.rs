use std::fmt;

use chrono::{Datelike, Days, NaiveDate};

use crate::calendar::DateBoundaries;

/// An inclusive range of calendar days covered by one timesheet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Period {
    pub from: NaiveDate,
    pub until: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, until: NaiveDate) -> Self {
        debug_assert!(from <= until);
        Self { from, until }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} to {}",
            self.from.format("%B"),
            self.from.day(),
            self.until.day()
        )
    }
}

/// Candidate semi-monthly billing periods around `today`, oldest first.
///
/// Past the 15th the current month's two halves are offered. Up to and
/// including the 15th the back half of the previous month is offered as
/// well, since that period is usually the one still waiting to be billed.
pub fn timesheet_periods(today: NaiveDate) -> Vec<Period> {
    let first = today
        .start_of_month()
        .expect("the first of a valid month is a valid date");
    let mid = first
        .with_day(15)
        .expect("the 15th of a valid month is a valid date");
    let sixteenth = first
        .with_day(16)
        .expect("the 16th of a valid month is a valid date");
    let last = today
        .end_of_month()
        .expect("end_of_month is defined for all timesheet dates");

    let mut periods = Vec::new();
    if today.day() <= 15 {
        let prev_last = first
            .checked_sub_days(Days::new(1))
            .expect("the day before the first of a valid month is valid");
        let prev_sixteenth = prev_last
            .with_day(16)
            .expect("the 16th of a valid month is a valid date");
        periods.push(Period::new(prev_sixteenth, prev_last));
    }
    periods.push(Period::new(first, mid));
    periods.push(Period::new(sixteenth, last));
    periods
}
