use chrono::{Datelike, Days, Months, NaiveDate};

pub trait DateBoundaries {
    fn start_of_month(&self) -> Option<Self>
    where
        Self: Sized;

    fn end_of_month(&self) -> Option<Self>
    where
        Self: Sized;
}

impl DateBoundaries for NaiveDate {
    fn start_of_month(&self) -> Option<Self> {
        self.with_day(1)
    }

    fn end_of_month(&self) -> Option<Self> {
        self.checked_add_months(Months::new(1))
            .and_then(|d| d.with_day(1))
            .and_then(|d| d.checked_sub_days(Days::new(1)))
    }
}
