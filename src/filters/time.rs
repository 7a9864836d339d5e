use ::time::Date;
use serde::{Deserialize, Serialize};

use super::{Clause, Field, Op};
use crate::clock::years_before;
use crate::config::MAX_YEARS_BACK;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFilter {
    pub max_days_on_market: Option<u32>,
    pub listed_after: Option<Date>,
    pub has_open_house: Option<bool>,
}

impl TimeFilter {
    pub(crate) fn active_count(&self) -> usize {
        usize::from(self.max_days_on_market.is_some())
            + usize::from(self.listed_after.is_some())
            + usize::from(self.has_open_house.is_some())
    }
}

pub fn build_time_filter(filter: &TimeFilter) -> Vec<Clause> {
    let mut clauses = Vec::new();
    if let Some(max) = filter.max_days_on_market {
        clauses.push(Clause::lte(Field::DaysOnMarket, max));
    }
    if let Some(after) = filter.listed_after {
        clauses.push(Clause::cmp(Field::OnMarketDate, Op::Gt, after));
    }
    match filter.has_open_house {
        Some(true) => clauses.push(Clause::NotNull(Field::OpenHouseDate)),
        Some(false) => clauses.push(Clause::IsNull(Field::OpenHouseDate)),
        None => {}
    }
    clauses
}

// ---------------------------------------------------------------------------
// Closed-sale window
// ---------------------------------------------------------------------------

/// Close-date window for historical queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// Everything closed on or after `today - years`.
    YearsBack(u32),
    Range {
        start: Option<Date>,
        end: Option<Date>,
    },
}

impl TimeWindow {
    /// Resolve to explicit `(start, end)` bounds using the caller's notion of today.
    pub fn resolve(self, today: Date) -> (Option<Date>, Option<Date>) {
        match self {
            TimeWindow::YearsBack(years) => (Some(years_before(today, years)), None),
            TimeWindow::Range { start, end } => (start, end),
        }
    }

    pub fn clauses(self, today: Date) -> Vec<Clause> {
        let (start, end) = self.resolve(today);
        let mut clauses = Vec::new();
        if let Some(start) = start {
            clauses.push(Clause::gte(Field::CloseDate, start));
        }
        if let Some(end) = end {
            clauses.push(Clause::lte(Field::CloseDate, end));
        }
        clauses
    }

    pub(crate) fn validate(self, errors: &mut Vec<String>) {
        match self {
            TimeWindow::YearsBack(years) if years > MAX_YEARS_BACK => {
                errors.push(format!("years back ({years}) exceeds {MAX_YEARS_BACK}"));
            }
            TimeWindow::Range {
                start: Some(start),
                end: Some(end),
            } if start > end => {
                errors.push(format!("close date window: start ({start}) is after end ({end})"));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::time::macros::date;

    #[test]
    fn years_back_resolves_against_injected_today() {
        let window = TimeWindow::YearsBack(2);
        assert_eq!(window.resolve(date!(2025 - 07 - 01)), (Some(date!(2023 - 07 - 01)), None));
        assert_eq!(
            window.clauses(date!(2025 - 07 - 01)),
            vec![Clause::gte(Field::CloseDate, date!(2023 - 07 - 01))]
        );
    }

    #[test]
    fn open_house_flag_maps_to_null_checks() {
        let with = TimeFilter {
            has_open_house: Some(true),
            ..Default::default()
        };
        assert_eq!(build_time_filter(&with), vec![Clause::NotNull(Field::OpenHouseDate)]);
        let without = TimeFilter {
            has_open_house: Some(false),
            ..Default::default()
        };
        assert_eq!(build_time_filter(&without), vec![Clause::IsNull(Field::OpenHouseDate)]);
    }

    #[test]
    fn inverted_range_is_reported() {
        let mut errors = Vec::new();
        TimeWindow::Range {
            start: Some(date!(2024 - 02 - 01)),
            end: Some(date!(2024 - 01 - 01)),
        }
            .validate(&mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn years_back_is_capped() {
        let mut errors = Vec::new();
        TimeWindow::YearsBack(MAX_YEARS_BACK).validate(&mut errors);
        assert!(errors.is_empty());
        TimeWindow::YearsBack(u32::MAX).validate(&mut errors);
        assert_eq!(errors.len(), 1);
    }
}
