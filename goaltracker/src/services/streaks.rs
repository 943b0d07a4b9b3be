//! Streak derivation
//!
//! A streak is the number of consecutive periods, counted back from today,
//! that contain at least one progress entry. The period is a day for daily
//! goals, an ISO week (Monday start) for weekly goals and a calendar year for
//! yearly goals. An empty current period is skipped, so a streak stays alive
//! until the period after the last entry has fully passed.

use crate::database::GoalType;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current: u32,
    pub last_entry: Option<NaiveDate>,
}

/// First day of the period containing `date`
pub fn period_start(goal_type: GoalType, date: NaiveDate) -> NaiveDate {
    match goal_type {
        GoalType::Daily => date,
        GoalType::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        GoalType::Yearly => date.with_ordinal(1).unwrap_or(date),
    }
}

fn previous_period(goal_type: GoalType, start: NaiveDate) -> Option<NaiveDate> {
    start
        .pred_opt()
        .map(|last_day| period_start(goal_type, last_day))
}

/// Streak for entries logged on `dates`, evaluated on `today`.
/// Entries dated after `today` are ignored.
pub fn compute_streak<I>(goal_type: GoalType, dates: I, today: NaiveDate) -> Streak
where
    I: IntoIterator<Item = NaiveDate>,
{
    let dates: Vec<NaiveDate> = dates.into_iter().filter(|d| *d <= today).collect();
    let periods: BTreeSet<NaiveDate> = dates
        .iter()
        .map(|d| period_start(goal_type, *d))
        .collect();

    let mut cursor = Some(period_start(goal_type, today));
    if let Some(current) = cursor {
        if !periods.contains(&current) {
            cursor = previous_period(goal_type, current);
        }
    }

    let mut count = 0;
    while let Some(period) = cursor.filter(|p| periods.contains(p)) {
        count += 1;
        cursor = previous_period(goal_type, period);
    }

    Streak {
        current: count,
        last_entry: dates.into_iter().max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_streak_counts_back_from_today() {
        let today = date(2024, 3, 10);
        let dates = vec![date(2024, 3, 10), date(2024, 3, 9), date(2024, 3, 8), date(2024, 3, 6)];

        let streak = compute_streak(GoalType::Daily, dates, today);
        assert_eq!(streak.current, 3);
        assert_eq!(streak.last_entry, Some(today));
    }

    #[test]
    fn test_empty_today_is_skipped() {
        let today = date(2024, 3, 10);
        let dates = vec![date(2024, 3, 9), date(2024, 3, 8)];

        assert_eq!(compute_streak(GoalType::Daily, dates, today).current, 2);
    }

    #[test]
    fn test_gap_before_yesterday_breaks_streak() {
        let today = date(2024, 3, 10);
        let dates = vec![date(2024, 3, 8), date(2024, 3, 7)];

        let streak = compute_streak(GoalType::Daily, dates, today);
        assert_eq!(streak.current, 0);
        assert_eq!(streak.last_entry, Some(date(2024, 3, 8)));
    }

    #[test]
    fn test_weekly_periods_start_monday() {
        // 2024-03-11 is a Monday
        assert_eq!(period_start(GoalType::Weekly, date(2024, 3, 17)), date(2024, 3, 11));
        assert_eq!(period_start(GoalType::Weekly, date(2024, 3, 11)), date(2024, 3, 11));

        let today = date(2024, 3, 13);
        let dates = vec![date(2024, 3, 4), date(2024, 2, 26), date(2024, 3, 1)];
        // Current week empty, previous two weeks covered
        assert_eq!(compute_streak(GoalType::Weekly, dates, today).current, 2);
    }

    #[test]
    fn test_yearly_streak() {
        let today = date(2024, 6, 1);
        let dates = vec![date(2024, 1, 5), date(2023, 12, 31), date(2021, 5, 5)];

        assert_eq!(compute_streak(GoalType::Yearly, dates, today).current, 2);
    }

    #[test]
    fn test_future_entries_ignored() {
        let today = date(2024, 3, 10);
        let streak = compute_streak(GoalType::Daily, vec![date(2024, 3, 11)], today);

        assert_eq!(streak, Streak::default());
    }

    #[test]
    fn test_no_entries() {
        let streak = compute_streak(GoalType::Daily, Vec::new(), date(2024, 3, 10));
        assert_eq!(streak.current, 0);
        assert!(streak.last_entry.is_none());
    }
}
