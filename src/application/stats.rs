use crate::domain::models::{AppSettings, PomodoroSession, Task};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategorySlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyProgress {
    pub date: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityStats {
    pub total_hours: f64,
    pub today_hours: f64,
    /// Completed work sessions over the whole history.
    pub completed_pomodoros: u32,
    pub monthly_hours: f64,
    pub monthly_goal_hours: u32,
    /// Current week, Sunday through Saturday.
    pub daily_progress: Vec<DailyProgress>,
    /// Last 30 days, oldest first.
    pub monthly_trajectory: Vec<DailyProgress>,
    pub task_distribution: Vec<CategorySlice>,
    pub streak: u32,
}

/// Pure reduction over the persisted history. Instants are bucketed into
/// calendar dates in the configured timezone; an unparsable timezone name
/// falls back to UTC. Sessions whose task was deleted count under
/// "General".
pub fn compute_stats(
    tasks: &[Task],
    history: &[PomodoroSession],
    settings: &AppSettings,
    now: DateTime<Utc>,
) -> ProductivityStats {
    let timezone: Tz = settings.timezone.parse().unwrap_or(Tz::UTC);
    let local_now = now.with_timezone(&timezone);
    let today = local_now.date_naive();

    let mut hours_by_date: HashMap<NaiveDate, f64> = HashMap::new();
    let mut hours_by_category: HashMap<String, f64> = HashMap::new();
    let mut total_hours = 0.0;
    let mut monthly_hours = 0.0;
    let mut completed_pomodoros = 0u32;

    for session in history.iter().filter(|session| session.kind.is_work()) {
        let local = session.timestamp.with_timezone(&timezone);
        let hours = f64::from(session.duration) / 3600.0;

        completed_pomodoros += 1;
        total_hours += hours;
        *hours_by_date.entry(local.date_naive()).or_default() += hours;
        if local.year() == local_now.year() && local.month() == local_now.month() {
            monthly_hours += hours;
        }

        let category = session
            .task_id
            .as_deref()
            .and_then(|task_id| tasks.iter().find(|task| task.id == task_id))
            .map(|task| task.category.clone())
            .unwrap_or_else(|| "General".to_string());
        *hours_by_category.entry(category).or_default() += hours;
    }

    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let daily_progress = (0..7)
        .map(|offset| progress_for(&hours_by_date, week_start + Duration::days(offset)))
        .collect();
    let monthly_trajectory = (0..30)
        .map(|offset| progress_for(&hours_by_date, today - Duration::days(29 - offset)))
        .collect();

    let mut task_distribution = hours_by_category
        .into_iter()
        .map(|(name, value)| CategorySlice {
            name,
            value: round_tenth(value),
        })
        .collect::<Vec<_>>();
    task_distribution.sort_by(|left, right| {
        right
            .value
            .partial_cmp(&left.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| left.name.cmp(&right.name))
    });

    ProductivityStats {
        total_hours,
        today_hours: round_tenth(hours_by_date.get(&today).copied().unwrap_or_default()),
        completed_pomodoros,
        monthly_hours,
        monthly_goal_hours: settings.monthly_goal_hours,
        daily_progress,
        monthly_trajectory,
        task_distribution,
        streak: streak_days(&hours_by_date, today),
    }
}

fn progress_for(hours_by_date: &HashMap<NaiveDate, f64>, date: NaiveDate) -> DailyProgress {
    DailyProgress {
        date: date.format("%Y-%m-%d").to_string(),
        hours: hours_by_date.get(&date).copied().unwrap_or_default(),
    }
}

/// Consecutive days with at least one work session, counted from the most
/// recent active day. The chain may start today or yesterday, so an unbroken
/// run is not reset before the day's first session.
fn streak_days(hours_by_date: &HashMap<NaiveDate, f64>, today: NaiveDate) -> u32 {
    let mut active_days = hours_by_date.keys().copied().collect::<Vec<_>>();
    active_days.sort_unstable();
    active_days.reverse();

    let mut streak = 0u32;
    for (index, date) in active_days.into_iter().enumerate() {
        let diff = (today - date).num_days();
        let index = index as i64;
        if diff == index || diff == index + 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
