use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR_TAG: &str = "#6366f1";

/// Fixed category palette; `color_for_category` derives a task's color tag
/// at creation time, after which the tag is independent of the category.
pub const CATEGORY_PALETTE: &[(&str, &str)] = &[
    ("Study", "#6366f1"),
    ("Work", "#0ea5e9"),
    ("Personal", "#10b981"),
    ("Strategy", "#f59e0b"),
    ("Fitness", "#ef4444"),
    ("Admin", "#8b5cf6"),
];

pub fn color_for_category(category: &str) -> &'static str {
    CATEGORY_PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category.trim()))
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR_TAG)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub color_tag: String,
    pub priority: Priority,
    pub deadline: String,
    pub target_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        validate_non_empty(&self.color_tag, "task.colorTag")?;
        validate_date(&self.deadline, "task.deadline")?;
        if self.custom_duration == Some(0) {
            return Err("task.customDuration must be > 0 minutes".to_string());
        }
        for subtask in &self.subtasks {
            validate_non_empty(&subtask.id, "task.subtasks[].id")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn is_work(self) -> bool {
        self == SessionKind::Work
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSession {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Seconds of focus; 0 for break sessions.
    pub duration: u32,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub timestamp: DateTime<Utc>,
}

impl PomodoroSession {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "session.id")?;
        if !self.kind.is_work() && self.duration != 0 {
            return Err("session.duration must be 0 for break sessions".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusFolder {
    pub id: String,
    pub name: String,
    pub items: Vec<FocusChecklistItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerDay {
    pub date: String,
    pub items: Vec<FocusChecklistItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerWorkspace {
    pub today: Vec<FocusChecklistItem>,
    #[serde(rename = "next7Days")]
    pub next_seven_days: Vec<PlannerDay>,
    pub subjects: Vec<FocusFolder>,
}

impl PlannerWorkspace {
    /// Empty workspace with the upcoming-week window materialized once,
    /// starting the day after `today`. The window is not re-dated as real
    /// time advances; it stays fixed until the workspace is replaced.
    pub fn with_upcoming_week(today: NaiveDate) -> Self {
        let next_seven_days = (1..=7)
            .map(|offset| PlannerDay {
                date: (today + Duration::days(offset)).format("%Y-%m-%d").to_string(),
                items: Vec::new(),
            })
            .collect();
        Self {
            today: Vec::new(),
            next_seven_days,
            subjects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Soundscape {
    None,
    Lofi,
    Rain,
    Cafe,
    WhiteNoise,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Minutes.
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    /// Completed work sessions per long break.
    pub long_break_interval: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub theme: Theme,
    pub monthly_goal_hours: u32,
    pub accent_color: String,
    pub default_soundscape: Soundscape,
    pub timezone: String,
    pub planner_workspace: PlannerWorkspace,
    pub scratchpad: String,
}

impl AppSettings {
    /// Defaults for a fresh workspace; the planner window is anchored to
    /// the moment of construction.
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            long_break_interval: 4,
            auto_start_breaks: false,
            auto_start_work: false,
            theme: Theme::Dark,
            monthly_goal_hours: 80,
            accent_color: DEFAULT_COLOR_TAG.to_string(),
            default_soundscape: Soundscape::None,
            timezone: "UTC".to_string(),
            planner_workspace: PlannerWorkspace::with_upcoming_week(today),
            scratchpad: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.work_duration == 0 {
            return Err("settings.workDuration must be > 0 minutes".to_string());
        }
        if self.short_break_duration == 0 {
            return Err("settings.shortBreakDuration must be > 0 minutes".to_string());
        }
        if self.long_break_duration == 0 {
            return Err("settings.longBreakDuration must be > 0 minutes".to_string());
        }
        if self.long_break_interval == 0 {
            return Err("settings.longBreakInterval must be >= 1".to_string());
        }
        validate_non_empty(&self.accent_color, "settings.accentColor")?;
        validate_non_empty(&self.timezone, "settings.timezone")?;
        Ok(())
    }
}

/// The single persisted document: everything the application owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppDocument {
    pub tasks: Vec<Task>,
    pub history: Vec<PomodoroSession>,
    pub settings: AppSettings,
}

impl AppDocument {
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            tasks: Vec::new(),
            history: Vec::new(),
            settings: AppSettings::initial(today),
        }
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))?;
    Ok(())
}
