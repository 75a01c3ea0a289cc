use crate::domain::models::{AppSettings, SessionKind};

/// Duration parameters the timer resolves against. Rebuilt from settings
/// whenever they change; the timer never reads settings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_interval: u32,
}

impl TimerConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            work_minutes: settings.work_duration.max(1),
            short_break_minutes: settings.short_break_duration.max(1),
            long_break_minutes: settings.long_break_duration.max(1),
            long_break_interval: settings.long_break_interval.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectedTask {
    id: String,
    custom_duration: Option<u32>,
}

/// Completed-session emission, stamped with id and timestamp by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub kind: SessionKind,
    /// Seconds; 0 for break sessions.
    pub duration: u32,
    pub task_id: Option<String>,
}

/// Pomodoro countdown state machine. Purely synchronous: an external
/// one-second clock drives `tick`, and every side effect (ids, timestamps,
/// history, audio, auto-start policy) belongs to the embedding layer.
///
/// Any change to mode, task selection, or configuration interrupts a
/// running countdown: the duration is re-resolved and the timer pauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    config: TimerConfig,
    mode: SessionKind,
    time_left: u32,
    is_active: bool,
    session_count: u32,
    selected_task: Option<SelectedTask>,
}

impl FocusTimer {
    pub fn new(config: TimerConfig) -> Self {
        let mut timer = Self {
            config,
            mode: SessionKind::Work,
            time_left: 0,
            is_active: false,
            session_count: 0,
            selected_task: None,
        };
        timer.time_left = timer.current_duration();
        timer
    }

    pub fn mode(&self) -> SessionKind {
        self.mode
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Completed work sessions since this timer was constructed
    /// (process-local, never persisted).
    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn selected_task_id(&self) -> Option<&str> {
        self.selected_task.as_ref().map(|task| task.id.as_str())
    }

    /// Seconds for the current mode: the selected task's custom duration
    /// wins over the configured work duration; breaks always use the
    /// configured break durations.
    pub fn current_duration(&self) -> u32 {
        let minutes = match self.mode {
            SessionKind::Work => self
                .selected_task
                .as_ref()
                .and_then(|task| task.custom_duration)
                .filter(|&custom| custom > 0)
                .unwrap_or(self.config.work_minutes),
            SessionKind::ShortBreak => self.config.short_break_minutes,
            SessionKind::LongBreak => self.config.long_break_minutes,
        };
        minutes * 60
    }

    fn interrupt(&mut self) {
        self.is_active = false;
        self.time_left = self.current_duration();
    }

    /// Flips running/paused without touching the countdown.
    pub fn toggle_active(&mut self) {
        self.is_active = !self.is_active;
    }

    pub fn reset(&mut self) {
        self.interrupt();
    }

    pub fn set_mode(&mut self, mode: SessionKind) {
        self.mode = mode;
        self.interrupt();
    }

    pub fn select_task(&mut self, task_id: impl Into<String>, custom_duration: Option<u32>) {
        self.selected_task = Some(SelectedTask {
            id: task_id.into(),
            custom_duration,
        });
        self.interrupt();
    }

    pub fn clear_selected_task(&mut self) {
        if self.selected_task.take().is_some() {
            self.interrupt();
        }
    }

    pub fn apply_config(&mut self, config: TimerConfig) {
        self.config = config;
        self.interrupt();
    }

    /// Advances the countdown by one second. Returns the completed session
    /// when the countdown reaches zero; the timer is then paused in the
    /// follow-up mode with a freshly resolved duration.
    pub fn tick(&mut self) -> Option<SessionDraft> {
        if !self.is_active || self.time_left == 0 {
            return None;
        }
        self.time_left -= 1;
        if self.time_left > 0 {
            return None;
        }
        Some(self.complete())
    }

    fn complete(&mut self) -> SessionDraft {
        self.is_active = false;
        let draft = SessionDraft {
            kind: self.mode,
            duration: if self.mode.is_work() {
                self.current_duration()
            } else {
                0
            },
            task_id: self.selected_task.as_ref().map(|task| task.id.clone()),
        };

        self.mode = match self.mode {
            SessionKind::Work => {
                self.session_count += 1;
                if self.session_count % self.config.long_break_interval == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        };
        self.time_left = self.current_duration();
        draft
    }
}
