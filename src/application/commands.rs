use crate::application::advisory::{
    AdvisoryService, GoalSuggestion, PrioritySuggestion, ProductivityInsights, ScheduledTaskDraft,
    SubtaskSuggestion,
};
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::snapshot::{self, ExportArtifact, ImportedFields};
use crate::application::stats::{compute_stats, ProductivityStats};
use crate::application::timer::{FocusTimer, TimerConfig};
use crate::domain::models::{
    color_for_category, AppDocument, AppSettings, PlannerWorkspace, PomodoroSession, Priority,
    SessionKind, Soundscape, Subtask, Task, CATEGORY_PALETTE,
};
use crate::infrastructure::credential_store::KeyringApiKeyStore;
use crate::infrastructure::document_store::SqliteDocumentStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::gemini_client::ReqwestGenerativeClient;
use crate::infrastructure::soundscape::{stream_url, InMemorySoundscapePlayer, SoundscapePlayer};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const RECENT_ACTIVITY_SESSIONS: usize = 20;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    logs_dir: PathBuf,
    document_store: Arc<SqliteDocumentStore>,
    soundscape: Arc<InMemorySoundscapePlayer>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let logs_dir = workspace_root.join("logs");

        let document_store = Arc::new(SqliteDocumentStore::new(&bootstrap.database_path));
        let document =
            snapshot::load_document(document_store.as_ref(), Utc::now().date_naive())?;
        let timer = FocusTimer::new(TimerConfig::from_settings(&document.settings));

        Ok(Self {
            logs_dir,
            document_store,
            soundscape: Arc::new(InMemorySoundscapePlayer::default()),
            runtime: Mutex::new(RuntimeState {
                document,
                timer,
                ambient_volume: 0.5,
            }),
            log_guard: Mutex::new(()),
        })
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn persist(&self, document: &AppDocument) -> Result<(), InfraError> {
        snapshot::save_document(self.document_store.as_ref(), document, Utc::now())
    }

    /// Aligns the ambient stream with the timer: one looping stream while
    /// the timer runs with an audible soundscape, silence otherwise.
    /// Playback failures are logged and swallowed.
    fn sync_ambient(&self, runtime: &RuntimeState) {
        let result = if runtime.timer.is_active() {
            self.soundscape.start(
                runtime.document.settings.default_soundscape,
                runtime.ambient_volume,
            )
        } else {
            self.soundscape.stop()
        };
        if let Err(error) = result {
            self.log_error("soundscape", &error.to_string());
        }
    }

    fn timer_state_response(&self, runtime: &RuntimeState) -> TimerStateResponse {
        let ambient = match self.soundscape.current() {
            Ok(stream) => stream.map(|stream| AmbientStreamResponse {
                soundscape: stream.soundscape,
                volume: stream.volume,
                stream_url: stream_url(stream.soundscape).map(ToOwned::to_owned),
            }),
            Err(error) => {
                self.log_error("soundscape", &error.to_string());
                None
            }
        };

        TimerStateResponse {
            mode: runtime.timer.mode(),
            time_left_seconds: runtime.timer.time_left(),
            is_active: runtime.timer.is_active(),
            session_count: runtime.timer.session_count(),
            selected_task_id: runtime.timer.selected_task_id().map(ToOwned::to_owned),
            current_duration_seconds: runtime.timer.current_duration(),
            ambient,
        }
    }
}

#[derive(Debug)]
struct RuntimeState {
    document: AppDocument,
    timer: FocusTimer,
    ambient_volume: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AmbientStreamResponse {
    pub soundscape: Soundscape,
    pub volume: f32,
    pub stream_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerStateResponse {
    pub mode: SessionKind,
    pub time_left_seconds: u32,
    pub is_active: bool,
    pub session_count: u32,
    pub selected_task_id: Option<String>,
    pub current_duration_seconds: u32,
    pub ambient: Option<AmbientStreamResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickTimerResponse {
    pub timer: TimerStateResponse,
    pub completed_session: Option<PomodoroSession>,
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.document.tasks.clone())
}

#[allow(clippy::too_many_arguments)]
pub fn create_task_impl(
    state: &AppState,
    title: String,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    deadline: Option<String>,
    target_pomodoros: Option<u32>,
    tags: Option<Vec<String>>,
    custom_duration: Option<u32>,
    notes: Option<String>,
) -> Result<Task, InfraError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidConfig(
            "title must not be empty".to_string(),
        ));
    }

    let category = category
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(CATEGORY_PALETTE[0].0)
        .to_string();
    let priority = match priority {
        Some(raw) => parse_priority(&raw)?,
        None => Priority::Medium,
    };
    let deadline = deadline
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string());

    let task = Task {
        id: next_id("tsk"),
        title: title.to_string(),
        description: normalize_optional_text(description),
        color_tag: color_for_category(&category).to_string(),
        category,
        priority,
        deadline,
        target_pomodoros: target_pomodoros.unwrap_or(1),
        completed_pomodoros: 0,
        completed: false,
        subtasks: Vec::new(),
        tags: tags.unwrap_or_default(),
        created_at: Utc::now(),
        custom_duration,
        notes: normalize_optional_text(notes),
    };
    task.validate().map_err(InfraError::InvalidConfig)?;

    {
        let mut runtime = lock_runtime(state)?;
        runtime.document.tasks.insert(0, task.clone());
        state.persist(&runtime.document)?;
    }

    state.log_info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

#[allow(clippy::too_many_arguments)]
pub fn update_task_impl(
    state: &AppState,
    task_id: String,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    deadline: Option<String>,
    target_pomodoros: Option<u32>,
    completed: Option<bool>,
    tags: Option<Vec<String>>,
    custom_duration: Option<u32>,
    notes: Option<String>,
) -> Result<Task, InfraError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "task_id must not be empty".to_string(),
        ));
    }
    let priority = priority.map(|raw| parse_priority(&raw)).transpose()?;

    let mut runtime = lock_runtime(state)?;
    let Some(position) = runtime
        .document
        .tasks
        .iter()
        .position(|task| task.id == task_id)
    else {
        return Err(InfraError::InvalidConfig(format!(
            "task not found: {}",
            task_id
        )));
    };

    // The color tag stays as created even when the category changes; the
    // completed-session counter is only ever advanced by the timer.
    let mut updated = runtime.document.tasks[position].clone();
    if let Some(title) = title {
        let title = title.trim();
        if title.is_empty() {
            return Err(InfraError::InvalidConfig(
                "title must not be empty".to_string(),
            ));
        }
        updated.title = title.to_string();
    }
    if let Some(description) = description {
        updated.description = normalize_optional_text(Some(description));
    }
    if let Some(category) = category {
        let category = category.trim();
        if !category.is_empty() {
            updated.category = category.to_string();
        }
    }
    if let Some(priority) = priority {
        updated.priority = priority;
    }
    if let Some(deadline) = deadline {
        updated.deadline = deadline.trim().to_string();
    }
    if let Some(target) = target_pomodoros {
        updated.target_pomodoros = target;
    }
    if let Some(completed) = completed {
        updated.completed = completed;
    }
    if let Some(tags) = tags {
        updated.tags = tags;
    }
    if let Some(custom) = custom_duration {
        // Zero clears the per-task override.
        updated.custom_duration = (custom > 0).then_some(custom);
    }
    if let Some(notes) = notes {
        updated.notes = normalize_optional_text(Some(notes));
    }
    updated.validate().map_err(InfraError::InvalidConfig)?;

    runtime.document.tasks[position] = updated.clone();
    if custom_duration.is_some() && runtime.timer.selected_task_id() == Some(task_id) {
        runtime
            .timer
            .select_task(task_id, updated.custom_duration);
        state.sync_ambient(&runtime);
    }
    state.persist(&runtime.document)?;
    drop(runtime);

    state.log_info("update_task", &format!("updated task_id={task_id}"));
    Ok(updated)
}

pub fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "task_id must not be empty".to_string(),
        ));
    }

    let mut runtime = lock_runtime(state)?;
    let before = runtime.document.tasks.len();
    runtime.document.tasks.retain(|task| task.id != task_id);
    if runtime.document.tasks.len() == before {
        return Ok(false);
    }
    // History entries keep their task reference; aggregation treats the
    // dangling id as uncategorized.
    if runtime.timer.selected_task_id() == Some(task_id) {
        runtime.timer.clear_selected_task();
        state.sync_ambient(&runtime);
    }
    state.persist(&runtime.document)?;
    drop(runtime);

    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(true)
}

pub fn add_subtask_impl(
    state: &AppState,
    task_id: String,
    title: String,
    estimated_minutes: Option<u32>,
) -> Result<Task, InfraError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidConfig(
            "subtask title must not be empty".to_string(),
        ));
    }

    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime
        .document
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id.trim())
    else {
        return Err(InfraError::InvalidConfig(format!(
            "task not found: {}",
            task_id
        )));
    };

    task.subtasks.push(Subtask {
        id: next_id("sub"),
        title: title.to_string(),
        completed: false,
        estimated_minutes,
    });
    let updated = task.clone();
    state.persist(&runtime.document)?;
    drop(runtime);

    state.log_info("add_subtask", &format!("added subtask to task_id={}", updated.id));
    Ok(updated)
}

pub fn toggle_subtask_impl(
    state: &AppState,
    task_id: String,
    subtask_id: String,
) -> Result<Task, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime
        .document
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id.trim())
    else {
        return Err(InfraError::InvalidConfig(format!(
            "task not found: {}",
            task_id
        )));
    };
    let Some(subtask) = task
        .subtasks
        .iter_mut()
        .find(|subtask| subtask.id == subtask_id.trim())
    else {
        return Err(InfraError::InvalidConfig(format!(
            "subtask not found: {}",
            subtask_id
        )));
    };

    subtask.completed = !subtask.completed;
    let updated = task.clone();
    state.persist(&runtime.document)?;
    Ok(updated)
}

pub fn remove_subtask_impl(
    state: &AppState,
    task_id: String,
    subtask_id: String,
) -> Result<Task, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime
        .document
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id.trim())
    else {
        return Err(InfraError::InvalidConfig(format!(
            "task not found: {}",
            task_id
        )));
    };

    let before = task.subtasks.len();
    task.subtasks.retain(|subtask| subtask.id != subtask_id.trim());
    if task.subtasks.len() == before {
        return Err(InfraError::InvalidConfig(format!(
            "subtask not found: {}",
            subtask_id
        )));
    }
    let updated = task.clone();
    state.persist(&runtime.document)?;
    Ok(updated)
}

pub fn get_timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(state.timer_state_response(&runtime))
}

pub fn select_timer_task_impl(
    state: &AppState,
    task_id: String,
) -> Result<TimerStateResponse, InfraError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "task_id must not be empty".to_string(),
        ));
    }

    let mut runtime = lock_runtime(state)?;
    let Some(custom_duration) = runtime
        .document
        .tasks
        .iter()
        .find(|task| task.id == task_id)
        .map(|task| task.custom_duration)
    else {
        return Err(InfraError::InvalidConfig(format!(
            "task not found: {}",
            task_id
        )));
    };

    runtime.timer.select_task(task_id, custom_duration);
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

pub fn clear_timer_task_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.clear_selected_task();
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

pub fn toggle_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.toggle_active();
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

pub fn reset_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.reset();
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

pub fn set_timer_mode_impl(
    state: &AppState,
    mode: String,
) -> Result<TimerStateResponse, InfraError> {
    let mode = parse_session_kind(&mode)?;
    let mut runtime = lock_runtime(state)?;
    runtime.timer.set_mode(mode);
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

/// Advances the countdown by one second; the embedding shell owns the
/// clock. On completion the emitted session is stamped, prepended to the
/// history, credited to the originating task for work sessions, and the
/// auto-start policy from settings is applied to the follow-up mode.
pub fn tick_timer_impl(state: &AppState) -> Result<TickTimerResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(draft) = runtime.timer.tick() else {
        return Ok(TickTimerResponse {
            timer: state.timer_state_response(&runtime),
            completed_session: None,
        });
    };

    let session = PomodoroSession {
        id: next_id("ses"),
        task_id: draft.task_id.clone(),
        duration: draft.duration,
        kind: draft.kind,
        timestamp: Utc::now(),
    };
    runtime.document.history.insert(0, session.clone());

    if draft.kind.is_work() {
        if let Some(task_id) = draft.task_id.as_deref() {
            if let Some(task) = runtime
                .document
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id)
            {
                task.completed_pomodoros += 1;
            }
        }
    }

    let auto_start = if draft.kind.is_work() {
        runtime.document.settings.auto_start_breaks
    } else {
        runtime.document.settings.auto_start_work
    };
    if auto_start {
        runtime.timer.toggle_active();
    }
    state.sync_ambient(&runtime);
    state.persist(&runtime.document)?;

    state.log_info(
        "tick_timer",
        &format!(
            "completed session_id={} kind={:?} duration={}s",
            session.id, session.kind, session.duration
        ),
    );
    Ok(TickTimerResponse {
        timer: state.timer_state_response(&runtime),
        completed_session: Some(session),
    })
}

pub fn set_ambient_volume_impl(
    state: &AppState,
    volume: f32,
) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.ambient_volume = volume.clamp(0.0, 1.0);
    state.sync_ambient(&runtime);
    Ok(state.timer_state_response(&runtime))
}

/// Switches the ambient soundscape without interrupting a running
/// countdown: the soundscape is not a duration parameter, so only the
/// stream is torn down and restarted.
pub fn set_soundscape_impl(
    state: &AppState,
    soundscape: Soundscape,
) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.document.settings.default_soundscape = soundscape;
    state.sync_ambient(&runtime);
    state.persist(&runtime.document)?;
    Ok(state.timer_state_response(&runtime))
}

pub fn get_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.document.settings.clone())
}

/// Full-record settings replacement. A running countdown is interrupted:
/// duration parameters must not change underneath it.
pub fn update_settings_impl(
    state: &AppState,
    settings: AppSettings,
) -> Result<AppSettings, InfraError> {
    settings.validate().map_err(InfraError::InvalidConfig)?;

    let mut runtime = lock_runtime(state)?;
    runtime.document.settings = settings;
    let config = TimerConfig::from_settings(&runtime.document.settings);
    runtime.timer.apply_config(config);
    state.sync_ambient(&runtime);
    state.persist(&runtime.document)?;
    let updated = runtime.document.settings.clone();
    drop(runtime);

    state.log_info("update_settings", "replaced settings record");
    Ok(updated)
}

pub fn update_planner_workspace_impl(
    state: &AppState,
    workspace: PlannerWorkspace,
) -> Result<PlannerWorkspace, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.document.settings.planner_workspace = workspace;
    state.persist(&runtime.document)?;
    Ok(runtime.document.settings.planner_workspace.clone())
}

pub fn update_scratchpad_impl(state: &AppState, scratchpad: String) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.document.settings.scratchpad = scratchpad;
    state.persist(&runtime.document)?;
    Ok(())
}

/// Serializes the persisted document into a downloadable artifact. A
/// workspace that has never persisted anything exports nothing.
pub fn export_snapshot_impl(state: &AppState) -> Result<Option<ExportArtifact>, InfraError> {
    let artifact = snapshot::export_document(
        state.document_store.as_ref(),
        Utc::now().date_naive(),
    )?;
    if artifact.is_none() {
        state.log_info("export_snapshot", "nothing persisted yet; export skipped");
    }
    Ok(artifact)
}

pub fn import_snapshot_impl(
    state: &AppState,
    raw: String,
) -> Result<ImportedFields, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let imported = snapshot::apply_import(&mut runtime.document, &raw, Utc::now().date_naive())
        .map_err(|error| {
            state.log_error("import_snapshot", &error.to_string());
            error
        })?;

    if imported.settings {
        let config = TimerConfig::from_settings(&runtime.document.settings);
        runtime.timer.apply_config(config);
        state.sync_ambient(&runtime);
    }
    state.persist(&runtime.document)?;
    drop(runtime);

    state.log_info(
        "import_snapshot",
        &format!(
            "imported tasks={} history={} settings={}",
            imported.tasks, imported.history, imported.settings
        ),
    );
    Ok(imported)
}

pub fn get_productivity_stats_impl(state: &AppState) -> Result<ProductivityStats, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(compute_stats(
        &runtime.document.tasks,
        &runtime.document.history,
        &runtime.document.settings,
        Utc::now(),
    ))
}

fn advisory_service() -> AdvisoryService<KeyringApiKeyStore, ReqwestGenerativeClient> {
    AdvisoryService::new(
        Arc::new(KeyringApiKeyStore::default()),
        Arc::new(ReqwestGenerativeClient::new()),
    )
}

// Advisory commands are the resiliency boundary of spec'd soft-fail
// behavior: every failure is logged and degraded to an empty or neutral
// result so the task/timer workflow is never blocked.

pub async fn suggest_subtasks_impl(
    state: &AppState,
    title: String,
    description: Option<String>,
) -> Vec<SubtaskSuggestion> {
    match advisory_service()
        .suggest_subtasks(title.trim(), description.as_deref())
        .await
    {
        Ok(suggestions) => suggestions,
        Err(error) => {
            state.log_error("suggest_subtasks", &error.to_string());
            Vec::new()
        }
    }
}

pub async fn suggest_chapters_impl(state: &AppState, folder_name: String) -> Vec<String> {
    match advisory_service().suggest_chapters(folder_name.trim()).await {
        Ok(chapters) => chapters,
        Err(error) => {
            state.log_error("suggest_chapters", &error.to_string());
            Vec::new()
        }
    }
}

pub async fn prioritize_tasks_impl(state: &AppState) -> Vec<PrioritySuggestion> {
    let open_tasks = {
        let Ok(runtime) = lock_runtime(state) else {
            return Vec::new();
        };
        runtime
            .document
            .tasks
            .iter()
            .filter(|task| !task.completed)
            .cloned()
            .collect::<Vec<_>>()
    };

    match advisory_service().prioritize_tasks(&open_tasks).await {
        Ok(suggestions) => suggestions,
        Err(error) => {
            state.log_error("prioritize_tasks", &error.to_string());
            Vec::new()
        }
    }
}

pub async fn parse_schedule_command_impl(
    state: &AppState,
    command: String,
) -> Vec<ScheduledTaskDraft> {
    match advisory_service()
        .parse_schedule_command(command.trim(), Utc::now().date_naive())
        .await
    {
        Ok(drafts) => drafts,
        Err(error) => {
            state.log_error("parse_schedule_command", &error.to_string());
            Vec::new()
        }
    }
}

pub async fn suggest_goals_impl(state: &AppState) -> Vec<GoalSuggestion> {
    let recent_activity = {
        let Ok(runtime) = lock_runtime(state) else {
            return Vec::new();
        };
        let recent = runtime
            .document
            .history
            .iter()
            .take(RECENT_ACTIVITY_SESSIONS)
            .collect::<Vec<_>>();
        serde_json::json!({
            "recentSessions": recent,
            "monthlyGoalHours": runtime.document.settings.monthly_goal_hours,
        })
    };

    match advisory_service().suggest_goals(&recent_activity).await {
        Ok(goals) => goals,
        Err(error) => {
            state.log_error("suggest_goals", &error.to_string());
            Vec::new()
        }
    }
}

pub async fn productivity_insights_impl(state: &AppState) -> ProductivityInsights {
    let stats = {
        let Ok(runtime) = lock_runtime(state) else {
            return ProductivityInsights::neutral();
        };
        compute_stats(
            &runtime.document.tasks,
            &runtime.document.history,
            &runtime.document.settings,
            Utc::now(),
        )
    };
    let Ok(stats_value) = serde_json::to_value(&stats) else {
        return ProductivityInsights::neutral();
    };

    match advisory_service().productivity_insights(&stats_value).await {
        Ok(insights) => insights,
        Err(error) => {
            state.log_error("productivity_insights", &error.to_string());
            ProductivityInsights::neutral()
        }
    }
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_priority(value: &str) -> Result<Priority, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported priority: {}",
            other
        ))),
    }
}

fn parse_session_kind(value: &str) -> Result<SessionKind, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "work" => Ok(SessionKind::Work),
        "short-break" | "short_break" => Ok(SessionKind::ShortBreak),
        "long-break" | "long_break" => Ok(SessionKind::LongBreak),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported timer mode: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicUsize;

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "zentask-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            AppState::new(self.path.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn create_simple_task(state: &AppState, title: &str) -> Task {
        create_task_impl(
            state,
            title.to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        )
        .expect("create task")
    }

    fn run_session_to_completion(state: &AppState) -> PomodoroSession {
        let timer = get_timer_state_impl(state).expect("timer state");
        if !timer.is_active {
            let _ = toggle_timer_impl(state).expect("start timer");
        }
        loop {
            let response = tick_timer_impl(state).expect("tick");
            if let Some(session) = response.completed_session {
                return session;
            }
        }
    }

    #[test]
    fn create_task_rejects_empty_title() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let result = create_task_impl(
            &state,
            "   ".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn create_task_applies_palette_defaults() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_simple_task(&state, "Plan week");

        assert_eq!(task.category, "Study");
        assert_eq!(task.color_tag, color_for_category("Study"));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.target_pomodoros, 1);
        assert_eq!(task.completed_pomodoros, 0);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn tasks_list_newest_first() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let first = create_simple_task(&state, "First");
        let second = create_simple_task(&state, "Second");

        let tasks = list_tasks_impl(&state).expect("list tasks");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, second.id);
        assert_eq!(tasks[1].id, first.id);
    }

    #[test]
    fn update_task_keeps_color_tag_when_category_changes() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let created = create_simple_task(&state, "Reread notes");

        let updated = update_task_impl(
            &state,
            created.id.clone(),
            Some("Reread all notes".to_string()),
            None,
            Some("Fitness".to_string()),
            Some("high".to_string()),
            None,
            Some(3),
            Some(true),
            None,
            None,
            None,
        )
        .expect("update task");

        assert_eq!(updated.title, "Reread all notes");
        assert_eq!(updated.category, "Fitness");
        assert_eq!(updated.color_tag, created.color_tag);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.target_pomodoros, 3);
        assert!(updated.completed);
    }

    #[test]
    fn update_task_rejects_unknown_priority() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let created = create_simple_task(&state, "Task");
        let result = update_task_impl(
            &state,
            created.id,
            None,
            None,
            None,
            Some("urgent".to_string()),
            None,
            None,
            None,
            None,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn subtask_add_toggle_remove_flow() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let created = create_simple_task(&state, "Essay");

        let with_subtask = add_subtask_impl(
            &state,
            created.id.clone(),
            "Draft outline".to_string(),
            Some(20),
        )
        .expect("add subtask");
        assert_eq!(with_subtask.subtasks.len(), 1);
        let subtask_id = with_subtask.subtasks[0].id.clone();

        let toggled = toggle_subtask_impl(&state, created.id.clone(), subtask_id.clone())
            .expect("toggle subtask");
        assert!(toggled.subtasks[0].completed);

        let removed =
            remove_subtask_impl(&state, created.id.clone(), subtask_id).expect("remove subtask");
        assert!(removed.subtasks.is_empty());
    }

    #[test]
    fn select_timer_task_requires_existing_task() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(select_timer_task_impl(&state, "missing".to_string()).is_err());
    }

    #[test]
    fn selected_task_custom_duration_drives_the_countdown() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(
            &state,
            "Sprint".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Some(1),
            None,
        )
        .expect("create task");

        let timer = select_timer_task_impl(&state, task.id.clone()).expect("select task");
        assert_eq!(timer.current_duration_seconds, 60);
        assert_eq!(timer.selected_task_id, Some(task.id.clone()));

        let timer = clear_timer_task_impl(&state).expect("clear task");
        assert_eq!(timer.current_duration_seconds, 25 * 60);
        assert_eq!(timer.selected_task_id, None);
    }

    #[test]
    fn work_completion_prepends_history_and_credits_the_task() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(
            &state,
            "Sprint".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Some(1),
            None,
        )
        .expect("create task");
        let _ = select_timer_task_impl(&state, task.id.clone()).expect("select task");

        let session = run_session_to_completion(&state);
        assert_eq!(session.kind, SessionKind::Work);
        assert_eq!(session.duration, 60);
        assert_eq!(session.task_id, Some(task.id.clone()));

        let tasks = list_tasks_impl(&state).expect("list tasks");
        assert_eq!(tasks[0].completed_pomodoros, 1);

        let timer = get_timer_state_impl(&state).expect("timer state");
        assert_eq!(timer.mode, SessionKind::ShortBreak);
        assert!(!timer.is_active);
    }

    #[test]
    fn break_completion_emits_zero_duration_and_touches_no_task() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_simple_task(&state, "Untouched");

        let mut settings = get_settings_impl(&state).expect("settings");
        settings.short_break_duration = 1;
        let _ = update_settings_impl(&state, settings).expect("update settings");

        let _ = set_timer_mode_impl(&state, "short-break".to_string()).expect("set mode");
        let session = run_session_to_completion(&state);
        assert_eq!(session.kind, SessionKind::ShortBreak);
        assert_eq!(session.duration, 0);
        assert_eq!(session.task_id, None);

        let tasks = list_tasks_impl(&state).expect("list tasks");
        assert_eq!(tasks[0].completed_pomodoros, task.completed_pomodoros);

        let timer = get_timer_state_impl(&state).expect("timer state");
        assert_eq!(timer.mode, SessionKind::Work);
    }

    #[test]
    fn auto_start_policy_starts_the_break_countdown() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let mut settings = get_settings_impl(&state).expect("settings");
        settings.work_duration = 1;
        settings.auto_start_breaks = true;
        let _ = update_settings_impl(&state, settings).expect("update settings");

        let session = run_session_to_completion(&state);
        assert_eq!(session.kind, SessionKind::Work);

        let timer = get_timer_state_impl(&state).expect("timer state");
        assert_eq!(timer.mode, SessionKind::ShortBreak);
        assert!(timer.is_active);
    }

    #[test]
    fn update_settings_interrupts_a_running_countdown() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let _ = toggle_timer_impl(&state).expect("start timer");
        for _ in 0..5 {
            let _ = tick_timer_impl(&state).expect("tick");
        }

        let mut settings = get_settings_impl(&state).expect("settings");
        settings.work_duration = 30;
        let _ = update_settings_impl(&state, settings).expect("update settings");

        let timer = get_timer_state_impl(&state).expect("timer state");
        assert!(!timer.is_active);
        assert_eq!(timer.time_left_seconds, 30 * 60);
    }

    #[test]
    fn update_settings_rejects_zero_duration() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let mut settings = get_settings_impl(&state).expect("settings");
        settings.work_duration = 0;
        assert!(update_settings_impl(&state, settings).is_err());
    }

    #[test]
    fn soundscape_follows_the_timer_and_swaps_without_interrupting() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let timer = set_soundscape_impl(&state, Soundscape::Rain).expect("set soundscape");
        // Paused timer: no stream yet.
        assert_eq!(timer.ambient, None);

        let timer = toggle_timer_impl(&state).expect("start timer");
        let ambient = timer.ambient.expect("stream while active");
        assert_eq!(ambient.soundscape, Soundscape::Rain);

        for _ in 0..3 {
            let _ = tick_timer_impl(&state).expect("tick");
        }
        let before = get_timer_state_impl(&state).expect("timer state");

        let timer = set_soundscape_impl(&state, Soundscape::Lofi).expect("swap soundscape");
        let ambient = timer.ambient.expect("stream while active");
        assert_eq!(ambient.soundscape, Soundscape::Lofi);
        assert_eq!(timer.time_left_seconds, before.time_left_seconds);
        assert!(timer.is_active);

        let timer = toggle_timer_impl(&state).expect("pause timer");
        assert_eq!(timer.ambient, None);
    }

    #[test]
    fn ambient_volume_is_clamped_and_applied() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let _ = set_soundscape_impl(&state, Soundscape::Cafe).expect("set soundscape");
        let _ = toggle_timer_impl(&state).expect("start timer");

        let timer = set_ambient_volume_impl(&state, 7.0).expect("set volume");
        let ambient = timer.ambient.expect("stream while active");
        assert_eq!(ambient.volume, 1.0);
    }

    #[test]
    fn settings_persist_across_app_state_instances() {
        let workspace = TempWorkspace::new();
        {
            let state = workspace.app_state();
            let mut settings = get_settings_impl(&state).expect("settings");
            settings.monthly_goal_hours = 120;
            settings.scratchpad = "carry me over".to_string();
            let _ = update_settings_impl(&state, settings).expect("update settings");
        }

        let state = workspace.app_state();
        let settings = get_settings_impl(&state).expect("settings");
        assert_eq!(settings.monthly_goal_hours, 120);
        assert_eq!(settings.scratchpad, "carry me over");
    }

    #[test]
    fn export_is_silent_until_something_is_persisted() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert_eq!(export_snapshot_impl(&state).expect("export"), None);

        let _ = create_simple_task(&state, "Persist me");
        let artifact = export_snapshot_impl(&state)
            .expect("export")
            .expect("artifact present");
        assert!(artifact.file_name.starts_with("zentask_backup_"));
        assert!(artifact.file_name.ends_with(".json"));
        assert!(artifact.contents.contains("Persist me"));
    }

    #[test]
    fn import_with_only_history_preserves_tasks_and_settings() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_simple_task(&state, "Keep me");
        let _ = update_scratchpad_impl(&state, "keep this note".to_string());

        let raw = r#"{"history": [{
            "id": "ses-import", "duration": 1500, "type": "work",
            "timestamp": "2026-08-01T10:00:00Z"
        }]}"#;
        let imported = import_snapshot_impl(&state, raw.to_string()).expect("import");
        assert!(imported.history);
        assert!(!imported.tasks);
        assert!(!imported.settings);

        let tasks = list_tasks_impl(&state).expect("list tasks");
        assert_eq!(tasks[0].id, task.id);
        let settings = get_settings_impl(&state).expect("settings");
        assert_eq!(settings.scratchpad, "keep this note");

        let stats = get_productivity_stats_impl(&state).expect("stats");
        assert_eq!(stats.completed_pomodoros, 1);
    }

    #[test]
    fn malformed_import_reports_failure_and_changes_nothing() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_simple_task(&state, "Survivor");

        assert!(import_snapshot_impl(&state, "not json at all".to_string()).is_err());

        let tasks = list_tasks_impl(&state).expect("list tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task.id);
    }

    #[test]
    fn deleting_the_selected_task_detaches_it_from_the_timer() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(
            &state,
            "Doomed".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Some(40),
            None,
        )
        .expect("create task");
        let _ = select_timer_task_impl(&state, task.id.clone()).expect("select task");

        let deleted = delete_task_impl(&state, task.id).expect("delete task");
        assert!(deleted);

        let timer = get_timer_state_impl(&state).expect("timer state");
        assert_eq!(timer.selected_task_id, None);
        assert_eq!(timer.current_duration_seconds, 25 * 60);
    }

    #[test]
    fn stats_count_sessions_logged_against_deleted_tasks() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(
            &state,
            "Ephemeral".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Some(1),
            None,
        )
        .expect("create task");
        let _ = select_timer_task_impl(&state, task.id.clone()).expect("select task");
        let _ = run_session_to_completion(&state);
        let _ = delete_task_impl(&state, task.id).expect("delete task");

        let stats = get_productivity_stats_impl(&state).expect("stats");
        assert_eq!(stats.completed_pomodoros, 1);
        assert_eq!(stats.task_distribution.len(), 1);
        assert_eq!(stats.task_distribution[0].name, "General");
    }
}
