mod application;
mod domain;
mod infrastructure;

use application::advisory::{
    GoalSuggestion, PrioritySuggestion, ProductivityInsights, ScheduledTaskDraft,
    SubtaskSuggestion,
};
use application::commands::{
    add_subtask_impl, clear_timer_task_impl, create_task_impl, delete_task_impl,
    export_snapshot_impl, get_productivity_stats_impl, get_settings_impl, get_timer_state_impl,
    import_snapshot_impl, list_tasks_impl, parse_schedule_command_impl, prioritize_tasks_impl,
    productivity_insights_impl, remove_subtask_impl, reset_timer_impl, select_timer_task_impl,
    set_ambient_volume_impl, set_soundscape_impl, set_timer_mode_impl, suggest_chapters_impl,
    suggest_goals_impl, suggest_subtasks_impl, tick_timer_impl, toggle_subtask_impl,
    toggle_timer_impl, update_planner_workspace_impl, update_scratchpad_impl, update_settings_impl,
    update_task_impl, AppState, TickTimerResponse, TimerStateResponse,
};
use application::snapshot::{ExportArtifact, ImportedFields};
use application::stats::ProductivityStats;
use domain::models::{AppSettings, PlannerWorkspace, Soundscape, Task};

#[tauri::command]
fn ping() -> &'static str {
    "pong"
}

#[tauri::command]
fn list_tasks(state: tauri::State<'_, AppState>) -> Result<Vec<Task>, String> {
    list_tasks_impl(state.inner()).map_err(|error| state.command_error("list_tasks", &error))
}

#[tauri::command]
#[allow(clippy::too_many_arguments)]
fn create_task(
    state: tauri::State<'_, AppState>,
    title: String,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    deadline: Option<String>,
    target_pomodoros: Option<u32>,
    tags: Option<Vec<String>>,
    custom_duration: Option<u32>,
    notes: Option<String>,
) -> Result<Task, String> {
    create_task_impl(
        state.inner(),
        title,
        description,
        category,
        priority,
        deadline,
        target_pomodoros,
        tags,
        custom_duration,
        notes,
    )
    .map_err(|error| state.command_error("create_task", &error))
}

#[tauri::command]
#[allow(clippy::too_many_arguments)]
fn update_task(
    state: tauri::State<'_, AppState>,
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
) -> Result<Task, String> {
    update_task_impl(
        state.inner(),
        task_id,
        title,
        description,
        category,
        priority,
        deadline,
        target_pomodoros,
        completed,
        tags,
        custom_duration,
        notes,
    )
    .map_err(|error| state.command_error("update_task", &error))
}

#[tauri::command]
fn delete_task(state: tauri::State<'_, AppState>, task_id: String) -> Result<bool, String> {
    delete_task_impl(state.inner(), task_id)
        .map_err(|error| state.command_error("delete_task", &error))
}

#[tauri::command]
fn add_subtask(
    state: tauri::State<'_, AppState>,
    task_id: String,
    title: String,
    estimated_minutes: Option<u32>,
) -> Result<Task, String> {
    add_subtask_impl(state.inner(), task_id, title, estimated_minutes)
        .map_err(|error| state.command_error("add_subtask", &error))
}

#[tauri::command]
fn toggle_subtask(
    state: tauri::State<'_, AppState>,
    task_id: String,
    subtask_id: String,
) -> Result<Task, String> {
    toggle_subtask_impl(state.inner(), task_id, subtask_id)
        .map_err(|error| state.command_error("toggle_subtask", &error))
}

#[tauri::command]
fn remove_subtask(
    state: tauri::State<'_, AppState>,
    task_id: String,
    subtask_id: String,
) -> Result<Task, String> {
    remove_subtask_impl(state.inner(), task_id, subtask_id)
        .map_err(|error| state.command_error("remove_subtask", &error))
}

#[tauri::command]
fn get_timer_state(state: tauri::State<'_, AppState>) -> Result<TimerStateResponse, String> {
    get_timer_state_impl(state.inner())
        .map_err(|error| state.command_error("get_timer_state", &error))
}

#[tauri::command]
fn select_timer_task(
    state: tauri::State<'_, AppState>,
    task_id: String,
) -> Result<TimerStateResponse, String> {
    select_timer_task_impl(state.inner(), task_id)
        .map_err(|error| state.command_error("select_timer_task", &error))
}

#[tauri::command]
fn clear_timer_task(state: tauri::State<'_, AppState>) -> Result<TimerStateResponse, String> {
    clear_timer_task_impl(state.inner())
        .map_err(|error| state.command_error("clear_timer_task", &error))
}

#[tauri::command]
fn toggle_timer(state: tauri::State<'_, AppState>) -> Result<TimerStateResponse, String> {
    toggle_timer_impl(state.inner()).map_err(|error| state.command_error("toggle_timer", &error))
}

#[tauri::command]
fn reset_timer(state: tauri::State<'_, AppState>) -> Result<TimerStateResponse, String> {
    reset_timer_impl(state.inner()).map_err(|error| state.command_error("reset_timer", &error))
}

#[tauri::command]
fn set_timer_mode(
    state: tauri::State<'_, AppState>,
    mode: String,
) -> Result<TimerStateResponse, String> {
    set_timer_mode_impl(state.inner(), mode)
        .map_err(|error| state.command_error("set_timer_mode", &error))
}

#[tauri::command]
fn tick_timer(state: tauri::State<'_, AppState>) -> Result<TickTimerResponse, String> {
    tick_timer_impl(state.inner()).map_err(|error| state.command_error("tick_timer", &error))
}

#[tauri::command]
fn set_ambient_volume(
    state: tauri::State<'_, AppState>,
    volume: f32,
) -> Result<TimerStateResponse, String> {
    set_ambient_volume_impl(state.inner(), volume)
        .map_err(|error| state.command_error("set_ambient_volume", &error))
}

#[tauri::command]
fn set_soundscape(
    state: tauri::State<'_, AppState>,
    soundscape: Soundscape,
) -> Result<TimerStateResponse, String> {
    set_soundscape_impl(state.inner(), soundscape)
        .map_err(|error| state.command_error("set_soundscape", &error))
}

#[tauri::command]
fn get_settings(state: tauri::State<'_, AppState>) -> Result<AppSettings, String> {
    get_settings_impl(state.inner()).map_err(|error| state.command_error("get_settings", &error))
}

#[tauri::command]
fn update_settings(
    state: tauri::State<'_, AppState>,
    settings: AppSettings,
) -> Result<AppSettings, String> {
    update_settings_impl(state.inner(), settings)
        .map_err(|error| state.command_error("update_settings", &error))
}

#[tauri::command]
fn update_planner_workspace(
    state: tauri::State<'_, AppState>,
    workspace: PlannerWorkspace,
) -> Result<PlannerWorkspace, String> {
    update_planner_workspace_impl(state.inner(), workspace)
        .map_err(|error| state.command_error("update_planner_workspace", &error))
}

#[tauri::command]
fn update_scratchpad(
    state: tauri::State<'_, AppState>,
    scratchpad: String,
) -> Result<(), String> {
    update_scratchpad_impl(state.inner(), scratchpad)
        .map_err(|error| state.command_error("update_scratchpad", &error))
}

#[tauri::command]
fn export_snapshot(state: tauri::State<'_, AppState>) -> Result<Option<ExportArtifact>, String> {
    export_snapshot_impl(state.inner())
        .map_err(|error| state.command_error("export_snapshot", &error))
}

#[tauri::command]
fn import_snapshot(
    state: tauri::State<'_, AppState>,
    raw: String,
) -> Result<ImportedFields, String> {
    import_snapshot_impl(state.inner(), raw)
        .map_err(|error| state.command_error("import_snapshot", &error))
}

#[tauri::command]
fn get_productivity_stats(
    state: tauri::State<'_, AppState>,
) -> Result<ProductivityStats, String> {
    get_productivity_stats_impl(state.inner())
        .map_err(|error| state.command_error("get_productivity_stats", &error))
}

#[tauri::command]
async fn suggest_subtasks(
    state: tauri::State<'_, AppState>,
    title: String,
    description: Option<String>,
) -> Result<Vec<SubtaskSuggestion>, String> {
    Ok(suggest_subtasks_impl(state.inner(), title, description).await)
}

#[tauri::command]
async fn suggest_chapters(
    state: tauri::State<'_, AppState>,
    folder_name: String,
) -> Result<Vec<String>, String> {
    Ok(suggest_chapters_impl(state.inner(), folder_name).await)
}

#[tauri::command]
async fn prioritize_tasks(
    state: tauri::State<'_, AppState>,
) -> Result<Vec<PrioritySuggestion>, String> {
    Ok(prioritize_tasks_impl(state.inner()).await)
}

#[tauri::command]
async fn parse_schedule_command(
    state: tauri::State<'_, AppState>,
    command: String,
) -> Result<Vec<ScheduledTaskDraft>, String> {
    Ok(parse_schedule_command_impl(state.inner(), command).await)
}

#[tauri::command]
async fn suggest_goals(state: tauri::State<'_, AppState>) -> Result<Vec<GoalSuggestion>, String> {
    Ok(suggest_goals_impl(state.inner()).await)
}

#[tauri::command]
async fn productivity_insights(
    state: tauri::State<'_, AppState>,
) -> Result<ProductivityInsights, String> {
    Ok(productivity_insights_impl(state.inner()).await)
}

pub fn run() {
    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    let app_state = AppState::new(workspace_root).expect("failed to initialize app state");

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            ping,
            list_tasks,
            create_task,
            update_task,
            delete_task,
            add_subtask,
            toggle_subtask,
            remove_subtask,
            get_timer_state,
            select_timer_task,
            clear_timer_task,
            toggle_timer,
            reset_timer,
            set_timer_mode,
            tick_timer,
            set_ambient_volume,
            set_soundscape,
            get_settings,
            update_settings,
            update_planner_workspace,
            update_scratchpad,
            export_snapshot,
            import_snapshot,
            get_productivity_stats,
            suggest_subtasks,
            suggest_chapters,
            prioritize_tasks,
            parse_schedule_command,
            suggest_goals,
            productivity_insights
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}
