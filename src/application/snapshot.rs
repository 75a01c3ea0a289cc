use crate::domain::models::{AppDocument, AppSettings, PomodoroSession, Task};
use crate::infrastructure::document_store::DocumentStore;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Reads the persisted document. An absent or unparsable document yields
/// the initial state; a readable one replaces `tasks`/`history` wholesale
/// and shallow-merges `settings` over the defaults, so fields introduced
/// by a newer release pick up their default and unknown fields are
/// dropped.
pub fn load_document(
    store: &dyn DocumentStore,
    today: NaiveDate,
) -> Result<AppDocument, InfraError> {
    let Some(raw) = store.load()? else {
        return Ok(AppDocument::initial(today));
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return Ok(AppDocument::initial(today));
    };

    let tasks = value
        .get("tasks")
        .cloned()
        .and_then(|field| serde_json::from_value::<Vec<Task>>(field).ok())
        .unwrap_or_default();
    let history = value
        .get("history")
        .cloned()
        .and_then(|field| serde_json::from_value::<Vec<PomodoroSession>>(field).ok())
        .unwrap_or_default();
    let settings = merge_settings(AppSettings::initial(today), value.get("settings"));

    Ok(AppDocument {
        tasks,
        history,
        settings,
    })
}

/// Full-document overwrite; every state mutation funnels through here.
pub fn save_document(
    store: &dyn DocumentStore,
    document: &AppDocument,
    now: DateTime<Utc>,
) -> Result<(), InfraError> {
    let body = serde_json::to_string(document)?;
    store.save(&body, now)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
}

/// Serializes the persisted document into a downloadable artifact,
/// byte-identical to what the store holds. Yields nothing when no document
/// has ever been persisted.
pub fn export_document(
    store: &dyn DocumentStore,
    today: NaiveDate,
) -> Result<Option<ExportArtifact>, InfraError> {
    let Some(contents) = store.load()? else {
        return Ok(None);
    };
    Ok(Some(ExportArtifact {
        file_name: format!("zentask_backup_{}.json", today.format("%Y-%m-%d")),
        contents,
    }))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedFields {
    pub tasks: bool,
    pub history: bool,
    pub settings: bool,
}

/// Applies an imported snapshot. Each root field present in the input
/// replaces the corresponding in-memory field; absent fields are left
/// untouched. Input that fails to parse (including a present field of the
/// wrong shape) applies nothing and reports the failure.
pub fn apply_import(
    document: &mut AppDocument,
    raw: &str,
    today: NaiveDate,
) -> Result<ImportedFields, InfraError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let tasks = value
        .get("tasks")
        .cloned()
        .map(serde_json::from_value::<Vec<Task>>)
        .transpose()?;
    let history = value
        .get("history")
        .cloned()
        .map(serde_json::from_value::<Vec<PomodoroSession>>)
        .transpose()?;
    let settings = value
        .get("settings")
        .map(|field| merge_settings(AppSettings::initial(today), Some(field)));

    let imported = ImportedFields {
        tasks: tasks.is_some(),
        history: history.is_some(),
        settings: settings.is_some(),
    };

    if let Some(tasks) = tasks {
        document.tasks = tasks;
    }
    if let Some(history) = history {
        document.history = history;
    }
    if let Some(settings) = settings {
        document.settings = settings;
    }
    Ok(imported)
}

/// Shallow merge of a persisted settings object over the defaults: keys
/// the defaults know about are taken from the persisted record, everything
/// else is dropped. A record that still fails to deserialize after the
/// merge falls back to the defaults wholesale.
fn merge_settings(defaults: AppSettings, persisted: Option<&serde_json::Value>) -> AppSettings {
    let Some(persisted_object) = persisted.and_then(serde_json::Value::as_object) else {
        return defaults;
    };

    let mut merged = match serde_json::to_value(&defaults) {
        Ok(serde_json::Value::Object(object)) => object,
        _ => return defaults,
    };
    for (key, value) in persisted_object {
        if merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    serde_json::from_value(serde_json::Value::Object(merged)).unwrap_or(defaults)
}
