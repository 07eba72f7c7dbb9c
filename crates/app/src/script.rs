use std::{fs, path::Path};

use psychometric_study_core::{Input, Result, StudyError};
use serde::Deserialize;

/// One scripted rater action at a point on the media timeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
    pub at_ms: u64,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// A hotkey press or release, resolved through the control table.
    Key {
        key: String,
        #[serde(default)]
        release: bool,
    },
    /// A direct input event such as `{ "action": "setRange", ... }`.
    Input(Input),
}

/// Reads a JSON array of [`ScriptEntry`] values, ordered by time.
pub fn load(path: &Path) -> Result<Vec<ScriptEntry>> {
    let contents = fs::read_to_string(path)?;
    let mut entries: Vec<ScriptEntry> = serde_json::from_str(&contents)
        .map_err(|err| StudyError::msg(format!("invalid script {}: {err}", path.display())))?;
    entries.sort_by_key(|entry| entry.at_ms);
    Ok(entries)
}

/// Script used when none is given: press play and watch to the end.
pub fn play_through() -> Vec<ScriptEntry> {
    vec![ScriptEntry {
        at_ms: 0,
        step: Step::Input(Input::Play),
    }]
}
