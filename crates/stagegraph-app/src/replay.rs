//! Replay of recorded input scripts.

use clap::Parser;
use stagegraph_core::storage::FileKeyBindStore;
use stagegraph_core::{
    InputEvent, KeyBindStore, MemoryKeyBindStore, Project, StageError, StageSettings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors of the replay shell.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Where keybindings are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyBindSource {
    /// Keybinding file in the user's local data directory.
    #[default]
    UserFile,
    File(PathBuf),
    Memory,
}

/// Replay a JSON script of input events through a StageGraph project
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "stagegraph", author, version, about, long_about = None)]
pub struct ReplayConfig {
    /// JSON array of input events
    #[arg(help = "Path to the input script")]
    pub script: PathBuf,

    /// Settings file (JSON)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Stage document loaded before replaying
    #[arg(short, long)]
    pub document: Option<PathBuf>,

    /// Keybinding file used instead of the one in the user's data directory
    #[arg(short, long, conflicts_with = "memory_keybinds")]
    pub keybinds: Option<PathBuf>,

    /// Keep keybindings in memory only
    #[arg(long)]
    pub memory_keybinds: bool,

    /// Print the keybinding table before replaying
    #[arg(long)]
    pub list_keybinds: bool,
}

impl ReplayConfig {
    pub fn keybind_source(&self) -> KeyBindSource {
        match (&self.keybinds, self.memory_keybinds) {
            (_, true) => KeyBindSource::Memory,
            (Some(path), false) => KeyBindSource::File(path.clone()),
            (None, false) => KeyBindSource::UserFile,
        }
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Stage document after the last event.
    pub document: String,
    pub history: String,
    pub notifications: Vec<String>,
}

fn read(path: &Path) -> Result<String, ReplayError> {
    std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, text: &str) -> Result<T, ReplayError> {
    serde_json::from_str(text).map_err(|source| ReplayError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn open_store(source: &KeyBindSource) -> Result<Arc<dyn KeyBindStore>, ReplayError> {
    let store: Arc<dyn KeyBindStore> = match source {
        KeyBindSource::UserFile => match FileKeyBindStore::default_location() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                log::error!("Keybinding file unavailable ({}), keeping bindings in memory", e);
                Arc::new(MemoryKeyBindStore::new())
            }
        },
        KeyBindSource::File(path) => Arc::new(
            FileKeyBindStore::open(path.clone()).map_err(StageError::from)?,
        ),
        KeyBindSource::Memory => Arc::new(MemoryKeyBindStore::new()),
    };
    Ok(store)
}

/// Build the project described by `config`.
pub fn open_project(config: &ReplayConfig) -> Result<Project, ReplayError> {
    let settings = match &config.settings {
        Some(path) => StageSettings::from_json(&read(path)?).map_err(|source| ReplayError::Json {
            path: path.clone(),
            source,
        })?,
        None => StageSettings::default(),
    };
    let mut project = Project::new(settings, open_store(&config.keybind_source())?)?;
    if let Some(path) = &config.document {
        project.editor.load_document(&read(path)?)?;
    }
    Ok(project)
}

/// Feed events through the project and collect the result.
pub fn replay(project: &mut Project, events: &[InputEvent]) -> Result<ReplayReport, ReplayError> {
    for event in events {
        log::trace!("Replaying {:?}", event);
        project.handle_event(event);
    }
    let document = project
        .editor
        .stage
        .to_json()
        .map_err(|e| StageError::IntegrityViolation(format!("cannot serialize stage: {}", e)))?;
    Ok(ReplayReport {
        document,
        history: project.editor.history.status_text(),
        notifications: project
            .editor
            .take_notifications()
            .iter()
            .map(|n| n.message().to_string())
            .collect(),
    })
}

/// Load everything named by `config` and replay the script.
pub fn run(config: &ReplayConfig) -> Result<ReplayReport, ReplayError> {
    let mut project = open_project(config)?;
    if config.list_keybinds {
        crate::shortcuts::print_all(&project.keybinds);
    }
    let events: Vec<InputEvent> = parse(&config.script, &read(&config.script)?)?;
    log::info!("Replaying {} events from {:?}", events.len(), config.script);
    replay(&mut project, &events)
}
