//! Editor settings.

use serde::{Deserialize, Serialize};

/// Tunable behaviour of a [`Project`](crate::Project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    /// Maximum number of entries kept by the history manager.
    pub history_size: usize,
    /// Allow edges that close a directed cycle.
    pub allow_add_cycle_edge: bool,
    /// Number of recent input events the keybind matcher remembers.
    pub key_sequence_window: usize,
    /// Maximum delay between two clicks of a double-click.
    pub double_click_interval_ms: u64,
    /// Maximum pointer travel between two clicks of a double-click.
    pub double_click_distance: f64,
    /// Hit distance for line-like collision shapes.
    pub hit_tolerance: f64,
    /// Distance moved by one arrow-key nudge or jump.
    pub move_step: f64,
    /// Grid pitch used when aligning to the grid.
    pub align_grid: f64,
    /// Largest gap closed when aligning to neighbouring entities.
    pub align_threshold: f64,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            history_size: 20,
            allow_add_cycle_edge: false,
            key_sequence_window: 20,
            double_click_interval_ms: 300,
            double_click_distance: 20.0,
            hit_tolerance: 4.0,
            move_step: 100.0,
            align_grid: 50.0,
            align_threshold: 25.0,
        }
    }
}

impl StageSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.history_size = settings.history_size.max(1);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = StageSettings::from_json(r#"{ "allow_add_cycle_edge": true }"#).unwrap();
        assert!(settings.allow_add_cycle_edge);
        assert_eq!(settings.history_size, 20);
        assert_eq!(settings.key_sequence_window, 20);
        assert!((settings.move_step - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_history_size_clamped() {
        let settings = StageSettings::from_json(r#"{ "history_size": 0 }"#).unwrap();
        assert_eq!(settings.history_size, 1);
    }

    #[test]
    fn test_roundtrip() {
        let settings = StageSettings {
            double_click_distance: 12.5,
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(StageSettings::from_json(&json).unwrap(), settings);
    }
}
