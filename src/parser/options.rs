//! Table detection settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied table detection options, keyed by name.
///
/// Settings are kept as a loose map so that callers can pass the same
/// option names they would use with other table finders; unknown keys are
/// ignored. [`GeometryProfile::from_settings`] resolves the recognized
/// keys into typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSettings(Map<String, Value>);

impl TableSettings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get an option by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check if no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Option names that are set.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// The fallback geometry profile: text-aligned edges on both axes with
    /// a widened vertical intersection tolerance.
    pub fn fallback() -> Self {
        Self::new()
            .with("vertical_strategy", "text")
            .with("horizontal_strategy", "text")
            .with("intersection_y_tolerance", 10)
    }

    /// Overlay these settings on `base`; keys set here take precedence.
    pub fn merged_over(&self, base: &TableSettings) -> TableSettings {
        let mut merged = base.0.clone();
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        TableSettings(merged)
    }
}

impl From<Map<String, Value>> for TableSettings {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// How edges along one axis are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Ruling lines drawn on the page
    #[default]
    Lines,
    /// Alignment of words
    Text,
}

impl Strategy {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()?.to_ascii_lowercase().as_str() {
            "lines" | "lines_strict" => Some(Strategy::Lines),
            "text" => Some(Strategy::Text),
            _ => None,
        }
    }
}

/// Resolved, typed table detection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryProfile {
    /// How column edges are found
    pub vertical_strategy: Strategy,
    /// How row edges are found
    pub horizontal_strategy: Strategy,
    /// Ruling lines closer than this are merged (points)
    pub snap_tolerance: f32,
    /// Ruling lines shorter than this are ignored (points)
    pub edge_min_length: f32,
    /// Horizontal slack when testing edge intersections (points)
    pub intersection_x_tolerance: f32,
    /// Vertical slack when testing edge intersections (points)
    pub intersection_y_tolerance: f32,
    /// Word left edges closer than this share a column edge (points)
    pub text_x_tolerance: f32,
    /// Word baselines closer than this share a row (points)
    pub text_y_tolerance: f32,
    /// Words that must align for a text-derived column edge
    pub min_words_vertical: usize,
    /// Words a line must hold for a text-derived row edge
    pub min_words_horizontal: usize,
}

impl Default for GeometryProfile {
    fn default() -> Self {
        Self {
            vertical_strategy: Strategy::Lines,
            horizontal_strategy: Strategy::Lines,
            snap_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_x_tolerance: 3.0,
            intersection_y_tolerance: 3.0,
            text_x_tolerance: 3.0,
            text_y_tolerance: 3.0,
            min_words_vertical: 3,
            min_words_horizontal: 1,
        }
    }
}

impl GeometryProfile {
    /// Resolve named settings over the defaults.
    pub fn from_settings(settings: &TableSettings) -> Self {
        let mut profile = Self::default();

        // The shared tolerances apply first so the per-axis keys can refine them.
        if let Some(v) = number(settings, "intersection_tolerance") {
            profile.intersection_x_tolerance = v;
            profile.intersection_y_tolerance = v;
        }
        if let Some(v) = number(settings, "text_tolerance") {
            profile.text_x_tolerance = v;
            profile.text_y_tolerance = v;
        }

        for key in settings.keys() {
            let Some(value) = settings.get(key) else {
                continue;
            };
            match key {
                "vertical_strategy" => match Strategy::parse(value) {
                    Some(s) => profile.vertical_strategy = s,
                    None => log::warn!("unsupported vertical_strategy {}, using lines", value),
                },
                "horizontal_strategy" => match Strategy::parse(value) {
                    Some(s) => profile.horizontal_strategy = s,
                    None => log::warn!("unsupported horizontal_strategy {}, using lines", value),
                },
                "snap_tolerance" => set_number(value, &mut profile.snap_tolerance),
                "edge_min_length" => set_number(value, &mut profile.edge_min_length),
                "intersection_x_tolerance" => {
                    set_number(value, &mut profile.intersection_x_tolerance)
                }
                "intersection_y_tolerance" => {
                    set_number(value, &mut profile.intersection_y_tolerance)
                }
                "text_x_tolerance" => set_number(value, &mut profile.text_x_tolerance),
                "text_y_tolerance" => set_number(value, &mut profile.text_y_tolerance),
                "min_words_vertical" => set_count(value, &mut profile.min_words_vertical),
                "min_words_horizontal" => set_count(value, &mut profile.min_words_horizontal),
                "intersection_tolerance" | "text_tolerance" => {}
                other => log::debug!("ignoring unknown table setting '{}'", other),
            }
        }

        profile
    }
}

fn number(settings: &TableSettings, key: &str) -> Option<f32> {
    settings.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

fn set_number(value: &Value, target: &mut f32) {
    match value.as_f64() {
        Some(v) if v >= 0.0 => *target = v as f32,
        _ => log::warn!("ignoring non-numeric table setting value {}", value),
    }
}

fn set_count(value: &Value, target: &mut usize) {
    match value.as_u64() {
        Some(v) => *target = v as usize,
        None => log::warn!("ignoring non-integer table setting value {}", value),
    }
}
