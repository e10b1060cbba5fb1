use crate::dashboard::dimensions::{parse_map, WidgetDimensions};
use crate::dashboard::grid::GridLayout;
use crate::dashboard::mode::Mode;
use crate::dashboard::widgets::WidgetRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const GRID_LAYOUT_KEY: &str = "grid_layout";
pub const WIDGET_ORDER_KEY: &str = "widget_order";
pub const SECTION_ORDER_KEY: &str = "advanced_section_order";

const MAX_APP_GRID: u8 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClockFormat {
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "12h")]
    H12,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    Long,
    Short,
    Iso,
}

/// Built-in settings for one mode. Stored overrides are layered on top.
#[derive(Debug, Clone, Copy)]
pub struct ModeDefaults {
    pub hidden_widgets: &'static [&'static str],
    pub clock_format: ClockFormat,
    pub date_format: DateFormat,
    pub apps_rows: u8,
    pub apps_cols: u8,
    pub quick_actions: &'static [&'static str],
    pub grid_layout: &'static [&'static [&'static str]],
}

const STANDARD: ModeDefaults = ModeDefaults {
    hidden_widgets: &["show_swarm", "show_containers"],
    clock_format: ClockFormat::H24,
    date_format: DateFormat::Long,
    apps_rows: 2,
    apps_cols: 4,
    quick_actions: &["app_store", "files", "settings"],
    grid_layout: &[
        &["clock"],
        &["search"],
        &["status"],
        &["vitals"],
        &["network", "disk"],
        &["favorites"],
        &["recent_apps"],
        &["my_apps"],
    ],
};

const ADVANCED: ModeDefaults = ModeDefaults {
    hidden_widgets: &[],
    clock_format: ClockFormat::H24,
    date_format: DateFormat::Iso,
    apps_rows: 3,
    apps_cols: 6,
    quick_actions: &["terminal", "logs", "docker", "backups", "settings"],
    grid_layout: &[
        &["clock", "search"],
        &["status"],
        &["cpu_gauge", "memory_gauge"],
        &["disk_gauge", "temp_gauge"],
        &["uptime_load", "network_throughput"],
        &["swarm"],
        &["containers"],
        &["alerts"],
        &["quick_actions"],
    ],
};

impl ModeDefaults {
    pub fn for_mode(mode: Mode) -> &'static ModeDefaults {
        match mode {
            Mode::Standard => &STANDARD,
            Mode::Advanced => &ADVANCED,
        }
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::from_ids(self.grid_layout)
    }

    pub fn flag(&self, flag: &str) -> bool {
        !self.hidden_widgets.contains(&flag)
    }
}

/// Sparse per-mode overrides as stored under `dashboard.<mode>`.
///
/// Reading is tolerant: a key with the wrong type is dropped with a warning
/// and falls back to the mode default. Layout keys are kept raw so the
/// migration chain can decide what is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardConfig {
    pub flags: BTreeMap<String, bool>,
    pub clock_format: Option<ClockFormat>,
    pub date_format: Option<DateFormat>,
    pub apps_rows: Option<u8>,
    pub apps_cols: Option<u8>,
    pub quick_actions: Option<Vec<String>>,
    pub grid_layout: Option<Value>,
    pub widget_order: Option<Vec<String>>,
    pub advanced_section_order: Option<Vec<String>>,
    pub widget_dimensions: BTreeMap<String, WidgetDimensions>,
    pub widget_opacity: BTreeMap<String, u8>,
    pub widget_refresh_intervals: BTreeMap<String, u32>,
    pub layout_locked: Option<bool>,
}

fn field<T: serde::de::DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let raw = obj.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(raw.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warnings.push(format!("dashboard setting '{key}' ignored: {e}"));
            None
        }
    }
}

/// Legacy id lists sometimes carry junk entries; keep the strings.
fn id_list(obj: &serde_json::Map<String, Value>, key: &str, warnings: &mut Vec<String>) -> Option<Vec<String>> {
    let raw = obj.get(key).filter(|v| !v.is_null())?;
    let Some(items) = raw.as_array() else {
        warnings.push(format!("legacy '{key}' is not a list and was ignored"));
        return None;
    };
    let ids: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect();
    if ids.len() != items.len() {
        warnings.push(format!("legacy '{key}' contained non-id entries"));
    }
    Some(ids)
}

impl DashboardConfig {
    /// Read the overrides object, returning it with any warnings produced.
    pub fn from_value(value: Option<&Value>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return (Self::default(), warnings);
        };
        let Some(obj) = value.as_object() else {
            warnings.push("dashboard config is not an object; using defaults".into());
            return (Self::default(), warnings);
        };

        let mut flags = BTreeMap::new();
        for (key, raw) in obj.iter().filter(|(k, _)| k.starts_with("show_")) {
            match raw.as_bool() {
                Some(b) => {
                    flags.insert(key.clone(), b);
                }
                None if raw.is_null() => {}
                None => warnings.push(format!("visibility flag '{key}' is not a boolean")),
            }
        }

        let cfg = Self {
            flags,
            clock_format: field(obj, "clock_format", &mut warnings),
            date_format: field(obj, "date_format", &mut warnings),
            apps_rows: field(obj, "apps_rows", &mut warnings),
            apps_cols: field(obj, "apps_cols", &mut warnings),
            quick_actions: field(obj, "quick_actions", &mut warnings),
            grid_layout: obj.get(GRID_LAYOUT_KEY).filter(|v| !v.is_null()).cloned(),
            widget_order: id_list(obj, WIDGET_ORDER_KEY, &mut warnings),
            advanced_section_order: id_list(obj, SECTION_ORDER_KEY, &mut warnings),
            widget_dimensions: parse_map(obj.get("widget_dimensions"), "widget_dimensions", &mut warnings),
            widget_opacity: parse_map(obj.get("widget_opacity"), "widget_opacity", &mut warnings),
            widget_refresh_intervals: parse_map(
                obj.get("widget_refresh_intervals"),
                "widget_refresh_intervals",
                &mut warnings,
            ),
            layout_locked: field(obj, "layout_locked", &mut warnings),
        };
        (cfg, warnings)
    }
}

/// Fully defaulted view of one mode's dashboard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub mode: Mode,
    pub visibility: BTreeMap<String, bool>,
    pub clock_format: ClockFormat,
    pub date_format: DateFormat,
    pub apps_rows: u8,
    pub apps_cols: u8,
    pub quick_actions: Vec<String>,
    pub grid_layout: GridLayout,
    pub widget_dimensions: BTreeMap<String, WidgetDimensions>,
    pub widget_opacity: BTreeMap<String, u8>,
    pub widget_refresh_intervals: BTreeMap<String, u32>,
    pub layout_locked: bool,
}

impl ResolvedConfig {
    pub fn resolve(cfg: &DashboardConfig, mode: Mode, grid_layout: GridLayout) -> Self {
        let defaults = ModeDefaults::for_mode(mode);
        let mut visibility: BTreeMap<String, bool> = WidgetRegistry::global()
            .visibility_flags()
            .into_iter()
            .map(|flag| (flag.to_string(), defaults.flag(flag)))
            .collect();
        for (flag, shown) in &cfg.flags {
            visibility.insert(flag.clone(), *shown);
        }

        Self {
            mode,
            visibility,
            clock_format: cfg.clock_format.unwrap_or(defaults.clock_format),
            date_format: cfg.date_format.unwrap_or(defaults.date_format),
            apps_rows: cfg.apps_rows.unwrap_or(defaults.apps_rows).clamp(1, MAX_APP_GRID),
            apps_cols: cfg.apps_cols.unwrap_or(defaults.apps_cols).clamp(1, MAX_APP_GRID),
            quick_actions: cfg.quick_actions.clone().unwrap_or_else(|| {
                defaults.quick_actions.iter().map(|a| a.to_string()).collect()
            }),
            grid_layout,
            widget_dimensions: cfg.widget_dimensions.clone(),
            widget_opacity: cfg.widget_opacity.clone(),
            widget_refresh_intervals: cfg.widget_refresh_intervals.clone(),
            layout_locked: cfg.layout_locked.unwrap_or(false),
        }
    }

    /// Whether the widget's flag is on. Unknown widgets stay visible.
    pub fn is_widget_visible(&self, id: &str) -> bool {
        WidgetRegistry::global()
            .get(id)
            .and_then(|w| w.visibility_flag)
            .and_then(|flag| self.visibility.get(flag).copied())
            .unwrap_or(true)
    }
}
