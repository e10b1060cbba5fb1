//! Grid layout resolution and the one-way migrations from older formats.
//!
//! Every function here is pure. Migrations return `None` when there was
//! nothing to migrate, so callers can tell that apart from an empty result.

use crate::dashboard::config::{DashboardConfig, ModeDefaults};
use crate::dashboard::grid::{GridLayout, Row};
use crate::dashboard::mode::Mode;
use crate::dashboard::widgets::WidgetRegistry;
use std::collections::HashSet;

/// One source of a grid layout. Sources are tried in order until one yields.
pub type LayoutSource = fn(&DashboardConfig, Mode) -> Option<GridLayout>;

/// Layout sources, highest priority first.
pub const LAYOUT_SOURCES: &[LayoutSource] = &[
    stored_layout,
    legacy_section_order,
    legacy_widget_order,
    default_layout,
];

/// Old composite ids and the rows they were split into.
const COMPOSITES: &[(&str, &[&[&str]])] = &[
    ("launcher", &[&["favorites"], &["recent_apps"], &["my_apps"]]),
    (
        "gauges",
        &[&["cpu_gauge", "memory_gauge"], &["disk_gauge", "temp_gauge"]],
    ),
];

/// Advanced-mode section names whose widget id differs from the section id.
const SECTION_WIDGETS: &[(&str, &str)] = &[
    ("uptime", "uptime_load"),
    ("load", "uptime_load"),
    ("throughput", "network_throughput"),
    ("network", "network_throughput"),
    ("docker", "containers"),
    ("actions", "quick_actions"),
];

pub fn resolve_grid_layout(cfg: &DashboardConfig, mode: Mode) -> GridLayout {
    LAYOUT_SOURCES
        .iter()
        .find_map(|source| source(cfg, mode))
        .unwrap_or_else(|| ModeDefaults::for_mode(mode).layout())
}

/// The stored `grid_layout`, if valid, with pending id migrations applied.
pub fn stored_layout(cfg: &DashboardConfig, _mode: Mode) -> Option<GridLayout> {
    let raw = cfg.grid_layout.as_ref()?;
    let Some(layout) = GridLayout::parse_stored(raw) else {
        tracing::debug!("stored grid layout is invalid; trying legacy formats");
        return None;
    };
    Some(migrate_layout(&layout).unwrap_or(layout))
}

/// Apply every id migration to an already valid layout.
pub fn migrate_layout(layout: &GridLayout) -> Option<GridLayout> {
    let canonical = canonicalize_ids(layout);
    let current = canonical.as_ref().unwrap_or(layout);
    match decompose_deprecated(current) {
        Some(decomposed) => Some(decomposed),
        None => canonical,
    }
}

/// Rename hyphenated ids (`recent-apps`) to their registered form. A legacy id
/// whose canonical form is already present is dropped.
pub fn canonicalize_ids(layout: &GridLayout) -> Option<GridLayout> {
    let registry = WidgetRegistry::global();
    let present: HashSet<&str> = layout.widget_ids().collect();
    let mut changed = false;
    let mut rows = Vec::with_capacity(layout.len());
    for row in layout {
        let mut ids = Vec::with_capacity(row.len());
        for id in row.widgets() {
            match registry.canonical_id(id) {
                Some(canonical) if canonical != id => {
                    changed = true;
                    if !present.contains(canonical) && !ids.iter().any(|i: &String| i == canonical) {
                        ids.push(canonical.to_string());
                    }
                }
                _ => ids.push(id.clone()),
            }
        }
        if !ids.is_empty() {
            rows.push(Row { row: ids });
        }
    }
    changed.then(|| GridLayout::new(rows))
}

/// Replace deprecated composite widgets with the widgets that superseded them.
pub fn decompose_deprecated(layout: &GridLayout) -> Option<GridLayout> {
    let registry = WidgetRegistry::global();
    if !layout.widget_ids().any(|id| registry.is_deprecated(id)) {
        return None;
    }
    let mut placed: HashSet<String> = layout
        .widget_ids()
        .filter(|id| !registry.is_deprecated(id))
        .map(str::to_string)
        .collect();
    let mut next = GridLayout::default();
    for row in layout {
        let kept: Vec<String> = row
            .widgets()
            .iter()
            .filter(|id| !registry.is_deprecated(id))
            .cloned()
            .collect();
        if !kept.is_empty() {
            next.push(Row { row: kept });
        }
        for id in row.widgets().iter().filter(|id| registry.is_deprecated(id)) {
            match composite_rows(id) {
                Some(rows) => push_expanded(&mut next, rows, &mut placed),
                None => tracing::warn!(widget = %id, "deprecated widget has no replacement; dropped"),
            }
        }
    }
    Some(next)
}

/// Rebuild a layout from the old advanced-mode flat section order.
pub fn legacy_section_order(cfg: &DashboardConfig, mode: Mode) -> Option<GridLayout> {
    if mode != Mode::Advanced {
        return None;
    }
    let sections = cfg.advanced_section_order.as_ref().filter(|s| !s.is_empty())?;
    let registry = WidgetRegistry::global();
    let mut placed = HashSet::new();
    let mut layout = GridLayout::default();

    for section in sections {
        if let Some(rows) = composite_rows(section) {
            push_expanded(&mut layout, rows, &mut placed);
            continue;
        }
        let widget = SECTION_WIDGETS
            .iter()
            .find(|(name, _)| *name == section.as_str())
            .map(|(_, widget)| *widget)
            .or_else(|| registry.canonical_id(section).filter(|id| !registry.is_deprecated(id)));
        match widget {
            Some(id) => {
                if placed.insert(id.to_string()) {
                    layout.push(Row::single(id));
                }
            }
            None => tracing::debug!(section = %section, "unknown legacy section dropped"),
        }
    }

    append_missing_defaults(&mut layout, mode, &mut placed);
    tracing::info!(rows = layout.len(), "migrated advanced section order to grid layout");
    Some(layout)
}

/// Rebuild a layout from the old flat `widget_order` list.
pub fn legacy_widget_order(cfg: &DashboardConfig, _mode: Mode) -> Option<GridLayout> {
    let order = cfg.widget_order.as_ref().filter(|o| !o.is_empty())?;
    let registry = WidgetRegistry::global();
    let mut placed = HashSet::new();
    let mut layout = GridLayout::default();

    for key in order {
        if let Some(rows) = composite_rows(key) {
            push_expanded(&mut layout, rows, &mut placed);
            continue;
        }
        let id = registry
            .canonical_id(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.clone());
        if placed.insert(id.clone()) {
            layout.push(Row::single(id));
        }
    }

    if layout.is_empty() {
        return None;
    }
    tracing::info!(rows = layout.len(), "migrated widget order to grid layout");
    Some(layout)
}

pub fn default_layout(_cfg: &DashboardConfig, mode: Mode) -> Option<GridLayout> {
    Some(ModeDefaults::for_mode(mode).layout())
}

fn composite_rows(id: &str) -> Option<&'static [&'static [&'static str]]> {
    COMPOSITES
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(_, rows)| *rows)
}

fn push_expanded(layout: &mut GridLayout, rows: &[&[&str]], placed: &mut HashSet<String>) {
    for ids in rows {
        let fresh: Vec<String> = ids
            .iter()
            .filter(|id| placed.insert(id.to_string()))
            .map(|id| id.to_string())
            .collect();
        if !fresh.is_empty() {
            layout.push(Row { row: fresh });
        }
    }
}

/// Append default widgets that the migrated layout does not place yet.
/// A default row missing entirely keeps its pairing.
fn append_missing_defaults(layout: &mut GridLayout, mode: Mode, placed: &mut HashSet<String>) {
    for ids in ModeDefaults::for_mode(mode).grid_layout {
        let missing: Vec<&str> = ids.iter().copied().filter(|id| !placed.contains(*id)).collect();
        if missing.len() == ids.len() {
            push_expanded(layout, &[*ids], placed);
        } else {
            for id in missing {
                placed.insert(id.to_string());
                layout.push(Row::single(id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn cfg(raw: Value) -> DashboardConfig {
        DashboardConfig::from_value(Some(&raw)).0
    }

    #[test]
    fn nothing_stored_yields_mode_default() {
        let empty = DashboardConfig::default();
        assert_eq!(
            resolve_grid_layout(&empty, Mode::Standard),
            ModeDefaults::for_mode(Mode::Standard).layout()
        );
        assert_eq!(
            resolve_grid_layout(&empty, Mode::Advanced),
            ModeDefaults::for_mode(Mode::Advanced).layout()
        );
    }

    #[test]
    fn valid_stored_layout_wins() {
        let c = cfg(json!({
            "grid_layout": [{"row": ["search", "clock"]}, {"row": ["vitals"]}],
            "widget_order": ["clock"],
        }));
        assert_eq!(
            resolve_grid_layout(&c, Mode::Standard),
            GridLayout::from_ids(&[&["search", "clock"], &["vitals"]])
        );
    }

    #[test]
    fn widget_order_launcher_is_decomposed_in_place() {
        let c = cfg(json!({"widget_order": ["clock", "launcher", "vitals"]}));
        let layout = resolve_grid_layout(&c, Mode::Standard);
        assert_eq!(
            layout,
            GridLayout::from_ids(&[
                &["clock"],
                &["favorites"],
                &["recent_apps"],
                &["my_apps"],
                &["vitals"],
            ])
        );
        assert!(!layout.contains("launcher"));
    }

    #[test]
    fn widget_order_canonicalizes_and_dedupes() {
        let c = cfg(json!({"widget_order": ["recent-apps", "recent_apps", "launcher", "gauges"]}));
        let layout = legacy_widget_order(&c, Mode::Standard).unwrap();
        assert_eq!(
            layout,
            GridLayout::from_ids(&[
                &["recent_apps"],
                &["favorites"],
                &["my_apps"],
                &["cpu_gauge", "memory_gauge"],
                &["disk_gauge", "temp_gauge"],
            ])
        );
        assert!(layout.has_unique_ids());
    }

    #[test]
    fn stored_layout_with_launcher_is_migrated() {
        let c = cfg(json!({"grid_layout": [
            {"row": ["clock", "launcher"]},
            {"row": ["recent-apps"]},
        ]}));
        let layout = resolve_grid_layout(&c, Mode::Standard);
        assert_eq!(
            layout,
            GridLayout::from_ids(&[&["clock"], &["favorites"], &["my_apps"], &["recent_apps"]])
        );
    }

    #[test]
    fn migrations_are_idempotent() {
        let layout = GridLayout::from_ids(&[&["launcher"], &["my-apps"]]);
        let once = migrate_layout(&layout).unwrap();
        assert_eq!(migrate_layout(&once), None);
        assert_eq!(canonicalize_ids(&once), None);
        assert_eq!(decompose_deprecated(&once), None);
    }

    #[test]
    fn section_order_expands_gauges_and_appends_defaults() {
        let c = cfg(json!({"advanced_section_order": ["gauges", "mystery", "swarm", "uptime"]}));
        let layout = resolve_grid_layout(&c, Mode::Advanced);
        let rows = layout.rows();
        assert_eq!(rows[0], Row::pair("cpu_gauge", "memory_gauge"));
        assert_eq!(rows[1], Row::pair("disk_gauge", "temp_gauge"));
        assert_eq!(rows[2], Row::single("swarm"));
        assert_eq!(rows[3], Row::single("uptime_load"));
        assert!(!layout.contains("mystery"));
        for id in ModeDefaults::for_mode(Mode::Advanced).layout().widget_ids() {
            assert!(layout.contains(id), "{id} went missing");
        }
        // network_throughput was paired with uptime_load and lost its partner.
        assert!(rows.contains(&Row::single("network_throughput")));
        assert!(rows.contains(&Row::pair("clock", "search")));
        assert!(layout.has_unique_ids());
    }

    #[test]
    fn section_order_ignored_in_standard_mode() {
        let c = cfg(json!({"advanced_section_order": ["swarm"]}));
        assert_eq!(
            resolve_grid_layout(&c, Mode::Standard),
            ModeDefaults::for_mode(Mode::Standard).layout()
        );
    }

    #[test]
    fn corrupt_data_degrades_to_next_source() {
        let c = cfg(json!({
            "grid_layout": [{"row": ["a", "b", "c"]}],
            "advanced_section_order": "swarm",
            "widget_order": ["containers"],
        }));
        assert_eq!(
            resolve_grid_layout(&c, Mode::Advanced),
            GridLayout::from_ids(&[&["containers"]])
        );

        let c = cfg(json!({"grid_layout": "nope", "widget_order": 12}));
        assert_eq!(
            resolve_grid_layout(&c, Mode::Standard),
            ModeDefaults::for_mode(Mode::Standard).layout()
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let c = cfg(json!({"widget_order": ["launcher", "clock"]}));
        assert_eq!(
            resolve_grid_layout(&c, Mode::Standard),
            resolve_grid_layout(&c, Mode::Standard)
        );
    }
}
