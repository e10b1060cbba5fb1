use crate::dashboard::resolver::ConfigResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DIMENSIONS_KEY: &str = "widget_dimensions";
pub const OPACITY_KEY: &str = "widget_opacity";
pub const REFRESH_KEY: &str = "widget_refresh_intervals";
pub const LOCKED_KEY: &str = "layout_locked";

const MIN_OPACITY: u8 = 10;
const MAX_OPACITY: u8 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WidgetWidth {
    Half,
    Full,
}

impl Default for WidgetWidth {
    fn default() -> Self {
        Self::Full
    }
}

/// Height override. Stored as `"auto"`, `"collapsed"` or a pixel count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "HeightRepr", into = "HeightRepr")]
pub enum WidgetHeight {
    Auto,
    Collapsed,
    Pixels(u32),
}

impl Default for WidgetHeight {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HeightRepr {
    Pixels(u32),
    Fractional(f64),
    Keyword(String),
}

impl TryFrom<HeightRepr> for WidgetHeight {
    type Error = String;

    fn try_from(repr: HeightRepr) -> Result<Self, Self::Error> {
        match repr {
            HeightRepr::Pixels(px) => Ok(WidgetHeight::Pixels(px)),
            HeightRepr::Fractional(px) if px.is_finite() && px >= 0.0 => {
                Ok(WidgetHeight::Pixels(px.round() as u32))
            }
            HeightRepr::Fractional(px) => Err(format!("invalid widget height {px}")),
            HeightRepr::Keyword(k) => match k.as_str() {
                "auto" => Ok(WidgetHeight::Auto),
                "collapsed" => Ok(WidgetHeight::Collapsed),
                other => Err(format!("unknown widget height '{other}'")),
            },
        }
    }
}

impl From<WidgetHeight> for HeightRepr {
    fn from(height: WidgetHeight) -> Self {
        match height {
            WidgetHeight::Auto => HeightRepr::Keyword("auto".into()),
            WidgetHeight::Collapsed => HeightRepr::Keyword("collapsed".into()),
            WidgetHeight::Pixels(px) => HeightRepr::Pixels(px),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WidgetDimensions {
    #[serde(default)]
    pub width: WidgetWidth,
    #[serde(default)]
    pub height: WidgetHeight,
}

impl WidgetDimensions {
    pub fn is_collapsed(&self) -> bool {
        self.height == WidgetHeight::Collapsed
    }
}

/// Parse a stored map entry by entry so one bad record does not discard the rest.
pub(crate) fn parse_map<T: serde::de::DeserializeOwned>(
    value: Option<&Value>,
    key: &str,
    warnings: &mut Vec<String>,
) -> BTreeMap<String, T> {
    let mut out = BTreeMap::new();
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return out;
    };
    let Some(entries) = value.as_object() else {
        warnings.push(format!("'{key}' is not an object and was ignored"));
        return out;
    };
    for (id, raw) in entries {
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(v) => {
                out.insert(id.clone(), v);
            }
            Err(e) => warnings.push(format!("'{key}.{id}' ignored: {e}")),
        }
    }
    out
}

impl ConfigResolver<'_> {
    pub fn widget_dimensions(&self, id: &str) -> WidgetDimensions {
        self.config()
            .widget_dimensions
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_widget_dimensions(&mut self, id: &str, dims: WidgetDimensions) -> anyhow::Result<()> {
        let mut map = self.config().widget_dimensions;
        map.insert(id.to_string(), dims);
        self.update_config(DIMENSIONS_KEY, serde_json::to_value(&map)?)
    }

    pub fn set_widget_width(&mut self, id: &str, width: WidgetWidth) -> anyhow::Result<()> {
        let dims = WidgetDimensions {
            width,
            ..self.widget_dimensions(id)
        };
        self.set_widget_dimensions(id, dims)
    }

    pub fn set_widget_height(&mut self, id: &str, height: WidgetHeight) -> anyhow::Result<()> {
        let dims = WidgetDimensions {
            height,
            ..self.widget_dimensions(id)
        };
        self.set_widget_dimensions(id, dims)
    }

    /// Flip between half and full width. Only meaningful for a widget alone in
    /// its row; paired widgets always render at half width.
    pub fn toggle_width(&mut self, id: &str) -> anyhow::Result<WidgetWidth> {
        let width = match self.widget_dimensions(id).width {
            WidgetWidth::Half => WidgetWidth::Full,
            WidgetWidth::Full => WidgetWidth::Half,
        };
        self.set_widget_width(id, width)?;
        Ok(width)
    }

    /// Collapse the widget, or restore it to automatic height if collapsed.
    /// An explicit pixel height collapses too.
    pub fn toggle_collapse(&mut self, id: &str) -> anyhow::Result<WidgetHeight> {
        let height = match self.widget_dimensions(id).height {
            WidgetHeight::Collapsed => WidgetHeight::Auto,
            WidgetHeight::Auto | WidgetHeight::Pixels(_) => WidgetHeight::Collapsed,
        };
        self.set_widget_height(id, height)?;
        Ok(height)
    }

    /// Opacity in percent, 100 when unset.
    pub fn widget_opacity(&self, id: &str) -> u8 {
        self.config()
            .widget_opacity
            .get(id)
            .map(|o| (*o).clamp(MIN_OPACITY, MAX_OPACITY))
            .unwrap_or(MAX_OPACITY)
    }

    pub fn set_widget_opacity(&mut self, id: &str, opacity: u8) -> anyhow::Result<()> {
        let mut map = self.config().widget_opacity;
        map.insert(id.to_string(), opacity.clamp(MIN_OPACITY, MAX_OPACITY));
        self.update_config(OPACITY_KEY, serde_json::to_value(&map)?)
    }

    /// Polling interval for a widget: the layout override, else the registry
    /// default. `None` for widgets that never poll.
    pub fn refresh_interval(&self, id: &str) -> Option<Duration> {
        let secs = self
            .config()
            .widget_refresh_intervals
            .get(id)
            .copied()
            .filter(|s| *s > 0)
            .or_else(|| {
                crate::dashboard::widgets::WidgetRegistry::global()
                    .get(id)
                    .and_then(|w| w.default_refresh_secs)
            })?;
        Some(Duration::from_secs(u64::from(secs)))
    }

    pub fn set_refresh_interval(&mut self, id: &str, secs: u32) -> anyhow::Result<()> {
        let mut map = self.config().widget_refresh_intervals;
        map.insert(id.to_string(), secs);
        self.update_config(REFRESH_KEY, serde_json::to_value(&map)?)
    }

    pub fn is_layout_locked(&self) -> bool {
        self.config().layout_locked.unwrap_or(false)
    }

    pub fn set_layout_locked(&mut self, locked: bool) -> anyhow::Result<()> {
        self.update_config(LOCKED_KEY, Value::Bool(locked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::mode::Mode;
    use crate::preferences::{MemoryPreferencesBackend, PreferencesStore};
    use serde_json::json;

    fn store(initial: Value) -> (MemoryPreferencesBackend, PreferencesStore) {
        let backend = MemoryPreferencesBackend::new(initial);
        let store = PreferencesStore::load(backend.clone()).unwrap();
        (backend, store)
    }

    #[test]
    fn height_accepts_keywords_and_pixels() {
        let dims: WidgetDimensions =
            serde_json::from_value(json!({"width": "half", "height": 240})).unwrap();
        assert_eq!(dims.width, WidgetWidth::Half);
        assert_eq!(dims.height, WidgetHeight::Pixels(240));
        let dims: WidgetDimensions = serde_json::from_value(json!({"height": "collapsed"})).unwrap();
        assert_eq!(dims.width, WidgetWidth::Full);
        assert!(dims.is_collapsed());
        assert!(serde_json::from_value::<WidgetDimensions>(json!({"height": "tall"})).is_err());
        assert_eq!(
            serde_json::to_value(WidgetDimensions::default()).unwrap(),
            json!({"width": "full", "height": "auto"})
        );
    }

    #[test]
    fn unset_widget_defaults_to_full_auto() {
        let (_, mut store) = store(json!({}));
        let resolver = ConfigResolver::new(&mut store, Mode::Standard);
        assert_eq!(resolver.widget_dimensions("vitals"), WidgetDimensions::default());
    }

    #[test]
    fn toggles_persist_whole_map() {
        let (backend, mut store) = store(json!({
            "dashboard": {"standard": {"widget_dimensions": {"clock": {"width": "half", "height": "auto"}}}}
        }));
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        assert_eq!(resolver.toggle_width("vitals").unwrap(), WidgetWidth::Half);

        let patches = backend.saved_patches();
        assert_eq!(
            patches[0],
            json!({"dashboard": {"standard": {"widget_dimensions": {
                "clock": {"width": "half", "height": "auto"},
                "vitals": {"width": "half", "height": "auto"}
            }}}})
        );
        assert_eq!(resolver.toggle_width("vitals").unwrap(), WidgetWidth::Full);
    }

    #[test]
    fn collapse_wins_over_pixel_height() {
        let (_, mut store) = store(json!({}));
        let mut resolver = ConfigResolver::new(&mut store, Mode::Advanced);
        resolver.set_widget_height("swarm", WidgetHeight::Pixels(320)).unwrap();
        assert_eq!(resolver.toggle_collapse("swarm").unwrap(), WidgetHeight::Collapsed);
        assert_eq!(resolver.toggle_collapse("swarm").unwrap(), WidgetHeight::Auto);
        assert_eq!(resolver.widget_dimensions("swarm").height, WidgetHeight::Auto);
    }

    #[test]
    fn opacity_is_clamped() {
        let (_, mut store) = store(json!({
            "dashboard": {"standard": {"widget_opacity": {"clock": 0, "search": "x"}}}
        }));
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        assert_eq!(resolver.widget_opacity("clock"), MIN_OPACITY);
        assert_eq!(resolver.widget_opacity("search"), 100);
        resolver.set_widget_opacity("vitals", 250).unwrap();
        assert_eq!(resolver.widget_opacity("vitals"), 100);
    }

    #[test]
    fn refresh_interval_falls_back_to_registry() {
        let (_, mut store) = store(json!({
            "dashboard": {"advanced": {"widget_refresh_intervals": {"swarm": 60, "containers": 0}}}
        }));
        let resolver = ConfigResolver::new(&mut store, Mode::Advanced);
        assert_eq!(resolver.refresh_interval("swarm"), Some(Duration::from_secs(60)));
        assert_eq!(resolver.refresh_interval("containers"), Some(Duration::from_secs(10)));
        assert_eq!(resolver.refresh_interval("clock"), None);
    }

    #[test]
    fn layout_lock_roundtrip() {
        let (_, mut store) = store(json!({}));
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        assert!(!resolver.is_layout_locked());
        resolver.set_layout_locked(true).unwrap();
        assert!(resolver.is_layout_locked());
    }
}
