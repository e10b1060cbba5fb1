use crate::dashboard::config::{DashboardConfig, ResolvedConfig, GRID_LAYOUT_KEY};
use crate::dashboard::grid::GridLayout;
use crate::dashboard::migrate::resolve_grid_layout;
use crate::dashboard::mode::Mode;
use crate::preferences::PreferencesStore;
use anyhow::Result;
use serde_json::{json, Map, Value};

/// Read and write access to one mode's dashboard configuration.
///
/// Reads layer the stored overrides over the mode defaults. Writes go out as
/// partial patches `{ dashboard: { <mode>: { ... } } }`; the backend merges
/// them, so the whole document is never rewritten from here.
pub struct ConfigResolver<'a> {
    store: &'a mut PreferencesStore,
    mode: Mode,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(store: &'a mut PreferencesStore, mode: Mode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn raw(&self) -> Option<&Value> {
        self.store
            .preferences()
            .get("dashboard")?
            .get(self.mode.as_str())
    }

    /// A stored key exactly as persisted.
    pub fn raw_value(&self, key: &str) -> Option<Value> {
        self.raw()?.get(key).filter(|v| !v.is_null()).cloned()
    }

    pub fn config(&self) -> DashboardConfig {
        let (cfg, warnings) = DashboardConfig::from_value(self.raw());
        for w in warnings {
            tracing::warn!(mode = %self.mode, "{w}");
        }
        cfg
    }

    pub fn resolve(&self) -> ResolvedConfig {
        let cfg = self.config();
        let layout = resolve_grid_layout(&cfg, self.mode);
        ResolvedConfig::resolve(&cfg, self.mode, layout)
    }

    pub fn grid_layout(&self) -> GridLayout {
        resolve_grid_layout(&self.config(), self.mode)
    }

    pub fn is_widget_visible(&self, id: &str) -> bool {
        let cfg = self.config();
        ResolvedConfig::resolve(&cfg, self.mode, GridLayout::default()).is_widget_visible(id)
    }

    pub fn update_config(&mut self, key: &str, value: Value) -> Result<()> {
        let mut updates = Map::new();
        updates.insert(key.to_string(), value);
        self.update_configs(updates)
    }

    /// Persist several keys in one request.
    pub fn update_configs(&mut self, updates: Map<String, Value>) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = updates.keys().cloned().collect();
        let patch = json!({ "dashboard": { self.mode.as_str(): Value::Object(updates) } });
        self.store.save_partial(patch)?;
        tracing::debug!(mode = %self.mode, ?keys, "dashboard config saved");
        Ok(())
    }

    /// Persist a grid layout. Callers keep rows at two widgets or fewer.
    pub fn update_grid_layout(&mut self, layout: &GridLayout) -> Result<()> {
        if !layout.is_valid() {
            tracing::warn!(mode = %self.mode, "saving a grid layout that will not validate on read");
        }
        self.update_config(GRID_LAYOUT_KEY, layout.to_value())
    }

    /// Drop every override for this mode.
    pub fn reset_defaults(&mut self) -> Result<()> {
        self.store
            .save_partial(json!({ "dashboard": { self.mode.as_str(): Value::Null } }))?;
        tracing::info!(mode = %self.mode, "dashboard reset to defaults");
        Ok(())
    }
}
