use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Merge `patch` into `base` the way the preferences backend does.
///
/// Objects are merged key by key, a `null` value removes the key and any other
/// value replaces whatever was stored before.
pub fn merge_preferences(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(target), Value::Object(updates)) => {
            for (key, value) in updates {
                if value.is_null() {
                    target.remove(key);
                    continue;
                }
                if !value.is_object() {
                    target.insert(key.clone(), value.clone());
                    continue;
                }
                if let Some(existing) = target.get_mut(key).filter(|v| v.is_object()) {
                    merge_preferences(existing, value);
                    continue;
                }
                let mut fresh = Value::Object(Map::new());
                merge_preferences(&mut fresh, value);
                target.insert(key.clone(), fresh);
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// Storage for the preferences aggregate.
pub trait PreferencesBackend: Send {
    /// Fetch the full preferences document.
    fn fetch(&self) -> Result<Value>;

    /// Deep-merge `patch` into the stored document.
    fn save(&self, patch: &Value) -> Result<()>;
}

/// Preferences backend talking to the appliance REST API.
pub struct HttpPreferencesBackend {
    client: Client,
    url: String,
}

impl HttpPreferencesBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("cubeos dashboard")
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/preferences", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PreferencesBackend for HttpPreferencesBackend {
    fn fetch(&self) -> Result<Value> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?;
        let body = resp.text()?;
        if body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn save(&self, patch: &Value) -> Result<()> {
        let resp = self
            .client
            .put(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(patch)?)
            .send()
            .with_context(|| format!("PUT {}", self.url))?
            .error_for_status()?;
        let body = resp.text().unwrap_or_default();
        // Some firmware versions answer 200 with `{ "success": false }`.
        if let Ok(Value::Object(reply)) = serde_json::from_str::<Value>(&body) {
            if reply.get("success").and_then(Value::as_bool) == Some(false) {
                let msg = reply
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("preferences save rejected");
                bail!("{msg}");
            }
        }
        Ok(())
    }
}

/// In-process backend. Clones share the same document, which lets tests
/// observe what was written and inject save failures.
#[derive(Clone, Default)]
pub struct MemoryPreferencesBackend {
    doc: Arc<Mutex<Value>>,
    saves: Arc<Mutex<Vec<Value>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryPreferencesBackend {
    pub fn new(initial: Value) -> Self {
        Self {
            doc: Arc::new(Mutex::new(initial)),
            ..Self::default()
        }
    }

    /// Current stored document.
    pub fn document(&self) -> Value {
        self.doc
            .lock()
            .map(|doc| doc.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Every patch accepted so far, oldest first.
    pub fn saved_patches(&self) -> Vec<Value> {
        self.saves
            .lock()
            .map(|saves| saves.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Make subsequent saves fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PreferencesBackend for MemoryPreferencesBackend {
    fn fetch(&self) -> Result<Value> {
        let doc = self
            .doc
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        if doc.is_null() {
            return Ok(Value::Object(Map::new()));
        }
        Ok(doc.clone())
    }

    fn save(&self, patch: &Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("preferences backend unavailable");
        }
        let mut doc = self
            .doc
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        if doc.is_null() {
            *doc = Value::Object(Map::new());
        }
        merge_preferences(&mut doc, patch);
        if let Ok(mut saves) = self.saves.lock() {
            saves.push(patch.clone());
        }
        Ok(())
    }
}

/// Client-side copy of the preferences aggregate.
///
/// Writes are partial: only the changed sub-tree is sent and the local copy is
/// updated once the backend accepted it. A failed write re-fetches the
/// authoritative document so the UI never shows state the server rejected.
pub struct PreferencesStore {
    backend: Box<dyn PreferencesBackend>,
    prefs: Value,
}

impl PreferencesStore {
    /// Store with an empty document. Call [`refresh`](Self::refresh) to load.
    pub fn new(backend: impl PreferencesBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            prefs: Value::Object(Map::new()),
        }
    }

    /// Create the store and fetch the current document.
    pub fn load(backend: impl PreferencesBackend + 'static) -> Result<Self> {
        let mut store = Self::new(backend);
        store.refresh()?;
        Ok(store)
    }

    pub fn refresh(&mut self) -> Result<()> {
        let prefs = self.backend.fetch()?;
        self.prefs = if prefs.is_object() {
            prefs
        } else {
            tracing::warn!("preferences document is not an object; ignoring it");
            Value::Object(Map::new())
        };
        Ok(())
    }

    pub fn preferences(&self) -> &Value {
        &self.prefs
    }

    /// Look up a value by JSON pointer, e.g. `/dashboard/standard`.
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.prefs.pointer(pointer)
    }

    pub fn save_partial(&mut self, patch: Value) -> Result<()> {
        match self.backend.save(&patch) {
            Ok(()) => {
                merge_preferences(&mut self.prefs, &patch);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to save preferences");
                if let Err(refetch) = self.refresh() {
                    tracing::warn!(error = %refetch, "failed to re-fetch preferences after save error");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_recurses_into_objects() {
        let mut base = json!({"dashboard": {"standard": {"show_clock": true, "clock_format": "24h"}}});
        merge_preferences(
            &mut base,
            &json!({"dashboard": {"standard": {"show_clock": false}}}),
        );
        assert_eq!(
            base,
            json!({"dashboard": {"standard": {"show_clock": false, "clock_format": "24h"}}})
        );
    }

    #[test]
    fn merge_null_removes_key() {
        let mut base = json!({"dashboard": {"standard": {"show_clock": false}, "advanced": {}}});
        merge_preferences(&mut base, &json!({"dashboard": {"standard": null}}));
        assert_eq!(base, json!({"dashboard": {"advanced": {}}}));
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        let mut base = json!({"order": ["a", "b", "c"]});
        merge_preferences(&mut base, &json!({"order": ["c"]}));
        assert_eq!(base, json!({"order": ["c"]}));
    }

    #[test]
    fn nested_nulls_in_new_subtree_are_dropped() {
        let mut base = json!({});
        merge_preferences(&mut base, &json!({"dashboard": {"advanced": {"a": 1, "b": null}}}));
        assert_eq!(base, json!({"dashboard": {"advanced": {"a": 1}}}));
    }

    #[test]
    fn failed_save_refetches_authoritative_document() {
        let backend = MemoryPreferencesBackend::new(json!({"theme": "dark"}));
        let mut store = PreferencesStore::load(backend.clone()).unwrap();
        store.prefs = json!({"theme": "stale"});

        backend.set_failing(true);
        assert!(store.save_partial(json!({"theme": "light"})).is_err());
        assert_eq!(store.preferences(), &json!({"theme": "dark"}));
        assert!(backend.saved_patches().is_empty());
    }

    #[test]
    fn successful_save_updates_local_copy() {
        let backend = MemoryPreferencesBackend::default();
        let mut store = PreferencesStore::load(backend.clone()).unwrap();
        store
            .save_partial(json!({"dashboard": {"standard": {"show_search": false}}}))
            .unwrap();
        assert_eq!(
            store.get("/dashboard/standard/show_search"),
            Some(&json!(false))
        );
        assert_eq!(backend.document(), store.preferences().clone());
    }
}
