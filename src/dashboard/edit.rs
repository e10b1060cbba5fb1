use crate::dashboard::config::{GRID_LAYOUT_KEY, SECTION_ORDER_KEY};
use crate::dashboard::grid::GridLayout;
use crate::dashboard::history::{LayoutHistory, LayoutSnapshot};
use crate::dashboard::intent::{DropIntent, DropPosition};
use crate::dashboard::resolver::ConfigResolver;
use anyhow::Result;
use serde_json::{Map, Value};

/// Widget currently being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub widget_id: String,
    pub source_row: Option<usize>,
}

/// Layout edit mode, drag tracking and undo/redo.
///
/// Operations that return `Ok(false)` were no-ops: not editing, nothing
/// dragged, an invalid target or an empty history. Only persistence failures
/// surface as errors.
#[derive(Debug, Default)]
pub struct EditController {
    editing: bool,
    drag: Option<DragState>,
    history: LayoutHistory,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_undo_limit(limit: usize) -> Self {
        Self {
            history: LayoutHistory::with_limit(limit),
            ..Self::default()
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn toggle_edit(&mut self) -> bool {
        if self.editing {
            self.exit_edit();
        } else {
            self.editing = true;
            tracing::info!("dashboard edit mode entered");
        }
        self.editing
    }

    /// Leave edit mode. The saved layout becomes the only state; drag state
    /// and history are dropped.
    pub fn exit_edit(&mut self) {
        if self.editing {
            tracing::info!(undo = self.history.undo_len(), "dashboard edit mode left");
        }
        self.editing = false;
        self.drag = None;
        self.history.clear();
    }

    pub fn dragging(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn start_drag(&mut self, widget_id: impl Into<String>, source_row: usize) -> bool {
        if !self.editing {
            return false;
        }
        self.drag = Some(DragState {
            widget_id: widget_id.into(),
            source_row: Some(source_row),
        });
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Drop the dragged widget relative to row `target_index` and save.
    pub fn handle_drop(
        &mut self,
        resolver: &mut ConfigResolver<'_>,
        target_index: usize,
        position: DropPosition,
    ) -> Result<bool> {
        let Some(drag) = self.drag.take() else {
            return Ok(false);
        };
        if !self.editing {
            return Ok(false);
        }
        let current = Self::snapshot(resolver);
        let Some(next) = current
            .grid_layout
            .with_drop(&drag.widget_id, target_index, position)
        else {
            tracing::debug!(
                widget = %drag.widget_id,
                target_index,
                position = position.as_str(),
                "drop ignored"
            );
            return Ok(false);
        };
        self.commit(resolver, current, next)
    }

    /// Handle a completed gesture from either input pipeline.
    pub fn apply_intent(
        &mut self,
        resolver: &mut ConfigResolver<'_>,
        intent: &DropIntent,
    ) -> Result<bool> {
        if !self.editing {
            return Ok(false);
        }
        let Some((source_row, _)) = resolver.grid_layout().find(&intent.dragged_id) else {
            tracing::debug!(widget = %intent.dragged_id, "drop of a widget not in the layout ignored");
            return Ok(false);
        };
        self.drag = Some(DragState {
            widget_id: intent.dragged_id.clone(),
            source_row: Some(source_row),
        });
        self.handle_drop(resolver, intent.target_index, intent.position)
    }

    /// Move a whole row. Out-of-range indices are ignored.
    pub fn reorder_row(
        &mut self,
        resolver: &mut ConfigResolver<'_>,
        src: usize,
        dest: usize,
    ) -> Result<bool> {
        let current = Self::snapshot(resolver);
        let Some(next) = current.grid_layout.with_row_moved(src, dest) else {
            return Ok(false);
        };
        if !self.editing {
            resolver.update_grid_layout(&next)?;
            return Ok(true);
        }
        self.commit(resolver, current, next)
    }

    pub fn undo(&mut self, resolver: &mut ConfigResolver<'_>) -> Result<bool> {
        if !self.history.can_undo() {
            return Ok(false);
        }
        let current = Self::snapshot(resolver);
        let Some(target) = self.history.undo(current) else {
            return Ok(false);
        };
        if let Err(err) = Self::restore(resolver, &target) {
            self.history.revert_undo(target);
            return Err(err);
        }
        Ok(true)
    }

    pub fn redo(&mut self, resolver: &mut ConfigResolver<'_>) -> Result<bool> {
        if !self.history.can_redo() {
            return Ok(false);
        }
        let current = Self::snapshot(resolver);
        let Some(target) = self.history.redo(current) else {
            return Ok(false);
        };
        if let Err(err) = Self::restore(resolver, &target) {
            self.history.revert_redo(target);
            return Err(err);
        }
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &LayoutHistory {
        &self.history
    }

    fn snapshot(resolver: &ConfigResolver<'_>) -> LayoutSnapshot {
        LayoutSnapshot {
            grid_layout: resolver.grid_layout(),
            advanced_section_order: resolver.raw_value(SECTION_ORDER_KEY),
        }
    }

    fn commit(
        &mut self,
        resolver: &mut ConfigResolver<'_>,
        before: LayoutSnapshot,
        next: GridLayout,
    ) -> Result<bool> {
        resolver.update_grid_layout(&next)?;
        self.history.commit(before);
        Ok(true)
    }

    fn restore(resolver: &mut ConfigResolver<'_>, snapshot: &LayoutSnapshot) -> Result<()> {
        let mut updates = Map::new();
        updates.insert(GRID_LAYOUT_KEY.into(), snapshot.grid_layout.to_value());
        updates.insert(
            SECTION_ORDER_KEY.into(),
            snapshot.advanced_section_order.clone().unwrap_or(Value::Null),
        );
        resolver.update_configs(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::config::ModeDefaults;
    use crate::dashboard::grid::Row;
    use crate::dashboard::mode::Mode;
    use crate::preferences::{MemoryPreferencesBackend, PreferencesStore};
    use serde_json::json;

    fn store() -> (MemoryPreferencesBackend, PreferencesStore) {
        let backend = MemoryPreferencesBackend::default();
        let store = PreferencesStore::load(backend.clone()).unwrap();
        (backend, store)
    }

    fn editing() -> EditController {
        let mut edit = EditController::new();
        edit.toggle_edit();
        edit
    }

    #[test]
    fn drag_requires_edit_mode() {
        let mut edit = EditController::new();
        assert!(!edit.start_drag("clock", 0));
        assert!(edit.toggle_edit());
        assert!(edit.start_drag("clock", 0));
        assert!(!edit.toggle_edit());
        assert!(edit.dragging().is_none());
    }

    #[test]
    fn drop_example_moves_search_beside_clock() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        edit.start_drag("search", 1);
        assert!(edit.handle_drop(&mut resolver, 0, DropPosition::Left).unwrap());

        let layout = resolver.grid_layout();
        assert_eq!(layout.rows()[0], Row::pair("search", "clock"));
        assert_eq!(layout.rows()[1], Row::single("status"));
        assert!(layout.has_unique_ids());
        assert!(edit.dragging().is_none());
        assert_eq!(edit.history().undo_len(), 1);
    }

    #[test]
    fn invalid_drop_pushes_nothing() {
        let (backend, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        edit.start_drag("search", 1);
        assert!(!edit.handle_drop(&mut resolver, 42, DropPosition::Right).unwrap());
        assert!(edit.dragging().is_none());
        assert!(!edit.can_undo());
        assert!(backend.saved_patches().is_empty());
    }

    #[test]
    fn drop_without_drag_is_noop() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        assert!(!edit.handle_drop(&mut resolver, 0, DropPosition::Before).unwrap());
    }

    #[test]
    fn undo_then_redo_is_symmetric() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        let l0 = resolver.grid_layout();

        edit.start_drag("my_apps", 7);
        edit.handle_drop(&mut resolver, 0, DropPosition::Before).unwrap();
        let l1 = resolver.grid_layout();
        assert_ne!(l0, l1);

        assert!(edit.undo(&mut resolver).unwrap());
        assert_eq!(resolver.grid_layout(), l0);
        assert!(edit.redo(&mut resolver).unwrap());
        assert_eq!(resolver.grid_layout(), l1);
        assert!(!edit.redo(&mut resolver).unwrap());
    }

    #[test]
    fn undo_stack_keeps_last_twenty() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        for i in 0..25 {
            let (src, dest) = if i % 2 == 0 { (0, 1) } else { (1, 0) };
            assert!(edit.reorder_row(&mut resolver, src, dest).unwrap());
        }
        assert_eq!(edit.history().undo_len(), 20);
    }

    #[test]
    fn new_edit_clears_redo() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        edit.reorder_row(&mut resolver, 0, 2).unwrap();
        edit.undo(&mut resolver).unwrap();
        assert!(edit.can_redo());
        edit.reorder_row(&mut resolver, 3, 1).unwrap();
        assert!(!edit.can_redo());
    }

    #[test]
    fn exit_clears_history() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        edit.reorder_row(&mut resolver, 0, 1).unwrap();
        edit.undo(&mut resolver).unwrap();
        edit.exit_edit();
        assert!(!edit.can_undo());
        assert!(!edit.can_redo());
        assert!(!edit.is_editing());
    }

    #[test]
    fn failed_save_rolls_back_history() {
        let (backend, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        backend.set_failing(true);
        assert!(edit.reorder_row(&mut resolver, 0, 1).is_err());
        assert!(!edit.can_undo());
        assert_eq!(
            resolver.grid_layout(),
            ModeDefaults::for_mode(Mode::Standard).layout()
        );

        backend.set_failing(false);
        edit.reorder_row(&mut resolver, 0, 1).unwrap();
        backend.set_failing(true);
        assert!(edit.undo(&mut resolver).is_err());
        assert!(edit.can_undo());
        assert!(!edit.can_redo());
    }

    #[test]
    fn undo_restores_legacy_section_order() {
        let backend = MemoryPreferencesBackend::new(json!({
            "dashboard": {"advanced": {"advanced_section_order": ["swarm", "gauges"]}}
        }));
        let mut store = PreferencesStore::load(backend.clone()).unwrap();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Advanced);
        let mut edit = editing();
        let migrated = resolver.grid_layout();
        assert_eq!(migrated.rows()[0], Row::single("swarm"));

        edit.reorder_row(&mut resolver, 0, 1).unwrap();
        edit.undo(&mut resolver).unwrap();
        assert_eq!(resolver.grid_layout(), migrated);
        assert_eq!(
            resolver.raw_value(SECTION_ORDER_KEY),
            Some(json!(["swarm", "gauges"]))
        );
    }

    #[test]
    fn intent_drives_same_drop() {
        let (_, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        let intent = DropIntent {
            dragged_id: "search".into(),
            target_index: 0,
            position: DropPosition::Left,
        };
        assert!(edit.apply_intent(&mut resolver, &intent).unwrap());
        assert_eq!(resolver.grid_layout().rows()[0], Row::pair("search", "clock"));

        edit.exit_edit();
        assert!(!edit.apply_intent(&mut resolver, &intent).unwrap());
    }

    #[test]
    fn intent_for_unplaced_widget_is_ignored() {
        let (backend, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        let intent = DropIntent {
            dragged_id: "weather".into(),
            target_index: 0,
            position: DropPosition::Before,
        };
        assert!(!edit.apply_intent(&mut resolver, &intent).unwrap());
        assert!(!resolver.grid_layout().contains("weather"));
        assert!(!edit.can_undo());
        assert!(backend.saved_patches().is_empty());
    }

    #[test]
    fn drop_back_onto_own_row_records_nothing() {
        let (backend, mut store) = store();
        let mut resolver = ConfigResolver::new(&mut store, Mode::Standard);
        let mut edit = editing();
        edit.start_drag("search", 1);
        assert!(!edit.handle_drop(&mut resolver, 1, DropPosition::After).unwrap());
        assert_eq!(
            resolver.grid_layout(),
            ModeDefaults::for_mode(Mode::Standard).layout()
        );
        assert!(!edit.can_undo());
        assert!(backend.saved_patches().is_empty());
    }
}
