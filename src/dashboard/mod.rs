pub mod config;
pub mod dimensions;
pub mod edit;
pub mod grid;
pub mod history;
pub mod intent;
pub mod migrate;
pub mod mode;
pub mod resolver;
pub mod touch;
pub mod view;
pub mod widgets;

pub use config::{DashboardConfig, ModeDefaults, ResolvedConfig};
pub use dimensions::{WidgetDimensions, WidgetHeight, WidgetWidth};
pub use edit::{DragState, EditController};
pub use grid::{GridLayout, Row};
pub use history::{LayoutHistory, LayoutSnapshot};
pub use intent::{DropIntent, DropPosition};
pub use mode::Mode;
pub use resolver::ConfigResolver;
pub use touch::{DragSource, DropZone, TouchDragController, TouchSurface};
pub use view::{DashboardView, ViewEvent};
pub use widgets::{WidgetInfo, WidgetRegistry};

use crate::preferences::{HttpPreferencesBackend, PreferencesStore};
use crate::settings::Settings;
use anyhow::Result;
use eframe::egui::Pos2;

/// Owns the preferences store and the dashboard controllers.
///
/// Every mutation goes through `&mut self`, so edits, undo and redo never
/// interleave.
pub struct Dashboard {
    store: PreferencesStore,
    mode: Mode,
    edit: EditController,
    touch: TouchDragController,
}

impl Dashboard {
    pub fn new(store: PreferencesStore) -> Self {
        Self::with_undo_limit(store, history::DEFAULT_UNDO_LIMIT)
    }

    pub fn with_undo_limit(store: PreferencesStore, undo_limit: usize) -> Self {
        let mode = mode::selected_mode(store.preferences());
        Self {
            store,
            mode,
            edit: EditController::with_undo_limit(undo_limit),
            touch: TouchDragController::new(),
        }
    }

    /// Load preferences from the backend named in `settings`.
    pub fn connect(settings: &Settings) -> Result<Self> {
        let backend = HttpPreferencesBackend::new(&settings.backend_url, settings.request_timeout())?;
        tracing::info!(url = backend.url(), "loading dashboard preferences");
        let store = PreferencesStore::load(backend)?;
        Ok(Self::with_undo_limit(store, settings.undo_limit))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch mode and persist the choice. Edit mode is left first since its
    /// history belongs to the previous mode's layout.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.leave_edit();
        mode::select_mode(&mut self.store, mode)?;
        self.mode = mode;
        Ok(())
    }

    pub fn store(&self) -> &PreferencesStore {
        &self.store
    }

    /// Re-read the preferences aggregate, e.g. after another client saved.
    /// A mode changed elsewhere ends the current edit session, whose history
    /// belongs to the old mode.
    pub fn refresh(&mut self) -> Result<()> {
        self.store.refresh()?;
        let mode = mode::selected_mode(self.store.preferences());
        if mode != self.mode {
            tracing::info!(from = %self.mode, to = %mode, "ui mode changed by another client");
            self.leave_edit();
            self.mode = mode;
        }
        Ok(())
    }

    pub fn resolver(&mut self) -> ConfigResolver<'_> {
        ConfigResolver::new(&mut self.store, self.mode)
    }

    pub fn resolve(&mut self) -> ResolvedConfig {
        self.resolver().resolve()
    }

    pub fn grid_layout(&mut self) -> GridLayout {
        self.resolver().grid_layout()
    }

    pub fn edit(&self) -> &EditController {
        &self.edit
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_editing()
    }

    /// Enter or leave edit mode. Leaving does not reach the touch surface, so a
    /// touch drag in progress keeps its ghost until the next touch event; use
    /// [`exit_edit`](Self::exit_edit) when a surface is at hand.
    pub fn toggle_edit(&mut self) -> bool {
        if self.edit.is_editing() {
            self.leave_edit();
            return false;
        }
        self.edit.toggle_edit()
    }

    /// Leave edit mode, first abandoning any touch drag and restoring its
    /// visuals on `surface`.
    pub fn exit_edit(&mut self, surface: &mut dyn TouchSurface) {
        self.touch.touch_cancel(surface);
        self.leave_edit();
    }

    fn leave_edit(&mut self) {
        self.edit.exit_edit();
        self.touch.clear_zones();
    }

    pub fn start_drag(&mut self, widget_id: &str) -> bool {
        let Some((row, _)) = self.grid_layout().find(widget_id) else {
            return false;
        };
        self.edit.start_drag(widget_id, row)
    }

    pub fn end_drag(&mut self) {
        self.edit.end_drag();
    }

    pub fn handle_drop(&mut self, target_index: usize, position: DropPosition) -> Result<bool> {
        let mut resolver = ConfigResolver::new(&mut self.store, self.mode);
        self.edit.handle_drop(&mut resolver, target_index, position)
    }

    pub fn apply_intent(&mut self, intent: &DropIntent) -> Result<bool> {
        let mut resolver = ConfigResolver::new(&mut self.store, self.mode);
        self.edit.apply_intent(&mut resolver, intent)
    }

    /// Route an event from the mouse surface.
    pub fn handle_view_event(&mut self, event: ViewEvent) -> Result<bool> {
        match event {
            ViewEvent::DragStarted { widget_id, source_row } => {
                Ok(self.edit.start_drag(widget_id, source_row))
            }
            ViewEvent::Dropped(intent) => self.apply_intent(&intent),
            ViewEvent::DragCancelled => {
                self.edit.end_drag();
                Ok(false)
            }
        }
    }

    pub fn reorder_row(&mut self, src: usize, dest: usize) -> Result<bool> {
        let mut resolver = ConfigResolver::new(&mut self.store, self.mode);
        self.edit.reorder_row(&mut resolver, src, dest)
    }

    pub fn undo(&mut self) -> Result<bool> {
        let mut resolver = ConfigResolver::new(&mut self.store, self.mode);
        self.edit.undo(&mut resolver)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let mut resolver = ConfigResolver::new(&mut self.store, self.mode);
        self.edit.redo(&mut resolver)
    }

    pub fn touch(&mut self) -> &mut TouchDragController {
        &mut self.touch
    }

    /// Finish a touch gesture and apply the drop it produced, if any.
    pub fn touch_end(&mut self, surface: &mut dyn TouchSurface, at: Option<Pos2>) -> Result<bool> {
        match self.touch.touch_end(surface, at) {
            Some(intent) => self.apply_intent(&intent),
            None => Ok(false),
        }
    }
}
