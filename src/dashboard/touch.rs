//! Touch input for layout editing.
//!
//! Native drag and drop is unreliable on touch screens, so a long press starts
//! a drag and the controller does its own hit testing against drop zones the
//! rendering layer registers. Visual side effects go through [`TouchSurface`].

use crate::dashboard::intent::{DropIntent, DropPosition};
use eframe::egui::{vec2, Pos2, Rect, Vec2};
use std::time::{Duration, Instant};

pub const LONG_PRESS: Duration = Duration::from_millis(300);
/// Movement before the long press fires that turns the gesture into a scroll.
pub const MOVE_THRESHOLD: f32 = 8.0;
/// Scroll distance after which cached zone rectangles are re-measured.
pub const ZONE_REFRESH_SCROLL: f32 = 5.0;
pub const AUTO_SCROLL_EDGE: f32 = 60.0;
/// Auto-scroll step per frame with the finger on the viewport edge.
pub const AUTO_SCROLL_MAX_STEP: f32 = 20.0;
pub const HAPTIC_PULSE: Duration = Duration::from_millis(50);
pub const SOURCE_DIMMED_OPACITY: f32 = 0.3;

const ZONE_PADDING: f32 = 8.0;
const SIDE_EXTRA_PADDING: f32 = 24.0;
const ROW_EXTRA_PADDING: f32 = 16.0;

/// Handle to an element owned by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostStyle {
    pub opacity: f32,
    pub pointer_events: bool,
}

impl Default for GhostStyle {
    fn default() -> Self {
        Self {
            opacity: 0.5,
            pointer_events: false,
        }
    }
}

/// Rendering-side effects of a touch drag. Rectangles are in viewport
/// coordinates, like the touch points.
pub trait TouchSurface {
    fn element_rect(&self, element: ElementRef) -> Option<Rect>;
    fn scroll_offset(&self) -> f32;
    fn viewport_height(&self) -> f32;
    fn scroll_by(&mut self, delta: f32);
    fn set_scroll_locked(&mut self, locked: bool);
    fn set_element_opacity(&mut self, element: ElementRef, opacity: f32);
    fn show_ghost(&mut self, source: ElementRef, style: GhostStyle, at: Pos2);
    fn move_ghost(&mut self, at: Pos2);
    fn remove_ghost(&mut self);
    fn vibrate(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePosition {
    Before,
    After,
    Left,
    Right,
    /// A whole legacy section slot; lands above the target.
    Section,
}

impl ZonePosition {
    pub fn drop_position(self) -> DropPosition {
        match self {
            ZonePosition::Before | ZonePosition::Section => DropPosition::Before,
            ZonePosition::After => DropPosition::After,
            ZonePosition::Left => DropPosition::Left,
            ZonePosition::Right => DropPosition::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Gap between rows.
    Row,
    /// Slot beside a single widget.
    Side,
    Section,
}

impl ZoneKind {
    fn padding(self) -> Vec2 {
        match self {
            ZoneKind::Row => vec2(ZONE_PADDING, ZONE_PADDING + ROW_EXTRA_PADDING),
            ZoneKind::Side => vec2(ZONE_PADDING + SIDE_EXTRA_PADDING, ZONE_PADDING),
            ZoneKind::Section => vec2(ZONE_PADDING, ZONE_PADDING),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropZone {
    pub id: String,
    pub element: ElementRef,
    pub position: ZonePosition,
    pub target_index: usize,
    pub kind: ZoneKind,
}

/// The widget a touch started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSource {
    pub element: ElementRef,
    pub widget_id: String,
    pub source_row: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum TouchState {
    Idle,
    Pending {
        source: DragSource,
        origin: Pos2,
        started: Instant,
    },
    Dragging {
        source: DragSource,
        origin: Pos2,
        last: Pos2,
        moved: bool,
    },
}

#[derive(Debug, Default)]
struct ZoneCache {
    rects: Vec<Option<Rect>>,
    scroll: f32,
    valid: bool,
}

pub struct TouchDragController {
    state: TouchState,
    zones: Vec<DropZone>,
    cache: ZoneCache,
    pending_ghost: Option<Pos2>,
    hovered: Option<usize>,
}

impl Default for TouchDragController {
    fn default() -> Self {
        Self {
            state: TouchState::Idle,
            zones: Vec::new(),
            cache: ZoneCache::default(),
            pending_ghost: None,
            hovered: None,
        }
    }
}

impl TouchDragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, TouchState::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TouchState::Pending { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, TouchState::Dragging { .. })
    }

    /// Widget being dragged, once the long press has fired.
    pub fn dragged_widget(&self) -> Option<&str> {
        match &self.state {
            TouchState::Dragging { source, .. } => Some(&source.widget_id),
            _ => None,
        }
    }

    /// Zone under the finger as of the last move, for highlighting.
    pub fn hovered_zone(&self) -> Option<&DropZone> {
        self.hovered.and_then(|i| self.zones.get(i))
    }

    pub fn register_zone(&mut self, zone: DropZone) {
        match self.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone,
            None => self.zones.push(zone),
        }
        self.invalidate_zones();
    }

    pub fn unregister_zone(&mut self, id: &str) -> bool {
        let before = self.zones.len();
        self.zones.retain(|z| z.id != id);
        let removed = self.zones.len() != before;
        if removed {
            self.invalidate_zones();
        }
        removed
    }

    pub fn clear_zones(&mut self) {
        self.zones.clear();
        self.invalidate_zones();
    }

    pub fn zones(&self) -> &[DropZone] {
        &self.zones
    }

    fn invalidate_zones(&mut self) {
        self.cache.valid = false;
        self.hovered = None;
    }

    pub fn touch_start(
        &mut self,
        surface: &mut dyn TouchSurface,
        source: DragSource,
        touches: &[Pos2],
        now: Instant,
    ) {
        if touches.len() != 1 {
            self.cancel(surface);
            return;
        }
        if !self.is_idle() {
            return;
        }
        self.state = TouchState::Pending {
            source,
            origin: touches[0],
            started: now,
        };
    }

    pub fn touch_move(&mut self, surface: &mut dyn TouchSurface, touches: &[Pos2], now: Instant) {
        let [point] = touches else {
            self.cancel(surface);
            return;
        };
        self.poll_long_press(surface, now);

        match &mut self.state {
            TouchState::Idle => {}
            TouchState::Pending { origin, .. } => {
                if origin.distance(*point) > MOVE_THRESHOLD {
                    // A scroll, not a drag.
                    self.state = TouchState::Idle;
                }
            }
            TouchState::Dragging {
                origin, last, moved, ..
            } => {
                *last = *point;
                if *point != *origin {
                    *moved = true;
                }
                self.pending_ghost = Some(*point);
                self.hovered = self.zone_at(surface, *point);
            }
        }
    }

    /// Animation frame callback: fires the long press, flushes the ghost
    /// position and steps auto-scroll.
    pub fn frame(&mut self, surface: &mut dyn TouchSurface, now: Instant) {
        self.poll_long_press(surface, now);
        let TouchState::Dragging { last, .. } = &self.state else {
            return;
        };
        let finger = *last;
        if let Some(at) = self.pending_ghost.take() {
            surface.move_ghost(at);
        }
        let step = auto_scroll_step(finger.y, surface.viewport_height());
        if step != 0.0 {
            surface.scroll_by(step);
        }
    }

    /// Finger lifted. Yields a drop when released over a zone after moving.
    pub fn touch_end(&mut self, surface: &mut dyn TouchSurface, at: Option<Pos2>) -> Option<DropIntent> {
        let state = std::mem::replace(&mut self.state, TouchState::Idle);
        let TouchState::Dragging {
            source, last, moved, ..
        } = state
        else {
            return None;
        };
        let point = at.unwrap_or(last);
        let zone = if moved { self.zone_at(surface, point) } else { None };
        self.restore(surface, source.element);

        let Some(zone) = zone.and_then(|i| self.zones.get(i)) else {
            tracing::debug!(widget = %source.widget_id, "touch drag cancelled");
            return None;
        };
        Some(DropIntent {
            dragged_id: source.widget_id,
            target_index: zone.target_index,
            position: zone.position.drop_position(),
        })
    }

    /// OS-level interruption or an extra finger: abandon the gesture.
    pub fn touch_cancel(&mut self, surface: &mut dyn TouchSurface) {
        self.cancel(surface);
    }

    fn cancel(&mut self, surface: &mut dyn TouchSurface) {
        match std::mem::replace(&mut self.state, TouchState::Idle) {
            TouchState::Dragging { source, .. } => {
                tracing::debug!(widget = %source.widget_id, "touch drag cancelled");
                self.restore(surface, source.element);
            }
            TouchState::Pending { .. } | TouchState::Idle => {}
        }
    }

    fn poll_long_press(&mut self, surface: &mut dyn TouchSurface, now: Instant) {
        let TouchState::Pending {
            source,
            origin,
            started,
        } = &self.state
        else {
            return;
        };
        if now.saturating_duration_since(*started) < LONG_PRESS {
            return;
        }
        let (source, origin) = (source.clone(), *origin);
        surface.show_ghost(source.element, GhostStyle::default(), origin);
        surface.vibrate(HAPTIC_PULSE);
        surface.set_element_opacity(source.element, SOURCE_DIMMED_OPACITY);
        surface.set_scroll_locked(true);
        tracing::debug!(widget = %source.widget_id, "touch drag started");
        self.cache.valid = false;
        self.state = TouchState::Dragging {
            source,
            origin,
            last: origin,
            moved: false,
        };
    }

    fn restore(&mut self, surface: &mut dyn TouchSurface, element: ElementRef) {
        surface.remove_ghost();
        surface.set_element_opacity(element, 1.0);
        surface.set_scroll_locked(false);
        self.pending_ghost = None;
        self.hovered = None;
    }

    fn refresh_zone_rects(&mut self, surface: &dyn TouchSurface) {
        let scroll = surface.scroll_offset();
        if self.cache.valid
            && self.cache.rects.len() == self.zones.len()
            && (scroll - self.cache.scroll).abs() <= ZONE_REFRESH_SCROLL
        {
            return;
        }
        self.cache.rects = self
            .zones
            .iter()
            .map(|z| surface.element_rect(z.element))
            .collect();
        self.cache.scroll = scroll;
        self.cache.valid = true;
    }

    /// Index of the zone nearest to `point` among those whose padded bounds
    /// contain it.
    fn zone_at(&mut self, surface: &dyn TouchSurface, point: Pos2) -> Option<usize> {
        self.refresh_zone_rects(surface);
        self.zones
            .iter()
            .zip(&self.cache.rects)
            .enumerate()
            .filter_map(|(i, (zone, rect))| {
                let rect = (*rect)?;
                rect.expand2(zone.kind.padding())
                    .contains(point)
                    .then(|| (i, rect.center().distance(point)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

/// Scroll delta for one frame with the finger at `y`; negative scrolls up.
pub fn auto_scroll_step(y: f32, viewport_height: f32) -> f32 {
    if y < AUTO_SCROLL_EDGE {
        let proximity = ((AUTO_SCROLL_EDGE - y) / AUTO_SCROLL_EDGE).clamp(0.0, 1.0);
        -AUTO_SCROLL_MAX_STEP * proximity
    } else if y > viewport_height - AUTO_SCROLL_EDGE {
        let proximity = ((y - (viewport_height - AUTO_SCROLL_EDGE)) / AUTO_SCROLL_EDGE).clamp(0.0, 1.0);
        AUTO_SCROLL_MAX_STEP * proximity
    } else {
        0.0
    }
}
