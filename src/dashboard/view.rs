use crate::dashboard::grid::{GridLayout, MAX_ROW_WIDGETS};
use crate::dashboard::intent::{DropIntent, DropPosition};
use crate::dashboard::widgets::WidgetRegistry;
use eframe::egui;

/// What happened in the editable grid this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    DragStarted { widget_id: String, source_row: usize },
    Dropped(DropIntent),
    DragCancelled,
}

/// Mouse-driven layout surface. Renders the rows and turns a drag and release
/// into a [`DropIntent`].
#[derive(Default)]
pub struct DashboardView {
    dragging: Option<String>,
}

impl DashboardView {
    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, layout: &GridLayout, editing: bool) -> Option<ViewEvent> {
        if !editing {
            self.dragging = None;
        }
        let registry = WidgetRegistry::global();
        let mut event = None;
        let mut row_rects = Vec::with_capacity(layout.len());

        for (row_index, row) in layout.rows().iter().enumerate() {
            let response = ui
                .horizontal(|ui| {
                    for widget_id in row.widgets() {
                        let dimmed = self.dragging.as_deref() == Some(widget_id.as_str());
                        let frame = egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.add_enabled(!dimmed, egui::Label::new(registry.label(widget_id)));
                        });
                        if !editing {
                            continue;
                        }
                        let handle = frame.response.interact(egui::Sense::drag());
                        if handle.drag_started() {
                            self.dragging = Some(widget_id.clone());
                            event = Some(ViewEvent::DragStarted {
                                widget_id: widget_id.clone(),
                                source_row: row_index,
                            });
                        }
                    }
                })
                .response;
            row_rects.push((response.rect, row.len()));
        }

        let Some(dragged) = self.dragging.clone() else {
            return event;
        };
        if ui.input(|i| i.pointer.any_released()) {
            self.dragging = None;
            let target = ui
                .ctx()
                .pointer_interact_pos()
                .and_then(|pos| classify_drop(&row_rects, pos));
            return Some(match target {
                Some((target_index, position)) => ViewEvent::Dropped(DropIntent {
                    dragged_id: dragged,
                    target_index,
                    position,
                }),
                None => ViewEvent::DragCancelled,
            });
        }
        if let Some(pos) = ui.ctx().pointer_latest_pos() {
            if let Some((index, position)) = classify_drop(&row_rects, pos) {
                paint_drop_marker(ui, row_rects[index].0, position);
            }
        }
        event
    }
}

/// Map a pointer position to a drop target given each row's rect and widget
/// count. Single-widget rows accept side drops on their outer thirds; above
/// the first row is `before` 0 and below the last row is `after` the last.
pub fn classify_drop(rows: &[(egui::Rect, usize)], pos: egui::Pos2) -> Option<(usize, DropPosition)> {
    let (first, last) = (rows.first()?, rows.last()?);
    if pos.y < first.0.top() {
        return Some((0, DropPosition::Before));
    }
    if pos.y > last.0.bottom() {
        return Some((rows.len() - 1, DropPosition::After));
    }
    let (index, (rect, count)) = rows
        .iter()
        .enumerate()
        .find(|(_, (rect, _))| pos.y >= rect.top() && pos.y <= rect.bottom())?;
    if *count < MAX_ROW_WIDGETS {
        let third = rect.width() / 3.0;
        if pos.x < rect.left() + third {
            return Some((index, DropPosition::Left));
        }
        if pos.x > rect.right() - third {
            return Some((index, DropPosition::Right));
        }
    }
    if pos.y < rect.center().y {
        Some((index, DropPosition::Before))
    } else {
        Some((index, DropPosition::After))
    }
}

fn paint_drop_marker(ui: &egui::Ui, rect: egui::Rect, position: DropPosition) {
    let stroke = egui::Stroke::new(2.0, ui.visuals().selection.stroke.color);
    let painter = ui.painter();
    match position {
        DropPosition::Before => painter.hline(rect.x_range(), rect.top(), stroke),
        DropPosition::After => painter.hline(rect.x_range(), rect.bottom(), stroke),
        DropPosition::Left => painter.vline(rect.left(), rect.y_range(), stroke),
        DropPosition::Right => painter.vline(rect.right(), rect.y_range(), stroke),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2, Rect};

    fn rows() -> Vec<(Rect, usize)> {
        vec![
            (Rect::from_min_size(pos2(0.0, 0.0), vec2(300.0, 50.0)), 1),
            (Rect::from_min_size(pos2(0.0, 60.0), vec2(300.0, 50.0)), 2),
        ]
    }

    #[test]
    fn single_row_accepts_side_drops() {
        assert_eq!(classify_drop(&rows(), pos2(20.0, 25.0)), Some((0, DropPosition::Left)));
        assert_eq!(classify_drop(&rows(), pos2(280.0, 25.0)), Some((0, DropPosition::Right)));
        assert_eq!(classify_drop(&rows(), pos2(150.0, 10.0)), Some((0, DropPosition::Before)));
        assert_eq!(classify_drop(&rows(), pos2(150.0, 40.0)), Some((0, DropPosition::After)));
    }

    #[test]
    fn full_row_only_takes_rows() {
        assert_eq!(classify_drop(&rows(), pos2(10.0, 70.0)), Some((1, DropPosition::Before)));
        assert_eq!(classify_drop(&rows(), pos2(290.0, 100.0)), Some((1, DropPosition::After)));
    }

    #[test]
    fn outside_rows() {
        assert_eq!(classify_drop(&rows(), pos2(10.0, -5.0)), Some((0, DropPosition::Before)));
        assert_eq!(classify_drop(&rows(), pos2(10.0, 500.0)), Some((1, DropPosition::After)));
        assert_eq!(classify_drop(&rows(), pos2(10.0, 55.0)), None);
        assert_eq!(classify_drop(&[], pos2(0.0, 0.0)), None);
    }

    #[test]
    fn drop_markers_paint_for_every_position() {
        egui::__run_test_ui(|ui| {
            let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(300.0, 50.0));
            for position in [
                DropPosition::Before,
                DropPosition::After,
                DropPosition::Left,
                DropPosition::Right,
            ] {
                paint_drop_marker(ui, rect, position);
            }
        });
    }

    #[test]
    fn renders_without_events_when_not_editing() {
        let layout = GridLayout::from_ids(&[&["clock"], &["network", "disk"]]);
        let mut view = DashboardView::default();
        let mut events = Vec::new();
        egui::__run_test_ui(|ui| {
            events.push(view.ui(ui, &layout, false));
        });
        assert!(events.iter().all(Option::is_none));
        assert!(view.dragging().is_none());
    }
}
