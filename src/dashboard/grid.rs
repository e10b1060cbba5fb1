use crate::dashboard::intent::DropPosition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Widgets a single row can hold side by side.
pub const MAX_ROW_WIDGETS: usize = 2;

/// One dashboard row, serialized as `{ "row": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row: Vec<String>,
}

impl Row {
    pub fn single(id: impl Into<String>) -> Self {
        Self { row: vec![id.into()] }
    }

    pub fn pair(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            row: vec![left.into(), right.into()],
        }
    }

    pub fn widgets(&self) -> &[String] {
        &self.row
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.row.len() >= MAX_ROW_WIDGETS
    }

    pub fn contains(&self, id: &str) -> bool {
        self.row.iter().any(|w| w == id)
    }
}

/// Ordered rows of widget ids, top to bottom.
///
/// A widget id appears at most once across the whole layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridLayout {
    rows: Vec<Row>,
}

impl GridLayout {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a layout from nested id slices, mostly for defaults and tests.
    pub fn from_ids(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|ids| Row {
                    row: ids.iter().map(|id| id.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Parse a persisted `grid_layout` value.
    ///
    /// Returns `None` unless the value is a non-empty array of rows holding
    /// one or two non-empty ids, with no id repeated.
    pub fn parse_stored(value: &Value) -> Option<Self> {
        let rows: Vec<Row> = serde_json::from_value(value.clone()).ok()?;
        let layout = Self { rows };
        layout.is_valid().then_some(layout)
    }

    pub fn is_valid(&self) -> bool {
        !self.rows.is_empty()
            && self.rows.iter().all(|r| {
                (1..=MAX_ROW_WIDGETS).contains(&r.len()) && r.row.iter().all(|id| !id.is_empty())
            })
            && self.has_unique_ids()
    }

    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::new();
        self.widget_ids().all(|id| seen.insert(id))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.rows).unwrap_or(Value::Array(Vec::new()))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn widget_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().flat_map(|r| r.row.iter().map(String::as_str))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Row and column of `id`.
    pub fn find(&self, id: &str) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.row
                .iter()
                .position(|w| w == id)
                .map(|c| (r, c))
        })
    }

    /// Remove `id`, deleting its row if it becomes empty. Returns the row the
    /// widget was taken from and whether that row was deleted.
    fn take_widget(&mut self, id: &str) -> Option<(usize, bool)> {
        let (row, col) = self.find(id)?;
        self.rows[row].row.remove(col);
        if self.rows[row].is_empty() {
            self.rows.remove(row);
            return Some((row, true));
        }
        Some((row, false))
    }

    /// Layout after dropping `dragged` relative to row `target`.
    ///
    /// `None` means the drop is a no-op: `dragged` is not in the layout, a
    /// side drop targets a missing row or the row that already holds the
    /// widget, a widget alone in its row is dropped onto that same row, or the
    /// result equals the current layout.
    pub fn with_drop(&self, dragged: &str, target: usize, position: DropPosition) -> Option<Self> {
        let (from, _) = self.find(dragged)?;
        if from == target && self.rows[from].len() == 1 {
            return None;
        }
        if position.is_side() {
            let row = self.rows.get(target)?;
            if row.contains(dragged) {
                return None;
            }
        }

        let mut next = self.clone();
        let mut target = target;
        if let Some((from, deleted)) = next.take_widget(dragged) {
            if deleted && target > from {
                target -= 1;
            }
        }

        let len = next.rows.len();
        let widget = dragged.to_string();
        match position {
            DropPosition::Before => {
                next.rows.insert(target.min(len), Row::single(widget));
            }
            DropPosition::After => {
                next.rows.insert((target + 1).min(len), Row::single(widget));
            }
            DropPosition::Left | DropPosition::Right => match next.rows.get_mut(target) {
                Some(row) if !row.is_full() => {
                    if position == DropPosition::Left {
                        row.row.insert(0, widget);
                    } else {
                        row.row.push(widget);
                    }
                }
                _ => {
                    // Full row: open a neighbouring row on the dropped side.
                    let at = if position == DropPosition::Left {
                        target.min(len)
                    } else {
                        (target + 1).min(len)
                    };
                    next.rows.insert(at, Row::single(widget));
                }
            },
        }
        (next != *self).then_some(next)
    }

    /// Layout with the row at `src` moved to `dest`, `None` when either index
    /// is out of range or they are equal.
    pub fn with_row_moved(&self, src: usize, dest: usize) -> Option<Self> {
        if src >= self.rows.len() || dest >= self.rows.len() || src == dest {
            return None;
        }
        let mut next = self.clone();
        let row = next.rows.remove(src);
        next.rows.insert(dest, row);
        Some(next)
    }
}

impl<'a> IntoIterator for &'a GridLayout {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
