use serde::{Deserialize, Serialize};

/// Where a dragged widget lands relative to the target row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// New row above the target.
    Before,
    /// New row below the target.
    After,
    /// Into the target row, leftmost.
    Left,
    /// Into the target row, rightmost.
    Right,
}

impl DropPosition {
    pub fn is_side(&self) -> bool {
        matches!(self, DropPosition::Left | DropPosition::Right)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DropPosition::Before => "before",
            DropPosition::After => "after",
            DropPosition::Left => "left",
            DropPosition::Right => "right",
        }
    }
}

/// A completed drag gesture, independent of the input device that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIntent {
    pub dragged_id: String,
    pub target_index: usize,
    pub position: DropPosition,
}
