//! Core data model shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Originating table of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableTag {
    Left,
    Right,
}

impl TableTag {
    /// Wire letter used in mapper output. The upstream job's two-letter
    /// scheme is preserved for compatibility: "D" for the left
    /// (descriptions) table, "R" for the right (ratings) table.
    pub fn wire_letter(&self) -> &'static str {
        match self {
            TableTag::Left => "D",
            TableTag::Right => "R",
        }
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableTag::Left => write!(f, "left"),
            TableTag::Right => write!(f, "right"),
        }
    }
}

/// One tagged input record: source table, join key, and the remaining
/// payload fields. Created by the tagger and never mutated downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub tag: TableTag,
    pub join_key: String,
    pub fields: Vec<String>,
}

/// Records routed to one partition by key hash. Lives for one
/// partitioning pass.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub records: Vec<Record>,
}

/// All records sharing one join key within a bucket, split by side.
/// Invariant: every record in either list carries this group's key.
#[derive(Debug, Clone)]
pub struct KeyGroup {
    pub key: String,
    pub left: Vec<Record>,
    pub right: Vec<Record>,
}

/// One joined output row. Cell order is always left fields then right
/// fields regardless of which record arrived first; `None` marks a cell
/// null-filled by an outer join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTuple {
    pub join_key: String,
    pub left: Vec<Option<String>>,
    pub right: Vec<Option<String>>,
}

impl JoinedTuple {
    /// All cells in output order.
    pub fn fields(&self) -> impl Iterator<Item = &Option<String>> {
        self.left.iter().chain(self.right.iter())
    }
}
