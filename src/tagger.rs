//! Structural record classification.
//!
//! Classification is a shape heuristic: a record whose field count matches
//! the configured right-table width is taken to come from the right table,
//! anything else from the left table. This is fragile by design and kept
//! as a documented limitation: two tables that happen to share a width
//! cannot be told apart, and a malformed right-table row silently lands on
//! the left side. The robust signal would be provenance metadata (file
//! path or table name) attached at ingestion rather than inferred from
//! shape.

use crate::error::{JoinError, JoinResult};
use crate::types::{Record, TableTag};
use serde::{Deserialize, Serialize};

/// Tagger settings, fixed at job start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// Column count (join key included) that marks a record as
    /// right-table shaped.
    pub right_table_width: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            right_table_width: 10,
        }
    }
}

impl TaggerConfig {
    /// A right-table record is the join key plus at least one payload
    /// field; a narrower width could never match anything.
    pub fn validate(&self) -> JoinResult<()> {
        if self.right_table_width < 2 {
            return Err(JoinError::InvalidConfiguration {
                field: "right-table-width",
                reason: "must leave at least one payload field beside the join key".to_string(),
            });
        }
        Ok(())
    }
}

/// Classify one raw CSV line. Pure: no I/O, no state.
///
/// The first column is the join key; the rest become the record's payload
/// fields. Splitting is comma-only with no quoting or escaping support
/// (documented limitation). A line that is empty after trimming has no
/// fields at all and fails classification.
pub fn tag_line(line: &str, line_no: usize, config: &TaggerConfig) -> JoinResult<Record> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(JoinError::Classification {
            line_no,
            reason: "record has no fields".to_string(),
        });
    }

    let columns: Vec<&str> = trimmed.split(',').collect();
    let tag = if columns.len() == config.right_table_width {
        TableTag::Right
    } else {
        TableTag::Left
    };

    Ok(Record {
        tag,
        join_key: columns[0].to_string(),
        fields: columns[1..].iter().map(|s| s.to_string()).collect(),
    })
}

/// Render a tagged record in the streaming-mapper line format:
/// `join_key \t field1,...,fieldN \t tag`.
pub fn mapper_line(record: &Record) -> String {
    format!(
        "{}\t{}\t{}",
        record.join_key,
        record.fields.join(","),
        record.tag.wire_letter()
    )
}
