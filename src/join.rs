//! Key-group joining.

use crate::error::{JoinError, JoinResult};
use crate::types::{JoinedTuple, KeyGroup, Record, TableTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How to treat key groups with an empty side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum JoinMode {
    /// Emit the cross product only when both sides are non-empty.
    #[default]
    Inner,
    /// Additionally emit left records with a null-filled right side when
    /// the right side is empty.
    LeftOuter,
    /// Symmetric to left-outer.
    RightOuter,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Inner => write!(f, "inner"),
            JoinMode::LeftOuter => write!(f, "left-outer"),
            JoinMode::RightOuter => write!(f, "right-outer"),
        }
    }
}

/// Joins key groups, enforcing table-uniform schemas as it goes.
///
/// The first record seen on each side fixes that table's field count for
/// the rest of this joiner's life; a later deviation fails the offending
/// key group. Seeding the expected widths up front gives outer-join null
/// fills a width even when a side never appears in the input.
#[derive(Debug)]
pub struct Joiner {
    mode: JoinMode,
    left_width: Option<usize>,
    right_width: Option<usize>,
}

impl Joiner {
    pub fn new(mode: JoinMode) -> Self {
        Self {
            mode,
            left_width: None,
            right_width: None,
        }
    }

    /// Like [`Joiner::new`] but with expected field counts seeded from
    /// configuration.
    pub fn with_widths(mode: JoinMode, left: Option<usize>, right: Option<usize>) -> Self {
        Self {
            mode,
            left_width: left,
            right_width: right,
        }
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    /// Join one key group. Tuple cell order is always (left fields...,
    /// right fields...). A field-count deviation on either side fails the
    /// whole group: guessing a schema would silently mangle output.
    pub fn join_group(&mut self, group: &KeyGroup) -> JoinResult<Vec<JoinedTuple>> {
        self.check_side(&group.key, TableTag::Left, &group.left)?;
        self.check_side(&group.key, TableTag::Right, &group.right)?;

        let mut tuples = Vec::new();
        match (group.left.is_empty(), group.right.is_empty()) {
            (false, false) => {
                for left in &group.left {
                    for right in &group.right {
                        tuples.push(JoinedTuple {
                            join_key: group.key.clone(),
                            left: present(&left.fields),
                            right: present(&right.fields),
                        });
                    }
                }
            }
            (false, true) if self.mode == JoinMode::LeftOuter => {
                let width = self.right_width.unwrap_or(0);
                for left in &group.left {
                    tuples.push(JoinedTuple {
                        join_key: group.key.clone(),
                        left: present(&left.fields),
                        right: vec![None; width],
                    });
                }
            }
            (true, false) if self.mode == JoinMode::RightOuter => {
                let width = self.left_width.unwrap_or(0);
                for right in &group.right {
                    tuples.push(JoinedTuple {
                        join_key: group.key.clone(),
                        left: vec![None; width],
                        right: present(&right.fields),
                    });
                }
            }
            // Inner mode drops single-sided groups; an outer mode drops
            // groups empty on its preserved side.
            _ => {}
        }

        Ok(tuples)
    }

    fn check_side(&mut self, key: &str, side: TableTag, records: &[Record]) -> JoinResult<()> {
        let expected = match side {
            TableTag::Left => &mut self.left_width,
            TableTag::Right => &mut self.right_width,
        };
        for record in records {
            match *expected {
                None => *expected = Some(record.fields.len()),
                Some(width) if width != record.fields.len() => {
                    return Err(JoinError::SchemaMismatch {
                        key: key.to_string(),
                        side,
                        expected: width,
                        found: record.fields.len(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn present(fields: &[String]) -> Vec<Option<String>> {
    fields.iter().cloned().map(Some).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: TableTag, key: &str, fields: &[&str]) -> Record {
        Record {
            tag,
            join_key: key.to_string(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn group(key: &str, left: Vec<Record>, right: Vec<Record>) -> KeyGroup {
        KeyGroup {
            key: key.to_string(),
            left,
            right,
        }
    }

    #[test]
    fn test_inner_single_pair() {
        let mut joiner = Joiner::new(JoinMode::Inner);
        let g = group(
            "Alice",
            vec![record(TableTag::Left, "Alice", &["Great Book"])],
            vec![record(
                TableTag::Right,
                "Alice",
                &["5", "4", "3", "2", "1", "0", "9", "8", "7"],
            )],
        );
        let tuples = joiner.join_group(&g).unwrap();
        assert_eq!(tuples.len(), 1);
        let fields: Vec<&str> = tuples[0]
            .fields()
            .map(|f| f.as_deref().unwrap())
            .collect();
        assert_eq!(fields[0], "Great Book");
        assert_eq!(&fields[1..], &["5", "4", "3", "2", "1", "0", "9", "8", "7"]);
    }

    #[test]
    fn test_inner_cross_product_size() {
        let mut joiner = Joiner::new(JoinMode::Inner);
        let g = group(
            "k",
            vec![
                record(TableTag::Left, "k", &["d1"]),
                record(TableTag::Left, "k", &["d2"]),
                record(TableTag::Left, "k", &["d3"]),
            ],
            vec![
                record(TableTag::Right, "k", &["r1"]),
                record(TableTag::Right, "k", &["r2"]),
            ],
        );
        assert_eq!(joiner.join_group(&g).unwrap().len(), 6);
    }

    #[test]
    fn test_inner_drops_single_sided_group() {
        let mut joiner = Joiner::new(JoinMode::Inner);
        let g = group("k", vec![record(TableTag::Left, "k", &["d"])], vec![]);
        assert!(joiner.join_group(&g).unwrap().is_empty());
    }

    #[test]
    fn test_left_outer_null_fills_right() {
        let mut joiner = Joiner::with_widths(JoinMode::LeftOuter, None, Some(9));
        let g = group(
            "k",
            vec![
                record(TableTag::Left, "k", &["d1"]),
                record(TableTag::Left, "k", &["d2"]),
            ],
            vec![],
        );
        let tuples = joiner.join_group(&g).unwrap();
        assert_eq!(tuples.len(), 2);
        for tuple in &tuples {
            assert_eq!(tuple.right.len(), 9);
            assert!(tuple.right.iter().all(|f| f.is_none()));
        }
    }

    #[test]
    fn test_right_outer_null_fills_left() {
        let mut joiner = Joiner::with_widths(JoinMode::RightOuter, Some(1), Some(9));
        let g = group("k", vec![], vec![record(TableTag::Right, "k", &["r"])]);
        let tuples = joiner.join_group(&g).unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].left, vec![None]);
        assert_eq!(tuples[0].right, vec![Some("r".to_string())]);
    }

    #[test]
    fn test_left_outer_matched_group_behaves_like_inner() {
        let mut joiner = Joiner::new(JoinMode::LeftOuter);
        let g = group(
            "k",
            vec![record(TableTag::Left, "k", &["d"])],
            vec![record(TableTag::Right, "k", &["r"])],
        );
        let tuples = joiner.join_group(&g).unwrap();
        assert_eq!(tuples.len(), 1);
        assert!(tuples[0].fields().all(|f| f.is_some()));
    }

    #[test]
    fn test_schema_mismatch_fails_group() {
        let mut joiner = Joiner::new(JoinMode::Inner);
        let g = group(
            "k",
            vec![
                record(TableTag::Left, "k", &["d"]),
                record(TableTag::Left, "k", &["d", "extra"]),
            ],
            vec![record(TableTag::Right, "k", &["r"])],
        );
        let err = joiner.join_group(&g).unwrap_err();
        assert!(matches!(
            err,
            JoinError::SchemaMismatch {
                side: TableTag::Left,
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_schema_width_carries_across_groups() {
        let mut joiner = Joiner::new(JoinMode::Inner);
        let first = group(
            "a",
            vec![record(TableTag::Left, "a", &["one"])],
            vec![record(TableTag::Right, "a", &["r"])],
        );
        joiner.join_group(&first).unwrap();

        let second = group(
            "b",
            vec![record(TableTag::Left, "b", &["one", "two"])],
            vec![record(TableTag::Right, "b", &["r"])],
        );
        assert!(joiner.join_group(&second).is_err());
    }
}
