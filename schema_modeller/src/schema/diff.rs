//! Schema difference calculator
//!
//! This module compares a live ("have") table against a desired ("want") table and
//! reports every structural discrepancy as a [`Diff`]. Comparison is pure: nothing
//! here touches a database.

use serde::Serialize;
use std::fmt;

use crate::dialect::{LengthTiers, StandardTiers};
use crate::schema::types::{Column, ColumnKind, Table};

/// One discrepancy between a live and a wanted table.
///
/// `column` always names the wanted column, except for `HasColumn`, which names the
/// live column that has no wanted counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "diff", rename_all = "snake_case")]
pub enum Diff {
    HasColumn { column: String },
    MissColumn { column: String },
    WrongName { column: String },
    HasAutoIncrement { column: String },
    MissAutoIncrement { column: String },
    HasNullable { column: String },
    MissNullable { column: String },
    HasKey { column: String },
    MissKey { column: String },
    WrongType { column: String },
    TooLong { column: String },
    TooShort { column: String },
    HasValue { column: String, label: String },
    MissValue { column: String, label: String },
    HasDefault { column: String },
    MissDefault { column: String },
    WrongDefault { column: String },
}

impl Diff {
    /// Name of the column this difference concerns
    pub fn column(&self) -> &str {
        match self {
            Diff::HasColumn { column }
            | Diff::MissColumn { column }
            | Diff::WrongName { column }
            | Diff::HasAutoIncrement { column }
            | Diff::MissAutoIncrement { column }
            | Diff::HasNullable { column }
            | Diff::MissNullable { column }
            | Diff::HasKey { column }
            | Diff::MissKey { column }
            | Diff::WrongType { column }
            | Diff::TooLong { column }
            | Diff::TooShort { column }
            | Diff::HasValue { column, .. }
            | Diff::MissValue { column, .. }
            | Diff::HasDefault { column }
            | Diff::MissDefault { column }
            | Diff::WrongDefault { column } => column,
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diff::HasColumn { column } => write!(f, "column {} is not wanted", column),
            Diff::MissColumn { column } => write!(f, "column {} is missing", column),
            Diff::WrongName { column } => write!(f, "column {} has the wrong name", column),
            Diff::HasAutoIncrement { column } => {
                write!(f, "column {} should not auto increment", column)
            }
            Diff::MissAutoIncrement { column } => {
                write!(f, "column {} should auto increment", column)
            }
            Diff::HasNullable { column } => write!(f, "column {} should not be nullable", column),
            Diff::MissNullable { column } => write!(f, "column {} should be nullable", column),
            Diff::HasKey { column } => write!(f, "column {} should not be a key", column),
            Diff::MissKey { column } => write!(f, "column {} should be a key", column),
            Diff::WrongType { column } => write!(f, "column {} has the wrong type", column),
            Diff::TooLong { column } => write!(f, "column {} is too long", column),
            Diff::TooShort { column } => write!(f, "column {} is too short", column),
            Diff::HasValue { column, label } => {
                write!(f, "column {} should not allow value '{}'", column, label)
            }
            Diff::MissValue { column, label } => {
                write!(f, "column {} should allow value '{}'", column, label)
            }
            Diff::HasDefault { column } => write!(f, "column {} should not have a default", column),
            Diff::MissDefault { column } => write!(f, "column {} should have a default", column),
            Diff::WrongDefault { column } => write!(f, "column {} has the wrong default", column),
        }
    }
}

/// Compare two tables using the standard length tiers
pub fn compare(have: &Table, want: &Table) -> Vec<Diff> {
    compare_with(&StandardTiers, have, want)
}

/// Compare two tables, normalizing string and binary lengths with `tiers`.
///
/// Removals come first (in live column order), then additions (in wanted column
/// order), then the per-column differences of shared columns (in wanted order).
pub fn compare_with<T: LengthTiers + ?Sized>(tiers: &T, have: &Table, want: &Table) -> Vec<Diff> {
    let mut diffs = Vec::new();

    // Columns live but not wanted
    for column in have.columns().filter(|c| want.column(c.name()).is_none()) {
        diffs.push(Diff::HasColumn {
            column: column.name().to_string(),
        });
    }

    // Columns wanted but not live
    for column in want.columns().filter(|c| have.column(c.name()).is_none()) {
        diffs.push(Diff::MissColumn {
            column: column.name().to_string(),
        });
    }

    for wanted in want.columns() {
        if let Some(live) = have.column(wanted.name()) {
            compare_columns(tiers, live, wanted, &mut diffs);
        }
    }

    diffs
}

/// Append the differences between two columns sharing a name (case-insensitively)
pub fn compare_columns<T: LengthTiers + ?Sized>(
    tiers: &T,
    have: &Column,
    want: &Column,
    diffs: &mut Vec<Diff>,
) {
    let column = || want.name().to_string();

    if have.name() != want.name() {
        diffs.push(Diff::WrongName { column: column() });
    }

    match (have.is_auto_increment(), want.is_auto_increment()) {
        (true, false) => diffs.push(Diff::HasAutoIncrement { column: column() }),
        (false, true) => diffs.push(Diff::MissAutoIncrement { column: column() }),
        _ => {}
    }

    match (have.is_nullable(), want.is_nullable()) {
        (true, false) => diffs.push(Diff::HasNullable { column: column() }),
        (false, true) => diffs.push(Diff::MissNullable { column: column() }),
        _ => {}
    }

    match (have.is_key(), want.is_key()) {
        (true, false) => diffs.push(Diff::HasKey { column: column() }),
        (false, true) => diffs.push(Diff::MissKey { column: column() }),
        _ => {}
    }

    match (have.kind(), want.kind()) {
        (ColumnKind::Enum { values: live }, ColumnKind::Enum { values: wanted })
        | (ColumnKind::Set { values: live }, ColumnKind::Set { values: wanted }) => {
            for label in live.symmetric_difference(wanted) {
                let label = label.clone();
                if live.contains(&label) {
                    diffs.push(Diff::HasValue { column: column(), label });
                } else {
                    diffs.push(Diff::MissValue { column: column(), label });
                }
            }
            compare_defaults(have, want, diffs);
        }
        (ColumnKind::String { length: live }, ColumnKind::String { length: wanted }) => {
            compare_lengths(tiers.text_length(*live), tiers.text_length(*wanted), want, diffs);
            compare_defaults(have, want, diffs);
        }
        (ColumnKind::Bit { bits: live }, ColumnKind::Bit { bits: wanted }) => {
            compare_lengths(*live, *wanted, want, diffs);
            compare_defaults(have, want, diffs);
        }
        (ColumnKind::Bit { bits: 1 }, ColumnKind::Boolean)
        | (ColumnKind::Boolean, ColumnKind::Bit { bits: 1 })
        | (ColumnKind::Boolean, ColumnKind::Boolean) => compare_defaults(have, want, diffs),
        (
            ColumnKind::Decimal { precision, scale },
            ColumnKind::Decimal {
                precision: wanted_precision,
                scale: wanted_scale,
            },
        ) => {
            if precision != wanted_precision || scale != wanted_scale {
                diffs.push(Diff::WrongType { column: column() });
            } else {
                compare_defaults(have, want, diffs);
            }
        }
        (ColumnKind::Binary { length: live }, ColumnKind::Binary { length: wanted }) => {
            compare_lengths(tiers.binary_length(*live), tiers.binary_length(*wanted), want, diffs);
        }
        (ColumnKind::DateTime, ColumnKind::DateTime)
        | (ColumnKind::TimeStamp, ColumnKind::TimeStamp)
        | (ColumnKind::Double, ColumnKind::Double)
        | (ColumnKind::Integer, ColumnKind::Integer) => compare_defaults(have, want, diffs),
        _ => diffs.push(Diff::WrongType { column: column() }),
    }
}

fn compare_lengths(live: u32, wanted: u32, want: &Column, diffs: &mut Vec<Diff>) {
    let column = want.name().to_string();
    if live > wanted {
        diffs.push(Diff::TooLong { column });
    } else if live < wanted {
        diffs.push(Diff::TooShort { column });
    }
}

fn compare_defaults(have: &Column, want: &Column, diffs: &mut Vec<Diff>) {
    let column = want.name().to_string();
    match (have.default(), want.default()) {
        (None, None) => {}
        (Some(_), None) => diffs.push(Diff::HasDefault { column }),
        (None, Some(_)) => diffs.push(Diff::MissDefault { column }),
        (Some(_), Some(_)) => {
            if !defaults_equivalent(have, want) {
                diffs.push(Diff::WrongDefault { column });
            }
        }
    }
}

/// Whether two columns carry the same default value.
///
/// Boolean defaults compare by truth value against Boolean, single-bit and integer
/// columns, so `1`, `TRUE` and `true` are interchangeable there. All other defaults
/// compare textually.
pub fn defaults_equivalent(one: &Column, other: &Column) -> bool {
    match (one.default(), other.default()) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if is_boolean_pair(one.kind(), other.kind()) {
                truth_value(a) == truth_value(b)
            } else {
                a == b
            }
        }
        _ => false,
    }
}

/// Integer/Boolean pairs never reach this from `compare` or the synchronizer, which
/// both treat them as a type change first; they matter to direct callers.
fn is_boolean_pair(one: &ColumnKind, other: &ColumnKind) -> bool {
    matches!(
        (one, other),
        (ColumnKind::Boolean, ColumnKind::Boolean)
            | (ColumnKind::Bit { .. }, ColumnKind::Boolean)
            | (ColumnKind::Boolean, ColumnKind::Bit { .. })
            | (ColumnKind::Integer, ColumnKind::Boolean)
            | (ColumnKind::Boolean, ColumnKind::Integer)
    )
}

fn truth_value(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn users() -> Table {
        Table::new("shop", "users")
            .with_column(Column::integer("id").key(true).auto_increment(true).build())
            .with_column(Column::string("name", 50).build())
            .with_column(Column::enumeration("status", ["active", "banned"]).default_value("active").build())
            .with_column(Column::decimal("balance", 10, 2).nullable(true).build())
            .with_column(Column::binary("avatar", 1024).nullable(true).build())
            .with_column(Column::boolean("verified").default_value("0").build())
    }

    #[test]
    fn identical_tables_have_no_differences() {
        let table = users();
        assert_eq!(compare(&table, &table), vec![]);
    }

    #[rstest]
    #[case(300, 60000, true)]
    #[case(60000, 300, true)]
    #[case(300, 70000, false)]
    #[case(20, 255, false)]
    #[case(255, 255, true)]
    #[case(20, 30, false)]
    fn string_lengths_compare_by_tier(#[case] live: u32, #[case] wanted: u32, #[case] same: bool) {
        let have = Table::new("shop", "t").with_column(Column::string("c", live).build());
        let want = Table::new("shop", "t").with_column(Column::string("c", wanted).build());
        assert_eq!(compare(&have, &want).is_empty(), same);
    }

    #[test]
    fn shorter_live_column_is_too_short() {
        let have = Table::new("shop", "t").with_column(Column::string("c", 300).build());
        let want = Table::new("shop", "t").with_column(Column::string("c", 70000).build());
        assert_eq!(
            compare(&have, &want),
            vec![Diff::TooShort { column: "c".to_string() }]
        );
    }

    #[test]
    fn enum_labels_produce_symmetric_difference() {
        let have = Table::new("shop", "t").with_column(Column::enumeration("e", ["A", "B"]).build());
        let want = Table::new("shop", "t").with_column(Column::enumeration("e", ["B", "C"]).build());
        assert_eq!(
            compare(&have, &want),
            vec![
                Diff::HasValue { column: "e".to_string(), label: "A".to_string() },
                Diff::MissValue { column: "e".to_string(), label: "C".to_string() },
            ]
        );
    }

    #[test]
    fn type_mismatch_yields_a_single_wrong_type() {
        let have = Table::new("shop", "t")
            .with_column(Column::string("amount", 20).default_value("x").build());
        let want = Table::new("shop", "t").with_column(Column::decimal("amount", 10, 2).build());
        assert_eq!(
            compare(&have, &want),
            vec![Diff::WrongType { column: "amount".to_string() }]
        );
    }

    #[test]
    fn additions_and_removals_precede_column_changes() {
        let have = Table::new("shop", "t")
            .with_column(Column::string("Name", 50).build())
            .with_column(Column::integer("legacy").build());
        let want = Table::new("shop", "t")
            .with_column(Column::string("name", 50).nullable(true).build())
            .with_column(Column::string("email", 128).build());
        assert_eq!(
            compare(&have, &want),
            vec![
                Diff::HasColumn { column: "legacy".to_string() },
                Diff::MissColumn { column: "email".to_string() },
                Diff::WrongName { column: "name".to_string() },
                Diff::MissNullable { column: "name".to_string() },
            ]
        );
    }

    #[rstest]
    #[case(Column::bit("flag", 1), true)]
    #[case(Column::bit("flag", 2), false)]
    fn single_bit_matches_boolean(#[case] live: crate::schema::types::ColumnBuilder, #[case] same: bool) {
        let have = Table::new("shop", "t").with_column(live.build());
        let want = Table::new("shop", "t").with_column(Column::boolean("flag").build());
        assert_eq!(compare(&have, &want).is_empty(), same);
    }

    #[rstest]
    #[case("1", "TRUE", true)]
    #[case("true", "1", true)]
    #[case("0", "FALSE", true)]
    #[case("1", "false", false)]
    fn boolean_defaults_compare_by_truth_value(#[case] live: &str, #[case] wanted: &str, #[case] same: bool) {
        let have = Column::bit("flag", 1).default_value(live).build();
        let want = Column::boolean("flag").default_value(wanted).build();
        assert_eq!(defaults_equivalent(&have, &want), same);
    }

    #[test]
    fn integer_and_boolean_defaults_compare_by_truth_value() {
        let have = Column::integer("flag").default_value("1").build();
        let want = Column::boolean("flag").default_value("true").build();
        assert!(defaults_equivalent(&have, &want));
        assert!(defaults_equivalent(&want, &have));
        assert_eq!(
            compare(
                &Table::new("shop", "t").with_column(have),
                &Table::new("shop", "t").with_column(want)
            ),
            vec![Diff::WrongType { column: "flag".to_string() }]
        );
    }

    #[test]
    fn string_defaults_compare_textually() {
        let have = Column::string("s", 10).default_value("1").build();
        let want = Column::string("s", 10).default_value("true").build();
        assert!(!defaults_equivalent(&have, &want));
    }

    #[test]
    fn missing_and_extra_defaults() {
        let have = Table::new("shop", "t")
            .with_column(Column::integer("a").default_value("1").build())
            .with_column(Column::integer("b").build());
        let want = Table::new("shop", "t")
            .with_column(Column::integer("a").build())
            .with_column(Column::integer("b").default_value("2").build());
        assert_eq!(
            compare(&have, &want),
            vec![
                Diff::HasDefault { column: "a".to_string() },
                Diff::MissDefault { column: "b".to_string() },
            ]
        );
    }
}
