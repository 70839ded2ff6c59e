//! Portable wire types
//!
//! Database-neutral type codes used to classify raw introspection results before
//! they are mapped to a column variant. The numeric codes match the ones used by
//! generic database connectivity APIs so descriptors from any driver line up.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Serialized by the same names [`WireType::name`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Other,
    Blob,
    Clob,
    Boolean,
    NChar,
    NVarchar,
    LongNVarchar,
    #[serde(rename = "TIME_WITH_TIMEZONE")]
    TimeWithTimezone,
    #[serde(rename = "TIMESTAMP_WITH_TIMEZONE")]
    TimestampWithTimezone,
}

impl WireType {
    /// Resolve a numeric wire type code.
    pub fn from_code(code: i32) -> Result<Self> {
        let wire_type = match code {
            -7 => WireType::Bit,
            -6 => WireType::TinyInt,
            5 => WireType::SmallInt,
            4 => WireType::Integer,
            -5 => WireType::BigInt,
            6 => WireType::Float,
            7 => WireType::Real,
            8 => WireType::Double,
            2 => WireType::Numeric,
            3 => WireType::Decimal,
            1 => WireType::Char,
            12 => WireType::Varchar,
            -1 => WireType::LongVarchar,
            91 => WireType::Date,
            92 => WireType::Time,
            93 => WireType::Timestamp,
            -2 => WireType::Binary,
            -3 => WireType::VarBinary,
            -4 => WireType::LongVarBinary,
            1111 => WireType::Other,
            2004 => WireType::Blob,
            2005 => WireType::Clob,
            16 => WireType::Boolean,
            -15 => WireType::NChar,
            -9 => WireType::NVarchar,
            -16 => WireType::LongNVarchar,
            2013 => WireType::TimeWithTimezone,
            2014 => WireType::TimestampWithTimezone,
            _ => {
                return Err(Error::UnsupportedType(format!(
                    "Unknown wire type code {}",
                    code
                )))
            }
        };
        Ok(wire_type)
    }

    pub fn code(self) -> i32 {
        match self {
            WireType::Bit => -7,
            WireType::TinyInt => -6,
            WireType::SmallInt => 5,
            WireType::Integer => 4,
            WireType::BigInt => -5,
            WireType::Float => 6,
            WireType::Real => 7,
            WireType::Double => 8,
            WireType::Numeric => 2,
            WireType::Decimal => 3,
            WireType::Char => 1,
            WireType::Varchar => 12,
            WireType::LongVarchar => -1,
            WireType::Date => 91,
            WireType::Time => 92,
            WireType::Timestamp => 93,
            WireType::Binary => -2,
            WireType::VarBinary => -3,
            WireType::LongVarBinary => -4,
            WireType::Other => 1111,
            WireType::Blob => 2004,
            WireType::Clob => 2005,
            WireType::Boolean => 16,
            WireType::NChar => -15,
            WireType::NVarchar => -9,
            WireType::LongNVarchar => -16,
            WireType::TimeWithTimezone => 2013,
            WireType::TimestampWithTimezone => 2014,
        }
    }

    /// The conventional upper-case name of the type.
    pub fn name(self) -> &'static str {
        match self {
            WireType::Bit => "BIT",
            WireType::TinyInt => "TINYINT",
            WireType::SmallInt => "SMALLINT",
            WireType::Integer => "INTEGER",
            WireType::BigInt => "BIGINT",
            WireType::Float => "FLOAT",
            WireType::Real => "REAL",
            WireType::Double => "DOUBLE",
            WireType::Numeric => "NUMERIC",
            WireType::Decimal => "DECIMAL",
            WireType::Char => "CHAR",
            WireType::Varchar => "VARCHAR",
            WireType::LongVarchar => "LONGVARCHAR",
            WireType::Date => "DATE",
            WireType::Time => "TIME",
            WireType::Timestamp => "TIMESTAMP",
            WireType::Binary => "BINARY",
            WireType::VarBinary => "VARBINARY",
            WireType::LongVarBinary => "LONGVARBINARY",
            WireType::Other => "OTHER",
            WireType::Blob => "BLOB",
            WireType::Clob => "CLOB",
            WireType::Boolean => "BOOLEAN",
            WireType::NChar => "NCHAR",
            WireType::NVarchar => "NVARCHAR",
            WireType::LongNVarchar => "LONGNVARCHAR",
            WireType::TimeWithTimezone => "TIME_WITH_TIMEZONE",
            WireType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
        }
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            WireType::Char
                | WireType::Varchar
                | WireType::LongVarchar
                | WireType::NChar
                | WireType::NVarchar
                | WireType::LongNVarchar
                | WireType::Clob
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            WireType::LongVarBinary | WireType::VarBinary | WireType::Binary | WireType::Blob
        )
    }

    pub fn is_date_time(self) -> bool {
        matches!(
            self,
            WireType::Date
                | WireType::Time
                | WireType::Timestamp
                | WireType::TimeWithTimezone
                | WireType::TimestampWithTimezone
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            WireType::TinyInt | WireType::SmallInt | WireType::Integer | WireType::BigInt
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
