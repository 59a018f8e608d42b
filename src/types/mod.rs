//! Core value types for encsql.
//!
//! This module provides the leaf-level vocabulary of the query model:
//! - [`Identifier`], [`DatabaseRef`], [`TableRef`] and [`ColumnRef`]: named
//!   references as written in the SQL text.
//! - [`Constant`]: decoded literal values. Decimals are exact
//!   ([`rust_decimal::Decimal`]) so that literals round-trip unchanged through
//!   encrypted equality comparisons.
//! - [`DataType`]: the union of the column types understood by the supported
//!   dialects, together with the length rule each one follows.
//! - [`EncryptionFlags`]: the per-column capability bitmask requested with
//!   `ENCRYPTED FOR (...)`.
//!
//! All of these are plain immutable values with structural equality.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers and references
// ---------------------------------------------------------------------------

/// A name as written in the query, with quoting removed and case preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a keyword-like name without regard to ASCII case.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(name)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A reference to a database, as used by `USE` and qualified table names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseRef {
    pub name: Identifier,
}

impl DatabaseRef {
    pub fn new(name: impl Into<Identifier>) -> Self {
        DatabaseRef { name: name.into() }
    }
}

impl fmt::Display for DatabaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A reference to a table, optionally qualified by database and schema and
/// optionally aliased (`FROM db.dbo.orders AS o`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub database: Option<DatabaseRef>,
    pub schema: Option<Identifier>,
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl TableRef {
    pub fn new(name: impl Into<Identifier>) -> Self {
        TableRef {
            database: None,
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<Identifier>) -> Self {
        self.database = Some(DatabaseRef::new(database));
        self
    }

    pub fn with_schema(mut self, schema: impl Into<Identifier>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<Identifier>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name other clauses use to refer to this table: the alias when one
    /// was given, the table name otherwise.
    pub fn reference_name(&self) -> &Identifier {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = &self.database {
            write!(f, "{db}.")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

/// A reference to a column, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<TableRef>,
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl ColumnRef {
    pub fn new(name: impl Into<Identifier>) -> Self {
        ColumnRef {
            table: None,
            name: name.into(),
            alias: None,
        }
    }

    pub fn qualified(table: impl Into<Identifier>, name: impl Into<Identifier>) -> Self {
        ColumnRef {
            table: Some(TableRef::new(table)),
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_table(mut self, table: TableRef) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<Identifier>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", table.reference_name())?;
        }
        write!(f, "{}", self.name)
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    /// A signed 64-bit integer literal.
    Int(i64),
    /// An exact fixed-point literal, kept at its written scale.
    Decimal(Decimal),
    /// A string literal with escapes already resolved.
    String(String),
    /// A hexadecimal literal, bytes in written order.
    Binary(Vec<u8>),
    Null,
    /// A prepared-statement parameter (`?1`, `$2`, `@name`).
    Placeholder(String),
}

impl Constant {
    pub fn is_null(&self) -> bool {
        matches!(self, Constant::Null)
    }

    /// A short, stable name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "integer",
            Constant::Decimal(_) => "decimal",
            Constant::String(_) => "string",
            Constant::Binary(_) => "binary",
            Constant::Null => "null",
            Constant::Placeholder(_) => "placeholder",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Decimal(d) => write!(f, "{d}"),
            Constant::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Constant::Binary(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Constant::Null => write!(f, "NULL"),
            Constant::Placeholder(label) => write!(f, "{label}"),
        }
    }
}

impl From<i64> for Constant {
    fn from(n: i64) -> Self {
        Constant::Int(n)
    }
}

impl From<Decimal> for Constant {
    fn from(d: Decimal) -> Self {
        Constant::Decimal(d)
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::String(s.to_string())
    }
}

impl From<String> for Constant {
    fn from(s: String) -> Self {
        Constant::String(s)
    }
}

impl From<Vec<u8>> for Constant {
    fn from(bytes: Vec<u8>) -> Self {
        Constant::Binary(bytes)
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Column types understood by the supported dialects.
///
/// Each dialect maps its own spellings onto this set (see
/// [`crate::sql::dialect::Dialect::data_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // integer family
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Boolean,
    // exact numerics
    Decimal,
    Numeric,
    Money,
    SmallMoney,
    // floating point
    Real,
    Float,
    Double,
    // date / time family
    Date,
    Time,
    TimeTz,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Timestamp,
    TimestampTz,
    Year,
    // character family
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    TinyText,
    MediumText,
    LongText,
    // binary family
    Bit,
    Binary,
    VarBinary,
    Image,
    Blob,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Bytea,
    // other
    UniqueIdentifier,
    Uuid,
    Json,
    Enum,
    Set,
}

/// How a type treats a parenthesised length argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// Fixed-width: declaring a length is an error.
    Fixed,
    /// Variable-width: `(n)` or `(MAX)` may be given.
    Variable,
    /// Exact numeric: `(precision)` or `(precision, scale)` may be given.
    Precision,
    /// Enumerated: the arguments are the member strings.
    Members,
}

impl DataType {
    pub fn length_class(self) -> LengthClass {
        use DataType::*;
        match self {
            TinyInt | SmallInt | MediumInt | Int | BigInt | Boolean | Money | SmallMoney
            | Real | Float | Double | Date | Time | TimeTz | DateTime | DateTime2
            | SmallDateTime | DateTimeOffset | Timestamp | TimestampTz | Year
            | UniqueIdentifier | Uuid | Json => LengthClass::Fixed,
            Decimal | Numeric => LengthClass::Precision,
            Enum | Set => LengthClass::Members,
            Char | VarChar | NChar | NVarChar | Text | NText | TinyText | MediumText
            | LongText | Bit | Binary | VarBinary | Image | Blob | TinyBlob | MediumBlob
            | LongBlob | Bytea => LengthClass::Variable,
        }
    }

    pub fn is_fixed_width(self) -> bool {
        self.length_class() == LengthClass::Fixed
    }

    /// The canonical upper-case spelling.
    pub fn name(self) -> &'static str {
        use DataType::*;
        match self {
            TinyInt => "TINYINT",
            SmallInt => "SMALLINT",
            MediumInt => "MEDIUMINT",
            Int => "INT",
            BigInt => "BIGINT",
            Boolean => "BOOLEAN",
            Decimal => "DECIMAL",
            Numeric => "NUMERIC",
            Money => "MONEY",
            SmallMoney => "SMALLMONEY",
            Real => "REAL",
            Float => "FLOAT",
            Double => "DOUBLE",
            Date => "DATE",
            Time => "TIME",
            TimeTz => "TIMETZ",
            DateTime => "DATETIME",
            DateTime2 => "DATETIME2",
            SmallDateTime => "SMALLDATETIME",
            DateTimeOffset => "DATETIMEOFFSET",
            Timestamp => "TIMESTAMP",
            TimestampTz => "TIMESTAMPTZ",
            Year => "YEAR",
            Char => "CHAR",
            VarChar => "VARCHAR",
            NChar => "NCHAR",
            NVarChar => "NVARCHAR",
            Text => "TEXT",
            NText => "NTEXT",
            TinyText => "TINYTEXT",
            MediumText => "MEDIUMTEXT",
            LongText => "LONGTEXT",
            Bit => "BIT",
            Binary => "BINARY",
            VarBinary => "VARBINARY",
            Image => "IMAGE",
            Blob => "BLOB",
            TinyBlob => "TINYBLOB",
            MediumBlob => "MEDIUMBLOB",
            LongBlob => "LONGBLOB",
            Bytea => "BYTEA",
            UniqueIdentifier => "UNIQUEIDENTIFIER",
            Uuid => "UUID",
            Json => "JSON",
            Enum => "ENUM",
            Set => "SET",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Length sentinel for `(MAX)` / unbounded.
pub const LENGTH_MAX: i64 = -1;

// ---------------------------------------------------------------------------
// Encryption flags
// ---------------------------------------------------------------------------

/// Bitmask of the encrypted-operation capabilities requested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionFlags(u8);

impl EncryptionFlags {
    pub const NONE: EncryptionFlags = EncryptionFlags(0);
    pub const STORE: EncryptionFlags = EncryptionFlags(1);
    pub const SEARCH: EncryptionFlags = EncryptionFlags(1 << 1);
    pub const ADDITION: EncryptionFlags = EncryptionFlags(1 << 2);
    pub const MULTIPLICATION: EncryptionFlags = EncryptionFlags(1 << 3);
    pub const RANGE: EncryptionFlags = EncryptionFlags(1 << 4);
    pub const WILDCARD: EncryptionFlags = EncryptionFlags(1 << 5);

    const NAMED: [(&'static str, EncryptionFlags); 6] = [
        ("STORE", EncryptionFlags::STORE),
        ("SEARCH", EncryptionFlags::SEARCH),
        ("ADDITION", EncryptionFlags::ADDITION),
        ("MULTIPLICATION", EncryptionFlags::MULTIPLICATION),
        ("RANGE", EncryptionFlags::RANGE),
        ("WILDCARD", EncryptionFlags::WILDCARD),
    ];

    /// Look up a single flag by its keyword, case-insensitively.
    pub fn from_name(name: &str) -> Option<EncryptionFlags> {
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, flag)| *flag)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: EncryptionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the flags that are set, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for EncryptionFlags {
    type Output = EncryptionFlags;

    fn bitor(self, rhs: EncryptionFlags) -> EncryptionFlags {
        EncryptionFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EncryptionFlags {
    fn bitor_assign(&mut self, rhs: EncryptionFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for EncryptionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        f.write_str(&self.names().join("|"))
    }
}
