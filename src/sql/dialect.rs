//! Per-dialect surface rules.
//!
//! Everything that differs between the three supported syntaxes is answered
//! here: identifier quoting, which literal prefixes exist, comment styles,
//! placeholder forms, row-limit syntax and the column type tables. The lexer,
//! grammar and builder consult a [`Dialect`] instead of branching on names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "mssql", alias = "tsql", alias = "sqlserver")]
    MsSql,
    #[default]
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgres", alias = "postgresql", alias = "pg")]
    Postgres,
}

/// A resolved column type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    pub data_type: DataType,
    /// Set for pseudo-types such as Postgres `SERIAL`.
    pub auto_increment: bool,
}

impl TypeSpec {
    const fn plain(data_type: DataType) -> Self {
        TypeSpec {
            data_type,
            auto_increment: false,
        }
    }

    const fn serial(data_type: DataType) -> Self {
        TypeSpec {
            data_type,
            auto_increment: true,
        }
    }
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::MsSql, Dialect::MySql, Dialect::Postgres];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::MsSql => "mssql",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    // -- lexical rules ------------------------------------------------------

    /// Backslash escapes in ordinary quoted strings.
    pub fn backslash_escapes(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `[name]`
    pub fn bracket_identifiers(self) -> bool {
        matches!(self, Dialect::MsSql)
    }

    /// `` `name` ``
    pub fn backtick_identifiers(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `"..."` is a string literal rather than a quoted identifier.
    pub fn double_quoted_strings(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `N'...'`
    pub fn national_strings(self) -> bool {
        matches!(self, Dialect::MsSql)
    }

    /// `E'...'`
    pub fn escape_strings(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// `0x4202`
    pub fn hex_numbers(self) -> bool {
        matches!(self, Dialect::MsSql | Dialect::MySql)
    }

    /// `X'4202'`
    pub fn hex_strings(self) -> bool {
        matches!(self, Dialect::MySql | Dialect::Postgres)
    }

    /// `# comment`
    pub fn hash_comments(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `$1`
    pub fn dollar_placeholders(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// `@name`
    pub fn named_placeholders(self) -> bool {
        matches!(self, Dialect::MsSql)
    }

    // -- statement rules ----------------------------------------------------

    pub fn supports_use(self) -> bool {
        !matches!(self, Dialect::Postgres)
    }

    /// `SELECT TOP n`
    pub fn supports_top(self) -> bool {
        matches!(self, Dialect::MsSql)
    }

    /// `LIMIT n [OFFSET m]`
    pub fn supports_limit(self) -> bool {
        matches!(self, Dialect::MySql | Dialect::Postgres)
    }

    /// `LIMIT offset, count`
    pub fn supports_limit_comma(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `ALTER TABLE t MODIFY [COLUMN] ...`
    pub fn supports_modify_column(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// Reject `USE` for dialects that cannot switch databases.
    pub fn check_use(self) -> Result<()> {
        if self.supports_use() {
            Ok(())
        } else {
            Err(Error::unsupported(format!(
                "USE statements are not supported by the {} dialect",
                self.name()
            )))
        }
    }

    // -- types --------------------------------------------------------------

    /// Resolve a type name (upper or lower case, multi-word names joined with
    /// single spaces).
    pub fn data_type(self, name: &str) -> Option<TypeSpec> {
        let upper = name.to_ascii_uppercase();
        match self {
            Dialect::MsSql => mssql_type(&upper),
            Dialect::MySql => mysql_type(&upper),
            Dialect::Postgres => postgres_type(&upper),
        }
    }
}

fn mssql_type(name: &str) -> Option<TypeSpec> {
    use DataType::*;
    let ty = match name {
        "TINYINT" => TinyInt,
        "SMALLINT" => SmallInt,
        "INT" | "INTEGER" => Int,
        "BIGINT" => BigInt,
        "BIT" => Boolean,
        "DECIMAL" | "DEC" => Decimal,
        "NUMERIC" => Numeric,
        "MONEY" => Money,
        "SMALLMONEY" => SmallMoney,
        "REAL" => Real,
        "FLOAT" => Float,
        "DATE" => Date,
        "TIME" => Time,
        "DATETIME" => DateTime,
        "DATETIME2" => DateTime2,
        "SMALLDATETIME" => SmallDateTime,
        "DATETIMEOFFSET" => DateTimeOffset,
        "CHAR" | "CHARACTER" => Char,
        "VARCHAR" | "CHAR VARYING" | "CHARACTER VARYING" => VarChar,
        "NCHAR" => NChar,
        "NVARCHAR" => NVarChar,
        "TEXT" => Text,
        "NTEXT" => NText,
        "BINARY" => Binary,
        "VARBINARY" => VarBinary,
        "IMAGE" => Image,
        "UNIQUEIDENTIFIER" => UniqueIdentifier,
        _ => return None,
    };
    Some(TypeSpec::plain(ty))
}

fn mysql_type(name: &str) -> Option<TypeSpec> {
    use DataType::*;
    let ty = match name {
        "TINYINT" => TinyInt,
        "SMALLINT" => SmallInt,
        "MEDIUMINT" => MediumInt,
        "INT" | "INTEGER" => Int,
        "BIGINT" => BigInt,
        "BOOL" | "BOOLEAN" => Boolean,
        "DECIMAL" | "DEC" | "FIXED" => Decimal,
        "NUMERIC" => Numeric,
        "FLOAT" => Float,
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => Double,
        "DATE" => Date,
        "TIME" => Time,
        "DATETIME" => DateTime,
        "TIMESTAMP" => Timestamp,
        "YEAR" => Year,
        "CHAR" | "CHARACTER" => Char,
        "VARCHAR" | "CHARACTER VARYING" => VarChar,
        "NCHAR" => NChar,
        "NVARCHAR" => NVarChar,
        "TEXT" => Text,
        "TINYTEXT" => TinyText,
        "MEDIUMTEXT" => MediumText,
        "LONGTEXT" => LongText,
        "BIT" => Bit,
        "BINARY" => Binary,
        "VARBINARY" => VarBinary,
        "BLOB" => Blob,
        "TINYBLOB" => TinyBlob,
        "MEDIUMBLOB" => MediumBlob,
        "LONGBLOB" => LongBlob,
        "JSON" => Json,
        "ENUM" => Enum,
        "SET" => Set,
        _ => return None,
    };
    Some(TypeSpec::plain(ty))
}

fn postgres_type(name: &str) -> Option<TypeSpec> {
    use DataType::*;
    let spec = match name {
        "SMALLSERIAL" | "SERIAL2" => TypeSpec::serial(SmallInt),
        "SERIAL" | "SERIAL4" => TypeSpec::serial(Int),
        "BIGSERIAL" | "SERIAL8" => TypeSpec::serial(BigInt),
        "SMALLINT" | "INT2" => TypeSpec::plain(SmallInt),
        "INT" | "INTEGER" | "INT4" => TypeSpec::plain(Int),
        "BIGINT" | "INT8" => TypeSpec::plain(BigInt),
        "BOOLEAN" | "BOOL" => TypeSpec::plain(Boolean),
        "DECIMAL" | "NUMERIC" => TypeSpec::plain(Numeric),
        "MONEY" => TypeSpec::plain(Money),
        "REAL" | "FLOAT4" => TypeSpec::plain(Real),
        "FLOAT" | "FLOAT8" | "DOUBLE PRECISION" => TypeSpec::plain(Double),
        "DATE" => TypeSpec::plain(Date),
        "TIME" | "TIME WITHOUT TIME ZONE" => TypeSpec::plain(Time),
        "TIMETZ" | "TIME WITH TIME ZONE" => TypeSpec::plain(TimeTz),
        "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => TypeSpec::plain(Timestamp),
        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => TypeSpec::plain(TimestampTz),
        "CHAR" | "CHARACTER" => TypeSpec::plain(Char),
        "VARCHAR" | "CHARACTER VARYING" => TypeSpec::plain(VarChar),
        "TEXT" => TypeSpec::plain(Text),
        "BYTEA" => TypeSpec::plain(Bytea),
        "BIT" | "BIT VARYING" | "VARBIT" => TypeSpec::plain(Bit),
        "UUID" => TypeSpec::plain(Uuid),
        "JSON" | "JSONB" => TypeSpec::plain(Json),
        _ => return None,
    };
    Some(spec)
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mssql" | "tsql" | "sqlserver" => Ok(Dialect::MsSql),
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(Error::config(format!("unknown dialect '{other}'"))),
        }
    }
}
