//! Statement-level query model.
//!
//! [`Query`] is what the parser hands to the planner: one value per statement,
//! every boolean clause already in conjunctive normal form and every literal
//! decoded. Besides ordinary DDL / DML, the model carries the administrative
//! commands of the encrypted database (key export, column re-encryption,
//! opetree maintenance, licensing). Only their arguments are modelled here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ast::Expression;
use crate::cnf::WhereClause;
use crate::error::{Error, Result};
use crate::types::{
    ColumnRef, Constant, DataType, DatabaseRef, EncryptionFlags, Identifier, LengthClass,
    TableRef, LENGTH_MAX,
};

/// A single parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    CreateTable(CreateTableQuery),
    AlterTable(AlterTableQuery),
    DropTable(DropTableQuery),
    CreateIndex(CreateIndexQuery),
    Use(UseQuery),
    ShowTables(ShowTablesQuery),
    ShowColumns(ShowColumnsQuery),
    ExportKeys(KeysCommand),
    UpdateKeys(KeysCommand),
    EncryptColumn(ColumnEncryptionCommand),
    DecryptColumn(ColumnEncryptionCommand),
    RebuildOpetree(OpetreeCommand),
    RebalanceOpetree(OpetreeCommand),
    SaveOpetree,
    LoadOpetree,
    SaveSchema,
    LoadSchema,
    /// Pass the wrapped DDL / DML statement to the backend untouched.
    Bypass(Box<Query>),
    LicenseRefresh,
    LicenseSetKey(LicenseKeyCommand),
    LicenseStatus,
}

impl Query {
    /// Stable upper-case name of the statement kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Select(_) => "SELECT",
            Query::Insert(_) => "INSERT",
            Query::Update(_) => "UPDATE",
            Query::Delete(_) => "DELETE",
            Query::CreateTable(_) => "CREATE TABLE",
            Query::AlterTable(_) => "ALTER TABLE",
            Query::DropTable(_) => "DROP TABLE",
            Query::CreateIndex(_) => "CREATE INDEX",
            Query::Use(_) => "USE",
            Query::ShowTables(_) => "SHOW TABLES",
            Query::ShowColumns(_) => "SHOW COLUMNS",
            Query::ExportKeys(_) => "EXPORT KEYS",
            Query::UpdateKeys(_) => "UPDATE KEYS",
            Query::EncryptColumn(_) => "ENCRYPT COLUMN",
            Query::DecryptColumn(_) => "DECRYPT COLUMN",
            Query::RebuildOpetree(_) => "REBUILD OPETREE",
            Query::RebalanceOpetree(_) => "REBALANCE OPETREE",
            Query::SaveOpetree => "SAVE OPETREE",
            Query::LoadOpetree => "LOAD OPETREE",
            Query::SaveSchema => "SAVE SCHEMA",
            Query::LoadSchema => "LOAD SCHEMA",
            Query::Bypass(_) => "BYPASS",
            Query::LicenseRefresh => "LICENSE REFRESH",
            Query::LicenseSetKey(_) => "LICENSE SET KEY",
            Query::LicenseStatus => "LICENSE STATUS",
        }
    }

    /// True for statements that [`Query::Bypass`] may wrap.
    pub fn is_bypassable(&self) -> bool {
        matches!(
            self,
            Query::Select(_)
                | Query::Insert(_)
                | Query::Update(_)
                | Query::Delete(_)
                | Query::CreateTable(_)
                | Query::AlterTable(_)
                | Query::DropTable(_)
                | Query::CreateIndex(_)
        )
    }
}

// ---------------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectQuery {
    pub distinct: bool,
    pub select_expressions: Vec<Expression>,
    /// Comma-separated sources, each with its own join chain.
    pub from: Vec<FromSource>,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupBy>,
    pub having: Option<WhereClause>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<RowLimit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableSource {
    Table(TableRef),
    /// `(SELECT ...) AS alias`
    Derived {
        query: Box<SelectQuery>,
        alias: Identifier,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromSource {
    pub source: TableSource,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub source: TableSource,
    /// `None` for CROSS joins.
    pub on: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    pub expressions: Vec<Expression>,
}

impl GroupBy {
    /// Columns referenced by the grouping expressions.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        self.expressions.iter().flat_map(|e| e.get_columns()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expression: Expression,
    pub direction: SortDirection,
}

/// `TOP n`, `LIMIT n [OFFSET m]` or `LIMIT m, n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLimit {
    pub count: u64,
    pub offset: Option<u64>,
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertQuery {
    pub table: TableRef,
    pub columns: Option<Vec<ColumnRef>>,
    pub values: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuery {
    pub table: TableRef,
    pub assignments: Vec<(ColumnRef, Expression)>,
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub table: TableRef,
    pub where_clause: Option<WhereClause>,
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

/// One column of a CREATE TABLE or ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: Identifier,
    pub data_type: DataType,
    /// `None` when unspecified, [`LENGTH_MAX`] for `MAX`. Holds the precision
    /// for DECIMAL / NUMERIC.
    pub length: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
    pub encryption_flags: EncryptionFlags,
    pub default_value: Option<Expression>,
    pub auto_increment: bool,
    /// Members of an ENUM / SET type.
    pub enum_values: Vec<String>,
    pub primary_key: bool,
    pub unique: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<Identifier>, data_type: DataType) -> Self {
        ColumnDefinition {
            name: name.into(),
            data_type,
            length: None,
            scale: None,
            nullable: true,
            encryption_flags: EncryptionFlags::NONE,
            default_value: None,
            auto_increment: false,
            enum_values: Vec::new(),
            primary_key: false,
            unique: false,
        }
    }

    /// Record a declared length, rejecting it for fixed-width types.
    pub fn set_length(&mut self, length: i64) -> Result<()> {
        match self.data_type.length_class() {
            LengthClass::Fixed => Err(Error::semantic(format!(
                "type {} of column {} does not take a length",
                self.data_type, self.name
            ))),
            LengthClass::Members => Err(Error::semantic(format!(
                "type {} of column {} takes a member list, not a length",
                self.data_type, self.name
            ))),
            LengthClass::Precision if length == LENGTH_MAX => Err(Error::semantic(format!(
                "type {} of column {} does not accept MAX",
                self.data_type, self.name
            ))),
            _ if length < 0 && length != LENGTH_MAX => Err(Error::semantic(format!(
                "negative length {} for column {}",
                length, self.name
            ))),
            _ => {
                self.length = Some(length);
                Ok(())
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        !self.encryption_flags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableQuery {
    pub table: TableRef,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDefinition>,
}

impl CreateTableQuery {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// `ALTER TABLE t MODIFY c ...` / `ALTER TABLE t ALTER COLUMN c ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTableQuery {
    pub table: TableRef,
    pub column: ColumnDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableQuery {
    pub table: TableRef,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexQuery {
    pub name: Identifier,
    pub table: TableRef,
    /// Key columns in index order.
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseQuery {
    pub database: DatabaseRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowTablesQuery {
    pub database: Option<DatabaseRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowColumnsQuery {
    pub table: TableRef,
}

// ---------------------------------------------------------------------------
// Administrative commands
// ---------------------------------------------------------------------------

/// `EXPORT KEYS` / `UPDATE KEYS`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeysCommand {
    pub destination: Option<String>,
    pub status_check: bool,
}

/// `ENCRYPT COLUMN` / `DECRYPT COLUMN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEncryptionCommand {
    pub column: ColumnRef,
    pub flags: Option<EncryptionFlags>,
    pub status_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopType {
    Immediate,
    Seconds,
    Minutes,
    Hours,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCondition {
    pub stop_type: StopType,
    /// Duration in units of `stop_type`. Always `None` for `Immediate`.
    pub after: Option<Decimal>,
}

/// `REBUILD OPETREE` / `REBALANCE OPETREE`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpetreeCommand {
    pub seeds: Vec<Constant>,
    pub stop: Option<StopCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LicenseKeyCommand {
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_column_defaults() {
        let c = ColumnDefinition::new("a", DataType::Int);
        assert!(c.nullable);
        assert!(!c.is_encrypted());
        assert_eq!(c.length, None);
        assert!(!c.auto_increment && !c.primary_key && !c.unique);
    }

    #[test]
    fn fixed_width_types_reject_length() {
        let mut c = ColumnDefinition::new("a", DataType::Int);
        let err = c.set_length(4).unwrap_err();
        assert_eq!(err, Error::semantic("type INT of column a does not take a length"));
        assert_eq!(c.length, None);
    }

    #[test]
    fn variable_width_types_accept_max() {
        let mut c = ColumnDefinition::new("b", DataType::VarChar);
        c.set_length(LENGTH_MAX).unwrap();
        assert_eq!(c.length, Some(-1));
        c.set_length(20).unwrap();
        assert_eq!(c.length, Some(20));
        assert!(c.set_length(-5).is_err());
    }

    #[test]
    fn decimal_precision_is_not_max() {
        let mut c = ColumnDefinition::new("p", DataType::Decimal);
        c.set_length(10).unwrap();
        assert!(c.set_length(LENGTH_MAX).is_err());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(Query::SaveOpetree.kind(), "SAVE OPETREE");
        assert_eq!(Query::UpdateKeys(KeysCommand::default()).kind(), "UPDATE KEYS");
        let select = Query::Select(SelectQuery::default());
        assert_eq!(select.kind(), "SELECT");
        assert!(select.is_bypassable());
        assert!(!Query::LicenseStatus.is_bypassable());
        assert_eq!(Query::Bypass(Box::new(select)).kind(), "BYPASS");
    }

    #[test]
    fn group_by_lists_columns() {
        let g = GroupBy {
            expressions: vec![
                Expression::column(ColumnRef::new("a")),
                Expression::column(ColumnRef::qualified("t", "b")),
            ],
        };
        let cols: Vec<String> = g.columns().iter().map(|c| c.to_string()).collect();
        assert_eq!(cols, vec!["a", "t.b"]);
    }
}
