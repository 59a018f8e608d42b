use encsql::query::{
    CreateTableQuery, InsertQuery, JoinKind, SelectQuery, SortDirection, StopType, TableSource,
};
use encsql::{
    parse, parse_with_config, ColumnRef, Constant, DataType, Dialect, EncryptionFlags, Error,
    ExprKind, Expression, ParserConfig, Query,
};
use tempfile::TempDir;

fn parse_one(sql: &str, dialect: Dialect) -> Query {
    let mut queries = parse(sql, dialect).unwrap();
    assert_eq!(queries.len(), 1, "{sql}");
    queries.remove(0)
}

fn select(sql: &str, dialect: Dialect) -> SelectQuery {
    match parse_one(sql, dialect) {
        Query::Select(s) => s,
        other => panic!("expected SELECT, got {}", other.kind()),
    }
}

fn create_table(sql: &str, dialect: Dialect) -> CreateTableQuery {
    match parse_one(sql, dialect) {
        Query::CreateTable(c) => c,
        other => panic!("expected CREATE TABLE, got {}", other.kind()),
    }
}

fn insert(sql: &str, dialect: Dialect) -> InsertQuery {
    match parse_one(sql, dialect) {
        Query::Insert(i) => i,
        other => panic!("expected INSERT, got {}", other.kind()),
    }
}

/// WHERE leaves as one `Vec` per disjunction.
fn where_leaves(query: &SelectQuery) -> Vec<Vec<&Expression>> {
    query
        .where_clause
        .as_ref()
        .unwrap()
        .cnf
        .iter()
        .map(|d| d.iter().collect())
        .collect()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_create_table_with_encryption() {
    let sql = "CREATE TABLE t (a INT ENCRYPTED FOR (ADDITION, MULTIPLICATION) NOT NULL, \
               b VARCHAR(MAX) ENCRYPTED FOR (STORE, SEARCH))";
    for dialect in Dialect::ALL {
        let table = create_table(sql, dialect);
        assert_eq!(table.table.name, "t");
        assert_eq!(table.columns.len(), 2);

        let a = &table.columns[0];
        assert_eq!(a.name, "a");
        assert_eq!(a.data_type, DataType::Int);
        assert_eq!(
            a.encryption_flags,
            EncryptionFlags::ADDITION | EncryptionFlags::MULTIPLICATION
        );
        assert!(!a.nullable);
        assert_eq!(a.length, None);

        let b = &table.columns[1];
        assert_eq!(b.name, "b");
        assert_eq!(b.data_type, DataType::VarChar);
        assert_eq!(b.encryption_flags, EncryptionFlags::STORE | EncryptionFlags::SEARCH);
        assert!(b.nullable);
        assert_eq!(b.length, Some(-1));
    }
}

#[test]
fn scenario_select_where_cnf() {
    let query = select(
        "SELECT * FROM t WHERE a <= b AND c IN ('abc','def') AND d NOT IN (123,456)",
        Dialect::MySql,
    );
    let leaves = where_leaves(&query);
    assert_eq!(leaves.len(), 3);
    assert!(leaves.iter().all(|d| d.len() == 1));

    match &leaves[0][0].kind {
        ExprKind::LessThanOrEqual(c) => {
            assert!(!c.not);
            assert_eq!(c.left.as_column(), Some(&ColumnRef::new("a")));
            assert_eq!(c.right.as_column(), Some(&ColumnRef::new("b")));
        }
        other => panic!("expected <=, got {other:?}"),
    }
    match &leaves[1][0].kind {
        ExprKind::In(p) => {
            assert!(!p.not);
            assert_eq!(p.column, ColumnRef::new("c"));
            assert_eq!(p.values, vec!["abc", "def"]);
        }
        other => panic!("expected IN, got {other:?}"),
    }
    match &leaves[2][0].kind {
        ExprKind::In(p) => {
            assert!(p.not);
            assert_eq!(p.column, ColumnRef::new("d"));
            assert_eq!(p.values, vec![123i64, 456]);
        }
        other => panic!("expected NOT IN, got {other:?}"),
    }
}

#[test]
fn scenario_insert_rows() {
    let query = insert("INSERT INTO t (a,b) VALUES (1,'x'),(2,'y')", Dialect::MySql);
    assert_eq!(query.table.name, "t");
    assert_eq!(
        query.columns,
        Some(vec![ColumnRef::new("a"), ColumnRef::new("b")])
    );
    assert_eq!(query.values.len(), 2);
    assert!(query.values.iter().all(|row| row.len() == 2));
    assert_eq!(query.values[0][0], Constant::Int(1));
    assert_eq!(query.values[0][1], Constant::from("x"));
    assert_eq!(query.values[1][0], Constant::Int(2));
    assert_eq!(query.values[1][1], Constant::from("y"));
}

// ---------------------------------------------------------------------------
// Operators and NOT
// ---------------------------------------------------------------------------

#[test]
fn less_or_equal_is_a_single_leaf() {
    let query = select("SELECT * FROM t WHERE a <= 5", Dialect::MsSql);
    let leaves = where_leaves(&query);
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].len(), 1);
    assert!(matches!(leaves[0][0].kind, ExprKind::LessThanOrEqual(_)));
}

#[test]
fn not_equal_spellings() {
    for sql in ["SELECT * FROM t WHERE a <> 1", "SELECT * FROM t WHERE a != 1"] {
        let query = select(sql, Dialect::Postgres);
        let leaves = where_leaves(&query);
        assert!(matches!(&leaves[0][0].kind, ExprKind::Equals(c) if c.not), "{sql}");
    }
}

#[test]
fn not_never_wraps() {
    let query = select(
        "SELECT * FROM t WHERE NOT (a = 1 OR b LIKE 'x%') AND c IS NOT NULL",
        Dialect::MySql,
    );
    for leaf in query.where_clause.as_ref().unwrap().cnf.predicates() {
        assert!(leaf.is_boolean_leaf());
        assert_eq!(leaf.not_flag(), Some(true));
    }
}

#[test]
fn every_condition_is_cnf() {
    let query = select(
        "SELECT a, COUNT(*) FROM t JOIN u ON t.id = u.id OR (t.x = 1 AND u.y = 2) \
         WHERE (a = 1 AND b = 2) OR (c = 3 AND d = 4) GROUP BY a HAVING COUNT(*) > 1",
        Dialect::MySql,
    );
    let on = query.from[0].joins[0].on.as_ref().unwrap();
    assert_eq!(on.cnf.len(), 2);
    assert_eq!(query.where_clause.as_ref().unwrap().cnf.len(), 4);
    assert_eq!(query.having.as_ref().unwrap().cnf.len(), 1);
    for clause in query.where_clause.as_ref().unwrap().cnf.iter() {
        assert_eq!(clause.len(), 2);
        assert!(clause.iter().all(|leaf| !leaf.is_and() && !leaf.is_or()));
    }
}

#[test]
fn default_alias_is_the_source_text() {
    let query = select("SELECT (a+b)*(a+b), c AS total, lower(d) FROM t", Dialect::MySql);
    let aliases: Vec<_> = query
        .select_expressions
        .iter()
        .map(|e| e.alias().unwrap())
        .collect();
    assert_eq!(aliases, vec!["(a+b)*(a+b)", "total", "lower(d)"]);
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[test]
fn hex_literals() {
    let query = select("SELECT 0x4202, 0xffff", Dialect::MsSql);
    assert_eq!(query.select_expressions[0], Constant::Binary(vec![0x42, 0x02]));
    assert_eq!(query.select_expressions[1], Constant::Binary(vec![0xff, 0xff]));

    let query = select(r"SELECT X'4202', E'\x4202'", Dialect::Postgres);
    assert_eq!(query.select_expressions[0], Constant::Binary(vec![0x42, 0x02]));
    assert_eq!(query.select_expressions[1], Constant::Binary(vec![0x42, 0x02]));

    let query = select(r"SELECT E'\x41\x42'", Dialect::Postgres);
    assert_eq!(query.select_expressions[0], Constant::Binary(vec![0x41, 0x42]));

    assert!(matches!(parse("SELECT 0xfff", Dialect::MySql), Err(Error::Semantic(_))));
}

#[test]
fn string_escapes_per_dialect() {
    let mysql = select(r"SELECT 'it''s\n'", Dialect::MySql);
    assert_eq!(mysql.select_expressions[0], Constant::from("it's\n"));
    let mssql = select(r"SELECT 'it''s\n'", Dialect::MsSql);
    assert_eq!(mssql.select_expressions[0], Constant::from(r"it's\n"));

    let mut config = ParserConfig::new(Dialect::MySql);
    config.backslash_escapes = Some(false);
    let queries = parse_with_config(r"SELECT 'C:\temp'", &config).unwrap();
    match &queries[0] {
        Query::Select(s) => assert_eq!(s.select_expressions[0], Constant::from(r"C:\temp")),
        other => panic!("expected SELECT, got {}", other.kind()),
    }
}

#[test]
fn placeholders() {
    let query = select("SELECT * FROM t WHERE a = ? AND b = ?", Dialect::MySql);
    let labels: Vec<_> = where_leaves(&query)
        .iter()
        .map(|d| match &d[0].kind {
            ExprKind::Equals(c) => c.right.as_constant().cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(
        labels,
        vec![
            Some(Constant::Placeholder("?1".into())),
            Some(Constant::Placeholder("?2".into()))
        ]
    );

    let query = select("SELECT * FROM t WHERE a = $1", Dialect::Postgres);
    match &where_leaves(&query)[0][0].kind {
        ExprKind::Equals(c) => {
            assert_eq!(c.right.as_constant(), Some(&Constant::Placeholder("$1".into())))
        }
        other => panic!("expected =, got {other:?}"),
    }
}

#[test]
fn decimals_are_exact() {
    let query = select("SELECT 0.1, 99999999999999999999", Dialect::MySql);
    assert_eq!(query.select_expressions[0].to_string(), "0.1");
    assert!(matches!(
        query.select_expressions[1].as_constant(),
        Some(Constant::Decimal(_))
    ));

    for literal in ["1.00000000000000000000000000001", "0.0000000000000000000000000000001"] {
        let err = parse(&format!("SELECT {literal}"), Dialect::MySql).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("invalid query: numeric literal {literal} exceeds 28 digits of precision")
        );
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

#[test]
fn fixed_width_types_reject_lengths() {
    let err = parse("CREATE TABLE t (a INT(4))", Dialect::MySql).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid query: type INT of column a does not take a length"
    );
    assert!(parse("CREATE TABLE t (a VARCHAR(MAX))", Dialect::MsSql).is_ok());
}

#[test]
fn bit_type_per_dialect() {
    let mssql = create_table("CREATE TABLE t (a BIT)", Dialect::MsSql);
    assert_eq!(mssql.columns[0].data_type, DataType::Boolean);
    let mysql = create_table("CREATE TABLE t (a BIT(8))", Dialect::MySql);
    assert_eq!(mysql.columns[0].data_type, DataType::Bit);
    assert_eq!(mysql.columns[0].length, Some(8));
}

#[test]
fn postgres_types() {
    let table = create_table(
        "CREATE TABLE IF NOT EXISTS s.t (id BIGSERIAL PRIMARY KEY, \
         at TIMESTAMP WITH TIME ZONE, price NUMERIC(12, 4), name CHARACTER VARYING(40))",
        Dialect::Postgres,
    );
    assert!(table.if_not_exists);
    assert_eq!(table.table.schema.as_ref().unwrap(), "s");
    let id = table.column("id").unwrap();
    assert!(id.auto_increment && id.primary_key && !id.nullable);
    assert_eq!(table.column("at").unwrap().data_type, DataType::TimestampTz);
    assert_eq!(table.column("price").unwrap().scale, Some(4));
    assert_eq!(table.column("name").unwrap().length, Some(40));
}

#[test]
fn create_index_and_drop() {
    let queries = parse(
        "CREATE UNIQUE INDEX ix ON t (b DESC, a); DROP TABLE IF EXISTS t",
        Dialect::MySql,
    )
    .unwrap();
    match &queries[0] {
        Query::CreateIndex(q) => {
            assert!(q.unique);
            assert_eq!(q.name, "ix");
            let columns: Vec<_> = q.columns.iter().map(|c| (&c.column, c.direction)).collect();
            assert_eq!(
                columns,
                vec![
                    (&ColumnRef::new("b"), SortDirection::Descending),
                    (&ColumnRef::new("a"), SortDirection::Ascending),
                ]
            );
        }
        other => panic!("expected CREATE INDEX, got {}", other.kind()),
    }
    match &queries[1] {
        Query::DropTable(q) => assert!(q.if_exists),
        other => panic!("expected DROP TABLE, got {}", other.kind()),
    }
}

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

#[test]
fn identifier_quoting() {
    let cases = [
        ("SELECT [My Col] FROM [dbo].[t]", Dialect::MsSql),
        ("SELECT `My Col` FROM `dbo`.`t`", Dialect::MySql),
        ("SELECT \"My Col\" FROM \"dbo\".\"t\"", Dialect::Postgres),
    ];
    for (sql, dialect) in cases {
        let query = select(sql, dialect);
        assert_eq!(
            query.select_expressions[0].as_column(),
            Some(&ColumnRef::new("My Col")),
            "{sql}"
        );
        match &query.from[0].source {
            TableSource::Table(t) => assert_eq!(t.name, "t"),
            other => panic!("expected table, got {other:?}"),
        }
    }
}

#[test]
fn row_limits() {
    let mssql = select("SELECT TOP 10 a FROM t ORDER BY a DESC", Dialect::MsSql);
    assert_eq!(mssql.limit.unwrap().count, 10);
    assert_eq!(mssql.order_by[0].direction, SortDirection::Descending);

    let mysql = select("SELECT a FROM t LIMIT 20, 10", Dialect::MySql);
    let limit = mysql.limit.unwrap();
    assert_eq!((limit.count, limit.offset), (10, Some(20)));

    let pg = select("SELECT a FROM t LIMIT 10 OFFSET 20", Dialect::Postgres);
    let limit = pg.limit.unwrap();
    assert_eq!((limit.count, limit.offset), (10, Some(20)));

    assert!(parse("SELECT a FROM t LIMIT 20, 10", Dialect::Postgres).is_err());
}

#[test]
fn use_statement_per_dialect() {
    match parse_one("USE sales", Dialect::MsSql) {
        Query::Use(u) => assert_eq!(u.database.name, "sales"),
        other => panic!("expected USE, got {}", other.kind()),
    }
    let err = parse("USE sales", Dialect::Postgres).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unsupported: USE statements are not supported by the postgres dialect"
    );
}

#[test]
fn comments_per_dialect() {
    assert!(parse("SELECT a -- note\nFROM t /* block */ # hash", Dialect::MySql).is_ok());
    assert!(parse("SELECT a FROM t # hash", Dialect::MsSql).is_err());
}

// ---------------------------------------------------------------------------
// Joins and derived tables
// ---------------------------------------------------------------------------

#[test]
fn joins_and_comma_sources() {
    let query = select(
        "SELECT o.id FROM orders o LEFT JOIN customers c ON o.cid = c.id, \
         (SELECT id FROM refunds) AS r",
        Dialect::MySql,
    );
    assert_eq!(query.from.len(), 2);
    assert_eq!(query.from[0].joins[0].kind, JoinKind::Left);
    match &query.from[0].source {
        TableSource::Table(t) => assert_eq!(t.reference_name(), "o"),
        other => panic!("expected table, got {other:?}"),
    }
    assert!(matches!(&query.from[1].source, TableSource::Derived { alias, .. } if alias == "r"));
}

// ---------------------------------------------------------------------------
// Administrative commands
// ---------------------------------------------------------------------------

#[test]
fn administrative_commands() {
    let queries = parse(
        "EXPORT KEYS TO 's3://bucket/keys'; UPDATE KEYS STATUS; \
         DECRYPT COLUMN t.a STATUS; REBALANCE OPETREE STOP IMMEDIATE; \
         SAVE OPETREE; LOAD OPETREE; SAVE SCHEMA; LOAD SCHEMA; \
         LICENSE REFRESH; LICENSE STATUS; LICENSE SET KEY",
        Dialect::MsSql,
    )
    .unwrap();
    let kinds: Vec<_> = queries.iter().map(Query::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "EXPORT KEYS",
            "UPDATE KEYS",
            "DECRYPT COLUMN",
            "REBALANCE OPETREE",
            "SAVE OPETREE",
            "LOAD OPETREE",
            "SAVE SCHEMA",
            "LOAD SCHEMA",
            "LICENSE REFRESH",
            "LICENSE STATUS",
            "LICENSE SET KEY",
        ]
    );
    match &queries[1] {
        Query::UpdateKeys(k) => assert!(k.status_check && k.destination.is_none()),
        other => panic!("expected UPDATE KEYS, got {}", other.kind()),
    }
    match &queries[2] {
        Query::DecryptColumn(c) => assert!(c.status_check && c.flags.is_none()),
        other => panic!("expected DECRYPT COLUMN, got {}", other.kind()),
    }
    match &queries[3] {
        Query::RebalanceOpetree(o) => {
            assert!(o.seeds.is_empty());
            assert_eq!(o.stop.as_ref().unwrap().stop_type, StopType::Immediate);
        }
        other => panic!("expected REBALANCE OPETREE, got {}", other.kind()),
    }
    match &queries[10] {
        Query::LicenseSetKey(l) => assert!(l.key.is_none()),
        other => panic!("expected LICENSE SET KEY, got {}", other.kind()),
    }
}

#[test]
fn bypass_wraps_one_statement() {
    match parse_one("BYPASS INSERT INTO t VALUES (1)", Dialect::MySql) {
        Query::Bypass(inner) => assert!(matches!(*inner, Query::Insert(_))),
        other => panic!("expected BYPASS, got {}", other.kind()),
    }
    assert!(parse("BYPASS LICENSE STATUS", Dialect::MySql).is_err());
}

// ---------------------------------------------------------------------------
// Errors and configuration
// ---------------------------------------------------------------------------

#[test]
fn one_failure_fails_the_batch() {
    let err = parse("SELECT 1; SELECT FROM; SELECT 2", Dialect::MySql).unwrap_err();
    assert!(err.is_parse_failure());
    let err = parse("SELECT 1; CREATE TABLE t (a INT(4))", Dialect::MySql).unwrap_err();
    assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn syntax_errors_report_position() {
    let err = parse("SELECT a\nFROM t\nWHERE a = = 1", Dialect::MySql).unwrap_err();
    assert_eq!(
        err.to_string(),
        "parse failed: syntax error at line 3, column 11: expected an expression, found '='"
    );
}

#[test]
fn deep_nesting_is_rejected_not_overflowed() {
    let sql = format!("SELECT {}1{}", "(".repeat(5000), ")".repeat(5000));
    let err = parse(&sql, Dialect::MySql).unwrap_err();
    assert!(err.is_parse_failure());
}

#[test]
fn long_or_chains_do_not_recurse_deeply() {
    let terms: Vec<String> = (0..3000).map(|i| format!("a = {i}")).collect();
    let sql = format!("SELECT * FROM t WHERE {}", terms.join(" OR "));
    let query = select(&sql, Dialect::MySql);
    let cnf = &query.where_clause.unwrap().cnf;
    assert_eq!(cnf.len(), 1);
    assert_eq!(cnf.iter().next().unwrap().len(), 3000);
}

#[test]
fn long_arithmetic_chains_are_rejected() {
    let sql = format!("SELECT * FROM t WHERE a = {}", vec!["1"; 50_000].join(" - "));
    let err = parse(&sql, Dialect::MySql).unwrap_err();
    assert!(err.is_parse_failure());
    assert!(err.to_string().contains("nesting exceeds the limit of 128 levels"));

    let sql = format!("SELECT {} FROM t", vec!["a"; 100].join(" + "));
    let query = select(&sql, Dialect::MySql);
    let expected = &sql["SELECT ".len()..sql.len() - " FROM t".len()];
    assert_eq!(query.select_expressions[0].alias(), Some(expected));
}

#[test]
fn config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parser.toml");
    std::fs::write(&path, "dialect = \"postgres\"\nallow_use_statements = false\n").unwrap();

    let config = ParserConfig::from_file(&path).unwrap();
    assert_eq!(config.dialect, Dialect::Postgres);
    assert!(parse_with_config("SELECT \"x\" FROM t", &config).is_ok());
    assert!(matches!(
        parse_with_config("USE db", &config),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn queries_serialize_for_the_planner() {
    let query = parse_one(
        "SELECT a, SUM(b) FROM t WHERE a IN (1, 2) AND c LIKE 'x%' GROUP BY a",
        Dialect::MySql,
    );
    let json = serde_json::to_string(&query).unwrap();
    let back: Query = serde_json::from_str(&json).unwrap();
    assert_eq!(back, query);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("Select").is_some());
}

#[test]
fn get_columns_lists_every_reference() {
    let query = select("SELECT a + b * t.c FROM t", Dialect::MySql);
    let names: Vec<String> = query.select_expressions[0]
        .get_columns()
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "t.c"]);
}
