//! End-to-end facade tests against a scripted in-memory connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dbmeta::connection::{
    RawColumnRow, RawGrantRow, RawIndexRow, RawKeyRow, RawPrimaryKeyRow, RawProcedureRow,
    RawTableRow,
};
use dbmeta::{
    ConnectionContext, DbSettings, MetaError, MetadataFacade, ReportedCase, Result, RowSet,
    TableIdentifier,
};

#[derive(Default)]
struct MockConnection {
    product: String,
    version: String,
    keywords: Vec<String>,
    tables: Vec<RawTableRow>,
    columns: HashMap<String, Vec<RawColumnRow>>,
    pks: HashMap<String, Vec<RawPrimaryKeyRow>>,
    imported: HashMap<String, Vec<RawKeyRow>>,
    indexes: HashMap<String, Vec<RawIndexRow>>,
    auto_commit: bool,
    fail_execute: bool,
    executed: Mutex<Vec<String>>,
    rolled_back: AtomicBool,
    committed: AtomicBool,
}

impl MockConnection {
    fn new(product: &str) -> Self {
        Self {
            product: product.to_string(),
            version: "1.0".to_string(),
            auto_commit: true,
            ..Default::default()
        }
    }

    fn add_table(&mut self, name: &str, object_type: &str) {
        self.tables.push(RawTableRow {
            catalog: None,
            schema: None,
            name: name.to_string(),
            object_type: object_type.to_string(),
            remarks: None,
        });
    }

    fn add_column(&mut self, table: &str, name: &str, type_name: &str, type_code: i32, size: i32, nullable: bool) {
        let cols = self.columns.entry(table.to_string()).or_default();
        let position = cols.len() as i32 + 1;
        cols.push(RawColumnRow {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_code,
            size,
            digits: 0,
            nullable,
            default_value: None,
            remarks: None,
            position,
            extra: None,
        });
    }
}

fn like_match(name: &str, pattern: &str) -> bool {
    if pattern.is_empty() || pattern == "%" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('%') {
        return name.to_uppercase().starts_with(&prefix.to_uppercase());
    }
    name.eq_ignore_ascii_case(pattern)
}

#[async_trait]
impl ConnectionContext for MockConnection {
    async fn product_name(&self) -> Result<String> {
        Ok(self.product.clone())
    }

    async fn product_version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn identifier_quote(&self) -> Result<Option<String>> {
        Ok(Some("\"".to_string()))
    }

    async fn schema_term(&self) -> Result<String> {
        Ok("schema".to_string())
    }

    async fn catalog_term(&self) -> Result<String> {
        Ok("catalog".to_string())
    }

    async fn stored_identifier_case(&self) -> Result<ReportedCase> {
        Ok(ReportedCase::Mixed)
    }

    async fn current_user(&self) -> Result<String> {
        Ok("tester".to_string())
    }

    async fn current_catalog(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn current_schema(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn keywords(&self) -> Result<Vec<String>> {
        Ok(self.keywords.clone())
    }

    async fn table_types(&self) -> Result<Vec<String>> {
        Ok(vec!["TABLE".to_string(), "VIEW".to_string()])
    }

    async fn catalogs(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn schemas(&self) -> Result<Vec<String>> {
        Ok(vec!["public".to_string(), "internal".to_string()])
    }

    async fn tables(
        &self,
        _catalog: Option<&str>,
        schema: Option<&str>,
        name_pattern: Option<&str>,
        types: Option<&[String]>,
    ) -> Result<Vec<RawTableRow>> {
        Ok(self
            .tables
            .iter()
            .filter(|t| {
                schema.map_or(true, |s| {
                    t.schema.as_deref().is_some_and(|ts| ts.eq_ignore_ascii_case(s))
                }) && name_pattern.map_or(true, |p| like_match(&t.name, p))
                    && types.map_or(true, |ts| {
                        ts.iter().any(|x| x.eq_ignore_ascii_case(&t.object_type))
                    })
            })
            .cloned()
            .collect())
    }

    async fn columns(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawColumnRow>> {
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }

    async fn primary_keys(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawPrimaryKeyRow>> {
        Ok(self.pks.get(table).cloned().unwrap_or_default())
    }

    async fn imported_keys(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawKeyRow>> {
        Ok(self.imported.get(table).cloned().unwrap_or_default())
    }

    async fn exported_keys(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _table: &str,
    ) -> Result<Vec<RawKeyRow>> {
        Ok(Vec::new())
    }

    async fn index_info(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        table: &str,
        _unique_only: bool,
    ) -> Result<Vec<RawIndexRow>> {
        Ok(self.indexes.get(table).cloned().unwrap_or_default())
    }

    async fn procedures(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
    ) -> Result<Vec<RawProcedureRow>> {
        Ok(Vec::new())
    }

    async fn procedure_columns(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _procedure: &str,
    ) -> Result<RowSet> {
        Ok(RowSet::default())
    }

    async fn table_privileges(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _table: &str,
    ) -> Result<Vec<RawGrantRow>> {
        Ok(Vec::new())
    }

    async fn query(&self, _sql: &str) -> Result<RowSet> {
        Err(MetaError::connectivity("no scripted result for query"))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        self.executed.lock().unwrap().push(sql.to_string());
        if self.fail_execute {
            return Err(MetaError::connectivity("object is in use"));
        }
        Ok(0)
    }

    async fn auto_commit(&self) -> Result<bool> {
        Ok(self.auto_commit)
    }

    async fn commit(&self) -> Result<()> {
        self.committed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.rolled_back.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn rollback_to_savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn release_savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

async fn facade_for(conn: MockConnection, settings: DbSettings) -> (Arc<MockConnection>, MetadataFacade) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let conn = Arc::new(conn);
    let facade = MetadataFacade::connect(conn.clone(), Arc::new(settings))
        .await
        .expect("facade construction");
    (conn, facade)
}

#[tokio::test]
async fn reserved_words_are_quoted() {
    let mut conn = MockConnection::new("PostgreSQL");
    conn.keywords = vec!["order".to_string()];
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    assert_eq!(facade.quote_object_name("order"), "\"order\"");
    assert_eq!(facade.quote_object_name("customer"), "customer");
    assert!(facade.is_keyword("ORDER"));
}

#[tokio::test]
async fn table_listing_hides_indexes_and_relabels_snapshots() {
    let mut conn = MockConnection::new("MockDB");
    conn.add_table("ORDERS", "TABLE");
    conn.add_table("ORDERS_IDX", "INDEX");
    conn.add_table("MV_SALES", "SNAPSHOT");
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    let cancel = CancellationToken::new();
    let result = facade
        .get_tables(None, None, None, None, &cancel)
        .await
        .unwrap();

    assert_eq!(result.row_count(), 2);
    let type_col = result.column_index("TYPE").unwrap();
    let name_col = result.column_index("NAME").unwrap();
    assert_eq!(result.value_as_string(0, name_col), "ORDERS");
    assert_eq!(result.value_as_string(0, type_col), "TABLE");
    assert_eq!(result.value_as_string(1, name_col), "MV_SALES");
    assert_eq!(result.value_as_string(1, type_col), "MATERIALIZED VIEW");
}

#[tokio::test]
async fn configured_exclusion_pattern_filters_objects() {
    let mut conn = MockConnection::new("MockDB");
    conn.add_table("TMP_LOAD", "TABLE");
    conn.add_table("ORDERS", "TABLE");
    let settings = DbSettings::from_pairs([("dbmeta.mockdb.exclude.table", "^TMP_.*")]);
    let (_, facade) = facade_for(conn, settings).await;

    let cancel = CancellationToken::new();
    let result = facade
        .get_tables(None, None, None, None, &cancel)
        .await
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.value_as_string(0, 0), "ORDERS");
}

#[tokio::test]
async fn cancelled_scan_is_aborted() {
    let mut conn = MockConnection::new("MockDB");
    conn.add_table("ORDERS", "TABLE");
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = facade
        .get_tables(None, None, None, None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, MetaError::Cancelled));
}

#[tokio::test]
async fn multi_column_fk_becomes_one_definition() {
    let mut conn = MockConnection::new("MockDB");
    let rows = vec![
        RawKeyRow {
            pk_schema: None,
            pk_table: "ORDERS".into(),
            pk_column: "ID".into(),
            fk_schema: None,
            fk_table: "ITEMS".into(),
            fk_column: "ORDER_ID".into(),
            key_seq: 1,
            update_rule: 0,
            delete_rule: 1,
            fk_name: Some("FK_ITEMS_ORDERS".into()),
            pk_name: Some("PK_ORDERS".into()),
        },
        RawKeyRow {
            pk_schema: None,
            pk_table: "ORDERS".into(),
            pk_column: "TENANT".into(),
            fk_schema: None,
            fk_table: "ITEMS".into(),
            fk_column: "ORDER_TENANT".into(),
            key_seq: 2,
            update_rule: 0,
            delete_rule: 1,
            fk_name: Some("FK_ITEMS_ORDERS".into()),
            pk_name: Some("PK_ORDERS".into()),
        },
    ];
    conn.imported.insert("ITEMS".to_string(), rows);
    conn.add_column("ITEMS", "ORDER_ID", "INTEGER", 4, 10, false);
    conn.add_column("ITEMS", "ORDER_TENANT", "INTEGER", 4, 10, false);
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    let table = TableIdentifier::new("ITEMS");
    let fks = facade.get_foreign_key_definitions(&table).await.unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].columns, vec!["ORDER_ID", "ORDER_TENANT"]);
    assert_eq!(fks[0].target_columns, vec!["ID", "TENANT"]);

    let ddl = facade.get_table_source(&table, false, true).await.unwrap();
    assert_eq!(ddl.matches("ALTER TABLE ITEMS ADD CONSTRAINT").count(), 1);
    assert!(ddl.contains(
        "ADD CONSTRAINT FK_ITEMS_ORDERS FOREIGN KEY (ORDER_ID, ORDER_TENANT) \
         REFERENCES ORDERS (ID, TENANT)"
    ));
    assert!(ddl.contains("ON DELETE RESTRICT"));

    let without_fks = facade.get_table_source(&table, false, false).await.unwrap();
    assert!(!without_fks.contains("FOREIGN KEY"));
}

#[tokio::test]
async fn postgres_fk_name_garbage_is_truncated() {
    let mut conn = MockConnection::new("PostgreSQL");
    conn.version = "8.1.4".to_string();
    conn.imported.insert(
        "items".to_string(),
        vec![RawKeyRow {
            pk_schema: None,
            pk_table: "orders".into(),
            pk_column: "id".into(),
            fk_schema: None,
            fk_table: "items".into(),
            fk_column: "order_id".into(),
            key_seq: 1,
            update_rule: 3,
            delete_rule: 3,
            fk_name: Some("fk_items\\000ON DELETE NO ACTION".into()),
            pk_name: None,
        }],
    );
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    let fks = facade
        .get_foreign_key_definitions(&TableIdentifier::new("items"))
        .await
        .unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].name, "fk_items");
}

#[tokio::test]
async fn table_source_has_separate_pk_statement() {
    let mut conn = MockConnection::new("MockDB");
    conn.add_table("ORDERS", "TABLE");
    conn.add_column("ORDERS", "ID", "INTEGER", 4, 10, false);
    conn.add_column("ORDERS", "NAME", "VARCHAR", 12, 50, true);
    conn.pks.insert(
        "ORDERS".to_string(),
        vec![RawPrimaryKeyRow {
            column_name: "ID".into(),
            key_seq: 1,
            pk_name: Some("PK_ORDERS".into()),
        }],
    );
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    let ddl = facade
        .get_table_source(&TableIdentifier::new("ORDERS"), false, true)
        .await
        .unwrap();
    assert!(ddl.starts_with("CREATE TABLE ORDERS"));
    assert!(ddl.contains("VARCHAR(50)"));
    assert!(ddl.contains("ALTER TABLE ORDERS ADD CONSTRAINT PK_ORDERS PRIMARY KEY (ID);"));
    assert!(!ddl.contains("COMMIT;"));

    let columns = facade
        .get_table_columns(&TableIdentifier::new("ORDERS"))
        .await
        .unwrap();
    assert!(columns[0].is_pk);
    assert!(!columns[1].is_pk);
}

#[tokio::test]
async fn index_list_groups_rows_and_flags_one_pk_index() {
    let mut conn = MockConnection::new("MockDB");
    conn.add_column("ORDERS", "ID", "INTEGER", 4, 10, false);
    // driver reports the PK columns but no constraint name
    conn.pks.insert(
        "ORDERS".to_string(),
        vec![RawPrimaryKeyRow {
            column_name: "ID".into(),
            key_seq: 1,
            pk_name: None,
        }],
    );
    conn.indexes.insert(
        "ORDERS".to_string(),
        vec![
            RawIndexRow {
                index_name: Some("IDX_A".into()),
                non_unique: false,
                column_name: "ID".into(),
                ascending: None,
                type_code: 1,
                dialect_type: None,
            },
            RawIndexRow {
                index_name: Some("IDX_B".into()),
                non_unique: false,
                column_name: "ID".into(),
                ascending: None,
                type_code: 1,
                dialect_type: None,
            },
            RawIndexRow {
                index_name: Some("IDX_NAMES".into()),
                non_unique: true,
                column_name: "LAST_NAME".into(),
                ascending: Some(true),
                type_code: 3,
                dialect_type: None,
            },
            RawIndexRow {
                index_name: Some("IDX_NAMES".into()),
                non_unique: true,
                column_name: "FIRST_NAME".into(),
                ascending: Some(true),
                type_code: 3,
                dialect_type: None,
            },
        ],
    );
    let settings = DbSettings::from_pairs([("dbmeta.mockdb.indextypes", "1,CLUSTERED")]);
    let (_, facade) = facade_for(conn, settings).await;

    let indexes = facade
        .get_table_index_list(&TableIdentifier::new("ORDERS"))
        .await
        .unwrap();
    assert_eq!(indexes.len(), 3);

    // both unique indexes cover the PK column, but only one carries the flag
    let flagged: Vec<&str> = indexes
        .iter()
        .filter(|i| i.is_pk_index)
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(flagged, ["IDX_A"]);

    let clustered = indexes.iter().find(|i| i.name == "IDX_A").unwrap();
    assert_eq!(clustered.index_type, "CLUSTERED");

    let names = indexes.iter().find(|i| i.name == "IDX_NAMES").unwrap();
    assert_eq!(names.columns, ["LAST_NAME ASC", "FIRST_NAME ASC"]);
    assert_eq!(names.index_type, "NORMAL");
    assert!(!names.unique);
}

#[tokio::test]
async fn drop_table_failure_rolls_back_and_rethrows() {
    let mut conn = MockConnection::new("MockDB");
    conn.auto_commit = false;
    conn.fail_execute = true;
    let settings = DbSettings::from_pairs([("dbmeta.mockdb.ddl_needs_commit", "true")]);
    let (conn, facade) = facade_for(conn, settings).await;

    let err = facade
        .drop_table(&TableIdentifier::new("ORDERS"))
        .await
        .unwrap_err();
    assert!(matches!(err, MetaError::Structural { .. }));
    assert!(conn.rolled_back.load(Ordering::SeqCst));
    assert!(!conn.committed.load(Ordering::SeqCst));
    assert_eq!(conn.executed.lock().unwrap().as_slice(), ["DROP TABLE ORDERS"]);
}

#[tokio::test]
async fn drop_table_commits_when_dialect_needs_it() {
    let mut conn = MockConnection::new("MockDB");
    conn.auto_commit = false;
    let settings = DbSettings::from_pairs([("dbmeta.mockdb.ddl_needs_commit", "true")]);
    let (conn, facade) = facade_for(conn, settings).await;

    facade
        .drop_table(&TableIdentifier::new("ORDERS"))
        .await
        .unwrap();
    // default commit style sends a COMMIT statement
    assert_eq!(
        conn.executed.lock().unwrap().as_slice(),
        ["DROP TABLE ORDERS", "COMMIT"]
    );
    assert!(!conn.committed.load(Ordering::SeqCst));
    assert!(!conn.rolled_back.load(Ordering::SeqCst));
}

#[tokio::test]
async fn drop_table_commits_through_driver_when_configured() {
    let mut conn = MockConnection::new("MockDB");
    conn.auto_commit = false;
    let settings = DbSettings::from_pairs([
        ("dbmeta.mockdb.ddl_needs_commit", "true"),
        ("dbmeta.mockdb.use_jdbc_commit", "true"),
    ]);
    let (conn, facade) = facade_for(conn, settings).await;

    facade
        .drop_table(&TableIdentifier::new("ORDERS"))
        .await
        .unwrap();
    assert_eq!(conn.executed.lock().unwrap().as_slice(), ["DROP TABLE ORDERS"]);
    assert!(conn.committed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn closed_facade_rejects_further_calls() {
    let conn = MockConnection::new("MockDB");
    let (_, facade) = facade_for(conn, DbSettings::empty()).await;

    facade.close();
    facade.close(); // idempotent
    assert!(facade.is_closed());
    let err = facade.get_table_types().await.unwrap_err();
    assert!(matches!(err, MetaError::Closed));
}

#[tokio::test]
async fn schema_listing_respects_ignore_list() {
    let conn = MockConnection::new("MockDB");
    let settings = DbSettings::from_pairs([("dbmeta.mockdb.ignore_schemas", "internal")]);
    let (_, facade) = facade_for(conn, settings).await;

    let schemas = facade.get_schemas().await.unwrap();
    assert_eq!(schemas, vec!["public"]);
}
