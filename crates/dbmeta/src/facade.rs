//! The metadata facade.
//!
//! One facade wraps one [`ConnectionContext`]. Everything derived from the
//! connection (dialect profile, identifier policy, templates, quirks, reader
//! bundle) is resolved eagerly at construction; afterwards the facade is a
//! read-mostly object whose retrieval calls can run until [`close`] flips
//! the terminal flag.
//!
//! Error handling follows one rule throughout: read-only retrieval degrades
//! (logged, empty result), mutating operations roll back and re-throw.
//!
//! [`close`]: MetadataFacade::close

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionContext, RawKeyRow};
use crate::ddl::{DdlSynthesizer, TableDdlRequest};
use crate::dialect::{DialectDetector, DialectFamily, DialectProfile};
use crate::error::{MetaError, Result};
use crate::identifier::IdentifierPolicy;
use crate::model::{
    ColumnIdentifier, FilterMode, ForeignKeyDefinition, IndexDefinition, ObjectNameFilter,
    ObjectType, ProcedureDefinition, ReferentialRule, TableIdentifier,
};
use crate::quirks::DriverQuirks;
use crate::readers::ReaderBundle;
use crate::rowset::{CellValue, RowSet};
use crate::settings::DbSettings;
use crate::templates::{placeholder, SqlTemplateStore, TemplateKey};

/// Column names of the row set returned by [`MetadataFacade::get_tables`].
pub const TABLE_LIST_COLUMNS: [&str; 5] = ["NAME", "TYPE", "CATALOG", "SCHEMA", "REMARKS"];

/// Column names of the row set returned by the foreign-key calls.
pub const FK_LIST_COLUMNS: [&str; 5] =
    ["FK_NAME", "COLUMN", "REFERENCES", "UPDATE_RULE", "DELETE_RULE"];

const DDL_INDENT: &str = "   ";

/// Cross-dialect metadata access for one connection.
pub struct MetadataFacade {
    conn: Arc<dyn ConnectionContext>,
    profile: DialectProfile,
    settings: Arc<DbSettings>,
    policy: IdentifierPolicy,
    readers: ReaderBundle,
    templates: SqlTemplateStore,
    quirks: DriverQuirks,
    /// Numeric index-type code to dialect label.
    index_type_map: HashMap<i32, String>,
    /// Uppercased object-type labels whose objects hold rows.
    objects_with_data: HashSet<String>,
    closed: AtomicBool,
}

impl MetadataFacade {
    /// Bind a facade to a connection, resolving dialect, policy, templates,
    /// quirks and readers up front.
    pub async fn connect(
        conn: Arc<dyn ConnectionContext>,
        settings: Arc<DbSettings>,
    ) -> Result<Self> {
        let profile = DialectDetector::detect(conn.as_ref(), settings.as_ref()).await;

        let mut keywords: HashSet<String> = match conn.keywords().await {
            Ok(words) => words.into_iter().map(|w| w.trim().to_uppercase()).collect(),
            Err(e) => {
                warn!("could not retrieve driver keyword list: {e}");
                HashSet::new()
            }
        };
        for word in settings.get_list(&profile.dialect_id, "additional_keywords") {
            keywords.insert(word.to_uppercase());
        }

        let policy = IdentifierPolicy::new(&profile, keywords);
        let templates = SqlTemplateStore::with_builtins(settings.as_ref(), &profile.dialect_id)?;
        let readers = ReaderBundle::for_family(profile.family);
        let quirks = DriverQuirks::resolve(profile.family, &profile.product_version);

        let index_type_map = parse_index_type_map(settings.as_ref(), &profile.dialect_id);

        let configured = settings.get_list(&profile.dialect_id, "objects_with_data");
        let objects_with_data: HashSet<String> = if configured.is_empty() {
            ["TABLE", "VIEW", "SYSTEM TABLE", "MATERIALIZED VIEW", "SYNONYM"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            configured.into_iter().map(|s| s.to_uppercase()).collect()
        };

        info!(
            dialect = %profile.dialect_id,
            product = %profile.product_name,
            "metadata facade ready"
        );

        Ok(Self {
            conn,
            profile,
            settings,
            policy,
            readers,
            templates,
            quirks,
            index_type_map,
            objects_with_data,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MetaError::Closed);
        }
        Ok(())
    }

    /// Mark the facade closed. Idempotent; every later call returns
    /// [`MetaError::Closed`]. The connection itself belongs to the caller.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(dialect = %self.profile.dialect_id, "metadata facade closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn profile(&self) -> &DialectProfile {
        &self.profile
    }

    pub fn policy(&self) -> &IdentifierPolicy {
        &self.policy
    }

    fn dialect_id(&self) -> &str {
        &self.profile.dialect_id
    }

    fn synthesizer(&self) -> DdlSynthesizer<'_> {
        DdlSynthesizer::new(&self.profile, &self.policy, &self.templates, &self.settings)
    }

    // ----- identifier helpers -----

    pub fn quote_object_name(&self, name: &str) -> String {
        self.policy.quote_object_name(name, false)
    }

    pub fn adjust_object_name_case(&self, name: &str) -> String {
        self.policy.adjust_object_name_case(name)
    }

    pub fn adjust_schema_name_case(&self, name: &str) -> String {
        self.policy.adjust_schema_name_case(name)
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.policy.is_keyword(name)
    }

    /// Can objects of this type hold rows (relevant for data export)?
    pub fn object_type_can_contain_data(&self, type_label: &str) -> bool {
        self.objects_with_data.contains(&type_label.to_uppercase())
    }

    // ----- session info -----

    pub async fn current_user(&self) -> Result<String> {
        self.ensure_open()?;
        self.conn.current_user().await
    }

    pub async fn current_catalog(&self) -> Result<Option<String>> {
        self.ensure_open()?;
        if !self.profile.supports_catalogs {
            return Ok(None);
        }
        self.conn.current_catalog().await
    }

    /// Current schema, letting the dialect reader refine what the driver
    /// reports. Failures degrade to None.
    pub async fn current_schema(&self) -> Option<String> {
        if self.ensure_open().is_err() {
            return None;
        }
        match self
            .readers
            .schema_info
            .current_schema(self.conn.as_ref())
            .await
        {
            Ok(schema) => schema,
            Err(e) => {
                debug!("could not determine current schema: {e}");
                None
            }
        }
    }

    // ----- enumeration -----

    pub async fn get_table_types(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.conn.table_types().await
    }

    /// Catalogs, filtered through the configured ignore list. Empty when the
    /// dialect has no catalog concept.
    pub async fn get_catalogs(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        if !self.profile.supports_catalogs {
            return Ok(Vec::new());
        }
        let filter = self.name_filter("ignore_catalogs");
        let catalogs = self.conn.catalogs().await?;
        Ok(catalogs
            .into_iter()
            .filter(|c| filter.retains(c))
            .collect())
    }

    /// Schemas, filtered through the configured ignore list.
    pub async fn get_schemas(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        let filter = self.name_filter("ignore_schemas");
        let schemas = self.conn.schemas().await?;
        Ok(schemas.into_iter().filter(|s| filter.retains(s)).collect())
    }

    fn name_filter(&self, key: &str) -> ObjectNameFilter {
        let patterns = self.settings.get_list(self.dialect_id(), key);
        ObjectNameFilter::new(FilterMode::Exclude, patterns)
    }

    /// List tables (and views, synonyms, sequences, ...) as a row set with
    /// the [`TABLE_LIST_COLUMNS`] layout.
    ///
    /// `name_pattern` accepts `*` or `%` wildcards. The raw driver listing
    /// goes through three cleanup passes (configured exclusion patterns,
    /// dialect-internal objects, index entries) and is then augmented with
    /// sequences and synonyms the driver does not report. The token makes
    /// scans over large schemas abortable between rows.
    pub async fn get_tables(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name_pattern: Option<&str>,
        types: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<RowSet> {
        self.ensure_open()?;

        let schema = schema
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "*" && *s != "%")
            .map(|s| self.policy.adjust_schema_name_case(s));
        let pattern = name_pattern
            .map(|p| p.replace('*', "%"))
            .map(|p| self.policy.adjust_object_name_case(&p));

        let rows = self
            .conn
            .tables(catalog, schema.as_deref(), pattern.as_deref(), types)
            .await?;

        let hide_indexes = self
            .settings
            .get_bool(self.dialect_id(), "hide_indexes", true);
        let mut exclude_cache: HashMap<String, Option<regex::Regex>> = HashMap::new();

        let mut result = RowSet::new(TABLE_LIST_COLUMNS.to_vec());
        let mut seen: HashSet<(Option<String>, String)> = HashSet::new();

        for row in rows {
            if cancel.is_cancelled() {
                return Err(MetaError::Cancelled);
            }
            let mut label = row.object_type.to_uppercase();
            if label == "SNAPSHOT" {
                label = "MATERIALIZED VIEW".to_string();
            }
            let object_type = ObjectType::from_label(&label);

            if hide_indexes && object_type == ObjectType::Index {
                continue;
            }
            // Oracle reports synonyms for dropped recycle-bin objects with a
            // slash in the name
            if self.profile.family == DialectFamily::Oracle
                && object_type == ObjectType::Synonym
                && row.name.contains('/')
            {
                continue;
            }
            let exclude_key = format!("exclude.{}", label.to_lowercase().replace(' ', "_"));
            let excluded = exclude_cache
                .entry(exclude_key.clone())
                .or_insert_with(|| self.settings.get_regex(self.dialect_id(), &exclude_key))
                .as_ref()
                .is_some_and(|re| re.is_match(&row.name));
            if excluded {
                debug!(name = %row.name, "object excluded by configured pattern");
                continue;
            }

            seen.insert((row.schema.clone(), row.name.clone()));
            result.add_row(vec![
                CellValue::from(row.name),
                CellValue::from(label),
                CellValue::from(row.catalog),
                CellValue::from(row.schema),
                CellValue::from(row.remarks),
            ]);
        }

        if wants_type(types, "SEQUENCE") {
            self.append_extra_objects(
                &mut result,
                &mut seen,
                schema.as_deref(),
                pattern.as_deref(),
                "SEQUENCE",
                cancel,
            )
            .await?;
        }
        if wants_type(types, "SYNONYM") {
            self.append_extra_objects(
                &mut result,
                &mut seen,
                schema.as_deref(),
                pattern.as_deref(),
                "SYNONYM",
                cancel,
            )
            .await?;
        }
        Ok(result)
    }

    /// Append reader-supplied objects the baseline listing does not report.
    async fn append_extra_objects(
        &self,
        result: &mut RowSet,
        seen: &mut HashSet<(Option<String>, String)>,
        schema: Option<&str>,
        pattern: Option<&str>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let names = match label {
            "SEQUENCE" => {
                self.readers
                    .sequences
                    .sequence_names(self.conn.as_ref(), schema)
                    .await
            }
            _ => {
                self.readers
                    .synonyms
                    .synonym_names(self.conn.as_ref(), schema)
                    .await
            }
        };
        let names = match names {
            Ok(names) => names,
            Err(e) => {
                debug!(label, error = %e, "extra object listing not available");
                return Ok(());
            }
        };
        for name in names {
            if cancel.is_cancelled() {
                return Err(MetaError::Cancelled);
            }
            if !matches_pattern(&name, pattern) {
                continue;
            }
            let key = (schema.map(str::to_string), name.clone());
            if seen.contains(&key) {
                continue;
            }
            seen.insert(key);
            result.add_row(vec![
                CellValue::from(name),
                CellValue::from(label),
                CellValue::Null,
                CellValue::from(schema.map(str::to_string)),
                CellValue::Null,
            ]);
        }
        Ok(())
    }

    /// Does the object exist, optionally restricted to certain types?
    /// Any retrieval error degrades to `false`.
    pub async fn object_exists(&self, table: &TableIdentifier, types: Option<&[String]>) -> bool {
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let cancel = CancellationToken::new();
        match self
            .get_tables(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                Some(&table.name),
                types,
                &cancel,
            )
            .await
        {
            Ok(rs) => !rs.is_empty(),
            Err(e) => {
                debug!(name = %table.name, "existence check failed: {e}");
                false
            }
        }
    }

    pub async fn table_exists(&self, table: &TableIdentifier) -> bool {
        self.object_exists(table, Some(&["TABLE".to_string()])).await
    }

    // ----- table definition -----

    /// Columns of a table, with primary-key flags cross-referenced and
    /// driver quirks applied. A synonym is resolved to its base table first.
    pub async fn get_table_columns(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<ColumnIdentifier>> {
        self.ensure_open()?;
        let (_, _, columns) = self.table_definition_internal(table).await?;
        Ok(columns)
    }

    async fn table_definition_internal(
        &self,
        table: &TableIdentifier,
    ) -> Result<(TableIdentifier, Option<String>, Vec<ColumnIdentifier>)> {
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let table = self.resolve_synonym(&table).await;

        let (pk_name, pk_columns) = self.primary_key_info(&table).await;

        let raw = self
            .conn
            .columns(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await?;

        let mut columns: Vec<ColumnIdentifier> = raw
            .into_iter()
            .map(|row| {
                let (size, digits) = self.quirks.fix_numeric_size(row.size, row.digits);
                let mut display_type =
                    ColumnIdentifier::display_type_for(&row.type_name, row.type_code, size, digits);
                // character-semantics columns need the length unit spelled out
                if self.quirks.char_semantics_ambiguous
                    && matches!(row.type_code, 1 | 12)
                    && size > 0
                    && row
                        .extra
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case("CHAR"))
                {
                    display_type = format!("{}({size} CHAR)", row.type_name);
                }
                ColumnIdentifier {
                    is_pk: pk_columns
                        .iter()
                        .any(|pk| pk.eq_ignore_ascii_case(&row.name)),
                    name: row.name,
                    display_type,
                    type_code: row.type_code,
                    size,
                    digits,
                    nullable: row.nullable,
                    default_value: row.default_value,
                    remarks: row.remarks,
                    position: row.position,
                    dbms_extra: row.extra,
                }
            })
            .collect();
        columns.sort_by_key(|c| c.position);

        if self.profile.family == DialectFamily::MySql {
            self.resolve_mysql_enums(&table, &mut columns).await;
        }

        Ok((table, pk_name, columns))
    }

    /// MySQL reports plain `enum`/`set` as the type name; the value list
    /// only shows up in SHOW COLUMNS.
    async fn resolve_mysql_enums(&self, table: &TableIdentifier, columns: &mut [ColumnIdentifier]) {
        let needs_lookup = columns.iter().any(|c| {
            let t = c.display_type.to_lowercase();
            (t == "enum" || t == "set") && !t.contains('(')
        });
        if !needs_lookup {
            return;
        }
        let sql = format!(
            "SHOW COLUMNS FROM {}",
            table.table_expression(&self.policy)
        );
        let result = match self.conn.query(&sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table = %table.name, "enum definition lookup failed: {e}");
                return;
            }
        };
        for row in 0..result.row_count() {
            let field = result.value_as_string(row, 0);
            let full_type = result.value_as_string(row, 1);
            if let Some(column) = columns.iter_mut().find(|c| c.name == field) {
                let t = column.display_type.to_lowercase();
                if t == "enum" || t == "set" {
                    column.display_type = full_type;
                }
            }
        }
    }

    /// Primary-key name and ordered column list. Degrades to no key.
    async fn primary_key_info(&self, table: &TableIdentifier) -> (Option<String>, Vec<String>) {
        if !self.profile.supports_get_primary_keys {
            return (None, Vec::new());
        }
        let mut rows = match self
            .conn
            .primary_keys(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table = %table.name, "primary key retrieval failed: {e}");
                return (None, Vec::new());
            }
        };
        rows.sort_by_key(|r| r.key_seq);
        let name = rows.iter().find_map(|r| r.pk_name.clone());
        let columns = rows.into_iter().map(|r| r.column_name).collect();
        (name, columns)
    }

    /// Resolve a synonym to its base table; non-synonyms pass through.
    pub async fn resolve_synonym(&self, table: &TableIdentifier) -> TableIdentifier {
        if table.object_type != ObjectType::Synonym {
            return table.clone();
        }
        match self
            .readers
            .synonyms
            .synonym_target(self.conn.as_ref(), table.schema.as_deref(), &table.name)
            .await
        {
            Ok(Some(target)) => target,
            Ok(None) => table.clone(),
            Err(e) => {
                debug!(name = %table.name, "synonym resolution failed: {e}");
                table.clone()
            }
        }
    }

    // ----- indexes -----

    /// Indexes of a table, grouped from the per-column driver rows. The
    /// index backing the primary key is flagged, dialect index types are
    /// resolved where a reader knows how.
    pub async fn get_table_index_list(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<IndexDefinition>> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);

        let (pk_name, pk_columns) = self.primary_key_info(&table).await;

        let mut rows = match self
            .conn
            .index_info(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
                false,
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table = %table.name, "index retrieval failed: {e}");
                return Ok(Vec::new());
            }
        };
        rows.retain(|r| r.index_name.is_some() && !r.column_name.is_empty());
        let mut grouped: BTreeMap<String, IndexDefinition> = BTreeMap::new();
        for row in rows {
            let name = row.index_name.clone().unwrap_or_default();
            let entry = grouped.entry(name.clone()).or_insert_with(|| {
                let mut def = IndexDefinition::new(name.clone());
                def.unique = !row.non_unique;
                def.index_type = row
                    .dialect_type
                    .clone()
                    .or_else(|| self.index_type_map.get(&row.type_code).cloned())
                    .unwrap_or_else(|| "NORMAL".to_string());
                def
            });
            let expr = match row.ascending {
                Some(true) => format!("{} ASC", row.column_name),
                Some(false) => format!("{} DESC", row.column_name),
                None => row.column_name,
            };
            entry.columns.push(expr);
        }

        let mut indexes: Vec<IndexDefinition> = grouped.into_values().collect();
        // at most one index may carry the PK flag; without a reported
        // constraint name the first covering unique index wins
        let mut pk_flagged = false;
        for index in indexes.iter_mut() {
            index.is_pk_index = !pk_flagged
                && match &pk_name {
                    Some(pk) => index.name.eq_ignore_ascii_case(pk),
                    None => {
                        index.unique
                            && !pk_columns.is_empty()
                            && index_covers_exactly(index, &pk_columns)
                    }
                };
            pk_flagged = pk_flagged || index.is_pk_index;
        }

        if let Err(e) = self
            .readers
            .indexes
            .enrich_index_list(
                self.conn.as_ref(),
                table.schema.as_deref(),
                &table.name,
                &mut indexes,
            )
            .await
        {
            debug!(table = %table.name, "index enrichment failed: {e}");
        }
        Ok(indexes)
    }

    // ----- foreign keys -----

    /// Foreign keys defined on the table, one row per column pair, in the
    /// [`FK_LIST_COLUMNS`] layout.
    pub async fn get_foreign_keys(&self, table: &TableIdentifier) -> Result<RowSet> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let rows = self
            .conn
            .imported_keys(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await?;
        Ok(self.key_rowset(rows, true))
    }

    /// Foreign keys in other tables referencing this one.
    pub async fn get_referenced_by(&self, table: &TableIdentifier) -> Result<RowSet> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let rows = self
            .conn
            .exported_keys(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await?;
        Ok(self.key_rowset(rows, false))
    }

    fn key_rowset(&self, mut rows: Vec<RawKeyRow>, imported: bool) -> RowSet {
        rows.sort_by(|a, b| {
            let an = a.fk_name.clone().unwrap_or_default();
            let bn = b.fk_name.clone().unwrap_or_default();
            an.cmp(&bn).then(a.key_seq.cmp(&b.key_seq))
        });
        let mut result = RowSet::new(FK_LIST_COLUMNS.to_vec());
        for row in rows {
            let raw_name = row.fk_name.as_deref().unwrap_or("");
            let name = self.quirks.fix_fk_name(raw_name).to_string();
            let (column, references) = if imported {
                (
                    row.fk_column.clone(),
                    format!("{}.{}", row.pk_table, row.pk_column),
                )
            } else {
                (
                    format!("{}.{}", row.fk_table, row.fk_column),
                    row.pk_column.clone(),
                )
            };
            result.add_row(vec![
                CellValue::from(name),
                CellValue::from(column),
                CellValue::from(references),
                CellValue::from(self.rule_display(ReferentialRule::from_code(row.update_rule))),
                CellValue::from(self.rule_display(ReferentialRule::from_code(row.delete_rule))),
            ]);
        }
        result
    }

    /// Display text for a referential rule, with settings override.
    pub fn rule_display(&self, rule: ReferentialRule) -> String {
        self.synthesizer().rule_display(rule)
    }

    /// Foreign keys grouped into one definition per constraint, ready for
    /// DDL synthesis.
    pub async fn get_foreign_key_definitions(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<ForeignKeyDefinition>> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let mut rows = self
            .conn
            .imported_keys(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await?;
        rows.sort_by_key(|r| r.key_seq);

        let mut grouped: BTreeMap<String, ForeignKeyDefinition> = BTreeMap::new();
        for row in rows {
            let raw_name = row.fk_name.as_deref().unwrap_or("");
            let name = self.quirks.fix_fk_name(raw_name).to_string();
            let target = match &row.pk_schema {
                Some(schema) => format!("{schema}.{}", row.pk_table),
                None => row.pk_table.clone(),
            };
            let entry = grouped
                .entry(name.clone())
                .or_insert_with(|| ForeignKeyDefinition {
                    name,
                    columns: Vec::new(),
                    target_table: target,
                    target_columns: Vec::new(),
                    update_rule: ReferentialRule::from_code(row.update_rule),
                    delete_rule: ReferentialRule::from_code(row.delete_rule),
                });
            entry.columns.push(row.fk_column);
            entry.target_columns.push(row.pk_column);
        }
        Ok(grouped.into_values().collect())
    }

    // ----- source reconstruction -----

    /// Reconstruct the DDL for one object. Tables produce a full CREATE
    /// TABLE script; sequences and synonyms delegate to their readers.
    /// `include_fk` controls whether foreign-key statements are part of the
    /// script (a caller writing one script per table usually wants the FKs
    /// in a separate pass, after all tables exist).
    pub async fn get_table_source(
        &self,
        table: &TableIdentifier,
        include_drop: bool,
        include_fk: bool,
    ) -> Result<String> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);

        match table.object_type {
            ObjectType::Sequence => {
                let source = self
                    .readers
                    .sequences
                    .sequence_source(self.conn.as_ref(), table.schema.as_deref(), &table.name)
                    .await?;
                Ok(source.unwrap_or_default())
            }
            ObjectType::Synonym => {
                let source = self
                    .readers
                    .synonyms
                    .synonym_source(self.conn.as_ref(), table.schema.as_deref(), &table.name)
                    .await?;
                Ok(source.unwrap_or_default())
            }
            _ => self.build_table_ddl(&table, include_drop, include_fk).await,
        }
    }

    async fn build_table_ddl(
        &self,
        table: &TableIdentifier,
        include_drop: bool,
        include_fk: bool,
    ) -> Result<String> {
        let (table, pk_name, columns) = self.table_definition_internal(table).await?;

        let indexes = self.get_table_index_list(&table).await?;
        let foreign_keys = if include_fk {
            match self.get_foreign_key_definitions(&table).await {
                Ok(fks) => fks,
                Err(e) => {
                    warn!(table = %table.name, "foreign key retrieval failed: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let grants = self
            .conn
            .table_privileges(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                &table.name,
            )
            .await
            .unwrap_or_else(|e| {
                debug!(table = %table.name, "grant retrieval failed: {e}");
                Vec::new()
            });

        let column_constraints = self
            .readers
            .constraints
            .column_constraints(self.conn.as_ref(), table.schema.as_deref(), &table.name)
            .await;
        let table_constraint = self
            .readers
            .constraints
            .table_constraints(
                self.conn.as_ref(),
                table.schema.as_deref(),
                &table.name,
                DDL_INDENT,
            )
            .await;

        let remarks = self.table_remarks(&table).await;

        let request = TableDdlRequest {
            table: &table,
            columns: &columns,
            pk_name: pk_name.as_deref(),
            indexes: &indexes,
            foreign_keys: &foreign_keys,
            grants: &grants,
            remarks: remarks.as_deref(),
            column_constraints: &column_constraints,
            table_constraint: table_constraint.as_deref(),
            include_drop,
            include_fk,
        };
        self.synthesizer().table_source(&request)
    }

    async fn table_remarks(&self, table: &TableIdentifier) -> Option<String> {
        let rows = self
            .conn
            .tables(
                table.catalog.as_deref(),
                table.schema.as_deref(),
                Some(&table.name),
                None,
            )
            .await
            .ok()?;
        rows.into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(&table.name))
            .and_then(|r| r.remarks)
            .filter(|r| !r.trim().is_empty())
    }

    /// Source of a view, wrapped into a CREATE VIEW statement. Only
    /// dialects with a registered source query support this.
    pub async fn get_view_source(&self, table: &TableIdentifier) -> Result<String> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let body = self
            .object_source_query(TemplateKey::ViewSourceQuery, &table.name, "view source")
            .await?;
        let expr = table.table_expression(&self.policy);
        Ok(self.synthesizer().create_view_source(&expr, body.trim_end()))
    }

    /// Raw body of a trigger, when the dialect exposes one.
    pub async fn get_trigger_source(&self, name: &str) -> Result<String> {
        self.ensure_open()?;
        let name = self.policy.adjust_object_name_case(name);
        self.object_source_query(TemplateKey::TriggerSourceQuery, &name, "trigger source")
            .await
    }

    async fn object_source_query(
        &self,
        key: TemplateKey,
        name: &str,
        capability: &str,
    ) -> Result<String> {
        let Some(template) = self.templates.get(key, self.dialect_id()) else {
            return Err(MetaError::Unsupported {
                dialect: self.dialect_id().to_string(),
                capability: capability.to_string(),
            });
        };
        let sql = template.apply(&[(placeholder::OBJECT_NAME, name)])?;
        let result = self.conn.query(&sql).await?;
        let mut body = String::new();
        for row in 0..result.row_count() {
            body.push_str(&result.value_as_string(row, 0));
        }
        Ok(body)
    }

    /// Reconstructed CREATE SEQUENCE statement, when the dialect exposes
    /// sequence metadata.
    pub async fn get_sequence_source(
        &self,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<String>> {
        self.ensure_open()?;
        self.readers
            .sequences
            .sequence_source(self.conn.as_ref(), schema, name)
            .await
    }

    /// Base table of a synonym, or None when the name is not a synonym.
    pub async fn get_synonym_table(
        &self,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<TableIdentifier>> {
        self.ensure_open()?;
        self.readers
            .synonyms
            .synonym_target(self.conn.as_ref(), schema, name)
            .await
    }

    pub async fn get_synonym_source(
        &self,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<String>> {
        self.ensure_open()?;
        self.readers
            .synonyms
            .synonym_source(self.conn.as_ref(), schema, name)
            .await
    }

    // ----- procedures -----

    pub async fn get_procedures(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcedureDefinition>> {
        self.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(MetaError::Cancelled);
        }
        let schema = schema.map(|s| self.policy.adjust_schema_name_case(s));
        let procs = self
            .readers
            .procedures
            .procedures(self.conn.as_ref(), catalog, schema.as_deref())
            .await?;
        if cancel.is_cancelled() {
            return Err(MetaError::Cancelled);
        }
        Ok(procs)
    }

    pub async fn get_procedure_source(
        &self,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        self.ensure_open()?;
        self.readers
            .procedures
            .procedure_source(self.conn.as_ref(), def)
            .await
    }

    pub async fn get_procedure_columns(&self, def: &ProcedureDefinition) -> Result<RowSet> {
        self.ensure_open()?;
        self.readers
            .procedures
            .procedure_columns(self.conn.as_ref(), def)
            .await
    }

    /// Compile-error details for a procedural object. Degrades to an empty
    /// string.
    pub async fn get_extended_error_info(
        &self,
        schema: Option<&str>,
        object: &str,
        object_type: &str,
    ) -> String {
        if self.ensure_open().is_err() {
            return String::new();
        }
        match self
            .readers
            .error_info
            .extended_error_info(self.conn.as_ref(), schema, object, object_type)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                debug!(object, "extended error info not available: {e}");
                String::new()
            }
        }
    }

    // ----- mutating operations -----

    /// Drop an object. Unlike retrieval, this surfaces failures: the
    /// statement error is wrapped with operation context and re-thrown
    /// after rolling back an open DDL transaction.
    pub async fn drop_object(&self, table: &TableIdentifier) -> Result<()> {
        self.ensure_open()?;
        let mut table = table.clone();
        table.adjust_case(&self.policy);
        let expr = table.table_expression(&self.policy);
        let type_label = table.object_type.label();

        let mut sql = self.synthesizer().drop_statement(type_label, &expr)?;
        if table.object_type == ObjectType::Table {
            if let Some(cascade) = self.settings.get(self.dialect_id(), "drop.table.cascade") {
                sql.push(' ');
                sql.push_str(cascade);
            }
        }

        let manage_commit =
            self.profile.ddl_needs_commit && !self.conn.auto_commit().await.unwrap_or(true);

        match self.conn.execute(&sql).await {
            Ok(_) => {
                if manage_commit {
                    self.commit_ddl().await?;
                }
                info!(object = %expr, "dropped {type_label}");
                Ok(())
            }
            Err(e) => {
                if manage_commit {
                    if let Err(rb) = self.conn.rollback().await {
                        warn!(object = %expr, "rollback after failed drop also failed: {rb}");
                    }
                }
                Err(MetaError::structural(
                    format!("DROP {type_label}"),
                    expr,
                    e.to_string(),
                ))
            }
        }
    }

    /// Commit an open DDL transaction, either through the driver or by
    /// sending a COMMIT statement, depending on what the dialect prefers.
    async fn commit_ddl(&self) -> Result<()> {
        if self.profile.use_jdbc_commit {
            self.conn.commit().await
        } else {
            self.conn.execute("COMMIT").await.map(|_| ())
        }
    }

    pub async fn drop_table(&self, table: &TableIdentifier) -> Result<()> {
        let table = table.clone().with_type(ObjectType::Table);
        self.drop_object(&table).await
    }
}

fn wants_type(types: Option<&[String]>, label: &str) -> bool {
    match types {
        None => true,
        Some(types) => types.iter().any(|t| t.eq_ignore_ascii_case(label)),
    }
}

fn matches_pattern(name: &str, pattern: Option<&str>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    if pattern.is_empty() || pattern == "%" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('%') {
        if !prefix.contains('%') {
            return name.to_uppercase().starts_with(&prefix.to_uppercase());
        }
    }
    name.eq_ignore_ascii_case(pattern)
}

/// An index backs the primary key when it covers exactly the PK columns.
fn index_covers_exactly(index: &IndexDefinition, pk_columns: &[String]) -> bool {
    if index.columns.len() != pk_columns.len() {
        return false;
    }
    index.columns.iter().zip(pk_columns).all(|(expr, pk)| {
        let column = expr
            .strip_suffix(" ASC")
            .or_else(|| expr.strip_suffix(" DESC"))
            .unwrap_or(expr);
        column.eq_ignore_ascii_case(pk)
    })
}

/// Parse the `indextypes` setting: `code,LABEL;code,LABEL;...`.
fn parse_index_type_map(settings: &DbSettings, dialect_id: &str) -> HashMap<i32, String> {
    let mut map = HashMap::new();
    let Some(raw) = settings.get(dialect_id, "indextypes") else {
        return map;
    };
    for entry in raw.split(';') {
        let mut parts = entry.splitn(2, ',');
        let code = parts.next().map(str::trim).and_then(|c| c.parse().ok());
        let label = parts.next().map(str::trim);
        match (code, label) {
            (Some(code), Some(label)) if !label.is_empty() => {
                map.insert(code, label.to_string());
            }
            _ => warn!(entry, "unparseable index type mapping ignored"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_type_map_parsing() {
        let s = DbSettings::from_pairs([(
            "dbmeta.testdb.indextypes",
            "1,CLUSTERED;2,HASHED;bad;3,NORMAL",
        )]);
        let map = parse_index_type_map(&s, "testdb");
        assert_eq!(map.get(&1).map(String::as_str), Some("CLUSTERED"));
        assert_eq!(map.get(&3).map(String::as_str), Some("NORMAL"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn pattern_matching_for_extra_objects() {
        assert!(matches_pattern("SEQ_ORDERS", Some("SEQ%")));
        assert!(!matches_pattern("ORDERS", Some("SEQ%")));
        assert!(matches_pattern("anything", None));
        assert!(matches_pattern("exact", Some("EXACT")));
    }

    #[test]
    fn pk_index_detection_by_columns() {
        let mut index = IndexDefinition::new("ORDERS_IDX");
        index.columns = vec!["ID ASC".into(), "TENANT".into()];
        assert!(index_covers_exactly(&index, &["id".into(), "tenant".into()]));
        assert!(!index_covers_exactly(&index, &["id".into()]));
    }
}
