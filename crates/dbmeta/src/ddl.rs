//! DDL script synthesis from retrieved metadata.
//!
//! The synthesizer is purely computational: every piece of metadata it needs
//! (columns, keys, indexes, grants) is fetched up front by the facade and
//! handed in as plain data. Output formatting is driven by the dialect
//! profile, the template store and the settings snapshot.

use std::collections::HashMap;

use crate::connection::RawGrantRow;
use crate::dialect::{DialectFamily, DialectProfile};
use crate::error::{MetaError, Result};
use crate::identifier::IdentifierPolicy;
use crate::model::{
    ColumnIdentifier, ForeignKeyDefinition, IndexDefinition, ReferentialRule, TableIdentifier,
};
use crate::settings::DbSettings;
use crate::templates::{placeholder, SqlTemplateStore, TemplateKey};

const COLUMN_INDENT: &str = "   ";

/// Everything needed to reconstruct one table's DDL.
pub struct TableDdlRequest<'a> {
    pub table: &'a TableIdentifier,
    pub columns: &'a [ColumnIdentifier],
    /// Name of the primary-key constraint, when the driver reports one.
    pub pk_name: Option<&'a str>,
    pub indexes: &'a [IndexDefinition],
    pub foreign_keys: &'a [ForeignKeyDefinition],
    pub grants: &'a [RawGrantRow],
    pub remarks: Option<&'a str>,
    /// Per-column check constraints, keyed by column name.
    pub column_constraints: &'a HashMap<String, String>,
    /// Pre-formatted table-level constraint block.
    pub table_constraint: Option<&'a str>,
    pub include_drop: bool,
    pub include_fk: bool,
}

/// Builds DDL scripts in the connected dialect.
pub struct DdlSynthesizer<'a> {
    profile: &'a DialectProfile,
    policy: &'a IdentifierPolicy,
    templates: &'a SqlTemplateStore,
    settings: &'a DbSettings,
}

impl<'a> DdlSynthesizer<'a> {
    pub fn new(
        profile: &'a DialectProfile,
        policy: &'a IdentifierPolicy,
        templates: &'a SqlTemplateStore,
        settings: &'a DbSettings,
    ) -> Self {
        Self {
            profile,
            policy,
            templates,
            settings,
        }
    }

    fn dialect_id(&self) -> &str {
        &self.profile.dialect_id
    }

    fn template(&self, key: TemplateKey) -> Result<&crate::templates::SqlTemplate> {
        self.templates
            .get(key, self.dialect_id())
            .ok_or_else(|| MetaError::config(format!("no template registered for {key:?}")))
    }

    /// Full CREATE TABLE script: optional DROP, the table body, separate
    /// key/index statements (unless the dialect wants them inline), comments
    /// and grants, and a COMMIT trailer when the dialect needs one.
    pub fn table_source(&self, request: &TableDdlRequest<'_>) -> Result<String> {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let expr = request.table.table_expression(self.policy);

        let mut out = String::new();
        if request.include_drop {
            out.push_str(&self.drop_statement("TABLE", &expr)?);
            out.push_str(&delim);
            out.push_str(le);
            out.push_str(le);
        }

        out.push_str(&format!("CREATE TABLE {expr}{le}({le}"));

        let quoted_names: Vec<String> = request
            .columns
            .iter()
            .map(|c| self.policy.quote_object_name(&c.name, false))
            .collect();
        let max_name = quoted_names.iter().map(String::len).max().unwrap_or(0);
        let max_type = request
            .columns
            .iter()
            .map(|c| c.display_type.len())
            .max()
            .unwrap_or(0);

        let mut body: Vec<String> = Vec::new();
        for (column, quoted) in request.columns.iter().zip(&quoted_names) {
            body.push(self.column_line(column, quoted, max_name, max_type + 1, request));
        }

        let pk_columns: Vec<String> = request
            .columns
            .iter()
            .filter(|c| c.is_pk)
            .map(|c| self.policy.quote_object_name(&c.name, false))
            .collect();

        if self.profile.create_inline_constraints {
            if !pk_columns.is_empty() {
                body.push(format!("PRIMARY KEY ({})", pk_columns.join(", ")));
            }
            if request.include_fk {
                for fk in request.foreign_keys {
                    body.push(self.inline_fk_clause(fk)?);
                }
            }
        }
        if let Some(constraint) = request.table_constraint {
            body.push(constraint.to_string());
        }

        let separator = format!(",{le}{COLUMN_INDENT}");
        out.push_str(COLUMN_INDENT);
        out.push_str(&body.join(&separator));
        out.push_str(le);
        out.push_str(&format!("){delim}{le}"));

        if !self.profile.create_inline_constraints {
            if !pk_columns.is_empty() {
                let pk = self.pk_source(&expr, &pk_columns, request.pk_name)?;
                out.push_str(le);
                out.push_str(&pk);
            }
            let idx = self.index_source(&expr, request.indexes)?;
            if !idx.is_empty() {
                out.push_str(le);
                out.push_str(&idx);
            }
            if request.include_fk {
                let fks = self.fk_source(&expr, request.foreign_keys)?;
                if !fks.is_empty() {
                    out.push_str(le);
                    out.push_str(&fks);
                }
            }
        }

        let comments = self.comment_source(&expr, request);
        if !comments.is_empty() {
            out.push_str(le);
            out.push_str(&comments);
        }

        let grants = self.grant_source(&expr, request.grants);
        if !grants.is_empty() {
            out.push_str(le);
            out.push_str(&grants);
        }

        if self.profile.ddl_needs_commit {
            out.push_str(le);
            out.push_str(&format!("COMMIT{delim}{le}"));
        }
        Ok(out)
    }

    fn column_line(
        &self,
        column: &ColumnIdentifier,
        quoted_name: &str,
        name_width: usize,
        type_width: usize,
        request: &TableDdlRequest<'_>,
    ) -> String {
        let mut line = format!("{quoted_name:<name_width$} ");

        let mut type_part = column.display_type.clone();
        let default_before_null =
            self.settings
                .get_bool(self.dialect_id(), "ddl.default_before_null", true);

        let default_clause = column
            .default_value
            .as_deref()
            .map(|d| format!("DEFAULT {}", d.trim()));
        let null_clause = if column.nullable {
            if self.profile.use_null_keyword {
                Some("NULL".to_string())
            } else {
                None
            }
        } else {
            Some("NOT NULL".to_string())
        };

        let mut tail: Vec<String> = Vec::new();
        match (default_before_null, default_clause, null_clause) {
            (true, Some(d), n) => {
                tail.push(d);
                tail.extend(n);
            }
            (false, d, n) => {
                tail.extend(n);
                tail.extend(d);
            }
            (true, None, n) => tail.extend(n),
        }
        if let Some(check) = request.column_constraints.get(&column.name) {
            tail.push(check.clone());
        }

        if tail.is_empty() {
            line.push_str(type_part.trim_end());
        } else {
            type_part = format!("{type_part:<type_width$}");
            line.push_str(&type_part);
            line.push_str(&tail.join(" "));
        }
        line
    }

    /// ALTER TABLE statement adding the primary key. A missing or
    /// system-generated constraint name selects the unnamed template.
    pub fn pk_source(
        &self,
        table_expr: &str,
        pk_columns: &[String],
        pk_name: Option<&str>,
    ) -> Result<String> {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let column_list = pk_columns.join(", ");

        let name = pk_name
            .map(str::trim)
            .filter(|n| !n.is_empty() && !self.is_system_constraint_name(n));

        let sql = match name {
            Some(name) => self.template(TemplateKey::PrimaryKey)?.apply(&[
                (placeholder::TABLE_NAME, table_expr),
                (placeholder::PK_NAME, name),
                (placeholder::COLUMN_LIST, &column_list),
            ])?,
            None => self.template(TemplateKey::PrimaryKeyUnnamed)?.apply(&[
                (placeholder::TABLE_NAME, table_expr),
                (placeholder::COLUMN_LIST, &column_list),
            ])?,
        };
        Ok(format!("{sql}{delim}{le}"))
    }

    /// ALTER TABLE statements adding the foreign keys, one per constraint.
    pub fn fk_source(&self, table_expr: &str, fks: &[ForeignKeyDefinition]) -> Result<String> {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let mut out = String::new();
        for fk in fks {
            let sql = self.single_fk(table_expr, fk, false)?;
            out.push_str(&sql);
            out.push_str(&delim);
            out.push_str(le);
        }
        Ok(out)
    }

    fn inline_fk_clause(&self, fk: &ForeignKeyDefinition) -> Result<String> {
        self.single_fk("", fk, true)
    }

    fn single_fk(
        &self,
        table_expr: &str,
        fk: &ForeignKeyDefinition,
        inline: bool,
    ) -> Result<String> {
        let column_list = self.quoted_list(&fk.columns);
        let target_list = self.quoted_list(&fk.target_columns);
        let target_expr = TableIdentifier::parse(&fk.target_table)
            .with_preserved_case()
            .table_expression(self.policy);

        let update_clause = self.rule_clause("ON UPDATE", fk.update_rule, true);
        let delete_clause = self.rule_clause("ON DELETE", fk.delete_rule, false);

        let named = !fk.name.is_empty() && !self.is_system_constraint_name(&fk.name);
        let key = if inline {
            TemplateKey::ForeignKeyInline
        } else if named {
            TemplateKey::ForeignKey
        } else {
            TemplateKey::ForeignKeyUnnamed
        };
        let template = self.template(key)?;

        let mut values: Vec<(&str, &str)> = vec![
            (placeholder::COLUMN_LIST, &column_list),
            (placeholder::TARGET_TABLE, &target_expr),
            (placeholder::TARGET_COLUMN_LIST, &target_list),
            (placeholder::FK_UPDATE_RULE, &update_clause),
            (placeholder::FK_DELETE_RULE, &delete_clause),
        ];
        if !inline {
            values.push((placeholder::TABLE_NAME, table_expr));
        }
        if named || inline {
            values.push((placeholder::CONSTRAINT_NAME, &fk.name));
        }
        template.apply(&values)
    }

    fn quoted_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.policy.quote_object_name(n, false))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Clause text for one referential rule, or empty when the dialect
    /// cannot express it. NO ACTION is the implicit default everywhere and
    /// is never emitted; Oracle additionally has no ON UPDATE clause and no
    /// ON DELETE RESTRICT.
    fn rule_clause(&self, keyword: &str, rule: ReferentialRule, is_update: bool) -> String {
        if rule == ReferentialRule::NoAction {
            return String::new();
        }
        if self.profile.family == DialectFamily::Oracle
            && (is_update || rule == ReferentialRule::Restrict)
        {
            return String::new();
        }
        format!(" {keyword} {}", self.rule_display(rule))
    }

    /// Display text for a rule, honoring per-dialect settings overrides.
    pub fn rule_display(&self, rule: ReferentialRule) -> String {
        self.settings
            .get(self.dialect_id(), rule.settings_key())
            .map(str::to_string)
            .unwrap_or_else(|| rule.display().to_string())
    }

    /// CREATE INDEX statements for the non-PK indexes.
    pub fn index_source(&self, table_expr: &str, indexes: &[IndexDefinition]) -> Result<String> {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let template = self.template(TemplateKey::CreateIndex)?;
        let mut out = String::new();
        for index in indexes {
            if index.is_pk_index {
                continue;
            }
            let name = self.policy.quote_object_name(&index.name, false);
            let unique = if index.unique { "UNIQUE " } else { "" };
            let columns = index.expression();
            let sql = template.apply(&[
                (placeholder::INDEX_NAME, &name),
                (placeholder::TABLE_NAME, table_expr),
                (placeholder::COLUMN_LIST, &columns),
                (placeholder::UNIQUE, unique),
            ])?;
            out.push_str(&sql);
            out.push_str(&delim);
            out.push_str(le);
        }
        Ok(out)
    }

    /// COMMENT ON statements for the table and its columns.
    fn comment_source(&self, table_expr: &str, request: &TableDdlRequest<'_>) -> String {
        if !self
            .settings
            .get_bool(self.dialect_id(), "ddl.include_comments", true)
        {
            return String::new();
        }
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let mut out = String::new();
        if let Some(remarks) = request.remarks.map(str::trim).filter(|r| !r.is_empty()) {
            out.push_str(&format!(
                "COMMENT ON TABLE {table_expr} IS '{}'{delim}{le}",
                remarks.replace('\'', "''")
            ));
        }
        for column in request.columns {
            let Some(remarks) = column.remarks.as_deref().map(str::trim) else {
                continue;
            };
            if remarks.is_empty() {
                continue;
            }
            let name = self.policy.quote_object_name(&column.name, false);
            out.push_str(&format!(
                "COMMENT ON COLUMN {table_expr}.{name} IS '{}'{delim}{le}",
                remarks.replace('\'', "''")
            ));
        }
        out
    }

    /// GRANT statements mirroring the reported privileges.
    pub fn grant_source(&self, table_expr: &str, grants: &[RawGrantRow]) -> String {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        let mut out = String::new();
        for grant in grants {
            out.push_str(&format!(
                "GRANT {} ON {table_expr} TO {}",
                grant.privilege, grant.grantee
            ));
            if grant.grantable {
                out.push_str(" WITH GRANT OPTION");
            }
            out.push_str(&delim);
            out.push_str(le);
        }
        out
    }

    /// Wrap a retrieved view query into a CREATE VIEW statement.
    pub fn create_view_source(&self, view_expr: &str, query: &str) -> String {
        let le = self.settings.line_ending(self.dialect_id());
        let delim = self.settings.statement_delimiter(self.dialect_id());
        format!("CREATE VIEW {view_expr}{le}AS{le}{query}{delim}{le}")
    }

    /// DROP statement for any object type, without the delimiter.
    pub fn drop_statement(&self, object_type: &str, object_expr: &str) -> Result<String> {
        self.template(TemplateKey::DropObject)?.apply(&[
            (placeholder::OBJECT_TYPE, object_type),
            (placeholder::OBJECT_NAME, object_expr),
        ])
    }

    /// Is this a system-generated constraint name that should not be
    /// reproduced in generated DDL?
    fn is_system_constraint_name(&self, name: &str) -> bool {
        if let Some(re) = self
            .settings
            .get_regex(self.dialect_id(), "systemconstraintname")
        {
            return re.is_match(name);
        }
        self.profile.family == DialectFamily::Oracle && name.starts_with("SYS_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::CaseFolding;

    fn profile(family: DialectFamily) -> DialectProfile {
        DialectProfile {
            family,
            dialect_id: "testdb".into(),
            product_name: "TestDB".into(),
            product_version: "1.0".into(),
            schema_term: "Schema".into(),
            catalog_term: "Catalog".into(),
            quote_char: "\"".into(),
            ddl_needs_commit: false,
            use_jdbc_commit: false,
            create_inline_constraints: false,
            use_null_keyword: true,
            supports_catalogs: false,
            supports_get_primary_keys: true,
            quote_digit_identifiers: false,
            never_quote: false,
            object_case: CaseFolding::Upper,
            schema_case: CaseFolding::Upper,
        }
    }

    fn column(name: &str, display_type: &str, nullable: bool, is_pk: bool) -> ColumnIdentifier {
        ColumnIdentifier {
            name: name.into(),
            display_type: display_type.into(),
            type_code: 12,
            size: 0,
            digits: 0,
            nullable,
            default_value: None,
            remarks: None,
            is_pk,
            position: 0,
            dbms_extra: None,
        }
    }

    fn synthesize(
        profile: &DialectProfile,
        settings: &DbSettings,
        request: &TableDdlRequest<'_>,
    ) -> String {
        let policy = IdentifierPolicy::new(profile, Default::default());
        let templates = SqlTemplateStore::with_builtins(settings, &profile.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(profile, &policy, &templates, settings);
        synth.table_source(request).unwrap()
    }

    fn basic_request<'a>(
        table: &'a TableIdentifier,
        columns: &'a [ColumnIdentifier],
        constraints: &'a HashMap<String, String>,
    ) -> TableDdlRequest<'a> {
        TableDdlRequest {
            table,
            columns,
            pk_name: Some("PK_ORDERS"),
            indexes: &[],
            foreign_keys: &[],
            grants: &[],
            remarks: None,
            column_constraints: constraints,
            table_constraint: None,
            include_drop: false,
            include_fk: true,
        }
    }

    #[test]
    fn columns_are_aligned() {
        let profile = profile(DialectFamily::Generic);
        let table = TableIdentifier::new("ORDERS").with_preserved_case();
        let columns = vec![
            column("ID", "INTEGER", false, true),
            column("DESCRIPTION", "VARCHAR(200)", true, false),
        ];
        let constraints = HashMap::new();
        let out = synthesize(&profile, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));

        let id_line = out.lines().find(|l| l.contains("INTEGER")).unwrap();
        let desc_line = out.lines().find(|l| l.contains("VARCHAR")).unwrap();
        assert_eq!(
            id_line.find("INTEGER").unwrap(),
            desc_line.find("VARCHAR").unwrap(),
            "type columns must start at the same offset"
        );
        // non-final body lines keep the separator comma
        assert!(id_line.trim_end().trim_end_matches(',').ends_with("NOT NULL"));
        assert!(desc_line.trim_end().trim_end_matches(',').ends_with("NULL"));
    }

    #[test]
    fn separate_pk_statement_uses_reported_name() {
        let profile = profile(DialectFamily::Generic);
        let table = TableIdentifier::new("ORDERS").with_preserved_case();
        let columns = vec![column("ID", "INTEGER", false, true)];
        let constraints = HashMap::new();
        let out = synthesize(&profile, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));
        assert!(out.contains("ALTER TABLE ORDERS ADD CONSTRAINT PK_ORDERS PRIMARY KEY (ID)"));
    }

    #[test]
    fn inline_constraints_move_pk_into_body() {
        let mut profile = profile(DialectFamily::Generic);
        profile.create_inline_constraints = true;
        let table = TableIdentifier::new("ORDERS").with_preserved_case();
        let columns = vec![column("ID", "INTEGER", false, true)];
        let constraints = HashMap::new();
        let out = synthesize(&profile, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));
        assert!(out.contains(",\n   PRIMARY KEY (ID)"));
        assert!(!out.contains("ALTER TABLE"));
    }

    #[test]
    fn commit_trailer_only_when_dialect_needs_it() {
        let table = TableIdentifier::new("ORDERS").with_preserved_case();
        let columns = vec![column("ID", "INTEGER", false, false)];
        let constraints = HashMap::new();

        let plain = profile(DialectFamily::Generic);
        let out = synthesize(&plain, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));
        assert!(!out.contains("COMMIT;"));

        let mut committing = profile(DialectFamily::Db2);
        committing.ddl_needs_commit = true;
        let out = synthesize(&committing, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));
        assert!(out.ends_with("COMMIT;\n"));
    }

    #[test]
    fn oracle_omits_on_delete_restrict() {
        let oracle = profile(DialectFamily::Oracle);
        let policy = IdentifierPolicy::new(&oracle, Default::default());
        let settings = DbSettings::empty();
        let templates = SqlTemplateStore::with_builtins(&settings, &oracle.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(&oracle, &policy, &templates, &settings);

        let fk = ForeignKeyDefinition {
            name: "FK_ORDERS_CUST".into(),
            columns: vec!["CUST_ID".into()],
            target_table: "CUSTOMER".into(),
            target_columns: vec!["ID".into()],
            update_rule: ReferentialRule::Cascade,
            delete_rule: ReferentialRule::Restrict,
        };
        let out = synth.fk_source("ORDERS", std::slice::from_ref(&fk)).unwrap();
        assert!(!out.contains("ON UPDATE"));
        assert!(!out.contains("RESTRICT"));

        let generic = profile(DialectFamily::Generic);
        let policy = IdentifierPolicy::new(&generic, Default::default());
        let templates = SqlTemplateStore::with_builtins(&settings, &generic.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(&generic, &policy, &templates, &settings);
        let out = synth.fk_source("ORDERS", std::slice::from_ref(&fk)).unwrap();
        assert!(out.contains("ON UPDATE CASCADE"));
        assert!(out.contains("ON DELETE RESTRICT"));
    }

    #[test]
    fn system_generated_fk_name_uses_unnamed_template() {
        let oracle = profile(DialectFamily::Oracle);
        let policy = IdentifierPolicy::new(&oracle, Default::default());
        let settings = DbSettings::empty();
        let templates = SqlTemplateStore::with_builtins(&settings, &oracle.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(&oracle, &policy, &templates, &settings);

        let fk = ForeignKeyDefinition {
            name: "SYS_C004321".into(),
            columns: vec!["CUST_ID".into()],
            target_table: "CUSTOMER".into(),
            target_columns: vec!["ID".into()],
            update_rule: ReferentialRule::NoAction,
            delete_rule: ReferentialRule::NoAction,
        };
        let out = synth.fk_source("ORDERS", &[fk]).unwrap();
        assert!(out.contains("ADD FOREIGN KEY"));
        assert!(!out.contains("SYS_C004321"));
    }

    #[test]
    fn rule_display_settings_override() {
        let profile = profile(DialectFamily::Generic);
        let policy = IdentifierPolicy::new(&profile, Default::default());
        let settings =
            DbSettings::from_pairs([("dbmeta.testdb.fkrule.setnull", "SET NULL NOCHECK")]);
        let templates = SqlTemplateStore::with_builtins(&settings, &profile.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(&profile, &policy, &templates, &settings);
        assert_eq!(synth.rule_display(ReferentialRule::SetNull), "SET NULL NOCHECK");
        assert_eq!(synth.rule_display(ReferentialRule::Cascade), "CASCADE");
    }

    #[test]
    fn default_value_position_is_configurable() {
        let profile = profile(DialectFamily::Generic);
        let table = TableIdentifier::new("T").with_preserved_case();
        let mut col = column("STATUS", "VARCHAR(10)", false, false);
        col.default_value = Some("'NEW'".into());
        let columns = vec![col];
        let constraints = HashMap::new();

        let out = synthesize(&profile, &DbSettings::empty(), &basic_request(&table, &columns, &constraints));
        assert!(out.contains("DEFAULT 'NEW' NOT NULL"));

        let settings =
            DbSettings::from_pairs([("dbmeta.testdb.ddl.default_before_null", "false")]);
        let out = synthesize(&profile, &settings, &basic_request(&table, &columns, &constraints));
        assert!(out.contains("NOT NULL DEFAULT 'NEW'"));
    }

    #[test]
    fn index_source_skips_pk_index() {
        let profile = profile(DialectFamily::Generic);
        let policy = IdentifierPolicy::new(&profile, Default::default());
        let settings = DbSettings::empty();
        let templates = SqlTemplateStore::with_builtins(&settings, &profile.dialect_id).unwrap();
        let synth = DdlSynthesizer::new(&profile, &policy, &templates, &settings);

        let pk_index = IndexDefinition {
            name: "PK_T".into(),
            unique: true,
            is_pk_index: true,
            columns: vec!["ID".into()],
            index_type: "NORMAL".into(),
        };
        let mut plain = IndexDefinition::new("IDX_NAME");
        plain.unique = true;
        plain.columns = vec!["NAME ASC".into()];

        let out = synth.index_source("T", &[pk_index, plain]).unwrap();
        assert_eq!(out, "CREATE UNIQUE INDEX IDX_NAME ON T (NAME ASC);\n");
    }
}
