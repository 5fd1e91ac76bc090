//! Oracle capability readers.
//!
//! All of these go through the `ALL_*` data dictionary views, so they see
//! exactly what the connected user is allowed to see.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::model::{
    IndexDefinition, ProcedureDefinition, ProcedureResultType, TableIdentifier,
};
use crate::readers::{
    sql_literal, ConstraintReader, ErrorInfoReader, IndexReader, ProcedureReader,
    SequenceReader, SynonymReader,
};

pub struct OracleConstraintReader;

#[async_trait]
impl ConstraintReader for OracleConstraintReader {
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        let mut sql = format!(
            "SELECT constraint_name, search_condition \
             FROM all_constraints \
             WHERE table_name = '{}' AND constraint_type = 'C'",
            sql_literal(table)
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        let result = match conn.query(&sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table, error = %e, "check constraint retrieval failed, skipping");
                return None;
            }
        };
        let mut clauses = Vec::new();
        for row in 0..result.row_count() {
            let condition = result.value_as_string(row, 1);
            // NOT NULL columns surface as generated check constraints;
            // they are already part of the column definitions
            if condition.is_empty() || condition.to_uppercase().ends_with("IS NOT NULL") {
                continue;
            }
            let name = result.value_as_string(row, 0);
            if name.starts_with("SYS_") {
                clauses.push(format!("CHECK ({condition})"));
            } else {
                clauses.push(format!("CONSTRAINT {name} CHECK ({condition})"));
            }
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(&format!(",\n{indent}")))
        }
    }
}

pub struct OracleIndexReader;

#[async_trait]
impl IndexReader for OracleIndexReader {
    /// Replace the generic type labels with the real Oracle index types
    /// (NORMAL, BITMAP, FUNCTION-BASED NORMAL, ...).
    async fn enrich_index_list(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indexes: &mut [IndexDefinition],
    ) -> Result<()> {
        if indexes.is_empty() {
            return Ok(());
        }
        let mut sql = format!(
            "SELECT index_name, index_type FROM all_indexes WHERE table_name = '{}'",
            sql_literal(table)
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        let result = match conn.query(&sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table, error = %e, "index type retrieval failed, keeping generic types");
                return Ok(());
            }
        };
        let mut types = HashMap::new();
        for row in 0..result.row_count() {
            types.insert(
                result.value_as_string(row, 0),
                result.value_as_string(row, 1),
            );
        }
        for index in indexes.iter_mut() {
            if let Some(t) = types.get(&index.name) {
                index.index_type = t.clone();
            }
        }
        Ok(())
    }
}

pub struct OracleProcedureReader;

#[async_trait]
impl ProcedureReader for OracleProcedureReader {
    /// Standalone procedures and functions plus one entry per package.
    async fn procedures(
        &self,
        conn: &dyn ConnectionContext,
        _catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>> {
        let mut sql = String::from(
            "SELECT DISTINCT object_name, object_type FROM all_objects \
             WHERE object_type IN ('PROCEDURE', 'FUNCTION', 'PACKAGE')",
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        sql.push_str(" ORDER BY object_name");
        let result = conn.query(&sql).await?;
        let mut procs = Vec::new();
        for row in 0..result.row_count() {
            let name = result.value_as_string(row, 0);
            let object_type = result.value_as_string(row, 1);
            let mut def = ProcedureDefinition::new(name);
            def.schema = schema.map(str::to_string);
            def.result_type = match object_type.as_str() {
                "FUNCTION" => ProcedureResultType::Function,
                "PACKAGE" => ProcedureResultType::PackageMember,
                _ => ProcedureResultType::Procedure,
            };
            def.is_package = object_type == "PACKAGE";
            procs.push(def);
        }
        Ok(procs)
    }

    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let source_type = if def.is_package {
            "PACKAGE"
        } else {
            match def.result_type {
                ProcedureResultType::Function => "FUNCTION",
                _ => "PROCEDURE",
            }
        };
        let mut sql = format!(
            "SELECT text FROM all_source WHERE name = '{}' AND type = '{}'",
            sql_literal(&def.name),
            source_type
        );
        if let Some(schema) = &def.schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        sql.push_str(" ORDER BY line");
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let mut source = String::from("CREATE OR REPLACE ");
        for row in 0..result.row_count() {
            source.push_str(&result.value_as_string(row, 0));
        }
        if !source.ends_with('\n') {
            source.push('\n');
        }
        source.push_str("/\n");
        Ok(Some(source))
    }
}

pub struct OracleSequenceReader;

#[async_trait]
impl SequenceReader for OracleSequenceReader {
    async fn sequence_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut sql = String::from("SELECT sequence_name FROM all_sequences");
        if let Some(schema) = schema {
            sql.push_str(&format!(
                " WHERE sequence_owner = '{}'",
                sql_literal(schema)
            ));
        }
        sql.push_str(" ORDER BY sequence_name");
        let result = conn.query(&sql).await?;
        Ok((0..result.row_count())
            .map(|row| result.value_as_string(row, 0))
            .collect())
    }

    async fn sequence_source(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<String>> {
        let mut sql = format!(
            "SELECT min_value, max_value, increment_by, cache_size, cycle_flag \
             FROM all_sequences WHERE sequence_name = '{}'",
            sql_literal(name)
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND sequence_owner = '{}'", sql_literal(schema)));
        }
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let mut source = format!("CREATE SEQUENCE {name}\n");
        source.push_str(&format!("   MINVALUE {}\n", result.value_as_string(0, 0)));
        source.push_str(&format!("   MAXVALUE {}\n", result.value_as_string(0, 1)));
        source.push_str(&format!(
            "   INCREMENT BY {}\n",
            result.value_as_string(0, 2)
        ));
        let cache = result.value_as_string(0, 3);
        if cache != "0" && !cache.is_empty() {
            source.push_str(&format!("   CACHE {cache}\n"));
        } else {
            source.push_str("   NOCACHE\n");
        }
        if result.value_as_string(0, 4) == "Y" {
            source.push_str("   CYCLE");
        } else {
            source.push_str("   NOCYCLE");
        }
        source.push_str(";\n");
        Ok(Some(source))
    }
}

pub struct OracleSynonymReader;

#[async_trait]
impl SynonymReader for OracleSynonymReader {
    async fn synonym_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut sql = String::from("SELECT synonym_name FROM all_synonyms");
        if let Some(schema) = schema {
            sql.push_str(&format!(" WHERE owner = '{}'", sql_literal(schema)));
        }
        sql.push_str(" ORDER BY synonym_name");
        let result = conn.query(&sql).await?;
        Ok((0..result.row_count())
            .map(|row| result.value_as_string(row, 0))
            .collect())
    }

    async fn synonym_target(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<TableIdentifier>> {
        let mut sql = format!(
            "SELECT table_owner, table_name FROM all_synonyms WHERE synonym_name = '{}'",
            sql_literal(name)
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let owner = result.value_as_string(0, 0);
        let table = result.value_as_string(0, 1);
        let mut target = TableIdentifier::new(table).with_preserved_case();
        if !owner.is_empty() {
            target.schema = Some(owner);
        }
        Ok(Some(target))
    }
}

pub struct OracleErrorInfoReader;

#[async_trait]
impl ErrorInfoReader for OracleErrorInfoReader {
    /// Compile errors from ALL_ERRORS, formatted one per line.
    async fn extended_error_info(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        object: &str,
        object_type: &str,
    ) -> Result<String> {
        let mut sql = format!(
            "SELECT line, position, text FROM all_errors \
             WHERE name = '{}' AND type = '{}'",
            sql_literal(object),
            sql_literal(object_type)
        );
        if let Some(schema) = schema {
            sql.push_str(&format!(" AND owner = '{}'", sql_literal(schema)));
        }
        sql.push_str(" ORDER BY line, position");
        let result = conn.query(&sql).await?;
        let mut info = String::new();
        for row in 0..result.row_count() {
            info.push_str(&format!(
                "Error at line {}, position {}: {}\n",
                result.value_as_string(row, 0),
                result.value_as_string(row, 1),
                result.value_as_string(row, 2).trim_end()
            ));
        }
        Ok(info)
    }
}
