//! SQL Server capability readers.

use async_trait::async_trait;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::model::ProcedureDefinition;
use crate::readers::{sql_literal, ConstraintReader, ProcedureReader};

pub struct SqlServerConstraintReader;

#[async_trait]
impl ConstraintReader for SqlServerConstraintReader {
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        let schema = schema.unwrap_or("dbo");
        let sql = format!(
            "SELECT cc.CONSTRAINT_NAME, cc.CHECK_CLAUSE \
             FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc \
               JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                 ON tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME \
                AND tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA \
             WHERE tc.TABLE_NAME = '{}' AND tc.TABLE_SCHEMA = '{}'",
            sql_literal(table),
            sql_literal(schema)
        );
        let result = match conn.query(&sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table, error = %e, "check constraint retrieval failed, skipping");
                return None;
            }
        };
        let mut clauses = Vec::new();
        for row in 0..result.row_count() {
            let name = result.value_as_string(row, 0);
            let condition = result.value_as_string(row, 1);
            if condition.is_empty() {
                continue;
            }
            clauses.push(format!("CONSTRAINT {name} CHECK {condition}"));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(&format!(",\n{indent}")))
        }
    }
}

pub struct SqlServerProcedureReader;

#[async_trait]
impl ProcedureReader for SqlServerProcedureReader {
    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let schema = def.schema.as_deref().unwrap_or("dbo");
        let sql = format!(
            "SELECT m.definition \
             FROM sys.sql_modules m \
               JOIN sys.objects o ON o.object_id = m.object_id \
               JOIN sys.schemas s ON s.schema_id = o.schema_id \
             WHERE o.name = '{}' AND s.name = '{}'",
            sql_literal(&def.name),
            sql_literal(schema)
        );
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let mut source = result.value_as_string(0, 0);
        if source.is_empty() {
            return Ok(None);
        }
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(Some(source))
    }
}
