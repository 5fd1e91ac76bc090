//! Firebird capability readers, built on the RDB$ system tables.

use async_trait::async_trait;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::model::ProcedureDefinition;
use crate::readers::{sql_literal, ConstraintReader, ProcedureReader};

pub struct FirebirdConstraintReader;

#[async_trait]
impl ConstraintReader for FirebirdConstraintReader {
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        _schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        // the check source lives in the trigger that implements it
        let sql = format!(
            "SELECT rc.RDB$CONSTRAINT_NAME, trg.RDB$TRIGGER_SOURCE \
             FROM RDB$RELATION_CONSTRAINTS rc \
               JOIN RDB$CHECK_CONSTRAINTS cc \
                 ON cc.RDB$CONSTRAINT_NAME = rc.RDB$CONSTRAINT_NAME \
               JOIN RDB$TRIGGERS trg ON trg.RDB$TRIGGER_NAME = cc.RDB$TRIGGER_NAME \
             WHERE rc.RDB$CONSTRAINT_TYPE = 'CHECK' \
               AND rc.RDB$RELATION_NAME = '{}' \
               AND trg.RDB$TRIGGER_TYPE = 1",
            sql_literal(table)
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
            let name = result.value_as_string(row, 0).trim().to_string();
            let condition = result.value_as_string(row, 1).trim().to_string();
            if condition.is_empty() {
                continue;
            }
            // system-generated names start with the INTEG_ prefix
            if name.starts_with("INTEG_") {
                clauses.push(condition);
            } else {
                clauses.push(format!("CONSTRAINT {name} {condition}"));
            }
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(&format!(",\n{indent}")))
        }
    }
}

pub struct FirebirdProcedureReader;

#[async_trait]
impl ProcedureReader for FirebirdProcedureReader {
    async fn procedures(
        &self,
        conn: &dyn ConnectionContext,
        _catalog: Option<&str>,
        _schema: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>> {
        let sql = "SELECT RDB$PROCEDURE_NAME FROM RDB$PROCEDURES \
                   WHERE RDB$SYSTEM_FLAG = 0 OR RDB$SYSTEM_FLAG IS NULL \
                   ORDER BY RDB$PROCEDURE_NAME";
        let result = conn.query(sql).await?;
        Ok((0..result.row_count())
            .map(|row| ProcedureDefinition::new(result.value_as_string(row, 0).trim()))
            .collect())
    }

    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SELECT RDB$PROCEDURE_SOURCE FROM RDB$PROCEDURES \
             WHERE RDB$PROCEDURE_NAME = '{}'",
            sql_literal(&def.name)
        );
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let body = result.value_as_string(0, 0);
        if body.is_empty() {
            return Ok(None);
        }
        let mut source = format!("CREATE PROCEDURE {}\nAS\n", def.name);
        source.push_str(&body);
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(Some(source))
    }
}
