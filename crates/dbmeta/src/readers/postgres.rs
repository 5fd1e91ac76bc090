//! PostgreSQL capability readers.
//!
//! A failed catalog query poisons the surrounding transaction, so every
//! degradable query here runs inside a savepoint and rolls back to it on
//! error; subsequent metadata calls on the same connection keep working.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::model::{IndexDefinition, ProcedureDefinition, ProcedureResultType};
use crate::readers::{
    sql_literal, ConstraintReader, IndexReader, ProcedureReader, SequenceReader,
};
use crate::rowset::RowSet;

const SAVEPOINT: &str = "dbmeta_probe";

/// Run one degradable query inside a savepoint. On failure the transaction
/// is restored and the error is handed back for the caller to log.
async fn guarded_query(conn: &dyn ConnectionContext, sql: &str) -> Result<RowSet> {
    let guard = conn.savepoint(SAVEPOINT).await.is_ok();
    match conn.query(sql).await {
        Ok(rs) => {
            if guard {
                let _ = conn.release_savepoint(SAVEPOINT).await;
            }
            Ok(rs)
        }
        Err(e) => {
            if guard {
                if let Err(rb) = conn.rollback_to_savepoint(SAVEPOINT).await {
                    warn!(error = %rb, "savepoint rollback failed after catalog query error");
                }
            }
            Err(e)
        }
    }
}

pub struct PostgresConstraintReader;

#[async_trait]
impl ConstraintReader for PostgresConstraintReader {
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        let schema = schema.unwrap_or("public");
        let sql = format!(
            "SELECT con.conname, pg_get_constraintdef(con.oid) \
             FROM pg_constraint con \
               JOIN pg_class rel ON rel.oid = con.conrelid \
               JOIN pg_namespace ns ON ns.oid = rel.relnamespace \
             WHERE con.contype = 'c' \
               AND rel.relname = '{}' \
               AND ns.nspname = '{}'",
            sql_literal(table),
            sql_literal(schema)
        );
        let result = match guarded_query(conn, &sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table, error = %e, "check constraint retrieval failed, skipping");
                return None;
            }
        };
        let mut clauses = Vec::new();
        for row in 0..result.row_count() {
            let name = result.value_as_string(row, 0);
            let definition = result.value_as_string(row, 1);
            if definition.is_empty() {
                continue;
            }
            clauses.push(format!("CONSTRAINT {name} {definition}"));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(&format!(",\n{indent}")))
        }
    }
}

pub struct PostgresIndexReader;

#[async_trait]
impl IndexReader for PostgresIndexReader {
    /// Resolve the access method (btree, hash, gin, ...) for each index.
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
        let schema = schema.unwrap_or("public");
        let sql = format!(
            "SELECT i.relname, am.amname \
             FROM pg_index x \
               JOIN pg_class i ON i.oid = x.indexrelid \
               JOIN pg_class t ON t.oid = x.indrelid \
               JOIN pg_namespace ns ON ns.oid = t.relnamespace \
               JOIN pg_am am ON am.oid = i.relam \
             WHERE t.relname = '{}' AND ns.nspname = '{}'",
            sql_literal(table),
            sql_literal(schema)
        );
        let result = match guarded_query(conn, &sql).await {
            Ok(rs) => rs,
            Err(e) => {
                debug!(table, error = %e, "index access method retrieval failed");
                return Ok(());
            }
        };
        for index in indexes.iter_mut() {
            for row in 0..result.row_count() {
                if result.value_as_string(row, 0) == index.name {
                    index.index_type = result.value_as_string(row, 1);
                }
            }
        }
        Ok(())
    }
}

pub struct PostgresProcedureReader;

#[async_trait]
impl ProcedureReader for PostgresProcedureReader {
    async fn procedures(
        &self,
        conn: &dyn ConnectionContext,
        _catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>> {
        let schema = schema.unwrap_or("public");
        let sql = format!(
            "SELECT p.proname, ns.nspname \
             FROM pg_proc p JOIN pg_namespace ns ON ns.oid = p.pronamespace \
             WHERE ns.nspname = '{}' \
             ORDER BY p.proname",
            sql_literal(schema)
        );
        let result = guarded_query(conn, &sql).await?;
        let mut procs = Vec::new();
        for row in 0..result.row_count() {
            let mut def = ProcedureDefinition::new(result.value_as_string(row, 0));
            def.schema = Some(result.value_as_string(row, 1));
            // everything in pg_proc returns a value
            def.result_type = ProcedureResultType::Function;
            procs.push(def);
        }
        Ok(procs)
    }

    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let schema = def.schema.as_deref().unwrap_or("public");
        let sql = format!(
            "SELECT pg_get_functiondef(p.oid) \
             FROM pg_proc p JOIN pg_namespace ns ON ns.oid = p.pronamespace \
             WHERE p.proname = '{}' AND ns.nspname = '{}'",
            sql_literal(&def.name),
            sql_literal(schema)
        );
        let result = guarded_query(conn, &sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let mut source = result.value_as_string(0, 0);
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(Some(source))
    }
}

pub struct PostgresSequenceReader;

#[async_trait]
impl SequenceReader for PostgresSequenceReader {
    async fn sequence_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let schema = schema.unwrap_or("public");
        let sql = format!(
            "SELECT sequence_name FROM information_schema.sequences \
             WHERE sequence_schema = '{}' ORDER BY sequence_name",
            sql_literal(schema)
        );
        let result = guarded_query(conn, &sql).await?;
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
        let schema = schema.unwrap_or("public");
        let sql = format!(
            "SELECT minimum_value, maximum_value, increment, cycle_option \
             FROM information_schema.sequences \
             WHERE sequence_name = '{}' AND sequence_schema = '{}'",
            sql_literal(name),
            sql_literal(schema)
        );
        let result = guarded_query(conn, &sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let mut source = format!("CREATE SEQUENCE {name}\n");
        source.push_str(&format!(
            "   INCREMENT BY {}\n",
            result.value_as_string(0, 2)
        ));
        source.push_str(&format!("   MINVALUE {}\n", result.value_as_string(0, 0)));
        source.push_str(&format!("   MAXVALUE {}", result.value_as_string(0, 1)));
        if result.value_as_string(0, 3) == "YES" {
            source.push_str("\n   CYCLE");
        }
        source.push_str(";\n");
        Ok(Some(source))
    }
}
