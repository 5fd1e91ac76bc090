//! Generic readers built only on the baseline catalog calls.
//!
//! These are the fallbacks wired for every dialect without a specialized
//! implementation. They rely entirely on the trait default methods; the two
//! information-schema readers additionally serve dialects whose catalog
//! views follow the standard layout under a non-standard name.

use async_trait::async_trait;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::readers::{
    sql_literal, ConstraintReader, ErrorInfoReader, IndexReader, ProcedureReader,
    SchemaInfoReader, SequenceReader, SynonymReader,
};

pub struct GenericConstraintReader;
impl ConstraintReader for GenericConstraintReader {}

pub struct GenericIndexReader;
impl IndexReader for GenericIndexReader {}

pub struct GenericProcedureReader;
impl ProcedureReader for GenericProcedureReader {}

pub struct GenericSequenceReader;
impl SequenceReader for GenericSequenceReader {}

pub struct GenericSynonymReader;
impl SynonymReader for GenericSynonymReader {}

pub struct GenericSchemaInfoReader;
impl SchemaInfoReader for GenericSchemaInfoReader {}

pub struct GenericErrorInfoReader;
impl ErrorInfoReader for GenericErrorInfoReader {}

/// Check-constraint reader for dialects with a standard-shaped
/// CHECK_CONSTRAINTS view (constraint name + search condition).
pub struct InformationSchemaConstraintReader {
    pub table: &'static str,
}

#[async_trait]
impl ConstraintReader for InformationSchemaConstraintReader {
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        _schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        let sql = format!(
            "SELECT chk.CONSTRAINT_NAME, chk.CHECK_CLAUSE \
             FROM {} chk \
             WHERE chk.CONSTRAINT_NAME LIKE '%{}%'",
            self.table,
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
            let condition = result.value_as_string(row, 1);
            if condition.is_empty() || condition.to_uppercase().ends_with("IS NOT NULL") {
                continue;
            }
            clauses.push(format!("CHECK ({condition})"));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(&format!(",\n{indent}")))
        }
    }
}

/// Sequence reader for dialects with a standard-shaped SEQUENCES view.
pub struct InformationSchemaSequenceReader {
    pub table: &'static str,
}

#[async_trait]
impl SequenceReader for InformationSchemaSequenceReader {
    async fn sequence_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut sql = format!("SELECT SEQUENCE_NAME FROM {}", self.table);
        if let Some(schema) = schema {
            sql.push_str(&format!(
                " WHERE SEQUENCE_SCHEMA = '{}'",
                sql_literal(schema)
            ));
        }
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
        let names = self.sequence_names(conn, schema).await?;
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Ok(None);
        }
        Ok(Some(format!("CREATE SEQUENCE {name};\n")))
    }
}
