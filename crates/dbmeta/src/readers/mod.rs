//! Dialect capability readers.
//!
//! Every capability beyond the baseline catalog calls (check constraints,
//! dialect index types, procedure source, sequences, synonyms, extended
//! error info) is a small trait with a generic default built only on the
//! baseline calls. Dialect families override what they actually support; the
//! [`ReaderBundle`] wires the right set for one connection at construction
//! time, so no dialect conditionals remain in the facade.

mod firebird;
mod generic;
mod mssql;
mod mysql;
mod oracle;
mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::connection::ConnectionContext;
use crate::dialect::DialectFamily;
use crate::error::Result;
use crate::model::{
    IndexDefinition, ProcedureDefinition, ProcedureResultType, TableIdentifier,
};
use crate::rowset::RowSet;

pub use generic::*;

/// Escape a name for embedding in a catalog query literal.
pub(crate) fn sql_literal(name: &str) -> String {
    name.replace('\'', "''")
}

/// Column check constraints and table-level constraints.
///
/// Both calls degrade instead of failing: implementations catch their own
/// query errors, log them and return an empty result, so a missing catalog
/// view never breaks table-definition retrieval.
#[async_trait]
pub trait ConstraintReader: Send + Sync {
    /// Per-column check constraint expressions, keyed by column name.
    async fn column_constraints(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
    ) -> HashMap<String, String> {
        let _ = (conn, schema, table);
        HashMap::new()
    }

    /// Table-level constraint clauses (`CHECK (...)`), joined and indented
    /// for direct inclusion in a CREATE TABLE body.
    async fn table_constraints(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indent: &str,
    ) -> Option<String> {
        let _ = (conn, schema, table, indent);
        None
    }
}

/// Index retrieval and dialect index-type resolution.
#[async_trait]
pub trait IndexReader: Send + Sync {
    /// Resolve dialect-specific index types on the grouped definitions.
    /// The generic reader leaves the numeric-code mapping in place.
    async fn enrich_index_list(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        table: &str,
        indexes: &mut [IndexDefinition],
    ) -> Result<()> {
        let _ = (conn, schema, table, indexes);
        Ok(())
    }
}

/// Stored procedure listing and source retrieval.
#[async_trait]
pub trait ProcedureReader: Send + Sync {
    /// List procedures visible in the schema. The generic reader maps the
    /// baseline call; dialects with routine grouping override this.
    async fn procedures(
        &self,
        conn: &dyn ConnectionContext,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>> {
        let rows = conn.procedures(catalog, schema).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let result_type = if row.procedure_type == 2 {
                    ProcedureResultType::Function
                } else {
                    ProcedureResultType::Procedure
                };
                ProcedureDefinition {
                    catalog: row.catalog,
                    schema: row.schema,
                    name: row.name,
                    result_type,
                    source: None,
                    is_package: false,
                }
            })
            .collect())
    }

    /// Parameter columns of one procedure, driver-shaped.
    async fn procedure_columns(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<RowSet> {
        conn.procedure_columns(def.catalog.as_deref(), def.schema.as_deref(), &def.name)
            .await
    }

    /// Full source text of one procedure, when the dialect exposes it.
    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let _ = (conn, def);
        Ok(None)
    }
}

/// Sequence enumeration and source reconstruction.
#[async_trait]
pub trait SequenceReader: Send + Sync {
    /// Names of the sequences in the schema. Empty when the dialect has no
    /// sequences (or no catalog view for them).
    async fn sequence_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let _ = (conn, schema);
        Ok(Vec::new())
    }

    /// Reconstructed CREATE SEQUENCE statement.
    async fn sequence_source(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<String>> {
        let _ = (conn, schema, name);
        Ok(None)
    }
}

/// Synonym enumeration and resolution.
#[async_trait]
pub trait SynonymReader: Send + Sync {
    async fn synonym_names(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let _ = (conn, schema);
        Ok(Vec::new())
    }

    /// The table a synonym points to, or None when the name is not a
    /// synonym (or the dialect has none).
    async fn synonym_target(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<TableIdentifier>> {
        let _ = (conn, schema, name);
        Ok(None)
    }

    /// Reconstructed CREATE SYNONYM statement.
    async fn synonym_source(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<String>> {
        let Some(target) = self.synonym_target(conn, schema, name).await? else {
            return Ok(None);
        };
        let target_expr = match &target.schema {
            Some(s) => format!("{s}.{}", target.name),
            None => target.name.clone(),
        };
        Ok(Some(format!("CREATE SYNONYM {name}\n   FOR {target_expr};\n")))
    }
}

/// Current-schema resolution beyond what the driver reports.
#[async_trait]
pub trait SchemaInfoReader: Send + Sync {
    async fn current_schema(&self, conn: &dyn ConnectionContext) -> Result<Option<String>> {
        conn.current_schema().await
    }
}

/// Extended compile-error information for procedural objects.
#[async_trait]
pub trait ErrorInfoReader: Send + Sync {
    async fn extended_error_info(
        &self,
        conn: &dyn ConnectionContext,
        schema: Option<&str>,
        object: &str,
        object_type: &str,
    ) -> Result<String> {
        let _ = (conn, schema, object, object_type);
        Ok(String::new())
    }
}

/// The full set of capability readers for one connection.
///
/// Built once per facade; each slot holds either a dialect-specific reader
/// or the generic default.
#[derive(Clone)]
pub struct ReaderBundle {
    pub constraints: Arc<dyn ConstraintReader>,
    pub indexes: Arc<dyn IndexReader>,
    pub procedures: Arc<dyn ProcedureReader>,
    pub sequences: Arc<dyn SequenceReader>,
    pub synonyms: Arc<dyn SynonymReader>,
    pub schema_info: Arc<dyn SchemaInfoReader>,
    pub error_info: Arc<dyn ErrorInfoReader>,
}

impl ReaderBundle {
    /// Wire the readers for one dialect family.
    pub fn for_family(family: DialectFamily) -> Self {
        let mut bundle = Self::generic();
        match family {
            DialectFamily::Oracle => {
                bundle.constraints = Arc::new(oracle::OracleConstraintReader);
                bundle.indexes = Arc::new(oracle::OracleIndexReader);
                bundle.procedures = Arc::new(oracle::OracleProcedureReader);
                bundle.sequences = Arc::new(oracle::OracleSequenceReader);
                bundle.synonyms = Arc::new(oracle::OracleSynonymReader);
                bundle.error_info = Arc::new(oracle::OracleErrorInfoReader);
            }
            DialectFamily::Postgres => {
                bundle.constraints = Arc::new(postgres::PostgresConstraintReader);
                bundle.indexes = Arc::new(postgres::PostgresIndexReader);
                bundle.procedures = Arc::new(postgres::PostgresProcedureReader);
                bundle.sequences = Arc::new(postgres::PostgresSequenceReader);
            }
            DialectFamily::MySql => {
                bundle.procedures = Arc::new(mysql::MySqlProcedureReader);
            }
            DialectFamily::SqlServer => {
                bundle.constraints = Arc::new(mssql::SqlServerConstraintReader);
                bundle.procedures = Arc::new(mssql::SqlServerProcedureReader);
            }
            DialectFamily::Hsql => {
                bundle.constraints = Arc::new(generic::InformationSchemaConstraintReader {
                    table: "INFORMATION_SCHEMA.SYSTEM_CHECK_CONSTRAINTS",
                });
                bundle.sequences = Arc::new(generic::InformationSchemaSequenceReader {
                    table: "INFORMATION_SCHEMA.SYSTEM_SEQUENCES",
                });
            }
            DialectFamily::Firebird => {
                bundle.constraints = Arc::new(firebird::FirebirdConstraintReader);
                bundle.procedures = Arc::new(firebird::FirebirdProcedureReader);
            }
            _ => {
                debug!(family = ?family, "no dialect readers registered, using generic defaults");
            }
        }
        bundle
    }

    fn generic() -> Self {
        Self {
            constraints: Arc::new(GenericConstraintReader),
            indexes: Arc::new(GenericIndexReader),
            procedures: Arc::new(GenericProcedureReader),
            sequences: Arc::new(GenericSequenceReader),
            synonyms: Arc::new(GenericSynonymReader),
            schema_info: Arc::new(GenericSchemaInfoReader),
            error_info: Arc::new(GenericErrorInfoReader),
        }
    }
}
