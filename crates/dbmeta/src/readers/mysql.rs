//! MySQL capability readers.

use async_trait::async_trait;

use crate::connection::ConnectionContext;
use crate::error::Result;
use crate::model::{ProcedureDefinition, ProcedureResultType};
use crate::readers::{sql_literal, ProcedureReader};

pub struct MySqlProcedureReader;

#[async_trait]
impl ProcedureReader for MySqlProcedureReader {
    async fn procedures(
        &self,
        conn: &dyn ConnectionContext,
        catalog: Option<&str>,
        _schema: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>> {
        // MySQL exposes the database as the catalog
        let mut sql = String::from(
            "SELECT routine_name, routine_type, routine_schema \
             FROM information_schema.routines",
        );
        if let Some(catalog) = catalog {
            sql.push_str(&format!(
                " WHERE routine_schema = '{}'",
                sql_literal(catalog)
            ));
        }
        sql.push_str(" ORDER BY routine_name");
        let result = conn.query(&sql).await?;
        let mut procs = Vec::new();
        for row in 0..result.row_count() {
            let mut def = ProcedureDefinition::new(result.value_as_string(row, 0));
            def.catalog = Some(result.value_as_string(row, 2));
            def.result_type = if result.value_as_string(row, 1) == "FUNCTION" {
                ProcedureResultType::Function
            } else {
                ProcedureResultType::Procedure
            };
            procs.push(def);
        }
        Ok(procs)
    }

    async fn procedure_source(
        &self,
        conn: &dyn ConnectionContext,
        def: &ProcedureDefinition,
    ) -> Result<Option<String>> {
        let mut sql = format!(
            "SELECT routine_definition, routine_type \
             FROM information_schema.routines WHERE routine_name = '{}'",
            sql_literal(&def.name)
        );
        if let Some(catalog) = &def.catalog {
            sql.push_str(&format!(
                " AND routine_schema = '{}'",
                sql_literal(catalog)
            ));
        }
        let result = conn.query(&sql).await?;
        if result.is_empty() {
            return Ok(None);
        }
        let body = result.value_as_string(0, 0);
        if body.is_empty() {
            return Ok(None);
        }
        let routine_type = result.value_as_string(0, 1);
        let mut source = format!("CREATE {} {}\n", routine_type, def.name);
        source.push_str(&body);
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(Some(source))
    }
}
