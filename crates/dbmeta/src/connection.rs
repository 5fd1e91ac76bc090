//! Connection abstraction consumed by the metadata engine.
//!
//! A [`ConnectionContext`] is a live handle to one database session. It
//! exposes the baseline catalog calls every driver provides plus the ability
//! to execute arbitrary SQL - everything the facade and the capability
//! readers need, and nothing else. One facade binds to exactly one
//! connection; callers needing parallel introspection use one context per
//! worker.

use async_trait::async_trait;

use crate::error::Result;
use crate::rowset::RowSet;

/// Case in which the server stores unquoted identifiers, as reported by the
/// driver itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedCase {
    Upper,
    Lower,
    Mixed,
}

/// One row from the baseline table-listing call.
#[derive(Debug, Clone)]
pub struct RawTableRow {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub object_type: String,
    pub remarks: Option<String>,
}

/// One row from the baseline column-listing call.
#[derive(Debug, Clone)]
pub struct RawColumnRow {
    pub name: String,
    /// Dialect type name as reported (`VARCHAR2`, `enum('a','b')`, ...).
    pub type_name: String,
    /// JDBC-style numeric type code.
    pub type_code: i32,
    pub size: i32,
    pub digits: i32,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub remarks: Option<String>,
    /// 1-based ordinal position.
    pub position: i32,
    /// Dialect-specific extra (e.g. byte/char semantics marker).
    pub extra: Option<String>,
}

/// One row from the baseline primary-key call.
#[derive(Debug, Clone)]
pub struct RawPrimaryKeyRow {
    pub column_name: String,
    pub key_seq: i32,
    pub pk_name: Option<String>,
}

/// One per-column row from the baseline index call.
#[derive(Debug, Clone)]
pub struct RawIndexRow {
    pub index_name: Option<String>,
    pub non_unique: bool,
    pub column_name: String,
    /// `Some(true)` = ASC, `Some(false)` = DESC, `None` = unreported.
    pub ascending: Option<bool>,
    /// Numeric index-type code (driver-specific).
    pub type_code: i32,
    /// Dialect index-type string when the driver reports one directly.
    pub dialect_type: Option<String>,
}

/// One per-column row from the imported/exported-keys calls.
#[derive(Debug, Clone)]
pub struct RawKeyRow {
    pub pk_schema: Option<String>,
    pub pk_table: String,
    pub pk_column: String,
    pub fk_schema: Option<String>,
    pub fk_table: String,
    pub fk_column: String,
    pub key_seq: i32,
    pub update_rule: i32,
    pub delete_rule: i32,
    pub fk_name: Option<String>,
    pub pk_name: Option<String>,
}

/// One row from the baseline procedure-listing call.
#[derive(Debug, Clone)]
pub struct RawProcedureRow {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub remarks: Option<String>,
    /// 1 = no result, 2 = returns result (JDBC convention).
    pub procedure_type: i32,
}

/// One row from the baseline table-privileges call.
#[derive(Debug, Clone)]
pub struct RawGrantRow {
    pub grantor: Option<String>,
    pub grantee: String,
    pub privilege: String,
    pub grantable: bool,
}

/// Capability handle for one database session.
///
/// All calls are synchronous round-trips from the database's point of view;
/// the underlying driver typically allows only one in-flight statement per
/// connection, so implementations need not be internally concurrent.
#[async_trait]
pub trait ConnectionContext: Send + Sync {
    // ----- product / session info -----

    async fn product_name(&self) -> Result<String>;
    async fn product_version(&self) -> Result<String>;

    /// Quote string the driver reports for identifiers, if any.
    async fn identifier_quote(&self) -> Result<Option<String>>;

    /// Driver terminology for "schema" (may be empty).
    async fn schema_term(&self) -> Result<String>;

    /// Driver terminology for "catalog" (may be empty).
    async fn catalog_term(&self) -> Result<String>;

    /// Case in which unquoted identifiers are stored.
    async fn stored_identifier_case(&self) -> Result<ReportedCase>;

    async fn current_user(&self) -> Result<String>;
    async fn current_catalog(&self) -> Result<Option<String>>;
    async fn current_schema(&self) -> Result<Option<String>>;

    /// Reserved words reported by the driver beyond standard SQL.
    async fn keywords(&self) -> Result<Vec<String>>;

    // ----- baseline catalog calls -----

    async fn table_types(&self) -> Result<Vec<String>>;
    async fn catalogs(&self) -> Result<Vec<String>>;
    async fn schemas(&self) -> Result<Vec<String>>;

    async fn tables(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name_pattern: Option<&str>,
        types: Option<&[String]>,
    ) -> Result<Vec<RawTableRow>>;

    async fn columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawColumnRow>>;

    async fn primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawPrimaryKeyRow>>;

    async fn imported_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawKeyRow>>;

    async fn exported_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawKeyRow>>;

    async fn index_info(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        unique_only: bool,
    ) -> Result<Vec<RawIndexRow>>;

    async fn procedures(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<RawProcedureRow>>;

    /// Parameter/result columns of one procedure, driver-shaped.
    async fn procedure_columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: &str,
    ) -> Result<RowSet>;

    async fn table_privileges(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<RawGrantRow>>;

    // ----- SQL execution -----

    /// Run a query and collect the full result.
    async fn query(&self, sql: &str) -> Result<RowSet>;

    /// Run a statement, returning the affected-row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    // ----- transaction control -----

    async fn auto_commit(&self) -> Result<bool>;
    async fn commit(&self) -> Result<()>;
    async fn rollback(&self) -> Result<()>;
    async fn savepoint(&self, name: &str) -> Result<()>;
    async fn rollback_to_savepoint(&self, name: &str) -> Result<()>;
    async fn release_savepoint(&self, name: &str) -> Result<()>;
}
