//! Cross-dialect database catalog introspection and DDL synthesis.
//!
//! The crate wraps one live connection (anything implementing
//! [`ConnectionContext`]) in a [`MetadataFacade`] that answers the questions
//! a database tool keeps asking: which objects exist, what do their columns,
//! keys and indexes look like, and what DDL would recreate them. Dialect
//! differences are isolated in three places resolved once at construction
//! time: the [`DialectProfile`] (capability flags), the [`ReaderBundle`]
//! (catalog queries beyond the driver baseline) and the [`SqlTemplateStore`]
//! (statement shapes).
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use dbmeta::{ConnectionContext, DbSettings, MetadataFacade, TableIdentifier};
//! # async fn example(conn: Arc<dyn ConnectionContext>) -> dbmeta::Result<()> {
//! let facade = MetadataFacade::connect(conn, Arc::new(DbSettings::empty())).await?;
//! let table = TableIdentifier::parse("sales.orders");
//! let ddl = facade.get_table_source(&table, false, true).await?;
//! println!("{ddl}");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod facade;
pub mod identifier;
pub mod model;
pub mod quirks;
pub mod readers;
pub mod rowset;
pub mod settings;
pub mod templates;

pub use connection::{ConnectionContext, ReportedCase};
pub use ddl::{DdlSynthesizer, TableDdlRequest};
pub use dialect::{CaseFolding, DialectDetector, DialectFamily, DialectProfile};
pub use error::{MetaError, Result};
pub use facade::{MetadataFacade, FK_LIST_COLUMNS, TABLE_LIST_COLUMNS};
pub use identifier::IdentifierPolicy;
pub use model::{
    ColumnIdentifier, ForeignKeyDefinition, IndexDefinition, ObjectNameFilter, ObjectType,
    ProcedureDefinition, ReferentialRule, TableIdentifier,
};
pub use quirks::DriverQuirks;
pub use readers::ReaderBundle;
pub use rowset::{CellValue, RowSet};
pub use settings::DbSettings;
pub use templates::{SqlTemplate, SqlTemplateStore, TemplateKey};
