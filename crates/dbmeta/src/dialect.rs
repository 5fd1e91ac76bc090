//! Dialect detection and capability profiles.
//!
//! A [`DialectProfile`] is derived once per connection and immutable
//! afterwards. Detection is an ordered substring match against the known
//! database families; unmatched products get a generic profile backed only by
//! what the driver itself reports.

use tracing::{info, warn};

use crate::connection::{ConnectionContext, ReportedCase};
use crate::settings::DbSettings;

/// Known database families, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFamily {
    Oracle,
    Postgres,
    SqlServer,
    MySql,
    Hsql,
    Firebird,
    Db2,
    Derby,
    Informix,
    Ingres,
    McKoi,
    FirstSql,
    Access,
    Excel,
    Generic,
}

impl DialectFamily {
    /// Ordered substring match; first match wins.
    pub fn detect(product_lower: &str) -> Self {
        const MATCHES: &[(&str, DialectFamily)] = &[
            ("oracle", DialectFamily::Oracle),
            ("postgres", DialectFamily::Postgres),
            ("sql server", DialectFamily::SqlServer),
            ("mysql", DialectFamily::MySql),
            ("hsql", DialectFamily::Hsql),
            ("firebird", DialectFamily::Firebird),
            ("db2", DialectFamily::Db2),
            ("derby", DialectFamily::Derby),
            ("informix", DialectFamily::Informix),
            ("ingres", DialectFamily::Ingres),
            ("mckoi", DialectFamily::McKoi),
            ("firstsql", DialectFamily::FirstSql),
            ("access", DialectFamily::Access),
            ("excel", DialectFamily::Excel),
        ];
        for (needle, family) in MATCHES {
            if product_lower.contains(needle) {
                return *family;
            }
        }
        DialectFamily::Generic
    }
}

/// Case-folding mode for unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFolding {
    Upper,
    Lower,
    Mixed,
    /// Fold to whatever case the driver reports at runtime.
    DriverReported(ReportedCase),
}

impl CaseFolding {
    fn from_setting(value: &str) -> Option<Self> {
        match value {
            "upper" => Some(CaseFolding::Upper),
            "lower" => Some(CaseFolding::Lower),
            "mixed" => Some(CaseFolding::Mixed),
            _ => None,
        }
    }

    /// Resolve the driver-reported indirection to a concrete mode.
    pub fn effective(self) -> CaseFolding {
        match self {
            CaseFolding::DriverReported(ReportedCase::Upper) => CaseFolding::Upper,
            CaseFolding::DriverReported(ReportedCase::Lower) => CaseFolding::Lower,
            CaseFolding::DriverReported(ReportedCase::Mixed) => CaseFolding::Mixed,
            other => other,
        }
    }
}

/// Immutable capability record for one connection.
#[derive(Debug, Clone)]
pub struct DialectProfile {
    pub family: DialectFamily,
    /// Sanitized product name used as settings key.
    pub dialect_id: String,
    pub product_name: String,
    pub product_version: String,
    pub schema_term: String,
    pub catalog_term: String,
    pub quote_char: String,
    pub ddl_needs_commit: bool,
    pub use_jdbc_commit: bool,
    pub create_inline_constraints: bool,
    pub use_null_keyword: bool,
    pub supports_catalogs: bool,
    pub supports_get_primary_keys: bool,
    /// Quote identifiers that start with a digit.
    pub quote_digit_identifiers: bool,
    /// Configured "never quote" override.
    pub never_quote: bool,
    pub object_case: CaseFolding,
    pub schema_case: CaseFolding,
}

/// Strip everything that cannot appear in a settings key from the product
/// name: spaces, parentheses, brackets, slashes, `$`, commas and dots all
/// become underscores.
pub fn sanitize_dialect_id(product_name: &str) -> String {
    product_name
        .chars()
        .map(|c| match c {
            ' ' | '(' | ')' | '[' | ']' | '/' | '$' | ',' | '.' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Maps a product name to a [`DialectProfile`].
pub struct DialectDetector;

impl DialectDetector {
    /// Detect the dialect for a connection.
    ///
    /// Failures from the underlying product-name/version calls degrade to
    /// safe defaults and are logged, never propagated.
    pub async fn detect(conn: &dyn ConnectionContext, settings: &DbSettings) -> DialectProfile {
        let mut product_name = match conn.product_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!("could not retrieve database product name: {e}");
                "unknown".to_string()
            }
        };

        let family = DialectFamily::detect(&product_name.to_lowercase());

        match family {
            // Newer Firebird drivers embed the server version in the product
            // name; normalize so one settings key covers all of them.
            DialectFamily::Firebird => product_name = "Firebird".to_string(),
            // McKoi reports its version inside the product name as well.
            DialectFamily::McKoi => {
                if let Some(pos) = product_name.find('(') {
                    product_name = product_name[..pos].trim().to_string();
                }
            }
            _ => {}
        }

        let product_version = conn.product_version().await.unwrap_or_else(|e| {
            warn!("could not retrieve database product version: {e}");
            String::new()
        });

        let dialect_id = sanitize_dialect_id(&product_name);
        info!(dialect_id, product_name, "detected database dialect");

        let schema_term = non_empty_or(conn.schema_term().await.ok(), "Schema");
        let catalog_term = non_empty_or(conn.catalog_term().await.ok(), "Catalog");
        let quote_char = match conn.identifier_quote().await {
            Ok(Some(q)) if !q.trim().is_empty() => q,
            _ => "\"".to_string(),
        };

        let reported_case = conn
            .stored_identifier_case()
            .await
            .unwrap_or(ReportedCase::Mixed);

        let default_object_case = match family {
            DialectFamily::Oracle
            | DialectFamily::Db2
            | DialectFamily::Hsql
            | DialectFamily::Firebird
            | DialectFamily::Derby
            | DialectFamily::Ingres => CaseFolding::Upper,
            DialectFamily::Postgres | DialectFamily::MySql | DialectFamily::Informix => {
                CaseFolding::Lower
            }
            _ => CaseFolding::DriverReported(reported_case),
        };

        let object_case = settings
            .get(&dialect_id, "objectname_case")
            .and_then(CaseFolding::from_setting)
            .unwrap_or(default_object_case);

        let schema_case = settings
            .get(&dialect_id, "schemaname_case")
            .and_then(CaseFolding::from_setting)
            .unwrap_or(object_case);

        let ddl_needs_commit = settings.get_bool(
            &dialect_id,
            "ddl_needs_commit",
            matches!(family, DialectFamily::Db2 | DialectFamily::Ingres),
        );

        DialectProfile {
            dialect_id: dialect_id.clone(),
            product_name,
            product_version,
            schema_term,
            catalog_term,
            quote_char,
            ddl_needs_commit,
            use_jdbc_commit: settings.get_bool(&dialect_id, "use_jdbc_commit", false),
            create_inline_constraints: settings.get_bool(
                &dialect_id,
                "create_inline_constraints",
                matches!(family, DialectFamily::FirstSql | DialectFamily::McKoi),
            ),
            use_null_keyword: settings.get_bool(
                &dialect_id,
                "use_null_keyword",
                !matches!(family, DialectFamily::Firebird | DialectFamily::Derby),
            ),
            supports_catalogs: settings.get_bool(
                &dialect_id,
                "supports_catalogs",
                matches!(family, DialectFamily::SqlServer | DialectFamily::MySql),
            ),
            supports_get_primary_keys: settings.get_bool(
                &dialect_id,
                "supports_get_primary_keys",
                !matches!(family, DialectFamily::Excel | DialectFamily::Access),
            ),
            quote_digit_identifiers: settings.get_bool(
                &dialect_id,
                "quote_digit_identifiers",
                matches!(family, DialectFamily::Oracle | DialectFamily::Hsql),
            ),
            never_quote: settings
                .get_str("default", "never_quote", "")
                .contains(&dialect_id),
            object_case,
            schema_case,
            family,
        }
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_order_first_match_wins() {
        assert_eq!(
            DialectFamily::detect("oracle database 10g"),
            DialectFamily::Oracle
        );
        assert_eq!(DialectFamily::detect("postgresql"), DialectFamily::Postgres);
        assert_eq!(
            DialectFamily::detect("microsoft sql server"),
            DialectFamily::SqlServer
        );
        assert_eq!(
            DialectFamily::detect("some new database"),
            DialectFamily::Generic
        );
    }

    #[test]
    fn dialect_id_is_sanitized() {
        assert_eq!(
            sanitize_dialect_id("Microsoft SQL Server"),
            "microsoft_sql_server"
        );
        assert_eq!(sanitize_dialect_id("DB2/NT"), "db2_nt");
        assert_eq!(sanitize_dialect_id("McKoi"), "mckoi");
    }

    #[test]
    fn case_folding_setting_parse() {
        assert_eq!(CaseFolding::from_setting("upper"), Some(CaseFolding::Upper));
        assert_eq!(CaseFolding::from_setting("weird"), None);
    }

    #[test]
    fn driver_reported_resolves() {
        let c = CaseFolding::DriverReported(ReportedCase::Lower);
        assert_eq!(c.effective(), CaseFolding::Lower);
        assert_eq!(CaseFolding::Upper.effective(), CaseFolding::Upper);
    }
}
