//! Metadata model types.
//!
//! Everything here is created by a facade call and owned by the caller; no
//! type holds a live cursor after construction.

use crate::identifier::IdentifierPolicy;

/// Database object types as they appear in table listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Table,
    View,
    Synonym,
    Sequence,
    MaterializedView,
    SystemTable,
    Index,
    Other,
}

impl ObjectType {
    /// Parse a type string as reported by the catalog.
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "TABLE" => ObjectType::Table,
            "VIEW" => ObjectType::View,
            "SYNONYM" => ObjectType::Synonym,
            "SEQUENCE" => ObjectType::Sequence,
            "MATERIALIZED VIEW" | "SNAPSHOT" => ObjectType::MaterializedView,
            "SYSTEM TABLE" => ObjectType::SystemTable,
            s if s.contains("INDEX") => ObjectType::Index,
            _ => ObjectType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectType::Table => "TABLE",
            ObjectType::View => "VIEW",
            ObjectType::Synonym => "SYNONYM",
            ObjectType::Sequence => "SEQUENCE",
            ObjectType::MaterializedView => "MATERIALIZED VIEW",
            ObjectType::SystemTable => "SYSTEM TABLE",
            ObjectType::Index => "INDEX",
            ObjectType::Other => "OTHER",
        }
    }
}

/// Identifies one database object (table, view, synonym, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub object_type: ObjectType,
    /// Set once case adjustment has been applied (or when the caller already
    /// normalized the name). Adjustment is applied at most once.
    never_adjust_case: bool,
}

impl TableIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            object_type: ObjectType::Table,
            never_adjust_case: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    /// Mark this identifier as already normalized by the caller.
    pub fn with_preserved_case(mut self) -> Self {
        self.never_adjust_case = true;
        self
    }

    /// Parse `name`, `schema.name` or `catalog.schema.name`.
    pub fn parse(expression: &str) -> Self {
        let parts: Vec<&str> = expression.split('.').collect();
        match parts.as_slice() {
            [catalog, schema, name] => TableIdentifier::new(*name)
                .with_schema(*schema)
                .with_catalog(*catalog),
            [schema, name] => TableIdentifier::new(*name).with_schema(*schema),
            _ => TableIdentifier::new(expression),
        }
    }

    /// Fold catalog, schema and name to the dialect's stored case.
    ///
    /// No-op when the identifier was already adjusted or the caller opted
    /// out; a quoted raw name is never re-folded (the policy handles that).
    pub fn adjust_case(&mut self, policy: &IdentifierPolicy) {
        if self.never_adjust_case {
            return;
        }
        self.name = policy.adjust_object_name_case(&self.name);
        if let Some(schema) = &self.schema {
            self.schema = Some(policy.adjust_schema_name_case(schema));
        }
        if let Some(catalog) = &self.catalog {
            self.catalog = Some(policy.adjust_object_name_case(catalog));
        }
        self.never_adjust_case = true;
    }

    /// Qualified, quoted expression for use inside SQL text.
    pub fn table_expression(&self, policy: &IdentifierPolicy) -> String {
        let mut expr = String::new();
        if let Some(catalog) = &self.catalog {
            expr.push_str(&policy.quote_object_name(catalog, false));
            expr.push('.');
        }
        if let Some(schema) = &self.schema {
            expr.push_str(&policy.quote_object_name(schema, false));
            expr.push('.');
        }
        expr.push_str(&policy.quote_object_name(&self.name, false));
        expr
    }
}

/// One column of a table or view.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIdentifier {
    pub name: String,
    /// Normalized display type, e.g. `VARCHAR(20)` or `NUMERIC(10,2)`.
    pub display_type: String,
    /// JDBC-style numeric type code.
    pub type_code: i32,
    pub size: i32,
    pub digits: i32,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub remarks: Option<String>,
    pub is_pk: bool,
    /// 1-based position within the table's column list.
    pub position: i32,
    /// Dialect-specific extra (storage hint, enum values, ...).
    pub dbms_extra: Option<String>,
}

impl ColumnIdentifier {
    /// Build the display type string from the raw type information.
    ///
    /// Character types show their size, numeric types show precision and
    /// scale, everything else is reported verbatim.
    pub fn display_type_for(type_name: &str, type_code: i32, size: i32, digits: i32) -> String {
        // JDBC type codes: CHAR=1, NUMERIC=2, DECIMAL=3, VARCHAR=12
        match type_code {
            1 | 12 if size > 0 => format!("{type_name}({size})"),
            2 | 3 => {
                if digits > 0 {
                    format!("{type_name}({size},{digits})")
                } else if size > 0 {
                    format!("{type_name}({size})")
                } else {
                    type_name.to_string()
                }
            }
            _ => type_name.to_string(),
        }
    }
}

/// One index over a table, with its columns in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub unique: bool,
    pub is_pk_index: bool,
    /// Column expressions, each `name` or `name ASC` / `name DESC`.
    pub columns: Vec<String>,
    pub index_type: String,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            is_pk_index: false,
            columns: Vec::new(),
            index_type: String::new(),
        }
    }

    /// The comma-separated column expression list.
    pub fn expression(&self) -> String {
        self.columns.join(", ")
    }
}

/// Referential action for a foreign key's update/delete rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialRule {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
    SetDefault,
    InitiallyDeferred,
    InitiallyImmediate,
    NotDeferrable,
}

impl ReferentialRule {
    /// Total mapping from the standard numeric rule codes.
    ///
    /// Unknown codes fall back to NO ACTION rather than failing the whole
    /// key retrieval.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ReferentialRule::Cascade,
            1 => ReferentialRule::Restrict,
            2 => ReferentialRule::SetNull,
            3 => ReferentialRule::NoAction,
            4 => ReferentialRule::SetDefault,
            5 => ReferentialRule::InitiallyDeferred,
            6 => ReferentialRule::InitiallyImmediate,
            7 => ReferentialRule::NotDeferrable,
            _ => ReferentialRule::NoAction,
        }
    }

    /// Standard SQL display text.
    pub fn display(&self) -> &'static str {
        match self {
            ReferentialRule::Cascade => "CASCADE",
            ReferentialRule::Restrict => "RESTRICT",
            ReferentialRule::SetNull => "SET NULL",
            ReferentialRule::NoAction => "NO ACTION",
            ReferentialRule::SetDefault => "SET DEFAULT",
            ReferentialRule::InitiallyDeferred => "INITIALLY DEFERRED",
            ReferentialRule::InitiallyImmediate => "INITIALLY IMMEDIATE",
            ReferentialRule::NotDeferrable => "NOT DEFERRABLE",
        }
    }

    /// Settings key suffix for per-dialect display overrides.
    pub fn settings_key(&self) -> &'static str {
        match self {
            ReferentialRule::Cascade => "fkrule.cascade",
            ReferentialRule::Restrict => "fkrule.restrict",
            ReferentialRule::SetNull => "fkrule.setnull",
            ReferentialRule::NoAction => "fkrule.noaction",
            ReferentialRule::SetDefault => "fkrule.setdefault",
            ReferentialRule::InitiallyDeferred => "fkrule.initiallydeferred",
            ReferentialRule::InitiallyImmediate => "fkrule.initiallyimmediate",
            ReferentialRule::NotDeferrable => "fkrule.notdeferrable",
        }
    }
}

/// One foreign-key constraint, grouped from the raw per-column key rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDefinition {
    pub name: String,
    /// Source columns in declaration order.
    pub columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub update_rule: ReferentialRule,
    pub delete_rule: ReferentialRule,
}

/// Result classification for a stored routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureResultType {
    Procedure,
    Function,
    PackageMember,
}

/// One stored procedure, function or package.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDefinition {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub result_type: ProcedureResultType,
    pub source: Option<String>,
    /// Dialects that group routines (Oracle packages) set this and produce
    /// one definition per package.
    pub is_package: bool,
}

impl ProcedureDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            result_type: ProcedureResultType::Procedure,
            source: None,
            is_package: false,
        }
    }
}

/// Whether an [`ObjectNameFilter`] keeps or drops matching names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

/// Name filter applied to schema/catalog enumeration.
///
/// Patterns are exact names or simple `*` wildcards (`TMP_*`).
#[derive(Debug, Clone)]
pub struct ObjectNameFilter {
    mode: FilterMode,
    patterns: Vec<String>,
}

impl ObjectNameFilter {
    pub fn new(mode: FilterMode, patterns: Vec<String>) -> Self {
        Self { mode, patterns }
    }

    /// A filter that keeps everything.
    pub fn keep_all() -> Self {
        Self::new(FilterMode::Exclude, Vec::new())
    }

    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| {
            if let Some(prefix) = p.strip_suffix('*') {
                name.to_uppercase().starts_with(&prefix.to_uppercase())
            } else {
                p.eq_ignore_ascii_case(name)
            }
        })
    }

    /// Should `name` appear in the enumeration?
    pub fn retains(&self, name: &str) -> bool {
        match self.mode {
            FilterMode::Include => self.patterns.is_empty() || self.matches(name),
            FilterMode::Exclude => !self.matches(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_qualified_names() {
        let t = TableIdentifier::parse("scott.emp");
        assert_eq!(t.schema.as_deref(), Some("scott"));
        assert_eq!(t.name, "emp");

        let t = TableIdentifier::parse("cat.dbo.orders");
        assert_eq!(t.catalog.as_deref(), Some("cat"));
        assert_eq!(t.schema.as_deref(), Some("dbo"));
        assert_eq!(t.name, "orders");
    }

    #[test]
    fn rule_codes_are_total() {
        for code in -1..10 {
            // every code maps to exactly one display value
            let rule = ReferentialRule::from_code(code);
            assert!(!rule.display().is_empty());
        }
        assert_eq!(ReferentialRule::from_code(0), ReferentialRule::Cascade);
        assert_eq!(ReferentialRule::from_code(1), ReferentialRule::Restrict);
        assert_eq!(ReferentialRule::from_code(3), ReferentialRule::NoAction);
        assert_eq!(ReferentialRule::from_code(99), ReferentialRule::NoAction);
    }

    #[test]
    fn display_type_formatting() {
        assert_eq!(
            ColumnIdentifier::display_type_for("VARCHAR", 12, 20, 0),
            "VARCHAR(20)"
        );
        assert_eq!(
            ColumnIdentifier::display_type_for("NUMERIC", 2, 10, 2),
            "NUMERIC(10,2)"
        );
        assert_eq!(
            ColumnIdentifier::display_type_for("NUMERIC", 2, 0, 0),
            "NUMERIC"
        );
        assert_eq!(
            ColumnIdentifier::display_type_for("INTEGER", 4, 10, 0),
            "INTEGER"
        );
    }

    #[test]
    fn name_filter_wildcards() {
        let f = ObjectNameFilter::new(FilterMode::Exclude, vec!["SYS*".into(), "temp".into()]);
        assert!(!f.retains("SYSAUX"));
        assert!(!f.retains("TEMP"));
        assert!(f.retains("SALES"));

        let inc = ObjectNameFilter::new(FilterMode::Include, vec!["PUBLIC".into()]);
        assert!(inc.retains("public"));
        assert!(!inc.retains("other"));
    }

    #[test]
    fn object_type_labels() {
        assert_eq!(ObjectType::from_label("table"), ObjectType::Table);
        assert_eq!(
            ObjectType::from_label("SNAPSHOT"),
            ObjectType::MaterializedView
        );
        assert_eq!(ObjectType::from_label("BITMAP INDEX"), ObjectType::Index);
    }
}
