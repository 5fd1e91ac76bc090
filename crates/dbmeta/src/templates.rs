//! Per-dialect SQL template fragments.
//!
//! Templates are small structured objects: raw text plus the list of
//! placeholders that must be substituted. Missing or unknown placeholders are
//! caught when the store is built, not when the first DDL script comes out
//! wrong.

use std::collections::HashMap;

use crate::error::{MetaError, Result};
use crate::settings::DbSettings;

/// Placeholder tokens recognized inside template text.
pub mod placeholder {
    pub const TABLE_NAME: &str = "%tablename%";
    pub const COLUMN_LIST: &str = "%columnlist%";
    pub const PK_NAME: &str = "%pk_name%";
    pub const CONSTRAINT_NAME: &str = "%constraintname%";
    pub const TARGET_TABLE: &str = "%targettable%";
    pub const TARGET_COLUMN_LIST: &str = "%targetcolumnlist%";
    pub const FK_UPDATE_RULE: &str = "%fk_update_rule%";
    pub const FK_DELETE_RULE: &str = "%fk_delete_rule%";
    pub const INDEX_NAME: &str = "%indexname%";
    pub const UNIQUE: &str = "%unique%";
    pub const OBJECT_NAME: &str = "%name%";
    pub const OBJECT_TYPE: &str = "%objecttype%";

    pub const ALL: &[&str] = &[
        TABLE_NAME,
        COLUMN_LIST,
        PK_NAME,
        CONSTRAINT_NAME,
        TARGET_TABLE,
        TARGET_COLUMN_LIST,
        FK_UPDATE_RULE,
        FK_DELETE_RULE,
        INDEX_NAME,
        UNIQUE,
        OBJECT_NAME,
        OBJECT_TYPE,
    ];
}

/// Logical template keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    PrimaryKey,
    PrimaryKeyUnnamed,
    ForeignKey,
    ForeignKeyUnnamed,
    ForeignKeyInline,
    CreateIndex,
    DropObject,
    ViewSourceQuery,
    TriggerSourceQuery,
}

impl TemplateKey {
    fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::PrimaryKey => "pk",
            TemplateKey::PrimaryKeyUnnamed => "pk_unnamed",
            TemplateKey::ForeignKey => "fk",
            TemplateKey::ForeignKeyUnnamed => "fk_unnamed",
            TemplateKey::ForeignKeyInline => "fk_inline",
            TemplateKey::CreateIndex => "create_index",
            TemplateKey::DropObject => "drop_object",
            TemplateKey::ViewSourceQuery => "view_source",
            TemplateKey::TriggerSourceQuery => "trigger_source",
        }
    }
}

/// A parameterized SQL fragment with a validated placeholder list.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    text: String,
    required: Vec<&'static str>,
}

impl SqlTemplate {
    /// Build a template, checking that every required placeholder actually
    /// appears in the text and that the text contains no unrecognized
    /// placeholder tokens.
    pub fn new(text: impl Into<String>, required: Vec<&'static str>) -> Result<Self> {
        let text = text.into();
        for ph in &required {
            if !text.contains(ph) {
                return Err(MetaError::config(format!(
                    "template is missing required placeholder {ph}: {text}"
                )));
            }
        }
        for ph in find_placeholders(&text) {
            if !placeholder::ALL.contains(&ph.as_str()) {
                return Err(MetaError::config(format!(
                    "template contains unknown placeholder {ph}: {text}"
                )));
            }
        }
        Ok(Self { text, required })
    }

    /// Substitute placeholder values. Every required placeholder must be
    /// supplied; optional placeholders not supplied are removed.
    pub fn apply(&self, values: &[(&str, &str)]) -> Result<String> {
        for ph in &self.required {
            if !values.iter().any(|(k, _)| k == ph) {
                return Err(MetaError::config(format!(
                    "no value supplied for template placeholder {ph}"
                )));
            }
        }
        let mut out = self.text.clone();
        for (ph, value) in values {
            out = out.replace(ph, value);
        }
        for ph in placeholder::ALL {
            out = out.replace(ph, "");
        }
        Ok(out)
    }
}

/// Scan the text for `%word%` spans. Lone `%` characters (LIKE patterns,
/// modulo) are left alone; only lowercase-word spans count as placeholders.
fn find_placeholders(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j].is_ascii_lowercase() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == b'%' {
                found.push(text[i..=j].to_string());
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    found
}

/// Per-dialect template storage with generic fallbacks.
#[derive(Debug, Clone)]
pub struct SqlTemplateStore {
    /// Keyed by (logical key, dialect id); dialect "default" holds fallbacks.
    templates: HashMap<(&'static str, String), SqlTemplate>,
}

impl SqlTemplateStore {
    /// Build the store with the built-in defaults plus any overrides found
    /// in the settings snapshot (`dbmeta.<dialect>.template.<key>`).
    pub fn with_builtins(settings: &DbSettings, dialect_id: &str) -> Result<Self> {
        use placeholder::*;
        let mut store = Self {
            templates: HashMap::new(),
        };

        store.insert_default(
            TemplateKey::PrimaryKey,
            SqlTemplate::new(
                format!(
                    "ALTER TABLE {TABLE_NAME} ADD CONSTRAINT {PK_NAME} PRIMARY KEY ({COLUMN_LIST})"
                ),
                vec![TABLE_NAME, PK_NAME, COLUMN_LIST],
            )?,
        );
        store.insert_default(
            TemplateKey::PrimaryKeyUnnamed,
            SqlTemplate::new(
                format!("ALTER TABLE {TABLE_NAME} ADD PRIMARY KEY ({COLUMN_LIST})"),
                vec![TABLE_NAME, COLUMN_LIST],
            )?,
        );
        store.insert_default(
            TemplateKey::ForeignKey,
            SqlTemplate::new(
                format!(
                    "ALTER TABLE {TABLE_NAME} ADD CONSTRAINT {CONSTRAINT_NAME} FOREIGN KEY ({COLUMN_LIST}) REFERENCES {TARGET_TABLE} ({TARGET_COLUMN_LIST}){FK_UPDATE_RULE}{FK_DELETE_RULE}"
                ),
                vec![
                    TABLE_NAME,
                    CONSTRAINT_NAME,
                    COLUMN_LIST,
                    TARGET_TABLE,
                    TARGET_COLUMN_LIST,
                ],
            )?,
        );
        store.insert_default(
            TemplateKey::ForeignKeyUnnamed,
            SqlTemplate::new(
                format!(
                    "ALTER TABLE {TABLE_NAME} ADD FOREIGN KEY ({COLUMN_LIST}) REFERENCES {TARGET_TABLE} ({TARGET_COLUMN_LIST}){FK_UPDATE_RULE}{FK_DELETE_RULE}"
                ),
                vec![TABLE_NAME, COLUMN_LIST, TARGET_TABLE, TARGET_COLUMN_LIST],
            )?,
        );
        store.insert_default(
            TemplateKey::ForeignKeyInline,
            SqlTemplate::new(
                format!(
                    "CONSTRAINT {CONSTRAINT_NAME} FOREIGN KEY ({COLUMN_LIST}) REFERENCES {TARGET_TABLE} ({TARGET_COLUMN_LIST}){FK_UPDATE_RULE}{FK_DELETE_RULE}"
                ),
                vec![
                    CONSTRAINT_NAME,
                    COLUMN_LIST,
                    TARGET_TABLE,
                    TARGET_COLUMN_LIST,
                ],
            )?,
        );
        store.insert_default(
            TemplateKey::CreateIndex,
            SqlTemplate::new(
                format!("CREATE {UNIQUE}INDEX {INDEX_NAME} ON {TABLE_NAME} ({COLUMN_LIST})"),
                vec![INDEX_NAME, TABLE_NAME, COLUMN_LIST],
            )?,
        );
        store.insert_default(
            TemplateKey::DropObject,
            SqlTemplate::new(
                format!("DROP {OBJECT_TYPE} {OBJECT_NAME}"),
                vec![OBJECT_TYPE, OBJECT_NAME],
            )?,
        );

        // dialect-specific source queries; only the families with a known
        // catalog view get one
        store.insert(
            TemplateKey::ViewSourceQuery,
            "oracle",
            SqlTemplate::new(
                format!(
                    "SELECT text FROM all_views WHERE view_name = '{OBJECT_NAME}'"
                ),
                vec![OBJECT_NAME],
            )?,
        );
        store.insert(
            TemplateKey::TriggerSourceQuery,
            "oracle",
            SqlTemplate::new(
                format!(
                    "SELECT trigger_body FROM all_triggers WHERE trigger_name = '{OBJECT_NAME}'"
                ),
                vec![OBJECT_NAME],
            )?,
        );

        // settings may override any template for the active dialect
        for key in [
            TemplateKey::PrimaryKey,
            TemplateKey::PrimaryKeyUnnamed,
            TemplateKey::ForeignKey,
            TemplateKey::ForeignKeyUnnamed,
            TemplateKey::ForeignKeyInline,
            TemplateKey::CreateIndex,
            TemplateKey::DropObject,
        ] {
            let prop = format!("template.{}", key.as_str());
            if let Some(text) = settings.get(dialect_id, &prop) {
                let required = store
                    .get(key, "default")
                    .map(|t| t.required.clone())
                    .unwrap_or_default();
                let template = SqlTemplate::new(text, required)?;
                store.insert(key, dialect_id, template);
            }
        }

        Ok(store)
    }

    fn insert_default(&mut self, key: TemplateKey, template: SqlTemplate) {
        self.insert(key, "default", template);
    }

    fn insert(&mut self, key: TemplateKey, dialect_id: &str, template: SqlTemplate) {
        self.templates
            .insert((key.as_str(), dialect_id.to_string()), template);
    }

    /// Look up a template for the dialect, falling back to the default.
    pub fn get(&self, key: TemplateKey, dialect_id: &str) -> Option<&SqlTemplate> {
        self.templates
            .get(&(key.as_str(), dialect_id.to_string()))
            .or_else(|| self.templates.get(&(key.as_str(), "default".to_string())))
    }
}
