//! Identifier quoting and case-folding policy.
//!
//! Derived once from the dialect profile and the keyword set. Both
//! `quote_object_name` and the case adjusters are idempotent: quoting a
//! quoted name and folding an already-folded name are no-ops.

use std::collections::HashSet;

use crate::dialect::{CaseFolding, DialectProfile};

/// Quoting and case rules for one dialect.
#[derive(Debug, Clone)]
pub struct IdentifierPolicy {
    quote_char: String,
    never_quote: bool,
    quote_digit_identifiers: bool,
    object_case: CaseFolding,
    schema_case: CaseFolding,
    /// Uppercased keyword set for this dialect.
    keywords: HashSet<String>,
}

impl IdentifierPolicy {
    pub fn new(profile: &DialectProfile, keywords: HashSet<String>) -> Self {
        Self {
            quote_char: profile.quote_char.clone(),
            never_quote: profile.never_quote,
            quote_digit_identifiers: profile.quote_digit_identifiers,
            object_case: profile.object_case.effective(),
            schema_case: profile.schema_case.effective(),
            keywords,
        }
    }

    pub fn quote_char(&self) -> &str {
        &self.quote_char
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains(&name.trim().to_uppercase())
    }

    /// Enclose the name in the dialect quote character when necessary.
    ///
    /// Quoting is needed when the name starts with a digit (on dialects that
    /// require it), when its case does not match the dialect's folding mode,
    /// or when it is a reserved word. Otherwise a generic special-character
    /// check applies. Already-quoted names pass through unchanged.
    pub fn quote_object_name(&self, name: &str, force: bool) -> String {
        if name.is_empty() {
            return String::new();
        }
        if name.starts_with(&self.quote_char) {
            return name.to_string();
        }
        if self.never_quote {
            return trim_quotes(name, &self.quote_char).to_string();
        }

        let mut need_quote = force;

        if !need_quote && self.quote_digit_identifiers {
            need_quote = name.chars().next().is_some_and(|c| c.is_ascii_digit());
        }

        if !need_quote && self.object_case != CaseFolding::Mixed {
            need_quote = match self.object_case {
                CaseFolding::Lower => !is_lower_case(name),
                CaseFolding::Upper => !is_upper_case(name),
                _ => false,
            };
        }

        if need_quote || self.is_keyword(name) {
            return format!("{}{}{}", self.quote_char, name.trim(), self.quote_char);
        }

        // not a keyword: quote only when the name carries special characters
        quote_special_chars(name, &self.quote_char)
    }

    /// Fold an object name to the case in which the server stores it.
    ///
    /// Names containing the quote character are returned trimmed and
    /// otherwise unchanged.
    pub fn adjust_object_name_case(&self, name: &str) -> String {
        adjust_case(name, self.object_case, &self.quote_char)
    }

    /// Fold a schema name; the schema mode may differ from the object mode.
    pub fn adjust_schema_name_case(&self, name: &str) -> String {
        adjust_case(name, self.schema_case, &self.quote_char)
    }

    /// Does the name's case already match the dialect's stored case?
    pub fn is_default_case(&self, name: &str) -> bool {
        match self.object_case {
            CaseFolding::Mixed | CaseFolding::DriverReported(_) => true,
            CaseFolding::Upper => is_upper_case(name),
            CaseFolding::Lower => is_lower_case(name),
        }
    }
}

fn adjust_case(name: &str, mode: CaseFolding, quote_char: &str) -> String {
    if name.contains(quote_char) {
        return name.trim().to_string();
    }
    match mode {
        CaseFolding::Upper => name.trim().to_uppercase(),
        CaseFolding::Lower => name.trim().to_lowercase(),
        _ => name.trim().to_string(),
    }
}

/// Quote the name when it contains anything other than letters, digits or
/// underscore. Dialect-independent fallback check.
pub fn quote_special_chars(name: &str, quote_char: &str) -> String {
    let clean = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if clean {
        name.to_string()
    } else {
        format!("{quote_char}{}{quote_char}", name.trim())
    }
}

/// Strip a leading/trailing quote character pair.
pub fn trim_quotes<'a>(name: &'a str, quote_char: &str) -> &'a str {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(quote_char)
        .and_then(|s| s.strip_suffix(quote_char))
        .unwrap_or(trimmed)
}

fn is_upper_case(name: &str) -> bool {
    !name.chars().any(|c| c.is_lowercase())
}

fn is_lower_case(name: &str) -> bool {
    !name.chars().any(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectFamily, DialectProfile};

    fn profile(object_case: CaseFolding) -> DialectProfile {
        DialectProfile {
            family: DialectFamily::Generic,
            dialect_id: "test".into(),
            product_name: "Test".into(),
            product_version: String::new(),
            schema_term: "Schema".into(),
            catalog_term: "Catalog".into(),
            quote_char: "\"".into(),
            ddl_needs_commit: false,
            use_jdbc_commit: false,
            create_inline_constraints: false,
            use_null_keyword: true,
            supports_catalogs: false,
            supports_get_primary_keys: true,
            quote_digit_identifiers: false,
            never_quote: false,
            object_case,
            schema_case: object_case,
        }
    }

    fn policy(case: CaseFolding) -> IdentifierPolicy {
        let keywords = ["ORDER", "SELECT", "TABLE"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        IdentifierPolicy::new(&profile(case), keywords)
    }

    #[test]
    fn keyword_is_quoted_plain_name_is_not() {
        let p = policy(CaseFolding::Upper);
        assert_eq!(p.quote_object_name("ORDER", false), "\"ORDER\"");
        assert_eq!(p.quote_object_name("ID", false), "ID");
    }

    #[test]
    fn quoting_is_idempotent() {
        let p = policy(CaseFolding::Upper);
        for name in ["ORDER", "ID", "lower", "with space", "9lives"] {
            let once = p.quote_object_name(name, false);
            let twice = p.quote_object_name(&once, false);
            assert_eq!(once, twice, "quoting not idempotent for {name}");
        }
    }

    #[test]
    fn case_mismatch_forces_quoting() {
        let p = policy(CaseFolding::Upper);
        assert_eq!(p.quote_object_name("MixedName", false), "\"MixedName\"");
        let p = policy(CaseFolding::Lower);
        assert_eq!(p.quote_object_name("MixedName", false), "\"MixedName\"");
        let p = policy(CaseFolding::Mixed);
        assert_eq!(p.quote_object_name("MixedName", false), "MixedName");
    }

    #[test]
    fn digit_led_names_quoted_when_configured() {
        let mut prof = profile(CaseFolding::Upper);
        prof.quote_digit_identifiers = true;
        let p = IdentifierPolicy::new(&prof, HashSet::new());
        assert_eq!(p.quote_object_name("9LIVES", false), "\"9LIVES\"");
        assert_eq!(p.quote_object_name("LIVES9", false), "LIVES9");
    }

    #[test]
    fn special_characters_use_generic_check() {
        let p = policy(CaseFolding::Upper);
        assert_eq!(p.quote_object_name("MY TABLE", false), "\"MY TABLE\"");
        assert_eq!(p.quote_object_name("MY$TABLE", false), "\"MY$TABLE\"");
        assert_eq!(p.quote_object_name("MY_TABLE", false), "MY_TABLE");
    }

    #[test]
    fn never_quote_returns_trimmed_raw_name() {
        let mut prof = profile(CaseFolding::Upper);
        prof.never_quote = true;
        let p = IdentifierPolicy::new(&prof, HashSet::new());
        assert_eq!(p.quote_object_name("\"ORDER\"", false), "\"ORDER\"");
        assert_eq!(p.quote_object_name("PLAIN", true), "PLAIN");
    }

    #[test]
    fn case_adjustment_is_idempotent_and_skips_quoted() {
        let p = policy(CaseFolding::Upper);
        assert_eq!(p.adjust_object_name_case("orders"), "ORDERS");
        assert_eq!(p.adjust_object_name_case("ORDERS"), "ORDERS");
        assert_eq!(p.adjust_object_name_case("\"orders\""), "\"orders\"");

        let p = policy(CaseFolding::Lower);
        let once = p.adjust_object_name_case("Orders");
        assert_eq!(once, "orders");
        assert_eq!(p.adjust_object_name_case(&once), once);
    }

    #[test]
    fn schema_case_can_differ_from_object_case() {
        let mut prof = profile(CaseFolding::Upper);
        prof.schema_case = CaseFolding::Lower;
        let p = IdentifierPolicy::new(&prof, HashSet::new());
        assert_eq!(p.adjust_object_name_case("x"), "X");
        assert_eq!(p.adjust_schema_name_case("X"), "x");
    }

    #[test]
    fn default_case_check() {
        let p = policy(CaseFolding::Upper);
        assert!(p.is_default_case("ORDERS"));
        assert!(!p.is_default_case("Orders"));
        let p = policy(CaseFolding::Mixed);
        assert!(p.is_default_case("Orders"));
    }
}
