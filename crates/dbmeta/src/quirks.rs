//! Driver-version-specific quirks.
//!
//! A few drivers need workarounds that are not capabilities of the dialect
//! itself but bugs of a driver generation. They live here as an explicit
//! table keyed by family and an optional driver-version bound instead of
//! inline conditionals scattered through the facade.

use crate::dialect::DialectFamily;

/// Resolved set of workarounds for one connection.
#[derive(Debug, Clone, Default)]
pub struct DriverQuirks {
    /// The driver appends the whole FK definition after a `\000` delimiter
    /// to constraint names; truncate at the delimiter.
    pub fk_name_nul_garbage: bool,
    /// Sentinel values reported for "unbounded" NUMERIC/DECIMAL size and
    /// digits; both must be normalized to zero.
    pub numeric_size_sentinel: Option<(i32, i32)>,
    /// VARCHAR sizes may be byte counts instead of character counts; a
    /// secondary lookup is needed to resolve the semantics.
    pub char_semantics_ambiguous: bool,
}

struct QuirkEntry {
    family: DialectFamily,
    /// Quirk applies to driver major versions strictly below this bound
    /// (None = all versions until proven fixed).
    max_major_version: Option<u32>,
    apply: fn(&mut DriverQuirks),
}

const QUIRKS: &[QuirkEntry] = &[
    QuirkEntry {
        family: DialectFamily::Postgres,
        max_major_version: None,
        apply: |q| q.fk_name_nul_garbage = true,
    },
    QuirkEntry {
        family: DialectFamily::Postgres,
        max_major_version: None,
        apply: |q| q.numeric_size_sentinel = Some((65535, 65531)),
    },
    QuirkEntry {
        family: DialectFamily::Oracle,
        max_major_version: None,
        apply: |q| q.char_semantics_ambiguous = true,
    },
];

impl DriverQuirks {
    /// Resolve the quirks applying to one dialect and driver version.
    pub fn resolve(family: DialectFamily, version: &str) -> Self {
        let major = parse_major(version);
        let mut quirks = DriverQuirks::default();
        for entry in QUIRKS {
            if entry.family != family {
                continue;
            }
            let applies = match (entry.max_major_version, major) {
                (Some(bound), Some(major)) => major < bound,
                _ => true,
            };
            if applies {
                (entry.apply)(&mut quirks);
            }
        }
        quirks
    }

    /// Truncate a constraint name at the `\000` delimiter when the quirk is
    /// active; otherwise return the name unchanged.
    pub fn fix_fk_name<'a>(&self, name: &'a str) -> &'a str {
        if !self.fk_name_nul_garbage {
            return name;
        }
        match name.find("\\000") {
            Some(pos) => &name[..pos],
            None => name,
        }
    }

    /// Normalize a sentinel "unbounded" size/digits pair to zero.
    pub fn fix_numeric_size(&self, size: i32, digits: i32) -> (i32, i32) {
        match self.numeric_size_sentinel {
            Some((s_sentinel, d_sentinel)) => (
                if size == s_sentinel { 0 } else { size },
                if digits == d_sentinel { 0 } else { digits },
            ),
            None => (size, digits),
        }
    }
}

fn parse_major(version: &str) -> Option<u32> {
    version
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())?
        .parse()
        .ok()
}
