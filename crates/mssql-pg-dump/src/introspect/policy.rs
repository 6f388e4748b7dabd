//! Table exclusion rules.

use regex::Regex;

use crate::config::Config;
use crate::core::{TableEntry, TableKind};
use crate::error::{DumpError, Result};

/// Schemas owned by the engine, never exported.
const SYSTEM_SCHEMAS: &[&str] = &["sys", "INFORMATION_SCHEMA", "guest"];

/// Prefix of the fixed database-role schemas (db_owner, db_datareader, ...).
const ROLE_SCHEMA_PREFIX: &str = "db_";

/// Why a catalog object is left out of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Views and engine-internal tables.
    NotBaseTable,
    /// Table lives in a system schema.
    SystemSchema,
    /// Table belongs to a different schema than the one configured.
    OtherSchema,
    /// An include list is set and the table is not on it.
    NotIncluded,
    /// The table matches an exclude pattern.
    Excluded(String),
}

impl Exclusion {
    /// Short reason for log output.
    pub fn reason(&self) -> String {
        match self {
            Exclusion::NotBaseTable => "not a base table".to_string(),
            Exclusion::SystemSchema => "system schema".to_string(),
            Exclusion::OtherSchema => "schema mismatch".to_string(),
            Exclusion::NotIncluded => "not in include list".to_string(),
            Exclusion::Excluded(pattern) => format!("matches exclude pattern '{}'", pattern),
        }
    }
}

/// Decides which catalog objects take part in the export.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    schema: String,
    include: Vec<(String, Regex)>,
    exclude: Vec<(String, Regex)>,
}

impl ExclusionPolicy {
    /// Policy exporting every base table of `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Build the policy from the export configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.source.schema.trim())
            .with_include(&config.export.include_tables)?
            .with_exclude(&config.export.exclude_tables)
    }

    /// Restrict the export to tables matching any of `patterns`.
    pub fn with_include(mut self, patterns: &[String]) -> Result<Self> {
        self.include = compile_all(patterns)?;
        Ok(self)
    }

    /// Leave out tables matching any of `patterns`.
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = compile_all(patterns)?;
        Ok(self)
    }

    /// Configured schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Whether a catalog entry is left out of the export.
    pub fn is_excluded(&self, entry: &TableEntry) -> bool {
        self.classify(entry).is_some()
    }

    /// Classify a catalog entry. `None` means the table is exported.
    pub fn classify(&self, entry: &TableEntry) -> Option<Exclusion> {
        if entry.kind != TableKind::BaseTable {
            return Some(Exclusion::NotBaseTable);
        }
        if is_system_schema(&entry.schema) {
            return Some(Exclusion::SystemSchema);
        }
        if !entry.schema.eq_ignore_ascii_case(&self.schema) {
            return Some(Exclusion::OtherSchema);
        }
        if !self.include.is_empty() && !self.include.iter().any(|(_, re)| re.is_match(&entry.name))
        {
            return Some(Exclusion::NotIncluded);
        }
        if let Some((pattern, _)) = self.exclude.iter().find(|(_, re)| re.is_match(&entry.name)) {
            return Some(Exclusion::Excluded(pattern.clone()));
        }
        None
    }
}

fn is_system_schema(schema: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(schema))
        || schema
            .get(..ROLE_SCHEMA_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(ROLE_SCHEMA_PREFIX))
}

fn compile_all(patterns: &[String]) -> Result<Vec<(String, Regex)>> {
    patterns
        .iter()
        .map(|p| Ok((p.clone(), glob_to_regex(p)?)))
        .collect()
}

/// Compile a glob (`*` any run, `?` one character) into an anchored,
/// case-insensitive regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    if pattern.trim().is_empty() {
        return Err(DumpError::Config("empty table pattern".into()));
    }
    let mut re = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map_err(|e| DumpError::Config(format!("invalid table pattern '{}': {}", pattern, e)))
}
