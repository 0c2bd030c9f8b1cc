//! Statement classification over sanitized text.
//!
//! Checks run in a fixed order and the first failure wins:
//! statement kind, single statement, forbidden keywords, then the
//! CTE and PRAGMA refinements.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Result, WardenError};

use super::sanitizer::{is_word_char, sanitize, SanitizedStatement};
use super::{RejectionReason, ValidationVerdict};

/// Statement kinds that may start an accepted statement.
pub const ALLOWED_STATEMENT_KINDS: &[&str] = &["SELECT", "WITH", "EXPLAIN", "PRAGMA"];

/// Write, DDL and session verbs that must never appear as real syntax.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "TRUNCATE",
    "EXEC",
    "GRANT",
    "REVOKE",
    "CREATE",
    "ATTACH",
    "DETACH",
    "REPLACE",
    "VACUUM",
    "SAVEPOINT",
    "RELEASE",
    "REINDEX",
];

/// Pragmas refused under [`PragmaPolicy::DenyWritable`] even without an
/// assignment, because they act on the file or the connection when run.
pub const WRITABLE_PRAGMAS: &[&str] = &[
    "journal_mode",
    "locking_mode",
    "writable_schema",
    "auto_vacuum",
    "incremental_vacuum",
    "query_only",
    "wal_checkpoint",
    "optimize",
    "shrink_memory",
    "schema_version",
    "user_version",
    "application_id",
];

/// Pragmas whose parenthesised argument names an object to inspect rather
/// than a new value. Any other `PRAGMA name(value)` is an assignment.
pub const ARGUMENT_READ_PRAGMAS: &[&str] = &[
    "table_info",
    "table_xinfo",
    "index_list",
    "index_info",
    "index_xinfo",
    "foreign_key_list",
    "foreign_key_check",
    "integrity_check",
    "quick_check",
];

/// How PRAGMA statements are treated once they pass the keyword checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PragmaPolicy {
    /// Refuse assignments and side-effecting pragmas.
    #[default]
    DenyWritable,
    /// Accept every PRAGMA; the read-only connection is the only guard.
    AllowAll,
}

impl FromStr for PragmaPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deny-writable" => Ok(Self::DenyWritable),
            "allow-all" => Ok(Self::AllowAll),
            _ => Err(format!(
                "Unknown PRAGMA policy: {s}. Expected: deny-writable or allow-all"
            )),
        }
    }
}

/// Classifier deciding whether a statement may reach the execution guard.
#[derive(Debug, Clone)]
pub struct SqlClassifier {
    forbidden: Vec<String>,
    pragma_policy: PragmaPolicy,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a classifier with the built-in blocklist and the default
    /// PRAGMA policy.
    pub fn new() -> Self {
        Self {
            forbidden: FORBIDDEN_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            pragma_policy: PragmaPolicy::default(),
        }
    }

    /// Adds deployment-specific keywords to the blocklist.
    ///
    /// Keywords are matched as whole words, so each entry must be a single
    /// word made of letters, digits and underscores.
    pub fn with_extra_keywords<I, S>(mut self, keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() || !keyword.chars().all(is_word_char) {
                return Err(WardenError::config(format!(
                    "Forbidden keyword '{keyword}' must be a single word"
                )));
            }
            let keyword = keyword.to_ascii_uppercase();
            if !self.forbidden.contains(&keyword) {
                self.forbidden.push(keyword);
            }
        }
        Ok(self)
    }

    /// Sets the PRAGMA policy.
    pub fn with_pragma_policy(mut self, policy: PragmaPolicy) -> Self {
        self.pragma_policy = policy;
        self
    }

    /// Returns the active blocklist, uppercase.
    pub fn forbidden_keywords(&self) -> &[String] {
        &self.forbidden
    }

    /// Returns the active PRAGMA policy.
    pub fn pragma_policy(&self) -> PragmaPolicy {
        self.pragma_policy
    }

    /// Sanitizes and classifies raw SQL text.
    pub fn validate(&self, sql: &str) -> ValidationVerdict {
        self.validate_sanitized(&sanitize(sql))
    }

    /// Classifies text that has already been sanitized.
    pub fn validate_sanitized(&self, sanitized: &SanitizedStatement) -> ValidationVerdict {
        match self.check(sanitized.as_str()) {
            Ok(()) => ValidationVerdict::Allowed,
            Err(reason) => ValidationVerdict::Rejected(reason),
        }
    }

    fn check(&self, text: &str) -> std::result::Result<(), RejectionReason> {
        let kind = check_statement_kind(text)?;
        check_single_statement(text)?;
        self.check_forbidden_keywords(text)?;

        if kind == "WITH"
            && !words(text).any(|(_, word)| word.eq_ignore_ascii_case("SELECT"))
        {
            return Err(RejectionReason::NotSelectLike { found: Some(kind) });
        }
        if kind == "PRAGMA" {
            self.check_pragma(text)?;
        }
        Ok(())
    }

    fn check_forbidden_keywords(&self, text: &str) -> std::result::Result<(), RejectionReason> {
        for (offset, word) in words(text) {
            let upper = word.to_ascii_uppercase();
            if self.forbidden.contains(&upper) {
                return Err(RejectionReason::ForbiddenKeyword {
                    keyword: upper,
                    offset,
                });
            }
        }
        Ok(())
    }

    fn check_pragma(&self, text: &str) -> std::result::Result<(), RejectionReason> {
        if self.pragma_policy == PragmaPolicy::AllowAll {
            return Ok(());
        }

        // A masked (quoted) pragma name cannot be judged, so it is refused.
        let Some(caps) = pragma_head().captures(text) else {
            return Err(RejectionReason::UnsafePragma {
                pragma: "<unnamed>".to_string(),
            });
        };

        let name = caps
            .name("name")
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        let assigns = caps.name("assign").is_some()
            || (caps.name("call").is_some() && !ARGUMENT_READ_PRAGMAS.contains(&name.as_str()));

        if assigns || WRITABLE_PRAGMAS.contains(&name.as_str()) {
            return Err(RejectionReason::UnsafePragma { pragma: name });
        }
        Ok(())
    }
}

/// Classifies a statement with the default classifier.
pub fn validate_sql(sql: &str) -> ValidationVerdict {
    SqlClassifier::new().validate(sql)
}

/// Returns the uppercase leading keyword if it is an allowed kind.
fn check_statement_kind(text: &str) -> std::result::Result<String, RejectionReason> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(RejectionReason::NotSelectLike { found: None });
    }

    let end = trimmed
        .find(|c: char| !is_word_char(c))
        .unwrap_or(trimmed.len());
    let token = if end == 0 {
        trimmed.chars().take(1).collect::<String>()
    } else {
        trimmed[..end].to_ascii_uppercase()
    };

    if ALLOWED_STATEMENT_KINDS.contains(&token.as_str()) {
        Ok(token)
    } else {
        Err(RejectionReason::NotSelectLike { found: Some(token) })
    }
}

/// A `;` may only be followed by whitespace.
fn check_single_statement(text: &str) -> std::result::Result<(), RejectionReason> {
    let Some(idx) = text.find(';') else {
        return Ok(());
    };
    let rest = &text[idx + 1..];
    match rest.find(|c: char| !c.is_whitespace()) {
        Some(pos) => Err(RejectionReason::MultipleStatements {
            offset: idx + 1 + pos,
        }),
        None => Ok(()),
    }
}

/// Iterates over maximal runs of word characters with their byte offsets.
fn words(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let mut start: Option<usize> = None;
    text.char_indices()
        .chain(std::iter::once((text.len(), ' ')))
        .filter_map(move |(idx, ch)| {
            if is_word_char(ch) {
                start.get_or_insert(idx);
                None
            } else {
                start.take().map(|s| (s, &text[s..idx]))
            }
        })
}

fn pragma_head() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*PRAGMA\s+(?:\w+\s*\.\s*)?(?P<name>\w+)\s*(?:(?P<assign>=)|(?P<call>\())?")
            .expect("PRAGMA head pattern is valid")
    })
}
