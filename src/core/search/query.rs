//! Query plans and query fingerprints.
//!
//! A `QueryPlan` is the normalized output of the upstream query
//! pipeline: per-field term clauses, inclusive range clauses and an
//! optional sort. Plans are normalized before fingerprinting so that
//! logically identical queries share one cache entry.
//!
//! Validation rejects plans without constraints, clauses on unknown
//! fields, clauses whose terms reach into another field with
//! `other:term` syntax, and sorts on fields that cannot be read back.

use crate::core::config::{coerce, FieldDataType, FieldRegistry};
use crate::core::error::{IndexError, Result};
use crate::core::types::{FieldValue, FIELD_CONTENT, FIELD_IDENTIFIER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key for an executed query.
///
/// Equal for logically identical queries against the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryFingerprint {
    target: String,
    key: String,
}

impl QueryFingerprint {
    /// Logical target the query runs against
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.key)
    }
}

/// Terms that must match in one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryClause {
    pub field: String,
    pub terms: String,
    /// Any single term suffices instead of all terms
    #[serde(default)]
    pub any_of: bool,
}

/// Inclusive range over a number or datetime field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeClause {
    pub field: String,
    #[serde(default)]
    pub min: Option<FieldValue>,
    #[serde(default)]
    pub max: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub reverse: bool,
}

/// A normalized query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub clauses: Vec<QueryClause>,
    #[serde(default)]
    pub ranges: Vec<RangeClause>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause requiring all `terms` in `field`
    pub fn all_of(mut self, field: &str, terms: &str) -> Self {
        self.clauses.push(QueryClause {
            field: field.to_string(),
            terms: terms.to_string(),
            any_of: false,
        });
        self
    }

    /// Add a clause requiring any of `terms` in `field`
    pub fn any_of(mut self, field: &str, terms: &str) -> Self {
        self.clauses.push(QueryClause {
            field: field.to_string(),
            terms: terms.to_string(),
            any_of: true,
        });
        self
    }

    /// Add an inclusive range clause
    pub fn range(mut self, field: &str, min: Option<FieldValue>, max: Option<FieldValue>) -> Self {
        self.ranges.push(RangeClause {
            field: field.to_string(),
            min,
            max,
        });
        self
    }

    pub fn sorted_by(mut self, field: &str, reverse: bool) -> Self {
        self.sort = Some(SortSpec {
            field: field.to_string(),
            reverse,
        });
        self
    }

    /// Canonical form: whitespace collapsed, terms deduplicated and
    /// ordered, empty clauses dropped, clauses and ranges ordered.
    pub fn normalized(&self) -> QueryPlan {
        let mut clauses: Vec<QueryClause> = self
            .clauses
            .iter()
            .filter_map(|c| {
                let mut terms: Vec<&str> = c.terms.split_whitespace().collect();
                if terms.is_empty() {
                    return None;
                }
                terms.sort_unstable();
                terms.dedup();
                Some(QueryClause {
                    field: c.field.trim().to_string(),
                    terms: terms.join(" "),
                    any_of: c.any_of && terms.len() > 1,
                })
            })
            .collect();
        clauses.sort_by(|a, b| {
            (&a.field, a.any_of, &a.terms).cmp(&(&b.field, b.any_of, &b.terms))
        });
        clauses.dedup();

        let mut ranges: Vec<RangeClause> = self
            .ranges
            .iter()
            .filter(|r| r.min.is_some() || r.max.is_some())
            .map(|r| RangeClause {
                field: r.field.trim().to_string(),
                min: r.min.clone(),
                max: r.max.clone(),
            })
            .collect();
        ranges.sort_by(|a, b| a.field.cmp(&b.field));

        let sort = self.sort.as_ref().map(|s| SortSpec {
            field: s.field.trim().to_string(),
            reverse: s.reverse,
        });

        QueryPlan {
            clauses,
            ranges,
            sort,
        }
    }

    /// Fingerprint of the normalized plan against `target`
    pub fn fingerprint(&self, target: &str) -> QueryFingerprint {
        let normalized = self.normalized();
        // Serializing plain structs of strings and numbers cannot fail
        let key = serde_json::to_string(&normalized).unwrap_or_default();
        QueryFingerprint {
            target: target.to_string(),
            key,
        }
    }

    /// True when the normalized plan constrains nothing
    pub fn is_empty(&self) -> bool {
        let normalized = self.normalized();
        normalized.clauses.is_empty() && normalized.ranges.is_empty()
    }

    /// Validate the plan against the configured fields
    pub fn validate(&self, fields: &FieldRegistry) -> Result<()> {
        let plan = self.normalized();

        if plan.clauses.is_empty() && plan.ranges.is_empty() {
            return Err(IndexError::InvalidQuery(
                "Query does not contain any constraints".to_string(),
            ));
        }

        for clause in &plan.clauses {
            if !is_term_field(&clause.field, fields) {
                return Err(unknown_field(&clause.field, fields));
            }
            check_no_field_reference(clause, fields)?;
        }

        for range in &plan.ranges {
            let datatype = match fields.get(&range.field) {
                None => return Err(unknown_field(&range.field, fields)),
                Some(f) => f.datatype,
            };
            if !matches!(datatype, FieldDataType::Number | FieldDataType::DateTime) {
                return Err(IndexError::InvalidQueryField {
                    field: range.field.clone(),
                    message: "range queries need a number or datetime field".to_string(),
                    valid_fields: range_fields(fields),
                    suggestion: None,
                });
            }
            let min = convert_bound(&range.field, datatype, range.min.as_ref())?;
            let max = convert_bound(&range.field, datatype, range.max.as_ref())?;
            if let (Some(lo), Some(hi)) = (&min, &max) {
                if lo.sort_cmp(hi) == std::cmp::Ordering::Greater {
                    return Err(IndexError::InvalidQuery(format!(
                        "Range on '{}' has min greater than max",
                        range.field
                    )));
                }
            }
        }

        if let Some(sort) = &plan.sort {
            let sortable = sort.field == FIELD_IDENTIFIER
                || fields.get(&sort.field).map(|f| f.stored).unwrap_or(false);
            if !sortable {
                return Err(IndexError::InvalidQueryField {
                    field: sort.field.clone(),
                    message: "sort field must be a stored field".to_string(),
                    valid_fields: fields.stored_names(),
                    suggestion: suggest_field(&sort.field, fields),
                });
            }
        }

        Ok(())
    }
}

/// Convert a range bound to the field's type
pub fn convert_bound(
    field: &str,
    datatype: FieldDataType,
    bound: Option<&FieldValue>,
) -> Result<Option<FieldValue>> {
    match bound {
        None => Ok(None),
        Some(value) => coerce(datatype, value).map(Some).ok_or_else(|| {
            IndexError::InvalidQuery(format!(
                "Range bound {} is not a valid {:?} for field '{}'",
                value.as_text(),
                datatype,
                field
            ))
        }),
    }
}

/// Term clauses may target configured fields, the identifier or the
/// catch-all content field
fn is_term_field(name: &str, fields: &FieldRegistry) -> bool {
    name == FIELD_CONTENT || name == FIELD_IDENTIFIER || fields.get(name).is_some()
}

fn term_fields(fields: &FieldRegistry) -> Vec<String> {
    let mut names = vec![FIELD_CONTENT.to_string(), FIELD_IDENTIFIER.to_string()];
    names.extend(fields.names());
    names
}

fn range_fields(fields: &FieldRegistry) -> Vec<String> {
    fields
        .iter()
        .filter(|f| matches!(f.datatype, FieldDataType::Number | FieldDataType::DateTime))
        .map(|f| f.name.clone())
        .collect()
}

fn unknown_field(name: &str, fields: &FieldRegistry) -> IndexError {
    IndexError::InvalidQueryField {
        field: name.to_string(),
        message: "unknown field".to_string(),
        valid_fields: term_fields(fields),
        suggestion: suggest_field(name, fields),
    }
}

// Pattern to detect potential field prefixes (word:nonspace)
static FIELD_PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+):([^\s:])").unwrap());

/// Reject clauses whose terms address another field (`other:term`).
///
/// Colons inside a token (identifiers such as `oai:repo:1`) and URL
/// schemes are not field references.
fn check_no_field_reference(clause: &QueryClause, fields: &FieldRegistry) -> Result<()> {
    let terms = clause.terms.as_str();
    for cap in FIELD_PREFIX_PATTERN.captures_iter(terms) {
        let Some(whole) = cap.get(0) else { continue };
        let field = &cap[1];

        // Only a prefix if it starts a token
        if whole.start() > 0 {
            let prev = terms[..whole.start()].chars().next_back().unwrap_or(' ');
            if !prev.is_whitespace() {
                continue;
            }
        }

        if matches!(field, "http" | "https" | "ftp" | "mailto" | "urn" | "doi") {
            continue;
        }

        if !is_term_field(field, fields) || field == clause.field {
            continue;
        }

        return Err(IndexError::InvalidQueryField {
            field: field.to_string(),
            message: format!(
                "clause on '{}' must not reference field '{}'",
                clause.field, field
            ),
            valid_fields: vec![clause.field.clone()],
            suggestion: None,
        });
    }
    Ok(())
}

/// Suggest a configured field for a misspelled one
fn suggest_field(name: &str, fields: &FieldRegistry) -> Option<String> {
    let lower = name.to_lowercase();
    term_fields(fields).into_iter().find(|candidate| {
        let c = candidate.to_lowercase();
        c == lower || (lower.len() >= 3 && (c.starts_with(&lower) || lower.starts_with(&c)))
    })
}

/// Escape query-parser syntax so terms are matched literally.
///
/// Special characters that are escaped include: : { } [ ] ( ) @ " \ + - ! ^ ~ *
pub fn escape_all_special(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for ch in s.chars() {
        match ch {
            ':' | '{' | '}' | '[' | ']' | '(' | ')' | '@' | '"' | '\\' | '+' | '-' | '!' | '^'
            | '~' | '*' => {
                result.push('\\');
                result.push(ch);
            }
            _ => result.push(ch),
        }
    }
    result
}
