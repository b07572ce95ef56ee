//! Boolean search clauses and their wire rendering.
//!
//! A clause is rendered by serializing it through serde into the JSON shape the
//! search backend expects, so key order and separators are decided by the
//! serializer instead of by hand-built strings.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::QueryError;

/// The value a phrase match compares against. Numbers render unquoted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum MatchValue {
    Text(String),
    Number(i64),
}

impl MatchValue {
    fn is_blank(&self) -> bool {
        matches!(self, MatchValue::Text(s) if s.is_empty())
    }
}

impl From<&str> for MatchValue {
    fn from(value: &str) -> Self {
        MatchValue::Text(value.to_string())
    }
}

impl From<String> for MatchValue {
    fn from(value: String) -> Self {
        MatchValue::Text(value)
    }
}

impl From<&String> for MatchValue {
    fn from(value: &String) -> Self {
        MatchValue::Text(value.clone())
    }
}

impl From<i64> for MatchValue {
    fn from(value: i64) -> Self {
        MatchValue::Number(value)
    }
}

impl From<i32> for MatchValue {
    fn from(value: i32) -> Self {
        MatchValue::Number(value.into())
    }
}

/// How a phrase match is wrapped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseForm {
    /// `{"match_phrase":{field:{"query":value}}}`, used for top-level equality.
    Query,
    /// `{"match_phrase":{field:value}}`, used inside `should` groups.
    Bare,
}

/// An inclusive `[min, max]` range over one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeClause {
    pub field: String,
    pub min: i64,
    pub max: i64,
    /// Date format hint such as `epoch_millis`; empty means plain numbers.
    pub format: String,
}

/// A single search predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    MatchAll,
    Exists { field: String },
    PhraseMatch {
        field: String,
        value: MatchValue,
        form: PhraseForm,
    },
    Range(RangeClause),
    Bool(Composite),
}

/// A `bool` combinator. `None` lists are omitted from the output, while
/// `Some(vec![])` renders as `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Composite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must: Option<Vec<Clause>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<Clause>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should: Option<Vec<Clause>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_not: Option<Vec<Clause>>,
}

fn check_field(field: &str, operation: &'static str) -> Result<(), QueryError> {
    if field.is_empty() {
        Err(QueryError::EmptyField { operation })
    } else {
        Ok(())
    }
}

impl Clause {
    pub fn exists(field: impl Into<String>) -> Result<Self, QueryError> {
        let field = field.into();
        check_field(&field, "exists")?;
        Ok(Clause::Exists { field })
    }

    /// Phrase equality in the `query`-wrapped form.
    pub fn phrase(
        field: impl Into<String>,
        value: impl Into<MatchValue>,
    ) -> Result<Self, QueryError> {
        Self::phrase_with_form(field.into(), value.into(), PhraseForm::Query)
    }

    /// Phrase equality in the bare form used by one-of groups.
    pub fn bare_phrase(
        field: impl Into<String>,
        value: impl Into<MatchValue>,
    ) -> Result<Self, QueryError> {
        Self::phrase_with_form(field.into(), value.into(), PhraseForm::Bare)
    }

    fn phrase_with_form(
        field: String,
        value: MatchValue,
        form: PhraseForm,
    ) -> Result<Self, QueryError> {
        check_field(&field, "match_phrase")?;
        if value.is_blank() {
            return Err(QueryError::EmptyValue { field });
        }
        Ok(Clause::PhraseMatch { field, value, form })
    }

    pub fn range(
        field: impl Into<String>,
        min: i64,
        max: i64,
        format: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let field = field.into();
        check_field(&field, "range")?;
        if min > max {
            return Err(QueryError::InvertedRange { field, min, max });
        }
        Ok(Clause::Range(RangeClause {
            field,
            min,
            max,
            format: format.into(),
        }))
    }

    /// Wire-format JSON for this clause. Rendering twice yields identical text.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Composite {
    /// `should` holds one bare phrase per value and one of them has to match.
    /// An empty `values` gives a group that matches nothing.
    pub fn one_of<I, V>(field: &str, values: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<MatchValue>,
    {
        check_field(field, "one_of")?;
        let should = values
            .into_iter()
            .map(|v| Clause::bare_phrase(field, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Composite {
            minimum_should_match: Some(1),
            should: Some(should),
            ..Default::default()
        })
    }

    pub fn into_clause(self) -> Clause {
        Clause::Bool(self)
    }

    pub fn render(&self) -> String {
        Clause::Bool(self.clone()).render()
    }
}

impl From<Composite> for Clause {
    fn from(composite: Composite) -> Self {
        Clause::Bool(composite)
    }
}

/// A one-entry JSON object with a runtime key.
struct Entry<'a, V: ?Sized>(&'a str, &'a V);

impl<V: Serialize + ?Sized> Serialize for Entry<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

struct EmptyObject;

impl Serialize for EmptyObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

#[derive(serde::Serialize)]
struct RangeBounds<'a> {
    gte: i64,
    lte: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Clause::MatchAll => Entry("match_all", &EmptyObject).serialize(serializer),
            Clause::Exists { field } => {
                Entry("exists", &Entry("field", field.as_str())).serialize(serializer)
            }
            Clause::PhraseMatch { field, value, form: PhraseForm::Query } => {
                Entry("match_phrase", &Entry(field, &Entry("query", value))).serialize(serializer)
            }
            Clause::PhraseMatch { field, value, form: PhraseForm::Bare } => {
                Entry("match_phrase", &Entry(field, value)).serialize(serializer)
            }
            Clause::Range(range) => {
                let bounds = RangeBounds {
                    gte: range.min,
                    lte: range.max,
                    format: Some(range.format.as_str()).filter(|f| !f.is_empty()),
                };
                Entry("range", &Entry(&range.field, &bounds)).serialize(serializer)
            }
            Clause::Bool(composite) => Entry("bool", composite).serialize(serializer),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
