//! Fluent accumulator of `must` / `must_not` clauses.

use crate::clause::{Clause, Composite, MatchValue};
use crate::error::QueryError;

/// Collects conditions that only ever accumulate.
///
/// The builder owns its clause lists outright, so `clone()` is the deep copy
/// that lets one baseline be extended independently per day and per variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    must: Vec<Clause>,
    must_not: Vec<Clause>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(&self) -> &[Clause] {
        &self.must
    }

    pub fn must_not(&self) -> &[Clause] {
        &self.must_not
    }

    pub fn require_exists(&mut self, field: &str) -> Result<&mut Self, QueryError> {
        self.must.push(Clause::exists(field)?);
        Ok(self)
    }

    pub fn forbid_exists(&mut self, field: &str) -> Result<&mut Self, QueryError> {
        self.must_not.push(Clause::exists(field)?);
        Ok(self)
    }

    pub fn require_equals(
        &mut self,
        field: &str,
        value: impl Into<MatchValue>,
    ) -> Result<&mut Self, QueryError> {
        self.must.push(Clause::phrase(field, value)?);
        Ok(self)
    }

    pub fn forbid_equals(
        &mut self,
        field: &str,
        value: impl Into<MatchValue>,
    ) -> Result<&mut Self, QueryError> {
        self.must_not.push(Clause::phrase(field, value)?);
        Ok(self)
    }

    pub fn require_one_of<I, V>(&mut self, field: &str, values: I) -> Result<&mut Self, QueryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<MatchValue>,
    {
        self.must.push(Composite::one_of(field, values)?.into_clause());
        Ok(self)
    }

    pub fn forbid_one_of<I, V>(&mut self, field: &str, values: I) -> Result<&mut Self, QueryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<MatchValue>,
    {
        self.must_not.push(Composite::one_of(field, values)?.into_clause());
        Ok(self)
    }

    pub fn require_range(
        &mut self,
        field: &str,
        min: i64,
        max: i64,
        format: &str,
    ) -> Result<&mut Self, QueryError> {
        self.must.push(Clause::range(field, min, max, format)?);
        Ok(self)
    }

    pub fn forbid_range(
        &mut self,
        field: &str,
        min: i64,
        max: i64,
        format: &str,
    ) -> Result<&mut Self, QueryError> {
        self.must_not.push(Clause::range(field, min, max, format)?);
        Ok(self)
    }

    /// Appends every condition of `other` after this builder's own.
    pub fn extend_from(&mut self, other: &QueryBuilder) -> &mut Self {
        self.must.extend(other.must.iter().cloned());
        self.must_not.extend(other.must_not.iter().cloned());
        self
    }

    /// The top-level query: accumulated `must`/`must_not`, a fixed
    /// `match_all` filter and an empty `should`.
    pub fn snapshot(&self) -> Composite {
        Composite {
            minimum_should_match: None,
            must: Some(self.must.clone()),
            filter: Some(vec![Clause::MatchAll]),
            should: Some(Vec::new()),
            must_not: Some(self.must_not.clone()),
        }
    }

    pub fn render(&self) -> String {
        self.snapshot().render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryBuilder {
        let mut builder = QueryBuilder::new();
        builder
            .require_equals("event", "network")
            .unwrap()
            .require_exists("duration")
            .unwrap()
            .forbid_one_of("path", ["read"])
            .unwrap();
        builder
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(
            QueryBuilder::new().render(),
            r#"{"bool":{"must":[],"filter":[{"match_all":{}}],"should":[],"must_not":[]}}"#
        );
    }

    #[test]
    fn test_fluent_chain_preserves_order() {
        let builder = sample();
        assert_eq!(
            builder.render(),
            concat!(
                r#"{"bool":{"must":[{"match_phrase":{"event":{"query":"network"}}},"#,
                r#"{"exists":{"field":"duration"}}],"filter":[{"match_all":{}}],"should":[],"#,
                r#""must_not":[{"bool":{"minimum_should_match":1,"should":[{"match_phrase":{"path":"read"}}]}}]}}"#
            )
        );
    }

    #[test]
    fn test_require_and_forbid_targets() {
        let mut builder = QueryBuilder::new();
        builder
            .require_exists("a")
            .unwrap()
            .forbid_exists("b")
            .unwrap()
            .require_range("c", 1, 2, "")
            .unwrap()
            .forbid_range("d", 3, 4, "")
            .unwrap()
            .require_one_of("e", [1])
            .unwrap()
            .forbid_equals("f", "x")
            .unwrap();

        assert_eq!(builder.must().len(), 3);
        assert_eq!(builder.must_not().len(), 3);
        assert_eq!(builder.must_not()[0], Clause::exists("b").unwrap());
        assert_eq!(builder.must()[1], Clause::range("c", 1, 2, "").unwrap());
    }

    #[test]
    fn test_copy_independence() {
        let original = sample();
        let before = original.render();

        let mut copy = original.clone();
        copy.require_exists("error").unwrap();
        copy.forbid_range("status", 200, 500, "").unwrap();
        copy.require_one_of("uid", ["42"]).unwrap();
        copy.forbid_equals("env", "debug").unwrap();

        assert_eq!(original.render(), before);
        assert_ne!(copy.render(), before);
    }

    #[test]
    fn test_one_of_nothing_is_kept() {
        let mut builder = QueryBuilder::new();
        builder.require_one_of("uid", Vec::<String>::new()).unwrap();
        builder.forbid_one_of("uid", Vec::<String>::new()).unwrap();

        let empty_group = Composite::one_of("uid", Vec::<String>::new()).unwrap().into_clause();
        assert_eq!(builder.must(), &[empty_group.clone()]);
        assert_eq!(builder.must_not(), &[empty_group]);
    }

    #[test]
    fn test_extend_from_appends_in_order() {
        let mut overlay = QueryBuilder::new();
        overlay
            .require_exists("error")
            .unwrap()
            .forbid_range("status", 200, 500, "")
            .unwrap();

        let mut builder = sample();
        builder.extend_from(&overlay);

        assert_eq!(builder.must().len(), 3);
        assert_eq!(builder.must()[2], Clause::exists("error").unwrap());
        assert_eq!(builder.must_not().len(), 2);
        assert_eq!(overlay.must().len(), 1);
    }

    #[test]
    fn test_failed_call_leaves_builder_unchanged() {
        let mut builder = sample();
        let before = builder.clone();
        assert!(builder.require_exists("").is_err());
        assert!(builder.forbid_range("x", 9, 1, "").is_err());
        assert_eq!(builder, before);
    }
}
