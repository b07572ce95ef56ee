//! Two-line multi-search payload wrapping a rendered query.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clause::Clause;

pub const DEFAULT_PAGE_SIZE: usize = 500;

/// The per-deployment constants of the search request. None of these vary
/// between the total and failure queries. The sort and histogram field is
/// not among them: it is the query's own timestamp field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSettings {
    pub index_pattern: String,
    pub preference: i64,
    pub histogram_interval: String,
    pub time_zone: String,
    pub docvalue_fields: Vec<String>,
    pub timeout: String,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            index_pattern: "als-7eb8641d005b55e596cc89e5-*".to_string(),
            preference: 1578910573792,
            histogram_interval: "30m".to_string(),
            time_zone: "Asia/Shanghai".to_string(),
            docvalue_fields: vec![
                "@timestamp".to_string(),
                "data.params.event.ctimestamp".to_string(),
                "data.timestamp".to_string(),
            ],
            timeout: "30000ms".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestEnvelope<'a> {
    query: Clause,
    timestamp_field: &'a str,
    page_size: usize,
    settings: &'a EnvelopeSettings,
}

impl<'a> RequestEnvelope<'a> {
    /// `timestamp_field` is what results are sorted and bucketed on, and
    /// should be the field the query's time range applies to.
    pub fn new(
        query: impl Into<Clause>,
        timestamp_field: &'a str,
        settings: &'a EnvelopeSettings,
    ) -> Self {
        Self {
            query: query.into(),
            timestamp_field,
            page_size: DEFAULT_PAGE_SIZE,
            settings,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn header(&self) -> serde_json::Value {
        json!({
            "index": self.settings.index_pattern,
            "ignore_unavailable": true,
            "preference": self.settings.preference,
        })
    }

    fn body(&self) -> serde_json::Value {
        let settings = self.settings;
        let timestamp_field = self.timestamp_field;
        let docvalue_fields: Vec<_> = settings
            .docvalue_fields
            .iter()
            .map(|field| json!({ "field": field, "format": "date_time" }))
            .collect();

        json!({
            "version": true,
            "size": self.page_size,
            "sort": [{ timestamp_field: { "order": "desc", "unmapped_type": "boolean" } }],
            "_source": { "excludes": [] },
            "aggs": {
                "2": {
                    "date_histogram": {
                        "field": timestamp_field,
                        "interval": settings.histogram_interval,
                        "time_zone": settings.time_zone,
                        "min_doc_count": 1,
                    }
                }
            },
            "stored_fields": ["*"],
            "script_fields": {},
            "docvalue_fields": docvalue_fields,
            "query": self.query,
            "highlight": {
                "pre_tags": ["@kibana-highlighted-field@"],
                "post_tags": ["@/kibana-highlighted-field@"],
                "fields": { "*": {} },
                "fragment_size": 2147483647,
            },
            "timeout": settings.timeout,
        })
    }

    /// Header line and body line, each newline-terminated as the msearch
    /// endpoint requires.
    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.header(), self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QueryBuilder;

    const TIMESTAMP: &str = "data.params.event.ctimestamp";

    #[test]
    fn test_default_envelope_wire_format() {
        let settings = EnvelopeSettings::default();
        let envelope = RequestEnvelope::new(QueryBuilder::new().snapshot(), TIMESTAMP, &settings);

        let expected = concat!(
            r#"{"index":"als-7eb8641d005b55e596cc89e5-*","ignore_unavailable":true,"preference":1578910573792}"#,
            "\n",
            r#"{"version":true,"size":500,"sort":[{"data.params.event.ctimestamp":{"order":"desc","unmapped_type":"boolean"}}],"#,
            r#""_source":{"excludes":[]},"aggs":{"2":{"date_histogram":{"field":"data.params.event.ctimestamp","interval":"30m","time_zone":"Asia/Shanghai","min_doc_count":1}}},"#,
            r#""stored_fields":["*"],"script_fields":{},"docvalue_fields":[{"field":"@timestamp","format":"date_time"},{"field":"data.params.event.ctimestamp","format":"date_time"},{"field":"data.timestamp","format":"date_time"}],"#,
            r#""query":{"bool":{"must":[],"filter":[{"match_all":{}}],"should":[],"must_not":[]}},"#,
            r#""highlight":{"pre_tags":["@kibana-highlighted-field@"],"post_tags":["@/kibana-highlighted-field@"],"fields":{"*":{}},"fragment_size":2147483647},"#,
            r#""timeout":"30000ms"}"#,
            "\n"
        );
        assert_eq!(envelope.render(), expected);
    }

    #[test]
    fn test_page_size() {
        let settings = EnvelopeSettings::default();
        let envelope = RequestEnvelope::new(Clause::MatchAll, TIMESTAMP, &settings);
        assert_eq!(envelope.page_size(), DEFAULT_PAGE_SIZE);

        let rendered = envelope.with_page_size(0).render();
        assert!(rendered.contains(r#"{"version":true,"size":0,"#));
    }

    #[test]
    fn test_query_is_embedded_verbatim() {
        let settings = EnvelopeSettings::default();
        let mut builder = QueryBuilder::new();
        builder.require_range("ts", 1, 2, "epoch_millis").unwrap();
        let query = builder.snapshot();

        let rendered = RequestEnvelope::new(query.clone(), TIMESTAMP, &settings).render();
        assert!(rendered.contains(&format!(r#""query":{},"highlight""#, query.render())));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn test_sort_and_histogram_follow_timestamp_field() {
        let settings = EnvelopeSettings::default();
        let rendered = RequestEnvelope::new(Clause::MatchAll, "event.ts", &settings).render();
        assert!(rendered
            .contains(r#""sort":[{"event.ts":{"order":"desc","unmapped_type":"boolean"}}]"#));
        assert!(rendered.contains(r#""date_histogram":{"field":"event.ts","interval":"30m""#));
    }
}
