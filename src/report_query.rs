//! Baseline filters for network-request reports and the per-day sessions
//! derived from them.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::builder::QueryBuilder;
use crate::clause::Composite;
use crate::error::QueryError;

/// Field names and fixed values that define which events count as network
/// requests and which of those count as failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryProfile {
    pub event_name_field: String,
    pub event_name: String,
    pub required_fields: Vec<String>,
    pub environment_field: String,
    pub environment: String,
    pub path_field: String,
    pub allowed_paths: Vec<String>,
    pub denied_paths: Vec<String>,
    pub timestamp_field: String,
    pub user_id_field: String,

    /// Present only on requests that came back with an error body.
    pub error_field: String,
    pub status_code_field: String,
    /// Status codes inside `[min, max]` are not failures.
    pub normal_status_min: i64,
    pub normal_status_max: i64,
    /// Client-side sentinel codes (cancelled, offline...) excluded from failures.
    pub benign_status_codes: Vec<i64>,
}

impl Default for QueryProfile {
    fn default() -> Self {
        Self {
            event_name_field: "data.params.event.name.keyword".to_string(),
            event_name: "network".to_string(),
            required_fields: vec![
                "data.params.event.duration".to_string(),
                "data.params.user.uid".to_string(),
            ],
            environment_field: "data.params.app.environment.keyword".to_string(),
            environment: "release".to_string(),
            path_field: "data.params.event.network.path".to_string(),
            allowed_paths: vec!["tasks".to_string(), "task_url".to_string()],
            denied_paths: vec![
                "awj_lessons".to_string(),
                "wisdom_course".to_string(),
                "read".to_string(),
                "next_lesson".to_string(),
            ],
            timestamp_field: "data.params.event.ctimestamp".to_string(),
            user_id_field: "data.params.user.uid".to_string(),
            error_field: "data.params.event.network.error_response".to_string(),
            status_code_field: "data.params.event.network.status_code".to_string(),
            normal_status_min: 200,
            normal_status_max: 500,
            benign_status_codes: vec![-1009, -1005, -999, -101],
        }
    }
}

/// Builds the baseline once and hands out independent [`Session`]s.
#[derive(Debug, Clone)]
pub struct ReportQueryFactory {
    baseline: QueryBuilder,
    failure_overlay: QueryBuilder,
    profile: Arc<QueryProfile>,
}

impl ReportQueryFactory {
    pub fn new(profile: QueryProfile) -> Result<Self, QueryError> {
        let mut baseline = QueryBuilder::new();
        baseline.require_equals(&profile.event_name_field, profile.event_name.as_str())?;
        for field in &profile.required_fields {
            baseline.require_exists(field)?;
        }
        baseline
            .require_equals(&profile.environment_field, profile.environment.as_str())?
            .require_one_of(&profile.path_field, &profile.allowed_paths)?
            .forbid_one_of(&profile.path_field, &profile.denied_paths)?;

        let mut failure_overlay = QueryBuilder::new();
        failure_overlay
            .require_exists(&profile.error_field)?
            .forbid_range(
                &profile.status_code_field,
                profile.normal_status_min,
                profile.normal_status_max,
                "",
            )?
            .forbid_one_of(
                &profile.status_code_field,
                profile.benign_status_codes.iter().copied(),
            )?;

        Ok(Self {
            baseline,
            failure_overlay,
            profile: Arc::new(profile),
        })
    }

    pub fn baseline(&self) -> &QueryBuilder {
        &self.baseline
    }

    pub fn profile(&self) -> &QueryProfile {
        &self.profile
    }

    /// A fresh copy of the baseline, owned by the caller.
    pub fn session(&self) -> Session {
        Session {
            query: self.baseline.clone(),
            failure_overlay: self.failure_overlay.clone(),
            profile: Arc::clone(&self.profile),
            time_ranges: 0,
        }
    }
}

/// One report's view of the baseline, narrowed to a time window and users.
#[derive(Debug, Clone)]
pub struct Session {
    query: QueryBuilder,
    failure_overlay: QueryBuilder,
    profile: Arc<QueryProfile>,
    time_ranges: usize,
}

impl Session {
    /// Restricts to `[start, end]` in epoch milliseconds, both ends inclusive.
    /// A second call adds another range; both then have to hold.
    pub fn with_time_range<Tz: TimeZone>(
        &mut self,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<&mut Self, QueryError> {
        self.with_time_range_millis(start.timestamp_millis(), end.timestamp_millis())
    }

    pub fn with_time_range_millis(
        &mut self,
        start: i64,
        end: i64,
    ) -> Result<&mut Self, QueryError> {
        self.query
            .require_range(&self.profile.timestamp_field, start, end, "epoch_millis")?;
        self.time_ranges += 1;
        if self.time_ranges > 1 {
            warn!(
                ranges = self.time_ranges,
                "time range applied more than once; ranges are intersected"
            );
        }
        Ok(self)
    }

    /// Restricts to the given users. An empty list means no restriction.
    pub fn with_user_ids<I, S>(&mut self, ids: I) -> Result<&mut Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = ids
            .into_iter()
            .enumerate()
            .map(|(position, id)| match id.as_ref() {
                "" => Err(QueryError::EmptyUserId { position }),
                id => Ok(id.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !ids.is_empty() {
            self.query.require_one_of(&self.profile.user_id_field, ids)?;
        }
        Ok(self)
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub fn total_query(&self) -> Composite {
        self.query.snapshot()
    }

    /// The session's conditions plus the failure criteria, built on a copy so
    /// the session itself is left as it was.
    pub fn failure_query(&self) -> Composite {
        let mut failed = self.query.clone();
        failed.extend_from(&self.failure_overlay);
        failed.snapshot()
    }

    pub fn render_total_query(&self) -> String {
        self.total_query().render()
    }

    pub fn render_failure_query(&self) -> String {
        self.failure_query().render()
    }
}
