//! 按天生成网络请求成功率报表

use anyhow::{Context, Result};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};
use tracing::{debug, error, info, warn};

use crate::config::ReportConfig;
use crate::envelope::{EnvelopeSettings, RequestEnvelope};
use crate::report_query::{ReportQueryFactory, Session};
use crate::stats::{extract_total_hits, COUNT_UNAVAILABLE};
use crate::transport::SearchTransport;

const INDEX_WIDTH: usize = 40;
const TOTAL_WIDTH: usize = 5;
const COUNT_WIDTH: usize = 7;

/// 从 start 开始连续 days 天
pub fn report_dates(start: NaiveDate, days: u32) -> Result<Vec<NaiveDate>> {
    (0..days)
        .map(|offset| {
            start
                .checked_add_days(Days::new(offset.into()))
                .with_context(|| format!("date out of range: {start} + {offset} days"))
        })
        .collect()
}

/// 某一天的统计结果，计数为 -1 表示未能从响应中取到
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub index: String,
    pub total: i64,
    pub failure: i64,
}

impl DailyReport {
    /// 任一计数不可用时返回 None
    pub fn success(&self) -> Option<i64> {
        if self.total == COUNT_UNAVAILABLE || self.failure == COUNT_UNAVAILABLE {
            return None;
        }
        Some(self.total - self.failure)
    }

    /// 成功率；总数为0或计数不可用时返回 None，而不是算出一个假比例
    pub fn ratio(&self) -> Option<f64> {
        let success = self.success()?;
        if self.total <= 0 {
            return None;
        }
        Some(success as f64 / self.total as f64)
    }

    pub fn row(&self) -> String {
        let success = self
            .success()
            .map_or_else(|| "n/a".to_string(), |s| s.to_string());
        let ratio = self
            .ratio()
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:.4}"));
        format!(
            "{} {} {} {} {}",
            fixed_width(&self.index, INDEX_WIDTH),
            fixed_width(&self.total.to_string(), TOTAL_WIDTH),
            fixed_width(&success, COUNT_WIDTH),
            fixed_width(&self.failure.to_string(), COUNT_WIDTH),
            ratio
        )
    }
}

/// 表头，与 [`DailyReport::row`] 对齐
pub fn header_row() -> String {
    format!(
        "{} {} {} {} ratio",
        fixed_width("index", INDEX_WIDTH),
        fixed_width("total", TOTAL_WIDTH),
        fixed_width("success", COUNT_WIDTH),
        fixed_width("failure", COUNT_WIDTH)
    )
}

/// 截断或居中补空格到固定宽度（按字符计）
pub fn fixed_width(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let head = (width - len) / 2;
    let tail = width - len - head;
    format!("{}{}{}", " ".repeat(head), text, " ".repeat(tail))
}

/// 负责逐日构建查询、发送请求并提取计数
pub struct ReportRunner<T> {
    factory: ReportQueryFactory,
    envelope: EnvelopeSettings,
    transport: T,
    user_ids: Vec<String>,
    index_prefix: String,
    offset: FixedOffset,
    page_size: usize,
}

impl<T: SearchTransport> ReportRunner<T> {
    pub fn new(config: &ReportConfig, transport: T) -> Result<Self> {
        let factory = ReportQueryFactory::new(config.profile.clone())
            .context("invalid query profile")?;
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .with_context(|| {
                format!("invalid utc offset: {} minutes", config.utc_offset_minutes)
            })?;

        Ok(Self {
            factory,
            envelope: config.envelope.clone(),
            transport,
            user_ids: config.user_ids.clone(),
            index_prefix: config.index_prefix.clone(),
            offset,
            page_size: config.page_size,
        })
    }

    /// 当天 00:00:00.000 到 23:59:59.999（本地时区）
    pub fn day_window(
        &self,
        date: NaiveDate,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let start = date
            .and_hms_milli_opt(0, 0, 0, 0)
            .context("invalid start of day")?;
        let end = date
            .and_hms_milli_opt(23, 59, 59, 999)
            .context("invalid end of day")?;
        let start = self
            .offset
            .from_local_datetime(&start)
            .single()
            .context("ambiguous start of day")?;
        let end = self
            .offset
            .from_local_datetime(&end)
            .single()
            .context("ambiguous end of day")?;
        Ok((start, end))
    }

    pub fn session_for(&self, date: NaiveDate) -> Result<Session> {
        let (start, end) = self.day_window(date)?;
        let mut session = self.factory.session();
        session
            .with_user_ids(&self.user_ids)?
            .with_time_range(&start, &end)?;
        Ok(session)
    }

    /// 当天的 (总请求, 失败请求) 两个请求体
    pub fn envelopes_for(&self, date: NaiveDate) -> Result<(String, String)> {
        let session = self.session_for(date)?;
        let timestamp_field = self.factory.profile().timestamp_field.as_str();
        let total = RequestEnvelope::new(session.total_query(), timestamp_field, &self.envelope)
            .with_page_size(self.page_size)
            .render();
        let failure = RequestEnvelope::new(session.failure_query(), timestamp_field, &self.envelope)
            .with_page_size(self.page_size)
            .render();
        Ok((total, failure))
    }

    pub fn index_for(&self, date: NaiveDate) -> String {
        format!("{}{}", self.index_prefix, date.format("%Y.%m.%d"))
    }

    pub async fn run_day(&self, date: NaiveDate) -> Result<DailyReport> {
        let (total_body, failure_body) = self.envelopes_for(date)?;
        let total = self.count(total_body, date, "total").await;
        let failure = self.count(failure_body, date, "failure").await;
        info!(%date, total, failure, "collected daily counts");

        Ok(DailyReport {
            date,
            index: self.index_for(date),
            total,
            failure,
        })
    }

    pub async fn run(&self, start: NaiveDate, days: u32) -> Result<Vec<DailyReport>> {
        let mut reports = Vec::with_capacity(days as usize);
        for date in report_dates(start, days)? {
            reports.push(self.run_day(date).await?);
        }
        Ok(reports)
    }

    /// 请求失败或提取失败都返回 -1，由报表层显式展示
    async fn count(&self, body: String, date: NaiveDate, kind: &str) -> i64 {
        debug!(%date, kind, bytes = body.len(), "posting search request");
        match self.transport.post(body).await {
            Ok(response) => {
                let count = extract_total_hits(&response);
                if count == COUNT_UNAVAILABLE {
                    warn!(%date, kind, "no hit count found in search response");
                }
                count
            }
            Err(e) => {
                error!(%date, kind, error = ?e, "search request failed");
                COUNT_UNAVAILABLE
            }
        }
    }
}
