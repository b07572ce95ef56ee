//! 配置模块，负责加载JSON配置文件

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::envelope::{EnvelopeSettings, DEFAULT_PAGE_SIZE};
use crate::report_query::QueryProfile;

/// 报表配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    Missing(String),
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 报表配置结构，所有字段都有默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// multi-search 接口地址
    pub endpoint: String,
    /// 额外的HTTP请求头
    pub headers: BTreeMap<String, String>,
    /// 每日索引名前缀，后接 `YYYY.MM.DD`
    pub index_prefix: String,
    /// 按哪个时区切分自然日（相对UTC的分钟数）
    pub utc_offset_minutes: i32,
    pub page_size: usize,
    /// 用户白名单，为空表示不限制用户
    pub user_ids: Vec<String>,
    pub profile: QueryProfile,
    pub envelope: EnvelopeSettings,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("kbn-version".to_string(), "6.7.2".to_string());

        Self {
            endpoint: "http://als.saybot.net/elasticsearch/_msearch?rest_total_hits_as_int=true&ignore_throttled=true"
                .to_string(),
            headers,
            index_prefix: "als-7eb8641d005b55e596cc89e5-".to_string(),
            utc_offset_minutes: 8 * 60,
            page_size: DEFAULT_PAGE_SIZE,
            user_ids: Vec::new(),
            profile: QueryProfile::default(),
            envelope: EnvelopeSettings::default(),
        }
    }
}

impl ReportConfig {
    /// 从JSON文件加载报表配置，缺省的字段使用默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::Missing(display));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_json_config() {
        // 创建临时配置文件
        let temp_file = "test_report_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, r#"{{
            "endpoint": "http://localhost:9200/_msearch",
            "user_ids": ["11173121", "11480843"],
            "profile": {{ "environment": "beta" }}
        }}"#).unwrap();

        let config = ReportConfig::from_json_file(temp_file).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9200/_msearch");
        assert_eq!(config.user_ids.len(), 2);
        assert_eq!(config.profile.environment, "beta");
        assert_eq!(config.profile.event_name, "network");
        assert_eq!(config.page_size, 500);
        assert_eq!(config.envelope, EnvelopeSettings::default());

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let temp_file = "test_invalid_report_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = ReportConfig::from_json_file(temp_file);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = ReportConfig::from_json_file("non_existent_report_config.json");
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_shipped_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/report_config.json");
        let config = ReportConfig::from_json_file(path).unwrap();
        assert_eq!(config.user_ids.len(), 147);
        assert_eq!(config.user_ids[0], "11173121");
        assert_eq!(config.profile, QueryProfile::default());
    }

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.utc_offset_minutes, 480);
        assert!(config.user_ids.is_empty());
        assert_eq!(config.headers.get("kbn-version").map(String::as_str), Some("6.7.2"));
    }
}
