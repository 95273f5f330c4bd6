//! 重试策略
//!
//! 每个渠道可配置最大重试次数（默认 3），只在通知创建时读取一次，
//! 写入记录的 max_retries 字段。退避采用指数增长：
//! 第 1 次重试等 1 分钟，第 2 次等 2 分钟，第 3 次等 4 分钟……

use std::collections::HashMap;

use chrono::Duration;

use crate::models::ChannelType;
use notify_shared::config::RetryConfig;

/// 未配置渠道的最大重试次数
const DEFAULT_MAX_RETRIES: i32 = 3;

/// 指数上限，防止移位溢出（2^20 分钟已近两年，足够封顶）
const MAX_BACKOFF_EXP: i32 = 20;

/// 重试策略
///
/// 启动时由配置构建一次，之后不可变，按引用注入到接入服务。
#[derive(Debug, Clone)]
pub struct RetryProperties {
    default_max_retries: i32,
    overrides: HashMap<String, i32>,
}

impl RetryProperties {
    /// 从应用配置构建
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            default_max_retries: config.default_max_retries,
            overrides: config.max_retries.clone(),
        }
    }

    /// 指定渠道的最大重试次数，未配置时回退到默认值
    pub fn max_retries_for(&self, channel_type: ChannelType) -> i32 {
        self.overrides
            .get(channel_type.config_key())
            .copied()
            .unwrap_or(self.default_max_retries)
    }
}

impl Default for RetryProperties {
    fn default() -> Self {
        Self {
            default_max_retries: DEFAULT_MAX_RETRIES,
            overrides: HashMap::new(),
        }
    }
}

/// 第 retry_count 次失败后的退避时长
///
/// backoff(n) = 2^(n-1) 分钟。retry_count 从 1 开始计数，
/// 传入 0 或负数按 1 处理。
pub fn backoff_delay(retry_count: i32) -> Duration {
    let exp = (retry_count.max(1) - 1).min(MAX_BACKOFF_EXP);
    Duration::minutes(1i64 << exp)
}
