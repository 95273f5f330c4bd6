//! 传输提供方
//!
//! Provider 是对外部投递服务商的最底层抽象：把 payload 发往一个目的地字符串。
//! 当前为模拟实现（仅记录日志并按概率模拟失败），便于在无外部依赖的情况下
//! 完整跑通调度管道。接入真实服务商 SDK 时只需实现同一 trait。

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info};

use notify_shared::error::{NotifyError, Result};

/// 传输提供方 trait
#[async_trait]
pub trait Provider: Send + Sync {
    /// 向目的地投递 payload，任何失败以错误返回，成功无返回值
    async fn send(&self, destination: &str, payload: &str) -> Result<()>;
}

/// 按概率掷骰模拟服务商失败
fn roll_failure(failure_rate: f64) -> bool {
    failure_rate > 0.0 && rand::rng().random::<f64>() < failure_rate
}

// ---------------------------------------------------------------------------
// 邮件提供方
// ---------------------------------------------------------------------------

/// 模拟邮件服务商
///
/// 生产环境中替换为 SMTP 或邮件服务商（如 SendGrid）的 API 调用
pub struct MockEmailProvider {
    failure_rate: f64,
}

impl MockEmailProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

impl Default for MockEmailProvider {
    fn default() -> Self {
        Self { failure_rate: 0.2 }
    }
}

#[async_trait]
impl Provider for MockEmailProvider {
    async fn send(&self, destination: &str, payload: &str) -> Result<()> {
        info!(destination, "模拟发送邮件");
        debug!(payload, "邮件内容");

        if roll_failure(self.failure_rate) {
            return Err(NotifyError::SendFailed {
                channel: "EMAIL".to_string(),
                reason: "模拟邮件服务商故障".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 短信提供方
// ---------------------------------------------------------------------------

/// 模拟短信服务商
///
/// 生产环境中替换为短信服务商（如 Twilio）的 API 调用
pub struct MockSmsProvider {
    failure_rate: f64,
}

impl MockSmsProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

impl Default for MockSmsProvider {
    fn default() -> Self {
        Self { failure_rate: 0.15 }
    }
}

#[async_trait]
impl Provider for MockSmsProvider {
    async fn send(&self, destination: &str, payload: &str) -> Result<()> {
        info!(destination, "模拟发送短信");
        debug!(payload, "短信内容");

        if roll_failure(self.failure_rate) {
            return Err(NotifyError::SendFailed {
                channel: "SMS".to_string(),
                reason: "模拟短信服务商故障".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 推送提供方
// ---------------------------------------------------------------------------

/// 模拟推送服务商
///
/// 生产环境中替换为 APNs / FCM 等推送服务的 SDK 调用
pub struct MockPushProvider {
    failure_rate: f64,
}

impl MockPushProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

impl Default for MockPushProvider {
    fn default() -> Self {
        Self { failure_rate: 0.1 }
    }
}

#[async_trait]
impl Provider for MockPushProvider {
    async fn send(&self, destination: &str, payload: &str) -> Result<()> {
        info!(destination, "模拟发送 APP 推送");
        debug!(payload, "推送内容");

        if roll_failure(self.failure_rate) {
            return Err(NotifyError::SendFailed {
                channel: "PUSH".to_string(),
                reason: "模拟推送服务商故障".to_string(),
            });
        }
        Ok(())
    }
}
