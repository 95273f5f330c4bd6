//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 调度路径上的渠道发送错误一律视为同一类失败，由调度器转化为状态迁移，
//! 不在此处区分可重试与不可重试。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum NotifyError {
    // ==================== 基础设施错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 调用方可见的同步错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("不支持的通知渠道: {channel}")]
    UnsupportedChannel { channel: String },

    // ==================== 调度路径错误 ====================
    #[error("渠道终端未配置: user_id={user_id} channel={channel}")]
    EndpointMissing { user_id: i64, channel: String },

    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: String, reason: String },

    #[error("通知发送超时: 渠道={channel}")]
    SendTimeout { channel: String },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, NotifyError>;

impl NotifyError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnsupportedChannel { .. } => "UNSUPPORTED_CHANNEL",
            Self::EndpointMissing { .. } => "ENDPOINT_MISSING",
            Self::SendFailed { .. } => "SEND_FAILED",
            Self::SendTimeout { .. } => "SEND_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
