//! 通知调度引擎
//!
//! 多渠道（邮件 / 短信 / 推送）通知的持久化、轮询与投递：
//! at-least-once 语义、指数退避重试、死信落库、循环通知重排期。
//!
//! 分层：
//! - `service`：接入面（创建 / 批量创建 / 查询 / 终端注册）
//! - `poller` + `dispatcher`：周期扫描与状态机驱动
//! - `channel` + `provider`：渠道能力与底层传输
//! - `repository`：sqlx Postgres 存储

pub mod channel;
pub mod dispatcher;
pub mod models;
pub mod poller;
pub mod provider;
pub mod repository;
pub mod retry;
pub mod service;
