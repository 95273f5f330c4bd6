//! 共享库
//!
//! 包含通知调度系统各组件共用的配置加载、错误类型、数据库连接、
//! 日志初始化等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
