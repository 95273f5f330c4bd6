//! 数据模型

pub mod enums;
pub mod notification;

pub use enums::{ChannelType, NotificationPriority, NotificationStatus};
pub use notification::{ChannelEndpoint, Notification};
