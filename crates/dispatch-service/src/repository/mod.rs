//! 仓储层
//!
//! 外部协作方接口（traits）及其 PostgreSQL 实现

pub mod endpoint_repo;
pub mod notification_repo;
pub mod preference_repo;
pub mod traits;
pub mod user_repo;

pub use endpoint_repo::EndpointRepository;
pub use notification_repo::NotificationRepository;
pub use preference_repo::PreferenceRepository;
pub use traits::{
    EndpointRepositoryTrait, NotificationRepositoryTrait, PreferenceGate, UserRepositoryTrait,
};
pub use user_repo::UserRepository;
