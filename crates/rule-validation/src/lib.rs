//! 基于规则的对象校验引擎
//!
//! 提供由属性变更驱动的增量校验能力，支持：
//! - 按属性注册规则，同类型实例共享规则集合
//! - 属性变更时只重新评估该属性的规则
//! - 惰性初始化的错误缓存
//! - 属性变更与错误变更通知

pub mod collection;
pub mod error;
pub mod events;
pub mod key;
pub mod state;
pub mod validatable;

pub use collection::{Rule, RuleCollection, RuleCollectionStats};
pub use error::{BoxError, Result, ValidationError};
pub use events::{
    ErrorsChangedStream, HAS_ERRORS_PROPERTY, PropertyChanged, SubscriptionId,
};
pub use key::PropertyKey;
pub use state::ValidationState;
pub use validatable::Validatable;
pub use validation_shared::config::{InitMode, ValidationConfig};
