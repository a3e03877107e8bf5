//! 校验引擎错误类型

use thiserror::Error;

/// 谓词故障的原始错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 校验引擎错误
///
/// 规则不满足不是错误，会作为错误负载写入缓存；这里只包含中断校验轮次的故障。
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("谓词执行失败: 属性 {property}: {source}")]
    PredicateFault {
        property: String,
        #[source]
        source: BoxError,
    },
}

impl ValidationError {
    /// 发生故障的属性名
    pub fn property(&self) -> &str {
        match self {
            Self::PredicateFault { property, .. } => property,
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
