//! 共享库
//!
//! 包含校验引擎和演示程序共用的配置加载与可观测性初始化代码。

pub mod config;
pub mod observability;
