//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 惰性初始化模式
///
/// 决定实例首次访问错误状态时，全量校验遇到谓词故障后缓存如何处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// 先在临时表中构建完整缓存，全部属性评估成功后才提交；
    /// 失败时实例保持未初始化，下次访问重试
    #[default]
    Transactional,
    /// 边评估边写入，故障前已评估的属性保留在缓存中，实例视为已初始化
    Partial,
}

/// 校验引擎配置
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub init_mode: InitMode,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "rule-validation".to_string(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 配置目录取自 `CONFIG_DIR`（默认 `config`），环境取自 `VALIDATION_ENV`
    /// （默认 `development`）。
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(Path::new(&config_dir), service_name)
    }

    /// 从指定目录加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. {dir}/default.toml（默认配置）
    /// 2. {dir}/{environment}.toml（环境特定配置）
    /// 3. 环境变量（VALIDATION_ 前缀，如 VALIDATION_OBSERVABILITY__LOG_LEVEL -> observability.log_level）
    pub fn load_from(dir: &Path, service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("VALIDATION_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(dir.join("default.toml")).required(false))
            .add_source(File::from(dir.join(format!("{}.toml", env))).required(false))
            // 双下划线分隔层级，避免与 snake_case 字段名冲突
            .add_source(
                Environment::with_prefix("VALIDATION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        if config.observability.service_name.is_empty() {
            config.observability = config.observability.with_service_name(&config.service_name);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "validation-shared-{}-{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service_name, "rule-validation");
        assert_eq!(config.validation.init_mode, InitMode::Transactional);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = scratch_dir("empty");

        let config = AppConfig::load_from(&dir, "product-form").unwrap();

        assert_eq!(config.service_name, "product-form");
        assert_eq!(config.observability.service_name, "product-form");
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.validation.init_mode, InitMode::Transactional);
    }

    #[test]
    fn test_load_from_default_toml() {
        let dir = scratch_dir("toml");
        fs::write(
            dir.join("default.toml"),
            r#"
            [observability]
            log_level = "debug"
            json_logs = true

            [validation]
            init_mode = "partial"
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from(&dir, "product-form").unwrap();

        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.json_logs);
        assert_eq!(config.validation.init_mode, InitMode::Partial);
    }

    #[test]
    fn test_init_mode_deserialization() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: InitMode,
        }

        let parsed: Wrapper = Config::builder()
            .set_default("mode", "transactional")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed.mode, InitMode::Transactional);
    }
}
