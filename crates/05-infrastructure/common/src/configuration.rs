//! 容器配置
//!
//! 支持从 TOML、JSON 和环境变量加载

use crate::errors::{ConfigError, ConfigResult};
use crate::lifecycle::Lifetime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 新注册组件的默认生命周期
    pub default_lifetime: Lifetime,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 是否缓存编译好的构建计划
    pub enable_plan_cache: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::Transient,
            max_resolution_depth: 100,
            enable_plan_cache: true,
        }
    }
}

impl ContainerConfig {
    /// 设置默认生命周期
    pub fn with_default_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// 设置是否缓存构建计划
    pub fn with_plan_cache(mut self, enabled: bool) -> Self {
        self.enable_plan_cache = enabled;
        self
    }

    /// 从 TOML 文本加载
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文本加载
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        debug!("加载容器配置文件: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 用环境变量覆盖配置
    ///
    /// 识别 `{PREFIX}_DEFAULT_LIFETIME`、`{PREFIX}_MAX_RESOLUTION_DEPTH`
    /// 和 `{PREFIX}_ENABLE_PLAN_CACHE`
    pub fn apply_env(self, prefix: &str) -> ConfigResult<Self> {
        self.apply_vars(prefix, std::env::vars())
    }

    fn apply_vars<I>(mut self, prefix: &str, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}_", prefix.to_uppercase());

        for (name, value) in vars {
            let Some(field) = name.strip_prefix(&prefix) else {
                continue;
            };

            match field {
                "DEFAULT_LIFETIME" => {
                    self.default_lifetime =
                        value.parse().map_err(|_| ConfigError::TypeConversionError {
                            key: name.clone(),
                            value: value.clone(),
                        })?;
                }
                "MAX_RESOLUTION_DEPTH" => {
                    self.max_resolution_depth =
                        value.parse().map_err(|_| ConfigError::TypeConversionError {
                            key: name.clone(),
                            value: value.clone(),
                        })?;
                }
                "ENABLE_PLAN_CACHE" => {
                    self.enable_plan_cache =
                        value.parse().map_err(|_| ConfigError::TypeConversionError {
                            key: name.clone(),
                            value: value.clone(),
                        })?;
                }
                _ => continue,
            }
            debug!("环境变量覆盖配置: {} = {}", name, value);
        }

        self.validate()?;
        Ok(self)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_resolution_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
