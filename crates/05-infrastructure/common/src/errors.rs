//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置类型转换失败: {key} = {value}")]
    TypeConversionError { key: String, value: String },
}

/// 依赖注入错误类型
///
/// 所有错误都同步返回给调用方，容器内部不做重试，也不存在部分成功的状态。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("组件未注册: {type_name}")]
    MissingRegistration { type_name: String },

    #[error("检测到循环依赖: {dependency_chain}")]
    CircularDependencyDetected { dependency_chain: String },

    #[error("类型 {type_name} 有 {count} 个构造函数，只允许一个")]
    TooManyConstructors { type_name: String, count: usize },

    #[error("类型 {type_name} 没有可用的构造函数")]
    NoConstructorFound { type_name: String },

    #[error("单例 {singleton} 不允许依赖非单例组件 {dependency}")]
    UnAllowedConstruct {
        singleton: String,
        dependency: String,
    },

    #[error("注册无效: {implementation} 不能赋值给 {key}")]
    InvalidRegistration { key: String, implementation: String },

    #[error("类型转换失败: 期望 {expected}")]
    TypeMismatch { expected: String },

    #[error("解析深度超过上限 {max_depth}: {type_name}")]
    ResolutionDepthExceeded { type_name: String, max_depth: usize },

    #[error("作用域已关闭: {scope_id}")]
    SessionClosed { scope_id: String },
}

impl DependencyError {
    /// 创建未注册错误
    pub fn missing<T: ?Sized + 'static>() -> Self {
        Self::MissingRegistration {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// 创建类型转换错误
    pub fn mismatch<T: ?Sized + 'static>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
        }
    }

    /// 是否为注册阶段产生的错误
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyConstructors { .. }
                | Self::NoConstructorFound { .. }
                | Self::InvalidRegistration { .. }
        )
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
