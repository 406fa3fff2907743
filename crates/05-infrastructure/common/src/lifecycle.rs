//! 组件生命周期管理

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 瞬时模式 - 每次引用都创建新实例，同一对象图内也不共享
    Transient,
    /// 对象图模式 - 一次顶层解析内共享同一个实例
    PerGraph,
    /// 单例模式 - 整个容器生命周期内只创建一个实例
    Singleton,
    /// 作用域模式 - 在同一作用域会话内共享实例
    Scoped,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl Lifetime {
    /// 配置和日志里使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::PerGraph => "per_graph",
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "transient" => Ok(Self::Transient),
            "per_graph" | "pergraph" => Ok(Self::PerGraph),
            "singleton" => Ok(Self::Singleton),
            "scoped" => Ok(Self::Scoped),
            other => Err(format!("未知的生命周期: {}", other)),
        }
    }
}

/// 可释放资源
///
/// 作用域关闭或容器销毁时，实现此 trait 的实例会被调用 [`Disposable::dispose`]。
/// 实例以 `Arc` 共享，所以释放通过 `&self` 进行，需要的话由实现者自行使用内部可变性。
pub trait Disposable: Send + Sync {
    /// 释放资源
    fn dispose(&self);
}

/// 组件作用域
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建新作用域
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域
    pub fn root() -> Self {
        Self::new("root")
    }

    /// 创建子作用域
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.name, name.into()))
    }
}
