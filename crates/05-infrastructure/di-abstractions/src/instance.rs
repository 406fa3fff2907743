//! 类型擦除的组件实例

use infrastructure_common::{AnyArc, DependencyError, DependencyResult, ReleaseHook, TypeKey, Upcast};
use std::fmt;
use std::sync::Arc;

/// 组件实例
///
/// 以键 `K` 解析出的值以 `Arc<K>` 的形式保存，具体类型和 trait 对象使用同一种表示。
/// 如果实例声明了释放能力，会携带一个释放钩子。
#[derive(Clone)]
pub struct Instance {
    key: TypeKey,
    value: AnyArc,
    release: Option<ReleaseHook>,
}

impl Instance {
    /// 从共享值创建实例
    pub fn new<K>(value: Arc<K>) -> Self
    where
        K: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<K>(),
            value: Arc::new(value),
            release: None,
        }
    }

    /// 从已擦除的值创建实例
    pub fn from_parts(key: TypeKey, value: AnyArc, release: Option<ReleaseHook>) -> Self {
        Self {
            key,
            value,
            release,
        }
    }

    /// 附加释放钩子
    pub fn with_release(mut self, release: Option<ReleaseHook>) -> Self {
        self.release = release;
        self
    }

    /// 实例对应的键
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 擦除后的值
    pub fn value(&self) -> &AnyArc {
        &self.value
    }

    /// 释放钩子
    pub fn release_hook(&self) -> Option<&ReleaseHook> {
        self.release.as_ref()
    }

    /// 是否需要释放
    pub fn is_disposable(&self) -> bool {
        self.release.is_some()
    }

    /// 取出具体类型
    pub fn downcast<K>(&self) -> DependencyResult<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.value
            .downcast_ref::<Arc<K>>()
            .cloned()
            .ok_or_else(DependencyError::mismatch::<K>)
    }

    /// 向上转换，释放钩子随实例一起保留
    pub fn upcast(&self, upcast: &Upcast) -> DependencyResult<Self> {
        let value = upcast
            .apply(&self.value)
            .ok_or_else(|| DependencyError::TypeMismatch {
                expected: upcast.target().name().to_string(),
            })?;
        Ok(Self {
            key: upcast.target(),
            value,
            release: self.release.clone(),
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("key", &self.key)
            .field("disposable", &self.release.is_some())
            .finish()
    }
}
