//! 字段注入
//!
//! 没有反射时，由目标类型自己列出需要注入的字段

use crate::overrides::Overrides;
use crate::resolver::ServiceProvider;
use infrastructure_common::{DependencyResult, TypeKey};
use std::sync::Arc;

/// 支持字段注入的类型
pub trait InjectFields {
    /// 逐个字段解析依赖
    fn inject_fields(&mut self, resolver: &FieldResolver<'_>) -> DependencyResult<()>;
}

/// 字段解析器
pub struct FieldResolver<'a> {
    provider: &'a dyn ServiceProvider,
    overrides: &'a Overrides,
}

impl<'a> FieldResolver<'a> {
    /// 创建字段解析器
    pub fn new(provider: &'a dyn ServiceProvider, overrides: &'a Overrides) -> Self {
        Self {
            provider,
            overrides,
        }
    }

    /// 解析一个字段
    pub fn resolve<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.provider
            .get_service_with(&TypeKey::of::<T>(), self.overrides)?
            .downcast::<T>()
    }
}
