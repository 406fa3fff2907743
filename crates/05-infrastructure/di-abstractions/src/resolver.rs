//! 组件解析器抽象接口
//!
//! 提供依赖解析和组件实例化的能力

use crate::fields::{FieldResolver, InjectFields};
use crate::instance::Instance;
use crate::overrides::Overrides;
use infrastructure_common::{DependencyError, DependencyResult, TypeKey};
use std::sync::Arc;

/// 服务提供者 trait
///
/// 按类型标识获取服务，用于和服务定位器风格的代码互通
pub trait ServiceProvider: Send + Sync {
    /// 获取服务
    fn get_service(&self, key: &TypeKey) -> DependencyResult<Instance> {
        self.get_service_with(key, &Overrides::new())
    }

    /// 附带覆盖值获取服务
    fn get_service_with(&self, key: &TypeKey, overrides: &Overrides) -> DependencyResult<Instance>;
}

/// 服务提供者的泛型扩展
pub trait ServiceProviderExt: ServiceProvider {
    /// 解析指定类型的服务
    fn resolve<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_service(&TypeKey::of::<T>())?.downcast::<T>()
    }

    /// 附带覆盖值解析指定类型的服务
    fn resolve_with<T>(&self, overrides: &Overrides) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_service_with(&TypeKey::of::<T>(), overrides)?
            .downcast::<T>()
    }

    /// 为目标对象的每个字段解析依赖
    fn resolve_fields<F>(&self, target: &mut F, overrides: &Overrides) -> DependencyResult<()>
    where
        F: InjectFields + ?Sized,
        Self: Sized,
    {
        let resolver = FieldResolver::new(self, overrides);
        target.inject_fields(&resolver)
    }
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {}

/// 解析链
///
/// 记录当前正在编译的类型，用于检测循环依赖和限制解析深度
#[derive(Debug, Clone)]
pub struct ResolutionChain {
    chain: Vec<TypeKey>,
    max_depth: usize,
}

impl ResolutionChain {
    /// 创建新的解析链
    pub fn new(max_depth: usize) -> Self {
        Self {
            chain: Vec::new(),
            max_depth,
        }
    }

    /// 添加类型到解析链
    pub fn push(&mut self, key: TypeKey) -> DependencyResult<()> {
        if self.chain.contains(&key) {
            return Err(DependencyError::CircularDependencyDetected {
                dependency_chain: self.describe_cycle(&key),
            });
        }
        if self.chain.len() >= self.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                type_name: key.name().to_string(),
                max_depth: self.max_depth,
            });
        }
        self.chain.push(key);
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop(&mut self) {
        self.chain.pop();
    }

    /// 是否包含指定类型
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.chain.contains(key)
    }

    /// 当前深度
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// 正在解析的类型
    pub fn current(&self) -> Option<TypeKey> {
        self.chain.last().copied()
    }

    /// 依赖当前类型的上一级
    pub fn parent(&self) -> Option<TypeKey> {
        self.chain.iter().rev().nth(1).copied()
    }

    fn describe_cycle(&self, key: &TypeKey) -> String {
        let start = self.chain.iter().position(|k| k == key).unwrap_or(0);
        self.chain[start..]
            .iter()
            .chain(std::iter::once(key))
            .map(|k| k.short_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self::new(100)
    }
}
