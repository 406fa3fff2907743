//! 组件注册表抽象接口

use crate::factory::{Factory, Injectable};
use infrastructure_common::{
    Component, DependencyResult, Lifetime, RegistrationDescriptor, TypeKey,
};

/// 注册后调整生命周期
pub trait LifetimeConfigurator {
    /// 设置生命周期
    fn set_lifetime(&self, lifetime: Lifetime) -> &Self;

    /// 当前生命周期
    fn lifetime(&self) -> Lifetime;

    /// 单例
    fn as_singleton(&self) -> &Self {
        self.set_lifetime(Lifetime::Singleton)
    }

    /// 作用域
    fn as_scoped(&self) -> &Self {
        self.set_lifetime(Lifetime::Scoped)
    }

    /// 对象图
    fn as_per_graph(&self) -> &Self {
        self.set_lifetime(Lifetime::PerGraph)
    }

    /// 瞬时
    fn as_transient(&self) -> &Self {
        self.set_lifetime(Lifetime::Transient)
    }
}

/// 组件注册表 trait
///
/// 每个键只保留一个配方，重复注册时后写入的生效
pub trait ServiceRegistry: Send + Sync {
    /// 注册返回的句柄
    type Handle: LifetimeConfigurator;

    /// 以自身类型注册组件
    fn register<T>(&self) -> DependencyResult<Self::Handle>
    where
        T: Injectable;

    /// 以 `K` 为键注册实现 `I`，`I` 必须声明可以赋值给 `K`
    fn register_as<K, I>(&self) -> DependencyResult<Self::Handle>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Injectable;

    /// 注册工厂
    fn register_factory<T, Args, F>(&self, factory: F) -> Self::Handle
    where
        T: Component,
        F: Factory<Args, T>;

    /// 以 `K` 为键注册产出 `I` 的工厂，`I` 必须声明可以赋值给 `K`
    fn register_factory_as<K, I, Args, F>(&self, factory: F) -> DependencyResult<Self::Handle>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Component,
        F: Factory<Args, I>;

    /// 注册已经构建好的实例
    fn register_instance<T>(&self, instance: T) -> Self::Handle
    where
        T: Component;

    /// 注册值类型，解析时直接返回默认值
    fn register_value<T>(&self) -> Self::Handle
    where
        T: Default + Send + Sync + 'static;

    /// 检查组件是否已注册（通过 TypeKey）
    fn is_registered_key(&self, key: &TypeKey) -> bool;

    /// 检查组件是否已注册
    fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.is_registered_key(&TypeKey::of::<T>())
    }

    /// 获取所有已注册的组件描述符
    fn registrations(&self) -> Vec<RegistrationDescriptor>;
}
