//! 依赖注入容器

use crate::cache::{PlanSignature, ResolverCache};
use crate::compiler::GraphCompiler;
use crate::lifecycle::LifecycleStore;
use crate::registration::{Recipe, RegistrationEntry, RegistrationHandle, RegistrationStore};
use crate::scope::ScopedSession;
use di_abstractions::{
    Factory, Injectable, Instance, Overrides, ServiceProvider, ServiceRegistry,
};
use infrastructure_common::{
    Component, ContainerConfig, DependencyError, DependencyResult, Lifetime, RecipeKind,
    RegistrationDescriptor, ScopeInfo, TypeKey,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 已注册的组件数量
    pub registered_components: usize,
    /// 已缓存的构建计划数量
    pub compiled_plans: usize,
    /// 已创建的单例数量
    pub active_singletons: usize,
}

/// 依赖注入容器
///
/// 先注册再解析。注册阶段需要独占使用，解析可以在多个线程上并发进行。
pub struct Container {
    config: ContainerConfig,
    registrations: RegistrationStore,
    cache: Arc<ResolverCache>,
    lifecycle: LifecycleStore,
}

impl Container {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        info!(
            "创建依赖注入容器 (默认生命周期: {}, 最大深度: {})",
            config.default_lifetime, config.max_resolution_depth
        );
        Self {
            cache: Arc::new(ResolverCache::new(config.enable_plan_cache)),
            registrations: RegistrationStore::new(),
            lifecycle: LifecycleStore::new(),
            config,
        }
    }

    /// 指定新注册组件的默认生命周期
    pub fn with_default_lifetime(lifetime: Lifetime) -> Self {
        Self::with_config(ContainerConfig::default().with_default_lifetime(lifetime))
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 解析组件
    pub fn create_instance<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.create_instance_with::<T>(&Overrides::new())
    }

    /// 附带覆盖值解析组件
    pub fn create_instance_with<T>(&self, overrides: &Overrides) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_key(&TypeKey::of::<T>(), overrides, None)?
            .downcast::<T>()
    }

    /// 创建作用域会话
    pub fn create_scope(&self) -> ScopedSession<'_> {
        ScopedSession::new(self, ScopeInfo::new("scope"))
    }

    /// 创建命名的作用域会话
    pub fn create_named_scope(&self, name: impl Into<String>) -> ScopedSession<'_> {
        ScopedSession::new(self, ScopeInfo::new(name))
    }

    /// 统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_components: self.registrations.len(),
            compiled_plans: self.cache.len(),
            active_singletons: self.lifecycle.active_singletons(),
        }
    }

    /// 释放容器创建的单例，返回调用的释放钩子数量
    ///
    /// 已缓存的单例不会被清除，释放后继续解析得到的是已释放的实例
    pub fn dispose(&self) -> usize {
        self.lifecycle.dispose_all()
    }

    pub(crate) fn resolve_key(
        &self,
        key: &TypeKey,
        overrides: &Overrides,
        session: Option<&ScopedSession<'_>>,
    ) -> DependencyResult<Instance> {
        let entry = self
            .registrations
            .get(key)
            .ok_or_else(|| DependencyError::MissingRegistration {
                type_name: key.name().to_string(),
            })?;

        // 瞬时值类型不需要构建计划，其余生命周期按计划共享
        if entry.recipe().kind() == RecipeKind::DefaultValue
            && entry.lifetime() == Lifetime::Transient
        {
            return entry.recipe().construct(Vec::new());
        }
        if let Some(provided) = overrides.get(key) {
            return Ok(provided.instance().clone());
        }
        if entry.lifetime() == Lifetime::Singleton {
            if let Some(instance) = entry.singleton_instance() {
                return Ok(instance.clone());
            }
        }

        let signature = PlanSignature::new(*key, overrides);
        let plan = self.cache.get_or_compile(signature, || {
            GraphCompiler::new(
                &self.registrations,
                &self.lifecycle,
                overrides,
                self.config.max_resolution_depth,
            )
            .compile(*key)
        })?;
        plan.execute(overrides, session)
    }

    fn add_registration(&self, key: TypeKey, recipe: Recipe, lifetime: Lifetime) -> RegistrationHandle {
        let entry = self
            .registrations
            .insert(RegistrationEntry::new(key, recipe, lifetime));
        self.cache.clear();
        RegistrationHandle::new(entry, Arc::clone(&self.cache))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for Container {
    type Handle = RegistrationHandle;

    fn register<T>(&self) -> DependencyResult<Self::Handle>
    where
        T: Injectable,
    {
        let recipe = Recipe::from_injectable::<T>()?;
        Ok(self.add_registration(TypeKey::of::<T>(), recipe, self.config.default_lifetime))
    }

    fn register_as<K, I>(&self) -> DependencyResult<Self::Handle>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let recipe = Recipe::from_injectable_as::<K, I>()?;
        Ok(self.add_registration(TypeKey::of::<K>(), recipe, self.config.default_lifetime))
    }

    fn register_factory<T, Args, F>(&self, factory: F) -> Self::Handle
    where
        T: Component,
        F: Factory<Args, T>,
    {
        let recipe = Recipe::from_factory::<T, Args, F>(factory);
        self.add_registration(TypeKey::of::<T>(), recipe, self.config.default_lifetime)
    }

    fn register_factory_as<K, I, Args, F>(&self, factory: F) -> DependencyResult<Self::Handle>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Component,
        F: Factory<Args, I>,
    {
        let recipe = Recipe::from_factory_as::<K, I, Args, F>(factory)?;
        Ok(self.add_registration(TypeKey::of::<K>(), recipe, self.config.default_lifetime))
    }

    fn register_instance<T>(&self, instance: T) -> Self::Handle
    where
        T: Component,
    {
        self.add_registration(
            TypeKey::of::<T>(),
            Recipe::from_instance(instance),
            Lifetime::Singleton,
        )
    }

    fn register_value<T>(&self) -> Self::Handle
    where
        T: Default + Send + Sync + 'static,
    {
        self.add_registration(
            TypeKey::of::<T>(),
            Recipe::default_value::<T>(),
            self.config.default_lifetime,
        )
    }

    fn is_registered_key(&self, key: &TypeKey) -> bool {
        self.registrations.contains(key)
    }

    fn registrations(&self) -> Vec<RegistrationDescriptor> {
        self.registrations.descriptors()
    }
}

impl ServiceProvider for Container {
    fn get_service_with(&self, key: &TypeKey, overrides: &Overrides) -> DependencyResult<Instance> {
        self.resolve_key(key, overrides, None)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        let released = self.lifecycle.dispose_all();
        if released > 0 {
            debug!("容器销毁，释放单例: {} 个", released);
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
