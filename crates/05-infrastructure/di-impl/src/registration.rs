//! 组件注册表实现

use crate::cache::ResolverCache;
use di_abstractions::{Arguments, Factory, Injectable, Instance, LifetimeConfigurator};
use infrastructure_common::{
    Capabilities, Component, DependencyError, DependencyResult, Lifetime, RecipeKind,
    RegistrationDescriptor, TypeKey, Upcast,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type BuildFn = Arc<dyn Fn(&mut Arguments) -> DependencyResult<Instance> + Send + Sync>;

/// 构建配方
///
/// 构造函数、工厂、默认值和预构建实例统一成“按顺序取依赖，产出实例”的形式
#[derive(Clone)]
pub struct Recipe {
    kind: RecipeKind,
    implementation: TypeKey,
    parameters: Vec<TypeKey>,
    build: BuildFn,
}

impl Recipe {
    /// 从组件唯一的构造函数创建配方
    pub fn from_injectable<T: Injectable>() -> DependencyResult<Self> {
        Self::from_injectable_as::<T, T>()
    }

    /// 从组件唯一的构造函数创建配方，产出以 `K` 为键的实例
    pub fn from_injectable_as<K, I>() -> DependencyResult<Self>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let implementation = TypeKey::of::<I>();
        let capabilities = I::capabilities();
        let upcast = upcast_for::<K, I>(&capabilities)?;

        let mut constructors = I::constructors();
        let constructor = match constructors.len() {
            0 => {
                return Err(DependencyError::NoConstructorFound {
                    type_name: implementation.name().to_string(),
                })
            }
            1 => constructors.remove(0),
            count => {
                return Err(DependencyError::TooManyConstructors {
                    type_name: implementation.name().to_string(),
                    count,
                })
            }
        };

        let parameters = constructor.parameters().to_vec();
        let build: BuildFn = Arc::new(move |args: &mut Arguments| {
            let value = Arc::new(constructor.invoke(args)?);
            let instance = Instance::new(Arc::clone(&value))
                .with_release(capabilities.release_hook(&value));
            match &upcast {
                Some(upcast) => instance.upcast(upcast),
                None => Ok(instance),
            }
        });

        Ok(Self {
            kind: RecipeKind::Constructor,
            implementation,
            parameters,
            build,
        })
    }

    /// 从工厂创建配方
    pub fn from_factory<T, Args, F>(factory: F) -> Self
    where
        T: Component,
        F: Factory<Args, T>,
    {
        let capabilities = T::capabilities();
        let build: BuildFn = Arc::new(move |args: &mut Arguments| {
            let value = Arc::new(factory.call(args)?);
            Ok(Instance::new(Arc::clone(&value)).with_release(capabilities.release_hook(&value)))
        });

        Self {
            kind: RecipeKind::Factory,
            implementation: TypeKey::of::<T>(),
            parameters: F::parameters(),
            build,
        }
    }

    /// 从产出实现 `I` 的工厂创建配方，实例以 `K` 为键
    ///
    /// 释放能力取自 `I`，转换成 `K` 之后仍然保留
    pub fn from_factory_as<K, I, Args, F>(factory: F) -> DependencyResult<Self>
    where
        K: ?Sized + Send + Sync + 'static,
        I: Component,
        F: Factory<Args, I>,
    {
        let capabilities = I::capabilities();
        let upcast = upcast_for::<K, I>(&capabilities)?;

        let build: BuildFn = Arc::new(move |args: &mut Arguments| {
            let value = Arc::new(factory.call(args)?);
            let instance = Instance::new(Arc::clone(&value))
                .with_release(capabilities.release_hook(&value));
            match &upcast {
                Some(upcast) => instance.upcast(upcast),
                None => Ok(instance),
            }
        });

        Ok(Self {
            kind: RecipeKind::Factory,
            implementation: TypeKey::of::<I>(),
            parameters: F::parameters(),
            build,
        })
    }

    /// 预构建实例的配方
    pub fn from_instance<T: Component>(value: T) -> Self {
        let value = Arc::new(value);
        let instance = Instance::new(Arc::clone(&value))
            .with_release(T::capabilities().release_hook(&value));
        let build: BuildFn = Arc::new(move |_: &mut Arguments| Ok(instance.clone()));

        Self {
            kind: RecipeKind::Instance,
            implementation: TypeKey::of::<T>(),
            parameters: Vec::new(),
            build,
        }
    }

    /// 值类型的配方，直接产出默认值
    pub fn default_value<T>() -> Self
    where
        T: Default + Send + Sync + 'static,
    {
        let build: BuildFn =
            Arc::new(|_: &mut Arguments| Ok(Instance::new(Arc::new(T::default()))));

        Self {
            kind: RecipeKind::DefaultValue,
            implementation: TypeKey::of::<T>(),
            parameters: Vec::new(),
            build,
        }
    }

    /// 配方种类
    pub fn kind(&self) -> RecipeKind {
        self.kind
    }

    /// 实现类型
    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    /// 按顺序排列的依赖
    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }

    /// 用已解析的依赖构建实例
    pub fn construct(&self, dependencies: Vec<Instance>) -> DependencyResult<Instance> {
        (self.build)(&mut Arguments::new(dependencies))
    }
}

/// 查找 `I` 到键 `K` 的转换，键就是 `I` 本身时不需要转换
fn upcast_for<K, I>(capabilities: &Capabilities<I>) -> DependencyResult<Option<Upcast>>
where
    K: ?Sized + Send + Sync + 'static,
    I: Component,
{
    let key = TypeKey::of::<K>();
    let implementation = TypeKey::of::<I>();
    if key == implementation {
        return Ok(None);
    }
    capabilities
        .upcast_to(&key)
        .cloned()
        .map(Some)
        .ok_or_else(|| DependencyError::InvalidRegistration {
            key: key.name().to_string(),
            implementation: implementation.name().to_string(),
        })
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("kind", &self.kind)
            .field("implementation", &self.implementation)
            .field("parameters", &self.parameters)
            .field("build", &"<function>")
            .finish()
    }
}

/// 组件注册信息
pub struct RegistrationEntry {
    key: TypeKey,
    recipe: Recipe,
    lifetime: RwLock<Lifetime>,
    singleton: OnceCell<Instance>,
}

impl RegistrationEntry {
    /// 创建注册信息
    pub fn new(key: TypeKey, recipe: Recipe, lifetime: Lifetime) -> Self {
        Self {
            key,
            recipe,
            lifetime: RwLock::new(lifetime),
            singleton: OnceCell::new(),
        }
    }

    /// 注册键
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 构建配方
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// 生命周期
    pub fn lifetime(&self) -> Lifetime {
        *self.lifetime.read()
    }

    /// 修改生命周期
    pub fn set_lifetime(&self, lifetime: Lifetime) {
        *self.lifetime.write() = lifetime;
    }

    /// 已创建的单例
    pub fn singleton_instance(&self) -> Option<&Instance> {
        self.singleton.get()
    }

    /// 单例槽位
    pub fn singleton_slot(&self) -> &OnceCell<Instance> {
        &self.singleton
    }

    /// 能否出现在单例的依赖图中
    ///
    /// 默认值和预构建实例不持有按调用变化的状态，不受单例限制
    pub fn is_singleton_compatible(&self) -> bool {
        self.lifetime() == Lifetime::Singleton
            || matches!(
                self.recipe.kind,
                RecipeKind::DefaultValue | RecipeKind::Instance
            )
    }

    /// 描述符
    pub fn descriptor(&self) -> RegistrationDescriptor {
        RegistrationDescriptor {
            key: self.key,
            implementation: self.recipe.implementation,
            kind: self.recipe.kind,
            lifetime: self.lifetime(),
            parameters: self.recipe.parameters.clone(),
            instantiated: self.singleton.get().is_some(),
        }
    }
}

impl fmt::Debug for RegistrationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationEntry")
            .field("key", &self.key)
            .field("recipe", &self.recipe)
            .field("lifetime", &self.lifetime())
            .field("instantiated", &self.singleton.get().is_some())
            .finish()
    }
}

/// 组件注册表
///
/// 注册完成后只读，解析时只需要读锁
#[derive(Debug, Default)]
pub struct RegistrationStore {
    entries: RwLock<HashMap<TypeKey, Arc<RegistrationEntry>>>,
}

impl RegistrationStore {
    /// 创建新的组件注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入注册信息，同一个键后写入的生效
    pub fn insert(&self, entry: RegistrationEntry) -> Arc<RegistrationEntry> {
        let entry = Arc::new(entry);
        let previous = self
            .entries
            .write()
            .insert(entry.key(), Arc::clone(&entry));

        if previous.is_some() {
            debug!("覆盖已有注册: {}", entry.key());
        }
        info!(
            "注册组件: {} -> {} ({:?}, {})",
            entry.key().short_name(),
            entry.recipe().implementation().short_name(),
            entry.recipe().kind(),
            entry.lifetime()
        );
        entry
    }

    /// 获取注册信息
    pub fn get(&self, key: &TypeKey) -> Option<Arc<RegistrationEntry>> {
        self.entries.read().get(key).cloned()
    }

    /// 检查是否已注册
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// 注册数量
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 按规范顺序列出所有描述符
    pub fn descriptors(&self) -> Vec<RegistrationDescriptor> {
        let mut descriptors: Vec<_> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.descriptor())
            .collect();
        descriptors.sort_by_key(|d| d.key);
        descriptors
    }
}

/// 注册句柄
///
/// 用于在注册后调整生命周期，调整会使已编译的构建计划失效
pub struct RegistrationHandle {
    entry: Arc<RegistrationEntry>,
    cache: Arc<ResolverCache>,
}

impl RegistrationHandle {
    pub(crate) fn new(entry: Arc<RegistrationEntry>, cache: Arc<ResolverCache>) -> Self {
        Self { entry, cache }
    }

    /// 注册键
    pub fn key(&self) -> TypeKey {
        self.entry.key()
    }

    /// 描述符
    pub fn descriptor(&self) -> RegistrationDescriptor {
        self.entry.descriptor()
    }
}

impl LifetimeConfigurator for RegistrationHandle {
    fn set_lifetime(&self, lifetime: Lifetime) -> &Self {
        if self.entry.lifetime() != lifetime {
            debug!("调整生命周期: {} -> {}", self.entry.key().short_name(), lifetime);
            self.entry.set_lifetime(lifetime);
            self.cache.clear();
        }
        self
    }

    fn lifetime(&self) -> Lifetime {
        self.entry.lifetime()
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("entry", &self.entry)
            .finish()
    }
}
