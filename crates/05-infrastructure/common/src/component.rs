//! 组件基础接口定义
//!
//! Rust 没有运行时反射，类型之间的可赋值关系和释放能力由组件自己声明。
//! 容器在注册时读取这些声明，用于校验注册、匹配覆盖值以及在作用域结束时释放资源。

use crate::lifecycle::Disposable;
use crate::metadata::TypeKey;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除后的共享值
///
/// 以键 `K` 解析出的值总是以 `Arc<K>` 的形式存放在里面。
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 类型擦除后的转换函数
pub type CastFn = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;

/// 释放钩子
pub type ReleaseHook = Arc<dyn Fn() + Send + Sync>;

/// 组件基础 trait
///
/// 所有可以被容器构建或作为覆盖值提供的类型都必须实现此 trait
pub trait Component: Send + Sync + 'static {
    /// 声明组件的能力：可以赋值给哪些类型，是否需要释放
    fn capabilities() -> Capabilities<Self>
    where
        Self: Sized,
    {
        Capabilities::new()
    }
}

/// 向上转换
///
/// 把 `Arc<T>` 转换为 `Arc<K>`，`K` 通常是 `T` 实现的 trait 对象
#[derive(Clone)]
pub struct Upcast {
    target: TypeKey,
    cast: CastFn,
}

impl Upcast {
    /// 目标类型
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// 执行转换，源值类型不符时返回 `None`
    pub fn apply(&self, value: &AnyArc) -> Option<AnyArc> {
        (self.cast)(value)
    }
}

impl fmt::Debug for Upcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upcast")
            .field("target", &self.target)
            .finish()
    }
}

/// 组件能力声明
///
/// 超类型按由近到远的顺序排列，相当于祖先链
pub struct Capabilities<T> {
    supertypes: Vec<Upcast>,
    release: Option<fn(&T)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Capabilities<T>
where
    T: Send + Sync + 'static,
{
    /// 创建空的能力声明，只能赋值给自身类型
    pub fn new() -> Self {
        Self {
            supertypes: Vec::new(),
            release: None,
            _marker: PhantomData,
        }
    }

    /// 声明 `T` 可以赋值给 `K`
    ///
    /// ```ignore
    /// Capabilities::new().assignable_to::<dyn Greeter>(|g| g as Arc<dyn Greeter>)
    /// ```
    pub fn assignable_to<K>(mut self, cast: fn(Arc<T>) -> Arc<K>) -> Self
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let target = TypeKey::of::<K>();
        if target == TypeKey::of::<T>() || self.supertypes.iter().any(|u| u.target == target) {
            return self;
        }

        let caster: CastFn = Arc::new(move |value: &AnyArc| {
            let concrete = value.downcast_ref::<Arc<T>>()?;
            Some(Arc::new(cast(Arc::clone(concrete))) as AnyArc)
        });
        self.supertypes.push(Upcast {
            target,
            cast: caster,
        });
        self
    }

    /// 声明 `T` 需要在作用域或容器结束时释放
    pub fn disposable(mut self) -> Self
    where
        T: Disposable,
    {
        self.release = Some(|value: &T| value.dispose());
        self
    }

    /// 超类型列表
    pub fn supertypes(&self) -> &[Upcast] {
        &self.supertypes
    }

    /// 查找到指定类型的转换
    pub fn upcast_to(&self, key: &TypeKey) -> Option<&Upcast> {
        self.supertypes.iter().find(|u| u.target == *key)
    }

    /// 是否可以赋值给指定类型
    pub fn is_assignable_to(&self, key: &TypeKey) -> bool {
        *key == TypeKey::of::<T>() || self.upcast_to(key).is_some()
    }

    /// 是否声明了释放能力
    pub fn is_disposable(&self) -> bool {
        self.release.is_some()
    }

    /// 为具体实例生成释放钩子
    pub fn release_hook(&self, value: &Arc<T>) -> Option<ReleaseHook> {
        let release = self.release?;
        let value = Arc::clone(value);
        Some(Arc::new(move || release(&value)))
    }
}

impl<T> Default for Capabilities<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Capabilities<T> {
    fn clone(&self) -> Self {
        Self {
            supertypes: self.supertypes.clone(),
            release: self.release,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Capabilities<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("supertypes", &self.supertypes)
            .field("disposable", &self.release.is_some())
            .finish()
    }
}
