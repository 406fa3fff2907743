//! 组件工厂抽象接口
//!
//! 工厂就是普通的闭包或函数：参数是按顺序排列的 `Arc<依赖>`，返回值是构建好的组件。
//! 依赖列表由参数类型在编译期确定，不需要反射。

use crate::instance::Instance;
use infrastructure_common::{Component, DependencyError, DependencyResult, TypeKey};
use std::fmt;
use std::sync::Arc;

/// 工厂调用时的实参
///
/// 依赖按声明顺序依次取出
pub struct Arguments {
    values: std::vec::IntoIter<Instance>,
}

impl Arguments {
    /// 创建实参列表
    pub fn new(values: Vec<Instance>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// 取出下一个依赖
    pub fn next<K>(&mut self) -> DependencyResult<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.values
            .next()
            .ok_or_else(DependencyError::mismatch::<K>)?
            .downcast::<K>()
    }

    /// 剩余的依赖数量
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// 工厂 trait
///
/// 为参数个数 0 到 7 的闭包自动实现，`Args` 是参数类型组成的元组
pub trait Factory<Args, Output>: Send + Sync + 'static {
    /// 按顺序排列的依赖类型
    fn parameters() -> Vec<TypeKey>;

    /// 调用工厂
    fn call(&self, args: &mut Arguments) -> DependencyResult<Output>;
}

macro_rules! impl_factory {
    ($($param:ident),*) => {
        impl<Func, Output, $($param,)*> Factory<($(Arc<$param>,)*), Output> for Func
        where
            Func: Fn($(Arc<$param>),*) -> Output + Send + Sync + 'static,
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn parameters() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$param>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut Arguments) -> DependencyResult<Output> {
                $(let $param = args.next::<$param>()?;)*
                Ok((self)($($param),*))
            }
        }
    };
}

impl_factory!();
impl_factory!(P1);
impl_factory!(P1, P2);
impl_factory!(P1, P2, P3);
impl_factory!(P1, P2, P3, P4);
impl_factory!(P1, P2, P3, P4, P5);
impl_factory!(P1, P2, P3, P4, P5, P6);
impl_factory!(P1, P2, P3, P4, P5, P6, P7);

type InvokeFn<T> = Arc<dyn Fn(&mut Arguments) -> DependencyResult<T> + Send + Sync>;

/// 构造函数描述
pub struct Constructor<T> {
    parameters: Vec<TypeKey>,
    invoke: InvokeFn<T>,
}

impl<T> Constructor<T>
where
    T: Send + Sync + 'static,
{
    /// 从函数或闭包创建构造函数描述
    pub fn new<Args, F>(constructor: F) -> Self
    where
        F: Factory<Args, T>,
    {
        Self {
            parameters: F::parameters(),
            invoke: Arc::new(move |args: &mut Arguments| constructor.call(args)),
        }
    }

    /// 按顺序排列的参数类型
    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }

    /// 调用构造函数
    pub fn invoke(&self, args: &mut Arguments) -> DependencyResult<T> {
        (self.invoke)(args)
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
            invoke: Arc::clone(&self.invoke),
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .field("invoke", &"<function>")
            .finish()
    }
}

/// 可注入组件 trait
///
/// 组件公开的构造函数列表。容器要求恰好一个：
/// 没有构造函数或有多个构造函数都会在注册时报错。
pub trait Injectable: Component + Sized {
    /// 公开的构造函数
    fn constructors() -> Vec<Constructor<Self>>;
}
