//! # 依赖注入具体实现
//!
//! 提供依赖注入容器、构建计划编译器和作用域会话的实现。
//!
//! 解析分两步：先把目标类型和覆盖值的形状编译成构建计划并缓存，
//! 之后每次解析只执行计划。循环依赖、缺失注册和单例约束在编译时报告。
//!
//! ```ignore
//! let container = Container::new();
//! container.register::<Engine>()?.as_singleton();
//! container.register::<Car>()?;
//!
//! let car = container.create_instance::<Car>()?;
//! ```

pub mod cache;
pub mod compiler;
pub mod container;
pub mod lifecycle;
pub mod plan;
pub mod provided;
pub mod registration;
pub mod scope;

pub use cache::{PlanSignature, ResolverCache};
pub use compiler::GraphCompiler;
pub use container::{Container, ContainerStats};
pub use lifecycle::LifecycleStore;
pub use plan::{CompiledPlan, ExecutionFrame};
pub use provided::{ProvidedMatch, ProvidedValueResolver};
pub use registration::{Recipe, RegistrationEntry, RegistrationHandle, RegistrationStore};
pub use scope::ScopedSession;

pub use di_abstractions::*;
pub use infrastructure_common::{
    Capabilities, Component, ContainerConfig, DependencyError, DependencyResult, Disposable,
    Lifetime, TypeKey,
};
