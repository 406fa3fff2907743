//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn DI 容器各层共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`TypeKey`] - 类型标识
//! - [`Component`] / [`Capabilities`] - 组件能力声明
//! - [`Lifetime`] - 组件生命周期
//! - [`DependencyError`] - 依赖注入错误
//! - [`ContainerConfig`] - 容器配置
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统，不依赖运行时反射
//! - 容器状态显式归属，不使用全局变量
//! - 同步解析，没有挂起点

pub mod component;
pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
