//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`ServiceRegistry`] - 组件注册表接口
//! - [`ServiceProvider`] - 按类型获取服务的接口
//! - [`Injectable`] / [`Factory`] - 组件的构造方式
//! - [`Overrides`] - 调用方提供的覆盖值
//! - [`InjectFields`] - 字段注入

pub mod factory;
pub mod fields;
pub mod instance;
pub mod overrides;
pub mod registry;
pub mod resolver;

pub use factory::*;
pub use fields::*;
pub use instance::*;
pub use overrides::*;
pub use registry::*;
pub use resolver::*;
