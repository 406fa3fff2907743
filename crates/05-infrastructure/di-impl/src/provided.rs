//! 覆盖值匹配
//!
//! 编译时只看覆盖值的形状决定匹配方式，执行时再从本次调用的覆盖值中取出实例。

use di_abstractions::{Instance, Overrides};
use infrastructure_common::{DependencyError, DependencyResult, TypeKey, Upcast};
use std::fmt;

/// 覆盖值的匹配结果
#[derive(Clone)]
pub enum ProvidedMatch {
    /// 运行时类型与请求类型相同
    Exact(TypeKey),
    /// 请求类型未注册，由声明了该祖先类型的覆盖值代替
    Ancestor {
        /// 覆盖值的运行时类型
        provided: TypeKey,
        /// 到请求类型的转换
        upcast: Upcast,
    },
}

impl fmt::Debug for ProvidedMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            Self::Ancestor { provided, upcast } => f
                .debug_struct("Ancestor")
                .field("provided", provided)
                .field("target", &upcast.target())
                .finish(),
        }
    }
}

/// 覆盖值解析器
pub struct ProvidedValueResolver;

impl ProvidedValueResolver {
    /// 查找可以满足请求类型的覆盖值
    ///
    /// 精确匹配总是优先。只有请求类型未注册时才按祖先链匹配：
    /// 祖先距离近的优先，距离相同时取 [`TypeKey`] 规范顺序中靠前的覆盖值。
    pub fn find(overrides: &Overrides, key: &TypeKey, registered: bool) -> Option<ProvidedMatch> {
        if overrides.contains(key) {
            return Some(ProvidedMatch::Exact(*key));
        }
        if registered {
            return None;
        }

        overrides
            .iter()
            .filter_map(|provided| {
                let distance = provided.ancestor_distance(key)?;
                let upcast = provided.upcast_to(key)?.clone();
                Some((distance, provided.key(), upcast))
            })
            // iter 已按规范顺序排列，min_by_key 在距离相同时保留第一个
            .min_by_key(|(distance, _, _)| *distance)
            .map(|(_, provided, upcast)| ProvidedMatch::Ancestor { provided, upcast })
    }

    /// 从本次调用的覆盖值中取出实例
    pub fn read(overrides: &Overrides, found: &ProvidedMatch) -> DependencyResult<Instance> {
        match found {
            ProvidedMatch::Exact(key) => overrides
                .get(key)
                .map(|provided| provided.instance().clone())
                .ok_or_else(|| DependencyError::MissingRegistration {
                    type_name: key.name().to_string(),
                }),
            ProvidedMatch::Ancestor { provided, upcast } => {
                let value = overrides.get(provided).ok_or_else(|| {
                    DependencyError::MissingRegistration {
                        type_name: provided.name().to_string(),
                    }
                })?;
                value.instance().upcast(upcast)
            }
        }
    }
}
