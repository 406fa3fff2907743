//! 元数据定义
//!
//! 提供类型标识和注册描述信息

use crate::lifecycle::Lifetime;
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型标识
///
/// 容器中所有注册、覆盖值和缓存签名都以 `TypeKey` 作为键。
/// 相等性和哈希只看 `TypeId`；排序先按类型名再按 `TypeId`，
/// 因此任意一组键都有稳定的规范顺序。
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// 从类型获取类型标识，支持 `dyn Trait` 等非定长类型
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 类型ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        // 泛型参数里也可能带路径，只截取最外层
        let head = self.name.split('<').next().unwrap_or(self.name);
        match head.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }

    /// 是否与类型 `T` 相同
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 配方种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    /// 通过唯一构造函数创建
    Constructor,
    /// 通过工厂闭包创建
    Factory,
    /// 值类型，直接返回默认值
    DefaultValue,
    /// 预先构建好的实例
    Instance,
}

/// 注册描述符
///
/// 注册表的只读视图，用于枚举已注册的组件
#[derive(Debug, Clone)]
pub struct RegistrationDescriptor {
    /// 注册键
    pub key: TypeKey,
    /// 实现类型
    pub implementation: TypeKey,
    /// 配方种类
    pub kind: RecipeKind,
    /// 生命周期
    pub lifetime: Lifetime,
    /// 按顺序排列的依赖类型
    pub parameters: Vec<TypeKey>,
    /// 单例是否已经实例化
    pub instantiated: bool,
}

impl RegistrationDescriptor {
    /// 是否以自身类型注册
    pub fn is_self_bound(&self) -> bool {
        self.key == self.implementation
    }
}
