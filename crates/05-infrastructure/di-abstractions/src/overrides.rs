//! 调用方提供的覆盖值
//!
//! 每次解析都可以附带一组已经构建好的实例，它们优先于注册表中的配方。

use crate::instance::Instance;
use infrastructure_common::{Component, TypeKey, Upcast};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 单个覆盖值
#[derive(Clone)]
pub struct ProvidedValue {
    instance: Instance,
    supertypes: Vec<Upcast>,
}

impl ProvidedValue {
    /// 覆盖值实例
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// 运行时类型
    pub fn key(&self) -> TypeKey {
        self.instance.key()
    }

    /// 查找到指定祖先类型的转换
    pub fn upcast_to(&self, key: &TypeKey) -> Option<&Upcast> {
        self.supertypes.iter().find(|u| u.target() == *key)
    }

    /// 祖先链中的位置，越小越近
    pub fn ancestor_distance(&self, key: &TypeKey) -> Option<usize> {
        self.supertypes.iter().position(|u| u.target() == *key)
    }
}

impl fmt::Debug for ProvidedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedValue")
            .field("key", &self.instance.key())
            .field("supertypes", &self.supertypes)
            .finish()
    }
}

/// 覆盖值集合
///
/// 按运行时类型索引，遍历顺序是 [`TypeKey`] 的规范顺序，与插入顺序无关。
/// 覆盖值归调用方所有，容器不会释放它们。
#[derive(Clone, Default)]
pub struct Overrides {
    values: BTreeMap<TypeKey, ProvidedValue>,
}

impl Overrides {
    /// 创建空的覆盖值集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 提供一个组件值
    pub fn provide<T: Component>(self, value: T) -> Self {
        self.provide_arc(Arc::new(value))
    }

    /// 提供一个共享的组件值
    ///
    /// 组件声明的超类型用于匹配未注册的祖先类型
    pub fn provide_arc<T: Component>(mut self, value: Arc<T>) -> Self {
        let capabilities = T::capabilities();
        let provided = ProvidedValue {
            instance: Instance::new(value),
            supertypes: capabilities.supertypes().to_vec(),
        };
        self.values.insert(TypeKey::of::<T>(), provided);
        self
    }

    /// 以指定键提供值，只做精确匹配
    pub fn provide_as<K>(mut self, value: Arc<K>) -> Self
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let provided = ProvidedValue {
            instance: Instance::new(value),
            supertypes: Vec::new(),
        };
        self.values.insert(TypeKey::of::<K>(), provided);
        self
    }

    /// 精确查找
    pub fn get(&self, key: &TypeKey) -> Option<&ProvidedValue> {
        self.values.get(key)
    }

    /// 是否包含指定类型
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.values.contains_key(key)
    }

    /// 按规范顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ProvidedValue> {
        self.values.values()
    }

    /// 覆盖值的形状：按规范顺序排列的类型列表
    pub fn signature(&self) -> Vec<TypeKey> {
        self.values.keys().copied().collect()
    }

    /// 覆盖值数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure_common::Capabilities;

    trait Animal: Send + Sync {}

    struct Cat;
    struct Dog;

    impl Animal for Cat {}
    impl Animal for Dog {}

    impl Component for Cat {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new().assignable_to::<dyn Animal>(|c| c as Arc<dyn Animal>)
        }
    }

    impl Component for Dog {}

    #[test]
    fn test_signature_ignores_insertion_order() {
        let a = Overrides::new().provide(Cat).provide(Dog);
        let b = Overrides::new().provide(Dog).provide(Cat);
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let overrides = Overrides::new()
            .provide_as::<u32>(Arc::new(1))
            .provide_as::<u32>(Arc::new(2));
        assert_eq!(overrides.len(), 1);
        let value = overrides.get(&TypeKey::of::<u32>()).unwrap();
        assert_eq!(*value.instance().downcast::<u32>().unwrap(), 2);
    }

    #[test]
    fn test_supertypes_are_kept() {
        let overrides = Overrides::new().provide(Cat);
        let cat = overrides.get(&TypeKey::of::<Cat>()).unwrap();
        assert_eq!(cat.ancestor_distance(&TypeKey::of::<dyn Animal>()), Some(0));
        assert!(cat.upcast_to(&TypeKey::of::<Dog>()).is_none());
    }
}
