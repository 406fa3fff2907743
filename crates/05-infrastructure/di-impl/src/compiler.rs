//! 依赖图编译器
//!
//! 把注册表和覆盖值的形状编译成可重复执行的 [`CompiledPlan`]。
//! 循环依赖、缺失注册和单例约束都在编译阶段报告。

use crate::lifecycle::LifecycleStore;
use crate::plan::{CompiledPlan, ExecutionFrame, Node};
use crate::provided::{ProvidedMatch, ProvidedValueResolver};
use crate::registration::{Recipe, RegistrationEntry, RegistrationStore};
use di_abstractions::{Instance, Overrides, ResolutionChain};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, TypeKey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// 依赖图编译器
pub struct GraphCompiler<'a> {
    registrations: &'a RegistrationStore,
    lifecycle: &'a LifecycleStore,
    overrides: &'a Overrides,
    chain: ResolutionChain,
    shared: HashMap<TypeKey, Node>,
    slot_count: usize,
}

impl<'a> GraphCompiler<'a> {
    /// 创建编译器，`overrides` 只用于读取形状
    pub fn new(
        registrations: &'a RegistrationStore,
        lifecycle: &'a LifecycleStore,
        overrides: &'a Overrides,
        max_depth: usize,
    ) -> Self {
        Self {
            registrations,
            lifecycle,
            overrides,
            chain: ResolutionChain::new(max_depth),
            shared: HashMap::new(),
            slot_count: 0,
        }
    }

    /// 编译目标类型
    pub fn compile(mut self, target: TypeKey) -> DependencyResult<CompiledPlan> {
        let root = self.compile_node(target, false)?;
        debug!(
            "构建计划编译完成: {} (槽位 {})",
            target.short_name(),
            self.slot_count
        );
        Ok(CompiledPlan::new(target, root, self.slot_count))
    }

    fn compile_node(&mut self, key: TypeKey, must_be_singleton: bool) -> DependencyResult<Node> {
        self.chain.push(key)?;
        let result = self.compile_visiting(key, must_be_singleton);
        self.chain.pop();
        result
    }

    fn compile_visiting(&mut self, key: TypeKey, must_be_singleton: bool) -> DependencyResult<Node> {
        let entry = self.registrations.get(&key);

        // 单例的依赖图与调用无关，不使用覆盖值
        if !must_be_singleton {
            if let Some(found) = ProvidedValueResolver::find(self.overrides, &key, entry.is_some()) {
                trace!("使用覆盖值: {} <- {:?}", key.short_name(), found);
                return Ok(provided_node(found));
            }
        }

        let entry = entry.ok_or_else(|| DependencyError::MissingRegistration {
            type_name: key.name().to_string(),
        })?;

        if must_be_singleton && !entry.is_singleton_compatible() {
            let singleton = self.chain.parent().unwrap_or(key);
            return Err(DependencyError::UnAllowedConstruct {
                singleton: singleton.name().to_string(),
                dependency: key.name().to_string(),
            });
        }

        match entry.lifetime() {
            Lifetime::Singleton => self.compile_singleton(&entry),
            Lifetime::PerGraph => self.compile_shared(&entry, false),
            Lifetime::Scoped => self.compile_shared(&entry, true),
            Lifetime::Transient => {
                let dependencies = self.compile_dependencies(entry.recipe(), must_be_singleton)?;
                Ok(construct_node(entry.recipe(), dependencies))
            }
        }
    }

    fn compile_dependencies(
        &mut self,
        recipe: &Recipe,
        must_be_singleton: bool,
    ) -> DependencyResult<Vec<Node>> {
        recipe
            .parameters()
            .iter()
            .map(|parameter| self.compile_node(*parameter, must_be_singleton))
            .collect()
    }

    /// 单例在编译时立即构建，计划中只保留常量节点
    fn compile_singleton(&mut self, entry: &RegistrationEntry) -> DependencyResult<Node> {
        if let Some(instance) = entry.singleton_instance() {
            return Ok(constant_node(instance.clone()));
        }

        let dependencies = self.compile_dependencies(entry.recipe(), true)?;
        let construct = construct_node(entry.recipe(), dependencies);
        let lifecycle = self.lifecycle;
        let slot_count = self.slot_count;

        let instance = entry.singleton_slot().get_or_try_init(|| {
            let empty = Overrides::new();
            let mut frame = ExecutionFrame::new(&empty, None, slot_count);
            let instance = construct(&mut frame)?;
            lifecycle.track_singleton(&instance);
            debug!("创建单例: {}", entry.key().short_name());
            Ok::<_, DependencyError>(instance)
        })?;

        Ok(constant_node(instance.clone()))
    }

    /// PerGraph 和 Scoped 组件在同一个计划中共用一个节点
    fn compile_shared(&mut self, entry: &RegistrationEntry, scoped: bool) -> DependencyResult<Node> {
        let key = entry.key();
        if let Some(node) = self.shared.get(&key) {
            return Ok(Arc::clone(node));
        }

        let dependencies = self.compile_dependencies(entry.recipe(), false)?;
        let construct = construct_node(entry.recipe(), dependencies);
        let slot = self.slot_count;
        self.slot_count += 1;

        let node: Node = Arc::new(move |frame: &mut ExecutionFrame<'_>| -> DependencyResult<Instance> {
            if scoped {
                // 会话锁不会在构建期间持有
                if let Some(session) = frame.session() {
                    return session.get_or_create(key, || construct(frame));
                }
            }

            if let Some(instance) = frame.slot(slot) {
                return Ok(instance.clone());
            }
            let instance = construct(frame)?;
            frame.fill_slot(slot, instance.clone());
            Ok(instance)
        });

        self.shared.insert(key, Arc::clone(&node));
        Ok(node)
    }
}

fn construct_node(recipe: &Recipe, dependencies: Vec<Node>) -> Node {
    let recipe = recipe.clone();
    Arc::new(move |frame: &mut ExecutionFrame<'_>| -> DependencyResult<Instance> {
        let mut values = Vec::with_capacity(dependencies.len());
        for dependency in &dependencies {
            values.push(dependency(frame)?);
        }
        recipe.construct(values)
    })
}

fn constant_node(instance: Instance) -> Node {
    Arc::new(move |_: &mut ExecutionFrame<'_>| -> DependencyResult<Instance> {
        Ok(instance.clone())
    })
}

fn provided_node(found: ProvidedMatch) -> Node {
    Arc::new(move |frame: &mut ExecutionFrame<'_>| {
        ProvidedValueResolver::read(frame.overrides(), &found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::Recipe;
    use di_abstractions::{Constructor, Injectable};
    use infrastructure_common::Component;

    struct Leaf;
    struct Branch(Arc<Leaf>, Arc<Leaf>);
    struct Ouroboros;

    impl Component for Leaf {}
    impl Component for Branch {}
    impl Component for Ouroboros {}

    impl Injectable for Leaf {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|| Leaf)]
        }
    }

    impl Injectable for Branch {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|a: Arc<Leaf>, b: Arc<Leaf>| Branch(a, b))]
        }
    }

    impl Injectable for Ouroboros {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|_me: Arc<Ouroboros>| Ouroboros)]
        }
    }

    fn store_with(entries: Vec<(TypeKey, Recipe, Lifetime)>) -> RegistrationStore {
        let store = RegistrationStore::new();
        for (key, recipe, lifetime) in entries {
            store.insert(RegistrationEntry::new(key, recipe, lifetime));
        }
        store
    }

    fn compile(store: &RegistrationStore, target: TypeKey) -> DependencyResult<CompiledPlan> {
        let lifecycle = LifecycleStore::new();
        let overrides = Overrides::new();
        GraphCompiler::new(store, &lifecycle, &overrides, 100).compile(target)
    }

    #[test]
    fn test_per_graph_shares_one_slot() {
        let store = store_with(vec![
            (TypeKey::of::<Leaf>(), Recipe::from_injectable::<Leaf>().unwrap(), Lifetime::PerGraph),
            (TypeKey::of::<Branch>(), Recipe::from_injectable::<Branch>().unwrap(), Lifetime::Transient),
        ]);

        let plan = compile(&store, TypeKey::of::<Branch>()).unwrap();
        assert_eq!(plan.slot_count(), 1);

        let first = plan.execute(&Overrides::new(), None).unwrap();
        let first = first.downcast::<Branch>().unwrap();
        assert!(Arc::ptr_eq(&first.0, &first.1));

        let second = plan.execute(&Overrides::new(), None).unwrap();
        let second = second.downcast::<Branch>().unwrap();
        assert!(!Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    fn test_transient_never_shares() {
        let store = store_with(vec![
            (TypeKey::of::<Leaf>(), Recipe::from_injectable::<Leaf>().unwrap(), Lifetime::Transient),
            (TypeKey::of::<Branch>(), Recipe::from_injectable::<Branch>().unwrap(), Lifetime::Transient),
        ]);

        let plan = compile(&store, TypeKey::of::<Branch>()).unwrap();
        assert_eq!(plan.slot_count(), 0);
        let branch = plan.execute(&Overrides::new(), None).unwrap();
        let branch = branch.downcast::<Branch>().unwrap();
        assert!(!Arc::ptr_eq(&branch.0, &branch.1));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let store = store_with(vec![(
            TypeKey::of::<Ouroboros>(),
            Recipe::from_injectable::<Ouroboros>().unwrap(),
            Lifetime::Transient,
        )]);

        match compile(&store, TypeKey::of::<Ouroboros>()) {
            Err(DependencyError::CircularDependencyDetected { dependency_chain }) => {
                assert_eq!(dependency_chain, "Ouroboros -> Ouroboros");
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.target())),
        }
    }

    #[test]
    fn test_missing_dependency() {
        let store = store_with(vec![(
            TypeKey::of::<Branch>(),
            Recipe::from_injectable::<Branch>().unwrap(),
            Lifetime::Transient,
        )]);

        assert!(matches!(
            compile(&store, TypeKey::of::<Branch>()),
            Err(DependencyError::MissingRegistration { .. })
        ));
    }

    #[test]
    fn test_singleton_rejects_transient_dependency() {
        let store = store_with(vec![
            (TypeKey::of::<Leaf>(), Recipe::from_injectable::<Leaf>().unwrap(), Lifetime::Transient),
            (TypeKey::of::<Branch>(), Recipe::from_injectable::<Branch>().unwrap(), Lifetime::Singleton),
        ]);

        match compile(&store, TypeKey::of::<Branch>()) {
            Err(DependencyError::UnAllowedConstruct {
                singleton,
                dependency,
            }) => {
                assert_eq!(singleton, TypeKey::of::<Branch>().name());
                assert_eq!(dependency, TypeKey::of::<Leaf>().name());
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.target())),
        }
        assert!(store
            .get(&TypeKey::of::<Branch>())
            .unwrap()
            .singleton_instance()
            .is_none());
    }

    #[test]
    fn test_singleton_is_built_at_compile_time() {
        let store = store_with(vec![
            (TypeKey::of::<Leaf>(), Recipe::from_injectable::<Leaf>().unwrap(), Lifetime::Singleton),
            (TypeKey::of::<Branch>(), Recipe::from_injectable::<Branch>().unwrap(), Lifetime::Transient),
        ]);

        let plan = compile(&store, TypeKey::of::<Branch>()).unwrap();
        let leaf = store.get(&TypeKey::of::<Leaf>()).unwrap();
        let cached = leaf.singleton_instance().unwrap().downcast::<Leaf>().unwrap();

        let branch = plan.execute(&Overrides::new(), None).unwrap();
        let branch = branch.downcast::<Branch>().unwrap();
        assert!(Arc::ptr_eq(&branch.0, &cached));
        assert!(Arc::ptr_eq(&branch.1, &cached));
    }
}
