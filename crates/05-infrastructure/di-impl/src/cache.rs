//! 构建计划缓存

use crate::plan::CompiledPlan;
use dashmap::DashMap;
use di_abstractions::Overrides;
use infrastructure_common::{DependencyResult, TypeKey};
use parking_lot::ReentrantMutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// 构建计划的缓存键：目标类型加上覆盖值的形状
///
/// 形状按 [`TypeKey`] 的规范顺序排列，提供顺序不同的同一组类型得到同一个键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanSignature {
    target: TypeKey,
    provided: Vec<TypeKey>,
}

impl PlanSignature {
    /// 创建缓存键
    pub fn new(target: TypeKey, overrides: &Overrides) -> Self {
        Self {
            target,
            provided: overrides.signature(),
        }
    }

    /// 目标类型
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// 覆盖值形状
    pub fn provided(&self) -> &[TypeKey] {
        &self.provided
    }
}

impl fmt::Display for PlanSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target.short_name())?;
        if !self.provided.is_empty() {
            let provided: Vec<_> = self.provided.iter().map(|k| k.short_name()).collect();
            write!(f, "[{}]", provided.join(", "))?;
        }
        Ok(())
    }
}

/// 构建计划缓存
///
/// 读取无锁；未命中时在编译锁内二次检查，同一个键最多编译一次。
/// 编译锁可重入，工厂在构建单例时再次解析不会死锁。
pub struct ResolverCache {
    plans: DashMap<PlanSignature, Arc<CompiledPlan>>,
    compile_lock: ReentrantMutex<()>,
    enabled: bool,
}

impl ResolverCache {
    /// 创建缓存，禁用时每次解析都重新编译
    pub fn new(enabled: bool) -> Self {
        Self {
            plans: DashMap::new(),
            compile_lock: ReentrantMutex::new(()),
            enabled,
        }
    }

    /// 是否启用
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 获取或编译构建计划
    pub fn get_or_compile<F>(
        &self,
        signature: PlanSignature,
        compile: F,
    ) -> DependencyResult<Arc<CompiledPlan>>
    where
        F: FnOnce() -> DependencyResult<CompiledPlan>,
    {
        if !self.enabled {
            return compile().map(Arc::new);
        }

        if let Some(plan) = self.plans.get(&signature) {
            trace!("构建计划命中: {}", signature);
            return Ok(Arc::clone(plan.value()));
        }

        let _guard = self.compile_lock.lock();
        if let Some(plan) = self.plans.get(&signature) {
            return Ok(Arc::clone(plan.value()));
        }

        debug!("编译构建计划: {}", signature);
        let plan = Arc::new(compile()?);
        self.plans.insert(signature, Arc::clone(&plan));
        Ok(plan)
    }

    /// 是否已缓存
    pub fn contains(&self, signature: &PlanSignature) -> bool {
        self.plans.contains_key(signature)
    }

    /// 已缓存的计划数量
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// 清空缓存，注册变化后调用
    pub fn clear(&self) {
        if !self.plans.is_empty() {
            debug!("清空构建计划缓存: {} 个", self.plans.len());
            self.plans.clear();
        }
    }
}

impl fmt::Debug for ResolverCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverCache")
            .field("plans", &self.plans.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}
