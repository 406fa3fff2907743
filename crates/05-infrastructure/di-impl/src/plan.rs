//! 编译后的构建计划

use crate::scope::ScopedSession;
use di_abstractions::{Instance, Overrides};
use infrastructure_common::{DependencyResult, TypeKey};
use std::fmt;
use std::sync::Arc;

/// 计划中的一个节点
pub(crate) type Node = Arc<dyn Fn(&mut ExecutionFrame<'_>) -> DependencyResult<Instance> + Send + Sync>;

/// 单次执行的上下文
///
/// 每次执行都有独立的对象图槽位，同一次执行中的 PerGraph 组件共享槽位中的实例
pub struct ExecutionFrame<'a> {
    overrides: &'a Overrides,
    session: Option<&'a ScopedSession<'a>>,
    slots: Vec<Option<Instance>>,
}

impl<'a> ExecutionFrame<'a> {
    pub(crate) fn new(
        overrides: &'a Overrides,
        session: Option<&'a ScopedSession<'a>>,
        slot_count: usize,
    ) -> Self {
        Self {
            overrides,
            session,
            slots: vec![None; slot_count],
        }
    }

    /// 本次调用的覆盖值
    pub fn overrides(&self) -> &'a Overrides {
        self.overrides
    }

    /// 当前作用域会话
    pub fn session(&self) -> Option<&'a ScopedSession<'a>> {
        self.session
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Instance> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn fill_slot(&mut self, index: usize, instance: Instance) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(instance);
        }
    }
}

/// 构建计划
///
/// 编译一次，可以在任意线程上重复执行
pub struct CompiledPlan {
    target: TypeKey,
    root: Node,
    slot_count: usize,
}

impl CompiledPlan {
    pub(crate) fn new(target: TypeKey, root: Node, slot_count: usize) -> Self {
        Self {
            target,
            root,
            slot_count,
        }
    }

    /// 目标类型
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// 对象图槽位数量
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// 执行计划
    pub fn execute(
        &self,
        overrides: &Overrides,
        session: Option<&ScopedSession<'_>>,
    ) -> DependencyResult<Instance> {
        let mut frame = ExecutionFrame::new(overrides, session, self.slot_count);
        (self.root)(&mut frame)
    }
}

impl fmt::Debug for CompiledPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPlan")
            .field("target", &self.target)
            .field("slot_count", &self.slot_count)
            .finish()
    }
}
