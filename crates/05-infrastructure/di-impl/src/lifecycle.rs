//! 生命周期管理
//!
//! 记录容器创建的单例，容器释放时按创建顺序的逆序调用释放钩子。

use di_abstractions::Instance;
use infrastructure_common::TypeKey;
use parking_lot::Mutex;
use tracing::{debug, info};

/// 单例生命周期存储
///
/// 只记录已经创建的实例，从不触发构建
#[derive(Debug, Default)]
pub struct LifecycleStore {
    singletons: Mutex<Vec<Instance>>,
}

impl LifecycleStore {
    /// 创建新的生命周期存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录新创建的单例
    pub fn track_singleton(&self, instance: &Instance) {
        self.singletons.lock().push(instance.clone());
    }

    /// 已创建的单例数量
    pub fn active_singletons(&self) -> usize {
        self.singletons.lock().len()
    }

    /// 已创建的单例类型，按创建顺序
    pub fn singleton_keys(&self) -> Vec<TypeKey> {
        self.singletons.lock().iter().map(Instance::key).collect()
    }

    /// 释放所有单例，返回调用的释放钩子数量
    ///
    /// 重复调用是安全的，第二次调用不会释放任何实例
    pub fn dispose_all(&self) -> usize {
        let singletons = std::mem::take(&mut *self.singletons.lock());
        if singletons.is_empty() {
            return 0;
        }
        let released = release_in_reverse(singletons);
        info!("单例已释放: {} 个", released);
        released
    }
}

/// 按创建顺序的逆序调用释放钩子
///
/// 调用钩子时不持有任何锁
pub(crate) fn release_in_reverse(instances: Vec<Instance>) -> usize {
    let mut released = 0;
    for instance in instances.into_iter().rev() {
        if let Some(release) = instance.release_hook() {
            debug!("释放实例: {}", instance.key().short_name());
            release();
            released += 1;
        }
    }
    released
}
