//! 作用域会话
//!
//! 会话内的 Scoped 组件每种类型只创建一次，会话结束时按创建顺序的逆序释放。

use crate::container::Container;
use crate::lifecycle::release_in_reverse;
use di_abstractions::{Instance, Overrides, ServiceProvider};
use infrastructure_common::{DependencyError, DependencyResult, ScopeInfo, TypeKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct SessionState {
    instances: HashMap<TypeKey, Instance>,
    created: Vec<Instance>,
    closed: bool,
}

/// 作用域会话
///
/// 会话借用创建它的容器，单例仍由容器持有，在会话之间共享
pub struct ScopedSession<'c> {
    container: &'c Container,
    info: ScopeInfo,
    state: Mutex<SessionState>,
}

impl<'c> ScopedSession<'c> {
    pub(crate) fn new(container: &'c Container, info: ScopeInfo) -> Self {
        debug!("创建作用域: {} ({})", info.name, info.id);
        Self {
            container,
            info,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// 作用域信息
    pub fn info(&self) -> &ScopeInfo {
        &self.info
    }

    /// 创建子作用域，子作用域有自己的 Scoped 实例
    pub fn create_child_scope(&self, name: impl Into<String>) -> ScopedSession<'c> {
        ScopedSession::new(self.container, self.info.child(name))
    }

    /// 在会话中解析组件
    pub fn create_instance<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.create_instance_with::<T>(&Overrides::new())
    }

    /// 在会话中附带覆盖值解析组件
    pub fn create_instance_with<T>(&self, overrides: &Overrides) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_service_with(&TypeKey::of::<T>(), overrides)?
            .downcast::<T>()
    }

    /// 获取会话中的实例，不存在时调用 `create` 创建
    ///
    /// 构建期间不持有会话锁，依赖链上的其他 Scoped 组件可以再次进入会话
    pub fn get_or_create<F>(&self, key: TypeKey, create: F) -> DependencyResult<Instance>
    where
        F: FnOnce() -> DependencyResult<Instance>,
    {
        {
            let state = self.state.lock();
            self.ensure_open(&state)?;
            if let Some(instance) = state.instances.get(&key) {
                return Ok(instance.clone());
            }
        }

        let instance = create()?;

        let mut state = self.state.lock();
        let existing = match self.ensure_open(&state) {
            Ok(()) => state.instances.get(&key).cloned(),
            Err(err) => {
                drop(state);
                release_in_reverse(vec![instance]);
                return Err(err);
            }
        };
        if let Some(existing) = existing {
            drop(state);
            // 另一个调用者先写入，本次构建的实例不会再被使用
            debug!("作用域 {} 丢弃重复构建的实例: {}", self.info.name, key.short_name());
            release_in_reverse(vec![instance]);
            return Ok(existing);
        }
        debug!("作用域 {} 创建实例: {}", self.info.name, key.short_name());
        state.instances.insert(key, instance.clone());
        state.created.push(instance.clone());
        Ok(instance)
    }

    /// 会话中的 Scoped 实例数量
    pub fn scoped_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 关闭会话，释放会话内创建的实例，返回调用的释放钩子数量
    pub fn close(&self) -> usize {
        let created = {
            let mut state = self.state.lock();
            if state.closed {
                return 0;
            }
            state.closed = true;
            state.instances.clear();
            std::mem::take(&mut state.created)
        };

        let released = release_in_reverse(created);
        info!("作用域已关闭: {} (释放 {} 个实例)", self.info.name, released);
        released
    }

    fn ensure_open(&self, state: &SessionState) -> DependencyResult<()> {
        if state.closed {
            warn!("作用域已关闭: {}", self.info.name);
            return Err(DependencyError::SessionClosed {
                scope_id: self.info.id.to_string(),
            });
        }
        Ok(())
    }
}

impl ServiceProvider for ScopedSession<'_> {
    fn get_service_with(&self, key: &TypeKey, overrides: &Overrides) -> DependencyResult<Instance> {
        self.ensure_open(&self.state.lock())?;
        self.container.resolve_key(key, overrides, Some(self))
    }
}

impl Drop for ScopedSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ScopedSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ScopedSession")
            .field("info", &self.info)
            .field("instances", &state.instances.len())
            .field("closed", &state.closed)
            .finish()
    }
}
