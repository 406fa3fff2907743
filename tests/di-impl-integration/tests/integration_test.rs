//! 依赖注入容器的端到端测试：作用域、释放、字段注入、配置和并发解析

use anyhow::Result;
use di_abstractions::{
    Constructor, FieldResolver, InjectFields, Injectable, LifetimeConfigurator, Overrides,
    ServiceProviderExt, ServiceRegistry,
};
use di_impl::Container;
use infrastructure_common::{
    Capabilities, Component, ContainerConfig, DependencyError, DependencyResult, Disposable,
    Lifetime,
};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use tempfile::NamedTempFile;

static INIT_LOGGER: Once = Once::new();

fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 记录释放的连接
#[derive(Default)]
struct Connection {
    disposed: AtomicBool,
}

impl Connection {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Disposable for Connection {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl Component for Connection {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().disposable()
    }
}

impl Injectable for Connection {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(Connection::default)]
    }
}

struct Repository {
    connection: Arc<Connection>,
}

impl Component for Repository {}

impl Injectable for Repository {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|connection: Arc<Connection>| Repository {
            connection,
        })]
    }
}

struct Clock;

impl Component for Clock {}

impl Injectable for Clock {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|| Clock)]
    }
}

/// 释放时写入日志
struct First {
    log: Arc<Mutex<Vec<&'static str>>>,
}

struct Second {
    first: Arc<First>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Disposable for First {
    fn dispose(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.push("first");
        }
    }
}

impl Disposable for Second {
    fn dispose(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.push("second");
        }
    }
}

impl Component for First {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().disposable()
    }
}

impl Component for Second {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().disposable()
    }
}

#[derive(Default)]
struct ReportJob {
    repository: Option<Arc<Repository>>,
    clock: Option<Arc<Clock>>,
}

impl InjectFields for ReportJob {
    fn inject_fields(&mut self, resolver: &FieldResolver<'_>) -> DependencyResult<()> {
        self.repository = Some(resolver.resolve::<Repository>()?);
        self.clock = Some(resolver.resolve::<Clock>()?);
        Ok(())
    }
}

#[test]
fn test_scoped_instance_shared_within_session() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_scoped();
    container.register::<Repository>()?;

    let scope = container.create_scope();
    let first = scope.create_instance::<Repository>()?;
    let second = scope.create_instance::<Repository>()?;
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.connection, &second.connection));
    assert_eq!(scope.scoped_count(), 1);

    let other = container.create_scope();
    let third = other.create_instance::<Repository>()?;
    assert!(!Arc::ptr_eq(&first.connection, &third.connection));
    Ok(())
}

#[test]
fn test_scoped_differs_between_container_and_session() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_scoped();

    let scope = container.create_scope();
    let in_scope = scope.create_instance::<Connection>()?;
    let outside = container.create_instance::<Connection>()?;
    assert!(!Arc::ptr_eq(&in_scope, &outside));

    let child = scope.create_child_scope("request");
    let in_child = child.create_instance::<Connection>()?;
    assert!(!Arc::ptr_eq(&in_scope, &in_child));
    assert!(child.info().name.ends_with(".request"));
    Ok(())
}

#[test]
fn test_closing_session_disposes_scoped_instances() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_scoped();

    let scope = container.create_scope();
    let connection = scope.create_instance::<Connection>()?;
    assert!(!connection.is_disposed());

    assert_eq!(scope.close(), 1);
    assert!(connection.is_disposed());
    assert_eq!(scope.close(), 0);

    match scope.create_instance::<Connection>() {
        Err(DependencyError::SessionClosed { scope_id }) => {
            assert_eq!(scope_id, scope.info().id.to_string());
        }
        other => panic!("expected closed session, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_session_releases_scoped_instances_in_reverse_order() -> Result<()> {
    init_test_logger();

    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();

    let first_log = Arc::clone(&log);
    container
        .register_factory(move || First {
            log: Arc::clone(&first_log),
        })
        .as_scoped();
    let second_log = Arc::clone(&log);
    container
        .register_factory(move |first: Arc<First>| Second {
            first,
            log: Arc::clone(&second_log),
        })
        .as_scoped();

    let scope = container.create_scope();
    let second = scope.create_instance::<Second>()?;
    assert!(Arc::ptr_eq(&second.first, &scope.create_instance::<First>()?));
    assert_eq!(scope.scoped_count(), 2);
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(scope.close(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    Ok(())
}

#[test]
fn test_dropping_session_disposes_scoped_instances() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_scoped();

    let connection = {
        let scope = container.create_named_scope("short-lived");
        scope.create_instance::<Connection>()?
    };
    assert!(connection.is_disposed());
    Ok(())
}

#[test]
fn test_singleton_preserved_between_sessions() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_singleton();

    let from_first = {
        let scope = container.create_scope();
        scope.create_instance::<Connection>()?
    };
    let scope = container.create_scope();
    let from_second = scope.create_instance::<Connection>()?;

    assert!(Arc::ptr_eq(&from_first, &from_second));
    // 会话不释放单例
    assert!(!from_first.is_disposed());
    Ok(())
}

#[test]
fn test_container_disposes_singletons_in_reverse_order() -> Result<()> {
    init_test_logger();

    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();

    let first_log = Arc::clone(&log);
    container
        .register_factory(move || First {
            log: Arc::clone(&first_log),
        })
        .as_singleton();
    let second_log = Arc::clone(&log);
    container
        .register_factory(move |first: Arc<First>| Second {
            first,
            log: Arc::clone(&second_log),
        })
        .as_singleton();
    container.register::<Clock>()?.as_singleton();

    // 解析 Second 时先创建 First
    let second = container.create_instance::<Second>()?;
    assert!(Arc::ptr_eq(&second.first, &container.create_instance::<First>()?));
    container.create_instance::<Clock>()?;
    assert_eq!(container.stats().active_singletons, 3);

    // Clock 没有声明释放能力
    assert_eq!(container.dispose(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    Ok(())
}

trait Resource: Send + Sync {
    fn is_open(&self) -> bool;
}

/// 以接口注册、由工厂创建，释放能力来自具体类型
#[derive(Default)]
struct PooledConnection {
    inner: Connection,
}

impl Resource for PooledConnection {
    fn is_open(&self) -> bool {
        !self.inner.is_disposed()
    }
}

impl Disposable for PooledConnection {
    fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Component for PooledConnection {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
            .assignable_to::<dyn Resource>(|c| c as Arc<dyn Resource>)
            .disposable()
    }
}

#[test]
fn test_container_disposes_singleton_from_interface_factory() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container
        .register_factory_as::<dyn Resource, PooledConnection, _, _>(PooledConnection::default)?
        .as_singleton();

    let resource = container.create_instance::<dyn Resource>()?;
    assert!(resource.is_open());
    assert!(Arc::ptr_eq(
        &resource,
        &container.create_instance::<dyn Resource>()?
    ));

    assert_eq!(container.dispose(), 1);
    assert!(!resource.is_open());
    Ok(())
}

#[test]
fn test_field_injection() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_singleton();
    container.register::<Repository>()?;
    container.register::<Clock>()?;

    let mut job = ReportJob::default();
    container.resolve_fields(&mut job, &Overrides::new())?;

    let repository = job.repository.expect("repository injected");
    assert!(Arc::ptr_eq(
        &repository.connection,
        &container.create_instance::<Connection>()?
    ));
    assert!(job.clock.is_some());
    Ok(())
}

#[test]
fn test_field_injection_in_session_uses_overrides() -> Result<()> {
    init_test_logger();

    let container = Container::new();
    container.register::<Connection>()?.as_scoped();
    container.register::<Repository>()?;
    container.register::<Clock>()?;

    let clock = Arc::new(Clock);
    let overrides = Overrides::new().provide_arc(Arc::clone(&clock));

    let scope = container.create_scope();
    let mut job = ReportJob::default();
    scope.resolve_fields(&mut job, &overrides)?;

    assert!(Arc::ptr_eq(job.clock.as_ref().expect("clock"), &clock));
    assert!(Arc::ptr_eq(
        &job.repository.expect("repository").connection,
        &scope.create_instance::<Connection>()?
    ));
    Ok(())
}

#[test]
fn test_container_from_toml_file() -> Result<()> {
    init_test_logger();

    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
default_lifetime = "per_graph"
max_resolution_depth = 3
"#
    )?;

    let config = ContainerConfig::from_toml_file(file.path())?;
    assert_eq!(config.default_lifetime, Lifetime::PerGraph);
    assert!(config.enable_plan_cache);

    let container = Container::with_config(config);
    let handle = container.register::<Clock>()?;
    assert_eq!(handle.lifetime(), Lifetime::PerGraph);
    Ok(())
}

#[test]
fn test_resolution_depth_limit() -> Result<()> {
    init_test_logger();

    let container = Container::with_config(ContainerConfig::default().with_max_resolution_depth(1));
    container.register::<Connection>()?;
    container.register::<Repository>()?;

    assert!(container.create_instance::<Connection>().is_ok());
    assert!(matches!(
        container.create_instance::<Repository>(),
        Err(DependencyError::ResolutionDepthExceeded { max_depth: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_disabled_plan_cache() -> Result<()> {
    init_test_logger();

    let container = Container::with_config(ContainerConfig::default().with_plan_cache(false));
    container.register::<Clock>()?;
    container.create_instance::<Clock>()?;
    container.create_instance::<Clock>()?;
    assert_eq!(container.stats().compiled_plans, 0);
    Ok(())
}

#[test]
fn test_concurrent_resolution_shares_singleton() -> Result<()> {
    init_test_logger();

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Expensive;

    impl Component for Expensive {}

    let container = Container::new();
    container
        .register_factory(|| {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Expensive
        })
        .as_singleton();
    container.register::<Clock>()?;

    let resolved: Vec<Arc<Expensive>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    container.create_instance::<Clock>().map(|_| ())?;
                    container.create_instance::<Expensive>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("resolver thread panicked"))
            .collect::<DependencyResult<Vec<_>>>()
    })?;

    assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    Ok(())
}
