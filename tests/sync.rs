use hierdi::{
    sync::{Container, Inject, Resolver},
    Config, InstantiateErrorKind, MissingPolicy, ResolveErrorKind, Scope, ServiceKey,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};
use tracing_test::traced_test;

struct Logger {
    tag: usize,
}

struct Database {
    url: String,
}

struct Repository {
    database: Arc<Database>,
}

struct ServiceA;
struct ServiceB;

struct Connection {
    container: Container,
    registrations_on_drop: Arc<AtomicUsize>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.registrations_on_drop
            .store(self.container.registration_count(), Ordering::SeqCst);
    }
}

fn counting_logger(container: &Container, scope: Scope) -> Arc<AtomicUsize> {
    let call_count = Arc::new(AtomicUsize::new(0));
    container.register(scope, {
        let call_count = call_count.clone();
        move |_: &Resolver<'_>| {
            let tag = call_count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Logger { tag })
        }
    });
    call_count
}

#[test]
#[traced_test]
fn test_never_registered() {
    let container = Container::new();

    assert!(container.resolve_optional::<Logger>().unwrap().is_none());
    assert!(container.resolve_optional_named::<Logger>("audit").unwrap().is_none());
    match container.resolve::<Logger>() {
        Err(ResolveErrorKind::NotRegistered { key }) => assert_eq!(key, ServiceKey::of::<Logger>()),
        other => panic!("not registered expected, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[traced_test]
fn test_logger_singleton_created_once() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Singleton);

    let tags: Vec<_> = (0..3).map(|_| container.resolve::<Logger>().unwrap().tag).collect();

    assert_eq!(tags, [1, 1, 1]);
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn test_transient_instances_independent() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Transient);

    let first = container.resolve::<Logger>().unwrap();
    let second = container.resolve::<Logger>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!((first.tag, second.tag), (1, 2));
    assert_eq!(call_count.load(Ordering::SeqCst), 2);
}

#[test]
#[traced_test]
fn test_weak_recreated_after_last_owner_dropped() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Weak);

    let first = container.resolve::<Logger>().unwrap();
    let second = container.resolve::<Logger>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    drop((first, second));
    assert_eq!(container.resolve::<Logger>().unwrap().tag, 2);
    assert_eq!(call_count.load(Ordering::SeqCst), 2);
}

#[test]
#[traced_test]
fn test_reregistration_replaces_factory_and_cache() {
    let container = Container::new();
    container.register(Scope::Singleton, |_: &Resolver<'_>| Ok(Logger { tag: 1 }));
    assert_eq!(container.resolve::<Logger>().unwrap().tag, 1);

    container.register(Scope::Singleton, |_: &Resolver<'_>| Ok(Logger { tag: 2 }));

    assert_eq!(container.resolve::<Logger>().unwrap().tag, 2);
    assert_eq!(container.registration_count(), 1);
}

#[test]
#[traced_test]
fn test_named_registrations_are_separate() {
    let container = Container::new();
    container
        .register_named("primary", Scope::Singleton, |_: &Resolver<'_>| {
            Ok(Database { url: "postgres://primary".to_owned() })
        })
        .register_named_instance("replica", Database { url: "postgres://replica".to_owned() });

    assert_eq!(container.resolve_named::<Database>("primary").unwrap().url, "postgres://primary");
    assert_eq!(container.resolve_named::<Database>("replica").unwrap().url, "postgres://replica");
    assert!(container.resolve_named::<Database>("Primary").is_err());
    assert!(container.resolve_optional::<Database>().unwrap().is_none());
    assert!(container.is_registered_named::<Database>("replica"));
    assert!(!container.is_registered::<Database>());
}

#[test]
#[traced_test]
fn test_child_falls_back_then_overrides() {
    let parent = Container::new();
    parent.register_instance(Logger { tag: 1 });
    let child = parent.create_child();

    assert_eq!(child.resolve::<Logger>().unwrap().tag, 1);

    child.register_instance(Logger { tag: 2 });

    assert_eq!(child.resolve::<Logger>().unwrap().tag, 2);
    assert_eq!(parent.resolve::<Logger>().unwrap().tag, 1);
    assert_eq!(parent.registration_count(), 1);
}

#[test]
#[traced_test]
fn test_child_sees_later_parent_registrations() {
    let parent = Container::new();
    let child = parent.create_child();
    assert!(child.resolve_optional::<Logger>().unwrap().is_none());

    parent.register_instance(Logger { tag: 3 });

    assert_eq!(child.resolve::<Logger>().unwrap().tag, 3);
    assert_eq!(child.config(), parent.config());
}

#[test]
#[traced_test]
fn test_parent_dependency_resolved_for_child_factory() {
    let parent = Container::new();
    parent.register_instance(Database { url: "sqlite::memory:".to_owned() });
    let child = parent.create_child();
    child.provide(Scope::Transient, |hierdi::Inject(database): Inject<Database>| {
        Ok::<_, InstantiateErrorKind>(Repository { database })
    });

    let repository = child.resolve::<Repository>().unwrap();

    assert!(Arc::ptr_eq(&repository.database, &parent.resolve::<Database>().unwrap()));
}

#[test]
#[traced_test]
fn test_child_decorates_parent_registration() {
    let parent = Container::new();
    parent.register_instance(Logger { tag: 1 });
    let child = parent.create_child();
    child.register(Scope::Singleton, |resolver: &Resolver<'_>| {
        let Some(parent) = resolver.parent() else {
            unreachable!("child has a parent");
        };
        let inner = parent.resolve::<Logger>()?;
        Ok(Logger { tag: inner.tag * 10 })
    });

    assert_eq!(child.resolve::<Logger>().unwrap().tag, 10);
}

#[test]
#[traced_test]
fn test_cycle_reported_without_calling_factory_again() {
    let container = Container::new();
    let call_count = Arc::new(AtomicUsize::new(0));
    container
        .register(Scope::Singleton, {
            let call_count = call_count.clone();
            move |resolver: &Resolver<'_>| {
                call_count.fetch_add(1, Ordering::SeqCst);
                resolver.resolve::<ServiceB>()?;
                Ok(ServiceA)
            }
        })
        .register(Scope::Singleton, |resolver: &Resolver<'_>| {
            resolver.resolve::<ServiceA>()?;
            Ok(ServiceB)
        });

    match container.resolve::<ServiceA>() {
        Err(ResolveErrorKind::CircularDependency { path }) => {
            assert_eq!(path.keys(), [ServiceKey::of::<ServiceA>(), ServiceKey::of::<ServiceB>(), ServiceKey::of::<ServiceA>()]);
            assert_eq!(path.to_string(), "ServiceA -> ServiceB -> ServiceA");
        }
        other => panic!("cycle expected, got {:?}", other.map(|_| ())),
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 1);

    // Nothing stays in flight after the failure
    match container.resolve::<ServiceB>() {
        Err(ResolveErrorKind::CircularDependency { path }) => assert_eq!(path.to_string(), "ServiceB -> ServiceA -> ServiceB"),
        other => panic!("cycle expected, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[traced_test]
fn test_cycle_across_parent_delegation() {
    let parent = Container::new();
    parent
        .register(Scope::Transient, |resolver: &Resolver<'_>| {
            resolver.resolve::<ServiceB>()?;
            Ok(ServiceA)
        })
        .register(Scope::Transient, |resolver: &Resolver<'_>| {
            resolver.resolve::<ServiceA>()?;
            Ok(ServiceB)
        });
    let child = parent.create_child();
    child.register(Scope::Transient, |resolver: &Resolver<'_>| {
        resolver.resolve::<ServiceB>()?;
        Ok(ServiceA)
    });

    match child.resolve::<ServiceA>() {
        Err(ResolveErrorKind::CircularDependency { path }) => {
            assert_eq!(path.to_string(), "ServiceA -> ServiceB -> ServiceA -> ServiceB");
        }
        other => panic!("cycle expected, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[traced_test]
fn test_cycle_through_injected_container() {
    let container = Container::new();
    container
        .provide(Scope::Singleton, |container: Container| {
            container.resolve::<ServiceB>()?;
            Ok::<_, anyhow::Error>(ServiceA)
        })
        .provide(Scope::Singleton, |container: Container| {
            container.resolve::<ServiceA>()?;
            Ok::<_, anyhow::Error>(ServiceB)
        });

    match container.resolve::<ServiceA>() {
        Err(ResolveErrorKind::CircularDependency { path }) => {
            assert_eq!(path.to_string(), "ServiceA -> ServiceB -> ServiceA");
        }
        other => panic!("cycle expected, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[traced_test]
fn test_cycle_through_resolver_container() {
    let container = Container::new();
    container.register(Scope::Transient, |resolver: &Resolver<'_>| {
        resolver.container().resolve::<ServiceA>()?;
        Ok(ServiceA)
    });

    match container.resolve::<ServiceA>() {
        Err(ResolveErrorKind::CircularDependency { path }) => assert_eq!(path.to_string(), "ServiceA -> ServiceA"),
        other => panic!("cycle expected, got {:?}", other.map(|_| ())),
    }
    assert!(logs_contain("Cyclic dependency detected"));
}

#[test]
#[traced_test]
fn test_container_kept_by_instance_starts_new_session() {
    let container = Container::new();
    container
        .register_instance(Database { url: String::from("postgres://") })
        .provide(Scope::Singleton, |container: Container| {
            container.resolve::<Database>()?;
            Ok::<_, anyhow::Error>(container)
        });

    let kept = container.resolve::<Container>().unwrap();
    // The resolution of the keeping registration is over, so this isn't a cycle
    assert!(Arc::ptr_eq(&kept, &kept.resolve::<Container>().unwrap()));
    assert_eq!(kept.resolve::<Database>().unwrap().url, "postgres://");

    container.reset();
}

#[test]
#[traced_test]
fn test_same_key_in_unrelated_chains() {
    let container = Container::new();
    container
        .register_instance(Database { url: String::new() })
        .provide(Scope::Transient, |hierdi::Inject(database): Inject<Database>| {
            Ok::<_, InstantiateErrorKind>(Repository { database })
        })
        .provide(
            Scope::Transient,
            |hierdi::Inject(first): Inject<Repository>, hierdi::Inject(second): Inject<Repository>| {
                Ok::<_, InstantiateErrorKind>(Arc::ptr_eq(&first.database, &second.database))
            },
        );

    assert!(*container.resolve::<bool>().unwrap());
}

#[test]
#[traced_test]
fn test_nested_errors_propagate_verbatim() {
    let container = Container::new();
    container.provide(Scope::Transient, |hierdi::Inject(database): Inject<Database>| {
        Ok::<_, InstantiateErrorKind>(Repository { database })
    });

    match container.resolve::<Repository>() {
        Err(ResolveErrorKind::NotRegistered { key }) => assert_eq!(key, ServiceKey::of::<Database>()),
        other => panic!("not registered expected, got {:?}", other.map(|_| ())),
    }
    // A missing dependency isn't a missing registration of the requested key
    assert!(container.resolve_optional::<Repository>().is_err());
}

#[test]
#[traced_test]
fn test_nested_error_raised_through_anyhow_unchanged() {
    let container = Container::new();
    container.provide(Scope::Transient, |container: Container| {
        container.resolve::<Database>()?;
        Ok::<_, anyhow::Error>(1u8)
    });

    match container.resolve::<u8>() {
        Err(ResolveErrorKind::NotRegistered { key }) => assert_eq!(key, ServiceKey::of::<Database>()),
        other => panic!("not registered expected, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[traced_test]
fn test_factory_failure_not_cached() {
    let container = Container::new();
    let call_count = Arc::new(AtomicUsize::new(0));
    container.register(Scope::Singleton, {
        let call_count = call_count.clone();
        move |_: &Resolver<'_>| {
            if call_count.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(anyhow::anyhow!("connection refused").into());
            }
            Ok(Database { url: String::new() })
        }
    });

    let err = container.resolve::<Database>().map(|_| ()).unwrap_err();
    assert!(matches!(err, ResolveErrorKind::Factory(_)));
    assert_eq!(err.to_string(), "connection refused");

    assert!(container.resolve::<Database>().is_ok());
    assert_eq!(call_count.load(Ordering::SeqCst), 2);
}

#[test]
#[traced_test]
fn test_unregister_and_reset() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Singleton);
    container.register_instance(Database { url: String::new() });

    assert!(container.unregister::<Database>());
    assert!(!container.unregister::<Database>());
    assert!(container.resolve_optional::<Database>().unwrap().is_none());

    container.resolve::<Logger>().unwrap();
    container.reset();

    assert_eq!(container.registration_count(), 0);
    assert!(container.resolve_optional::<Logger>().unwrap().is_none());

    // The cache went away with the registration
    let call_count_after_reset = counting_logger(&container, Scope::Singleton);
    assert_eq!(container.resolve::<Logger>().unwrap().tag, 1);
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    assert_eq!(call_count_after_reset.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn test_clear_cache_keeps_registrations() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Singleton);

    assert_eq!(container.resolve::<Logger>().unwrap().tag, 1);
    assert_eq!(container.clear_cache(), 1);
    assert_eq!(container.resolve::<Logger>().unwrap().tag, 2);
    assert_eq!(call_count.load(Ordering::SeqCst), 2);
}

#[test]
#[traced_test]
fn test_evicted_instances_dropped_outside_registry() {
    let container = Container::new();
    let registrations_on_drop = Arc::new(AtomicUsize::new(0));
    container.register(Scope::scoped("request"), {
        let registrations_on_drop = registrations_on_drop.clone();
        move |resolver: &Resolver<'_>| {
            Ok(Connection {
                container: resolver.container().clone(),
                registrations_on_drop: registrations_on_drop.clone(),
            })
        }
    });

    drop(container.resolve::<Connection>().unwrap());
    assert_eq!(container.reset_scope("request"), 1);
    assert_eq!(registrations_on_drop.load(Ordering::SeqCst), 1);

    registrations_on_drop.store(0, Ordering::SeqCst);
    drop(container.resolve::<Connection>().unwrap());
    assert_eq!(container.clear_cache(), 1);
    assert_eq!(registrations_on_drop.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn test_reset_scope_clears_only_bound_instances() {
    let container = Container::new();
    let request_count = counting_logger(&container, Scope::scoped("request"));
    container.register(Scope::Singleton, |_: &Resolver<'_>| Ok(Database { url: String::new() }));

    let logger = container.resolve::<Logger>().unwrap();
    let database = container.resolve::<Database>().unwrap();
    assert!(Arc::ptr_eq(&logger, &container.resolve::<Logger>().unwrap()));

    assert_eq!(container.reset_scope("session"), 0);
    assert_eq!(container.reset_scope("request"), 1);

    assert_eq!(container.resolve::<Logger>().unwrap().tag, 2);
    assert!(Arc::ptr_eq(&database, &container.resolve::<Database>().unwrap()));
    assert_eq!(request_count.load(Ordering::SeqCst), 2);
}

#[test]
#[traced_test]
fn test_concurrent_first_resolutions_share_singleton() {
    const THREADS: usize = 16;

    let container = Container::new();
    let call_count = Arc::new(AtomicUsize::new(0));
    container.register(Scope::Singleton, {
        let call_count = call_count.clone();
        move |_: &Resolver<'_>| {
            let tag = call_count.fetch_add(1, Ordering::SeqCst) + 1;
            thread::sleep(std::time::Duration::from_millis(5));
            Ok(Logger { tag })
        }
    });

    let barrier = Barrier::new(THREADS);
    let loggers: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.resolve::<Logger>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    assert!(loggers.iter().all(|logger| Arc::ptr_eq(logger, &loggers[0])));
}

#[test]
#[traced_test]
fn test_concurrent_chains_dont_share_in_flight_keys() {
    const THREADS: usize = 8;

    let container = Container::new();
    container
        .register(Scope::Transient, |_: &Resolver<'_>| {
            thread::yield_now();
            Ok(Database { url: String::new() })
        })
        .provide(Scope::Transient, |hierdi::Inject(database): Inject<Database>| {
            Ok::<_, InstantiateErrorKind>(Repository { database })
        });

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..100 {
                    container.resolve::<Repository>().unwrap();
                }
            });
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolve_from_tasks() {
    let container = Container::new();
    let call_count = counting_logger(&container, Scope::Singleton);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.resolve::<Logger>().unwrap().tag })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "No registration found for Logger")]
fn test_panic_policy() {
    let container = Container::with_config(Config {
        on_missing: MissingPolicy::Panic,
    });
    let child = container.create_child();
    assert!(child.resolve_optional::<Logger>().unwrap().is_none());

    let _ = child.resolve::<Logger>();
}
