mod common;

use common::{RecordingBackend, ns};
use enclave_tenancy::{AccessLevel, NamespaceContext, SchemaRouter, TenancyError, context};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn router() -> (Arc<RecordingBackend>, SchemaRouter) {
    context::clear();
    let backend = Arc::new(RecordingBackend::new());
    let router = SchemaRouter::new(backend.clone());
    (backend, router)
}

// ================================================================
// Enter / exit
// ================================================================

#[test]
fn enter_installs_context_and_switches_schema() {
    let (backend, router) = router();
    let guard = router.enter(Some(ns("acme__a")), AccessLevel::ReadWrite).unwrap();

    assert_eq!(
        context::get(),
        Some(NamespaceContext::read_write(ns("acme__a")))
    );
    assert_eq!(guard.context().namespace, Some(ns("acme__a")));
    assert_eq!(backend.directives(), vec!["acme__a"]);

    guard.exit().unwrap();
}

#[test]
fn exit_restores_no_context() {
    let (backend, router) = router();
    let guard = router.enter(Some(ns("acme__a")), AccessLevel::Read).unwrap();
    guard.exit().unwrap();

    assert_eq!(context::get(), None);
    assert_eq!(backend.directives(), vec!["acme__a", "public"]);
}

#[test]
fn enter_exit_restores_exact_prior_context_for_all_inputs() {
    let names = [None, Some(ns("acme__a")), Some(ns("plugin_x"))];
    let levels = [AccessLevel::Read, AccessLevel::ReadWrite];
    let priors = [
        None,
        Some(NamespaceContext::new(None, AccessLevel::Read)),
        Some(NamespaceContext::read_write(ns("outer__ns"))),
    ];

    for prior in &priors {
        for name in &names {
            for level in levels {
                let (_backend, router) = router();
                context::replace(prior.clone()).unwrap();

                let guard = router.enter(name.clone(), level).unwrap();
                assert_eq!(context::get(), Some(NamespaceContext::new(name.clone(), level)));
                guard.exit().unwrap();

                assert_eq!(&context::get(), prior);
            }
        }
    }
    context::clear();
}

#[test]
fn host_namespace_resets_schema() {
    let (backend, router) = router();
    let guard = router.enter(None, AccessLevel::Read).unwrap();
    assert_eq!(backend.directives(), vec!["public"]);
    guard.exit().unwrap();
    assert_eq!(backend.directives(), vec!["public", "public"]);
}

// ================================================================
// Nesting
// ================================================================

#[test]
fn nested_exit_restores_enclosing_namespace() {
    let (backend, router) = router();
    let outer = router.enter(Some(ns("acme__a")), AccessLevel::ReadWrite).unwrap();
    let inner = router.enter(Some(ns("acme__b")), AccessLevel::Read).unwrap();

    assert_eq!(inner.previous(), Some(&NamespaceContext::read_write(ns("acme__a"))));
    inner.exit().unwrap();

    assert_eq!(
        context::get(),
        Some(NamespaceContext::read_write(ns("acme__a")))
    );
    assert_eq!(backend.active().as_deref(), Some("acme__a"));

    outer.exit().unwrap();
    assert_eq!(context::get(), None);
    assert_eq!(backend.directives(), vec!["acme__a", "acme__b", "acme__a", "public"]);
}

#[test]
fn three_levels_unwind_in_order() {
    let (backend, router) = router();
    {
        let _a = router.enter(Some(ns("ns_a")), AccessLevel::Read).unwrap();
        {
            let _b = router.enter(Some(ns("ns_b")), AccessLevel::Read).unwrap();
            {
                let _c = router.enter(Some(ns("ns_c")), AccessLevel::Read).unwrap();
            }
            assert_eq!(context::get().unwrap().namespace, Some(ns("ns_b")));
        }
        assert_eq!(context::get().unwrap().namespace, Some(ns("ns_a")));
    }
    assert_eq!(context::get(), None);
    assert_eq!(
        backend.directives(),
        vec!["ns_a", "ns_b", "ns_c", "ns_b", "ns_a", "public"]
    );
}

// ================================================================
// Guaranteed cleanup
// ================================================================

#[test]
fn drop_restores_like_exit() {
    let (backend, router) = router();
    {
        let _guard = router.enter(Some(ns("acme__a")), AccessLevel::Read).unwrap();
    }
    assert_eq!(context::get(), None);
    assert_eq!(backend.active().as_deref(), Some("public"));
}

#[test]
fn with_namespace_restores_on_error() {
    let (backend, router) = router();
    let result: Result<(), TenancyError> =
        router.with_namespace(Some(ns("acme__a")), AccessLevel::ReadWrite, || {
            Err(TenancyError::SchemaSwitchFailed {
                namespace: "x".into(),
                reason: "inner failure".into(),
            })
        });

    assert!(result.is_err());
    assert_eq!(context::get(), None);
    assert_eq!(backend.active().as_deref(), Some("public"));
}

#[test]
fn with_namespace_returns_value() {
    let (_backend, router) = router();
    let value: Result<usize, TenancyError> =
        router.with_namespace(Some(ns("acme__a")), AccessLevel::Read, || {
            Ok(context::get().map(|c| c.namespace_label().len()).unwrap_or(0))
        });
    assert_eq!(value.unwrap(), "acme__a".len());
}

#[test]
fn panic_inside_namespace_still_restores() {
    let (backend, router) = router();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = router.enter(Some(ns("acme__a")), AccessLevel::ReadWrite).unwrap();
        panic!("plugin blew up");
    }));

    assert!(result.is_err());
    assert_eq!(context::get(), None);
    assert_eq!(backend.active().as_deref(), Some("public"));
}

// ================================================================
// Backend failures
// ================================================================

#[test]
fn failed_switch_propagates_and_keeps_enclosing_context() {
    let (backend, router) = router();
    backend.fail_on("acme__bad");

    let outer = router.enter(Some(ns("acme__a")), AccessLevel::ReadWrite).unwrap();
    let err = router
        .enter(Some(ns("acme__bad")), AccessLevel::ReadWrite)
        .unwrap_err();

    assert!(matches!(err, TenancyError::SchemaSwitchFailed { ref namespace, .. } if namespace == "acme__bad"));
    assert_eq!(
        context::get(),
        Some(NamespaceContext::read_write(ns("acme__a")))
    );
    // Enclosing schema re-applied best-effort.
    assert_eq!(backend.directives(), vec!["acme__a", "acme__a"]);

    outer.exit().unwrap();
}

#[test]
fn failed_restore_is_reported_by_exit_but_context_is_restored() {
    let (backend, router) = router();
    let guard = router.enter(Some(ns("acme__a")), AccessLevel::Read).unwrap();
    backend.fail_reset(true);

    let err = guard.exit().unwrap_err();
    assert!(matches!(err, TenancyError::SchemaSwitchFailed { .. }));
    assert_eq!(context::get(), None);
}

// ================================================================
// Async scoping
// ================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scoped_restores_after_await() {
    let (backend, router) = router();

    let seen = router
        .scoped(Some(ns("acme__a")), AccessLevel::ReadWrite, async {
            tokio::task::yield_now().await;
            Ok::<_, TenancyError>(context::get())
        })
        .await
        .unwrap();

    assert_eq!(seen, Some(NamespaceContext::read_write(ns("acme__a"))));
    assert_eq!(backend.active().as_deref(), Some("public"));
}

#[tokio::test]
async fn cancelled_operation_restores_schema() {
    let (backend, router) = router();

    let slow = router.scoped(Some(ns("acme__a")), AccessLevel::ReadWrite, async {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok::<_, TenancyError>(())
    });
    let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), slow).await;

    assert!(timed_out.is_err());
    assert_eq!(backend.directives(), vec!["acme__a", "public"]);
    assert_eq!(context::get(), None);
}
