//! Integration tests for the component runtime

use stash_hooks::{
    create_container, use_value, RenderMode, Runtime, RuntimeConfig, RuntimeError,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_act_batches_renders() {
    let runtime = Runtime::new();
    let count = create_container(0);

    let view = runtime
        .mount({
            let count = count.clone();
            move |cx| *use_value(cx, &count)
        })
        .unwrap();

    runtime
        .act(|| {
            count.set_value(1);
            count.set_value(2);
            count.update(|v| v * 10);
        })
        .unwrap();
    assert_eq!(view.output(), Some(20));
    assert_eq!(view.render_count(), 2);
}

#[test]
fn test_flush_reports_render_count() {
    let runtime = Runtime::new();
    let count = create_container(0);

    let views: Vec<_> = (0..3)
        .map(|_| {
            runtime
                .mount({
                    let count = count.clone();
                    move |cx| *use_value(cx, &count)
                })
                .unwrap()
        })
        .collect();

    count.set_value(1);
    assert!(views.iter().all(|view| runtime.is_dirty(view.id())));
    assert_eq!(runtime.flush().unwrap(), 3);
    assert_eq!(runtime.flush().unwrap(), 0);
}

#[test]
fn test_flush_limit() {
    let config = RuntimeConfig {
        max_flush_passes: 3,
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::with_config(config);

    let view = runtime
        .mount(|cx| {
            // Never settles
            cx.invalidator().invalidate();
        })
        .unwrap();

    let err = runtime.flush().unwrap_err();
    assert!(matches!(err, RuntimeError::FlushLimitExceeded { passes: 3 }));
    assert_eq!(view.render_count(), 4);

    // The runtime is usable again afterwards
    view.unmount().unwrap();
    assert_eq!(runtime.flush().unwrap(), 0);
}

#[test]
fn test_flush_limit_keeps_pending_components() {
    let config = RuntimeConfig {
        max_flush_passes: 1,
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::with_config(config);
    let count = create_container(0);

    let reader = runtime
        .mount({
            let count = count.clone();
            move |cx| *use_value(cx, &count)
        })
        .unwrap();
    let writer = runtime
        .mount({
            let count = count.clone();
            move |_cx| count.update(|v| v + 1)
        })
        .unwrap();

    writer.invalidate();
    let err = runtime.flush().unwrap_err();
    assert!(matches!(err, RuntimeError::FlushLimitExceeded { passes: 1 }));
    assert_eq!(*count.get_value(), 2);
    assert!(runtime.is_dirty(reader.id()));

    writer.unmount().unwrap();
    assert_eq!(runtime.flush().unwrap(), 1);
    assert_eq!(reader.output(), Some(2));
}

#[test]
fn test_runtime_recovers_from_render_panic() {
    let runtime = Runtime::new();
    let count = create_container(0);
    let fail = Arc::new(AtomicBool::new(false));

    let faulty = runtime
        .mount({
            let count = count.clone();
            let fail = fail.clone();
            move |cx| {
                let value = *use_value(cx, &count);
                if fail.load(Ordering::SeqCst) {
                    panic!("render failed");
                }
                value
            }
        })
        .unwrap();
    let healthy = runtime
        .mount({
            let count = count.clone();
            move |cx| *use_value(cx, &count)
        })
        .unwrap();

    fail.store(true, Ordering::SeqCst);
    count.set_value(3);
    let result = panic::catch_unwind(AssertUnwindSafe(|| runtime.flush()));
    assert!(result.is_err());

    // The rest of the interrupted pass is still queued
    assert!(runtime.is_dirty(healthy.id()));
    assert_eq!(runtime.flush().unwrap(), 1);
    assert_eq!(healthy.output(), Some(3));

    fail.store(false, Ordering::SeqCst);
    runtime.act(|| count.set_value(5)).unwrap();
    assert_eq!(healthy.output(), Some(5));
    assert_eq!(faulty.output(), Some(5));
    assert_eq!(faulty.render_count(), 2);
    assert_eq!(count.subscriber_count(), 2);
}

#[test]
#[should_panic(expected = "called more hooks than during its first render")]
fn test_hook_after_hookless_first_render_panics() {
    let runtime = Runtime::new();
    let count = create_container(0);

    let view = runtime
        .mount({
            let count = count.clone();
            let mut renders = 0;
            move |cx| {
                renders += 1;
                if renders > 1 {
                    *use_value(cx, &count)
                } else {
                    0
                }
            }
        })
        .unwrap();

    view.invalidate();
    let _ = runtime.flush();
}

#[test]
fn test_flush_from_render_is_rejected() {
    let runtime = Runtime::new();
    let rejected = Arc::new(AtomicBool::new(false));

    let view = runtime
        .mount({
            let runtime = runtime.clone();
            let rejected = rejected.clone();
            move |_cx| {
                if let Err(RuntimeError::Reentrant) = runtime.flush() {
                    rejected.store(true, Ordering::SeqCst);
                }
            }
        })
        .unwrap();
    assert!(!rejected.load(Ordering::SeqCst));

    view.invalidate();
    runtime.flush().unwrap();
    assert!(rejected.load(Ordering::SeqCst));
}

#[test]
fn test_unmount_twice() {
    let runtime = Runtime::new();
    let view = runtime.mount(|_cx| ()).unwrap();
    let id = view.id();

    runtime.unmount(id).unwrap();
    assert!(matches!(
        runtime.unmount(id),
        Err(RuntimeError::ComponentNotFound(missing)) if missing == id
    ));
    assert_eq!(view.output(), None);
    assert_eq!(view.render_count(), 0);
}

#[test]
fn test_unmounted_while_dirty() {
    let runtime = Runtime::new();
    let count = create_container(0);

    let view = runtime
        .mount({
            let count = count.clone();
            move |cx| *use_value(cx, &count)
        })
        .unwrap();

    count.set_value(1);
    assert!(runtime.is_dirty(view.id()));
    runtime.unmount(view.id()).unwrap();
    assert!(!runtime.is_dirty(view.id()));
    assert_eq!(runtime.flush().unwrap(), 0);
}

#[test]
fn test_render_mode_from_config() {
    let config = RuntimeConfig::from_toml_str("render_mode = \"server\"").unwrap();
    let runtime = Runtime::with_config(config);
    let seen = Arc::new(Mutex::new(Vec::new()));

    runtime
        .mount({
            let seen = seen.clone();
            move |cx| seen.lock().unwrap().push(cx.render_mode())
        })
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![RenderMode::Server]);
    assert_eq!(runtime.config().render_mode, RenderMode::Server);
    assert_eq!(runtime.config().max_flush_passes, 16);
}

#[test]
#[should_panic(expected = "called more hooks than during its first render")]
fn test_extra_hook_panics() {
    let runtime = Runtime::new();
    let count = create_container(0);

    let view = runtime
        .mount({
            let count = count.clone();
            let mut renders = 0;
            move |cx| {
                renders += 1;
                let value = *use_value(cx, &count);
                if renders > 1 {
                    cx.slot(|| 0u8);
                }
                value
            }
        })
        .unwrap();

    view.invalidate();
    let _ = runtime.flush();
}
