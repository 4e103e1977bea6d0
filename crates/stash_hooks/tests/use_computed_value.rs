//! Integration tests for `use_computed_value`

use stash_hooks::{
    create_async_container, create_container, use_computed_value, use_computed_value_with,
    use_update, Runtime, RuntimeConfig,
};

#[derive(Debug, Clone, PartialEq)]
struct Pair {
    a: i32,
    b: i32,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_sum_of_pair() {
    init_tracing();
    let runtime = Runtime::new();
    let pair = create_container(Pair { a: 1, b: 1 });

    let view = runtime
        .mount({
            let pair = pair.clone();
            move |cx| use_computed_value(cx, &pair, |p: &Pair| p.a + p.b)
        })
        .unwrap();
    assert_eq!(view.output(), Some(2));

    runtime.act(|| pair.set_value(Pair { a: 2, b: 1 })).unwrap();
    assert_eq!(view.output(), Some(3));
}

#[test]
fn test_equal_computation_skips_render() {
    init_tracing();
    let runtime = Runtime::new();
    let count = create_container(42);
    let pair = create_container(Pair { a: 1, b: 1 });

    let view = runtime
        .mount({
            let count = count.clone();
            let pair = pair.clone();
            move |cx| {
                let doubled = use_computed_value(cx, &count, |v: &i32| v * 2);
                let product = use_computed_value(cx, &pair, |p: &Pair| p.a * p.b);
                (doubled, product)
            }
        })
        .unwrap();
    assert_eq!(view.render_count(), 1);

    runtime.act(|| count.update(|v| v + 1)).unwrap();
    assert_eq!(view.render_count(), 2);

    runtime.act(|| pair.set_value(Pair { a: 2, b: 1 })).unwrap();
    assert_eq!(view.render_count(), 3);
    assert_eq!(view.output(), Some((86, 2)));

    // Fresh values, same products
    runtime.act(|| count.set_value(43)).unwrap();
    runtime.act(|| pair.set_value(Pair { a: 1, b: 2 })).unwrap();
    assert_eq!(view.render_count(), 3);
}

#[test]
fn test_concurrent_async_updates_batch() {
    let runtime = Runtime::new();
    let count = create_async_container(42);
    let pair = create_async_container(Pair { a: 2, b: 1 });

    let view = runtime
        .mount({
            let count = count.clone();
            let pair = pair.clone();
            move |cx| {
                let doubled = use_computed_value(cx, &count, |v: &i32| v * 2);
                let sum = use_computed_value(cx, &pair, |p: &Pair| p.a + p.b);
                (doubled, sum, use_update(cx, &count), use_update(cx, &pair))
            }
        })
        .unwrap();

    let (_, _, set_count, set_pair) = view.output().unwrap();
    runtime
        .act(|| {
            pollster::block_on(async {
                futures::join!(set_count.set(0), set_pair.set(Pair { a: 0, b: 0 }))
            })
        })
        .unwrap();

    let (doubled, sum, _, _) = view.output().unwrap();
    assert_eq!((doubled, sum), (0, 0));
    assert_eq!(view.render_count(), 2);
}

#[test]
fn test_custom_equality() {
    let runtime = Runtime::new();
    let name = create_container(String::from("Ada"));

    let view = runtime
        .mount({
            let name = name.clone();
            move |cx| {
                use_computed_value_with(
                    cx,
                    &name,
                    |s: &String| s.clone(),
                    |a: &String, b: &String| a.eq_ignore_ascii_case(b),
                )
            }
        })
        .unwrap();

    runtime.act(|| name.set_value(String::from("ADA"))).unwrap();
    assert_eq!(view.render_count(), 1);
    assert_eq!(view.output().as_deref(), Some("Ada"));

    runtime.act(|| name.set_value(String::from("Grace"))).unwrap();
    assert_eq!(view.output().as_deref(), Some("Grace"));
}

#[test]
fn test_latest_compute_function_is_used() {
    let runtime = Runtime::new();
    let count = create_container(3);
    let factor = std::sync::Arc::new(std::sync::atomic::AtomicI32::new(1));

    let view = runtime
        .mount({
            let count = count.clone();
            let factor = factor.clone();
            move |cx| {
                let k = factor.load(std::sync::atomic::Ordering::SeqCst);
                use_computed_value(cx, &count, move |v: &i32| v * k)
            }
        })
        .unwrap();
    assert_eq!(view.output(), Some(3));

    factor.store(10, std::sync::atomic::Ordering::SeqCst);
    view.invalidate();
    runtime.flush().unwrap();
    assert_eq!(view.output(), Some(30));

    runtime.act(|| count.set_value(4)).unwrap();
    assert_eq!(view.output(), Some(40));
}

#[test]
fn test_server_mode_reads_without_subscribing() {
    let runtime = Runtime::with_config(RuntimeConfig::server());
    let pair = create_container(Pair { a: 1, b: 1 });

    let view = runtime
        .mount({
            let pair = pair.clone();
            move |cx| use_computed_value(cx, &pair, |p: &Pair| p.a + p.b)
        })
        .unwrap();

    assert_eq!(view.output(), Some(2));
    assert_eq!(pair.subscriber_count(), 0);

    runtime.act(|| pair.set_value(Pair { a: 5, b: 5 })).unwrap();
    assert_eq!(view.render_count(), 1);
}
