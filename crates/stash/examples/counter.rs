//! Counter Demo
//!
//! Two components share one container:
//! - a label that reads the count
//! - a parity badge that only re-renders when the count flips between odd
//!   and even
//!
//! Both "click" through the same updater. Set `RUST_LOG=stash_core=trace` to
//! watch subscriptions and notifications.
//!
//! Run with: cargo run -p stash --example counter

use stash::{
    create_container, init_logging, use_computed_value, use_update, use_value, Runtime,
    RuntimeConfig,
};

fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = RuntimeConfig::from_toml_str("max_flush_passes = 8")?;
    let runtime = Runtime::with_config(config);
    let count = create_container(0u32);

    let label = runtime.mount({
        let count = count.clone();
        move |cx| {
            let value = use_value(cx, &count);
            let increment = use_update(cx, &count);
            (format!("count: {value}"), increment)
        }
    })?;

    let badge = runtime.mount({
        let count = count.clone();
        move |cx| {
            let even = use_computed_value(cx, &count, |v: &u32| v % 2 == 0);
            if even { "even" } else { "odd" }
        }
    })?;

    let Some((_, increment)) = label.output() else {
        anyhow::bail!("label has no output");
    };

    for _ in 0..3 {
        runtime.act(|| increment.update(|v| v + 1))?;
        tracing::info!(
            label = ?label.output().map(|(text, _)| text),
            badge = ?badge.output(),
            "clicked"
        );
    }

    // Two sets, one render each
    runtime.act(|| {
        increment.set(10u32);
        increment.update(|v| v + 2);
    })?;

    tracing::info!(
        label_renders = label.render_count(),
        badge_renders = badge.render_count(),
        count = *count.get_value(),
        "done"
    );
    Ok(())
}
