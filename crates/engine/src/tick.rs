//! The update loop (§4.4): one tick reads memory, decodes every property in
//! dependency order, enforces freezes, and emits change events. A tick that
//! overruns its interval does not queue — the next tick starts one interval
//! after the previous tick *completes*, so there is never an unbounded
//! backlog (§4.4 "Scheduling").

use crate::bus::EventBus;
use crate::ratelimit::FailureRateLimiter;
use driver::Driver;
use mapper::Mapper;
use memory::Memory;
use shared::{Address, ChangeEvent, PropertyValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct EngineContext {
    pub driver: Driver,
    pub memory: Arc<Memory>,
    pub bus: Arc<EventBus>,
}

enum TickOutcome {
    DriverError(driver::DriverError),
    Events(Vec<ChangeEvent>),
}

async fn run_tick(ctx: &EngineContext, mapper: &Mapper) -> TickOutcome {
    let bytes_by_block = match ctx.driver.read_memory_blocks(&mapper.platform.memory_blocks).await {
        Ok(bytes) => bytes,
        Err(err) => return TickOutcome::DriverError(err),
    };
    ctx.memory.update(&mapper.platform.memory_blocks, bytes_by_block).await;

    let mut context_values = mapper.constants_context();
    run_hooks(mapper, &mapper.preprocess, &context_values, "preprocess");

    let mut events = Vec::new();

    for name in &mapper.decode_order {
        let Some(property) = mapper.property(name) else {
            continue;
        };
        let decoded = mapper::decode_property(mapper, property, &ctx.memory, &context_values).await;
        context_values.insert(name.clone(), decoded.value.clone());

        let previous = ctx.memory.last_value(name).await;
        let changed = previous.as_ref() != Some(&decoded.value);
        ctx.memory
            .update_property_state(name, decoded.value.clone(), decoded.raw_bytes)
            .await;

        if changed {
            events.push(ChangeEvent::new(name.clone(), decoded.value).with_warnings(decoded.warnings));
        }
    }

    run_hooks(mapper, &mapper.postprocess, &context_values, "postprocess");
    enforce_freezes(ctx, mapper, &mut events).await;

    TickOutcome::Events(events)
}

/// Runs `hooks` (`mapper.preprocess`/`mapper.postprocess`, §6) against
/// `context` once per tick. Neither hook has a target identifier to store a
/// result under, so evaluation is for the mapper author's own validation —
/// a hook that fails to parse or evaluate is logged and otherwise ignored,
/// it never affects decode or freeze enforcement.
fn run_hooks(mapper: &Mapper, hooks: &[String], context: &HashMap<String, PropertyValue>, stage: &str) {
    for source in hooks {
        if let Err(err) = mapper::expr::parse(source).and_then(|ast| mapper::expr::eval(&ast, context, None)) {
            tracing::warn!(mapper = %mapper.name, %stage, expression = %source, error = %err, "mapper hook failed to evaluate");
        }
    }
}

/// Compares every frozen address range against the snapshot just taken and
/// writes the frozen payload back through the driver wherever it drifted
/// (§4.4 step 4, §8 scenario 3: "event stream shows `lives=3,
/// freeze_enforced=true`").
async fn enforce_freezes(ctx: &EngineContext, mapper: &Mapper, events: &mut Vec<ChangeEvent>) {
    for (addr, frozen_bytes) in ctx.memory.frozen_ranges().await {
        let current = ctx.memory.read_bytes(addr, frozen_bytes.len() as u32).await;
        if current.as_deref() == Ok(frozen_bytes.as_slice()) {
            continue;
        }
        if let Err(err) = ctx.driver.write_bytes(addr, &frozen_bytes).await {
            tracing::warn!(%addr, error = %err, "failed to enforce freeze");
            continue;
        }
        mark_freeze_enforced(mapper, addr, &frozen_bytes, events);
    }
}

fn mark_freeze_enforced(mapper: &Mapper, addr: Address, frozen_bytes: &[u8], events: &mut Vec<ChangeEvent>) {
    let Some(property) = mapper
        .properties
        .values()
        .find(|p| p.address == Some(addr))
    else {
        return;
    };
    if let Some(event) = events.iter_mut().find(|e| e.name == property.name) {
        event.freeze_enforced = true;
        return;
    }
    let endian = mapper.endian_for(property);
    let value = memory::decode::decode_property_type(
        property.property_type,
        frozen_bytes,
        endian,
        property.position,
        property.char_map.as_ref(),
    )
    .unwrap_or_else(|| PropertyValue::numeric_default());
    events.push(ChangeEvent::new(property.name.clone(), value).with_freeze_enforced(true));
}

/// Runs ticks until `cancel` fires, sleeping `interval` between the end of
/// one tick and the start of the next (§5: "Shutdown cancels the token; the
/// update loop exits after its current tick").
pub async fn run(ctx: Arc<EngineContext>, mapper: Arc<Mapper>, interval: Duration, cancel: CancellationToken) {
    let mut limiter = FailureRateLimiter::new(Duration::from_secs(30));
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match run_tick(&ctx, &mapper).await {
            TickOutcome::DriverError(err) => {
                if limiter.record_failure() {
                    tracing::warn!(error = %err, "update loop: driver read failed");
                }
            }
            TickOutcome::Events(events) => {
                if let Some(streak) = limiter.record_success() {
                    tracing::info!(ticks = streak, "update loop: driver recovered");
                }
                for event in events {
                    ctx.bus.publish(event).await;
                }
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!("update loop: cancelled, exiting after current tick");
}
