//! Capabilities shipped with the worker for demos and tests.

use super::capability::{Capability, CapabilityContext, CapabilityOutput, CapabilityRegistry};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::time::Duration;

/// Upper bound for `wait`, so a typo in a script cannot park a task for hours.
const MAX_WAIT_MS: u64 = 10 * 60 * 1000;
const WAIT_PROGRESS_STEPS: u64 = 4;

/// Registry with `echo`, `wait` and `fail`.
pub fn builtin_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(EchoCapability));
    registry.register(Box::new(WaitCapability));
    registry.register(Box::new(FailCapability));
    registry
}

/// Returns its input unchanged.
pub struct EchoCapability;

impl Capability for EchoCapability {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the input unchanged"
    }

    fn invoke<'a>(
        &'a self,
        input: Value,
        _ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, anyhow::Result<CapabilityOutput>> {
        Box::pin(async move {
            let summary = match &input {
                Value::Object(map) => format!("echoed {} field(s)", map.len()),
                Value::Null => "echoed nothing".to_string(),
                _ => "echoed 1 value".to_string(),
            };
            Ok(CapabilityOutput::new(input, summary))
        })
    }
}

/// Sleeps for `input.ms` milliseconds, reporting progress along the way.
pub struct WaitCapability;

impl Capability for WaitCapability {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Sleep for `ms` milliseconds while reporting progress"
    }

    fn invoke<'a>(
        &'a self,
        input: Value,
        ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, anyhow::Result<CapabilityOutput>> {
        Box::pin(async move {
            let ms = input
                .get("ms")
                .and_then(Value::as_u64)
                .ok_or_else(|| anyhow::anyhow!("wait requires an integer `ms` field"))?;
            if ms > MAX_WAIT_MS {
                anyhow::bail!("wait of {ms}ms exceeds the {MAX_WAIT_MS}ms limit");
            }

            let step = Duration::from_millis(ms / WAIT_PROGRESS_STEPS);
            for done in 1..=WAIT_PROGRESS_STEPS {
                tokio::time::sleep(step).await;
                #[allow(clippy::cast_precision_loss)]
                let fraction = done as f64 / WAIT_PROGRESS_STEPS as f64;
                ctx.progress
                    .report(format!("waited {}ms", step.as_millis() * u128::from(done)), Some(fraction))
                    .await;
            }
            let remainder = ms % WAIT_PROGRESS_STEPS;
            if remainder > 0 {
                tokio::time::sleep(Duration::from_millis(remainder)).await;
            }

            Ok(CapabilityOutput::new(
                serde_json::json!({ "waited_ms": ms }),
                format!("waited {ms}ms"),
            ))
        })
    }
}

/// Always fails with `input.message`.
pub struct FailCapability;

impl Capability for FailCapability {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Fail with the given `message`"
    }

    fn invoke<'a>(
        &'a self,
        input: Value,
        _ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, anyhow::Result<CapabilityOutput>> {
        Box::pin(async move {
            let message = input
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("capability failed");
            Err(anyhow::anyhow!("{message}"))
        })
    }
}
