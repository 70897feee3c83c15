//! Nested/comparative test orchestrator.
//!
//! Each public operation is a one-shot synchronous pipeline: capture context,
//! resolve handle(s), dispatch, aggregate, format. No retries and no
//! persistent state. A failure in any sub-call is folded into that sub-call's
//! slot of the returned text; sibling sub-calls still run.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use gridprobe_host::{CallContext, Value};
use gridprobe_registry::RegistrationTable;

use crate::dispatch::Dispatcher;

/// Upper bound on performance-loop iterations, so a single call cannot block
/// a host worker thread indefinitely.
pub const MAX_PERF_ITERATIONS: i64 = 1000;

/// Tighter bound for the side-by-side comparison, which runs two loops.
pub const MAX_COMPARE_ITERATIONS: i64 = 500;

/// Which of the two equivalent probe implementations to dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Implementation {
    Alpha,
    Beta,
}

impl Implementation {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
        }
    }

    /// Full registered name of one of this implementation's probes.
    pub fn probe(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix())
    }
}

/// Result of a timed dispatch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub iterations: u32,
    pub last_result: Value,
    pub elapsed_ms: f64,
}

impl PerformanceSample {
    /// One-line report, e.g. `iterations=1000 last=38.47 elapsed=12.40ms`.
    pub fn log_line(&self) -> String {
        format!(
            "iterations={} last={} elapsed={:.2}ms",
            self.iterations, self.last_result, self.elapsed_ms
        )
    }
}

pub struct Orchestrator {
    dispatcher: Dispatcher,
}

impl Orchestrator {
    pub fn new(table: Arc<RegistrationTable>) -> Self {
        Self {
            dispatcher: Dispatcher::new(table),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The primary re-entrancy test: dispatch an inner thread-info probe while
    /// this (host-invoked) frame is still active, and report both thread ids.
    ///
    /// `call_external = false` targets this module's own inner probe;
    /// `true` crosses into the alpha module.
    pub fn nested_call(&self, ctx: &CallContext, call_external: bool) -> String {
        let target = if call_external {
            "alpha_inner_thread_info"
        } else {
            "ts_inner_thread_info"
        };
        let inner = self.dispatcher.invoke_registered(ctx.host, target, &[]);
        format!("OuterThread:{}; {inner}", ctx.thread.thread_id)
    }

    /// Dispatch both implementations of the calc probe with identical input
    /// and report the results side by side.
    pub fn compare_implementations(&self, ctx: &CallContext, input: f64) -> String {
        let args = [Value::Number(input)];
        let alpha = self
            .dispatcher
            .invoke_registered(ctx.host, &Implementation::Alpha.probe("thread_calc"), &args);
        let beta = self
            .dispatcher
            .invoke_registered(ctx.host, &Implementation::Beta.probe("thread_calc"), &args);
        format!("alpha: {alpha}; beta: {beta}")
    }

    fn timed_loop(
        &self,
        ctx: &CallContext,
        name: &str,
        input: f64,
        iterations: u32,
    ) -> PerformanceSample {
        let start = Instant::now();
        let mut last_result = Value::Number(0.0);
        for i in 0..iterations {
            last_result =
                self.dispatcher
                    .invoke_registered(ctx.host, name, &[Value::Number(input + i as f64)]);
        }
        PerformanceSample {
            iterations,
            last_result,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Repeatedly dispatch one implementation's calc probe with a varying
    /// input. Iterations are clamped to 1..=1000; there is no cancellation
    /// hook in the host call primitive, so the bound is structural.
    pub fn performance_loop(
        &self,
        ctx: &CallContext,
        input: f64,
        iterations: i64,
        implementation: Implementation,
    ) -> PerformanceSample {
        let iterations = iterations.clamp(1, MAX_PERF_ITERATIONS) as u32;
        self.timed_loop(ctx, &implementation.probe("thread_calc"), input, iterations)
    }

    /// Run the same timed loop against both implementations and report
    /// elapsed time plus last result for each. Clamped to 1..=500 since the
    /// work is doubled.
    pub fn compare_performance(&self, ctx: &CallContext, input: f64, iterations: i64) -> String {
        let iterations = iterations.clamp(1, MAX_COMPARE_ITERATIONS) as u32;
        let alpha = self.timed_loop(
            ctx,
            &Implementation::Alpha.probe("thread_calc"),
            input,
            iterations,
        );
        let beta = self.timed_loop(
            ctx,
            &Implementation::Beta.probe("thread_calc"),
            input,
            iterations,
        );
        format!(
            "alpha: {:.2}ms ({}); beta: {:.2}ms ({})",
            alpha.elapsed_ms, alpha.last_result, beta.elapsed_ms, beta.last_result
        )
    }

    /// Issue several distinct dispatches (two computations plus an info
    /// query) and report this frame's thread id alongside all sub-results, to
    /// show whether the host kept the batch on one thread.
    pub fn aggregate_multi_call(
        &self,
        ctx: &CallContext,
        input: f64,
        implementation: Implementation,
    ) -> String {
        let args = [Value::Number(input)];
        let calc =
            self.dispatcher
                .invoke_registered(ctx.host, &implementation.probe("thread_calc"), &args);
        let doubled =
            self.dispatcher
                .invoke_registered(ctx.host, &implementation.probe("doubled"), &args);
        let info =
            self.dispatcher
                .invoke_registered(ctx.host, &implementation.probe("thread_report"), &[]);
        format!(
            "Thread: {}, Calc: {calc}, Doubled: {doubled}, Info: {info}",
            ctx.thread.thread_id
        )
    }
}
