//! Probe module definitions.
//!
//! Two sibling extension modules ("alpha" and "beta") expose the same probe
//! surface under different name prefixes. They are built from the same bodies
//! on purpose: the orchestrator's comparative tests assert that dispatching
//! to either module yields equivalent results, so any divergence points at
//! the dispatch path, not the math.

use std::sync::Arc;

use gridprobe_host::{FunctionSpec, HostError, Value};
use gridprobe_probes::ProbeSet;
use gridprobe_registry::RegistrationTable;

use crate::orchestrator::{Implementation, Orchestrator};
use crate::sim::{ModuleDef, SimHost};

fn arg_number(args: &[Value], index: usize) -> Result<f64, HostError> {
    args.get(index)
        .ok_or(HostError::ArgCount {
            expected: index + 1,
            got: args.len(),
        })?
        .as_number(index)
}

fn arg_i64(args: &[Value], index: usize) -> Result<i64, HostError> {
    Ok(arg_number(args, index)? as i64)
}

/// Trailing bool arguments default to false when omitted, the way the host
/// fills optional spreadsheet arguments.
fn arg_bool_or(args: &[Value], index: usize, default: bool) -> Result<bool, HostError> {
    match args.get(index) {
        Some(value) => value.as_bool(index),
        None => Ok(default),
    }
}

/// Build one probe module under the given implementation's name prefix.
///
/// `table` is consulted by the nested caller probe: it must use the
/// non-populating lookup, since it runs inside a host-issued call.
pub fn probe_module(
    implementation: Implementation,
    probes: ProbeSet,
    table: Arc<RegistrationTable>,
) -> ModuleDef {
    let prefix = implementation.prefix();
    let name = |suffix: &str| format!("{prefix}_{suffix}");

    let mut def = ModuleDef::new();

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(
                name("thread_calc"),
                "number^2 + sin(number) + thread id, with delay",
                true,
            ),
            move |ctx, args| {
                let number = arg_number(args, 0)?;
                Ok(Value::Number(probes.thread_calc(ctx.thread, number)))
            },
        );
    }

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(
                name("scaled_root"),
                "sqrt(input*3) + thread id, with delay",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                Ok(Value::Number(probes.scaled_root(ctx.thread, input)))
            },
        );
    }

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(name("doubled"), "input*2 + thread id", true),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                Ok(Value::Number(probes.doubled(ctx.thread, input)))
            },
        );
    }

    def.push(
        FunctionSpec::new(name("add_inner"), "inner: add two numbers", true),
        |_ctx, args| {
            let x = arg_number(args, 0)?;
            let y = arg_number(args, 1)?;
            Ok(Value::Number(ProbeSet::add(x, y)))
        },
    );

    {
        // Calls add_inner back through the host while this frame is live.
        // Pre-resolved handle only: a host round-trip here would re-enter
        // the registration machinery from inside a dispatched call.
        let table = Arc::clone(&table);
        let inner_name = name("add_inner");
        def.push(
            FunctionSpec::new(name("add_caller"), "caller: adds via nested host call", true),
            move |ctx, args| {
                let x = arg_number(args, 0)?;
                let y = arg_number(args, 1)?;
                let handle = table
                    .try_get(&inner_name)
                    .ok_or_else(|| HostError::UnknownName(inner_name.clone()))?;
                let result = ctx
                    .host
                    .invoke(handle, &[Value::Number(x), Value::Number(y)])?;
                // Anything but a number means the inner call went sideways;
                // report NaN rather than faulting the outer call.
                Ok(Value::Number(
                    result.as_number(0).unwrap_or(f64::NAN),
                ))
            },
        );
    }

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(
                name("thread_vector"),
                "vertical vector of thread id + i, size clamped to 100",
                true,
            ),
            move |ctx, args| {
                let size = arg_number(args, 0)?;
                Ok(Value::column(probes.thread_vector(ctx.thread, size)))
            },
        );
    }

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(name("thread_report"), "thread id and tick report", true),
            move |ctx, _args| Ok(Value::Text(probes.thread_report(ctx.thread))),
        );
    }

    def.push(
        FunctionSpec::new(
            name("inner_thread_info"),
            "inner thread info for cross-module nested call test",
            true,
        ),
        |ctx, _args| Ok(Value::Text(ProbeSet::inner_thread_info(ctx.thread))),
    );

    {
        let probes = probes.clone();
        def.push(
            FunctionSpec::new(
                name("power_sum"),
                "iterated (input+i)^1.5 sum with thread report",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                let iterations = arg_i64(args, 1)?;
                Ok(Value::Text(probes.power_sum(ctx.thread, input, iterations)))
            },
        );
    }

    def
}

/// Register the orchestrator's own host-callable surface.
///
/// These are the functions a test driver (or a recalculating sheet) invokes;
/// each wraps one orchestrator operation and returns text, never a fault.
pub fn register_orchestrator(host: &SimHost, table: Arc<RegistrationTable>) -> Arc<Orchestrator> {
    let orchestrator = Arc::new(Orchestrator::new(table));

    host.register_fn(
        FunctionSpec::new(
            "ts_inner_thread_info",
            "inner thread info for same-module nested call test",
            true,
        ),
        |ctx, _args| Ok(Value::Text(ProbeSet::inner_thread_info(ctx.thread))),
    );

    {
        let orchestrator = Arc::clone(&orchestrator);
        host.register_fn(
            FunctionSpec::new(
                "ts_nested_thread_info",
                "outer+inner thread info; call_external=TRUE crosses modules",
                true,
            ),
            move |ctx, args| {
                let call_external = arg_bool_or(args, 0, false)?;
                Ok(Value::Text(orchestrator.nested_call(ctx, call_external)))
            },
        );
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        host.register_fn(
            FunctionSpec::new(
                "ts_compare_impls",
                "dispatch both implementations with identical input",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                Ok(Value::Text(orchestrator.compare_implementations(ctx, input)))
            },
        );
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        host.register_fn(
            FunctionSpec::new(
                "ts_performance",
                "timed dispatch loop, iterations clamped to 1000",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                let iterations = arg_i64(args, 1)?;
                let use_beta = arg_bool_or(args, 2, false)?;
                let implementation = if use_beta {
                    Implementation::Beta
                } else {
                    Implementation::Alpha
                };
                let sample = orchestrator.performance_loop(ctx, input, iterations, implementation);
                Ok(Value::Text(sample.log_line()))
            },
        );
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        host.register_fn(
            FunctionSpec::new(
                "ts_compare_performance",
                "timed loops against both implementations, clamped to 500",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                let iterations = arg_i64(args, 1)?;
                Ok(Value::Text(
                    orchestrator.compare_performance(ctx, input, iterations),
                ))
            },
        );
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        host.register_fn(
            FunctionSpec::new(
                "ts_multi_call",
                "two computations plus an info query in one batch",
                true,
            ),
            move |ctx, args| {
                let input = arg_number(args, 0)?;
                let use_beta = arg_bool_or(args, 1, false)?;
                let implementation = if use_beta {
                    Implementation::Beta
                } else {
                    Implementation::Alpha
                };
                Ok(Value::Text(orchestrator.aggregate_multi_call(
                    ctx,
                    input,
                    implementation,
                )))
            },
        );
    }

    orchestrator
}
