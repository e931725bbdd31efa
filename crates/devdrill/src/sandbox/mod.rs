//! Embedded JavaScript sandbox
//!
//! Each execution gets a fresh boa [`Context`] on a blocking worker. The
//! script is the user source wrapped in a harness (see [`ExecutionContext`])
//! that shadows host globals, captures console output and reports back as a
//! JSON envelope. The wall-clock budget is enforced from the async side. A
//! worker that outlives it is stopped at its next step call, and the engine's
//! loop and recursion limits bound the code between step calls.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

pub use crate::sandbox::context::{ExecutionContext, ExecutionMode};
pub use crate::sandbox::envelope::{Envelope, EnvelopeStatus};
use crate::rewrite::{STEP_FUNCTION, declared_functions};
use crate::types::{ExecutionLimits, ExecutionOutcome};
use crate::value::Value;

mod context;
mod envelope;

/// Executions allowed to run at once when not configured
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Errors that occur while executing code in the sandbox
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("execution timed out after {wall_time_ms} ms")]
    Timeout { wall_time_ms: u64 },

    #[error("{0}")]
    Runtime(String),

    #[error("resource limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("{0} is not defined")]
    NoCallable(String),

    #[error("code too large ({actual} characters, maximum {max})")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("malformed sandbox response: {0}")]
    Protocol(String),

    #[error("sandbox worker failed: {0}")]
    Internal(String),
}

/// Runs JavaScript under execution limits
#[derive(Debug, Clone)]
pub struct Sandbox {
    limits: ExecutionLimits,
    permits: Arc<Semaphore>,
}

impl Sandbox {
    /// Create a sandbox applying `limits` to every execution
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
        }
    }

    /// Bound the number of engines running at once
    ///
    /// A worker abandoned after a timeout keeps its slot until it reaches its
    /// next step call.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// A handle applying different limits that shares this sandbox's slots
    pub fn with_limits(&self, limits: ExecutionLimits) -> Self {
        Self {
            limits,
            permits: Arc::clone(&self.permits),
        }
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Run source in auto-print mode and capture what it prints
    #[instrument(skip(self, source), fields(len = source.len()))]
    pub async fn run(&self, source: &str) -> Result<ExecutionOutcome, SandboxError> {
        let context = ExecutionContext::new(source)
            .limits(self.limits.clone())
            .mode(ExecutionMode::AutoPrint);

        let envelope = self.execute(context).await?;
        let outcome = envelope.into_outcome()?;
        debug!(
            lines = outcome.logs.len(),
            truncated = outcome.truncated,
            "run complete"
        );
        Ok(outcome)
    }

    /// Execute source once and report the name of the function to grade
    ///
    /// With `allow_fallback`, a source that does not define `entry` resolves
    /// to the first declared function instead.
    #[instrument(skip(self, source))]
    pub async fn discover(
        &self,
        source: &str,
        entry: &str,
        allow_fallback: bool,
    ) -> Result<String, SandboxError> {
        let fallbacks = if allow_fallback {
            declared_functions(source)
                .into_iter()
                .filter(|name| name != entry)
                .collect()
        } else {
            Vec::new()
        };

        let context = ExecutionContext::new(source)
            .limits(self.limits.clone())
            .mode(ExecutionMode::Discover {
                entry: entry.to_string(),
                fallbacks,
            });

        let envelope = self.execute(context).await?;
        match envelope.status {
            EnvelopeStatus::Ok => {
                let resolved = envelope
                    .entry
                    .ok_or_else(|| SandboxError::Protocol("missing entry name".to_string()))?;
                if resolved != entry {
                    warn!(
                        requested = entry,
                        resolved = %resolved,
                        "entry point not defined, grading fallback function"
                    );
                }
                Ok(resolved)
            }
            EnvelopeStatus::Missing => Err(SandboxError::NoCallable(entry.to_string())),
            EnvelopeStatus::Thrown => Err(SandboxError::Runtime(envelope.thrown_message())),
        }
    }

    /// Execute source in a fresh context and call `entry` with `args`
    #[instrument(skip(self, source, args), fields(args = args.len()))]
    pub async fn invoke(
        &self,
        source: &str,
        entry: &str,
        args: &[serde_json::Value],
    ) -> Result<Value, SandboxError> {
        let context = ExecutionContext::new(source)
            .limits(self.limits.clone())
            .mode(ExecutionMode::Invoke {
                entry: entry.to_string(),
                args: args.to_vec(),
            });

        let envelope = self.execute(context).await?;
        match envelope.status {
            EnvelopeStatus::Ok => envelope.decoded_value(),
            EnvelopeStatus::Missing => Err(SandboxError::NoCallable(entry.to_string())),
            EnvelopeStatus::Thrown => Err(SandboxError::Runtime(envelope.thrown_message())),
        }
    }

    /// Build and evaluate the script for `context` within the wall-clock budget
    async fn execute(&self, context: ExecutionContext) -> Result<Envelope, SandboxError> {
        let limits = context.execution_limits().clone();
        if let Some(max) = limits.max_code_length {
            let actual = context.source().chars().count();
            if actual > max {
                return Err(SandboxError::CodeTooLarge { max, actual });
            }
        }

        let script = context.build()?;
        let wall_time = limits.wall_time();
        let cancelled = Arc::new(AtomicBool::new(false));

        // Waiting for a slot counts against the wall-clock budget
        let permits = Arc::clone(&self.permits);
        let worker_cancelled = Arc::clone(&cancelled);
        let execution = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SandboxError::Internal(e.to_string()))?;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                evaluate_script(&script, &limits, worker_cancelled)
            })
            .await
            .map_err(|join_error| SandboxError::Internal(join_error.to_string()))?
        };

        match tokio::time::timeout(wall_time, execution).await {
            Ok(text) => Envelope::parse(&text?),
            Err(_) => {
                cancelled.store(true, Ordering::Relaxed);
                warn!(?wall_time, "execution exceeded wall time, cancelling worker");
                Err(SandboxError::Timeout {
                    wall_time_ms: wall_time.as_millis() as u64,
                })
            }
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(ExecutionLimits::default())
    }
}

/// Work left to a script running on this thread
struct StepBudget {
    remaining: u64,
    cancelled: Arc<AtomicBool>,
}

thread_local! {
    static STEP_BUDGET: RefCell<Option<StepBudget>> = const { RefCell::new(None) };
}

/// Clears the thread's budget when the evaluation ends
struct BudgetGuard;

impl BudgetGuard {
    fn install(budget: StepBudget) -> Self {
        STEP_BUDGET.with_borrow_mut(|slot| *slot = Some(budget));
        Self
    }
}

impl Drop for BudgetGuard {
    fn drop(&mut self) {
        STEP_BUDGET.with_borrow_mut(|slot| *slot = None);
    }
}

/// Host side of the step calls inserted into user code
///
/// Throws an uncatchable limit error once the script is cancelled or has
/// used up its steps.
fn step(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let stop = STEP_BUDGET.with_borrow_mut(|slot| {
        let budget = slot.as_mut()?;
        if budget.cancelled.load(Ordering::Relaxed) {
            return Some("execution cancelled after exceeding its wall time");
        }
        if budget.remaining == 0 {
            return Some("work budget exhausted");
        }
        budget.remaining -= 1;
        None
    });

    match stop {
        Some(message) => Err(JsNativeError::runtime_limit().with_message(message).into()),
        None => Ok(JsValue::undefined()),
    }
}

/// Evaluate a harness script on the current thread
///
/// Every loop body and function body entered costs one step, and the steps of
/// a whole execution are capped by the loop iteration limit.
fn evaluate_script(
    script: &str,
    limits: &ExecutionLimits,
    cancelled: Arc<AtomicBool>,
) -> Result<String, SandboxError> {
    let _budget = BudgetGuard::install(StepBudget {
        remaining: limits.loop_iteration_limit.unwrap_or(u64::MAX),
        cancelled,
    });
    let mut context = Context::default();

    let mut runtime_limits = context.runtime_limits();
    if let Some(iterations) = limits.loop_iteration_limit {
        runtime_limits.set_loop_iteration_limit(iterations);
    }
    if let Some(depth) = limits.recursion_limit {
        runtime_limits.set_recursion_limit(depth);
    }
    context.set_runtime_limits(runtime_limits);

    context
        .register_global_callable(
            JsString::from(STEP_FUNCTION),
            0,
            NativeFunction::from_fn_ptr(step),
        )
        .map_err(|e| SandboxError::Internal(format!("failed to install step counter: {e}")))?;

    let value = context
        .eval(Source::from_bytes(script))
        .map_err(|e| classify_engine_error(e.to_string()))?;

    value
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| SandboxError::Protocol("script did not return an envelope".to_string()))
}

/// Separate engine limit violations from ordinary errors
fn classify_engine_error(message: String) -> SandboxError {
    const LIMIT_MARKERS: [&str; 6] = [
        "RuntimeLimit",
        "work budget",
        "execution cancelled",
        "loop iteration limit",
        "recursive calls",
        "recursion limit",
    ];

    if LIMIT_MARKERS.iter().any(|marker| message.contains(marker)) {
        SandboxError::LimitExceeded(message)
    } else {
        SandboxError::Runtime(message)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn run_captures_console_and_return() {
        let sandbox = Sandbox::default();
        let outcome = sandbox
            .run("console.log('sum', 1 + 2);\nconsole.warn('careful');\nresult = [1, 2];")
            .await
            .unwrap();

        assert_eq!(outcome.logs, vec!["sum 3", "WARNING: careful"]);
        assert_eq!(
            outcome.result,
            Some(Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]))
        );
    }

    #[tokio::test]
    async fn run_logs_thrown_errors() {
        let sandbox = Sandbox::default();
        let outcome = sandbox
            .run("console.log('before');\nthrow new Error('boom');")
            .await
            .unwrap();

        assert_eq!(outcome.logs, vec!["before", "ERROR: boom"]);
        assert_eq!(outcome.result, None);
    }

    #[tokio::test]
    async fn run_reports_syntax_errors() {
        let sandbox = Sandbox::default();
        let result = sandbox.run("let = ;").await;
        assert!(matches!(result, Err(SandboxError::Runtime(_))));
    }

    #[tokio::test]
    async fn host_globals_are_undefined() {
        let sandbox = Sandbox::default();
        let outcome = sandbox
            .run("console.log(typeof process, typeof globalThis, typeof eval, typeof require)")
            .await
            .unwrap();
        assert_eq!(outcome.logs, vec!["undefined undefined undefined undefined"]);
    }

    #[tokio::test]
    async fn output_lines_are_capped() {
        let sandbox = Sandbox::new(ExecutionLimits::default().with_max_output_lines(3));
        let outcome = sandbox
            .run("for (let i = 0; i < 10; i++) { console.log(i); }")
            .await
            .unwrap();
        assert_eq!(outcome.logs, vec!["0", "1", "2"]);
        assert!(outcome.truncated);
    }

    #[tokio::test]
    async fn circular_values_are_cut() {
        let sandbox = Sandbox::default();
        let outcome = sandbox
            .run("const a = { name: 'a' };\na.self = a;\nresult = a;")
            .await
            .unwrap();
        assert_eq!(
            outcome.result,
            Some(Value::Object(vec![
                ("name".to_string(), Value::String("a".to_string())),
                ("self".to_string(), Value::Circular),
            ]))
        );
    }

    #[tokio::test]
    async fn infinite_loop_times_out() {
        let sandbox = Sandbox::new(
            ExecutionLimits::default()
                .with_wall_time_ms(200)
                .with_loop_iteration_limit(3_000_000),
        );

        let started = Instant::now();
        let result = sandbox
            .run("let x = 1;\nwhile (true) { x = (x * 31 + 7) % 1000003; }")
            .await;

        assert!(matches!(
            result,
            Err(SandboxError::Timeout { wall_time_ms: 200 })
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn loop_limit_stops_long_loops() {
        let sandbox = Sandbox::new(
            ExecutionLimits::default()
                .with_wall_time_ms(30_000)
                .with_loop_iteration_limit(1_000),
        );
        let result = sandbox.run("while (true) {}").await;
        assert!(matches!(result, Err(SandboxError::LimitExceeded(_))));
    }

    #[tokio::test]
    async fn step_budget_spans_nested_loops() {
        let sandbox = Sandbox::new(
            ExecutionLimits::default()
                .with_wall_time_ms(30_000)
                .with_loop_iteration_limit(1_000),
        );
        // Each loop stays under the per-loop limit; together they exceed it
        let result = sandbox
            .run("for (let i = 0; i < 100; i++) { for (let j = 0; j < 100; j++) {} }")
            .await;
        assert!(matches!(result, Err(SandboxError::LimitExceeded(msg)) if msg.contains("work budget")));
    }

    #[tokio::test]
    async fn step_limit_cannot_be_caught() {
        let sandbox = Sandbox::new(
            ExecutionLimits::default()
                .with_wall_time_ms(30_000)
                .with_loop_iteration_limit(50),
        );
        let result = sandbox
            .run("try { for (;;) { for (let j = 0; j < 10; j++) {} } } catch (e) {}
console.log('escaped');")
            .await;
        assert!(matches!(result, Err(SandboxError::LimitExceeded(_))));
    }

    #[tokio::test]
    async fn timed_out_worker_releases_its_slot() {
        let sandbox = Sandbox::new(ExecutionLimits::default().with_wall_time_ms(300))
            .with_max_concurrent(1);

        let spin = "for (;;) { for (let j = 0; j < 9000000; j++) {} }";
        let first = sandbox.run(spin).await;
        assert!(matches!(first, Err(SandboxError::Timeout { wall_time_ms: 300 })));

        let started = Instant::now();
        let second = sandbox.run("console.log('next');").await.unwrap();
        assert_eq!(second.logs, vec!["next"]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn waiting_for_a_slot_counts_against_wall_time() {
        let sandbox = Sandbox::new(ExecutionLimits::default().with_wall_time_ms(300))
            .with_max_concurrent(1);
        let _held = Arc::clone(&sandbox.permits).acquire_owned().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), sandbox.run("1 + 1")).await;
        assert!(matches!(
            result,
            Ok(Err(SandboxError::Timeout { wall_time_ms: 300 }))
        ));
    }

    #[tokio::test]
    async fn top_level_return_has_no_callable() {
        let sandbox = Sandbox::default();
        let source = "return 1;\nfunction add(a, b) { return a + b; }";

        let discovered = sandbox.discover(source, "add", true).await;
        assert!(matches!(discovered, Err(SandboxError::NoCallable(name)) if name == "add"));

        let invoked = sandbox.invoke(source, "add", &[json!(1), json!(2)]).await;
        assert!(matches!(invoked, Err(SandboxError::NoCallable(_))));
    }

    #[tokio::test]
    async fn oversized_code_is_rejected() {
        let sandbox = Sandbox::new(ExecutionLimits::default().with_max_code_length(10));
        let result = sandbox.run("console.log('far too long')").await;
        assert!(matches!(
            result,
            Err(SandboxError::CodeTooLarge { max: 10, actual: 27 })
        ));
    }

    #[tokio::test]
    async fn discover_prefers_named_entry() {
        let sandbox = Sandbox::default();
        let source = "function helper() {}\nfunction add(a, b) { return a + b; }";
        let entry = sandbox.discover(source, "add", true).await.unwrap();
        assert_eq!(entry, "add");
    }

    #[tokio::test]
    async fn discover_falls_back_to_first_function() {
        let sandbox = Sandbox::default();
        let source = "const sum = (a, b) => a + b;";
        let entry = sandbox.discover(source, "add", true).await.unwrap();
        assert_eq!(entry, "sum");
    }

    #[tokio::test]
    async fn discover_strict_reports_missing() {
        let sandbox = Sandbox::default();
        let source = "const sum = (a, b) => a + b;";
        let result = sandbox.discover(source, "add", false).await;
        assert!(matches!(result, Err(SandboxError::NoCallable(name)) if name == "add"));
    }

    #[tokio::test]
    async fn discover_reports_top_level_throw() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .discover("throw new Error('setup');\nfunction add() {}", "add", true)
            .await;
        assert!(matches!(result, Err(SandboxError::Runtime(msg)) if msg == "setup"));
    }

    #[tokio::test]
    async fn invoke_calls_entry_with_arguments() {
        let sandbox = Sandbox::default();
        let source = "function join(items, sep) { return items.join(sep); }";
        let value = sandbox
            .invoke(source, "join", &[json!(["a", "b"]), json!("-")])
            .await
            .unwrap();
        assert_eq!(value, Value::String("a-b".to_string()));
    }

    #[tokio::test]
    async fn invoke_reports_thrown_message() {
        let sandbox = Sandbox::default();
        let source = "function fail() { throw new TypeError('bad input'); }";
        let result = sandbox.invoke(source, "fail", &[]).await;
        assert!(matches!(result, Err(SandboxError::Runtime(msg)) if msg == "bad input"));
    }

    #[tokio::test]
    async fn invoke_missing_function() {
        let sandbox = Sandbox::default();
        let result = sandbox.invoke("const x = 1;", "add", &[]).await;
        assert!(matches!(result, Err(SandboxError::NoCallable(_))));
    }

    #[test]
    fn with_limits_shares_slots() {
        let sandbox = Sandbox::default().with_max_concurrent(2);
        let narrowed = sandbox.with_limits(ExecutionLimits::unset().with_wall_time_ms(100));

        assert!(Arc::ptr_eq(&sandbox.permits, &narrowed.permits));
        assert_eq!(narrowed.limits().wall_time_ms, Some(100));
    }

    #[test]
    fn engine_errors_are_classified() {
        assert!(matches!(
            classify_engine_error("RuntimeLimit: Maximum loop iteration limit 10 exceeded".into()),
            SandboxError::LimitExceeded(_)
        ));
        assert!(matches!(
            classify_engine_error("RuntimeLimit: work budget exhausted".into()),
            SandboxError::LimitExceeded(_)
        ));
        assert!(matches!(
            classify_engine_error("SyntaxError: unexpected token".into()),
            SandboxError::Runtime(_)
        ));
    }
}
