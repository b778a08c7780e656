//! Sandbox for generated code.
//!
//! Generated bodies run as async JavaScript in a fresh boa context on their
//! own thread. The context has no host access beyond the task value and the
//! capability functions granted for that run. Capability calls come back to
//! the async side as requests, run concurrently as tokio tasks, and their
//! results settle the promises the script is awaiting.

pub(crate) mod capability;
mod engine;
pub(crate) mod error;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as Json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, Instrument};

use crate::config::SandboxConfig;
use capability::{CallRequest, CallResponse};
pub(crate) use capability::{Bindings, Capability};
use engine::ScriptRun;
pub(crate) use error::SandboxError;

/// Boa recurses on the native stack for nested calls and parsing.
const SCRIPT_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Resource limits applied to every script.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionLimits {
    /// Wall-clock limit for one execution, capability calls included.
    pub timeout: Duration,
    /// Iterations any single loop may run.
    pub max_loop_iterations: u64,
    /// Depth of nested function calls.
    pub max_recursion: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from(&SandboxConfig::default())
    }
}

impl From<&SandboxConfig> for ExecutionLimits {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_loop_iterations: config.max_loop_iterations,
            max_recursion: config.max_recursion,
        }
    }
}

/// A body that parsed as a complete program.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    source: String,
}

/// Compiles and runs scripts under fixed limits.
#[derive(Debug, Clone, Default)]
pub(crate) struct Sandbox {
    limits: ExecutionLimits,
}

impl Sandbox {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    /// Parses a complete body. Nothing runs unless this succeeds.
    pub fn compile(&self, body: &str) -> Result<Program, SandboxError> {
        let source = engine::wrap_body(body);
        engine::check_syntax(&source)?;
        Ok(Program { source })
    }

    /// Runs a compiled program against `task` in a fresh context.
    ///
    /// The program sees `task` as a global and can only call the
    /// capabilities `bindings` grants. Calls still running when the script
    /// settles are cancelled.
    pub async fn execute(
        &self,
        program: &Program,
        task: &Json,
        bindings: Arc<dyn Bindings>,
    ) -> Result<Json, SandboxError> {
        let (request_tx, mut requests) = mpsc::unbounded_channel();
        let (response_tx, responses) = std::sync::mpsc::channel();
        let (done_tx, mut done) = oneshot::channel();

        let run = ScriptRun {
            source: program.source.clone(),
            task: task.clone(),
            grants: Capability::ALL
                .into_iter()
                .filter(|capability| bindings.grants(*capability))
                .collect(),
            limits: self.limits.clone(),
            requests: request_tx,
            responses,
        };
        std::thread::Builder::new()
            .name("ouroboros-script".to_string())
            .stack_size(SCRIPT_STACK_BYTES)
            .spawn(move || {
                let _ = done_tx.send(run.run());
            })
            .map_err(|e| SandboxError::runtime(format!("failed to start script thread: {e}")))?;

        let host = async {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    biased;
                    Some(request) = requests.recv() => {
                        in_flight.spawn(perform(bindings.clone(), request).in_current_span());
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        let response = joined.map_err(|e| {
                            SandboxError::runtime(format!("capability call did not finish: {e}"))
                        })?;
                        // The script may already have settled
                        let _ = response_tx.send(response);
                    }
                    outcome = &mut done => {
                        return outcome.unwrap_or_else(|_| {
                            Err(SandboxError::runtime("script thread exited without a result"))
                        });
                    }
                }
            }
        };

        let result = tokio::time::timeout(self.limits.timeout, host)
            .await
            .map_err(|_| SandboxError::timeout(self.limits.timeout))??;
        debug!("Script returned {}", result);
        Ok(result)
    }

    /// Compiles and runs `body` in one step.
    pub async fn run(
        &self,
        body: &str,
        task: &Json,
        bindings: Arc<dyn Bindings>,
    ) -> Result<Json, SandboxError> {
        let program = self.compile(body)?;
        self.execute(&program, task, bindings).await
    }
}

async fn perform(bindings: Arc<dyn Bindings>, request: CallRequest) -> CallResponse {
    let result = bindings.invoke(request.capability, request.argument).await;
    CallResponse {
        id: request.id,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolveError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct NoCapabilities;

    #[async_trait]
    impl Bindings for NoCapabilities {
        fn grants(&self, _capability: Capability) -> bool {
            false
        }

        async fn invoke(
            &self,
            capability: Capability,
            _argument: Json,
        ) -> Result<Json, SolveError> {
            Err(SolveError::execution_failed(format!(
                "{capability} was not granted"
            )))
        }
    }

    /// Grants `lookup`, records every query, and fails on "fail".
    #[derive(Default)]
    struct RecordingLookup {
        queries: Mutex<Vec<Json>>,
        delay: Duration,
    }

    impl RecordingLookup {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn queries(&self) -> Vec<Json> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Bindings for RecordingLookup {
        fn grants(&self, capability: Capability) -> bool {
            capability == Capability::Lookup
        }

        async fn invoke(&self, _capability: Capability, argument: Json) -> Result<Json, SolveError> {
            self.queries.lock().unwrap().push(argument.clone());
            tokio::time::sleep(self.delay).await;
            if argument == json!("fail") {
                return Err(SolveError::tool_failed("lookup", &anyhow::anyhow!("offline")));
            }
            Ok(json!(format!("answer to {argument}")))
        }
    }

    fn sandbox_with(limits: ExecutionLimits) -> Sandbox {
        Sandbox::new(limits)
    }

    fn sandbox_with_timeout(timeout: Duration) -> Sandbox {
        sandbox_with(ExecutionLimits {
            timeout,
            max_loop_iterations: u64::MAX,
            ..ExecutionLimits::default()
        })
    }

    #[tokio::test]
    async fn test_runs_program_against_task() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .run(
                "return task.a * task.b;",
                &json!({"a": 6, "b": 7}),
                Arc::new(NoCapabilities),
            )
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_everyday_javascript_runs() {
        let sandbox = Sandbox::default();
        let body = r"
            function twice(x) { return x * 2; }
            const evens = task.filter((n) => n % 2 === 0).map(twice);
            let total;
            try {
                JSON.parse('{oops');
            } catch (e) {
                total = evens.reduce((sum, n) => sum + n, 0);
            }
            class Box { constructor(v) { this.v = v; } }
            return { total, boxed: new Box(total).v, text: `${evens.join('-')}` };
        ";
        let result = sandbox
            .run(body, &json!([1, 2, 3, 4]), Arc::new(NoCapabilities))
            .await
            .unwrap();
        assert_eq!(result, json!({"total": 12, "boxed": 12, "text": "4-8"}));
    }

    #[tokio::test]
    async fn test_fan_out_with_map_and_promise_all() {
        let sandbox = Sandbox::default();
        let lookup = Arc::new(RecordingLookup::with_delay(Duration::from_millis(10)));
        let result = sandbox
            .run(
                "return await Promise.all(task.map((q) => lookup(q)));",
                &json!(["a", "b", "c"]),
                lookup.clone(),
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            json!(["answer to \"a\"", "answer to \"b\"", "answer to \"c\""])
        );
        assert_eq!(lookup.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_call_starts_before_it_is_awaited() {
        let sandbox = Sandbox::default();
        let lookup = Arc::new(RecordingLookup::default());
        let body = "const early = lookup('early');\nconst late = await lookup('late');\nreturn late;";
        let result = sandbox.run(body, &json!(null), lookup.clone()).await.unwrap();
        assert_eq!(result, json!("answer to \"late\""));
        assert_eq!(lookup.queries(), vec![json!("early"), json!("late")]);
    }

    #[tokio::test]
    async fn test_capability_failure_passes_through() {
        let sandbox = Sandbox::default();
        let err = sandbox
            .run(
                "return await lookup('fail');",
                &json!(null),
                Arc::new(RecordingLookup::default()),
            )
            .await
            .unwrap_err();
        let solve = SolveError::from(err);
        assert!(matches!(solve, SolveError::ToolFailed { .. }), "{solve}");
    }

    #[tokio::test]
    async fn test_script_can_catch_capability_failure() {
        let sandbox = Sandbox::default();
        let body = "try {\n  return await lookup('fail');\n} catch (e) {\n  return 'fallback';\n}";
        let result = sandbox
            .run(body, &json!(null), Arc::new(RecordingLookup::default()))
            .await
            .unwrap();
        assert_eq!(result, json!("fallback"));
    }

    #[tokio::test]
    async fn test_undefined_becomes_null() {
        let sandbox = Sandbox::default();
        let result = sandbox
            .run("return { kept: 1, dropped: undefined };", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap();
        assert_eq!(result, json!({"kept": 1}));

        let result = sandbox
            .run("let x = 1;", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap();
        assert_eq!(result, json!(null));
    }

    #[tokio::test]
    async fn test_thrown_error_is_reported() {
        let err = Sandbox::default()
            .run("throw new Error('cannot solve');", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap_err();
        assert!(err.is_thrown());
        assert!(err.to_string().contains("cannot solve"), "{err}");
    }

    #[tokio::test]
    async fn test_promise_that_never_settles() {
        let err = Sandbox::default()
            .run("await new Promise(() => {});", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("never settle"), "{err}");
    }

    #[test]
    fn test_incomplete_program_fails_to_compile() {
        let err = Sandbox::default().compile("return (1 + ").unwrap_err();
        assert!(err.is_syntax());
    }

    #[tokio::test]
    async fn test_state_does_not_leak_between_runs() {
        let sandbox = Sandbox::default();
        let program = sandbox
            .compile("globalThis.seen = (globalThis.seen || 0) + 1;\nreturn globalThis.seen;")
            .unwrap();
        for _ in 0..2 {
            let result = sandbox
                .execute(&program, &json!(null), Arc::new(NoCapabilities))
                .await
                .unwrap();
            assert_eq!(result, json!(1));
        }
    }

    #[tokio::test]
    async fn test_cpu_bound_script_times_out() {
        let sandbox = sandbox_with_timeout(Duration::from_millis(50));
        let err = sandbox
            .run("while (true) { let x = 1; }", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_slow_capability_times_out() {
        let sandbox = sandbox_with_timeout(Duration::from_millis(50));
        let err = sandbox
            .run(
                "return await lookup('q');",
                &json!(null),
                Arc::new(RecordingLookup::with_delay(Duration::from_secs(10))),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_loop_limit_stops_runaway_loop() {
        let sandbox = sandbox_with(ExecutionLimits {
            timeout: Duration::from_secs(30),
            max_loop_iterations: 100,
            ..ExecutionLimits::default()
        });
        let err = sandbox
            .run("for (;;) {}", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("limit"), "{err}");
    }

    #[tokio::test]
    async fn test_no_host_access() {
        let sandbox = Sandbox::default();
        for source in [
            "return require('fs')",
            "return process.env",
            "return fetch('http://example.com')",
            "return Deno.env",
            "return lookup('q')",
        ] {
            let err = sandbox
                .run(source, &json!(null), Arc::new(NoCapabilities))
                .await
                .unwrap_err();
            assert!(
                err.to_string().contains("is not defined"),
                "{source}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_console_is_available() {
        let result = Sandbox::default()
            .run("console.log('working', 1);\nreturn 'ok';", &json!(null), Arc::new(NoCapabilities))
            .await
            .unwrap();
        assert_eq!(result, json!("ok"));
    }

    #[test]
    fn test_limits_follow_config() {
        let config = SandboxConfig {
            timeout_secs: 5,
            max_loop_iterations: 10,
            max_recursion: 8,
        };
        let limits = ExecutionLimits::from(&config);
        assert_eq!(limits.timeout, Duration::from_secs(5));
        assert_eq!(limits.max_loop_iterations, 10);
        assert_eq!(limits.max_recursion, 8);
    }
}
