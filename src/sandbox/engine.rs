//! The JavaScript side of a sandbox run.
//!
//! Everything here runs on the script thread. A boa [`Context`] is not
//! `Send`, so each run owns a fresh context from start to finish and talks to
//! the async side only through the request and response channels.
//!
//! Capability functions are plain JavaScript closures that queue their call
//! and hand back a pending promise. The event loop below drains that queue
//! after every turn of the job queue, forwards the calls, and settles the
//! promises as answers come back.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::{JsArray, JsPromise};
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, Script, Source,
};
use serde_json::Value as Json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::capability::{CallRequest, CallResponse, Capability};
use super::error::SandboxError;
use super::ExecutionLimits;
use crate::error::SolveError;

/// Evaluated before the script. Keeps its own `JSON.stringify` and the call
/// queue out of the script's reach.
const PRELUDE: &str = r"(() => {
  const stringify = JSON.stringify;
  const calls = [];
  const bind = (name) => (argument) =>
    new Promise((resolve, reject) => {
      calls.push({ name, argument: stringify(argument), resolve, reject });
    });
  return { calls, bind, stringify };
})()";

const CONSOLE_METHODS: [&str; 5] = ["log", "info", "warn", "error", "debug"];

/// Wraps a function body so `return` and `await` work at the top level.
pub(super) fn wrap_body(body: &str) -> String {
    format!("(async () => {{\n{body}\n}})()")
}

/// Parses `source` without running any of it.
pub(super) fn check_syntax(source: &str) -> Result<(), SandboxError> {
    let mut context = Context::default();
    match Script::parse(Source::from_bytes(source), None, &mut context) {
        Ok(_) => Ok(()),
        Err(err) => Err(SandboxError::syntax(describe_error(&err, &mut context))),
    }
}

/// One script run, moved onto the script thread.
pub(super) struct ScriptRun {
    pub source: String,
    pub task: Json,
    pub grants: Vec<Capability>,
    pub limits: ExecutionLimits,
    pub requests: UnboundedSender<CallRequest>,
    pub responses: Receiver<CallResponse>,
}

struct Prelude {
    calls: JsArray,
    bind: JsObject,
    stringify: JsObject,
}

/// Resolvers of a call the host has not answered yet.
struct Waiting {
    resolve: JsObject,
    reject: JsObject,
}

#[derive(Default)]
struct EventLoop {
    next_id: u64,
    waiting: HashMap<u64, Waiting>,
    /// Rejection values handed to the script, with the error behind each.
    failures: Vec<(JsObject, SolveError)>,
}

impl ScriptRun {
    pub fn run(self) -> Result<Json, SandboxError> {
        let mut context = Context::default();
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.limits.max_loop_iterations);
        limits.set_recursion_limit(self.limits.max_recursion);

        let prelude = match self.install(&mut context) {
            Ok(prelude) => prelude,
            Err(err) => return Err(SandboxError::runtime(describe_error(&err, &mut context))),
        };

        let mut event_loop = EventLoop::default();
        let outcome = self.drive(&prelude, &mut event_loop, &mut context);
        // Drop outstanding resolvers before the context goes away
        event_loop.waiting.clear();
        outcome
    }

    fn install(&self, context: &mut Context) -> JsResult<Prelude> {
        let mut console = ObjectInitializer::new(context);
        for method in CONSOLE_METHODS {
            console.function(
                NativeFunction::from_fn_ptr(console_log),
                JsString::from(method),
                0,
            );
        }
        let console = console.build();
        context.register_global_property(js_string!("console"), console, Attribute::all())?;

        let prelude = context.eval(Source::from_bytes(PRELUDE))?;
        let prelude = prelude
            .as_object()
            .cloned()
            .ok_or_else(|| JsNativeError::typ().with_message("prelude is not an object"))?;
        let prelude = Prelude {
            calls: JsArray::from_object(object_field(&prelude, "calls", context)?)?,
            bind: object_field(&prelude, "bind", context)?,
            stringify: object_field(&prelude, "stringify", context)?,
        };

        for capability in &self.grants {
            let name = JsString::from(capability.binding_name());
            let function = prelude
                .bind
                .call(&JsValue::undefined(), &[name.clone().into()], context)?;
            context.register_global_property(name, function, Attribute::empty())?;
        }

        let task = JsValue::from_json(&self.task, context)?;
        context.register_global_property(js_string!("task"), task, Attribute::empty())?;
        Ok(prelude)
    }

    fn drive(
        &self,
        prelude: &Prelude,
        event_loop: &mut EventLoop,
        context: &mut Context,
    ) -> Result<Json, SandboxError> {
        let completion = context
            .eval(Source::from_bytes(&self.source))
            .map_err(|err| SandboxError::thrown(describe_error(&err, context)))?;
        let promise = completion
            .as_object()
            .and_then(|object| JsPromise::from_object(object.clone()).ok());
        let Some(promise) = promise else {
            return to_json(&completion, &prelude.stringify, context);
        };

        loop {
            context.run_jobs();
            event_loop
                .dispatch(&prelude.calls, &self.requests, context)
                .map_err(|err| SandboxError::runtime(describe_error(&err, context)))?;

            match promise.state() {
                PromiseState::Pending => {}
                PromiseState::Fulfilled(value) => {
                    return to_json(&value, &prelude.stringify, context)
                }
                PromiseState::Rejected(reason) => {
                    return Err(event_loop.rejection(&reason, context))
                }
            }

            if event_loop.waiting.is_empty() {
                return Err(SandboxError::runtime(
                    "script is waiting on a promise that can never settle",
                ));
            }
            let response = self
                .responses
                .recv()
                .map_err(|_| SandboxError::runtime("sandbox host stopped answering"))?;
            event_loop
                .settle(response, context)
                .map_err(|err| SandboxError::runtime(describe_error(&err, context)))?;
        }
    }
}

impl EventLoop {
    /// Forwards every call the script queued since the last turn.
    fn dispatch(
        &mut self,
        calls: &JsArray,
        requests: &UnboundedSender<CallRequest>,
        context: &mut Context,
    ) -> JsResult<()> {
        loop {
            let entry = calls.shift(context)?;
            let Some(entry) = entry.as_object().cloned() else {
                return Ok(());
            };

            let name = entry
                .get(js_string!("name"), context)?
                .to_string(context)?
                .to_std_string_escaped();
            let capability = Capability::from_binding_name(&name).ok_or_else(|| {
                JsNativeError::typ().with_message(format!("{name} is not a capability"))
            })?;
            let argument = match entry.get(js_string!("argument"), context)?.as_string() {
                Some(text) => serde_json::from_str(&text.to_std_string_escaped()).map_err(|e| {
                    JsNativeError::typ().with_message(format!("{name} argument is not JSON: {e}"))
                })?,
                None => Json::Null,
            };
            let waiting = Waiting {
                resolve: object_field(&entry, "resolve", context)?,
                reject: object_field(&entry, "reject", context)?,
            };

            let id = self.next_id;
            self.next_id += 1;
            self.waiting.insert(id, waiting);
            debug!("Script called {} (call {})", capability, id);

            let request = CallRequest {
                id,
                capability,
                argument,
            };
            if requests.send(request).is_err() {
                return Err(JsNativeError::error()
                    .with_message("sandbox host stopped answering")
                    .into());
            }
        }
    }

    /// Resolves or rejects the promise a response belongs to.
    fn settle(&mut self, response: CallResponse, context: &mut Context) -> JsResult<()> {
        let Some(waiting) = self.waiting.remove(&response.id) else {
            return Ok(());
        };
        match response.result {
            Ok(value) => {
                let value = JsValue::from_json(&value, context)?;
                waiting.resolve.call(&JsValue::undefined(), &[value], context)?;
            }
            Err(err) => {
                let error = JsNativeError::error()
                    .with_message(err.to_string())
                    .to_opaque(context);
                waiting
                    .reject
                    .call(&JsValue::undefined(), &[error.clone().into()], context)?;
                self.failures.push((error, err));
            }
        }
        Ok(())
    }

    /// Maps the reason a script failed with back to a host error when the
    /// script only passed on a failed capability call.
    fn rejection(&mut self, reason: &JsValue, context: &mut Context) -> SandboxError {
        if let Some(object) = reason.as_object() {
            let failed = self
                .failures
                .iter()
                .position(|(error, _)| JsObject::equals(error, object));
            if let Some(index) = failed {
                return SandboxError::from(self.failures.swap_remove(index).1);
            }
        }
        SandboxError::thrown(describe_value(reason, context))
    }
}

fn object_field(object: &JsObject, key: &str, context: &mut Context) -> JsResult<JsObject> {
    object
        .get(JsString::from(key), context)?
        .as_object()
        .cloned()
        .ok_or_else(|| {
            JsNativeError::typ()
                .with_message(format!("{key} is not an object"))
                .into()
        })
}

fn to_json(value: &JsValue, stringify: &JsObject, context: &mut Context) -> Result<Json, SandboxError> {
    let text = stringify
        .call(&JsValue::undefined(), &[value.clone()], context)
        .map_err(|err| SandboxError::runtime(describe_error(&err, context)))?;
    match text.as_string() {
        Some(text) => serde_json::from_str(&text.to_std_string_escaped())
            .map_err(|e| SandboxError::runtime(format!("script result is not JSON: {e}"))),
        // undefined, functions and symbols have no JSON form
        None => Ok(Json::Null),
    }
}

fn describe_error(err: &JsError, context: &mut Context) -> String {
    match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => err.to_string(),
    }
}

fn describe_value(value: &JsValue, context: &mut Context) -> String {
    if let Some(text) = value.as_string() {
        return text.to_std_string_escaped();
    }
    describe_error(&JsError::from_opaque(value.clone()), context)
}

fn console_log(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    debug!(target: "ouroboros::script", "{}", parts.join(" "));
    Ok(JsValue::undefined())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_body_parses() {
        assert!(check_syntax(&wrap_body("const x = await lookup('q');\nreturn x;")).is_ok());
    }

    #[test]
    fn test_unbalanced_body_is_rejected() {
        let err = check_syntax(&wrap_body("if (task) {\n  return 1;")).unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("SyntaxError"), "{err}");
    }

    #[test]
    fn test_bare_return_needs_the_wrapper() {
        assert!(check_syntax("return 1;").unwrap_err().is_syntax());
        assert!(check_syntax(&wrap_body("return 1;")).is_ok());
    }
}
