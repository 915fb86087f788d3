//! Timeout-bounded expression evaluation.
//!
//! A fresh Rhai engine is created for every evaluation, so a single
//! [`Sandbox`] can be shared freely between threads and tasks: no
//! interpreter state is ever used by two evaluations at once. The standard
//! library and helper functions are built once per sandbox and attached to
//! each engine as shared modules. Compiled [`Script`]s are immutable and
//! reused across records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog_core::{SourceRecord, Value};
use rhai::packages::{Package, StandardPackage};
use rhai::{Dynamic, Engine, EvalAltResult, Module, Scope, AST};
use tracing::debug;

use crate::coerce::{from_dynamic, FromScript};
use crate::config::SandboxConfig;
use crate::error::{EvalError, EvalResult};
use crate::functions;

/// Variable the record is bound to inside expressions.
pub const RECORD_VARIABLE: &str = "record";

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct Script {
    source: String,
    ast: AST,
}

impl Script {
    /// The expression text as written in config.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Evaluates expressions against source records.
#[derive(Debug, Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    globals: Vec<Arc<Module>>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::with_config(SandboxConfig::default())
    }
}

impl Sandbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: SandboxConfig) -> Self {
        Self {
            config,
            globals: vec![
                StandardPackage::new().as_shared_module(),
                Arc::new(functions::module()),
            ],
        }
    }

    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Create a sandboxed engine. With a deadline, the engine aborts once the
    /// wall clock passes it.
    fn create_engine(&self, deadline: Option<Instant>) -> Engine {
        let mut engine = Engine::new_raw();
        for module in &self.globals {
            engine.register_global_module(Arc::clone(module));
        }

        engine.set_max_operations(self.config.max_operations);
        engine.set_max_call_levels(self.config.max_call_levels);
        engine.set_max_string_size(self.config.max_string_size);
        engine.set_max_array_size(self.config.max_array_size);
        engine.set_max_map_size(self.config.max_map_size);
        engine.set_strict_variables(true);

        if let Some(deadline) = deadline {
            engine.on_progress(move |_| {
                if Instant::now() >= deadline {
                    Some(Dynamic::from("timeout"))
                } else {
                    None
                }
            });
        }

        engine
    }

    fn record_scope(record: Dynamic) -> Scope<'static> {
        let mut scope = Scope::new();
        // Pushed as a variable, not a constant, so that compilation does not
        // fold the placeholder value into the AST.
        scope.push(RECORD_VARIABLE, record);
        scope
    }

    /// Compile an expression.
    pub fn compile(&self, source: &str) -> EvalResult<Script> {
        let engine = self.create_engine(None);
        let scope = Self::record_scope(Dynamic::UNIT);
        let ast = engine
            .compile_with_scope(&scope, source)
            .map_err(|e| EvalError::Parse {
                script: source.to_string(),
                message: e.to_string(),
                line: e.position().line(),
            })?;

        Ok(Script {
            source: source.to_string(),
            ast,
        })
    }

    /// Evaluate a script and return its raw result.
    pub fn evaluate(&self, script: &Script, record: &SourceRecord) -> EvalResult<Value> {
        let bound = rhai::serde::to_dynamic(&record.fields).map_err(|e| EvalError::Runtime {
            script: script.source.clone(),
            message: format!("cannot bind record from {}: {e}", record.origin),
        })?;

        let deadline = (!self.config.timeout.is_zero()).then(|| Instant::now() + self.config.timeout);
        let engine = self.create_engine(deadline);
        let mut scope = Self::record_scope(bound);

        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &script.ast)
            .map_err(|e| self.runtime_error(script, &e))?;

        from_dynamic(result)
    }

    /// Evaluate a script expected to produce one value.
    ///
    /// Returns `Ok(None)` when the script yields `()`.
    pub fn evaluate_scalar<T: FromScript>(
        &self,
        script: &Script,
        record: &SourceRecord,
    ) -> EvalResult<Option<T>> {
        match self.evaluate(script, record)? {
            Value::Null => Ok(None),
            value => T::from_script(value).map(Some),
        }
    }

    /// Evaluate a script expected to produce a list.
    ///
    /// A scalar result becomes a one-element list; `()` results and `()`
    /// elements are dropped.
    pub fn evaluate_list<T: FromScript>(
        &self,
        script: &Script,
        record: &SourceRecord,
    ) -> EvalResult<Vec<T>> {
        match self.evaluate(script, record)? {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(T::from_script)
                .collect(),
            value => T::from_script(value).map(|item| vec![item]),
        }
    }

    fn runtime_error(&self, script: &Script, error: &EvalAltResult) -> EvalError {
        match error.unwrap_inner() {
            EvalAltResult::ErrorTerminated(..) | EvalAltResult::ErrorTooManyOperations(..) => {
                debug!(script = %script.source, "Expression aborted by sandbox limits");
                EvalError::Timeout {
                    script: script.source.clone(),
                    timeout_ms: duration_ms(self.config.timeout),
                }
            }
            _ => EvalError::Runtime {
                script: script.source.clone(),
                message: error.to_string(),
            },
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
