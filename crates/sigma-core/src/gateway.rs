//! Engine gateway
//!
//! Engine instances are not safe to share. The gateway keeps a pool of idle instances
//! and checks one out for the duration of a single call, so an instance is only ever
//! driven by the thread that holds it. Every call runs under an admission-gate permit and
//! the instance is reset before it goes back into the pool.
//!
//! Engine failures never escape as errors: they become the `problems` of the returned
//! result. Only interruption while waiting for a permit is propagated.

use crate::error::{PipelineError, PipelineResult};
use crate::gate::AdmissionGate;
use sigma_engine::{EngineError, EngineFactory, EngineResult, StopHandle, SymbolicEngine};
use sigma_types::EvaluationResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

/// Outcome of one engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub result: EvaluationResult,
    /// The engine aborted on a stop request; the result must not be reused
    pub stopped: bool,
}

impl EngineCall {
    fn from_engine(expression: &str, outcome: EngineResult<EvaluationResult>) -> Self {
        match outcome {
            Ok(result) => Self { result, stopped: false },
            Err(err) => {
                warn!(expression, error = %err, "engine call failed");
                Self {
                    result: EvaluationResult::failed(expression, err.to_string()),
                    stopped: err == EngineError::Stopped,
                }
            }
        }
    }

    pub fn into_result(self) -> EvaluationResult {
        self.result
    }
}

pub struct EngineGateway {
    factory: Box<dyn EngineFactory>,
    idle: Mutex<Vec<Box<dyn SymbolicEngine>>>,
    handles: Mutex<Vec<StopHandle>>,
    gate: Arc<AdmissionGate>,
    invocations: AtomicU64,
}

impl std::fmt::Debug for EngineGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineGateway")
            .field("engines", &self.engine_count())
            .field("gate", &self.gate)
            .finish()
    }
}

impl EngineGateway {
    pub fn new(factory: impl EngineFactory + 'static, gate: Arc<AdmissionGate>) -> Self {
        Self {
            factory: Box::new(factory),
            idle: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            gate,
            invocations: AtomicU64::new(0),
        }
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Engine instances created so far
    pub fn engine_count(&self) -> usize {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Calls that reached an engine
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    fn checkout(&self) -> Box<dyn SymbolicEngine> {
        let pooled = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let engine = pooled.unwrap_or_else(|| {
            let engine = self.factory.create();
            self.handles.lock().unwrap_or_else(PoisonError::into_inner).push(engine.stop_handle());
            debug!(engines = self.engine_count(), "engine instance created");
            engine
        });
        // A stop aimed at an earlier call must not abort this one
        engine.stop_handle().clear();
        engine
    }

    fn checkin(&self, mut engine: Box<dyn SymbolicEngine>) {
        engine.reset();
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).push(engine);
    }

    /// Run `call` on a checked-out engine under a gate permit.
    fn run<T>(
        &self,
        operation: &str,
        call: impl FnOnce(&mut dyn SymbolicEngine) -> EngineResult<T>,
    ) -> PipelineResult<EngineResult<T>> {
        let _permit = self.gate.acquire(operation)?;
        let mut engine = self.checkout();
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let outcome = call(engine.as_mut());
        self.checkin(engine);
        Ok(outcome)
    }

    /// Parse with the engine's own parser; returns its canonical form.
    #[instrument(skip(self))]
    pub fn validate_syntax(&self, expression: &str) -> PipelineResult<String> {
        self.run("validate_syntax", |engine| engine.validate_syntax(expression))?
            .map_err(|err| match err {
                EngineError::Parse(detail) => PipelineError::syntax(detail),
                other => PipelineError::syntax(other.to_string()),
            })
    }

    #[instrument(skip(self))]
    pub fn evaluate(&self, expression: &str) -> PipelineResult<EngineCall> {
        let outcome = self.run("evaluate", |engine| engine.evaluate(expression))?;
        Ok(EngineCall::from_engine(expression, outcome))
    }

    #[instrument(skip(self))]
    pub fn calculate(&self, expression: &str, decimals: u32) -> PipelineResult<EngineCall> {
        let outcome = self.run("calculate", |engine| engine.calculate(expression, decimals))?;
        Ok(EngineCall::from_engine(expression, outcome))
    }

    #[instrument(skip(self))]
    pub fn draw(
        &self,
        expression: &str,
        variable: &str,
        origin: &str,
        bound: &str,
    ) -> PipelineResult<EngineCall> {
        let outcome =
            self.run("draw", |engine| engine.draw(expression, variable, origin, bound))?;
        Ok(EngineCall::from_engine(expression, outcome))
    }

    /// Replace a result's text with its display form; a formatting failure is added to its problems.
    pub fn format_for_display(&self, result: EvaluationResult) -> PipelineResult<EvaluationResult> {
        let text = result.expression_text().to_string();
        match self.run("format_for_display", |engine| engine.format_for_display(&text))? {
            Ok(display) => Ok(result.with_expression_text(display)),
            Err(err) => {
                warn!(expression = %text, error = %err, "display formatting failed");
                let mut problems = result.problems().to_vec();
                problems.push(err.to_string());
                Ok(EvaluationResult::with_problems(text, problems))
            }
        }
    }

    /// Ask every engine to abort its current call and fail callers waiting for a permit.
    pub fn stop_request(&self) {
        // Waiters go first so none of them can take a permit freed by a stopped call
        self.gate.interrupt_waiters();
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in handles.iter() {
            handle.request_stop();
        }
        debug!(engines = handles.len(), "stop requested");
    }
}
