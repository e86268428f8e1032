//! Instrumented engine shared by the integration tests
#![allow(dead_code)]

use sigma_core::{
    EvaluationResult, PipelineOrchestrator, ReferenceEngine, SigmaConfig, StopHandle,
    SymbolicEngine,
};
use sigma_engine::{EngineError, EngineResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long a blocked draw waits for a stop request
const BLOCK_LIMIT: Duration = Duration::from_secs(10);

/// Shared counters observed by every engine a factory creates
#[derive(Debug, Default)]
pub struct Probe {
    invocations: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    drawing: AtomicBool,
    block_draws: AtomicBool,
    delay_ms: AtomicU64,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        let probe = Self::default();
        probe.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        Arc::new(probe)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.load(Ordering::SeqCst)
    }

    /// Make draws spin until they are stopped
    pub fn block_draws(&self, block: bool) {
        self.block_draws.store(block, Ordering::SeqCst);
    }

    /// Wait until some engine is inside a draw call
    pub fn wait_for_draw(&self) {
        let started = Instant::now();
        while !self.is_drawing() {
            assert!(started.elapsed() < BLOCK_LIMIT, "no draw started");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn enter(&self) -> InFlight<'_> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        InFlight { probe: self }
    }
}

struct InFlight<'a> {
    probe: &'a Probe,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reference engine wrapped with call counting, optional latency and blocking draws
pub struct InstrumentedEngine {
    inner: ReferenceEngine,
    probe: Arc<Probe>,
}

impl InstrumentedEngine {
    pub fn new(probe: Arc<Probe>) -> Self {
        Self { inner: ReferenceEngine::new(), probe }
    }

    fn block_until_stopped(&self) -> EngineResult<EvaluationResult> {
        let stop = self.inner.stop_handle();
        let started = Instant::now();
        while !stop.is_stop_requested() {
            if started.elapsed() > BLOCK_LIMIT {
                return Err(EngineError::Evaluation("draw never stopped".into()));
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(EngineError::Stopped)
    }
}

impl SymbolicEngine for InstrumentedEngine {
    fn validate_syntax(&mut self, expression: &str) -> EngineResult<String> {
        self.inner.validate_syntax(expression)
    }

    fn evaluate(&mut self, expression: &str) -> EngineResult<EvaluationResult> {
        let _call = self.probe.enter();
        self.inner.evaluate(expression)
    }

    fn calculate(&mut self, expression: &str, decimals: u32) -> EngineResult<EvaluationResult> {
        let _call = self.probe.enter();
        self.inner.calculate(expression, decimals)
    }

    fn draw(
        &mut self,
        expression: &str,
        variable: &str,
        origin: &str,
        bound: &str,
    ) -> EngineResult<EvaluationResult> {
        let _call = self.probe.enter();
        self.probe.drawing.store(true, Ordering::SeqCst);
        let outcome = if self.probe.block_draws.load(Ordering::SeqCst) {
            self.block_until_stopped()
        } else {
            self.inner.draw(expression, variable, origin, bound)
        };
        self.probe.drawing.store(false, Ordering::SeqCst);
        outcome
    }

    fn format_for_display(&mut self, expression: &str) -> EngineResult<String> {
        self.inner.format_for_display(expression)
    }

    fn stop_handle(&self) -> StopHandle {
        self.inner.stop_handle()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

pub fn factory(probe: &Arc<Probe>) -> impl Fn() -> Box<dyn SymbolicEngine> + Send + Sync + 'static {
    let probe = Arc::clone(probe);
    move || Box::new(InstrumentedEngine::new(Arc::clone(&probe))) as Box<dyn SymbolicEngine>
}

pub fn pipeline_with(config: &SigmaConfig, probe: &Arc<Probe>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(config, factory(probe)).expect("pipeline should build")
}

/// Config with a small gate and fast polling
pub fn test_config(max_in_flight: usize) -> SigmaConfig {
    let mut config = SigmaConfig::default();
    config.gate.max_in_flight = max_in_flight;
    config.gate.poll_interval_ms = 5;
    config
}
