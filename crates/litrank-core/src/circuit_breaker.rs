//! Per-source circuit breaker (§4.11).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::SourceTag;

const FAILURE_THRESHOLD: u32 = 3;
const TIMEOUT: Duration = Duration::from_secs(60);
const SUCCESS_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self { state: CircuitState::Closed, failure_count: 0, success_count: 0, last_failure_at: None }
    }

    fn is_available(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.last_failure_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= TIMEOUT {
                    self.half_open();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= SUCCESS_THRESHOLD {
                    self.close();
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&mut self) {
        self.last_failure_at = Some(Instant::now());
        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= FAILURE_THRESHOLD {
                    self.open();
                }
            }
            CircuitState::HalfOpen => {
                self.open();
            }
            CircuitState::Open => {}
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.success_count = 0;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.success_count = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.success_count = 0;
    }
}

/// Process-wide registry of one breaker per source, mirroring the module-level
/// `_circuit_breakers` dict of the system this crate reimplements.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<SourceTag, CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self { breakers: Mutex::new(HashMap::new()) }
    }

    pub fn is_source_available(&self, source: SourceTag) -> bool {
        let mut breakers = self.breakers.lock().expect("circuit breaker registry lock poisoned");
        breakers.entry(source).or_insert_with(CircuitBreaker::new).is_available()
    }

    pub fn record_success(&self, source: SourceTag) {
        let mut breakers = self.breakers.lock().expect("circuit breaker registry lock poisoned");
        breakers.entry(source).or_insert_with(CircuitBreaker::new).record_success();
    }

    pub fn record_failure(&self, source: SourceTag) {
        let mut breakers = self.breakers.lock().expect("circuit breaker registry lock poisoned");
        breakers.entry(source).or_insert_with(CircuitBreaker::new).record_failure();
    }

    pub fn state_of(&self, source: SourceTag) -> CircuitState {
        let mut breakers = self.breakers.lock().expect("circuit breaker registry lock poisoned");
        breakers.entry(source).or_insert_with(CircuitBreaker::new).state
    }
}
