//! Per-execution evaluation environment.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use strand_core::{Env, Value};
use tracing::debug;

use crate::guards::ExecutionState;
use crate::shared::SharedState;

/// Cooperative cancellation flag, cheap to clone and share.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Wall-clock timeout: cancel once `timeout` has elapsed.
    pub fn cancel_after(&self, timeout: Duration) -> JoinHandle<()> {
        let token = self.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            if !token.is_cancelled() {
                debug!(?timeout, "execution deadline reached");
                token.cancel();
            }
        })
    }
}

/// Everything one logical execution carries through evaluation.
///
/// Owns its guard state, so it must not be shared between concurrent
/// executions; use [`EvalContext::fork`] to start a sibling task.
pub struct EvalContext {
    env: Env,
    module: Arc<str>,
    shared: Arc<SharedState>,
    cancel: CancelToken,
    state: Arc<ExecutionState>,
}

impl EvalContext {
    pub fn new(shared: Arc<SharedState>, state: ExecutionState) -> Self {
        Self {
            env: Env::new(),
            module: Arc::from(SharedState::MAIN),
            shared,
            cancel: CancelToken::new(),
            state: Arc::new(state),
        }
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.shared.define_module(module);
        self.module = Arc::from(module);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn state(&self) -> &Arc<ExecutionState> {
        &self.state
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Local scopes first, then the current module's bindings.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.env.lookup(name) {
            Some(v) => Some(v.clone()),
            None => self.shared.get(&self.module, name),
        }
    }

    /// Assign a module-level binding; fires the shared-state mutation hooks.
    pub fn assign_global(&self, name: &str, value: Value) {
        self.shared.assign(&self.module, name, value);
    }

    /// New execution with the same shared state, module and cancellation,
    /// a copy of the current bindings, and fresh guard state.
    pub fn fork(&self) -> Self {
        Self {
            env: self.env.clone(),
            module: self.module.clone(),
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
            state: Arc::new(ExecutionState::new(self.state.depth().limit())),
        }
    }
}
