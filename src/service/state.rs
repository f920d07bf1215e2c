//! Service state: the Axum layer's handle onto a wired-up [`FlowCore`].

use std::sync::Arc;

use crate::api::FlowCore;
use crate::clock::system_clock;
use crate::config::Config;
use crate::extract::{AnalyticsSink, NullSink};

/// Shared state injected into every handler via `State<ServiceState>`.
///
/// Thin on purpose: the service layer does DTO mapping and status-code
/// translation, nothing else. Everything domain-level lives on `FlowCore`.
#[derive(Clone)]
pub struct ServiceState {
    pub(crate) core: Arc<FlowCore>,
}

impl ServiceState {
    pub fn new(core: FlowCore) -> Self {
        Self { core: Arc::new(core) }
    }

    /// Builds a core from `Config::from_env()` with the system clock and a
    /// [`NullSink`] — callers that need a real analytics backend should
    /// construct `FlowCore` directly with `analytics-http`'s `HttpSink` and
    /// wrap it in [`ServiceState::new`] instead.
    pub fn from_env() -> Self {
        let config = Config::from_env();
        Self::new(FlowCore::with_clock_and_sink(config, system_clock(), Arc::new(NullSink)))
    }
}
