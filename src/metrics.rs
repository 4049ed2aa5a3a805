//! Metrics instrumentation for dns-supervisor.
//!
//! All metrics are prefixed with `dns_supervisor.`

use metrics::counter;

/// Outcome of a reload request hitting the debounce queue.
#[derive(Debug, Clone, Copy)]
pub enum ReloadRequest {
    /// Request was queued for the worker.
    Queued,
    /// A reload was already pending; the request was coalesced into it.
    Coalesced,
}

/// Record a reload request.
pub fn record_reload_request(outcome: ReloadRequest) {
    let outcome_str = match outcome {
        ReloadRequest::Queued => "queued",
        ReloadRequest::Coalesced => "coalesced",
    };

    counter!("dns_supervisor.reload.request.count", "outcome" => outcome_str).increment(1);
}

/// What drove a reload execution.
#[derive(Debug, Clone, Copy)]
pub enum ReloadCause {
    /// An explicit request (leadership change or caller trigger).
    Requested,
    /// The periodic fallback timer expired.
    Timer,
}

/// Record a completed reload execution.
pub fn record_reload(cause: ReloadCause) {
    let cause_str = match cause {
        ReloadCause::Requested => "requested",
        ReloadCause::Timer => "timer",
    };

    counter!("dns_supervisor.reload.count", "cause" => cause_str).increment(1);
}

/// Record a leadership acquisition observed by the run loop.
pub fn record_leadership_acquired() {
    counter!("dns_supervisor.leader.acquired.count").increment(1);
}

/// Record an error routed to the host's error handler.
pub fn record_subsystem_error(subsystem: &str) {
    counter!("dns_supervisor.error.routed.count", "subsystem" => subsystem.to_string())
        .increment(1);
}

/// Record a successfully started plugin.
pub fn record_plugin_started() {
    counter!("dns_supervisor.plugin.started.count").increment(1);
}

/// Record a plugin skipped during launch.
pub fn record_plugin_skipped(reason: &'static str) {
    counter!("dns_supervisor.plugin.skipped.count", "reason" => reason).increment(1);
}
