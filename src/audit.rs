//! Audit sink for admin mutations.
//!
//! The audit log itself lives outside this service; we only hand it
//! `(actor, action, resource, success, detail)` records and never wait on it.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub success: bool,
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(actor: &str, action: &str, resource: impl Into<String>) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            resource: resource.into(),
            success: true,
            detail: None,
        }
    }

    pub fn failed(mut self, detail: impl Into<String>) -> Self {
        self.success = false;
        self.detail = Some(detail.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Fire-and-forget receiver of audit events. Implementations must not block
/// and must swallow their own failures.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Default sink: structured `tracing` events on the `audit` target, picked up
/// by whatever log shipping the deployment uses.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        if event.success {
            info!(
                target: "audit",
                actor = %event.actor,
                action = %event.action,
                resource = %event.resource,
                detail = event.detail.as_deref().unwrap_or(""),
                "admin action succeeded"
            );
        } else {
            warn!(
                target: "audit",
                actor = %event.actor,
                action = %event.action,
                resource = %event.resource,
                detail = event.detail.as_deref().unwrap_or(""),
                "admin action failed"
            );
        }
    }
}

/// Keeps events in memory; handy for tests and for embedding the service.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let ok = AuditEvent::new("42", "translation.upsert", "translations/7/fr")
            .with_detail("value updated");
        assert!(ok.success);
        assert_eq!(ok.detail.as_deref(), Some("value updated"));

        let failed = AuditEvent::new("42", "language.create", "languages/fr").failed("duplicate");
        assert!(!failed.success);
        assert_eq!(failed.detail.as_deref(), Some("duplicate"));
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let sink = TracingAuditSink;
        sink.record(AuditEvent::new("1", "static.put", "static/en"));
        sink.record(AuditEvent::new("1", "static.put", "static/en").failed("io error"));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent::new("1", "language.create", "languages/fr"));
        sink.record(AuditEvent::new("1", "language.update", "languages/3").failed("not found"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "language.create");
        assert!(!events[1].success);
    }
}
