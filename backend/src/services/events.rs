use crate::models::MatchEvent;

/// Where the engine publishes lifecycle notifications. Implementations fan
/// out to push channels, webhooks, or whatever transport the deployment
/// uses; the engine never waits on delivery.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: MatchEvent);
}

/// Production default: structured log lines. A real-time transport can wrap
/// or replace this without touching the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: MatchEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(target: "lonetown::events", %payload, "match event"),
            Err(err) => tracing::error!("failed to serialize match event: {err}"),
        }
    }
}
