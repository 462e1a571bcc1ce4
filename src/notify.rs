use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use ulid::Ulid;

const CHANNEL_CAPACITY: usize = 256;

/// An announced engine event: a name plus a JSON payload map. The
/// notification layer downstream decides what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub name: &'static str,
    pub payload: Value,
}

pub const CONFLICT_DETECTED: &str = "conflict_detected";
pub const CONFLICT_RESOLVED: &str = "conflict_resolved";
pub const CONFLICT_ACKNOWLEDGED: &str = "conflict_acknowledged";
pub const CONFLICT_IGNORED: &str = "conflict_ignored";
pub const CONFLICTS_BATCH_RESOLVED: &str = "conflicts_batch_resolved";

/// Broadcast hub for engine events, one channel per schedule.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<EngineEvent>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a schedule. Creates the channel if needed.
    pub fn subscribe(&self, schedule_id: Ulid) -> broadcast::Receiver<EngineEvent> {
        let sender = self
            .channels
            .entry(schedule_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Emit an event. No-op if nobody is listening.
    pub fn emit(&self, schedule_id: Ulid, name: &'static str, payload: Value) {
        if let Some(sender) = self.channels.get(&schedule_id) {
            let _ = sender.send(EngineEvent { name, payload });
        }
    }

    /// Remove a schedule's channel.
    #[allow(dead_code)]
    pub fn remove(&self, schedule_id: &Ulid) {
        self.channels.remove(schedule_id);
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}
