/// Domain events for the settings gateway
///
/// Events are fire-and-forget notifications describing what happened to a
/// settings instance:
/// - Sync: the instance was populated from a stored row
/// - Create / Update: values changed, creating or updating the stored row
/// - Delete: the stored row was removed; carries the snapshot taken before reset

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Domain event types for settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SettingsEvent {
    /// Settings were synchronized from an existing row
    Sync(SettingsSyncEvent),
    /// First write for an entity, the row was created
    Create(SettingsChangeEvent),
    /// Write to an existing row
    Update(SettingsChangeEvent),
    /// Row deleted
    Delete(SettingsDeleteEvent),
}

/// Event data for a synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSyncEvent {
    /// Gateway (and table) name
    pub gateway: String,
    /// Entity id
    pub id: String,
    /// Values after synchronization
    pub settings: Value,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
}

/// Event data for a create or an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsChangeEvent {
    /// Gateway (and table) name
    pub gateway: String,
    /// Entity id
    pub id: String,
    /// Values after the change
    pub settings: Value,
    /// Flattened `{path: next}` map of the changed leaves
    pub changes: Map<String, Value>,
    /// Change records and pass-through context
    pub context: UpdateContext,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
}

/// Event data for a deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDeleteEvent {
    /// Gateway (and table) name
    pub gateway: String,
    /// Entity id
    pub id: String,
    /// Values before they were reset to defaults
    pub settings: Value,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
}

/// One changed leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Entry path
    pub path: String,
    /// Value before the change
    pub previous: Value,
    /// Value after the change
    pub next: Value,
}

/// Context bag forwarded with create and update events
///
/// The core never interprets `extra_context` nor `ambient_context`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateContext {
    /// Ordered change records
    pub changes: Vec<ChangeRecord>,
    /// Caller supplied value
    pub extra_context: Option<Value>,
    /// Host supplied value configured on the gateway
    pub ambient_context: Option<Value>,
}

impl UpdateContext {
    /// Flattened `{path: next}` view of the change records
    pub fn flatten(&self) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|change| (change.path.clone(), change.next.clone()))
            .collect()
    }
}

impl SettingsEvent {
    /// Create a new Sync event
    pub fn synced(gateway: &str, id: &str, settings: Value) -> Self {
        SettingsEvent::Sync(SettingsSyncEvent {
            gateway: gateway.to_string(),
            id: id.to_string(),
            settings,
            timestamp: Utc::now(),
        })
    }

    /// Create a new Create event (`created = true`) or Update event
    pub fn changed(
        gateway: &str,
        id: &str,
        settings: Value,
        context: UpdateContext,
        created: bool,
    ) -> Self {
        let event = SettingsChangeEvent {
            gateway: gateway.to_string(),
            id: id.to_string(),
            settings,
            changes: context.flatten(),
            context,
            timestamp: Utc::now(),
        };
        if created {
            SettingsEvent::Create(event)
        } else {
            SettingsEvent::Update(event)
        }
    }

    /// Create a new Delete event
    pub fn deleted(gateway: &str, id: &str, snapshot: Value) -> Self {
        SettingsEvent::Delete(SettingsDeleteEvent {
            gateway: gateway.to_string(),
            id: id.to_string(),
            settings: snapshot,
            timestamp: Utc::now(),
        })
    }

    /// Gateway that emitted the event
    pub fn gateway(&self) -> &str {
        match self {
            SettingsEvent::Sync(e) => &e.gateway,
            SettingsEvent::Create(e) | SettingsEvent::Update(e) => &e.gateway,
            SettingsEvent::Delete(e) => &e.gateway,
        }
    }

    /// Entity id the event is about
    pub fn id(&self) -> &str {
        match self {
            SettingsEvent::Sync(e) => &e.id,
            SettingsEvent::Create(e) | SettingsEvent::Update(e) => &e.id,
            SettingsEvent::Delete(e) => &e.id,
        }
    }

    /// Short event name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            SettingsEvent::Sync(_) => "settingsSync",
            SettingsEvent::Create(_) => "settingsCreate",
            SettingsEvent::Update(_) => "settingsUpdate",
            SettingsEvent::Delete(_) => "settingsDelete",
        }
    }
}

/// Event publisher trait for settings notifications
///
/// Implementations decide the transport. A failing publisher never fails the
/// operation that produced the event.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event
    async fn publish(&self, event: SettingsEvent) -> anyhow::Result<()>;
}

/// No-op event publisher for testing or when events are disabled
pub struct NoOpEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: SettingsEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publish an event, logging instead of propagating failures
pub(crate) async fn emit(publisher: &dyn EventPublisher, event: SettingsEvent) {
    let name = event.name();
    let gateway = event.gateway().to_string();
    let id = event.id().to_string();
    if let Err(e) = publisher.publish(event).await {
        warn!(event = name, gateway = %gateway, id = %id, error = %e, "Failed to publish settings event");
    }
}
