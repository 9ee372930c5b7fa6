use super::types::{CatalogEvent, EventPayload, EventType};
use crate::models::{ContentKind, DownloadProgress, ProfileId};
use anyhow::Result;
use tokio::sync::broadcast;
use tracing::trace;

/// Receiving end of the bus, optionally narrowed by an [`EventFilter`].
pub struct EventSubscriber {
    receiver: broadcast::Receiver<CatalogEvent>,
    filter: EventFilter,
}

impl EventSubscriber {
    /// Next matching event. Fails once the bus is gone or this subscriber
    /// lagged behind the channel capacity.
    pub async fn recv(&mut self) -> Result<CatalogEvent> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already queued, if any.
    pub fn try_recv(&mut self) -> Result<Option<CatalogEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Drains every matching event already queued for this subscriber.
    pub fn drain(&mut self) -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Narrows a subscription by event type and by profile. Empty criteria match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    event_types: Option<Vec<EventType>>,
    profile: Option<ProfileId>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(mut self, types: Vec<EventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    /// Only events about `profile`; events without a profile are dropped.
    pub fn for_profile(mut self, profile: ProfileId) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn matches(&self, event: &CatalogEvent) -> bool {
        let type_ok = self
            .event_types
            .as_ref()
            .is_none_or(|types| types.contains(&event.event_type));
        let profile_ok = self
            .profile
            .as_ref()
            .is_none_or(|profile| event.profile_id() == Some(profile));
        type_ok && profile_ok
    }
}

/// Broadcast bus for catalog events. Publishing never blocks and never fails
/// for lack of subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub async fn publish(&self, event: CatalogEvent) -> Result<()> {
        trace!("Publishing {:?}", event.event_type);
        // A send error only means nobody is listening
        let _ = self.sender.send(event);
        Ok(())
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.subscribe_filtered(EventFilter::new())
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscribe_to_types(&self, types: Vec<EventType>) -> EventSubscriber {
        self.subscribe_filtered(EventFilter::new().with_types(types))
    }

    pub async fn emit_profile(
        &self,
        event_type: EventType,
        id: ProfileId,
        name: Option<String>,
    ) -> Result<()> {
        self.publish(CatalogEvent::new(event_type, EventPayload::Profile { id, name }))
            .await
    }

    /// Download state change for one kind of one profile.
    pub async fn emit_download(
        &self,
        event_type: EventType,
        profile_id: ProfileId,
        kind: ContentKind,
        progress: DownloadProgress,
        error: Option<String>,
    ) -> Result<()> {
        self.publish(CatalogEvent::new(
            event_type,
            EventPayload::Download {
                profile_id,
                kind,
                progress,
                error,
            },
        ))
        .await
    }

    pub async fn emit_cache(
        &self,
        event_type: EventType,
        profile_id: Option<ProfileId>,
        kind: Option<ContentKind>,
    ) -> Result<()> {
        self.publish(CatalogEvent::new(
            event_type,
            EventPayload::Cache { profile_id, kind },
        ))
        .await
    }

    pub async fn emit_settings_changed(&self, key: &str) -> Result<()> {
        self.publish(CatalogEvent::new(
            EventType::SettingsChanged,
            EventPayload::Settings {
                key: key.to_string(),
            },
        ))
        .await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
