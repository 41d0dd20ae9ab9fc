//! Wire-facing types for peer synchronization. Transport lives elsewhere; the
//! core only produces and consumes these values.

use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, RenderState};
use crate::entities::EntityRef;

/// Authoritative state for one remote actor, positions in tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDelta {
    pub actor_id: ActorId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub render_state: RenderState,
    #[serde(default)]
    pub health: Option<f32>,
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityDelta {
    pub fn at(actor_id: ActorId, x: f32, y: f32) -> Self {
        Self {
            actor_id,
            x,
            y,
            render_state: RenderState::Idle,
            health: None,
            name: None,
        }
    }
}

/// Negative `amount` is healing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub attacker: Option<EntityRef>,
    pub target: EntityRef,
    pub amount: f32,
    pub remaining_hp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PeerEvent {
    EntityMoved {
        entity: EntityRef,
        x: f32,
        y: f32,
        render_state: RenderState,
    },
    DamageDealt(DamageEvent),
}

/// Outbound, fire-and-forget. Implementations must not call back into the world.
pub trait PeerNotifier {
    /// Position in tiles.
    fn entity_moved(&mut self, entity: EntityRef, x: f32, y: f32, render_state: RenderState);
    fn damage_dealt(&mut self, event: DamageEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl PeerNotifier for NullNotifier {
    fn entity_moved(&mut self, _entity: EntityRef, _x: f32, _y: f32, _render_state: RenderState) {}

    fn damage_dealt(&mut self, _event: DamageEvent) {}
}

/// Keeps every event in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Vec<PeerEvent>,
}

impl RecordingNotifier {
    pub fn events(&self) -> &[PeerEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<PeerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn damage_events(&self) -> impl Iterator<Item = &DamageEvent> {
        self.events.iter().filter_map(|event| match event {
            PeerEvent::DamageDealt(damage) => Some(damage),
            PeerEvent::EntityMoved { .. } => None,
        })
    }
}

impl PeerNotifier for RecordingNotifier {
    fn entity_moved(&mut self, entity: EntityRef, x: f32, y: f32, render_state: RenderState) {
        self.events.push(PeerEvent::EntityMoved {
            entity,
            x,
            y,
            render_state,
        });
    }

    fn damage_dealt(&mut self, event: DamageEvent) {
        self.events.push(PeerEvent::DamageDealt(event));
    }
}
