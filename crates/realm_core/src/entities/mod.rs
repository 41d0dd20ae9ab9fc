mod index;
mod item;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actor::{Actor, ActorId, ActorState, ActorStats, Mob, MobBehavior, Player};
use crate::coords::{tile_pos_to_world, TileScale, Vec2};
use crate::net::EntityDelta;

pub use index::{
    entity_cell_size_px, EntityChunkKey, EntityKind, IndexError, Spatial, SpatialIndex,
    UpsertOutcome, DEFAULT_ENTITY_CHUNK_SIZE,
};
pub use item::{ItemError, ItemId, ItemStack, UnitId};

/// Tagged reference to an actor, resolved through the index on use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    Mob(ActorId),
    Player(ActorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    Inserted,
    Updated { migrated: bool },
    Removed,
}

impl From<UpsertOutcome> for DeltaOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => DeltaOutcome::Inserted,
            UpsertOutcome::Updated { migrated } => DeltaOutcome::Updated { migrated },
        }
    }
}

/// Defaults for actors first seen through a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActorTemplate {
    pub stats: ActorStats,
    pub behavior: MobBehavior,
}

/// Mob, player and item indexes sharing one bucket size.
#[derive(Debug, Clone)]
pub struct EntityManager {
    mobs: SpatialIndex<Mob>,
    players: SpatialIndex<Player>,
    items: SpatialIndex<ItemStack>,
    entity_chunk_size: u32,
}

impl EntityManager {
    pub fn new(scale: &TileScale, entity_chunk_size: u32) -> Self {
        let cell_size_px = entity_cell_size_px(scale, entity_chunk_size);
        Self {
            mobs: SpatialIndex::new(cell_size_px),
            players: SpatialIndex::new(cell_size_px),
            items: SpatialIndex::new(cell_size_px),
            entity_chunk_size,
        }
    }

    pub fn mobs(&self) -> &SpatialIndex<Mob> {
        &self.mobs
    }

    pub fn players(&self) -> &SpatialIndex<Player> {
        &self.players
    }

    pub fn items(&self) -> &SpatialIndex<ItemStack> {
        &self.items
    }

    pub fn mob(&self, id: ActorId) -> Option<&Mob> {
        self.mobs.get(id)
    }

    pub fn player(&self, id: ActorId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn item(&self, id: UnitId) -> Option<&ItemStack> {
        self.items.get(id)
    }

    pub fn resolve(&self, entity: EntityRef) -> Option<&Actor> {
        match entity {
            EntityRef::Mob(id) => self.mobs.get(id).map(|mob| &mob.actor),
            EntityRef::Player(id) => self.players.get(id).map(|player| &player.actor),
        }
    }

    pub fn add_mob(&mut self, mob: Mob) -> Result<(), IndexError> {
        self.mobs.insert(mob).inspect_err(log_duplicate)
    }

    pub fn add_player(&mut self, player: Player) -> Result<(), IndexError> {
        self.players.insert(player).inspect_err(log_duplicate)
    }

    pub fn add_item(&mut self, stack: ItemStack) -> Result<(), IndexError> {
        self.items.insert(stack).inspect_err(log_duplicate)
    }

    /// Removes the mob and clears every target that pointed at it.
    pub fn remove_mob(&mut self, id: ActorId) -> Option<Mob> {
        let mob = self.mobs.remove(id)?;
        self.clear_targets(EntityRef::Mob(id));
        debug!(mob_id = id.0, "mob_removed");
        Some(mob)
    }

    pub fn remove_player(&mut self, id: ActorId) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.clear_targets(EntityRef::Player(id));
        debug!(player_id = id.0, "player_removed");
        Some(player)
    }

    pub fn remove_item(&mut self, id: UnitId) -> Option<ItemStack> {
        self.items.remove(id)
    }

    pub fn update_mob_with<R>(&mut self, id: ActorId, apply: impl FnOnce(&mut Mob) -> R) -> Option<R> {
        self.mobs.update_with(id, apply)
    }

    pub fn update_player_with<R>(
        &mut self,
        id: ActorId,
        apply: impl FnOnce(&mut Player) -> R,
    ) -> Option<R> {
        self.players.update_with(id, apply)
    }

    pub fn update_item_with<R>(
        &mut self,
        id: UnitId,
        apply: impl FnOnce(&mut ItemStack) -> R,
    ) -> Option<R> {
        self.items.update_with(id, apply)
    }

    /// Applies a remote mob update. Unknown ids are added from `template`; a
    /// delta carrying zero health removes the mob.
    pub fn update_mob(
        &mut self,
        delta: &EntityDelta,
        scale: &TileScale,
        template: &ActorTemplate,
    ) -> DeltaOutcome {
        if delta.health.is_some_and(|health| health <= 0.0) {
            self.remove_mob(delta.actor_id);
            return DeltaOutcome::Removed;
        }
        let position = tile_pos_to_world(Vec2::new(delta.x, delta.y), scale);
        let outcome = self.mobs.upsert(
            delta.actor_id,
            || {
                Mob::new(
                    Actor::new(
                        delta.actor_id,
                        default_name("mob", delta.actor_id),
                        position,
                        template.stats,
                    ),
                    template.behavior,
                )
            },
            |mob| apply_delta(&mut mob.actor, delta, position),
        );
        debug!(mob_id = delta.actor_id.0, ?outcome, "mob_delta_applied");
        outcome.into()
    }

    /// Applies a remote player update. Players at zero health stay indexed.
    pub fn update_player(
        &mut self,
        delta: &EntityDelta,
        scale: &TileScale,
        template: &ActorTemplate,
    ) -> DeltaOutcome {
        let position = tile_pos_to_world(Vec2::new(delta.x, delta.y), scale);
        let outcome = self.players.upsert(
            delta.actor_id,
            || {
                Player::new(Actor::new(
                    delta.actor_id,
                    default_name("player", delta.actor_id),
                    position,
                    template.stats,
                ))
            },
            |player| apply_delta(&mut player.actor, delta, position),
        );
        debug!(player_id = delta.actor_id.0, ?outcome, "player_delta_applied");
        outcome.into()
    }

    /// `center` and `half_extent` in world pixels.
    pub fn find_mobs_near(&self, center: Vec2, half_extent: Vec2) -> Vec<&Mob> {
        self.mobs.find_near(center, half_extent)
    }

    pub fn find_players_near(&self, center: Vec2, half_extent: Vec2) -> Vec<&Player> {
        self.players.find_near(center, half_extent)
    }

    pub fn find_items_near(&self, center: Vec2, half_extent: Vec2) -> Vec<&ItemStack> {
        self.items.find_near(center, half_extent)
    }

    pub fn find_mobs_at(&self, position: Vec2) -> Vec<&Mob> {
        self.mobs.find_at(position)
    }

    /// Rescales every pixel position from `from` to `to` and rebuilds buckets.
    pub fn rescale(&mut self, from: &TileScale, to: &TileScale) {
        let factor = to.scaled_tile_size() / from.scaled_tile_size();
        let cell_size_px = entity_cell_size_px(to, self.entity_chunk_size);
        if factor != 1.0 {
            self.mobs.update_all(|mob| {
                scale_actor(&mut mob.actor, factor);
                mob.home = mob.home.scaled(factor);
            });
            self.players
                .update_all(|player| scale_actor(&mut player.actor, factor));
            self.items
                .update_all(|stack| stack.position = stack.position.scaled(factor));
        }
        self.mobs.set_cell_size(cell_size_px);
        self.players.set_cell_size(cell_size_px);
        self.items.set_cell_size(cell_size_px);
    }

    pub fn clear(&mut self) {
        self.mobs.clear();
        self.players.clear();
        self.items.clear();
    }

    fn clear_targets(&mut self, removed: EntityRef) {
        let clear = |actor: &mut Actor| {
            if actor.target == Some(removed) {
                actor.target = None;
            }
        };
        self.mobs.update_all(|mob| clear(&mut mob.actor));
        self.players.update_all(|player| clear(&mut player.actor));
    }
}

fn log_duplicate(error: &IndexError) {
    warn!(error = %error, "duplicate_entity_rejected");
}

fn default_name(prefix: &str, id: ActorId) -> String {
    format!("{prefix}_{}", id.0)
}

fn scale_actor(actor: &mut Actor, factor: f32) {
    actor.position = actor.position.scaled(factor);
    actor.previous_position = actor.previous_position.scaled(factor);
}

fn apply_delta(actor: &mut Actor, delta: &EntityDelta, position: Vec2) {
    actor.place_at(position);
    actor.render_state = delta.render_state;
    if let Some(health) = delta.health {
        actor.hp = health.clamp(0.0, actor.stats.max_hp);
        if actor.hp <= 0.0 {
            actor.state = ActorState::Defeated;
        }
    }
    if let Some(name) = &delta.name {
        actor.name.clone_from(name);
    }
}
