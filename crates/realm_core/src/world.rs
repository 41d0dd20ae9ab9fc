use tracing::{debug, info};

use crate::actor::{
    step_actor, Actor, ActorId, ActorStats, Mob, MobBehavior, MoveIntent, Player, StepReport,
};
use crate::collision::CollisionParams;
use crate::combat;
use crate::config::EngineConfig;
use crate::coords::{tile_pos_to_world, world_to_tile_pos, Camera2D, TileScale, Vec2, Viewport};
use crate::entities::{
    ActorTemplate, DeltaOutcome, EntityManager, EntityRef, ItemId, ItemStack, UnitId,
};
use crate::map::{
    extract_window, populate_store, Layer, LayeredChunkStore, LoadSummary, ScreenWindow,
    WindowRequest, WorldData, WorldLoadError,
};
use crate::net::{DamageEvent, EntityDelta, NullNotifier, PeerNotifier};
use crate::tiles::{TileRegistry, Tileset};
use crate::RealmError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub player: Option<StepReport>,
    pub mobs_moved: usize,
}

/// Everything one simulation owns: map, tiles, entities, camera and the
/// outbound notifier. Single-threaded; every method runs to completion.
#[derive(Debug)]
pub struct GameWorld<N: PeerNotifier = NullNotifier> {
    scale: TileScale,
    viewport: Viewport,
    view_bias: i32,
    collision: CollisionParams,
    template: ActorTemplate,
    chunks: LayeredChunkStore,
    registry: TileRegistry,
    entities: EntityManager,
    camera: Camera2D,
    notifier: N,
    player_id: Option<ActorId>,
    next_actor_id: u64,
    tick: u64,
    fixed_dt_seconds: f32,
}

impl GameWorld<NullNotifier> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_notifier(config, NullNotifier)
    }
}

impl<N: PeerNotifier> GameWorld<N> {
    pub fn with_notifier(config: &EngineConfig, notifier: N) -> Self {
        let scale = config.tile_scale();
        Self {
            scale,
            viewport: config.viewport(),
            view_bias: config.view_bias,
            collision: config.collision_params(),
            template: ActorTemplate {
                stats: ActorStats::default(),
                behavior: MobBehavior {
                    chase_radius_tiles: config.mob_chase_radius_tiles,
                    flee_hp_fraction: config.mob_flee_hp_fraction,
                    ..MobBehavior::default()
                },
            },
            chunks: LayeredChunkStore::default(),
            registry: TileRegistry::default(),
            entities: EntityManager::new(&scale, config.entity_chunk_size),
            camera: Camera2D::default(),
            notifier,
            player_id: None,
            next_actor_id: 1,
            tick: 0,
            fixed_dt_seconds: config.fixed_dt_seconds(),
        }
    }

    pub fn scale(&self) -> &TileScale {
        &self.scale
    }

    pub fn chunks(&self) -> &LayeredChunkStore {
        &self.chunks
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn player_id(&self) -> Option<ActorId> {
        self.player_id
    }

    pub fn player(&self) -> Option<&Player> {
        self.player_id.and_then(|id| self.entities.player(id))
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Replaces the loaded map. A rejected world leaves the previous map in
    /// place.
    pub fn load_world(&mut self, world: &WorldData) -> Result<LoadSummary, WorldLoadError> {
        let mut chunks = LayeredChunkStore::default();
        let summary = populate_store(&mut chunks, world)?;
        self.chunks = chunks;
        info!(
            layers = summary.layers_loaded,
            skipped = summary.layers_skipped,
            chunks = summary.chunks_loaded,
            "world_loaded"
        );
        Ok(summary)
    }

    /// Adds a tileset's descriptors. Later tilesets win on overlapping ids.
    pub fn load_tileset(&mut self, tileset: Tileset) -> usize {
        let count = tileset.tiles.len();
        for descriptor in tileset.tiles {
            if let Some(previous) = self.registry.insert(descriptor) {
                debug!(tile_id = previous.id, "tile_descriptor_replaced");
            }
        }
        info!(
            tileset = %tileset.name,
            first_gid = tileset.first_gid,
            tiles = count,
            "tileset_loaded"
        );
        count
    }

    pub fn registry_mut(&mut self) -> &mut TileRegistry {
        &mut self.registry
    }

    /// Changes zoom, keeping every entity on the same tile.
    pub fn set_zoom(&mut self, zoom: f32) {
        let previous = self.scale;
        self.scale.set_zoom_clamped(zoom);
        if self.scale == previous {
            return;
        }
        self.entities.rescale(&previous, &self.scale);
        let factor = self.scale.scaled_tile_size() / previous.scaled_tile_size();
        self.camera.position = self.camera.position.scaled(factor);
        info!(zoom = self.scale.zoom(), "zoom_changed");
    }

    /// Tile-space point the view is centered on: the player, or the camera.
    pub fn focus(&self) -> Vec2 {
        match self.player() {
            Some(player) => player.actor.tile_position(&self.scale),
            None => world_to_tile_pos(self.camera.position, &self.scale),
        }
    }

    pub fn view_window(&self, layer: Layer) -> ScreenWindow {
        let request =
            WindowRequest::for_viewport(self.focus(), self.viewport, &self.scale, self.view_bias);
        extract_window(&self.chunks, layer, &request)
    }

    pub fn update_window(&self, layer: Layer) -> ScreenWindow {
        let request =
            WindowRequest::update_window(self.focus(), self.viewport, &self.scale, self.view_bias);
        extract_window(&self.chunks, layer, &request)
    }

    fn allocate_actor_id(&mut self) -> ActorId {
        while self.entities.mob(ActorId(self.next_actor_id)).is_some()
            || self.entities.player(ActorId(self.next_actor_id)).is_some()
        {
            self.next_actor_id += 1;
        }
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        id
    }

    /// Spawns the local player at a tile position and centers the camera on it.
    pub fn spawn_player(
        &mut self,
        name: impl Into<String>,
        tile: Vec2,
        stats: ActorStats,
    ) -> Result<ActorId, RealmError> {
        let id = self.allocate_actor_id();
        let position = tile_pos_to_world(tile, &self.scale);
        self.entities
            .add_player(Player::new(Actor::new(id, name, position, stats)))?;
        self.player_id = Some(id);
        self.camera.position = position;
        info!(player_id = id.0, x = tile.x, y = tile.y, "player_spawned");
        Ok(id)
    }

    pub fn spawn_mob(
        &mut self,
        name: impl Into<String>,
        tile: Vec2,
        stats: ActorStats,
    ) -> Result<ActorId, RealmError> {
        let id = self.allocate_actor_id();
        let position = tile_pos_to_world(tile, &self.scale);
        self.entities.add_mob(Mob::new(
            Actor::new(id, name, position, stats),
            self.template.behavior,
        ))?;
        debug!(mob_id = id.0, x = tile.x, y = tile.y, "mob_spawned");
        Ok(id)
    }

    /// Drops a stack on the ground. Returns the stack's index id.
    pub fn drop_item(
        &mut self,
        item_id: ItemId,
        units: impl IntoIterator<Item = UnitId>,
        tile: Vec2,
    ) -> Result<UnitId, RealmError> {
        let stack = ItemStack::new(item_id, units, tile_pos_to_world(tile, &self.scale))?;
        let id = stack.stack_id();
        self.entities.add_item(stack)?;
        Ok(id)
    }

    /// Takes `count` units off a ground stack. Taking all of them removes the
    /// stack from the world.
    pub fn pick_up(&mut self, stack_id: UnitId, count: usize) -> Result<ItemStack, RealmError> {
        let Some(stack) = self.entities.item(stack_id) else {
            return Err(RealmError::UnknownItem { id: stack_id });
        };
        if count >= stack.amount() {
            return self
                .entities
                .remove_item(stack_id)
                .ok_or(RealmError::UnknownItem { id: stack_id });
        }
        self.entities
            .update_item_with(stack_id, |stack| stack.split_off(count))
            .ok_or(RealmError::UnknownItem { id: stack_id })?
            .map_err(RealmError::from)
    }

    pub fn set_player_intent(&mut self, intent: MoveIntent) {
        if let Some(id) = self.player_id {
            self.entities
                .update_player_with(id, |player| player.actor.intent = intent);
        }
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let player = self.tick_player();
        let mobs_moved = self.tick_mobs();
        let dt = self.fixed_dt_seconds;
        if let Some(id) = self.player_id {
            self.entities
                .update_player_with(id, |player| player.skills.tick(dt));
        }
        TickReport {
            tick: self.tick,
            player,
            mobs_moved,
        }
    }

    /// Steps the player against the view window and moves the camera by the
    /// same displacement.
    pub fn tick_player(&mut self) -> Option<StepReport> {
        let id = self.player_id?;
        let window = self.view_window(Layer::Foreground);
        let registry = &self.registry;
        let scale = &self.scale;
        let collision = &self.collision;
        let report = self.entities.update_player_with(id, |player| {
            step_actor(&mut player.actor, &window, registry, scale, collision)
        })?;

        if report.displacement != Vec2::ZERO {
            self.camera.follow(report.displacement);
            self.notify_moved(EntityRef::Player(id));
        }
        Some(report)
    }

    /// Runs behavior selection and movement for every mob, in id order. Each
    /// mob collides against its own small window.
    pub fn tick_mobs(&mut self) -> usize {
        let player_tile = self
            .player()
            .filter(|player| player.actor.is_alive())
            .map(|player| player.actor.tile_position(&self.scale));

        let mut moved = 0;
        for id in self.entities.mobs().ids() {
            let Some(mob) = self.entities.mob(id) else {
                continue;
            };
            let mob_tile = mob.actor.tile_position(&self.scale);
            let distance = player_tile.map(|player| player.distance_sq(mob_tile).sqrt());
            let mode = mob.behavior.select(distance, mob.actor.hp_fraction());
            let intent = mob
                .behavior
                .intent_for(mode, id, mob_tile, player_tile, self.tick);
            let window = extract_window(
                &self.chunks,
                Layer::Foreground,
                &WindowRequest::around_actor(mob_tile, self.collision.check_radius),
            );

            let registry = &self.registry;
            let scale = &self.scale;
            let collision = &self.collision;
            let report = self.entities.update_mob_with(id, |mob| {
                mob.behavior.mode = mode;
                mob.actor.intent = intent;
                step_actor(&mut mob.actor, &window, registry, scale, collision)
            });
            if report.is_some_and(|report| report.displacement != Vec2::ZERO) {
                moved += 1;
                self.notify_moved(EntityRef::Mob(id));
            }
        }
        moved
    }

    fn notify_moved(&mut self, entity: EntityRef) {
        let Some(actor) = self.entities.resolve(entity) else {
            return;
        };
        let tile = actor.tile_position(&self.scale);
        let render_state = actor.render_state;
        self.notifier
            .entity_moved(entity, tile.x, tile.y, render_state);
    }

    pub fn apply_mob_delta(&mut self, delta: &EntityDelta) -> DeltaOutcome {
        self.entities.update_mob(delta, &self.scale, &self.template)
    }

    pub fn apply_player_delta(&mut self, delta: &EntityDelta) -> DeltaOutcome {
        self.entities
            .update_player(delta, &self.scale, &self.template)
    }

    pub fn deal_damage(
        &mut self,
        attacker: Option<EntityRef>,
        target: EntityRef,
        amount: f32,
    ) -> Option<DamageEvent> {
        combat::deal_damage(
            &mut self.entities,
            &mut self.notifier,
            attacker,
            target,
            amount,
        )
    }

    pub fn heal(&mut self, target: EntityRef, amount: f32) -> Option<DamageEvent> {
        combat::heal(&mut self.entities, &mut self.notifier, target, amount)
    }

    /// `range_tiles` is converted at the current zoom.
    pub fn select_target(&mut self, range_tiles: f32) -> Option<EntityRef> {
        let id = self.player_id?;
        combat::select_target(
            &mut self.entities,
            id,
            range_tiles * self.scale.scaled_tile_size(),
        )
    }
}
