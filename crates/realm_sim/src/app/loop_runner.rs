use std::process::ExitCode;

use realm_core::{EntityRef, GameWorld, ItemId, MoveIntent, PeerNotifier, UnitId, Vec2};
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::report::{write_report, SimReport};

pub(crate) const SLASH_SKILL: &str = "slash";
pub(crate) const SLASH_COOLDOWN_SECONDS: f32 = 0.5;
const ATTACK_RANGE_TILES: f32 = 1.5;
const MOB_CONTACT_RANGE_TILES: f32 = 1.0;
const MOB_CONTACT_INTERVAL_TICKS: u64 = 30;
const PATROL_LEG_TICKS: u64 = 45;
const LOOT_ITEM: ItemId = ItemId(1);

const PATROL: [MoveIntent; 8] = [
    MoveIntent {
        right: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        right: true,
        down: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        down: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        left: true,
        down: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        left: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        left: true,
        up: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        up: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        right: true,
        up: true,
        ..MoveIntent::NONE
    },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u64,
    pub(crate) player_hits: usize,
    pub(crate) mobs_defeated: usize,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut world,
        report_path,
    } = app;

    let summary = simulate(&mut world, config.ticks, config.target_tps);
    info!(
        ticks = summary.ticks,
        player_hits = summary.player_hits,
        mobs_defeated = summary.mobs_defeated,
        mobs_remaining = world.entities().mobs().len(),
        "sim_finished"
    );

    if let Some(path) = report_path {
        let report = SimReport::from_world(&world, config.fixed_dt_seconds(), summary.mobs_defeated);
        if let Err(err) = write_report(&path, &report) {
            error!(error = %err, path = %path.display(), "report_write_failed");
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "report_written");
    }

    ExitCode::SUCCESS
}

/// Fixed-timestep loop: one `GameWorld::tick` per step, `1 / target_tps`
/// simulated seconds each. Runs as fast as the host allows.
pub(crate) fn simulate<N: PeerNotifier>(
    world: &mut GameWorld<N>,
    ticks: u64,
    target_tps: u32,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut next_loot_unit = 1u64;
    let progress_interval = u64::from(target_tps.max(1));

    for _ in 0..ticks {
        world.set_player_intent(patrol_intent(world.tick_count()));
        let report = world.tick();

        if let Some(defeated_at) = player_attack(world, &mut summary) {
            let unit = UnitId(next_loot_unit);
            next_loot_unit += 1;
            match world.drop_item(LOOT_ITEM, [unit], defeated_at) {
                Ok(_) => debug!(unit = unit.0, "loot_dropped"),
                Err(err) => error!(error = %err, "loot_drop_failed"),
            }
        }
        if report.tick % MOB_CONTACT_INTERVAL_TICKS == 0 {
            mob_contact_damage(world);
        }

        if report.tick % progress_interval == 0 {
            let player = world.player().map(|player| player.actor.tile_position(world.scale()));
            info!(
                tick = report.tick,
                mobs_moved = report.mobs_moved,
                player_x = player.map(|tile| tile.x),
                player_y = player.map(|tile| tile.y),
                "sim_progress"
            );
        }
        summary.ticks = report.tick;
    }

    summary
}

fn patrol_intent(tick: u64) -> MoveIntent {
    let leg = (tick / PATROL_LEG_TICKS) % PATROL.len() as u64;
    PATROL[leg as usize]
}

/// Player swings at the nearest mob in reach when the skill is ready. Returns
/// the tile where a mob went down.
fn player_attack<N: PeerNotifier>(
    world: &mut GameWorld<N>,
    summary: &mut RunSummary,
) -> Option<Vec2> {
    let player = world.player()?;
    if !player.actor.is_alive() {
        return None;
    }
    let player_id = player.actor.id;
    let damage = player.actor.stats.damage;
    let target = world.select_target(ATTACK_RANGE_TILES)?;
    let target_tile = world.entities().resolve(target)?.tile_position(world.scale());

    let ready = world
        .entities_mut()
        .update_player_with(player_id, |player| player.skills.try_use(SLASH_SKILL));
    if !matches!(ready, Some(Ok(()))) {
        return None;
    }

    let event = world.deal_damage(Some(EntityRef::Player(player_id)), target, damage)?;
    summary.player_hits += 1;
    if event.remaining_hp <= 0.0 {
        summary.mobs_defeated += 1;
        return Some(target_tile);
    }
    None
}

fn mob_contact_damage<N: PeerNotifier>(world: &mut GameWorld<N>) {
    let Some(player) = world.player() else {
        return;
    };
    if !player.actor.is_alive() {
        return;
    }
    let player_ref = EntityRef::Player(player.actor.id);
    let origin = player.actor.position;
    let reach_px = MOB_CONTACT_RANGE_TILES * world.scale().scaled_tile_size();
    let attackers = world
        .entities()
        .find_mobs_near(origin, Vec2::new(reach_px, reach_px))
        .into_iter()
        .filter(|mob| mob.actor.is_alive())
        .filter(|mob| mob.actor.position.distance_sq(origin) <= reach_px * reach_px)
        .map(|mob| (mob.actor.id, mob.actor.stats.damage))
        .collect::<Vec<_>>();

    for (mob_id, damage) in attackers {
        world.deal_damage(Some(EntityRef::Mob(mob_id)), player_ref, damage);
    }
}
