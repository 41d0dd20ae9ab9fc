use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::actor::{Actor, ActorId, ActorState, RenderState};
use crate::coords::Vec2;
use crate::entities::{EntityManager, EntityRef};
use crate::net::{DamageEvent, PeerNotifier};

/// Every hit lands for at least this much.
pub const MIN_DAMAGE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkillError {
    #[error("unknown skill '{name}'")]
    Unknown { name: String },
    #[error("skill '{name}' is on cooldown for another {remaining:.2}s")]
    OnCooldown { name: String, remaining: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SkillSlot {
    cooldown_seconds: f32,
    remaining_seconds: f32,
}

/// Per-skill cooldowns, advanced by [`SkillBook::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillBook {
    slots: BTreeMap<String, SkillSlot>,
}

impl SkillBook {
    /// Registers or replaces a skill; it starts ready.
    pub fn learn(&mut self, name: impl Into<String>, cooldown_seconds: f32) {
        self.slots.insert(
            name.into(),
            SkillSlot {
                cooldown_seconds: cooldown_seconds.max(0.0),
                remaining_seconds: 0.0,
            },
        );
    }

    pub fn knows(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn remaining(&self, name: &str) -> Option<f32> {
        self.slots.get(name).map(|slot| slot.remaining_seconds)
    }

    pub fn try_use(&mut self, name: &str) -> Result<(), SkillError> {
        let slot = self.slots.get_mut(name).ok_or_else(|| SkillError::Unknown {
            name: name.to_string(),
        })?;
        if slot.remaining_seconds > 0.0 {
            return Err(SkillError::OnCooldown {
                name: name.to_string(),
                remaining: slot.remaining_seconds,
            });
        }
        slot.remaining_seconds = slot.cooldown_seconds;
        Ok(())
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        for slot in self.slots.values_mut() {
            slot.remaining_seconds = (slot.remaining_seconds - dt_seconds).max(0.0);
        }
    }
}

/// Applies `max(amount - defense, MIN_DAMAGE)` to `target`.
///
/// A mob brought to 0 HP leaves the index, which also clears every target
/// pointing at it. A player at 0 HP stays indexed as `Defeated`. Returns `None`
/// when the target no longer exists or is already down.
pub fn deal_damage<N: PeerNotifier>(
    entities: &mut EntityManager,
    notifier: &mut N,
    attacker: Option<EntityRef>,
    target: EntityRef,
    amount: f32,
) -> Option<DamageEvent> {
    let apply = |actor: &mut Actor| {
        if !actor.is_alive() {
            return None;
        }
        let dealt = (amount - actor.stats.defense).max(MIN_DAMAGE);
        actor.hp = (actor.hp - dealt).max(0.0);
        if actor.hp <= 0.0 {
            actor.state = ActorState::Defeated;
            actor.render_state = RenderState::Dead;
        }
        Some((dealt, actor.hp))
    };

    let (dealt, remaining_hp) = match target {
        EntityRef::Mob(id) => entities.update_mob_with(id, |mob| apply(&mut mob.actor))??,
        EntityRef::Player(id) => {
            entities.update_player_with(id, |player| apply(&mut player.actor))??
        }
    };

    let event = DamageEvent {
        attacker,
        target,
        amount: dealt,
        remaining_hp,
    };
    debug!(entity = ?target, amount = dealt, remaining_hp, "damage_dealt");
    notifier.damage_dealt(event);

    if remaining_hp <= 0.0 {
        match target {
            EntityRef::Mob(id) => {
                entities.remove_mob(id);
                info!(mob_id = id.0, "mob_defeated");
            }
            EntityRef::Player(id) => info!(player_id = id.0, "player_defeated"),
        }
    }
    Some(event)
}

/// Restores up to `amount` HP without exceeding max HP. Defeated actors stay
/// down.
pub fn heal<N: PeerNotifier>(
    entities: &mut EntityManager,
    notifier: &mut N,
    target: EntityRef,
    amount: f32,
) -> Option<DamageEvent> {
    let apply = |actor: &mut Actor| {
        if !actor.is_alive() {
            return None;
        }
        let before = actor.hp;
        actor.hp = (actor.hp + amount.max(0.0)).min(actor.stats.max_hp);
        Some((actor.hp - before, actor.hp))
    };
    let (restored, remaining_hp) = match target {
        EntityRef::Mob(id) => entities.update_mob_with(id, |mob| apply(&mut mob.actor))??,
        EntityRef::Player(id) => {
            entities.update_player_with(id, |player| apply(&mut player.actor))??
        }
    };

    let event = DamageEvent {
        attacker: None,
        target,
        amount: -restored,
        remaining_hp,
    };
    notifier.damage_dealt(event);
    Some(event)
}

/// Picks the nearest live mob within `range_px` of the player and stores it as
/// the player's target.
pub fn select_target(
    entities: &mut EntityManager,
    player_id: ActorId,
    range_px: f32,
) -> Option<EntityRef> {
    let origin = entities.player(player_id)?.actor.position;
    let range_sq = range_px * range_px;
    let nearest = entities
        .find_mobs_near(origin, Vec2::new(range_px, range_px))
        .into_iter()
        .filter(|mob| mob.actor.is_alive())
        .map(|mob| (mob.actor.id, mob.actor.position.distance_sq(origin)))
        .filter(|(_, distance_sq)| *distance_sq <= range_sq)
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(id, _)| EntityRef::Mob(id));

    entities.update_player_with(player_id, |player| player.actor.target = nearest);
    nearest
}
