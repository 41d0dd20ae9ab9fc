use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use realm_core::{ActorState, GameWorld, PeerEvent, RecordingNotifier, RenderState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ActorSummary {
    pub(crate) id: u64,
    pub(crate) name: String,
    /// Tiles.
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) hp: f32,
    pub(crate) defeated: bool,
    pub(crate) render_state: RenderState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SimReport {
    pub(crate) ticks: u64,
    pub(crate) simulated_seconds: f32,
    pub(crate) zoom: f32,
    pub(crate) chunk_count: usize,
    pub(crate) player: Option<ActorSummary>,
    pub(crate) mobs_remaining: usize,
    pub(crate) mobs_defeated: usize,
    pub(crate) move_events: usize,
    pub(crate) damage_events: usize,
    pub(crate) items_on_ground: usize,
}

impl SimReport {
    pub(crate) fn from_world(
        world: &GameWorld<RecordingNotifier>,
        fixed_dt_seconds: f32,
        mobs_defeated: usize,
    ) -> Self {
        let scale = world.scale();
        let player = world.player().map(|player| {
            let tile = player.actor.tile_position(scale);
            ActorSummary {
                id: player.actor.id.0,
                name: player.actor.name.clone(),
                x: tile.x,
                y: tile.y,
                hp: player.actor.hp,
                defeated: player.actor.state == ActorState::Defeated,
                render_state: player.actor.render_state,
            }
        });
        let events = world.notifier().events();
        Self {
            ticks: world.tick_count(),
            simulated_seconds: world.tick_count() as f32 * fixed_dt_seconds,
            zoom: scale.zoom(),
            chunk_count: world.chunks().chunk_count(),
            player,
            mobs_remaining: world.entities().mobs().len(),
            mobs_defeated,
            move_events: events
                .iter()
                .filter(|event| matches!(event, PeerEvent::EntityMoved { .. }))
                .count(),
            damage_events: world.notifier().damage_events().count(),
            items_on_ground: world.entities().items().len(),
        }
    }
}

pub(crate) fn write_report(path: &Path, report: &SimReport) -> io::Result<()> {
    let text = serde_json::to_string_pretty(report)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    write_text_atomic(path, &text)
}

/// Stages the text next to `path` and renames it into place, so a reader sees
/// either the previous report or the complete new one.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    fs::write(&staging, text.as_bytes())?;
    fs::rename(&staging, path).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("report.json"));
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parent_and_replaces_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("report.json");
        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        assert!(!dir.path().join("nested").join("report.json.partial").exists());
    }

    #[test]
    fn report_serializes_render_state_lowercase() {
        let report = SimReport {
            ticks: 3,
            simulated_seconds: 0.05,
            zoom: 1.0,
            chunk_count: 12,
            player: Some(ActorSummary {
                id: 1,
                name: "hero".to_string(),
                x: 1.5,
                y: 2.5,
                hp: 100.0,
                defeated: false,
                render_state: RenderState::Walk,
            }),
            mobs_remaining: 2,
            mobs_defeated: 1,
            move_events: 4,
            damage_events: 1,
            items_on_ground: 0,
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        write_report(&path, &report).expect("write");
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["player"]["render_state"], "walk");
        assert_eq!(value["mobs_defeated"], 1);
    }
}
