use std::path::PathBuf;

use realm_core::{
    load_tileset_file, load_world_file, ConfigError, EngineConfig, GameWorld, RealmError,
    RecordingNotifier,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::cli::{parse_args, usage_text, Command, SimArgs};
use super::demo;
use super::loop_runner::{SLASH_COOLDOWN_SECONDS, SLASH_SKILL};

const DEFAULT_FIRST_GID: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Realm(#[from] RealmError),
}

impl From<ConfigError> for BootstrapError {
    fn from(error: ConfigError) -> Self {
        BootstrapError::Realm(error.into())
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: EngineConfig,
    pub(crate) world: GameWorld<RecordingNotifier>,
    pub(crate) report_path: Option<PathBuf>,
}

/// `Ok(None)` means the invocation only asked for help.
pub(crate) fn build_app(args: &[String]) -> Result<Option<AppWiring>, BootstrapError> {
    let args = match parse_args(args).map_err(BootstrapError::Usage)? {
        Command::Help => {
            println!("{}", usage_text());
            return Ok(None);
        }
        Command::Run(args) => args,
    };

    init_tracing();
    info!("=== realm sim startup ===");

    let config = load_config(&args, |var| std::env::var(var).ok())?;
    info!(
        zoom = config.zoom,
        ticks = config.ticks,
        target_tps = config.target_tps,
        "config_loaded"
    );
    let world = build_world(&args, &config)?;

    Ok(Some(AppWiring {
        config,
        world,
        report_path: args.report,
    }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// File, then `REALM_*` environment, then command line.
pub(crate) fn load_config<F>(args: &SimArgs, env_lookup: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides(env_lookup)?;
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    config.validate()?;
    Ok(config)
}

pub(crate) fn build_world(
    args: &SimArgs,
    config: &EngineConfig,
) -> Result<GameWorld<RecordingNotifier>, RealmError> {
    let mut world = GameWorld::with_notifier(config, RecordingNotifier::default());

    match &args.tileset {
        Some(path) => {
            let tileset = load_tileset_file(path, args.first_gid.unwrap_or(DEFAULT_FIRST_GID))?;
            world.load_tileset(tileset);
        }
        None => {
            for descriptor in demo::tile_descriptors() {
                world.registry_mut().insert(descriptor);
            }
        }
    }

    let data = match &args.world {
        Some(path) => load_world_file(path)?,
        None => {
            info!("no world file given, using demo world");
            demo::world_data()
        }
    };
    world.load_world(&data)?;

    let spawn = demo::player_spawn();
    let player_id = world.spawn_player(spawn.name, spawn.tile, spawn.stats)?;
    world
        .entities_mut()
        .update_player_with(player_id, |player| {
            player.skills.learn(SLASH_SKILL, SLASH_COOLDOWN_SECONDS)
        });
    for spawn in demo::mob_spawns() {
        world.spawn_mob(spawn.name, spawn.tile, spawn.stats)?;
    }
    info!(
        mobs = world.entities().mobs().len(),
        tiles = world.registry().len(),
        "world_ready"
    );
    Ok(world)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn cli_ticks_override_env_and_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("realm.json");
        fs::write(&path, r#"{"ticks": 5, "zoom": 2.0}"#).expect("write");
        let args = SimArgs {
            config: Some(path),
            ticks: Some(9),
            ..SimArgs::default()
        };
        let config = load_config(&args, |var| {
            (var == "REALM_TICKS" || var == "REALM_ZOOM").then(|| {
                if var == "REALM_TICKS" { "7" } else { "1.5" }.to_string()
            })
        })
        .expect("config");
        assert_eq!(config.ticks, 9);
        assert_eq!(config.zoom, 1.5);
    }

    #[test]
    fn demo_world_is_populated() {
        let world =
            build_world(&SimArgs::default(), &EngineConfig::default()).expect("demo world");
        assert_eq!(world.chunks().chunk_count(), 12);
        assert_eq!(world.entities().mobs().len(), 4);
        let player = world.player().expect("player");
        assert!(player.skills.knows(SLASH_SKILL));
    }

    #[test]
    fn missing_world_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = SimArgs {
            world: Some(dir.path().join("nope.json")),
            ..SimArgs::default()
        };
        assert!(matches!(
            build_world(&args, &EngineConfig::default()),
            Err(RealmError::WorldLoad(_))
        ));
    }
}
