//! E2E test for the world map plugin in a headless Bevy app.
//!
//! Loads are completed by hand through a shared [`ManualLoader`] handle, so
//! each test controls exactly which frame sees which completion.
//!
//! Run: cargo test -p bevy_world_map world_map_bevy_e2e

use std::sync::Arc;

use bevy::app::{TaskPoolOptions, TaskPoolPlugin};
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy_world_map::{
  ButtonAnchor, LevelButtonClicked, LevelId, LevelStartRequested, ManualLoader, MapControl,
  MapViewport, NotEnoughStars, OpenWorldMap, ProfileProgress, RetryDecision, RetryDecisionMade,
  RetryPromptRequested, SegmentPayload, StaticCatalog, WindowChanged, WorldMap, WorldMapConfig,
  WorldMapFailed, WorldMapPlugin, WorldMapReady,
};

const CATALOG: &str = r#"
[[segments]]
id = "meadow"
star_wall = 4
[[segments.levels]]
id = 1
[[segments.levels]]
id = 2

[[segments]]
id = "forest"
[[segments.levels]]
id = 3
[[segments.levels]]
id = 4

[[segments]]
id = "desert"
[[segments.levels]]
id = 5
[[segments.levels]]
id = 6
"#;

#[derive(Resource, Default)]
struct Seen {
  ready: Vec<LevelId>,
  failed: Vec<String>,
  prompts: Vec<RetryPromptRequested>,
  init_windows: usize,
  starts: Vec<LevelId>,
  walls: Vec<(LevelId, u32)>,
}

#[allow(clippy::too_many_arguments)]
fn collect(
  mut seen: ResMut<Seen>,
  mut ready: MessageReader<WorldMapReady>,
  mut failed: MessageReader<WorldMapFailed>,
  mut prompts: MessageReader<RetryPromptRequested>,
  mut windows: MessageReader<WindowChanged>,
  mut starts: MessageReader<LevelStartRequested>,
  mut walls: MessageReader<NotEnoughStars>,
) {
  seen.ready.extend(ready.read().map(|m| m.cursor));
  seen.failed.extend(failed.read().map(|m| m.reason.clone()));
  seen.prompts.extend(prompts.read().cloned());
  seen.init_windows += windows.read().filter(|m| m.is_init).count();
  seen.starts.extend(starts.read().map(|m| m.level));
  seen.walls.extend(walls.read().map(|m| (m.level, m.remaining)));
}

fn payload(levels: [u32; 2]) -> SegmentPayload {
  SegmentPayload {
    width: 1280.0,
    height: 720.0,
    leading_stub: 0.0,
    buttons: levels
      .iter()
      .enumerate()
      .map(|(i, level)| ButtonAnchor {
        level: LevelId(*level),
        x: 400.0 * (i as f32 + 1.0),
        y: 360.0,
      })
      .collect(),
  }
}

struct TestHarness {
  app: App,
  loader: ManualLoader,
}

impl TestHarness {
  fn new(progress: ProfileProgress) -> Self {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins.set(TaskPoolPlugin {
      task_pool_options: TaskPoolOptions::with_num_threads(4),
    }));
    app.add_plugins(WorldMapPlugin);
    app.init_resource::<Seen>();
    app.add_systems(PostUpdate, collect);

    let loader = ManualLoader::new();
    let config = WorldMapConfig {
      behind_count: 1,
      ahead_count: 1,
      ..WorldMapConfig::default()
    };
    let catalog = StaticCatalog::from_toml_str(CATALOG).unwrap();
    app.insert_resource(WorldMap::new(
      &config,
      Arc::new(catalog),
      Arc::new(progress),
      Box::new(loader.clone()),
    ));

    Self { app, loader }
  }

  fn open(&mut self, last_played: Option<LevelId>) {
    self.app.world_mut().write_message(OpenWorldMap { last_played });
    self.app.update();
  }

  fn run(&mut self, updates: usize) {
    for _ in 0..updates {
      self.app.update();
    }
  }

  fn send<M: Message>(&mut self, message: M) {
    self.app.world_mut().write_message(message);
    self.app.update();
  }

  fn seen(&self) -> &Seen {
    self.app.world().resource::<Seen>()
  }

  fn map(&self) -> &WorldMap {
    self.app.world().resource::<WorldMap>()
  }
}

#[test]
fn opens_on_first_level_and_starts_it() {
  let mut harness = TestHarness::new(ProfileProgress::new());
  harness.open(None);
  assert!(harness.map().is_initializing());
  assert_eq!(
    harness.loader.load_requests(),
    vec!["biome_map_meadow".to_string(), "biome_map_forest".to_string()]
  );

  harness.loader.complete("biome_map_meadow", payload([1, 2]));
  harness.loader.complete("biome_map_forest", payload([3, 4]));
  harness.run(3);

  assert_eq!(harness.seen().ready, vec![LevelId(1)]);
  assert_eq!(harness.seen().init_windows, 1);
  assert!(harness.map().is_running());

  // level 1 sits under the viewport center
  let position = harness.map().button_world_position(LevelId(1)).unwrap();
  assert!(position.x.abs() < 1e-3);

  harness.send(LevelButtonClicked { level: LevelId(1) });
  harness.send(LevelButtonClicked { level: LevelId(3) });
  assert_eq!(harness.seen().starts, vec![LevelId(1)]);
}

#[test]
fn star_wall_reports_missing_stars() {
  let progress = ProfileProgress::new().with_completed(LevelId(1), 3);
  let mut harness = TestHarness::new(progress);
  harness.open(None);
  harness.loader.complete("biome_map_meadow", payload([1, 2]));
  harness.loader.complete("biome_map_forest", payload([3, 4]));
  harness.run(3);
  assert_eq!(harness.seen().ready, vec![LevelId(2)]);

  harness.send(LevelButtonClicked { level: LevelId(2) });
  assert_eq!(harness.seen().walls, vec![(LevelId(2), 1)]);
  assert!(harness.seen().starts.is_empty());
}

#[test]
fn init_failure_prompts_and_abort_fails_the_map() {
  let mut harness = TestHarness::new(ProfileProgress::new());
  harness.open(Some(LevelId(3)));
  harness.loader.complete("biome_map_meadow", payload([1, 2]));
  harness.loader.complete("biome_map_forest", payload([3, 4]));
  assert!(harness.loader.fail("biome_map_desert", "offline"));
  harness.run(3);

  let prompts = &harness.seen().prompts;
  assert_eq!(prompts.len(), 1);
  assert!(prompts[0].blocking);
  assert_eq!(prompts[0].message, "Failed to load map fragment desert");

  harness.send(RetryDecisionMade(RetryDecision::Abort));
  assert_eq!(harness.seen().failed.len(), 1);
  assert!(harness.map().is_failed());
  assert!(harness.seen().ready.is_empty());
}

#[test]
fn init_retry_recovers() {
  let mut harness = TestHarness::new(ProfileProgress::new());
  harness.open(Some(LevelId(3)));
  harness.loader.complete("biome_map_meadow", payload([1, 2]));
  harness.loader.complete("biome_map_forest", payload([3, 4]));
  harness.loader.fail("biome_map_desert", "offline");
  harness.run(3);

  harness.loader.clear_history();
  harness.send(RetryDecisionMade(RetryDecision::Retry));
  assert_eq!(harness.loader.load_requests(), vec!["biome_map_desert".to_string()]);

  harness.loader.complete("biome_map_desert", payload([5, 6]));
  harness.run(3);
  assert_eq!(harness.seen().ready, vec![LevelId(3)]);
}

#[test]
fn dragging_and_pause_hold_back_splices() {
  let mut harness = TestHarness::new(ProfileProgress::new());
  harness.open(None);
  harness.loader.complete("biome_map_meadow", payload([1, 2]));
  harness.loader.complete("biome_map_forest", payload([3, 4]));

  harness.app.world_mut().resource_mut::<MapViewport>().0.dragging = true;
  harness.run(5);
  assert!(harness.seen().ready.is_empty());

  harness.app.world_mut().resource_mut::<MapViewport>().0.dragging = false;
  harness.app.world_mut().resource_mut::<MapControl>().pause();
  harness.run(5);
  assert!(harness.seen().ready.is_empty());

  harness.app.world_mut().resource_mut::<MapControl>().resume();
  harness.run(2);
  assert_eq!(harness.seen().ready, vec![LevelId(1)]);
}

#[test]
fn unknown_last_played_falls_back_to_cursor() {
  let progress = ProfileProgress::new()
    .with_completed(LevelId(1), 3)
    .with_completed(LevelId(2), 3);
  let mut harness = TestHarness::new(progress);
  harness.open(Some(LevelId(42)));
  assert_eq!(harness.loader.load_requests()[0], "biome_map_forest");
}
