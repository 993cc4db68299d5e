// Simulated game loop and scene resources driving the two primitives

pub mod journal;
pub mod path_demo;
pub mod resources;
pub mod scene_demo;

pub use journal::{Journal, JournalEntry};
pub use path_demo::{run_path_demo, PathDemoReport, PathPlan, PathPlanner};
pub use resources::{SceneTimings, SimulatedCurtain, SimulatedScene};
pub use scene_demo::{run_scene_demo, SceneDemoReport};
