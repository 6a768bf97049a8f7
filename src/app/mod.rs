// Application layer - Session, playback and export coordination

pub mod container;
pub mod job_orchestrator;
pub mod playback_controller;
pub mod session_loader;
pub mod view_coordinator;
pub mod workspace;

pub use container::{AppContainer, DefaultAppContainer};
pub use job_orchestrator::JobOrchestrator;
pub use playback_controller::{PlaybackController, TimeUpdate};
pub use session_loader::SessionLoader;
pub use view_coordinator::ViewCoordinator;
pub use workspace::Workspace;
