mod coordinator;
mod performer;

pub use coordinator::{SceneCoordinator, TRANSITION_MS, View};
pub use performer::{DIALOG_LINE_MS, Performer, PerformerState, Phase, RECOVER_MS, STUMBLE_MS};
