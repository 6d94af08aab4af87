// Application layer - Use case interactors and session wiring

pub mod container;
pub mod session;
pub mod trim_interactor;

// Re-export application types
pub use container::AppContainer;
pub use session::TrimSession;
pub use trim_interactor::{RunReport, TrimInteractor};
