//! Core engine: hook ownership, key-down dispatch and lifecycle control

mod controller;
mod dispatcher;
mod input_hook;
mod state;

pub use controller::{EngineLifecycleController, EngineNotice, EngineSnapshot};
pub use dispatcher::{DispatchOutcome, PlaybackDispatcher};
pub use input_hook::GlobalInputHook;
pub use state::{ActiveFile, EngineState};
