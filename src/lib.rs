pub mod apps;
pub mod composition;
pub mod config;
pub mod drone;
pub mod error;
pub mod frame;
pub mod midi;
pub mod playback;
pub mod scheduler;
pub mod serial;
pub mod tonerow;
pub mod web;

pub use composition::Composition;
pub use config::Config;
pub use drone::Drone;
pub use error::{DeviceFault, Error, FaultKind};
pub use playback::Player;
pub use scheduler::{Scheduler, Task};
pub use tonerow::ToneRow;
