pub mod timer;

pub use timer::{lateness, HighPrecisionTimer, SimulatedTimer, Timer, TimingError, DEFAULT_MAX_WAIT};
