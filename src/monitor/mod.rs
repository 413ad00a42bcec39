//! Real-time protection: periodic sweeps of watched directories.

pub mod realtime;
pub mod watch_state;

pub use realtime::{default_watched_dirs, Clock, RealTimeMonitor, SystemClock, ThreatEvent};
pub use watch_state::WatchState;
