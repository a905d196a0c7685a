pub mod rate_limit;
pub mod scheduler;
pub mod shutdown;
pub mod types;
pub mod validations;

pub use rate_limit::RateLimiter;
pub use scheduler::{Scheduler, TimerCallback, TimerHandle, TokioScheduler};
pub use shutdown::{listen_for_shutdown_signals, ShutdownNotified, ShutdownSignal};
pub use types::*;
pub use validations::*;
