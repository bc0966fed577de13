// Application Layer - Use Cases

pub mod constants;
pub mod scanner;
pub mod schedule;
pub mod sweeper;

// Re-exports
pub use scanner::InstanceScanner;
pub use schedule::{shutdown_channel, ShutdownSender, ShutdownToken, SweepConfig, SweepScheduler};
pub use sweeper::RemediationSweeper;
