// Sweep constants (No magic values)

/// Default interval between scheduled sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Run the first scheduled sweep immediately on start
pub const DEFAULT_SWEEP_ON_START: bool = true;
