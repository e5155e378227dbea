// Fetch loop constants (no magic values)
use std::time::Duration;

/// Sleep after an empty poll before the next cycle (100ms)
///
/// The poller already waited for the poll timeout, so this only keeps an
/// empty catalog from spinning.
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep after a failed fetch cycle before retrying (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Sleep after a configuration error (bad registry data) before retrying (10s)
pub const CONFIG_ERROR_SLEEP_DURATION: Duration = Duration::from_secs(10);
