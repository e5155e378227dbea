// Time & ID Provider Ports (swappable for deterministic tests)

/// Time provider interface
pub trait TimeProvider: Send + Sync {
    /// Current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Job ID provider interface
pub trait IdProvider: Send + Sync {
    fn generate_id(&self) -> String;
}

/// UUID v4 ids (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

    /// Clock that advances one millisecond per reading
    pub struct SteppingTimeProvider {
        now: AtomicI64,
    }

    impl SteppingTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
            }
        }
    }

    impl TimeProvider for SteppingTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(1, Ordering::SeqCst)
        }
    }

    /// Ids of the form `job-1`, `job-2`, ...
    #[derive(Default)]
    pub struct SequentialIdProvider {
        next: AtomicU64,
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            format!("job-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }
}
