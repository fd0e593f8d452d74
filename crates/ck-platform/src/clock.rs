use ck_core::ports::ClockPort;

/// Wall clock in milliseconds since the Unix epoch.
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
