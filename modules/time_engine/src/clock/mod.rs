//! Client-side balance display.
//!
//! The server is authoritative; this module only extrapolates the last
//! confirmed balance between syncs and never writes anything back.

mod driver;
mod notify;
mod predictor;

pub use driver::{BalanceSource, ClockDriver, LocalBalanceSource};
pub use notify::{BusFull, Notice, NoticeVariant, NotificationBus, Subscription};
pub use predictor::{predict, ClockState, OptimisticClock, ServerSnapshot};

/// Render hours as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "00:00:00".to_string();
    }
    let total = (hours * 3600.0).floor() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
