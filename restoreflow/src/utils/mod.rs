//! Utility functions.

pub mod timestamps;

pub use timestamps::{elapsed_ms, now_utc, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_is_monotonic_enough() {
        let first = now_utc();
        let second = now_utc();
        assert!(second >= first);
    }
}
