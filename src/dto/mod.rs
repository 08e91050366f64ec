use time::OffsetDateTime;

pub mod admin;
pub mod health;
pub mod player;
pub mod validation;
pub mod ws;

/// Convert a wall-clock timestamp into the unix-milliseconds form the
/// browser clients expect.
pub(crate) fn unix_millis(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000_000) as i64
}
