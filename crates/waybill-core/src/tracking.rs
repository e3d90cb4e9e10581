//! Tracking-number generation.
//!
//! Format: `SHP` + UTC `yyyyMMddHHmmss` + a random four-digit suffix. Two
//! shipments created in the same second can collide; the store's unique
//! constraint is the real guard and the engine retries on conflict.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};

pub const PREFIX: &str = "SHP";

/// Produces candidate tracking numbers.
pub trait TrackingNumberSource: Send + Sync + 'static {
  fn generate(&self, now: DateTime<Utc>) -> String;
}

impl<F> TrackingNumberSource for F
where
  F: Fn(DateTime<Utc>) -> String + Send + Sync + 'static,
{
  fn generate(&self, now: DateTime<Utc>) -> String { self(now) }
}

/// The default source, backed by the OS random number generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTrackingNumbers;

impl TrackingNumberSource for RandomTrackingNumbers {
  fn generate(&self, now: DateTime<Utc>) -> String {
    format_tracking_number(now, OsRng.next_u32())
  }
}

/// Build a tracking number from a timestamp and a raw random draw.
pub fn format_tracking_number(now: DateTime<Utc>, draw: u32) -> String {
  let suffix = 1000 + draw % 9000;
  format!("{PREFIX}{}{suffix}", now.format("%Y%m%d%H%M%S"))
}
