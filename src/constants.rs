//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Meterer.
//!
//! All magic numbers used by the period, ledger and storage layers live here.

// ============================================================================
// Time Conversion Constants
// ============================================================================

/// Seconds per hour.
pub const SECONDS_PER_HOUR: u64 = 3600;

/// Seconds per day.
pub const SECONDS_PER_DAY: u64 = 86400;

/// Seconds per week.
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Longest calendar month (31 days).
///
/// Month counters use the longest month so a counter created on the first
/// second of any month outlives it.
pub const SECONDS_PER_LONGEST_MONTH: u64 = 31 * SECONDS_PER_DAY;

/// Longest calendar year (366 days).
pub const SECONDS_PER_LONGEST_YEAR: u64 = 366 * SECONDS_PER_DAY;

// ============================================================================
// Ledger Constants
// ============================================================================

/// Default grace margin added to every counter TTL (1 hour).
///
/// A counter created at the very start of its period survives the whole period
/// plus this margin before the counter store drops it.
pub const DEFAULT_TTL_GRACE_SECS: u64 = 3600;

/// Default namespace for counter keys.
pub const DEFAULT_KEY_PREFIX: &str = "meterer";

/// Separator between counter key components.
pub const KEY_SEPARATOR: char = ':';

// ============================================================================
// Validation Constants
// ============================================================================

/// Maximum length of a single counter key component.
///
/// S3 bucket names are at most 63 characters; the extra room covers
/// S3-compatible stores with looser naming rules.
pub const MAX_KEY_COMPONENT_LENGTH: usize = 255;

/// Maximum length of a full counter key.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Resource identifier scheme accepted by the resource locator.
pub const RESOURCE_SCHEME: &str = "s3";
