//! Shared constants used across rusty-drive crates.

use std::time::Duration;

/// Number of bytes sent or received in each chunk of a resumable transfer (2MB).
///
/// The Drive API requires chunk sizes to be multiples of 256KB.
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Granularity the Drive API imposes on resumable upload chunks (256KB).
pub const CHUNK_ALIGNMENT: u64 = 256 * 1024;

/// Consecutive non-progressing chunk attempts tolerated before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Unit of the exponential backoff: the Nth retry sleeps up to `2^N` units.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Attempts made by the fixed-delay retry used for spreadsheet reads.
pub const DEFAULT_FIXED_RETRY_ATTEMPTS: u32 = 3;

/// Delay between two attempts of the fixed-delay retry.
pub const DEFAULT_FIXED_RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP statuses the spreadsheet API is known to return spuriously.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 2] = [500, 503];

/// Rows requested per spreadsheet range read.
pub const DEFAULT_SHEET_BATCH_SIZE: u32 = 400;

/// Pause between two spreadsheet range reads, to stay under the API quota.
pub const DEFAULT_SHEET_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Default page size for file listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Environment variable pointing at the credentials file.
pub const ENV_CREDENTIALS_PATH: &str = "GOOGLE_APPLICATION_CREDENTIALS";
