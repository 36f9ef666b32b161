//! Whole-batch preconditions, checked once before any job starts.

use crate::config::LimitsConfig;
use crate::error::UploadError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reject a batch that has too many files or too many bytes in total.
///
/// `sizes` holds the byte length of every submitted file. The count check
/// runs first, so an oversized batch with too many files reports the count.
pub fn validate_upload_constraints(sizes: &[u64], limits: &LimitsConfig) -> Result<(), UploadError> {
    if sizes.len() > limits.max_file_count {
        return Err(UploadError::TooManyFiles {
            count: sizes.len(),
            max_count: limits.max_file_count,
        });
    }

    let total: u64 = sizes.iter().sum();
    let size_mb = total as f64 / BYTES_PER_MB;
    if size_mb > limits.max_total_upload_mb as f64 {
        return Err(UploadError::TotalSizeExceeded {
            size_mb,
            max_mb: limits.max_total_upload_mb,
        });
    }

    Ok(())
}
