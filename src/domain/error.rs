// ============================================================
// Layer 3 — Core Errors
// ============================================================
// Precondition violations inside the model and criterion.
// All of these are fatal: the training loop propagates them
// with `?` and never retries.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Seq2SeqError {
    #[error("row count mismatch: {what} has {found} rows, expected {expected}")]
    RowCountMismatch {
        what:     &'static str,
        expected: usize,
        found:    usize,
    },

    #[error("row {row}: length {len} is outside 1..={width}")]
    InvalidLength { row: usize, len: usize, width: usize },

    #[error("batch contains no non-padding target tokens")]
    EmptyBatch,

    #[error("teacher-forced decoding requested without a target sequence")]
    MissingTarget,

    #[error("target width {width} cannot hold <sos> and <eos>")]
    TargetTooShort { width: usize },

    #[error("decoder produced {found} steps but the target has {expected}")]
    StepMismatch { expected: usize, found: usize },
}

/// Check that `lens` has one entry per row and each entry lies in `1..=width`.
pub fn check_lengths(
    what:  &'static str,
    lens:  &[usize],
    rows:  usize,
    width: usize,
) -> Result<(), Seq2SeqError> {
    if lens.len() != rows {
        return Err(Seq2SeqError::RowCountMismatch { what, expected: rows, found: lens.len() });
    }
    match lens.iter().position(|&len| len == 0 || len > width) {
        Some(row) => Err(Seq2SeqError::InvalidLength { row, len: lens[row], width }),
        None => Ok(()),
    }
}
