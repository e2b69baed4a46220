// ============================================================
// Layer 3 — Length Extraction
// ============================================================
// Finds the predicted length of every row in a batch of token
// ids: the index of the first end-of-sequence marker, or a
// fallback length when the row never terminates.
//
// The work is split in two:
//   1. scan every row and collect (row, column) marker matches
//   2. group the matches by row and keep the lowest column
//
// Step 2 does not assume that matches arrive sorted by row or
// by column, so it gives the same answer for any scan order.

/// Length of each row up to (excluding) its first `eos` id.
/// Rows without `eos` get `fallback`.
pub fn sequence_lengths<R: AsRef<[usize]>>(rows: &[R], eos: usize, fallback: usize) -> Vec<usize> {
    let matches = rows.iter().enumerate().flat_map(|(r, row)| {
        row.as_ref()
            .iter()
            .enumerate()
            .filter(move |&(_, &id)| id == eos)
            .map(move |(c, _)| (r, c))
    });
    lengths_from_matches(matches, rows.len(), fallback)
}

/// Reduce `(row, column)` marker positions to one length per row.
///
/// Matches are grouped strictly by row id before taking the
/// minimum column, so coincidences in ordering between rows can
/// never leak a length from one row to another.
pub fn lengths_from_matches<I>(matches: I, n_rows: usize, fallback: usize) -> Vec<usize>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut first: Vec<Option<usize>> = vec![None; n_rows];
    for (row, col) in matches {
        if let Some(slot) = first.get_mut(row) {
            *slot = Some(slot.map_or(col, |c| c.min(col)));
        }
    }
    first.into_iter().map(|c| c.unwrap_or(fallback)).collect()
}
