use chrono::{DateTime, Utc};

/// Half-open overlap of `[a_start, a_end)` and `[b_start, b_end)`.
/// Ranges that only touch at an endpoint do not overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}
