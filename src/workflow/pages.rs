//! Page-index arithmetic for the page-manipulation helpers.
//!
//! Every helper turns a list of page indices into a list of [`Part`]s over
//! a single uploaded file. Consecutive ascending indices collapse into one
//! range so the service receives as few parts as possible.

use super::instructions::{NewPagePart, PageRange, Part};
use crate::error::DwsError;

/// Group indices into ranges, preserving caller order.
///
/// Runs of consecutive ascending non-negative indices become one
/// `{start, end}` range with `end` exclusive. A negative index is its own
/// one-page range: `{start: -1}` for the last page, `{start: n, end: n + 1}`
/// otherwise.
pub fn coalesce_runs(indices: &[i64]) -> Vec<PageRange> {
    let mut ranges: Vec<PageRange> = Vec::new();
    for &idx in indices {
        if idx == -1 {
            ranges.push(PageRange::from_start(-1));
            continue;
        }
        if idx < 0 {
            ranges.push(PageRange::new(idx, idx + 1));
            continue;
        }
        match ranges.last_mut() {
            Some(PageRange {
                start,
                end: Some(end),
            }) if *start >= 0 && *end == idx => *end = idx + 1,
            _ => ranges.push(PageRange::new(idx, idx + 1)),
        }
    }
    ranges
}

/// Parts that repeat the given pages of `field` in order.
pub fn duplicate_parts(field: &str, indices: &[i64]) -> Result<Vec<Part>, DwsError> {
    if indices.is_empty() {
        return Err(DwsError::InvalidArgument(
            "page_indexes must contain at least one page".into(),
        ));
    }
    Ok(coalesce_runs(indices)
        .into_iter()
        .map(|r| Part::file_pages(field, r))
        .collect())
}

/// Parts that keep every page of `field` except `indices`.
///
/// The page count is unknown locally, so the final kept range is open-ended.
/// Negative indices are rejected for the same reason.
pub fn delete_parts(field: &str, indices: &[i64]) -> Result<Vec<Part>, DwsError> {
    if indices.is_empty() {
        return Err(DwsError::InvalidArgument(
            "page_indexes must contain at least one page".into(),
        ));
    }
    let negative: Vec<i64> = indices.iter().copied().filter(|i| *i < 0).collect();
    if !negative.is_empty() {
        return Err(DwsError::InvalidArgument(format!(
            "negative page indices are not supported for deletion: {negative:?}"
        )));
    }

    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::with_capacity(sorted.len() + 1);
    let mut keep_from = 0;
    for deleted in sorted {
        if keep_from < deleted {
            parts.push(Part::file_pages(field, PageRange::new(keep_from, deleted)));
        }
        keep_from = deleted + 1;
    }
    parts.push(Part::file_pages(field, PageRange::from_start(keep_from)));
    Ok(parts)
}

/// Parts that insert `new_pages` into `field`.
///
/// `after` is the 0-based page the blanks follow; `None` appends them.
pub fn insert_blank_parts(
    field: &str,
    after: Option<i64>,
    new_pages: NewPagePart,
) -> Result<Vec<Part>, DwsError> {
    if new_pages.page_count < 1 {
        return Err(DwsError::InvalidArgument(
            "page_count must be at least 1".into(),
        ));
    }
    Ok(match after {
        None => vec![Part::file(field), Part::NewPage(new_pages)],
        Some(n) if n < 0 => {
            return Err(DwsError::InvalidArgument(format!(
                "after_page_index must be non-negative, got {n}"
            )))
        }
        Some(n) => vec![
            Part::file_pages(field, PageRange::new(0, n + 1)),
            Part::NewPage(new_pages),
            Part::file_pages(field, PageRange::from_start(n + 1)),
        ],
    })
}

/// Check a caller-supplied range before it is sent.
pub fn validate_range(range: &PageRange) -> Result<(), DwsError> {
    if let Some(end) = range.end {
        if range.start >= 0 && end >= 0 && end <= range.start {
            return Err(DwsError::InvalidArgument(format!(
                "page range end ({end}) must be greater than start ({})",
                range.start
            )));
        }
    }
    Ok(())
}
