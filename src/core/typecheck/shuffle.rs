//! Name-aware tuple shuffle used by conversion matching.
//!
//! Named target elements claim same-named source elements first (exact name
//! match only); remaining target elements consume unconsumed sources left to
//! right; a trailing variadic target collects everything left; a defaulted
//! target may consume nothing. The result is a selection vector consumed by
//! later lowering; the checker only validates feasibility.

use crate::core::types::TupleElement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShuffleEntry {
    /// Target element takes source element `i`.
    Source(usize),
    /// Trailing variadic target collects these source elements.
    Variadic(Vec<usize>),
    /// Defaulted target element consumes nothing.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleError {
    /// Too many or too few source elements.
    SizeMismatch,
    /// A leftover source element carries a name no target element claims.
    NameMismatch,
}

pub fn shuffle_tuple(
    source: &[TupleElement],
    target: &[TupleElement],
) -> Result<Vec<ShuffleEntry>, ShuffleError> {
    let mut consumed = vec![false; source.len()];
    let mut entries: Vec<Option<ShuffleEntry>> = vec![None; target.len()];

    // Named targets claim exact-name sources first.
    for (target_index, target_elem) in target.iter().enumerate() {
        let Some(name) = &target_elem.name else {
            continue;
        };
        if target_elem.variadic {
            continue;
        }
        let hit = source
            .iter()
            .enumerate()
            .find(|(source_index, source_elem)| {
                !consumed[*source_index] && source_elem.name.as_ref() == Some(name)
            });
        if let Some((source_index, _)) = hit {
            consumed[source_index] = true;
            entries[target_index] = Some(ShuffleEntry::Source(source_index));
        }
    }

    // Remaining targets consume left to right, skipping claimed sources.
    let mut cursor = 0usize;
    for (target_index, target_elem) in target.iter().enumerate() {
        if entries[target_index].is_some() {
            continue;
        }
        if target_elem.variadic {
            // Trailing variadic element collects every remaining source.
            let rest: Vec<usize> = (0..source.len()).filter(|i| !consumed[*i]).collect();
            for &i in &rest {
                consumed[i] = true;
            }
            entries[target_index] = Some(ShuffleEntry::Variadic(rest));
            continue;
        }
        while cursor < source.len() && consumed[cursor] {
            cursor += 1;
        }
        if cursor < source.len() {
            consumed[cursor] = true;
            entries[target_index] = Some(ShuffleEntry::Source(cursor));
            cursor += 1;
        } else if target_elem.has_default {
            entries[target_index] = Some(ShuffleEntry::Default);
        } else {
            return Err(ShuffleError::SizeMismatch);
        }
    }

    if let Some(leftover) = (0..source.len()).find(|i| !consumed[*i]) {
        return Err(if source[leftover].name.is_some() {
            ShuffleError::NameMismatch
        } else {
            ShuffleError::SizeMismatch
        });
    }

    Ok(entries.into_iter().map(|entry| entry.expect("filled")).collect())
}
