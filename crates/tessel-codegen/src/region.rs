//! Locating and replacing the generated region of a source file.
//!
//! A file may carry exactly one begin marker followed, later, by exactly one
//! end marker. Only the bytes strictly between them belong to the generator;
//! everything else is left untouched on regeneration.

use std::ops::Range;

use crate::CodegenError;

/// What is wrong with the markers of a previous file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerProblem {
    #[error("'{marker}' appears without its partner")]
    Unpaired { marker: String },

    #[error("'{marker}' appears {count} times")]
    Repeated { marker: String, count: usize },

    #[error("'{end}' comes before '{begin}'")]
    Misordered { begin: String, end: String },

    #[error("'{marker}' occurs inside generated content")]
    Embedded { marker: String },
}

/// Byte range of the region interior within `text`, or `None` when the file
/// has no markers at all.
pub fn find_region(text: &str, begin: &str, end: &str) -> Result<Option<Range<usize>>, CodegenError> {
    let begins: Vec<usize> = text.match_indices(begin).map(|(i, _)| i).collect();
    let ends: Vec<usize> = text.match_indices(end).map(|(i, _)| i).collect();

    let problem = match (begins.as_slice(), ends.as_slice()) {
        ([], []) => return Ok(None),
        ([b], [e]) if b + begin.len() <= *e => return Ok(Some(b + begin.len()..*e)),
        ([_], [_]) => MarkerProblem::Misordered {
            begin: begin.to_owned(),
            end: end.to_owned(),
        },
        (bs, _) if bs.len() > 1 => MarkerProblem::Repeated {
            marker: begin.to_owned(),
            count: bs.len(),
        },
        (_, es) if es.len() > 1 => MarkerProblem::Repeated {
            marker: end.to_owned(),
            count: es.len(),
        },
        ([], _) => MarkerProblem::Unpaired {
            marker: end.to_owned(),
        },
        (_, _) => MarkerProblem::Unpaired {
            marker: begin.to_owned(),
        },
    };
    Err(CodegenError::Generation { problem })
}

/// Replace the interior of `previous`'s region with `interior`.
///
/// Returns `None` when `previous` has no markers.
pub fn merge(
    previous: &str,
    interior: &str,
    begin: &str,
    end: &str,
) -> Result<Option<String>, CodegenError> {
    let Some(range) = find_region(previous, begin, end)? else {
        return Ok(None);
    };
    let mut out = String::with_capacity(previous.len() - range.len() + interior.len());
    out.push_str(&previous[..range.start]);
    out.push_str(interior);
    out.push_str(&previous[range.end..]);
    Ok(Some(out))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
