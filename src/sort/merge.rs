//! K-way Merge
//!
//! Merges sorted record streams with a min-heap keyed on the current record.
//! Each pop drains the smallest head, then refills from the same stream,
//! so memory holds one record per stream.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::Write;

use crate::error::Result;

/// Head of one input stream. Ties break on stream index.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Head {
    record: Vec<u8>,
    source: usize,
}

/// Merge sorted streams into `out`; returns the number of records written.
///
/// Every input must already be in non-decreasing byte order. Duplicates
/// are all kept.
pub fn merge_sorted<I, W>(mut sources: Vec<I>, out: &mut W) -> Result<u64>
where
    I: Iterator<Item = Result<Vec<u8>>>,
    W: Write,
{
    let mut heap = BinaryHeap::with_capacity(sources.len());

    for (source, stream) in sources.iter_mut().enumerate() {
        if let Some(record) = stream.next() {
            heap.push(Reverse(Head {
                record: record?,
                source,
            }));
        }
    }

    let mut written = 0;
    while let Some(Reverse(head)) = heap.pop() {
        out.write_all(&head.record)?;
        written += 1;

        if let Some(next) = sources[head.source].next() {
            heap.push(Reverse(Head {
                record: next?,
                source: head.source,
            }));
        }
    }

    Ok(written)
}
