//! Longest-common-subsequence alignment of two sequences.
//!
//! Produces difflib-style opcodes: maximal equal runs separated by
//! delete/insert/replace gaps.

use std::ops::Range;

/// Kind of one aligned segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Delete,
    Insert,
    Replace,
}

/// One aligned segment; `a` and `b` are index ranges into the two inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

/// Align `a` and `b` into equal/delete/insert/replace segments.
///
/// Quadratic table over subsequence lengths; inputs are stop lists, so the
/// sizes stay small.
pub fn opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let (a_len, b_len) = (a.len(), b.len());
    let mut lengths = vec![vec![0u32; b_len + 1]; a_len + 1];
    for i in (0..a_len).rev() {
        for j in (0..b_len).rev() {
            lengths[i][j] = if a[i] == b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    // Walk the table forwards, collecting the matched index pairs. Taking a
    // match whenever elements agree preserves an optimal subsequence.
    let mut matched: Vec<(usize, usize)> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a_len && j < b_len {
        if a[i] == b[j] {
            matched.push((i, j));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    // Group matches into equal runs and emit the gaps between them.
    let mut ops: Vec<Opcode> = Vec::new();
    let (mut a_done, mut b_done) = (0, 0);
    let mut index = 0;
    while index < matched.len() {
        let (i, j) = matched[index];
        if a_done < i || b_done < j {
            ops.push(gap_opcode(a_done..i, b_done..j));
        }
        let mut run = 1;
        while index + run < matched.len() && matched[index + run] == (i + run, j + run) {
            run += 1;
        }
        ops.push(Opcode {
            tag: OpTag::Equal,
            a: i..i + run,
            b: j..j + run,
        });
        a_done = i + run;
        b_done = j + run;
        index += run;
    }
    if a_done < a_len || b_done < b_len {
        ops.push(gap_opcode(a_done..a_len, b_done..b_len));
    }
    ops
}

fn gap_opcode(a: Range<usize>, b: Range<usize>) -> Opcode {
    let tag = if a.is_empty() {
        OpTag::Insert
    } else if b.is_empty() {
        OpTag::Delete
    } else {
        OpTag::Replace
    };
    Opcode { tag, a, b }
}
