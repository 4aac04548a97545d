//! Ratcliff/Obershelp sequence similarity.
//!
//! The ratio is `2·M / T`, where `M` is the number of characters covered by
//! matching blocks and `T` the combined length of both inputs. Matching
//! blocks are found by taking the longest common contiguous block, then
//! recursing into the unmatched regions to its left and right.

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)`. Ties resolve to the block starting earliest in
/// `a`, then earliest in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo;
            cur[col] = if a[i] == b[j] {
                let run = if col > 0 { prev[col - 1] } else { 0 } + 1;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
                run
            } else {
                0
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Total number of characters covered by the matching blocks of `a`
/// against `b`.
pub fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![((0, a.len()), (0, b.len()))];

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let (i, j, size) = longest_block(a, b, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push(((alo, i), (blo, j)));
        }
        if i + size < ahi && j + size < bhi {
            pending.push(((i + size, ahi), (j + size, bhi)));
        }
    }
    total
}

/// Similarity ratio in `[0, 1]`.
///
/// Block selection depends on which side is scanned first, so both
/// orientations are evaluated and the larger match count is kept. This
/// makes `similarity_ratio(a, b) == similarity_ratio(b, a)` hold exactly.
/// Two empty strings are identical (`1.0`).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matched_chars(&a, &b).max(matched_chars(&b, &a));
    2.0 * matched as f64 / total as f64
}
