//! Per-row argmax kernels.
//!
//! Each kernel returns the row-relative position of the row's maximum. All of them
//! except [`argmax_packed`] with [`TieBreak::Last`] report the *first* occurrence.
//! Kernels with shape requirements return `None` for rows that break them.
//!
//! | Function | Strategy | Tie-break |
//! |----------|----------|-----------|
//! | [`argmax_scalar`] | Left-to-right scan, replace on strictly greater | First |
//! | [`argmax_iter`] | `Iterator::max_by_key` over the reversed row | First |
//! | [`argmax_min_by_greater`] | `Iterator::min_by` under reversed ordering | First |
//! | [`argmax_max_then_find`] | Lane max fold, then lane-by-lane find-first | First |
//! | [`argmax_avx2`] | AVX2 compare/blend fold over 32-byte lanes | First |
//! | [`argmax_packed`] | Max over `(value << 8) \| index` words | Last (configurable) |
//!
//! The schedule-driven lane reductions live in [`crate::reduce`].
//!
//! # Library primitives and ties
//!
//! `Iterator::max_by_key` returns the *last* maximal element, which is the opposite of
//! what this crate wants. [`argmax_iter`] walks the row in reverse so that "last" in
//! iteration order is the lowest index. `Iterator::min_by` returns the *first*
//! minimal element, so flipping the comparison in [`argmax_min_by_greater`] already
//! yields the first maximum.

use crate::dataset::LaneIndexTable;
use crate::lane::Lane;

/// Widest row whose indices fit in one byte. Bounds [`argmax_packed`] and [`argmax_avx2`].
pub const BYTE_INDEX_LIMIT: usize = 256;

/// Which position wins when the maximum occurs more than once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Smallest index among the maxima.
    #[default]
    First,
    /// Largest index among the maxima.
    Last,
}

impl TieBreak {
    pub fn name(self) -> &'static str {
        match self {
            TieBreak::First => "first",
            TieBreak::Last => "last",
        }
    }
}

/// Scalar scan replacing the best only on a strictly greater sample.
///
/// This is the reference every other kernel is checked against.
pub fn argmax_scalar(row: &[u8]) -> usize {
    let mut best_value = u8::MIN;
    let mut best_index = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best_index = i;
        }
    }
    best_index
}

/// Scalar scan that also moves on equal samples, reporting the last maximum.
pub fn argmax_scalar_last(row: &[u8]) -> usize {
    let mut best_value = u8::MIN;
    let mut best_index = 0;
    for (i, &v) in row.iter().enumerate() {
        if v >= best_value {
            best_value = v;
            best_index = i;
        }
    }
    best_index
}

/// Standard library argmax: `max_by_key` over the reversed row.
pub fn argmax_iter(row: &[u8]) -> usize {
    row.iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, &value)| value)
        .map_or(0, |(idx, _)| idx)
}

/// Standard library argmax: the first minimum under reversed ordering.
pub fn argmax_min_by_greater(row: &[u8]) -> usize {
    row.iter()
        .enumerate()
        .min_by(|a, b| b.1.cmp(a.1))
        .map_or(0, |(idx, _)| idx)
}

/// Two-pass argmax: lane max fold for the value, then the first lane containing it.
///
/// The second pass can stop at the first lane whose find-first mask is non-empty,
/// and lanes are scanned in ascending order, so the result is the first occurrence.
/// Returns `None` unless `row` is a non-empty multiple of `N` samples.
pub fn argmax_max_then_find<const N: usize>(row: &[u8]) -> Option<usize> {
    if row.is_empty() || row.len() % N != 0 {
        return None;
    }
    let top = row
        .chunks_exact(N)
        .map(Lane::<u8, N>::load)
        .fold(Lane::splat(u8::MIN), Lane::<u8, N>::max)
        .horizontal_max();

    row.chunks_exact(N)
        .enumerate()
        .find_map(|(j, chunk)| {
            Lane::<u8, N>::load(chunk)
                .horizontal_find_first(top)
                .map(|p| j * N + p)
        })
}

/// Packed-payload argmax: one max reduction over `(value << 8) | payload` words.
///
/// Packing value above index makes the word order lexicographic on
/// `(value, payload)`. With [`TieBreak::Last`] the payload is the index itself, so
/// ties resolve to the *largest* index. [`TieBreak::First`] stores the inverted index
/// instead, which turns the same max into a smallest-index pick.
///
/// Returns `None` if `row.len()` differs from `table.width()` or the width exceeds
/// [`BYTE_INDEX_LIMIT`], where indices would no longer fit the payload byte.
pub fn argmax_packed<const N: usize>(
    row: &[u8],
    table: &LaneIndexTable<N>,
    tie_break: TieBreak,
) -> Option<usize> {
    if row.len() != table.width() || table.width() > BYTE_INDEX_LIMIT {
        return None;
    }
    let best = row
        .chunks_exact(N)
        .zip(table.lanes())
        .fold(Lane::<u16, N>::splat(0), |best, (chunk, indices)| {
            best.max(pack(Lane::load(chunk), *indices, tie_break))
        });
    Some(unpack(best.horizontal_max(), tie_break))
}

#[inline]
fn pack<const N: usize>(
    values: Lane<u8, N>,
    indices: Lane<u16, N>,
    tie_break: TieBreak,
) -> Lane<u16, N> {
    Lane::from_fn(|p| {
        let index = indices.get(p) as u8;
        let payload = match tie_break {
            TieBreak::Last => index,
            TieBreak::First => !index,
        };
        (u16::from(values.get(p)) << 8) | u16::from(payload)
    })
}

#[inline]
fn unpack(word: u16, tie_break: TieBreak) -> usize {
    let payload = word as u8;
    match tie_break {
        TieBreak::Last => usize::from(payload),
        TieBreak::First => usize::from(!payload),
    }
}

const BYTE_RAMP: [u8; BYTE_INDEX_LIMIT] = {
    let mut ramp = [0u8; BYTE_INDEX_LIMIT];
    let mut i = 0;
    while i < BYTE_INDEX_LIMIT {
        ramp[i] = i as u8;
        i += 1;
    }
    ramp
};

/// AVX2 lane-parallel argmax over 32-byte lanes with byte index lanes.
///
/// Returns `None` when AVX2 is unavailable or the row shape is unsupported: the
/// length must be a non-zero multiple of 32 and at most 256 so indices fit in a byte.
pub fn argmax_avx2(row: &[u8]) -> Option<usize> {
    if row.is_empty() || row.len() % 32 != 0 || row.len() > BYTE_RAMP.len() {
        return None;
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if crate::backend::avx2_available() {
            // SAFETY: guarded by AVX2 runtime detection and the shape checks above.
            return Some(unsafe { x86_avx2::argmax_u8x32(row, &BYTE_RAMP[..row.len()]) });
        }
    }

    None
}

/// AVX2 SIMD implementations for x86/x86_64.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[allow(unsafe_op_in_unsafe_fn)]
mod x86_avx2 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86 as arch;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64 as arch;

    use arch::{
        __m256i, _mm256_blendv_epi8, _mm256_cmpeq_epi8, _mm256_cmpgt_epi8, _mm256_loadu_si256,
        _mm256_max_epu8, _mm256_movemask_epi8, _mm256_set1_epi8, _mm256_storeu_si256,
        _mm256_xor_si256,
    };

    /// Lane fold tracking value and index vectors, then a bit-scan horizontal step.
    ///
    /// AVX2 only has a signed byte compare, so both operands are biased by `0x80`
    /// to get an unsigned strictly-greater mask. `blendv` then takes the new index
    /// where the mask is set.
    ///
    /// # Safety
    ///
    /// AVX2 must be available. `row` and `indices` must have the same non-zero
    /// length, a multiple of 32.
    #[target_feature(enable = "avx2")]
    pub unsafe fn argmax_u8x32(row: &[u8], indices: &[u8]) -> usize {
        let len = row.len();
        let rp = row.as_ptr();
        let ip = indices.as_ptr();
        let bias = _mm256_set1_epi8(i8::MIN);

        let mut best_v = _mm256_loadu_si256(rp as *const __m256i);
        let mut best_i = _mm256_loadu_si256(ip as *const __m256i);
        let mut i = 32usize;
        while i < len {
            let v = _mm256_loadu_si256(rp.add(i) as *const __m256i);
            let idx = _mm256_loadu_si256(ip.add(i) as *const __m256i);
            let wins = _mm256_cmpgt_epi8(_mm256_xor_si256(v, bias), _mm256_xor_si256(best_v, bias));
            best_i = _mm256_blendv_epi8(best_i, idx, wins);
            best_v = _mm256_max_epu8(best_v, v);
            i += 32;
        }

        let mut values = [0u8; 32];
        let mut idx = [0u8; 32];
        _mm256_storeu_si256(values.as_mut_ptr() as *mut __m256i, best_v);
        _mm256_storeu_si256(idx.as_mut_ptr() as *mut __m256i, best_i);
        let top = values.iter().copied().fold(u8::MIN, u8::max);

        // Bit p set where position p holds the maximum.
        let mut holders =
            _mm256_movemask_epi8(_mm256_cmpeq_epi8(best_v, _mm256_set1_epi8(top as i8))) as u32;
        let mut best = u8::MAX;
        while holders != 0 {
            let p = holders.trailing_zeros() as usize;
            best = best.min(idx[p]);
            holders &= holders - 1;
        }
        usize::from(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_first(row: &[u8]) -> usize {
        let top = row.iter().copied().max().unwrap_or(0);
        row.iter().position(|&v| v == top).unwrap_or(0)
    }

    fn reference_last(row: &[u8]) -> usize {
        let top = row.iter().copied().max().unwrap_or(0);
        row.iter().rposition(|&v| v == top).unwrap_or(0)
    }

    proptest! {
        #[test]
        fn scalar_kernels_match_reference(row in proptest::collection::vec(0u8..8, 1..=300)) {
            let expected = reference_first(&row);
            prop_assert_eq!(argmax_scalar(&row), expected);
            prop_assert_eq!(argmax_iter(&row), expected);
            prop_assert_eq!(argmax_min_by_greater(&row), expected);
            prop_assert_eq!(argmax_scalar_last(&row), reference_last(&row));
        }

        #[test]
        fn lane_kernels_match_reference(
            lanes in 1usize..=8,
            seed in proptest::collection::vec(any::<u8>(), 256),
            spread in 1u8..=255,
        ) {
            let row: Vec<u8> = seed[..lanes * 32].iter().map(|&v| v % spread).collect();
            let table = LaneIndexTable::<32>::new(row.len()).unwrap();
            prop_assert_eq!(argmax_max_then_find::<32>(&row), Some(reference_first(&row)));
            prop_assert_eq!(
                argmax_packed(&row, &table, TieBreak::First),
                Some(reference_first(&row))
            );
            prop_assert_eq!(
                argmax_packed(&row, &table, TieBreak::Last),
                Some(reference_last(&row))
            );
            if let Some(idx) = argmax_avx2(&row) {
                prop_assert_eq!(idx, reference_first(&row));
            }
        }
    }

    #[test]
    fn scalar_scenario() {
        assert_eq!(argmax_scalar(&[3, 7, 7, 2]), 1);
        assert_eq!(argmax_scalar(&[1, 1, 9, 9]), 2);
        assert_eq!(argmax_scalar(&[0, 0, 0]), 0);
        assert_eq!(argmax_scalar(&[]), 0);
    }

    #[test]
    fn library_scan_returns_first_maximum() {
        // Plain max_by_key would report 3 here.
        assert_eq!(argmax_iter(&[1, 9, 2, 9]), 1);
        assert_eq!(argmax_min_by_greater(&[1, 9, 2, 9]), 1);
    }

    #[test]
    fn packed_scenario_reports_last_occurrence() {
        let table = LaneIndexTable::<2>::new(4).unwrap();
        assert_eq!(argmax_packed(&[3, 7, 7, 2], &table, TieBreak::Last), Some(2));
        assert_eq!(argmax_packed(&[1, 1, 9, 9], &table, TieBreak::Last), Some(3));
        assert_eq!(argmax_packed(&[3, 7, 7, 2], &table, TieBreak::First), Some(1));
        assert_eq!(argmax_packed(&[1, 1, 9, 9], &table, TieBreak::First), Some(2));
    }

    #[test]
    fn packed_handles_all_zero_full_width_rows() {
        let row = [0u8; 256];
        let table = LaneIndexTable::<32>::new(256).unwrap();
        assert_eq!(argmax_packed(&row, &table, TieBreak::First), Some(0));
        assert_eq!(argmax_packed(&row, &table, TieBreak::Last), Some(255));
    }

    #[test]
    fn max_then_find_scenario() {
        assert_eq!(argmax_max_then_find::<2>(&[3, 7, 7, 2]), Some(1));
        assert_eq!(argmax_max_then_find::<2>(&[1, 1, 9, 9]), Some(2));
    }

    #[test]
    fn max_then_find_rejects_partial_lanes() {
        // The maximum sits in the 8-sample tail that chunking would drop.
        let mut row = [0u8; 40];
        row[35] = 9;
        assert_eq!(argmax_max_then_find::<32>(&row), None);
        assert_eq!(argmax_max_then_find::<32>(&[]), None);
    }

    #[test]
    fn packed_rejects_mismatched_or_wide_rows() {
        let wide = LaneIndexTable::<32>::new(512).unwrap();
        let mut row = [0u8; 512];
        row[300] = 9;
        assert_eq!(argmax_packed(&row, &wide, TieBreak::Last), None);

        let table = LaneIndexTable::<32>::new(64).unwrap();
        assert_eq!(argmax_packed(&row[..96], &table, TieBreak::First), None);
        assert_eq!(argmax_packed(&row[..64], &table, TieBreak::First), Some(0));
    }

    #[test]
    fn avx2_rejects_unsupported_shapes() {
        assert_eq!(argmax_avx2(&[]), None);
        assert_eq!(argmax_avx2(&[1u8; 48]), None);
        assert_eq!(argmax_avx2(&[1u8; 288]), None);
    }

    #[test]
    fn avx2_cross_position_tie() {
        // Lane 0 holds 200 at position 5; lane 1 holds 200 at position 0 (index 32).
        let mut row = [0u8; 64];
        row[5] = 200;
        row[32] = 200;
        if let Some(idx) = argmax_avx2(&row) {
            assert_eq!(idx, 5);
        }
        row[200 % 64] = 255;
        if let Some(idx) = argmax_avx2(&row) {
            assert_eq!(idx, 200 % 64);
        }
    }
}
