//! Fixed-width lane values for data-parallel reductions.
//!
//! A [`Lane<T, N>`] is `N` samples processed as one unit. The operations mirror what
//! a SIMD register offers: elementwise compare (producing a [`Mask`]), select, max,
//! and two horizontal reductions ([`Lane::horizontal_max`] and
//! [`Lane::horizontal_find_first`]).
//!
//! The portable implementation is plain array code written so the compiler can
//! auto-vectorize it. Strategies that want explicit intrinsics use the AVX2 path in
//! [`crate::argmax`]; both backends must agree on every input.

use std::fmt;

/// Element types that can populate a [`Lane`].
pub trait LaneElement: Copy + Ord + Default + fmt::Debug + 'static {
    /// Smallest representable value; the identity for `max`.
    const MIN: Self;
    /// Largest representable value; the identity for `min`.
    const MAX: Self;
}

macro_rules! impl_lane_element {
    ($($ty:ty),*) => {
        $(
            impl LaneElement for $ty {
                const MIN: Self = <$ty>::MIN;
                const MAX: Self = <$ty>::MAX;
            }
        )*
    };
}

impl_lane_element!(u8, u16, u32);

/// Per-position boolean result of a lane comparison, stored as a bitmask.
///
/// Bit `i` corresponds to lane position `i`, so `trailing_zeros` finds the lowest
/// matching position, the same trick as `movemask` + `tzcnt` on x86.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mask<const N: usize> {
    bits: u64,
}

impl<const N: usize> Mask<N> {
    /// Builds a mask by evaluating `f` at each lane position.
    #[inline]
    pub fn from_fn(mut f: impl FnMut(usize) -> bool) -> Self {
        const { assert!(N >= 1 && N <= 64, "lanes hold between 1 and 64 positions") };
        let mut bits = 0u64;
        for i in 0..N {
            bits |= u64::from(f(i)) << i;
        }
        Self { bits }
    }

    /// Raw bits; bit `i` is position `i`.
    #[inline]
    pub fn bits(self) -> u64 {
        self.bits
    }

    /// Whether `position` is set. Positions at or past `N` read as unset.
    #[inline]
    pub fn test(self, position: usize) -> bool {
        position < N && (self.bits >> position) & 1 == 1
    }

    /// Number of set positions.
    #[inline]
    pub fn count(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Lowest set position, scanning in ascending address order.
    #[inline]
    pub fn first_set(self) -> Option<usize> {
        if self.bits == 0 {
            None
        } else {
            Some(self.bits.trailing_zeros() as usize)
        }
    }
}

/// `N` samples of type `T` processed together.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Lane<T, const N: usize>([T; N]);

impl<T: LaneElement, const N: usize> Lane<T, N> {
    /// Every position set to `value`.
    #[inline]
    pub fn splat(value: T) -> Self {
        Self([value; N])
    }

    #[inline]
    pub fn from_array(values: [T; N]) -> Self {
        Self(values)
    }

    /// Position `i` holds `f(i)`.
    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self(std::array::from_fn(f))
    }

    /// Loads the first `N` elements of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` holds fewer than `N` elements.
    #[inline]
    pub fn load(src: &[T]) -> Self {
        let mut out = [T::default(); N];
        out.copy_from_slice(&src[..N]);
        Self(out)
    }

    #[inline]
    pub fn as_array(&self) -> &[T; N] {
        &self.0
    }

    /// Sample at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= N`.
    #[inline]
    pub fn get(&self, position: usize) -> T {
        self.0[position]
    }

    /// Elementwise strict `self > other`.
    #[inline]
    pub fn simd_gt(self, other: Self) -> Mask<N> {
        Mask::from_fn(|i| self.0[i] > other.0[i])
    }

    /// Elementwise `self == other`.
    #[inline]
    pub fn simd_eq(self, other: Self) -> Mask<N> {
        Mask::from_fn(|i| self.0[i] == other.0[i])
    }

    /// Takes `if_true` where `mask` is set and `if_false` elsewhere.
    #[inline]
    pub fn select(mask: Mask<N>, if_true: Self, if_false: Self) -> Self {
        Self::from_fn(|i| if mask.test(i) { if_true.0[i] } else { if_false.0[i] })
    }

    /// Elementwise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::from_fn(|i| self.0[i].max(other.0[i]))
    }

    /// Largest sample in the lane.
    #[inline]
    pub fn horizontal_max(self) -> T {
        self.0.iter().copied().fold(T::MIN, Ord::max)
    }

    /// Smallest sample in the lane.
    #[inline]
    pub fn horizontal_min(self) -> T {
        self.0.iter().copied().fold(T::MAX, Ord::min)
    }

    /// Lowest position holding `needle`, if any.
    #[inline]
    pub fn horizontal_find_first(self, needle: T) -> Option<usize> {
        self.simd_eq(Self::splat(needle)).first_set()
    }

    #[inline]
    pub fn map<U: LaneElement>(self, f: impl FnMut(T) -> U) -> Lane<U, N> {
        Lane(self.0.map(f))
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for Lane<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type L8 = Lane<u8, 8>;

    #[test]
    fn compare_is_strict() {
        let a = L8::from_array([1, 2, 3, 4, 5, 6, 7, 8]);
        let b = L8::splat(4);
        let gt = a.simd_gt(b);
        assert_eq!(gt.bits(), 0b1111_0000);
        assert!(!gt.test(3));
        assert_eq!(a.simd_eq(b).first_set(), Some(3));
    }

    #[test]
    fn select_and_max() {
        let a = L8::from_array([9, 0, 9, 0, 9, 0, 9, 0]);
        let b = L8::splat(5);
        let mask = a.simd_gt(b);
        assert_eq!(
            L8::select(mask, a, b).as_array(),
            &[9, 5, 9, 5, 9, 5, 9, 5]
        );
        assert_eq!(a.max(b), L8::select(mask, a, b));
    }

    #[test]
    fn horizontal_reductions() {
        let lane = L8::from_array([3, 7, 1, 7, 0, 2, 7, 4]);
        assert_eq!(lane.horizontal_max(), 7);
        assert_eq!(lane.horizontal_min(), 0);
        assert_eq!(lane.horizontal_find_first(7), Some(1));
        assert_eq!(lane.horizontal_find_first(9), None);
    }

    #[test]
    fn mask_positions_stay_within_width() {
        let mask = Mask::<4>::from_fn(|i| i == 2 || i == 7);
        assert_eq!(mask.bits(), 0b0100);
        assert_eq!(mask.count(), 1);
        assert!(!mask.test(7));
        assert_eq!(Mask::<64>::from_fn(|_| true).count(), 64);
        assert_eq!(Mask::<4>::default().first_set(), None);
    }

    #[test]
    fn load_reads_prefix() {
        let src: Vec<u16> = (0..10).collect();
        let lane = Lane::<u16, 4>::load(&src[3..]);
        assert_eq!(lane.as_array(), &[3, 4, 5, 6]);
        assert_eq!(lane.map(|v| v * 2).get(3), 12);
    }

    proptest! {
        #[test]
        fn horizontal_ops_match_iterators(values in proptest::array::uniform32(0u8..6)) {
            let lane = Lane::<u8, 32>::from_array(values);
            let top = values.iter().copied().max().unwrap_or(0);
            prop_assert_eq!(lane.horizontal_max(), top);
            prop_assert_eq!(lane.horizontal_min(), values.iter().copied().min().unwrap_or(0));
            prop_assert_eq!(
                lane.horizontal_find_first(top),
                values.iter().position(|&v| v == top)
            );
        }
    }
}
