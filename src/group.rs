//! Control-byte groups and vectorized matching.
//!
//! Each index slot has one control byte:
//! - `EMPTY` (0xFF): never used since the last rebuild; terminates probes.
//! - `DELETED` (0x80): tombstone; probes continue past it.
//! - `0x00..=0x7F`: occupied, holding the 7-bit fingerprint.
//!
//! A group is `GROUP_WIDTH` consecutive control bytes. On x86 with SSE2 one
//! group is matched with a single 128-bit compare; elsewhere a portable
//! byte loop produces the same masks.

/// Number of control bytes scanned per probe step.
pub const GROUP_WIDTH: usize = 16;

pub const EMPTY: u8 = 0b1111_1111;
pub const DELETED: u8 = 0b1000_0000;

/// 7-bit fingerprint cached in the control byte of an occupied slot.
#[inline]
pub fn fingerprint(hash: u64) -> u8 {
    (hash & 0x7f) as u8
}

#[inline]
pub fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

/// Set of matching slot offsets within one group, lowest offset first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitMask(u16);

impl BitMask {
    #[inline]
    pub fn any(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn lowest(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let bit = self.lowest()?;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), target_feature = "sse2"))]
mod imp {
    use super::{BitMask, EMPTY, GROUP_WIDTH};
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    #[derive(Copy, Clone)]
    pub struct Group(__m128i);

    impl Group {
        #[inline]
        pub fn load(ctrl: &[u8; GROUP_WIDTH]) -> Self {
            // SAFETY: the reference covers exactly 16 readable bytes and the
            // load is unaligned. SSE2 is statically enabled for this build.
            unsafe { Group(_mm_loadu_si128(ctrl.as_ptr() as *const __m128i)) }
        }

        #[inline]
        pub fn match_byte(self, byte: u8) -> BitMask {
            // SAFETY: SSE2 is statically enabled for this build.
            unsafe {
                let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(byte as i8));
                BitMask(_mm_movemask_epi8(cmp) as u16)
            }
        }

        #[inline]
        pub fn match_empty(self) -> BitMask {
            self.match_byte(EMPTY)
        }

        /// EMPTY and DELETED are exactly the bytes with the top bit set.
        #[inline]
        pub fn match_empty_or_deleted(self) -> BitMask {
            // SAFETY: SSE2 is statically enabled for this build.
            unsafe { BitMask(_mm_movemask_epi8(self.0) as u16) }
        }
    }
}

#[cfg(not(all(any(target_arch = "x86", target_arch = "x86_64"), target_feature = "sse2")))]
mod imp {
    use super::{BitMask, EMPTY, GROUP_WIDTH};

    #[derive(Copy, Clone)]
    pub struct Group([u8; GROUP_WIDTH]);

    impl Group {
        #[inline]
        pub fn load(ctrl: &[u8; GROUP_WIDTH]) -> Self {
            Group(*ctrl)
        }

        #[inline]
        fn mask_where(self, pred: impl Fn(u8) -> bool) -> BitMask {
            let mut bits = 0u16;
            for (i, &b) in self.0.iter().enumerate() {
                if pred(b) {
                    bits |= 1 << i;
                }
            }
            BitMask(bits)
        }

        #[inline]
        pub fn match_byte(self, byte: u8) -> BitMask {
            self.mask_where(|b| b == byte)
        }

        #[inline]
        pub fn match_empty(self) -> BitMask {
            self.match_byte(EMPTY)
        }

        #[inline]
        pub fn match_empty_or_deleted(self) -> BitMask {
            self.mask_where(|b| b & 0x80 != 0)
        }
    }
}

pub use imp::Group;
