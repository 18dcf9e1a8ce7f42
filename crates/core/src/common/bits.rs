//! Bit-field manipulation over unsigned integers of any width.
//!
//! Every other component of the emulator is built on these primitives:
//! the instruction codec reassembles split immediates with them, the CSR
//! file masks sub-views through them, the MMU slices virtual-page numbers
//! out of addresses, and the softfloat type packs sign/exponent/field.

/// Field extraction and insertion on an unsigned integer.
///
/// A field is `len` bits starting at bit `offset` (bit 0 is the least
/// significant). `len == 0` is a valid empty field; `offset + len` beyond
/// the type width saturates rather than shifting out of range.
pub trait BitField: Copy {
    /// Width of the integer type in bits.
    const WIDTH: u32;

    /// Returns a mask with the low `len` bits set.
    ///
    /// Saturates to all-ones when `len >= WIDTH`.
    fn trailing_mask(len: u32) -> Self;

    /// Extracts the `len`-bit field at `offset`.
    fn bits(self, offset: u32, len: u32) -> Self;

    /// Replaces the `len`-bit field at `offset` with `value`.
    ///
    /// `value` is truncated to `len` bits before insertion.
    fn set_bits(&mut self, value: Self, offset: u32, len: u32);
}

macro_rules! impl_bit_field {
    ($($t:ty),*) => {$(
        impl BitField for $t {
            const WIDTH: u32 = <$t>::BITS;

            #[inline]
            fn trailing_mask(len: u32) -> Self {
                if len >= Self::WIDTH {
                    !0
                } else {
                    (1 << len) - 1
                }
            }

            #[inline]
            fn bits(self, offset: u32, len: u32) -> Self {
                if offset >= Self::WIDTH {
                    return 0;
                }
                (self >> offset) & Self::trailing_mask(len)
            }

            #[inline]
            fn set_bits(&mut self, value: Self, offset: u32, len: u32) {
                let mask = Self::trailing_mask(len) << offset;
                *self = (*self & !mask) | ((value << offset) & mask);
            }
        }
    )*};
}

impl_bit_field!(u8, u16, u32, u64, u128);

/// Sign-extends the low `len` bits of `value` to a full 64-bit value.
#[inline]
pub fn sign_extend(value: u64, len: u32) -> i64 {
    debug_assert!(len > 0 && len <= 64);
    let shift = 64 - len;
    ((value << shift) as i64) >> shift
}
