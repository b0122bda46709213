// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub trait FloorLog2 {
    fn floor_log2(&self) -> Self;
}

pub trait CeilLog2 {
    fn ceil_log2(&self) -> Self;
}

macro_rules! impl_log2 {
    ($($ty: ty),*) => {
        $(
            impl FloorLog2 for $ty {
                fn floor_log2(&self) -> Self {
                    debug_assert_ne!(*self, 0);
                    (<$ty>::BITS - 1 - self.leading_zeros()) as $ty
                }
            }

            impl CeilLog2 for $ty {
                fn ceil_log2(&self) -> Self {
                    if *self <= 1 {
                        0
                    } else {
                        (self - 1).floor_log2() + 1
                    }
                }
            }
        )*
    };
}

impl_log2!(u8, u16, u32, u64, usize);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_floor_log2() {
        assert_eq!(1usize.floor_log2(), 0);
        assert_eq!(2usize.floor_log2(), 1);
        assert_eq!(255u32.floor_log2(), 7);
        assert_eq!(256u32.floor_log2(), 8);
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(0usize.ceil_log2(), 0);
        assert_eq!(1usize.ceil_log2(), 0);
        assert_eq!(2usize.ceil_log2(), 1);
        assert_eq!(3usize.ceil_log2(), 2);
        assert_eq!(16usize.ceil_log2(), 4);
        assert_eq!(17u16.ceil_log2(), 5);
        assert_eq!(256usize.ceil_log2(), 8);
    }
}
