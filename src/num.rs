//! Big-endian integers with alignment 1, for use in `#[repr(C, packed)]` wire structs.

use core::fmt;

macro_rules! be_int {
    ($name:ident: $native:ty) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
        #[repr(transparent)]
        pub(crate) struct $name([u8; core::mem::size_of::<$native>()]);

        impl $name {
            #[inline]
            pub(crate) fn get(self) -> $native {
                <$native>::from_be_bytes(self.0)
            }
        }

        impl From<$native> for $name {
            #[inline]
            fn from(value: $native) -> Self {
                Self(value.to_be_bytes())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.get().fmt(f)
            }
        }
    };
}

be_int!(U16: u16);
be_int!(U32: u32);
