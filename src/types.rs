//! Element types and their runtime descriptors.
//!
//! The engine stores values of a fixed set of scalar types (signed and
//! unsigned 8/16/32/64-bit integers, 32/64-bit floats) plus the
//! structure-only [`Unit`] type. Storage tiles, ops and algorithms are
//! generic over [`Element`]; at the expression boundary everything is
//! type-erased behind `dyn Any` and downcast where used, so every closure
//! the crate builds stays typed.
//!
//! [`TypeInfo`] is the runtime descriptor attached to handles and used by
//! node validation and dispatch-key construction. Its one-character `code`
//! is what op keys embed (`plus_iii` is "plus over three i32 slots").

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Local index inside a tile and global row/column index of an entity.
pub type Index = u32;

/// Runtime descriptor of an element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Stable human-readable name ("i32", "f64", "void").
    pub name: &'static str,
    /// One-character code embedded in op keys.
    pub code: char,
    /// Compile-time byte size; 0 for the void type.
    pub byte_size: usize,
    /// False for structure-only entities where only index sets matter.
    pub has_values: bool,
    /// Rust type identity, used to pair erased storage with typed code.
    pub id: TypeId,
}

impl TypeInfo {
    /// Descriptor for `T`.
    pub fn of<T: Element>() -> Self {
        TypeInfo {
            name: T::NAME,
            code: T::CODE,
            byte_size: size_of::<T>(),
            has_values: T::HAS_VALUES,
            id: TypeId::of::<T>(),
        }
    }

    /// True when `value` is actually a `T` matching this descriptor.
    pub fn matches(&self, other: &TypeInfo) -> bool {
        self.id == other.id
    }
}

/// A storable element type.
///
/// Implemented for the builtin scalars and [`Unit`]; the set is closed on
/// purpose -- user extension happens at the op level, not the type level.
pub trait Element:
    Copy + Clone + Debug + Default + PartialEq + Send + Sync + Any + 'static
{
    /// Stable name.
    const NAME: &'static str;
    /// One-character code for op keys.
    const CODE: char;
    /// False only for [`Unit`].
    const HAS_VALUES: bool = true;

    /// Runtime descriptor.
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    /// Append the little-endian encoding of `self` (device buffer layout).
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode one value from exactly `size_of::<Self>()` bytes; `None` on
    /// a length mismatch.
    fn read_le(bytes: &[u8]) -> Option<Self>;
}

/// The void element: zero bytes, structure only.
///
/// A `Vec<Unit>` occupies no memory, so structure-only tiles genuinely
/// omit their value buffers while the format code stays uniform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit;

impl Element for Unit {
    const NAME: &'static str = "void";
    const CODE: char = 'x';
    const HAS_VALUES: bool = false;

    fn write_le(self, _out: &mut Vec<u8>) {}

    fn read_le(bytes: &[u8]) -> Option<Self> {
        bytes.is_empty().then_some(Unit)
    }
}

macro_rules! scalar_elements {
    ($($ty:ty => ($name:literal, $code:literal)),* $(,)?) => {
        $(
            impl Element for $ty {
                const NAME: &'static str = $name;
                const CODE: char = $code;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

scalar_elements! {
    i8  => ("i8", 'c'),
    i16 => ("i16", 's'),
    i32 => ("i32", 'i'),
    i64 => ("i64", 'l'),
    u8  => ("u8", 'y'),
    u16 => ("u16", 'w'),
    u32 => ("u32", 'u'),
    u64 => ("u64", 'q'),
    f32 => ("f32", 'f'),
    f64 => ("f64", 'd'),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_are_distinct_and_sized() {
        let i = TypeInfo::of::<i32>();
        let f = TypeInfo::of::<f32>();
        let v = TypeInfo::of::<Unit>();
        assert_ne!(i.id, f.id);
        assert_eq!(i.byte_size, 4);
        assert_eq!(v.byte_size, 0);
        assert!(!v.has_values);
        assert!(i.matches(&TypeInfo::of::<i32>()));
    }
}
