//! User-supplied functions and the builtin op table.
//!
//! An op is a value: a stable string **key**, a typed host closure, and an
//! optional textual device source fragment. The key is derived from the op
//! name and the one-character type codes of its operands and result
//! (`plus_iii`, `eqzero_f`), and is what the dispatcher concatenates into
//! algorithm lookup keys -- two ops with equal keys are treated as
//! semantically interchangeable.
//!
//! Host closures are stored type-erased (`Arc<dyn Any>`) and downcast by
//! the typed algorithm that consumes them; the factories are generic, so a
//! body that does not fit the declared types cannot be constructed.
//!
//! The builtin table (plus/minus/mult/div/first/second/one/min/max for
//! every numeric type, bit ops for the integers, zero-comparison selects,
//! identity/ainv unaries) is generated from one macro list per type family
//! and pre-registered by the library.

use crate::status::Status;
use crate::types::{Element, TypeInfo};
use paste::paste;
use std::any::Any;
use std::sync::{Arc, LazyLock};

fn op_key(name: &str, codes: &[char]) -> String {
    let mut key = String::with_capacity(name.len() + 1 + codes.len());
    key.push_str(name);
    key.push('_');
    key.extend(codes);
    key
}

struct HostUnary<A, R>(Arc<dyn Fn(A) -> R + Send + Sync>);
struct HostBinary<A, B, R>(Arc<dyn Fn(A, B) -> R + Send + Sync>);
struct HostSelect<T>(Arc<dyn Fn(T) -> bool + Send + Sync>);

macro_rules! op_common {
    ($op:ident) => {
        impl $op {
            /// Op name as given to the factory.
            pub fn name(&self) -> &str {
                &self.name
            }

            /// Stable key (`name` + operand/result type codes).
            pub fn key(&self) -> &str {
                &self.key
            }

            /// Textual device kernel fragment, when one was supplied.
            pub fn device_source(&self) -> Option<&str> {
                self.device.as_deref()
            }
        }

        impl PartialEq for $op {
            fn eq(&self, other: &Self) -> bool {
                self.key == other.key
            }
        }

        impl std::fmt::Debug for $op {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($op)).field("key", &self.key).finish()
            }
        }
    };
}

/// A unary function `A -> R`.
#[derive(Clone)]
pub struct OpUnary {
    name: String,
    key: String,
    a: TypeInfo,
    r: TypeInfo,
    host: Arc<dyn Any + Send + Sync>,
    device: Option<String>,
}

op_common!(OpUnary);

impl OpUnary {
    /// Build a unary op from a typed host body.
    pub fn make<A: Element, R: Element>(
        name: &str,
        host: impl Fn(A) -> R + Send + Sync + 'static,
        device: Option<&str>,
    ) -> Self {
        let a = TypeInfo::of::<A>();
        let r = TypeInfo::of::<R>();
        OpUnary {
            key: op_key(name, &[a.code, r.code]),
            name: name.to_string(),
            a,
            r,
            host: Arc::new(HostUnary::<A, R>(Arc::new(host))),
            device: device.map(str::to_string),
        }
    }

    /// Operand type descriptor.
    pub fn arg_type(&self) -> TypeInfo {
        self.a
    }

    /// Result type descriptor.
    pub fn result_type(&self) -> TypeInfo {
        self.r
    }

    /// Typed view of the host body; `InvalidArgument` when the requested
    /// types do not match the op.
    pub fn host<A: Element, R: Element>(
        &self,
    ) -> Result<Arc<dyn Fn(A) -> R + Send + Sync>, Status> {
        self.host
            .downcast_ref::<HostUnary<A, R>>()
            .map(|h| Arc::clone(&h.0))
            .ok_or(Status::InvalidArgument)
    }
}

/// A binary function `(A, B) -> R`.
#[derive(Clone)]
pub struct OpBinary {
    name: String,
    key: String,
    a: TypeInfo,
    b: TypeInfo,
    r: TypeInfo,
    host: Arc<dyn Any + Send + Sync>,
    device: Option<String>,
}

op_common!(OpBinary);

impl OpBinary {
    /// Build a binary op from a typed host body.
    pub fn make<A: Element, B: Element, R: Element>(
        name: &str,
        host: impl Fn(A, B) -> R + Send + Sync + 'static,
        device: Option<&str>,
    ) -> Self {
        let a = TypeInfo::of::<A>();
        let b = TypeInfo::of::<B>();
        let r = TypeInfo::of::<R>();
        OpBinary {
            key: op_key(name, &[a.code, b.code, r.code]),
            name: name.to_string(),
            a,
            b,
            r,
            host: Arc::new(HostBinary::<A, B, R>(Arc::new(host))),
            device: device.map(str::to_string),
        }
    }

    /// First operand type descriptor.
    pub fn arg0_type(&self) -> TypeInfo {
        self.a
    }

    /// Second operand type descriptor.
    pub fn arg1_type(&self) -> TypeInfo {
        self.b
    }

    /// Result type descriptor.
    pub fn result_type(&self) -> TypeInfo {
        self.r
    }

    /// Typed view of the host body.
    pub fn host<A: Element, B: Element, R: Element>(
        &self,
    ) -> Result<Arc<dyn Fn(A, B) -> R + Send + Sync>, Status> {
        self.host
            .downcast_ref::<HostBinary<A, B, R>>()
            .map(|h| Arc::clone(&h.0))
            .ok_or(Status::InvalidArgument)
    }

    /// Monomorphic shortcut for the common `(T, T) -> T` case.
    pub fn host_same<T: Element>(&self) -> Result<Arc<dyn Fn(T, T) -> T + Send + Sync>, Status> {
        self.host::<T, T, T>()
    }
}

/// A selection predicate `T -> bool`.
#[derive(Clone)]
pub struct OpSelect {
    name: String,
    key: String,
    a: TypeInfo,
    host: Arc<dyn Any + Send + Sync>,
    device: Option<String>,
}

op_common!(OpSelect);

impl OpSelect {
    /// Build a select op from a typed host predicate.
    pub fn make<T: Element>(
        name: &str,
        host: impl Fn(T) -> bool + Send + Sync + 'static,
        device: Option<&str>,
    ) -> Self {
        let a = TypeInfo::of::<T>();
        OpSelect {
            key: op_key(name, &[a.code]),
            name: name.to_string(),
            a,
            host: Arc::new(HostSelect::<T>(Arc::new(host))),
            device: device.map(str::to_string),
        }
    }

    /// Operand type descriptor.
    pub fn arg_type(&self) -> TypeInfo {
        self.a
    }

    /// Typed view of the host predicate.
    pub fn host<T: Element>(&self) -> Result<Arc<dyn Fn(T) -> bool + Send + Sync>, Status> {
        self.host
            .downcast_ref::<HostSelect<T>>()
            .map(|h| Arc::clone(&h.0))
            .ok_or(Status::InvalidArgument)
    }
}

// ---------------------------------------------------------------------------
// Builtin table.
//
// One macro call per type family, mirroring the per-type instantiation of
// the op table in one place. `ONE` discards both operands; division keeps
// the raw operator semantics of the element type.
// ---------------------------------------------------------------------------

macro_rules! decl_numeric_ops {
    ($ty:ty => $suf:ident) => {
        paste! {
            pub static [<PLUS_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("plus", |a, b| a + b, Some("(a + b)"))
            });
            pub static [<MINUS_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("minus", |a, b| a - b, Some("(a - b)"))
            });
            pub static [<MULT_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("mult", |a, b| a * b, Some("(a * b)"))
            });
            pub static [<DIV_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("div", |a, b| a / b, Some("(a / b)"))
            });
            pub static [<FIRST_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("first", |a, _b| a, Some("(a)"))
            });
            pub static [<SECOND_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("second", |_a, b| b, Some("(b)"))
            });
            pub static [<ONE_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("one", |_a, _b| 1 as $ty, Some("(1)"))
            });
            pub static [<MIN_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("min", |a: $ty, b: $ty| a.min(b), Some("min(a, b)"))
            });
            pub static [<MAX_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("max", |a: $ty, b: $ty| a.max(b), Some("max(a, b)"))
            });

            pub static [<EQZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("eqzero", |a| a == 0 as $ty, Some("(a == 0)"))
            });
            pub static [<NQZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("nqzero", |a| a != 0 as $ty, Some("(a != 0)"))
            });
            pub static [<GTZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("gtzero", |a| a > 0 as $ty, Some("(a > 0)"))
            });
            pub static [<GEZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("gezero", |a| a >= 0 as $ty, Some("(a >= 0)"))
            });
            pub static [<LTZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("ltzero", |a| a < 0 as $ty, Some("(a < 0)"))
            });
            pub static [<LEZERO_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("lezero", |a| a <= 0 as $ty, Some("(a <= 0)"))
            });
            pub static [<ALWAYS_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("always", |_a| true, Some("(true)"))
            });
            pub static [<NEVER_ $suf>]: LazyLock<OpSelect> = LazyLock::new(|| {
                OpSelect::make::<$ty>("never", |_a| false, Some("(false)"))
            });

            pub static [<IDENTITY_ $suf>]: LazyLock<OpUnary> = LazyLock::new(|| {
                OpUnary::make::<$ty, $ty>("identity", |a| a, Some("(a)"))
            });
        }
    };
}

macro_rules! decl_integer_ops {
    ($ty:ty => $suf:ident) => {
        paste! {
            pub static [<BOR_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("bor", |a, b| a | b, Some("(a | b)"))
            });
            pub static [<BAND_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("band", |a, b| a & b, Some("(a & b)"))
            });
            pub static [<BXOR_ $suf>]: LazyLock<OpBinary> = LazyLock::new(|| {
                OpBinary::make::<$ty, $ty, $ty>("bxor", |a, b| a ^ b, Some("(a ^ b)"))
            });
        }
    };
}

macro_rules! decl_signed_ops {
    ($ty:ty => $suf:ident) => {
        paste! {
            pub static [<AINV_ $suf>]: LazyLock<OpUnary> = LazyLock::new(|| {
                OpUnary::make::<$ty, $ty>("ainv", |a: $ty| -a, Some("(-a)"))
            });
        }
    };
}

decl_numeric_ops!(i8 => I8);
decl_numeric_ops!(i16 => I16);
decl_numeric_ops!(i32 => I32);
decl_numeric_ops!(i64 => I64);
decl_numeric_ops!(u8 => U8);
decl_numeric_ops!(u16 => U16);
decl_numeric_ops!(u32 => U32);
decl_numeric_ops!(u64 => U64);
decl_numeric_ops!(f32 => F32);
decl_numeric_ops!(f64 => F64);

decl_integer_ops!(i8 => I8);
decl_integer_ops!(i16 => I16);
decl_integer_ops!(i32 => I32);
decl_integer_ops!(i64 => I64);
decl_integer_ops!(u8 => U8);
decl_integer_ops!(u16 => U16);
decl_integer_ops!(u32 => U32);
decl_integer_ops!(u64 => U64);

decl_signed_ops!(i8 => I8);
decl_signed_ops!(i16 => I16);
decl_signed_ops!(i32 => I32);
decl_signed_ops!(i64 => I64);
decl_signed_ops!(f32 => F32);
decl_signed_ops!(f64 => F64);

macro_rules! collect_one {
    ($v:ident; [$($suf:ident),*]; $base:ident) => {
        paste! { $( $v.push([<$base _ $suf>].clone()); )* }
    };
}

macro_rules! collect_all {
    ($v:ident; [$($suf:ident),*]; ) => {};
    ($v:ident; [$($suf:ident),*]; $base:ident $(, $rest:ident)*) => {
        collect_one!($v; [$($suf),*]; $base);
        collect_all!($v; [$($suf),*]; $($rest),*);
    };
}

/// Every pre-registered binary op, in registration order.
pub fn builtin_binaries() -> &'static [OpBinary] {
    static ALL: LazyLock<Vec<OpBinary>> = LazyLock::new(|| {
        let mut v = Vec::new();
        collect_all!(v; [I8, I16, I32, I64, U8, U16, U32, U64, F32, F64];
            PLUS, MINUS, MULT, DIV, FIRST, SECOND, ONE, MIN, MAX);
        collect_all!(v; [I8, I16, I32, I64, U8, U16, U32, U64]; BOR, BAND, BXOR);
        v
    });
    &ALL
}

/// Every pre-registered select op.
pub fn builtin_selects() -> &'static [OpSelect] {
    static ALL: LazyLock<Vec<OpSelect>> = LazyLock::new(|| {
        let mut v = Vec::new();
        collect_all!(v; [I8, I16, I32, I64, U8, U16, U32, U64, F32, F64];
            EQZERO, NQZERO, GTZERO, GEZERO, LTZERO, LEZERO, ALWAYS, NEVER);
        v
    });
    &ALL
}

/// Every pre-registered unary op.
pub fn builtin_unaries() -> &'static [OpUnary] {
    static ALL: LazyLock<Vec<OpUnary>> = LazyLock::new(|| {
        let mut v = Vec::new();
        collect_all!(v; [I8, I16, I32, I64, U8, U16, U32, U64, F32, F64]; IDENTITY);
        collect_all!(v; [I8, I16, I32, I64, F32, F64]; AINV);
        v
    });
    &ALL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_type_codes() {
        assert_eq!(PLUS_I32.key(), "plus_iii");
        assert_eq!(MIN_F64.key(), "min_ddd");
        assert_eq!(NQZERO_U32.key(), "nqzero_u");
        assert_eq!(IDENTITY_I8.key(), "identity_cc");
    }

    #[test]
    fn host_body_downcasts_at_matching_types_only() {
        let add = PLUS_I32.host_same::<i32>().unwrap();
        assert_eq!(add(2, 3), 5);
        assert!(PLUS_I32.host_same::<f32>().is_err());
    }
}
