//! Concrete per-tile storage layouts.
//!
//! Vectors know three CPU formats (Dok, Coo, Dense) plus two accelerator
//! twins; matrices know four CPU formats (Dok, Lil, Coo, Csr) plus two
//! twins. Every format exposes construct-empty, resize, clear and a
//! `values` count, and each pair of CPU formats of the same entity kind
//! has a single-purpose, total conversion.
//!
//! Canonical order: CooVec is sorted by index with no duplicates; Coo is
//! lexicographically sorted by (row, col); Csr has a non-decreasing `ap`
//! and strictly increasing column indices per row; Lil inner lists are
//! strictly increasing. Dok tiles are order-irrelevant. DenseVec treats
//! entries equal to the fill value as absent.

pub mod acc;
pub mod coo;
pub mod coo_vec;
pub mod csr;
pub mod dense_vec;
pub mod dok;
pub mod dok_vec;
pub mod lil;

pub use acc::{AccCoo, AccCooVec, AccCsr, AccDenseVec};
pub use coo::Coo;
pub use coo_vec::CooVec;
pub use csr::Csr;
pub use dense_vec::DenseVec;
pub use dok::Dok;
pub use dok_vec::DokVec;
pub use lil::Lil;

/// Vector tile format codes, the storage manager's state space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VecFormat {
    Dok,
    Coo,
    Dense,
    AccCoo,
    AccDense,
}

impl VecFormat {
    /// Number of vector formats.
    pub const COUNT: usize = 5;

    /// Integer format code.
    pub fn code(self) -> usize {
        match self {
            VecFormat::Dok => 0,
            VecFormat::Coo => 1,
            VecFormat::Dense => 2,
            VecFormat::AccCoo => 3,
            VecFormat::AccDense => 4,
        }
    }

    /// Format for a code, if in range.
    pub fn from_code(code: usize) -> Option<Self> {
        match code {
            0 => Some(VecFormat::Dok),
            1 => Some(VecFormat::Coo),
            2 => Some(VecFormat::Dense),
            3 => Some(VecFormat::AccCoo),
            4 => Some(VecFormat::AccDense),
            _ => None,
        }
    }
}

/// Matrix tile format codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatFormat {
    Dok,
    Lil,
    Coo,
    Csr,
    AccCoo,
    AccCsr,
}

impl MatFormat {
    /// Number of matrix formats.
    pub const COUNT: usize = 6;

    /// Integer format code.
    pub fn code(self) -> usize {
        match self {
            MatFormat::Dok => 0,
            MatFormat::Lil => 1,
            MatFormat::Coo => 2,
            MatFormat::Csr => 3,
            MatFormat::AccCoo => 4,
            MatFormat::AccCsr => 5,
        }
    }

    /// Format for a code, if in range.
    pub fn from_code(code: usize) -> Option<Self> {
        match code {
            0 => Some(MatFormat::Dok),
            1 => Some(MatFormat::Lil),
            2 => Some(MatFormat::Coo),
            3 => Some(MatFormat::Csr),
            4 => Some(MatFormat::AccCoo),
            5 => Some(MatFormat::AccCsr),
            _ => None,
        }
    }
}
