//! # Tessella
//!
//! A **tiled sparse linear-algebra engine** for Rust with user-defined
//! semirings. Tessella stores sparse vectors and matrices over a fixed
//! set of element types, lazily converts each entity between storage
//! formats on demand, and evaluates an algebra of operations --
//! `mxm`, `vxm`, `mxv`, element-wise add/multiply, reduce, assign,
//! transpose, triangles, map, extract -- under user-supplied binary,
//! unary and select functions.
//!
//! ## Key pieces
//!
//! - **Polymorphic storage** -- every entity holds at most one tile map
//!   per format (Dok/Coo/Dense for vectors, Dok/Lil/Coo/Csr for
//!   matrices, plus device twins) with a validity bitmask; the storage
//!   manager converts along the shortest registered path when an
//!   algorithm asks for a format that is not valid yet.
//! - **Fan-out scheduler** -- expressions are DAGs of operation nodes;
//!   each node fans out one subtask per tile (or per inner tile product
//!   for multiplications, with a second merge stage) on a fixed rayon
//!   worker pool.
//! - **Keyed dispatch** -- algorithms register under string keys built
//!   from the operation name, the op keys of the functions supplied, a
//!   mask suffix and a device-class suffix, so the same algebra works
//!   for any user-defined op; accelerator entries fall back to the CPU
//!   table when the backend cannot serve them.
//!
//! ## Quick start
//!
//! ```no_run
//! use tessella::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let lib = Library::with_defaults()?;
//!
//! let a = Vector::new::<i32>(&lib, 4)?;
//! let b = Vector::new::<i32>(&lib, 4)?;
//! let w = Vector::new::<i32>(&lib, 4)?;
//!
//! exec_v_data_write(&lib, &a, vec![(0, 10), (2, 30)], None)?;
//! exec_v_data_write(&lib, &b, vec![(1, 20), (2, 5)], None)?;
//! exec_v_eadd(&lib, &w, None, &PLUS_I32, &a, &b, None)?;
//!
//! let out = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! exec_v_data_read(&lib, &w, out.clone(), None)?;
//! assert_eq!(*out.lock().unwrap(), vec![(0, 10), (1, 20), (2, 35)]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Building graphs
//!
//! The `exec_*` functions evaluate one operation immediately. For
//! anything larger, build an [`Expression`]: add nodes through the typed
//! factories, wire explicit `dependency` edges, then `submit_wait`.
//! Nodes of the same step run concurrently; all subtasks of a
//! predecessor complete before any subtask of its successors starts.
//!
//! ```no_run
//! use tessella::*;
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! # let lib = Library::with_defaults()?;
//! # let q = Vector::new::<i32>(&lib, 8)?;
//! # let v = Vector::new::<i32>(&lib, 8)?;
//! # let adj = Matrix::new::<i32>(&lib, 8, 8)?;
//! # let depth = Scalar::from_value(&lib, 1i32);
//! let expr = Expression::new(&lib);
//! let assign = expr.assign(&v, Some(&q), None, &depth, None)?;
//! let step = expr.vxm(
//!     &q,
//!     Some(&v),
//!     &MULT_I32,
//!     &PLUS_I32,
//!     &q,
//!     &adj,
//!     Some(Descriptor::new().with(Param::MaskComplement)),
//! )?;
//! expr.dependency(assign, step)?;
//! expr.submit_wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`LibraryConfig`] controls the backend (the software reference
//! accelerator by default), worker count, block size and the message
//! callback. Every factory takes the [`Library`] explicitly -- there is
//! no global state.
//!
//! ## Error model
//!
//! Public entry points return [`anyhow::Result`]; the typed cause is a
//! [`Status`] recoverable via `downcast_ref`. Data errors never panic;
//! an aborted expression records its first failure, readable through
//! [`Expression::failure`].
//!
//! ## Module overview
//!
//! - [`types`] / [`op`] -- element descriptors, user ops, builtin table
//! - [`formats`] -- per-tile storage layouts and conversions
//! - [`storage`] -- the per-entity format state machine
//! - [`blocks`] -- block decomposition arithmetic
//! - [`expression`] -- the operation DAG and `exec_*` adapters
//! - [`schedule`] -- topological steps and subtask fan-out
//! - [`dispatch`] -- key building and the algorithm registry
//! - [`kernels`] -- reduce/merge/mask/scan primitives
//! - [`accel`] -- the accelerator interface and reference backend
//! - [`profiling`] -- per-node timing behind `ProfileTime`

pub mod accel;
pub mod blocks;
pub mod descriptor;
pub mod dispatch;
pub mod expression;
pub mod formats;
pub mod kernels;
pub mod library;
pub mod matrix;
pub mod op;
pub mod profiling;
pub mod scalar;
pub mod status;
pub mod storage;
pub mod types;
pub mod vector;

mod algos;
mod schedule;

// General re-exports
pub use descriptor::{Descriptor, Param};
pub use expression::{ExprNode, ExprState, Expression, NodeOp};
pub use library::{Backend, Library, LibraryConfig, MessageCallback, DEFAULT_BLOCK_SIZE};
pub use matrix::Matrix;
pub use op::{OpBinary, OpSelect, OpUnary};
pub use scalar::Scalar;
pub use status::Status;
pub use types::{Element, Index, TypeInfo, Unit};
pub use vector::Vector;

// Immediate-mode operation surface
pub use expression::{
    exec_m_data_read, exec_m_data_write, exec_m_eadd, exec_m_extract_row, exec_m_reduce_by_row,
    exec_m_reduce_scalar, exec_m_transpose, exec_m_tril, exec_m_triu, exec_mxm, exec_mxmt_masked,
    exec_mxv_masked, exec_v_assign_masked, exec_v_count_nz, exec_v_data_read, exec_v_data_write,
    exec_v_eadd, exec_v_emult, exec_v_map, exec_v_reduce, exec_vxm_masked,
};

// Builtin ops; the full per-type table stays addressable through the
// `op` module, these are the families client code reaches for first.
pub use op::{builtin_binaries, builtin_selects, builtin_unaries};
pub use op::{
    AINV_F32, AINV_F64, AINV_I32, EQZERO_I32, FIRST_F32, FIRST_F64, FIRST_I32, FIRST_I64,
    FIRST_U32, FIRST_U64, GTZERO_I32, IDENTITY_F32, IDENTITY_F64, IDENTITY_I32, IDENTITY_U32,
    MAX_F32, MAX_F64, MAX_I32, MAX_I64, MAX_U32, MAX_U64, MIN_F32, MIN_F64, MIN_I32, MIN_I64,
    MIN_U32, MIN_U64, MULT_F32, MULT_F64, MULT_I32, MULT_I64, MULT_U32, MULT_U64, NQZERO_I32,
    NQZERO_U32, ONE_F32, ONE_I32, ONE_U32, PLUS_F32, PLUS_F64, PLUS_I32, PLUS_I64, PLUS_U32,
    PLUS_U64, SECOND_F32, SECOND_I32, SECOND_U32,
};
