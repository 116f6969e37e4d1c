//! The user-visible operation DAG.
//!
//! An [`Expression`] collects operation nodes and explicit dependency
//! edges, then hands the whole graph to the scheduler on
//! [`Expression::submit_wait`]. Nodes are a tagged enum ([`NodeOp`])
//! carrying shared-ownership handles to their argument entities; arity,
//! dimension and type constraints are checked when the node is created,
//! so an invalid `make_node` leaves the expression untouched.
//!
//! States move `Default → Submitted → (Evaluated | Aborted)`; the graph
//! freezes at submission. For one-shot use the `exec_*` free functions
//! build a single-node expression and submit it immediately.

use crate::descriptor::{Descriptor, Param};
use crate::library::Library;
use crate::matrix::Matrix;
use crate::op::{OpBinary, OpUnary};
use crate::scalar::Scalar;
use crate::status::Status;
use crate::types::{Element, Index, TypeInfo};
use crate::vector::Vector;
use anyhow::Result;
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Lifecycle of an [`Expression`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprState {
    Default,
    Submitted,
    Evaluated,
    Aborted,
}

/// One operation with its argument handles.
///
/// The scheduler dispatches on this tag; the deep node-class hierarchy of
/// the original maps onto plain variants.
#[derive(Clone)]
pub enum NodeOp {
    /// Populate a vector from host `(index, value)` pairs.
    VDataWrite { x: Vector, data: Arc<dyn Any + Send + Sync> },
    /// Read a vector back into a host buffer of `(index, value)` pairs.
    VDataRead { x: Vector, out: Arc<dyn Any + Send + Sync> },
    /// Populate a matrix from host `(row, col, value)` triples.
    MDataWrite { x: Matrix, data: Arc<dyn Any + Send + Sync> },
    /// Read a matrix back into a host buffer of triples.
    MDataRead { x: Matrix, out: Arc<dyn Any + Send + Sync> },

    /// `w = a ⊕ b` over vectors.
    VEwiseAdd { w: Vector, mask: Option<Vector>, op: OpBinary, a: Vector, b: Vector },
    /// `w = a ⊗ b` over vectors (structural intersection).
    VEwiseMult { w: Vector, mask: Option<Vector>, op: OpBinary, a: Vector, b: Vector },
    /// `w = a ⊕ b` over matrices.
    MEwiseAdd { w: Matrix, mask: Option<Matrix>, op: OpBinary, a: Matrix, b: Matrix },

    /// `w[i] = value` where the mask selects `i`.
    VAssign { w: Vector, mask: Option<Vector>, accum: Option<OpBinary>, value: Scalar },
    /// `s = Σ v` over a vector.
    VReduce { s: Scalar, mask: Option<Vector>, accum: Option<OpBinary>, op: OpBinary, v: Vector },
    /// `s = Σ m` over a matrix.
    MReduceScalar {
        s: Scalar,
        mask: Option<Matrix>,
        accum: Option<OpBinary>,
        op: OpBinary,
        m: Matrix,
    },
    /// `v[i] = Σⱼ m[i,j]`.
    MReduceByRow { v: Vector, m: Matrix, op: OpBinary, init: Option<Scalar> },
    /// Count of stored entries, into a `u32` scalar.
    VCountNz { s: Scalar, v: Vector },

    /// `w = a × b` over a `(mult, add)` semiring.
    MxM { w: Matrix, mask: Option<Matrix>, mult: OpBinary, add: OpBinary, a: Matrix, b: Matrix },
    /// `w = a × bᵀ` over a `(mult, add)` semiring.
    MxMT { w: Matrix, mask: Option<Matrix>, mult: OpBinary, add: OpBinary, a: Matrix, b: Matrix },
    /// `w = v × m`.
    VxM { w: Vector, mask: Option<Vector>, mult: OpBinary, add: OpBinary, v: Vector, m: Matrix },
    /// `w = m × v`.
    MxV { w: Vector, mask: Option<Vector>, mult: OpBinary, add: OpBinary, m: Matrix, v: Vector },

    /// `w = aᵀ`.
    MTranspose { w: Matrix, mask: Option<Matrix>, accum: Option<OpBinary>, a: Matrix },
    /// Strict lower triangle.
    MTril { w: Matrix, a: Matrix },
    /// Strict upper triangle.
    MTriu { w: Matrix, a: Matrix },

    /// `w = f(v)` element-wise.
    VMap { w: Vector, v: Vector, op: OpUnary },
    /// `r = f(m[i, :])`.
    MExtractRow { r: Vector, m: Matrix, op: OpUnary, index: Index },
}

fn require(cond: bool) -> Result<(), Status> {
    if cond { Ok(()) } else { Err(Status::InvalidArgument) }
}

fn same_type(a: TypeInfo, b: TypeInfo) -> Result<(), Status> {
    require(a.matches(&b))
}

fn binary_over(op: &OpBinary, t: TypeInfo) -> Result<(), Status> {
    same_type(op.arg0_type(), t)?;
    same_type(op.arg1_type(), t)?;
    same_type(op.result_type(), t)
}

impl NodeOp {
    /// Operation name; the first component of the dispatch key.
    pub fn name(&self) -> &'static str {
        match self {
            NodeOp::VDataWrite { .. } => "v_data_write",
            NodeOp::VDataRead { .. } => "v_data_read",
            NodeOp::MDataWrite { .. } => "m_data_write",
            NodeOp::MDataRead { .. } => "m_data_read",
            NodeOp::VEwiseAdd { .. } => "v_eadd",
            NodeOp::VEwiseMult { .. } => "v_emult",
            NodeOp::MEwiseAdd { .. } => "m_eadd",
            NodeOp::VAssign { .. } => "v_assign_masked",
            NodeOp::VReduce { .. } => "v_reduce",
            NodeOp::MReduceScalar { .. } => "m_reduce_scalar",
            NodeOp::MReduceByRow { .. } => "m_reduce_by_row",
            NodeOp::VCountNz { .. } => "v_count_nz",
            NodeOp::MxM { .. } => "mxm",
            NodeOp::MxMT { .. } => "mxmt",
            NodeOp::VxM { .. } => "vxm",
            NodeOp::MxV { .. } => "mxv",
            NodeOp::MTranspose { .. } => "m_transpose",
            NodeOp::MTril { .. } => "m_tril",
            NodeOp::MTriu { .. } => "m_triu",
            NodeOp::VMap { .. } => "v_map",
            NodeOp::MExtractRow { .. } => "m_extract_row",
        }
    }

    /// Keys of the required op arguments, in order.
    pub fn op_keys(&self) -> Vec<&str> {
        match self {
            NodeOp::VEwiseAdd { op, .. }
            | NodeOp::VEwiseMult { op, .. }
            | NodeOp::MEwiseAdd { op, .. }
            | NodeOp::VReduce { op, .. }
            | NodeOp::MReduceScalar { op, .. }
            | NodeOp::MReduceByRow { op, .. } => vec![op.key()],
            NodeOp::MxM { mult, add, .. }
            | NodeOp::MxMT { mult, add, .. }
            | NodeOp::VxM { mult, add, .. }
            | NodeOp::MxV { mult, add, .. } => vec![mult.key(), add.key()],
            NodeOp::VMap { op, .. } | NodeOp::MExtractRow { op, .. } => vec![op.key()],
            _ => Vec::new(),
        }
    }

    /// Whether the operation understands a mask (its key then carries a
    /// `_md`/`_mc` suffix).
    pub fn maskable(&self) -> bool {
        matches!(
            self,
            NodeOp::VEwiseAdd { .. }
                | NodeOp::VEwiseMult { .. }
                | NodeOp::MEwiseAdd { .. }
                | NodeOp::VAssign { .. }
                | NodeOp::VReduce { .. }
                | NodeOp::MReduceScalar { .. }
                | NodeOp::MxM { .. }
                | NodeOp::MxMT { .. }
                | NodeOp::VxM { .. }
                | NodeOp::MxV { .. }
                | NodeOp::MTranspose { .. }
        )
    }

    /// Element type code of the node's principal entity; keys of ops with
    /// no required op argument embed it as a `_t<code>` tag.
    pub fn type_code(&self) -> char {
        match self {
            NodeOp::VDataWrite { x, .. } | NodeOp::VDataRead { x, .. } => x.type_info().code,
            NodeOp::MDataWrite { x, .. } | NodeOp::MDataRead { x, .. } => x.type_info().code,
            NodeOp::VEwiseAdd { w, .. } | NodeOp::VEwiseMult { w, .. } => w.type_info().code,
            NodeOp::MEwiseAdd { w, .. } => w.type_info().code,
            NodeOp::VAssign { w, .. } => w.type_info().code,
            NodeOp::VReduce { v, .. } => v.type_info().code,
            NodeOp::MReduceScalar { m, .. } => m.type_info().code,
            NodeOp::MReduceByRow { m, .. } => m.type_info().code,
            NodeOp::VCountNz { v, .. } => v.type_info().code,
            NodeOp::MxM { w, .. } | NodeOp::MxMT { w, .. } => w.type_info().code,
            NodeOp::VxM { w, .. } | NodeOp::MxV { w, .. } => w.type_info().code,
            NodeOp::MTranspose { w, .. } => w.type_info().code,
            NodeOp::MTril { w, .. } | NodeOp::MTriu { w, .. } => w.type_info().code,
            NodeOp::VMap { v, .. } => v.type_info().code,
            NodeOp::MExtractRow { m, .. } => m.type_info().code,
        }
    }

    /// The optional accum op, for the shared accum-descriptor check.
    pub fn accum(&self) -> Option<&OpBinary> {
        match self {
            NodeOp::VAssign { accum, .. }
            | NodeOp::VReduce { accum, .. }
            | NodeOp::MReduceScalar { accum, .. }
            | NodeOp::MTranspose { accum, .. } => accum.as_ref(),
            _ => None,
        }
    }

    fn validate(&self, desc: &Descriptor) -> Result<(), Status> {
        match self {
            NodeOp::VDataWrite { .. }
            | NodeOp::VDataRead { .. }
            | NodeOp::MDataWrite { .. }
            | NodeOp::MDataRead { .. } => Ok(()),
            NodeOp::VEwiseAdd { w, mask, op, a, b } | NodeOp::VEwiseMult { w, mask, op, a, b } => {
                let t = w.type_info();
                same_type(a.type_info(), t)?;
                same_type(b.type_info(), t)?;
                binary_over(op, t)?;
                require(w.n_rows() == a.n_rows() && w.n_rows() == b.n_rows())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows())?;
                }
                Ok(())
            }
            NodeOp::MEwiseAdd { w, mask, op, a, b } => {
                let t = w.type_info();
                same_type(a.type_info(), t)?;
                same_type(b.type_info(), t)?;
                binary_over(op, t)?;
                require(w.n_rows() == a.n_rows() && w.n_cols() == a.n_cols())?;
                require(w.n_rows() == b.n_rows() && w.n_cols() == b.n_cols())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows() && mask.n_cols() == w.n_cols())?;
                }
                Ok(())
            }
            NodeOp::VAssign { w, mask, accum, value } => {
                let t = w.type_info();
                same_type(value.type_info(), t)?;
                if let Some(accum) = accum {
                    binary_over(accum, t)?;
                }
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows())?;
                }
                Ok(())
            }
            NodeOp::VReduce { s, mask, accum, op, v } => {
                let t = v.type_info();
                same_type(s.type_info(), t)?;
                binary_over(op, t)?;
                if let Some(accum) = accum {
                    binary_over(accum, t)?;
                }
                if let Some(mask) = mask {
                    require(mask.n_rows() == v.n_rows())?;
                }
                Ok(())
            }
            NodeOp::MReduceScalar { s, mask, accum, op, m } => {
                let t = m.type_info();
                same_type(s.type_info(), t)?;
                binary_over(op, t)?;
                if let Some(accum) = accum {
                    binary_over(accum, t)?;
                }
                if let Some(mask) = mask {
                    require(mask.n_rows() == m.n_rows() && mask.n_cols() == m.n_cols())?;
                }
                Ok(())
            }
            NodeOp::MReduceByRow { v, m, op, init } => {
                let t = m.type_info();
                same_type(v.type_info(), t)?;
                binary_over(op, t)?;
                require(v.n_rows() == m.n_rows())?;
                if let Some(init) = init {
                    same_type(init.type_info(), t)?;
                }
                Ok(())
            }
            NodeOp::VCountNz { s, .. } => same_type(s.type_info(), TypeInfo::of::<u32>()),
            NodeOp::MxM { w, mask, mult, add, a, b } => {
                let t = w.type_info();
                same_type(a.type_info(), t)?;
                same_type(b.type_info(), t)?;
                binary_over(mult, t)?;
                binary_over(add, t)?;
                // Dimension checks see the logically transposed shapes.
                let (ar, ac) = if desc.is_set(Param::TransposeArg1) {
                    (a.n_cols(), a.n_rows())
                } else {
                    (a.n_rows(), a.n_cols())
                };
                let (br, bc) = if desc.is_set(Param::TransposeArg2) {
                    (b.n_cols(), b.n_rows())
                } else {
                    (b.n_rows(), b.n_cols())
                };
                require(ac == br)?;
                require(w.n_rows() == ar && w.n_cols() == bc)?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows() && mask.n_cols() == w.n_cols())?;
                }
                Ok(())
            }
            NodeOp::MxMT { w, mask, mult, add, a, b } => {
                let t = w.type_info();
                same_type(a.type_info(), t)?;
                same_type(b.type_info(), t)?;
                binary_over(mult, t)?;
                binary_over(add, t)?;
                require(a.n_cols() == b.n_cols())?;
                require(w.n_rows() == a.n_rows() && w.n_cols() == b.n_rows())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows() && mask.n_cols() == w.n_cols())?;
                }
                Ok(())
            }
            NodeOp::VxM { w, mask, mult, add, v, m } => {
                let t = w.type_info();
                same_type(v.type_info(), t)?;
                same_type(m.type_info(), t)?;
                binary_over(mult, t)?;
                binary_over(add, t)?;
                require(v.n_rows() == m.n_rows())?;
                require(w.n_rows() == m.n_cols())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows())?;
                }
                Ok(())
            }
            NodeOp::MxV { w, mask, mult, add, m, v } => {
                let t = w.type_info();
                same_type(v.type_info(), t)?;
                same_type(m.type_info(), t)?;
                binary_over(mult, t)?;
                binary_over(add, t)?;
                require(v.n_rows() == m.n_cols())?;
                require(w.n_rows() == m.n_rows())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows())?;
                }
                Ok(())
            }
            NodeOp::MTranspose { w, mask, accum, a } => {
                let t = w.type_info();
                same_type(a.type_info(), t)?;
                if let Some(accum) = accum {
                    binary_over(accum, t)?;
                }
                require(w.n_rows() == a.n_cols() && w.n_cols() == a.n_rows())?;
                if let Some(mask) = mask {
                    require(mask.n_rows() == w.n_rows() && mask.n_cols() == w.n_cols())?;
                }
                Ok(())
            }
            NodeOp::MTril { w, a } | NodeOp::MTriu { w, a } => {
                same_type(w.type_info(), a.type_info())?;
                require(w.n_rows() == a.n_rows() && w.n_cols() == a.n_cols())
            }
            NodeOp::VMap { w, v, op } => {
                same_type(op.arg_type(), v.type_info())?;
                same_type(op.result_type(), w.type_info())?;
                require(w.n_rows() == v.n_rows())
            }
            NodeOp::MExtractRow { r, m, op, index } => {
                same_type(op.arg_type(), m.type_info())?;
                same_type(op.result_type(), r.type_info())?;
                require(*index < m.n_rows())?;
                require(r.n_rows() == m.n_cols())
            }
        }
    }
}

/// A node frozen into an expression.
#[derive(Clone)]
pub struct ExprNode {
    /// Position inside the owning expression.
    pub index: usize,
    pub op: NodeOp,
    pub desc: Descriptor,
    pub preds: Vec<usize>,
    pub succs: Vec<usize>,
}

struct ExprInner {
    lib: Library,
    state: Mutex<ExprState>,
    nodes: Mutex<Vec<ExprNode>>,
    failure: Mutex<Option<Status>>,
}

/// A DAG of operation nodes submitted as a unit.
#[derive(Clone)]
pub struct Expression {
    inner: Arc<ExprInner>,
}

impl Expression {
    /// Empty expression bound to `lib`.
    pub fn new(lib: &Library) -> Expression {
        Expression {
            inner: Arc::new(ExprInner {
                lib: lib.clone(),
                state: Mutex::new(ExprState::Default),
                nodes: Mutex::new(Vec::new()),
                failure: Mutex::new(None),
            }),
        }
    }

    /// Owning library.
    pub fn library(&self) -> &Library {
        &self.inner.lib
    }

    /// Current lifecycle state; callable from any thread.
    pub fn state(&self) -> ExprState {
        *self.inner.state.lock().unwrap()
    }

    /// Failure cause after an abort.
    pub fn failure(&self) -> Option<Status> {
        *self.inner.failure.lock().unwrap()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.inner.nodes.lock().unwrap().len()
    }

    /// True when no nodes were added yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a validated node; returns its index. Errors leave the
    /// expression untouched.
    pub fn make_node(&self, op: NodeOp, desc: Descriptor) -> Result<usize> {
        if self.state() != ExprState::Default {
            return Err(Status::InvalidState.into());
        }
        op.validate(&desc)?;
        if desc.is_set(Param::AccumResult) && op.accum().is_none() {
            return Err(Status::InvalidArgument.into());
        }
        let mut nodes = self.inner.nodes.lock().unwrap();
        let index = nodes.len();
        nodes.push(ExprNode { index, op, desc, preds: Vec::new(), succs: Vec::new() });
        Ok(index)
    }

    /// Insert a dependency edge `pred → succ` between two nodes of this
    /// expression.
    pub fn dependency(&self, pred: usize, succ: usize) -> Result<()> {
        if self.state() != ExprState::Default {
            return Err(Status::InvalidState.into());
        }
        let mut nodes = self.inner.nodes.lock().unwrap();
        if pred == succ || pred >= nodes.len() || succ >= nodes.len() {
            return Err(Status::InvalidArgument.into());
        }
        nodes[pred].succs.push(succ);
        nodes[succ].preds.push(pred);
        Ok(())
    }

    /// Submit the DAG and block until it evaluated or aborted.
    pub fn submit_wait(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != ExprState::Default {
                return Err(Status::InvalidState.into());
            }
            *state = ExprState::Submitted;
        }
        match crate::schedule::submit(self) {
            Ok(()) => {
                *self.inner.state.lock().unwrap() = ExprState::Evaluated;
                Ok(())
            }
            Err(status) => {
                self.inner.failure.lock().unwrap().replace(status);
                *self.inner.state.lock().unwrap() = ExprState::Aborted;
                crate::lib_log!(self.inner.lib, status, "expression aborted");
                Err(status.into())
            }
        }
    }

    pub(crate) fn nodes_snapshot(&self) -> Vec<ExprNode> {
        self.inner.nodes.lock().unwrap().clone()
    }

    // -- typed node factories -------------------------------------------

    /// `x ← host data` (vector).
    pub fn data_write<T: Element>(
        &self,
        x: &Vector,
        data: Vec<(Index, T)>,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        same_type(x.type_info(), TypeInfo::of::<T>())?;
        self.make_node(
            NodeOp::VDataWrite { x: x.clone(), data: Arc::new(data) },
            desc.unwrap_or_default(),
        )
    }

    /// `host buffer ← x` (vector), global indices in canonical order.
    pub fn data_read<T: Element>(
        &self,
        x: &Vector,
        out: Arc<Mutex<Vec<(Index, T)>>>,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        same_type(x.type_info(), TypeInfo::of::<T>())?;
        self.make_node(
            NodeOp::VDataRead { x: x.clone(), out },
            desc.unwrap_or_default(),
        )
    }

    /// `x ← host data` (matrix).
    pub fn m_data_write<T: Element>(
        &self,
        x: &Matrix,
        data: Vec<(Index, Index, T)>,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        same_type(x.type_info(), TypeInfo::of::<T>())?;
        self.make_node(
            NodeOp::MDataWrite { x: x.clone(), data: Arc::new(data) },
            desc.unwrap_or_default(),
        )
    }

    /// `host buffer ← x` (matrix), triples in canonical order.
    pub fn m_data_read<T: Element>(
        &self,
        x: &Matrix,
        out: Arc<Mutex<Vec<(Index, Index, T)>>>,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        same_type(x.type_info(), TypeInfo::of::<T>())?;
        self.make_node(
            NodeOp::MDataRead { x: x.clone(), out },
            desc.unwrap_or_default(),
        )
    }

    /// `w = a ⊕ b`.
    pub fn ewise_add(
        &self,
        w: &Vector,
        mask: Option<&Vector>,
        op: &OpBinary,
        a: &Vector,
        b: &Vector,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VEwiseAdd {
                w: w.clone(),
                mask: mask.cloned(),
                op: op.clone(),
                a: a.clone(),
                b: b.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = a ⊗ b`.
    pub fn ewise_mult(
        &self,
        w: &Vector,
        mask: Option<&Vector>,
        op: &OpBinary,
        a: &Vector,
        b: &Vector,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VEwiseMult {
                w: w.clone(),
                mask: mask.cloned(),
                op: op.clone(),
                a: a.clone(),
                b: b.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = a ⊕ b` over matrices.
    pub fn m_ewise_add(
        &self,
        w: &Matrix,
        mask: Option<&Matrix>,
        op: &OpBinary,
        a: &Matrix,
        b: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MEwiseAdd {
                w: w.clone(),
                mask: mask.cloned(),
                op: op.clone(),
                a: a.clone(),
                b: b.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w[i] = value` where the mask selects `i`.
    pub fn assign(
        &self,
        w: &Vector,
        mask: Option<&Vector>,
        accum: Option<&OpBinary>,
        value: &Scalar,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VAssign {
                w: w.clone(),
                mask: mask.cloned(),
                accum: accum.cloned(),
                value: value.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `s = Σ v`.
    pub fn reduce(
        &self,
        s: &Scalar,
        mask: Option<&Vector>,
        accum: Option<&OpBinary>,
        op: &OpBinary,
        v: &Vector,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VReduce {
                s: s.clone(),
                mask: mask.cloned(),
                accum: accum.cloned(),
                op: op.clone(),
                v: v.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `s = Σ m`.
    pub fn reduce_scalar(
        &self,
        s: &Scalar,
        mask: Option<&Matrix>,
        accum: Option<&OpBinary>,
        op: &OpBinary,
        m: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MReduceScalar {
                s: s.clone(),
                mask: mask.cloned(),
                accum: accum.cloned(),
                op: op.clone(),
                m: m.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `v[i] = Σⱼ m[i,j]`.
    pub fn reduce_by_row(
        &self,
        v: &Vector,
        m: &Matrix,
        op: &OpBinary,
        init: Option<&Scalar>,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MReduceByRow {
                v: v.clone(),
                m: m.clone(),
                op: op.clone(),
                init: init.cloned(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// Stored-entry count of `v` into a `u32` scalar.
    pub fn count_nz(&self, s: &Scalar, v: &Vector, desc: Option<Descriptor>) -> Result<usize> {
        self.make_node(
            NodeOp::VCountNz { s: s.clone(), v: v.clone() },
            desc.unwrap_or_default(),
        )
    }

    /// `w = a × b`.
    #[allow(clippy::too_many_arguments)]
    pub fn mxm(
        &self,
        w: &Matrix,
        mask: Option<&Matrix>,
        mult: &OpBinary,
        add: &OpBinary,
        a: &Matrix,
        b: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MxM {
                w: w.clone(),
                mask: mask.cloned(),
                mult: mult.clone(),
                add: add.clone(),
                a: a.clone(),
                b: b.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = a × bᵀ`.
    #[allow(clippy::too_many_arguments)]
    pub fn mxmt(
        &self,
        w: &Matrix,
        mask: Option<&Matrix>,
        mult: &OpBinary,
        add: &OpBinary,
        a: &Matrix,
        b: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MxMT {
                w: w.clone(),
                mask: mask.cloned(),
                mult: mult.clone(),
                add: add.clone(),
                a: a.clone(),
                b: b.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = v × m`.
    #[allow(clippy::too_many_arguments)]
    pub fn vxm(
        &self,
        w: &Vector,
        mask: Option<&Vector>,
        mult: &OpBinary,
        add: &OpBinary,
        v: &Vector,
        m: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VxM {
                w: w.clone(),
                mask: mask.cloned(),
                mult: mult.clone(),
                add: add.clone(),
                v: v.clone(),
                m: m.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = m × v`.
    #[allow(clippy::too_many_arguments)]
    pub fn mxv(
        &self,
        w: &Vector,
        mask: Option<&Vector>,
        mult: &OpBinary,
        add: &OpBinary,
        m: &Matrix,
        v: &Vector,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MxV {
                w: w.clone(),
                mask: mask.cloned(),
                mult: mult.clone(),
                add: add.clone(),
                m: m.clone(),
                v: v.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = aᵀ`.
    pub fn transpose(
        &self,
        w: &Matrix,
        mask: Option<&Matrix>,
        accum: Option<&OpBinary>,
        a: &Matrix,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MTranspose {
                w: w.clone(),
                mask: mask.cloned(),
                accum: accum.cloned(),
                a: a.clone(),
            },
            desc.unwrap_or_default(),
        )
    }

    /// `w = strict lower triangle of a`.
    pub fn tril(&self, w: &Matrix, a: &Matrix, desc: Option<Descriptor>) -> Result<usize> {
        self.make_node(NodeOp::MTril { w: w.clone(), a: a.clone() }, desc.unwrap_or_default())
    }

    /// `w = strict upper triangle of a`.
    pub fn triu(&self, w: &Matrix, a: &Matrix, desc: Option<Descriptor>) -> Result<usize> {
        self.make_node(NodeOp::MTriu { w: w.clone(), a: a.clone() }, desc.unwrap_or_default())
    }

    /// `w = f(v)`.
    pub fn map(
        &self,
        w: &Vector,
        v: &Vector,
        op: &OpUnary,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::VMap { w: w.clone(), v: v.clone(), op: op.clone() },
            desc.unwrap_or_default(),
        )
    }

    /// `r = f(m[index, :])`.
    pub fn extract_row(
        &self,
        r: &Vector,
        m: &Matrix,
        op: &OpUnary,
        index: Index,
        desc: Option<Descriptor>,
    ) -> Result<usize> {
        self.make_node(
            NodeOp::MExtractRow { r: r.clone(), m: m.clone(), op: op.clone(), index },
            desc.unwrap_or_default(),
        )
    }
}

// ---------------------------------------------------------------------------
// Immediate-mode adapters: one node, submitted on the spot. These keep the
// original task-surface calling convention alive for clients that do not
// build graphs.
// ---------------------------------------------------------------------------

fn exec_one(lib: &Library, build: impl FnOnce(&Expression) -> Result<usize>) -> Result<()> {
    let expr = Expression::new(lib);
    build(&expr)?;
    expr.submit_wait()
}

/// Immediate `x ← host data` (vector).
pub fn exec_v_data_write<T: Element>(
    lib: &Library,
    x: &Vector,
    data: Vec<(Index, T)>,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.data_write(x, data, desc))
}

/// Immediate `host buffer ← x` (vector).
pub fn exec_v_data_read<T: Element>(
    lib: &Library,
    x: &Vector,
    out: Arc<Mutex<Vec<(Index, T)>>>,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.data_read(x, out, desc))
}

/// Immediate `x ← host data` (matrix).
pub fn exec_m_data_write<T: Element>(
    lib: &Library,
    x: &Matrix,
    data: Vec<(Index, Index, T)>,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.m_data_write(x, data, desc))
}

/// Immediate `host buffer ← x` (matrix).
pub fn exec_m_data_read<T: Element>(
    lib: &Library,
    x: &Matrix,
    out: Arc<Mutex<Vec<(Index, Index, T)>>>,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.m_data_read(x, out, desc))
}

/// Immediate `w = a ⊕ b`.
pub fn exec_v_eadd(
    lib: &Library,
    w: &Vector,
    mask: Option<&Vector>,
    op: &OpBinary,
    a: &Vector,
    b: &Vector,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.ewise_add(w, mask, op, a, b, desc))
}

/// Immediate `w = a ⊗ b`.
pub fn exec_v_emult(
    lib: &Library,
    w: &Vector,
    mask: Option<&Vector>,
    op: &OpBinary,
    a: &Vector,
    b: &Vector,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.ewise_mult(w, mask, op, a, b, desc))
}

/// Immediate `w = a ⊕ b` over matrices.
pub fn exec_m_eadd(
    lib: &Library,
    w: &Matrix,
    mask: Option<&Matrix>,
    op: &OpBinary,
    a: &Matrix,
    b: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.m_ewise_add(w, mask, op, a, b, desc))
}

/// Immediate masked assign.
pub fn exec_v_assign_masked(
    lib: &Library,
    w: &Vector,
    mask: Option<&Vector>,
    accum: Option<&OpBinary>,
    value: &Scalar,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.assign(w, mask, accum, value, desc))
}

/// Immediate `s = Σ v`.
pub fn exec_v_reduce(
    lib: &Library,
    s: &Scalar,
    mask: Option<&Vector>,
    accum: Option<&OpBinary>,
    op: &OpBinary,
    v: &Vector,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.reduce(s, mask, accum, op, v, desc))
}

/// Immediate `s = Σ m`.
pub fn exec_m_reduce_scalar(
    lib: &Library,
    s: &Scalar,
    mask: Option<&Matrix>,
    accum: Option<&OpBinary>,
    op: &OpBinary,
    m: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.reduce_scalar(s, mask, accum, op, m, desc))
}

/// Immediate `v[i] = Σⱼ m[i,j]`.
pub fn exec_m_reduce_by_row(
    lib: &Library,
    v: &Vector,
    m: &Matrix,
    op: &OpBinary,
    init: Option<&Scalar>,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.reduce_by_row(v, m, op, init, desc))
}

/// Immediate entry count.
pub fn exec_v_count_nz(lib: &Library, s: &Scalar, v: &Vector) -> Result<()> {
    exec_one(lib, |e| e.count_nz(s, v, None))
}

/// Immediate `w = a × b`.
#[allow(clippy::too_many_arguments)]
pub fn exec_mxm(
    lib: &Library,
    w: &Matrix,
    mask: Option<&Matrix>,
    mult: &OpBinary,
    add: &OpBinary,
    a: &Matrix,
    b: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.mxm(w, mask, mult, add, a, b, desc))
}

/// Immediate `w = a × bᵀ`.
#[allow(clippy::too_many_arguments)]
pub fn exec_mxmt_masked(
    lib: &Library,
    w: &Matrix,
    mask: Option<&Matrix>,
    mult: &OpBinary,
    add: &OpBinary,
    a: &Matrix,
    b: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.mxmt(w, mask, mult, add, a, b, desc))
}

/// Immediate `w = v × m`.
#[allow(clippy::too_many_arguments)]
pub fn exec_vxm_masked(
    lib: &Library,
    w: &Vector,
    mask: Option<&Vector>,
    mult: &OpBinary,
    add: &OpBinary,
    v: &Vector,
    m: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.vxm(w, mask, mult, add, v, m, desc))
}

/// Immediate `w = m × v`.
#[allow(clippy::too_many_arguments)]
pub fn exec_mxv_masked(
    lib: &Library,
    w: &Vector,
    mask: Option<&Vector>,
    mult: &OpBinary,
    add: &OpBinary,
    m: &Matrix,
    v: &Vector,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.mxv(w, mask, mult, add, m, v, desc))
}

/// Immediate `w = aᵀ`.
pub fn exec_m_transpose(
    lib: &Library,
    w: &Matrix,
    mask: Option<&Matrix>,
    accum: Option<&OpBinary>,
    a: &Matrix,
    desc: Option<Descriptor>,
) -> Result<()> {
    exec_one(lib, |e| e.transpose(w, mask, accum, a, desc))
}

/// Immediate strict lower triangle.
pub fn exec_m_tril(lib: &Library, w: &Matrix, a: &Matrix) -> Result<()> {
    exec_one(lib, |e| e.tril(w, a, None))
}

/// Immediate strict upper triangle.
pub fn exec_m_triu(lib: &Library, w: &Matrix, a: &Matrix) -> Result<()> {
    exec_one(lib, |e| e.triu(w, a, None))
}

/// Immediate `w = f(v)`.
pub fn exec_v_map(lib: &Library, w: &Vector, v: &Vector, op: &OpUnary) -> Result<()> {
    exec_one(lib, |e| e.map(w, v, op, None))
}

/// Immediate `r = f(m[index, :])`.
pub fn exec_m_extract_row(
    lib: &Library,
    r: &Vector,
    m: &Matrix,
    op: &OpUnary,
    index: Index,
) -> Result<()> {
    exec_one(lib, |e| e.extract_row(r, m, op, index, None))
}
