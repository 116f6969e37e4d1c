//! Per-node configuration descriptors.
//!
//! A descriptor is a small bag of optional string-valued parameters drawn
//! from a fixed enum. Most parameters are boolean (present = set, value
//! ignored); `DenseFactor` carries a numeric string. Descriptors are
//! value-like: cheap to clone, freely shared between nodes.

use crate::status::Status;
use crate::types::Index;

/// The fixed parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    /// Caller promises data-write input is already canonically ordered.
    ValuesSorted,
    /// Caller promises data-write input has no duplicate indices.
    NoDuplicates,
    /// Mask entry presence means "reject" instead of "accept".
    MaskComplement,
    /// Combine fresh output with prior output using the accum op.
    AccumResult,
    /// Logically transpose the first matrix operand.
    TransposeArg1,
    /// Logically transpose the second matrix operand.
    TransposeArg2,
    /// Pin node evaluation to device 0..7.
    DeviceId0,
    DeviceId1,
    DeviceId2,
    DeviceId3,
    DeviceId4,
    DeviceId5,
    DeviceId6,
    DeviceId7,
    /// Emit timing for the node.
    ProfileTime,
    /// Numeric hint for the sparse/dense traversal transition.
    DenseFactor,
}

const PARAM_COUNT: usize = 16;

impl Param {
    fn slot(self) -> usize {
        match self {
            Param::ValuesSorted => 0,
            Param::NoDuplicates => 1,
            Param::MaskComplement => 2,
            Param::AccumResult => 3,
            Param::TransposeArg1 => 4,
            Param::TransposeArg2 => 5,
            Param::DeviceId0 => 6,
            Param::DeviceId1 => 7,
            Param::DeviceId2 => 8,
            Param::DeviceId3 => 9,
            Param::DeviceId4 => 10,
            Param::DeviceId5 => 11,
            Param::DeviceId6 => 12,
            Param::DeviceId7 => 13,
            Param::ProfileTime => 14,
            Param::DenseFactor => 15,
        }
    }
}

/// Per-operation configuration flags.
#[derive(Clone, Debug, Default)]
pub struct Descriptor {
    params: [Option<String>; PARAM_COUNT],
}

impl Descriptor {
    /// Empty descriptor (all parameters unset).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a boolean parameter.
    pub fn set(&mut self, param: Param) -> &mut Self {
        self.params[param.slot()] = Some(String::new());
        self
    }

    /// Set a parameter with an explicit value.
    pub fn set_value(&mut self, param: Param, value: &str) -> &mut Self {
        self.params[param.slot()] = Some(value.to_string());
        self
    }

    /// Remove a parameter.
    pub fn remove(&mut self, param: Param) -> &mut Self {
        self.params[param.slot()] = None;
        self
    }

    /// True when the parameter is present.
    pub fn is_set(&self, param: Param) -> bool {
        self.params[param.slot()].is_some()
    }

    /// Raw parameter value, when present.
    pub fn get(&self, param: Param) -> Option<&str> {
        self.params[param.slot()].as_deref()
    }

    /// Independent copy (descriptors are value-like).
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// Builder-style helpers for the common flags.
    pub fn with(mut self, param: Param) -> Self {
        self.set(param);
        self
    }

    /// The pinned device index, when any `DeviceIdN` flag is set.
    pub fn device_id(&self) -> Option<usize> {
        const DEVICE_PARAMS: [Param; 8] = [
            Param::DeviceId0,
            Param::DeviceId1,
            Param::DeviceId2,
            Param::DeviceId3,
            Param::DeviceId4,
            Param::DeviceId5,
            Param::DeviceId6,
            Param::DeviceId7,
        ];
        DEVICE_PARAMS.iter().position(|p| self.is_set(*p))
    }

    /// The dense-transition factor; `InvalidArgument` when the stored
    /// value does not parse as a positive number.
    pub fn dense_factor(&self) -> Result<Option<f64>, Status> {
        match self.get(Param::DenseFactor) {
            None => Ok(None),
            Some(raw) => match raw.parse::<f64>() {
                Ok(f) if f > 0.0 => Ok(Some(f)),
                _ => Err(Status::InvalidArgument),
            },
        }
    }

    /// True when a block of `values` entries over `len` slots should be
    /// traversed densely. Purely advisory and only in effect when the
    /// caller set `DenseFactor`; densifying re-applies the fill
    /// convention, so it is never forced on sparse data.
    pub fn prefers_dense(&self, values: usize, len: Index) -> Result<bool, Status> {
        match self.dense_factor()? {
            Some(factor) => Ok(values as f64 * factor >= len as f64),
            None => Ok(false),
        }
    }
}
