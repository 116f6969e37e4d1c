//! Accelerator twins of the transfer formats.
//!
//! Twins mirror CooVec / DenseVec / Coo / Csr in device-owned buffers
//! reached exclusively through the accelerator interface. Index arrays
//! are little-endian `u32`; value arrays use the element encoding and are
//! omitted entirely for structure-only tiles.

use crate::accel::{Accelerator, DeviceBuffer};
use crate::status::Status;
use crate::types::{Element, Index};

fn encode_indices(indices: &[Index]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * 4);
    for i in indices {
        out.extend_from_slice(&i.to_le_bytes());
    }
    out
}

fn decode_indices(bytes: &[u8]) -> Result<Vec<Index>, Status> {
    if bytes.len() % 4 != 0 {
        return Err(Status::Error);
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| Index::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn encode_values<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * size_of::<T>());
    for v in values {
        v.write_le(&mut out);
    }
    out
}

fn decode_values<T: Element>(bytes: &[u8], count: usize) -> Result<Vec<T>, Status> {
    let width = size_of::<T>();
    if width == 0 {
        return Ok(vec![T::default(); count]);
    }
    if bytes.len() != count * width {
        return Err(Status::Error);
    }
    bytes
        .chunks_exact(width)
        .map(|c| T::read_le(c).ok_or(Status::Error))
        .collect()
}

fn upload(
    acc: &dyn Accelerator,
    device: usize,
    bytes: &[u8],
) -> Result<DeviceBuffer, Status> {
    let buf = acc.buffer_create(device, bytes.len())?;
    acc.buffer_write(&buf, 0, bytes)?;
    Ok(buf)
}

fn download(acc: &dyn Accelerator, buf: &DeviceBuffer) -> Result<Vec<u8>, Status> {
    let mut bytes = vec![0; buf.len];
    acc.buffer_read(buf, 0, &mut bytes)?;
    Ok(bytes)
}

/// Device mirror of [`super::CooVec`].
#[derive(Clone, Debug)]
pub struct AccCooVec {
    pub ai: DeviceBuffer,
    pub ax: Option<DeviceBuffer>,
    values: usize,
}

impl AccCooVec {
    /// Empty twin on `device`.
    pub fn empty(acc: &dyn Accelerator, device: usize) -> Result<Self, Status> {
        Ok(AccCooVec { ai: acc.buffer_create(device, 0)?, ax: None, values: 0 })
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.values
    }

    /// Materialise the device buffers from a host tile.
    pub fn from_host<T: Element>(
        acc: &dyn Accelerator,
        device: usize,
        coo: &super::CooVec<T>,
    ) -> Result<Self, Status> {
        let ai = upload(acc, device, &encode_indices(&coo.ai))?;
        let ax = T::HAS_VALUES
            .then(|| upload(acc, device, &encode_values(&coo.ax)))
            .transpose()?;
        Ok(AccCooVec { ai, ax, values: coo.values() })
    }

    /// Copy the device buffers back into a host tile.
    pub fn to_host<T: Element>(&self, acc: &dyn Accelerator) -> Result<super::CooVec<T>, Status> {
        let ai = decode_indices(&download(acc, &self.ai)?)?;
        let ax = match &self.ax {
            Some(buf) => decode_values::<T>(&download(acc, buf)?, self.values)?,
            None => vec![T::default(); self.values],
        };
        if ai.len() != self.values || ax.len() != self.values {
            return Err(Status::Error);
        }
        Ok(super::CooVec { ai, ax })
    }
}

/// Device mirror of [`super::DenseVec`].
#[derive(Clone, Debug)]
pub struct AccDenseVec {
    pub ax: DeviceBuffer,
    len: Index,
}

impl AccDenseVec {
    /// Empty twin on `device`.
    pub fn empty(acc: &dyn Accelerator, device: usize) -> Result<Self, Status> {
        Ok(AccDenseVec { ax: acc.buffer_create(device, 0)?, len: 0 })
    }

    /// Logical length of the tile.
    pub fn len(&self) -> Index {
        self.len
    }

    /// True when the tile has zero slots.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Materialise the device buffer from a host tile.
    pub fn from_host<T: Element>(
        acc: &dyn Accelerator,
        device: usize,
        dense: &super::DenseVec<T>,
    ) -> Result<Self, Status> {
        let ax = upload(acc, device, &encode_values(&dense.ax))?;
        Ok(AccDenseVec { ax, len: dense.len() })
    }

    /// Copy the device buffer back into a host tile.
    pub fn to_host<T: Element>(&self, acc: &dyn Accelerator) -> Result<super::DenseVec<T>, Status> {
        let values = decode_values::<T>(&download(acc, &self.ax)?, self.len as usize)?;
        let mut dense = super::DenseVec::with_len(self.len);
        for (i, v) in values.into_iter().enumerate() {
            dense.set(i as Index, v);
        }
        Ok(dense)
    }
}

/// Device mirror of [`super::Coo`].
#[derive(Clone, Debug)]
pub struct AccCoo {
    pub ai: DeviceBuffer,
    pub aj: DeviceBuffer,
    pub ax: Option<DeviceBuffer>,
    values: usize,
}

impl AccCoo {
    /// Empty twin on `device`.
    pub fn empty(acc: &dyn Accelerator, device: usize) -> Result<Self, Status> {
        Ok(AccCoo {
            ai: acc.buffer_create(device, 0)?,
            aj: acc.buffer_create(device, 0)?,
            ax: None,
            values: 0,
        })
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.values
    }

    /// Materialise the device buffers from a host tile.
    pub fn from_host<T: Element>(
        acc: &dyn Accelerator,
        device: usize,
        coo: &super::Coo<T>,
    ) -> Result<Self, Status> {
        let ai = upload(acc, device, &encode_indices(&coo.ai))?;
        let aj = upload(acc, device, &encode_indices(&coo.aj))?;
        let ax = T::HAS_VALUES
            .then(|| upload(acc, device, &encode_values(&coo.ax)))
            .transpose()?;
        Ok(AccCoo { ai, aj, ax, values: coo.values() })
    }

    /// Copy the device buffers back into a host tile.
    pub fn to_host<T: Element>(&self, acc: &dyn Accelerator) -> Result<super::Coo<T>, Status> {
        let ai = decode_indices(&download(acc, &self.ai)?)?;
        let aj = decode_indices(&download(acc, &self.aj)?)?;
        let ax = match &self.ax {
            Some(buf) => decode_values::<T>(&download(acc, buf)?, self.values)?,
            None => vec![T::default(); self.values],
        };
        if ai.len() != self.values || aj.len() != self.values {
            return Err(Status::Error);
        }
        Ok(super::Coo { ai, aj, ax })
    }
}

/// Device mirror of [`super::Csr`].
#[derive(Clone, Debug)]
pub struct AccCsr {
    pub ap: DeviceBuffer,
    pub aj: DeviceBuffer,
    pub ax: Option<DeviceBuffer>,
    n_rows: Index,
    values: usize,
}

impl AccCsr {
    /// Empty twin on `device`.
    pub fn empty(acc: &dyn Accelerator, device: usize) -> Result<Self, Status> {
        Ok(AccCsr {
            ap: acc.buffer_create(device, 4)?,
            aj: acc.buffer_create(device, 0)?,
            ax: None,
            n_rows: 0,
            values: 0,
        })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> Index {
        self.n_rows
    }

    /// Stored entry count.
    pub fn values(&self) -> usize {
        self.values
    }

    /// Materialise the device buffers from a host tile.
    pub fn from_host<T: Element>(
        acc: &dyn Accelerator,
        device: usize,
        csr: &super::Csr<T>,
    ) -> Result<Self, Status> {
        let ap = upload(acc, device, &encode_indices(&csr.ap))?;
        let aj = upload(acc, device, &encode_indices(&csr.aj))?;
        let ax = T::HAS_VALUES
            .then(|| upload(acc, device, &encode_values(&csr.ax)))
            .transpose()?;
        Ok(AccCsr { ap, aj, ax, n_rows: csr.n_rows(), values: csr.values() })
    }

    /// Copy the device buffers back into a host tile.
    pub fn to_host<T: Element>(&self, acc: &dyn Accelerator) -> Result<super::Csr<T>, Status> {
        let ap = decode_indices(&download(acc, &self.ap)?)?;
        let aj = decode_indices(&download(acc, &self.aj)?)?;
        let ax = match &self.ax {
            Some(buf) => decode_values::<T>(&download(acc, buf)?, self.values)?,
            None => vec![T::default(); self.values],
        };
        if ap.len() != self.n_rows as usize + 1 || aj.len() != self.values {
            return Err(Status::Error);
        }
        Ok(super::Csr { ap, aj, ax })
    }
}
