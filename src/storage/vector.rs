//! Vector storage: format slots, validity mask, and the registered
//! conversion graph.

use crate::accel::Accelerator;
use crate::blocks::{BlockLayout, BlockMap};
use crate::formats::{AccCooVec, AccDenseVec, CooVec, DenseVec, DokVec, VecFormat};
use crate::storage::manager::{StorageControl, StorageManager};
use crate::types::{Element, Index};
use std::sync::Arc;

/// All formats of one vector entity. Each slot holds the entity's tiles
/// in that format; the validity mask says which slots currently reflect
/// the logical content.
#[derive(Debug)]
pub struct VecStorage<T: Element> {
    pub layout: BlockLayout,
    validity: u32,
    pub dok: Option<BlockMap<DokVec<T>>>,
    pub coo: Option<BlockMap<CooVec<T>>>,
    pub dense: Option<BlockMap<DenseVec<T>>>,
    pub acc_coo: Option<BlockMap<AccCooVec>>,
    pub acc_dense: Option<BlockMap<AccDenseVec>>,
}

impl<T: Element> VecStorage<T> {
    /// Storage for an `n_rows` vector tiled at `block_size`.
    pub fn new(n_rows: Index, block_size: Index) -> Self {
        VecStorage {
            layout: BlockLayout::vector(n_rows, block_size),
            validity: 0,
            dok: None,
            coo: None,
            dense: None,
            acc_coo: None,
            acc_dense: None,
        }
    }

    /// Dok slot; callers validated the format first.
    pub fn dok(&self) -> &BlockMap<DokVec<T>> {
        self.dok.as_ref().expect("dok slot validated")
    }

    /// Mutable dok slot.
    pub fn dok_mut(&mut self) -> &mut BlockMap<DokVec<T>> {
        self.dok.as_mut().expect("dok slot validated")
    }

    /// Coo slot; callers validated the format first.
    pub fn coo(&self) -> &BlockMap<CooVec<T>> {
        self.coo.as_ref().expect("coo slot validated")
    }

    /// Mutable coo slot.
    pub fn coo_mut(&mut self) -> &mut BlockMap<CooVec<T>> {
        self.coo.as_mut().expect("coo slot validated")
    }

    /// Dense slot; callers validated the format first.
    pub fn dense(&self) -> &BlockMap<DenseVec<T>> {
        self.dense.as_ref().expect("dense slot validated")
    }

    /// Mutable dense slot.
    pub fn dense_mut(&mut self) -> &mut BlockMap<DenseVec<T>> {
        self.dense.as_mut().expect("dense slot validated")
    }

    /// Accelerator coo slot.
    pub fn acc_coo(&self) -> &BlockMap<AccCooVec> {
        self.acc_coo.as_ref().expect("acc coo slot validated")
    }

    /// Accelerator dense slot.
    pub fn acc_dense(&self) -> &BlockMap<AccDenseVec> {
        self.acc_dense.as_ref().expect("acc dense slot validated")
    }

    /// Total entry count as seen through the coo slot.
    pub fn coo_values(&self) -> usize {
        self.coo().tiles.values().map(CooVec::values).sum()
    }
}

impl<T: Element> StorageControl for VecStorage<T> {
    fn is_constructed(&self, format: usize) -> bool {
        match VecFormat::from_code(format) {
            Some(VecFormat::Dok) => self.dok.is_some(),
            Some(VecFormat::Coo) => self.coo.is_some(),
            Some(VecFormat::Dense) => self.dense.is_some(),
            Some(VecFormat::AccCoo) => self.acc_coo.is_some(),
            Some(VecFormat::AccDense) => self.acc_dense.is_some(),
            None => false,
        }
    }

    fn validity(&self) -> u32 {
        self.validity
    }

    fn set_validity(&mut self, mask: u32) {
        self.validity = mask;
    }
}

fn dense_all_blocks<T: Element>(
    layout: BlockLayout,
    tile_of: impl Fn(Index, Index) -> DenseVec<T>,
) -> BlockMap<DenseVec<T>> {
    let mut map = BlockMap::new();
    for b in 0..layout.n_row_blocks() {
        map.insert(b, tile_of(b, layout.row_block_len(b)));
    }
    map
}

/// Build the conversion graph for vectors of `T`. Accelerator formats
/// register only when a backend is present, exactly like the original's
/// conditional device build.
pub fn build_vector_manager<T: Element>(
    acc: Option<Arc<dyn Accelerator>>,
) -> StorageManager<VecStorage<T>> {
    type S<T> = VecStorage<T>;
    let mut m: StorageManager<S<T>> = StorageManager::new(VecFormat::COUNT);

    m.register_constructor(
        VecFormat::Dok.code(),
        Arc::new(|s: &mut S<T>| {
            s.dok = Some(BlockMap::new());
            Ok(())
        }),
    );
    m.register_constructor(
        VecFormat::Coo.code(),
        Arc::new(|s: &mut S<T>| {
            s.coo = Some(BlockMap::new());
            Ok(())
        }),
    );
    m.register_validator_discard(
        VecFormat::Dok.code(),
        Arc::new(|s: &mut S<T>| {
            s.dok_mut().clear();
            Ok(())
        }),
    );
    m.register_validator_discard(
        VecFormat::Coo.code(),
        Arc::new(|s: &mut S<T>| {
            s.coo_mut().clear();
            Ok(())
        }),
    );

    m.register_converter(
        VecFormat::Dok.code(),
        VecFormat::Coo.code(),
        Arc::new(|s: &mut S<T>| {
            let mut out = BlockMap::new();
            for (b, tile) in &s.dok().tiles {
                if tile.values() > 0 {
                    out.insert(*b, CooVec::from_dok(tile));
                }
            }
            s.coo = Some(out);
            Ok(())
        }),
    );
    m.register_converter(
        VecFormat::Coo.code(),
        VecFormat::Dok.code(),
        Arc::new(|s: &mut S<T>| {
            let mut out = BlockMap::new();
            for (b, tile) in &s.coo().tiles {
                if tile.values() > 0 {
                    out.insert(*b, DokVec::from_coo(tile));
                }
            }
            s.dok = Some(out);
            Ok(())
        }),
    );

    // The dense format only exists for value-carrying types; a
    // structure-only vector routed through dense would lose its entries
    // to the fill convention.
    if T::HAS_VALUES {
        m.register_constructor(
            VecFormat::Dense.code(),
            Arc::new(|s: &mut S<T>| {
                s.dense = Some(BlockMap::new());
                Ok(())
            }),
        );
        m.register_validator_discard(
            VecFormat::Dense.code(),
            Arc::new(|s: &mut S<T>| {
                let layout = s.layout;
                *s.dense_mut() = dense_all_blocks(layout, |_, len| DenseVec::with_len(len));
                Ok(())
            }),
        );
        m.register_converter(
            VecFormat::Dok.code(),
            VecFormat::Dense.code(),
            Arc::new(|s: &mut S<T>| {
                let layout = s.layout;
                let out = dense_all_blocks(layout, |b, len| match s.dok().get(b) {
                    Some(tile) => DenseVec::from_dok(len, tile),
                    None => DenseVec::with_len(len),
                });
                s.dense = Some(out);
                Ok(())
            }),
        );
        m.register_converter(
            VecFormat::Coo.code(),
            VecFormat::Dense.code(),
            Arc::new(|s: &mut S<T>| {
                let layout = s.layout;
                let out = dense_all_blocks(layout, |b, len| match s.coo().get(b) {
                    Some(tile) => DenseVec::from_coo(len, tile),
                    None => DenseVec::with_len(len),
                });
                s.dense = Some(out);
                Ok(())
            }),
        );
        m.register_converter(
            VecFormat::Dense.code(),
            VecFormat::Dok.code(),
            Arc::new(|s: &mut S<T>| {
                let mut out = BlockMap::new();
                for (b, tile) in &s.dense().tiles {
                    if tile.values() > 0 {
                        out.insert(*b, DokVec::from_dense(tile));
                    }
                }
                s.dok = Some(out);
                Ok(())
            }),
        );
        m.register_converter(
            VecFormat::Dense.code(),
            VecFormat::Coo.code(),
            Arc::new(|s: &mut S<T>| {
                let mut out = BlockMap::new();
                for (b, tile) in &s.dense().tiles {
                    if tile.values() > 0 {
                        out.insert(*b, CooVec::from_dense(tile));
                    }
                }
                s.coo = Some(out);
                Ok(())
            }),
        );
    }

    if let Some(acc) = acc {
        m.register_constructor(
            VecFormat::AccCoo.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_coo = Some(BlockMap::new());
                Ok(())
            }),
        );
        m.register_validator_discard(
            VecFormat::AccCoo.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_coo.as_mut().expect("acc coo slot constructed").clear();
                Ok(())
            }),
        );
        let a = Arc::clone(&acc);
        m.register_converter(
            VecFormat::Coo.code(),
            VecFormat::AccCoo.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = BlockMap::new();
                for (b, tile) in &s.coo().tiles {
                    if tile.values() > 0 {
                        out.insert(*b, AccCooVec::from_host(a.as_ref(), 0, tile)?);
                    }
                }
                s.acc_coo = Some(out);
                Ok(())
            }),
        );
        let a = Arc::clone(&acc);
        m.register_converter(
            VecFormat::AccCoo.code(),
            VecFormat::Coo.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = BlockMap::new();
                for (b, tile) in &s.acc_coo().tiles {
                    let host: CooVec<T> = tile.to_host(a.as_ref())?;
                    if host.values() > 0 {
                        out.insert(*b, host);
                    }
                }
                s.coo = Some(out);
                Ok(())
            }),
        );

        if T::HAS_VALUES {
            m.register_constructor(
                VecFormat::AccDense.code(),
                Arc::new(|s: &mut S<T>| {
                    s.acc_dense = Some(BlockMap::new());
                    Ok(())
                }),
            );
            m.register_validator_discard(
                VecFormat::AccDense.code(),
                Arc::new(|s: &mut S<T>| {
                    s.acc_dense.as_mut().expect("acc dense slot constructed").clear();
                    Ok(())
                }),
            );
            let a = Arc::clone(&acc);
            m.register_converter(
                VecFormat::Dense.code(),
                VecFormat::AccDense.code(),
                Arc::new(move |s: &mut S<T>| {
                    let mut out = BlockMap::new();
                    for (b, tile) in &s.dense().tiles {
                        out.insert(*b, AccDenseVec::from_host(a.as_ref(), 0, tile)?);
                    }
                    s.acc_dense = Some(out);
                    Ok(())
                }),
            );
            let a = Arc::clone(&acc);
            m.register_converter(
                VecFormat::AccDense.code(),
                VecFormat::Dense.code(),
                Arc::new(move |s: &mut S<T>| {
                    let mut out = BlockMap::new();
                    for (b, tile) in &s.acc_dense().tiles {
                        out.insert(*b, tile.to_host::<T>(a.as_ref())?);
                    }
                    s.dense = Some(out);
                    Ok(())
                }),
            );
        }
    }

    m
}
