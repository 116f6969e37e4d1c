//! Matrix storage: format slots, validity mask, and the registered
//! conversion graph.

use crate::accel::Accelerator;
use crate::blocks::{BlockLayout, TileMap};
use crate::formats::{AccCoo, AccCsr, Coo, Csr, Dok, Lil, MatFormat};
use crate::storage::manager::{StorageControl, StorageManager};
use crate::types::{Element, Index};
use std::sync::Arc;

/// All formats of one matrix entity.
#[derive(Debug)]
pub struct MatStorage<T: Element> {
    pub layout: BlockLayout,
    validity: u32,
    pub dok: Option<TileMap<Dok<T>>>,
    pub lil: Option<TileMap<Lil<T>>>,
    pub coo: Option<TileMap<Coo<T>>>,
    pub csr: Option<TileMap<Csr<T>>>,
    pub acc_coo: Option<TileMap<AccCoo>>,
    pub acc_csr: Option<TileMap<AccCsr>>,
}

impl<T: Element> MatStorage<T> {
    /// Storage for an `n_rows × n_cols` matrix tiled at `block_size`.
    pub fn new(n_rows: Index, n_cols: Index, block_size: Index) -> Self {
        MatStorage {
            layout: BlockLayout::matrix(n_rows, n_cols, block_size),
            validity: 0,
            dok: None,
            lil: None,
            coo: None,
            csr: None,
            acc_coo: None,
            acc_csr: None,
        }
    }

    /// Dok slot; callers validated the format first.
    pub fn dok(&self) -> &TileMap<Dok<T>> {
        self.dok.as_ref().expect("dok slot validated")
    }

    /// Mutable dok slot.
    pub fn dok_mut(&mut self) -> &mut TileMap<Dok<T>> {
        self.dok.as_mut().expect("dok slot validated")
    }

    /// Lil slot; callers validated the format first.
    pub fn lil(&self) -> &TileMap<Lil<T>> {
        self.lil.as_ref().expect("lil slot validated")
    }

    /// Mutable lil slot.
    pub fn lil_mut(&mut self) -> &mut TileMap<Lil<T>> {
        self.lil.as_mut().expect("lil slot validated")
    }

    /// Coo slot; callers validated the format first.
    pub fn coo(&self) -> &TileMap<Coo<T>> {
        self.coo.as_ref().expect("coo slot validated")
    }

    /// Mutable coo slot.
    pub fn coo_mut(&mut self) -> &mut TileMap<Coo<T>> {
        self.coo.as_mut().expect("coo slot validated")
    }

    /// Csr slot; callers validated the format first.
    pub fn csr(&self) -> &TileMap<Csr<T>> {
        self.csr.as_ref().expect("csr slot validated")
    }

    /// Mutable csr slot.
    pub fn csr_mut(&mut self) -> &mut TileMap<Csr<T>> {
        self.csr.as_mut().expect("csr slot validated")
    }

    /// Accelerator coo slot.
    pub fn acc_coo(&self) -> &TileMap<AccCoo> {
        self.acc_coo.as_ref().expect("acc coo slot validated")
    }

    /// Accelerator csr slot.
    pub fn acc_csr(&self) -> &TileMap<AccCsr> {
        self.acc_csr.as_ref().expect("acc csr slot validated")
    }

    /// Total entry count as seen through the coo slot.
    pub fn coo_values(&self) -> usize {
        self.coo().tiles.values().map(Coo::values).sum()
    }
}

impl<T: Element> StorageControl for MatStorage<T> {
    fn is_constructed(&self, format: usize) -> bool {
        match MatFormat::from_code(format) {
            Some(MatFormat::Dok) => self.dok.is_some(),
            Some(MatFormat::Lil) => self.lil.is_some(),
            Some(MatFormat::Coo) => self.coo.is_some(),
            Some(MatFormat::Csr) => self.csr.is_some(),
            Some(MatFormat::AccCoo) => self.acc_coo.is_some(),
            Some(MatFormat::AccCsr) => self.acc_csr.is_some(),
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

macro_rules! mat_converter {
    ($m:ident, $from:ident, $to:ident, $src:ident, $dst:ident, |$tile:ident, $rows:ident| $build:expr) => {
        $m.register_converter(
            MatFormat::$from.code(),
            MatFormat::$to.code(),
            Arc::new(|s: &mut MatStorage<T>| {
                let layout = s.layout;
                let mut out = TileMap::new();
                for ((bi, bj), $tile) in &s.$src().tiles {
                    #[allow(unused_variables)]
                    let $rows: Index = layout.row_block_len(*bi);
                    if $tile.values() > 0 {
                        out.insert(*bi, *bj, $build);
                    }
                }
                s.$dst = Some(out);
                Ok(())
            }),
        );
    };
}

/// Build the conversion graph for matrices of `T`: every ordered pair of
/// CPU formats, plus the host↔device edges when a backend is present.
pub fn build_matrix_manager<T: Element>(
    acc: Option<Arc<dyn Accelerator>>,
) -> StorageManager<MatStorage<T>> {
    type S<T> = MatStorage<T>;
    let mut m: StorageManager<S<T>> = StorageManager::new(MatFormat::COUNT);

    m.register_constructor(
        MatFormat::Dok.code(),
        Arc::new(|s: &mut S<T>| {
            s.dok = Some(TileMap::new());
            Ok(())
        }),
    );
    m.register_constructor(
        MatFormat::Lil.code(),
        Arc::new(|s: &mut S<T>| {
            s.lil = Some(TileMap::new());
            Ok(())
        }),
    );
    m.register_constructor(
        MatFormat::Coo.code(),
        Arc::new(|s: &mut S<T>| {
            s.coo = Some(TileMap::new());
            Ok(())
        }),
    );
    m.register_constructor(
        MatFormat::Csr.code(),
        Arc::new(|s: &mut S<T>| {
            s.csr = Some(TileMap::new());
            Ok(())
        }),
    );
    m.register_validator_discard(
        MatFormat::Dok.code(),
        Arc::new(|s: &mut S<T>| {
            s.dok_mut().clear();
            Ok(())
        }),
    );
    m.register_validator_discard(
        MatFormat::Lil.code(),
        Arc::new(|s: &mut S<T>| {
            s.lil_mut().clear();
            Ok(())
        }),
    );
    m.register_validator_discard(
        MatFormat::Coo.code(),
        Arc::new(|s: &mut S<T>| {
            s.coo_mut().clear();
            Ok(())
        }),
    );
    m.register_validator_discard(
        MatFormat::Csr.code(),
        Arc::new(|s: &mut S<T>| {
            s.csr_mut().clear();
            Ok(())
        }),
    );

    mat_converter!(m, Dok, Lil, dok, lil, |tile, rows| Lil::from_dok(rows, tile));
    mat_converter!(m, Dok, Coo, dok, coo, |tile, rows| Coo::from_dok(tile));
    mat_converter!(m, Dok, Csr, dok, csr, |tile, rows| Csr::from_dok(rows, tile));
    mat_converter!(m, Lil, Dok, lil, dok, |tile, rows| Dok::from_lil(tile));
    mat_converter!(m, Lil, Coo, lil, coo, |tile, rows| Coo::from_lil(tile));
    mat_converter!(m, Lil, Csr, lil, csr, |tile, rows| Csr::from_lil(tile));
    mat_converter!(m, Coo, Dok, coo, dok, |tile, rows| Dok::from_coo(tile));
    mat_converter!(m, Coo, Lil, coo, lil, |tile, rows| Lil::from_coo(rows, tile));
    mat_converter!(m, Coo, Csr, coo, csr, |tile, rows| Csr::from_coo(rows, tile));
    mat_converter!(m, Csr, Dok, csr, dok, |tile, rows| Dok::from_csr(tile));
    mat_converter!(m, Csr, Lil, csr, lil, |tile, rows| Lil::from_csr(tile));
    mat_converter!(m, Csr, Coo, csr, coo, |tile, rows| Coo::from_csr(tile));

    if let Some(acc) = acc {
        m.register_constructor(
            MatFormat::AccCoo.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_coo = Some(TileMap::new());
                Ok(())
            }),
        );
        m.register_constructor(
            MatFormat::AccCsr.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_csr = Some(TileMap::new());
                Ok(())
            }),
        );
        m.register_validator_discard(
            MatFormat::AccCoo.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_coo.as_mut().expect("acc coo slot constructed").clear();
                Ok(())
            }),
        );
        m.register_validator_discard(
            MatFormat::AccCsr.code(),
            Arc::new(|s: &mut S<T>| {
                s.acc_csr.as_mut().expect("acc csr slot constructed").clear();
                Ok(())
            }),
        );

        let a = Arc::clone(&acc);
        m.register_converter(
            MatFormat::Coo.code(),
            MatFormat::AccCoo.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = TileMap::new();
                for ((bi, bj), tile) in &s.coo().tiles {
                    if tile.values() > 0 {
                        out.insert(*bi, *bj, AccCoo::from_host(a.as_ref(), 0, tile)?);
                    }
                }
                s.acc_coo = Some(out);
                Ok(())
            }),
        );
        let a = Arc::clone(&acc);
        m.register_converter(
            MatFormat::AccCoo.code(),
            MatFormat::Coo.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = TileMap::new();
                for ((bi, bj), tile) in &s.acc_coo().tiles {
                    let host: Coo<T> = tile.to_host(a.as_ref())?;
                    if host.values() > 0 {
                        out.insert(*bi, *bj, host);
                    }
                }
                s.coo = Some(out);
                Ok(())
            }),
        );
        let a = Arc::clone(&acc);
        m.register_converter(
            MatFormat::Csr.code(),
            MatFormat::AccCsr.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = TileMap::new();
                for ((bi, bj), tile) in &s.csr().tiles {
                    if tile.values() > 0 {
                        out.insert(*bi, *bj, AccCsr::from_host(a.as_ref(), 0, tile)?);
                    }
                }
                s.acc_csr = Some(out);
                Ok(())
            }),
        );
        let a = Arc::clone(&acc);
        m.register_converter(
            MatFormat::AccCsr.code(),
            MatFormat::Csr.code(),
            Arc::new(move |s: &mut S<T>| {
                let mut out = TileMap::new();
                for ((bi, bj), tile) in &s.acc_csr().tiles {
                    let host: Csr<T> = tile.to_host(a.as_ref())?;
                    if host.values() > 0 {
                        out.insert(*bi, *bj, host);
                    }
                }
                s.csr = Some(out);
                Ok(())
            }),
        );
    }

    m
}
