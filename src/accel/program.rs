//! Device program assembly and the process-wide compilation cache.
//!
//! Kernels are assembled at run time from a template body, a list of
//! `#define` macros and the device source fragments of the ops in play.
//! The assembled text's key identifies the compilation unit in the cache;
//! failed compilations are cached as negative entries so repeated failing
//! lookups never recompile.

use super::{Accelerator, Program};
use crate::status::Status;
use std::collections::HashMap;
use std::sync::RwLock;

/// Assembled program text plus its cache key.
#[derive(Clone, Debug, Default)]
pub struct ProgramSource {
    /// Cache key: name plus every define and fragment hash-relevant part.
    pub key: String,
    /// Final source text handed to the backend compiler.
    pub text: String,
    /// True when some required fragment was missing; compilation must
    /// fail with `CompilationError`.
    pub incomplete: bool,
}

/// Builder for [`ProgramSource`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    name: String,
    defines: Vec<(String, String)>,
    fragments: Vec<String>,
    incomplete: bool,
}

impl ProgramBuilder {
    /// Start a program named `name` (the kernel family).
    pub fn new(name: &str) -> Self {
        ProgramBuilder { name: name.to_string(), ..Default::default() }
    }

    /// Add a `#define key value` macro.
    pub fn define(mut self, key: &str, value: &str) -> Self {
        self.defines.push((key.to_string(), value.to_string()));
        self
    }

    /// Add an op's device fragment; a missing fragment poisons the
    /// program (it will compile to `CompilationError`).
    pub fn op_source(mut self, name: &str, fragment: Option<&str>) -> Self {
        match fragment {
            Some(body) => self
                .fragments
                .push(format!("#define {name}(a, b) {body}")),
            None => self.incomplete = true,
        }
        self
    }

    /// Append a raw body fragment.
    pub fn body(mut self, text: &str) -> Self {
        self.fragments.push(text.to_string());
        self
    }

    /// Assemble the final source and its cache key.
    pub fn build(self) -> ProgramSource {
        let mut key = self.name.clone();
        let mut text = String::new();
        for (k, v) in &self.defines {
            key.push_str(&format!("|{k}={v}"));
            text.push_str(&format!("#define {k} {v}\n"));
        }
        for frag in &self.fragments {
            key.push_str(&format!("|{frag}"));
            text.push_str(frag);
            text.push('\n');
        }
        if self.incomplete {
            key.push_str("|<missing>");
        }
        ProgramSource { key, text, incomplete: self.incomplete }
    }
}

/// Process-wide `key → compiled program` map; read-mostly, with negative
/// entries for failed compilations.
#[derive(Default)]
pub struct ProgramCache {
    map: RwLock<HashMap<String, Result<Program, Status>>>,
}

impl ProgramCache {
    /// Look up a compiled program, compiling and caching on first use.
    pub fn get_or_compile(
        &self,
        acc: &dyn Accelerator,
        source: &ProgramSource,
    ) -> Result<Program, Status> {
        if let Some(hit) = self.map.read().unwrap().get(&source.key) {
            return hit.clone();
        }
        let compiled = acc.compile(source);
        let mut map = self.map.write().unwrap();
        map.entry(source.key.clone()).or_insert_with(|| compiled.clone());
        compiled
    }

    /// Number of cached entries (positive and negative).
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    /// True when nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
