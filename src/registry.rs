// This file is part of the wdl-tablebase library.
// Copyright (C) 2017-2024 Niklas Fiekas <niklas.fiekas@backscattering.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.


use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{material::Material, table::TableFile, types::Metric};

/// Load status of a table path.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TableStatus {
    /// Never loaded, or the last attempt could not read the file.
    Unloaded,
    /// Parsed successfully.
    Loaded,
    /// Not a valid table. Will not be read again.
    Invalid,
}

#[derive(Debug)]
enum Entry {
    Loaded(Arc<TableFile>),
    Invalid,
}

#[derive(Default)]
struct Inner {
    by_path: FxHashMap<PathBuf, Entry>,
    by_material: FxHashMap<(Material, Metric), Arc<TableFile>>,
    loaded: [usize; 2],
    max_pieces: usize,
}

fn metric_index(metric: Metric) -> usize {
    match metric {
        Metric::Wdl => 0,
        Metric::Dtz => 1,
    }
}

/// Loaded tables by path and by material.
///
/// Tables are fully parsed before they are inserted, so readers never
/// observe partial state.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Looks up a loaded table by path.
    pub fn get(&self, path: &Path) -> Option<Arc<TableFile>> {
        match self.inner.read().by_path.get(path) {
            Some(Entry::Loaded(table)) => Some(Arc::clone(table)),
            _ => None,
        }
    }

    pub fn status(&self, path: &Path) -> TableStatus {
        match self.inner.read().by_path.get(path) {
            Some(Entry::Loaded(_)) => TableStatus::Loaded,
            Some(Entry::Invalid) => TableStatus::Invalid,
            None => TableStatus::Unloaded,
        }
    }

    /// Registers a table under its path and returns the registered table.
    ///
    /// If the path is already loaded, the existing table is kept and
    /// returned. The same holds for the material index, so the first table
    /// for a material configuration and metric is used for probing.
    pub fn register(&self, table: TableFile) -> Arc<TableFile> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if let Some(Entry::Loaded(existing)) = inner.by_path.get(table.path()) {
            return Arc::clone(existing);
        }

        let table = Arc::new(table);
        inner
            .by_path
            .insert(table.path().to_owned(), Entry::Loaded(Arc::clone(&table)));
        inner.loaded[metric_index(table.metric())] += 1;

        if let Some(material) = table.material() {
            inner
                .by_material
                .entry((material.normalized(), table.metric()))
                .or_insert_with(|| Arc::clone(&table));
            if table.metric() == Metric::Wdl {
                inner.max_pieces = inner.max_pieces.max(material.count());
            }
        }

        table
    }

    /// Remembers that a path does not contain a valid table. Has no effect
    /// if the path is already known.
    pub fn mark_invalid(&self, path: &Path) {
        self.inner
            .write()
            .by_path
            .entry(path.to_owned())
            .or_insert(Entry::Invalid);
    }

    /// Finds a table for the material configuration, with colors possibly
    /// swapped.
    pub fn find_for_material(&self, material: &Material, metric: Metric) -> Option<Arc<TableFile>> {
        self.inner
            .read()
            .by_material
            .get(&(material.normalized(), metric))
            .cloned()
    }

    /// Number of loaded tables.
    pub fn len(&self) -> usize {
        self.inner.read().loaded.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loaded tables of the given metric.
    pub fn count(&self, metric: Metric) -> usize {
        self.inner.read().loaded[metric_index(metric)]
    }

    /// Maximum number of pieces of any loaded WDL table, or `0`.
    pub fn max_pieces(&self) -> usize {
        self.inner.read().max_pieces
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("paths", &inner.by_path.len())
            .field("materials", &inner.by_material.len())
            .field("max_pieces", &inner.max_pieces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DTZ_MAGIC, WDL_MAGIC};

    fn table(path: &str, magic: u32) -> TableFile {
        let mut bytes = magic.to_le_bytes().to_vec();
        bytes.resize(16, 0);
        TableFile::from_bytes(path, &bytes).unwrap()
    }

    #[test]
    fn test_register() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.status(Path::new("KQvK.rtbw")), TableStatus::Unloaded);

        registry.register(table("KQvK.rtbw", WDL_MAGIC));
        assert_eq!(registry.status(Path::new("KQvK.rtbw")), TableStatus::Loaded);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.max_pieces(), 3);
        assert!(registry.get(Path::new("KQvK.rtbw")).is_some());
        assert!(registry.get(Path::new("KRvK.rtbw")).is_none());
    }

    #[test]
    fn test_first_writer_wins() {
        let registry = Registry::new();
        let first = registry.register(table("KQvK.rtbw", WDL_MAGIC));
        let second = registry.register(table("KQvK.rtbw", WDL_MAGIC));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        // Another file with the same material does not replace the first.
        let other = registry.register(table("other/KQvK.rtbw", WDL_MAGIC));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
        let found = registry
            .find_for_material(&"KQvK".parse().unwrap(), Metric::Wdl)
            .unwrap();
        assert!(Arc::ptr_eq(&found, &first));
    }

    #[test]
    fn test_find_for_material() {
        let registry = Registry::new();
        registry.register(table("KRvKN.rtbw", WDL_MAGIC));
        registry.register(table("KQvK.rtbz", DTZ_MAGIC));

        let krvkn: Material = "KRvKN".parse().unwrap();
        assert!(registry.find_for_material(&krvkn, Metric::Wdl).is_some());
        assert!(registry.find_for_material(&krvkn.flipped(), Metric::Wdl).is_some());
        assert!(registry.find_for_material(&krvkn, Metric::Dtz).is_none());

        let kqvk: Material = "KQvK".parse().unwrap();
        assert!(registry.find_for_material(&kqvk, Metric::Wdl).is_none());
        assert!(registry.find_for_material(&kqvk, Metric::Dtz).is_some());

        assert_eq!(registry.count(Metric::Wdl), 1);
        assert_eq!(registry.count(Metric::Dtz), 1);
        assert_eq!(registry.max_pieces(), 4);
    }

    #[test]
    fn test_identity_only() {
        let registry = Registry::new();
        registry.register(table("mock.rtbw", WDL_MAGIC));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.max_pieces(), 0);
        assert_eq!(registry.get(Path::new("mock.rtbw")).unwrap().magic(), WDL_MAGIC);
    }

    #[test]
    fn test_mark_invalid() {
        let registry = Registry::new();
        registry.mark_invalid(Path::new("broken.rtbw"));
        assert_eq!(registry.status(Path::new("broken.rtbw")), TableStatus::Invalid);
        assert!(registry.get(Path::new("broken.rtbw")).is_none());
        assert!(registry.is_empty());

        registry.register(table("KQvK.rtbw", WDL_MAGIC));
        registry.mark_invalid(Path::new("KQvK.rtbw"));
        assert_eq!(registry.status(Path::new("KQvK.rtbw")), TableStatus::Loaded);
    }
}
