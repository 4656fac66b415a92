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
    env, io,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::{future, stream, StreamExt as _};
use shakmaty::{Board, Color, Position};
use tracing::{debug, trace, warn};

use crate::{
    errors::{LoadError, ProbeError},
    filesystem::{unblock, Filesystem, OsFilesystem},
    material::Material,
    registry::{Registry, TableStatus},
    table::TableFile,
    types::{Metric, ProbeResult, Wdl, MAX_PIECES},
};

/// Default maximum number of pieces for probing.
pub const DEFAULT_PROBE_LIMIT: usize = 6;

/// Number of tables loaded concurrently by [`Tablebase::add_directory()`].
const CONCURRENT_LOADS: usize = 8;

/// A collection of tables.
pub struct Tablebase {
    filesystem: Arc<dyn Filesystem>,
    registry: Registry,
    probe_limit: AtomicUsize,
}

impl Default for Tablebase {
    fn default() -> Tablebase {
        Tablebase::new()
    }
}

impl Tablebase {
    /// Create an empty collection of tables.
    pub fn new() -> Tablebase {
        Tablebase::with_filesystem(Arc::new(OsFilesystem))
    }

    /// Create an empty collection of tables that will be loaded from a
    /// custom filesystem implementation.
    pub fn with_filesystem(filesystem: Arc<dyn Filesystem>) -> Tablebase {
        Tablebase {
            filesystem,
            registry: Registry::new(),
            probe_limit: AtomicUsize::new(DEFAULT_PROBE_LIMIT),
        }
    }

    /// Loads and parses a table file, returning whether it is available for
    /// probing now.
    ///
    /// Reading happens on a separate thread. A path that has already been
    /// loaded is not read again and reports success. A file that is not a
    /// valid table is remembered as such and never read again. If the file
    /// cannot be read at all, nothing is remembered and a later call will
    /// try again.
    pub async fn load_table<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();

        match self.registry.status(path) {
            TableStatus::Loaded => {
                debug!(path = %path.display(), "table already loaded");
                return true;
            }
            TableStatus::Invalid => return false,
            TableStatus::Unloaded => (),
        }

        let filesystem = Arc::clone(&self.filesystem);
        let owned = path.to_owned();
        let result = unblock(move || TableFile::open(&*filesystem, &owned))
            .await
            .unwrap_or_else(|error| Err(LoadError::Read { error }));

        match result {
            Ok(table) => {
                let table = self.registry.register(table);
                debug!(
                    path = %path.display(),
                    metric = %table.metric(),
                    material = ?table.material(),
                    "table loaded"
                );
                true
            }
            Err(LoadError::Read { error }) => {
                debug!(path = %path.display(), %error, "cannot read table");
                false
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "invalid table");
                self.registry.mark_invalid(path);
                false
            }
        }
    }

    /// Loads all tables from a directory, selected by their `rtbw` or `rtbz`
    /// extension, and returns the number of tables that are available.
    ///
    /// # Errors
    ///
    /// Returns an error result when:
    ///
    /// * The `path` does not exist.
    /// * `path` is not a directory.
    /// * The process lacks permissions to list the directory.
    pub async fn add_directory<P: AsRef<Path>>(&self, path: P) -> io::Result<usize> {
        let filesystem = Arc::clone(&self.filesystem);
        let dir = path.as_ref().to_owned();
        let paths = unblock(move || filesystem.read_dir(&dir)).await??;

        let loaded = stream::iter(paths.into_iter().filter(|path| is_table_file(path)))
            .map(|path| self.load_table(path))
            .buffer_unordered(CONCURRENT_LOADS)
            .filter(|&ok| future::ready(ok))
            .count()
            .await;

        Ok(loaded)
    }

    /// Applies a search path option: a list of directories, separated by
    /// `:` on Unix and `;` on Windows. The special value `<empty>` and the
    /// empty string select no directories.
    ///
    /// Directories that cannot be listed are skipped. Returns the number of
    /// tables that are available from the listed directories.
    pub async fn set_search_path(&self, paths: &str) -> usize {
        let paths = paths.trim();
        if paths.is_empty() || paths == "<empty>" {
            return 0;
        }

        let mut loaded = 0;
        for dir in env::split_paths(paths) {
            match self.add_directory(&dir).await {
                Ok(n) => loaded += n,
                Err(error) => warn!(dir = %dir.display(), %error, "cannot list table directory"),
            }
        }
        loaded
    }

    /// Sets the maximum number of pieces for probing, clamped to
    /// [`MAX_PIECES`]. `0` disables probing.
    pub fn set_probe_limit(&self, limit: usize) {
        self.probe_limit
            .store(limit.min(MAX_PIECES), Ordering::Relaxed);
    }

    pub fn probe_limit(&self) -> usize {
        self.probe_limit.load(Ordering::Relaxed)
    }

    /// Whether any WDL table is loaded and probing is not disabled.
    pub fn is_enabled(&self) -> bool {
        self.probe_limit() > 0 && self.registry.count(Metric::Wdl) > 0
    }

    /// Maximum number of pieces of any loaded WDL table.
    pub fn max_pieces(&self) -> usize {
        self.registry.max_pieces()
    }

    pub fn status<P: AsRef<Path>>(&self, path: P) -> TableStatus {
        self.registry.status(path.as_ref())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Probe tables for the outcome of a position.
    ///
    /// Returns [`ProbeResult::Unknown`] whenever the tables cannot answer,
    /// see [`Tablebase::probe_wdl()`] for the reasons.
    pub fn probe<P: Position>(&self, pos: &P) -> ProbeResult {
        match self.probe_wdl(pos) {
            Ok(wdl) => ProbeResult::from(wdl),
            Err(error) => {
                trace!(%error, "probe failed");
                ProbeResult::Unknown
            }
        }
    }

    /// Probe tables for the [`Wdl`] value of a position.
    ///
    /// En passant rights are not considered.
    ///
    /// # Errors
    ///
    /// See [`ProbeError`] for possible error conditions.
    pub fn probe_wdl<P: Position>(&self, pos: &P) -> Result<Wdl, ProbeError> {
        if pos.castles().any() {
            return Err(ProbeError::Castling);
        }
        self.probe_board(pos.board(), pos.turn())
    }

    /// Probe tables for a board without castling rights.
    ///
    /// # Errors
    ///
    /// See [`ProbeError`] for possible error conditions.
    pub fn probe_board(&self, board: &Board, turn: Color) -> Result<Wdl, ProbeError> {
        let count = board.occupied().count();
        if count > self.probe_limit() || count > self.max_pieces() {
            return Err(ProbeError::TooManyPieces);
        }

        let material = Material::from_board(board);
        let table = self
            .registry
            .find_for_material(&material, Metric::Wdl)
            .ok_or(ProbeError::MissingTable {
                metric: Metric::Wdl,
                material,
            })?;

        table.probe_wdl(board, turn)
    }
}

impl std::fmt::Debug for Tablebase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tablebase")
            .field("registry", &self.registry)
            .field("probe_limit", &self.probe_limit())
            .finish_non_exhaustive()
    }
}

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext == "rtbw" || ext == "rtbz")
}
