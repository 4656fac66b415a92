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


use std::{backtrace::Backtrace, error::Error, fmt, io};

use shakmaty::Square;

use crate::{material::Material, types::Metric};

pub type LoadResult<T> = Result<T, LoadError>;

/// Error when loading a table file.
#[derive(Debug)]
pub enum LoadError {
    /// I/O error. The path is not remembered, so that a later load can
    /// retry.
    Read {
        #[allow(missing_docs)]
        error: io::Error,
    },
    /// Table file has an unknown magic number.
    Magic {
        #[allow(missing_docs)]
        magic: u32,
    },
    /// Corrupted table.
    CorruptedTable {
        #[allow(missing_docs)]
        backtrace: Backtrace,
    },
}

impl LoadError {
    /// Whether the table file itself is broken, as opposed to not being
    /// readable right now.
    pub fn is_invalid(&self) -> bool {
        !matches!(self, LoadError::Read { .. })
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read { error } => write!(f, "i/o error reading table file: {error}"),
            LoadError::Magic { magic } => write!(f, "invalid magic number: {magic:#010x}"),
            LoadError::CorruptedTable { backtrace } => write!(f, "corrupted table: {backtrace}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Read { error } => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(error: io::Error) -> LoadError {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => LoadError::CorruptedTable {
                backtrace: Backtrace::capture(),
            },
            _ => LoadError::Read { error },
        }
    }
}

/// Error when probing a position.
#[derive(Debug)]
pub enum ProbeError {
    /// Position has castling rights, but tables do not contain positions
    /// with castling rights.
    Castling,
    /// Position has more pieces than the probe limit or than any loaded
    /// table.
    TooManyPieces,
    /// Missing table.
    MissingTable {
        #[allow(missing_docs)]
        metric: Metric,
        #[allow(missing_docs)]
        material: Material,
    },
    /// The table does not support the position.
    UnsupportedEncoding {
        #[allow(missing_docs)]
        material: Material,
        #[allow(missing_docs)]
        error: EncodeError,
    },
    /// The index lies beyond the data stored in the table.
    TruncatedTable {
        #[allow(missing_docs)]
        material: Material,
        #[allow(missing_docs)]
        index: u64,
    },
    /// The table stores a value that is not a valid outcome.
    CorruptedValue {
        #[allow(missing_docs)]
        material: Material,
        #[allow(missing_docs)]
        value: u8,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Castling => {
                write!(f, "tables do not contain positions with castling rights")
            }
            ProbeError::TooManyPieces => write!(f, "too many pieces"),
            ProbeError::MissingTable { metric, material } => {
                write!(f, "required {metric} table not found: {material}")
            }
            ProbeError::UnsupportedEncoding { material, error } => {
                write!(f, "cannot encode position for table {material}: {error}")
            }
            ProbeError::TruncatedTable { material, index } => {
                write!(f, "index {index} out of range for truncated table {material}")
            }
            ProbeError::CorruptedValue { material, value } => {
                write!(f, "invalid value {value} in table {material}")
            }
        }
    }
}

impl Error for ProbeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProbeError::UnsupportedEncoding { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Error when encoding a position for a table layout.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EncodeError {
    /// Material of the position does not match the table, even with colors
    /// swapped.
    MaterialMismatch,
    /// Pawn on the first or last rank.
    PawnOnBackRank {
        #[allow(missing_docs)]
        square: Square,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MaterialMismatch => f.write_str("material does not match table"),
            EncodeError::PawnOnBackRank { square } => write!(f, "pawn on back rank: {square}"),
        }
    }
}

impl Error for EncodeError {}

/// Error when parsing a material signature.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseMaterialError;

impl fmt::Display for ParseMaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid material signature")
    }
}

impl Error for ParseMaterialError {}

/// Return a `CorruptedTable` error.
macro_rules! throw {
    () => {
        return Err(crate::errors::LoadError::CorruptedTable {
            backtrace: ::std::backtrace::Backtrace::capture(),
        })
    };
}

/// Unwrap an `Option` or return a `CorruptedTable` error.
macro_rules! u {
    ($e:expr) => {
        match $e {
            Some(ok) => ok,
            None => throw!(),
        }
    };
}

/// Ensure that a condition holds. Otherwise return a `CorruptedTable` error.
macro_rules! ensure {
    ($cond:expr) => {
        if !$cond {
            throw!();
        }
    };
}
