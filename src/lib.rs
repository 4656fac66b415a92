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

//! Load and probe win/draw/loss endgame tablebases.
//!
//! Tables are loaded asynchronously, one file per material configuration,
//! and kept in a [`Registry`] for the lifetime of the [`Tablebase`].
//! Probing is synchronous and never fails: positions without a matching
//! table yield [`ProbeResult::Unknown`].
//!
//! # Example
//!
//! ```no_run
//! use futures::executor::block_on;
//! use shakmaty::{fen::Fen, CastlingMode, Chess};
//! use wdl_tablebase::{ProbeResult, Tablebase};
//!
//! let tables = Tablebase::new();
//! assert!(block_on(tables.load_table("tables/KQvK.rtbw")));
//!
//! let pos: Chess = "4k3/8/8/8/8/8/8/4K2Q w - - 0 1"
//!     .parse::<Fen>()?
//!     .into_position(CastlingMode::Standard)?;
//!
//! assert_eq!(tables.probe(&pos), ProbeResult::Win);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! # Table files
//!
//! A table starts with a 16 byte header:
//!
//! | Bytes    | Content                                                |
//! | -------- | ------------------------------------------------------ |
//! | `0..4`   | Magic, little endian: `0x71525554` (WDL), `0x7a525554` (DTZ) |
//! | `4`      | Layout flags: `1` two sided, `2` has pawns             |
//! | `5..12`  | Pieces in encoding order, zero terminated              |
//! | `12..16` | Entries per side, little endian, `0` if not declared   |
//!
//! The header is followed by the values of each side, two 4 bit values per
//! byte. If the piece list is empty, the material configuration is taken
//! from the file name, e.g. `KRvKN.rtbw`.

#![doc(html_root_url = "https://docs.rs/wdl-tablebase/0.1.0")]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]
#![cfg_attr(docs_rs, feature(doc_auto_cfg))]

#[macro_use]
mod errors;
mod binomial;
mod encoding;
mod filesystem;
mod material;
mod reader;
mod registry;
mod table;
mod tablebase;
mod types;

pub use binomial::binomial;
pub use encoding::{decode, encode, Encoded, Group, TableLayout};
pub use errors::{EncodeError, LoadError, LoadResult, ParseMaterialError, ProbeError};
pub use filesystem::{Filesystem, OsFilesystem, RandomAccessFile, ReadHint};
pub use material::Material;
pub use reader::ByteReader;
pub use registry::{Registry, TableStatus};
pub use table::{TableFile, DTZ_MAGIC, HEADER_SIZE, WDL_MAGIC};
pub use tablebase::{Tablebase, DEFAULT_PROBE_LIMIT};
pub use types::{Metric, Pieces, ProbeResult, Wdl, MAX_PIECES};
