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
};

use bitflags::bitflags;
use shakmaty::{Board, Color, Piece};
use tracing::warn;

use crate::{
    encoding::{encode, TableLayout},
    errors::{LoadError, LoadResult, ProbeError},
    filesystem::{Filesystem, ReadHint},
    material::Material,
    reader::ByteReader,
    types::{Metric, Pieces, Wdl, MAX_PIECES},
};

/// Magic number of WDL tables, as stored in little endian.
pub const WDL_MAGIC: u32 = 0x7152_5554;

/// Magic number of DTZ tables, as stored in little endian.
pub const DTZ_MAGIC: u32 = 0x7a52_5554;

/// Size of the fixed table file header in bytes.
pub const HEADER_SIZE: usize = 16;

bitflags! {
    /// Table layout flags.
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    struct Layout: u8 {
        /// Two sided table for non-symmetrical material configuration.
        const SPLIT = 1;
        /// Table with pawns.
        const HAS_PAWNS = 2;
    }
}

impl Metric {
    /// Identifies the metric of a table by its magic number.
    pub fn from_magic(magic: u32) -> Option<Metric> {
        match magic {
            WDL_MAGIC => Some(Metric::Wdl),
            DTZ_MAGIC => Some(Metric::Dtz),
            _ => None,
        }
    }

    pub fn magic(self) -> u32 {
        match self {
            Metric::Wdl => WDL_MAGIC,
            Metric::Dtz => DTZ_MAGIC,
        }
    }
}

/// Header byte to piece.
fn byte_to_piece(p: u8) -> Option<Piece> {
    if p >> 4 != 0 {
        return None;
    }
    let color = if p & 8 == 0 { Color::White } else { Color::Black };
    Some(match p & 7 {
        1 => color.pawn(),
        2 => color.knight(),
        3 => color.bishop(),
        4 => color.rook(),
        5 => color.queen(),
        6 => color.king(),
        _ => return None,
    })
}

/// Parse a zero terminated piece list.
fn parse_pieces(bytes: &[u8; MAX_PIECES]) -> LoadResult<Pieces> {
    let count = bytes.iter().position(|&p| p == 0).unwrap_or(MAX_PIECES);
    ensure!(bytes[count..].iter().all(|&p| p == 0));

    let mut pieces = Pieces::new();
    for &p in &bytes[..count] {
        pieces.push(u!(byte_to_piece(p)));
    }
    Ok(pieces)
}

/// Material signature encoded in a file name like `KRvKN.rtbw`.
fn material_from_path(path: &Path) -> Option<Material> {
    path.file_stem()?.to_str()?.parse().ok()
}

/// Parsed fixed size header.
#[derive(Debug)]
struct Header {
    magic: u32,
    metric: Metric,
    layout: Option<TableLayout>,
}

impl Header {
    fn parse(path: &Path, bytes: &[u8]) -> LoadResult<Header> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.read_u32_le()?;
        let metric = Metric::from_magic(magic).ok_or(LoadError::Magic { magic })?;

        let flags = u!(Layout::from_bits(reader.read_u8()?));
        let pieces = parse_pieces(&reader.read_array()?)?;
        let entries = reader.read_u32_le()?;

        let named = material_from_path(path);

        let layout = if pieces.is_empty() {
            // Flags describe the listed pieces only.
            match named {
                Some(material) => Some(TableLayout::from_material(&material)?),
                None => None,
            }
        } else {
            let layout = TableLayout::new(pieces, flags.contains(Layout::SPLIT))?;
            ensure!(flags.contains(Layout::HAS_PAWNS) == layout.material().has_pawns());
            if let Some(named) = named {
                ensure!(named.normalized() == layout.material().normalized());
            }
            Some(layout)
        };

        if entries != 0 {
            let layout = u!(layout.as_ref());
            ensure!(u64::from(entries) == layout.size());
        }

        Ok(Header {
            magic,
            metric,
            layout,
        })
    }

    /// Number of data bytes required for all subtables.
    fn data_size(&self) -> u64 {
        match (self.metric, &self.layout) {
            (Metric::Wdl, Some(layout)) => layout.sides() as u64 * subtable_bytes(layout),
            _ => 0,
        }
    }
}

fn subtable_bytes(layout: &TableLayout) -> u64 {
    layout.size().div_ceil(2)
}

/// A parsed table file.
///
/// Tables are immutable once loaded and shared between probing threads.
pub struct TableFile {
    path: PathBuf,
    header: Header,
    len: u64,
    data: Box<[u8]>,
}

impl TableFile {
    /// Opens and parses a table file.
    ///
    /// Data shorter than the header requires is accepted. Probes beyond the
    /// end of the available data fail with
    /// [`ProbeError::TruncatedTable`].
    ///
    /// # Errors
    ///
    /// [`LoadError::Read`] if the file cannot be read at all,
    /// [`LoadError::Magic`] or [`LoadError::CorruptedTable`] if it is not a
    /// valid table.
    pub fn open(fs: &dyn Filesystem, path: &Path) -> LoadResult<TableFile> {
        let len = fs.regular_file_size(path)?;
        let file = fs.open(path)?;

        let mut buf = [0; HEADER_SIZE];
        let n = file.read_full_at(ReadHint::Header, 0, &mut buf)?;
        let header = Header::parse(path, &buf[..n])?;

        let available = len.saturating_sub(HEADER_SIZE as u64);
        let wanted = u!(usize::try_from(header.data_size().min(available)).ok());
        let mut data = vec![0; wanted];
        let n = file.read_full_at(ReadHint::Data, HEADER_SIZE as u64, &mut data)?;
        data.truncate(n);

        Ok(TableFile::new(path.to_owned(), len, header, data))
    }

    /// Parses a table file from memory.
    ///
    /// # Errors
    ///
    /// See [`TableFile::open()`].
    pub fn from_bytes<P: Into<PathBuf>>(path: P, bytes: &[u8]) -> LoadResult<TableFile> {
        let path = path.into();
        let mut reader = ByteReader::new(bytes);
        let header = Header::parse(&path, reader.read_bytes(HEADER_SIZE.min(bytes.len()))?)?;
        let wanted = u!(usize::try_from(header.data_size()).ok());
        let data = reader.rest();
        let data = &data[..wanted.min(data.len())];
        Ok(TableFile::new(path, bytes.len() as u64, header, data.to_vec()))
    }

    fn new(path: PathBuf, len: u64, header: Header, data: Vec<u8>) -> TableFile {
        let expected = header.data_size();
        if (data.len() as u64) < expected {
            warn!(
                path = %path.display(),
                expected,
                actual = data.len(),
                "table data truncated"
            );
        }
        TableFile {
            path,
            header,
            len,
            data: data.into_boxed_slice(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw magic number.
    pub fn magic(&self) -> u32 {
        self.header.magic
    }

    pub fn metric(&self) -> Metric {
        self.header.metric
    }

    /// The material configuration, or `None` if the table can be identified
    /// only by its path.
    pub fn material(&self) -> Option<&Material> {
        self.header.layout.as_ref().map(TableLayout::material)
    }

    pub fn layout(&self) -> Option<&TableLayout> {
        self.header.layout.as_ref()
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether all values of the table are available.
    pub fn is_complete(&self) -> bool {
        self.data.len() as u64 >= self.header.data_size()
    }

    /// Reads the raw 4 bit value at an index of a subtable.
    pub fn read_value(&self, side: usize, index: u64) -> Option<u8> {
        let layout = self.layout()?;
        if side >= layout.sides() || index >= layout.size() {
            return None;
        }
        let offset = side as u64 * subtable_bytes(layout) + index / 2;
        let byte = *self.data.get(usize::try_from(offset).ok()?)?;
        Some(if index % 2 == 0 { byte & 0xf } else { byte >> 4 })
    }

    /// Looks up the outcome for the side to move.
    ///
    /// # Errors
    ///
    /// See [`ProbeError`].
    pub fn probe_wdl(&self, board: &Board, turn: Color) -> Result<Wdl, ProbeError> {
        let (layout, material) = match (&self.header.metric, self.layout()) {
            (Metric::Wdl, Some(layout)) => (layout, *layout.material()),
            _ => {
                return Err(ProbeError::MissingTable {
                    metric: Metric::Wdl,
                    material: Material::from_board(board),
                })
            }
        };

        let encoded = encode(board, turn, layout)
            .map_err(|error| ProbeError::UnsupportedEncoding { material, error })?;

        let value = self.read_value(encoded.side, encoded.index).ok_or(
            ProbeError::TruncatedTable {
                material,
                index: encoded.index,
            },
        )?;

        Wdl::from_stored(value).ok_or(ProbeError::CorruptedValue { material, value })
    }
}

impl fmt::Debug for TableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFile")
            .field("path", &self.path)
            .field("metric", &self.header.metric)
            .field("material", &self.material())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(magic: u32, flags: u8, pieces: &[u8], entries: u32) -> Vec<u8> {
        let mut bytes = magic.to_le_bytes().to_vec();
        bytes.push(flags);
        let mut list = [0; MAX_PIECES];
        list[..pieces.len()].copy_from_slice(pieces);
        bytes.extend_from_slice(&list);
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes
    }

    #[test]
    fn test_identity_only() {
        let table = TableFile::from_bytes("mock.rtbw", &header(WDL_MAGIC, 0, &[], 0)).unwrap();
        assert_eq!(table.magic(), 0x7152_5554);
        assert_eq!(table.metric(), Metric::Wdl);
        assert!(table.material().is_none());
        assert!(table.is_complete());
        assert_eq!(table.len(), 16);
        assert_eq!(table.read_value(0, 0), None);
    }

    #[test]
    fn test_material_from_name() {
        let table = TableFile::from_bytes("tables/KRvK.rtbw", &header(WDL_MAGIC, 0, &[], 0)).unwrap();
        assert_eq!(table.material().unwrap().to_string(), "KRvK");
        assert!(!table.is_complete());
        assert_eq!(table.read_value(0, 0), None);
    }

    #[test]
    fn test_dtz() {
        let table = TableFile::from_bytes("KQvK.rtbz", &header(DTZ_MAGIC, 0, &[], 0)).unwrap();
        assert_eq!(table.metric(), Metric::Dtz);
        assert!(table.is_complete());
    }

    #[test]
    fn test_values() {
        // KvK with a white knight: 64 * 63 * 62 indexes per side.
        let size = 64 * 63 * 62;
        let mut bytes = header(WDL_MAGIC, 1, &[6, 14, 2], size);
        let mut data = vec![0x22; 2 * (size as usize / 2)];
        data[0] = 0x40;
        data[size as usize / 2] = 0x03;
        bytes.extend_from_slice(&data);

        let table = TableFile::from_bytes("KNvK.rtbw", &bytes).unwrap();
        assert!(table.is_complete());
        assert_eq!(table.read_value(0, 0), Some(0));
        assert_eq!(table.read_value(0, 1), Some(4));
        assert_eq!(table.read_value(0, 2), Some(2));
        assert_eq!(table.read_value(1, 0), Some(3));
        assert_eq!(table.read_value(1, u64::from(size) - 1), Some(2));
        assert_eq!(table.read_value(1, u64::from(size)), None);
        assert_eq!(table.read_value(2, 0), None);
    }

    #[test]
    fn test_invalid_headers() {
        let invalid = |path: &str, bytes: &[u8]| TableFile::from_bytes(path, bytes).is_err();

        // Too short.
        assert!(invalid("mock.rtbw", &[0x54, 0x55, 0x52]));
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 0, &[], 0)[..12]));

        // Magic.
        assert!(matches!(
            TableFile::from_bytes("mock.rtbw", &header(0x1234_5678, 0, &[], 0)),
            Err(LoadError::Magic { magic: 0x1234_5678 })
        ));

        // Unknown flags.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 4, &[], 0)));

        // Invalid piece bytes.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 7], 0)));
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 0x12], 0)));

        // Pieces after the terminator.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 0, 2], 0)));

        // Side without pieces.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[6, 5], 0)));

        // Pawn after pieces.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 3, &[6, 14, 1], 0)));

        // Missing pawn flag.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[1, 6, 14], 0)));
        assert!(!invalid("mock.rtbw", &header(WDL_MAGIC, 3, &[1, 6, 14], 0)));

        // Missing split flag.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 0, &[6, 14, 2], 0)));

        // Wrong entry count.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 2], 7)));

        // Entry count without material.
        assert!(invalid("mock.rtbw", &header(WDL_MAGIC, 0, &[], 7)));

        // Header and name disagree.
        assert!(invalid("KQvK.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 2], 0)));
        assert!(!invalid("KvKN.rtbw", &header(WDL_MAGIC, 1, &[6, 14, 2], 0)));

        // Name with too many pieces.
        assert!(invalid("KQRBNPPvK.rtbw", &header(WDL_MAGIC, 0, &[], 0)));
    }
}
