#![allow(dead_code)]

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use shakmaty::{fen::Fen, CastlingMode, Chess, Color, Piece, Position as _, Role};
use wdl_tablebase::{
    encode, Filesystem, OsFilesystem, RandomAccessFile, TableLayout, Wdl, MAX_PIECES, WDL_MAGIC,
};

pub fn position(fen: &str) -> Chess {
    fen.parse::<Fen>()
        .expect("valid fen")
        .into_position(CastlingMode::Standard)
        .expect("legal position")
}

fn piece_byte(piece: Piece) -> u8 {
    let role = match piece.role {
        Role::Pawn => 1,
        Role::Knight => 2,
        Role::Bishop => 3,
        Role::Rook => 4,
        Role::Queen => 5,
        Role::King => 6,
    };
    role | if piece.color == Color::Black { 8 } else { 0 }
}

/// Builds table files in memory. All positions are drawn unless set
/// otherwise.
pub struct TableBuilder {
    layout: TableLayout,
    data: Vec<u8>,
}

impl TableBuilder {
    pub fn new(material: &str) -> TableBuilder {
        let material = material.parse().expect("valid material");
        let layout = TableLayout::from_material(&material).expect("valid layout");
        let len = layout.sides() * (layout.size() as usize).div_ceil(2);
        TableBuilder {
            layout,
            data: vec![0x22; len],
        }
    }

    pub fn set(&mut self, fen: &str, wdl: Wdl) -> &mut TableBuilder {
        self.set_raw(fen, wdl.to_stored())
    }

    pub fn set_raw(&mut self, fen: &str, value: u8) -> &mut TableBuilder {
        let pos = position(fen);
        let encoded = encode(pos.board(), pos.turn(), &self.layout).expect("encodable");
        let offset =
            encoded.side * (self.layout.size() as usize).div_ceil(2) + encoded.index as usize / 2;
        let byte = &mut self.data[offset];
        *byte = if encoded.index % 2 == 0 {
            (*byte & 0xf0) | value
        } else {
            (*byte & 0x0f) | (value << 4)
        };
        self
    }

    fn header(&self, with_pieces: bool) -> Vec<u8> {
        let mut bytes = WDL_MAGIC.to_le_bytes().to_vec();
        let mut flags = 0;
        let mut pieces = [0; MAX_PIECES];
        let mut entries = 0;
        if with_pieces {
            if self.layout.is_split() {
                flags |= 1;
            }
            if self.layout.material().has_pawns() {
                flags |= 2;
            }
            for (byte, &piece) in pieces.iter_mut().zip(self.layout.pieces()) {
                *byte = piece_byte(piece);
            }
            entries = u32::try_from(self.layout.size()).expect("small table");
        }
        bytes.push(flags);
        bytes.extend_from_slice(&pieces);
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes
    }

    /// Table with the piece list in the header.
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = self.header(true);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Table that relies on its file name for the material.
    pub fn anonymous_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header(false);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        write_file(dir, name, &self.bytes())
    }
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write table");
    path
}

/// A 16 byte WDL header without any pieces.
pub fn mock_header() -> Vec<u8> {
    let mut bytes = vec![0; 16];
    bytes[..4].copy_from_slice(&WDL_MAGIC.to_le_bytes());
    bytes
}

/// Delegates to the operating system, counting opened files.
#[derive(Default)]
pub struct CountingFilesystem {
    opened: AtomicUsize,
}

impl CountingFilesystem {
    pub fn new() -> Arc<CountingFilesystem> {
        Arc::new(CountingFilesystem::default())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Filesystem for CountingFilesystem {
    fn regular_file_size(&self, path: &Path) -> io::Result<u64> {
        OsFilesystem.regular_file_size(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        OsFilesystem.read_dir(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn RandomAccessFile>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        OsFilesystem.open(path)
    }
}
