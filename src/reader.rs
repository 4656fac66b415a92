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


use std::io::{self, Cursor, Read as _};

use byteorder::{ReadBytesExt as _, LE};

/// A cursor over a byte slice, reading little endian integers.
///
/// Reading past the end fails with [`io::ErrorKind::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader {
            inner: Cursor::new(bytes),
        }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.inner.position() as usize
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.inner.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves to an absolute offset. Offsets past the end are allowed, but
    /// any subsequent read fails.
    pub fn seek(&mut self, pos: usize) {
        self.inner.set_position(pos as u64);
    }

    /// Advances by `n` bytes.
    ///
    /// # Errors
    ///
    /// Fails without moving if fewer than `n` bytes remain.
    pub fn skip(&mut self, n: usize) -> io::Result<()> {
        if n > self.remaining() {
            return Err(eof());
        }
        self.seek(self.position() + n);
        Ok(())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.inner.read_u16::<LE>()
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.inner.read_u32::<LE>()
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Borrows the next `n` bytes from the underlying slice.
    pub fn read_bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(eof());
        }
        let start = self.position();
        let bytes: &'a [u8] = *self.inner.get_ref();
        self.seek(start + n);
        Ok(&bytes[start..start + n])
    }

    /// Borrows everything that has not been read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes: &'a [u8] = *self.inner.get_ref();
        let start = self.position().min(bytes.len());
        self.seek(bytes.len());
        &bytes[start..]
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of table data")
}
