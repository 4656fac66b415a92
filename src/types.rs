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

use std::{fmt, ops::Neg};

use arrayvec::ArrayVec;
use shakmaty::Piece;

/// Tables are available for up to 7 pieces.
pub const MAX_PIECES: usize = 7;

/// List of pieces in encoding order.
pub type Pieces = ArrayVec<Piece, MAX_PIECES>;

/// Metric stored in a table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Metric {
    /// Win/draw/loss.
    Wdl,
    /// Distance to zeroing. Recognized, but never decoded.
    Dtz,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Metric::Wdl => "wdl",
            Metric::Dtz => "dtz",
        })
    }
}

/// 5-valued evaluation of a position in the context of the 50-move drawing
/// rule.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(i8)]
pub enum Wdl {
    /// Unconditional loss for the side to move.
    Loss = -2,
    /// Loss that can be saved by the 50-move rule.
    BlessedLoss = -1,
    /// Unconditional draw.
    Draw = 0,
    /// Win that can be frustrated by the 50-move rule.
    CursedWin = 1,
    /// Unconditional win.
    Win = 2,
}

impl Wdl {
    /// Maps a 4 bit value stored in a table.
    pub(crate) fn from_stored(value: u8) -> Option<Wdl> {
        Some(match value {
            0 => Wdl::Loss,
            1 => Wdl::BlessedLoss,
            2 => Wdl::Draw,
            3 => Wdl::CursedWin,
            4 => Wdl::Win,
            _ => return None,
        })
    }

    /// The 4 bit value used to store `self` in a table.
    pub fn to_stored(self) -> u8 {
        (i8::from(self) + 2) as u8
    }
}

impl Neg for Wdl {
    type Output = Wdl;

    fn neg(self) -> Wdl {
        match self {
            Wdl::Loss => Wdl::Win,
            Wdl::BlessedLoss => Wdl::CursedWin,
            Wdl::Draw => Wdl::Draw,
            Wdl::CursedWin => Wdl::BlessedLoss,
            Wdl::Win => Wdl::Loss,
        }
    }
}

impl From<Wdl> for i8 {
    #[inline]
    fn from(wdl: Wdl) -> i8 {
        wdl as i8
    }
}

/// Outcome of [`Tablebase::probe()`](crate::Tablebase::probe).
///
/// Unlike [`Wdl`] this has an [`Unknown`](ProbeResult::Unknown) variant,
/// returned whenever no table could answer the query.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProbeResult {
    Win,
    Loss,
    Draw,
    CursedWin,
    BlessedLoss,
    Unknown,
}

impl ProbeResult {
    /// The underlying [`Wdl`], unless the result is unknown.
    pub fn wdl(self) -> Option<Wdl> {
        Some(match self {
            ProbeResult::Win => Wdl::Win,
            ProbeResult::Loss => Wdl::Loss,
            ProbeResult::Draw => Wdl::Draw,
            ProbeResult::CursedWin => Wdl::CursedWin,
            ProbeResult::BlessedLoss => Wdl::BlessedLoss,
            ProbeResult::Unknown => return None,
        })
    }

    pub fn is_unknown(self) -> bool {
        self == ProbeResult::Unknown
    }
}

impl From<Wdl> for ProbeResult {
    fn from(wdl: Wdl) -> ProbeResult {
        match wdl {
            Wdl::Win => ProbeResult::Win,
            Wdl::Loss => ProbeResult::Loss,
            Wdl::Draw => ProbeResult::Draw,
            Wdl::CursedWin => ProbeResult::CursedWin,
            Wdl::BlessedLoss => ProbeResult::BlessedLoss,
        }
    }
}

impl From<Option<Wdl>> for ProbeResult {
    fn from(wdl: Option<Wdl>) -> ProbeResult {
        wdl.map_or(ProbeResult::Unknown, ProbeResult::from)
    }
}
