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


use std::{cmp::Ordering, fmt, str::FromStr};

use shakmaty::{Board, Color, Piece, Role};

use crate::errors::ParseMaterialError;

fn role_index(role: Role) -> usize {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

/// Piece counts of one side, indexed from pawn to king.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
struct MaterialSide {
    by_role: [u8; 6],
}

impl MaterialSide {
    fn from_str_part(s: &str) -> Result<MaterialSide, ParseMaterialError> {
        let mut side = MaterialSide::default();
        for ch in s.chars() {
            if !ch.is_ascii_uppercase() {
                return Err(ParseMaterialError);
            }
            let role = Role::from_char(ch).ok_or(ParseMaterialError)?;
            side.by_role[role_index(role)] += 1;
        }
        Ok(side)
    }

    fn get(&self, role: Role) -> u8 {
        self.by_role[role_index(role)]
    }

    fn count(&self) -> usize {
        self.by_role.iter().copied().map(usize::from).sum()
    }
}

impl Ord for MaterialSide {
    fn cmp(&self, other: &MaterialSide) -> Ordering {
        self.count().cmp(&other.count()).then_with(|| {
            // Most valuable role first.
            self.by_role.iter().rev().cmp(other.by_role.iter().rev())
        })
    }
}

impl PartialOrd for MaterialSide {
    fn partial_cmp(&self, other: &MaterialSide) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MaterialSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for role in Role::ALL.into_iter().rev() {
            for _ in 0..self.get(role) {
                write!(f, "{}", role.upper_char())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MaterialSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count() > 0 {
            <Self as fmt::Display>::fmt(self, f)
        } else {
            f.write_str("-")
        }
    }
}

/// A material signature, such as `KQvK`.
///
/// Compares as a multiset of pieces. Use [`Material::normalized()`] to
/// compare without regard to colors.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Material {
    white: MaterialSide,
    black: MaterialSide,
}

impl Material {
    /// Get the material configuration for a [`Board`].
    pub fn from_board(board: &Board) -> Material {
        board
            .occupied()
            .into_iter()
            .filter_map(|sq| board.piece_at(sq))
            .collect()
    }

    fn side(&self, color: Color) -> &MaterialSide {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn side_mut(&mut self, color: Color) -> &mut MaterialSide {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Number of pieces of the given kind.
    pub fn by_piece(&self, piece: Piece) -> u8 {
        self.side(piece.color).get(piece.role)
    }

    /// Number of pieces of the given color.
    pub fn by_color(&self, color: Color) -> usize {
        self.side(color).count()
    }

    /// Total number of pieces.
    pub fn count(&self) -> usize {
        self.white.count() + self.black.count()
    }

    pub fn has_pawns(&self) -> bool {
        self.white.get(Role::Pawn) > 0 || self.black.get(Role::Pawn) > 0
    }

    /// Both sides have the same pieces.
    pub fn is_symmetric(&self) -> bool {
        self.white == self.black
    }

    /// Swap colors.
    pub fn flipped(&self) -> Material {
        Material {
            white: self.black,
            black: self.white,
        }
    }

    /// Colors swapped so that white is the stronger side.
    pub fn normalized(&self) -> Material {
        if self.is_black_stronger() {
            self.flipped()
        } else {
            *self
        }
    }

    /// Black has more or more valuable pieces than white.
    pub(crate) fn is_black_stronger(&self) -> bool {
        self.black > self.white
    }

    /// Pieces in the canonical encoding order: pawns first, then from most
    /// to least valuable, white before black within each kind.
    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        const ORDER: [Role; 6] = [
            Role::Pawn,
            Role::King,
            Role::Queen,
            Role::Rook,
            Role::Bishop,
            Role::Knight,
        ];
        ORDER.into_iter().flat_map(move |role| {
            Color::ALL.into_iter().flat_map(move |color| {
                let piece = Piece { color, role };
                (0..self.by_piece(piece)).map(move |_| piece)
            })
        })
    }

    /// Exactly one king per side.
    pub(crate) fn has_one_king_each(&self) -> bool {
        self.white.get(Role::King) == 1 && self.black.get(Role::King) == 1
    }
}

impl FromIterator<Piece> for Material {
    fn from_iter<I>(iter: I) -> Material
    where
        I: IntoIterator<Item = Piece>,
    {
        let mut material = Material::default();
        for piece in iter {
            material.side_mut(piece.color).by_role[role_index(piece.role)] += 1;
        }
        material
    }
}

impl FromStr for Material {
    type Err = ParseMaterialError;

    fn from_str(s: &str) -> Result<Material, ParseMaterialError> {
        if s.len() > 64 + 1 {
            return Err(ParseMaterialError);
        }

        let (white, black) = s.split_once('v').ok_or(ParseMaterialError)?;
        let material = Material {
            white: MaterialSide::from_str_part(white)?,
            black: MaterialSide::from_str_part(black)?,
        };

        if !material.has_one_king_each() {
            return Err(ParseMaterialError);
        }
        Ok(material)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.white, self.black)
    }
}
