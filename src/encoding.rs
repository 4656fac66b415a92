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


//! Bijective indexing of piece placements.
//!
//! Identical pieces form a group. The squares of a group are encoded as a
//! combination, counting only squares not already taken by earlier groups,
//! and the groups are combined as digits of a mixed radix number.

use arrayvec::ArrayVec;
use shakmaty::{Board, Color, Piece, Role, Square};

use crate::{
    binomial::binomial,
    errors::{EncodeError, LoadResult},
    material::Material,
    types::{Pieces, MAX_PIECES},
};

/// Pawns can stand on ranks 2 to 7.
const PAWN_SQUARES: u64 = 48;

/// A group of identical pieces encoded together.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Group {
    piece: Piece,
    count: usize,
    size: u64,
    factor: u64,
}

impl Group {
    pub fn piece(&self) -> Piece {
        self.piece
    }

    /// Number of pieces in the group.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of placements of the group, given the earlier groups.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Product of the sizes of all earlier groups.
    pub fn factor(&self) -> u64 {
        self.factor
    }

    fn is_pawn(&self) -> bool {
        self.piece.role == Role::Pawn
    }
}

/// Description of the encoding used for a piece configuration.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pieces: Pieces,
    material: Material,
    groups: ArrayVec<Group, MAX_PIECES>,
    split: bool,
    size: u64,
}

impl TableLayout {
    /// Builds the layout for pieces in the given encoding order.
    ///
    /// Identical pieces must be adjacent and pawns must come first. Each
    /// side needs exactly one king. If `split` is set, there is a separate
    /// subtable for black to move, which only makes sense if the material
    /// is not symmetric.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::CorruptedTable`](crate::LoadError::CorruptedTable)
    /// if the piece list violates any of these rules.
    pub fn new(pieces: Pieces, split: bool) -> LoadResult<TableLayout> {
        let material: Material = pieces.iter().copied().collect();
        ensure!(material.has_one_king_each());
        ensure!(split != material.is_symmetric());

        let mut groups: ArrayVec<Group, MAX_PIECES> = ArrayVec::new();
        let mut pawns_before = 0;
        let mut pieces_before = 0;
        let mut size: u64 = 1;

        for &piece in &pieces {
            if let Some(last) = groups.last_mut() {
                if last.piece == piece {
                    last.count += 1;
                    continue;
                }
            }
            // A piece kind may only appear in one group.
            ensure!(groups.iter().all(|g| g.piece != piece));
            ensure!(piece.role != Role::Pawn || groups.iter().all(Group::is_pawn));
            groups.push(Group {
                piece,
                count: 1,
                size: 0,
                factor: 0,
            });
        }

        for group in &mut groups {
            let free = if group.is_pawn() {
                PAWN_SQUARES - pawns_before
            } else {
                64 - pieces_before
            };
            group.size = binomial(free, group.count as u64);
            group.factor = size;
            ensure!(group.size > 0);
            size = u!(size.checked_mul(group.size));

            if group.is_pawn() {
                pawns_before += group.count as u64;
            }
            pieces_before += group.count as u64;
        }

        Ok(TableLayout {
            pieces,
            material,
            groups,
            split,
            size,
        })
    }

    /// The layout with canonical encoding order for a material signature.
    ///
    /// # Errors
    ///
    /// Fails for material that cannot be stored in a table.
    pub fn from_material(material: &Material) -> LoadResult<TableLayout> {
        ensure!(material.count() <= MAX_PIECES);
        TableLayout::new(material.pieces().collect(), !material.is_symmetric())
    }

    /// Pieces in encoding order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Whether there is a separate subtable for black to move.
    pub fn is_split(&self) -> bool {
        self.split
    }

    /// Number of subtables.
    pub fn sides(&self) -> usize {
        if self.split {
            2
        } else {
            1
        }
    }

    /// Number of indexes in each subtable.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Result of [`encode()`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Encoded {
    /// Subtable: `0` for white to move, `1` for black to move.
    pub side: usize,
    /// Index into the subtable, less than [`TableLayout::size()`].
    pub index: u64,
    /// Whether colors were swapped to match the table.
    pub flipped: bool,
}

/// Computes the index of a placement within a table.
///
/// If the material only matches with colors swapped, or if the material is
/// symmetric and black is to move, the board is mirrored and the colors are
/// swapped before encoding.
///
/// # Errors
///
/// Fails if the material of the board does not match the layout, or if a
/// pawn stands on the first or last rank.
pub fn encode(board: &Board, turn: Color, layout: &TableLayout) -> Result<Encoded, EncodeError> {
    let material = Material::from_board(board);
    let flipped = if material == layout.material {
        material.is_symmetric() && turn == Color::Black
    } else if material.flipped() == layout.material {
        true
    } else {
        return Err(EncodeError::MaterialMismatch);
    };

    let turn = if flipped { !turn } else { turn };
    let side = usize::from(layout.split && turn == Color::Black);

    let mut used: ArrayVec<u32, MAX_PIECES> = ArrayVec::new();
    let mut index = 0;

    for group in &layout.groups {
        let piece = if flipped {
            Piece {
                color: !group.piece.color,
                role: group.piece.role,
            }
        } else {
            group.piece
        };

        let mut squares: ArrayVec<u32, MAX_PIECES> = ArrayVec::new();
        for sq in board.by_piece(piece) {
            if group.is_pawn() && matches!(u32::from(sq) / 8, 0 | 7) {
                return Err(EncodeError::PawnOnBackRank { square: sq });
            }
            let sq = if flipped { sq.flip_vertical() } else { sq };
            squares.push(u32::from(sq));
        }
        squares.sort_unstable();

        let mut n = 0;
        for (i, &sq) in squares.iter().enumerate() {
            let adjust = used.iter().filter(|&&u| u < sq).count() as u32;
            let offset = if group.is_pawn() { 8 } else { 0 };
            n += binomial(u64::from(sq - offset - adjust), i as u64 + 1);
        }

        index += n * group.factor;
        used.extend(squares);
    }

    Ok(Encoded {
        side,
        index,
        flipped,
    })
}

/// Inverse of [`encode()`] for the pieces as listed in the layout, with
/// white to move in the first subtable.
///
/// Returns `None` if `index` is out of range.
pub fn decode(index: u64, layout: &TableLayout) -> Option<Board> {
    if index >= layout.size {
        return None;
    }

    let mut board = Board::empty();
    let mut used: u64 = 0;

    for group in &layout.groups {
        let mut n = (index / group.factor) % group.size;
        let (first, last) = if group.is_pawn() { (8, 56) } else { (0, 64) };

        let mut reduced: ArrayVec<u64, MAX_PIECES> = ArrayVec::new();
        for j in (0..group.count as u64).rev() {
            // Largest a with C(a, j + 1) <= n.
            let mut a = j;
            while binomial(a + 1, j + 1) <= n {
                a += 1;
            }
            n -= binomial(a, j + 1);
            reduced.push(a);
        }

        let mut placed: u64 = 0;
        for a in reduced {
            let sq = (first..last)
                .filter(|&sq| used & (1u64 << sq) == 0)
                .nth(a as usize)?;
            board.set_piece_at(Square::new(sq), group.piece);
            placed |= 1 << sq;
        }
        used |= placed;
    }

    Some(board)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shakmaty::{fen::Fen, CastlingMode, Chess, Position};

    use super::*;

    fn layout(material: &str) -> TableLayout {
        TableLayout::from_material(&material.parse().unwrap()).unwrap()
    }

    fn position(fen: &str) -> Chess {
        fen.parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap()
    }

    #[test]
    fn test_group_sizes() {
        let kqvk = layout("KQvK");
        assert_eq!(kqvk.size(), 64 * 63 * 62);
        assert!(kqvk.is_split());
        assert_eq!(kqvk.sides(), 2);

        let kpvkp = layout("KPvKP");
        let sizes: Vec<u64> = kpvkp.groups().iter().map(Group::size).collect();
        assert_eq!(sizes, [48, 47, 62, 61]);
        assert!(!kpvkp.is_split());

        let knnvk = layout("KNNvK");
        let groups = knnvk.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].count(), 2);
        assert_eq!(groups[2].size(), binomial(62, 2));
        assert_eq!(groups[2].factor(), 64 * 63);
        assert_eq!(knnvk.size(), 64 * 63 * binomial(62, 2));
    }

    #[test]
    fn test_invalid_piece_lists() {
        let w = Color::White;
        let b = Color::Black;

        // Pawns after pieces.
        let pieces = [w.king(), b.king(), w.pawn()].into_iter().collect();
        assert!(TableLayout::new(pieces, true).is_err());

        // Rooks not adjacent.
        let pieces = [w.rook(), w.king(), w.rook(), b.king()].into_iter().collect();
        assert!(TableLayout::new(pieces, true).is_err());

        // No black king.
        let pieces = [w.king(), w.queen()].into_iter().collect();
        assert!(TableLayout::new(pieces, true).is_err());

        // Symmetric material, but split.
        let pieces = [w.king(), b.king()].into_iter().collect();
        assert!(TableLayout::new(pieces, true).is_err());

        // Asymmetric material, but not split.
        let pieces = [w.king(), b.king(), b.knight()].into_iter().collect();
        assert!(TableLayout::new(pieces, false).is_err());
        let pieces = [w.king(), b.king(), b.knight()].into_iter().collect();
        assert!(TableLayout::new(pieces, true).is_ok());
    }

    #[test]
    fn test_encode_kqvk() {
        let layout = layout("KQvK");
        // The black king on h8 skips a1, the queen on b1 skips a1.
        let pos = position("7k/8/8/8/8/8/8/KQ6 w - - 0 1");
        let encoded = encode(pos.board(), pos.turn(), &layout).unwrap();
        assert_eq!(
            encoded,
            Encoded {
                side: 0,
                index: 62 * 64,
                flipped: false,
            }
        );

        let pos = position("7k/8/8/8/8/8/8/KQ6 b - - 0 1");
        assert_eq!(encode(pos.board(), pos.turn(), &layout).unwrap().side, 1);
    }

    #[test]
    fn test_encode_flipped() {
        let layout = layout("KQvK");
        let white = position("8/8/8/8/3Q4/8/1k6/3K4 b - - 0 1");
        let black = position("3k4/1K6/8/3q4/8/8/8/8 w - - 0 1");

        let a = encode(white.board(), white.turn(), &layout).unwrap();
        let b = encode(black.board(), black.turn(), &layout).unwrap();
        assert!(!a.flipped);
        assert!(b.flipped);
        assert_eq!(a.side, 1);
        assert_eq!(Encoded { flipped: true, ..a }, b);
    }

    #[test]
    fn test_encode_symmetric_black_to_move() {
        let layout = layout("KRvKR");
        let wtm = position("4k3/r7/8/8/8/8/R7/4K3 w - - 0 1");
        let btm = position("4k3/r7/8/8/8/8/R7/4K3 b - - 0 1");

        let a = encode(wtm.board(), wtm.turn(), &layout).unwrap();
        let b = encode(btm.board(), btm.turn(), &layout).unwrap();
        assert_eq!(a.side, 0);
        assert_eq!(b.side, 0);
        assert!(!a.flipped);
        assert!(b.flipped);
        // The position is its own mirror image.
        assert_eq!(a.index, b.index);
    }

    #[test]
    fn test_encode_mismatch() {
        let layout = layout("KQvK");
        let pos = position("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        assert_eq!(
            encode(pos.board(), pos.turn(), &layout),
            Err(EncodeError::MaterialMismatch)
        );
    }

    #[test]
    fn test_pawn_on_back_rank() {
        let layout = layout("KPvK");
        let mut board = Board::empty();
        board.set_piece_at(Square::E1, Color::White.king());
        board.set_piece_at(Square::E8, Color::Black.king());
        board.set_piece_at(Square::A8, Color::White.pawn());
        assert_eq!(
            encode(&board, Color::White, &layout),
            Err(EncodeError::PawnOnBackRank { square: Square::A8 })
        );
    }

    #[test]
    fn test_decode_first_and_last() {
        let layout = layout("KPvK");
        let first = decode(0, &layout).unwrap();
        assert_eq!(first.piece_at(Square::A2), Some(Color::White.pawn()));
        assert_eq!(first.piece_at(Square::A1), Some(Color::White.king()));
        assert_eq!(first.piece_at(Square::B1), Some(Color::Black.king()));

        let last = decode(layout.size() - 1, &layout).unwrap();
        assert_eq!(last.piece_at(Square::H7), Some(Color::White.pawn()));
        assert_eq!(last.piece_at(Square::H8), Some(Color::White.king()));
        assert_eq!(last.piece_at(Square::G8), Some(Color::Black.king()));

        assert!(decode(layout.size(), &layout).is_none());
    }

    proptest! {
        #[test]
        fn test_bijection(
            material in prop::sample::select(vec![
                "KQvK", "KRvKN", "KPvK", "KPPvKP", "KNNvKB", "KBNvK", "KRPvKR", "KQQvKQ",
            ]),
            seed in any::<u64>(),
        ) {
            let layout = layout(material);
            let index = seed % layout.size();
            let board = decode(index, &layout).unwrap();
            let encoded = encode(&board, Color::White, &layout).unwrap();
            prop_assert_eq!(encoded.index, index);
            prop_assert_eq!(encoded.side, 0);
            prop_assert!(!encoded.flipped);
        }
    }
}
