//! The four-ray blast computation, shared by the server (which decides
//! what a bomb destroys) and the client (which re-derives the same
//! affected cells from a `BombExploded` event to render an explosion
//! overlay.
//!
//! Grounded on `examples/original_source/bomb-it-server.cpp`'s
//! `handle_explosion_stripe`/`handle_explosions`.

use std::collections::HashSet;

use crate::types::{Direction, Position};

/// `bomb_pos` is always affected. If it isn't itself a block, four rays
/// walk outward from it up to `radius` cells, each stopping at the grid
/// edge or at the first block it steps onto (the block is included
/// before the ray stops).
pub fn affected_cells(
    bomb_pos: Position,
    blocks: &HashSet<Position>,
    radius: u16,
    size_x: u16,
    size_y: u16,
) -> HashSet<Position> {
    let mut affected = HashSet::new();
    affected.insert(bomb_pos);
    if blocks.contains(&bomb_pos) {
        return affected;
    }
    for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
        let mut cur = bomb_pos;
        for _ in 0..radius {
            let Some(next) = cur.stepped(dir, size_x, size_y) else {
                break;
            };
            affected.insert(next);
            if blocks.contains(&next) {
                break;
            }
            cur = next;
        }
    }
    affected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blast_radius_one() {
        let affected = affected_cells(Position::new(1, 1), &HashSet::new(), 1, 3, 3);
        let expected: HashSet<Position> = [
            Position::new(1, 1),
            Position::new(2, 1),
            Position::new(0, 1),
            Position::new(1, 2),
            Position::new(1, 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(affected, expected);
    }

    #[test]
    fn block_absorbs_blast_along_its_ray() {
        let mut blocks = HashSet::new();
        blocks.insert(Position::new(2, 1));
        let affected = affected_cells(Position::new(1, 1), &blocks, 3, 5, 5);
        assert!(affected.contains(&Position::new(2, 1)));
        assert!(!affected.contains(&Position::new(3, 1)));
        assert!(affected.contains(&Position::new(1, 4)));
    }

    #[test]
    fn bomb_on_a_block_only_affects_its_own_cell() {
        let mut blocks = HashSet::new();
        blocks.insert(Position::new(1, 1));
        let affected = affected_cells(Position::new(1, 1), &blocks, 3, 5, 5);
        assert_eq!(affected.len(), 1);
    }
}
