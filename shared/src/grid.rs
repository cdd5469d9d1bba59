/// Side length of the square tile grid.
pub const GRID_SIZE: u32 = 100;

/// Total number of tiles on the board.
pub const TILE_COUNT: u32 = GRID_SIZE * GRID_SIZE;

/// Tile identifier for grid coordinates, column-major: `(x, y)` maps to `x * N + y`.
/// This matches the token numbering on the contract, so a token id is a tile id.
pub fn tile_id(x: u32, y: u32) -> u32 {
    x * GRID_SIZE + y
}

/// Inverse of [`tile_id`].
pub fn tile_coords(id: u32) -> (u32, u32) {
    (id / GRID_SIZE, id % GRID_SIZE)
}

/// Whether `(x, y)` lies on the grid.
pub fn in_bounds(x: u32, y: u32) -> bool {
    x < GRID_SIZE && y < GRID_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_id_is_column_major() {
        assert_eq!(tile_id(0, 0), 0);
        assert_eq!(tile_id(0, 99), 99);
        assert_eq!(tile_id(1, 0), 100);
        assert_eq!(tile_id(99, 99), 9999);
    }

    #[test]
    fn tile_coords_inverts_tile_id() {
        for &(x, y) in &[(0, 0), (0, 99), (99, 0), (99, 99), (42, 17)] {
            assert_eq!(tile_coords(tile_id(x, y)), (x, y));
        }
    }

    #[test]
    fn bounds_check() {
        assert!(in_bounds(0, 0));
        assert!(in_bounds(99, 99));
        assert!(!in_bounds(100, 0));
        assert!(!in_bounds(0, 100));
    }
}
