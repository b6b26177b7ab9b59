//! Host-side model of the automaton: grid geometry, seeding and the
//! bookkeeping that decides which state buffer is current on a given step.

use std::str::FromStr;

pub mod binding;
pub mod orchestrator;
pub mod pacing;

/// Map a (possibly negative) coordinate pair onto the torus and return the
/// linear offset of that cell. The compute shader wraps neighbours the same way.
pub fn cell_index(x: i64, y: i64, grid_size: u32) -> usize {
    let size = grid_size as i64;
    let x = x.rem_euclid(size);
    let y = y.rem_euclid(size);
    (x + y * size) as usize
}

/// Number of work groups needed along each axis to cover the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Workgroups {
    pub per_axis: u32,
    pub work_group_size: u32,
}

impl Workgroups {
    pub fn for_grid(grid_size: u32, work_group_size: u32) -> Self {
        Self {
            per_axis: grid_size.div_ceil(work_group_size),
            work_group_size,
        }
    }

    /// Total invocations launched by one dispatch
    pub fn invocations(&self) -> u64 {
        let side = self.per_axis as u64 * self.work_group_size as u64;
        side * side
    }

    /// Invocations that fall outside the grid and must do nothing
    pub fn idle_invocations(&self, grid_size: u32) -> u64 {
        self.invocations() - grid_size as u64 * grid_size as u64
    }
}

/// How the first generation is populated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeedPattern {
    /// Visit every `stride`-th cell and make it alive with `alive_probability`.
    Random { stride: usize, alive_probability: f32 },
    /// A single glider in the middle of an empty grid
    Glider,
}

impl SeedPattern {
    pub const fn random() -> Self {
        SeedPattern::Random {
            stride: 1,
            alive_probability: 0.6,
        }
    }

    /// Seeds roughly one cell in three
    pub const fn sparse() -> Self {
        SeedPattern::Random {
            stride: 3,
            alive_probability: 0.6,
        }
    }
}

impl FromStr for SeedPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(SeedPattern::random()),
            "sparse" => Ok(SeedPattern::sparse()),
            "glider" => Ok(SeedPattern::Glider),
            other => Err(format!(
                "unknown pattern `{other}` (expected random, sparse or glider)"
            )),
        }
    }
}

/// Initial contents for the two cell-state buffers.
#[derive(Clone, Debug)]
pub struct GridState {
    pub grid_size: u32,
    pub buffer_a: Vec<u32>,
    pub buffer_b: Vec<u32>,
}

impl GridState {
    /// Seed one generation and copy it into both buffers so the first render
    /// (buffer A) shows exactly what the first compute pass reads.
    pub fn seeded(grid_size: u32, pattern: SeedPattern, rng: &mut fastrand::Rng) -> Self {
        let cells = seed_cells(grid_size, pattern, rng);
        Self {
            grid_size,
            buffer_b: cells.clone(),
            buffer_a: cells,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size as usize * self.grid_size as usize
    }

    /// Size of one state buffer in bytes
    pub fn buffer_size(&self) -> u64 {
        std::mem::size_of_val(self.buffer_a.as_slice()) as u64
    }

    pub fn alive(&self) -> usize {
        self.buffer_a.iter().filter(|&&c| c != 0).count()
    }
}

fn seed_cells(grid_size: u32, pattern: SeedPattern, rng: &mut fastrand::Rng) -> Vec<u32> {
    let mut cells = vec![0u32; grid_size as usize * grid_size as usize];
    match pattern {
        SeedPattern::Random {
            stride,
            alive_probability,
        } => {
            for cell in cells.iter_mut().step_by(stride.max(1)) {
                *cell = (rng.f32() < alive_probability) as u32;
            }
        }
        SeedPattern::Glider => {
            let cx = (grid_size / 2) as i64;
            let cy = (grid_size / 2) as i64;
            for (dx, dy) in [(1, 0), (1, -1), (0, -1), (-1, -1), (0, 1)] {
                cells[cell_index(cx + dx, cy + dy, grid_size)] = 1;
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_index_wraps_toroidally() {
        for grid_size in [1u32, 5, 32] {
            let g = grid_size as i64;
            for x in -g..g {
                for y in -g..g {
                    let idx = cell_index(x, y, grid_size);
                    assert!(idx < (grid_size * grid_size) as usize);
                    assert_eq!(idx, cell_index(x + g, y, grid_size));
                    assert_eq!(idx, cell_index(x, y + g, grid_size));
                }
            }
        }
    }

    #[test]
    fn test_cell_index_layout_is_row_major() {
        assert_eq!(cell_index(0, 0, 32), 0);
        assert_eq!(cell_index(31, 0, 32), 31);
        assert_eq!(cell_index(0, 1, 32), 32);
        assert_eq!(cell_index(-1, 0, 32), 31);
        assert_eq!(cell_index(0, -1, 32), 31 * 32);
        assert_eq!(cell_index(-1, -1, 32), 32 * 32 - 1);
    }

    #[test]
    fn test_dispatch_exact_tiling() {
        let groups = Workgroups::for_grid(32, 8);
        assert_eq!(groups.per_axis, 4);
        assert_eq!(groups.invocations(), 1024);
        assert_eq!(groups.idle_invocations(32), 0);
    }

    #[test]
    fn test_dispatch_over_covers_uneven_grid() {
        let groups = Workgroups::for_grid(30, 8);
        assert_eq!(groups.per_axis, 4);
        assert_eq!(groups.invocations(), 1024);
        assert_eq!(groups.idle_invocations(30), 124);
    }

    #[test]
    fn test_dispatch_small_grid() {
        let groups = Workgroups::for_grid(1, 8);
        assert_eq!(groups.per_axis, 1);
        assert_eq!(groups.idle_invocations(1), 63);
    }

    #[test]
    fn test_seeded_buffers_are_identical() {
        let mut rng = fastrand::Rng::with_seed(42);
        let grid = GridState::seeded(32, SeedPattern::random(), &mut rng);
        assert_eq!(grid.buffer_a.len(), 32 * 32);
        assert_eq!(grid.buffer_a, grid.buffer_b);
        assert_eq!(grid.buffer_size(), 32 * 32 * 4);
    }

    #[test]
    fn test_random_seed_is_mixed() {
        let mut rng = fastrand::Rng::with_seed(1);
        let grid = GridState::seeded(64, SeedPattern::random(), &mut rng);
        let alive = grid.alive();
        assert!(alive > 0);
        assert!(alive < grid.cell_count());
        assert!(grid.buffer_a.iter().all(|&c| c <= 1));
    }

    #[test]
    fn test_sparse_seed_only_touches_every_third_cell() {
        let mut rng = fastrand::Rng::with_seed(3);
        let grid = GridState::seeded(30, SeedPattern::sparse(), &mut rng);
        for (i, &cell) in grid.buffer_a.iter().enumerate() {
            if i % 3 != 0 {
                assert_eq!(cell, 0, "cell {i} should not have been seeded");
            }
        }
        assert!(grid.alive() > 0);
    }

    #[test]
    fn test_same_seed_same_pattern() {
        let a = GridState::seeded(16, SeedPattern::random(), &mut fastrand::Rng::with_seed(9));
        let b = GridState::seeded(16, SeedPattern::random(), &mut fastrand::Rng::with_seed(9));
        assert_eq!(a.buffer_a, b.buffer_a);
    }

    #[test]
    fn test_glider_is_five_cells() {
        let mut rng = fastrand::Rng::with_seed(0);
        let grid = GridState::seeded(8, SeedPattern::Glider, &mut rng);
        assert_eq!(grid.alive(), 5);
        assert_eq!(grid.buffer_a[cell_index(5, 4, 8)], 1);
        assert_eq!(grid.buffer_a[cell_index(3, 3, 8)], 1);
        assert_eq!(grid.buffer_a[cell_index(4, 5, 8)], 1);
    }

    #[test]
    fn test_glider_wraps_on_tiny_grid() {
        let mut rng = fastrand::Rng::with_seed(0);
        let grid = GridState::seeded(2, SeedPattern::Glider, &mut rng);
        assert_eq!(grid.cell_count(), 4);
        assert!(grid.alive() <= 4);
        assert_eq!(grid.buffer_a, grid.buffer_b);
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!("random".parse::<SeedPattern>(), Ok(SeedPattern::random()));
        assert_eq!("Sparse".parse::<SeedPattern>(), Ok(SeedPattern::sparse()));
        assert_eq!("glider".parse::<SeedPattern>(), Ok(SeedPattern::Glider));
        assert!("checkerboard".parse::<SeedPattern>().is_err());
    }
}
