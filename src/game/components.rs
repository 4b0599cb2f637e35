//! Plain-data components shared by the rules engines.

use serde::{Deserialize, Serialize};

use crate::config::Controller;
use crate::ecs::{Component, EntityId, EntityRemap};

/// A grid cell. Row 0 is the gravity floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Row index.
    pub row: u16,
    /// Column index.
    pub col: u16,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Whether two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        u32::from(self.row.abs_diff(other.row)) + u32::from(self.col.abs_diff(other.col)) == 1
    }

    /// Edge neighbours inside a `rows` x `cols` grid.
    #[must_use]
    pub fn neighbors(self, rows: u16, cols: u16) -> Vec<Position> {
        let mut out = Vec::with_capacity(4);
        if self.row > 0 {
            out.push(Position::new(self.row - 1, self.col));
        }
        if self.row + 1 < rows {
            out.push(Position::new(self.row + 1, self.col));
        }
        if self.col > 0 {
            out.push(Position::new(self.row, self.col - 1));
        }
        if self.col + 1 < cols {
            out.push(Position::new(self.row, self.col + 1));
        }
        out
    }
}

impl Component for Position {}

/// A tile's type tag and whether the cell currently holds a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Resource type name.
    pub kind: String,
    /// `false` means empty, pending refill.
    pub active: bool,
}

impl Tile {
    /// An active tile of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            active: true,
        }
    }
}

impl Component for Tile {}

/// The grid: one tile entity per cell, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: u16,
    cols: u16,
    cells: Vec<EntityId>,
}

impl Board {
    /// Wrap a row-major cell table. `cells.len()` must equal `rows * cols`.
    #[must_use]
    pub fn new(rows: u16, cols: u16, cells: Vec<EntityId>) -> Self {
        debug_assert_eq!(cells.len(), usize::from(rows) * usize::from(cols));
        Self { rows, cols, cells }
    }

    /// Row count.
    #[must_use]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Column count.
    #[must_use]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the board has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the position lies on the grid.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Tile entity at a position, if on the grid.
    #[must_use]
    pub fn tile_at(&self, pos: Position) -> Option<EntityId> {
        if !self.contains(pos) {
            return None;
        }
        self.cells
            .get(usize::from(pos.row) * usize::from(self.cols) + usize::from(pos.col))
            .copied()
    }

    /// Every position, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position::new(row, col)))
    }

    /// Row-major tile entities.
    #[must_use]
    pub fn cells(&self) -> &[EntityId] {
        &self.cells
    }
}

impl Component for Board {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        for cell in &mut self.cells {
            *cell = remap.apply(*cell);
        }
    }
}

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    /// Current value, never below zero.
    pub current: i64,
    /// Cap for healing.
    pub max: i64,
}

impl Health {
    /// Full health.
    #[must_use]
    pub fn full(max: i64) -> Self {
        Self { current: max, max }
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0
    }
}

impl Component for Health {}

/// Marks an entity as a turn-taking owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    /// Display name.
    pub name: String,
    /// Human or AI.
    pub controller: Controller,
}

impl Component for Combatant {}

/// The owner is choosing a tile target for an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targeting {
    /// Ability waiting for its target.
    pub ability: EntityId,
}

impl Component for Targeting {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.ability = remap.apply(self.ability);
    }
}

/// First half of a click-click swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Selected cell.
    pub first: Position,
}

impl Component for Selection {}


/// Kani proofs for grid arithmetic.
///
/// Run with: `cargo kani`
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Adjacency is symmetric and irreflexive for every pair of cells.
    #[kani::proof]
    fn prove_adjacency_symmetric() {
        let a = Position::new(kani::any(), kani::any());
        let b = Position::new(kani::any(), kani::any());
        assert_eq!(a.is_adjacent(b), b.is_adjacent(a));
        assert!(!a.is_adjacent(a));
    }

    /// The row-major index of an on-grid cell never leaves the table.
    #[kani::proof]
    fn prove_cell_index_in_bounds() {
        let rows: u16 = kani::any();
        let cols: u16 = kani::any();
        let pos = Position::new(kani::any(), kani::any());
        kani::assume(pos.row < rows && pos.col < cols);
        let index = usize::from(pos.row) * usize::from(cols) + usize::from(pos.col);
        assert!(index < usize::from(rows) * usize::from(cols));
    }
}
