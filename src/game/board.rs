//! Board matching and cascade resolution.
//!
//! The board is a fixed grid of tile entities, one per cell. Clearing marks
//! tiles inactive; gravity compacts each column toward row 0 by moving tile
//! *types* between cells; refill gives every inactive cell a new random type.
//! A cell's entity never changes, so the one-tile-per-cell invariant holds by
//! construction.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::IndexedRandom;
use tracing::debug;

use crate::context::SimulationContext;
use crate::ecs::{EntityId, EntityStore};
use crate::events::{AnimationKind, Event, EventKind, TilesCleared};
use crate::game::turn::{self, ActionSource, TurnBlock};
use crate::game::{Board, Position, Tile};

/// Why a swap request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRejection {
    /// Requester does not hold the turn.
    NotActiveOwner,
    /// The previous action is still resolving.
    ActionInFlight,
    /// A cell lies outside the grid, or there is no board.
    OutOfBounds,
    /// Cells do not share an edge.
    NotAdjacent,
    /// A cell is empty.
    InactiveTile,
    /// Both cells hold the same type.
    SameKind,
    /// The swap would not create a match through either cell.
    NoMatch,
}

impl From<TurnBlock> for SwapRejection {
    fn from(block: TurnBlock) -> Self {
        match block {
            TurnBlock::NotActiveOwner => SwapRejection::NotActiveOwner,
            TurnBlock::ActionInFlight => SwapRejection::ActionInFlight,
        }
    }
}

/// One tile moved by gravity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravityMove {
    /// Cell the type left.
    pub from: Position,
    /// Cell the type landed in.
    pub to: Position,
    /// Moved tile type.
    pub kind: String,
}

/// A tile removed by a clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedTile {
    /// Cell that went inactive.
    pub position: Position,
    /// Type it held.
    pub kind: String,
}

/// Everything one clear-and-cascade call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Every cleared tile, in clear order.
    pub cleared: Vec<ClearedTile>,
    /// Every gravity move.
    pub moves: Vec<GravityMove>,
    /// Cells refilled with new tiles.
    pub refilled: Vec<Position>,
    /// Follow-up clears after the initial one.
    pub depth: u32,
}

impl CascadeReport {
    fn absorb(&mut self, step: CascadeReport) {
        self.cleared.extend(step.cleared);
        self.moves.extend(step.moves);
        self.refilled.extend(step.refilled);
    }
}

/// Snapshot of tile types, `None` for inactive cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindGrid {
    rows: u16,
    cols: u16,
    kinds: Vec<Option<String>>,
}

impl KindGrid {
    /// Capture the live board. Missing tiles read as inactive.
    #[must_use]
    pub fn capture(store: &EntityStore, board: &Board) -> Self {
        let kinds = board
            .cells()
            .iter()
            .map(|&id| {
                store
                    .get::<Tile>(id)
                    .filter(|t| t.active)
                    .map(|t| t.kind.clone())
            })
            .collect();
        Self {
            rows: board.rows(),
            cols: board.cols(),
            kinds,
        }
    }

    /// Build from rows of whitespace-separated type names, row 0 first.
    /// A `.` marks an inactive cell.
    #[must_use]
    pub fn from_rows(rows: &[&str]) -> Self {
        let parsed: Vec<Vec<Option<String>>> = rows
            .iter()
            .map(|line| {
                line.split_whitespace()
                    .map(|k| (k != ".").then(|| k.to_string()))
                    .collect()
            })
            .collect();
        let cols = parsed.iter().map(Vec::len).max().unwrap_or(0);
        let kinds = parsed
            .into_iter()
            .flat_map(|mut row| {
                row.resize(cols, None);
                row
            })
            .collect();
        Self {
            rows: u16::try_from(rows.len()).unwrap_or(u16::MAX),
            cols: u16::try_from(cols).unwrap_or(u16::MAX),
            kinds,
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols)
            .then(|| usize::from(pos.row) * usize::from(self.cols) + usize::from(pos.col))
    }

    /// Type at a cell.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<&str> {
        self.index(pos)
            .and_then(|i| self.kinds.get(i))
            .and_then(Option::as_deref)
    }

    /// Exchange two cells. Out-of-range positions are ignored.
    pub fn swap(&mut self, a: Position, b: Position) {
        if let (Some(i), Some(j)) = (self.index(a), self.index(b)) {
            self.kinds.swap(i, j);
        }
    }

    fn run_sets(&self, min_run: usize) -> Vec<BTreeSet<Position>> {
        let min_run = min_run.max(1);
        let mut sets = Vec::new();
        let mut scan = |line: Vec<Position>| {
            let mut start = 0;
            while start < line.len() {
                let kind = self.get(line[start]);
                let mut end = start + 1;
                while end < line.len() && kind.is_some() && self.get(line[end]) == kind {
                    end += 1;
                }
                if kind.is_some() && end - start >= min_run {
                    sets.push(line[start..end].iter().copied().collect());
                }
                start = end;
            }
        };
        for row in 0..self.rows {
            scan((0..self.cols).map(|col| Position::new(row, col)).collect());
        }
        for col in 0..self.cols {
            scan((0..self.rows).map(|row| Position::new(row, col)).collect());
        }
        sets
    }

    /// Maximal runs of at least `min_run` identical active types, with
    /// intersecting runs merged into flat groups. Groups and their positions
    /// are sorted.
    #[must_use]
    pub fn find_matches(&self, min_run: usize) -> Vec<Vec<Position>> {
        merge_overlapping(self.run_sets(min_run))
    }
}

fn merge_overlapping(mut sets: Vec<BTreeSet<Position>>) -> Vec<Vec<Position>> {
    let mut merged = true;
    while merged {
        merged = false;
        'outer: for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                if !sets[i].is_disjoint(&sets[j]) {
                    let other = sets.swap_remove(j);
                    sets[i].extend(other);
                    merged = true;
                    break 'outer;
                }
            }
        }
    }
    let mut groups: Vec<Vec<Position>> = sets.into_iter().map(|s| s.into_iter().collect()).collect();
    groups.sort();
    groups
}

/// The board entity and a copy of its cell table.
#[must_use]
pub fn board_of(store: &EntityStore) -> Option<(EntityId, Board)> {
    store.singleton::<Board>().map(|(id, b)| (id, b.clone()))
}

/// Tile entity at a position.
#[must_use]
pub fn tile_entity(store: &EntityStore, pos: Position) -> Option<EntityId> {
    store.singleton::<Board>().and_then(|(_, b)| b.tile_at(pos))
}

/// Active tile type at a position.
#[must_use]
pub fn tile_kind(store: &EntityStore, pos: Position) -> Option<&str> {
    tile_entity(store, pos)
        .and_then(|id| store.get::<Tile>(id))
        .filter(|t| t.active)
        .map(|t| t.kind.as_str())
}

/// Match groups on the live board.
#[must_use]
pub fn find_matches(store: &EntityStore, min_run: usize) -> Vec<Vec<Position>> {
    store
        .singleton::<Board>()
        .map(|(_, board)| KindGrid::capture(store, board).find_matches(min_run))
        .unwrap_or_default()
}

/// Whether swapping `a` and `b` would create a match that includes either cell.
#[must_use]
pub fn swap_creates_match(store: &EntityStore, a: Position, b: Position, min_run: usize) -> bool {
    let Some((_, board)) = store.singleton::<Board>() else {
        return false;
    };
    let mut grid = KindGrid::capture(store, board);
    grid.swap(a, b);
    grid.find_matches(min_run)
        .iter()
        .any(|group| group.contains(&a) || group.contains(&b))
}

/// Check a swap without performing it.
///
/// # Errors
///
/// Returns why the swap is illegal on the board as it stands.
pub fn validate_swap(
    store: &EntityStore,
    a: Position,
    b: Position,
    min_run: usize,
) -> Result<(), SwapRejection> {
    let Some((_, board)) = store.singleton::<Board>() else {
        return Err(SwapRejection::OutOfBounds);
    };
    if !board.contains(a) || !board.contains(b) {
        return Err(SwapRejection::OutOfBounds);
    }
    if !a.is_adjacent(b) {
        return Err(SwapRejection::NotAdjacent);
    }
    let (Some(kind_a), Some(kind_b)) = (tile_kind(store, a), tile_kind(store, b)) else {
        return Err(SwapRejection::InactiveTile);
    };
    if kind_a == kind_b {
        return Err(SwapRejection::SameKind);
    }
    if !swap_creates_match(store, a, b, min_run) {
        return Err(SwapRejection::NoMatch);
    }
    Ok(())
}

/// Every legal swap, scanning each cell's right and upper neighbour.
#[must_use]
pub fn legal_swaps(store: &EntityStore, min_run: usize) -> Vec<(Position, Position)> {
    let Some((_, board)) = store.singleton::<Board>() else {
        return Vec::new();
    };
    let mut swaps = Vec::new();
    for a in board.positions() {
        for b in [Position::new(a.row, a.col + 1), Position::new(a.row + 1, a.col)] {
            if validate_swap(store, a, b, min_run).is_ok() {
                swaps.push((a, b));
            }
        }
    }
    swaps
}

fn swap_tiles(store: &mut EntityStore, a: Position, b: Position) {
    let (Some(ea), Some(eb)) = (tile_entity(store, a), tile_entity(store, b)) else {
        return;
    };
    let (Some(ta), Some(tb)) = (store.get::<Tile>(ea).cloned(), store.get::<Tile>(eb).cloned())
    else {
        return;
    };
    store.insert(ea, tb);
    store.insert(eb, ta);
}

/// Handle a swap request: validate, commit the action, swap, resolve.
pub fn request_swap(ctx: &mut SimulationContext, owner: EntityId, a: Position, b: Position) {
    let min_run = ctx.config().min_run;
    let verdict = turn::check_can_act(&ctx.store, owner)
        .map_err(SwapRejection::from)
        .and_then(|()| validate_swap(&ctx.store, a, b, min_run));
    if let Err(reason) = verdict {
        debug!(target: "tessera::board", owner, ?a, ?b, ?reason, "swap rejected");
        ctx.emit(Event::SwapRejected { owner, a, b, reason });
        return;
    }

    ctx.emit(Event::ActionCommitted {
        owner,
        source: ActionSource::Swap,
        ends_turn: true,
    });
    swap_tiles(&mut ctx.store, a, b);
    ctx.emit(Event::SwapApplied { owner, a, b });
    resolve_matches(ctx);
}

/// Clear whatever matches the board currently holds, then cascade.
///
/// Emits `MatchFound` for the initial groups (if any) and always finishes
/// with `CascadeComplete`.
pub fn resolve_matches(ctx: &mut SimulationContext) -> CascadeReport {
    let groups = find_matches(&ctx.store, ctx.config().min_run);
    if groups.is_empty() {
        ctx.emit(Event::CascadeComplete { depth: 0 });
        return CascadeReport::default();
    }
    let positions: Vec<Position> = groups.iter().flatten().copied().collect();
    ctx.emit(Event::MatchFound { groups });
    clear_and_cascade(ctx, &positions, true)
}

/// Alias of [`resolve_matches`] used after out-of-band board edits.
pub fn settle_board(ctx: &mut SimulationContext) -> CascadeReport {
    resolve_matches(ctx)
}

/// Clear `positions`, then keep matching, clearing and refilling until the
/// board is stable.
///
/// The loop runs at most once per board cell and stops early when a step
/// clears nothing, so it always terminates. Out-of-range and already
/// inactive positions are ignored.
pub fn clear_and_cascade(
    ctx: &mut SimulationContext,
    positions: &[Position],
    refill: bool,
) -> CascadeReport {
    let mut report = clear_step(ctx, positions, refill);
    if report.cleared.is_empty() {
        ctx.emit(Event::CascadeComplete { depth: 0 });
        return report;
    }

    let limit = ctx.store.singleton::<Board>().map_or(0, |(_, b)| b.len());
    let min_run = ctx.config().min_run;
    for _ in 0..limit {
        let groups = find_matches(&ctx.store, min_run);
        if groups.is_empty() {
            break;
        }
        let next: Vec<Position> = groups.iter().flatten().copied().collect();
        ctx.emit(Event::MatchFound { groups });
        let step = clear_step(ctx, &next, refill);
        if step.cleared.is_empty() {
            break;
        }
        report.depth += 1;
        report.absorb(step);
    }

    debug!(
        target: "tessera::board",
        depth = report.depth,
        cleared = report.cleared.len(),
        "cascade settled"
    );
    ctx.emit(Event::CascadeComplete {
        depth: report.depth,
    });
    report
}

/// One clear, gravity and refill pass.
fn clear_step(ctx: &mut SimulationContext, positions: &[Position], refill: bool) -> CascadeReport {
    let Some((_, board)) = board_of(&ctx.store) else {
        return CascadeReport::default();
    };

    let targets: BTreeSet<Position> = positions
        .iter()
        .copied()
        .filter(|&p| board.contains(p))
        .collect();
    let mut cleared = Vec::new();
    let mut breakdown: BTreeMap<String, u32> = BTreeMap::new();
    for pos in targets {
        let Some(id) = board.tile_at(pos) else {
            continue;
        };
        let Some(tile) = ctx.store.get_mut::<Tile>(id) else {
            continue;
        };
        if !tile.active {
            continue;
        }
        tile.active = false;
        *breakdown.entry(tile.kind.clone()).or_default() += 1;
        cleared.push(ClearedTile {
            position: pos,
            kind: tile.kind.clone(),
        });
    }
    if cleared.is_empty() {
        return CascadeReport::default();
    }

    let cleared_positions: Vec<Position> = cleared.iter().map(|c| c.position).collect();
    ctx.emit(Event::AnimationStart {
        kind: AnimationKind::Clear,
        items: cleared_positions.clone(),
    });
    let owner = turn::active_owner(&ctx.store);
    ctx.emit(Event::TilesCleared(TilesCleared {
        owner,
        positions: cleared_positions.clone(),
        breakdown,
    }));
    ctx.emit(Event::AnimationComplete {
        kind: AnimationKind::Clear,
        items: cleared_positions,
    });

    let moves = apply_gravity(&mut ctx.store, &board);
    if !moves.is_empty() {
        let items: Vec<Position> = moves.iter().map(|m| m.to).collect();
        ctx.emit(Event::AnimationStart {
            kind: AnimationKind::Gravity,
            items: items.clone(),
        });
        ctx.emit(Event::GravityApplied {
            moves: moves.clone(),
        });
        ctx.emit(Event::AnimationComplete {
            kind: AnimationKind::Gravity,
            items,
        });
    }

    let refilled = if refill {
        refill_board(ctx, &board)
    } else {
        Vec::new()
    };
    if !refilled.is_empty() {
        ctx.emit(Event::AnimationStart {
            kind: AnimationKind::Refill,
            items: refilled.clone(),
        });
        ctx.emit(Event::RefillCompleted {
            positions: refilled.clone(),
        });
        ctx.emit(Event::AnimationComplete {
            kind: AnimationKind::Refill,
            items: refilled.clone(),
        });
    }

    CascadeReport {
        cleared,
        moves,
        refilled,
        depth: 0,
    }
}

/// Compact every column toward row 0, preserving order.
fn apply_gravity(store: &mut EntityStore, board: &Board) -> Vec<GravityMove> {
    let mut moves = Vec::new();
    for col in 0..board.cols() {
        let mut survivors = Vec::new();
        for row in 0..board.rows() {
            let pos = Position::new(row, col);
            if let Some(tile) = board
                .tile_at(pos)
                .and_then(|id| store.get::<Tile>(id))
                .filter(|t| t.active)
            {
                survivors.push((row, tile.kind.clone()));
            }
        }

        for row in 0..board.rows() {
            let Some(id) = board.tile_at(Position::new(row, col)) else {
                continue;
            };
            let Some(tile) = store.get_mut::<Tile>(id) else {
                continue;
            };
            match survivors.get(usize::from(row)) {
                Some((from_row, kind)) => {
                    tile.kind.clone_from(kind);
                    tile.active = true;
                    if *from_row != row {
                        moves.push(GravityMove {
                            from: Position::new(*from_row, col),
                            to: Position::new(row, col),
                            kind: kind.clone(),
                        });
                    }
                }
                None => tile.active = false,
            }
        }
    }
    moves
}

/// Give every inactive cell a random spawnable type, row-major.
fn refill_board(ctx: &mut SimulationContext, board: &Board) -> Vec<Position> {
    let spawnable: Vec<String> = ctx
        .registry()
        .spawnable()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut refilled = Vec::new();
    for pos in board.positions() {
        let Some(id) = board.tile_at(pos) else {
            continue;
        };
        if ctx.store.get::<Tile>(id).is_some_and(|t| t.active) {
            continue;
        }
        let Some(kind) = spawnable.choose(&mut ctx.rng).cloned() else {
            continue;
        };
        ctx.store.insert(id, Tile::new(kind));
        refilled.push(pos);
    }
    refilled
}

/// Change the type of active tiles in place and report it.
pub fn transform_tiles(ctx: &mut SimulationContext, positions: &[Position], kind: &str) {
    let mut changed = Vec::new();
    for &pos in positions {
        let Some(id) = tile_entity(&ctx.store, pos) else {
            continue;
        };
        if let Some(tile) = ctx.store.get_mut::<Tile>(id).filter(|t| t.active) {
            kind.clone_into(&mut tile.kind);
            changed.push(pos);
        }
    }
    if !changed.is_empty() {
        ctx.emit(Event::TilesTransformed {
            positions: changed,
            kind: kind.to_string(),
        });
    }
}

/// Create a random board with no pre-existing matches.
pub fn generate_board(ctx: &mut SimulationContext) -> EntityId {
    let rows = ctx.config().board_rows;
    let cols = ctx.config().board_cols;
    let min_run = ctx.config().min_run.max(2);
    let spawnable: Vec<String> = ctx
        .registry()
        .spawnable()
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut kinds: Vec<Vec<String>> = Vec::with_capacity(usize::from(rows));
    for row in 0..usize::from(rows) {
        let mut line: Vec<String> = Vec::with_capacity(usize::from(cols));
        for col in 0..usize::from(cols) {
            let allowed: Vec<&String> = spawnable
                .iter()
                .filter(|k| {
                    let left = col + 1 >= min_run
                        && (1..min_run).all(|d| line.get(col - d) == Some(*k));
                    let below = row + 1 >= min_run
                        && (1..min_run).all(|d| kinds.get(row - d).and_then(|r| r.get(col)) == Some(*k));
                    !left && !below
                })
                .collect();
            let pick = allowed
                .choose(&mut ctx.rng)
                .map(|k| (*k).clone())
                .or_else(|| spawnable.choose(&mut ctx.rng).cloned())
                .unwrap_or_default();
            line.push(pick);
        }
        kinds.push(line);
    }
    place_board(ctx, rows, cols, &kinds)
}

/// Create a board from explicit rows of type names, row 0 first. A `.`
/// creates an inactive cell. Short rows are padded with inactive cells.
pub fn board_from_layout(ctx: &mut SimulationContext, layout: &[&str]) -> EntityId {
    let grid = KindGrid::from_rows(layout);
    let kinds: Vec<Vec<String>> = (0..grid.rows)
        .map(|row| {
            (0..grid.cols)
                .map(|col| grid.get(Position::new(row, col)).unwrap_or(".").to_string())
                .collect()
        })
        .collect();
    place_board(ctx, grid.rows, grid.cols, &kinds)
}

fn place_board(ctx: &mut SimulationContext, rows: u16, cols: u16, kinds: &[Vec<String>]) -> EntityId {
    if let Some((old, board)) = board_of(&ctx.store) {
        for &cell in board.cells() {
            ctx.store.delete(cell);
        }
        ctx.store.delete(old);
    }

    let board_entity = ctx.store.create();
    let mut cells = Vec::with_capacity(usize::from(rows) * usize::from(cols));
    for (row, line) in (0..rows).zip(kinds) {
        for (col, kind) in (0..cols).zip(line) {
            let id = ctx.store.create();
            ctx.store.insert(id, Position::new(row, col));
            ctx.store.insert(
                id,
                Tile {
                    kind: kind.clone(),
                    active: kind != ".",
                },
            );
            cells.push(id);
        }
    }
    ctx.store.insert(board_entity, Board::new(rows, cols, cells));
    board_entity
}

pub(crate) fn install(ctx: &mut SimulationContext) {
    ctx.on(EventKind::SwapRequested, |ctx, event| {
        if let Event::SwapRequested { owner, a, b } = event {
            request_swap(ctx, *owner, *a, *b);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::EventLog;

    fn ctx_with(layout: &[&str]) -> SimulationContext {
        let mut ctx = SimulationContext::new(EngineConfig::default(), 7);
        board_from_layout(&mut ctx, layout);
        ctx
    }

    fn active_count(ctx: &SimulationContext) -> usize {
        ctx.store.query::<Tile>().filter(|(_, t)| t.active).count()
    }

    #[test]
    fn test_find_runs_in_rows_and_columns() {
        let grid = KindGrid::from_rows(&[
            "fire fire fire water",
            "water hex nature water",
            "hex nature hex water",
        ]);
        let groups = grid.find_matches(3);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)]
        );
        assert_eq!(
            groups[1],
            vec![Position::new(0, 3), Position::new(1, 3), Position::new(2, 3)]
        );
    }

    #[test]
    fn test_l_and_t_shapes_merge_into_one_group() {
        let grid = KindGrid::from_rows(&[
            "fire fire fire",
            "water fire hex",
            "hex fire water",
        ]);
        let groups = grid.find_matches(3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 5);
    }

    #[test]
    fn test_inactive_cells_never_match() {
        let grid = KindGrid::from_rows(&[". . .", "fire fire water"]);
        assert!(grid.find_matches(3).is_empty());
    }

    #[test]
    fn test_gravity_compacts_toward_row_zero() {
        let mut ctx = ctx_with(&["fire water", "hex nature", "light fire"]);
        let report = clear_and_cascade(&mut ctx, &[Position::new(0, 0)], false);
        assert_eq!(report.cleared.len(), 1);
        assert_eq!(tile_kind(&ctx.store, Position::new(0, 0)), Some("hex"));
        assert_eq!(tile_kind(&ctx.store, Position::new(1, 0)), Some("light"));
        assert_eq!(tile_kind(&ctx.store, Position::new(2, 0)), None);
        assert_eq!(report.moves.len(), 2);
        assert_eq!(report.moves[0].from, Position::new(1, 0));
        assert_eq!(report.moves[0].to, Position::new(0, 0));
    }

    #[test]
    fn test_refill_conserves_active_count() {
        let mut ctx = ctx_with(&[
            "fire fire fire water",
            "water hex nature light",
            "hex nature hex water",
        ]);
        let before = active_count(&ctx);
        let report = resolve_matches(&mut ctx);
        assert!(!report.cleared.is_empty());
        assert_eq!(active_count(&ctx), before);
        assert!(find_matches(&ctx.store, 3).is_empty());
    }

    #[test]
    fn test_clearing_inactive_or_out_of_range_is_ignored() {
        let mut ctx = ctx_with(&["fire .", "water hex"]);
        let log = EventLog::attach(&mut ctx);
        let report = clear_and_cascade(&mut ctx, &[Position::new(0, 1), Position::new(9, 9)], true);
        assert!(report.cleared.is_empty());
        assert_eq!(log.count(EventKind::TilesCleared), 0);
        assert_eq!(log.count(EventKind::CascadeComplete), 1);
    }

    #[test]
    fn test_swap_validation() {
        let ctx = ctx_with(&[
            "fire water fire fire",
            "hex nature hex light",
        ]);
        let store = &ctx.store;
        assert_eq!(validate_swap(store, Position::new(0, 0), Position::new(0, 1), 3), Ok(()));
        assert_eq!(
            validate_swap(store, Position::new(0, 0), Position::new(0, 2), 3),
            Err(SwapRejection::NotAdjacent)
        );
        assert_eq!(
            validate_swap(store, Position::new(0, 2), Position::new(0, 3), 3),
            Err(SwapRejection::SameKind)
        );
        assert_eq!(
            validate_swap(store, Position::new(1, 0), Position::new(1, 1), 3),
            Err(SwapRejection::NoMatch)
        );
        assert_eq!(
            validate_swap(store, Position::new(1, 3), Position::new(2, 3), 3),
            Err(SwapRejection::OutOfBounds)
        );
        assert!(legal_swaps(store, 3).contains(&(Position::new(0, 0), Position::new(0, 1))));
    }

    #[test]
    fn test_generated_board_has_no_matches() {
        for seed in 0..20 {
            let mut ctx = SimulationContext::new(EngineConfig::default(), seed);
            generate_board(&mut ctx);
            assert!(find_matches(&ctx.store, 3).is_empty(), "seed {seed}");
            assert_eq!(active_count(&ctx), 64);
        }
    }
}
