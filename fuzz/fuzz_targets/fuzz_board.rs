#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera::game::{Combatant, Health, Position, bank, board, board_from_layout, check_invariants, turn};
use tessera::{Controller, EngineConfig, Event, SimulationContext};

const KINDS: [&str; 6] = ["fire", "water", "nature", "hex", "light", "."];

/// One player action against the board.
#[derive(Arbitrary, Debug)]
enum Op {
    Swap { row: u8, col: u8, horizontal: bool },
    Click { row: u8, col: u8 },
    Cancel,
    Clear { row: u8, col: u8 },
    EndTurn,
}

/// Structured input for board fuzzing.
#[derive(Arbitrary, Debug)]
struct BoardInput {
    seed: u64,
    rows: u8,
    cols: u8,
    cells: Vec<u8>,
    ops: Vec<Op>,
}

fuzz_target!(|input: BoardInput| {
    let rows = u16::from(input.rows % 8 + 1);
    let cols = u16::from(input.cols % 8 + 1);

    let mut ctx = SimulationContext::new(EngineConfig::default(), input.seed);
    let lines: Vec<String> = (0..usize::from(rows))
        .map(|row| {
            (0..usize::from(cols))
                .map(|col| {
                    let byte = input.cells.get(row * usize::from(cols) + col).copied().unwrap_or(0);
                    KINDS[usize::from(byte) % KINDS.len()]
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let layout: Vec<&str> = lines.iter().map(String::as_str).collect();
    board_from_layout(&mut ctx, &layout);

    for name in ["a", "b"] {
        let id = ctx.store.create();
        ctx.store.insert(id, Health::full(30));
        ctx.store.insert(
            id,
            Combatant {
                name: name.to_string(),
                controller: Controller::Human,
            },
        );
        bank::ensure_bank(&mut ctx.store, id);
    }
    turn::begin(&mut ctx);

    for op in input.ops.iter().take(64) {
        let Some(owner) = turn::active_owner(&ctx.store) else {
            break;
        };
        match *op {
            Op::Swap { row, col, horizontal } => {
                let a = Position::new(u16::from(row % 9), u16::from(col % 9));
                let b = if horizontal {
                    Position::new(a.row, a.col + 1)
                } else {
                    Position::new(a.row + 1, a.col)
                };
                ctx.emit(Event::SwapRequested { owner, a, b });
            }
            Op::Click { row, col } => {
                ctx.emit(Event::TileClicked(Position::new(u16::from(row % 9), u16::from(col % 9))));
            }
            Op::Cancel => tessera::game::input::cancel_all(&mut ctx),
            Op::Clear { row, col } => {
                let pos = Position::new(u16::from(row % 9), u16::from(col % 9));
                board::clear_and_cascade(&mut ctx, &[pos], true);
            }
            Op::EndTurn => ctx.emit(Event::EndTurnRequested { owner }),
        }

        let violations = check_invariants(&ctx.store);
        assert!(violations.is_empty(), "invariants broken after {op:?}: {violations:?}");
    }
});
