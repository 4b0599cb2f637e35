#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera::effects::{self, EffectApply, ExpiryReason};
use tessera::game::{Combatant, Health, bank, check_invariants, turn};
use tessera::{Controller, EngineConfig, Event, EventKind, SimulationContext};

const SLUGS: [&str; 4] = ["poison", "ward", "attack_bonus", "mark"];

/// One effect-lifecycle step.
#[derive(Arbitrary, Debug)]
enum Op {
    Apply {
        slug: u8,
        target_first: bool,
        count: u8,
        turns: Option<u8>,
        cumulative: bool,
        exclusive: bool,
        refresh: bool,
        expire_on_damage: bool,
    },
    Damage { amount: u8 },
    Expire { index: u8 },
    EndTurn,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut ctx = SimulationContext::new(EngineConfig::default(), 0);
    let mut owners = Vec::new();
    for name in ["a", "b"] {
        let id = ctx.store.create();
        ctx.store.insert(id, Health::full(50));
        ctx.store.insert(
            id,
            Combatant {
                name: name.to_string(),
                controller: Controller::Human,
            },
        );
        bank::ensure_bank(&mut ctx.store, id);
        owners.push(id);
    }
    turn::begin(&mut ctx);

    for op in ops.iter().take(128) {
        match *op {
            Op::Apply {
                slug,
                target_first,
                count,
                turns,
                cumulative,
                exclusive,
                refresh,
                expire_on_damage,
            } => {
                let owner = if target_first { owners[0] } else { owners[1] };
                let mut request = EffectApply::new(owner, SLUGS[usize::from(slug) % SLUGS.len()])
                    .count(i64::from(count % 10));
                if let Some(turns) = turns {
                    request = request.turns(u32::from(turns % 5));
                }
                if cumulative {
                    request = request.cumulative();
                }
                if exclusive {
                    request = request.exclusive();
                }
                if refresh {
                    request = request.refresh();
                }
                if expire_on_damage {
                    request = request.expire_on(EventKind::DamageDealt, true);
                }
                ctx.emit(Event::EffectApply(Box::new(request)));
            }
            Op::Damage { amount } => {
                tessera::game::health::deal_damage(&mut ctx, owners[1], i64::from(amount % 20), Some(owners[0]));
            }
            Op::Expire { index } => {
                let all: Vec<_> = owners.iter().flat_map(|&o| effects::effects_of(&ctx.store, o)).collect();
                if let Some(&effect) = all.get(usize::from(index) % all.len().max(1)) {
                    effects::expire(&mut ctx, effect, ExpiryReason::Removed);
                }
            }
            Op::EndTurn => {
                if let Some(owner) = turn::active_owner(&ctx.store) {
                    ctx.emit(Event::EndTurnRequested { owner });
                }
            }
        }

        let violations = check_invariants(&ctx.store);
        assert!(violations.is_empty(), "invariants broken after {op:?}: {violations:?}");
    }
});
