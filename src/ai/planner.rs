//! Fork-and-score planning and the tick-paced driver.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::ai::{
    AiController, AiPending, Candidate, Evaluator, OwnerSnapshot, WeightedEvaluator,
    enumerate_candidates,
};
use crate::context::SimulationContext;
use crate::ecs::EntityId;
use crate::events::{Event, EventKind};
use crate::game::{Health, turn};

/// The planner's decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    /// Chosen action; `Pass` when nothing was legal.
    pub candidate: Candidate,
    /// Its score, jitter included.
    pub score: f64,
    /// How many candidates were simulated.
    pub considered: usize,
}

/// Score one candidate by replaying it in a fork of `ctx`.
///
/// The live world is only read.
pub fn simulate(
    ctx: &SimulationContext,
    owner: EntityId,
    candidate: Candidate,
    before: &OwnerSnapshot,
    evaluator: &dyn Evaluator,
) -> f64 {
    let (mut sandbox, remap) = ctx.fork();
    let sandbox_owner = remap.apply(owner);
    sandbox.emit(candidate.remapped(&remap).intent(sandbox_owner));
    let after = OwnerSnapshot::capture(&sandbox.store, sandbox_owner);
    evaluator.score(before, &after)
}

/// Pick the best-scoring legal action for `owner`.
///
/// Ties keep the earlier candidate. `jitter` scales a uniform draw from
/// `rng` added to every score.
pub fn plan(
    ctx: &SimulationContext,
    owner: EntityId,
    evaluator: &dyn Evaluator,
    jitter: f64,
    rng: &mut StdRng,
) -> Plan {
    let candidates = enumerate_candidates(&ctx.store, owner, ctx.config().min_run);
    let before = OwnerSnapshot::capture(&ctx.store, owner);
    let mut best = Plan {
        candidate: Candidate::Pass,
        score: f64::NEG_INFINITY,
        considered: candidates.len(),
    };
    for candidate in candidates {
        let mut score = simulate(ctx, owner, candidate, &before, evaluator);
        if jitter > 0.0 {
            score += jitter * rng.random::<f64>();
        }
        debug!(target: "tessera::ai", owner, ?candidate, score, "candidate scored");
        if score > best.score {
            best.candidate = candidate;
            best.score = score;
        }
    }
    if best.candidate == Candidate::Pass {
        best.score = 0.0;
    }
    best
}

fn jitter_seed(seed: u64, decisions: u64) -> u64 {
    seed ^ decisions.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Decide for an AI owner that just received control and queue the action.
pub fn schedule(ctx: &mut SimulationContext, owner: EntityId) {
    let Some(controller) = ctx.store.get::<AiController>(owner).copied() else {
        return;
    };
    if !ctx.store.get::<Health>(owner).is_none_or(Health::is_alive) {
        return;
    }

    let weights = controller.personality.weights();
    let mut rng = StdRng::seed_from_u64(jitter_seed(controller.seed, controller.decisions));
    let decided = plan(ctx, owner, &WeightedEvaluator::new(weights), weights.jitter, &mut rng);
    info!(
        target: "tessera::ai",
        owner,
        personality = %controller.personality,
        candidate = ?decided.candidate,
        score = decided.score,
        considered = decided.considered,
        "action chosen"
    );

    ctx.store.insert(
        owner,
        AiController {
            decisions: controller.decisions + 1,
            ..controller
        },
    );
    let due_frame = turn::current_frame(&ctx.store) + ctx.config().ai_delay_ticks;
    ctx.store.insert(
        owner,
        AiPending {
            candidate: decided.candidate,
            due_frame,
        },
    );
}

fn counters(ctx: &SimulationContext) -> (u64, u32) {
    turn::turn_state(&ctx.store).map_or((0, 0), |s| (s.actions_committed, s.rotations))
}

/// Dispatch queued actions whose frame has come.
///
/// An AI owner holding a settled turn with nothing queued is planned for
/// first. A dispatched action that neither commits nor rotates is replaced
/// by ending the turn, so rotation never stalls on an AI.
pub fn dispatch_due(ctx: &mut SimulationContext, frame: u64) {
    if let Some(owner) = turn::active_owner(&ctx.store) {
        if turn::is_settled(&ctx.store)
            && ctx.store.has::<AiController>(owner)
            && !ctx.store.has::<AiPending>(owner)
        {
            schedule(ctx, owner);
        }
    }

    let due: Vec<(EntityId, AiPending)> = ctx
        .store
        .query::<AiPending>()
        .filter(|(_, p)| p.due_frame <= frame)
        .map(|(id, p)| (id, *p))
        .collect();
    for (owner, pending) in due {
        ctx.store.remove::<AiPending>(owner);
        if turn::active_owner(&ctx.store) != Some(owner) || !turn::is_settled(&ctx.store) {
            continue;
        }
        let before = counters(ctx);
        ctx.emit(pending.candidate.intent(owner));
        if counters(ctx) == before && turn::active_owner(&ctx.store) == Some(owner) {
            warn!(target: "tessera::ai", owner, candidate = ?pending.candidate, "action dropped, passing");
            ctx.emit(Event::EndTurnRequested { owner });
        }
    }
}

/// Subscribe the AI driver. Not part of the core systems, so forks never
/// plan recursively.
pub fn install_driver(ctx: &mut SimulationContext) {
    ctx.on(EventKind::TurnAdvanced, |ctx, event| {
        if let Event::TurnAdvanced { next, .. } = event {
            schedule(ctx, *next);
        }
    });
    ctx.on(EventKind::ExtraTurnGranted, |ctx, event| {
        if let Event::ExtraTurnGranted { owner } = event {
            schedule(ctx, *owner);
        }
    });
    ctx.on(EventKind::Tick, |ctx, event| {
        if let Event::Tick { frame } = event {
            dispatch_due(ctx, *frame);
        }
    });
}
