//! Round-robin turn scheduling.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::context::{BilliardContext, Turn, TurnToken};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

/// Owns the turn-token list. On `GameStart` the roster is shuffled and each
/// player receives one token in order; `PassTurn` advances cyclically.
pub struct TurnBased {
    tokens: Vec<TurnToken>,
    rng: ChaCha8Rng,
}

impl TurnBased {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            tokens: vec![TurnToken("turn-one".into()), TurnToken("turn-two".into())],
            rng,
        }
    }

    fn pass_turn(ctx: &mut BilliardContext) {
        let turn = &mut ctx.turn;
        if turn.turns.is_empty() {
            return;
        }
        let current_index = turn
            .current
            .as_ref()
            .and_then(|current| turn.turns.iter().position(|t| t == current))
            .unwrap_or(turn.turns.len() - 1);
        let next = (current_index + 1) % turn.turns.len();
        turn.current = Some(turn.turns[next].clone());
    }

    fn start_game(&mut self, ctx: &mut BilliardContext) {
        ctx.turn.current = ctx.turn.turns.first().cloned();
        ctx.players.shuffle(&mut self.rng);
        for (player, token) in ctx.players.iter_mut().zip(&ctx.turn.turns) {
            player.turn = Some(token.clone());
        }
    }
}

impl Default for TurnBased {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware<BilliardContext, GameEvent> for TurnBased {
    fn activate(&mut self, ctx: &mut BilliardContext, _fx: &mut Effects<GameEvent>) {
        ctx.turn = Turn {
            turns: self.tokens.clone(),
            current: None,
        };
    }

    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        _fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::PassTurn => Self::pass_turn(ctx),
            GameEvent::GameStart => self.start_game(ctx),
            _ => {}
        }
    }
}
