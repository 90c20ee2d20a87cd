//! Lotto execution engine.
//!
//! This crate contains the round logic used by the simulator: number draws and
//! ticket purchases, prize tier resolution, jackpot accounting and running totals.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Only draw randomness from the run's [`DrawRng`]; a seed fully determines a run.
//! - All money arithmetic is integer cents and checked; overflow surfaces as
//!   [`RoundError`] instead of wrapping.
//!
//! The primary entrypoint is [`Simulation`].
//!
//! ```rust,ignore
//! use lotto_execution::Simulation;
//! use lotto_types::{GameRules, SimulationConfig};
//!
//! let mut simulation = Simulation::new(config, GameRules::default());
//! while let Some(settled) = simulation.step()? {
//!     println!("round {} rtp {}", settled.result.round, settled.result.rtp);
//! }
//! ```

pub mod jackpot;
pub mod prize;
pub mod rng;
pub mod round;
pub mod simulation;
pub mod totals;

pub use jackpot::{Contribution, JackpotLedger, JackpotSettlement, PoolOverflow};
pub use prize::{theoretical_probabilities, PrizeResolver};
pub use rng::{DrawRng, TicketStream};
pub use round::{run_round, RoundError, SettledRound};
pub use simulation::Simulation;
pub use totals::RunTotals;
