//! Seedable randomness for draws, player counts and ticket purchases.
//!
//! A run owns exactly one [`DrawRng`]. Given the same seed and the same call
//! sequence, every draw and ticket is reproduced bit for bit.

use lotto_types::{Draw, GameRules, NumberSet, SimulationConfig, Ticket};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct DrawRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DrawRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed from the thread-local OS-seeded generator.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::thread_rng().gen())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pick `count` distinct numbers uniformly from `1..=pool`.
    pub fn pick_numbers(&mut self, pool: u8, count: u8) -> NumberSet {
        let mut set = NumberSet::empty();
        while set.len() < count as u32 {
            set.insert(self.rng.gen_range(1..=pool));
        }
        set
    }

    pub fn generate_draw(&mut self, rules: &GameRules) -> Draw {
        Draw {
            numbers: self.pick_numbers(rules.pool_size, rules.pick_count),
        }
    }

    /// Player count for one round, uniform in the configured range.
    pub fn generate_players(&mut self, config: &SimulationConfig) -> u64 {
        self.rng.gen_range(config.players_min..=config.players_max)
    }

    /// Stream the tickets bought by `player_count` players.
    ///
    /// Every player buys a uniform number of tickets in the configured card
    /// range, each with a uniformly random combination.
    pub fn tickets<'a>(
        &'a mut self,
        player_count: u64,
        config: &SimulationConfig,
        rules: &GameRules,
    ) -> TicketStream<'a> {
        TicketStream {
            rng: self,
            pool: rules.pool_size,
            pick: rules.pick_count,
            cards_min: config.cards_min,
            cards_max: config.cards_max,
            players: player_count,
            next_player: 0,
            current_player: 0,
            remaining: 0,
        }
    }

    pub fn generate_tickets(
        &mut self,
        player_count: u64,
        config: &SimulationConfig,
        rules: &GameRules,
    ) -> Vec<Ticket> {
        self.tickets(player_count, config, rules).collect()
    }
}

pub struct TicketStream<'a> {
    rng: &'a mut DrawRng,
    pool: u8,
    pick: u8,
    cards_min: u64,
    cards_max: u64,
    players: u64,
    next_player: u64,
    current_player: u64,
    remaining: u64,
}

impl Iterator for TicketStream<'_> {
    type Item = Ticket;

    fn next(&mut self) -> Option<Ticket> {
        while self.remaining == 0 {
            if self.next_player >= self.players {
                return None;
            }
            self.current_player = self.next_player;
            self.next_player += 1;
            self.remaining = self.rng.rng.gen_range(self.cards_min..=self.cards_max);
        }
        self.remaining -= 1;
        Some(Ticket {
            // Player counts are validated to fit in a u32.
            player: self.current_player as u32,
            numbers: self.rng.pick_numbers(self.pool, self.pick),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(players: (u64, u64), cards: (u64, u64)) -> SimulationConfig {
        SimulationConfig {
            total_rounds: 1,
            players_min: players.0,
            players_max: players.1,
            cards_min: cards.0,
            cards_max: cards.1,
            ticket_price: 200,
            seed: Some(1),
        }
    }

    #[test]
    fn test_draw_is_valid() {
        let rules = GameRules::default();
        let mut rng = DrawRng::from_seed(42);
        for _ in 0..1_000 {
            let draw = rng.generate_draw(&rules);
            assert_eq!(draw.numbers.len(), 6);
            assert!(draw.numbers.numbers().iter().all(|n| (1..=42).contains(n)));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let rules = GameRules::default();
        let config = config((1, 50), (1, 5));
        let mut a = DrawRng::from_seed(7);
        let mut b = DrawRng::from_seed(7);
        for _ in 0..20 {
            assert_eq!(a.generate_draw(&rules), b.generate_draw(&rules));
            let players = a.generate_players(&config);
            assert_eq!(players, b.generate_players(&config));
            assert_eq!(
                a.generate_tickets(players, &config, &rules),
                b.generate_tickets(players, &config, &rules)
            );
        }
    }

    #[test]
    fn test_players_within_range() {
        let config = config((3, 9), (1, 1));
        let mut rng = DrawRng::from_seed(1);
        let mut seen = [false; 10];
        for _ in 0..1_000 {
            let players = rng.generate_players(&config);
            assert!((3..=9).contains(&players));
            seen[players as usize] = true;
        }
        assert!(seen[3..=9].iter().all(|s| *s));
    }

    #[test]
    fn test_tickets_per_player_within_range() {
        let rules = GameRules::default();
        let config = config((1, 1), (2, 4));
        let mut rng = DrawRng::from_seed(3);
        let tickets = rng.generate_tickets(100, &config, &rules);

        let mut per_player = vec![0u64; 100];
        for ticket in &tickets {
            assert_eq!(ticket.numbers.len(), 6);
            per_player[ticket.player as usize] += 1;
        }
        assert!(per_player.iter().all(|count| (2..=4).contains(count)));
        assert!(tickets.windows(2).all(|w| w[0].player <= w[1].player));
    }

    #[test]
    fn test_zero_players_no_tickets() {
        let rules = GameRules::default();
        let mut rng = DrawRng::from_seed(3);
        assert!(rng.generate_tickets(0, &config((1, 1), (1, 5)), &rules).is_empty());
    }

    #[test]
    fn test_full_pick_draws_everything() {
        let rules = GameRules::new(6, 6, &[], Default::default()).unwrap();
        let mut rng = DrawRng::from_seed(9);
        assert_eq!(rng.generate_draw(&rules).numbers.numbers(), vec![1, 2, 3, 4, 5, 6]);
    }
}
