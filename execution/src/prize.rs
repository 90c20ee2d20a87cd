//! Prize tier resolution.

use lotto_types::{Draw, GameRules, Ticket};

/// Maps a ticket's match count to the tier it wins.
#[derive(Clone, Debug)]
pub struct PrizeResolver {
    /// Indexed by match count; `None` wins nothing.
    by_matches: Vec<Option<usize>>,
    tiers: usize,
}

impl PrizeResolver {
    /// Tiers are ordered by decreasing threshold, so the first tier a match
    /// count reaches is the best one it wins.
    pub fn new(rules: &GameRules) -> Self {
        let by_matches = (0..=rules.pick_count)
            .map(|matches| rules.tiers.iter().position(|tier| tier.matches <= matches))
            .collect();
        Self {
            by_matches,
            tiers: rules.tiers.len(),
        }
    }

    pub fn tier_count(&self) -> usize {
        self.tiers
    }

    /// Tier index (0 is the jackpot) won with `matches` matching numbers.
    pub fn tier_for(&self, matches: u8) -> Option<usize> {
        self.by_matches.get(matches as usize).copied().flatten()
    }

    /// Count winning tickets per tier. A ticket wins at most one tier.
    pub fn resolve<I>(&self, draw: &Draw, tickets: I) -> Vec<u64>
    where
        I: IntoIterator<Item = Ticket>,
    {
        let mut winners = vec![0u64; self.tiers];
        for ticket in tickets {
            if let Some(tier) = self.tier_for(ticket.numbers.matches(&draw.numbers)) {
                winners[tier] += 1;
            }
        }
        winners
    }
}

/// Binomial coefficient as a float (exact for every pool up to 64).
fn choose(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Probability that a single ticket wins each tier (hypergeometric).
///
/// A tier covers every match count from its threshold up to, but excluding,
/// the threshold of the tier above it.
pub fn theoretical_probabilities(rules: &GameRules) -> Vec<f64> {
    let pool = rules.pool_size as u32;
    let pick = rules.pick_count as u32;
    let total = choose(pool, pick);
    let exact = |k: u32| choose(pick, k) * choose(pool - pick, pick - k) / total;
    let mut ceiling = pick + 1;
    rules
        .tiers
        .iter()
        .map(|tier| {
            let floor = tier.matches as u32;
            let probability = (floor..ceiling).map(exact).sum::<f64>();
            ceiling = floor;
            probability
        })
        .collect()
}
