//! Bounded per-run records: round history and jackpot hits.

use lotto_types::{HistoryPoint, JackpotHit, RoundResult};
use std::collections::VecDeque;

/// Smallest history that can still be halved.
const MIN_HISTORY_POINTS: usize = 2;

/// Round history with a fixed maximum number of points.
///
/// Each point covers `stride` consecutive rounds (only the last point may be
/// partial). Once the cap is exceeded, adjacent points are merged pairwise and
/// the stride doubles, so points stay ordered by round index.
#[derive(Clone, Debug)]
pub struct RoundHistory {
    points: Vec<HistoryPoint>,
    stride: u64,
    max_points: Option<usize>,
}

impl RoundHistory {
    /// `None` keeps every round.
    pub fn new(max_points: Option<usize>) -> Self {
        Self {
            points: Vec::new(),
            stride: 1,
            max_points: max_points.map(|max| max.max(MIN_HISTORY_POINTS)),
        }
    }

    pub fn push(&mut self, result: &RoundResult) {
        let point = HistoryPoint::from_round(result);
        match self.points.last_mut() {
            Some(last) if last.rounds < self.stride => last.absorb(&point),
            _ => self.points.push(point),
        }
        if let Some(max) = self.max_points {
            if self.points.len() > max {
                self.compact();
            }
        }
    }

    fn compact(&mut self) {
        let mut merged = Vec::with_capacity(self.points.len() / 2 + 1);
        for pair in self.points.chunks(2) {
            let mut point = pair[0].clone();
            if let Some(next) = pair.get(1) {
                point.absorb(next);
            }
            merged.push(point);
        }
        self.points = merged;
        self.stride *= 2;
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<HistoryPoint> {
        self.points
    }
}

/// Most recent jackpot hits, oldest dropped first.
#[derive(Clone, Debug)]
pub struct HitLog {
    hits: VecDeque<JackpotHit>,
    max: Option<usize>,
    dropped: u64,
}

impl HitLog {
    pub fn new(max: Option<usize>) -> Self {
        Self {
            hits: VecDeque::new(),
            max,
            dropped: 0,
        }
    }

    pub fn push(&mut self, hit: JackpotHit) {
        if self.max == Some(0) {
            self.dropped += 1;
            return;
        }
        self.hits.push_back(hit);
        if let Some(max) = self.max {
            while self.hits.len() > max {
                self.hits.pop_front();
                self.dropped += 1;
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn into_vec(self) -> Vec<JackpotHit> {
        self.hits.into()
    }
}
