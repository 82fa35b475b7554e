//! Cosmetic per-ply move quality tally.
//!
//! Nothing here is authoritative. The client has no evaluator, so the
//! classification is a pluggable [`MoveScorer`]; the default one just draws a
//! uniformly random bucket.

use rand::Rng;
use shared::domain::{Color, MoveCoords};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveQuality {
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveQuality {
    pub const ALL: [MoveQuality; 5] = [
        Self::Excellent,
        Self::Good,
        Self::Inaccuracy,
        Self::Mistake,
        Self::Blunder,
    ];
}

pub trait MoveScorer: Send {
    fn classify(&mut self, mover: Color, mv: &MoveCoords) -> MoveQuality;
}

#[derive(Debug, Default)]
pub struct RandomBucketScorer;

impl MoveScorer for RandomBucketScorer {
    fn classify(&mut self, _mover: Color, _mv: &MoveCoords) -> MoveQuality {
        let idx = rand::thread_rng().gen_range(0..MoveQuality::ALL.len());
        MoveQuality::ALL[idx]
    }
}

/// Always returns the same bucket.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub MoveQuality);

impl MoveScorer for FixedScorer {
    fn classify(&mut self, _mover: Color, _mv: &MoveCoords) -> MoveQuality {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityCounts {
    pub excellent: u32,
    pub good: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
}

impl QualityCounts {
    pub fn record(&mut self, quality: MoveQuality) {
        let slot = match quality {
            MoveQuality::Excellent => &mut self.excellent,
            MoveQuality::Good => &mut self.good,
            MoveQuality::Inaccuracy => &mut self.inaccuracies,
            MoveQuality::Mistake => &mut self.mistakes,
            MoveQuality::Blunder => &mut self.blunders,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.excellent + self.good + self.inaccuracies + self.mistakes + self.blunders
    }

    /// Rounded percentage; excellent moves count fully, good ones at 80%.
    pub fn accuracy_percent(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let weighted = f64::from(self.excellent) + f64::from(self.good) * 0.8;
        (weighted / f64::from(total) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestPerformer {
    Color(Color),
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub white: QualityCounts,
    pub black: QualityCounts,
    pub white_accuracy: u32,
    pub black_accuracy: u32,
    pub best: BestPerformer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveQualityTally {
    white: QualityCounts,
    black: QualityCounts,
}

impl MoveQualityTally {
    pub fn record(&mut self, mover: Color, quality: MoveQuality) {
        match mover {
            Color::White => self.white.record(quality),
            Color::Black => self.black.record(quality),
        }
    }

    pub fn counts(&self, color: Color) -> QualityCounts {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn summary(&self) -> GameSummary {
        let white_accuracy = self.white.accuracy_percent();
        let black_accuracy = self.black.accuracy_percent();
        let best = match white_accuracy.cmp(&black_accuracy) {
            std::cmp::Ordering::Greater => BestPerformer::Color(Color::White),
            std::cmp::Ordering::Less => BestPerformer::Color(Color::Black),
            std::cmp::Ordering::Equal => BestPerformer::Tie,
        };
        GameSummary {
            white: self.white,
            black: self.black,
            white_accuracy,
            black_accuracy,
            best,
        }
    }
}
