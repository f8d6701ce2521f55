//! Mood taxonomy shared by valence and energy.
//!
//! A continuous scalar is snapped to the nearest of five anchors
//! (-0.25, -0.125, 0, 0.125, 0.25). Each category has an opposite obtained by
//! negation, the neutral one being its own opposite.

use serde::{Deserialize, Serialize};

/// Half-width of the band around neutral in which the walk "feels nothing".
pub const NEUTRAL_BAND: f32 = 0.05;

/// Returns the index of the anchor closest to `value`.
///
/// Ties are resolved in favour of the anchor declared first.
pub fn nearest_anchor(value: f32, anchors: &[f32]) -> usize {
    let mut best_index = 0;
    let mut best_distance = f32::MAX;
    for (index, anchor) in anchors.iter().enumerate() {
        let distance = (value - anchor).abs();
        if distance < best_distance {
            best_distance = distance;
            best_index = index;
        }
    }
    best_index
}

/// Recenters a catalog valence in [0, 1] onto the [-0.5, 0.5] mood scale.
pub fn transform_valence(valence: f32) -> f32 {
    valence - 0.5
}

/// True when `mood` lies strictly inside the neutral band.
pub fn feel_nothing_yet(mood: f32) -> bool {
    mood > MoodCategory::Nothing.value() - NEUTRAL_BAND
        && mood < MoodCategory::Nothing.value() + NEUTRAL_BAND
}

/// Behaviour common to the five-bucket taxonomies.
pub trait Category: Copy + Eq + Sized + 'static {
    /// All categories in declaration order (most negative first).
    const ALL: [Self; 5];

    fn value(self) -> f32;

    fn snap(value: f32) -> Self {
        let anchors = Self::ALL.map(|c| c.value());
        Self::ALL[nearest_anchor(value, &anchors)]
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or(Self::NEUTRAL_INDEX)
    }

    const NEUTRAL_INDEX: usize = 2;

    fn opposite(self) -> Self {
        Self::ALL[Self::ALL.len() - 1 - self.index()]
    }

    fn is_neutral(self) -> bool {
        self.index() == Self::NEUTRAL_INDEX
    }

    /// Moves one category closer to neutral. Neutral stays put.
    fn toward_neutral(self) -> Self {
        let index = self.index();
        if index < Self::NEUTRAL_INDEX {
            Self::ALL[index + 1]
        } else if index > Self::NEUTRAL_INDEX {
            Self::ALL[index - 1]
        } else {
            self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodCategory {
    Depressed,
    Sad,
    Nothing,
    Good,
    Happy,
}

impl Category for MoodCategory {
    const ALL: [Self; 5] = [
        MoodCategory::Depressed,
        MoodCategory::Sad,
        MoodCategory::Nothing,
        MoodCategory::Good,
        MoodCategory::Happy,
    ];

    fn value(self) -> f32 {
        match self {
            MoodCategory::Depressed => -0.25,
            MoodCategory::Sad => -0.125,
            MoodCategory::Nothing => 0.0,
            MoodCategory::Good => 0.125,
            MoodCategory::Happy => 0.25,
        }
    }
}

impl MoodCategory {
    /// Category of a raw catalog valence in [0, 1].
    pub fn of_valence(valence: f32) -> Self {
        Self::snap(transform_valence(valence))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyCategory {
    Drained,
    Low,
    Nothing,
    Lively,
    Hyped,
}

impl Category for EnergyCategory {
    const ALL: [Self; 5] = [
        EnergyCategory::Drained,
        EnergyCategory::Low,
        EnergyCategory::Nothing,
        EnergyCategory::Lively,
        EnergyCategory::Hyped,
    ];

    fn value(self) -> f32 {
        match self {
            EnergyCategory::Drained => -0.25,
            EnergyCategory::Low => -0.125,
            EnergyCategory::Nothing => 0.0,
            EnergyCategory::Lively => 0.125,
            EnergyCategory::Hyped => 0.25,
        }
    }
}

impl EnergyCategory {
    /// Category of a raw catalog energy in [0, 1].
    pub fn of_energy(energy: f32) -> Self {
        Self::snap(energy - 0.5)
    }
}
