//! Classification scores reported by the segmentator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::subset::Subset;

/// Per-case Dice scores for one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub subset: Subset,
    pub dice: BTreeMap<String, f64>,
}

impl ScoreReport {
    pub fn new(subset: Subset) -> Self {
        Self {
            subset,
            dice: BTreeMap::new(),
        }
    }

    /// Mean Dice over scored cases, `None` when nothing was scored.
    pub fn mean_dice(&self) -> Option<f64> {
        if self.dice.is_empty() {
            return None;
        }
        Some(self.dice.values().sum::<f64>() / self.dice.len() as f64)
    }

    /// Lowest-scoring case.
    pub fn worst_case(&self) -> Option<(&str, f64)> {
        self.dice
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(id, score)| (id.as_str(), *score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_worst() {
        let mut report = ScoreReport::new(Subset::Train);
        assert_eq!(report.mean_dice(), None);

        report.dice.insert("c1".into(), 0.8);
        report.dice.insert("c2".into(), 0.4);
        assert!((report.mean_dice().unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(report.worst_case(), Some(("c2", 0.4)));
    }
}
