use crate::models::{Level, PerformanceNode, ScoreCard};

pub const WEANING_THRESHOLD: f64 = 8.0;

/// A school graduates from intensive support only when every dimension
/// independently reaches `threshold`.
pub fn is_weaning_eligible(card: &ScoreCard, threshold: f64) -> bool {
    card.dimensions().iter().all(|value| *value >= threshold)
}

pub fn eligible_schools(root: &PerformanceNode) -> Vec<&PerformanceNode> {
    root.descendants()
        .into_iter()
        .filter(|node| node.level == Level::School && node.weaning_eligible == Some(true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let card = ScoreCard::from_dimensions([8.0; 5]);
        assert!(is_weaning_eligible(&card, WEANING_THRESHOLD));
    }

    #[test]
    fn one_low_dimension_blocks_eligibility() {
        let card = ScoreCard::from_dimensions([10.0, 10.0, 10.0, 7.99, 10.0]);
        assert!(!is_weaning_eligible(&card, WEANING_THRESHOLD));
    }
}
