//! Vector-store readiness scoring.
//!
//! Maps an [`Analysis`] onto a 0–10 score made of five independent
//! criteria worth [`POINTS_PER_CRITERION`] each:
//!
//! | # | Criterion | Measured value | Ladder |
//! |---|-----------|----------------|--------|
//! | 1 | Chunk size | optimal-size ratio | ratio |
//! | 2 | Content diversity | content-variety ratio | ratio |
//! | 3 | Metadata | metadata-richness ratio | ratio |
//! | 4 | Throughput | chars/ms | absolute |
//! | 5 | Consistency | `1 − std_dev / mean` | ratio |
//!
//! Ratio ladder: `≥ 0.8 → 2.0`, `≥ 0.6 → 1.5`, `≥ 0.4 → 1.0`, else `0`.
//! Absolute ladder: `≥ 1000 → 2.0`, `≥ 500 → 1.5`, `≥ 100 → 1.0`, else `0`.
//!
//! A criterion that misses full marks contributes exactly one fixed
//! recommendation. Recommendations are listed in criterion order.

use serde::Serialize;
use std::fmt;

use crate::analyzer::Analysis;
use crate::stats;

pub const MAX_SCORE: f64 = 10.0;
pub const POINTS_PER_CRITERION: f64 = 2.0;

const RATIO_LADDER: [f64; 3] = [0.8, 0.6, 0.4];
const THROUGHPUT_LADDER: [f64; 3] = [1000.0, 500.0, 100.0];
const LADDER_POINTS: [f64; 3] = [2.0, 1.5, 1.0];

/// The five scoring criteria, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ChunkSize,
    ContentDiversity,
    MetadataCompleteness,
    Throughput,
    SizeConsistency,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::ChunkSize,
        Criterion::ContentDiversity,
        Criterion::MetadataCompleteness,
        Criterion::Throughput,
        Criterion::SizeConsistency,
    ];

    pub fn recommendation(self) -> &'static str {
        match self {
            Criterion::ChunkSize => "Improve chunk sizing (optimal: 500-1500 characters)",
            Criterion::ContentDiversity => "Increase content diversity across chunks",
            Criterion::MetadataCompleteness => "Enrich chunk metadata",
            Criterion::Throughput => "Optimize processing performance",
            Criterion::SizeConsistency => "Improve chunk size consistency",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Criterion::ChunkSize => "Chunk size",
            Criterion::ContentDiversity => "Content diversity",
            Criterion::MetadataCompleteness => "Metadata completeness",
            Criterion::Throughput => "Processing throughput",
            Criterion::SizeConsistency => "Size consistency",
        }
    }

    /// The quantity this criterion grades.
    pub fn measure(self, analysis: &Analysis) -> f64 {
        let q = &analysis.vector_store_quality;
        match self {
            Criterion::ChunkSize => q.optimal_size_ratio,
            Criterion::ContentDiversity => q.content_variety,
            Criterion::MetadataCompleteness => q.metadata_richness,
            Criterion::Throughput => analysis.performance.chars_per_ms,
            Criterion::SizeConsistency => consistency_ratio(analysis),
        }
    }

    fn ladder(self) -> &'static [f64; 3] {
        match self {
            Criterion::Throughput => &THROUGHPUT_LADDER,
            _ => &RATIO_LADDER,
        }
    }

    /// Points for a measured value: first rung reached wins.
    pub fn points(self, value: f64) -> f64 {
        self.ladder()
            .iter()
            .zip(LADDER_POINTS)
            .find(|(threshold, _)| value >= **threshold)
            .map(|(_, points)| points)
            .unwrap_or(0.0)
    }
}

/// `1 − std_dev / mean`, or 0 when the mean size is 0.
pub fn consistency_ratio(analysis: &Analysis) -> f64 {
    let size = &analysis.chunks.size;
    if size.mean > 0.0 {
        1.0 - stats::ratio(size.std_dev, size.mean)
    } else {
        0.0
    }
}

/// Qualitative classification of a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityTier {
    Excellent,
    Good,
    Acceptable,
    #[serde(rename = "Needs improvement")]
    NeedsImprovement,
}

impl QualityTier {
    /// Lower bounds are inclusive and checked from the top down.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            QualityTier::Excellent
        } else if score >= 6.0 {
            QualityTier::Good
        } else if score >= 4.0 {
            QualityTier::Acceptable
        } else {
            QualityTier::NeedsImprovement
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Excellent => "Excellent",
            QualityTier::Good => "Good",
            QualityTier::Acceptable => "Acceptable",
            QualityTier::NeedsImprovement => "Needs improvement",
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            QualityTier::Excellent => "🟢",
            QualityTier::Good => "🟡",
            QualityTier::Acceptable => "🟠",
            QualityTier::NeedsImprovement => "🔴",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub criterion: Criterion,
    pub value: f64,
    pub points: f64,
}

/// Renders as `Chunk size: 1.00 → 2.0/2`.
impl fmt::Display for CriterionScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2} → {:.1}/{}",
            self.criterion.label(),
            self.value,
            self.points,
            POINTS_PER_CRITERION
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub tier: QualityTier,
    pub indicator: &'static str,
    pub criteria: Vec<CriterionScore>,
    pub recommendations: Vec<String>,
}

pub fn evaluate(analysis: &Analysis) -> Evaluation {
    let mut score = 0.0;
    let mut criteria = Vec::with_capacity(Criterion::ALL.len());
    let mut recommendations = Vec::new();

    for criterion in Criterion::ALL {
        let value = criterion.measure(analysis);
        let points = criterion.points(value);
        if points < POINTS_PER_CRITERION {
            recommendations.push(criterion.recommendation().to_string());
        }
        score += points;
        criteria.push(CriterionScore {
            criterion,
            value,
            points,
        });
    }

    let tier = QualityTier::from_score(score);
    Evaluation {
        score,
        max_score: MAX_SCORE,
        percentage: score / MAX_SCORE * 100.0,
        tier,
        indicator: tier.indicator(),
        criteria,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::analyzer::tests::{artifact, scenario_a, scenario_b};

    #[test]
    fn test_scenario_a_scores_full_marks() {
        let eval = evaluate(&analyze(&scenario_a()));
        assert_eq!(eval.score, 10.0);
        assert_eq!(eval.percentage, 100.0);
        assert_eq!(eval.tier, QualityTier::Excellent);
        assert_eq!(eval.indicator, "🟢");
        assert!(eval.recommendations.is_empty());
    }

    #[test]
    fn test_scenario_b_needs_improvement() {
        let eval = evaluate(&analyze(&scenario_b()));
        assert!(eval.score <= 4.0);
        assert_eq!(eval.tier, QualityTier::NeedsImprovement);
        assert!(eval.recommendations.len() >= 3);
        for criterion in [
            Criterion::ChunkSize,
            Criterion::Throughput,
            Criterion::MetadataCompleteness,
        ] {
            assert!(eval
                .recommendations
                .contains(&criterion.recommendation().to_string()));
        }
    }

    #[test]
    fn test_zero_chunks_scores_zero_with_every_recommendation() {
        let eval = evaluate(&analyze(&artifact(Vec::new(), 0.0, 0)));
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.tier, QualityTier::NeedsImprovement);
        let expected: Vec<String> = Criterion::ALL
            .iter()
            .map(|c| c.recommendation().to_string())
            .collect();
        assert_eq!(eval.recommendations, expected);
        assert!(eval.criteria.iter().all(|c| c.points == 0.0));
    }

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (0.0, QualityTier::NeedsImprovement),
            (3.999, QualityTier::NeedsImprovement),
            (4.0, QualityTier::Acceptable),
            (5.999, QualityTier::Acceptable),
            (6.0, QualityTier::Good),
            (7.999, QualityTier::Good),
            (8.0, QualityTier::Excellent),
            (10.0, QualityTier::Excellent),
        ];
        for (score, tier) in cases {
            assert_eq!(QualityTier::from_score(score), tier, "score {}", score);
        }
    }

    #[test]
    fn test_ratio_ladder() {
        let c = Criterion::ChunkSize;
        assert_eq!(c.points(1.0), 2.0);
        assert_eq!(c.points(0.8), 2.0);
        assert_eq!(c.points(0.79), 1.5);
        assert_eq!(c.points(0.6), 1.5);
        assert_eq!(c.points(0.4), 1.0);
        assert_eq!(c.points(0.39), 0.0);
    }

    #[test]
    fn test_throughput_ladder_is_absolute() {
        let c = Criterion::Throughput;
        assert_eq!(c.points(2000.0), 2.0);
        assert_eq!(c.points(1000.0), 2.0);
        assert_eq!(c.points(999.0), 1.5);
        assert_eq!(c.points(100.0), 1.0);
        assert_eq!(c.points(0.06), 0.0);
    }

    #[test]
    fn test_partial_credit_still_recommends_once() {
        let mut analysis = analyze(&scenario_a());
        analysis.vector_store_quality.metadata_richness = 0.65;
        let eval = evaluate(&analysis);
        assert_eq!(eval.score, 9.5);
        assert_eq!(
            eval.recommendations,
            vec![Criterion::MetadataCompleteness.recommendation().to_string()]
        );
    }

    #[test]
    fn test_lowering_one_criterion_is_monotonic() {
        let base_analysis = analyze(&scenario_a());
        let base = evaluate(&base_analysis);

        for value in [0.7, 0.5, 0.1] {
            let mut analysis = base_analysis.clone();
            analysis.vector_store_quality.content_variety = value;
            let eval = evaluate(&analysis);

            for rec in &base.recommendations {
                assert!(eval.recommendations.contains(rec));
            }
            for (before, after) in base.criteria.iter().zip(&eval.criteria) {
                if after.criterion != Criterion::ContentDiversity {
                    assert_eq!(before.points, after.points);
                }
            }
            assert!(eval
                .recommendations
                .contains(&Criterion::ContentDiversity.recommendation().to_string()));
        }
    }

    #[test]
    fn test_score_bounds_and_percentage() {
        for art in [scenario_a(), scenario_b(), artifact(Vec::new(), 5.0, 0)] {
            let eval = evaluate(&analyze(&art));
            assert!((0.0..=MAX_SCORE).contains(&eval.score));
            assert_eq!(eval.percentage, eval.score / 10.0 * 100.0);
        }
    }

    #[test]
    fn test_consistency_ratio_zero_mean() {
        let analysis = analyze(&artifact(Vec::new(), 1.0, 0));
        assert_eq!(consistency_ratio(&analysis), 0.0);
    }

    #[test]
    fn test_criterion_score_display() {
        let eval = evaluate(&analyze(&scenario_b()));
        let lines: Vec<String> = eval.criteria.iter().map(|c| c.to_string()).collect();
        assert_eq!(lines[0], "Chunk size: 0.00 → 0.0/2");
        assert_eq!(lines[1], "Content diversity: 1.00 → 2.0/2");
        assert_eq!(lines[2], "Metadata completeness: 0.25 → 0.0/2");
        assert_eq!(lines[4], "Size consistency: 0.50 → 1.0/2");
    }

    #[test]
    fn test_tier_serializes_as_label() {
        let json = serde_json::to_string(&QualityTier::NeedsImprovement).unwrap();
        assert_eq!(json, "\"Needs improvement\"");
    }
}
