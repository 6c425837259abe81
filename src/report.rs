use std::fmt::Write;

use crate::engine::EngineReport;
use crate::models::{
    CostEffectivenessData, DataQualitySummary, FidelityDashboardData, LearningGainsData,
    PerformanceNode,
};

pub const NOT_AVAILABLE: &str = "Data not available";
pub const INSUFFICIENT: &str = "insufficient data";

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.2}"))
}

fn signed(value: Option<f64>) -> String {
    value.map_or_else(|| INSUFFICIENT.to_string(), |v| format!("{v:+.2}"))
}

fn average(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn render_tree(output: &mut String, node: &PerformanceNode, depth: usize) {
    let indent = "  ".repeat(depth);
    if !node.has_data() {
        let _ = writeln!(output, "{indent}- {} ({}): No data", node.name, node.level);
        return;
    }
    let [instruction, outcomes, leadership, community, environment] = node.scores.dimensions();
    let weaning = match node.weaning_eligible {
        Some(true) => " [weaning eligible]",
        _ => "",
    };
    let _ = writeln!(
        output,
        "{indent}- {} ({}, {} schools): instruction {:.2}, outcomes {:.2}, leadership {:.2}, community {:.2}, environment {:.2}{weaning}",
        node.name,
        node.level,
        node.school_count,
        instruction,
        outcomes,
        leadership,
        community,
        environment
    );
    for child in &node.children {
        render_tree(output, child, depth + 1);
    }
}

pub fn render_fidelity(output: &mut String, fidelity: &FidelityDashboardData) {
    let scope = &fidelity.scope;
    let _ = writeln!(
        output,
        "{} ({}): {:.1} / 100, {} across {} schools",
        scope.name, scope.level, scope.total_score, scope.band, scope.sample_size
    );
    for driver in &scope.drivers {
        let score = driver
            .score
            .map_or_else(|| NOT_AVAILABLE.to_string(), |score| format!("{score:.1}"));
        let _ = writeln!(output, "- {}: {score} ({})", driver.label, driver.detail);
    }
    if !fidelity.rankings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Rankings:");
        for (rank, entry) in fidelity.rankings.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} {:.1} ({})",
                rank + 1,
                entry.name,
                entry.score,
                entry.band
            );
        }
    }
}

pub fn render_gains(output: &mut String, gains: &LearningGainsData) {
    let _ = writeln!(output, "Period: {}", gains.period);
    for domain in &gains.domains {
        let _ = writeln!(
            output,
            "- {}: baseline {}, endline {}, change {} (n={})",
            domain.label,
            average(domain.baseline_avg),
            average(domain.endline_avg),
            signed(domain.change),
            domain.sample_size
        );
    }
    let _ = writeln!(
        output,
        "Improvement index: {}",
        signed(gains.school_improvement_index)
    );
}

pub fn render_cost(output: &mut String, cost: &CostEffectivenessData) {
    let _ = writeln!(output, "Period: {}", cost.period);
    let _ = writeln!(output, "Total cost: {:.2}", cost.total_cost);
    let _ = writeln!(
        output,
        "- Cost per school: {} ({} schools)",
        money(cost.cost_per_school),
        cost.schools_supported
    );
    let _ = writeln!(
        output,
        "- Cost per teacher trained: {} ({} teachers)",
        money(cost.cost_per_teacher),
        cost.teachers_trained
    );
    let _ = writeln!(
        output,
        "- Cost per learner assessed: {} ({} learners)",
        money(cost.cost_per_learner_assessed),
        cost.learners_assessed
    );
    if cost.breakdown.is_empty() {
        let _ = writeln!(output, "No cost entries recorded for this scope.");
    } else {
        for line in &cost.breakdown {
            let _ = writeln!(output, "- {}: {:.2}", line.category.as_str(), line.amount);
        }
    }
}

pub fn render_quality(output: &mut String, quality: &DataQualitySummary) {
    let _ = writeln!(output, "Completeness: {:.1}%", quality.completeness_score);
    let _ = writeln!(
        output,
        "- Schools missing baseline: {}",
        quality.schools_missing_baseline
    );
    let _ = writeln!(
        output,
        "- Schools missing endline: {}",
        quality.schools_missing_endline
    );
    let _ = writeln!(output, "- Outlier values: {}", quality.outlier_count);
    let _ = writeln!(
        output,
        "- Duplicate learners: {}",
        quality.duplicate_learners_detected
    );
    let _ = writeln!(
        output,
        "- Duplicate teachers: {}",
        quality.duplicate_teachers_detected
    );
}

pub fn build_report(report: &EngineReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Literacy Program Fidelity Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}; {} records)",
        report.scope, report.period, report.record_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Scorecard");
    render_tree(&mut output, &report.tree, 0);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weaning Eligibility");
    if report.weaning_eligible_schools.is_empty() {
        let _ = writeln!(output, "No schools meet every threshold yet.");
    } else {
        for school in &report.weaning_eligible_schools {
            let _ = writeln!(output, "- {school}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Implementation Fidelity");
    render_fidelity(&mut output, &report.fidelity);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learning Gains");
    render_gains(&mut output, &report.gains);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cost Effectiveness");
    render_cost(&mut output, &report.cost);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    render_quality(&mut output, &report.quality);

    output
}
