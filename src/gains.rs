use crate::config::LearningDomain;
use crate::models::{LearningDomainGain, LearningGainsData, RawRecord, ReportPeriod};
use crate::normalize;

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

pub fn analyze(
    records: &[RawRecord],
    domains: &[LearningDomain],
    period: &ReportPeriod,
) -> LearningGainsData {
    let domains: Vec<LearningDomainGain> = normalize::domain_samples(records, domains)
        .into_iter()
        .map(|(domain, samples)| {
            let baseline_avg = mean(&samples.baseline);
            let endline_avg = mean(&samples.endline);
            LearningDomainGain {
                domain: domain.key,
                label: domain.label,
                baseline_avg,
                endline_avg,
                change: baseline_avg
                    .zip(endline_avg)
                    .map(|(baseline, endline)| endline - baseline),
                sample_size: samples.baseline.len() + samples.endline.len(),
                baseline_samples: samples.baseline.len(),
                endline_samples: samples.endline.len(),
            }
        })
        .collect();

    let index = improvement_index(&domains);
    tracing::debug!(
        domains = domains.len(),
        complete = domains.iter().filter(|d| d.change.is_some()).count(),
        "learning gains computed"
    );

    LearningGainsData {
        period: period.display(),
        domains,
        school_improvement_index: index,
    }
}

/// Mean of the domain changes that could be computed. `None` when no domain
/// has both a baseline and an endline, which is distinct from a zero gain.
pub fn improvement_index(domains: &[LearningDomainGain]) -> Option<f64> {
    let changes: Vec<f64> = domains.iter().filter_map(|domain| domain.change).collect();
    mean(&changes)
}
