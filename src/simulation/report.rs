//! Final results of a run, printable as text and serializable.

use std::fmt;

use serde::Serialize;

use super::OverlapSimulation;
use crate::error::{OverlapError, Result};
use crate::overlap::{sanitize, OverlapAccumulator, OverlapSystem, SystemRole};
use crate::sampling::MoveDiagnostics;

/// Summary statistics of one data channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub average: f64,
    pub stdev: f64,
    pub error: f64,
    /// Lag-one correlation of successive block averages.
    pub correlation: f64,
}

impl ChannelStats {
    fn of(acc: &OverlapAccumulator, index: usize) -> Self {
        Self {
            average: acc.average(index),
            stdev: acc.standard_deviation(index),
            error: acc.error(index),
            correlation: acc.block_correlation(index),
        }
    }
}

/// Results for one of the two systems.
#[derive(Clone, Debug, Serialize)]
pub struct SystemReport {
    pub role: SystemRole,
    /// Primary value over the overlap channel.
    pub ratio: f64,
    pub ratio_error: f64,
    /// Correlation between primary value and overlap channel.
    pub ratio_correlation: f64,
    pub value: ChannelStats,
    pub overlap: ChannelStats,
    pub samples: u64,
    pub skipped: u64,
    pub moves: Vec<MoveDiagnostics>,
}

impl SystemReport {
    fn of<C>(system: &OverlapSystem<C>, alpha_index: usize) -> Self {
        let acc = system.accumulator();
        let o = acc.overlap_index(alpha_index);
        Self {
            role: system.role(),
            ratio: acc.value_over_overlap(0, alpha_index),
            ratio_error: acc.value_over_overlap_error(0, alpha_index),
            ratio_correlation: acc.correlation(acc.value_index(0), o),
            value: ChannelStats::of(acc, acc.value_index(0)),
            overlap: ChannelStats::of(acc, o),
            samples: acc.sample_count(),
            skipped: system.skipped_samples(),
            moves: system.sampler().move_diagnostics(),
        }
    }
}

/// An extra target value.
#[derive(Clone, Debug, Serialize)]
pub struct ExtraReport {
    pub name: String,
    pub average: f64,
    pub error: f64,
    /// Correlation with the overlap channel.
    pub ocor: f64,
    /// Correlation with each target value, primary first.
    pub dcor: Vec<f64>,
    pub ratio: f64,
    pub ratio_error: f64,
    /// Correlation of this ratio with every target value's ratio.
    pub ratio_correlations: Vec<f64>,
    /// Ratio scaled by the reference integral.
    pub full_average: f64,
    pub full_error: f64,
    pub full_correlations: Vec<f64>,
}

/// Everything printed at the end of a run.
#[derive(Clone, Debug, Serialize)]
pub struct OverlapReport {
    pub ratio: f64,
    pub ratio_error: f64,
    pub reference_integral: f64,
    pub full_average: f64,
    pub full_error: f64,
    pub ref_pref: Option<f64>,
    /// Candidate whose overlap channel the per-system numbers refer to.
    pub alpha: f64,
    pub overlap_ratio: f64,
    pub overlap_ratio_error: f64,
    pub ref_step_fraction: f64,
    pub reference: SystemReport,
    pub target: SystemReport,
    pub extras: Vec<ExtraReport>,
}

impl<C> OverlapSimulation<C> {
    /// Collect the final results. `labels` name the extra target values and
    /// must match their number.
    pub fn report(&self, reference_integral: f64, labels: Option<&[&str]>) -> Result<OverlapReport> {
        let estimator = self.allocator.estimator()?;
        let (ratio, ratio_error) = estimator.average_and_error(0)?;
        let alpha_index = if estimator.num_alpha() == 1 {
            0
        } else {
            estimator.min_diff_location()
        };
        let alpha = self.allocator.candidates().alpha(alpha_index);
        let (overlap_ratio, overlap_ratio_error) = estimator.overlap_average_and_error_for_alpha(alpha);

        let reference = SystemReport::of(self.allocator.reference(), alpha_index);
        let target = SystemReport::of(self.allocator.target(), alpha_index);
        let extras = extra_reports(
            self.allocator.target().accumulator(),
            alpha_index,
            (reference.ratio, reference.ratio_error),
            reference_integral,
            labels,
        )?;

        Ok(OverlapReport {
            ratio,
            ratio_error,
            reference_integral,
            full_average: ratio * reference_integral,
            full_error: ratio_error * reference_integral.abs(),
            ref_pref: self.allocator.ref_pref().value(),
            alpha,
            overlap_ratio,
            overlap_ratio_error,
            ref_step_fraction: self.allocator.ref_step_fraction(),
            reference,
            target,
            extras,
        })
    }

    /// Print the report to stdout and return it.
    pub fn print_results(&self, reference_integral: f64, labels: Option<&[&str]>) -> Result<OverlapReport> {
        let report = self.report(reference_integral, labels)?;
        println!("{}", report);
        Ok(report)
    }
}

fn extra_reports(
    target: &OverlapAccumulator,
    alpha_index: usize,
    (ref_ratio, ref_ratio_error): (f64, f64),
    reference_integral: f64,
    labels: Option<&[&str]>,
) -> Result<Vec<ExtraReport>> {
    let n = target.num_extra();
    if let Some(labels) = labels {
        if labels.len() != n {
            return Err(OverlapError::DimensionMismatch {
                expected: n,
                found: labels.len(),
                context: "extra value labels",
            });
        }
    }
    let o = target.overlap_index(alpha_index);
    let e_o = target.error(o) / target.average(o);
    let ed = ref_ratio_error / ref_ratio;

    // per target value: relative error, ratio, ratio over its error, overlap correlation
    let e: Vec<f64> = (0..=n).map(|i| target.error(i) / target.average(i)).collect();
    let ratios: Vec<f64> = (0..=n).map(|i| target.value_over_overlap(i, alpha_index)).collect();
    let ro: Vec<f64> = (0..=n)
        .map(|i| ratios[i] / target.value_over_overlap_error(i, alpha_index))
        .collect();
    let ocor: Vec<f64> = (0..=n).map(|i| target.correlation(i, o)).collect();
    let rd: Vec<f64> = ro.iter().map(|r| 1.0 / (ed * ed + 1.0 / (r * r)).sqrt()).collect();

    let reports = (1..=n)
        .map(|i| {
            let name = match labels {
                Some(labels) => labels[i - 1].to_string(),
                None => format!("Extra {}", i),
            };
            let dcor: Vec<f64> = (0..=n).map(|j| target.correlation(i, j)).collect();
            let ratio_correlations: Vec<f64> = (0..=n)
                .map(|j| {
                    sanitize(
                        ro[i] * ro[j]
                            * (e_o * e_o + e[i] * e[j] * dcor[j] - e[i] * e_o * ocor[i] - e[j] * e_o * ocor[j]),
                    )
                })
                .collect();
            let avg = ratios[i] / ref_ratio;
            let err = avg.abs() / rd[i];
            let full_correlations = (0..=n)
                .map(|j| {
                    let avg_j = ratios[j] / ref_ratio;
                    sanitize(
                        avg.signum() * avg_j.signum() * rd[i] * rd[j]
                            * (ed * ed + ratio_correlations[j] / (ro[i] * ro[j])),
                    )
                })
                .collect();
            ExtraReport {
                name,
                average: target.average(i),
                error: target.error(i),
                ocor: ocor[i],
                dcor,
                ratio: ratios[i],
                ratio_error: target.value_over_overlap_error(i, alpha_index),
                ratio_correlations,
                full_average: reference_integral * avg,
                full_error: reference_integral.abs() * err,
                full_correlations,
            }
        })
        .collect();
    Ok(reports)
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, values: &[f64]) -> fmt::Result {
    write!(f, "  {}:", label)?;
    for v in values {
        write!(f, " {:>10.6}", v)?;
    }
    writeln!(f)
}

impl fmt::Display for SystemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ratio average: {:>22.15e}  error: {:.5e}  cor: {:.4}",
            self.role, self.ratio, self.ratio_error, self.ratio_correlation
        )?;
        for (label, stats) in [("average", &self.value), ("overlap average", &self.overlap)] {
            writeln!(
                f,
                "{} {}: {:>22.15e}  stdev: {:.4e}  error: {:.4e}  cor: {:.4}",
                self.role, label, stats.average, stats.stdev, stats.error, stats.correlation
            )?;
        }
        for m in &self.moves {
            writeln!(
                f,
                "{} move {}: step {:.4e}  acceptance {:.4}  trials {}  reversals {}",
                self.role, m.name, m.step_size, m.acceptance, m.attempted, m.reversals
            )?;
        }
        if self.skipped > 0 {
            writeln!(f, "{} skipped samples: {} of {}", self.role, self.skipped, self.skipped + self.samples)?;
        }
        Ok(())
    }
}

impl fmt::Display for OverlapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ratio average: {:e}  error: {:e}", self.ratio, self.ratio_error)?;
        writeln!(f, "abs average: {:e}  error: {:e}", self.full_average, self.full_error)?;
        if let Some(ref_pref) = self.ref_pref {
            writeln!(f, "reference preference: {:e}", ref_pref)?;
        }
        writeln!(
            f,
            "overlap ratio at {:.6e}: {:>22.15e}  error: {:.5e}",
            self.alpha, self.overlap_ratio, self.overlap_ratio_error
        )?;
        writeln!(f, "reference step fraction: {:.4}", self.ref_step_fraction)?;
        write!(f, "{}", self.reference)?;
        write!(f, "{}", self.target)?;
        for extra in &self.extras {
            writeln!(
                f,
                "{} average: {:>22.15e}  error: {:.5e}  ocor: {:.6}",
                extra.name, extra.average, extra.error, extra.ocor
            )?;
            write_list(f, "dcor", &extra.dcor)?;
            writeln!(
                f,
                "{} ratio average: {:>22.15e}  error: {:.5e}",
                extra.name, extra.ratio, extra.ratio_error
            )?;
            write_list(f, "tcor", &extra.ratio_correlations)?;
            writeln!(
                f,
                "{} full average: {:>22.15e}  error: {:.5e}",
                extra.name, extra.full_average, extra.full_error
            )?;
            write_list(f, "tcor", &extra.full_correlations)?;
        }
        Ok(())
    }
}
