use crate::error::{CheckError, Result};
use crate::expression::{additional_target_label, TriggerExpression};
use std::collections::HashMap;
use vigil_common::types::{State, TimeSeries, Trigger};
use vigil_target::TargetResolver;

/// Resolved series of every target of a trigger.
///
/// `additional[i]` belongs to target `i + 2`; `None` means that target matched
/// nothing at all.
#[derive(Debug, Clone, Default)]
pub struct TriggerTimeSeries {
    pub main: Vec<TimeSeries>,
    pub additional: Vec<Option<TimeSeries>>,
}

/// Resolves every target of `trigger` over `[from, until]`.
///
/// Returns the grouped series and every concrete metric name matched across
/// all targets.
pub fn assemble(
    resolver: &dyn TargetResolver,
    trigger: &Trigger,
    from: i64,
    until: i64,
) -> Result<(TriggerTimeSeries, Vec<String>)> {
    let mut series = TriggerTimeSeries::default();
    let mut metrics = Vec::new();
    let allow_realtime = trigger.is_simple();

    for (index, target) in trigger.targets.iter().enumerate() {
        let result = resolver.evaluate_target(target, from, until, allow_realtime)?;

        if index == 0 {
            series.main = result.series;
        } else {
            let target_number = index + 1;
            let mut resolved = result.series;
            match resolved.len() {
                0 if !result.metrics.is_empty() => {
                    return Err(CheckError::InvalidTarget(format!(
                        "Target #{target_number} has no timeseries"
                    )));
                }
                0 => series.additional.push(None),
                1 => series.additional.push(resolved.pop()),
                _ => {
                    return Err(CheckError::InvalidTarget(format!(
                        "Target #{target_number} has more than one timeseries"
                    )));
                }
            }
        }
        metrics.extend(result.metrics);
    }

    Ok((series, metrics))
}

impl TriggerTimeSeries {
    /// True when the main target resolved only to wildcard placeholders.
    pub fn has_only_wildcards(&self) -> bool {
        !self.main.is_empty() && self.main.iter().all(|series| series.wildcard)
    }

    /// Aligned values of `main` and every additional target at `timestamp`,
    /// or `None` if any of them has no sample there.
    pub fn values_at(&self, main: &TimeSeries, timestamp: i64) -> Option<AlignedValues> {
        let main_value = main.value_at(timestamp)?;
        let mut additional = HashMap::with_capacity(self.additional.len());
        for (index, series) in self.additional.iter().enumerate() {
            let value = series.as_ref()?.value_at(timestamp)?;
            additional.insert(additional_target_label(index), value);
        }
        Some(AlignedValues {
            main: main_value,
            additional,
        })
    }
}

/// Target values present at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedValues {
    pub main: f64,
    pub additional: HashMap<String, f64>,
}

impl AlignedValues {
    /// Packages these values with the trigger's thresholds for evaluation.
    pub fn into_expression(self, trigger: &Trigger, previous_state: State) -> TriggerExpression {
        TriggerExpression {
            main_target_value: self.main,
            additional_target_values: self.additional,
            warn_value: trigger.warn_value,
            error_value: trigger.error_value,
            previous_state,
        }
    }
}
