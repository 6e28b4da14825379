//! Loop configuration file format and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tk_signals::SchedulerMode;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::phase::Phase;

/// Longest accepted control period, in seconds.
pub const MAX_PERIOD_S: f64 = 3600.0;
/// Most periodic calls a single run may drive.
pub const MAX_CYCLES: u64 = 10_000_000;
/// Longest accepted moving-average window, in cycles.
pub const MAX_AVERAGE_WINDOW: usize = 100_000;

/// Everything a host needs to drive a control loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// How the scheduler is cycled.
    #[serde(default)]
    pub scheduler: SchedulerMode,
    /// Nominal control period; the simulated clock step in manual mode.
    #[serde(default = "default_period_s")]
    pub period_s: f64,
    /// Number of periodic calls to drive.
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    /// Phase timeline, ordered by `at_cycle`. Before the first entry the
    /// loop is disabled.
    #[serde(default)]
    pub phases: Vec<PhaseStep>,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Switch to `phase` from periodic call `at_cycle` on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseStep {
    pub at_cycle: u64,
    pub phase: Phase,
}

/// Tuning of the demo position loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Proportional gain from position error to commanded speed.
    pub gain: f64,
    /// Speed limit, units per second.
    pub max_speed: f64,
    /// Position error counted as "on target".
    pub tolerance: f64,
    /// Cycles the on-target condition must hold before it is reported.
    pub debounce_cycles: u32,
    /// Window of the smoothed speed, in cycles.
    pub average_window: usize,
    /// Setpoint held during autonomous.
    pub auto_setpoint: f64,
    /// Frequency of the synthetic operator stick used in teleop.
    pub stick_hz: f64,
    /// Stick readings closer than this to center count as zero.
    pub stick_deadband: f64,
}

fn default_period_s() -> f64 {
    0.02
}

fn default_cycles() -> u64 {
    250
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            gain: 4.0,
            max_speed: 1.5,
            tolerance: 0.05,
            debounce_cycles: 5,
            average_window: 10,
            auto_setpoint: 1.0,
            stick_hz: 0.25,
            stick_deadband: 0.05,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerMode::Manual,
            period_s: default_period_s(),
            cycles: default_cycles(),
            phases: vec![
                PhaseStep {
                    at_cycle: 0,
                    phase: Phase::Disabled,
                },
                PhaseStep {
                    at_cycle: 10,
                    phase: Phase::Autonomous,
                },
                PhaseStep {
                    at_cycle: 110,
                    phase: Phase::Teleop,
                },
            ],
            demo: DemoConfig::default(),
        }
    }
}

impl LoopConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let config: LoopConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> AppResult<String> {
        self.validate()?;
        Ok(serde_yaml::to_string(self)?)
    }

    /// Phase in effect on periodic call `cycle`.
    pub fn phase_at(&self, cycle: u64) -> Phase {
        self.phases
            .iter()
            .take_while(|step| step.at_cycle <= cycle)
            .last()
            .map_or(Phase::Disabled, |step| step.phase)
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_period("period_s", self.period_s)?;
        if self.cycles == 0 || self.cycles > MAX_CYCLES {
            return Err(invalid(
                "cycles",
                self.cycles,
                &format!("must be between 1 and {MAX_CYCLES}"),
            ));
        }
        if let SchedulerMode::Timed { period_s } = self.scheduler {
            validate_period("scheduler.period_s", period_s)?;
            if period_s != self.period_s {
                warn!(
                    scheduler_period_s = period_s,
                    period_s = self.period_s,
                    "timed scheduler period differs from nominal period; scheduler period wins"
                );
            }
        }
        for pair in self.phases.windows(2) {
            if pair[1].at_cycle < pair[0].at_cycle {
                return Err(invalid(
                    "phases.at_cycle",
                    pair[1].at_cycle,
                    "phase timeline must be ordered",
                ));
            }
        }

        let demo = &self.demo;
        validate_non_negative_finite("demo.gain", demo.gain)?;
        validate_positive_finite("demo.max_speed", demo.max_speed)?;
        validate_non_negative_finite("demo.tolerance", demo.tolerance)?;
        validate_non_negative_finite("demo.stick_hz", demo.stick_hz)?;
        validate_non_negative_finite("demo.stick_deadband", demo.stick_deadband)?;
        if !demo.auto_setpoint.is_finite() {
            return Err(invalid("demo.auto_setpoint", demo.auto_setpoint, "must be finite"));
        }
        if demo.average_window == 0 || demo.average_window > MAX_AVERAGE_WINDOW {
            return Err(invalid(
                "demo.average_window",
                demo.average_window,
                &format!("must be between 1 and {MAX_AVERAGE_WINDOW}"),
            ));
        }
        Ok(())
    }
}

pub fn load_yaml(path: &Path) -> AppResult<LoopConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    LoopConfig::from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, config: &LoopConfig) -> AppResult<()> {
    let content = config.to_yaml_string()?;
    std::fs::write(path, content).map_err(|source| AppError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> AppError {
    AppError::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_positive_finite(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be positive and finite"));
    }
    Ok(())
}

fn validate_period(field: &str, value: f64) -> AppResult<()> {
    validate_positive_finite(field, value)?;
    if value > MAX_PERIOD_S {
        return Err(invalid(
            field,
            value,
            &format!("must not exceed {MAX_PERIOD_S} s"),
        ));
    }
    Ok(())
}

fn validate_non_negative_finite(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be non-negative and finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config_is_valid() {
        LoopConfig::default().validate().unwrap();
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = LoopConfig::from_yaml_str("cycles: 20\n").unwrap();
        assert_eq!(config.cycles, 20);
        assert_eq!(config.period_s, 0.02);
        assert!(config.scheduler.is_manual());
        assert!(config.phases.is_empty());
        assert_eq!(config.demo, DemoConfig::default());
    }

    #[test]
    fn parses_timed_scheduler_and_timeline() {
        let yaml = r#"
scheduler:
  mode: timed
  period_s: 0.01
period_s: 0.01
cycles: 5
phases:
  - { at_cycle: 0, phase: teleop }
  - { at_cycle: 3, phase: disabled }
demo:
  debounce_cycles: 2
"#;
        let config = LoopConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.scheduler, SchedulerMode::Timed { period_s: 0.01 });
        assert_eq!(config.demo.debounce_cycles, 2);
        assert_eq!(config.demo.gain, DemoConfig::default().gain);
        assert_eq!(config.phase_at(2), Phase::Teleop);
        assert_eq!(config.phase_at(3), Phase::Disabled);
    }

    #[test]
    fn phase_before_first_step_is_disabled() {
        let config = LoopConfig {
            phases: vec![PhaseStep {
                at_cycle: 4,
                phase: Phase::Autonomous,
            }],
            ..LoopConfig::default()
        };
        assert_eq!(config.phase_at(0), Phase::Disabled);
        assert_eq!(config.phase_at(4), Phase::Autonomous);
        assert_eq!(config.phase_at(1000), Phase::Autonomous);
    }

    #[test]
    fn rejects_bad_values() {
        let err = LoopConfig::from_yaml_str("period_s: 0.0\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { ref field, .. } if field == "period_s"));

        let err = LoopConfig::from_yaml_str("demo:\n  average_window: 0\n").unwrap_err();
        assert!(err.to_string().contains("demo.average_window"));

        let yaml = "phases:\n  - { at_cycle: 5, phase: teleop }\n  - { at_cycle: 2, phase: disabled }\n";
        assert!(LoopConfig::from_yaml_str(yaml).is_err());

        assert!(matches!(
            LoopConfig::from_yaml_str("scheduler: { mode: timed, period_s: -1.0 }\n"),
            Err(AppError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_values_too_large_to_run() {
        let err = LoopConfig::from_yaml_str("period_s: 1.0e30\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { ref field, .. } if field == "period_s"));

        let yaml = "scheduler: { mode: timed, period_s: 1.0e30 }\n";
        let err = LoopConfig::from_yaml_str(yaml).unwrap_err();
        assert!(
            matches!(err, AppError::InvalidConfig { ref field, .. } if field == "scheduler.period_s")
        );

        let huge = LoopConfig {
            cycles: u64::MAX / 2,
            ..LoopConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(AppError::InvalidConfig { ref field, .. }) if field == "cycles"
        ));

        let mut wide = LoopConfig::default();
        wide.demo.average_window = MAX_AVERAGE_WINDOW + 1;
        assert!(wide.validate().is_err());

        let edge = LoopConfig {
            period_s: MAX_PERIOD_S,
            cycles: MAX_CYCLES,
            ..LoopConfig::default()
        };
        edge.validate().unwrap();
    }

    proptest! {
        #[test]
        fn phase_at_picks_latest_started_step(
            mut starts in proptest::collection::vec(0u64..100, 0..6),
            cycle in 0u64..120,
        ) {
            starts.sort_unstable();
            let phases: Vec<PhaseStep> = starts
                .iter()
                .enumerate()
                .map(|(i, &at_cycle)| PhaseStep { at_cycle, phase: Phase::ALL[i % 3] })
                .collect();
            let expected = phases
                .iter()
                .filter(|step| step.at_cycle <= cycle)
                .last()
                .map_or(Phase::Disabled, |step| step.phase);
            let config = LoopConfig { phases, ..LoopConfig::default() };
            prop_assert!(config.validate().is_ok());
            prop_assert_eq!(config.phase_at(cycle), expected);
        }
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let config = LoopConfig::default();
        let text = config.to_yaml_string().unwrap();
        assert_eq!(LoopConfig::from_yaml_str(&text).unwrap(), config);
    }
}
