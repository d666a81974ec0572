use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use thiserror::Error;

use crate::diag::{DiagnosticLevel, Diagnostics};

/// Option key naming the accepted units; its presence enables the pass.
pub const UNITS_KEY: &str = "seal";
pub const FINAL_KEY: &str = "final";
pub const SEALED_KEY: &str = "sealed";
pub const LOG_KEY: &str = "log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),
    #[error("unit filter must be `*` or a comma-separated list of unit names")]
    EmptyUnitFilter,
    #[error("unknown diagnostic level {0:?} (expected all, trace, debug, info, warning, error or off)")]
    UnknownLevel(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnitFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl UnitFilter {
    pub fn accepts(&self, unit: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(units) => units.contains(unit),
        }
    }
}

impl FromStr for UnitFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::All);
        }
        let units: BTreeSet<String> = s
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();
        if units.is_empty() {
            return Err(ConfigError::EmptyUnitFilter);
        }
        Ok(Self::Only(units))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealConfig {
    pub unit_filter: UnitFilter,
    pub enable_final: bool,
    pub enable_seal: bool,
    pub diagnostics: Diagnostics,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            unit_filter: UnitFilter::All,
            enable_final: true,
            enable_seal: true,
            diagnostics: Diagnostics::default(),
        }
    }
}

impl SealConfig {
    /// Builds a configuration from plugin-style key/value options:
    /// `seal=<*|unit,unit>`, `final=y|..`, `sealed=y|..`, `log=<level>`.
    /// A switch is on only when absent or exactly `y`.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let unit_filter: UnitFilter = options
            .get(UNITS_KEY)
            .ok_or(ConfigError::MissingOption(UNITS_KEY))?
            .parse()?;
        let enable_final = switch(options, FINAL_KEY);
        let enable_seal = switch(options, SEALED_KEY);
        let level = match options.get(LOG_KEY) {
            Some(name) => name.parse::<DiagnosticLevel>()?,
            None => DiagnosticLevel::default(),
        };

        Ok(Self {
            unit_filter,
            enable_final,
            enable_seal,
            diagnostics: Diagnostics::new(level),
        })
    }
}

fn switch(options: &BTreeMap<String, String>, key: &str) -> bool {
    options.get(key).is_none_or(|value| value == "y")
}

/// Translates `seal` subcommand flags into the option map.
pub fn seal_options(units: &str, no_final: bool, no_seal: bool, log: &str) -> BTreeMap<String, String> {
    let yes_no = |off: bool| (if off { "n" } else { "y" }).to_string();
    BTreeMap::from([
        (UNITS_KEY.to_string(), units.to_string()),
        (FINAL_KEY.to_string(), yes_no(no_final)),
        (SEALED_KEY.to_string(), yes_no(no_seal)),
        (LOG_KEY.to_string(), log.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn from_options_applies_defaults() {
        let config = SealConfig::from_options(&options(&[("seal", "*")])).unwrap();
        assert_eq!(config, SealConfig::default());
        assert_eq!(config.diagnostics.level(), DiagnosticLevel::Warning);
    }

    #[test]
    fn from_options_reads_every_key() {
        let config = SealConfig::from_options(&options(&[
            ("seal", "app, lib"),
            ("final", "n"),
            ("sealed", "y"),
            ("log", "DEBUG"),
        ]))
        .unwrap();

        assert!(config.unit_filter.accepts("app"));
        assert!(config.unit_filter.accepts("lib"));
        assert!(!config.unit_filter.accepts("java.base"));
        assert!(!config.enable_final);
        assert!(config.enable_seal);
        assert_eq!(config.diagnostics.level(), DiagnosticLevel::Debug);
    }

    #[test]
    fn invalid_values_fail_before_any_work() {
        assert_eq!(
            SealConfig::from_options(&options(&[])).unwrap_err(),
            ConfigError::MissingOption("seal")
        );
        assert_eq!(
            SealConfig::from_options(&options(&[("seal", " , ")])).unwrap_err(),
            ConfigError::EmptyUnitFilter
        );
        assert!(matches!(
            SealConfig::from_options(&options(&[("seal", "*"), ("log", "loud")])),
            Err(ConfigError::UnknownLevel(_))
        ));
    }

    #[test]
    fn any_switch_value_other_than_y_disables_it() {
        let config =
            SealConfig::from_options(&options(&[("seal", "*"), ("final", "no"), ("sealed", "false")]))
                .unwrap();
        assert!(!config.enable_final);
        assert!(!config.enable_seal);

        let config = SealConfig::from_options(&options(&[("seal", "*"), ("final", "Y")])).unwrap();
        assert!(!config.enable_final);
        assert!(config.enable_seal);
    }

    #[test]
    fn seal_options_round_trip_through_from_options() {
        let config = SealConfig::from_options(&seal_options("app", true, false, "info")).unwrap();
        assert_eq!(
            config.unit_filter,
            UnitFilter::Only(BTreeSet::from(["app".to_string()]))
        );
        assert!(!config.enable_final);
        assert!(config.enable_seal);
        assert_eq!(config.diagnostics.level(), DiagnosticLevel::Info);
    }
}
