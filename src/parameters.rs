/*!

Sweep configuration.

[`Parameters`] deserializes from JSON with every field optional; missing fields take the
defaults below, which reproduce the reference trial of 100 replicates of a population of 1000
per arm:

```json
{
  "model": "intermediate",
  "population": 1000,
  "beta": 0.5,
  "replicates": 100,
  "eps_start": 0.0,
  "eps_delta": 0.05,
  "var_delta": 0.01,
  "tolerance": 1e-9,
  "seed": 123,
  "stream_mode": "sequential",
  "threads": null,
  "output_dir": "."
}
```

The parameters of a sweep are stored in the [`Context`] with [`ContextParametersExt`].

*/

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::{Context, DataPlugin};
use crate::error::SimError;
use crate::propensity::ModelKind;
use crate::run::RunConfig;

/// How replicates obtain their random draws.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// One generator consumed in a single global order. Reproducible byte for byte.
    #[default]
    Sequential,
    /// One derived generator per replicate; replicates run concurrently. Reproducible, but
    /// not comparable draw-for-draw with a sequential sweep.
    PerReplicate,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub model: ModelKind,
    /// Size of each arm of the trial.
    pub population: u32,
    pub beta: f64,
    pub replicates: u32,
    pub eps_start: f64,
    pub eps_delta: f64,
    pub var_delta: f64,
    pub tolerance: f64,
    pub seed: u64,
    pub stream_mode: StreamMode,
    /// Worker threads for `per_replicate` streams. Defaults to the available parallelism.
    pub threads: Option<usize>,
    pub output_dir: PathBuf,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            model: ModelKind::default(),
            population: 1000,
            beta: 0.5,
            replicates: 100,
            eps_start: 0.0,
            eps_delta: 0.05,
            var_delta: 0.01,
            tolerance: 1e-9,
            seed: 123,
            stream_mode: StreamMode::default(),
            threads: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Parameters {
    /// The reference settings of each model's trial: a fine efficacy grid for all-or-nothing,
    /// larger arms and a single efficacy of 0.7 for leaky, and the defaults for intermediate.
    /// The same settings ship as JSON files under `presets/`.
    #[must_use]
    pub fn preset(model: ModelKind) -> Parameters {
        let defaults = Parameters {
            model,
            ..Parameters::default()
        };
        match model {
            ModelKind::Aon => Parameters {
                eps_delta: 0.01,
                ..defaults
            },
            ModelKind::Leaky => Parameters {
                population: 10_000,
                replicates: 50,
                eps_start: 0.7,
                eps_delta: 0.9,
                ..defaults
            },
            ModelKind::Intermediate => defaults,
        }
    }

    /// Reads parameters from a JSON file, filling in defaults for missing fields.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Parameters, SimError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(json: &str) -> Result<Parameters, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.population == 0 {
            return Err("population must be positive".into());
        }
        if self.replicates == 0 {
            return Err("replicates must be positive".into());
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(format!("beta must be positive and finite, got {}", self.beta).into());
        }
        if !(self.eps_delta > 0.0 && self.var_delta > 0.0) {
            return Err(format!(
                "sweep increments must be positive, got eps_delta = {} and var_delta = {}",
                self.eps_delta, self.var_delta
            )
            .into());
        }
        if !(self.tolerance > 0.0) {
            return Err(format!("tolerance must be positive, got {}", self.tolerance).into());
        }
        if !(0.0..=1.0).contains(&self.eps_start) {
            return Err(format!("eps_start must lie in [0, 1], got {}", self.eps_start).into());
        }
        if self.threads == Some(0) {
            return Err("threads must be positive".into());
        }
        Ok(())
    }

    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            population: self.population,
            beta: self.beta,
            tolerance: self.tolerance,
        }
    }

    /// Where the event records of this sweep are written.
    #[must_use]
    pub fn events_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "events_{}_N{}_S{}.txt",
            self.model.name(),
            self.population,
            self.replicates
        ))
    }
}

struct ParametersPlugin {
    parameters: Option<Parameters>,
}

impl DataPlugin for ParametersPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| ParametersPlugin { parameters: None };
}

pub trait ContextParametersExt {
    /// Validates and stores the parameters of the sweep.
    fn set_params(&mut self, parameters: Parameters) -> Result<(), SimError>;

    /// The stored parameters, or the defaults if none were set.
    fn get_params(&mut self) -> &Parameters;
}

impl ContextParametersExt for Context {
    fn set_params(&mut self, parameters: Parameters) -> Result<(), SimError> {
        parameters.validate()?;
        self.get_data_container_mut::<ParametersPlugin>().parameters = Some(parameters);
        Ok(())
    }

    fn get_params(&mut self) -> &Parameters {
        self.get_data_container_mut::<ParametersPlugin>()
            .parameters
            .get_or_insert_with(Parameters::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let parameters = Parameters::from_json_str(r#"{ "model": "aon", "population": 10 }"#)
            .unwrap();
        assert_eq!(parameters.model, ModelKind::Aon);
        assert_eq!(parameters.population, 10);
        assert_eq!(parameters.beta, 0.5);
        assert_eq!(parameters.replicates, 100);
        assert_eq!(parameters.seed, 123);
        assert_eq!(parameters.stream_mode, StreamMode::Sequential);
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Parameters::from_json_str(r#"{ "populaton": 10 }"#);
        assert!(matches!(result, Err(SimError::JsonError(_))));
    }

    #[test]
    fn stream_mode_parses_snake_case() {
        let parameters =
            Parameters::from_json_str(r#"{ "stream_mode": "per_replicate", "threads": 3 }"#)
                .unwrap();
        assert_eq!(parameters.stream_mode, StreamMode::PerReplicate);
        assert_eq!(parameters.threads, Some(3));
    }

    #[test]
    fn reads_parameters_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model": "leaky", "eps_delta": 0.25, "seed": 9 }}"#).unwrap();
        let parameters = Parameters::from_json_file(file.path()).unwrap();
        assert_eq!(parameters.model, ModelKind::Leaky);
        assert_eq!(parameters.eps_delta, 0.25);
        assert_eq!(parameters.seed, 9);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Parameters::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(SimError::IoError(_))));
    }

    #[test]
    fn validation_rejects_degenerate_settings() {
        let invalid = [
            Parameters { population: 0, ..Parameters::default() },
            Parameters { replicates: 0, ..Parameters::default() },
            Parameters { beta: 0.0, ..Parameters::default() },
            Parameters { beta: f64::INFINITY, ..Parameters::default() },
            Parameters { eps_delta: 0.0, ..Parameters::default() },
            Parameters { var_delta: -0.01, ..Parameters::default() },
            Parameters { tolerance: 0.0, ..Parameters::default() },
            Parameters { eps_start: 1.5, ..Parameters::default() },
            Parameters { threads: Some(0), ..Parameters::default() },
        ];
        for parameters in invalid {
            assert!(
                matches!(parameters.validate(), Err(SimError::InvalidParameter(_))),
                "{parameters:?} should be rejected"
            );
        }
    }

    #[test]
    fn presets_differ_per_model() {
        let aon = Parameters::preset(ModelKind::Aon);
        assert_eq!(aon.model, ModelKind::Aon);
        assert_eq!(aon.eps_delta, 0.01);
        assert_eq!(aon.population, 1000);

        let leaky = Parameters::preset(ModelKind::Leaky);
        assert_eq!((leaky.population, leaky.replicates), (10_000, 50));
        assert_eq!((leaky.eps_start, leaky.eps_delta), (0.7, 0.9));

        let intermediate = Parameters::preset(ModelKind::Intermediate);
        assert_eq!(intermediate, Parameters::default());
        for model in [ModelKind::Aon, ModelKind::Leaky, ModelKind::Intermediate] {
            assert!(Parameters::preset(model).validate().is_ok());
        }
    }

    #[test]
    fn preset_files_match_presets() {
        let files = [
            (ModelKind::Aon, include_str!("../presets/aon.json")),
            (ModelKind::Leaky, include_str!("../presets/leaky.json")),
            (ModelKind::Intermediate, include_str!("../presets/intermediate.json")),
        ];
        for (model, json) in files {
            assert_eq!(Parameters::from_json_str(json).unwrap(), Parameters::preset(model));
        }
    }

    #[test]
    fn events_path_names_model_and_size() {
        let parameters = Parameters {
            model: ModelKind::Aon,
            population: 10,
            replicates: 3,
            output_dir: PathBuf::from("out"),
            ..Parameters::default()
        };
        assert_eq!(parameters.events_path(), PathBuf::from("out/events_AoN_N10_S3.txt"));
    }

    #[test]
    fn context_stores_validated_parameters() {
        let mut context = Context::new();
        assert_eq!(context.get_params(), &Parameters::default());

        let parameters = Parameters { population: 7, ..Parameters::default() };
        context.set_params(parameters.clone()).unwrap();
        assert_eq!(context.get_params(), &parameters);

        let rejected = Parameters { population: 0, ..Parameters::default() };
        assert!(context.set_params(rejected).is_err());
        assert_eq!(context.get_params().population, 7);
    }
}
