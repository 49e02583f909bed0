/*!

Command-line entry point.

```text
vaxsim [OPTIONS] <MODEL> [PARAMS]
```

Without a parameters file a sweep runs the model's [`preset`](Parameters::preset). A file
replaces the preset, with missing fields taking the defaults. The model named on the command
line always wins over the file, and `--output-dir` and `--seed` override both.

*/

use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};

use crate::context::Context;
use crate::error::SimError;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::propensity::ModelKind;
use crate::report::EventReport;
use crate::sweep::{run_sweep, SweepSummary};

/// Gillespie simulations of infection under vaccine efficacy models
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "vaxsim", version, about, long_about = None)]
pub struct BaseArgs {
    /// Vaccine efficacy model to sweep
    #[arg(value_enum, ignore_case = true)]
    pub model: ModelKind,

    /// JSON file of sweep parameters
    pub params: Option<PathBuf>,

    /// Directory for the event file and the reserved output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Base seed for the random number generators
    #[arg(long)]
    pub seed: Option<u64>,

    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl BaseArgs {
    /// Resolves the parameters of the sweep these arguments describe.
    pub fn parameters(&self) -> Result<Parameters, SimError> {
        let mut parameters = match &self.params {
            Some(path) => Parameters::from_json_file(path)?,
            None => Parameters::preset(self.model),
        };
        parameters.model = self.model;
        if let Some(output_dir) = &self.output_dir {
            parameters.output_dir.clone_from(output_dir);
        }
        if let Some(seed) = self.seed {
            parameters.seed = seed;
        }
        Ok(parameters)
    }
}

/// Runs the sweep described by `args` into its event file.
pub fn run_with_args(args: &BaseArgs) -> Result<SweepSummary, SimError> {
    let mut context = Context::new();
    context.set_params(args.parameters()?)?;
    let parameters = context.get_params().clone();
    info!("{parameters:?}");

    let mut report = EventReport::create(&parameters)?;
    let summary = run_sweep(&mut context, &mut report)?;
    let path = report.path().to_path_buf();
    report.finish()?;

    info!(
        "wrote {} records from {} runs over {} sweep points to {}",
        summary.records,
        summary.runs,
        summary.points,
        path.display()
    );
    Ok(summary)
}
