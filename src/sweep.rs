/*!

The parameter sweep: every efficacy (and, for the intermediate model, every variance) on the
grid, each with `replicates` independent runs.

Grid values are computed as `start + k * delta` from an integer counter `k` rather than by
accumulating increments, and a value within the tolerance of the upper bound is snapped onto it,
so `eps = 1` and `var = eps (1 - eps)` are visited exactly whenever they lie on the grid.

In [`StreamMode::Sequential`] every draw of the sweep comes from the single [`GillespieRng`] in
the [`Context`], in sweep-point, replicate, step order. In [`StreamMode::PerReplicate`] each
replicate owns a generator derived from the seed and its position in the sweep, replicates are
spread over a rayon thread pool, and their records are passed on in replicate order.

*/

use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::context::Context;
use crate::define_rng;
use crate::error::SimError;
use crate::event::{EventRecord, EventSink};
use crate::parameters::{ContextParametersExt, Parameters, StreamMode};
use crate::propensity::{
    mixture_fit, AllOrNothing, Intermediate, Leaky, ModelKind, PropensityModel,
};
use crate::random::{replicate_rng, ContextRandomExt};
use crate::run::{RunConfig, RunLabel, RunState, RunSummary, SimulationRun};

define_rng!(GillespieRng);

/// An inclusive range `start..=end` walked in steps of `delta`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SweepAxis {
    pub start: f64,
    pub end: f64,
    pub delta: f64,
    pub tolerance: f64,
}

impl SweepAxis {
    #[must_use]
    pub fn new(start: f64, end: f64, delta: f64, tolerance: f64) -> Self {
        SweepAxis {
            start,
            end,
            delta,
            tolerance,
        }
    }

    /// The grid values paired with their counter.
    pub fn values(self) -> impl Iterator<Item = (u32, f64)> {
        let SweepAxis {
            start,
            end,
            delta,
            tolerance,
        } = self;
        (0_u32..)
            .map(move |k| (k, start + f64::from(k) * delta))
            .take_while(move |&(_, value)| value <= end + tolerance)
            .map(move |(k, value)| {
                if (value - end).abs() <= tolerance {
                    (k, end)
                } else {
                    (k, value)
                }
            })
    }
}

/// One combination of efficacy (and variance) for which a batch of replicates is run.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SweepPoint {
    pub eps_index: u32,
    pub var_index: Option<u32>,
    pub eps: f64,
    pub var: Option<f64>,
    /// `(p, mu)` of the intermediate model's efficacy mixture.
    pub mixture: Option<(f64, f64)>,
}

impl SweepPoint {
    #[must_use]
    pub fn new(eps_index: u32, eps: f64) -> Self {
        SweepPoint {
            eps_index,
            var_index: None,
            eps,
            var: None,
            mixture: None,
        }
    }

    #[must_use]
    pub fn with_variance(eps_index: u32, eps: f64, var_index: u32, var: f64) -> Self {
        SweepPoint {
            eps_index,
            var_index: Some(var_index),
            eps,
            var: Some(var),
            mixture: Some(mixture_fit(eps, var)),
        }
    }

    /// The intermediate model at this point, built from its stored mixture.
    #[must_use]
    pub fn intermediate(&self) -> Intermediate {
        let var = self.var.unwrap_or(0.0);
        let (p, mu) = self.mixture.unwrap_or_else(|| mixture_fit(self.eps, var));
        Intermediate {
            eps: self.eps,
            var,
            p,
            mu,
        }
    }

    #[must_use]
    pub fn run_label(&self, run: u32) -> RunLabel {
        RunLabel {
            eps: self.eps,
            var: self.var,
            run,
        }
    }

    /// Names a replicate for seeding its own generator.
    #[must_use]
    pub fn stream_label(&self, model: ModelKind, run: u32) -> String {
        match self.var_index {
            Some(var_index) => format!("{}/{}/{}/{}", model.name(), self.eps_index, var_index, run),
            None => format!("{}/{}/-/{}", model.name(), self.eps_index, run),
        }
    }
}

/// Every sweep point of the configured model, in visiting order.
#[must_use]
pub fn sweep_points(parameters: &Parameters) -> Vec<SweepPoint> {
    let tolerance = parameters.tolerance;
    let eps_axis = SweepAxis::new(parameters.eps_start, 1.0, parameters.eps_delta, tolerance);

    let mut points = Vec::new();
    for (eps_index, eps) in eps_axis.values() {
        if parameters.model.has_variance() {
            let var_axis = SweepAxis::new(0.0, eps * (1.0 - eps), parameters.var_delta, tolerance);
            points.extend(
                var_axis
                    .values()
                    .map(|(var_index, var)| SweepPoint::with_variance(eps_index, eps, var_index, var)),
            );
        } else {
            points.push(SweepPoint::new(eps_index, eps));
        }
    }
    points
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SweepSummary {
    pub points: usize,
    pub runs: u64,
    pub records: u64,
    pub infections: u64,
}

impl SweepSummary {
    fn add_run(&mut self, run: &RunSummary) {
        self.runs += 1;
        self.records += run.steps as u64;
        self.infections += run.infections;
    }
}

/// Runs the sweep described by the parameters stored in `context`, passing every record to `sink`.
pub fn run_sweep<S: EventSink + ?Sized>(
    context: &mut Context,
    sink: &mut S,
) -> Result<SweepSummary, SimError> {
    let parameters = context.get_params().clone();
    parameters.validate()?;
    context.init_random(parameters.seed);
    debug!("random streams seeded from {}", context.base_seed());

    let points = sweep_points(&parameters);
    info!(
        "sweeping {} model over {} points, {} replicates of N = {} each ({:?} streams)",
        parameters.model.name(),
        points.len(),
        parameters.replicates,
        parameters.population,
        parameters.stream_mode
    );

    let mut summary = SweepSummary::default();
    for point in &points {
        debug!("sweep point eps = {:.6}, var = {:?}", point.eps, point.var);
        match parameters.model {
            ModelKind::Aon => {
                let model = AllOrNothing::new(point.eps);
                run_point(context, &parameters, point, &model, sink, &mut summary)?;
            }
            ModelKind::Leaky => {
                let model = Leaky::new(point.eps);
                run_point(context, &parameters, point, &model, sink, &mut summary)?;
            }
            ModelKind::Intermediate => {
                let model = point.intermediate();
                run_point(context, &parameters, point, &model, sink, &mut summary)?;
            }
        }
        summary.points += 1;
    }

    info!(
        "sweep finished: {} runs, {} records, {} infections",
        summary.runs, summary.records, summary.infections
    );
    Ok(summary)
}

fn run_point<M, S>(
    context: &mut Context,
    parameters: &Parameters,
    point: &SweepPoint,
    model: &M,
    sink: &mut S,
    summary: &mut SweepSummary,
) -> Result<(), SimError>
where
    M: PropensityModel,
    S: EventSink + ?Sized,
{
    let config = parameters.run_config();
    match parameters.stream_mode {
        StreamMode::Sequential => {
            for run in 1..=parameters.replicates {
                let simulation = SimulationRun::new(model, config, point.run_label(run));
                let run_summary =
                    context.sample::<GillespieRng, _>(|rng| simulation.execute(rng, &mut *sink))?;
                summary.add_run(&run_summary);
            }
        }
        StreamMode::PerReplicate => {
            let base_seed = context.base_seed();
            for (buffer, run_summary) in
                run_replicates_concurrently(parameters, base_seed, point, model)?
            {
                buffer.replay(sink)?;
                summary.add_run(&run_summary);
            }
        }
    }
    Ok(())
}

/// Holds one replicate's output until it can be passed on in order.
struct ReplicateBuffer {
    records: Vec<EventRecord>,
    states: Vec<RunState>,
}

impl ReplicateBuffer {
    fn with_budget(step_budget: usize) -> Result<Self, SimError> {
        let mut records = Vec::new();
        records.try_reserve_exact(step_budget)?;
        let mut states = Vec::new();
        states.try_reserve_exact(step_budget + 1)?;
        Ok(ReplicateBuffer { records, states })
    }

    /// Feeds the buffered output to `sink` in the order a direct run would have.
    fn replay<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<(), SimError> {
        let mut states = self.states.iter();
        if let Some(initial) = states.next() {
            sink.observe(initial);
        }
        for (record, state) in self.records.iter().zip(states) {
            sink.record(record)?;
            sink.observe(state);
        }
        Ok(())
    }
}

impl EventSink for ReplicateBuffer {
    fn record(&mut self, record: &EventRecord) -> Result<(), SimError> {
        self.records.push(*record);
        Ok(())
    }

    fn observe(&mut self, state: &RunState) {
        self.states.push(*state);
    }
}

fn run_replicate<M: PropensityModel>(
    base_seed: u64,
    point: &SweepPoint,
    model: &M,
    config: RunConfig,
    run: u32,
) -> Result<(ReplicateBuffer, RunSummary), SimError> {
    let mut rng = replicate_rng(base_seed, &point.stream_label(model.kind(), run));
    let mut buffer = ReplicateBuffer::with_budget(model.step_budget(config.population))?;
    let summary =
        SimulationRun::new(model, config, point.run_label(run)).execute(&mut rng, &mut buffer)?;
    Ok((buffer, summary))
}

fn run_replicates_concurrently<M: PropensityModel>(
    parameters: &Parameters,
    base_seed: u64,
    point: &SweepPoint,
    model: &M,
) -> Result<Vec<(ReplicateBuffer, RunSummary)>, SimError> {
    let config = parameters.run_config();
    // Indexed collect keeps replicate order whatever the scheduling.
    let replicates = || {
        (0..parameters.replicates)
            .into_par_iter()
            .map(|index| run_replicate(base_seed, point, model, config, index + 1))
            .collect::<Result<Vec<_>, SimError>>()
    };
    match parameters.threads {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(replicates),
        None => replicates(),
    }
}
