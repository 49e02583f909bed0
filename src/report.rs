/*!

The event file: one space-delimited line per step of every replicate of every sweep point.

```text
eps var run step vaccinated efficacy time infected
0.500000 0.100000 1 1 1 0.700000 0.010483 1
```

The `var` column is present only for the intermediate model. Real-valued fields are written with
six decimals; `run` and `step` count from 1; `vaccinated` and `infected` are `0`/`1`.

Alongside the event file two further files, `simulations.txt` and `averages.txt`, are created and
left empty. They are reserved for aggregated output.

*/

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use log::debug;

use crate::error::SimError;
use crate::event::{EventRecord, EventSink};
use crate::parameters::Parameters;

pub const RESERVED_FILES: [&str; 2] = ["simulations.txt", "averages.txt"];

pub struct EventReport {
    writer: csv::Writer<File>,
    with_variance: bool,
    path: PathBuf,
    // Held open for the lifetime of the report; nothing is written to them.
    reserved: Vec<(PathBuf, File)>,
}

impl EventReport {
    /// Creates the output directory, the event file with its header row, and the reserved
    /// files. Any existing files of the same names are truncated.
    pub fn create(parameters: &Parameters) -> Result<EventReport, SimError> {
        fs::create_dir_all(&parameters.output_dir)?;
        let path = parameters.events_path();
        let writer = WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_path(&path)?;

        let mut reserved = Vec::with_capacity(RESERVED_FILES.len());
        for name in RESERVED_FILES {
            let reserved_path = parameters.output_dir.join(name);
            let file = File::create(&reserved_path)?;
            reserved.push((reserved_path, file));
        }

        let mut report = EventReport {
            writer,
            with_variance: parameters.model.has_variance(),
            path,
            reserved,
        };
        report.writer.write_record(Self::header(report.with_variance))?;
        debug!("writing event records to {}", report.path.display());
        Ok(report)
    }

    /// Column names, in order.
    #[must_use]
    pub fn header(with_variance: bool) -> Vec<&'static str> {
        let mut columns = vec!["eps"];
        if with_variance {
            columns.push("var");
        }
        columns.extend(["run", "step", "vaccinated", "efficacy", "time", "infected"]);
        columns
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reserved_paths(&self) -> impl Iterator<Item = &Path> {
        self.reserved.iter().map(|(path, _)| path.as_path())
    }

    /// Flushes every buffered record to disk.
    pub fn finish(mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }

    fn row(&self, record: &EventRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(8);
        row.push(format!("{:.6}", record.eps));
        if self.with_variance {
            row.push(format!("{:.6}", record.var.unwrap_or(0.0)));
        }
        row.push(record.run.to_string());
        row.push(record.step.to_string());
        row.push(u8::from(record.vaccinated).to_string());
        row.push(format!("{:.6}", record.efficacy));
        row.push(format!("{:.6}", record.time));
        row.push(u8::from(record.infected).to_string());
        row
    }
}

impl EventSink for EventReport {
    fn record(&mut self, record: &EventRecord) -> Result<(), SimError> {
        let row = self.row(record);
        self.writer.write_record(&row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propensity::ModelKind;

    fn parameters(model: ModelKind, output_dir: &Path) -> Parameters {
        Parameters {
            model,
            population: 4,
            replicates: 2,
            output_dir: output_dir.to_path_buf(),
            ..Parameters::default()
        }
    }

    fn record(var: Option<f64>) -> EventRecord {
        EventRecord {
            eps: 0.5,
            var,
            run: 2,
            step: 7,
            vaccinated: true,
            efficacy: 0.7,
            time: 1.234_567_8,
            infected: true,
        }
    }

    #[test]
    fn writes_header_and_rows_with_variance() {
        let dir = tempfile::tempdir().unwrap();
        let parameters = parameters(ModelKind::Intermediate, dir.path());
        let mut report = EventReport::create(&parameters).unwrap();
        let path = report.path().to_path_buf();
        report.record(&record(Some(0.1))).unwrap();
        report.finish().unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "eps var run step vaccinated efficacy time infected");
        assert_eq!(lines[1], "0.500000 0.100000 2 7 1 0.700000 1.234568 1");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn omits_variance_for_single_parameter_models() {
        let dir = tempfile::tempdir().unwrap();
        let parameters = parameters(ModelKind::Leaky, dir.path());
        let mut report = EventReport::create(&parameters).unwrap();
        let path = report.path().to_path_buf();
        let padding = EventRecord {
            vaccinated: true,
            efficacy: 1.0,
            infected: false,
            ..record(None)
        };
        report.record(&padding).unwrap();
        report.finish().unwrap();

        assert_eq!(path, dir.path().join("events_Leaky_N4_S2.txt"));
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "eps run step vaccinated efficacy time infected\n\
             0.500000 2 7 1 1.000000 1.234568 0\n"
        );
    }

    #[test]
    fn reserved_files_exist_and_stay_empty() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("out");
        let parameters = parameters(ModelKind::Aon, &output_dir);
        let report = EventReport::create(&parameters).unwrap();
        let reserved: Vec<PathBuf> = report.reserved_paths().map(Path::to_path_buf).collect();
        report.finish().unwrap();

        assert_eq!(reserved.len(), 2);
        for path in reserved {
            assert_eq!(fs::metadata(&path).unwrap().len(), 0, "{} is not empty", path.display());
        }
    }

    #[test]
    fn seeded_sweeps_write_identical_files() {
        use crate::context::Context;
        use crate::parameters::ContextParametersExt;
        use crate::sweep::run_sweep;

        let write = |dir: &Path| {
            let parameters = Parameters {
                eps_delta: 0.25,
                var_delta: 0.05,
                ..parameters(ModelKind::Intermediate, dir)
            };
            let mut context = Context::new();
            context.set_params(parameters.clone()).unwrap();
            let mut report = EventReport::create(&parameters).unwrap();
            let summary = run_sweep(&mut context, &mut report).unwrap();
            let path = report.path().to_path_buf();
            report.finish().unwrap();
            (summary, fs::read(path).unwrap())
        };

        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let (summary, first) = write(first_dir.path());
        let (_, second) = write(second_dir.path());
        assert_eq!(first, second);

        let lines = String::from_utf8(first).unwrap().lines().count() as u64;
        assert_eq!(lines, summary.records + 1);
    }

    #[test]
    fn unusable_output_directory_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot serve as the output directory.
        let parameters = parameters(ModelKind::Aon, file.path());
        assert!(matches!(
            EventReport::create(&parameters),
            Err(SimError::IoError(_))
        ));
    }
}
