use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
    };
use anyhow::Context;
use log::*;
use rawrepl::{Session, Transport, Error};


/// directory of the programs shipped with the runner
pub const PROGRAMS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/programs");

/// program text to run on a device
#[derive(Clone, Debug)]
pub struct Program {
    /// name used in reports
    pub name: String,
    pub text: String,
}

/// outcome of one program
#[derive(Debug)]
pub enum Verdict {
    Passed {stdout: Vec<u8>},
    Failed(Error),
    /// not run since a previous program failed
    Skipped,
}

#[derive(Debug)]
pub struct Report {
    pub name: String,
    pub verdict: Verdict,
}
impl Report {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed {..})
    }
}

/// an existing path is taken as is, anything else is relative to `root`
pub fn resolve(root: &Path, program: &Path) -> PathBuf {
    if program.exists() || program.is_absolute()
        {program.to_path_buf()}
    else
        {root.join(program)}
}

pub fn load(root: &Path, program: &Path) -> anyhow::Result<Program> {
    let path = resolve(root, program);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read program {}", path.display()))?;
    Ok(Program {
        name: program.display().to_string(),
        text,
    })
}

/**
    run the given programs one after the other

    the device state is unknown after a failure, so unless `keep_going` is set, the programs after it are skipped
*/
pub async fn run<T: Transport>(
    session: &mut Session<T>,
    programs: &[Program],
    timeout: Duration,
    keep_going: bool,
    ) -> Vec<Report>
{
    let mut reports = Vec::with_capacity(programs.len());
    let mut failed = false;
    for program in programs {
        let verdict = if failed && ! keep_going {
            Verdict::Skipped
        }
        else {
            info!("running {}", program.name);
            match session.execute(&program.text, timeout).await {
                Ok(stdout) => Verdict::Passed {stdout},
                Err(error) => {
                    warn!("{} failed: {}", program.name, error);
                    failed = true;
                    Verdict::Failed(error)
                },
            }
        };
        reports.push(Report {name: program.name.clone(), verdict});
    }
    reports
}

/// print each program output and outcome, then a summary
pub fn print(reports: &[Report], out: &mut impl Write) -> io::Result<()> {
    let (mut passed, mut failed, mut skipped) = (0, 0, 0);
    for report in reports {
        writeln!(out, "=== {}", report.name)?;
        match &report.verdict {
            Verdict::Passed {stdout} => {
                passed += 1;
                write!(out, "{}", String::from_utf8_lossy(stdout))?;
                writeln!(out, "--- passed")?;
            },
            Verdict::Failed(error) => {
                failed += 1;
                if let Some(stdout) = error.stdout() {
                    write!(out, "{}", String::from_utf8_lossy(stdout))?;
                }
                match error {
                    // the traceback is in the error message already
                    Error::Execution {..} => {},
                    _ => if let Some(stderr) = error.stderr() {
                        write!(out, "{}", String::from_utf8_lossy(stderr))?;
                    },
                }
                writeln!(out, "--- failed: {}", error)?;
            },
            Verdict::Skipped => {
                skipped += 1;
                writeln!(out, "--- skipped")?;
            },
        }
    }
    writeln!(out, "{} passed, {} failed, {} skipped", passed, failed, skipped)
}
