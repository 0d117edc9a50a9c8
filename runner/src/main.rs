use std::{
    path::PathBuf,
    process::ExitCode,
    time::Duration,
    };
use anyhow::Context;
use clap::Parser;
use rawrepl::{Session, Config, RawPastePolicy};
use rawrepl_runner::suite;


/// run micropython programs on a device and report their outcome
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// serial port of the device
    #[arg(long, default_value = "/dev/ttyACM0")]
    device: PathBuf,
    #[arg(long, default_value_t = 115_200)]
    baud: u32,
    /// seconds allowed to each output stream of a program
    #[arg(long, default_value_t = 10)]
    timeout: u64,
    /// fail instead of using plain raw mode on devices without raw paste
    #[arg(long)]
    require_raw_paste: bool,
    /// run the remaining programs after a failure
    #[arg(long)]
    keep_going: bool,
    /// directory relative program paths are taken from
    #[arg(long, default_value = suite::PROGRAMS)]
    root: PathBuf,
    /// program files to run, in order
    #[arg(required = true)]
    programs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let programs = args.programs.iter()
        .map(|program| suite::load(&args.root, program))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = Config {
        baud_rate: args.baud,
        raw_paste: if args.require_raw_paste {RawPastePolicy::Require} else {RawPastePolicy::Prefer},
        .. Config::default()
    };
    let mut session = Session::open_with(&args.device, config)
        .with_context(|| format!("cannot open device {}", args.device.display()))?;
    let reports = suite::run(&mut session, &programs, Duration::from_secs(args.timeout), args.keep_going).await;
    session.close()?;

    suite::print(&reports, &mut std::io::stdout().lock())?;
    if reports.iter().all(|report| report.passed())
        {Ok(ExitCode::SUCCESS)}
    else
        {Ok(ExitCode::FAILURE)}
}
