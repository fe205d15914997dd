//! This file defines the xtracto binary entry point.

use xtracto::cli::{self, Command, CommandLineArgs};
use xtracto::client::{ClientConfig, Xtractor};
use xtracto::error::XtractoError;
use xtracto::metrics;
use xtracto::models::{self, BoxRequest, Trajectory};
use xtracto::registry::Registry;
use xtracto::tracing;

use expanduser::expanduser;
use std::fs::File;
use std::io::{self, Read, Write};
use std::process::ExitCode;

/// Load the registry named on the command line, or the built in one.
fn load_registry(args: &CommandLineArgs) -> Result<Registry, XtractoError> {
    match &args.registry {
        Some(path) => Registry::from_path(&expanduser(path)?),
        None => Registry::builtin(),
    }
}

/// Open the output file, or stdout.
fn open_output(output: &Option<String>) -> Result<Box<dyn Write>, XtractoError> {
    match output {
        Some(path) => Ok(Box::new(File::create(expanduser(path)?)?)),
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Read a trajectory CSV file, or stdin.
fn read_trajectory(
    input: &str,
    x_half_width: f64,
    y_half_width: f64,
) -> Result<Trajectory, XtractoError> {
    let reader: Box<dyn Read> = if input == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(expanduser(input)?)?)
    };
    let points = models::read_track(reader)?;
    Ok(Trajectory::new(
        points.iter().map(|point| point.longitude).collect(),
        points.iter().map(|point| point.latitude).collect(),
        points.iter().map(|point| point.date.clone()).collect(),
        vec![x_half_width],
        vec![y_half_width],
    ))
}

async fn run(args: &CommandLineArgs) -> Result<(), XtractoError> {
    let registry = load_registry(args)?;
    let xtractor = Xtractor::new(registry, ClientConfig::from_args(args)?)?;
    match &args.command {
        Command::Track {
            dataset,
            input,
            output,
            x_half_width,
            y_half_width,
        } => {
            let trajectory = read_trajectory(input, *x_half_width, *y_half_width)?;
            let table = xtractor.xtracto(&trajectory, dataset).await?;
            for failure in &table.failures {
                eprintln!("point {} failed: {}", failure.index, failure.message);
            }
            table.write_csv(open_output(output)?)
        }
        Command::Box {
            dataset,
            longitude,
            latitude,
            time,
            output,
        } => {
            let request = BoxRequest {
                longitude: (longitude[0], longitude[1]),
                latitude: (latitude[0], latitude[1]),
                time: time.as_ref().map(|time| (time[0].clone(), time[1].clone())),
            };
            let extract = xtractor.xtracto_3d(&request, dataset).await?;
            eprintln!("{}", extract);
            extract.write_csv(open_output(output)?)
        }
        Command::Search { keywords } => {
            let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
            for (index, descriptor) in xtractor.search(&keywords) {
                println!("{:>3}  {:<24} {}", index, descriptor.name, descriptor.title);
            }
            Ok(())
        }
        Command::Info { dataset } => {
            print!("{}", xtractor.info(dataset)?);
            Ok(())
        }
    }
}

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing(args.verbose);
    metrics::register_metrics();
    let result = run(&args).await;
    if args.print_metrics {
        eprint!("{}", metrics::gather());
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error.log();
            ExitCode::FAILURE
        }
    }
}
