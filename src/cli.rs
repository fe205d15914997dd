//! Command Line Interface (CLI) arguments.

use crate::client::DEFAULT_BASE_URL;
use crate::registry::DatasetId;

use clap::{Parser, Subcommand};

/// Xtracto command line interface
#[derive(Clone, Debug, Parser)]
#[command(name = "xtracto", version, about)]
pub struct CommandLineArgs {
    /// The ERDDAP server to query
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "XTRACTO_BASE_URL", global = true)]
    pub base_url: String,
    /// Path to a JSON dataset registry, replacing the built in registry
    #[arg(long, env = "XTRACTO_REGISTRY", global = true)]
    pub registry: Option<String>,
    /// Maximum time in seconds to wait for each query
    #[arg(long, default_value_t = 120, env = "XTRACTO_TIMEOUT", global = true)]
    pub timeout: u64,
    /// Log every query
    #[arg(short, long, default_value_t = false, env = "XTRACTO_VERBOSE", global = true)]
    pub verbose: bool,
    /// Remember the rows of this many recent points rather than only the previous one
    #[arg(long, env = "XTRACTO_LRU_CAPACITY", global = true)]
    pub lru_capacity: Option<usize>,
    /// Continue past points whose data cannot be fetched or decoded
    #[arg(long, default_value_t = false, env = "XTRACTO_BEST_EFFORT", global = true)]
    pub best_effort: bool,
    /// Print Prometheus metrics to stderr on exit
    #[arg(long, default_value_t = false, env = "XTRACTO_PRINT_METRICS", global = true)]
    pub print_metrics: bool,
    #[command(subcommand)]
    pub command: Command,
}

/// Xtracto subcommands
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Summarise a dataset around every point of a CSV trajectory with lon, lat and date columns
    Track {
        /// Dataset name or 1-based registry index
        dataset: DatasetId,
        /// Trajectory CSV file, or - for stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// Result CSV file, stdout if not set
        #[arg(long)]
        output: Option<String>,
        /// Half width of each box in degrees of longitude
        #[arg(long, default_value_t = 0.0)]
        x_half_width: f64,
        /// Half width of each box in degrees of latitude
        #[arg(long, default_value_t = 0.0)]
        y_half_width: f64,
    },
    /// Extract every cell of a box as CSV
    Box {
        /// Dataset name or 1-based registry index
        dataset: DatasetId,
        /// Westernmost and easternmost longitude
        #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"])]
        longitude: Vec<f64>,
        /// Southernmost and northernmost latitude
        #[arg(long, num_args = 2, allow_negative_numbers = true, value_names = ["MIN", "MAX"])]
        latitude: Vec<f64>,
        /// First and last date, latest time step if not set
        #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"])]
        time: Option<Vec<String>>,
        /// Result CSV file, stdout if not set
        #[arg(long)]
        output: Option<String>,
    },
    /// List the registry datasets matching every keyword
    Search {
        /// Keywords matched against name, dataset ID, title and variable
        keywords: Vec<String>,
    },
    /// Describe a dataset
    Info {
        /// Dataset name or 1-based registry index
        dataset: DatasetId,
    },
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_track() {
        let args = CommandLineArgs::parse_from([
            "xtracto",
            "track",
            "erdBAssta5day",
            "--input",
            "track.csv",
            "--x-half-width",
            "0.1",
            "-v",
        ]);
        assert!(args.verbose);
        assert_eq!(DEFAULT_BASE_URL, args.base_url);
        match args.command {
            Command::Track {
                dataset,
                input,
                output,
                x_half_width,
                y_half_width,
            } => {
                assert_eq!(DatasetId::Name("erdBAssta5day".to_string()), dataset);
                assert_eq!("track.csv", input);
                assert_eq!(None, output);
                assert_eq!(0.1, x_half_width);
                assert_eq!(0.0, y_half_width);
            }
            command => panic!("unexpected command {:?}", command),
        }
    }

    #[test]
    fn parse_box() {
        let args = CommandLineArgs::parse_from([
            "xtracto",
            "box",
            "2",
            "--longitude",
            "-130",
            "-125",
            "--latitude",
            "40",
            "45",
        ]);
        match args.command {
            Command::Box {
                dataset,
                longitude,
                latitude,
                time,
                ..
            } => {
                assert_eq!(DatasetId::Index(2), dataset);
                assert_eq!(vec![-130.0, -125.0], longitude);
                assert_eq!(vec![40.0, 45.0], latitude);
                assert_eq!(None, time);
            }
            command => panic!("unexpected command {:?}", command),
        }
    }

    #[test]
    fn parse_dataset_index() {
        let args = CommandLineArgs::parse_from(["xtracto", "track", "150"]);
        match args.command {
            Command::Track { dataset, input, .. } => {
                assert_eq!(DatasetId::Index(150), dataset);
                assert_eq!("-", input);
            }
            command => panic!("unexpected command {:?}", command),
        }
        let args = CommandLineArgs::parse_from(["xtracto", "info", "3"]);
        match args.command {
            Command::Info { dataset } => assert_eq!(DatasetId::Index(3), dataset),
            command => panic!("unexpected command {:?}", command),
        }
    }

    #[test]
    fn parse_search() {
        let args = CommandLineArgs::parse_from(["xtracto", "search", "sst", "5day"]);
        match args.command {
            Command::Search { keywords } => assert_eq!(vec!["sst", "5day"], keywords),
            command => panic!("unexpected command {:?}", command),
        }
    }
}
