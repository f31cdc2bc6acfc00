//! Parsing command-line arguments.

use cellgen_lib::{rules::LifeLike, CellSystem, GeneratorConfig, Grid};
use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    ArgMatches, Command,
};
use log::{info, Level};
use rand::{rngs::StdRng, SeedableRng};
use serde::de::DeserializeOwned;
use std::{
    error::Error,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

fn parse_rule(s: &str) -> Result<String, String> {
    s.parse::<LifeLike>()
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

fn parse_density(s: &str) -> Result<f64, String> {
    let density = s.parse::<f64>().map_err(|e| e.to_string())?;
    if (0.0..=1.0).contains(&density) {
        Ok(density)
    } else {
        Err(String::from("density must be between 0 and 1"))
    }
}

/// Reads a file in JSON, YAML or TOML, depending on its extension.
fn load<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let value = match path.extension().and_then(OsStr::to_str) {
        Some("yaml" | "yml") => serde_yaml::from_str(&text)?,
        Some("toml") => toml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    Ok(value)
}

/// The command-line interface.
pub(crate) fn command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "Runs generalized cellular automata\n\
             \n\
             The cell system is either given by a Life-like or Generations rule string, \n\
             or read from a JSON, YAML or TOML file. The grid is filled with random cells.\n\
             \n\
             The grid is displayed in Plaintext format.\n\
             * Cells of type 0 are represented by `.`;\n\
             * Cells of type 1 are represented by `o`;\n\
             * Cells of higher types are represented by uppercase letters starting from `A`.\n",
        )
        .allow_negative_numbers(true)
        .arg(
            Arg::new("WIDTH")
                .help("Width of the grid")
                .required(true)
                .index(1)
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("HEIGHT")
                .help("Height of the grid")
                .required(true)
                .index(2)
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("RULE")
                .help("Rule of the cellular automaton")
                .long_help(
                    "Rule of the cellular automaton\n\
                     Supports Life-like and Generations rules.\n",
                )
                .short('r')
                .long("rule")
                .default_value("B3/S23")
                .value_parser(parse_rule),
        )
        .arg(
            Arg::new("SYSTEM")
                .help("Reads the cell system from a file")
                .long_help(
                    "Reads the cell system from a file\n\
                     The format is chosen by the extension: .json, .yaml or .toml.\n",
                )
                .short('s')
                .long("system")
                .conflicts_with("RULE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("DENSITY")
                .help("Probability that a random cell is not of cell type 0")
                .short('d')
                .long("density")
                .default_value("0.5")
                .value_parser(parse_density),
        )
        .arg(
            Arg::new("SEED")
                .help("Seed of the random grid")
                .long("seed")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("WRAP")
                .help("Makes the grid wrap around")
                .short('w')
                .long("wrap")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("GENERATIONS")
                .help("Number of generations to run")
                .short('g')
                .long("generations")
                .default_value("1")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("SPEED")
                .help("Minimal time between two generations, in milliseconds")
                .long_help(
                    "Minimal time between two generations, in milliseconds\n\
                     Only useful when --all is set.\n",
                )
                .short('p')
                .long("speed")
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("THREADS")
                .help("Number of worker threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("CONFIG")
                .help("Reads the generator configuration from a file")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ALL")
                .help("Prints every generation")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("VERBOSE")
                .help("Logs more; repeat for even more")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count),
        )
}

/// The log level chosen by `--verbose`.
pub(crate) fn log_level(matches: &ArgMatches) -> Level {
    match matches.get_count("VERBOSE") {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    }
}

/// A struct to store the parse results.
pub(crate) struct Args {
    pub(crate) system: CellSystem,
    pub(crate) grid: Grid,
    pub(crate) config: GeneratorConfig,
    pub(crate) generations: u64,
    pub(crate) all: bool,
}

impl Args {
    /// Builds everything the command-line arguments describe.
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        let width = *matches.get_one::<u64>("WIDTH").ok_or("missing width")? as usize;
        let height = *matches.get_one::<u64>("HEIGHT").ok_or("missing height")? as usize;

        let system = match matches.get_one::<PathBuf>("SYSTEM") {
            Some(path) => {
                info!("Reading the cell system from {}", path.display());
                load::<CellSystem>(path)?
            }
            None => {
                let rule = matches.get_one::<String>("RULE").ok_or("missing rule")?;
                rule.parse::<LifeLike>()?.cell_system()
            }
        };

        let mut config = match matches.get_one::<PathBuf>("CONFIG") {
            Some(path) => {
                info!("Reading the configuration from {}", path.display());
                load::<GeneratorConfig>(path)?
            }
            None => GeneratorConfig::default(),
        };
        if let Some(&threads) = matches.get_one::<u64>("THREADS") {
            config = config.set_threads(threads as usize);
        }
        if let Some(&speed) = matches.get_one::<i64>("SPEED") {
            config = config.set_speed(speed);
        }

        let density = matches.get_one::<f64>("DENSITY").copied().unwrap_or(0.5);
        let mut rng = match matches.get_one::<u64>("SEED") {
            Some(&seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = Grid::random(width, height, density, system.cell_type_count(), &mut rng)
            .set_wrap(matches.get_flag("WRAP"));

        Ok(Args {
            system,
            grid,
            config,
            generations: matches.get_one::<u64>("GENERATIONS").copied().unwrap_or(1),
            all: matches.get_flag("ALL"),
        })
    }
}
