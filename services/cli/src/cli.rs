use crate::commands::{run_confirm, run_evaluate, run_optimize, run_score};
use crate::infra::{parse_as_of, parse_level, parse_strategy};
use address_trust::calibration::{OptimizerSettings, Strategy};
use address_trust::error::AppError;
use address_trust::{Address, ValidationLevel};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "address-trust",
    about = "Score, confirm and calibrate address confidence from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one address and print the result as JSON
    Score(ScoreArgs),
    /// Score an address, then apply an administrator confirmation
    Confirm(ConfirmArgs),
    /// Evaluate the engine against the ground-truth table (default command)
    Evaluate(EvaluateArgs),
    /// Search for weights that better fit the ground-truth table
    Optimize(OptimizeArgs),
}

/// Address fields. Missing fields are scored as empty.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct AddressArgs {
    #[arg(long = "house-number", alias = "house-no", default_value = "")]
    pub(crate) house_number: String,
    #[arg(long, default_value = "")]
    pub(crate) street: String,
    #[arg(long, default_value = "")]
    pub(crate) locality: String,
    #[arg(long, default_value = "")]
    pub(crate) city: String,
    #[arg(long, default_value = "")]
    pub(crate) district: String,
    #[arg(long, default_value = "")]
    pub(crate) state: String,
    #[arg(long = "postal-code", alias = "pin", default_value = "")]
    pub(crate) postal_code: String,
    #[arg(long = "cell-id", alias = "digipin", default_value = "")]
    pub(crate) cell_id: String,
}

impl From<AddressArgs> for Address {
    fn from(args: AddressArgs) -> Self {
        Address {
            house_number: args.house_number,
            street: args.street,
            locality: args.locality,
            city: args.city,
            district: args.district,
            state: args.state,
            postal_code: args.postal_code,
            cell_id: args.cell_id,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[command(flatten)]
    pub(crate) address: AddressArgs,
    /// Evaluate recency as of this instant (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub(crate) struct ConfirmArgs {
    #[command(flatten)]
    pub(crate) address: AddressArgs,
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<NaiveDateTime>,
    /// Assign this level regardless of the recomputed score
    #[arg(long, value_parser = parse_level)]
    pub(crate) mark_vl: Option<ValidationLevel>,
    /// Record the level without a physical confirmation
    #[arg(long)]
    pub(crate) unconfirmed: bool,
    /// Free-form note kept with the confirmation
    #[arg(long)]
    pub(crate) notes: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Evaluate only the first N ground-truth records
    #[arg(long)]
    pub(crate) sample: Option<usize>,
    /// Ground-truth CSV; defaults to the table in the data directory
    #[arg(long)]
    pub(crate) ground_truth: Option<PathBuf>,
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<NaiveDateTime>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct OptimizeArgs {
    #[arg(long, value_parser = parse_strategy, default_value = "grid")]
    pub(crate) strategy: Strategy,
    #[arg(long, default_value_t = OptimizerSettings::default().sample_size)]
    pub(crate) sample: usize,
    #[arg(long, default_value_t = OptimizerSettings::default().max_iterations)]
    pub(crate) max_iterations: usize,
    /// Write the optimized weights to this file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    #[arg(long)]
    pub(crate) ground_truth: Option<PathBuf>,
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<NaiveDateTime>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Evaluate(EvaluateArgs::default()));

    match command {
        Command::Score(args) => run_score(args),
        Command::Confirm(args) => run_confirm(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Optimize(args) => run_optimize(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_accepts_address_aliases() {
        let cli = Cli::try_parse_from([
            "address-trust",
            "score",
            "--house-no",
            "12",
            "--city",
            "Thrissur",
            "--pin",
            "680001",
            "--digipin",
            "TS-6800-01-XX",
            "--as-of",
            "2025-06-01",
        ])
        .expect("score args parse");

        let Some(Command::Score(args)) = cli.command else {
            panic!("expected score command");
        };
        let address = Address::from(args.address);
        assert_eq!(address.house_number, "12");
        assert_eq!(address.postal_code, "680001");
        assert_eq!(address.cell_id, "TS-6800-01-XX");
        assert!(address.street.is_empty());
        assert!(args.as_of.is_some());
    }

    #[test]
    fn optimize_defaults_match_optimizer_settings() {
        let cli = Cli::try_parse_from(["address-trust", "optimize"]).expect("optimize parses");
        let Some(Command::Optimize(args)) = cli.command else {
            panic!("expected optimize command");
        };
        let defaults = OptimizerSettings::default();
        assert_eq!(args.strategy, Strategy::Grid);
        assert_eq!(args.sample, defaults.sample_size);
        assert_eq!(args.max_iterations, defaults.max_iterations);
        assert!(args.output.is_none());
    }

    #[test]
    fn bad_level_and_strategy_are_rejected() {
        assert!(Cli::try_parse_from(["address-trust", "confirm", "--mark-vl", "VL9"]).is_err());
        assert!(Cli::try_parse_from(["address-trust", "optimize", "--strategy", "anneal"]).is_err());
        assert!(Cli::try_parse_from(["address-trust", "confirm", "--mark-vl", "vl3"]).is_ok());
    }

    #[test]
    fn no_subcommand_falls_back_to_evaluate() {
        let cli = Cli::try_parse_from(["address-trust"]).expect("bare invocation parses");
        assert!(cli.command.is_none());
    }
}
