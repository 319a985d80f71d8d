//! Command-line interface for training and applying uplift forests.
//!
//! Examples:
//!   causalkit train --kind classifier --data train.csv --model m.ckit \
//!       --features age,visits --treatment treated --response converted --seed 1
//!   causalkit predict --model m.ckit --data test.csv --out uplift.csv
//!   causalkit importance --model m.ckit

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use causalkit::data::tabular::{read_csv, write_csv};
use causalkit::model::{CausalModel, ModelConfig, ModelKind, ParamValue, RandomForestUpliftModel};

/// Uplift random forests
#[derive(Parser)]
#[command(name = "causalkit", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on a CSV file and save it
    Train {
        /// classifier (binary response) or regressor (continuous response)
        #[arg(long)]
        kind: ModelKind,

        /// Training data (CSV with header)
        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        /// Output model file
        #[arg(long, value_name = "PATH")]
        model: PathBuf,

        /// JSON model config; flags below override its fields
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Feature columns, comma separated
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Categorical feature columns, comma separated
        #[arg(long, value_delimiter = ',')]
        categorical: Vec<String>,

        #[arg(long)]
        treatment: Option<String>,

        #[arg(long)]
        response: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        /// Hyperparameter as key=value, repeatable
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
    },

    /// Predict uplift for every row of a CSV file
    Predict {
        #[arg(long, value_name = "PATH")]
        model: PathBuf,

        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        /// Output CSV, one uplift column per treated arm
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Print split importance per feature
    Importance {
        #[arg(long, value_name = "PATH")]
        model: PathBuf,
    },
}

fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value = value
        .parse::<ParamValue>()
        .unwrap_or_else(|e: std::convert::Infallible| match e {});
    Ok((key.to_string(), value))
}

fn main() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        Commands::Train {
            kind,
            data,
            model,
            config,
            features,
            categorical,
            treatment,
            response,
            weight,
            seed,
            params,
        } => {
            let mut cfg = match config {
                Some(path) => serde_json::from_str::<ModelConfig>(&fs::read_to_string(path)?)?,
                None => ModelConfig::default(),
            };
            if !features.is_empty() {
                cfg.features = features;
            }
            if !categorical.is_empty() {
                cfg.categorical_features = categorical.into_iter().collect();
            }
            if let Some(t) = treatment {
                cfg.treatment_columns = vec![t];
            }
            if let Some(y) = response {
                cfg.response_column = y;
            }
            if let Some(w) = weight {
                cfg.weight_column = w;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            for (key, value) in params {
                cfg.set_param(key, value);
            }

            let table = read_csv(&data)?;
            let mut m = RandomForestUpliftModel::new(kind, cfg);
            m.fit(&table.columns, table.data.view())?;
            m.save(&model)?;
            eprintln!(
                "[causalkit] trained {kind} on {} rows, saved to {}",
                table.data.nrows(),
                model.display()
            );
        }
        Commands::Predict { model, data, out } => {
            let m = RandomForestUpliftModel::load(&model)?;
            let table = read_csv(&data)?;
            let uplift = m.predict(&table.columns, table.data.view())?;
            let header: Vec<String> = (1..=uplift.ncols()).map(|arm| format!("uplift_{arm}")).collect();
            write_csv(&out, &header, uplift.view())?;
        }
        Commands::Importance { model } => {
            let m = RandomForestUpliftModel::load(&model)?;
            for (name, value) in m.feature_importance()? {
                println!("{name}\t{value:.6}");
            }
        }
    }
    Ok(())
}
