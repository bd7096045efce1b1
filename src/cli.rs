//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::config::PipelineConfig;
use crate::data::{DatasetFilter, Region};
use crate::error::SegmentError;
use crate::model::Feature;
use crate::rules::{Channel, Tier};

/// Customer tier segmentation with a rule engine and a decision-tree classifier
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of synthetic customers to generate
    #[arg(short = 'n', long, default_value = "1000")]
    pub records: usize,

    /// Seed for the synthetic data generator
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Seed for the train/test split
    #[arg(long, default_value = "42")]
    pub split_seed: u64,

    /// Fraction of customers held out for evaluation
    #[arg(long, default_value = "0.2")]
    pub test_ratio: f64,

    /// Output path for the main scatter plot; other charts derive from it
    #[arg(short, long, default_value = "segment_plot.png")]
    pub output: String,

    /// Classify with the trained model: "income,investment"
    /// Example: --predict "3500,50000"
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Classify with the rule engine and plot the customer: "income,investment"
    #[arg(long, conflicts_with = "predict")]
    pub simulate: Option<String>,

    /// Restrict the analysis to one region (PR, SP, RJ)
    #[arg(short, long)]
    pub region: Option<String>,

    /// Comma-separated tiers to keep, e.g. "Tier-I,Tier-III"
    #[arg(long)]
    pub tiers: Option<String>,

    /// Comma-separated channels to keep, e.g. "Digital"
    #[arg(long)]
    pub channels: Option<String>,

    /// Print only the evaluation report, as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip writing PNG charts
    #[arg(long)]
    pub no_plots: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            records: self.records,
            seed: self.seed,
            split_seed: self.split_seed,
            test_ratio: self.test_ratio,
            features: vec![Feature::Income, Feature::Investment],
        }
    }

    /// Parse the `--predict` pair, if given
    pub fn parse_predict(&self) -> crate::Result<Option<(f64, f64)>> {
        self.predict.as_deref().map(parse_pair).transpose()
    }

    /// Parse the `--simulate` pair, if given
    pub fn parse_simulate(&self) -> crate::Result<Option<(f64, f64)>> {
        self.simulate.as_deref().map(parse_pair).transpose()
    }

    pub fn filter(&self) -> crate::Result<DatasetFilter> {
        Ok(DatasetFilter {
            region: self
                .region
                .as_deref()
                .map(str::parse::<Region>)
                .transpose()?,
            tiers: self.tiers.as_deref().map(parse_list::<Tier>).transpose()?,
            channels: self
                .channels
                .as_deref()
                .map(parse_list::<Channel>)
                .transpose()?,
        })
    }
}

/// Parse "income,investment" into two non-negative values
fn parse_pair(input: &str) -> crate::Result<(f64, f64)> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != 2 {
        return Err(SegmentError::InvalidInput(
            "values must be in format 'income,investment'".to_string(),
        ));
    }

    let parse = |name: &str, raw: &str| -> crate::Result<f64> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| SegmentError::InvalidInput(format!("Invalid {} value: {}", name, raw)))?;
        if !value.is_finite() || value < 0.0 {
            return Err(SegmentError::InvalidInput(format!(
                "{} must be a non-negative number, got {}",
                name, raw
            )));
        }
        Ok(value)
    };

    Ok((parse("income", parts[0])?, parse("investment", parts[1])?))
}

fn parse_list<T>(input: &str) -> crate::Result<Vec<T>>
where
    T: std::str::FromStr<Err = SegmentError>,
{
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse::<T>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            records: 1000,
            seed: 42,
            split_seed: 42,
            test_ratio: 0.2,
            output: "test.png".to_string(),
            predict: Some("3500,50000".to_string()),
            simulate: None,
            region: None,
            tiers: None,
            channels: None,
            json: false,
            no_plots: true,
            verbose: false,
        }
    }

    #[test]
    fn test_parse_pairs() {
        let mut args = args();
        assert_eq!(args.parse_predict().unwrap(), Some((3500.0, 50_000.0)));
        assert_eq!(args.parse_simulate().unwrap(), None);

        args.predict = Some("invalid".to_string());
        assert!(args.parse_predict().is_err());

        args.predict = Some("-5,100".to_string());
        assert!(args.parse_predict().is_err());

        args.simulate = Some(" 6000 , 75000 ".to_string());
        assert_eq!(args.parse_simulate().unwrap(), Some((6000.0, 75_000.0)));
    }

    #[test]
    fn test_filter_from_args() {
        let mut args = args();
        assert_eq!(args.filter().unwrap(), DatasetFilter::default());

        args.region = Some("rj".to_string());
        args.tiers = Some("Tier-I,Tier-IV".to_string());
        args.channels = Some("Branch".to_string());
        let filter = args.filter().unwrap();
        assert_eq!(filter.region, Some(Region::RioDeJaneiro));
        assert_eq!(filter.tiers, Some(vec![Tier::TierI, Tier::TierIV]));
        assert_eq!(filter.channels, Some(vec![Channel::Branch]));

        args.region = Some("XX".to_string());
        assert!(args.filter().is_err());
    }

    #[test]
    fn test_predict_and_simulate_conflict() {
        let result = Args::try_parse_from([
            "segmentforge",
            "--predict",
            "3500,50000",
            "--simulate",
            "6000,75000",
        ]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["segmentforge", "--simulate", "6000,75000"]).unwrap();
        assert_eq!(args.parse_simulate().unwrap(), Some((6000.0, 75_000.0)));
        assert_eq!(args.parse_predict().unwrap(), None);
    }

    #[test]
    fn test_pipeline_config_from_args() {
        let config = args().pipeline_config();
        assert_eq!(config, PipelineConfig::default());
    }
}
