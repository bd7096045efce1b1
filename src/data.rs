//! Synthetic customer generation and rule-based dataset labeling

use polars::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SegmentError;
use crate::rules::{channel_for, classify_tier, Channel, Tier};

/// Closed interval monthly income is drawn from
pub const INCOME_RANGE: (f64, f64) = (1_000.0, 15_000.0);
/// Closed interval investment balance is drawn from
pub const INVESTMENT_RANGE: (f64, f64) = (0.0, 300_000.0);

/// Region a customer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "PR")]
    Parana,
    #[serde(rename = "SP")]
    SaoPaulo,
    #[serde(rename = "RJ")]
    RioDeJaneiro,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Parana, Region::SaoPaulo, Region::RioDeJaneiro];

    pub fn code(&self) -> &'static str {
        match self {
            Region::Parana => "PR",
            Region::SaoPaulo => "SP",
            Region::RioDeJaneiro => "RJ",
        }
    }

    /// Sampling weight used by the generator
    pub fn weight(&self) -> f64 {
        match self {
            Region::Parana => 0.35,
            Region::SaoPaulo => 0.40,
            Region::RioDeJaneiro => 0.25,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SegmentError::InvalidInput(format!("unknown region: {}", s)))
    }
}

/// A single synthetic customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: u64,
    /// Monthly income
    pub income: f64,
    /// Investment balance
    pub investment: f64,
    pub region: Region,
}

/// Generate `n` synthetic customers from a seed.
///
/// Identical `(n, seed)` pairs always produce identical records. Monetary
/// values are rounded to cents.
pub fn generate_customers(n: usize, seed: u64) -> crate::Result<Vec<CustomerRecord>> {
    if n == 0 {
        return Err(SegmentError::InvalidInput(
            "record count must be positive".to_string(),
        ));
    }

    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let region_dist = WeightedIndex::new(Region::ALL.map(|region| region.weight()))
        .map_err(|e| SegmentError::InvalidInput(format!("region weights: {}", e)))?;

    let customers: Vec<CustomerRecord> = (1..=n as u64)
        .map(|id| {
            let income = round_cents(rng.gen_range(INCOME_RANGE.0..=INCOME_RANGE.1));
            let investment = round_cents(rng.gen_range(INVESTMENT_RANGE.0..=INVESTMENT_RANGE.1));
            let region = Region::ALL[region_dist.sample(&mut rng)];
            CustomerRecord {
                id,
                income,
                investment,
                region,
            }
        })
        .collect();

    log::debug!("Generated {} customers with seed {}", customers.len(), seed);
    Ok(customers)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A customer together with its rule-engine tier and channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    #[serde(flatten)]
    pub customer: CustomerRecord,
    pub tier: Tier,
    pub channel: Channel,
}

impl LabeledRecord {
    pub fn from_customer(customer: CustomerRecord) -> Self {
        let tier = classify_tier(customer.income, customer.investment);
        Self {
            channel: channel_for(tier),
            tier,
            customer,
        }
    }
}

/// Optional filters applied to a labeled dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFilter {
    pub region: Option<Region>,
    /// Tiers to keep; `None` keeps all
    pub tiers: Option<Vec<Tier>>,
    /// Channels to keep; `None` keeps all
    pub channels: Option<Vec<Channel>>,
}

impl DatasetFilter {
    pub fn matches(&self, record: &LabeledRecord) -> bool {
        self.region.map_or(true, |r| record.customer.region == r)
            && self.tiers.as_ref().map_or(true, |t| t.contains(&record.tier))
            && self
                .channels
                .as_ref()
                .map_or(true, |c| c.contains(&record.channel))
    }
}

/// Headline figures for a labeled dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub customers: usize,
    pub branch: usize,
    pub digital: usize,
    pub mean_investment: f64,
}

/// Per-tier aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierMeans {
    pub tier: Tier,
    pub customers: u64,
    pub mean_income: f64,
    pub mean_investment: f64,
}

/// Customers augmented with their tier and channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabeledDataset {
    records: Vec<LabeledRecord>,
}

impl LabeledDataset {
    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledRecord> {
        self.records.iter()
    }

    pub fn filter(&self, filter: &DatasetFilter) -> LabeledDataset {
        LabeledDataset {
            records: self
                .records
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        let count_channel = |channel: Channel| {
            self.records
                .iter()
                .filter(|record| record.channel == channel)
                .count()
        };
        let mean_investment = if self.records.is_empty() {
            0.0
        } else {
            self.records
                .iter()
                .map(|record| record.customer.investment)
                .sum::<f64>()
                / self.records.len() as f64
        };

        DatasetSummary {
            customers: self.records.len(),
            branch: count_channel(Channel::Branch),
            digital: count_channel(Channel::Digital),
            mean_investment,
        }
    }

    /// Columnar view with `id, income, investment, region, tier, channel`
    pub fn to_dataframe(&self) -> crate::Result<DataFrame> {
        let ids: Vec<u64> = self.records.iter().map(|r| r.customer.id).collect();
        let incomes: Vec<f64> = self.records.iter().map(|r| r.customer.income).collect();
        let investments: Vec<f64> = self.records.iter().map(|r| r.customer.investment).collect();
        let regions: Vec<&str> = self.records.iter().map(|r| r.customer.region.code()).collect();
        let tiers: Vec<&str> = self.records.iter().map(|r| r.tier.name()).collect();
        let channels: Vec<&str> = self.records.iter().map(|r| r.channel.name()).collect();

        let df = DataFrame::new(vec![
            Series::new("id", ids),
            Series::new("income", incomes),
            Series::new("investment", investments),
            Series::new("region", regions),
            Series::new("tier", tiers),
            Series::new("channel", channels),
        ])?;
        Ok(df)
    }

    /// Mean income, mean investment and customer count per tier, in tier order
    pub fn tier_means(&self) -> crate::Result<Vec<TierMeans>> {
        let grouped = self
            .to_dataframe()?
            .lazy()
            .group_by([col("tier")])
            .agg([
                col("id").count().alias("customers"),
                col("income").mean().alias("mean_income"),
                col("investment").mean().alias("mean_investment"),
            ])
            .collect()?;

        let tiers = grouped.column("tier")?.str()?;
        let customers = grouped.column("customers")?.cast(&DataType::UInt64)?;
        let customers = customers.u64()?;
        let mean_income = grouped.column("mean_income")?.f64()?;
        let mean_investment = grouped.column("mean_investment")?.f64()?;

        let mut means = Vec::with_capacity(grouped.height());
        for i in 0..grouped.height() {
            let tier = tiers
                .get(i)
                .ok_or_else(|| SegmentError::InvalidInput("missing tier in group".to_string()))?
                .parse::<Tier>()?;
            means.push(TierMeans {
                tier,
                customers: customers.get(i).unwrap_or(0),
                mean_income: mean_income.get(i).unwrap_or(0.0),
                mean_investment: mean_investment.get(i).unwrap_or(0.0),
            });
        }
        means.sort_by_key(|m| m.tier);
        Ok(means)
    }
}

impl FromIterator<LabeledRecord> for LabeledDataset {
    fn from_iter<I: IntoIterator<Item = LabeledRecord>>(iter: I) -> Self {
        LabeledDataset {
            records: iter.into_iter().collect(),
        }
    }
}

/// Apply the rule engine to every customer
pub fn label_dataset(customers: &[CustomerRecord]) -> LabeledDataset {
    customers
        .iter()
        .cloned()
        .map(LabeledRecord::from_customer)
        .collect()
}
