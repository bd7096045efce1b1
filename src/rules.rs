//! Threshold rule engine mapping income and investment to a tier and channel

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SegmentError;

/// Upper bound (inclusive) of monthly income for Tier-I
pub const TIER_I_MAX_INCOME: f64 = 2_000.0;
/// Upper bound (inclusive) of monthly income for Tier-II
pub const TIER_II_MAX_INCOME: f64 = 4_000.0;
/// Upper bound (inclusive) of monthly income for the Tier-III income band
pub const TIER_III_MAX_INCOME: f64 = 10_000.0;
/// Investment balance that qualifies for Tier-III on its own
pub const TIER_III_MIN_INVESTMENT: f64 = 100_000.0;
/// Investment balance that qualifies for Tier-IV on its own
pub const TIER_IV_MIN_INVESTMENT: f64 = 250_000.0;

/// Customer segment derived from income and investment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Tier-I")]
    TierI,
    #[serde(rename = "Tier-II")]
    TierII,
    #[serde(rename = "Tier-III")]
    TierIII,
    #[serde(rename = "Tier-IV")]
    TierIV,
    Undefined,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::TierI,
        Tier::TierII,
        Tier::TierIII,
        Tier::TierIV,
        Tier::Undefined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::TierI => "Tier-I",
            Tier::TierII => "Tier-II",
            Tier::TierIII => "Tier-III",
            Tier::TierIV => "Tier-IV",
            Tier::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SegmentError::UnknownLabel(s.to_string()))
    }
}

/// Recommended service channel for a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    Digital,
    Branch,
    Undefined,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Digital, Channel::Branch, Channel::Undefined];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Digital => "Digital",
            Channel::Branch => "Branch",
            Channel::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SegmentError::UnknownLabel(s.to_string()))
    }
}

/// Classify a customer into a tier.
///
/// The checks overlap and are evaluated strictly in order, first match wins.
/// A mid-band income with a large investment balance therefore lands in
/// Tier-III, while Tier-IV is only reached once every Tier-III clause failed.
/// NaN inputs fail every comparison and fall through to `Undefined`.
pub fn classify_tier(income: f64, investment: f64) -> Tier {
    if income <= TIER_I_MAX_INCOME {
        Tier::TierI
    } else if TIER_I_MAX_INCOME < income && income <= TIER_II_MAX_INCOME {
        Tier::TierII
    } else if (TIER_II_MAX_INCOME < income && income <= TIER_III_MAX_INCOME)
        || investment >= TIER_III_MIN_INVESTMENT
    {
        Tier::TierIII
    } else if income > TIER_III_MAX_INCOME || investment >= TIER_IV_MIN_INVESTMENT {
        Tier::TierIV
    } else {
        Tier::Undefined
    }
}

/// Map a tier to its recommended service channel
pub fn channel_for(tier: Tier) -> Channel {
    match tier {
        Tier::TierI | Tier::TierII => Channel::Digital,
        Tier::TierIII | Tier::TierIV => Channel::Branch,
        Tier::Undefined => Channel::Undefined,
    }
}
