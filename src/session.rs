//! Per-session state: one synthetic dataset and a lazily trained classifier

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::{generate_customers, label_dataset, LabeledDataset, LabeledRecord};
use crate::model::{evaluate, prepare, train, EvaluationReport, TrainedModel};
use crate::rules::{channel_for, classify_tier, Channel, Tier};

/// Rule-engine outcome for an ad-hoc customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Simulation {
    pub income: f64,
    pub investment: f64,
    pub tier: Tier,
    pub channel: Channel,
}

struct Trained {
    model: TrainedModel<Tier>,
    report: EvaluationReport<Tier>,
}

/// Owns the dataset for one session and memoizes the model trained on it.
///
/// The model is trained on first access and kept until [`Session::reset`].
pub struct Session {
    config: PipelineConfig,
    dataset: LabeledDataset,
    trained: Option<Trained>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> crate::Result<Self> {
        config.validate()?;
        let dataset = label_dataset(&generate_customers(config.records, config.seed)?);
        log::info!(
            "Session started with {} customers (seed {})",
            dataset.len(),
            config.seed
        );
        Ok(Self {
            config,
            dataset,
            trained: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &LabeledDataset {
        &self.dataset
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Trained classifier, fitting it on first use
    pub fn classifier(&mut self) -> crate::Result<&TrainedModel<Tier>> {
        Ok(&self.trained()?.model)
    }

    /// Held-out evaluation of the cached classifier
    pub fn evaluation(&mut self) -> crate::Result<&EvaluationReport<Tier>> {
        Ok(&self.trained()?.report)
    }

    /// Pretty-printed JSON of the cached evaluation report
    pub fn evaluation_json(&mut self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self.evaluation()?)?)
    }

    /// Classify with the rule engine only; never touches the model
    pub fn simulate(&self, income: f64, investment: f64) -> Simulation {
        let tier = classify_tier(income, investment);
        Simulation {
            income,
            investment,
            tier,
            channel: channel_for(tier),
        }
    }

    /// Regenerate the dataset from a new seed and drop the cached model
    pub fn reset(&mut self, seed: u64) -> crate::Result<()> {
        self.dataset = label_dataset(&generate_customers(self.config.records, seed)?);
        self.config.seed = seed;
        self.trained = None;
        log::info!("Session reset with seed {}", seed);
        Ok(())
    }

    fn trained(&mut self) -> crate::Result<&Trained> {
        let trained = match self.trained.take() {
            Some(trained) => trained,
            None => Self::fit(&self.config, &self.dataset)?,
        };
        let trained: &Trained = self.trained.insert(trained);
        Ok(trained)
    }

    fn fit(config: &PipelineConfig, dataset: &LabeledDataset) -> crate::Result<Trained> {
        log::debug!("Training classifier for session");
        let prepared = prepare(
            dataset,
            &config.features,
            |record: &LabeledRecord| record.tier,
            config.test_ratio,
            config.split_seed,
        )?;
        let model = train(&prepared)?;
        let report = evaluate(&model, &prepared.test)?;
        Ok(Trained { model, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            records: 300,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_model_is_trained_once_and_cached() {
        let mut session = Session::new(small_config()).unwrap();
        assert!(!session.is_trained());

        let depth = session.classifier().unwrap().depth();
        assert!(session.is_trained());

        let first = session.evaluation().unwrap().clone();
        let second = session.evaluation().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(session.classifier().unwrap().depth(), depth);
    }

    #[test]
    fn test_reset_invalidates_model() {
        let mut session = Session::new(small_config()).unwrap();
        let before = session.dataset().clone();
        session.classifier().unwrap();

        session.reset(7).unwrap();
        assert!(!session.is_trained());
        assert_eq!(session.config().seed, 7);
        assert_ne!(session.dataset(), &before);
        assert_eq!(session.dataset().len(), 300);
    }

    #[test]
    fn test_simulate_uses_rules_without_training() {
        let session = Session::new(small_config()).unwrap();
        let sim = session.simulate(6000.0, 75_000.0);
        assert_eq!(sim.tier, Tier::TierIII);
        assert_eq!(sim.channel, Channel::Branch);
        assert!(!session.is_trained());
    }

    #[test]
    fn test_evaluation_json_is_a_single_document() {
        let mut session = Session::new(small_config()).unwrap();
        let json = session.evaluation_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["support"], 60);
        assert!(value["confusion"].is_object() || value["confusion"].is_array());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PipelineConfig {
            records: 0,
            ..PipelineConfig::default()
        };
        assert!(Session::new(config).is_err());
    }
}
