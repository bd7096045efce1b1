//! Decision-tree training and evaluation on labeled customers

use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality, TreeNode};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::data::{CustomerRecord, LabeledDataset, LabeledRecord};
use crate::error::SegmentError;

/// Numeric column that can be fed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Income,
    Investment,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Income => "income",
            Feature::Investment => "investment",
        }
    }

    pub fn value(&self, customer: &CustomerRecord) -> f64 {
        self.select(customer.income, customer.investment)
    }

    fn select(&self, income: f64, investment: f64) -> f64 {
        match self {
            Feature::Income => income,
            Feature::Investment => investment,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything usable as a target column
pub trait ClassLabel: Ord + Clone + fmt::Display + fmt::Debug {}

impl<T: Ord + Clone + fmt::Display + fmt::Debug> ClassLabel for T {}

/// Bijection between the observed labels and dense codes `0..k`.
///
/// Classes are kept sorted, so the code of a label is its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder<L> {
    classes: Vec<L>,
}

impl<L: ClassLabel> LabelEncoder<L> {
    pub fn fit<I: IntoIterator<Item = L>>(labels: I) -> Self {
        let classes: BTreeSet<L> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &L) -> crate::Result<usize> {
        self.classes
            .binary_search(label)
            .map_err(|_| SegmentError::UnknownLabel(label.to_string()))
    }

    pub fn decode(&self, code: usize) -> crate::Result<L> {
        self.classes
            .get(code)
            .cloned()
            .ok_or(SegmentError::UnknownCode(code))
    }
}

/// Feature matrix with its encoded targets
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub features: Array2<f64>,
    pub targets: Array1<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn distinct_classes(&self) -> usize {
        self.targets.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Output of [`prepare`]: both splits plus the encoder and feature layout
#[derive(Debug, Clone)]
pub struct Prepared<L> {
    pub train: Split,
    pub test: Split,
    pub encoder: LabelEncoder<L>,
    pub features: Vec<Feature>,
}

/// Encode targets and split the dataset into train and test sets.
///
/// The test split takes `ceil(n * test_ratio)` rows after a seeded shuffle,
/// the train split takes the rest. The encoder is fitted on the whole
/// dataset so both splits share one code space.
pub fn prepare<L, F>(
    dataset: &LabeledDataset,
    features: &[Feature],
    target: F,
    test_ratio: f64,
    seed: u64,
) -> crate::Result<Prepared<L>>
where
    L: ClassLabel,
    F: Fn(&LabeledRecord) -> L,
{
    if features.is_empty() {
        return Err(SegmentError::InvalidInput(
            "at least one feature column is required".to_string(),
        ));
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(SegmentError::InvalidInput(format!(
            "test ratio must lie in (0, 1), got {}",
            test_ratio
        )));
    }

    let n = dataset.len();
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(SegmentError::InvalidInput(format!(
            "{} records cannot be split with test ratio {}",
            n, test_ratio
        )));
    }

    let labels: Vec<L> = dataset.iter().map(&target).collect();
    let encoder = LabelEncoder::fit(labels.iter().cloned());
    let codes = labels
        .iter()
        .map(|label| encoder.encode(label))
        .collect::<crate::Result<Vec<usize>>>()?;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let (test_idx, train_idx) = order.split_at(n_test);

    let records = dataset.records();
    let build = |idx: &[usize]| -> crate::Result<Split> {
        let mut values = Vec::with_capacity(idx.len() * features.len());
        for &i in idx {
            let customer = &records[i].customer;
            values.extend(features.iter().map(|feature| feature.value(customer)));
        }
        Ok(Split {
            features: Array2::from_shape_vec((idx.len(), features.len()), values)?,
            targets: idx.iter().map(|&i| codes[i]).collect(),
        })
    };

    let prepared = Prepared {
        train: build(train_idx)?,
        test: build(test_idx)?,
        encoder,
        features: features.to_vec(),
    };
    log::debug!(
        "Prepared split: {} train / {} test rows, {} classes",
        prepared.train.len(),
        prepared.test.len(),
        prepared.encoder.len()
    );
    Ok(prepared)
}

/// Fitted decision tree together with its label encoder and feature layout
pub struct TrainedModel<L> {
    tree: DecisionTree<f64, usize>,
    encoder: LabelEncoder<L>,
    features: Vec<Feature>,
}

impl<L: ClassLabel> fmt::Debug for TrainedModel<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("classes", &self.encoder.classes())
            .field("features", &self.features)
            .field("depth", &self.depth())
            .field("leaves", &self.leaves())
            .finish()
    }
}

impl<L: ClassLabel> TrainedModel<L> {
    pub fn encoder(&self) -> &LabelEncoder<L> {
        &self.encoder
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn depth(&self) -> usize {
        self.tree.max_depth()
    }

    pub fn leaves(&self) -> usize {
        self.tree.num_leaves()
    }

    /// Impurity-based importance of each feature, in feature order
    pub fn feature_importance(&self) -> Vec<(Feature, f64)> {
        self.features
            .iter()
            .copied()
            .zip(self.tree.feature_importance())
            .collect()
    }

    pub fn predict_codes(&self, features: &Array2<f64>) -> Array1<usize> {
        self.tree.predict(features)
    }

    pub fn predict_row(&self, row: &[f64]) -> crate::Result<L> {
        if row.len() != self.features.len() {
            return Err(SegmentError::InvalidInput(format!(
                "expected {} feature values, got {}",
                self.features.len(),
                row.len()
            )));
        }
        let input = Array2::from_shape_vec((1, row.len()), row.to_vec())?;
        let code = self.predict_codes(&input)[0];
        self.encoder.decode(code)
    }

    /// Classify a single customer from raw income and investment values
    pub fn predict(&self, income: f64, investment: f64) -> crate::Result<L> {
        let row: Vec<f64> = self
            .features
            .iter()
            .map(|feature| feature.select(income, investment))
            .collect();
        self.predict_row(&row)
    }

    /// Text dump of the fitted tree, one branch per line
    pub fn export_rules(&self) -> String {
        let mut out = String::new();
        self.write_node(self.tree.root_node(), 0, &mut out);
        out
    }

    fn write_node(&self, node: &TreeNode<f64, usize>, depth: usize, out: &mut String) {
        let indent = "|   ".repeat(depth);
        if node.is_leaf() {
            let class = node
                .prediction()
                .and_then(|code| self.encoder.decode(code).ok())
                .map(|label| label.to_string())
                .unwrap_or_else(|| "?".to_string());
            out.push_str(&format!("{}|--- class: {}\n", indent, class));
            return;
        }

        let (feature_idx, threshold, _) = node.split();
        let name = self
            .features
            .get(feature_idx)
            .map(Feature::name)
            .unwrap_or("?");
        // linfa sends `x < threshold` left and everything else right
        for (child, op) in node.children().into_iter().zip(["<", ">="]) {
            out.push_str(&format!("{}|--- {} {} {:.2}\n", indent, name, op, threshold));
            if let Some(child) = child {
                self.write_node(child, depth + 1, out);
            }
        }
    }
}

/// Fit a Gini decision tree on the training split.
///
/// CART in linfa is deterministic, so the same split always yields the same
/// tree.
pub fn train<L: ClassLabel>(prepared: &Prepared<L>) -> crate::Result<TrainedModel<L>> {
    let found = prepared.train.distinct_classes();
    if found < 2 {
        return Err(SegmentError::InsufficientClassDiversity { found });
    }

    let dataset = Dataset::new(
        prepared.train.features.clone(),
        prepared.train.targets.clone(),
    );
    let tree = DecisionTree::<f64, usize>::params()
        .split_quality(SplitQuality::Gini)
        .fit(&dataset)
        .map_err(|e| SegmentError::Training(e.to_string()))?;

    let model = TrainedModel {
        tree,
        encoder: prepared.encoder.clone(),
        features: prepared.features.clone(),
    };
    log::info!(
        "Trained decision tree: depth {}, {} leaves",
        model.depth(),
        model.leaves()
    );
    Ok(model)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics<L> {
    pub label: L,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Held-out performance of a trained model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport<L> {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics<L>>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Rows are true classes, columns predicted classes, in encoder order
    pub confusion: Array2<usize>,
    pub rules: String,
    pub support: usize,
}

/// Evaluate a trained model on the test split
pub fn evaluate<L: ClassLabel>(
    model: &TrainedModel<L>,
    test: &Split,
) -> crate::Result<EvaluationReport<L>> {
    if test.is_empty() {
        return Err(SegmentError::InvalidInput(
            "cannot evaluate on an empty test split".to_string(),
        ));
    }

    let k = model.encoder.len();
    let predicted = model.predict_codes(&test.features);
    let mut confusion = Array2::<usize>::zeros((k, k));
    for (&actual, &guess) in test.targets.iter().zip(predicted.iter()) {
        if actual >= k {
            return Err(SegmentError::UnknownCode(actual));
        }
        if guess >= k {
            return Err(SegmentError::UnknownCode(guess));
        }
        confusion[[actual, guess]] += 1;
    }

    let total = test.len();
    let correct: usize = (0..k).map(|i| confusion[[i, i]]).sum();
    let accuracy = correct as f64 / total as f64;

    let classes = model
        .encoder
        .classes()
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let tp = confusion[[i, i]] as f64;
            let predicted_i: usize = confusion.column(i).sum();
            let support: usize = confusion.row(i).sum();
            let precision = ratio(tp, predicted_i as f64);
            let recall = ratio(tp, support as f64);
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            }
        })
        .collect::<Vec<_>>();

    let macro_avg = AverageMetrics {
        precision: mean(classes.iter().map(|c| c.precision)),
        recall: mean(classes.iter().map(|c| c.recall)),
        f1: mean(classes.iter().map(|c| c.f1)),
    };
    let weighted = |value: fn(&ClassMetrics<L>) -> f64| {
        classes
            .iter()
            .map(|c| value(c) * c.support as f64)
            .sum::<f64>()
            / total as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1: weighted(|c| c.f1),
    };

    log::debug!("Evaluated on {} rows: accuracy {:.4}", total, accuracy);
    Ok(EvaluationReport {
        accuracy,
        classes,
        macro_avg,
        weighted_avg,
        confusion,
        rules: model.export_rules(),
        support: total,
    })
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    ratio(sum, count as f64)
}

impl<L: ClassLabel> fmt::Display for EvaluationReport<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class.label.to_string(),
                class.precision,
                class.recall,
                class.f1,
                class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, self.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_customers, label_dataset, Region};
    use crate::rules::Tier;

    fn labeled(points: &[(f64, f64)]) -> LabeledDataset {
        let customers: Vec<CustomerRecord> = points
            .iter()
            .enumerate()
            .map(|(i, &(income, investment))| CustomerRecord {
                id: i as u64 + 1,
                income,
                investment,
                region: Region::SaoPaulo,
            })
            .collect();
        label_dataset(&customers)
    }

    fn tier_of(record: &LabeledRecord) -> Tier {
        record.tier
    }

    #[test]
    fn test_encoder_round_trip() {
        let encoder = LabelEncoder::fit(vec![Tier::TierIII, Tier::TierI, Tier::TierIV, Tier::TierI]);
        assert_eq!(encoder.classes(), &[Tier::TierI, Tier::TierIII, Tier::TierIV]);
        for tier in encoder.classes().to_vec() {
            let code = encoder.encode(&tier).unwrap();
            assert_eq!(encoder.decode(code).unwrap(), tier);
        }
        assert_eq!(encoder.encode(&Tier::TierIII).unwrap(), 1);
        assert!(matches!(
            encoder.encode(&Tier::TierII),
            Err(SegmentError::UnknownLabel(_))
        ));
        assert!(matches!(encoder.decode(3), Err(SegmentError::UnknownCode(3))));
    }

    #[test]
    fn test_prepare_split_sizes() {
        let dataset = label_dataset(&generate_customers(1000, 42).unwrap());
        let prepared = prepare(&dataset, &[Feature::Income, Feature::Investment], tier_of, 0.2, 42).unwrap();
        assert_eq!(prepared.train.len(), 800);
        assert_eq!(prepared.test.len(), 200);
        assert_eq!(prepared.train.features.shape(), &[800, 2]);
        assert_eq!(prepared.test.features.shape(), &[200, 2]);
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let dataset = label_dataset(&generate_customers(300, 42).unwrap());
        let features = [Feature::Income, Feature::Investment];
        let a = prepare(&dataset, &features, tier_of, 0.2, 42).unwrap();
        let b = prepare(&dataset, &features, tier_of, 0.2, 42).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_prepare_rejects_bad_parameters() {
        let dataset = labeled(&[(1000.0, 0.0), (5000.0, 0.0)]);
        assert!(prepare(&dataset, &[], tier_of, 0.2, 42).is_err());
        assert!(prepare(&dataset, &[Feature::Income], tier_of, 0.0, 42).is_err());
        assert!(prepare(&dataset, &[Feature::Income], tier_of, 1.5, 42).is_err());

        let single = labeled(&[(1000.0, 0.0)]);
        assert!(prepare(&single, &[Feature::Income], tier_of, 0.2, 42).is_err());
    }

    #[test]
    fn test_train_rejects_single_class() {
        let points: Vec<(f64, f64)> = (0..20).map(|i| (1000.0 + i as f64 * 10.0, 5000.0)).collect();
        let dataset = labeled(&points);
        let prepared = prepare(&dataset, &[Feature::Income, Feature::Investment], tier_of, 0.2, 42).unwrap();
        assert!(matches!(
            train(&prepared),
            Err(SegmentError::InsufficientClassDiversity { found: 1 })
        ));
    }

    #[test]
    fn test_train_and_evaluate_separable_data() {
        let mut points = Vec::new();
        for i in 0..40 {
            points.push((1000.0 + i as f64 * 20.0, 10_000.0));
            points.push((2500.0 + i as f64 * 20.0, 10_000.0));
        }
        let dataset = labeled(&points);
        let prepared = prepare(&dataset, &[Feature::Income, Feature::Investment], tier_of, 0.25, 7).unwrap();
        let model = train(&prepared).unwrap();

        assert_eq!(model.predict(1200.0, 10_000.0).unwrap(), Tier::TierI);
        assert_eq!(model.predict(3200.0, 10_000.0).unwrap(), Tier::TierII);
        assert!(model.depth() >= 1);

        let report = evaluate(&model, &prepared.test).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.confusion.shape(), &[2, 2]);
        assert_eq!(report.confusion.sum(), prepared.test.len());
        assert!(report.rules.contains("income"));
        assert!(report.rules.contains("class: Tier-I"));

        let importance = model.feature_importance();
        assert_eq!(importance.len(), 2);
        assert_eq!(importance[0].0, Feature::Income);
        assert!(importance[0].1 > importance[1].1);
    }

    #[test]
    fn test_predict_row_checks_width() {
        let mut points = Vec::new();
        for i in 0..20 {
            points.push((1000.0 + i as f64, 0.0));
            points.push((3000.0 + i as f64, 0.0));
        }
        let dataset = labeled(&points);
        let prepared = prepare(&dataset, &[Feature::Income], tier_of, 0.2, 1).unwrap();
        let model = train(&prepared).unwrap();
        assert!(model.predict_row(&[1.0, 2.0]).is_err());
        assert_eq!(model.predict_row(&[1500.0]).unwrap(), Tier::TierI);
    }

    #[test]
    fn test_report_renders_every_class() {
        let dataset = label_dataset(&generate_customers(400, 3).unwrap());
        let prepared = prepare(&dataset, &[Feature::Income, Feature::Investment], tier_of, 0.2, 3).unwrap();
        let model = train(&prepared).unwrap();
        let report = evaluate(&model, &prepared.test).unwrap();
        let text = report.to_string();
        for class in model.encoder().classes() {
            assert!(text.contains(class.name()));
        }
        assert!(text.contains("weighted avg"));
        assert!((0.0..=1.0).contains(&report.accuracy));
    }
}
