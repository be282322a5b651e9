//! The end-to-end training pipeline.
//!
//! Each stage is a plain function that takes the previous stage's output:
//!
//! ```text
//! load_and_clean ─► Exploration::compute (reports only)
//!        │
//!        └──────► prepare ─► train_models ─► select_best ─► ModelArtifact::save
//! ```
//!
//! [`Pipeline`] wires them together for the CLI.

use crate::artifact::{ModelArtifact, ModelParams};
use crate::config::{BalanceStage, PipelineConfig};
use crate::dataset::{class_counts, load_csv};
use crate::error::PipelineError;
use crate::evaluation::{accuracy, ClassificationReport};
use crate::model::{
    Classifier, FittedClassifier, GaussianNb, ModelError, ModelKind, ParamMap, RandomForest, Svc,
};
use crate::preprocessing::{
    clean, CleanedDataset, CleaningReport, FittedSimpleImputer, FittedStandardScaler,
    FittedTransformer, ImputeStrategy, SimpleImputer, Smote, StandardScaler, StratifiedSplit,
    Transformer,
};
use crate::report::{split_statistics, Exploration, ReportWriter, SplitStatistics};
use crate::selection::{CandidateResult, GridSearch, SearchOutcome};
use crate::stats;
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;
use tracing::{info, info_span, warn};

/// Train and test partitions after imputation, balancing and scaling.
#[derive(Clone, Debug)]
pub struct Prepared {
    /// Features the partitions hold, in column order.
    pub feature_names: Vec<String>,
    /// Column of the cleaned dataset behind each kept feature. Only differs
    /// from `0..n` when a train-fitted imputer had to drop columns.
    pub kept_columns: Vec<usize>,
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<usize>,
    pub imputer: Option<FittedSimpleImputer>,
    pub scaler: FittedStandardScaler,
    pub n_synthetic: usize,
}

/// One row of the model comparison.
#[derive(Clone, Debug, Serialize)]
pub struct ModelResult {
    pub kind: ModelKind,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    /// `None` for naive Bayes, which is not tuned.
    pub best_params: Option<ParamMap>,
    pub cv_score: Option<f64>,
    pub report: ClassificationReport,
    /// Highest feature importances (random forest only).
    pub top_features: Vec<(String, f64)>,
    /// Every successful grid candidate, in grid order.
    pub candidates: Vec<CandidateResult>,
}

/// A model result together with the fitted parameters to persist.
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub result: ModelResult,
    pub params: ModelParams,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResultSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub n_synthetic: usize,
    /// Training partition class counts after balancing.
    pub train_class_counts: Vec<usize>,
    pub test_class_counts: Vec<usize>,
    pub models: Vec<ModelResult>,
    pub best: ModelKind,
}

impl ResultSummary {
    pub fn best_result(&self) -> Option<&ModelResult> {
        self.models.iter().find(|m| m.kind == self.best)
    }

    /// Test-partition classification report of every model, in training
    /// order, with the forest's top features.
    pub fn model_reports(&self) -> String {
        let mut out = String::new();
        for m in &self.models {
            let _ = writeln!(out, "\nclassification report ({}, test partition):", m.kind);
            let _ = writeln!(out, "{}", m.report);
            if !m.top_features.is_empty() {
                out.push_str("top features:\n");
                for (name, importance) in &m.top_features {
                    let _ = writeln!(out, "  {:<24} {:.4}", name, importance);
                }
            }
        }
        out
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} {:>10} {:>10} {:>10}  best params",
            "model", "train acc", "test acc", "cv score"
        )?;
        for m in &self.models {
            let cv = m.cv_score.map_or_else(|| "-".to_string(), |s| format!("{:.4}", s));
            let params = m
                .best_params
                .as_ref()
                .and_then(|p| serde_json::to_string(p).ok())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<14} {:>10.4} {:>10.4} {:>10}  {}",
                m.kind.to_string(),
                m.train_accuracy,
                m.test_accuracy,
                cv,
                params
            )?;
        }
        write!(f, "best model: {}", self.best)
    }
}

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub cleaning: CleaningReport,
    pub summary: ResultSummary,
    pub split_statistics: Vec<SplitStatistics>,
    pub artifact: ModelArtifact,
}

/// Read the input CSV and clean it.
pub fn load_and_clean(config: &PipelineConfig) -> Result<CleanedDataset, PipelineError> {
    let table = load_csv(&config.input)?;
    clean(table, &config.cleaning)
}

/// Split, impute (when deferred), balance and scale.
///
/// With [`BalanceStage::TrainPartition`] the test partition only ever holds
/// real rows. The scaler is always fitted on the training rows alone. A
/// deferred imputer drops (with a warning) any column with no observed value
/// in the training rows.
pub fn prepare(
    cleaned: &CleanedDataset,
    config: &PipelineConfig,
) -> Result<Prepared, PipelineError> {
    let dataset = &cleaned.dataset;
    let splitter = StratifiedSplit::new(config.test_size, config.seed);
    let smote = Smote::new(config.balance.k_neighbors, config.seed, config.balance.threshold);
    let balance_first = config.balance.enabled && config.balance.stage == BalanceStage::BeforeSplit;

    let (mut x_train, mut y_train, mut x_test, y_test, mut n_synthetic) = if balance_first {
        let resampled = smote.fit_resample(dataset.features(), dataset.labels())?;
        let split = splitter.split(&resampled.y)?;
        (
            resampled.x.select(Axis(0), &split.train),
            resampled.y.select(Axis(0), &split.train),
            resampled.x.select(Axis(0), &split.test),
            resampled.y.select(Axis(0), &split.test),
            resampled.n_synthetic,
        )
    } else {
        let split = splitter.split(dataset.labels())?;
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);
        let (x_train, y_train, _) = train.into_parts();
        let (x_test, y_test, _) = test.into_parts();
        (x_train, y_train, x_test, y_test, 0)
    };

    let mut feature_names = dataset.feature_names().to_vec();
    let mut kept_columns: Vec<usize> = (0..feature_names.len()).collect();
    let imputer = match &cleaned.imputer {
        Some(imputer) => Some(imputer.clone()),
        None => {
            let unobserved: Vec<usize> = x_train
                .axis_iter(Axis(1))
                .enumerate()
                .filter(|(_, column)| column.iter().all(|v| v.is_nan()))
                .map(|(j, _)| j)
                .collect();
            if !unobserved.is_empty() {
                for &j in &unobserved {
                    warn!(
                        column = %feature_names[j],
                        "no observed value in the training partition, dropping column"
                    );
                }
                kept_columns.retain(|j| !unobserved.contains(j));
                if kept_columns.is_empty() {
                    return Err(PipelineError::DataIntegrity(
                        "no feature has an observed value in the training partition".to_string(),
                    ));
                }
                x_train = x_train.select(Axis(1), &kept_columns);
                x_test = x_test.select(Axis(1), &kept_columns);
                feature_names = kept_columns.iter().map(|&j| feature_names[j].clone()).collect();
            }
            let fitted = SimpleImputer::new(ImputeStrategy::Median).fit(&x_train)?;
            x_train = fitted.transform(&x_train)?;
            x_test = fitted.transform(&x_test)?;
            info!("median imputer fitted on the training partition");
            Some(fitted)
        }
    };

    if config.balance.enabled && config.balance.stage == BalanceStage::TrainPartition {
        let resampled = smote.fit_resample(&x_train, &y_train)?;
        x_train = resampled.x;
        y_train = resampled.y;
        n_synthetic = resampled.n_synthetic;
    }

    let scaler = StandardScaler::new().fit(&x_train)?;
    let x_train = scaler.transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    info!(
        train = y_train.len(),
        test = y_test.len(),
        synthetic = n_synthetic,
        "partitions prepared"
    );

    Ok(Prepared {
        feature_names,
        kept_columns,
        x_train,
        y_train,
        x_test,
        y_test,
        imputer,
        scaler,
        n_synthetic,
    })
}

/// Grid-search the random forest and SVC, fit naive Bayes, and score all
/// three on both partitions.
pub fn train_models(
    prepared: &Prepared,
    config: &PipelineConfig,
) -> Result<Vec<TrainedModel>, PipelineError> {
    let search = GridSearch::new(config.cv_folds);
    let x_train = prepared.x_train.view();
    let mut trained = Vec::with_capacity(3);

    {
        let _span = info_span!("random_forest").entered();
        let candidates = config
            .forest_grid
            .candidates(&RandomForest::default().with_seed(config.seed));
        let outcome = search.fit(&candidates, x_train, &prepared.y_train)?;
        let top_features = stats::top_n(
            &prepared.feature_names,
            outcome.best_model.feature_importances(),
            config.top_n,
        );
        let params = ModelParams::RandomForest(outcome.best_model.extract_params());
        let result = searched_result(ModelKind::RandomForest, outcome, prepared, top_features)?;
        trained.push(TrainedModel { result, params });
    }

    {
        let _span = info_span!("svm").entered();
        let candidates = config.svm_grid.candidates(&Svc::default());
        let outcome = search.fit(&candidates, x_train, &prepared.y_train)?;
        let params = ModelParams::Svm(outcome.best_model.extract_params());
        let result = searched_result(ModelKind::Svm, outcome, prepared, Vec::new())?;
        trained.push(TrainedModel { result, params });
    }

    {
        let _span = info_span!("naive_bayes").entered();
        let model = GaussianNb::new().fit(x_train, prepared.y_train.view())?;
        let (train_accuracy, test_accuracy, report) = evaluate(&model, prepared)?;
        trained.push(TrainedModel {
            result: ModelResult {
                kind: ModelKind::NaiveBayes,
                train_accuracy,
                test_accuracy,
                best_params: None,
                cv_score: None,
                report,
                top_features: Vec::new(),
                candidates: Vec::new(),
            },
            params: ModelParams::NaiveBayes(model.extract_params()),
        });
    }

    for model in &trained {
        info!(
            model = %model.result.kind,
            train_accuracy = model.result.train_accuracy,
            test_accuracy = model.result.test_accuracy,
            "model evaluated"
        );
    }
    Ok(trained)
}

fn searched_result<F: FittedClassifier>(
    kind: ModelKind,
    outcome: SearchOutcome<F>,
    prepared: &Prepared,
    top_features: Vec<(String, f64)>,
) -> Result<ModelResult, ModelError> {
    let (train_accuracy, test_accuracy, report) = evaluate(&outcome.best_model, prepared)?;
    Ok(ModelResult {
        kind,
        train_accuracy,
        test_accuracy,
        best_params: Some(outcome.best_params),
        cv_score: Some(outcome.best_score),
        report,
        top_features,
        candidates: outcome.candidates,
    })
}

fn evaluate<F: FittedClassifier>(
    model: &F,
    prepared: &Prepared,
) -> Result<(f64, f64, ClassificationReport), ModelError> {
    let train_pred = model.predict(prepared.x_train.view())?;
    let test_pred = model.predict(prepared.x_test.view())?;
    Ok((
        accuracy(&prepared.y_train, &train_pred),
        accuracy(&prepared.y_test, &test_pred),
        ClassificationReport::new(&prepared.y_test, &test_pred),
    ))
}

/// Index of the best result: highest test accuracy, ties to the simpler family.
pub fn select_best(results: &[ModelResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.test_accuracy
                .total_cmp(&b.test_accuracy)
                .then_with(|| b.kind.complexity_rank().cmp(&a.kind.complexity_rank()))
        })
        .map(|(i, _)| i)
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn report_writer(&self) -> Option<ReportWriter> {
        self.config.report_dir.as_ref().and_then(ReportWriter::create)
    }

    /// Load, clean and write the exploration reports; no training.
    pub fn explore(&self) -> Result<(CleanedDataset, Exploration), PipelineError> {
        let cleaned = load_and_clean(&self.config)?;
        let exploration = Exploration::compute(
            &cleaned.dataset,
            self.config.histogram_bins,
            self.config.top_n,
        );
        if let Some(writer) = self.report_writer() {
            writer.write_exploration(&exploration, &cleaned.report);
        }
        Ok((cleaned, exploration))
    }

    pub fn run(&self) -> Result<RunOutcome, PipelineError> {
        let config = &self.config;
        let (cleaned, _) = self.explore()?;

        let prepared = prepare(&cleaned, config)?;
        let split_statistics = split_statistics(
            &prepared.feature_names,
            &cleaned.dataset.features().select(Axis(1), &prepared.kept_columns),
            &prepared.x_train,
            &prepared.x_test,
        );
        let trained = train_models(&prepared, config)?;

        let results: Vec<ModelResult> = trained.iter().map(|t| t.result.clone()).collect();
        let best_index = select_best(&results)
            .ok_or_else(|| PipelineError::DataIntegrity("no model was trained".to_string()))?;
        let best = trained
            .into_iter()
            .nth(best_index)
            .ok_or_else(|| PipelineError::DataIntegrity("no model was trained".to_string()))?;

        let summary = ResultSummary {
            n_train: prepared.y_train.len(),
            n_test: prepared.y_test.len(),
            n_features: prepared.feature_names.len(),
            n_synthetic: prepared.n_synthetic,
            train_class_counts: class_counts(&prepared.y_train),
            test_class_counts: class_counts(&prepared.y_test),
            models: results,
            best: best.result.kind,
        };
        info!(
            model = %summary.best,
            test_accuracy = best.result.test_accuracy,
            "best model selected"
        );

        let artifact = ModelArtifact::new(
            best.params,
            prepared.scaler.extract_params(),
            prepared.imputer.as_ref().map(|i| i.extract_params()),
            prepared.feature_names.clone(),
            cleaned.report.label_encoding,
            best.result.test_accuracy,
        );
        artifact.save(&config.model_path)?;

        if let Some(writer) = self.report_writer() {
            writer.write_split_statistics(&split_statistics);
            writer.write_json("model_comparison.json", &summary);
        }

        Ok(RunOutcome {
            cleaning: cleaned.report,
            summary,
            split_statistics,
            artifact,
        })
    }
}
