//! Exploration results and report files.
//!
//! [`Exploration::compute`] gathers every read-only statistic of the cleaned
//! dataset and [`split_statistics`] compares the partitions after scaling.
//! [`ReportWriter`] writes them (and the model comparison) as CSV/JSON under a
//! report directory. Report output is best effort: a file that cannot
//! be written is logged at `warn` and the pipeline carries on.

use crate::dataset::InMemoryDataset;
use crate::preprocessing::{
    CleaningReport, ImputeStrategy, LabelEncoding, SimpleImputer, StandardScaler, Transformer,
};
use crate::stats::{self, ColumnSummary, Histogram, Pca};
use ndarray::{s, Array1, Array2, Axis};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Leading columns shown in the pairwise scatter.
pub const PAIR_FEATURES: usize = 5;

/// Two-component projection of the standardized features.
#[derive(Clone, Debug)]
pub struct PcaProjection {
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    /// `n_samples × n_components`.
    pub projection: Array2<f64>,
}

#[derive(Clone, Debug)]
pub struct Exploration {
    pub feature_names: Vec<String>,
    pub summary: Vec<ColumnSummary>,
    pub skewness: Vec<f64>,
    pub kurtosis: Vec<f64>,
    pub top_skewed: Vec<(String, f64)>,
    pub correlation: Array2<f64>,
    pub target_correlations: Vec<(String, f64)>,
    pub histograms: Vec<Histogram>,
    pub labels: Array1<usize>,
    pub class_counts: Vec<usize>,
    /// The first [`PAIR_FEATURES`] feature names, and their raw values
    /// (`n_samples × pair_features.len()`) for the pairwise scatter.
    pub pair_features: Vec<String>,
    pub pair_scatter: Array2<f64>,
    /// `None` when the projection could not be computed (logged).
    pub pca: Option<PcaProjection>,
}

impl Exploration {
    pub fn compute(dataset: &InMemoryDataset, histogram_bins: usize, top_n: usize) -> Self {
        let x = dataset.features();
        let names = dataset.feature_names().to_vec();

        let skewness = stats::skewness(x);
        let kurtosis = stats::kurtosis(x);
        let top_skewed = stats::top_n(&names, &skewness, top_n);
        let correlation = stats::correlation_matrix(x);
        let target_correlations =
            stats::target_correlations(x, dataset.labels(), &names, top_n);
        let histograms = x
            .axis_iter(Axis(1))
            .map(|column| stats::histogram(column, histogram_bins))
            .collect();
        let pca = match project(x) {
            Ok(pca) => Some(pca),
            Err(err) => {
                warn!(error = %err, "skipping PCA projection");
                None
            }
        };

        info!(
            features = names.len(),
            top_skewed = ?top_skewed.first(),
            top_target_correlation = ?target_correlations.first(),
            "exploration computed"
        );

        let n_pair = names.len().min(PAIR_FEATURES);
        let pair_features = names[..n_pair].to_vec();
        let pair_scatter = x.slice(s![.., ..n_pair]).to_owned();

        Self {
            summary: stats::describe(x, &names),
            feature_names: names,
            skewness,
            kurtosis,
            top_skewed,
            correlation,
            target_correlations,
            histograms,
            labels: dataset.labels().clone(),
            class_counts: dataset.class_counts(),
            pair_features,
            pair_scatter,
            pca,
        }
    }
}

/// Mean-impute, standardize, then project onto (up to) two components.
fn project(x: &Array2<f64>) -> Result<PcaProjection, crate::preprocessing::PreprocessingError> {
    let imputed = SimpleImputer::new(ImputeStrategy::Mean).fit_transform(x)?;
    let standardized = StandardScaler::new().fit_transform(&imputed)?;
    let pca = Pca::fit(&standardized, standardized.ncols().min(2))?;
    let projection = pca.transform(&standardized)?;
    Ok(PcaProjection {
        explained_variance: pca.explained_variance().to_vec(),
        explained_variance_ratio: pca.explained_variance_ratio().to_vec(),
        projection,
    })
}

/// Mean and sample standard deviation of one feature before the split and
/// in each scaled partition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SplitStatistics {
    pub feature: String,
    pub original_mean: f64,
    pub original_std: f64,
    pub train_mean: f64,
    pub train_std: f64,
    pub test_mean: f64,
    pub test_std: f64,
}

/// Per-feature statistics of the unscaled data next to the scaled train and
/// test partitions. Train means land at 0; the test partition shows how far
/// it sits from the training distribution.
pub fn split_statistics(
    names: &[String],
    original: &Array2<f64>,
    train: &Array2<f64>,
    test: &Array2<f64>,
) -> Vec<SplitStatistics> {
    let original = stats::describe(original, names);
    let train = stats::describe(train, names);
    let test = stats::describe(test, names);
    original
        .into_iter()
        .zip(train)
        .zip(test)
        .map(|((o, tr), te)| SplitStatistics {
            feature: o.name,
            original_mean: o.mean,
            original_std: o.std,
            train_mean: tr.mean,
            train_std: tr.std,
            test_mean: te.mean,
            test_std: te.std,
        })
        .collect()
}

#[derive(Serialize)]
struct MomentRow<'a> {
    feature: &'a str,
    skewness: f64,
    kurtosis: f64,
}

#[derive(Serialize)]
struct HistogramRow<'a> {
    feature: &'a str,
    bin: usize,
    lower: f64,
    upper: f64,
    count: usize,
}

#[derive(Serialize)]
struct ClassCountRow {
    class: usize,
    label: i64,
    count: usize,
}

#[derive(Serialize)]
struct RankedRow<'a> {
    feature: &'a str,
    value: f64,
}

/// Writes report files into one directory.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Create the directory if needed; `None` (with a warning) if that fails.
    pub fn create<P: AsRef<Path>>(dir: P) -> Option<Self> {
        let dir = dir.as_ref();
        match std::fs::create_dir_all(dir) {
            Ok(()) => Some(Self {
                dir: dir.to_path_buf(),
            }),
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "cannot create report directory, reports disabled"
                );
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every exploration file. Returns how many were written.
    pub fn write_exploration(&self, exploration: &Exploration, cleaning: &CleaningReport) -> usize {
        let names = &exploration.feature_names;
        let mut written = 0;

        written += self.write_csv("missing_values.csv", |w| {
            for row in &cleaning.missing {
                w.serialize(row)?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("describe.csv", |w| {
            for row in &exploration.summary {
                w.serialize(row)?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("moments.csv", |w| {
            for ((feature, &skewness), &kurtosis) in
                names.iter().zip(&exploration.skewness).zip(&exploration.kurtosis)
            {
                w.serialize(MomentRow {
                    feature,
                    skewness,
                    kurtosis,
                })?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("correlation.csv", |w| {
            let mut header = vec!["feature".to_string()];
            header.extend(names.iter().cloned());
            w.write_record(&header)?;
            for (name, row) in names.iter().zip(exploration.correlation.rows()) {
                let mut record = vec![name.clone()];
                record.extend(row.iter().map(|v| v.to_string()));
                w.write_record(&record)?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("target_correlation.csv", |w| {
            for (feature, value) in &exploration.target_correlations {
                w.serialize(RankedRow {
                    feature,
                    value: *value,
                })?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("histograms.csv", |w| {
            for (feature, histogram) in names.iter().zip(&exploration.histograms) {
                for (bin, &count) in histogram.counts.iter().enumerate() {
                    w.serialize(HistogramRow {
                        feature,
                        bin,
                        lower: histogram.edges[bin],
                        upper: histogram.edges[bin + 1],
                        count,
                    })?;
                }
            }
            Ok(())
        }) as usize;

        let encoding = cleaning.label_encoding;
        written += self.write_csv("class_counts.csv", |w| {
            for (class, &count) in exploration.class_counts.iter().enumerate() {
                w.serialize(ClassCountRow {
                    class,
                    label: encoding.decode(class),
                    count,
                })?;
            }
            Ok(())
        }) as usize;

        written += self.write_csv("pair_scatter.csv", |w| {
            let mut header = exploration.pair_features.clone();
            header.push("label".to_string());
            w.write_record(&header)?;
            let rows = exploration.pair_scatter.rows().into_iter();
            for (row, &class) in rows.zip(&exploration.labels) {
                let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                record.push(encoding.decode(class).to_string());
                w.write_record(&record)?;
            }
            Ok(())
        }) as usize;

        if let Some(pca) = &exploration.pca {
            written += self.write_csv("pca.csv", |w| {
                write_projection(w, pca, &exploration.labels, encoding)
            }) as usize;
            written += self.write_csv("pca_variance.csv", |w| {
                w.write_record(["component", "explained_variance", "explained_variance_ratio"])?;
                for (k, (var, ratio)) in pca
                    .explained_variance
                    .iter()
                    .zip(&pca.explained_variance_ratio)
                    .enumerate()
                {
                    w.write_record(&[format!("PC{}", k + 1), var.to_string(), ratio.to_string()])?;
                }
                Ok(())
            }) as usize;
        }

        info!(dir = %self.dir.display(), files = written, "exploration reports written");
        written
    }

    /// Write `split_statistics.csv`. Returns whether it was written.
    pub fn write_split_statistics(&self, rows: &[SplitStatistics]) -> bool {
        self.write_csv("split_statistics.csv", |w| {
            for row in rows {
                w.serialize(row)?;
            }
            Ok(())
        })
    }

    /// Serialize `value` as pretty JSON into `name`. Returns whether it was written.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> bool {
        let path = self.dir.join(name);
        let result = File::create(&path)
            .map_err(serde_json::Error::io)
            .and_then(|file| serde_json::to_writer_pretty(file, value));
        match result {
            Ok(()) => {
                debug!(path = %path.display(), "report written");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write report");
                false
            }
        }
    }

    fn write_csv<F>(&self, name: &str, fill: F) -> bool
    where
        F: FnOnce(&mut csv::Writer<File>) -> Result<(), csv::Error>,
    {
        let path = self.dir.join(name);
        let result = csv::Writer::from_path(&path).and_then(|mut writer| {
            fill(&mut writer)?;
            writer.flush()?;
            Ok(())
        });
        match result {
            Ok(()) => {
                debug!(path = %path.display(), "report written");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write report");
                false
            }
        }
    }
}

fn write_projection(
    w: &mut csv::Writer<File>,
    pca: &PcaProjection,
    labels: &Array1<usize>,
    encoding: LabelEncoding,
) -> Result<(), csv::Error> {
    let mut header: Vec<String> = (1..=pca.projection.ncols())
        .map(|k| format!("PC{}", k))
        .collect();
    header.push("label".to_string());
    w.write_record(&header)?;
    for (row, &class) in pca.projection.rows().into_iter().zip(labels) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(encoding.decode(class).to_string());
        w.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RawColumn, RawTable};
    use crate::preprocessing::{clean, CleaningConfig, FittedTransformer};

    fn cleaned() -> crate::preprocessing::CleanedDataset {
        let n = 12;
        let table = RawTable::new(vec![
            RawColumn::text("Time", (0..n).map(|i| format!("2008-07-19 11:{:02}:00", i)).collect()),
            RawColumn::numeric("s 1", (0..n).map(|i| Some(i as f64)).collect()),
            RawColumn::numeric(
                "s2",
                (0..n).map(|i| if i == 3 { None } else { Some((i * i) as f64) }).collect(),
            ),
            RawColumn::numeric("s3", (0..n).map(|i| Some((i % 3) as f64)).collect()),
            RawColumn::numeric(
                "Pass/Fail",
                (0..n).map(|i| Some(if i % 4 == 0 { 1.0 } else { -1.0 })).collect(),
            ),
        ])
        .unwrap();
        clean(table, &CleaningConfig::default()).unwrap()
    }

    #[test]
    fn test_exploration_shapes() {
        let cleaned = cleaned();
        let exploration = Exploration::compute(&cleaned.dataset, 5, 2);
        assert_eq!(exploration.feature_names, vec!["s_1", "s2", "s3"]);
        assert_eq!(exploration.summary.len(), 3);
        assert_eq!(exploration.correlation.dim(), (3, 3));
        assert_eq!(exploration.histograms[0].counts.len(), 5);
        assert_eq!(exploration.target_correlations.len(), 2);
        assert_eq!(exploration.class_counts, vec![9, 3]);
        assert_eq!(exploration.pair_features, exploration.feature_names);
        assert_eq!(exploration.pair_scatter.dim(), (12, 3));

        let pca = exploration.pca.unwrap();
        assert_eq!(pca.projection.dim(), (12, 2));
        assert!(pca.explained_variance[0] >= pca.explained_variance[1]);
    }

    #[test]
    fn test_writer_creates_all_files() {
        let cleaned = cleaned();
        let exploration = Exploration::compute(&cleaned.dataset, 4, 3);
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::create(dir.path().join("reports")).unwrap();

        let written = writer.write_exploration(&exploration, &cleaned.report);
        assert_eq!(written, 10);
        for name in [
            "missing_values.csv",
            "describe.csv",
            "moments.csv",
            "correlation.csv",
            "target_correlation.csv",
            "histograms.csv",
            "class_counts.csv",
            "pair_scatter.csv",
            "pca.csv",
            "pca_variance.csv",
        ] {
            assert!(writer.dir().join(name).exists(), "{} missing", name);
        }

        let counts = std::fs::read_to_string(writer.dir().join("class_counts.csv")).unwrap();
        assert!(counts.contains("0,-1,9"));
        assert!(counts.contains("1,1,3"));

        let missing = std::fs::read_to_string(writer.dir().join("missing_values.csv")).unwrap();
        assert!(missing.lines().nth(1).unwrap().starts_with("s2,1,"));

        let scatter = std::fs::read_to_string(writer.dir().join("pair_scatter.csv")).unwrap();
        let lines: Vec<&str> = scatter.lines().collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "s_1,s2,s3,label");
        assert_eq!(lines[1], "0,0,0,1");
    }

    #[test]
    fn test_split_statistics_after_scaling() {
        let names = vec!["a".to_string(), "b".to_string()];
        let original = Array2::from_shape_fn((20, 2), |(i, j)| (i * (j + 1)) as f64 + 10.0);
        let train_raw = original.slice(s![..15, ..]).to_owned();
        let test_raw = original.slice(s![15.., ..]).to_owned();
        let scaler = StandardScaler::new().fit(&train_raw).unwrap();
        let train = scaler.transform(&train_raw).unwrap();
        let test = scaler.transform(&test_raw).unwrap();

        let rows = split_statistics(&names, &original, &train, &test);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].feature, "b");
        assert!((rows[0].original_mean - 19.5).abs() < 1e-12);
        for row in &rows {
            assert!(row.train_mean.abs() < 1e-12, "{:?}", row);
            // ddof = 1 on a ddof = 0 scaling of 15 rows
            assert!((row.train_std - (15.0f64 / 14.0).sqrt()).abs() < 1e-12);
            // the held-out rows are the largest, so they sit above train
            assert!(row.test_mean > 1.0);
        }

        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::create(dir.path()).unwrap();
        assert!(writer.write_split_statistics(&rows));
        let text = std::fs::read_to_string(dir.path().join("split_statistics.csv")).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "feature,original_mean,original_std,train_mean,train_std,test_mean,test_std"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::create(dir.path()).unwrap();
        assert!(writer.write_json("values.json", &vec![1, 2, 3]));
        let text = std::fs::read_to_string(dir.path().join("values.json")).unwrap();
        assert_eq!(serde_json::from_str::<Vec<i32>>(&text).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unwritable_report_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(ReportWriter::create(blocker.join("reports")).is_none());
    }
}
