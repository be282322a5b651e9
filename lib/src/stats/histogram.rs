use super::observed;
use ndarray::ArrayView1;
use serde::Serialize;

/// Equal-width histogram of one column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Bin the observed values of `column` into `bins` equal-width bins.
///
/// The last bin is closed on the right. A constant column puts everything in
/// one bin of width 1 centred on the value. No observed values (or
/// `bins == 0`) gives an empty histogram.
pub fn histogram(column: ArrayView1<f64>, bins: usize) -> Histogram {
    let values = observed(column.iter().copied());
    if values.is_empty() || bins == 0 {
        return Histogram {
            edges: Vec::new(),
            counts: Vec::new(),
        };
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { edges, counts }
}
