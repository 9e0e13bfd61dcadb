//! Fixed-binning 2D tables over (momentum, pseudorapidity).
//!
//! There are no under- or overflow bins: values outside an axis land in its
//! first or last bin.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bin edges of one axis, strictly increasing, at least one bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "axis needs at least two edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(Error::InvalidArgument("axis edges must be finite".into()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidArgument(
                "axis edges must be strictly increasing".into(),
            ));
        }
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Index of the bin holding `x`, clamped to the axis.
    pub fn bin(&self, x: f64) -> usize {
        let last = self.n_bins() - 1;
        if x.is_nan() || x < self.edges[0] {
            return 0;
        }
        // number of edges <= x, minus the leading one
        let above = self.edges.partition_point(|e| *e <= x);
        (above.saturating_sub(1)).min(last)
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    /// `values[i][j]` for x bin `i`, y bin `j`.
    values: Vec<Vec<f64>>,
    errors: Vec<Vec<f64>>,
}

/// Per-bin efficiency ratio and its error, e.g. a data/simulation tracking
/// efficiency table.
///
/// JSON form: `{"x_edges": [..], "y_edges": [..], "values": [[..]], "errors": [[..]]}`
/// with one inner array per x bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableFile", into = "TableFile")]
pub struct ReferenceTable {
    x: Axis,
    y: Axis,
    values: Vec<f64>,
    errors: Vec<f64>,
}

impl ReferenceTable {
    /// `values` and `errors` are row-major over (x, y).
    pub fn new(
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        values: Vec<f64>,
        errors: Vec<f64>,
    ) -> Result<Self> {
        let x = Axis::new(x_edges)?;
        let y = Axis::new(y_edges)?;
        let n = x.n_bins() * y.n_bins();
        if values.len() != n || errors.len() != n {
            return Err(Error::InvalidArgument(format!(
                "table of {}x{} bins given {} values and {} errors",
                x.n_bins(),
                y.n_bins(),
                values.len(),
                errors.len()
            )));
        }
        Ok(Self {
            x,
            y,
            values,
            errors,
        })
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    fn index(&self, i: usize, j: usize) -> usize {
        i * self.y.n_bins() + j
    }

    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[self.index(i, j)]
    }

    pub fn error(&self, i: usize, j: usize) -> f64 {
        self.errors[self.index(i, j)]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Same binning and errors, new bin values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            values,
            errors: self.errors.clone(),
        }
    }
}

impl TryFrom<TableFile> for ReferenceTable {
    type Error = Error;

    fn try_from(file: TableFile) -> Result<Self> {
        let ny = file.y_edges.len().saturating_sub(1);
        let flatten = |rows: Vec<Vec<f64>>, what: &str| -> Result<Vec<f64>> {
            if let Some(bad) = rows.iter().position(|r| r.len() != ny) {
                return Err(Error::InvalidArgument(format!(
                    "{what} row {bad} does not have {ny} y bins"
                )));
            }
            Ok(rows.into_iter().flatten().collect())
        };
        let values = flatten(file.values, "values")?;
        let errors = flatten(file.errors, "errors")?;
        ReferenceTable::new(file.x_edges, file.y_edges, values, errors)
    }
}

impl From<ReferenceTable> for TableFile {
    fn from(t: ReferenceTable) -> Self {
        let ny = t.y.n_bins();
        let rows = |flat: Vec<f64>| -> Vec<Vec<f64>> { flat.chunks(ny).map(<[f64]>::to_vec).collect() };
        TableFile {
            x_edges: t.x.edges,
            y_edges: t.y.edges,
            values: rows(t.values),
            errors: rows(t.errors),
        }
    }
}

/// Weighted 2D histogram binned like a [`ReferenceTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    x: Axis,
    y: Axis,
    weights: Vec<f64>,
    entries: u64,
}

impl Spectrum {
    pub fn for_table(table: &ReferenceTable) -> Self {
        Self {
            x: table.x.clone(),
            y: table.y.clone(),
            weights: vec![0.0; table.values.len()],
            entries: 0,
        }
    }

    /// Add `w` to the bin holding (x, y); outside values fold into edge bins.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        let idx = self.x.bin(x) * self.y.n_bins() + self.y.bin(y);
        self.weights[idx] += w;
        self.entries += 1;
    }

    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.y.n_bins() + j]
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Number of `fill` calls.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn matches(&self, table: &ReferenceTable) -> bool {
        self.x == table.x && self.y == table.y
    }

    /// `(i, j, weight)` for every bin with nonzero weight.
    pub fn filled_bins(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let ny = self.y.n_bins();
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0.0)
            .map(move |(k, w)| (k / ny, k % ny, *w))
    }
}
