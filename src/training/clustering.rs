//! Density-based regime clustering
//!
//! Output rows of a simulation dump often fall into distinct operating
//! regimes. DBSCAN on the standardized output block separates them so a
//! surrogate can be trained on a single coherent regime.

use crate::error::{PrepError, Result};
use crate::preprocessing::StandardScaler;
use ndarray::{Array2, ArrayBase, Data, Ix2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Label given to rows that belong to no cluster
pub const NOISE: i64 = -1;

/// Which cluster's rows to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    /// An explicit label; `-1` selects the noise rows
    Label(i64),
    /// The non-noise cluster with the most rows (lowest label on ties)
    Largest,
}

impl Default for ClusterSelection {
    fn default() -> Self {
        ClusterSelection::Label(0)
    }
}

/// Clustering hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Minimum neighbourhood size (the point itself included) for a core point
    pub min_samples: usize,
    /// Neighbourhood radius in standardized output space
    pub eps: f64,
    pub selection: ClusterSelection,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_samples: 5,
            eps: 5.0,
            selection: ClusterSelection::default(),
        }
    }
}

impl ClusteringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_selection(mut self, selection: ClusterSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(PrepError::Config(format!(
                "eps must be a positive finite number, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(PrepError::Config("min_samples must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// DBSCAN (Density-Based Spatial Clustering of Applications with Noise)
///
/// Points are classified as core, border, or noise:
/// - Core: has ≥ min_samples neighbors within eps radius (itself included)
/// - Border: within eps of a core point but not core itself
/// - Noise: neither core nor border (label = -1)
///
/// Labels are assigned by scanning rows in order, so a border point reachable
/// from two clusters takes the label of the first one that reaches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DBSCAN {
    /// Maximum distance between neighbors
    pub eps: f64,
    /// Minimum points to form a dense region
    pub min_samples: usize,
    /// Assigned cluster labels (-1 = noise)
    pub labels: Option<Vec<i64>>,
    /// Number of clusters found (excluding noise)
    pub n_clusters_found: usize,
    /// Number of noise points
    pub n_noise: usize,
    pub is_fitted: bool,
}

impl Default for DBSCAN {
    fn default() -> Self {
        Self::new(5.0, 5)
    }
}

impl DBSCAN {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            labels: None,
            n_clusters_found: 0,
            n_noise: 0,
            is_fitted: false,
        }
    }

    /// Find all neighbors within eps distance
    fn region_query<S: Data<Elem = f64> + Sync>(
        x: &ArrayBase<S, Ix2>,
        point_idx: usize,
        eps_sq: f64,
    ) -> Vec<usize> {
        let row = x.row(point_idx);
        (0..x.nrows())
            .filter(|&i| {
                let dist_sq: f64 = row
                    .iter()
                    .zip(x.row(i).iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                dist_sq <= eps_sq
            })
            .collect()
    }

    /// Fit the model (unsupervised)
    pub fn fit<S: Data<Elem = f64> + Sync>(&mut self, x: &ArrayBase<S, Ix2>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let eps_sq = self.eps * self.eps;
        let min_samples = self.min_samples;

        // Pre-compute neighbor lists for all points (order-preserving collect)
        let neighbors: Vec<Vec<usize>> = (0..n_samples)
            .into_par_iter()
            .map(|i| Self::region_query(x, i, eps_sq))
            .collect();

        let is_core: Vec<bool> = neighbors.iter()
            .map(|n| n.len() >= min_samples)
            .collect();

        let mut labels = vec![NOISE; n_samples];
        let mut cluster_id: i64 = 0;

        for i in 0..n_samples {
            if labels[i] != NOISE || !is_core[i] {
                continue;
            }

            // Expand cluster from core point i
            labels[i] = cluster_id;
            let mut queue: Vec<usize> = neighbors[i].clone();
            let mut head = 0;

            while head < queue.len() {
                let q = queue[head];
                head += 1;

                if labels[q] == NOISE {
                    labels[q] = cluster_id;
                }
                // Only points of this cluster may propagate it
                if !is_core[q] || labels[q] != cluster_id {
                    continue;
                }
                for &neighbor in &neighbors[q] {
                    if labels[neighbor] == NOISE {
                        labels[neighbor] = cluster_id;
                        queue.push(neighbor);
                    }
                }
            }

            debug!(cluster = cluster_id, seed_row = i, "Expanded cluster");
            cluster_id += 1;
        }

        self.n_noise = labels.iter().filter(|&&l| l == NOISE).count();
        self.n_clusters_found = cluster_id as usize;
        self.labels = Some(labels);
        self.is_fitted = true;
        Ok(self)
    }
}

/// Mapping from cluster label to the ascending row indices carrying it.
///
/// Every row appears under exactly one label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<i64>,
    members: BTreeMap<i64, Vec<usize>>,
}

impl ClusterAssignment {
    /// Group row indices by label
    pub fn from_labels(labels: Vec<i64>) -> Self {
        let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            members.entry(label).or_default().push(row);
        }
        Self { labels, members }
    }

    /// Per-row labels in row order
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn label_of(&self, row: usize) -> Option<i64> {
        self.labels.get(row).copied()
    }

    /// Number of non-noise clusters
    pub fn n_clusters(&self) -> usize {
        self.members.keys().filter(|&&l| l != NOISE).count()
    }

    /// All labels that have members, noise first when present
    pub fn available_labels(&self) -> Vec<i64> {
        self.members.keys().copied().collect()
    }

    /// Rows labelled as noise
    pub fn noise(&self) -> &[usize] {
        self.members.get(&NOISE).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(label, size)` for every label with members, ascending by label
    pub fn sizes(&self) -> Vec<(i64, usize)> {
        self.members.iter().map(|(&l, rows)| (l, rows.len())).collect()
    }

    /// Rows of `label`, or [`PrepError::ClusterEmpty`] if it has none
    pub fn members(&self, label: i64) -> Result<&[usize]> {
        self.members
            .get(&label)
            .map(Vec::as_slice)
            .ok_or_else(|| PrepError::ClusterEmpty {
                label,
                available: self.available_labels(),
            })
    }

    /// Label of the largest non-noise cluster
    pub fn largest(&self) -> Option<i64> {
        self.members
            .iter()
            .filter(|(l, _)| **l != NOISE)
            .fold(None, |best: Option<(i64, usize)>, (&l, rows)| match best {
                Some((_, size)) if size >= rows.len() => best,
                _ => Some((l, rows.len())),
            })
            .map(|(l, _)| l)
    }

    /// Resolve a selection to a label and its rows
    pub fn select(&self, selection: ClusterSelection) -> Result<(i64, &[usize])> {
        let label = match selection {
            ClusterSelection::Label(label) => label,
            ClusterSelection::Largest => self.largest().ok_or_else(|| PrepError::ClusterEmpty {
                label: 0,
                available: self.available_labels(),
            })?,
        };
        Ok((label, self.members(label)?))
    }
}

/// Standardize-then-DBSCAN over an output block
#[derive(Debug, Clone)]
pub struct Clusterer {
    config: ClusteringConfig,
}

impl Clusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn cluster<S: Data<Elem = f64>>(&self, outputs: &ArrayBase<S, Ix2>) -> Result<ClusterAssignment> {
        self.config.validate()?;

        let standardized: Array2<f64> = StandardScaler::new().fit_transform(outputs)?;
        let mut model = DBSCAN::new(self.config.eps, self.config.min_samples);
        model.fit(&standardized)?;

        let labels = model.labels.take().ok_or(PrepError::ModelNotFitted)?;
        let assignment = ClusterAssignment::from_labels(labels);

        info!(
            eps = self.config.eps,
            min_samples = self.config.min_samples,
            clusters = model.n_clusters_found,
            noise = model.n_noise,
            "Clustered output block"
        );
        if model.n_clusters_found == 0 {
            warn!(eps = self.config.eps, "No dense cluster found; every row is noise");
        }
        Ok(assignment)
    }
}
