//! Input tables for cluster variance analysis
//!
//! The analyzer consumes three read-only inputs produced by an external
//! clustering stage: the observation matrix, the hard partition of its rows
//! and the centroid coordinates of each cluster. Each type validates its own
//! shape once at construction so the analysis itself never indexes ad hoc.

use crate::error::{Error, Result};
use crate::utils::{
    cluster_sizes, get_cluster_indices, index_variables, standardize_columns, validate_data,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Observations (rows) measured on a fixed, named set of variables (columns)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ObservationMatrix {
    variables: Vec<String>,
    data: Array2<f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, usize>,
}

impl ObservationMatrix {
    /// Create a matrix from variable names and a `(n_observations, n_variables)` array
    pub fn new<S: Into<String>>(variables: Vec<S>, data: Array2<f64>) -> Result<Self> {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        validate_data(data.view())?;
        let index = index_variables(&variables, data.ncols())?;

        Ok(Self {
            variables,
            data,
            index,
        })
    }

    /// Create a matrix from row-major observations
    pub fn from_rows<S: Into<String>>(variables: Vec<S>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = variables.len();
        if let Some(bad) = rows.iter().position(|row| row.len() != n_cols) {
            return Err(Error::invalid_data(format!(
                "Observation {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                n_cols
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), n_cols), flat)
            .map_err(|e| Error::invalid_data(e.to_string()))?;
        Self::new(variables, data)
    }

    /// Variable names in column order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Number of observations
    pub fn n_observations(&self) -> usize {
        self.data.nrows()
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.data.ncols()
    }

    /// Raw data view
    pub fn view(&self) -> ArrayView2<f64> {
        self.data.view()
    }

    /// Column index of a variable
    pub fn column_index(&self, variable: &str) -> Option<usize> {
        self.index.get(variable).copied()
    }

    /// Values of a variable across all observations
    pub fn column(&self, variable: &str) -> Option<ArrayView1<f64>> {
        self.column_index(variable).map(|col| self.data.column(col))
    }

    /// Return a z-scored copy (column mean 0, sample standard deviation 1)
    ///
    /// Useful before clustering variables measured in different units.
    pub fn standardized(&self) -> Result<Self> {
        let data = standardize_columns(self.data.view())?;
        Ok(Self {
            variables: self.variables.clone(),
            data,
            index: self.index.clone(),
        })
    }
}

/// Hard assignment of every observation to one of `n_clusters` labels
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Partition {
    labels: Array1<usize>,
    n_clusters: usize,
}

impl Partition {
    /// Create a partition; every label must lie in `0..n_clusters`
    pub fn new(labels: Array1<usize>, n_clusters: usize) -> Result<Self> {
        if n_clusters < 2 {
            return Err(Error::invalid_partition(format!(
                "At least 2 clusters are required, got {}",
                n_clusters
            )));
        }

        if labels.is_empty() {
            return Err(Error::invalid_partition("Partition has no observations"));
        }

        if let Some((obs, &label)) = labels.iter().enumerate().find(|(_, &l)| l >= n_clusters) {
            return Err(Error::invalid_partition(format!(
                "Observation {} has label {} outside 0..{}",
                obs, label, n_clusters
            )));
        }

        Ok(Self { labels, n_clusters })
    }

    /// Create a partition from a label slice
    pub fn from_labels(labels: &[usize], n_clusters: usize) -> Result<Self> {
        Self::new(Array1::from(labels.to_vec()), n_clusters)
    }

    /// Cluster label per observation
    pub fn labels(&self) -> ArrayView1<usize> {
        self.labels.view()
    }

    /// Number of clusters `k`
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of labeled observations `n`
    pub fn n_observations(&self) -> usize {
        self.labels.len()
    }

    /// Observation indices grouped by cluster label
    pub fn cluster_indices(&self) -> Vec<Vec<usize>> {
        get_cluster_indices(self.labels.view(), self.n_clusters)
    }
}

/// Observation count per cluster label
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterSizeTable {
    sizes: Vec<usize>,
}

impl ClusterSizeTable {
    /// Count the observations assigned to each label
    pub fn from_partition(partition: &Partition) -> Self {
        Self {
            sizes: cluster_sizes(partition.labels(), partition.n_clusters()),
        }
    }

    /// Size of one cluster, `None` for a label outside `0..k`
    pub fn size(&self, cluster: usize) -> Option<usize> {
        self.sizes.get(cluster).copied()
    }

    /// All sizes, indexed by label
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Sum of all cluster sizes
    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Labels that received no observations
    pub fn empty_clusters(&self) -> Vec<usize> {
        self.sizes
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == 0)
            .map(|(c, _)| c)
            .collect()
    }
}

/// Centroid coordinates: one row per cluster label, one named column per variable
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CentroidTable {
    variables: Vec<String>,
    centroids: Array2<f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, usize>,
}

impl CentroidTable {
    /// Create a table from variable names and a `(n_clusters, n_variables)` array
    pub fn new<S: Into<String>>(variables: Vec<S>, centroids: Array2<f64>) -> Result<Self> {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        validate_data(centroids.view())?;
        let index = index_variables(&variables, centroids.ncols())?;

        Ok(Self {
            variables,
            centroids,
            index,
        })
    }

    /// Create a table from one coordinate vector per cluster
    pub fn from_rows<S: Into<String>>(variables: Vec<S>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = variables.len();
        if let Some(bad) = rows.iter().position(|row| row.len() != n_cols) {
            return Err(Error::invalid_data(format!(
                "Centroid {} has {} coordinates, expected {}",
                bad,
                rows[bad].len(),
                n_cols
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let centroids = Array2::from_shape_vec((rows.len(), n_cols), flat)
            .map_err(|e| Error::invalid_data(e.to_string()))?;
        Self::new(variables, centroids)
    }

    /// Variable names in column order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Number of centroid rows
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Raw centroid view
    pub fn view(&self) -> ArrayView2<f64> {
        self.centroids.view()
    }

    /// Column index of a variable
    pub fn column_index(&self, variable: &str) -> Option<usize> {
        self.index.get(variable).copied()
    }

    /// Coordinate of every centroid for one variable
    pub fn column(&self, variable: &str) -> Option<ArrayView1<f64>> {
        self.column_index(variable).map(|col| self.centroids.column(col))
    }
}
