//! One-way analysis of variance per variable over a cluster partition
//!
//! For every variable the total variability is split into a between-cluster
//! part (weighted spread of the centroids around the grand mean) and a
//! within-cluster part (pooled spread of observations around their own
//! cluster mean). Their ratio is an F statistic with `(k - 1, n - k)` degrees
//! of freedom; a large F and a small right-tail significance mark variables
//! that separate the clusters well.

use crate::data::{CentroidTable, ClusterSizeTable, ObservationMatrix, Partition};
use crate::error::{Error, Result};
use crate::utils::{column_mean, f_distribution_sf, subset_mean, sum_squared_deviations};
use log::{debug, info, warn};
use ndarray::ArrayView1;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::{Arc, OnceLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this many variables the default execution stays sequential
const PARALLEL_VARIABLE_THRESHOLD: usize = 8;

/// Per-variable ANOVA analyzer for a fitted cluster partition
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterVarianceAnalyzer {
    /// Number of parallel jobs (`Some(1)` forces sequential evaluation)
    pub n_jobs: Option<usize>,
    /// Log per-variable results at info level instead of debug
    pub verbose: bool,
    /// Pool built on the first call with `n_jobs > 1`, reused afterwards
    #[cfg_attr(feature = "serde", serde(skip))]
    pool: OnceLock<Arc<ThreadPool>>,
}

/// ANOVA result for a single variable
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableRecord {
    /// Variable name
    pub variable: String,
    /// Between-group sum of squares divided by `k - 1`
    pub between_group_variability: f64,
    /// Within-group sum of squares divided by `n - k`
    pub within_group_variability: f64,
    /// Ratio of between- to within-group variability
    pub f_statistic: f64,
    /// Right-tail probability of `F(k - 1, n - k)` at `f_statistic`
    pub significance: f64,
    /// Within-group variability is zero; `f_statistic` and `significance`
    /// hold the fallback values instead of a computed ratio
    pub degenerate: bool,
}

/// Per-variable ANOVA table, ordered like the observation variables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarianceReport {
    records: Vec<VariableRecord>,
    n_observations: usize,
    n_clusters: usize,
}

/// Column positions of one variable in both input tables
#[derive(Debug, Clone, Copy)]
struct ColumnPair {
    observation: usize,
    centroid: usize,
}

impl ClusterVarianceAnalyzer {
    /// Create an analyzer with default execution settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of parallel jobs
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Compute between/within variability, F and significance for every variable
    ///
    /// Inputs are validated before any arithmetic: the centroid and observation
    /// variable sets must match by name (order may differ), the partition must
    /// label every observation, provide one centroid per cluster, leave no
    /// cluster empty and satisfy `k >= 2` and `n > k`. Any violation aborts
    /// the whole call.
    ///
    /// A variable with zero within-group variability is not an error. Its
    /// record is flagged `degenerate` and gets `F = +inf, significance = 0`
    /// when the centroids still differ from the grand mean, or
    /// `F = 0, significance = 1` when the between-group variability is zero too.
    pub fn analyze(
        &self,
        partition: &Partition,
        centroids: &CentroidTable,
        observations: &ObservationMatrix,
    ) -> Result<VarianceReport> {
        let columns = resolve_columns(centroids, observations)?;
        let sizes = validate_partition(partition, centroids, observations)?;

        let n = partition.n_observations();
        let k = partition.n_clusters();
        let clusters = partition.cluster_indices();

        let evaluate = |(name, pair): &(&String, ColumnPair)| -> Result<VariableRecord> {
            let record = analyze_variable(
                name,
                observations.view().column(pair.observation),
                centroids.view().column(pair.centroid),
                &clusters,
                &sizes,
                n,
                k,
            )?;
            self.log_record(&record);
            Ok(record)
        };

        let records = match self.n_jobs {
            Some(1) => columns.iter().map(evaluate).collect::<Result<Vec<_>>>()?,
            Some(jobs) => self
                .thread_pool(jobs)?
                .install(|| columns.par_iter().map(evaluate).collect::<Result<Vec<_>>>())?,
            None if columns.len() >= PARALLEL_VARIABLE_THRESHOLD => {
                columns.par_iter().map(evaluate).collect::<Result<Vec<_>>>()?
            }
            None => columns.iter().map(evaluate).collect::<Result<Vec<_>>>()?,
        };

        Ok(VarianceReport {
            records,
            n_observations: n,
            n_clusters: k,
        })
    }

    /// Cached pool of `jobs` threads; rebuilt only if `n_jobs` changed since it was cached
    fn thread_pool(&self, jobs: usize) -> Result<Arc<ThreadPool>> {
        if let Some(pool) = self.pool.get() {
            if pool.current_num_threads() == jobs {
                return Ok(Arc::clone(pool));
            }
        }

        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| Error::computation_error(format!("Cannot start thread pool: {}", e)))?,
        );
        let _ = self.pool.set(Arc::clone(&pool));
        Ok(pool)
    }

    fn log_record(&self, record: &VariableRecord) {
        if record.degenerate {
            warn!(
                "Variable '{}' has zero within-group variability; reporting F = {}, significance = {}",
                record.variable, record.f_statistic, record.significance
            );
        } else if self.verbose {
            info!(
                "Variable '{}': between = {:.6}, within = {:.6}, F = {:.6}, sig = {:.6e}",
                record.variable,
                record.between_group_variability,
                record.within_group_variability,
                record.f_statistic,
                record.significance
            );
        } else {
            debug!(
                "Variable '{}': F = {:.6}, sig = {:.6e}",
                record.variable, record.f_statistic, record.significance
            );
        }
    }
}

/// Map every observation variable to its column in both tables, in observation order
fn resolve_columns<'a>(
    centroids: &CentroidTable,
    observations: &'a ObservationMatrix,
) -> Result<Vec<(&'a String, ColumnPair)>> {
    let missing_in_centroids: Vec<&str> = observations
        .variables()
        .iter()
        .filter(|v| centroids.column_index(v).is_none())
        .map(String::as_str)
        .collect();
    let missing_in_observations: Vec<&str> = centroids
        .variables()
        .iter()
        .filter(|v| observations.column_index(v).is_none())
        .map(String::as_str)
        .collect();

    if !missing_in_centroids.is_empty() || !missing_in_observations.is_empty() {
        return Err(Error::schema_mismatch(format!(
            "variables missing from centroids: {:?}; variables missing from observations: {:?}",
            missing_in_centroids, missing_in_observations
        )));
    }

    observations
        .variables()
        .iter()
        .enumerate()
        .map(|(observation, name)| {
            let centroid = centroids.column_index(name).ok_or_else(|| {
                Error::schema_mismatch(format!("variable '{}' missing from centroids", name))
            })?;
            Ok((
                name,
                ColumnPair {
                    observation,
                    centroid,
                },
            ))
        })
        .collect()
}

/// Check the partition against both tables and derive the cluster sizes
fn validate_partition(
    partition: &Partition,
    centroids: &CentroidTable,
    observations: &ObservationMatrix,
) -> Result<ClusterSizeTable> {
    let n = partition.n_observations();
    let k = partition.n_clusters();

    if n != observations.n_observations() {
        return Err(Error::invalid_partition(format!(
            "Partition labels {} observations but the matrix has {}",
            n,
            observations.n_observations()
        )));
    }

    if k < 2 {
        return Err(Error::invalid_partition(format!(
            "At least 2 clusters are required, got {}",
            k
        )));
    }

    if n <= k {
        return Err(Error::invalid_partition(format!(
            "Need more observations than clusters for within-group degrees of freedom (n = {}, k = {})",
            n, k
        )));
    }

    if centroids.n_clusters() != k {
        return Err(Error::invalid_partition(format!(
            "Partition has {} clusters but {} centroids were supplied",
            k,
            centroids.n_clusters()
        )));
    }

    let sizes = ClusterSizeTable::from_partition(partition);
    let empty = sizes.empty_clusters();
    if !empty.is_empty() {
        return Err(Error::invalid_partition(format!(
            "Clusters without observations: {:?}",
            empty
        )));
    }

    Ok(sizes)
}

fn analyze_variable(
    name: &str,
    values: ArrayView1<f64>,
    centroid_coords: ArrayView1<f64>,
    clusters: &[Vec<usize>],
    sizes: &ClusterSizeTable,
    n: usize,
    k: usize,
) -> Result<VariableRecord> {
    let df_between = k - 1;
    let df_within = n - k;

    debug_assert_eq!(values.len(), n);
    // Constant columns keep their exact value so matching centroids give zero
    let grand_mean = column_mean(values);

    let between_ss: f64 = centroid_coords
        .iter()
        .zip(sizes.sizes())
        .map(|(&coord, &size)| {
            let d = coord - grand_mean;
            size as f64 * d * d
        })
        .sum();

    let within_ss: f64 = clusters
        .iter()
        .map(|indices| {
            let first = values[indices[0]];
            // Pure clusters contribute exactly zero, free of rounding in the mean
            if indices.iter().all(|&i| values[i] == first) {
                0.0
            } else {
                sum_squared_deviations(values, indices, subset_mean(values, indices))
            }
        })
        .sum();

    let between = between_ss / df_between as f64;
    let within = within_ss / df_within as f64;

    let (f_statistic, significance, degenerate) = if within > 0.0 {
        let f = between / within;
        (f, f_distribution_sf(f, df_between, df_within)?, false)
    } else if between > 0.0 {
        (f64::INFINITY, 0.0, true)
    } else {
        (0.0, 1.0, true)
    };

    Ok(VariableRecord {
        variable: name.to_string(),
        between_group_variability: between,
        within_group_variability: within,
        f_statistic,
        significance,
        degenerate,
    })
}

impl VarianceReport {
    /// Records in observation variable order
    pub fn records(&self) -> &[VariableRecord] {
        &self.records
    }

    /// Iterate records in observation variable order
    pub fn iter(&self) -> std::slice::Iter<'_, VariableRecord> {
        self.records.iter()
    }

    /// Number of records (one per variable)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the report has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for a variable by name
    pub fn get(&self, variable: &str) -> Option<&VariableRecord> {
        self.records.iter().find(|r| r.variable == variable)
    }

    /// Records sorted by F statistic, largest first; ties keep input order
    pub fn ranked_by_f(&self) -> Vec<&VariableRecord> {
        let mut ranked: Vec<&VariableRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| b.f_statistic.total_cmp(&a.f_statistic));
        ranked
    }

    /// Records whose significance is strictly below `alpha`
    pub fn significant(&self, alpha: f64) -> Vec<&VariableRecord> {
        self.records
            .iter()
            .filter(|r| r.significance < alpha)
            .collect()
    }

    /// Names of variables with zero within-group variability
    pub fn degenerate_variables(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.degenerate)
            .map(|r| r.variable.as_str())
            .collect()
    }

    /// Total observation count `n`
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Cluster count `k`
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Between-group degrees of freedom `k - 1`
    pub fn df_between(&self) -> usize {
        self.n_clusters - 1
    }

    /// Within-group degrees of freedom `n - k`
    pub fn df_within(&self) -> usize {
        self.n_observations - self.n_clusters
    }
}

impl<'a> IntoIterator for &'a VarianceReport {
    type Item = &'a VariableRecord;
    type IntoIter = std::slice::Iter<'a, VariableRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_cluster_inputs(rows: &[Vec<f64>]) -> (Partition, CentroidTable, ObservationMatrix) {
        let partition = Partition::from_labels(&[0, 0, 1, 1, 2, 2], 3).unwrap();
        let centroids = CentroidTable::from_rows(
            vec!["a", "b"],
            &[vec![1.0, 1.0], vec![5.0, 5.0], vec![9.0, 9.0]],
        )
        .unwrap();
        let observations = ObservationMatrix::from_rows(vec!["a", "b"], rows).unwrap();
        (partition, centroids, observations)
    }

    #[test]
    fn test_analyzer_builder_pattern() {
        let analyzer = ClusterVarianceAnalyzer::new().n_jobs(4).verbose(true);

        assert_eq!(analyzer.n_jobs, Some(4));
        assert!(analyzer.verbose);
        assert_eq!(ClusterVarianceAnalyzer::new().n_jobs, None);
    }

    #[test]
    fn test_thread_pool_is_reused() {
        let analyzer = ClusterVarianceAnalyzer::new().n_jobs(2);

        let first = analyzer.thread_pool(2).unwrap();
        let second = analyzer.thread_pool(2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.current_num_threads(), 2);

        let other = analyzer.thread_pool(3).unwrap();
        assert_eq!(other.current_num_threads(), 3);
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_pure_clusters_are_degenerate() {
        let rows = vec![
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![5.0, 5.0],
            vec![5.0, 5.0],
            vec![9.0, 9.0],
            vec![9.0, 9.0],
        ];
        let (partition, centroids, observations) = three_cluster_inputs(&rows);

        let report = ClusterVarianceAnalyzer::new()
            .analyze(&partition, &centroids, &observations)
            .unwrap();

        assert_eq!(report.len(), 2);
        for record in report.iter() {
            assert_eq!(record.between_group_variability, 32.0);
            assert_eq!(record.within_group_variability, 0.0);
            assert!(record.degenerate);
            assert_eq!(record.f_statistic, f64::INFINITY);
            assert_eq!(record.significance, 0.0);
        }
        assert_eq!(report.degenerate_variables(), vec!["a", "b"]);
    }

    #[test]
    fn test_hand_computed_f_statistic() {
        // Clusters of two around 1, 5, 9 with spread +-1 on `a`, +-2 on `b`
        let rows = vec![
            vec![0.0, -1.0],
            vec![2.0, 3.0],
            vec![4.0, 3.0],
            vec![6.0, 7.0],
            vec![8.0, 7.0],
            vec![10.0, 11.0],
        ];
        let (partition, centroids, observations) = three_cluster_inputs(&rows);

        let report = ClusterVarianceAnalyzer::new()
            .analyze(&partition, &centroids, &observations)
            .unwrap();

        // a: within SS = 3 * 2 * 1 = 6 over n - k = 3
        let a = report.get("a").unwrap();
        assert!((a.between_group_variability - 32.0).abs() < 1e-12);
        assert!((a.within_group_variability - 2.0).abs() < 1e-12);
        assert!((a.f_statistic - 16.0).abs() < 1e-12);
        assert!(!a.degenerate);

        // b: within SS = 3 * 2 * 4 = 24 over 3
        let b = report.get("b").unwrap();
        assert!((b.within_group_variability - 8.0).abs() < 1e-12);
        assert!((b.f_statistic - 4.0).abs() < 1e-12);

        // Larger F means stronger evidence
        assert!(a.significance < b.significance);
        assert!(a.significance > 0.0 && b.significance < 1.0);
        assert_eq!(report.df_between(), 2);
        assert_eq!(report.df_within(), 3);
    }

    #[test]
    fn test_too_few_observations() {
        let partition = Partition::from_labels(&[0, 1, 2], 3).unwrap();
        let centroids =
            CentroidTable::from_rows(vec!["a"], &[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let observations =
            ObservationMatrix::from_rows(vec!["a"], &[vec![1.0], vec![2.0], vec![3.0]]).unwrap();

        let result = ClusterVarianceAnalyzer::new().analyze(&partition, &centroids, &observations);
        assert!(matches!(result, Err(Error::InvalidPartition { .. })));
    }

    #[test]
    fn test_resolve_columns_reorders_by_name() {
        let centroids =
            CentroidTable::from_rows(vec!["y", "x"], &[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
        let observations =
            ObservationMatrix::from_rows(vec!["x", "y"], &[vec![1.0, 0.0]]).unwrap();

        let columns = resolve_columns(&centroids, &observations).unwrap();
        assert_eq!(columns[0].0, "x");
        assert_eq!(columns[0].1.centroid, 1);
        assert_eq!(columns[1].0, "y");
        assert_eq!(columns[1].1.centroid, 0);
    }

    #[test]
    fn test_ranked_and_significant() {
        let rows = vec![
            vec![0.0, -1.0],
            vec![2.0, 3.0],
            vec![4.0, 3.0],
            vec![6.0, 7.0],
            vec![8.0, 7.0],
            vec![10.0, 11.0],
        ];
        let (partition, centroids, observations) = three_cluster_inputs(&rows);
        let report = ClusterVarianceAnalyzer::new()
            .analyze(&partition, &centroids, &observations)
            .unwrap();

        let ranked: Vec<&str> = report
            .ranked_by_f()
            .into_iter()
            .map(|r| r.variable.as_str())
            .collect();
        assert_eq!(ranked, vec!["a", "b"]);

        assert!(report.significant(0.0).is_empty());
        assert_eq!(report.significant(1.0).len(), 2);
    }
}
