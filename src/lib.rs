//! # Cluster Variance Analysis
//!
//! This crate scores how strongly each variable separates the clusters of a
//! fitted hard partition (for example the output of k-means) using a one-way
//! analysis of variance per variable.
//!
//! ## Features
//!
//! - **Between/within decomposition**: weighted centroid spread around the
//!   grand mean versus pooled spread inside each cluster
//! - **F statistic and significance**: right-tail probability of the
//!   `F(k - 1, n - k)` distribution
//! - Name-based schema checks between observations and centroids
//! - Explicit handling of variables with zero within-cluster variability
//! - Parallel evaluation across variables via Rayon
//! - Z-score standardization helper
//!
//! ## Example
//!
//! ```rust
//! use kanova::{CentroidTable, ClusterVarianceAnalyzer, ObservationMatrix, Partition};
//!
//! let observations = ObservationMatrix::from_rows(
//!     vec!["math", "physics"],
//!     &[
//!         vec![1.0, 2.0], vec![2.0, 1.0],
//!         vec![8.0, 3.0], vec![9.0, 2.0],
//!         vec![5.0, 9.0], vec![4.0, 8.0],
//!     ],
//! ).unwrap();
//! let partition = Partition::from_labels(&[0, 0, 1, 1, 2, 2], 3).unwrap();
//! let centroids = CentroidTable::from_rows(
//!     vec!["math", "physics"],
//!     &[vec![1.5, 1.5], vec![8.5, 2.5], vec![4.5, 8.5]],
//! ).unwrap();
//!
//! let report = ClusterVarianceAnalyzer::new()
//!     .analyze(&partition, &centroids, &observations)
//!     .unwrap();
//!
//! for record in report.ranked_by_f() {
//!     println!("{}: F = {:.3}, sig = {:.4}", record.variable, record.f_statistic, record.significance);
//! }
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod anova;
pub mod data;
pub mod error;
pub mod utils;

pub use anova::{ClusterVarianceAnalyzer, VarianceReport, VariableRecord};
pub use data::{CentroidTable, ClusterSizeTable, ObservationMatrix, Partition};
pub use error::{Error, Result};

/// Re-export commonly used types from ndarray
pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_functionality() {
        // Basic smoke test to ensure the crate compiles
        let _analyzer = ClusterVarianceAnalyzer::new();
    }
}
