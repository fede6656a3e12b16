//! Utility functions for cluster variance analysis

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::HashMap;

/// Get indices of points assigned to each cluster
pub fn get_cluster_indices(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<Vec<usize>> {
    let mut cluster_indices = vec![Vec::new(); n_clusters];

    for (point_idx, &cluster_id) in assignments.iter().enumerate() {
        if cluster_id < n_clusters {
            cluster_indices[cluster_id].push(point_idx);
        }
    }

    cluster_indices
}

/// Calculate cluster sizes
pub fn cluster_sizes(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0; n_clusters];

    for &cluster_id in assignments.iter() {
        if cluster_id < n_clusters {
            sizes[cluster_id] += 1;
        }
    }

    sizes
}

/// Validate a numeric data matrix: non-empty and finite
pub fn validate_data(data: ArrayView2<f64>) -> Result<()> {
    if data.nrows() == 0 {
        return Err(Error::invalid_data("Data cannot be empty"));
    }

    if data.ncols() == 0 {
        return Err(Error::invalid_data("Data must have at least one variable"));
    }

    if let Some(((row, col), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::invalid_data(format!(
            "Non-finite value at row {}, column {}",
            row, col
        )));
    }

    Ok(())
}

/// Build a name -> column index map, rejecting empty or duplicate names
pub fn index_variables(variables: &[String], n_columns: usize) -> Result<HashMap<String, usize>> {
    if variables.len() != n_columns {
        return Err(Error::invalid_data(format!(
            "Expected {} variable names, got {}",
            n_columns,
            variables.len()
        )));
    }

    let mut index = HashMap::with_capacity(variables.len());
    for (col, name) in variables.iter().enumerate() {
        if name.is_empty() {
            return Err(Error::invalid_data(format!(
                "Variable name at column {} is empty",
                col
            )));
        }
        if index.insert(name.clone(), col).is_some() {
            return Err(Error::invalid_data(format!(
                "Duplicate variable name '{}'",
                name
            )));
        }
    }

    Ok(index)
}

/// Arithmetic mean of the selected entries of `values`
pub fn subset_mean(values: ArrayView1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let total: f64 = indices.iter().map(|&i| values[i]).sum();
    total / indices.len() as f64
}

/// Mean of a whole column; a constant column returns its value exactly
pub fn column_mean(values: ArrayView1<f64>) -> f64 {
    match values.iter().next() {
        None => 0.0,
        Some(&first) if values.iter().all(|&v| v == first) => first,
        Some(_) => values.sum() / values.len() as f64,
    }
}

/// Sum of squared deviations of the selected entries around `center`
pub fn sum_squared_deviations(values: ArrayView1<f64>, indices: &[usize], center: f64) -> f64 {
    indices
        .iter()
        .map(|&i| {
            let d = values[i] - center;
            d * d
        })
        .sum()
}

/// Right-tail probability `P(X > f)` for `X ~ F(df_between, df_within)`
pub fn f_distribution_sf(f: f64, df_between: usize, df_within: usize) -> Result<f64> {
    if df_between == 0 || df_within == 0 {
        return Err(Error::computation_error(format!(
            "F distribution requires positive degrees of freedom, got ({}, {})",
            df_between, df_within
        )));
    }

    let dist = FisherSnedecor::new(df_between as f64, df_within as f64).map_err(|e| {
        Error::computation_error(format!(
            "Cannot build F({}, {}) distribution: {}",
            df_between, df_within, e
        ))
    })?;

    // sf avoids the cancellation of 1 - cdf for large F
    Ok(dist.sf(f).clamp(0.0, 1.0))
}

/// Z-score every column using the sample standard deviation (ddof = 1)
pub fn standardize_columns(data: ArrayView2<f64>) -> Result<Array2<f64>> {
    if data.nrows() < 2 {
        return Err(Error::invalid_data(
            "Standardization needs at least two observations",
        ));
    }

    let mut out = data.to_owned();
    for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
        let mean = column
            .mean()
            .ok_or_else(|| Error::invalid_data("Cannot standardize an empty column"))?;
        let std = column.std(1.0);
        if std <= f64::EPSILON * mean.abs().max(1.0) {
            return Err(Error::invalid_data(format!(
                "Column {} is constant and cannot be standardized",
                col
            )));
        }
        column.mapv_inplace(|x| (x - mean) / std);
    }

    Ok(out)
}
