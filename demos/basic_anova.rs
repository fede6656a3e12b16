//! Basic cluster variance analysis example
//!
//! Scores how well each school subject separates three groups of students
//! found by an external k-means run, then repeats the analysis on
//! z-scored grades.

use kanova::{CentroidTable, ClusterVarianceAnalyzer, ObservationMatrix, Partition};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subjects = vec!["math", "physics", "chemistry"];

    // Grades (0-10) of nine students
    let observations = ObservationMatrix::from_rows(
        subjects.clone(),
        &[
            vec![3.7, 2.7, 9.1],
            vec![7.8, 8.0, 1.5],
            vec![8.9, 1.0, 2.7],
            vec![7.0, 1.0, 9.0],
            vec![3.4, 2.0, 5.0],
            vec![8.5, 9.0, 2.0],
            vec![2.9, 3.2, 8.6],
            vec![9.1, 1.5, 2.2],
            vec![7.9, 8.6, 1.2],
        ],
    )?;

    // Labels and centroids as produced by the clustering stage
    let labels = [0, 1, 2, 0, 0, 1, 0, 2, 1];
    let partition = Partition::from_labels(&labels, 3)?;
    let centroids = CentroidTable::from_rows(
        subjects.clone(),
        &[
            vec![4.25, 2.225, 7.925],
            vec![8.0667, 8.5333, 1.5667],
            vec![9.0, 1.25, 2.45],
        ],
    )?;

    println!("Observations: {}", observations.n_observations());
    println!("Clusters: {}", partition.n_clusters());
    println!();

    println!("=== Example 1: ANOVA on raw grades ===");
    let analyzer = ClusterVarianceAnalyzer::new().verbose(false);
    let report = analyzer.analyze(&partition, &centroids, &observations)?;

    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "variable", "between", "within", "F", "sig F"
    );
    for record in &report {
        println!(
            "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            record.variable,
            record.between_group_variability,
            record.within_group_variability,
            record.f_statistic,
            record.significance
        );
    }
    println!();

    println!("Variables ranked by F:");
    for (rank, record) in report.ranked_by_f().iter().enumerate() {
        println!("  {}. {} (F = {:.3})", rank + 1, record.variable, record.f_statistic);
    }

    let significant: Vec<&str> = report
        .significant(0.05)
        .into_iter()
        .map(|r| r.variable.as_str())
        .collect();
    println!("Significant at 5%: {:?}", significant);
    println!();

    println!("=== Example 2: ANOVA on z-scored grades ===");
    let standardized = observations.standardized()?;
    let sizes = [4.0, 3.0, 2.0];
    let mut rows = vec![vec![0.0; subjects.len()]; partition.n_clusters()];
    for (i, &label) in labels.iter().enumerate() {
        for (col, value) in standardized.view().row(i).iter().enumerate() {
            rows[label][col] += value / sizes[label];
        }
    }
    let standardized_centroids = CentroidTable::from_rows(subjects, &rows)?;
    let report = analyzer.analyze(&partition, &standardized_centroids, &standardized)?;

    for record in report.iter() {
        println!(
            "{:<12} F = {:>10.4}  sig F = {:.6}",
            record.variable, record.f_statistic, record.significance
        );
    }

    Ok(())
}
