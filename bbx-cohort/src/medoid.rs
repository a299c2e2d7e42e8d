//! Medoid of a point set
//!
//! The medoid is the point with the smallest sum of Euclidean distances to
//! every point of the set. Two variants give the same answer:
//! - full matrix: materializes all n x n distances (O(n²) memory)
//! - memory efficient: one row of distances at a time (O(n) memory)
//!
//! Both are O(n²) in time. At hundreds of thousands of subjects only the
//! memory-efficient variant fits in memory, so it is the default.

use crate::error::{CohortError, CohortResult};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default upper bound on full-matrix cells (800 MB of f64)
pub const DEFAULT_CELL_BUDGET: usize = 100_000_000;

/// Dense row-major point set
#[derive(Debug, Clone, PartialEq)]
pub struct Points {
    dims: usize,
    data: Vec<f64>,
}

impl Points {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    /// Build from rows, which must all have the same length
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> CohortResult<Self> {
        let dims = rows.first().map_or(0, |r| r.as_ref().len());
        let mut points = Points::new(dims);
        for row in rows {
            points.push(row.as_ref())?;
        }
        Ok(points)
    }

    pub fn push(&mut self, point: &[f64]) -> CohortResult<()> {
        if point.len() != self.dims {
            return Err(CohortError::DimensionMismatch {
                expected: self.dims,
                found: point.len(),
            });
        }
        self.data.extend_from_slice(point);
        Ok(())
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }
}

/// Euclidean distance between two points of equal length
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Selected medoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Medoid {
    /// Row of the medoid in the point set
    pub index: usize,
    /// Sum of distances from the medoid to every point
    pub total_distance: f64,
}

/// Which medoid algorithm to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MedoidStrategy {
    FullMatrix,
    #[default]
    MemoryEfficient,
}

impl MedoidStrategy {
    pub fn compute(self, points: &Points, cell_budget: usize) -> CohortResult<Medoid> {
        match self {
            MedoidStrategy::FullMatrix => medoid_full_matrix(points, cell_budget),
            MedoidStrategy::MemoryEfficient => medoid_memory_efficient(points),
        }
    }
}

impl fmt::Display for MedoidStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedoidStrategy::FullMatrix => f.write_str("full-matrix"),
            MedoidStrategy::MemoryEfficient => f.write_str("memory-efficient"),
        }
    }
}

impl FromStr for MedoidStrategy {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-matrix" | "full" => Ok(MedoidStrategy::FullMatrix),
            "memory-efficient" | "efficient" => Ok(MedoidStrategy::MemoryEfficient),
            other => Err(CohortError::Config(format!(
                "Unknown medoid strategy '{}' (expected full-matrix or memory-efficient)",
                other
            ))),
        }
    }
}

fn ensure_not_empty(points: &Points) -> CohortResult<()> {
    if points.is_empty() {
        return Err(CohortError::NoUsableRows(
            "medoid of an empty point set".to_string(),
        ));
    }
    Ok(())
}

/// Medoid from the complete pairwise distance matrix
pub fn medoid_full_matrix(points: &Points, cell_budget: usize) -> CohortResult<Medoid> {
    ensure_not_empty(points)?;
    let n = points.len();
    match n.checked_mul(n) {
        Some(cells) if cells <= cell_budget => {}
        _ => {
            return Err(CohortError::MatrixTooLarge {
                points: n,
                budget: cell_budget,
            })
        }
    }

    let mut matrix = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(points.row(i), points.row(j));
            matrix[i * n + j] = d;
            matrix[j * n + i] = d;
        }
    }

    let mut best = Medoid {
        index: 0,
        total_distance: f64::INFINITY,
    };
    for (i, row) in matrix.chunks_exact(n).enumerate() {
        let total: f64 = row.iter().sum();
        if total < best.total_distance {
            best = Medoid {
                index: i,
                total_distance: total,
            };
        }
    }
    debug!(
        "Full-matrix medoid: point {} of {} (total distance {:.3})",
        best.index, n, best.total_distance
    );
    Ok(best)
}

/// Medoid computed one distance row at a time
pub fn medoid_memory_efficient(points: &Points) -> CohortResult<Medoid> {
    ensure_not_empty(points)?;
    let n = points.len();

    let mut distances = vec![0.0f64; n];
    let mut best = Medoid {
        index: 0,
        total_distance: f64::INFINITY,
    };
    for i in 0..n {
        let candidate = points.row(i);
        for (j, d) in distances.iter_mut().enumerate() {
            *d = euclidean(candidate, points.row(j));
        }
        let total: f64 = distances.iter().sum();
        if total < best.total_distance {
            best = Medoid {
                index: i,
                total_distance: total,
            };
        }
    }
    debug!(
        "Memory-efficient medoid: point {} of {} (total distance {:.3})",
        best.index, n, best.total_distance
    );
    Ok(best)
}
