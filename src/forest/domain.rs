//! Points and rectangular domains of index spaces

use crate::error::ForestError;
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in an N-dimensional index space; also used as a subspace color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainPoint(Vec<i64>);

impl DomainPoint {
    pub fn new(coords: Vec<i64>) -> Self {
        DomainPoint(coords)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn coords(&self) -> &[i64] {
        &self.0
    }
}

impl From<Color> for DomainPoint {
    fn from(color: Color) -> Self {
        DomainPoint(vec![i64::from(color)])
    }
}

impl From<Vec<i64>> for DomainPoint {
    fn from(coords: Vec<i64>) -> Self {
        DomainPoint(coords)
    }
}

impl<const N: usize> From<[i64; N]> for DomainPoint {
    fn from(coords: [i64; N]) -> Self {
        DomainPoint(coords.to_vec())
    }
}

impl fmt::Display for DomainPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// Inclusive rectangle `[lo, hi]`. A rectangle with any `hi < lo` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    lo: DomainPoint,
    hi: DomainPoint,
}

impl Domain {
    pub fn new(lo: impl Into<DomainPoint>, hi: impl Into<DomainPoint>) -> Result<Self, ForestError> {
        let lo = lo.into();
        let hi = hi.into();
        if lo.dim() != hi.dim() {
            return Err(ForestError::InvalidDomain(format!(
                "bounds {} and {} differ in dimension",
                lo, hi
            )));
        }
        if lo.dim() == 0 {
            return Err(ForestError::InvalidDomain(
                "zero-dimensional domain".to_string(),
            ));
        }
        Ok(Domain { lo, hi })
    }

    /// One-dimensional domain `[0, len - 1]`.
    pub fn range(len: u64) -> Self {
        Domain {
            lo: DomainPoint(vec![0]),
            hi: DomainPoint(vec![i64::try_from(len).unwrap_or(i64::MAX) - 1]),
        }
    }

    pub fn lo(&self) -> &DomainPoint {
        &self.lo
    }

    pub fn hi(&self) -> &DomainPoint {
        &self.hi
    }

    pub fn dim(&self) -> usize {
        self.lo.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.lo.0.iter().zip(&self.hi.0).any(|(l, h)| h < l)
    }

    /// Number of points in the rectangle, or `None` if that does not fit in a `u64`.
    pub fn volume(&self) -> Option<u64> {
        if self.is_empty() {
            return Some(0);
        }
        self.lo
            .0
            .iter()
            .zip(&self.hi.0)
            .try_fold(1u64, |acc, (l, h)| {
                let extent = u64::try_from(i128::from(*h) - i128::from(*l) + 1).ok()?;
                acc.checked_mul(extent)
            })
    }

    pub fn contains(&self, point: &DomainPoint) -> bool {
        point.dim() == self.dim()
            && point
                .0
                .iter()
                .zip(self.lo.0.iter().zip(&self.hi.0))
                .all(|(p, (l, h))| l <= p && p <= h)
    }

    /// Whether `other` lies entirely inside this rectangle. Empty rectangles fit anywhere.
    pub fn contains_domain(&self, other: &Domain) -> bool {
        if other.is_empty() {
            return other.dim() == self.dim();
        }
        self.contains(&other.lo) && self.contains(&other.hi)
    }

    pub fn intersects(&self, other: &Domain) -> bool {
        if self.dim() != other.dim() || self.is_empty() || other.is_empty() {
            return false;
        }
        self.lo
            .0
            .iter()
            .zip(&self.hi.0)
            .zip(other.lo.0.iter().zip(&other.hi.0))
            .all(|((l1, h1), (l2, h2))| l1 <= h2 && l2 <= h1)
    }

    /// Smallest rectangle covering every domain in `domains`.
    pub fn bounding(domains: &[Domain]) -> Option<Domain> {
        let mut iter = domains.iter().filter(|d| !d.is_empty());
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, d| Domain {
            lo: DomainPoint(acc.lo.0.iter().zip(&d.lo.0).map(|(a, b)| *a.min(b)).collect()),
            hi: DomainPoint(acc.hi.0.iter().zip(&d.hi.0).map(|(a, b)| *a.max(b)).collect()),
        }))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.lo, self.hi)
    }
}
