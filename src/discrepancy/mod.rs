//! # Discrepancy Matrices
//!
//! Builds the MMD weighting matrix `M` over the stacked samples (source first,
//! then target) together with the centering matrix `H`.
//!
//! - [`marginal_mmd`]: static matrix aligning the two domain means (TCA).
//! - [`joint_mmd`]: marginal term scaled by the number of source classes plus
//!   one class-conditional term per class, driven by target pseudo-labels (JDA).
//!
//! Both returned matrices have unit Frobenius norm.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{shape_mismatch, Result, TransferError};
use crate::utils::FrobeniusNorm;

/// `H = I - (1/n) * ones(n, n)`.
pub fn centering_matrix(n: usize) -> Array2<f64> {
    let mut h = Array2::from_elem((n, n), -1.0 / n as f64);
    h.diag_mut().mapv_inplace(|v| v + 1.0);
    h
}

/// Stacked domain indicator: `+1/ns` on source rows, `-1/nt` on target rows.
pub fn domain_indicator(ns: usize, nt: usize) -> Array1<f64> {
    let mut e = Array1::zeros(ns + nt);
    e.slice_mut(ndarray::s![..ns]).fill(1.0 / ns as f64);
    e.slice_mut(ndarray::s![ns..]).fill(-1.0 / nt as f64);
    e
}

/// Scales `m` to unit Frobenius norm.
pub fn frobenius_normalize(m: &mut Array2<f64>) -> Result<()> {
    let norm = m.frobenius_norm();
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(TransferError::NumericalInstability(format!(
            "discrepancy matrix has Frobenius norm {}",
            norm
        )));
    }
    m.mapv_inplace(|v| v / norm);
    Ok(())
}

fn outer(e: &Array1<f64>) -> Array2<f64> {
    let column = e.view().insert_axis(Axis(1));
    let row = e.view().insert_axis(Axis(0));
    column.dot(&row)
}

fn check_domains(ns: usize, nt: usize) -> Result<()> {
    if ns == 0 {
        return Err(TransferError::EmptyDomain("source"));
    }
    if nt == 0 {
        return Err(TransferError::EmptyDomain("target"));
    }
    Ok(())
}

/// Static discrepancy matrix `e·eᵗ`, normalized.
pub fn marginal_mmd(ns: usize, nt: usize) -> Result<Array2<f64>> {
    check_domains(ns, nt)?;
    let mut m = outer(&domain_indicator(ns, nt));
    frobenius_normalize(&mut m)?;
    Ok(m)
}

/// Side of the stacked sample ordering a class member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Source,
    Target,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Source => write!(f, "source"),
            Domain::Target => write!(f, "target"),
        }
    }
}

/// Sample positions of each class in the stacked source + target ordering.
///
/// Classes are taken from the source labels; pseudo-labels naming a class the
/// source never saw do not contribute.
#[derive(Debug, Clone)]
pub struct ClassIndex {
    ns: usize,
    nt: usize,
    members: BTreeMap<usize, (Vec<usize>, Vec<usize>)>,
}

impl ClassIndex {
    pub fn new(source_labels: ArrayView1<usize>, target_labels: Option<ArrayView1<usize>>, nt: usize) -> Self {
        let ns = source_labels.len();
        let mut members: BTreeMap<usize, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for (i, &label) in source_labels.iter().enumerate() {
            members.entry(label).or_default().0.push(i);
        }

        if let Some(target_labels) = target_labels {
            for (j, &label) in target_labels.iter().enumerate() {
                if let Some((_, target)) = members.get_mut(&label) {
                    target.push(ns + j);
                }
            }
        }

        Self { ns, nt, members }
    }

    pub fn n_classes(&self) -> usize {
        self.members.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.keys().copied()
    }

    /// Per-sample weight of `class` in the given domain: `1/|members|`.
    pub fn weight(&self, class: usize, domain: Domain) -> Result<f64> {
        let count = self
            .members
            .get(&class)
            .map(|(source, target)| match domain {
                Domain::Source => source.len(),
                Domain::Target => target.len(),
            })
            .unwrap_or(0);
        if count == 0 {
            return Err(TransferError::EmptyClass { class, domain });
        }
        Ok(1.0 / count as f64)
    }

    /// Class-conditional indicator `e_c`: `+1/|S_c|` on source members and
    /// `-1/|T_c|` on target members. A side with no members contributes zeros.
    pub fn class_indicator(&self, class: usize) -> Array1<f64> {
        let n = self.ns + self.nt;
        let mut e = Array1::zeros(n);
        let Some((source, target)) = self.members.get(&class) else {
            return e;
        };

        for (domain, positions, sign) in [(Domain::Source, source, 1.0), (Domain::Target, target, -1.0)] {
            match self.weight(class, domain) {
                Ok(w) => {
                    for &p in positions {
                        if let Some(slot) = e.get_mut(p) {
                            *slot = sign * w;
                        }
                    }
                }
                Err(err) => warn!("{}, contribution zeroed", err),
            }
        }
        e
    }
}

/// JDA discrepancy matrix `C·e·eᵗ + Σ_c e_c·e_cᵗ`, normalized. Without
/// pseudo-labels only the scaled marginal term is used.
pub fn joint_mmd(
    ns: usize,
    nt: usize,
    source_labels: ArrayView1<usize>,
    pseudo_labels: Option<ArrayView1<usize>>,
) -> Result<Array2<f64>> {
    check_domains(ns, nt)?;
    if source_labels.len() != ns {
        return Err(shape_mismatch("source labels", ns, source_labels.len()));
    }
    if let Some(pseudo) = pseudo_labels {
        if pseudo.len() != nt {
            return Err(shape_mismatch("target pseudo-labels", nt, pseudo.len()));
        }
    }

    let index = ClassIndex::new(source_labels, pseudo_labels, nt);
    let n_classes = index.n_classes() as f64;
    let mut m = outer(&domain_indicator(ns, nt)) * n_classes;

    if pseudo_labels.is_some() {
        let mut conditional = Array2::zeros((ns + nt, ns + nt));
        for class in index.classes() {
            conditional += &outer(&index.class_indicator(class));
        }
        m += &conditional;
    }
    debug!(
        "joint MMD over {} classes, conditional term {}",
        index.n_classes(),
        if pseudo_labels.is_some() { "on" } else { "off" }
    );

    frobenius_normalize(&mut m)?;
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_centering_matrix() {
        let h = centering_matrix(4);
        assert_abs_diff_eq!(h[[0, 0]], 0.75);
        assert_abs_diff_eq!(h[[0, 1]], -0.25);
        for row in h.rows() {
            assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_domain_indicator() {
        let e = domain_indicator(2, 4);
        assert_eq!(e, array![0.5, 0.5, -0.25, -0.25, -0.25, -0.25]);
        assert_abs_diff_eq!(e.sum(), 0.0);
    }

    #[test]
    fn test_marginal_mmd_has_unit_norm() {
        for &(ns, nt) in &[(1, 1), (3, 7), (20, 5), (50, 50)] {
            let m = marginal_mmd(ns, nt).unwrap();
            assert_eq!(m.dim(), (ns + nt, ns + nt));
            assert_abs_diff_eq!(m.frobenius_norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_marginal_mmd_sign_pattern() {
        let m = marginal_mmd(2, 3).unwrap();
        assert!(m[[0, 1]] > 0.0);
        assert!(m[[3, 4]] > 0.0);
        assert!(m[[0, 3]] < 0.0);
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        assert!(matches!(marginal_mmd(0, 3), Err(TransferError::EmptyDomain("source"))));
        assert!(matches!(marginal_mmd(3, 0), Err(TransferError::EmptyDomain("target"))));
    }

    #[test]
    fn test_joint_mmd_without_pseudo_labels_matches_marginal() {
        let ys = array![1, 2, 1, 2];
        let joint = joint_mmd(4, 3, ys.view(), None).unwrap();
        let marginal = marginal_mmd(4, 3).unwrap();
        assert_eq!(joint, marginal);
    }

    #[test]
    fn test_joint_mmd_matches_hand_built() {
        let ys = array![1, 1, 2];
        let pseudo = array![1, 2, 2];
        let m = joint_mmd(3, 3, ys.view(), Some(pseudo.view())).unwrap();

        let third = 1.0 / 3.0;
        let e = array![third, third, third, -third, -third, -third];
        let e1 = array![0.5, 0.5, 0.0, -1.0, 0.0, 0.0];
        let e2 = array![0.0, 0.0, 1.0, 0.0, -0.5, -0.5];
        let raw = Array2::from_shape_fn((6, 6), |(i, j)| {
            2.0 * e[i] * e[j] + e1[i] * e1[j] + e2[i] * e2[j]
        });
        let norm = raw.iter().map(|v| v * v).sum::<f64>().sqrt();

        for (got, want) in m.iter().zip(raw.iter()) {
            assert_abs_diff_eq!(*got, want / norm, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_weight_per_domain() {
        let ys = array![1, 1, 2];
        let pseudo = array![1, 2, 2];
        let index = ClassIndex::new(ys.view(), Some(pseudo.view()), 3);
        assert_abs_diff_eq!(index.weight(1, Domain::Source).unwrap(), 0.5);
        assert_abs_diff_eq!(index.weight(1, Domain::Target).unwrap(), 1.0);
        assert_abs_diff_eq!(index.weight(2, Domain::Target).unwrap(), 0.5);
        assert!(matches!(
            index.weight(9, Domain::Source),
            Err(TransferError::EmptyClass { class: 9, domain: Domain::Source })
        ));
    }

    #[test]
    fn test_class_indicator_weights() {
        let ys = array![1, 1, 2];
        let pseudo = array![2, 1, 1, 1];
        let index = ClassIndex::new(ys.view(), Some(pseudo.view()), 4);

        let e1 = index.class_indicator(1);
        assert_eq!(e1.len(), 7);
        assert_abs_diff_eq!(e1[0], 0.5);
        assert_abs_diff_eq!(e1[2], 0.0);
        assert_abs_diff_eq!(e1[3], 0.0);
        assert_abs_diff_eq!(e1[4], -1.0 / 3.0);

        let e2 = index.class_indicator(2);
        assert_abs_diff_eq!(e2[2], 1.0);
        assert_abs_diff_eq!(e2[3], -1.0);
    }

    #[test]
    fn test_absent_target_class_is_zeroed() {
        let ys = array![1, 2, 3];
        let pseudo = array![1, 1];
        let index = ClassIndex::new(ys.view(), Some(pseudo.view()), 2);

        assert!(matches!(
            index.weight(3, Domain::Target),
            Err(TransferError::EmptyClass { class: 3, domain: Domain::Target })
        ));
        let e3 = index.class_indicator(3);
        assert_abs_diff_eq!(e3[2], 1.0);
        assert!(e3.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(e3.slice(ndarray::s![3..]).sum(), 0.0);

        let m = joint_mmd(3, 2, ys.view(), Some(pseudo.view())).unwrap();
        assert!(m.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(m.frobenius_norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_pseudo_class_is_ignored() {
        let ys = array![1, 2];
        let pseudo = array![7, 2];
        let index = ClassIndex::new(ys.view(), Some(pseudo.view()), 2);
        assert_eq!(index.classes().collect::<Vec<_>>(), vec![1, 2]);
        assert!(index.class_indicator(7).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_joint_mmd_shape_checks() {
        let ys = array![1, 2];
        let pseudo = array![1];
        assert!(matches!(
            joint_mmd(2, 2, ys.view(), Some(pseudo.view())),
            Err(TransferError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            joint_mmd(3, 2, ys.view(), None),
            Err(TransferError::ShapeMismatch { .. })
        ));
    }
}
