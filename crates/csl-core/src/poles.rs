//! Ordered complex pole lists.
//!
//! A [`PoleSet`] is used both as a desired placement target and as the
//! computed spectrum of a matrix. Comparisons between the two are always
//! tolerance based, never exact.

use std::fmt;

use crate::numeric::Tolerances;

pub type Complex64 = nalgebra::Complex<f64>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoleSet(Vec<Complex64>);

fn close(a: Complex64, b: Complex64, tol: Tolerances) -> bool {
    (a - b).norm() <= tol.bound(a.norm(), b.norm())
}

impl PoleSet {
    pub fn new(poles: Vec<Complex64>) -> Self {
        Self(poles)
    }

    /// Poles on the real axis.
    pub fn from_real(values: &[f64]) -> Self {
        Self(values.iter().map(|&re| Complex64::new(re, 0.0)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Complex64> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Complex64> {
        self.0
    }

    /// Copy sorted by real part, then imaginary part.
    pub fn sorted(&self) -> PoleSet {
        let mut poles = self.0.clone();
        poles.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));
        PoleSet(poles)
    }

    /// Largest real part (spectral abscissa), `None` for an empty set.
    pub fn max_real_part(&self) -> Option<f64> {
        self.0.iter().map(|p| p.re).reduce(f64::max)
    }

    /// Multiset comparison: every pole of `self` pairs with a distinct pole
    /// of `other` within tolerance.
    pub fn matches(&self, other: &PoleSet, tol: Tolerances) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut used = vec![false; other.len()];
        for &p in &self.0 {
            let nearest = other
                .0
                .iter()
                .enumerate()
                .filter(|(j, _)| !used[*j])
                .min_by(|(_, a), (_, b)| (p - **a).norm().total_cmp(&(p - **b).norm()));
            match nearest {
                Some((j, &q)) if close(p, q, tol) => used[j] = true,
                _ => return false,
            }
        }
        true
    }

    /// Distinct pole values with their multiplicities, in first-seen order.
    pub fn multiplicities(&self, tol: Tolerances) -> Vec<(Complex64, usize)> {
        let mut groups: Vec<(Complex64, usize)> = Vec::new();
        for &p in &self.0 {
            match groups.iter_mut().find(|(q, _)| close(p, *q, tol)) {
                Some((_, count)) => *count += 1,
                None => groups.push((p, 1)),
            }
        }
        groups
    }

    /// First complex pole whose conjugate does not appear equally often.
    pub fn first_unpaired(&self, tol: Tolerances) -> Option<Complex64> {
        for &p in &self.0 {
            if p.im.abs() <= tol.bound(p.re, 0.0) {
                continue;
            }
            let same = self.0.iter().filter(|&&q| close(p, q, tol)).count();
            let conj = self.0.iter().filter(|&&q| close(p.conj(), q, tol)).count();
            if same != conj {
                return Some(p);
            }
        }
        None
    }
}

impl From<Vec<Complex64>> for PoleSet {
    fn from(poles: Vec<Complex64>) -> Self {
        Self(poles)
    }
}

impl FromIterator<Complex64> for PoleSet {
    fn from_iter<I: IntoIterator<Item = Complex64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PoleSet {
    type Item = &'a Complex64;
    type IntoIter = std::slice::Iter<'a, Complex64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if p.im == 0.0 {
                write!(f, "{}", p.re)?;
            } else {
                write!(f, "{}", p)?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn matches_ignores_order() {
        let a = PoleSet::from_real(&[-1.0, -2.0]);
        let b = PoleSet::from_real(&[-2.0 + 1e-9, -1.0]);
        assert!(a.matches(&b, Tolerances::eigen()));
        assert!(!a.matches(&PoleSet::from_real(&[-1.0, -3.0]), Tolerances::eigen()));
        assert!(!a.matches(&PoleSet::from_real(&[-1.0]), Tolerances::eigen()));
    }

    #[test]
    fn multiplicities_group_close_values() {
        let p = PoleSet::from_real(&[-1.0, -1.0 + 1e-12, -2.0, -1.0]);
        let groups = p.multiplicities(Tolerances::eigen());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1, 3);
        assert_eq!(groups[1].1, 1);
    }

    #[test]
    fn conjugate_pairs_detected() {
        let ok = PoleSet::new(vec![c(-1.0, 2.0), c(-1.0, -2.0), c(-3.0, 0.0)]);
        assert_eq!(ok.first_unpaired(Tolerances::eigen()), None);

        let bad = PoleSet::new(vec![c(-1.0, 2.0), c(-3.0, 0.0)]);
        assert_eq!(bad.first_unpaired(Tolerances::eigen()), Some(c(-1.0, 2.0)));
    }

    #[test]
    fn sorted_and_abscissa() {
        let p = PoleSet::from_real(&[-1.0, -5.0, -2.0]);
        assert_eq!(p.sorted(), PoleSet::from_real(&[-5.0, -2.0, -1.0]));
        assert_eq!(p.max_real_part(), Some(-1.0));
        assert_eq!(PoleSet::default().max_real_part(), None);
    }
}
