//! KL-divergence split criterion for binary responses.
//!
//! Each arm is summarized by its positive rate `p` and total weight `n`.
//! A node scores `sum_t KL(p_t || p_control)` over the treated arms; a split's
//! gain is the size-weighted child score minus the parent score, optionally
//! divided by a normalization factor that penalizes unbalanced splits.
//!
//! Child rates are shrunk toward the parent rate with `n_reg` pseudo-counts,
//! and an arm with too little weight in a child falls back to the parent rate.

use super::{SampleLimits, SplitCriterion, SplitGain};
use crate::repr::NodeSummary;
use crate::training::ForestParams;

/// Probabilities closer than this to 0 or 1 are treated as exactly 0 or 1.
const PROB_EPS: f64 = f32::EPSILON as f64;

/// Clamp applied to the reference distribution before taking logs.
const LOG_CLAMP: f64 = 1e-6;

/// KL divergence between Bernoulli(pk) and Bernoulli(qk).
///
/// Returns 0 when `qk` is (numerically) zero.
pub fn kl_divergence(pk: f64, qk: f64) -> f64 {
    if qk < PROB_EPS {
        return 0.0;
    }
    let q = qk.clamp(LOG_CLAMP, 1.0 - LOG_CLAMP);

    if pk < PROB_EPS {
        -(1.0 - q).ln()
    } else if 1.0 - pk < PROB_EPS {
        -q.ln()
    } else {
        pk * (pk / q).ln() + (1.0 - pk) * ((1.0 - pk) / (1.0 - q)).ln()
    }
}

/// `-p ln p`, zero for non-positive `p`.
#[inline]
fn entropy(p: f64) -> f64 {
    if p > 0.0 {
        -p * p.ln()
    } else {
        0.0
    }
}

/// `-p ln q`, zero for non-positive `q`.
#[inline]
fn cross_entropy(p: f64, q: f64) -> f64 {
    if q > 0.0 {
        -p * q.ln()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmRate {
    pub p: f64,
    pub n: f64,
}

#[derive(Debug, Clone)]
pub struct KlNode {
    rates: Vec<ArmRate>,
    score: f64,
}

#[derive(Debug, Clone)]
pub struct KlCriterion {
    limits: SampleLimits,
    n_reg: f64,
    alpha: f64,
    normalization: bool,
}

impl KlCriterion {
    pub fn new(params: &ForestParams) -> Self {
        Self {
            limits: SampleLimits {
                min_leaf: params.min_samples_leaf as f64,
                min_arm: params.min_samples_treatment as f64,
            },
            n_reg: params.n_reg as f64,
            alpha: params.alpha,
            normalization: params.normalization,
        }
    }

    /// Per-arm rates from `[arm][neg, pos]` weights.
    ///
    /// With a parent, arms above the treatment minimum are regularized
    /// toward the parent rate and the rest take the parent rate as-is.
    fn rates(&self, counts: &[f64], parent: Option<&[ArmRate]>) -> Vec<ArmRate> {
        counts
            .chunks_exact(2)
            .enumerate()
            .map(|(arm, c)| {
                let (neg, pos) = (c[0], c[1]);
                let n = neg + pos;
                let p = match parent {
                    None if n > 0.0 => pos / n,
                    None => 0.0,
                    Some(parent) => {
                        let pp = parent[arm].p;
                        if n > self.limits.min_arm {
                            (pos + pp * self.n_reg) / (n + self.n_reg)
                        } else {
                            pp
                        }
                    }
                };
                ArmRate { p, n }
            })
            .collect()
    }

    /// Divergence of every treated arm from control.
    fn score(rates: &[ArmRate]) -> f64 {
        let Some((control, treated)) = rates.split_first() else {
            return 0.0;
        };
        treated.iter().map(|r| kl_divergence(r.p, control.p)).sum()
    }

    /// Gain normalization factor. Penalizes splits that separate treated from
    /// control rows and splits with many small children.
    fn normalization_factor(&self, parent: &[ArmRate], left: &[ArmRate]) -> f64 {
        let n_c = parent[0].n;
        let n_c_left = left[0].n;
        let n_tr: f64 = parent[1..].iter().map(|r| r.n).sum();
        let n_tr_left: f64 = left[1..].iter().map(|r| r.n).sum();
        let n_all = n_tr + n_c;

        let pt_a = n_tr_left / (n_tr + 0.1);
        let pc_a = n_c_left / (n_c + 0.1);

        let mut norm = self.alpha
            * cross_entropy(n_tr / n_all, n_c / n_all)
            * kl_divergence(pt_a, pc_a);

        for (arm, left_arm) in parent[1..].iter().zip(&left[1..]) {
            let e_i = arm.n;
            let pt_a_i = left_arm.n / (e_i + 0.1);
            norm += (1.0 - self.alpha)
                * cross_entropy(e_i / (e_i + n_c), n_c / (e_i + n_c))
                * kl_divergence(pt_a_i, pc_a);
            norm += e_i / n_all * entropy(pt_a_i);
        }

        norm += n_c / n_all * entropy(pc_a);
        norm + 0.5
    }
}

impl SplitCriterion for KlCriterion {
    type Node = KlNode;

    #[inline]
    fn n_stats(&self) -> usize {
        2
    }

    #[inline]
    fn accumulate(&self, stats: &mut [f64], response: f32, weight: f32) {
        let slot = usize::from(response > 0.5);
        stats[slot] += f64::from(weight);
    }

    fn node(&self, totals: &[f64], _n_arms: usize) -> KlNode {
        let rates = self.rates(totals, None);
        let score = Self::score(&rates);
        KlNode { rates, score }
    }

    fn summary(&self, node: &KlNode, _parent: Option<&NodeSummary>) -> NodeSummary {
        NodeSummary {
            value: node.rates.iter().map(|r| r.p as f32).collect(),
            weight: node.rates.iter().map(|r| r.n as f32).collect(),
        }
    }

    fn evaluate(&self, parent: &KlNode, left: &[f64], right: &[f64]) -> Option<SplitGain> {
        let left_rates = self.rates(left, Some(&parent.rates));
        let right_rates = self.rates(right, Some(&parent.rates));

        let left_n: Vec<f64> = left_rates.iter().map(|r| r.n).collect();
        let right_n: Vec<f64> = right_rates.iter().map(|r| r.n).collect();
        if !self.limits.admits(&left_n, &right_n) {
            return None;
        }

        let left_score = Self::score(&left_rates);
        let right_score = Self::score(&right_rates);
        let ln: f64 = left_n.iter().sum();
        let rn: f64 = right_n.iter().sum();
        let n = ln + rn;
        let p_left = ln / n;

        let mut gain = p_left * left_score + (1.0 - p_left) * right_score - parent.score;
        let importance = ln * left_score + rn * right_score - n * parent.score;

        if self.normalization {
            gain /= self.normalization_factor(&parent.rates, &left_rates);
        }

        gain.is_finite().then_some(SplitGain { gain, importance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn criterion(normalization: bool) -> KlCriterion {
        KlCriterion::new(&ForestParams {
            min_samples_leaf: 0,
            min_samples_treatment: 0,
            n_reg: 0,
            normalization,
            ..ForestParams::default()
        })
    }

    #[test]
    fn kl_known_values() {
        assert_abs_diff_eq!(kl_divergence(0.5, 0.5), 0.0, epsilon = 1e-12);
        let expected = 0.2 * (0.2f64 / 0.4).ln() + 0.8 * (0.8f64 / 0.6).ln();
        assert_abs_diff_eq!(kl_divergence(0.2, 0.4), expected, epsilon = 1e-12);
    }

    #[test]
    fn kl_edge_cases() {
        // reference at zero
        assert_eq!(kl_divergence(0.3, 0.0), 0.0);
        // pk at zero: -ln(1 - q)
        assert_abs_diff_eq!(kl_divergence(0.0, 0.5), 2f64.ln(), epsilon = 1e-12);
        // pk at one: -ln(q)
        assert_abs_diff_eq!(kl_divergence(1.0, 0.25), 4f64.ln(), epsilon = 1e-12);
        // q clamped away from one
        assert!(kl_divergence(0.0, 1.0).is_finite());
    }

    #[test]
    fn kl_is_non_negative() {
        for i in 1..20 {
            for j in 1..20 {
                let (p, q) = (i as f64 / 20.0, j as f64 / 20.0);
                assert!(kl_divergence(p, q) >= -1e-12);
            }
        }
    }

    #[test]
    fn node_rates_and_score() {
        let kl = criterion(false);
        // control: 6 neg, 4 pos; treated: 2 neg, 8 pos
        let node = kl.node(&[6.0, 4.0, 2.0, 8.0], 2);
        let summary = kl.summary(&node, None);
        assert_abs_diff_eq!(summary.value[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(summary.value[1], 0.8, epsilon = 1e-6);
        assert_eq!(summary.weight, vec![10.0, 10.0]);
        assert_abs_diff_eq!(node.score, kl_divergence(0.8, 0.4), epsilon = 1e-12);
    }

    #[test]
    fn regularization_shrinks_toward_parent() {
        let kl = KlCriterion::new(&ForestParams {
            min_samples_treatment: 5,
            n_reg: 10,
            ..ForestParams::default()
        });
        let parent = [ArmRate { p: 0.5, n: 100.0 }, ArmRate { p: 0.2, n: 100.0 }];
        // arm 0: 20 rows, 18 positive -> (18 + 0.5*10) / 30
        // arm 1: 3 rows -> below minimum, takes parent rate
        let rates = kl.rates(&[2.0, 18.0, 1.0, 2.0], Some(&parent));
        assert_abs_diff_eq!(rates[0].p, 23.0 / 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rates[1].p, 0.2, epsilon = 1e-12);
        assert_eq!(rates[1].n, 3.0);
    }

    #[test]
    fn separating_split_has_positive_gain() {
        let kl = criterion(false);
        // Treatment helps only on the left.
        let left = [5.0, 5.0, 1.0, 9.0];
        let right = [5.0, 5.0, 5.0, 5.0];
        let parent_totals: Vec<f64> = left.iter().zip(&right).map(|(a, b)| a + b).collect();
        let parent = kl.node(&parent_totals, 2);
        let split = kl.evaluate(&parent, &left, &right).unwrap();
        assert!(split.gain > 0.0);

        let expected = 0.5 * kl_divergence(0.9, 0.5) + 0.5 * 0.0 - parent.score;
        assert_abs_diff_eq!(split.gain, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(split.importance, 40.0 * expected, epsilon = 1e-9);
    }

    #[test]
    fn normalization_divides_gain() {
        let left = [5.0, 5.0, 1.0, 9.0];
        let right = [5.0, 5.0, 5.0, 5.0];
        let totals: Vec<f64> = left.iter().zip(&right).map(|(a, b)| a + b).collect();

        let raw = criterion(false);
        let normed = criterion(true);
        let g_raw = raw.evaluate(&raw.node(&totals, 2), &left, &right).unwrap();
        let g_norm = normed.evaluate(&normed.node(&totals, 2), &left, &right).unwrap();

        // Both arms split evenly, so the KL terms vanish and only the
        // entropy terms and the constant remain.
        let share = 10.0 / 20.1;
        let factor = 0.5 + entropy(share);
        assert_abs_diff_eq!(g_norm.gain, g_raw.gain / factor, epsilon = 1e-12);
        assert_eq!(g_norm.importance, g_raw.importance);
    }

    #[test]
    fn min_samples_reject_split() {
        let kl = KlCriterion::new(&ForestParams {
            min_samples_leaf: 15,
            min_samples_treatment: 0,
            ..ForestParams::default()
        });
        let left = [2.0, 2.0, 2.0, 2.0];
        let right = [10.0, 10.0, 10.0, 10.0];
        let totals: Vec<f64> = left.iter().zip(&right).map(|(a, b)| a + b).collect();
        assert!(kl.evaluate(&kl.node(&totals, 2), &left, &right).is_none());
    }
}
