//! Two-sample comparison: Mann-Whitney U-test with the Vargha-Delaney A effect size.
//!
//! The p-value follows the usual "auto" policy of statistical packages: the
//! exact null distribution of U is used when at least one sample is small and
//! there are no ties, the tie- and continuity-corrected normal approximation
//! otherwise.

use std::cmp::Ordering;

use crate::types::{Comparison, EffectSize, StatsError};

/// Largest sample size for which the exact distribution is still used
const EXACT_MAX_SIZE: usize = 8;

/// A value that can take part in a rank comparison
pub trait SampleValue: Copy {
    fn to_f64(self) -> f64;
}

impl SampleValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

impl SampleValue for f32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl SampleValue for u32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl SampleValue for u64 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl SampleValue for i32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl SampleValue for bool {
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
}

/// Compare two samples. `effect_size` is the probability that a value drawn
/// from `first` exceeds one drawn from `second`, ties counting one half.
pub fn compare<A: SampleValue, B: SampleValue>(
    first: &[A],
    second: &[B],
) -> Result<Comparison, StatsError> {
    let first = to_finite(first)?;
    let second = to_finite(second)?;

    let n1 = first.len();
    let n2 = second.len();

    let mut pooled: Vec<f64> = first.iter().chain(second.iter()).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&mut pooled, &first, &second);
    let rank_sum_first: f64 = ranks.iter().take(n1).sum();

    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let u1 = rank_sum_first - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;

    let has_ties = tie_term > 0.0;
    let p_value = if (n1 <= EXACT_MAX_SIZE || n2 <= EXACT_MAX_SIZE) && !has_ties {
        exact_p_value(u1.max(u2), n1, n2)
    } else {
        asymptotic_p_value(u1.max(u2), n1, n2, tie_term)
    };

    let effect_size = u1 / (n1f * n2f);
    Ok(Comparison {
        u_statistic: u1,
        p_value,
        effect_size,
        label: EffectSize::from_distance((effect_size - 0.5).abs()),
    })
}

/// A Bernoulli sample of `trials` values: `hits` trues followed by misses
pub fn bernoulli_sample(hits: u32, trials: u32) -> Result<Vec<bool>, StatsError> {
    if hits > trials {
        return Err(StatsError::TooManyHits { hits, trials });
    }
    let mut sample = vec![true; hits as usize];
    sample.resize(trials as usize, false);
    Ok(sample)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn to_finite<T: SampleValue>(sample: &[T]) -> Result<Vec<f64>, StatsError> {
    if sample.is_empty() {
        return Err(StatsError::EmptySample);
    }
    sample
        .iter()
        .map(|v| {
            let x = v.to_f64();
            if x.is_finite() {
                Ok(x)
            } else {
                Err(StatsError::NonFinite(x))
            }
        })
        .collect()
}

/// Mid-ranks of `first ++ second` in input order, and the tie term `sum(t^3 - t)`.
fn rank_with_ties(sorted: &mut [f64], first: &[f64], second: &[f64]) -> (Vec<f64>, f64) {
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    // Distinct values with their mid-rank
    let mut midranks: Vec<(f64, f64)> = Vec::new();
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        // Ranks are 1-based: positions i..=j hold ranks i+1..=j+1
        midranks.push((sorted[i], (i + j) as f64 / 2.0 + 1.0));
        i = j + 1;
    }

    let rank_of = |x: f64| -> f64 {
        let idx = midranks
            .binary_search_by(|(v, _)| v.partial_cmp(&x).unwrap_or(Ordering::Equal))
            .unwrap_or_else(|idx| idx.min(midranks.len() - 1));
        midranks[idx].1
    };

    let ranks = first
        .iter()
        .chain(second.iter())
        .map(|&x| rank_of(x))
        .collect();
    (ranks, tie_term)
}

/// `2 * P(U >= u)` under the null hypothesis, counting arrangements exactly
fn exact_p_value(u: f64, n1: usize, n2: usize) -> f64 {
    let (small, large) = if n1 <= n2 { (n1, n2) } else { (n2, n1) };
    let max_u = n1 * n2;
    // The null distribution is symmetric: P(U >= u) = P(U <= max_u - u)
    let tail = max_u - (u.round().max(0.0) as usize).min(max_u);

    // Coefficients of the Gaussian binomial [n1 + n2 choose small]_q up to degree `tail`,
    // as the product of (1 - q^(large + k)) / (1 - q^k) for k in 1..=small
    let mut counts = vec![0.0f64; tail + 1];
    counts[0] = 1.0;
    let mut total = 1.0f64;
    for k in 1..=small {
        let drop = large + k;
        for d in (drop..=tail).rev() {
            counts[d] -= counts[d - drop];
        }
        for d in k..=tail {
            counts[d] += counts[d - k];
        }
        total = total * (large + k) as f64 / k as f64;
    }

    let lower: f64 = counts.iter().sum();
    (2.0 * lower / total).clamp(0.0, 1.0)
}

/// Normal approximation with tie and continuity correction
fn asymptotic_p_value(u: f64, n1: usize, n2: usize, tie_term: f64) -> f64 {
    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let n = n1f + n2f;
    let mu = n1f * n2f / 2.0;
    let variance = n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        // Every value tied: no evidence of a difference
        return 1.0;
    }
    let z = (u - mu - 0.5) / variance.sqrt();
    (2.0 * normal_sf(z)).clamp(0.0, 1.0)
}

/// Survival function of the standard normal distribution
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, fractional error below 1.2e-7)
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let tau = t
        * (-z * z - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398
                                    + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277)))))))))
            .exp();
    if x >= 0.0 { tau } else { 2.0 - tau }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn identical_samples_have_no_effect() {
        let a = [0.4, 0.4, 0.4];
        let result = compare(&a, &a).unwrap();
        assert!((result.effect_size - 0.5).abs() < EPS);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.u_statistic, 4.5);
        assert_eq!(result.label, EffectSize::Negligible);
    }

    #[test]
    fn disjoint_samples_use_exact_distribution() {
        let result = compare(&[0.5, 0.6, 0.7], &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(result.u_statistic, 9.0);
        assert_eq!(result.effect_size, 1.0);
        assert_eq!(result.label, EffectSize::Large);
        // One of C(6,3) = 20 arrangements is at least as extreme on each side
        assert!((result.p_value - 0.1).abs() < EPS);
    }

    #[test]
    fn exact_distribution_matches_enumeration() {
        // Every way to place 4 first-sample values among 9 ranks
        let (n1, n2) = (4usize, 5usize);
        let mut histogram = vec![0u32; n1 * n2 + 1];
        for mask in 0u32..(1 << (n1 + n2)) {
            if mask.count_ones() as usize != n1 {
                continue;
            }
            let rank_sum: usize = (0..n1 + n2)
                .filter(|&b| mask & (1 << b) != 0)
                .map(|b| b + 1)
                .sum();
            histogram[rank_sum - n1 * (n1 + 1) / 2] += 1;
        }
        let total: u32 = histogram.iter().sum();
        assert_eq!(total, 126);
        for u in 10..=20 {
            let upper: u32 = histogram[u..].iter().sum();
            let expected = (2.0 * f64::from(upper) / f64::from(total)).min(1.0);
            assert!((exact_p_value(u as f64, n1, n2) - expected).abs() < EPS, "u = {u}");
            assert!((exact_p_value(u as f64, n2, n1) - expected).abs() < EPS, "u = {u}");
        }
    }

    #[test]
    fn lopsided_samples_stay_exact() {
        let many: Vec<f64> = (0..500).map(|x| f64::from(x) + 10.0).collect();
        let few = [1.0, 2.0, 3.0];
        let expected = 2.0 / (503.0 * 502.0 * 501.0 / 6.0);

        let result = compare(&many, &few).unwrap();
        assert_eq!(result.u_statistic, 1500.0);
        assert!((result.p_value - expected).abs() / expected < 1e-9);
        let swapped = compare(&few, &many).unwrap();
        assert!((swapped.p_value - expected).abs() / expected < 1e-9);

        let wide: Vec<f64> = (0..3000).map(f64::from).collect();
        let narrow: Vec<f64> = (0..8).map(|x| f64::from(x) * 375.0 + 187.5).collect();
        let result = compare(&wide, &narrow).unwrap();
        assert!(result.p_value > 0.9 && result.p_value <= 1.0);
    }

    #[test]
    fn reversed_samples_mirror_effect() {
        let a = [3.0, 1.0, 4.0, 1.0, 5.0];
        let b = [9.0, 2.0, 6.0];
        let ab = compare(&a, &b).unwrap();
        let ba = compare(&b, &a).unwrap();
        assert!((ab.effect_size + ba.effect_size - 1.0).abs() < EPS);
        assert!((ab.p_value - ba.p_value).abs() < EPS);
    }

    #[test]
    fn midranks_for_ties() {
        // pooled: 1 2 2 3 -> ranks 1, 2.5, 2.5, 4
        let result = compare(&[1.0, 2.0], &[2.0, 3.0]).unwrap();
        assert_eq!(result.u_statistic, 0.5);
        assert_eq!(result.effect_size, 0.125);
    }

    #[test]
    fn tied_samples_use_normal_approximation() {
        // n1 = n2 = 3, U1 = 8, two tied pairs give a tie term of 12
        let result = compare(&[2.0, 3.0, 3.0], &[1.0, 1.0, 2.5]).unwrap();
        assert_eq!(result.u_statistic, 8.0);
        let variance: f64 = 9.0 / 12.0 * (7.0 - 12.0 / 30.0);
        let z = (8.0 - 4.5 - 0.5) / variance.sqrt();
        assert!((result.p_value - 2.0 * normal_sf(z)).abs() < EPS);
    }

    #[test]
    fn large_samples_use_normal_approximation() {
        let a: Vec<f64> = (0..20).map(f64::from).collect();
        let b: Vec<f64> = (10..30).map(|x| f64::from(x) + 0.5).collect();
        let result = compare(&a, &b).unwrap();
        assert!(result.effect_size < 0.5);
        assert!(result.p_value > 0.0 && result.p_value < 0.05);
    }

    #[test]
    fn boolean_samples_are_coerced() {
        let hits = bernoulli_sample(3, 4).unwrap();
        let misses = bernoulli_sample(0, 4).unwrap();
        assert_eq!(hits, vec![true, true, true, false]);
        let result = compare(&hits, &misses).unwrap();
        assert!((result.effect_size - 0.875).abs() < EPS);
    }

    #[test]
    fn rejects_empty_and_overfull_input() {
        let empty: [f64; 0] = [];
        assert_eq!(compare(&empty, &[1.0]), Err(StatsError::EmptySample));
        assert_eq!(compare(&[1.0], &empty), Err(StatsError::EmptySample));
        assert_eq!(
            bernoulli_sample(5, 4),
            Err(StatsError::TooManyHits { hits: 5, trials: 4 })
        );
        assert!(matches!(
            compare(&[f64::NAN], &[1.0]),
            Err(StatsError::NonFinite(_))
        ));
    }

    #[test]
    fn label_boundaries_are_exclusive() {
        assert_eq!(EffectSize::from_distance(0.0), EffectSize::Negligible);
        assert_eq!(EffectSize::from_distance(0.0599), EffectSize::Negligible);
        assert_eq!(EffectSize::from_distance(0.06), EffectSize::Small);
        assert_eq!(EffectSize::from_distance(0.1399), EffectSize::Small);
        assert_eq!(EffectSize::from_distance(0.14), EffectSize::Medium);
        assert_eq!(EffectSize::from_distance(0.2099), EffectSize::Medium);
        assert_eq!(EffectSize::from_distance(0.21), EffectSize::Large);
        assert_eq!(EffectSize::from_distance(0.5), EffectSize::Large);
    }

    #[test]
    fn normal_tail_matches_known_values() {
        assert!((normal_sf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_sf(1.959964) - 0.025).abs() < 1e-6);
        assert!((normal_sf(-1.959964) - 0.975).abs() < 1e-6);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[0.5, 0.6, 0.7]) - 0.6).abs() < EPS);
    }
}
