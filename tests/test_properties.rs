//! Property-based tests for thresholds, sampling and the sequential test.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use statrs::distribution::{Binomial, Discrete};

use ballot_pvalue::district::macro_group_labels;
use ballot_pvalue::log_factorial::LogFactorialCache;
use ballot_pvalue::simulation::{log_likelihood, log_probabilities, MultinomialSampler, SequentialTester};
use ballot_pvalue::thresholds::{threshold_for_n, ThresholdTable};
use ballot_pvalue::types::StopReason;

/// Strategy: a probability vector over 2..=5 candidates with strictly positive entries.
fn probs_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1..100u32, 2..=5).prop_map(|w| {
        let total: u32 = w.iter().sum();
        w.iter().map(|&x| x as f64 / total as f64).collect()
    })
}

/// Strategy: probabilities plus an observed count vector of the same length.
fn ballot_box_strategy() -> impl Strategy<Value = (Vec<u32>, Vec<f64>)> {
    probs_strategy().prop_flat_map(|r| {
        let c = r.len();
        (prop::collection::vec(0..15u32, c), Just(r))
    })
    .prop_filter("ballot box must hold votes", |(x, _)| x.iter().sum::<u32>() > 0)
}

/// `P(Binomial(n, mu) ≤ z − 1)`, summed term by term from k = 0.
fn cumulative_below(n: u64, mu: f64, z: u64) -> f64 {
    let binom = Binomial::new(mu, n).unwrap();
    (0..z).map(|k| binom.pmf(k)).sum()
}

proptest! {
    // 1. z(n) satisfies the confidence condition and no smaller z does
    #[test]
    fn threshold_is_minimal(n in 1..2000u64, mu_power in 1..=4i32, alpha_power in 1..=6i32) {
        let mu = 10f64.powi(-mu_power);
        let alpha = 10f64.powi(-alpha_power);
        let z = threshold_for_n(n, mu, alpha).unwrap();
        prop_assert!(z >= 1 && z <= n, "z={z} n={n}");
        if z < n {
            prop_assert!(cumulative_below(n, mu, z) >= 1.0 - alpha);
        }
        prop_assert!(cumulative_below(n, mu, z - 1) < 1.0 - alpha);
    }

    // 2. A stricter α never lowers the threshold
    #[test]
    fn threshold_monotone_in_alpha(n in 1..2000u64, mu_power in 1..=4i32, alpha_power in 1..=6i32) {
        let mu = 10f64.powi(-mu_power);
        let loose = threshold_for_n(n, mu, 10f64.powi(-alpha_power)).unwrap();
        let strict = threshold_for_n(n, mu, 10f64.powi(-alpha_power - 1)).unwrap();
        prop_assert!(strict >= loose, "loose={loose} strict={strict}");
    }

    // 3. Thresholds never decrease along the ladder
    #[test]
    fn threshold_table_monotone(mu_power in 1..=5i32, alpha_power in 1..=7i32) {
        let table = ThresholdTable::from_powers(1, 5, mu_power, alpha_power).unwrap();
        let zs: Vec<u64> = table.iter().map(|(_, z)| z).collect();
        prop_assert_eq!(zs.len(), 5);
        for w in zs.windows(2) {
            prop_assert!(w[0] <= w[1], "{zs:?}");
        }
    }

    // 4. Multinomial draws always account for every ballot
    #[test]
    fn multinomial_preserves_total(r in probs_strategy(), total in 0..500u64, seed in any::<u64>()) {
        let sampler = MultinomialSampler::new(total, &r);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut out = vec![0u32; r.len()];
        for _ in 0..20 {
            sampler.sample_into(&mut rng, &mut out).unwrap();
            prop_assert_eq!(out.iter().map(|&c| c as u64).sum::<u64>(), total);
        }
    }

    // 5. log_likelihood agrees with the closed-form expression
    #[test]
    fn log_likelihood_matches_formula((x, r) in ballot_box_strategy()) {
        let lgac = LogFactorialCache::new(100);
        let log_p = log_probabilities(&r);
        let ll = log_likelihood(&x, &log_p, &lgac);
        let expected: f64 = x
            .iter()
            .zip(&r)
            .map(|(&c, &p)| c as f64 * p.ln() - statrs::function::factorial::ln_factorial(c as u64))
            .sum();
        prop_assert!((ll - expected).abs() < 1e-9, "ll={ll} expected={expected}");
    }

    // 6. Sequential test results are well formed and consistent with the table
    #[test]
    fn sequential_result_consistent((x, r) in ballot_box_strategy(), seed in any::<u64>()) {
        let table = ThresholdTable::from_powers(1, 2, 5, 7).unwrap();
        let lgac = LogFactorialCache::new(100);
        let tester = SequentialTester::full_ladder(&table, &lgac);
        let result = tester.test(&x, &r, seed).unwrap();

        prop_assert!((0.0..=1.0).contains(&result.p_value));
        prop_assert!(result.hits <= result.samples);
        prop_assert_eq!(result.samples, 10u64.pow(result.exponent));
        let z = table.get(result.exponent).unwrap();
        match result.stop {
            StopReason::ThresholdReached => prop_assert!(result.hits >= z),
            StopReason::LadderExhausted => {
                prop_assert_eq!(result.exponent, 2);
                prop_assert!(result.hits < z);
            }
        }

        let again = tester.test(&x, &r, seed).unwrap();
        prop_assert_eq!(result, again);
    }

    // 7. Macro-group labels cover the age ranges without gaps
    #[test]
    fn macro_labels_cover_ranges(cuts in prop::collection::btree_set(1..8usize, 0..7)) {
        let mut bounds: Vec<usize> = cuts.into_iter().collect();
        bounds.push(8);
        let labels = macro_group_labels(&bounds).unwrap();
        prop_assert_eq!(labels.len(), bounds.len());
        prop_assert!(labels[0].starts_with("18"));
        prop_assert!(labels.last().unwrap().ends_with('+'));
        for label in &labels[..labels.len() - 1] {
            prop_assert!(!label.ends_with('+'), "{labels:?}");
        }
    }
}
