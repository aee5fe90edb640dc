use adoptsim::{Execution, Params, SimError, simulate};
use proptest::prelude::*;

fn valid_params() -> impl Strategy<Value = Params> {
    (
        1usize..1500,
        0.2f64..0.6,
        0.0f64..0.1,
        0.1f64..0.8,
        0.0f64..30000.0,
        1usize..40,
        any::<u64>(),
    )
        .prop_map(
            |(population_size, gini, p, q, income_threshold, time_periods, random_seed)| Params {
                population_size,
                gini,
                p,
                q,
                income_threshold,
                time_periods,
                random_seed,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn runs_satisfy_adoption_invariants(params in valid_params()) {
        let result = match simulate(&params, Execution::Sequential) {
            Ok(result) => result,
            Err(SimError::InsufficientMarket { required, available }) => {
                prop_assert_eq!(required, params.n_initial_adopters());
                prop_assert!(available < required);
                return Ok(());
            }
            Err(error) => return Err(TestCaseError::fail(format!("{error}"))),
        };

        let timeline = result.timeline();
        prop_assert_eq!(timeline.len(), params.time_periods);
        prop_assert_eq!(timeline[0], params.n_initial_adopters());
        prop_assert!(timeline.windows(2).all(|w| w[0] <= w[1]));

        let affordable = result.affordable();
        let adopted = result.adopted();
        prop_assert_eq!(affordable.len(), params.population_size);
        prop_assert!(adopted.iter().zip(affordable).all(|(&a, &ok)| !a || ok));
        prop_assert!(result.initial_adopters().iter().all(|&i| adopted[i] && affordable[i]));

        prop_assert_eq!(adopted.iter().filter(|&&a| a).count(), result.final_adopters());
        prop_assert!(result.final_adopters() <= result.addressable_market());
        prop_assert!((0.0..=100.0).contains(&result.market_penetration()));
    }

    #[test]
    fn same_seed_reproduces_run(params in valid_params(), n_threads in 2usize..6) {
        let first = simulate(&params, Execution::Sequential);
        let second = simulate(&params, Execution::Sequential);
        let parallel = simulate(&params, Execution::with_threads(n_threads));
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &parallel);
    }
}

#[test]
fn reference_scenario() {
    let params = Params {
        population_size: 1000,
        gini: 0.45,
        p: 0.02,
        q: 0.45,
        income_threshold: 15000.0,
        time_periods: 30,
        random_seed: 42,
    };
    let result = simulate(&params, Execution::Sequential).expect("failed to simulate");

    assert_eq!(result.timeline().len(), 30);
    assert_eq!(result.timeline()[0], 10);
    assert!(result.timeline().windows(2).all(|w| w[0] <= w[1]));
    assert!(result.addressable_market() >= 10);

    let again = simulate(&params, Execution::Sequential).expect("failed to simulate");
    assert_eq!(result.incomes(), again.incomes());
    assert_eq!(result.affordable(), again.affordable());
    assert_eq!(result.timeline(), again.timeline());
}

#[test]
fn small_rich_market_is_insufficient() {
    let params = Params {
        population_size: 100,
        gini: 0.2,
        income_threshold: 30000.0,
        ..Params::default()
    };
    assert_eq!(
        simulate(&params, Execution::Sequential).err(),
        Some(SimError::InsufficientMarket {
            required: 10,
            available: 1
        })
    );
}

#[test]
fn single_period_records_initial_adopters_only() {
    let params = Params {
        time_periods: 1,
        p: 1.0,
        ..Params::default()
    };
    let result = simulate(&params, Execution::Sequential).expect("failed to simulate");
    assert_eq!(result.timeline(), &[10]);
    assert_eq!(result.adopted().iter().filter(|&&a| a).count(), 10);
    assert_eq!(result.takeoff_period(), None);
}

#[test]
fn invalid_parameters_fail_before_running() {
    let cases = [
        Params {
            population_size: 0,
            ..Params::default()
        },
        Params {
            gini: 0.0,
            ..Params::default()
        },
        Params {
            p: -0.1,
            ..Params::default()
        },
        Params {
            income_threshold: -5.0,
            ..Params::default()
        },
    ];
    for params in cases {
        assert!(matches!(
            simulate(&params, Execution::Sequential),
            Err(SimError::InvalidParameter { .. })
        ));
    }
}
