//! Integration test: compare a reduced model A against a model B that adds
//! level-1 predictors with random slopes, on the same data.

use approx::assert_relative_eq;
use mlm_r2_core::data::DataFrame;
use mlm_r2_core::decomposition::{Level, Measure};
use mlm_r2_core::{compare, decompose, DecompositionOptions, ModelSpec, R2Error};
use nalgebra::DMatrix;

fn create_test_data() -> DataFrame {
    // 4 clusters x 4 observations; columns by index:
    // 0 school, 1 salary_c, 2 control, 3 negative_c, 4 s_t_ratio
    let salary_c = vec![
        -1.5, -0.5, 0.5, 1.5, //
        -3.0, 1.0, 1.0, 1.0, //
        -0.2, 0.2, -0.4, 0.4, //
        2.0, -2.0, 0.0, 0.0,
    ];
    let negative_c = vec![
        0.5, -0.5, 1.0, -1.0, //
        0.0, 0.0, 0.3, -0.3, //
        -1.2, 0.4, 0.4, 0.4, //
        0.25, 0.25, -0.25, -0.25,
    ];
    let control = [0.0, 1.0, 1.0, 0.0]
        .iter()
        .flat_map(|&c| std::iter::repeat(c).take(4))
        .collect();
    let ratio = [12.0, 18.0, 15.0, 21.0]
        .iter()
        .flat_map(|&r| std::iter::repeat(r).take(4))
        .collect();
    let school: Vec<String> = (0..16).map(|i| format!("s{}", i / 4)).collect();
    let school_refs: Vec<&str> = school.iter().map(String::as_str).collect();

    let mut df = DataFrame::new();
    df.add_text_column("school", &school_refs).unwrap();
    df.add_float_column("salary_c", salary_c).unwrap();
    df.add_float_column("control", control).unwrap();
    df.add_float_column("negative_c", negative_c).unwrap();
    df.add_float_column("s_t_ratio", ratio).unwrap();
    df
}

/// Model A: negative_c (level 1), control and s_t_ratio (level 2).
fn model_a() -> ModelSpec {
    ModelSpec::builder()
        .intercept(4.5)
        .within_random(3usize, 0.33)
        .between(2usize, 0.05)
        .between(4usize, -0.03)
        .tau(DMatrix::from_row_slice(2, 2, &[0.45, 0.01, 0.01, 0.04]))
        .sigma2(0.62)
        .build()
        .unwrap()
}

/// Model B adds salary_c with a random slope.
fn model_b() -> ModelSpec {
    ModelSpec::builder()
        .intercept(4.35)
        .within_random(1usize, 0.0745)
        .within_random(3usize, 0.3108)
        .between(2usize, 0.0368)
        .between(4usize, -0.0353)
        .tau(DMatrix::from_row_slice(
            3,
            3,
            &[0.40, 0.01, 0.02, 0.01, 0.006, 0.002, 0.02, 0.002, 0.035],
        ))
        .sigma2(0.55)
        .build()
        .unwrap()
}

#[test]
fn test_deltas_equal_independent_subtraction() {
    let df = create_test_data();
    let opts = DecompositionOptions::new().with_graph(false);

    let cmp = compare(&df, &model_a(), &model_b(), opts).unwrap();
    let a = decompose(&df, &model_a(), opts).unwrap();
    let b = decompose(&df, &model_b(), opts).unwrap();

    assert_eq!(cmp.model_a, a);
    assert_eq!(cmp.model_b, b);

    for (name, delta) in cmp.named_differences() {
        let expected = b.measure(name).unwrap() - a.measure(name).unwrap();
        assert_relative_eq!(delta, expected, epsilon = 1e-15);
    }
}

#[test]
fn test_difference_layout_matches_r_squared_table() {
    let df = create_test_data();
    let cmp = compare(&df, &model_a(), &model_b(), DecompositionOptions::default()).unwrap();

    let keys: Vec<Measure> = cmp.differences.keys().collect();
    let expected: Vec<Measure> = cmp.model_a.r_squared.keys().collect();
    assert_eq!(keys, expected);
    assert_eq!(cmp.differences.levels(), &Level::ALL);

    assert!(cmp.differences.value(Measure::F1, Level::Within).is_some());
    assert!(cmp.differences.value(Measure::F2, Level::Within).is_none());
    assert!(cmp.differences.value(Measure::M, Level::Between).is_some());
    assert!(cmp.chart.is_some());
}

#[test]
fn test_adding_level1_predictor_raises_f1() {
    let df = create_test_data();
    let opts = DecompositionOptions::new().with_graph(false);
    let cmp = compare(&df, &model_a(), &model_b(), opts).unwrap();
    assert!(cmp.delta("f1").unwrap() > 0.0);
    assert!(cmp.delta("f_w").unwrap() > 0.0);
}

#[test]
fn test_comparison_requires_centering() {
    let df = create_test_data();
    let opts = DecompositionOptions::new().cluster_mean_centered(false);
    assert!(matches!(
        compare(&df, &model_a(), &model_b(), opts).unwrap_err(),
        R2Error::Unsupported(_)
    ));
}

#[test]
fn test_invalid_model_b_fails_whole_comparison() {
    let df = create_test_data();
    let bad_b = ModelSpec::builder()
        .intercept(4.35)
        .within("missing_column", 0.1)
        .tau(DMatrix::from_element(1, 1, 0.4))
        .sigma2(0.55)
        .build()
        .unwrap();
    let err = compare(&df, &model_a(), &bad_b, DecompositionOptions::default()).unwrap_err();
    assert!(matches!(err, R2Error::ColumnNotFound(_)));
}
