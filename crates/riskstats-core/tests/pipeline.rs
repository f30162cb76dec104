//! End-to-end scenarios over the public API.

use approx::assert_abs_diff_eq;
use riskstats_core::aggregate::{loss_ratio_series, segmented_loss_ratio_by};
use riskstats_core::{
    segmented_loss_ratio, Column, Dataset, Decision, FeatureColumn, GlmConfig, HypothesisRunner,
    LossRatioModel, ModelSpec, Record, YearMonth,
};

fn month(m: u32) -> YearMonth {
    YearMonth::new(2015, m)
}

/// 20 policies: province A claims 80% of the time, province B 10%.
fn two_province_book() -> Dataset {
    (0..20u64)
        .map(|i| {
            let (province, claimed) = if i < 10 { ("A", i < 8) } else { ("B", i == 19) };
            Record::new(i, 200.0, if claimed { 150.0 } else { 0.0 }, month(1 + (i % 3) as u32))
                .with_province(province)
                .with_postal_code(format!("{}", 1000 + i % 4))
                .with_gender(if i % 2 == 0 { "Male" } else { "Female" })
        })
        .collect()
}

#[test]
fn province_scenario_rejects_independence() {
    let dataset = two_province_book();
    let report = HypothesisRunner::default().run_dataset(&dataset);

    let province = report.province_risk.expect("province test runs");
    assert!(province.test.p_value < 0.05);
    assert_eq!(province.test.decision, Decision::RejectNull);

    let contrast = province.contrast.expect("significant test reports a contrast");
    assert_eq!(contrast.highest.key, "A");
    assert_abs_diff_eq!(contrast.ratio.unwrap(), 8.0, epsilon = 1e-9);

    // The other tests are independent of the province result
    assert!(report.postal_code_risk.is_ok());
    assert!(report.postal_code_margin.is_ok());
    assert!(report.gender_risk.is_ok());
}

#[test]
fn zero_premium_segment_is_undefined_not_an_error() {
    let dataset = Dataset::new(vec![
        Record::new(1, 0.0, 10.0, month(1)).with_province("Free"),
        Record::new(2, 0.0, 0.0, month(1)).with_province("Free"),
        Record::new(3, 100.0, 25.0, month(1)).with_province("Paid"),
    ]);
    let segments = segmented_loss_ratio(&dataset, "Province").unwrap();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].key, vec!["Paid".to_string()]);
    assert_abs_diff_eq!(segments[0].loss_ratio.unwrap(), 25.0);
    assert_eq!(segments[1].loss_ratio, None);

    // Renderers see 0 for the undefined ratio
    let series = loss_ratio_series(&segments);
    assert_eq!(series[1], ("Free".to_string(), 0.0));
}

#[test]
fn unknown_group_key_is_rejected() {
    let dataset = two_province_book();
    assert!(segmented_loss_ratio(&dataset, "Region").is_err());
    assert!(segmented_loss_ratio_by(&dataset, &["Province", "Region"]).is_err());
}

#[test]
fn glm_recovers_known_relativities() {
    // E[LR] = 0.3 × province relativity × make relativity, observed exactly
    let provinces = [("A", 2.0), ("B", 1.25), ("C", 1.0)];
    let makes = [("X", 1.5), ("Y", 1.0)];
    let mut records = Vec::new();
    for i in 0..120u64 {
        let (province, p_rel) = provinces[(i % 3) as usize];
        let (make, m_rel) = makes[((i / 3) % 2) as usize];
        let premium = 1000.0;
        let claims = premium * 0.3 * p_rel * m_rel;
        records.push(
            Record::new(i, premium, claims, month(1 + (i % 12) as u32))
                .with_province(province)
                .with_make(make),
        );
    }
    let dataset = Dataset::new(records);
    let spec = ModelSpec {
        categorical: vec!["Province".to_string(), "make".to_string()],
        numerical: vec![],
    };

    let model = LossRatioModel::fit(&dataset, &spec, &GlmConfig::default()).unwrap();
    assert_eq!(model.n_test, 30);
    assert!(model.test_rmse().unwrap() < 1e-4);

    let coef = |feature: Column, category: &str| {
        model
            .fitted
            .coefficient(&FeatureColumn::Indicator {
                feature,
                category: category.to_string(),
            })
            .unwrap()
    };
    let a_vs_c = (coef(Column::Province, "A") - coef(Column::Province, "C")).exp();
    let b_vs_c = (coef(Column::Province, "B") - coef(Column::Province, "C")).exp();
    let x_vs_y = (coef(Column::Make, "X") - coef(Column::Make, "Y")).exp();
    assert!((a_vs_c - 2.0).abs() / 2.0 < 0.05);
    assert!((b_vs_c - 1.25).abs() / 1.25 < 0.05);
    assert!((x_vs_y - 1.5).abs() / 1.5 < 0.05);

    // Province A is the top driver among provinces
    let drivers = model.risk_drivers(&[Column::Province], 5);
    assert_eq!(drivers.len(), 3);
    assert_eq!(drivers[0].name(), "Province_A");
}

/// 840 policies, unbalanced in every feature: Gauteng 60%, Western Cape 30%,
/// Limpopo 10%; Male 80%; TOYOTA 4/7, BMW 2/7, VW 1/7. Vehicle values run
/// from 50k to 350k.
fn unbalanced_book() -> Dataset {
    let province = |i: u64| match i % 10 {
        0..=5 => ("Gauteng", 1.0),
        6..=8 => ("Western Cape", 0.9),
        _ => ("Limpopo", 1.3),
    };
    let gender = |i: u64| if (i / 10) % 5 == 0 { ("Female", 1.1) } else { ("Male", 1.0) };
    let make = |i: u64| match i % 7 {
        0..=3 => ("TOYOTA", 0.85),
        4..=5 => ("BMW", 1.25),
        _ => ("VW", 1.0),
    };
    (0..840u64)
        .map(|i| {
            let (p, p_rel) = province(i);
            let (g, g_rel) = gender(i);
            let (m, m_rel) = make(i);
            let value = 50_000.0 + 25_000.0 * (i % 13) as f64;
            let loss_ratio = 0.2 * p_rel * g_rel * m_rel * (1e-6 * value).exp();
            Record::new(i, 1000.0, 1000.0 * loss_ratio, month(1 + (i % 12) as u32))
                .with_province(p)
                .with_gender(g)
                .with_make(m)
                .with_custom_value_estimate(value)
        })
        .collect()
}

#[test]
fn rank_deficient_drivers_use_minimum_norm_levels() {
    let model =
        LossRatioModel::fit(&unbalanced_book(), &ModelSpec::default(), &GlmConfig::default())
            .unwrap();

    // Each category block plus the intercept is collinear. The reported
    // levels are the minimum-norm solution, which does not depend on how
    // many policies sit in each category.
    let coefficients = &model.fitted.coefficients;
    for feature in [Column::Province, Column::Gender, Column::Make] {
        let block: f64 = model
            .fitted
            .columns
            .iter()
            .zip(coefficients.iter())
            .filter(|(column, _)| column.feature() == Some(feature) && column.is_indicator())
            .map(|(_, beta)| beta)
            .sum();
        let intercept = model.fitted.coefficient(&FeatureColumn::Intercept).unwrap();
        assert_abs_diff_eq!(block, intercept, epsilon = 1e-6);
    }
    assert_abs_diff_eq!(
        model.fitted.coefficient(&FeatureColumn::Intercept).unwrap(),
        -0.687342,
        epsilon = 1e-4
    );

    let drivers = model.evaluation().top_drivers;
    let names: Vec<String> = drivers.iter().map(|d| d.name()).collect();
    assert_eq!(
        names,
        vec!["Province_Limpopo", "make_BMW", "make_VW", "Province_Gauteng", "Gender_Female"]
    );
    let expected = [-0.019084, -0.026179, -0.249322, -0.281448, -0.296016];
    for (driver, beta) in drivers.iter().zip(expected) {
        assert_abs_diff_eq!(driver.coefficient, beta, epsilon = 1e-4);
    }
}

#[test]
fn same_seed_same_model() {
    let dataset = two_province_book();
    let spec = ModelSpec {
        categorical: vec!["Province".to_string(), "Gender".to_string()],
        numerical: vec![],
    };
    // Keep only claimants so the response is positive
    let claimants: Dataset = dataset.iter().filter(|r| r.total_claims > 0.0).cloned().collect();

    let first = LossRatioModel::fit(&claimants, &spec, &GlmConfig::default()).unwrap();
    let second = LossRatioModel::fit(&claimants, &spec, &GlmConfig::default()).unwrap();
    assert_eq!(first.fitted.coefficients, second.fitted.coefficients);
    assert_eq!(first.test_actual, second.test_actual);
}
