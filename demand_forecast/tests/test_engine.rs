use chrono::{Duration, NaiveDate};
use demand_forecast::{
    AccuracyRankings, CategoryMap, ConfidenceLabel, ForecastConfig, ForecastEngine,
    ForecastSummary, Granularity, RawShipment, WarningKind,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

/// Daily Poisson shipments for `skus` SKUs over the last `days` days
fn synthetic_shipments(skus: usize, days: i64, seed: u64) -> Vec<RawShipment> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();
    for s in 0..skus {
        let lambda = 2.0 + s as f64 % 7.0;
        let poisson = Poisson::new(lambda).unwrap();
        for d in 1..=days {
            let qty: f64 = poisson.sample(&mut rng);
            let date = today() - Duration::days(d);
            rows.push(RawShipment::new(
                format!("SKU-{s:03}"),
                date.format("%Y-%m-%d").to_string(),
                qty,
            ));
        }
    }
    rows
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let shipments = synthetic_shipments(40, 120, 7);

    let sequential = ForecastEngine::new(
        ForecastConfig {
            parallel_threshold: usize::MAX,
            ..ForecastConfig::default()
        },
        today(),
    )
    .unwrap();
    let parallel = ForecastEngine::new(
        ForecastConfig {
            parallel_threshold: 1,
            ..ForecastConfig::default()
        },
        today(),
    )
    .unwrap();

    let (_, seq) = sequential
        .forecast_shipments(&shipments, &CategoryMap::default())
        .unwrap();
    let (_, par) = parallel
        .forecast_shipments(&shipments, &CategoryMap::default())
        .unwrap();

    assert_eq!(seq.forecasts, par.forecasts);
    assert_eq!(seq.accuracy, par.accuracy);
    assert_eq!(seq.warnings, par.warnings);
    assert_eq!(seq.forecasts.len(), 40);
}

#[test]
fn test_forecast_invariants_on_synthetic_demand() {
    let shipments = synthetic_shipments(15, 200, 42);
    let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
    let (table, output) = engine
        .forecast_shipments(&shipments, &CategoryMap::default())
        .unwrap();

    assert_eq!(table.len(), 15);
    let mut skus: Vec<&str> = output.forecasts.iter().map(|f| f.sku.as_str()).collect();
    let sorted = {
        let mut s = skus.clone();
        s.sort();
        s
    };
    assert_eq!(skus, sorted);
    skus.dedup();
    assert_eq!(skus.len(), output.forecasts.len());

    for forecast in &output.forecasts {
        assert!(forecast.forecast_lower_bound >= 0.0);
        assert!(forecast.forecast_lower_bound <= forecast.forecast_total_qty);
        assert!(forecast.forecast_upper_bound >= forecast.forecast_total_qty);
        assert!(forecast.confidence_score <= 100);
        assert_eq!(
            forecast.confidence,
            ConfidenceLabel::from_score(forecast.confidence_score)
        );
        assert!(forecast.mape.is_some(), "long history is always backtested");
        assert_eq!(forecast.snapshot_date, today());
    }

    // Zero-quantity Poisson draws are dropped and reported
    assert!(output
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::InvalidRecord && w.sku.is_none()));

    let summary = ForecastSummary::from_forecasts(&output.forecasts, 5).unwrap();
    assert_eq!(summary.total_skus_forecasted, 15);
    assert_eq!(summary.top_forecast_skus.len(), 5);
    assert_eq!(summary.confidence_counts.values().sum::<usize>(), 15);
    assert!(summary.avg_mape.is_some());

    let rankings = AccuracyRankings::from_accuracy(&output.accuracy, 3);
    assert!(rankings.best[0].mape <= rankings.worst[0].mape);

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("confidence_counts").is_some());
}

#[test]
fn test_weekly_granularity() {
    let shipments = synthetic_shipments(3, 140, 11);
    let config = ForecastConfig {
        granularity: Granularity::Weekly,
        ..ForecastConfig::default()
    };
    let engine = ForecastEngine::new(config, today()).unwrap();
    let (table, output) = engine
        .forecast_shipments(&shipments, &CategoryMap::default())
        .unwrap();

    let series = table.get("SKU-000").unwrap();
    assert!(series.len() >= 20 && series.len() <= 21);
    for forecast in &output.forecasts {
        assert_eq!(forecast.forecast_method, "MA-13");
        assert_eq!(forecast.history_days, forecast.history_periods as f64 * 7.0);
    }
}

#[test]
fn test_stale_history_is_reported_as_missing() {
    let shipments = vec![RawShipment::new("A", "2019-01-01", 10.0)];
    let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
    let err = engine
        .forecast_shipments(&shipments, &CategoryMap::default())
        .unwrap_err();
    assert!(err.to_string().contains("Missing input"));
}
