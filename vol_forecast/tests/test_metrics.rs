use approx::assert_relative_eq;
use rstest::rstest;
use vol_forecast::metrics::{mae_volatility, mse_variance, qlike_loss, QLIKE_EPS};
use vol_forecast::ForecastError;

#[test]
fn test_variance_metrics() {
    let pred = vec![0.0001, 0.0004, 0.0009];
    let realized = vec![Some(0.0002), Some(0.0004), Some(0.0001)];

    // MSE
    let mse = mse_variance(&pred, &realized).unwrap();
    let expected = (1e-8 + 0.0 + 64e-8) / 3.0;
    assert_relative_eq!(mse, expected, max_relative = 1e-12);

    // MAE on volatility
    let pred_vol: Vec<f64> = pred.iter().map(|v: &f64| v.sqrt()).collect();
    let mae = mae_volatility(&pred_vol, &realized).unwrap();
    let expected = ((0.01 - 0.0002f64.sqrt()).abs() + 0.0 + (0.03f64 - 0.01).abs()) / 3.0;
    assert_relative_eq!(mae, expected, max_relative = 1e-12);

    // QLIKE
    let q = qlike_loss(&pred, &realized, QLIKE_EPS).unwrap();
    let expected = pred
        .iter()
        .zip(&realized)
        .map(|(p, r)| p.ln() + r.unwrap() / p)
        .sum::<f64>()
        / 3.0;
    assert_relative_eq!(q, expected, max_relative = 1e-12);
}

#[test]
fn test_qlike_is_minimized_at_realized() {
    let realized = vec![Some(0.0004); 5];
    let at_truth = qlike_loss(&[0.0004; 5], &realized, QLIKE_EPS).unwrap();
    let too_low = qlike_loss(&[0.0002; 5], &realized, QLIKE_EPS).unwrap();
    let too_high = qlike_loss(&[0.0008; 5], &realized, QLIKE_EPS).unwrap();

    assert!(at_truth < too_low);
    assert!(at_truth < too_high);
    // Under-prediction is penalized more than over-prediction by the same factor
    assert!(too_low > too_high);
}

#[test]
fn test_qlike_floors_forecast() {
    let q = qlike_loss(&[0.0, -1.0], &[Some(1e-8), Some(1e-8)], QLIKE_EPS).unwrap();
    assert_relative_eq!(q, QLIKE_EPS.ln() + 1.0, max_relative = 1e-12);
}

#[test]
fn test_missing_pairs_are_skipped() {
    let pred = vec![0.0001, f64::NAN, 0.0004, 0.0009];
    let realized = vec![None, Some(0.0002), Some(0.0004), Some(0.0009)];

    assert_relative_eq!(mse_variance(&pred, &realized).unwrap(), 0.0);
    assert_relative_eq!(
        qlike_loss(&pred, &realized, QLIKE_EPS).unwrap(),
        (0.0004f64.ln() + 1.0 + 0.0009f64.ln() + 1.0) / 2.0,
        max_relative = 1e-12
    );
}

#[rstest]
#[case(vec![0.1, 0.2], vec![Some(0.1)])]
#[case(vec![0.1], vec![None])]
#[case(vec![], vec![])]
fn test_metrics_reject_unusable_input(#[case] pred: Vec<f64>, #[case] realized: Vec<Option<f64>>) {
    assert!(matches!(
        mse_variance(&pred, &realized),
        Err(ForecastError::ValidationError(_))
    ));
    assert!(matches!(
        mae_volatility(&pred, &realized),
        Err(ForecastError::ValidationError(_))
    ));
    assert!(matches!(
        qlike_loss(&pred, &realized, QLIKE_EPS),
        Err(ForecastError::ValidationError(_))
    ));
}
