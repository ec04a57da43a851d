//! 单个份额的收益/风险统计，纯函数
//!
//! 输入为按日期升序的净值序列，百分比类结果统一乘以 100。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS: usize = 252;
pub const MIN_HISTORY_POINTS: usize = 5;
pub const MIN_RISK_POINTS: usize = 63;
pub const MIN_ALIGNED_DAYS: usize = 60;
pub const MIN_DRAWDOWN_POINTS: usize = 30;
pub const CLOSEST_TOLERANCE_DAYS: i64 = 20;
pub const DAYS_PER_YEAR: f64 = 365.25;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// 区间收益的定义：回看天数，复利年数（None 表示简单收益）
#[derive(Debug, Clone, Copy)]
pub struct Horizon {
    pub days: i64,
    pub years: Option<f64>,
}

pub const HORIZON_1W: Horizon = Horizon { days: 7, years: None };
pub const HORIZON_1M: Horizon = Horizon { days: 30, years: None };
pub const HORIZON_3M: Horizon = Horizon { days: 91, years: None };
pub const HORIZON_6M: Horizon = Horizon { days: 182, years: None };
pub const HORIZON_1Y: Horizon = Horizon { days: 365, years: Some(1.0) };
pub const HORIZON_3Y: Horizon = Horizon { days: 1095, years: Some(3.0) };
pub const HORIZON_5Y: Horizon = Horizon { days: 1825, years: Some(5.0) };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedMetrics {
    pub return_1w: Option<f64>,
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub return_since_inception: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub risk_rating: Option<i32>,
    pub history_points: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// 计算完整指标；不足 `MIN_HISTORY_POINTS` 个点时返回 None
pub fn compute(
    history: &[PricePoint],
    benchmark: Option<&[PricePoint]>,
    as_of: NaiveDate,
    risk_free_rate: f64,
) -> Option<ComputedMetrics> {
    if history.len() < MIN_HISTORY_POINTS {
        return None;
    }
    let first = history.first()?;
    let last = history.last()?;

    let volatility = volatility(history);
    let (alpha, beta) = match benchmark.and_then(|b| alpha_beta(history, b)) {
        Some((a, b)) => (Some(a), Some(b)),
        None => (None, None),
    };

    Some(ComputedMetrics {
        return_1w: horizon_return(history, as_of, HORIZON_1W),
        return_1m: horizon_return(history, as_of, HORIZON_1M),
        return_3m: horizon_return(history, as_of, HORIZON_3M),
        return_6m: horizon_return(history, as_of, HORIZON_6M),
        return_1y: horizon_return(history, as_of, HORIZON_1Y),
        return_3y: horizon_return(history, as_of, HORIZON_3Y),
        return_5y: horizon_return(history, as_of, HORIZON_5Y),
        return_since_inception: since_inception(history),
        volatility,
        sharpe_ratio: sharpe_ratio(history, volatility, risk_free_rate),
        sortino_ratio: sortino_ratio(history, risk_free_rate),
        alpha,
        beta,
        max_drawdown: max_drawdown(history),
        risk_rating: risk_band(volatility),
        history_points: history.len(),
        first_date: first.date,
        last_date: last.date,
    })
}

/// 二分查找最接近 `target` 的点（插入位置及其左右邻居），超出 ±20 天视为没有
pub fn find_closest(history: &[PricePoint], target: NaiveDate) -> Option<&PricePoint> {
    if history.is_empty() {
        return None;
    }
    let idx = history.partition_point(|p| p.date < target);
    let lo = idx.saturating_sub(1);
    let hi = (idx + 1).min(history.len() - 1);
    history[lo..=hi]
        .iter()
        .map(|p| (p, (p.date - target).num_days().abs()))
        .filter(|(_, diff)| *diff <= CLOSEST_TOLERANCE_DAYS)
        .min_by_key(|(_, diff)| *diff)
        .map(|(p, _)| p)
}

pub fn simple_return(start: f64, end: f64) -> Option<f64> {
    if start <= 0.0 {
        return None;
    }
    Some((end - start) / start * 100.0)
}

pub fn cagr(start: f64, end: f64, years: f64) -> Option<f64> {
    if start <= 0.0 || end <= 0.0 || years <= 0.0 {
        return None;
    }
    Some(((end / start).powf(1.0 / years) - 1.0) * 100.0)
}

/// 以最新点为终点，`as_of - days` 附近的点为起点
pub fn horizon_return(history: &[PricePoint], as_of: NaiveDate, horizon: Horizon) -> Option<f64> {
    let end = history.last()?;
    let target = as_of - chrono::Duration::days(horizon.days);
    let start = find_closest(history, target)?;
    if start.date >= end.date {
        return None;
    }
    match horizon.years {
        Some(years) => cagr(start.price, end.price, years),
        None => simple_return(start.price, end.price),
    }
}

/// 成立以来年化；跨度不足 0.1 年时不计算
pub fn since_inception(history: &[PricePoint]) -> Option<f64> {
    let first = history.first()?;
    let last = history.last()?;
    let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
    if years < 0.1 {
        return None;
    }
    cagr(first.price, last.price, years)
}

fn recent(history: &[PricePoint]) -> &[PricePoint] {
    &history[history.len().saturating_sub(TRADING_DAYS)..]
}

fn log_returns(points: &[PricePoint]) -> Vec<f64> {
    points
        .windows(2)
        .filter(|w| w[0].price > 0.0 && w[1].price > 0.0)
        .map(|w| (w[1].price / w[0].price).ln())
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// 最近 ≤252 个点的日对数收益标准差，年化后以百分比表示
pub fn volatility(history: &[PricePoint]) -> Option<f64> {
    if history.len() < MIN_RISK_POINTS {
        return None;
    }
    let returns = log_returns(recent(history));
    sample_std(&returns).map(|s| s * (TRADING_DAYS as f64).sqrt() * 100.0)
}

/// 最近 ≤252 个点的年化收益（%）
pub fn annualized_return(history: &[PricePoint]) -> Option<f64> {
    let window = recent(history);
    let first = window.first()?;
    let last = window.last()?;
    let intervals = window.len().checked_sub(1).filter(|n| *n > 0)?;
    if first.price <= 0.0 || last.price <= 0.0 {
        return None;
    }
    Some(((last.price / first.price).powf(TRADING_DAYS as f64 / intervals as f64) - 1.0) * 100.0)
}

pub fn sharpe_ratio(
    history: &[PricePoint],
    volatility: Option<f64>,
    risk_free_rate: f64,
) -> Option<f64> {
    if history.len() < MIN_RISK_POINTS {
        return None;
    }
    let vol = volatility.filter(|v| *v > EPSILON)?;
    let ret = annualized_return(history)?;
    Some((ret - risk_free_rate) / vol)
}

/// 下行偏差的均值分母取整个窗口的收益个数，而不是下行天数
pub fn sortino_ratio(history: &[PricePoint], risk_free_rate: f64) -> Option<f64> {
    if history.len() < MIN_RISK_POINTS {
        return None;
    }
    let returns = log_returns(recent(history));
    if returns.is_empty() {
        return None;
    }
    let daily_rf = risk_free_rate / 100.0 / TRADING_DAYS as f64;
    let downside_sq: f64 = returns
        .iter()
        .filter(|r| **r < daily_rf)
        .map(|r| (r - daily_rf).powi(2))
        .sum();
    let downside =
        (downside_sq / returns.len() as f64).sqrt() * (TRADING_DAYS as f64).sqrt() * 100.0;
    if downside < EPSILON {
        return None;
    }
    let ret = annualized_return(history)?;
    Some((ret - risk_free_rate) / downside)
}

fn dated_returns(points: &[PricePoint]) -> Vec<(NaiveDate, f64)> {
    points
        .windows(2)
        .filter(|w| w[0].price > 0.0 && w[1].price > 0.0)
        .map(|w| (w[1].date, (w[1].price / w[0].price).ln()))
        .collect()
}

/// 按日期对齐基金与基准的日收益，返回 (alpha, beta)
pub fn alpha_beta(fund: &[PricePoint], benchmark: &[PricePoint]) -> Option<(f64, f64)> {
    if fund.len() < MIN_RISK_POINTS || benchmark.len() < MIN_RISK_POINTS {
        return None;
    }
    let bench: std::collections::HashMap<NaiveDate, f64> =
        dated_returns(benchmark).into_iter().collect();
    let aligned: Vec<(f64, f64)> = dated_returns(fund)
        .into_iter()
        .filter_map(|(d, r)| bench.get(&d).map(|b| (r, *b)))
        .collect();
    if aligned.len() < MIN_ALIGNED_DAYS {
        return None;
    }
    let window = &aligned[aligned.len().saturating_sub(TRADING_DAYS)..];
    let n = window.len() as f64;
    let mf = window.iter().map(|(f, _)| f).sum::<f64>() / n;
    let mb = window.iter().map(|(_, b)| b).sum::<f64>() / n;
    let cov = window
        .iter()
        .map(|(f, b)| (f - mf) * (b - mb))
        .sum::<f64>()
        / (n - 1.0);
    let var = window.iter().map(|(_, b)| (b - mb).powi(2)).sum::<f64>() / (n - 1.0);
    if var < EPSILON * EPSILON {
        return None;
    }
    let beta = cov / var;
    let alpha = (mf - beta * mb) * TRADING_DAYS as f64 * 100.0;
    Some((alpha, beta))
}

/// 全历史最大回撤，负百分比（无回撤时为 0）
pub fn max_drawdown(history: &[PricePoint]) -> Option<f64> {
    if history.len() < MIN_DRAWDOWN_POINTS {
        return None;
    }
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for p in history {
        if p.price > peak {
            peak = p.price;
        }
        if peak > 0.0 {
            let dd = (p.price - peak) / peak * 100.0;
            if dd < worst {
                worst = dd;
            }
        }
    }
    Some(worst)
}

pub fn risk_band(volatility: Option<f64>) -> Option<i32> {
    let v = volatility?;
    Some(match v {
        v if v < 3.0 => 1,
        v if v < 8.0 => 2,
        v if v < 15.0 => 3,
        v if v < 22.0 => 4,
        _ => 5,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 从 `start` 起每日一个点，价格由对数收益序列累积
    fn series(start: NaiveDate, log_returns: &[f64]) -> Vec<PricePoint> {
        let mut price = 100.0;
        let mut out = vec![PricePoint::new(start, price)];
        for (i, r) in log_returns.iter().enumerate() {
            price *= r.exp();
            out.push(PricePoint::new(start + Duration::days(i as i64 + 1), price));
        }
        out
    }

    fn wiggle(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.01 * (i as f64 * 0.7).sin()).collect()
    }

    #[test]
    fn closest_point_within_tolerance() {
        let h = vec![
            PricePoint::new(date(2025, 1, 1), 10.0),
            PricePoint::new(date(2025, 1, 10), 11.0),
            PricePoint::new(date(2025, 3, 1), 12.0),
        ];
        assert_eq!(find_closest(&h, date(2025, 1, 8)).unwrap().price, 11.0);
        assert_eq!(find_closest(&h, date(2025, 1, 3)).unwrap().price, 10.0);
        assert_eq!(find_closest(&h, date(2025, 2, 25)).unwrap().price, 12.0);
        // 1 月 10 日和 3 月 1 日都超过 20 天
        assert!(find_closest(&h, date(2025, 2, 4)).is_none());
        assert!(find_closest(&[], date(2025, 2, 4)).is_none());
    }

    #[test]
    fn one_year_return_is_annualized() {
        let t = date(2026, 6, 30);
        let h = vec![
            PricePoint::new(t - Duration::days(365), 100.0),
            PricePoint::new(t, 110.0),
        ];
        let r = horizon_return(&h, t, HORIZON_1Y).unwrap();
        assert!((r - 10.0).abs() < 1e-9, "{}", r);
    }

    #[test]
    fn three_year_return_is_cagr_not_simple() {
        let t = date(2026, 6, 30);
        let h = vec![
            PricePoint::new(t - Duration::days(1095), 100.0),
            PricePoint::new(t, 133.1),
        ];
        let r = horizon_return(&h, t, HORIZON_3Y).unwrap();
        assert!((r - 10.0).abs() < 1e-6, "{}", r);
        assert!(horizon_return(&h, t, HORIZON_1Y).is_none());
    }

    #[test]
    fn short_horizons_are_simple_returns() {
        let t = date(2026, 6, 30);
        let h = vec![
            PricePoint::new(t - Duration::days(30), 50.0),
            PricePoint::new(t - Duration::days(7), 100.0),
            PricePoint::new(t, 104.0),
        ];
        assert!((horizon_return(&h, t, HORIZON_1W).unwrap() - 4.0).abs() < 1e-9);
        assert!((horizon_return(&h, t, HORIZON_1M).unwrap() - 108.0).abs() < 1e-9);
    }

    #[test]
    fn flat_prices_have_zero_volatility_and_no_sharpe() {
        let h = series(date(2025, 1, 1), &vec![0.0; 99]);
        let vol = volatility(&h);
        assert_eq!(vol, Some(0.0));
        assert_eq!(sharpe_ratio(&h, vol, 7.0), None);

        let m = compute(&h, None, date(2025, 4, 10), 7.0).unwrap();
        assert_eq!(m.volatility, Some(0.0));
        assert_eq!(m.sharpe_ratio, None);
        assert_eq!(m.risk_rating, Some(1));
        assert_eq!(m.max_drawdown, Some(0.0));
    }

    #[test]
    fn risk_fields_need_enough_points() {
        let h = series(date(2025, 1, 1), &wiggle(40));
        assert_eq!(volatility(&h), None);
        assert_eq!(sortino_ratio(&h, 7.0), None);
        assert!(max_drawdown(&h).is_some());

        let tiny = series(date(2025, 1, 1), &wiggle(3));
        assert!(compute(&tiny, None, date(2025, 1, 4), 7.0).is_none());
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let mut prices = vec![100.0, 120.0, 90.0, 110.0, 60.0, 130.0];
        prices.resize(35, 130.0);
        let h: Vec<PricePoint> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint::new(date(2025, 1, 1) + Duration::days(i as i64), *p))
            .collect();
        let dd = max_drawdown(&h).unwrap();
        assert!((dd - (-50.0)).abs() < 1e-9, "{}", dd);
    }

    #[test]
    fn beta_of_identical_series_is_one() {
        let h = series(date(2025, 1, 1), &wiggle(120));
        let (alpha, beta) = alpha_beta(&h, &h).unwrap();
        assert!((beta - 1.0).abs() < 1e-9);
        assert!(alpha.abs() < 1e-9);
    }

    #[test]
    fn leveraged_fund_has_beta_two() {
        let base = wiggle(120);
        let doubled: Vec<f64> = base.iter().map(|r| r * 2.0).collect();
        let bench = series(date(2025, 1, 1), &base);
        let fund = series(date(2025, 1, 1), &doubled);
        let (alpha, beta) = alpha_beta(&fund, &bench).unwrap();
        assert!((beta - 2.0).abs() < 1e-9, "{}", beta);
        assert!(alpha.abs() < 1e-6, "{}", alpha);
    }

    #[test]
    fn alpha_beta_need_overlapping_days() {
        let bench = series(date(2024, 1, 1), &wiggle(120));
        let fund = series(date(2024, 4, 1), &wiggle(120));
        // 只有约 30 天重叠
        assert!(alpha_beta(&fund, &bench).is_none());
    }

    #[test]
    fn sortino_uses_full_window_denominator() {
        // 一半上涨一半下跌
        let returns: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let h = series(date(2025, 1, 1), &returns);
        let rf = 0.0;
        let s = sortino_ratio(&h, rf).unwrap();

        let window = recent(&h);
        let lr = log_returns(window);
        let down: f64 = lr.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
        let expected_dd = (down / lr.len() as f64).sqrt() * (252f64).sqrt() * 100.0;
        let expected = annualized_return(&h).unwrap() / expected_dd;
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn risk_band_thresholds() {
        assert_eq!(risk_band(None), None);
        assert_eq!(risk_band(Some(2.9)), Some(1));
        assert_eq!(risk_band(Some(3.0)), Some(2));
        assert_eq!(risk_band(Some(14.9)), Some(3));
        assert_eq!(risk_band(Some(21.0)), Some(4));
        assert_eq!(risk_band(Some(40.0)), Some(5));
    }

    #[test]
    fn since_inception_needs_a_tenth_of_a_year() {
        let h = vec![
            PricePoint::new(date(2025, 1, 1), 10.0),
            PricePoint::new(date(2025, 1, 20), 11.0),
        ];
        assert!(since_inception(&h).is_none());
        let h = vec![
            PricePoint::new(date(2024, 1, 1), 10.0),
            PricePoint::new(date(2025, 12, 31), 12.1),
        ];
        assert!(since_inception(&h).unwrap() > 9.0);
    }

    #[test]
    fn drawdown_needs_thirty_points() {
        // wiggle(n) 生成 n + 1 个点
        let short = series(date(2025, 1, 1), &wiggle(28));
        assert_eq!(short.len(), MIN_DRAWDOWN_POINTS - 1);
        assert!(max_drawdown(&short).is_none());

        let enough = series(date(2025, 1, 1), &wiggle(29));
        assert_eq!(enough.len(), MIN_DRAWDOWN_POINTS);
        assert!(max_drawdown(&enough).unwrap() < 0.0);
    }

    #[test]
    fn alpha_beta_need_sixty_three_points_each() {
        let start = date(2025, 1, 1);
        let fund = series(start, &wiggle(120));

        let bench = series(start, &wiggle(61));
        assert_eq!(bench.len(), MIN_RISK_POINTS - 1);
        assert!(alpha_beta(&fund, &bench).is_none());

        let bench = series(start, &wiggle(62));
        assert_eq!(bench.len(), MIN_RISK_POINTS);
        let (_, beta) = alpha_beta(&fund, &bench).unwrap();
        assert!((beta - 1.0).abs() < 1e-9, "{}", beta);

        // 基金一侧同样适用
        let short_fund = series(start, &wiggle(61));
        let long_bench = series(start, &wiggle(120));
        assert!(alpha_beta(&short_fund, &long_bench).is_none());
    }

    #[test]
    fn alpha_beta_need_sixty_aligned_days() {
        let start = date(2025, 1, 1);
        let fund = series(start, &wiggle(120));

        // 基准晚 59 天开始：重叠 60 个收益日
        let bench = series(start + Duration::days(59), &wiggle(119));
        assert!(alpha_beta(&fund, &bench).is_some());

        // 晚 60 天：只剩 59 个
        let bench = series(start + Duration::days(60), &wiggle(119));
        assert!(alpha_beta(&fund, &bench).is_none());
    }
}
