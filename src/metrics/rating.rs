use crate::metrics::stats::DAYS_PER_YEAR;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

pub const MIN_RATED_YEARS: f64 = 2.5;
pub const LONG_TRACK_YEARS: f64 = 4.5;
pub const MIN_CATEGORY_SIZE: usize = 3;

/// 评级所需的单个份额输入
#[derive(Debug, Clone, PartialEq)]
pub struct RatingInput {
    pub plan_id: String,
    pub category_id: String,
    pub first_date: NaiveDate,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
}

/// 风险调整得分；历史不足或没有可用指标时返回 None
pub fn score(input: &RatingInput, as_of: NaiveDate, risk_free_rate: f64) -> Option<f64> {
    let years = (as_of - input.first_date).num_days() as f64 / DAYS_PER_YEAR;
    if years < MIN_RATED_YEARS {
        return None;
    }

    if years >= LONG_TRACK_YEARS {
        if let (Some(r5), Some(r3), Some(vol)) =
            (input.return_5y, input.return_3y, input.volatility)
        {
            if vol > 0.0 {
                let s = 0.6 * ((r5 - risk_free_rate) / vol) + 0.4 * ((r3 - risk_free_rate) / vol);
                return Some(s).filter(|v| v.is_finite());
            }
        }
    }

    input
        .sortino_ratio
        .or(input.sharpe_ratio)
        .filter(|v| v.is_finite())
}

/// 按类内百分位（从 0 开始的名次 / 总数）给星
pub fn stars_for_percentile(p: f64) -> i32 {
    if p < 0.10 {
        5
    } else if p < 0.325 {
        4
    } else if p < 0.675 {
        3
    } else if p < 0.90 {
        2
    } else {
        1
    }
}

/// 类内排名评级，返回 星级 -> 份额 id 列表
///
/// 少于 3 个有效份额的类别整体跳过。
pub fn assign_ratings(
    inputs: &[RatingInput],
    as_of: NaiveDate,
    risk_free_rate: f64,
) -> BTreeMap<i32, Vec<String>> {
    let mut by_category: HashMap<&str, Vec<(f64, &str)>> = HashMap::new();
    for input in inputs {
        if let Some(s) = score(input, as_of, risk_free_rate) {
            by_category
                .entry(input.category_id.as_str())
                .or_default()
                .push((s, input.plan_id.as_str()));
        }
    }

    let mut out: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for (_, mut scored) in by_category {
        if scored.len() < MIN_CATEGORY_SIZE {
            continue;
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        let count = scored.len() as f64;
        for (rank, (_, plan_id)) in scored.into_iter().enumerate() {
            let stars = stars_for_percentile(rank as f64 / count);
            out.entry(stars).or_default().push(plan_id.to_string());
        }
    }
    for ids in out.values_mut() {
        ids.sort();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    fn input(plan: &str, category: &str, years_ago: i64, sortino: Option<f64>) -> RatingInput {
        RatingInput {
            plan_id: plan.to_string(),
            category_id: category.to_string(),
            first_date: as_of() - chrono::Duration::days(years_ago * 365),
            return_3y: None,
            return_5y: None,
            volatility: None,
            sharpe_ratio: None,
            sortino_ratio: sortino,
        }
    }

    fn stars_of(ratings: &BTreeMap<i32, Vec<String>>, plan: &str) -> Option<i32> {
        ratings
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| id == plan))
            .map(|(s, _)| *s)
    }

    #[test]
    fn ten_funds_split_across_bands() {
        let inputs: Vec<RatingInput> = (0..10)
            .map(|i| input(&format!("p{}", i), "large-cap", 3, Some(10.0 - i as f64)))
            .collect();
        let ratings = assign_ratings(&inputs, as_of(), 7.0);

        let got: Vec<i32> = (0..10)
            .map(|i| stars_of(&ratings, &format!("p{}", i)).unwrap())
            .collect();
        assert_eq!(got, vec![5, 4, 4, 4, 3, 3, 3, 2, 2, 1]);
    }

    #[test]
    fn small_category_gets_no_rating() {
        let mut inputs = vec![
            input("a", "gold", 3, Some(1.0)),
            input("b", "gold", 3, Some(2.0)),
        ];
        inputs.extend((0..3).map(|i| input(&format!("c{}", i), "liquid", 3, Some(i as f64))));
        let ratings = assign_ratings(&inputs, as_of(), 7.0);
        assert_eq!(stars_of(&ratings, "a"), None);
        assert_eq!(stars_of(&ratings, "b"), None);
        assert_eq!(stars_of(&ratings, "c2"), Some(5));
        assert_eq!(stars_of(&ratings, "c1"), Some(3));
        assert_eq!(stars_of(&ratings, "c0"), Some(3));
    }

    #[test]
    fn young_plans_are_not_scored() {
        let i = input("new", "x", 2, Some(3.0));
        assert_eq!(score(&i, as_of(), 7.0), None);
    }

    #[test]
    fn long_track_record_uses_blended_returns() {
        let mut i = input("old", "x", 5, Some(99.0));
        i.return_5y = Some(17.0);
        i.return_3y = Some(12.0);
        i.volatility = Some(10.0);
        let s = score(&i, as_of(), 7.0).unwrap();
        assert!((s - (0.6 * 1.0 + 0.4 * 0.5)).abs() < 1e-12);

        // 缺少 5 年收益时退回 Sortino，再退回 Sharpe
        i.return_5y = None;
        assert_eq!(score(&i, as_of(), 7.0), Some(99.0));
        i.sortino_ratio = None;
        i.sharpe_ratio = Some(0.4);
        assert_eq!(score(&i, as_of(), 7.0), Some(0.4));
        i.sharpe_ratio = None;
        assert_eq!(score(&i, as_of(), 7.0), None);
    }
}
