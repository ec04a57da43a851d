use crate::feed::FeedRecord;

pub const OPEN_ENDED_SCHEME_TYPE: &str = "Open Ended Schemes";
const SEGREGATED_MARKER: &str = "segregated portfolio";

const ETF_CATEGORIES: &[&str] = &[
    "gold etf",
    "other etfs",
    "other scheme - gold etf",
    "other scheme - other etfs",
];

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_etf(record: &FeedRecord) -> bool {
    let name = normalize(&record.scheme_name);
    if name.ends_with(" etf") {
        return true;
    }
    let category = normalize(&record.category);
    ETF_CATEGORIES.iter().any(|c| *c == category)
}

/// 判断一条记录是否参与同步；规则按顺序短路
pub fn is_eligible(record: &FeedRecord) -> bool {
    if !record.has_identifier() {
        return false;
    }
    if !record
        .scheme_type
        .trim()
        .eq_ignore_ascii_case(OPEN_ENDED_SCHEME_TYPE)
    {
        return false;
    }
    if normalize(&record.scheme_name).contains(SEGREGATED_MARKER) {
        return false;
    }
    !is_etf(record)
}

pub fn filter_records(records: Vec<FeedRecord>) -> Vec<FeedRecord> {
    records.into_iter().filter(is_eligible).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(name: &str) -> FeedRecord {
        FeedRecord {
            house_name: "ABC Mutual Fund".to_string(),
            scheme_name: name.to_string(),
            scheme_type: OPEN_ENDED_SCHEME_TYPE.to_string(),
            category: "Equity Scheme - Large Cap Fund".to_string(),
            scheme_code: "100001".to_string(),
            isin_primary: Some("INF000A01001".to_string()),
            isin_secondary: None,
            price: 10.0,
            price_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        }
    }

    #[test]
    fn keeps_plain_open_ended_record() {
        assert!(is_eligible(&record("ABC Large Cap Fund - Direct Plan - Growth")));
    }

    #[test]
    fn drops_close_ended() {
        let mut r = record("ABC Fixed Term Plan Series 12");
        r.scheme_type = "Close Ended Schemes".to_string();
        assert!(!is_eligible(&r));
        r.scheme_type = "Interval Fund Schemes".to_string();
        assert!(!is_eligible(&r));
    }

    #[test]
    fn drops_etf_by_category_and_name() {
        let mut r = record("ABC Gold Fund");
        r.category = "Gold ETF".to_string();
        assert!(!is_eligible(&r));

        let mut r = record("ABC Gold Fund");
        r.category = "Other Scheme - Other  ETFs".to_string();
        assert!(!is_eligible(&r));

        assert!(!is_eligible(&record("ABC Nifty 50 ETF")));
        // 名称中间出现 ETF 字样的 FoF 不算
        assert!(is_eligible(&record("ABC Gold ETF Fund of Fund - Direct Plan")));
    }

    #[test]
    fn drops_missing_identifiers() {
        let mut r = record("ABC Liquid Fund - Growth");
        r.isin_primary = None;
        r.isin_secondary = Some("  ".to_string());
        assert!(!is_eligible(&r));

        r.isin_secondary = Some("INF000A01002".to_string());
        assert!(is_eligible(&r));
    }

    #[test]
    fn drops_segregated_portfolio() {
        assert!(!is_eligible(&record("XYZ Segregated Portfolio")));
        assert!(!is_eligible(&record("XYZ Credit Risk Fund (Segregated  Portfolio 1)")));
    }

    #[test]
    fn filter_preserves_order() {
        let mut closed = record("Closed");
        closed.scheme_type = "Close Ended Schemes".to_string();
        let out = filter_records(vec![record("A Fund"), closed, record("B Fund")]);
        let names: Vec<_> = out.iter().map(|r| r.scheme_name.as_str()).collect();
        assert_eq!(names, vec!["A Fund", "B Fund"]);
    }
}
