use crate::feed::{FeedError, FeedRecord, FeedSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use std::time::Duration;

/// AMFI 风格的分号分隔文本净值源
///
/// 文本由三类行组成：
/// * `Open Ended Schemes(Equity Scheme - Large Cap Fund)` 形式的分区标题，给出后续行的基金类型与类别；
/// * 不含分号的基金公司名称行；
/// * `code;isin1;isin2;name;nav;dd-Mon-YYYY` 数据行。
pub struct AmfiFeedSource {
    client: reqwest::Client,
    url: String,
}

impl AmfiFeedSource {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self, FeedError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        if let Some(raw) = proxy {
            let t = raw.trim();
            if !t.is_empty() {
                let url = if t.contains("://") {
                    t.to_string()
                } else {
                    format!("socks5h://{}", t)
                };
                let proxy = reqwest::Proxy::all(&url).map_err(|e| FeedError::Http(e.to_string()))?;
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| FeedError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for AmfiFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedRecord>, FeedError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;
        let records = parse_nav_text(&body)?;
        info!("净值源拉取完成: {} 条记录 ({})", records.len(), self.url);
        Ok(records)
    }
}

fn optional_isin(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() || t == "-" || t.eq_ignore_ascii_case("N.A.") {
        None
    } else {
        Some(t.to_string())
    }
}

fn parse_section_header(line: &str) -> Option<(String, String)> {
    let open = line.find('(')?;
    if !line.ends_with(')') {
        return None;
    }
    let scheme_type = line[..open].trim();
    let category = line[open + 1..line.len() - 1].trim();
    if scheme_type.is_empty() {
        return None;
    }
    Some((scheme_type.to_string(), category.to_string()))
}

pub fn parse_nav_text(body: &str) -> Result<Vec<FeedRecord>, FeedError> {
    let mut records = Vec::new();
    let mut scheme_type = String::new();
    let mut category = String::new();
    let mut house = String::new();
    let mut skipped = 0usize;

    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("Scheme Code") {
            continue;
        }

        if !line.contains(';') {
            if let Some((t, c)) = parse_section_header(line) {
                scheme_type = t;
                category = c;
            } else {
                house = line.to_string();
            }
            continue;
        }

        let cols: Vec<&str> = line.split(';').collect();
        if cols.len() < 6 {
            skipped += 1;
            continue;
        }
        // 净值为 N.A. 等非数字时跳过
        let Ok(price) = cols[4].trim().parse::<f64>() else {
            skipped += 1;
            continue;
        };
        if !price.is_finite() || price <= 0.0 {
            skipped += 1;
            continue;
        }
        let Ok(price_date) = NaiveDate::parse_from_str(cols[5].trim(), "%d-%b-%Y") else {
            skipped += 1;
            continue;
        };

        records.push(FeedRecord {
            house_name: house.clone(),
            scheme_name: cols[3].trim().to_string(),
            scheme_type: scheme_type.clone(),
            category: category.clone(),
            scheme_code: cols[0].trim().to_string(),
            isin_primary: optional_isin(cols[1]),
            isin_secondary: optional_isin(cols[2]),
            price,
            price_date,
        });
    }

    if records.is_empty() && skipped > 0 {
        return Err(FeedError::Parse(format!(
            "no usable rows ({} rows rejected)",
            skipped
        )));
    }
    if skipped > 0 {
        warn!("净值源解析: 跳过 {} 行无效数据", skipped);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Scheme Code;ISIN Div Payout/ ISIN Growth;ISIN Div Reinvestment;Scheme Name;Net Asset Value;Date\r
\r
Open Ended Schemes(Equity Scheme - Large Cap Fund)\r
\r
ABC Mutual Fund\r
\r
100001;INF000A01001;-;ABC Large Cap Fund - Direct Plan - Growth;152.3412;16-Oct-2026\r
100002;INF000A01002;INF000A01003;ABC Large Cap Fund - Regular Plan - IDCW;31.0021;16-Oct-2026\r
100003;-;-;ABC Large Cap Fund - Bonus;N.A.;16-Oct-2026\r
\r
Close Ended Schemes(Income)\r
\r
XYZ Mutual Fund\r
\r
200001;INF111B01001;;XYZ Fixed Term Plan Series 3;10.5;15-Oct-2026\r
";

    #[test]
    fn parses_sections_houses_and_rows() {
        let records = parse_nav_text(SAMPLE).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.house_name, "ABC Mutual Fund");
        assert_eq!(first.scheme_type, "Open Ended Schemes");
        assert_eq!(first.category, "Equity Scheme - Large Cap Fund");
        assert_eq!(first.scheme_code, "100001");
        assert_eq!(first.isin_primary.as_deref(), Some("INF000A01001"));
        assert_eq!(first.isin_secondary, None);
        assert!((first.price - 152.3412).abs() < 1e-9);
        assert_eq!(
            first.price_date,
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );

        let last = &records[2];
        assert_eq!(last.house_name, "XYZ Mutual Fund");
        assert_eq!(last.scheme_type, "Close Ended Schemes");
        assert_eq!(last.category, "Income");
        assert_eq!(last.isin_secondary, None);
    }

    #[test]
    fn rejects_feed_without_usable_rows() {
        let body = "Open Ended Schemes(Debt Scheme - Gilt Fund)\nABC Mutual Fund\n1;-;-;X;N.A.;bad\n";
        assert!(matches!(parse_nav_text(body), Err(FeedError::Parse(_))));
    }

    #[test]
    fn empty_body_is_empty_feed() {
        assert!(parse_nav_text("").unwrap().is_empty());
    }
}
