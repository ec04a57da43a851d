use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    Direct,
    Regular,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Direct => "direct",
            PlanType::Regular => "regular",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Growth,
    Idcw,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Growth => "growth",
            OptionType::Idcw => "idcw",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 小写、非字母数字折叠为单个 `-`
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for ch in s.replace('&', " and ").chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// 份额/分红方式用词；只在名称尾部或分隔后的片段中识别
const VARIANT_WORDS: &[&str] = &[
    "direct",
    "regular",
    "plan",
    "growth",
    "dividend",
    "idcw",
    "payout",
    "reinvestment",
    "reinvest",
    "option",
];

const IDCW_WORDS: &[&str] = &["dividend", "idcw", "payout"];

fn clean_word(w: &str) -> String {
    w.trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_ascii_lowercase()
}

fn is_variant_word(w: &str) -> bool {
    VARIANT_WORDS.contains(&clean_word(w).as_str())
}

fn is_separator(w: &str) -> bool {
    w.chars().all(|c| matches!(c, '-' | '–' | '—' | '|' | '/'))
}

/// 按独立的 `-`、`|`、`/` 与括号分段；`Multi-Cap` 这类连字符词不拆
fn segments(name: &str) -> Vec<Vec<&str>> {
    let mut out: Vec<Vec<&str>> = vec![Vec::new()];
    for part in name.split(['(', ')']) {
        for w in part.split_whitespace() {
            if is_separator(w) {
                out.push(Vec::new());
            } else if let Some(last) = out.last_mut() {
                last.push(w);
            }
        }
        out.push(Vec::new());
    }
    out.retain(|words| !words.is_empty());
    out
}

/// 份额名称拆分结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemeName {
    pub base: String,
    pub plan_type: PlanType,
    pub option_type: OptionType,
}

/// 拆出基金产品名称与份额类型、分红方式
///
/// 第一个片段是产品名称，只去掉其末尾连续的份额用词；其后的片段中的份额用词
/// 全部去掉。`ABC Dividend Yield Fund - Direct Plan - Growth` 得到
/// `ABC Dividend Yield Fund` / direct / growth。
pub fn split_scheme_name(name: &str) -> SchemeName {
    let mut parts = segments(name).into_iter();

    let mut variant: Vec<String> = Vec::new();
    let mut kept: Vec<String> = Vec::new();

    if let Some(mut head) = parts.next() {
        while head.len() > 1 && head.last().map(|w| is_variant_word(w)).unwrap_or(false) {
            if let Some(w) = head.pop() {
                variant.push(clean_word(w));
            }
        }
        kept.push(head.join(" "));
    }
    for seg in parts {
        let (words, rest): (Vec<&str>, Vec<&str>) =
            seg.into_iter().partition(|w| is_variant_word(w));
        variant.extend(words.into_iter().map(clean_word));
        if !rest.is_empty() {
            kept.push(rest.join(" "));
        }
    }

    let plan_type = if variant.iter().any(|w| w == "direct") {
        PlanType::Direct
    } else {
        PlanType::Regular
    };
    let option_type = if variant.iter().any(|w| IDCW_WORDS.contains(&w.as_str())) {
        OptionType::Idcw
    } else {
        OptionType::Growth
    };
    SchemeName {
        base: kept.join(" - "),
        plan_type,
        option_type,
    }
}

fn short_name_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)^(.+?)\s+mutual\s+fund\b",
            r"(?i)^(.+?)\s+asset\s+management\b",
            r"(?i)^(.+?)\s+amc\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

/// 基金公司简称："<X> Mutual Fund" / "<X> Asset Management" / "<X> AMC"，否则取首词
pub fn provider_short_name(house_name: &str) -> String {
    let trimmed = house_name.trim();
    for re in short_name_res() {
        if let Some(c) = re.captures(trimmed).and_then(|c| c.get(1)) {
            return c.as_str().trim().to_string();
        }
    }
    trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn scheme_id(provider_id: &str, base_name: &str) -> String {
    format!("{}-{}", provider_id, slugify(base_name))
}

pub fn plan_id(scheme_id: &str, plan: PlanType, option: OptionType) -> String {
    format!("{}-{}-{}", scheme_id, plan, option)
}
