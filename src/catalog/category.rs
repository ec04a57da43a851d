//! 静态类别表：叶子类别 → 资产大类，以及来源标签到类别的映射。
//!
//! 解析顺序固定：精确匹配 → 子串匹配（最长标签优先）→ 关键词规则 → `other`。

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetClass {
    Equity,
    Debt,
    Hybrid,
    Solution,
    Other,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Debt => "debt",
            AssetClass::Hybrid => "hybrid",
            AssetClass::Solution => "solution",
            AssetClass::Other => "other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub parent: AssetClass,
    /// 类别默认风险等级
    pub risk_level: &'static str,
}

const fn cat(
    id: &'static str,
    name: &'static str,
    parent: AssetClass,
    risk_level: &'static str,
) -> Category {
    Category {
        id,
        name,
        parent,
        risk_level,
    }
}

const LOW: &str = "Low";
const LOW_MODERATE: &str = "Low to Moderate";
const MODERATE: &str = "Moderate";
const MODERATELY_HIGH: &str = "Moderately High";
const HIGH: &str = "High";
const VERY_HIGH: &str = "Very High";

use AssetClass::*;

pub const CATEGORIES: &[Category] = &[
    cat("large-cap", "Large Cap", Equity, VERY_HIGH),
    cat("large-mid-cap", "Large & Mid Cap", Equity, VERY_HIGH),
    cat("mid-cap", "Mid Cap", Equity, VERY_HIGH),
    cat("small-cap", "Small Cap", Equity, VERY_HIGH),
    cat("multi-cap", "Multi Cap", Equity, VERY_HIGH),
    cat("flexi-cap", "Flexi Cap", Equity, VERY_HIGH),
    cat("focused", "Focused", Equity, VERY_HIGH),
    cat("value", "Value", Equity, VERY_HIGH),
    cat("contra", "Contra", Equity, VERY_HIGH),
    cat("dividend-yield", "Dividend Yield", Equity, VERY_HIGH),
    cat("elss", "ELSS", Equity, VERY_HIGH),
    cat("sectoral-thematic", "Sectoral / Thematic", Equity, VERY_HIGH),
    cat("overnight", "Overnight", Debt, LOW),
    cat("liquid", "Liquid", Debt, LOW_MODERATE),
    cat("ultra-short-duration", "Ultra Short Duration", Debt, LOW_MODERATE),
    cat("low-duration", "Low Duration", Debt, LOW_MODERATE),
    cat("money-market", "Money Market", Debt, LOW_MODERATE),
    cat("short-duration", "Short Duration", Debt, MODERATE),
    cat("medium-duration", "Medium Duration", Debt, MODERATE),
    cat("medium-long-duration", "Medium to Long Duration", Debt, MODERATE),
    cat("long-duration", "Long Duration", Debt, MODERATE),
    cat("dynamic-bond", "Dynamic Bond", Debt, MODERATE),
    cat("corporate-bond", "Corporate Bond", Debt, MODERATE),
    cat("credit-risk", "Credit Risk", Debt, MODERATELY_HIGH),
    cat("banking-psu", "Banking and PSU", Debt, MODERATE),
    cat("gilt", "Gilt", Debt, MODERATE),
    cat("gilt-10y", "Gilt with 10 year constant duration", Debt, MODERATE),
    cat("floater", "Floater", Debt, MODERATE),
    cat("conservative-hybrid", "Conservative Hybrid", Hybrid, MODERATELY_HIGH),
    cat("balanced-hybrid", "Balanced Hybrid", Hybrid, HIGH),
    cat("aggressive-hybrid", "Aggressive Hybrid", Hybrid, VERY_HIGH),
    cat("balanced-advantage", "Dynamic Asset Allocation / Balanced Advantage", Hybrid, HIGH),
    cat("multi-asset", "Multi Asset Allocation", Hybrid, HIGH),
    cat("arbitrage", "Arbitrage", Hybrid, LOW),
    cat("equity-savings", "Equity Savings", Hybrid, MODERATE),
    cat("hybrid", "Hybrid", Hybrid, HIGH),
    cat("retirement", "Retirement", Solution, VERY_HIGH),
    cat("childrens", "Children's", Solution, VERY_HIGH),
    cat("index-fund", "Index Funds", Other, VERY_HIGH),
    cat("fof-overseas", "FoF Overseas", Other, VERY_HIGH),
    cat("fof-domestic", "FoF Domestic", Other, HIGH),
    cat("other", "Other", Other, VERY_HIGH),
];

/// (来源标签, 类别 id)，标签已规范化（小写、单空格）
const LABELS: &[(&str, &str)] = &[
    ("equity scheme - large cap fund", "large-cap"),
    ("large cap fund", "large-cap"),
    ("equity scheme - large & mid cap fund", "large-mid-cap"),
    ("large & mid cap fund", "large-mid-cap"),
    ("large and mid cap fund", "large-mid-cap"),
    ("equity scheme - mid cap fund", "mid-cap"),
    ("mid cap fund", "mid-cap"),
    ("equity scheme - small cap fund", "small-cap"),
    ("small cap fund", "small-cap"),
    ("equity scheme - multi cap fund", "multi-cap"),
    ("multi cap fund", "multi-cap"),
    ("equity scheme - flexi cap fund", "flexi-cap"),
    ("flexi cap fund", "flexi-cap"),
    ("equity scheme - focused fund", "focused"),
    ("focused fund", "focused"),
    ("equity scheme - value fund", "value"),
    ("value fund", "value"),
    ("equity scheme - contra fund", "contra"),
    ("contra fund", "contra"),
    ("equity scheme - dividend yield fund", "dividend-yield"),
    ("dividend yield fund", "dividend-yield"),
    ("equity scheme - elss", "elss"),
    ("elss", "elss"),
    ("equity scheme - sectoral/ thematic", "sectoral-thematic"),
    ("sectoral/ thematic", "sectoral-thematic"),
    ("sectoral/thematic", "sectoral-thematic"),
    ("debt scheme - overnight fund", "overnight"),
    ("overnight fund", "overnight"),
    ("debt scheme - liquid fund", "liquid"),
    ("liquid fund", "liquid"),
    ("debt scheme - ultra short duration fund", "ultra-short-duration"),
    ("ultra short duration fund", "ultra-short-duration"),
    ("debt scheme - low duration fund", "low-duration"),
    ("low duration fund", "low-duration"),
    ("debt scheme - money market fund", "money-market"),
    ("money market fund", "money-market"),
    ("debt scheme - short duration fund", "short-duration"),
    ("short duration fund", "short-duration"),
    ("debt scheme - medium duration fund", "medium-duration"),
    ("medium duration fund", "medium-duration"),
    ("debt scheme - medium to long duration fund", "medium-long-duration"),
    ("medium to long duration fund", "medium-long-duration"),
    ("debt scheme - long duration fund", "long-duration"),
    ("long duration fund", "long-duration"),
    ("debt scheme - dynamic bond", "dynamic-bond"),
    ("dynamic bond", "dynamic-bond"),
    ("debt scheme - corporate bond fund", "corporate-bond"),
    ("corporate bond fund", "corporate-bond"),
    ("debt scheme - credit risk fund", "credit-risk"),
    ("credit risk fund", "credit-risk"),
    ("debt scheme - banking and psu fund", "banking-psu"),
    ("banking and psu fund", "banking-psu"),
    ("debt scheme - gilt fund", "gilt"),
    ("gilt fund", "gilt"),
    ("debt scheme - gilt fund with 10 year constant duration", "gilt-10y"),
    ("gilt fund with 10 year constant duration", "gilt-10y"),
    ("debt scheme - floater fund", "floater"),
    ("floater fund", "floater"),
    ("hybrid scheme - conservative hybrid fund", "conservative-hybrid"),
    ("conservative hybrid fund", "conservative-hybrid"),
    ("hybrid scheme - balanced hybrid fund", "balanced-hybrid"),
    ("balanced hybrid fund", "balanced-hybrid"),
    ("hybrid scheme - aggressive hybrid fund", "aggressive-hybrid"),
    ("aggressive hybrid fund", "aggressive-hybrid"),
    (
        "hybrid scheme - dynamic asset allocation or balanced advantage",
        "balanced-advantage",
    ),
    ("dynamic asset allocation or balanced advantage", "balanced-advantage"),
    ("balanced advantage", "balanced-advantage"),
    ("hybrid scheme - multi asset allocation", "multi-asset"),
    ("multi asset allocation", "multi-asset"),
    ("hybrid scheme - arbitrage fund", "arbitrage"),
    ("arbitrage fund", "arbitrage"),
    ("hybrid scheme - equity savings", "equity-savings"),
    ("equity savings", "equity-savings"),
    ("solution oriented scheme - retirement fund", "retirement"),
    ("retirement fund", "retirement"),
    ("solution oriented scheme - children's fund", "childrens"),
    ("children's fund", "childrens"),
    ("other scheme - index funds", "index-fund"),
    ("index funds", "index-fund"),
    ("other scheme - fof overseas", "fof-overseas"),
    ("fof overseas", "fof-overseas"),
    ("other scheme - fof domestic", "fof-domestic"),
    ("fof domestic", "fof-domestic"),
];

/// 关键词规则，按顺序匹配；每条规则要求全部关键词同时出现
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["large", "mid"], "large-mid-cap"),
    (&["large"], "large-cap"),
    (&["mid"], "mid-cap"),
    (&["small"], "small-cap"),
    (&["multi", "asset"], "multi-asset"),
    (&["multi"], "multi-cap"),
    (&["flexi"], "flexi-cap"),
    (&["elss"], "elss"),
    (&["tax"], "elss"),
    (&["sector"], "sectoral-thematic"),
    (&["thematic"], "sectoral-thematic"),
    (&["overnight"], "overnight"),
    (&["liquid"], "liquid"),
    (&["money market"], "money-market"),
    (&["gilt"], "gilt"),
    (&["credit"], "credit-risk"),
    (&["corporate"], "corporate-bond"),
    (&["psu"], "banking-psu"),
    (&["arbitrage"], "arbitrage"),
    (&["hybrid"], "hybrid"),
    (&["balanced"], "hybrid"),
    (&["retirement"], "retirement"),
    (&["child"], "childrens"),
    (&["index"], "index-fund"),
    (&["overseas"], "fof-overseas"),
    (&["fof"], "fof-domestic"),
    (&["fund of fund"], "fof-domestic"),
];

pub const OTHER_CATEGORY: &str = "other";

fn normalize(label: &str) -> String {
    label
        .replace(['’', '`'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

fn other() -> &'static Category {
    // `other` 一定在表中
    by_id(OTHER_CATEGORY).unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

fn exact_match(label: &str) -> Option<&'static str> {
    LABELS.iter().find(|(l, _)| *l == label).map(|(_, id)| *id)
}

fn substring_match(label: &str) -> Option<&'static str> {
    LABELS
        .iter()
        .filter(|(l, _)| label.contains(l))
        .max_by_key(|(l, _)| l.len())
        .map(|(_, id)| *id)
}

fn keyword_match(label: &str) -> Option<&'static str> {
    KEYWORD_RULES
        .iter()
        .find(|(words, _)| words.iter().all(|w| label.contains(w)))
        .map(|(_, id)| *id)
}

/// 把来源的类别标签解析为类别
pub fn resolve_category(label: &str) -> &'static Category {
    let label = normalize(label);
    if label.is_empty() {
        return other();
    }
    exact_match(&label)
        .or_else(|| substring_match(&label))
        .or_else(|| keyword_match(&label))
        .and_then(by_id)
        .unwrap_or_else(other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_points_at_known_category() {
        for (label, id) in LABELS {
            assert!(by_id(id).is_some(), "label {} -> unknown {}", label, id);
            assert_eq!(*label, normalize(label), "label {} not normalized", label);
        }
        for (_, id) in KEYWORD_RULES {
            assert!(by_id(id).is_some());
        }
    }

    #[test]
    fn exact_then_substring_then_keywords() {
        assert_eq!(resolve_category("Equity Scheme - Large Cap Fund").id, "large-cap");
        assert_eq!(resolve_category("Equity  Scheme - Large & Mid Cap Fund").id, "large-mid-cap");
        // 子串：最长标签优先
        assert_eq!(
            resolve_category("Debt Scheme - Gilt Fund with 10 year constant duration (New)").id,
            "gilt-10y"
        );
        assert_eq!(resolve_category("Open Ended Liquid Fund").id, "liquid");
        // 关键词
        assert_eq!(resolve_category("Large and Midcap").id, "large-mid-cap");
        assert_eq!(resolve_category("Government Gilt Securities").id, "gilt");
        assert_eq!(resolve_category("Balanced").id, "hybrid");
        assert_eq!(resolve_category("Income").id, "other");
        assert_eq!(resolve_category("").id, "other");
    }

    #[test]
    fn categories_carry_parent_and_risk() {
        let c = resolve_category("Debt Scheme - Overnight Fund");
        assert_eq!(c.parent, AssetClass::Debt);
        assert_eq!(c.risk_level, "Low");
        assert_eq!(resolve_category("Solution Oriented Scheme - Children’s Fund").id, "childrens");
    }
}
