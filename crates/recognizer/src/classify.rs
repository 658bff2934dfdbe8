use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cleaner::group_thousands;
use crate::segment::RowCandidate;

pub const UNRECOGNIZED_NAME: &str = "(未识别名称)";

static RE_RATE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+[.,]?\d{2}%?").expect("rate-like regex"));

static RE_AMOUNT_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[\d,]+[.,]\d{2}").expect("amount-like regex"));

static RE_NUM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[\d,]+[.,]\d{2}%?").expect("num block regex"));

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("spaces regex"));

/// 单行解析结果。isAbnormal 为 true 时金额/收益为空串，行保留给上层上报原因。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    pub name: String,
    pub hold_amount: String,
    pub hold_profit: String,
    pub is_abnormal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericToken {
    /// 标准化串：千分位 + 两位小数，仅保留负号
    pub normalized: String,
    pub value: Decimal,
    pub magnitude: Decimal,
}

/// 数字标准化：修复千分位/小数点，末两位视为小数；正数输出无前导 +，负数保留 -。
/// 纯数字不足 2 位时原样返回。
pub fn normalize_number(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let trailing_pct = if trimmed.contains('%') { "%" } else { "" };
    let no_pct = trimmed.replace('%', "");
    let negative = no_pct.starts_with('-');
    let unsigned = no_pct.trim_start_matches(['+', '-']);
    let digits: String = unsigned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 2 {
        return raw.to_string();
    }
    let split = digits.len() - 2;
    let sign = if negative { "-" } else { "" };
    format!(
        "{sign}{}.{}{trailing_pct}",
        group_thousands(&digits[..split]),
        &digits[split..]
    )
}

/// 行前段去掉全部数字块后剩下的就是名称；末尾单个字母（份额 A/C/E）原样保留。
/// 清不出内容时回退到占位名。
pub fn extract_name(before_rate: &str) -> String {
    let no_rates = RE_RATE_LIKE.replace_all(before_rate, "");
    let no_amounts = RE_AMOUNT_LIKE.replace_all(&no_rates, "");
    let collapsed = RE_SPACES.replace_all(&no_amounts, " ");
    collapsed.trim().to_string()
}

/// 提取行内全部数字块（跳过收益率本身），按原串去重后标准化。
pub fn numeric_tokens(before_rate: &str) -> Vec<NumericToken> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<NumericToken> = Vec::new();
    for m in RE_NUM_BLOCK.find_iter(before_rate) {
        let raw = m.as_str().trim();
        if raw.is_empty() || raw.ends_with('%') {
            continue;
        }
        if !seen.insert(raw.to_string()) {
            continue;
        }
        let normalized = normalize_number(raw);
        let plain = normalized.replace(',', "");
        let Ok(value) = Decimal::from_str_exact(&plain) else {
            continue;
        };
        out.push(NumericToken {
            normalized,
            magnitude: value.abs(),
            value,
        });
    }
    out
}

/// 量级分配 + 强校验：
/// 金额=最大（无符号输出），持有收益=次大（保留符号），最小者为昨日参考值仅用于校验。
/// 金额量级须严格大于收益、收益须严格大于昨日值，否则整行标异常。
pub fn classify(row: &RowCandidate) -> ParsedRecord {
    let name = {
        let n = extract_name(&row.before_rate);
        if n.is_empty() { UNRECOGNIZED_NAME.to_string() } else { n }
    };

    let mut tokens = numeric_tokens(&row.before_rate);
    if tokens.len() < 3 {
        return ParsedRecord {
            name,
            hold_amount: String::new(),
            hold_profit: String::new(),
            is_abnormal: true,
        };
    }

    tokens.sort_by(|a, b| b.magnitude.cmp(&a.magnitude));
    let amount = &tokens[0];
    let profit = &tokens[1];
    let reference = &tokens[tokens.len() - 1];

    if amount.magnitude <= profit.magnitude || profit.magnitude <= reference.magnitude {
        return ParsedRecord {
            name,
            hold_amount: String::new(),
            hold_profit: String::new(),
            is_abnormal: true,
        };
    }

    ParsedRecord {
        name,
        hold_amount: amount.normalized.trim_start_matches('-').to_string(),
        hold_profit: profit.normalized.clone(),
        is_abnormal: false,
    }
}

/// 按（名称, 金额, 收益）复合键去重，保留先出现的行
pub fn dedup_records(records: Vec<ParsedRecord>) -> Vec<ParsedRecord> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.name.clone(),
                r.hold_amount.clone(),
                r.hold_profit.clone(),
            ))
        })
        .collect()
}
