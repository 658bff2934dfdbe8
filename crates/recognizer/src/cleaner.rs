use std::sync::LazyLock;

use regex::Regex;

/// 通用干扰词：仅表头/广告等非金融内容，不包含任何基金名称或特征词
const UNIVERSAL_NOISE: [&str; 13] = [
    "市场解读",
    "行情能否延续",
    "持有收益率排序",
    "我的持有",
    "全部偏股",
    "偏债指数",
    "金选指数基金",
    "金额/昨日",
    "持有收益/率",
    "名称",
    "查看更多",
    "涨跌幅",
    "今日",
];

static RE_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}:\d{1,2}\d?").expect("clock regex"));

static RE_GLUED_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\d.])(\d{6,})($|[^\d.])").expect("glued digits regex"));

static RE_UNSIGNED_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\d+\-])(\d+[.,]\d{2})%").expect("unsigned rate regex"));

fn keep_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
        || c.is_ascii_digit()
        || c.is_ascii_alphabetic()
        || matches!(c, ',' | '.' | '%' | '+' | '-' | '(' | ')' | '/')
}

/// 整数部分补千分位（从右往左每 3 位插逗号）
pub fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        let rest = chars.len() - i;
        if i > 0 && rest % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

/// OCR 原始文本深度清洗：
/// 1. 去掉状态栏时间（如 15:16，需在字符过滤前做，过滤后冒号已不存在）
/// 2. 仅保留中文、数字、字母及金融符号（, . % + - ( ) /）
/// 3. 过滤通用干扰词（表头/广告），不删任何基金名相关字符
/// 4. 粘连长数字修复（1019348 → 10,193.48，末两位视为小数）
/// 5. 紧挨 % 的无符号两位小数补 +
pub fn clean(raw: &str) -> String {
    let no_clock = RE_CLOCK.replace_all(raw, "");

    let mut text: String = no_clock.chars().filter(|c| keep_char(*c)).collect();

    for word in UNIVERSAL_NOISE {
        if text.contains(word) {
            text = text.replace(word, "");
        }
    }

    let regrouped = RE_GLUED_DIGITS.replace_all(&text, |caps: &regex::Captures| {
        let pre = &caps[1];
        let num = &caps[2];
        let suf = &caps[3];
        let split = num.len() - 2;
        format!("{pre}{}.{}{suf}", group_thousands(&num[..split]), &num[split..])
    });

    let signed = RE_UNSIGNED_RATE.replace_all(&regrouped, |caps: &regex::Captures| {
        let pre = &caps[1];
        let num = caps[2].replace(',', ".");
        format!("{pre}+{num}%")
    });

    signed.trim().to_string()
}
