use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::catalog::CatalogEntry;

/// 份额后缀白名单：A/C/E 是不同的可投份额，不跨后缀匹配
pub const SHARE_CLASS_SUFFIXES: [char; 3] = ['A', 'C', 'E'];

/// 模糊匹配最低得分才返回（避免乱匹配）
pub const FUZZY_MATCH_MIN_SCORE: u32 = 1;

/// 名称级干扰词：OCR 常混入的表头、广告、按钮文案，与清洗阶段的通用干扰词分列
const FUND_NAME_GARBAGE: [&str; 12] = [
    "金选指数基金",
    "金选 指数基金",
    "删除",
    "未匹配到基金",
    "将跳过",
    "市场解读",
    "有色金属大反攻",
    "行情能否延续",
    "持有金额",
    "昨日收益",
    "持有收益",
    "收益率",
];

/// OCR 常把 QDII-LOF-FOF 的横线丢掉，按变形程度从长到短修复
static RE_QDII_VARIANTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(QDIIOFFOF|QDIILOFFOF|QDILOFFOF|QDILOFFO)").expect("qdii regex")
});

static RE_LEADING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([^)]*\)").expect("leading paren regex"));

static RE_FUND_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{6}").expect("fund code regex"));

/// 关键词加成规则表：识别名命中任一 query 词且库名含 name 词时加分。
/// 独立成表便于扩展，不修改打分算法本身。
struct KeywordBonus {
    query_needles: &'static [&'static str],
    name_needle: &'static str,
    weight: u32,
}

const KEYWORD_BONUSES: [KeywordBonus; 10] = [
    KeywordBonus { query_needles: &["360"], name_needle: "360", weight: 3 },
    KeywordBonus { query_needles: &["互联网"], name_needle: "互联网", weight: 2 },
    KeywordBonus { query_needles: &["大数据"], name_needle: "大数据", weight: 2 },
    KeywordBonus { query_needles: &["100"], name_needle: "100", weight: 1 },
    KeywordBonus { query_needles: &["红利"], name_needle: "红利", weight: 2 },
    KeywordBonus { query_needles: &["黄金", "etf"], name_needle: "黄金ETF", weight: 2 },
    KeywordBonus { query_needles: &["汇添富"], name_needle: "汇添富", weight: 2 },
    KeywordBonus { query_needles: &["大成"], name_needle: "大成中证", weight: 1 },
    KeywordBonus { query_needles: &["前海"], name_needle: "前海开源", weight: 2 },
    KeywordBonus { query_needles: &["国泰"], name_needle: "国泰", weight: 1 },
];

/// 得分：普通 token 命中累积值，或代码兜底命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScore {
    Token(u32),
    Code,
}

impl MatchScore {
    pub fn label(self) -> &'static str {
        match self {
            MatchScore::Code => "代码匹配",
            MatchScore::Token(s) if s >= 3 => "高",
            MatchScore::Token(s) if s >= 2 => "中",
            MatchScore::Token(s) if s >= 1 => "低",
            MatchScore::Token(_) => "",
        }
    }
}

impl Serialize for MatchScore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MatchScore::Token(s) => serializer.serialize_u32(*s),
            MatchScore::Code => serializer.serialize_str("code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub fund_code: String,
    pub fund_name: String,
    pub match_score: MatchScore,
    pub match_label: &'static str,
}

impl MatchResult {
    fn new(entry: &CatalogEntry, match_score: MatchScore) -> Self {
        Self {
            fund_code: entry.fund_code.clone(),
            fund_name: entry.fund_name.clone(),
            match_label: match_score.label(),
            match_score,
        }
    }
}

/// 深度清洗识别出的基金名称：去干扰词、修复变形符号、仅去掉开头的括号块
/// （括号后紧跟的字母可能是份额后缀，不能删）
pub fn clean_fund_name(raw: &str) -> String {
    let mut clean = raw.trim().to_string();
    if clean.is_empty() {
        return clean;
    }
    for word in FUND_NAME_GARBAGE {
        if clean.contains(word) {
            clean = clean.replace(word, "");
        }
    }
    clean = RE_QDII_VARIANTS.replace_all(&clean, "QDII-LOF-FOF").into_owned();
    clean = RE_LEADING_PAREN.replace(&clean, "").into_owned();
    clean.trim().to_string()
}

/// 文本中第一个 6 位数字（代码兜底用）
pub fn extract_fund_code(text: &str) -> Option<String> {
    RE_FUND_CODE.find(text).map(|m| m.as_str().to_string())
}

fn share_class_suffix(name: &str) -> Option<char> {
    let last = name.chars().last()?.to_ascii_uppercase();
    SHARE_CLASS_SUFFIXES.contains(&last).then_some(last)
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// 把名称切成可匹配短词：数字段（≥2 位）、中文二/三字滑窗、字母或 + 连续段（≥2），
/// 便于「大成中证360互联网+大数据100」这类长名命中
pub fn tokenize_for_match(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |tokens: &mut Vec<String>, tk: String| {
        if seen.insert(tk.clone()) {
            tokens.push(tk);
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i - start >= 2 {
                push(&mut tokens, chars[start..i].iter().collect());
            }
        } else if is_cjk(c) {
            if i + 2 <= chars.len() && chars[i..i + 2].iter().all(|c| is_cjk(*c)) {
                push(&mut tokens, chars[i..i + 2].iter().collect());
            }
            if i + 3 <= chars.len() && chars[i..i + 3].iter().all(|c| is_cjk(*c)) {
                push(&mut tokens, chars[i..i + 3].iter().collect());
            }
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '+' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '+') {
                i += 1;
            }
            if i - start >= 2 {
                push(&mut tokens, chars[start..i].iter().collect());
            }
        } else {
            i += 1;
        }
    }
    tokens
}

fn keyword_bonus(clean_lower: &str, candidate_name: &str) -> u32 {
    let mut bonus = 0;
    for rule in &KEYWORD_BONUSES {
        if !candidate_name.contains(rule.name_needle) {
            continue;
        }
        if rule.query_needles.iter().any(|n| clean_lower.contains(n)) {
            bonus += rule.weight;
        }
    }
    bonus
}

/// 模糊匹配单只基金：仅在识别名与库名份额后缀一致（A/C/E）时打分，
/// 不跨后缀、不默认 A 类；识别名无后缀时直接放弃，由调用方提示手动输代码。
/// 得分不足时尝试名称内嵌 6 位代码兜底（同样要求后缀一致）。
pub fn fuzzy_match_fund(clean_name: &str, catalog: &[CatalogEntry]) -> Option<MatchResult> {
    if clean_name.is_empty() || catalog.is_empty() {
        return None;
    }
    let suffix = share_class_suffix(clean_name)?;

    let clean_lower = clean_name.to_lowercase();
    let tokens: Vec<String> = tokenize_for_match(clean_name)
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();

    let mut best: Option<&CatalogEntry> = None;
    let mut max_score = 0u32;

    for entry in catalog {
        let name = entry.fund_name.as_str();
        if name.is_empty() {
            continue;
        }
        match share_class_suffix(name) {
            Some(s) if s == suffix => {}
            _ => continue,
        }

        let name_lower = name.to_lowercase();
        let mut score = tokens.iter().filter(|tk| name_lower.contains(tk.as_str())).count() as u32;
        score += keyword_bonus(&clean_lower, name);

        if score > max_score {
            max_score = score;
            best = Some(entry);
        } else if score == max_score
            && let Some(current) = best
            && name.chars().count() > current.fund_name.chars().count()
        {
            best = Some(entry);
        }
    }

    if max_score >= FUZZY_MATCH_MIN_SCORE
        && let Some(entry) = best
    {
        tracing::debug!(query = %clean_name, matched = %entry.fund_name, score = max_score, "模糊匹配");
        return Some(MatchResult::new(entry, MatchScore::Token(max_score)));
    }

    let code = extract_fund_code(clean_name)?;
    let by_code = catalog.iter().find(|e| e.fund_code == code)?;
    if share_class_suffix(&by_code.fund_name) == Some(suffix) {
        tracing::debug!(%code, matched = %by_code.fund_name, "代码兜底");
        return Some(MatchResult::new(by_code, MatchScore::Code));
    }
    None
}

/// 根据名称匹配单只基金：清洗 → 模糊匹配（含代码兜底）→ 原始名精确/包含兜底。
/// 最后的包含兜底不做后缀约束，作为清洗失败时的最后手段。
pub fn match_one(raw_name: &str, catalog: &[CatalogEntry]) -> Option<MatchResult> {
    let raw = raw_name.trim();
    if raw.is_empty() {
        return None;
    }

    let clean_name = clean_fund_name(raw);
    if !clean_name.is_empty()
        && let Some(result) = fuzzy_match_fund(&clean_name, catalog)
    {
        return Some(result);
    }

    if let Some(exact) = catalog.iter().find(|e| e.fund_name == raw) {
        return Some(MatchResult::new(exact, MatchScore::Token(3)));
    }

    let mut contains: Vec<&CatalogEntry> = catalog
        .iter()
        .filter(|e| raw.contains(e.fund_name.as_str()) || e.fund_name.contains(raw))
        .collect();
    if !contains.is_empty() {
        contains.sort_by(|a, b| b.fund_name.chars().count().cmp(&a.fund_name.chars().count()));
        return Some(MatchResult::new(contains[0], MatchScore::Token(2)));
    }

    tracing::debug!(raw = %raw, clean = %clean_name, "未匹配");
    None
}

/// 按名称或关键词搜索基金（大小写不敏感的子串过滤）
pub fn search_by_name<'a>(
    keyword: &str,
    limit: usize,
    catalog: &'a [CatalogEntry],
) -> Vec<&'a CatalogEntry> {
    let k = keyword.trim().to_lowercase();
    if k.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|e| e.fund_name.to_lowercase().contains(&k))
        .take(limit)
        .collect()
}

/// 整段文本内的一次基金命中（按源文本偏移排序）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMatch {
    pub start: usize,
    pub end: usize,
    pub fund_code: String,
    pub fund_name: String,
}

/// 在整段 OCR 文本中按 6 位基金代码定位（截图常带代码，比名称更稳）
pub fn find_code_matches_in_text(text: &str, catalog: &[CatalogEntry]) -> Vec<TextMatch> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for m in RE_FUND_CODE.find_iter(text) {
        let Some(entry) = catalog.iter().find(|e| e.fund_code == m.as_str()) else {
            continue;
        };
        out.push(TextMatch {
            start: m.start(),
            end: m.end(),
            fund_code: entry.fund_code.clone(),
            fund_name: entry.fund_name.clone(),
        });
    }
    out
}

/// 名称变体：标准名 + 去掉末尾单字母（OCR 常漏份额字母）
pub fn fund_name_search_variants(name: &str) -> Vec<String> {
    let mut out = vec![name.to_string()];
    if let Some(last) = name.chars().last()
        && last.is_ascii_alphabetic()
    {
        let trimmed: String = {
            let mut chars: Vec<char> = name.chars().collect();
            chars.pop();
            chars.into_iter().collect::<String>().trim().to_string()
        };
        if trimmed.chars().count() >= 2 && trimmed != name {
            out.push(trimmed);
        }
    }
    out
}

/// 在整段 OCR 文本中找出所有出现的库内基金及其位置（无换行时的多段解析）。
/// 库名从长到短匹配，重叠区间保留先命中的，输出按偏移升序。
pub fn find_name_matches_in_text(text: &str, catalog: &[CatalogEntry]) -> Vec<TextMatch> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut by_len: Vec<&CatalogEntry> = catalog.iter().filter(|e| !e.fund_name.is_empty()).collect();
    by_len.sort_by(|a, b| b.fund_name.chars().count().cmp(&a.fund_name.chars().count()));

    let mut ranges: Vec<TextMatch> = Vec::new();
    let overlaps = |ranges: &[TextMatch], start: usize, end: usize| {
        ranges.iter().any(|r| !(end <= r.start || start >= r.end))
    };

    for entry in by_len {
        for pattern in fund_name_search_variants(&entry.fund_name) {
            if pattern.is_empty() {
                continue;
            }
            let mut from = 0usize;
            while let Some(rel) = text[from..].find(&pattern) {
                let start = from + rel;
                let end = start + pattern.len();
                if !overlaps(&ranges, start, end) {
                    ranges.push(TextMatch {
                        start,
                        end,
                        fund_code: entry.fund_code.clone(),
                        fund_name: entry.fund_name.clone(),
                    });
                }
                from = start + pattern.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    ranges.sort_by_key(|r| r.start);
    ranges
}
