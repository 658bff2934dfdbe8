use std::sync::LazyLock;

use regex::Regex;

/// 收益率锚点：带符号两位小数 + %（截图里唯一可靠的分行依据）
static RE_RATE_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+[.,]?\d{2}%").expect("rate anchor regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct PercentAnchor {
    pub value: String,
    /// 清洗文本内的字节偏移
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowCandidate {
    pub index: usize,
    /// 上一锚点末尾（或文本起点）到本锚点末尾
    pub text: String,
    /// 去掉锚点本身后的行前段，名称与数字都在这里
    pub before_rate: String,
    pub anchor: PercentAnchor,
}

pub fn find_anchors(text: &str) -> Vec<PercentAnchor> {
    RE_RATE_ANCHOR
        .find_iter(text)
        .map(|m| PercentAnchor {
            value: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// 以锚点切行：行 i 为上一锚点末尾（首行为 0）到本锚点末尾的子串。
/// 无锚点时返回空列表，由上层作为「无可用行」单独上报。
pub fn segment(text: &str) -> Vec<RowCandidate> {
    let anchors = find_anchors(text);
    let mut rows = Vec::with_capacity(anchors.len());
    let mut prev_end = 0usize;
    for (index, anchor) in anchors.into_iter().enumerate() {
        let row_end = anchor.end;
        let row_text = &text[prev_end..row_end];
        let before_rate = &row_text[..row_text.len() - anchor.value.len()];
        rows.push(RowCandidate {
            index,
            text: row_text.to_string(),
            before_rate: before_rate.to_string(),
            anchor,
        });
        prev_end = row_end;
    }
    rows
}
