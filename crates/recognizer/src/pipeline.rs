use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::catalog::CatalogService;
use crate::classify::{self, ParsedRecord};
use crate::matcher::{self, MatchResult, MatchScore};
use crate::segment;
use crate::vision::{DetectorSession, ImageSource, OcrTimeouts, TextDetector, collect_fragments};

/// 模糊得分达到该档（「高」）才直接入账，低于则要求人工确认
pub const HIGH_CONFIDENCE_MIN_SCORE: u32 = 3;

#[derive(Debug, Error)]
pub enum RecognizeError {
    /// 设备/运行时缺少文字识别能力，本次调用直接失败
    #[error("当前设备不支持文字识别: {0}")]
    Unsupported(String),
    /// 图片句柄无效或位图获取失败，换图可重试
    #[error("图片读取失败: {0}")]
    Acquisition(String),
    /// 引擎启动失败或中途出错，换设备可重试
    #[error("识别引擎异常，请更换设备重试: {0}")]
    Engine(String),
    #[error("OCR识别为空：图片模糊或未包含基金数据")]
    EmptyRecognition,
    #[error("识别内容均为干扰文本，未包含有效基金数据")]
    NoiseOnly,
    #[error("未定位到收益率锚点，未识别到有效基金数据")]
    NoAnchors,
    #[error("成功识别0条，失败{discarded}条")]
    NoAcceptedRows { discarded: usize },
    #[error("基金列表加载失败: {0}")]
    Catalog(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    AbnormalFields,
    Unmatched,
    LowConfidence,
}

impl DiscardReason {
    pub fn label(self) -> &'static str {
        match self {
            DiscardReason::AbnormalFields => "字段异常",
            DiscardReason::Unmatched => "未匹配",
            DiscardReason::LowConfidence => "匹配度低(＜90%)",
        }
    }
}

impl Serialize for DiscardReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscardedRow {
    pub name: String,
    pub hold_amount: String,
    pub reason: DiscardReason,
}

/// 通过全部校验并完成目录对账的最终持仓条目
#[derive(Debug, Clone, Serialize)]
pub struct FinalItem {
    pub raw_name: String,
    pub fund_code: String,
    pub fund_name: String,
    pub match_score: MatchScore,
    pub match_label: &'static str,
    pub hold_amount: String,
    pub hold_profit: String,
    pub position_amount: Decimal,
    pub holding_profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognizeReport {
    pub records: Vec<FinalItem>,
    pub discarded: Vec<DiscardedRow>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundSummary {
    pub total_hold_amount: String,
    pub total_hold_profit: String,
}

fn parse_amount(text: &str) -> Decimal {
    let plain = text.trim().replace(',', "");
    if plain.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&plain).unwrap_or(Decimal::ZERO)
}

/// 汇总：仅总持有金额、总持有收益（异常行字段为空串，计为 0）
pub fn calc_fund_summary(records: &[ParsedRecord]) -> FundSummary {
    let mut total_amount = Decimal::ZERO;
    let mut total_profit = Decimal::ZERO;
    for r in records {
        total_amount += parse_amount(&r.hold_amount);
        total_profit += parse_amount(&r.hold_profit);
    }
    FundSummary {
        total_hold_amount: format!("{:.2}", total_amount),
        total_hold_profit: format!("{:.2}", total_profit),
    }
}

/// 清洗文本 → 锚点切行 → 逐行量级分类 → 按复合键去重。
/// 异常行保留在结果里，由上层决定上报口径。
pub fn parse_holdings(clean_text: &str) -> Vec<ParsedRecord> {
    let rows = segment::segment(clean_text);
    let records: Vec<ParsedRecord> = rows.iter().map(classify::classify).collect();
    classify::dedup_records(records)
}

fn accepts(result: &MatchResult) -> bool {
    match result.match_score {
        MatchScore::Code => true,
        MatchScore::Token(s) => s >= HIGH_CONFIDENCE_MIN_SCORE,
    }
}

fn final_item(record: &ParsedRecord, matched: &MatchResult) -> FinalItem {
    FinalItem {
        raw_name: record.name.clone(),
        fund_code: matched.fund_code.clone(),
        fund_name: matched.fund_name.clone(),
        match_score: matched.match_score,
        match_label: matched.match_label,
        hold_amount: record.hold_amount.clone(),
        hold_profit: record.hold_profit.clone(),
        position_amount: parse_amount(&record.hold_amount),
        holding_profit: parse_amount(&record.hold_profit),
    }
}

/// 文本入口：对一批原始片段跑「清洗 → 切行 → 分类 → 并发对账」全流程。
/// 空识别、纯干扰、无锚点、零入账分别是独立的失败口径。
pub async fn recognize_fragments(
    fragments: &[String],
    catalog: &CatalogService,
) -> Result<RecognizeReport, RecognizeError> {
    if fragments.iter().all(|f| f.trim().is_empty()) {
        return Err(RecognizeError::EmptyRecognition);
    }

    let raw: String = fragments.concat();
    let clean = crate::cleaner::clean(&raw);
    if clean.is_empty() {
        return Err(RecognizeError::NoiseOnly);
    }
    tracing::debug!(len = clean.len(), "清洗完成");

    let records = parse_holdings(&clean);
    if records.is_empty() {
        return Err(RecognizeError::NoAnchors);
    }

    let list = catalog.load().await.map_err(RecognizeError::Catalog)?;

    // 行之间互不依赖，对账是只读目录快照上的纯函数，可安全并发
    let mut set: JoinSet<(usize, Option<MatchResult>)> = JoinSet::new();
    for (idx, record) in records.iter().enumerate() {
        if record.is_abnormal {
            continue;
        }
        let name = record.name.clone();
        let list = list.clone();
        set.spawn(async move { (idx, matcher::match_one(&name, &list)) });
    }

    let mut matches: Vec<Option<MatchResult>> = vec![None; records.len()];
    while let Some(joined) = set.join_next().await {
        if let Ok((idx, matched)) = joined {
            matches[idx] = matched;
        }
    }

    let total_rows = records.len();
    let mut accepted: Vec<FinalItem> = Vec::new();
    let mut discarded: Vec<DiscardedRow> = Vec::new();
    for (record, matched) in records.iter().zip(&matches) {
        let reason = if record.is_abnormal {
            Some(DiscardReason::AbnormalFields)
        } else {
            match matched {
                None => Some(DiscardReason::Unmatched),
                Some(m) if !accepts(m) => Some(DiscardReason::LowConfidence),
                Some(_) => None,
            }
        };
        match reason {
            Some(reason) => {
                tracing::info!(name = %record.name, amount = %record.hold_amount, reason = reason.label(), "丢弃");
                discarded.push(DiscardedRow {
                    name: record.name.clone(),
                    hold_amount: record.hold_amount.clone(),
                    reason,
                });
            }
            None => {
                if let Some(m) = matched {
                    accepted.push(final_item(record, m));
                }
            }
        }
    }

    if accepted.is_empty() {
        return Err(RecognizeError::NoAcceptedRows {
            discarded: total_rows,
        });
    }

    let mut seen: HashSet<(String, String, Decimal)> = HashSet::new();
    let records: Vec<FinalItem> = accepted
        .into_iter()
        .filter(|item| {
            seen.insert((
                item.fund_code.clone(),
                item.fund_name.clone(),
                item.position_amount,
            ))
        })
        .collect();

    tracing::info!(
        accepted = records.len(),
        discarded = discarded.len(),
        "识别完成"
    );
    Ok(RecognizeReport {
        records,
        discarded,
        total_rows,
    })
}

/// 截图识别主入口：能力检查 → 取帧 → 启动引擎（限时）→ 收集片段（限时，可部分）→ 文本全流程。
/// 引擎会话在任何路径上都会被释放。
pub async fn recognize<I, D>(
    image_source: &I,
    detector: &D,
    catalog: &CatalogService,
    image_path: &str,
    timeouts: OcrTimeouts,
) -> Result<RecognizeReport, RecognizeError>
where
    I: ImageSource,
    D: TextDetector,
{
    detector
        .check_support()
        .map_err(RecognizeError::Unsupported)?;

    let path = image_path.trim();
    if path.is_empty() {
        return Err(RecognizeError::Acquisition("图片路径无效".to_string()));
    }

    let frame = image_source
        .acquire(path)
        .await
        .map_err(RecognizeError::Acquisition)?;
    frame.validate().map_err(RecognizeError::Acquisition)?;

    let mut session = match tokio::time::timeout(timeouts.start, detector.start()).await {
        Err(_) => return Err(RecognizeError::Engine("启动超时".to_string())),
        Ok(Err(e)) => return Err(RecognizeError::Engine(e)),
        Ok(Ok(session)) => session,
    };

    let rx = session.run(frame);
    let fragments = collect_fragments(rx, timeouts.result).await;
    session.release();
    tracing::debug!(count = fragments.len(), "片段收集完成");

    recognize_fragments(&fragments, catalog).await
}
