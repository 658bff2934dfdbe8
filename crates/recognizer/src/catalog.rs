use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

/// 东方财富全量基金列表（JS 赋值包裹一个 JSON 数组）
pub const FUND_LIST_URL: &str = "https://fund.eastmoney.com/js/fundcode_search.js";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub fund_code: String,
    pub fund_name: String,
}

#[derive(Default)]
struct CacheSlot {
    list: Option<Arc<Vec<CatalogEntry>>>,
    loaded_at: Option<DateTime<Utc>>,
}

/// 基金目录缓存：首次使用时拉取并常驻内存，整表替换，不做部分更新。
/// 锁跨 fetch 持有，等价于「同一时刻最多一个在途请求」，并发 load 共享同一次结果。
pub struct CatalogService {
    client: reqwest::Client,
    url: String,
    cache: Mutex<CacheSlot>,
}

pub fn build_client() -> Result<reqwest::Client, String> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(
        REFERER,
        HeaderValue::from_static("https://fund.eastmoney.com/"),
    );

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        // 使用接近浏览器的 UA，降低被上游拦截概率
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36")
        .default_headers(headers)
        .build()
        .map_err(|e| e.to_string())
}

/// 从整包文本里取出方括号数组并解析为目录项。
/// 仅消费每行的第 0 位（代码）与第 2 位（名称），其余位置忽略；
/// 只保留恰好 6 位数字代码且名称非空的行。
pub fn parse_fund_catalog(text: &str) -> Result<Vec<CatalogEntry>, String> {
    let start = text.find('[').ok_or_else(|| "基金列表格式异常".to_string())?;
    let end = text.rfind(']').ok_or_else(|| "基金列表格式异常".to_string())?;
    if end < start {
        return Err("基金列表格式异常".to_string());
    }

    let v: Value = serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())?;
    let arr = v
        .as_array()
        .ok_or_else(|| "基金列表格式异常".to_string())?;

    let mut out: Vec<CatalogEntry> = Vec::with_capacity(arr.len());
    for item in arr {
        let Some(row) = item.as_array() else {
            continue;
        };
        if row.len() < 3 {
            continue;
        }
        let code = row[0].as_str().unwrap_or("").trim();
        let name = row[2].as_str().unwrap_or("").trim();
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
            continue;
        }
        out.push(CatalogEntry {
            fund_code: code.to_string(),
            fund_name: name.to_string(),
        });
    }
    Ok(out)
}

async fn fetch_fund_catalog(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<CatalogEntry>, String> {
    let text = client
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?
        .text()
        .await
        .map_err(|e| e.to_string())?;

    parse_fund_catalog(&text)
}

impl CatalogService {
    pub fn new(url: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            client: build_client()?,
            url: url.into(),
            cache: Mutex::new(CacheSlot::default()),
        })
    }

    /// 幂等加载：命中缓存直接返回；未命中时拉取并整表写入。
    /// 拉取失败不落缓存，下次 load 自动重试；空列表同样不缓存。
    pub async fn load(&self) -> Result<Arc<Vec<CatalogEntry>>, String> {
        let mut slot = self.cache.lock().await;
        if let Some(list) = &slot.list
            && !list.is_empty()
        {
            return Ok(list.clone());
        }

        let fetched = fetch_fund_catalog(&self.client, &self.url).await?;
        tracing::info!(count = fetched.len(), "基金列表拉取完成");
        let list = Arc::new(fetched);
        if !list.is_empty() {
            slot.list = Some(list.clone());
            slot.loaded_at = Some(Utc::now());
        }
        Ok(list)
    }

    /// 清空缓存，下一次 load 必然重新拉取
    pub async fn invalidate(&self) {
        let mut slot = self.cache.lock().await;
        slot.list = None;
        slot.loaded_at = None;
    }

    /// 当前缓存状态（条数 + 加载时间），供健康检查上报
    pub async fn status(&self) -> (usize, Option<DateTime<Utc>>) {
        let slot = self.cache.lock().await;
        let count = slot.list.as_ref().map(|l| l.len()).unwrap_or(0);
        (count, slot.loaded_at)
    }
}
