use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    sync::{Arc, RwLock},
    time::Duration,
};

use serde_json::Value;

use crate::catalog::FUND_LIST_URL;
use crate::vision::OcrTimeouts;

#[derive(Clone)]
pub struct ConfigStore {
    data: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl ConfigStore {
    pub fn load() -> Self {
        let path = detect_config_path();
        let mut data = default_config();

        if path.exists()
            && let Ok(bytes) = fs::read(&path)
            && let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&bytes)
        {
            for (k, v) in map {
                data.insert(k, v);
            }
        }

        // 环境变量覆盖配置文件
        if let Some(port) = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
        {
            data.insert("port".into(), Value::Number(serde_json::Number::from(port)));
        }
        if let Ok(debug) = std::env::var("DEBUG") {
            data.insert("debug".into(), Value::Bool(debug.to_lowercase() == "true"));
        }
        if let Ok(url) = std::env::var("CATALOG_URL") {
            data.insert("catalog_url".into(), Value::String(url));
        }
        for (env_key, cfg_key) in [
            ("OCR_START_TIMEOUT_MS", "ocr_start_timeout_ms"),
            ("OCR_RESULT_TIMEOUT_MS", "ocr_result_timeout_ms"),
        ] {
            if let Some(ms) = std::env::var(env_key)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
            {
                data.insert(
                    cfg_key.into(),
                    Value::Number(serde_json::Number::from(ms)),
                );
            }
        }

        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        let guard = self.data.read().expect("config read lock");
        match guard.get(key) {
            Some(Value::Bool(v)) => *v,
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default() != 0,
            _ => default,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        let guard = self.data.read().expect("config read lock");
        match guard.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        let guard = self.data.read().expect("config read lock");
        match guard.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(default),
            Some(Value::String(s)) => s.parse::<i64>().unwrap_or(default),
            _ => default,
        }
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        let mut guard = self.data.write().expect("config write lock");
        guard.insert(key.to_string(), Value::Bool(value));
    }

    pub fn port(&self) -> u16 {
        u16::try_from(self.get_i64("port", 8001)).unwrap_or(8001)
    }

    pub fn debug(&self) -> bool {
        self.get_bool("debug", false)
    }

    pub fn catalog_url(&self) -> String {
        self.get_string("catalog_url")
            .unwrap_or_else(|| FUND_LIST_URL.to_string())
    }

    pub fn ocr_timeouts(&self) -> OcrTimeouts {
        let defaults = OcrTimeouts::default();
        let start = self.get_i64("ocr_start_timeout_ms", defaults.start.as_millis() as i64);
        let result = self.get_i64("ocr_result_timeout_ms", defaults.result.as_millis() as i64);
        OcrTimeouts {
            start: Duration::from_millis(start.max(0) as u64),
            result: Duration::from_millis(result.max(0) as u64),
        }
    }
}

fn default_config() -> BTreeMap<String, Value> {
    let mut m = BTreeMap::new();
    m.insert("port".into(), Value::Number(8001.into()));
    m.insert("debug".into(), Value::Bool(false));
    m.insert("catalog_url".into(), Value::String(FUND_LIST_URL.into()));
    m.insert("ocr_start_timeout_ms".into(), Value::Number(5000.into()));
    m.insert("ocr_result_timeout_ms".into(), Value::Number(8000.into()));
    m
}

fn detect_config_path() -> PathBuf {
    // 容器部署优先 /app/config/config.json，本地开发回退到当前目录
    let preferred = PathBuf::from("/app/config/config.json");
    if preferred.exists() {
        return preferred;
    }
    PathBuf::from("config.json")
}
