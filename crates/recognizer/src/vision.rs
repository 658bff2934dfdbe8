use std::time::Duration;

use tokio::sync::mpsc;

/// 引擎启动超时（对齐端侧 VisionKit 的 5s）
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);
/// 识别结果等待上限，超时后用已收到的片段继续
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrTimeouts {
    pub start: Duration,
    pub result: Duration,
}

impl Default for OcrTimeouts {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_TIMEOUT,
            result: DEFAULT_RESULT_TIMEOUT,
        }
    }
}

/// 解码后的 RGBA 像素帧，由图片采集方提供
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameBuffer {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 || self.data.len() != self.expected_len() {
            return Err("图像数据长度与宽高不一致".to_string());
        }
        Ok(())
    }
}

/// 图片采集方：按图片句柄给出解码（可能已压缩）后的位图。
/// 解码、压缩如何实现不在本核心关心范围内。
pub trait ImageSource: Send + Sync {
    fn acquire(
        &self,
        image_path: &str,
    ) -> impl Future<Output = Result<FrameBuffer, String>> + Send;
}

/// 端上文字识别引擎。会话是受管资源：启动后无论成败都必须释放。
pub trait TextDetector: Send + Sync {
    type Session: DetectorSession;

    /// 设备能力检查；不支持时整次识别直接失败，无需重试
    fn check_support(&self) -> Result<(), String>;

    /// 启动一个识别会话（由调用方套启动超时）
    fn start(&self) -> impl Future<Output = Result<Self::Session, String>> + Send;
}

/// 引擎把片段以事件流（可能多次、无序、无位置信息）推给调用方；
/// 调用方在截止时间内收敛成一个结果。
pub trait DetectorSession: Send {
    fn run(&mut self, frame: FrameBuffer) -> mpsc::Receiver<String>;

    /// 立即释放底层资源（任何退出路径都要调用，避免泄漏）
    fn release(self);
}

/// 在截止时间内收集片段：通道关闭视为自然完成，超时则带着已收到的部分返回。
/// 超时不是硬错误。
pub async fn collect_fragments(mut rx: mpsc::Receiver<String>, deadline: Duration) -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = &mut timer => {
                tracing::warn!(count = fragments.len(), "识别超时，使用已收到的片段");
                break;
            }
            next = rx.recv() => match next {
                Some(fragment) => {
                    let t = fragment.trim();
                    if !t.is_empty() {
                        fragments.push(t.to_string());
                    }
                }
                None => break,
            },
        }
    }
    fragments
}
