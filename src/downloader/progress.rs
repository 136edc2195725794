// src/downloader/progress.rs

use crate::constants::progress::{BUFFERED, TRANSFER_CAP};

/// 把接收到的字节数换算为任务进度。
///
/// 进度只增不减：重新开始的传输从 0 字节算起，
/// 但不会把界面上已经显示的进度往回拉。
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    reported: u8,
}

impl ProgressTracker {
    /// `floor` 是任务开始时已有的进度
    pub fn new(total: Option<u64>, floor: u8) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            received: 0,
            reported: floor,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn reported(&self) -> u8 {
        self.reported
    }

    /// 记录新收到的数据块。进度有提升时返回新的百分比。
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.received = self.received.saturating_add(bytes);
        let total = self.total?;
        let percent = (self.received.saturating_mul(100) / total).min(TRANSFER_CAP as u64) as u8;
        self.raise(percent)
    }

    /// 数据全部接收完毕。总大小未知时直接跳到一个较高的中间值。
    pub fn finish_body(&mut self) -> Option<u8> {
        match self.total {
            Some(_) => self.raise(TRANSFER_CAP),
            None => self.raise(BUFFERED),
        }
    }

    /// 把进度提升到 `percent`（不会降低）
    pub fn raise(&mut self, percent: u8) -> Option<u8> {
        if percent > self.reported {
            self.reported = percent;
            Some(percent)
        } else {
            None
        }
    }
}
