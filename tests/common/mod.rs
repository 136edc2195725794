// tests/common/mod.rs

#![allow(dead_code)]

use media_dl::{
    DownloadManager, DownloadTask,
    config::AppConfig,
    persistence::{KeyValueBackend, MemoryBackend},
    storage::{MemoryStorage, StorageAdapter},
};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::watch,
};

/// 一个简单的 HTTP 服务器：先发送响应头和一半数据，
/// 然后一直等到 `release()` 才发送剩余部分，让传输停留在“下载中”。
/// `hanging_up` 创建的服务器发完一半后直接断开连接。
pub struct GatedServer {
    base: String,
    gate: watch::Sender<bool>,
    hits: Arc<AtomicUsize>,
}

impl GatedServer {
    pub async fn start(body_len: usize) -> Self {
        Self::spawn(body_len, false).await
    }

    pub async fn hanging_up(body_len: usize) -> Self {
        Self::spawn(body_len, true).await
    }

    async fn spawn(body_len: usize, hang_up: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (gate, rx) = watch::channel(false);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut rx = rx.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut request = Vec::new();
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);

                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body_len
                    );
                    let half = body_len / 2;
                    if socket.write_all(head.as_bytes()).await.is_err()
                        || socket.write_all(&vec![1u8; half]).await.is_err()
                        || socket.flush().await.is_err()
                    {
                        return;
                    }
                    if hang_up {
                        let _ = socket.shutdown().await;
                        return;
                    }
                    if rx.wait_for(|open| *open).await.is_err() {
                        return;
                    }
                    let _ = socket.write_all(&vec![2u8; body_len - half]).await;
                    let _ = socket.flush().await;
                });
            }
        });

        Self { base, gate, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// 放行所有正在等待和之后到来的请求
    pub fn release(&self) {
        let _ = self.gate.send(true);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// 测试用的设置：超时较短，避免失败的测试挂起
pub fn test_settings() -> AppConfig {
    AppConfig {
        response_timeout: Some(Duration::from_secs(5)),
        idle_timeout: Some(Duration::from_secs(5)),
        ..AppConfig::default()
    }
}

pub struct Harness {
    pub manager: DownloadManager,
    pub storage: Arc<MemoryStorage>,
    pub backend: Arc<MemoryBackend>,
}

pub fn harness_with(settings: AppConfig) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let backend = Arc::new(MemoryBackend::new());
    let manager = DownloadManager::new(
        storage.clone() as Arc<dyn StorageAdapter>,
        backend.clone() as Arc<dyn KeyValueBackend>,
        settings,
    )
    .expect("创建下载管理器失败");
    Harness {
        manager,
        storage,
        backend,
    }
}

pub fn harness() -> Harness {
    harness_with(test_settings())
}

/// 轮询直到条件满足，超时则测试失败
pub async fn wait_until<F>(manager: &DownloadManager, what: &str, check: F) -> Vec<DownloadTask>
where
    F: Fn(&[DownloadTask]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let tasks = manager.get_download_tasks();
        if check(&tasks) {
            return tasks;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("等待超时: {}，当前任务: {:#?}", what, tasks);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("操作超时")
}
