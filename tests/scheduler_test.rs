// tests/scheduler_test.rs

mod common;

use common::{GatedServer, harness, harness_with, test_settings, wait_until, within};
use media_dl::{
    CreateTaskPayload, DownloadEvent, DownloadManager, DownloadTask, TaskPatch, TaskStatus,
    TaskType,
    config::AppConfig,
    models::{ToastLevel, UpdateOptions},
    persistence::{KeyValueBackend, MemoryBackend},
    storage::{MemoryStorage, StorageAdapter},
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

fn song(title: &str, url: &str) -> CreateTaskPayload {
    CreateTaskPayload::new(TaskType::Song, title).with_url(url)
}

fn status_of(manager: &DownloadManager, id: &str) -> TaskStatus {
    manager.get_download_task(id).expect("任务应当存在").status
}

fn downloading(tasks: &[DownloadTask]) -> usize {
    tasks.iter().filter(|t| t.status == TaskStatus::Downloading).count()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_large_remote_file_completes_with_ceiling_one() {
    // --- 1. Arrange ---
    let mut server = mockito::Server::new_async().await;
    let body = vec![7u8; 10 * 1024 * 1024];
    let mock = server
        .mock("GET", "/files/big.mp3")
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(&body)
        .create_async()
        .await;

    let h = harness();
    h.manager.set_download_concurrency(1);
    let mut events = h.manager.subscribe_events();

    // --- 2. Act ---
    let task = h
        .manager
        .create_download_task(song("Big Song", &format!("{}/files/big.mp3", server.url())))
        .unwrap();
    within(h.manager.wait_idle()).await;

    // --- 3. Assert ---
    mock.assert_async().await;
    let done = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(done.path.as_deref(), Some("music/Big Song.mp3"));
    assert_eq!(done.mime.as_deref(), Some("audio/mpeg"));
    assert_eq!(done.file_size, Some(body.len() as u64));
    assert_eq!(done.error, None);
    assert_eq!(h.storage.get("music/Big Song.mp3").map(|b| b.len()), Some(body.len()));

    let mut saw_refresh = false;
    let mut saw_success = false;
    while let Ok(event) = events.try_recv() {
        match event {
            DownloadEvent::LibraryRefresh(refresh) => {
                assert_eq!(refresh.path, "music/Big Song.mp3");
                assert_eq!(refresh.kind, TaskType::Song);
                saw_refresh = true;
            }
            DownloadEvent::Toast { level, task_id, .. } => {
                assert_eq!(task_id, task.id);
                saw_success |= level == ToastLevel::Success;
            }
        }
    }
    assert!(saw_refresh, "应当发出曲库刷新事件");
    assert!(saw_success, "应当发出成功提示");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_five_tasks_with_ceiling_two_promote_in_creation_order() {
    let server = GatedServer::start(200_000).await;
    let h = harness();
    h.manager.set_download_concurrency(2);

    // 每次通知都检查：下载中的任务不超过上限，且都比等待中的任务更早创建
    let violations = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = violations.clone();
    let _sub = h.manager.subscribe_download_tasks(move |tasks| {
        if downloading(tasks) > 2 {
            sink.lock().unwrap().push(format!("{} 个任务同时下载", downloading(tasks)));
        }
        let newest_running = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Downloading)
            .map(|t| t.created_at)
            .max();
        let oldest_waiting = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.created_at)
            .min();
        if let (Some(running), Some(waiting)) = (newest_running, oldest_waiting) {
            if running > waiting {
                sink.lock().unwrap().push("较新的任务先于较早的任务开始".to_string());
            }
        }
    });

    let ids: Vec<String> = (0..5)
        .map(|i| {
            h.manager
                .create_download_task(song(&format!("track {}", i), &server.url(&format!("t{}.mp3", i))))
                .unwrap()
                .id
        })
        .collect();

    let tasks = h.manager.get_download_tasks();
    assert_eq!(downloading(&tasks), 2);
    assert_eq!(status_of(&h.manager, &ids[0]), TaskStatus::Downloading);
    assert_eq!(status_of(&h.manager, &ids[1]), TaskStatus::Downloading);
    for id in &ids[2..] {
        assert_eq!(status_of(&h.manager, id), TaskStatus::Pending);
    }
    let mut active = h.manager.active_task_ids();
    active.sort();
    let mut expected = vec![ids[0].clone(), ids[1].clone()];
    expected.sort();
    assert_eq!(active, expected);

    server.release();
    within(h.manager.wait_idle()).await;

    let tasks = h.manager.get_download_tasks();
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
    assert_eq!(server.hits(), 5);
    assert!(violations.lock().unwrap().is_empty(), "{:?}", violations.lock().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_404_fails_task_and_keeps_progress() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/missing.mp3")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let h = harness();
    let mut events = h.manager.subscribe_events();
    let mut payload = song("Missing", &format!("{}/missing.mp3", server.url()));
    payload.progress = Some(12);
    let task = h.manager.create_download_task(payload).unwrap();
    within(h.manager.wait_idle()).await;

    mock.assert_async().await;
    let failed = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().is_some_and(|e| e.contains("404")));
    assert_eq!(failed.progress, 12);
    assert!(h.storage.file_paths().is_empty());

    let toast = events.try_recv().expect("应当有失败提示");
    assert!(matches!(toast, DownloadEvent::Toast { level: ToastLevel::Error, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_returns_task_to_pending_without_further_updates() {
    let server = GatedServer::start(200_000).await;
    let h = harness();
    let task = h.manager.create_download_task(song("Paused", &server.url("p.mp3"))).unwrap();

    let tasks = wait_until(&h.manager, "收到前一半数据", |tasks| {
        tasks.iter().any(|t| t.id == task.id && t.progress >= 50)
    })
    .await;
    let progress_before = tasks.iter().find(|t| t.id == task.id).unwrap().progress;

    assert!(h.manager.pause_download_task(&task.id));
    let paused = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(paused.status, TaskStatus::Pending);
    assert_eq!(paused.progress, progress_before);
    assert_eq!(paused.error, None);
    assert!(!h.manager.is_active(&task.id));

    // 暂停之后不应再有任何更新
    let updates = Arc::new(Mutex::new(0usize));
    let counter = updates.clone();
    let sub = h.manager.subscribe_download_tasks(move |_| *counter.lock().unwrap() += 1);
    server.release();
    tokio::time::sleep(Duration::from_millis(300)).await;
    sub.unsubscribe();

    assert_eq!(*updates.lock().unwrap(), 1, "只应收到订阅时的那一次回调");
    let still = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(still.status, TaskStatus::Pending);
    assert_eq!(still.progress, progress_before);
    assert!(h.storage.file_paths().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_paused_task_hands_its_slot_to_the_next_in_line() {
    // --- 1. Arrange ---
    let server = GatedServer::start(100_000).await;
    let h = harness();
    h.manager.set_download_concurrency(1);
    let a = h.manager.create_download_task(song("a", &server.url("a.mp3"))).unwrap();
    let b = h.manager.create_download_task(song("b", &server.url("b.mp3"))).unwrap();
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Downloading);
    assert_eq!(status_of(&h.manager, &b.id), TaskStatus::Pending);

    // --- 2. Act ---
    assert!(h.manager.pause_download_task(&a.id));

    // --- 3. Assert ---
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Pending);
    assert_eq!(status_of(&h.manager, &b.id), TaskStatus::Downloading);
    assert_eq!(h.manager.active_task_ids(), vec![b.id.clone()]);

    // 其他操作触发的调度不会让暂停的任务自己开始
    let c = h.manager.create_download_task(song("c", &server.url("c.mp3"))).unwrap();
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Pending);
    assert_eq!(status_of(&h.manager, &c.id), TaskStatus::Pending);

    server.release();
    within(h.manager.wait_idle()).await;
    assert_eq!(status_of(&h.manager, &b.id), TaskStatus::Completed);
    assert_eq!(status_of(&h.manager, &c.id), TaskStatus::Completed);
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Pending);

    assert!(h.manager.resume_download_task(&a.id));
    within(h.manager.wait_idle()).await;
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_closed_mid_body_fails_and_keeps_progress() {
    let server = GatedServer::hanging_up(100_000).await;
    let h = harness();
    let mut events = h.manager.subscribe_events();

    let task = h.manager.create_download_task(song("cut", &server.url("cut.mp3"))).unwrap();
    within(h.manager.wait_idle()).await;

    let failed = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(failed.progress, 50);
    assert!(h.storage.file_paths().is_empty());
    let toast = events.try_recv().expect("应当有失败提示");
    assert!(matches!(toast, DownloadEvent::Toast { level: ToastLevel::Error, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stalled_body_fails_after_idle_timeout() {
    // 服务器发完一半数据后不再发送
    let server = GatedServer::start(100_000).await;
    let h = harness_with(AppConfig {
        idle_timeout: Some(Duration::from_millis(100)),
        ..test_settings()
    });

    let task = h.manager.create_download_task(song("stall", &server.url("s.mp3"))).unwrap();
    within(h.manager.wait_idle()).await;

    let failed = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().is_some_and(|e| e.contains("超时")));
    assert_eq!(failed.progress, 50);
    assert!(!h.manager.is_active(&task.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_pauses_then_resumes_to_completion() {
    let server = GatedServer::start(10_000).await;
    let h = harness();
    let task = h.manager.create_download_task(song("Toggle", &server.url("x.mp3"))).unwrap();
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Downloading);

    let paused = h.manager.toggle_download_task(&task.id).unwrap();
    assert_eq!(paused.status, TaskStatus::Pending);

    server.release();
    let resumed = h.manager.toggle_download_task(&task.id).unwrap();
    // 放行后传输可能在返回前就已完成
    assert!(matches!(resumed.status, TaskStatus::Downloading | TaskStatus::Completed));
    within(h.manager.wait_idle()).await;
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Completed);

    assert!(h.manager.toggle_download_task("no-such-task").is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_aborts_active_transfer() {
    let server = GatedServer::start(200_000).await;
    let h = harness();
    let task = h.manager.create_download_task(song("Gone", &server.url("g.mp3"))).unwrap();
    assert!(h.manager.is_active(&task.id));

    let removed = h.manager.remove_download_task(&task.id).expect("应当返回被移除的任务");
    assert_eq!(removed.id, task.id);
    assert!(h.manager.get_download_task(&task.id).is_none());
    assert!(!h.manager.is_active(&task.id));

    server.release();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.manager.get_download_tasks().is_empty());
    assert!(h.storage.file_paths().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_with_file_deletes_completed_output() {
    let h = harness();
    h.storage.insert("/sdcard/a.mp3", b"abc".to_vec());
    let task = h
        .manager
        .create_download_task(song("Local A", "file:///sdcard/a.mp3"))
        .unwrap();
    within(h.manager.wait_idle()).await;
    assert!(h.storage.get("music/Local A.mp3").is_some());

    h.manager.remove_download_task_with_file(&task.id).await.unwrap();
    assert!(h.storage.get("music/Local A.mp3").is_none());
    // 源文件不受影响
    assert!(h.storage.get("/sdcard/a.mp3").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_finished_keeps_only_unfinished() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/ok.mp3").with_status(200).with_body("ok").create_async().await;
    server.mock("GET", "/bad.mp3").with_status(500).create_async().await;

    let mut settings = test_settings();
    settings.fail_missing_url = false;
    let h = harness_with(settings);

    h.manager.create_download_task(song("ok", &format!("{}/ok.mp3", server.url()))).unwrap();
    h.manager.create_download_task(song("bad", &format!("{}/bad.mp3", server.url()))).unwrap();
    let waiting = h
        .manager
        .create_download_task(CreateTaskPayload::new(TaskType::Song, "no url yet"))
        .unwrap();
    within(h.manager.wait_idle()).await;

    assert_eq!(h.manager.clear_finished_tasks(), 2);
    let tasks = h.manager.get_download_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, waiting.id);
    assert_eq!(tasks[0].status, TaskStatus::Pending);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_url_fails_without_taking_a_slot() {
    let server = GatedServer::start(1_000).await;
    let h = harness();
    h.manager.set_download_concurrency(1);

    let no_url = h
        .manager
        .create_download_task(CreateTaskPayload::new(TaskType::Picture, "cover"))
        .unwrap();
    let real = h.manager.create_download_task(song("real", &server.url("r.mp3"))).unwrap();

    let failed = h.manager.get_download_task(&no_url.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.is_some());
    assert_eq!(status_of(&h.manager, &real.id), TaskStatus::Downloading);

    server.release();
    within(h.manager.wait_idle()).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_url_added_later_starts_pending_task() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/later.mp3").with_status(200).with_body("x").create_async().await;

    let mut settings = test_settings();
    settings.fail_missing_url = false;
    let h = harness_with(settings);
    let task = h
        .manager
        .create_download_task(CreateTaskPayload::new(TaskType::Song, "later"))
        .unwrap();
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Pending);

    h.manager
        .update_download_task(
            &task.id,
            &TaskPatch::default().url(format!("{}/later.mp3", server.url())),
            UpdateOptions::default(),
        )
        .unwrap();
    within(h.manager.wait_idle()).await;
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_skip_schedule_update_does_not_start_task() {
    let mut settings = test_settings();
    settings.fail_missing_url = false;
    let h = harness_with(settings);
    let task = h
        .manager
        .create_download_task(CreateTaskPayload::new(TaskType::Song, "quiet"))
        .unwrap();

    h.manager
        .update_download_task(
            &task.id,
            &TaskPatch::default().url("file:///nowhere.mp3"),
            UpdateOptions::skip_schedule(),
        )
        .unwrap();
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Pending);
    assert!(h.manager.update_download_task("unknown", &TaskPatch::default(), UpdateOptions::default()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_copy_resolves_extension_from_path() {
    let h = harness();
    let bytes = vec![0x66u8; 4096];
    h.storage.insert("/storage/emulated/0/Music/%track.flac", bytes.clone());

    let mut payload = song("Local Track", "file:///storage/emulated/0/Music/%25track.flac");
    payload.ext = Some("mp3".into());
    let task = h.manager.create_download_task(payload).unwrap();
    within(h.manager.wait_idle()).await;

    let done = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.path.as_deref(), Some("music/Local Track.flac"));
    assert_eq!(done.mime.as_deref(), Some("audio/flac"));
    assert_eq!(h.storage.get("music/Local Track.flac"), Some(bytes));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_copy_of_missing_file_fails() {
    let h = harness();
    let task = h
        .manager
        .create_download_task(song("Nope", "file:///does/not/exist.mp3"))
        .unwrap();
    within(h.manager.wait_idle()).await;

    let failed = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lowering_concurrency_demotes_newest_transfers() {
    let server = GatedServer::start(100_000).await;
    let h = harness();
    let ids: Vec<String> = (0..3)
        .map(|i| h.manager.create_download_task(song(&format!("s{}", i), &server.url("s.mp3"))).unwrap().id)
        .collect();
    assert_eq!(downloading(&h.manager.get_download_tasks()), 3);

    let config = h.manager.set_download_concurrency(1);
    assert_eq!(config.concurrency, 1);
    assert_eq!(status_of(&h.manager, &ids[0]), TaskStatus::Downloading);
    assert_eq!(status_of(&h.manager, &ids[1]), TaskStatus::Pending);
    assert_eq!(status_of(&h.manager, &ids[2]), TaskStatus::Pending);
    assert_eq!(h.manager.active_task_ids(), vec![ids[0].clone()]);

    // 超出范围的值被限制
    assert_eq!(h.manager.set_download_concurrency(0).concurrency, 1);
    assert_eq!(h.manager.set_download_concurrency(99).concurrency, 10);

    server.release();
    within(h.manager.wait_idle()).await;
    assert!(h.manager.get_download_tasks().iter().all(|t| t.status == TaskStatus::Completed));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_all_and_start_all() {
    let server = GatedServer::start(100_000).await;
    let mut mock_server = mockito::Server::new_async().await;
    mock_server.mock("GET", "/broken.mp3").with_status(503).create_async().await;

    let h = harness();
    let broken = h
        .manager
        .create_download_task(song("broken", &format!("{}/broken.mp3", mock_server.url())))
        .unwrap();
    wait_until(&h.manager, "失败任务", |tasks| {
        tasks.iter().any(|t| t.id == broken.id && t.status == TaskStatus::Failed)
    })
    .await;

    let a = h.manager.create_download_task(song("a", &server.url("a.mp3"))).unwrap();
    let b = h.manager.create_download_task(song("b", &server.url("b.mp3"))).unwrap();
    assert_eq!(h.manager.active_count(), 2);

    assert_eq!(h.manager.pause_all_downloads(), 2);
    assert_eq!(h.manager.active_count(), 0);
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Pending);
    assert_eq!(status_of(&h.manager, &b.id), TaskStatus::Pending);
    // 暂停不会立即重新调度
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.manager.active_count(), 0);

    server.release();
    h.manager.start_all_downloads(false);
    within(h.manager.wait_idle()).await;
    assert_eq!(status_of(&h.manager, &a.id), TaskStatus::Completed);
    assert_eq!(status_of(&h.manager, &b.id), TaskStatus::Completed);
    assert_eq!(status_of(&h.manager, &broken.id), TaskStatus::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requeue_failed_resets_error_and_progress() {
    let mut server = mockito::Server::new_async().await;
    let failing = server.mock("GET", "/flaky.mp3").with_status(500).expect(1).create_async().await;

    let h = harness();
    let mut payload = song("flaky", &format!("{}/flaky.mp3", server.url()));
    payload.progress = Some(30);
    let task = h.manager.create_download_task(payload).unwrap();
    within(h.manager.wait_idle()).await;
    failing.assert_async().await;
    assert_eq!(status_of(&h.manager, &task.id), TaskStatus::Failed);

    failing.remove_async().await;
    server.mock("GET", "/flaky.mp3").with_status(200).with_body("fixed").create_async().await;

    assert_eq!(h.manager.requeue_failed_tasks(), 1);
    within(h.manager.wait_idle()).await;
    let done = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.error, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interrupted_transfer_resumes_after_restart() {
    let server = GatedServer::start(50_000).await;
    let storage = Arc::new(MemoryStorage::new());
    let backend = Arc::new(MemoryBackend::new());
    let build = || {
        DownloadManager::new(
            storage.clone() as Arc<dyn StorageAdapter>,
            backend.clone() as Arc<dyn KeyValueBackend>,
            test_settings(),
        )
        .unwrap()
    };

    let first = build();
    let task = first.create_download_task(song("resume me", &server.url("r.mp3"))).unwrap();
    first.shutdown().await;
    // 关闭不修改任务状态
    assert_eq!(status_of(&first, &task.id), TaskStatus::Downloading);
    assert!(backend.raw("download_tasks").unwrap().contains("\"downloading\""));

    server.release();
    let second = build();
    assert!(second.is_active(&task.id));
    within(second.wait_idle()).await;
    assert_eq!(status_of(&second, &task.id), TaskStatus::Completed);
    assert!(storage.get("music/resume me.mp3").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscriber_may_call_back_into_manager() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/r.mp3").with_status(200).with_body("r").create_async().await;

    let h = harness();
    let manager = h.manager.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = h.manager.subscribe_download_tasks(move |tasks| {
        // 回调中读取状态和修改配置都不能死锁
        sink.lock().unwrap().push(manager.active_count());
        if tasks.len() == 1 {
            manager.set_download_concurrency(2);
        }
    });

    h.manager.create_download_task(song("re", &format!("{}/r.mp3", server.url()))).unwrap();
    within(h.manager.wait_idle()).await;
    assert_eq!(h.manager.download_config().concurrency, 2);
    assert!(!seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_current_thread_runtime_completes_local_copy() {
    let h = harness();
    h.storage.insert("/tmp/pic.png", vec![1, 2, 3]);
    let task = h
        .manager
        .create_download_task(
            CreateTaskPayload::new(TaskType::Picture, "cover").with_url("file:///tmp/pic.png"),
        )
        .unwrap();
    within(h.manager.wait_idle()).await;
    let done = h.manager.get_download_task(&task.id).unwrap();
    assert_eq!(done.path.as_deref(), Some("pictures/cover.png"));
}

#[test]
fn test_manager_outside_runtime_is_an_error() {
    let result = DownloadManager::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryBackend::new()),
        test_settings(),
    );
    assert!(matches!(result, Err(media_dl::error::AppError::NoRuntime)));
}
