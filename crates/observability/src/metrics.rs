//! 日志管道指标模块
//!
//! 通过 `metrics` facade 记录；未安装 recorder 时所有调用均为空操作。

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// 记录进入管道的日志条目
pub fn record_entry_received(app_name: &str) {
    counter!(
        "logpipe_entries_received_total",
        "app" => app_name.to_string()
    )
    .increment(1);
}

/// 记录成功发布到实时主题的条目
pub fn record_entry_published(app_name: &str) {
    counter!(
        "logpipe_entries_published_total",
        "app" => app_name.to_string()
    )
    .increment(1);
}

/// 记录发布失败 (不影响持久化)
pub fn record_publish_failure(app_name: &str) {
    counter!(
        "logpipe_publish_failures_total",
        "app" => app_name.to_string()
    )
    .increment(1);
}

/// 记录一次批量写入
///
/// # Example
///
/// ```ignore
/// let started = Instant::now();
/// collection.bulk_insert(&buffer).await?;
/// record_batch_flushed(app_name, buffer.len(), started.elapsed());
/// ```
pub fn record_batch_flushed(app_name: &str, size: usize, elapsed: Duration) {
    counter!(
        "logpipe_batches_flushed_total",
        "app" => app_name.to_string()
    )
    .increment(1);
    counter!(
        "logpipe_entries_persisted_total",
        "app" => app_name.to_string()
    )
    .increment(size as u64);
    histogram!("logpipe_batch_size").record(size as f64);
    histogram!("logpipe_flush_latency_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// 记录持久化失败 (批次丢失)
pub fn record_persist_failure(app_name: &str, lost: usize) {
    counter!(
        "logpipe_persist_failures_total",
        "app" => app_name.to_string()
    )
    .increment(1);
    counter!(
        "logpipe_entries_lost_total",
        "app" => app_name.to_string()
    )
    .increment(lost as u64);
}

/// 记录管道失效后被丢弃的排队条目
pub fn record_entry_dropped(app_name: &str, count: usize) {
    counter!(
        "logpipe_entries_dropped_total",
        "app" => app_name.to_string()
    )
    .increment(count as u64);
}

/// 记录摄取队列深度
pub fn record_queue_depth(app_name: &str, depth: usize) {
    gauge!(
        "logpipe_queue_depth",
        "app" => app_name.to_string()
    )
    .set(depth as f64);
}

/// 记录管道创建
pub fn record_pipeline_created(app_name: &str) {
    counter!(
        "logpipe_pipelines_created_total",
        "app" => app_name.to_string()
    )
    .increment(1);
    gauge!("logpipe_pipelines_active").increment(1.0);
}

/// 记录管道退役 (失败或停止)
pub fn record_pipeline_retired(app_name: &str, failed: bool) {
    let status = if failed { "failed" } else { "stopped" };
    counter!(
        "logpipe_pipelines_retired_total",
        "app" => app_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    gauge!("logpipe_pipelines_active").decrement(1.0);
}

/// 记录实时订阅打开
pub fn record_listener_opened(app_name: &str) {
    counter!(
        "logpipe_listeners_opened_total",
        "app" => app_name.to_string()
    )
    .increment(1);
    gauge!("logpipe_listeners_active").increment(1.0);
}

/// 记录实时订阅关闭
pub fn record_listener_closed() {
    gauge!("logpipe_listeners_active").decrement(1.0);
}

/// 记录摄取连接结束
pub fn record_ingest_connection(success: bool, entries: u64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "logpipe_ingest_connections_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("logpipe_ingest_entries_per_connection").record(entries as f64);
}
