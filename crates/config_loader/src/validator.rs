//! 配置校验模块
//!
//! 校验规则：
//! - 队列容量、批大小、刷新间隔 > 0
//! - batch_size <= queue_capacity
//! - internal_app 非空
//! - file 存储必须配置 path
//! - token 必须映射到非空应用名

use contracts::{ContractError, ServerConfig, StorageKind};

/// 校验 ServerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ServerConfig) -> Result<(), ContractError> {
    validate_pipeline(config)?;
    validate_auth(config)?;
    validate_storage(config)?;
    validate_live(config)?;
    Ok(())
}

/// 校验管道参数
fn validate_pipeline(config: &ServerConfig) -> Result<(), ContractError> {
    let pipeline = &config.pipeline;

    if pipeline.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "pipeline.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    if pipeline.batch_size == 0 {
        return Err(ContractError::config_validation(
            "pipeline.batch_size",
            "batch_size must be > 0",
        ));
    }
    if pipeline.flush_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "pipeline.flush_interval_ms",
            "flush_interval_ms must be > 0",
        ));
    }
    if pipeline.batch_size > pipeline.queue_capacity {
        return Err(ContractError::config_validation(
            "pipeline.batch_size / pipeline.queue_capacity",
            format!(
                "batch_size ({}) must be <= queue_capacity ({})",
                pipeline.batch_size, pipeline.queue_capacity
            ),
        ));
    }
    Ok(())
}

/// 校验身份配置
fn validate_auth(config: &ServerConfig) -> Result<(), ContractError> {
    if config.auth.internal_app.trim().is_empty() {
        return Err(ContractError::config_validation(
            "auth.internal_app",
            "internal_app cannot be empty",
        ));
    }
    for (token, app_name) in &config.auth.tokens {
        if token.is_empty() {
            return Err(ContractError::config_validation(
                "auth.tokens",
                "token cannot be empty",
            ));
        }
        if app_name.is_empty() {
            return Err(ContractError::config_validation(
                "auth.tokens",
                "token must map to a non-empty app name",
            ));
        }
    }
    Ok(())
}

/// 校验存储配置
fn validate_storage(config: &ServerConfig) -> Result<(), ContractError> {
    if config.storage.kind == StorageKind::File && config.storage.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "storage.path",
            "file storage requires a path",
        ));
    }
    Ok(())
}

/// 校验实时订阅配置
fn validate_live(config: &ServerConfig) -> Result<(), ContractError> {
    if config.live.topic_capacity == 0 {
        return Err(ContractError::config_validation(
            "live.topic_capacity",
            "topic_capacity must be > 0",
        ));
    }
    if config.live.delivery_capacity == 0 {
        return Err(ContractError::config_validation(
            "live.delivery_capacity",
            "delivery_capacity must be > 0",
        ));
    }
    Ok(())
}
