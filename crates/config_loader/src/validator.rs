//! 配置校验模块
//!
//! 校验规则：
//! - host.address 非空
//! - 端口非零且互不相同
//! - steps >= 1
//! - probe_packet_size 等于固定的 16 字节布局
//! - outlier_coefficient >= 0
//! - 0 < alpha_floor <= alpha_initial, alpha_decay >= 0
//! - batch_size >= 1

use contracts::{ContractError, SessionConfig, PROBE_PACKET_SIZE};

/// 校验 SessionConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SessionConfig) -> Result<(), ContractError> {
    validate_host(config)?;
    validate_calibration(config)?;
    validate_streaming(config)?;
    Ok(())
}

/// 校验主机地址与端口
fn validate_host(config: &SessionConfig) -> Result<(), ContractError> {
    let host = &config.host;
    if host.address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "host.address",
            "host address cannot be empty",
        ));
    }

    let mut ports = vec![
        ("host.calibration_port", host.calibration_port),
        ("host.event_port", host.event_port),
    ];
    if let Some(play) = host.play_port {
        ports.push(("host.play_port", play));
    }

    for (field, port) in &ports {
        if *port == 0 {
            return Err(ContractError::config_validation(*field, "port must be non-zero"));
        }
    }

    for (i, (field, port)) in ports.iter().enumerate() {
        if let Some((other, _)) = ports[..i].iter().find(|(_, p)| p == port) {
            return Err(ContractError::config_validation(
                *field,
                format!("port {} must be distinct from {}", port, other),
            ));
        }
    }
    Ok(())
}

/// 校验校准参数
fn validate_calibration(config: &SessionConfig) -> Result<(), ContractError> {
    let cal = &config.calibration;

    if cal.steps == 0 {
        return Err(ContractError::config_validation(
            "calibration.steps",
            "steps must be >= 1",
        ));
    }

    if cal.probe_packet_size != PROBE_PACKET_SIZE {
        return Err(ContractError::config_validation(
            "calibration.probe_packet_size",
            format!(
                "probe_packet_size must be {} (fixed layout), got {}",
                PROBE_PACKET_SIZE, cal.probe_packet_size
            ),
        ));
    }

    // NaN 也不合法
    if cal.outlier_coefficient.is_nan() || cal.outlier_coefficient < 0.0 {
        return Err(ContractError::config_validation(
            "calibration.outlier_coefficient",
            format!("outlier_coefficient must be >= 0, got {}", cal.outlier_coefficient),
        ));
    }

    let floor_ok = cal.alpha_floor > 0.0 && cal.alpha_floor <= cal.alpha_initial;
    if !floor_ok {
        return Err(ContractError::config_validation(
            "calibration.alpha_floor / calibration.alpha_initial",
            format!(
                "require 0 < alpha_floor ({}) <= alpha_initial ({})",
                cal.alpha_floor, cal.alpha_initial
            ),
        ));
    }

    if cal.alpha_decay.is_nan() || cal.alpha_decay < 0.0 {
        return Err(ContractError::config_validation(
            "calibration.alpha_decay",
            format!("alpha_decay must be >= 0, got {}", cal.alpha_decay),
        ));
    }

    Ok(())
}

/// 校验事件流参数
fn validate_streaming(config: &SessionConfig) -> Result<(), ContractError> {
    if config.streaming.batch_size == 0 {
        return Err(ContractError::config_validation(
            "streaming.batch_size",
            "batch_size must be >= 1",
        ));
    }
    Ok(())
}
