//! 拖拽跟随配置
//!
//! 默认值见 `DragConfig::default`，运行时可通过 `set_config` 覆盖、`reset_config` 恢复。
//! 各版本的系数和是否注入纵向项并不一致，因此做成可配置项。

use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

/// 拖拽 → 参数偏移的系数
#[derive(Debug, Clone, PartialEq)]
pub struct DragConfig {
    // ========== 系数 ==========
    /// 头部角度增益（ParamAngleX / ParamAngleY），默认 30.0
    pub angle_gain: f32,
    /// 身体角度增益（ParamBodyAngleX），默认 10.0
    pub body_angle_gain: f32,
    /// 眼球增益（ParamEyeBallX / ParamEyeBallY），默认 1.0
    pub eye_ball_gain: f32,

    // ========== 纵向项 ==========
    /// 是否注入 ParamEyeBallY，默认 true
    pub eye_ball_y: bool,
    /// 是否注入 ParamBodyAngleY，默认 false
    pub body_angle_y: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            angle_gain: 30.0,
            body_angle_gain: 10.0,
            eye_ball_gain: 1.0,
            eye_ball_y: true,
            // 部分模型没有该参数，默认不注入
            body_angle_y: false,
        }
    }
}

/// 全局配置实例
static DRAG_CONFIG: Lazy<RwLock<DragConfig>> = Lazy::new(|| RwLock::new(DragConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> DragConfig {
    DRAG_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: DragConfig) {
    *DRAG_CONFIG.write().unwrap_or_else(PoisonError::into_inner) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(DragConfig::default());
}
