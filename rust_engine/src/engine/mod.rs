//! 被封装引擎的边界接口
//!
//! Cubism SDK 本身不在本仓库内，这里只描述绑定层会调用的能力集合。
//! Rust 侧的 SDK 绑定实现这些 trait，并通过 `framework::register_backend` 注册；
//! C++ 胶水库则填写 `ffi::CubismBackendVTable`，调用导出的 `live2d_jni_register_backend`。

#[cfg(test)]
pub(crate) mod fake;
pub mod ffi;

use std::fmt;
use std::sync::Arc;

use glam::Mat4;

use crate::framework::FrameworkOption;

/// 引擎内部的参数/部件 ID（由 `EngineBackend::intern_id` 驻留）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CubismId(pub u32);

/// 动作实例句柄（引擎创建的不透明对象）
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MotionHandle(pub u64);

impl MotionHandle {
    /// 转成 Java 侧可持有的 long
    pub fn as_jlong(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Debug for MotionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Motion#{}", self.0)
    }
}

/// 动作播放结束回调，参数是结束的实例本身
pub type FinishedHandler = Arc<dyn Fn(MotionHandle) + Send + Sync>;

/// 进程级引擎入口
pub trait EngineBackend: Send + Sync {
    /// 安装分配器/日志/文件加载选项，进程内只调用一次
    fn start_up(&self, option: &FrameworkOption) -> bool;
    fn initialize(&self);
    fn dispose(&self);

    /// 参数名驻留为 ID
    fn intern_id(&self, name: &str) -> CubismId;

    /// 创建一个空的用户模型
    fn create_model(&self) -> Box<dyn EngineModel>;
}

/// 单个用户模型的引擎侧能力
///
/// 引擎在解析资源时不会复制输入缓冲区，所以所有接收字节的调用都是 `unsafe`：
/// 调用方保证缓冲区在引擎不再引用它之前一直有效。
pub trait EngineModel: Send {
    // ========== 资源加载 ==========

    /// # Safety
    /// `moc` 必须在下一次成功的 `load_model` 或模型销毁之前保持有效。
    unsafe fn load_model(&mut self, moc: &[u8]) -> bool;

    /// # Safety
    /// 同 `load_model`，生命周期到下一次成功的 `load_physics`。
    unsafe fn load_physics(&mut self, json: &[u8]) -> bool;

    /// # Safety
    /// 同 `load_model`，生命周期到下一次成功的 `load_pose`。
    unsafe fn load_pose(&mut self, json: &[u8]) -> bool;

    /// # Safety
    /// 同名表情被成功替换或模型销毁之前保持有效。
    unsafe fn load_expression(&mut self, json: &[u8], name: &str) -> bool;

    fn set_expression(&mut self, name: &str) -> bool;

    // ========== 动作 ==========

    /// # Safety
    /// `json` 必须在 `delete_motion(handle)` 之前保持有效。
    unsafe fn create_motion(&mut self, json: &[u8]) -> Option<MotionHandle>;

    fn set_motion_loop(&mut self, motion: MotionHandle, looping: bool);
    fn set_finished_handler(&mut self, motion: MotionHandle, handler: FinishedHandler);
    fn start_motion(&mut self, motion: MotionHandle, priority: i32);
    fn delete_motion(&mut self, motion: MotionHandle);
    fn stop_all_motions(&mut self);

    // ========== 每帧更新 ==========

    fn load_parameters(&mut self);
    fn save_parameters(&mut self);
    fn update_motion(&mut self, delta_time: f32);
    fn update_pose(&mut self, delta_time: f32);
    fn update_expression(&mut self, delta_time: f32);
    fn evaluate_physics(&mut self, delta_time: f32);
    fn add_parameter_value(&mut self, id: CubismId, value: f32);
    fn set_parameter_value(&mut self, id: CubismId, value: f32);
    /// 根据最终参数重新计算网格
    fn update(&mut self);

    // ========== 渲染 ==========

    fn create_renderer(&mut self);
    fn bind_texture(&mut self, index: u32, texture_id: u32);
    fn set_mvp_matrix(&mut self, mvp: &Mat4);
    fn draw(&mut self);

    // ========== 查询 ==========

    fn is_hit(&self, drawable: CubismId, x: f32, y: f32) -> bool;
    fn canvas_width(&self) -> f32;
    fn canvas_height(&self) -> f32;
    fn drawable_ids(&self) -> Vec<String>;

    fn has_model(&self) -> bool;
    fn has_pose(&self) -> bool;
    fn has_physics(&self) -> bool;
    fn has_renderer(&self) -> bool;
    fn has_active_expression(&self) -> bool;
}
