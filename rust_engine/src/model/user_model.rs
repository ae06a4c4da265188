//! 用户模型：引擎模型 + 缓冲区所有权 + 动作生命周期 + 宿主链接

use std::sync::Arc;

use glam::Mat4;

use crate::asset::{self, AssetKind, BufferStore};
use crate::engine::{EngineBackend, EngineModel, MotionHandle};
use crate::host::HostLink;
use crate::motion::{FinishedMotionQueue, MotionRegistry, MotionRequest};
use crate::{BindingError, Result};
use super::drag::{DragFollow, DragParams};

/// 一个 Java `CubismUserModel` 对应的原生状态
///
/// 字段顺序即释放顺序：`engine` 必须先于 `buffers` 释放，
/// 引擎在销毁前仍可能引用缓冲区里的数据。
pub struct UserModel {
    pub(super) engine: Box<dyn EngineModel>,
    pub(super) buffers: BufferStore,
    pub(super) motions: MotionRegistry,
    pub(super) finished: Arc<FinishedMotionQueue>,
    pub(super) drag: DragFollow,
    pub(super) host: Option<Arc<dyn HostLink>>,
    backend: Arc<dyn EngineBackend>,
}

impl UserModel {
    /// 创建空模型（第一段初始化）
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        let engine = backend.create_model();
        let drag = DragFollow::new(DragParams::intern(backend.as_ref()));
        Self {
            engine,
            buffers: BufferStore::new(),
            motions: MotionRegistry::new(),
            finished: Arc::new(FinishedMotionQueue::new()),
            drag,
            host: None,
            backend,
        }
    }

    /// 链接宿主对象（第二段初始化）
    ///
    /// 链接之前结束的动作照常释放，但不会通知宿主。
    pub fn link(&mut self, host: Arc<dyn HostLink>) {
        if self.host.replace(host).is_some() {
            log::warn!("CubismUserModel relinked to a new host object");
        }
    }

    pub fn is_linked(&self) -> bool {
        self.host.is_some()
    }

    // ========== 资源加载 ==========

    /// 加载 moc3，失败时之前的模型保持不变
    pub fn load_model(&mut self, bytes: &[u8]) -> Result<()> {
        asset::validate(AssetKind::Model, bytes)?;
        let engine = &mut self.engine;
        // SAFETY: 缓冲区由 BufferStore 持有，直到下一次成功加载或模型销毁
        self.buffers
            .load_slot(AssetKind::Model, bytes, |moc| unsafe { engine.load_model(moc) })?;
        log::info!(
            "moc3 loaded: {} bytes, canvas {}x{}",
            bytes.len(),
            self.engine.canvas_width(),
            self.engine.canvas_height()
        );
        Ok(())
    }

    pub fn load_physics(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_model(AssetKind::Physics)?;
        asset::validate(AssetKind::Physics, bytes)?;
        let engine = &mut self.engine;
        // SAFETY: 同 load_model
        self.buffers
            .load_slot(AssetKind::Physics, bytes, |json| unsafe { engine.load_physics(json) })
    }

    pub fn load_pose(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_model(AssetKind::Pose)?;
        asset::validate(AssetKind::Pose, bytes)?;
        let engine = &mut self.engine;
        // SAFETY: 同 load_model
        self.buffers
            .load_slot(AssetKind::Pose, bytes, |json| unsafe { engine.load_pose(json) })
    }

    pub fn load_expression(&mut self, bytes: &[u8], name: &str) -> Result<()> {
        self.require_model(AssetKind::Expression)?;
        asset::validate(AssetKind::Expression, bytes)?;
        let engine = &mut self.engine;
        // SAFETY: 同名表情被替换或模型销毁之前缓冲区一直由 BufferStore 持有
        self.buffers.load_expression(name, bytes, |json| unsafe {
            engine.load_expression(json, name)
        })
    }

    /// 切换到已加载的表情
    pub fn set_expression(&mut self, name: &str) -> bool {
        let found = self.engine.set_expression(name);
        if !found {
            log::warn!("expression not loaded: {}", name);
        }
        found
    }

    fn require_model(&self, kind: AssetKind) -> Result<()> {
        if self.engine.has_model() {
            Ok(())
        } else {
            log::warn!("{} ignored: no model loaded", kind);
            Err(BindingError::AssetRejected(kind))
        }
    }

    // ========== 动作 ==========

    /// 开始播放动作，格式错误或引擎拒绝时返回 `None`
    ///
    /// `request.looping` 为 `None` 时沿用文件里的 `Meta.Loop`。
    pub fn start_motion(&mut self, bytes: &[u8], mut request: MotionRequest) -> Option<MotionHandle> {
        if !self.engine.has_model() {
            log::warn!("startMotion ignored: no model loaded");
            return None;
        }
        let meta = match asset::validate_motion(bytes) {
            Ok(meta) => meta,
            Err(e) => {
                log::error!("Failed to start motion: {}", e);
                return None;
            }
        };
        request.looping = Some(request.looping.unwrap_or(meta.looping));
        let handle = self.motions.start(
            self.engine.as_mut(),
            &mut self.buffers,
            &self.finished,
            bytes,
            request,
        );
        match handle {
            Some(handle) => log::debug!(
                "motion {:?}: {:.2}s @ {} fps, {} curves",
                handle,
                meta.duration,
                meta.fps,
                meta.curve_count
            ),
            None => log::error!("Failed to start motion: engine rejected clip"),
        }
        handle
    }

    /// 正在播放或等待释放的动作数
    pub fn motion_count(&self) -> usize {
        self.motions.len()
    }

    pub fn pending_finished(&self) -> usize {
        self.finished.len()
    }

    pub fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    // ========== 输入 ==========

    pub fn set_parameter(&mut self, name: &str, value: f32) {
        if !self.engine.has_model() {
            return;
        }
        let id = self.backend.intern_id(name);
        self.engine.set_parameter_value(id, value);
    }

    pub fn set_dragging(&mut self, x: f32, y: f32) {
        self.drag.set(x, y);
    }

    pub fn drag_position(&self) -> Option<(f32, f32)> {
        self.drag.position()
    }

    // ========== 查询 ==========

    pub fn is_hit(&self, drawable: &str, x: f32, y: f32) -> bool {
        if !self.engine.has_model() {
            return false;
        }
        self.engine.is_hit(self.backend.intern_id(drawable), x, y)
    }

    pub fn canvas_width(&self) -> f32 {
        if self.engine.has_model() { self.engine.canvas_width() } else { 0.0 }
    }

    pub fn canvas_height(&self) -> f32 {
        if self.engine.has_model() { self.engine.canvas_height() } else { 0.0 }
    }

    pub fn drawable_ids(&self) -> Vec<String> {
        if self.engine.has_model() { self.engine.drawable_ids() } else { Vec::new() }
    }

    // ========== 渲染 ==========

    pub fn create_renderer(&mut self) {
        if !self.engine.has_model() {
            log::warn!("createRenderer ignored: no model loaded");
            return;
        }
        self.engine.create_renderer();
    }

    pub fn register_texture(&mut self, index: u32, texture_id: u32) {
        if self.engine.has_renderer() {
            self.engine.bind_texture(index, texture_id);
        }
    }

    pub fn draw(&mut self, mvp: &Mat4) {
        if !self.engine.has_renderer() {
            return;
        }
        self.engine.set_mvp_matrix(mvp);
        self.engine.draw();
    }
}

impl Drop for UserModel {
    fn drop(&mut self) {
        // 等待释放的实例和仍在播放的实例都在注册表里
        self.finished.drain();
        self.motions.release_all(self.engine.as_mut(), &mut self.buffers);
    }
}
