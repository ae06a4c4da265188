//! Live2D JNI - Cubism SDK 的 Rust 绑定层
//!
//! 为 Java 侧 `CubismFramework` / `CubismUserModel` 提供：
//! - 框架启动、日志转发与资源加载
//! - 模型/物理/姿势/表情/动作资源的缓冲区所有权管理
//! - 动作结束回调的延迟删除协议
//! - 每帧更新驱动（动作、姿势、拖拽跟随、物理）
//! - JNI 接口，以及供 SDK 胶水库注册后端的 C 入口 `live2d_jni_register_backend`
//! - Windows 下的 GLES2 符号兼容层

pub mod asset;
pub mod engine;
pub mod framework;
pub mod gles_shim;
pub mod host;
pub mod jni_bridge;
pub mod model;
pub mod motion;

pub use asset::{AssetKind, BufferStore};
pub use engine::{CubismId, EngineBackend, EngineModel, FinishedHandler, MotionHandle};
pub use framework::{FrameworkOption, LogLevel};
pub use host::HostLink;
pub use model::{DragConfig, UserModel};
pub use motion::{FinishedMotionQueue, MotionRegistry};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error("asset rejected: {0}")]
    AssetRejected(AssetKind),

    #[error("framework already started")]
    AlreadyStarted,

    #[error("framework not started")]
    NotStarted,

    #[error("no engine backend registered")]
    BackendMissing,

    #[error("engine backend already registered")]
    BackendAlreadyRegistered,

    #[error("backend function table version {0} not supported")]
    BackendAbiMismatch(u32),

    #[error("engine refused to start")]
    StartUpFailed,

    #[error("invalid native handle: {0}")]
    InvalidHandle(i64),
}

pub type Result<T> = std::result::Result<T, BindingError>;
