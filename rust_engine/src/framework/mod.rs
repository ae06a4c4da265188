//! 框架生命周期与进程级选项
//!
//! 对应 CubismFramework::StartUp / Initialize / Dispose。
//! 选项块（日志级别、日志转发、文件加载）在启动时构造一次，之后只读；
//! 同一进程内不支持重新 StartUp。

mod logger;

pub use logger::{defer_host_log, install_logger, HostLogger, ENGINE_LOG_TARGET};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::LevelFilter;
use once_cell::sync::OnceCell;

use crate::engine::EngineBackend;
use crate::{BindingError, Result};

/// 日志级别（与 Java `CubismFramework.LogLevel` 的序号一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    /// 未知值按 Off 处理
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => LogLevel::Verbose,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Verbose => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

/// 引擎请求资源（着色器等）时使用的加载函数
pub type FileLoader = Arc<dyn Fn(&str) -> Option<Vec<u8>> + Send + Sync>;

/// 进程级选项块
#[derive(Clone)]
pub struct FrameworkOption {
    pub log_level: LogLevel,
    /// 是否把日志转发给 Java 回调
    pub log_to_host: bool,
    pub file_loader: Option<FileLoader>,
}

impl Default for FrameworkOption {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Off,
            log_to_host: false,
            file_loader: None,
        }
    }
}

impl fmt::Debug for FrameworkOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkOption")
            .field("log_level", &self.log_level)
            .field("log_to_host", &self.log_to_host)
            .field("file_loader", &self.file_loader.is_some())
            .finish()
    }
}

impl FrameworkOption {
    /// 引擎的日志输出入口，引擎侧已按级别过滤过
    pub fn log_message(&self, message: &str) {
        if let Some(level) = self.log_level.to_level_filter().to_level() {
            log::log!(target: ENGINE_LOG_TARGET, level, "{}", message.trim_end());
        }
    }

    /// 引擎的文件加载入口
    pub fn load_file(&self, path: &str) -> Option<Vec<u8>> {
        let bytes = self.file_loader.as_ref().and_then(|load| load(path));
        if bytes.is_none() {
            log::warn!("resource not found: {}", path);
        }
        bytes
    }
}

/// 已启动的框架
pub struct Framework {
    backend: Arc<dyn EngineBackend>,
    option: FrameworkOption,
    initialized: AtomicBool,
}

impl Framework {
    /// 启动引擎（调用 backend.start_up）
    pub fn start(backend: Arc<dyn EngineBackend>, option: FrameworkOption) -> Result<Self> {
        if !backend.start_up(&option) {
            return Err(BindingError::StartUpFailed);
        }
        Ok(Self {
            backend,
            option,
            initialized: AtomicBool::new(false),
        })
    }

    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            log::warn!("CubismFramework.initialize() skipped, already initialized");
            return;
        }
        self.backend.initialize();
        log::info!("CubismFramework initialized");
    }

    pub fn dispose(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            log::warn!("CubismFramework.dispose() skipped, not initialized");
            return;
        }
        self.backend.dispose();
        log::info!("CubismFramework disposed");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn backend(&self) -> &Arc<dyn EngineBackend> {
        &self.backend
    }

    pub fn option(&self) -> &FrameworkOption {
        &self.option
    }
}

/// SDK 绑定注册的后端
static BACKEND: OnceCell<Arc<dyn EngineBackend>> = OnceCell::new();

/// 启动后的框架单例
static FRAMEWORK: OnceCell<Framework> = OnceCell::new();

/// 注册引擎后端，必须在 Java 调用 `startUp` 之前完成
///
/// C++ 胶水库走 `engine::ffi::live2d_jni_register_backend`，最终也到这里。
pub fn register_backend(backend: Arc<dyn EngineBackend>) -> Result<()> {
    register_in(&BACKEND, backend)
}

/// 启动框架，进程内只允许一次
pub fn start_up(option: FrameworkOption) -> Result<&'static Framework> {
    start_up_in(&FRAMEWORK, &BACKEND, option)
}

fn register_in(slot: &OnceCell<Arc<dyn EngineBackend>>, backend: Arc<dyn EngineBackend>) -> Result<()> {
    slot.set(backend).map_err(|_| BindingError::BackendAlreadyRegistered)
}

fn start_up_in<'a>(
    slot: &'a OnceCell<Framework>,
    backend: &OnceCell<Arc<dyn EngineBackend>>,
    option: FrameworkOption,
) -> Result<&'a Framework> {
    if slot.get().is_some() {
        return Err(BindingError::AlreadyStarted);
    }
    let backend = backend.get().cloned().ok_or(BindingError::BackendMissing)?;
    slot.get_or_try_init(|| Framework::start(backend, option))
}

/// 获取已启动的框架
pub fn framework() -> Result<&'static Framework> {
    FRAMEWORK.get().ok_or(BindingError::NotStarted)
}

pub fn is_started() -> bool {
    FRAMEWORK.get().is_some()
}
