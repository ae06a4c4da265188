//! 日志：log 门面 → Java `CubismFramework.onLog`

use std::cell::{Cell, RefCell};

use jni::objects::JValue;
use log::{LevelFilter, Log, Metadata, Record};

use crate::host::{java_vm, run_on_host};

/// 引擎自身日志使用的 target
pub const ENGINE_LOG_TARGET: &str = "cubism";

const FRAMEWORK_CLASS: &str = "dev/eatgrapes/live2d/CubismFramework";

thread_local! {
    /// 转发过程中 jni 自己也会打日志，防止递归
    static IN_HOST_LOG: Cell<bool> = const { Cell::new(false) };
    /// 大于 0 时处于持锁区域，转发的日志先排队
    static DEFER_DEPTH: Cell<u32> = const { Cell::new(0) };
    static DEFERRED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// 回调 Java 的 `onLog`，失败时没有可以报告的地方，直接丢弃
fn forward_line(line: &str) {
    if IN_HOST_LOG.with(|flag| flag.replace(true)) {
        return;
    }
    if let Some(vm) = java_vm() {
        let _ = run_on_host(vm, |env| {
            let message = env.new_string(line)?;
            env.call_static_method(
                FRAMEWORK_CLASS,
                "onLog",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&message)],
            )?;
            env.delete_local_ref(message)
        });
    }
    IN_HOST_LOG.with(|flag| flag.set(false));
}

struct DeferScope;

impl Drop for DeferScope {
    fn drop(&mut self) {
        let depth = DEFER_DEPTH.with(|depth| {
            let left = depth.get().saturating_sub(1);
            depth.set(left);
            left
        });
        if depth == 0 {
            let lines = DEFERRED.with(|queue| std::mem::take(&mut *queue.borrow_mut()));
            for line in lines {
                forward_line(&line);
            }
        }
    }
}

/// 执行 `f`，期间发往 Java 的日志排队，最外层结束后再发送
///
/// 持有模型锁或全局表锁时使用：Java 的 `onLog` 可能回调到本库。
pub fn defer_host_log<R>(f: impl FnOnce() -> R) -> R {
    DEFER_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let _scope = DeferScope;
    f()
}

/// 把日志记录转发到 Java 回调的 logger
pub struct HostLogger {
    level: LevelFilter,
    forward: bool,
}

impl HostLogger {
    pub fn new(level: LevelFilter, forward: bool) -> Self {
        Self { level, forward }
    }

    /// 日志行格式：`[LEVEL target] message`
    pub fn format(record: &Record) -> String {
        format!("[{} {}] {}", record.level(), record.target(), record.args())
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.forward && metadata.level() <= self.level && !metadata.target().starts_with("jni")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        if DEFER_DEPTH.with(Cell::get) > 0 {
            DEFERRED.with(|queue| queue.borrow_mut().push(line));
            return;
        }
        forward_line(&line);
    }

    fn flush(&self) {}
}

/// 安装全局 logger（进程内只生效一次）
pub fn install_logger(level: LevelFilter, forward: bool) -> bool {
    let installed = log::set_boxed_logger(Box::new(HostLogger::new(level, forward))).is_ok();
    if installed {
        log::set_max_level(if forward { level } else { LevelFilter::Off });
    }
    installed
}
