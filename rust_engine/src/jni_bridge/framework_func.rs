//! CubismFramework 的 JNI 接口

use std::ffi::c_void;
use std::sync::Arc;

use jni::objects::JClass;
use jni::sys::{jboolean, jint, JNI_ERR, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};

use crate::framework::{self, install_logger, FileLoader, FrameworkOption, LogLevel};
use crate::host::{java_vm, load_resource, set_java_vm};
use crate::{gles_shim, BindingError};

use super::to_jboolean;

/// 库加载时保存虚拟机（Windows 下同时解析 GLES2 入口）
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    // SAFETY: 指针由 JVM 传入，整个进程生命周期内有效
    let vm = match unsafe { JavaVM::from_raw(vm) } {
        Ok(vm) => vm,
        Err(_) => return JNI_ERR,
    };
    set_java_vm(vm);

    #[cfg(windows)]
    gles_shim::init();

    JNI_VERSION_1_6
}

/// 资源加载走 Java 的 `LibraryLoader.loadResource`
fn host_file_loader() -> Option<FileLoader> {
    let vm = java_vm()?;
    let loader: FileLoader = Arc::new(move |path: &str| match load_resource(vm, path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("loadResource({}) failed: {}", path, e);
            None
        }
    });
    Some(loader)
}

/// 启动框架
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismFramework_startUpNative(
    _env: JNIEnv,
    _class: JClass,
    has_callback: jboolean,
    log_level: jint,
) {
    let log_level = LogLevel::from_raw(log_level);
    let log_to_host = has_callback == JNI_TRUE;
    install_logger(log_level.to_level_filter(), log_to_host);

    let option = FrameworkOption {
        log_level,
        log_to_host,
        file_loader: host_file_loader(),
    };
    match framework::start_up(option) {
        Ok(_) => {
            log::info!("CubismFramework started, log level {:?}", log_level);
            gles_shim::report();
        }
        Err(BindingError::AlreadyStarted) => {
            log::warn!("CubismFramework.startUp() ignored, already started");
        }
        Err(e) => log::error!("CubismFramework.startUp() failed: {}", e),
    }
}

/// 初始化框架
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismFramework_initialize(
    _env: JNIEnv,
    _class: JClass,
) {
    match framework::framework() {
        Ok(framework) => framework.initialize(),
        Err(e) => log::error!("CubismFramework.initialize() failed: {}", e),
    }
}

/// 释放框架资源（之后可再次 initialize）
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismFramework_dispose(
    _env: JNIEnv,
    _class: JClass,
) {
    match framework::framework() {
        Ok(framework) => framework.dispose(),
        Err(e) => log::error!("CubismFramework.dispose() failed: {}", e),
    }
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismFramework_isStarted(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    to_jboolean(framework::is_started())
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismFramework_isInitialized(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    to_jboolean(framework::framework().is_ok_and(|f| f.is_initialized()))
}
