//! JNI 绑定层 - 与 Java 代码交互

mod framework_func;
mod native_func;

pub use framework_func::*;
pub use native_func::*;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use jni::objects::{JByteArray, JString};
use jni::sys::{jboolean, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use once_cell::sync::Lazy;

use crate::framework::{self, defer_host_log};
use crate::model::UserModel;
use crate::{BindingError, Result};

/// 全局用户模型存储
pub static USER_MODELS: Lazy<RwLock<HashMap<i64, Arc<Mutex<UserModel>>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 生成唯一句柄 ID（0 保留给“无效”）
fn next_handle_id() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};
    static COUNTER: AtomicI64 = AtomicI64::new(1);
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// 注册模型并返回句柄
pub fn register_user_model(model: UserModel) -> i64 {
    let id = next_handle_id();
    let mut models = USER_MODELS.write().unwrap_or_else(PoisonError::into_inner);
    models.insert(id, Arc::new(Mutex::new(model)));
    id
}

/// 按句柄取模型
///
/// 返回克隆的 `Arc`，调用方持有模型期间不占用全局表的锁，
/// 宿主回调里删除模型不会死锁。
pub fn get_user_model(handle: i64) -> Result<Arc<Mutex<UserModel>>> {
    let model = USER_MODELS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&handle)
        .cloned();
    model.ok_or(BindingError::InvalidHandle(handle))
}

/// 从全局表移除，最后一个引用释放时销毁模型
pub fn remove_user_model(handle: i64) -> bool {
    let removed = USER_MODELS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&handle);
    removed.is_some()
}

pub(crate) fn lock_model(model: &Mutex<UserModel>) -> MutexGuard<'_, UserModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在模型上执行操作，句柄无效时返回默认值
///
/// 持锁期间产生的日志在锁释放后才转发给 Java。
pub(crate) fn with_model<R>(handle: i64, default: R, f: impl FnOnce(&mut UserModel) -> R) -> R {
    match get_user_model(handle) {
        Ok(model) => defer_host_log(|| f(&mut lock_model(&model))),
        Err(e) => {
            log::warn!("{}", e);
            default
        }
    }
}

/// 框架已启动时创建模型并登记，返回句柄
pub(crate) fn create_user_model() -> Result<i64> {
    let framework = framework::framework()?;
    Ok(register_user_model(UserModel::new(framework.backend().clone())))
}

pub(crate) fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// 读取 Java 字符串，null 或失败时返回 `None`
pub(crate) fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            log::error!("Failed to read Java string: {}", e);
            None
        }
    }
}

/// 复制 Java byte[]，null 或失败时返回 `None`
pub(crate) fn read_bytes(env: &mut JNIEnv, value: &JByteArray) -> Option<Vec<u8>> {
    if value.is_null() {
        log::warn!("null byte[] passed to native");
        return None;
    }
    match env.convert_byte_array(value) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::error!("Failed to read byte[]: {}", e);
            None
        }
    }
}
