//! CubismUserModel 的 JNI 接口
//!
//! 使用标准 jni 0.21 API。所有错误都转成中性返回值（false / 0 / null）并记录日志。

use std::ptr;
use std::sync::Arc;

use glam::Mat4;
use jni::objects::{JByteArray, JClass, JFloatArray, JObject, JObjectArray, JString};
use jni::sys::{jboolean, jfloat, jint, jlong, jobjectArray, JNI_TRUE};
use jni::JNIEnv;

use crate::engine::MotionHandle;
use crate::host::JavaHostLink;
use crate::model::{run_cycle, UserModel};
use crate::motion::{MotionRequest, DEFAULT_MOTION_NAME};
use crate::{BindingError, Result};

use super::{
    create_user_model, get_user_model, read_bytes, read_string, remove_user_model, to_jboolean,
    with_model,
};

// ============================================================================
// 生命周期
// ============================================================================

/// 创建原生模型（第一段初始化），框架未启动时返回 0
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_createNative(
    _env: JNIEnv,
    _this: JObject,
) -> jlong {
    match create_user_model() {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("CubismUserModel.createNative() failed: {}", e);
            0
        }
    }
}

/// 链接 Java 对象（第二段初始化），之后动作结束才会回调 `onMotionFinished`
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_linkNative(
    mut env: JNIEnv,
    this: JObject,
    model: jlong,
) {
    let link = match JavaHostLink::new(&mut env, &this) {
        Ok(link) => link,
        Err(e) => {
            log::error!("Failed to link CubismUserModel: {}", e);
            return;
        }
    };
    with_model(model, (), |m| m.link(Arc::new(link)));
}

/// 删除模型
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_deleteNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
) {
    if !remove_user_model(model) {
        log::warn!("deleteNative: {}", BindingError::InvalidHandle(model));
    }
}

// ============================================================================
// 资源加载
// ============================================================================

fn load_with(
    env: &mut JNIEnv,
    model: jlong,
    buffer: &JByteArray,
    load: impl FnOnce(&mut UserModel, &[u8]) -> Result<()>,
) -> jboolean {
    let Some(bytes) = read_bytes(env, buffer) else {
        return to_jboolean(false);
    };
    let loaded = with_model(model, false, |m| match load(m, &bytes) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to load asset: {}", e);
            false
        }
    });
    to_jboolean(loaded)
}

/// 加载 moc3
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_loadModelNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
) -> jboolean {
    load_with(&mut env, model, &buffer, |m, bytes| m.load_model(bytes))
}

/// 加载 physics3.json
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_loadPhysicsNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
) -> jboolean {
    load_with(&mut env, model, &buffer, |m, bytes| m.load_physics(bytes))
}

/// 加载 pose3.json
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_loadPoseNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
) -> jboolean {
    load_with(&mut env, model, &buffer, |m, bytes| m.load_pose(bytes))
}

/// 加载 exp3.json，以名字登记
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_loadExpressionNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
    name: JString,
) -> jboolean {
    let Some(name) = read_string(&mut env, &name) else {
        return to_jboolean(false);
    };
    load_with(&mut env, model, &buffer, |m, bytes| m.load_expression(bytes, &name))
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_setExpressionNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    name: JString,
) {
    if let Some(name) = read_string(&mut env, &name) {
        with_model(model, false, |m| m.set_expression(&name));
    }
}

// ============================================================================
// 渲染
// ============================================================================

/// 创建渲染器（需要当前线程有 GL 上下文）
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_createRendererNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
) {
    with_model(model, (), |m| m.create_renderer());
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_registerTextureNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
    index: jint,
    texture_id: jint,
) {
    if index < 0 || texture_id < 0 {
        log::warn!("registerTexture ignored: index {} texture {}", index, texture_id);
        return;
    }
    with_model(model, (), |m| m.register_texture(index as u32, texture_id as u32));
}

/// 绘制，`mvp` 为列主序 4x4 矩阵
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_drawNative(
    env: JNIEnv,
    _class: JClass,
    model: jlong,
    mvp: JFloatArray,
) {
    if mvp.is_null() {
        return;
    }
    let len = env.get_array_length(&mvp).unwrap_or(0);
    if len < 16 {
        log::warn!("drawNative: MVP matrix needs 16 floats, got {}", len);
        return;
    }
    let mut cols = [0.0f32; 16];
    if let Err(e) = env.get_float_array_region(&mvp, 0, &mut cols) {
        log::error!("Failed to read MVP matrix: {}", e);
        return;
    }
    let mvp = Mat4::from_cols_array(&cols);
    with_model(model, (), |m| m.draw(&mvp));
}

// ============================================================================
// 动作与更新
// ============================================================================

/// 在模型上启动动作，返回句柄（0 表示被拒绝）
fn start_motion_on(model: jlong, bytes: &[u8], request: MotionRequest) -> jlong {
    with_model(model, None, |m| m.start_motion(bytes, request))
        .map(MotionHandle::as_jlong)
        .unwrap_or(0)
}

/// 带循环开关和名称的启动参数，名称为 null 时用默认名
fn extended_request(priority: jint, looping: jboolean, name: Option<String>) -> MotionRequest {
    MotionRequest {
        priority,
        looping: Some(looping == JNI_TRUE),
        name: name.unwrap_or_else(|| DEFAULT_MOTION_NAME.to_string()),
    }
}

/// 开始播放动作，循环与否沿用文件里的 `Meta.Loop`
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_startMotionNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
    priority: jint,
) -> jlong {
    let Some(bytes) = read_bytes(&mut env, &buffer) else {
        return 0;
    };
    start_motion_on(model, &bytes, MotionRequest { priority, ..Default::default() })
}

/// 开始播放动作，显式指定循环和结束时回传的名称
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_startMotionExNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    buffer: JByteArray,
    priority: jint,
    looping: jboolean,
    name: JString,
) -> jlong {
    let Some(bytes) = read_bytes(&mut env, &buffer) else {
        return 0;
    };
    let name = read_string(&mut env, &name);
    start_motion_on(model, &bytes, extended_request(priority, looping, name))
}

/// 驱动一帧
///
/// 回调 `onMotionFinished` 时不持有模型锁，Java 侧可以在回调里继续调用本模型。
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_updateNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
    delta_time: jfloat,
) {
    let model = match get_user_model(model) {
        Ok(model) => model,
        Err(e) => {
            log::warn!("updateNative: {}", e);
            return;
        }
    };
    let report = run_cycle(&model, delta_time);
    if report.notified < report.released.len() {
        log::debug!(
            "{} of {} finished motion(s) not delivered",
            report.released.len() - report.notified,
            report.released.len()
        );
    }
}

// ============================================================================
// 输入
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_setParameterValueNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    id: JString,
    value: jfloat,
) {
    if let Some(id) = read_string(&mut env, &id) {
        with_model(model, (), |m| m.set_parameter(&id, value));
    }
}

/// 设置拖拽目标（-1.0 ~ 1.0）
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_setDraggingNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
    x: jfloat,
    y: jfloat,
) {
    with_model(model, (), |m| m.set_dragging(x, y));
}

// ============================================================================
// 查询
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_isHitNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
    drawable_id: JString,
    x: jfloat,
    y: jfloat,
) -> jboolean {
    let Some(drawable_id) = read_string(&mut env, &drawable_id) else {
        return to_jboolean(false);
    };
    to_jboolean(with_model(model, false, |m| m.is_hit(&drawable_id, x, y)))
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_getCanvasWidthNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
) -> jfloat {
    with_model(model, 0.0, |m| m.canvas_width())
}

#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_getCanvasHeightNative(
    _env: JNIEnv,
    _class: JClass,
    model: jlong,
) -> jfloat {
    with_model(model, 0.0, |m| m.canvas_height())
}

fn string_array<'local>(env: &mut JNIEnv<'local>, items: &[String]) -> jni::errors::Result<JObjectArray<'local>> {
    let array = env.new_object_array(items.len() as jint, "java/lang/String", JObject::null())?;
    for (index, item) in items.iter().enumerate() {
        let value = env.new_string(item)?;
        env.set_object_array_element(&array, index as jint, &value)?;
        env.delete_local_ref(value)?;
    }
    Ok(array)
}

/// 所有可绘制对象的 ID
#[no_mangle]
pub extern "system" fn Java_dev_eatgrapes_live2d_CubismUserModel_getDrawableIdsNative(
    mut env: JNIEnv,
    _class: JClass,
    model: jlong,
) -> jobjectArray {
    let ids = with_model(model, Vec::new(), |m| m.drawable_ids());
    match string_array(&mut env, &ids) {
        Ok(array) => array.into_raw(),
        Err(e) => {
            log::error!("Failed to build drawable id array: {}", e);
            ptr::null_mut()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::fake_moc3;
    use crate::engine::fake::FakeBackend;
    use crate::jni_bridge::register_user_model;
    use jni::sys::JNI_FALSE;

    const LOOPING_CLIP: &[u8] = br#"{"Version":3,"Meta":{"Duration":1,"Loop":true},"Curves":[]}"#;

    #[test]
    fn test_extended_request() {
        let request = extended_request(2, JNI_TRUE, Some("tap".to_string()));
        assert_eq!((request.priority, request.looping, request.name.as_str()), (2, Some(true), "tap"));

        let unnamed = extended_request(1, JNI_FALSE, None);
        assert_eq!(unnamed.looping, Some(false));
        assert_eq!(unnamed.name, DEFAULT_MOTION_NAME);
    }

    #[test]
    fn test_start_motion_on_handle() {
        let backend = FakeBackend::new();
        let mut user_model = UserModel::new(backend.clone());
        user_model.load_model(&fake_moc3()).unwrap();
        let handle = register_user_model(user_model);

        // 三参数入口：循环取自文件
        let plain = start_motion_on(handle, LOOPING_CLIP, MotionRequest { priority: 2, ..Default::default() });
        // 扩展入口：显式关闭循环
        let explicit = start_motion_on(handle, LOOPING_CLIP, extended_request(2, JNI_FALSE, None));
        assert_ne!(plain, 0);
        assert_ne!(explicit, 0);

        let loops = backend.recorder().lock().unwrap().loops.clone();
        assert_eq!(loops.get(&MotionHandle(plain as u64)), Some(&true));
        assert_eq!(loops.get(&MotionHandle(explicit as u64)), Some(&false));

        assert_eq!(start_motion_on(handle, b"not json", MotionRequest::default()), 0);
        assert!(remove_user_model(handle));
        assert_eq!(start_motion_on(handle, LOOPING_CLIP, MotionRequest::default()), 0);
    }
}
