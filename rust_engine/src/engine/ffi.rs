//! C ABI 后端
//!
//! 封装 Cubism SDK 的 C++ 胶水库填写一张 `CubismBackendVTable`，
//! 在 Java 调用 `CubismFramework.startUp` 之前调用导出的
//! `live2d_jni_register_backend` 完成注册（通常在胶水库自己的 `JNI_OnLoad` 里）。
//!
//! 函数表里的所有指针都不能为空；模型指针由 `create_model` 返回，
//! 由 `delete_model` 释放。缓冲区的生命周期约定与 `EngineModel` 相同。

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use glam::Mat4;
use once_cell::sync::OnceCell;

use super::{CubismId, EngineBackend, EngineModel, FinishedHandler, MotionHandle};
use crate::framework::{self, FrameworkOption};
use crate::{BindingError, Result};

/// 函数表版本，布局变化时递增
pub const BACKEND_ABI_VERSION: u32 = 1;

/// 引擎在动作结束时调用，`context` 原样传回
pub type FfiFinishedCallback = unsafe extern "C" fn(context: *mut c_void, motion: u64);

type ModelFn = unsafe extern "C" fn(model: *mut c_void);
type ModelStepFn = unsafe extern "C" fn(model: *mut c_void, delta_time: f32);
type ModelQueryFn = unsafe extern "C" fn(model: *mut c_void) -> bool;
type ModelLoadFn = unsafe extern "C" fn(model: *mut c_void, data: *const u8, size: u32) -> bool;
type ParameterFn = unsafe extern "C" fn(model: *mut c_void, id: u32, value: f32);

/// 传给 `start_up` 的选项，只在调用期间有效，引擎需要自己复制
#[repr(C)]
pub struct FfiOption {
    pub log_level: i32,
    pub log_message: unsafe extern "C" fn(message: *const c_char),
    /// 返回的缓冲区必须交还给 `release_file`
    pub load_file: unsafe extern "C" fn(path: *const c_char, size: *mut u32) -> *mut u8,
    pub release_file: unsafe extern "C" fn(data: *mut u8, size: u32),
}

/// 胶水库提供的函数表，字段顺序即 C 结构体布局
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CubismBackendVTable {
    pub abi_version: u32,
    pub user_data: *mut c_void,

    // ========== 框架 ==========
    pub start_up: unsafe extern "C" fn(user_data: *mut c_void, option: *const FfiOption) -> bool,
    pub initialize: unsafe extern "C" fn(user_data: *mut c_void),
    pub dispose: unsafe extern "C" fn(user_data: *mut c_void),
    pub intern_id: unsafe extern "C" fn(user_data: *mut c_void, name: *const c_char) -> u32,
    /// 失败时返回空指针
    pub create_model: unsafe extern "C" fn(user_data: *mut c_void) -> *mut c_void,
    pub delete_model: unsafe extern "C" fn(user_data: *mut c_void, model: *mut c_void),

    // ========== 资源加载（引擎不复制缓冲区） ==========
    pub load_model: ModelLoadFn,
    pub load_physics: ModelLoadFn,
    pub load_pose: ModelLoadFn,
    pub load_expression:
        unsafe extern "C" fn(model: *mut c_void, data: *const u8, size: u32, name: *const c_char) -> bool,
    pub set_expression: unsafe extern "C" fn(model: *mut c_void, name: *const c_char) -> bool,

    // ========== 动作 ==========
    /// 解析失败返回 0
    pub create_motion: unsafe extern "C" fn(model: *mut c_void, data: *const u8, size: u32) -> u64,
    pub set_motion_loop: unsafe extern "C" fn(model: *mut c_void, motion: u64, looping: bool),
    pub set_finished_handler: unsafe extern "C" fn(
        model: *mut c_void,
        motion: u64,
        callback: FfiFinishedCallback,
        context: *mut c_void,
    ),
    pub start_motion: unsafe extern "C" fn(model: *mut c_void, motion: u64, priority: i32),
    pub delete_motion: unsafe extern "C" fn(model: *mut c_void, motion: u64),
    pub stop_all_motions: ModelFn,

    // ========== 每帧更新 ==========
    pub load_parameters: ModelFn,
    pub save_parameters: ModelFn,
    pub update_motion: ModelStepFn,
    pub update_pose: ModelStepFn,
    pub update_expression: ModelStepFn,
    pub evaluate_physics: ModelStepFn,
    pub add_parameter_value: ParameterFn,
    pub set_parameter_value: ParameterFn,
    pub update: ModelFn,

    // ========== 渲染 ==========
    pub create_renderer: ModelFn,
    pub bind_texture: unsafe extern "C" fn(model: *mut c_void, index: u32, texture_id: u32),
    /// 16 个 float，列主序
    pub set_mvp_matrix: unsafe extern "C" fn(model: *mut c_void, matrix: *const f32),
    pub draw: ModelFn,

    // ========== 查询 ==========
    pub is_hit: unsafe extern "C" fn(model: *mut c_void, drawable: u32, x: f32, y: f32) -> bool,
    pub canvas_width: unsafe extern "C" fn(model: *mut c_void) -> f32,
    pub canvas_height: unsafe extern "C" fn(model: *mut c_void) -> f32,
    pub drawable_count: unsafe extern "C" fn(model: *mut c_void) -> u32,
    /// 返回的字符串归引擎所有
    pub drawable_id: unsafe extern "C" fn(model: *mut c_void, index: u32) -> *const c_char,
    pub has_model: ModelQueryFn,
    pub has_pose: ModelQueryFn,
    pub has_physics: ModelQueryFn,
    pub has_renderer: ModelQueryFn,
    pub has_active_expression: ModelQueryFn,
}

/// 引擎回调日志/文件加载时使用的选项
static FFI_OPTION: OnceCell<FrameworkOption> = OnceCell::new();

unsafe extern "C" fn log_message_entry(message: *const c_char) {
    if message.is_null() {
        return;
    }
    if let Some(option) = FFI_OPTION.get() {
        option.log_message(&CStr::from_ptr(message).to_string_lossy());
    }
}

unsafe extern "C" fn load_file_entry(path: *const c_char, size: *mut u32) -> *mut u8 {
    if path.is_null() || size.is_null() {
        return ptr::null_mut();
    }
    *size = 0;
    let Some(option) = FFI_OPTION.get() else {
        return ptr::null_mut();
    };
    let Some(bytes) = option.load_file(&CStr::from_ptr(path).to_string_lossy()) else {
        return ptr::null_mut();
    };
    let Ok(len) = u32::try_from(bytes.len()) else {
        log::error!("resource too large: {} bytes", bytes.len());
        return ptr::null_mut();
    };
    *size = len;
    Box::into_raw(bytes.into_boxed_slice()).cast::<u8>()
}

unsafe extern "C" fn release_file_entry(data: *mut u8, size: u32) {
    if !data.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, size as usize)));
    }
}

unsafe extern "C" fn finished_entry(context: *mut c_void, motion: u64) {
    if let Some(handler) = context.cast::<FinishedHandler>().as_ref() {
        handler(MotionHandle(motion));
    }
}

/// 名字里的 NUL 会截断 C 字符串，直接去掉
fn c_string(value: &str) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

/// 通过函数表转发的后端
pub struct FfiBackend {
    vtable: CubismBackendVTable,
}

// SAFETY: 注册方保证函数表可以从任意线程调用
unsafe impl Send for FfiBackend {}
unsafe impl Sync for FfiBackend {}

impl FfiBackend {
    /// # Safety
    /// 表中所有函数指针有效且可跨线程调用，`user_data` 在进程生命周期内有效。
    pub unsafe fn new(vtable: CubismBackendVTable) -> Result<Self> {
        if vtable.abi_version != BACKEND_ABI_VERSION {
            return Err(BindingError::BackendAbiMismatch(vtable.abi_version));
        }
        Ok(Self { vtable })
    }
}

impl EngineBackend for FfiBackend {
    fn start_up(&self, option: &FrameworkOption) -> bool {
        if FFI_OPTION.set(option.clone()).is_err() {
            log::warn!("engine option already installed, keeping the first one");
        }
        let ffi_option = FfiOption {
            log_level: option.log_level as i32,
            log_message: log_message_entry,
            load_file: load_file_entry,
            release_file: release_file_entry,
        };
        unsafe { (self.vtable.start_up)(self.vtable.user_data, &ffi_option) }
    }

    fn initialize(&self) {
        unsafe { (self.vtable.initialize)(self.vtable.user_data) }
    }

    fn dispose(&self) {
        unsafe { (self.vtable.dispose)(self.vtable.user_data) }
    }

    fn intern_id(&self, name: &str) -> CubismId {
        let name = c_string(name);
        CubismId(unsafe { (self.vtable.intern_id)(self.vtable.user_data, name.as_ptr()) })
    }

    fn create_model(&self) -> Box<dyn EngineModel> {
        let model = unsafe { (self.vtable.create_model)(self.vtable.user_data) };
        if model.is_null() {
            log::error!("engine failed to create a model");
        }
        Box::new(FfiModel {
            vtable: self.vtable,
            model,
            handlers: HashMap::new(),
        })
    }
}

/// 引擎侧模型为空时所有调用直接返回默认值
macro_rules! forward {
    ($self:ident, $func:ident $(, $arg:expr)*; $default:expr) => {
        if $self.model.is_null() {
            $default
        } else {
            unsafe { ($self.vtable.$func)($self.model $(, $arg)*) }
        }
    };
}

pub struct FfiModel {
    vtable: CubismBackendVTable,
    model: *mut c_void,
    /// 交给引擎的回调上下文，实例删除后才释放
    handlers: HashMap<MotionHandle, Box<FinishedHandler>>,
}

// SAFETY: 模型只在持有 UserModel 锁时访问
unsafe impl Send for FfiModel {}

impl FfiModel {
    unsafe fn load_with(&mut self, load: ModelLoadFn, bytes: &[u8]) -> bool {
        let Ok(size) = u32::try_from(bytes.len()) else {
            return false;
        };
        !self.model.is_null() && load(self.model, bytes.as_ptr(), size)
    }
}

impl Drop for FfiModel {
    fn drop(&mut self) {
        if !self.model.is_null() {
            unsafe { (self.vtable.delete_model)(self.vtable.user_data, self.model) }
        }
    }
}

impl EngineModel for FfiModel {
    unsafe fn load_model(&mut self, moc: &[u8]) -> bool {
        self.load_with(self.vtable.load_model, moc)
    }

    unsafe fn load_physics(&mut self, json: &[u8]) -> bool {
        self.load_with(self.vtable.load_physics, json)
    }

    unsafe fn load_pose(&mut self, json: &[u8]) -> bool {
        self.load_with(self.vtable.load_pose, json)
    }

    unsafe fn load_expression(&mut self, json: &[u8], name: &str) -> bool {
        let Ok(size) = u32::try_from(json.len()) else {
            return false;
        };
        let name = c_string(name);
        forward!(self, load_expression, json.as_ptr(), size, name.as_ptr(); false)
    }

    fn set_expression(&mut self, name: &str) -> bool {
        let name = c_string(name);
        forward!(self, set_expression, name.as_ptr(); false)
    }

    unsafe fn create_motion(&mut self, json: &[u8]) -> Option<MotionHandle> {
        let size = u32::try_from(json.len()).ok()?;
        let motion = forward!(self, create_motion, json.as_ptr(), size; 0);
        (motion != 0).then_some(MotionHandle(motion))
    }

    fn set_motion_loop(&mut self, motion: MotionHandle, looping: bool) {
        forward!(self, set_motion_loop, motion.0, looping; ())
    }

    fn set_finished_handler(&mut self, motion: MotionHandle, handler: FinishedHandler) {
        let handler = Box::new(handler);
        let context = ptr::addr_of!(*handler).cast_mut().cast::<c_void>();
        forward!(self, set_finished_handler, motion.0, finished_entry, context; ());
        // 引擎已换成新的上下文，旧的可以释放
        self.handlers.insert(motion, handler);
    }

    fn start_motion(&mut self, motion: MotionHandle, priority: i32) {
        forward!(self, start_motion, motion.0, priority; ())
    }

    fn delete_motion(&mut self, motion: MotionHandle) {
        forward!(self, delete_motion, motion.0; ());
        self.handlers.remove(&motion);
    }

    fn stop_all_motions(&mut self) {
        forward!(self, stop_all_motions; ())
    }

    fn load_parameters(&mut self) {
        forward!(self, load_parameters; ())
    }

    fn save_parameters(&mut self) {
        forward!(self, save_parameters; ())
    }

    fn update_motion(&mut self, delta_time: f32) {
        forward!(self, update_motion, delta_time; ())
    }

    fn update_pose(&mut self, delta_time: f32) {
        forward!(self, update_pose, delta_time; ())
    }

    fn update_expression(&mut self, delta_time: f32) {
        forward!(self, update_expression, delta_time; ())
    }

    fn evaluate_physics(&mut self, delta_time: f32) {
        forward!(self, evaluate_physics, delta_time; ())
    }

    fn add_parameter_value(&mut self, id: CubismId, value: f32) {
        forward!(self, add_parameter_value, id.0, value; ())
    }

    fn set_parameter_value(&mut self, id: CubismId, value: f32) {
        forward!(self, set_parameter_value, id.0, value; ())
    }

    fn update(&mut self) {
        forward!(self, update; ())
    }

    fn create_renderer(&mut self) {
        forward!(self, create_renderer; ())
    }

    fn bind_texture(&mut self, index: u32, texture_id: u32) {
        forward!(self, bind_texture, index, texture_id; ())
    }

    fn set_mvp_matrix(&mut self, mvp: &Mat4) {
        let cols = mvp.to_cols_array();
        forward!(self, set_mvp_matrix, cols.as_ptr(); ())
    }

    fn draw(&mut self) {
        forward!(self, draw; ())
    }

    fn is_hit(&self, drawable: CubismId, x: f32, y: f32) -> bool {
        forward!(self, is_hit, drawable.0, x, y; false)
    }

    fn canvas_width(&self) -> f32 {
        forward!(self, canvas_width; 0.0)
    }

    fn canvas_height(&self) -> f32 {
        forward!(self, canvas_height; 0.0)
    }

    fn drawable_ids(&self) -> Vec<String> {
        let count = forward!(self, drawable_count; 0);
        (0..count)
            .filter_map(|index| {
                let id = forward!(self, drawable_id, index; ptr::null());
                // SAFETY: 非空时指向引擎持有的 NUL 结尾字符串
                (!id.is_null()).then(|| unsafe { CStr::from_ptr(id) }.to_string_lossy().into_owned())
            })
            .collect()
    }

    fn has_model(&self) -> bool {
        forward!(self, has_model; false)
    }

    fn has_pose(&self) -> bool {
        forward!(self, has_pose; false)
    }

    fn has_physics(&self) -> bool {
        forward!(self, has_physics; false)
    }

    fn has_renderer(&self) -> bool {
        forward!(self, has_renderer; false)
    }

    fn has_active_expression(&self) -> bool {
        forward!(self, has_active_expression; false)
    }
}

/// 把函数表注册为进程的引擎后端
///
/// # Safety
/// 同 `FfiBackend::new`。
pub unsafe fn register_vtable(vtable: CubismBackendVTable) -> Result<()> {
    let backend = FfiBackend::new(vtable)?;
    framework::register_backend(Arc::new(backend))
}

/// 供 C++ 胶水库调用的注册入口，成功返回 true
///
/// # Safety
/// `vtable` 为空或指向一张完整填写的函数表，见 `FfiBackend::new`。
#[no_mangle]
pub unsafe extern "C" fn live2d_jni_register_backend(vtable: *const CubismBackendVTable) -> bool {
    let Some(vtable) = vtable.as_ref() else {
        return false;
    };
    match register_vtable(*vtable) {
        Ok(()) => true,
        Err(e) => {
            log::error!("live2d_jni_register_backend failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::slice;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::asset::fake_moc3;
    use crate::host::recording::RecordingHost;
    use crate::model::{run_cycle, UserModel};
    use crate::motion::MotionRequest;

    /// 胶水库一侧的状态
    #[derive(Default)]
    struct GlueBackend {
        models_created: AtomicUsize,
        models_deleted: AtomicUsize,
        motions_deleted: AtomicUsize,
        loader: Mutex<Option<(
            unsafe extern "C" fn(*const c_char, *mut u32) -> *mut u8,
            unsafe extern "C" fn(*mut u8, u32),
        )>>,
    }

    struct GlueModel {
        backend: &'static GlueBackend,
        loaded: bool,
        next_motion: u64,
        playing: Vec<u64>,
        handlers: HashMap<u64, (FfiFinishedCallback, usize)>,
    }

    unsafe fn glue_backend(user_data: *mut c_void) -> &'static GlueBackend {
        &*user_data.cast::<GlueBackend>()
    }

    unsafe fn glue_model(model: *mut c_void) -> &'static mut GlueModel {
        &mut *model.cast::<GlueModel>()
    }

    unsafe extern "C" fn start_up(user_data: *mut c_void, option: *const FfiOption) -> bool {
        let option = &*option;
        *glue_backend(user_data).loader.lock().unwrap() = Some((option.load_file, option.release_file));
        (option.log_message)(b"engine started\n\0".as_ptr().cast());
        true
    }
    unsafe extern "C" fn backend_noop(_user_data: *mut c_void) {}
    unsafe extern "C" fn intern_id(_user_data: *mut c_void, name: *const c_char) -> u32 {
        CStr::from_ptr(name).to_bytes().len() as u32
    }
    unsafe extern "C" fn create_model(user_data: *mut c_void) -> *mut c_void {
        let backend = glue_backend(user_data);
        backend.models_created.fetch_add(1, Ordering::SeqCst);
        let model = GlueModel {
            backend,
            loaded: false,
            next_motion: 0,
            playing: Vec::new(),
            handlers: HashMap::new(),
        };
        Box::into_raw(Box::new(model)).cast()
    }
    unsafe extern "C" fn delete_model(user_data: *mut c_void, model: *mut c_void) {
        drop(Box::from_raw(model.cast::<GlueModel>()));
        glue_backend(user_data).models_deleted.fetch_add(1, Ordering::SeqCst);
    }
    unsafe extern "C" fn load_moc(model: *mut c_void, data: *const u8, size: u32) -> bool {
        let ok = slice::from_raw_parts(data, size as usize).starts_with(b"MOC3");
        glue_model(model).loaded |= ok;
        ok
    }
    unsafe extern "C" fn load_json(_model: *mut c_void, _data: *const u8, size: u32) -> bool {
        size > 0
    }
    unsafe extern "C" fn load_expression(_: *mut c_void, _: *const u8, size: u32, _: *const c_char) -> bool {
        size > 0
    }
    unsafe extern "C" fn set_expression(_model: *mut c_void, _name: *const c_char) -> bool {
        false
    }
    unsafe extern "C" fn create_motion(model: *mut c_void, _data: *const u8, size: u32) -> u64 {
        if size == 0 {
            return 0;
        }
        let model = glue_model(model);
        model.next_motion += 1;
        model.next_motion
    }
    unsafe extern "C" fn set_motion_loop(_model: *mut c_void, _motion: u64, _looping: bool) {}
    unsafe extern "C" fn set_finished_handler(
        model: *mut c_void,
        motion: u64,
        callback: FfiFinishedCallback,
        context: *mut c_void,
    ) {
        glue_model(model).handlers.insert(motion, (callback, context as usize));
    }
    unsafe extern "C" fn start_motion(model: *mut c_void, motion: u64, _priority: i32) {
        glue_model(model).playing.push(motion);
    }
    unsafe extern "C" fn delete_motion(model: *mut c_void, motion: u64) {
        let model = glue_model(model);
        model.handlers.remove(&motion);
        model.backend.motions_deleted.fetch_add(1, Ordering::SeqCst);
    }
    unsafe extern "C" fn model_noop(_model: *mut c_void) {}
    /// 一帧内所有动作都播放完毕
    unsafe extern "C" fn update_motion(model: *mut c_void, _delta_time: f32) {
        let model = glue_model(model);
        for motion in std::mem::take(&mut model.playing) {
            if let Some(&(callback, context)) = model.handlers.get(&motion) {
                callback(context as *mut c_void, motion);
            }
        }
    }
    unsafe extern "C" fn step_noop(_model: *mut c_void, _delta_time: f32) {}
    unsafe extern "C" fn parameter_noop(_model: *mut c_void, _id: u32, _value: f32) {}
    unsafe extern "C" fn bind_texture(_model: *mut c_void, _index: u32, _texture_id: u32) {}
    unsafe extern "C" fn set_mvp_matrix(_model: *mut c_void, _matrix: *const f32) {}
    unsafe extern "C" fn is_hit(_model: *mut c_void, _drawable: u32, x: f32, _y: f32) -> bool {
        x >= 0.0
    }
    unsafe extern "C" fn canvas_size(_model: *mut c_void) -> f32 {
        4.0
    }
    unsafe extern "C" fn drawable_count(_model: *mut c_void) -> u32 {
        2
    }
    unsafe extern "C" fn drawable_id(_model: *mut c_void, index: u32) -> *const c_char {
        match index {
            0 => b"ArtMesh0\0".as_ptr().cast(),
            _ => ptr::null(),
        }
    }
    unsafe extern "C" fn has_model(model: *mut c_void) -> bool {
        glue_model(model).loaded
    }
    unsafe extern "C" fn query_false(_model: *mut c_void) -> bool {
        false
    }

    /// 一张完整的函数表，`user_data` 指向泄漏的 `GlueBackend`
    fn glue_vtable() -> (CubismBackendVTable, &'static GlueBackend) {
        let backend: &'static GlueBackend = Box::leak(Box::default());
        let vtable = CubismBackendVTable {
            abi_version: BACKEND_ABI_VERSION,
            user_data: ptr::addr_of!(*backend).cast_mut().cast(),
            start_up,
            initialize: backend_noop,
            dispose: backend_noop,
            intern_id,
            create_model,
            delete_model,
            load_model: load_moc,
            load_physics: load_json,
            load_pose: load_json,
            load_expression,
            set_expression,
            create_motion,
            set_motion_loop,
            set_finished_handler,
            start_motion,
            delete_motion,
            stop_all_motions: model_noop,
            load_parameters: model_noop,
            save_parameters: model_noop,
            update_motion,
            update_pose: step_noop,
            update_expression: step_noop,
            evaluate_physics: step_noop,
            add_parameter_value: parameter_noop,
            set_parameter_value: parameter_noop,
            update: model_noop,
            create_renderer: model_noop,
            bind_texture,
            set_mvp_matrix,
            draw: model_noop,
            is_hit,
            canvas_width: canvas_size,
            canvas_height: canvas_size,
            drawable_count,
            drawable_id,
            has_model,
            has_pose: query_false,
            has_physics: query_false,
            has_renderer: query_false,
            has_active_expression: query_false,
        };
        (vtable, backend)
    }

    #[test]
    fn test_rejects_unknown_abi_version() {
        let (mut vtable, _) = glue_vtable();
        vtable.abi_version = BACKEND_ABI_VERSION + 1;
        let err = unsafe { FfiBackend::new(vtable) }.err();
        assert!(matches!(err, Some(BindingError::BackendAbiMismatch(v)) if v == BACKEND_ABI_VERSION + 1));
    }

    #[test]
    fn test_null_vtable_is_refused() {
        assert!(!unsafe { live2d_jni_register_backend(ptr::null()) });
    }

    #[test]
    fn test_start_up_hands_out_file_loader() {
        let (vtable, glue) = glue_vtable();
        let backend = unsafe { FfiBackend::new(vtable) }.unwrap();
        let option = FrameworkOption {
            file_loader: Some(Arc::new(|path: &str| {
                (path == "FragShaderSrc.frag").then(|| b"void".to_vec())
            })),
            ..Default::default()
        };
        assert!(backend.start_up(&option));

        let (load_file, release_file) = glue.loader.lock().unwrap().expect("start_up not forwarded");
        let mut size = 0u32;
        let data = unsafe { load_file(b"FragShaderSrc.frag\0".as_ptr().cast(), &mut size) };
        assert!(!data.is_null());
        assert_eq!(unsafe { slice::from_raw_parts(data, size as usize) }, b"void");
        unsafe { release_file(data, size) };

        let missing = unsafe { load_file(b"missing.vert\0".as_ptr().cast(), &mut size) };
        assert!(missing.is_null());
        assert_eq!(size, 0);
    }

    #[test]
    fn test_update_cycle_through_vtable() {
        let (vtable, glue) = glue_vtable();
        let backend: Arc<dyn EngineBackend> = Arc::new(unsafe { FfiBackend::new(vtable) }.unwrap());

        let mut model = UserModel::new(backend);
        assert_eq!(glue.models_created.load(Ordering::SeqCst), 1);
        model.load_model(&fake_moc3()).unwrap();
        assert_eq!(model.canvas_width(), 4.0);
        assert_eq!(model.drawable_ids(), vec!["ArtMesh0".to_string()]);

        let host = Arc::new(RecordingHost::default());
        model.link(host.clone());
        let clip = br#"{"Version":3,"Meta":{"Duration":0.5},"Curves":[]}"#;
        let request = MotionRequest { name: "wave".to_string(), ..Default::default() };
        let handle = model.start_motion(clip, request).unwrap();
        assert_eq!(handle, MotionHandle(1));

        let model = Mutex::new(model);
        // 第一帧里引擎回调结束，第二帧才释放并通知
        assert!(run_cycle(&model, 1.0).released.is_empty());
        let report = run_cycle(&model, 1.0);
        assert_eq!(report.released.len(), 1);
        assert_eq!(report.notified, 1);
        assert_eq!(glue.motions_deleted.load(Ordering::SeqCst), 1);
        assert_eq!(host.names(), vec!["wave".to_string()]);

        drop(model);
        assert_eq!(glue.models_deleted.load(Ordering::SeqCst), 1);
    }
}
