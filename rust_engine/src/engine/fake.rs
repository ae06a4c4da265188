//! 测试用的假引擎，记录所有调用

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use glam::Mat4;

use super::{CubismId, EngineBackend, EngineModel, FinishedHandler, MotionHandle};
use crate::framework::FrameworkOption;

/// 字节中含有该标记时假引擎拒绝解析
pub const REJECT_MARKER: &[u8] = b"reject";

#[derive(Default)]
pub struct FakeState {
    pub model_bytes: Option<Vec<u8>>,
    pub physics_loaded: bool,
    pub pose_loaded: bool,
    pub expressions: Vec<String>,
    pub active_expression: Option<String>,
    pub renderer: bool,
    pub textures: Vec<(u32, u32)>,
    pub mvp: Option<Mat4>,
    pub draw_count: usize,
    /// 每帧调用顺序
    pub steps: Vec<&'static str>,
    pub added: Vec<(CubismId, f32)>,
    pub set: Vec<(CubismId, f32)>,
    pub created: Vec<MotionHandle>,
    pub started: Vec<(MotionHandle, i32)>,
    pub deleted: Vec<MotionHandle>,
    pub loops: HashMap<MotionHandle, bool>,
    pub handlers: HashMap<MotionHandle, FinishedHandler>,
    /// 正在播放的动作及剩余时间
    pub playing: Vec<(MotionHandle, f32)>,
    next_motion: u64,
}

pub type Recorder = Arc<Mutex<FakeState>>;

pub struct FakeModel {
    state: Recorder,
}

impl FakeModel {
    pub fn new() -> (Self, Recorder) {
        let state: Recorder = Arc::new(Mutex::new(FakeState::default()));
        (Self { state: state.clone() }, state)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn rejected(bytes: &[u8]) -> bool {
    bytes.windows(REJECT_MARKER.len()).any(|w| w == REJECT_MARKER)
}

fn motion_duration(json: &[u8]) -> f32 {
    serde_json::from_slice::<serde_json::Value>(json)
        .ok()
        .and_then(|v| v["Meta"]["Duration"].as_f64())
        .unwrap_or(1.0) as f32
}

impl EngineModel for FakeModel {
    unsafe fn load_model(&mut self, moc: &[u8]) -> bool {
        if rejected(moc) {
            return false;
        }
        self.state().model_bytes = Some(moc.to_vec());
        true
    }

    unsafe fn load_physics(&mut self, json: &[u8]) -> bool {
        if rejected(json) {
            return false;
        }
        self.state().physics_loaded = true;
        true
    }

    unsafe fn load_pose(&mut self, json: &[u8]) -> bool {
        if rejected(json) {
            return false;
        }
        self.state().pose_loaded = true;
        true
    }

    unsafe fn load_expression(&mut self, json: &[u8], name: &str) -> bool {
        if rejected(json) {
            return false;
        }
        let mut state = self.state();
        if !state.expressions.iter().any(|n| n == name) {
            state.expressions.push(name.to_string());
        }
        true
    }

    fn set_expression(&mut self, name: &str) -> bool {
        let mut state = self.state();
        if state.expressions.iter().any(|n| n == name) {
            state.active_expression = Some(name.to_string());
            true
        } else {
            false
        }
    }

    unsafe fn create_motion(&mut self, json: &[u8]) -> Option<MotionHandle> {
        if rejected(json) {
            return None;
        }
        let mut state = self.state();
        state.next_motion += 1;
        let handle = MotionHandle(state.next_motion);
        state.created.push(handle);
        let duration = motion_duration(json);
        state.playing.push((handle, duration));
        Some(handle)
    }

    fn set_motion_loop(&mut self, motion: MotionHandle, looping: bool) {
        self.state().loops.insert(motion, looping);
    }

    fn set_finished_handler(&mut self, motion: MotionHandle, handler: FinishedHandler) {
        self.state().handlers.insert(motion, handler);
    }

    fn start_motion(&mut self, motion: MotionHandle, priority: i32) {
        self.state().started.push((motion, priority));
    }

    fn delete_motion(&mut self, motion: MotionHandle) {
        let mut state = self.state();
        state.playing.retain(|(h, _)| *h != motion);
        state.handlers.remove(&motion);
        state.deleted.push(motion);
    }

    fn stop_all_motions(&mut self) {
        self.state().playing.clear();
    }

    fn load_parameters(&mut self) {
        self.state().steps.push("load_parameters");
    }

    fn save_parameters(&mut self) {
        self.state().steps.push("save_parameters");
    }

    fn update_motion(&mut self, delta_time: f32) {
        // 与 SDK 一致：在遍历内部列表时同步触发结束回调
        let finished: Vec<(MotionHandle, Option<FinishedHandler>)> = {
            let mut state = self.state();
            state.steps.push("update_motion");
            let loops = state.loops.clone();
            let mut done = Vec::new();
            for (handle, remaining) in state.playing.iter_mut() {
                *remaining -= delta_time;
                if *remaining <= 0.0 && !loops.get(handle).copied().unwrap_or(false) {
                    done.push(*handle);
                }
            }
            state.playing.retain(|(h, _)| !done.contains(h));
            done.into_iter()
                .map(|h| (h, state.handlers.get(&h).cloned()))
                .collect()
        };
        for (handle, handler) in finished {
            if let Some(handler) = handler {
                handler(handle);
            }
        }
    }

    fn update_pose(&mut self, _delta_time: f32) {
        self.state().steps.push("update_pose");
    }

    fn update_expression(&mut self, _delta_time: f32) {
        self.state().steps.push("update_expression");
    }

    fn evaluate_physics(&mut self, _delta_time: f32) {
        self.state().steps.push("evaluate_physics");
    }

    fn add_parameter_value(&mut self, id: CubismId, value: f32) {
        let mut state = self.state();
        state.steps.push("add_parameter_value");
        state.added.push((id, value));
    }

    fn set_parameter_value(&mut self, id: CubismId, value: f32) {
        self.state().set.push((id, value));
    }

    fn update(&mut self) {
        self.state().steps.push("update");
    }

    fn create_renderer(&mut self) {
        self.state().renderer = true;
    }

    fn bind_texture(&mut self, index: u32, texture_id: u32) {
        self.state().textures.push((index, texture_id));
    }

    fn set_mvp_matrix(&mut self, mvp: &Mat4) {
        self.state().mvp = Some(*mvp);
    }

    fn draw(&mut self) {
        self.state().draw_count += 1;
    }

    fn is_hit(&self, _drawable: CubismId, x: f32, y: f32) -> bool {
        (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)
    }

    fn canvas_width(&self) -> f32 {
        if self.has_model() { 2.0 } else { 0.0 }
    }

    fn canvas_height(&self) -> f32 {
        if self.has_model() { 3.0 } else { 0.0 }
    }

    fn drawable_ids(&self) -> Vec<String> {
        vec!["ArtMesh0".to_string(), "ArtMesh1".to_string()]
    }

    fn has_model(&self) -> bool {
        self.state().model_bytes.is_some()
    }

    fn has_pose(&self) -> bool {
        self.state().pose_loaded
    }

    fn has_physics(&self) -> bool {
        self.state().physics_loaded
    }

    fn has_renderer(&self) -> bool {
        self.state().renderer
    }

    fn has_active_expression(&self) -> bool {
        self.state().active_expression.is_some()
    }
}

/// 假后端：驻留 ID，并保留最近一个模型的记录器
#[derive(Default)]
pub struct FakeBackend {
    ids: Mutex<HashMap<String, u32>>,
    last_recorder: Mutex<Option<Recorder>>,
    refuse: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn recorder(&self) -> Recorder {
        self.last_recorder.lock().unwrap().clone().expect("no model created")
    }

    /// 之后的 start_up 返回失败
    pub fn refuse_start_up(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// 已驻留 ID 的反查
    pub fn id_of(&self, name: &str) -> Option<CubismId> {
        self.ids.lock().unwrap().get(name).map(|&i| CubismId(i))
    }
}

impl EngineBackend for FakeBackend {
    fn start_up(&self, _option: &FrameworkOption) -> bool {
        !self.refuse.load(Ordering::SeqCst)
    }

    fn initialize(&self) {}

    fn dispose(&self) {}

    fn intern_id(&self, name: &str) -> CubismId {
        let mut ids = self.ids.lock().unwrap();
        let next = ids.len() as u32;
        CubismId(*ids.entry(name.to_string()).or_insert(next))
    }

    fn create_model(&self) -> Box<dyn EngineModel> {
        let (model, recorder) = FakeModel::new();
        *self.last_recorder.lock().unwrap() = Some(recorder);
        Box::new(model)
    }
}
