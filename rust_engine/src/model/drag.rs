//! 拖拽跟随
//!
//! 目标点平滑与 SDK 的 CubismTargetPoint 行为一致：
//! 以 30fps 为基准，限制最大速度和加速度，接近目标时提前减速。

use crate::engine::{CubismId, EngineBackend, EngineModel};
use super::config::DragConfig;

const FRAME_RATE: f32 = 30.0;
const EPSILON: f32 = 0.01;
/// 每帧最大速度（40/10 单位/秒 ÷ 帧率）
const FACE_PARAM_MAX_V: f32 = 40.0 / 10.0;
/// 达到最大速度所需时间（秒）
const TIME_TO_MAX_SPEED: f32 = 0.15;

/// 平滑后的拖拽点
#[derive(Debug, Clone, Default)]
pub struct TargetPoint {
    face_target_x: f32,
    face_target_y: f32,
    face_x: f32,
    face_y: f32,
    face_vx: f32,
    face_vy: f32,
    last_time_seconds: f32,
    user_time_seconds: f32,
}

impl TargetPoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置目标（-1.0 ~ 1.0）
    pub fn set(&mut self, x: f32, y: f32) {
        self.face_target_x = x;
        self.face_target_y = y;
    }

    pub fn x(&self) -> f32 {
        self.face_x
    }

    pub fn y(&self) -> f32 {
        self.face_y
    }

    /// 推进平滑
    pub fn update(&mut self, delta_time: f32) {
        self.user_time_seconds += delta_time;

        let max_v = FACE_PARAM_MAX_V / FRAME_RATE;

        // 第一帧只记录时间
        if self.last_time_seconds == 0.0 {
            self.last_time_seconds = self.user_time_seconds;
            return;
        }

        let delta_time_weight = (self.user_time_seconds - self.last_time_seconds) * FRAME_RATE;
        self.last_time_seconds = self.user_time_seconds;

        let frame_to_max_speed = TIME_TO_MAX_SPEED * FRAME_RATE;
        let max_a = delta_time_weight * max_v / frame_to_max_speed;

        let dx = self.face_target_x - self.face_x;
        let dy = self.face_target_y - self.face_y;
        if dx.abs() <= EPSILON && dy.abs() <= EPSILON {
            return;
        }

        let d = (dx * dx + dy * dy).sqrt();
        let vx = max_v * dx / d;
        let vy = max_v * dy / d;

        let mut ax = vx - self.face_vx;
        let mut ay = vy - self.face_vy;
        let a = (ax * ax + ay * ay).sqrt();
        if a < -max_a || a > max_a {
            ax *= max_a / a;
            ay *= max_a / a;
        }
        self.face_vx += ax;
        self.face_vy += ay;

        // 接近目标时按 v² = 2ad 减速，避免越过目标
        let max_v = 0.5 * ((max_a * max_a + 16.0 * max_a * d - 8.0 * max_a * d).sqrt() - max_a);
        let cur_v = (self.face_vx * self.face_vx + self.face_vy * self.face_vy).sqrt();
        if cur_v > max_v {
            self.face_vx *= max_v / cur_v;
            self.face_vy *= max_v / cur_v;
        }

        self.face_x += self.face_vx;
        self.face_y += self.face_vy;
    }
}

/// 拖拽注入的参数 ID（创建模型时驻留一次）
#[derive(Debug, Clone, Copy)]
pub struct DragParams {
    pub angle_x: CubismId,
    pub angle_y: CubismId,
    pub body_angle_x: CubismId,
    pub body_angle_y: CubismId,
    pub eye_ball_x: CubismId,
    pub eye_ball_y: CubismId,
}

impl DragParams {
    pub fn intern(backend: &dyn EngineBackend) -> Self {
        Self {
            angle_x: backend.intern_id("ParamAngleX"),
            angle_y: backend.intern_id("ParamAngleY"),
            body_angle_x: backend.intern_id("ParamBodyAngleX"),
            body_angle_y: backend.intern_id("ParamBodyAngleY"),
            eye_ball_x: backend.intern_id("ParamEyeBallX"),
            eye_ball_y: backend.intern_id("ParamEyeBallY"),
        }
    }
}

/// 按配置计算每个参数的加法偏移
pub fn drag_offsets(params: &DragParams, x: f32, y: f32, config: &DragConfig) -> Vec<(CubismId, f32)> {
    let mut offsets = vec![
        (params.angle_x, x * config.angle_gain),
        (params.angle_y, y * config.angle_gain),
        (params.body_angle_x, x * config.body_angle_gain),
    ];
    if config.body_angle_y {
        offsets.push((params.body_angle_y, y * config.body_angle_gain));
    }
    offsets.push((params.eye_ball_x, x * config.eye_ball_gain));
    if config.eye_ball_y {
        offsets.push((params.eye_ball_y, y * config.eye_ball_gain));
    }
    offsets
}

/// 模型上的拖拽输入，首次 `set` 之后才生效
#[derive(Debug, Clone)]
pub struct DragFollow {
    params: DragParams,
    target: Option<TargetPoint>,
}

impl DragFollow {
    pub fn new(params: DragParams) -> Self {
        Self { params, target: None }
    }

    pub fn set(&mut self, x: f32, y: f32) {
        self.target.get_or_insert_with(TargetPoint::new).set(x, y);
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        self.target.as_ref().map(|t| (t.x(), t.y()))
    }

    /// 推进平滑并把偏移叠加到引擎参数上
    pub fn apply(&mut self, engine: &mut dyn EngineModel, delta_time: f32, config: &DragConfig) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        target.update(delta_time);
        for (id, value) in drag_offsets(&self.params, target.x(), target.y(), config) {
            engine.add_parameter_value(id, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeBackend;

    fn params() -> DragParams {
        DragParams::intern(FakeBackend::new().as_ref())
    }

    #[test]
    fn test_first_update_only_records_time() {
        let mut point = TargetPoint::new();
        point.set(1.0, 0.0);
        point.update(1.0 / 60.0);
        assert_eq!(point.x(), 0.0);
        point.update(1.0 / 60.0);
        assert!(point.x() > 0.0);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut point = TargetPoint::new();
        point.set(0.5, -0.5);
        for _ in 0..600 {
            point.update(1.0 / 60.0);
            assert!(point.x() <= 0.5 + EPSILON);
            assert!(point.y() >= -0.5 - EPSILON);
        }
        assert!((point.x() - 0.5).abs() <= EPSILON);
        assert!((point.y() + 0.5).abs() <= EPSILON);
    }

    #[test]
    fn test_speed_is_limited() {
        let mut point = TargetPoint::new();
        point.set(1.0, 0.0);
        point.update(1.0 / 30.0);
        let mut last = point.x();
        for _ in 0..30 {
            point.update(1.0 / 30.0);
            assert!(point.x() - last <= FACE_PARAM_MAX_V / FRAME_RATE + 1e-6);
            last = point.x();
        }
    }

    #[test]
    fn test_offsets_are_linear() {
        let params = params();
        let config = DragConfig::default();
        let single = drag_offsets(&params, 0.2, 0.1, &config);
        let double = drag_offsets(&params, 0.4, 0.1, &config);

        let value = |offsets: &[(CubismId, f32)], id: CubismId| {
            offsets.iter().find(|(i, _)| *i == id).map(|(_, v)| *v).unwrap()
        };
        for id in [params.angle_x, params.body_angle_x, params.eye_ball_x] {
            assert!((value(&double, id) - 2.0 * value(&single, id)).abs() < 1e-5);
        }
        assert!((value(&single, params.angle_x) - 6.0).abs() < 1e-5);
        assert!((value(&single, params.body_angle_x) - 2.0).abs() < 1e-5);
        assert!((value(&single, params.eye_ball_x) - 0.2).abs() < 1e-5);
        assert!((value(&single, params.angle_y) - 3.0).abs() < 1e-5);
        assert!((value(&single, params.eye_ball_y) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_vertical_terms_are_configurable() {
        let params = params();
        let config = DragConfig {
            eye_ball_y: false,
            body_angle_y: true,
            ..DragConfig::default()
        };
        let offsets = drag_offsets(&params, 0.0, 0.5, &config);
        assert!(offsets.iter().all(|(id, _)| *id != params.eye_ball_y));
        assert!(offsets.iter().any(|(id, v)| *id == params.body_angle_y && (*v - 5.0).abs() < 1e-5));
        assert_eq!(drag_offsets(&params, 0.0, 0.5, &DragConfig::default()).len(), 5);
    }

    #[test]
    fn test_inactive_until_set() {
        let mut follow = DragFollow::new(params());
        assert!(!follow.is_active());
        assert_eq!(follow.position(), None);
        follow.set(0.3, 0.3);
        assert!(follow.is_active());
        assert_eq!(follow.position(), Some((0.0, 0.0)));
    }
}
