//! 每帧更新驱动
//!
//! 固定顺序：
//! 1. 取出结束队列，逐个释放缓冲区与句柄，然后通知宿主
//! 2. 读取参数 → 3. 动作混合 → 4. 保存参数
//! 5. 姿势（已加载时）、表情（有激活表情时）
//! 6. 拖拽跟随偏移 → 7. 物理（已加载时）→ 8. 提交网格
//!
//! 第 3 步里触发的结束回调进入队列，留到下一帧的第 1 步处理。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::framework::defer_host_log;
use crate::host::HostLink;
use crate::motion::FinishedMotion;
use super::config::{self, DragConfig};
use super::UserModel;

/// 一帧的处理结果
#[derive(Debug, Default)]
pub struct CycleReport {
    /// 本帧释放的实例（按入队顺序）
    pub released: Vec<FinishedMotion>,
    /// 成功送达宿主的通知数
    pub notified: usize,
}

impl UserModel {
    /// 第 1 步的释放部分：取出队列并删除实例与缓冲区
    pub fn reclaim_finished(&mut self) -> Vec<FinishedMotion> {
        self.finished
            .drain()
            .into_iter()
            .filter_map(|handle| self.motions.release(self.engine.as_mut(), &mut self.buffers, handle))
            .collect()
    }

    pub fn host(&self) -> Option<Arc<dyn HostLink>> {
        self.host.clone()
    }

    /// 第 2 ~ 8 步
    pub fn advance(&mut self, delta_time: f32, drag_config: &DragConfig) {
        let engine = self.engine.as_mut();
        if !engine.has_model() {
            return;
        }

        engine.load_parameters();
        engine.update_motion(delta_time);
        engine.save_parameters();

        if engine.has_pose() {
            engine.update_pose(delta_time);
        }
        if engine.has_active_expression() {
            engine.update_expression(delta_time);
        }

        // 叠加在动作/姿势输出之上
        self.drag.apply(engine, delta_time, drag_config);

        if engine.has_physics() {
            engine.evaluate_physics(delta_time);
        }
        engine.update();
    }
}

fn lock(model: &Mutex<UserModel>) -> MutexGuard<'_, UserModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 逐个通知宿主，失败的跳过
fn notify(host: Option<&Arc<dyn HostLink>>, released: &[FinishedMotion]) -> usize {
    if released.is_empty() {
        return 0;
    }
    let Some(host) = host else {
        log::warn!("{} finished motion(s) released before linkNative", released.len());
        return 0;
    };
    released
        .iter()
        .filter(|finished| match host.motion_finished(&finished.name) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("onMotionFinished for {:?} skipped: {}", finished.handle, e);
                false
            }
        })
        .count()
}

/// 驱动一帧
///
/// 通知宿主时不持有模型锁，宿主在回调里重新调用本模型不会死锁，
/// 且此时实例和缓冲区都已释放。持锁期间的日志等锁释放后再转发。
pub fn run_cycle(model: &Mutex<UserModel>, delta_time: f32) -> CycleReport {
    let (released, host) = defer_host_log(|| {
        let mut model = lock(model);
        (model.reclaim_finished(), model.host())
    });

    let notified = notify(host.as_ref(), &released);

    let drag_config = config::get_config();
    defer_host_log(|| lock(model).advance(delta_time, &drag_config));

    CycleReport { released, notified }
}
