//! 播放结束的动作实例队列
//!
//! 结束回调可能在引擎内部的其他上下文中触发，
//! 所以这里只做加锁追加，删除和通知宿主都留给每帧更新时统一处理。

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::MotionHandle;

#[derive(Default)]
struct PendingList {
    order: Vec<MotionHandle>,
    members: HashSet<MotionHandle>,
}

/// 多生产者/单消费者的待删除列表
#[derive(Default)]
pub struct FinishedMotionQueue {
    pending: Mutex<PendingList>,
}

impl FinishedMotionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingList> {
        // 回调里发生的 panic 不能让已入队的实例丢失
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加一个结束的实例；已在队列中时忽略，返回是否新入队
    pub fn enqueue(&self, motion: MotionHandle) -> bool {
        let mut pending = self.lock();
        if !pending.members.insert(motion) {
            return false;
        }
        pending.order.push(motion);
        true
    }

    /// 取走全部待删除实例（按入队顺序）
    pub fn drain(&self) -> Vec<MotionHandle> {
        let mut pending = self.lock();
        pending.members.clear();
        std::mem::take(&mut pending.order)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
