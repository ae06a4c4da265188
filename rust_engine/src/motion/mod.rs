//! 动作生命周期
//!
//! 创建 → 登记 → 引擎播放 → 结束回调入队 → 下一帧取出 → 释放缓冲区与句柄 → 通知宿主

mod callback;
mod finished_queue;
mod registry;

pub use callback::finished_handler;
pub use finished_queue::FinishedMotionQueue;
pub use registry::{FinishedMotion, MotionRegistry, MotionRequest, DEFAULT_MOTION_NAME};
