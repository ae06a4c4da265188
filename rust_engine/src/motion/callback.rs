//! 引擎结束回调与队列之间的桥

use std::sync::{Arc, Weak};

use crate::engine::{FinishedHandler, MotionHandle};
use super::FinishedMotionQueue;

/// 构造交给引擎的结束回调
///
/// 回调里唯一允许的动作是入队：此时引擎可能正遍历内部动作列表，
/// 所在线程也可能没有附加到 JVM。
/// 只持有弱引用，模型销毁后迟到的回调直接丢弃。
pub fn finished_handler(queue: &Arc<FinishedMotionQueue>) -> FinishedHandler {
    let queue: Weak<FinishedMotionQueue> = Arc::downgrade(queue);
    Arc::new(move |motion: MotionHandle| {
        if let Some(queue) = queue.upgrade() {
            queue.enqueue(motion);
        }
    })
}
