//! 动作实例注册表

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::{AssetKind, BufferStore, RetainedBuffer};
use crate::engine::{EngineModel, MotionHandle};
use super::{finished_handler, FinishedMotionQueue};

/// 通知宿主时使用的默认动作名
pub const DEFAULT_MOTION_NAME: &str = "motion";

/// 启动参数
#[derive(Clone, Debug)]
pub struct MotionRequest {
    pub priority: i32,
    /// `None` 时由调用方按 motion3.json 的 `Meta.Loop` 决定，注册表按不循环处理
    pub looping: Option<bool>,
    /// 结束时回传给宿主的名称
    pub name: String,
}

impl Default for MotionRequest {
    fn default() -> Self {
        Self {
            priority: 0,
            looping: None,
            name: DEFAULT_MOTION_NAME.to_string(),
        }
    }
}

/// 正在播放的动作
#[derive(Clone, Debug)]
struct MotionEntry {
    name: String,
    priority: i32,
    looping: bool,
}

/// 已释放、待通知宿主的动作
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinishedMotion {
    pub handle: MotionHandle,
    pub name: String,
}

/// 记录每个实例及其启动参数，缓冲区本身放在 `BufferStore`
#[derive(Default)]
pub struct MotionRegistry {
    entries: HashMap<MotionHandle, MotionEntry>,
}

impl MotionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 复制动作字节、创建实例并开始播放
    ///
    /// 只有引擎成功创建实例后才登记缓冲区和结束回调；
    /// 创建失败返回 `None`，副本随之释放。
    pub fn start(
        &mut self,
        engine: &mut dyn EngineModel,
        buffers: &mut BufferStore,
        queue: &Arc<FinishedMotionQueue>,
        bytes: &[u8],
        request: MotionRequest,
    ) -> Option<MotionHandle> {
        let buffer = RetainedBuffer::retain(AssetKind::Motion, bytes);
        let looping = request.looping.unwrap_or(false);

        // SAFETY: 缓冲区随后移入 BufferStore，直到 release 里 delete_motion 之后才释放
        let handle = unsafe { engine.create_motion(buffer.as_slice()) }?;

        buffers.adopt_motion(handle, buffer);
        engine.set_motion_loop(handle, looping);
        engine.set_finished_handler(handle, finished_handler(queue));
        engine.start_motion(handle, request.priority);

        log::debug!(
            "motion {:?} started (priority {}, loop {})",
            handle,
            request.priority,
            looping
        );
        self.entries.insert(
            handle,
            MotionEntry {
                name: request.name,
                priority: request.priority,
                looping,
            },
        );
        Some(handle)
    }

    /// 释放一个已结束的实例：先删缓冲区登记和引擎句柄，再交出通知信息
    pub fn release(
        &mut self,
        engine: &mut dyn EngineModel,
        buffers: &mut BufferStore,
        handle: MotionHandle,
    ) -> Option<FinishedMotion> {
        let Some(entry) = self.entries.remove(&handle) else {
            log::warn!("finished motion {:?} is not registered", handle);
            return None;
        };
        engine.delete_motion(handle);
        buffers.release_motion(handle);
        Some(FinishedMotion {
            handle,
            name: entry.name,
        })
    }

    /// 销毁模型时释放全部实例（不通知宿主）
    pub fn release_all(&mut self, engine: &mut dyn EngineModel, buffers: &mut BufferStore) {
        engine.stop_all_motions();
        for (handle, _) in self.entries.drain() {
            engine.delete_motion(handle);
            buffers.release_motion(handle);
        }
    }

    pub fn contains(&self, handle: MotionHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn priority_of(&self, handle: MotionHandle) -> Option<i32> {
        self.entries.get(&handle).map(|e| e.priority)
    }

    pub fn is_looping(&self, handle: MotionHandle) -> bool {
        self.entries.get(&handle).is_some_and(|e| e.looping)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
