//! 缓冲区所有权存储

use std::collections::HashMap;

use crate::engine::MotionHandle;
use crate::{BindingError, Result};
use super::AssetKind;

/// 绑定层持有的一份资源字节
///
/// 内容放在 `Box<[u8]>` 里，移动本结构不会移动堆上的数据，
/// 引擎拿到的指针在结构被丢弃前一直有效。
pub struct RetainedBuffer {
    kind: AssetKind,
    bytes: Box<[u8]>,
}

impl RetainedBuffer {
    /// 复制调用方的字节（JNI 数组在返回后就可能被回收）
    pub fn retain(kind: AssetKind, bytes: &[u8]) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 按种类保存引擎正在引用的缓冲区
///
/// - 模型/物理/姿势各占一个槽位
/// - 表情按名称保存
/// - 动作按实例句柄保存（可同时存在多个）
#[derive(Default)]
pub struct BufferStore {
    model: Option<RetainedBuffer>,
    physics: Option<RetainedBuffer>,
    pose: Option<RetainedBuffer>,
    expressions: HashMap<String, RetainedBuffer>,
    motions: HashMap<MotionHandle, RetainedBuffer>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: AssetKind) -> Option<&mut Option<RetainedBuffer>> {
        match kind {
            AssetKind::Model => Some(&mut self.model),
            AssetKind::Physics => Some(&mut self.physics),
            AssetKind::Pose => Some(&mut self.pose),
            AssetKind::Expression | AssetKind::Motion => None,
        }
    }

    /// 获取单槽位资源
    pub fn slot(&self, kind: AssetKind) -> Option<&RetainedBuffer> {
        match kind {
            AssetKind::Model => self.model.as_ref(),
            AssetKind::Physics => self.physics.as_ref(),
            AssetKind::Pose => self.pose.as_ref(),
            AssetKind::Expression | AssetKind::Motion => None,
        }
    }

    /// 复制字节并交给引擎加载，成功后才替换槽位
    ///
    /// 引擎接受新数据后就不再引用旧数据，此时才释放旧缓冲区；
    /// 引擎拒绝时新缓冲区立即释放，旧槽位保持不变。
    pub fn load_slot<F>(&mut self, kind: AssetKind, bytes: &[u8], load: F) -> Result<()>
    where
        F: FnOnce(&[u8]) -> bool,
    {
        // 表情和动作不走单槽位
        let Some(slot) = self.slot_mut(kind) else {
            return Err(BindingError::AssetRejected(kind));
        };
        let buffer = RetainedBuffer::retain(kind, bytes);
        if !load(buffer.as_slice()) {
            return Err(BindingError::AssetRejected(kind));
        }
        let previous = slot.replace(buffer);
        drop(previous);
        Ok(())
    }

    /// 同 `load_slot`，按表情名称保存
    pub fn load_expression<F>(&mut self, name: &str, bytes: &[u8], load: F) -> Result<()>
    where
        F: FnOnce(&[u8]) -> bool,
    {
        let buffer = RetainedBuffer::retain(AssetKind::Expression, bytes);
        if !load(buffer.as_slice()) {
            return Err(BindingError::AssetRejected(AssetKind::Expression));
        }
        self.expressions.insert(name.to_string(), buffer);
        Ok(())
    }

    /// 登记动作缓冲区（由动作注册表在实例创建成功后调用）
    pub fn adopt_motion(&mut self, handle: MotionHandle, buffer: RetainedBuffer) {
        debug_assert_eq!(buffer.kind(), AssetKind::Motion);
        if self.motions.insert(handle, buffer).is_some() {
            log::warn!("motion buffer for {:?} replaced", handle);
        }
    }

    /// 释放动作缓冲区
    pub fn release_motion(&mut self, handle: MotionHandle) -> bool {
        self.motions.remove(&handle).is_some()
    }

    pub fn has_motion(&self, handle: MotionHandle) -> bool {
        self.motions.contains_key(&handle)
    }

    pub fn motion_count(&self) -> usize {
        self.motions.len()
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }

    /// 当前持有的总字节数
    pub fn total_bytes(&self) -> usize {
        [&self.model, &self.physics, &self.pose]
            .iter()
            .filter_map(|slot| slot.as_ref())
            .map(RetainedBuffer::len)
            .chain(self.expressions.values().map(RetainedBuffer::len))
            .chain(self.motions.values().map(RetainedBuffer::len))
            .sum()
    }
}
