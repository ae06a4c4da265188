//! 资源缓冲区管理
//!
//! 引擎解析 moc3/json 时直接引用输入内存而不复制，
//! 所以 JNI 传入的字节必须先复制一份，并保持到引擎不再使用为止。

mod buffer_store;
mod validate;

pub use buffer_store::{BufferStore, RetainedBuffer};
pub use validate::{validate, validate_motion, MotionMeta, MOC3_HEADER_SIZE, MOC3_MAGIC};
#[cfg(test)]
pub(crate) use validate::fake_moc3;

use std::fmt;

/// 资源种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// .moc3 模型
    Model,
    /// .physics3.json
    Physics,
    /// .pose3.json
    Pose,
    /// .exp3.json
    Expression,
    /// .motion3.json
    Motion,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Model => "moc3",
            AssetKind::Physics => "physics3.json",
            AssetKind::Pose => "pose3.json",
            AssetKind::Expression => "exp3.json",
            AssetKind::Motion => "motion3.json",
        };
        f.write_str(name)
    }
}
