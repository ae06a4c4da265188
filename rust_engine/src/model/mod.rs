//! 用户模型运行时管理

pub mod config;
mod cycle;
mod drag;
mod user_model;

pub use config::{get_config, reset_config, set_config, DragConfig};
pub use cycle::{run_cycle, CycleReport};
pub use drag::{drag_offsets, DragFollow, DragParams, TargetPoint};
pub use user_model::UserModel;
