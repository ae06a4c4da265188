//! 宿主（JVM）侧能力
//!
//! 所有回调 Java 的地方都经过 `run_on_host`，
//! 线程附加/分离只在这里处理一次。

mod java;

pub use java::{java_vm, load_resource, run_on_host, set_java_vm, JavaHostLink};

use crate::Result;

/// 通知宿主对象的能力
pub trait HostLink: Send + Sync {
    /// 动作播放结束（已释放缓冲区和句柄之后才调用）
    fn motion_finished(&self, name: &str) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::HostLink;
    use crate::Result;

    /// 记录收到的通知，可选地在通知时执行回调（模拟宿主重入）
    #[derive(Default)]
    pub struct RecordingHost {
        pub names: Mutex<Vec<String>>,
        pub on_notify: Option<Box<dyn Fn(&str) + Send + Sync>>,
    }

    impl RecordingHost {
        pub fn names(&self) -> Vec<String> {
            self.names.lock().unwrap().clone()
        }
    }

    impl HostLink for RecordingHost {
        fn motion_finished(&self, name: &str) -> Result<()> {
            self.names.lock().unwrap().push(name.to_string());
            if let Some(hook) = &self.on_notify {
                hook(name);
            }
            Ok(())
        }
    }
}
