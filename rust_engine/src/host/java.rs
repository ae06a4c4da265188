//! JVM 链接与回调

use jni::objects::{GlobalRef, JByteArray, JObject, JValue};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::OnceCell;

use crate::Result;
use super::HostLink;

/// 资源加载类（着色器等由 Java 侧从 jar 中读取）
const LIBRARY_LOADER_CLASS: &str = "dev/eatgrapes/live2d/LibraryLoader";

/// JNI_OnLoad 时保存的虚拟机
static JAVA_VM: OnceCell<JavaVM> = OnceCell::new();

/// 保存虚拟机，只有第一次生效
pub fn set_java_vm(vm: JavaVM) -> bool {
    JAVA_VM.set(vm).is_ok()
}

pub fn java_vm() -> Option<&'static JavaVM> {
    JAVA_VM.get()
}

/// 在宿主线程上下文中执行闭包
///
/// 当前线程未附加时临时附加，闭包返回后分离；已附加的线程保持不变。
/// 闭包留下的 Java 异常会被清除，不会传播到调用方的 Java 栈。
pub fn run_on_host<R, F>(vm: &JavaVM, f: F) -> Result<R>
where
    F: FnOnce(&mut JNIEnv) -> jni::errors::Result<R>,
{
    let mut env = vm.attach_current_thread()?;
    let result = f(&mut env);
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
    Ok(result?)
}

/// 通过 `LibraryLoader.loadResource` 读取资源，Java 返回 null 时为 `None`
pub fn load_resource(vm: &JavaVM, path: &str) -> Result<Option<Vec<u8>>> {
    run_on_host(vm, |env| {
        let jpath = env.new_string(path)?;
        let obj = env
            .call_static_method(
                LIBRARY_LOADER_CLASS,
                "loadResource",
                "(Ljava/lang/String;)[B",
                &[JValue::Object(&jpath)],
            )?
            .l()?;
        env.delete_local_ref(jpath)?;
        if obj.is_null() {
            return Ok(None);
        }
        let array = JByteArray::from(obj);
        let bytes = env.convert_byte_array(&array)?;
        env.delete_local_ref(array)?;
        Ok(Some(bytes))
    })
}

/// 指向 Java `CubismUserModel` 对象的长期引用
///
/// 必须在 Java 构造函数里 `_ptr` 赋值之后通过 `linkNative` 建立（两段式初始化）。
pub struct JavaHostLink {
    vm: JavaVM,
    peer: GlobalRef,
}

impl JavaHostLink {
    pub fn new(env: &mut JNIEnv, peer: &JObject) -> Result<Self> {
        let vm = env.get_java_vm()?;
        let peer = env.new_global_ref(peer)?;
        Ok(Self { vm, peer })
    }
}

impl HostLink for JavaHostLink {
    fn motion_finished(&self, name: &str) -> Result<()> {
        run_on_host(&self.vm, |env| {
            let jname = env.new_string(name)?;
            env.call_method(
                &self.peer,
                "onMotionFinished",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&jname)],
            )?;
            env.delete_local_ref(jname)
        })
    }
}
