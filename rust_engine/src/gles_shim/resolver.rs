//! wgl / opengl32.dll 符号来源

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use super::ProcResolver;

#[link(name = "opengl32")]
extern "system" {
    fn wglGetProcAddress(name: *const c_char) -> *const c_void;
}

extern "system" {
    fn GetModuleHandleA(name: *const c_char) -> *mut c_void;
    fn GetProcAddress(module: *mut c_void, name: *const c_char) -> *const c_void;
}

pub struct WglResolver {
    opengl32: *mut c_void,
}

impl WglResolver {
    /// opengl32.dll 尚未加载时返回 `None`
    pub fn new() -> Option<Self> {
        let opengl32 = unsafe { GetModuleHandleA(b"opengl32.dll\0".as_ptr().cast()) };
        if opengl32.is_null() {
            None
        } else {
            Some(Self { opengl32 })
        }
    }
}

impl ProcResolver for WglResolver {
    fn extension(&self, name: &str) -> *const c_void {
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };
        let ptr = unsafe { wglGetProcAddress(name.as_ptr()) };
        // 部分驱动用 1/2/3/-1 表示失败
        match ptr as isize {
            -1 | 0..=3 => std::ptr::null(),
            _ => ptr,
        }
    }

    fn core(&self, name: &str) -> *const c_void {
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };
        unsafe { GetProcAddress(self.opengl32, name.as_ptr()) }
    }
}
