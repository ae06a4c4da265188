//! 桌面 OpenGL 上的 GLES2 兼容层（仅 Windows 导出符号）
//!
//! opengl32.dll 只导出 GL 1.1，渲染器需要的 GLES2 入口要在运行时解析。
//! 每个入口按顺序查找：
//! 1. `wglGetProcAddress(name)`
//! 2. 帧缓冲类入口再试 `nameEXT`，`glActiveTexture` 再试 `nameARB`
//! 3. `GetProcAddress(opengl32.dll, name)`
//!
//! 未解析的入口保持为空，调用时不做任何事并返回默认值
//! （创建类和 `glCheckFramebufferStatus` 返回 0，位置查询返回 -1）。

#[cfg(windows)]
mod resolver;

use std::ffi::c_void;

use once_cell::sync::OnceCell;

pub type GLenum = u32;
pub type GLuint = u32;
pub type GLint = i32;
pub type GLsizei = i32;
pub type GLboolean = u8;
pub type GLfloat = f32;
pub type GLchar = std::os::raw::c_char;

/// 符号来源
pub trait ProcResolver {
    /// 扩展入口（`wglGetProcAddress`），找不到时返回空指针
    fn extension(&self, name: &str) -> *const c_void;
    /// 核心库导出的入口，找不到时返回空指针
    fn core(&self, name: &str) -> *const c_void;
}

/// 按固定顺序解析一个入口
fn resolve(resolver: &dyn ProcResolver, name: &str, fallback: &str) -> *const c_void {
    let ptr = resolver.extension(name);
    if !ptr.is_null() {
        return ptr;
    }
    if !fallback.is_empty() {
        let ptr = resolver.extension(&format!("{}{}", name, fallback));
        if !ptr.is_null() {
            return ptr;
        }
    }
    resolver.core(name)
}

macro_rules! gl_procs {
    ($(
        $name:ident [$fallback:literal] ( $($arg:ident : $ty:ty),* ) -> $ret:ty = $default:expr;
    )*) => {
        /// 解析后的入口表
        #[allow(non_snake_case)]
        #[derive(Clone, Copy)]
        pub struct GlProcs {
            $( pub $name: Option<unsafe extern "system" fn($($ty),*) -> $ret>, )*
        }

        #[allow(non_snake_case)]
        impl GlProcs {
            /// 全部未解析
            pub const EMPTY: GlProcs = GlProcs { $( $name: None, )* };

            pub const NAMES: &'static [&'static str] = &[$( stringify!($name), )*];

            /// 解析所有入口，返回入口表和未解析的名字
            pub fn load(resolver: &dyn ProcResolver) -> (Self, Vec<&'static str>) {
                let mut unresolved = Vec::new();
                let procs = GlProcs {
                    $( $name: {
                        let ptr = resolve(resolver, stringify!($name), $fallback);
                        if ptr.is_null() {
                            unresolved.push(stringify!($name));
                            None
                        } else {
                            // SAFETY: 同名 GL 入口的签名由 GL 规范固定
                            Some(unsafe {
                                std::mem::transmute::<*const c_void, unsafe extern "system" fn($($ty),*) -> $ret>(ptr)
                            })
                        }
                    }, )*
                };
                (procs, unresolved)
            }

            $(
                /// # Safety
                /// 需要当前线程有 GL 上下文，指针参数满足 GL 规范的要求
                pub unsafe fn $name(&self, $($arg: $ty),*) -> $ret {
                    match self.$name {
                        Some(f) => f($($arg),*),
                        None => $default,
                    }
                }
            )*
        }

        /// 渲染器链接到的 C 符号
        #[cfg(windows)]
        #[allow(non_snake_case)]
        pub mod exports {
            use super::*;

            $(
                /// # Safety
                /// 同 GL 规范
                #[no_mangle]
                pub unsafe extern "system" fn $name($($arg: $ty),*) -> $ret {
                    super::procs().$name($($arg),*)
                }
            )*
        }
    };
}

gl_procs! {
    glGenFramebuffers["EXT"](n: GLsizei, framebuffers: *mut GLuint) -> () = ();
    glBindFramebuffer["EXT"](target: GLenum, framebuffer: GLuint) -> () = ();
    glFramebufferTexture2D["EXT"](target: GLenum, attachment: GLenum, textarget: GLenum, texture: GLuint, level: GLint) -> () = ();
    glDeleteFramebuffers["EXT"](n: GLsizei, framebuffers: *const GLuint) -> () = ();
    glCheckFramebufferStatus["EXT"](target: GLenum) -> GLenum = 0;
    glActiveTexture["ARB"](texture: GLenum) -> () = ();
    glBlendFuncSeparate[""](src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum) -> () = ();
    glCreateShader[""](kind: GLenum) -> GLuint = 0;
    glShaderSource[""](shader: GLuint, count: GLsizei, string: *const *const GLchar, length: *const GLint) -> () = ();
    glCompileShader[""](shader: GLuint) -> () = ();
    glGetShaderiv[""](shader: GLuint, pname: GLenum, params: *mut GLint) -> () = ();
    glGetShaderInfoLog[""](shader: GLuint, buf_size: GLsizei, length: *mut GLsizei, info_log: *mut GLchar) -> () = ();
    glDeleteShader[""](shader: GLuint) -> () = ();
    glCreateProgram[""]() -> GLuint = 0;
    glAttachShader[""](program: GLuint, shader: GLuint) -> () = ();
    glDetachShader[""](program: GLuint, shader: GLuint) -> () = ();
    glLinkProgram[""](program: GLuint) -> () = ();
    glGetProgramiv[""](program: GLuint, pname: GLenum, params: *mut GLint) -> () = ();
    glGetProgramInfoLog[""](program: GLuint, buf_size: GLsizei, length: *mut GLsizei, info_log: *mut GLchar) -> () = ();
    glUseProgram[""](program: GLuint) -> () = ();
    glDeleteProgram[""](program: GLuint) -> () = ();
    glGetAttribLocation[""](program: GLuint, name: *const GLchar) -> GLint = -1;
    glGetUniformLocation[""](program: GLuint, name: *const GLchar) -> GLint = -1;
    glUniform1i[""](location: GLint, v0: GLint) -> () = ();
    glUniformMatrix4fv[""](location: GLint, count: GLsizei, transpose: GLboolean, value: *const GLfloat) -> () = ();
    glUniform4f[""](location: GLint, v0: GLfloat, v1: GLfloat, v2: GLfloat, v3: GLfloat) -> () = ();
    glEnableVertexAttribArray[""](index: GLuint) -> () = ();
    glVertexAttribPointer[""](index: GLuint, size: GLint, kind: GLenum, normalized: GLboolean, stride: GLsizei, pointer: *const c_void) -> () = ();
    glDisableVertexAttribArray[""](index: GLuint) -> () = ();
    glGetVertexAttribiv[""](index: GLuint, pname: GLenum, params: *mut GLint) -> () = ();
    glValidateProgram[""](program: GLuint) -> () = ();
    glBindBuffer[""](target: GLenum, buffer: GLuint) -> () = ();
}

struct Shim {
    procs: GlProcs,
    unresolved: Vec<&'static str>,
}

static SHIM: OnceCell<Shim> = OnceCell::new();
static EMPTY: GlProcs = GlProcs::EMPTY;

/// 当前入口表，未初始化时全部为空
pub fn procs() -> &'static GlProcs {
    SHIM.get().map(|shim| &shim.procs).unwrap_or(&EMPTY)
}

/// 用给定来源初始化，只生效一次
pub fn init_with(resolver: &dyn ProcResolver) -> bool {
    let mut first = false;
    SHIM.get_or_init(|| {
        first = true;
        let (procs, unresolved) = GlProcs::load(resolver);
        Shim { procs, unresolved }
    });
    first
}

/// 从 opengl32.dll 初始化
#[cfg(windows)]
pub fn init() -> bool {
    match resolver::WglResolver::new() {
        Some(resolver) => init_with(&resolver),
        None => false,
    }
}

pub fn is_initialized() -> bool {
    SHIM.get().is_some()
}

pub fn unresolved() -> &'static [&'static str] {
    SHIM.get().map(|shim| shim.unresolved.as_slice()).unwrap_or(&[])
}

/// 输出解析结果
///
/// 初始化发生在 JNI_OnLoad，那时还没有日志器，等日志器装好后再调用。
pub fn report() {
    if !cfg!(windows) {
        return;
    }
    if !is_initialized() {
        log::error!("GLES2 shim not initialized: opengl32.dll not loaded");
        return;
    }
    for name in unresolved() {
        log::warn!("Failed to load function: {}", name);
    }
    log::info!(
        "GLES2 shim: {}/{} functions resolved",
        GlProcs::NAMES.len() - unresolved().len(),
        GlProcs::NAMES.len()
    );
}
