//! 资源预校验
//!
//! 在交给引擎前先做廉价的格式检查，明显损坏的数据直接拒绝，
//! 引擎自身的解析失败仍由调用方处理。

use serde::Deserialize;
use serde_json::Value;

use crate::{BindingError, Result};
use super::AssetKind;

/// moc3 文件头魔数
pub const MOC3_MAGIC: &[u8; 4] = b"MOC3";
/// moc3 文件头长度（魔数 + 版本 + 字节序 + 填充）
pub const MOC3_HEADER_SIZE: usize = 64;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// motion3.json 的 Meta 段（只取绑定层关心的字段）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionMeta {
    pub duration: f32,
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(rename = "Loop", default)]
    pub looping: bool,
    #[serde(default)]
    pub curve_count: u32,
}

fn default_fps() -> f32 {
    30.0
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MotionJson {
    version: u32,
    meta: MotionMeta,
    curves: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PhysicsJson {
    version: u32,
    physics_settings: Vec<Value>,
}

/// pose3.json / exp3.json 都以 Type 字段标识
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TypedJson {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    groups: Option<Vec<Value>>,
    #[serde(default)]
    parameters: Option<Vec<Value>>,
}

/// 去掉 UTF-8 BOM（编辑器导出的 json 常带）
fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn parse<'a, T: Deserialize<'a>>(kind: AssetKind, bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(strip_bom(bytes)).map_err(|e| {
        log::warn!("{} rejected: {}", kind, e);
        BindingError::AssetRejected(kind)
    })
}

/// 校验 moc3 文件头
fn validate_moc3(bytes: &[u8]) -> Result<()> {
    if bytes.len() < MOC3_HEADER_SIZE || &bytes[..4] != MOC3_MAGIC {
        log::warn!("moc3 rejected: bad header ({} bytes)", bytes.len());
        return Err(BindingError::AssetRejected(AssetKind::Model));
    }
    // 第 5 字节是 moc 版本，0 表示无效
    if bytes[4] == 0 {
        log::warn!("moc3 rejected: version 0");
        return Err(BindingError::AssetRejected(AssetKind::Model));
    }
    Ok(())
}

/// 按种类校验资源字节
pub fn validate(kind: AssetKind, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(BindingError::AssetRejected(kind));
    }
    match kind {
        AssetKind::Model => validate_moc3(bytes),
        AssetKind::Motion => validate_motion(bytes).map(|_| ()),
        AssetKind::Physics => {
            let json: PhysicsJson = parse(kind, bytes)?;
            if json.version < 3 || json.physics_settings.is_empty() {
                return Err(BindingError::AssetRejected(kind));
            }
            Ok(())
        }
        AssetKind::Pose => {
            let json: TypedJson = parse(kind, bytes)?;
            if json.kind != "Live2D Pose" || json.groups.is_none() {
                return Err(BindingError::AssetRejected(kind));
            }
            Ok(())
        }
        AssetKind::Expression => {
            let json: TypedJson = parse(kind, bytes)?;
            if json.kind != "Live2D Expression" || json.parameters.is_none() {
                return Err(BindingError::AssetRejected(kind));
            }
            Ok(())
        }
    }
}

/// 校验 motion3.json 并返回 Meta
pub fn validate_motion(bytes: &[u8]) -> Result<MotionMeta> {
    let json: MotionJson = parse(AssetKind::Motion, bytes)?;
    if json.version < 3 || json.meta.duration < 0.0 || json.meta.fps <= 0.0 {
        return Err(BindingError::AssetRejected(AssetKind::Motion));
    }
    if json.meta.curve_count != 0 && json.meta.curve_count as usize != json.curves.len() {
        log::warn!(
            "motion3.json CurveCount {} != {} curves",
            json.meta.curve_count,
            json.curves.len()
        );
    }
    Ok(json.meta)
}

#[cfg(test)]
pub(crate) fn fake_moc3() -> Vec<u8> {
    let mut bytes = vec![0u8; MOC3_HEADER_SIZE + 16];
    bytes[..4].copy_from_slice(MOC3_MAGIC);
    bytes[4] = 3;
    bytes
}
