//! 元数据提取 (EXIF / XMP / IPTC / C2PA)
//!
//! 把原始文件字节整理成评分器需要的 `MetadataTagSet`。
//! EXIF 交给 kamadak-exif；XMP 包在字节流里定位后用 quick-xml 解析；
//! IPTC 与 C2PA 只做存在性和文本扫描。

use std::io::Cursor;

use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::warn;

/// C2PA JUMBF 标签只在文件头部附近查找
const C2PA_SCAN_WINDOW: usize = 64 * 1024;
/// 找到标签后收集多少字节的可打印文本
const C2PA_TEXT_WINDOW: usize = 16 * 1024;
/// `strings` 风格的最短可打印片段
const MIN_PRINTABLE_RUN: usize = 4;

const XMP_OPEN: &[u8] = b"<x:xmpmeta";
const XMP_CLOSE: &[u8] = b"</x:xmpmeta>";
const PHOTOSHOP_IRB: &[u8] = b"Photoshop 3.0\0";
const IPTC_RESOURCE: &[u8] = b"8BIM\x04\x04";
/// 带这些前缀的 XMP 名称说明文件携带 IPTC 字段
const IPTC_XMP_PREFIXES: [&[u8]; 2] = [b"Iptc4xmpCore:", b"photoshop:"];

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("EXIF 解析失败: {0}")]
    Exif(#[from] exif::Error),

    #[error("XMP 解析失败: {0}")]
    Xmp(String),
}

/// 五个相机硬件字段是否存在
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraFields {
    pub make: bool,
    pub model: bool,
    pub iso: bool,
    pub exposure_time: bool,
    pub lens_model: bool,
}

impl CameraFields {
    pub fn count(&self) -> usize {
        [
            self.make,
            self.model,
            self.iso,
            self.exposure_time,
            self.lens_model,
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// 内嵌的密码学溯源声明 (C2PA manifest)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceClaim {
    pub claim_signature_valid: bool,
    pub data_hash_valid: bool,
}

impl ProvenanceClaim {
    /// 签名和数据哈希都被声明为有效
    pub fn is_verified(&self) -> bool {
        self.claim_signature_valid && self.data_hash_valid
    }
}

/// 一次请求的元数据快照，提取后不再修改
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTagSet {
    pub has_exif: bool,
    pub has_xmp: bool,
    pub has_iptc: bool,
    pub camera: CameraFields,
    /// XMP `Iptc4xmpExt:DigitalSourceType`，通常是 IPTC newscodes URL
    pub digital_source_type: Option<String>,
    /// XMP `xmp:CreatorTool`
    pub creator_tool: Option<String>,
    pub provenance: Option<ProvenanceClaim>,
    /// 全部文本型元数据拼接，用于关键词子串扫描
    pub text: String,
}

impl MetadataTagSet {
    /// EXIF 之外是否读到了任何内嵌块
    fn has_embedded(&self) -> bool {
        self.has_xmp || self.has_iptc || self.provenance.is_some()
    }

    fn push_text(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);
    }
}

/// 从原始文件字节提取元数据
///
/// 没有 EXIF 不算失败。EXIF 损坏时 `has_exif` 保持 false，继续扫描
/// XMP / IPTC / C2PA；只有什么都读不出来时才返回错误，
/// 由调用方换成低可信度的兜底结果。XMP 结构损坏直接返回错误。
pub fn extract(bytes: &[u8]) -> Result<MetadataTagSet, MetadataError> {
    let mut tags = MetadataTagSet::default();

    let exif_result = read_exif(bytes, &mut tags);
    scan_embedded(bytes, &mut tags)?;

    if let Err(e) = exif_result {
        if !tags.has_embedded() {
            return Err(e);
        }
        warn!("⚠️ EXIF 解析失败，仅使用其它元数据块: {}", e);
    }
    Ok(tags)
}

/// EXIF 之外的内嵌块：XMP 包、IPTC 资源块、C2PA 声明
fn scan_embedded(bytes: &[u8], tags: &mut MetadataTagSet) -> Result<(), MetadataError> {
    if let Some(packet) = find_xmp_packet(bytes) {
        tags.has_xmp = true;
        read_xmp(packet, tags)?;
    }

    if find(bytes, PHOTOSHOP_IRB).is_some() && find(bytes, IPTC_RESOURCE).is_some() {
        tags.has_iptc = true;
    }

    tags.provenance = scan_provenance(bytes, tags);
    Ok(())
}

fn read_exif(bytes: &[u8], tags: &mut MetadataTagSet) -> Result<(), MetadataError> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    tags.has_exif = true;

    let present = |tag: exif::Tag| {
        exif.get_field(tag, exif::In::PRIMARY)
            .is_some_and(has_value)
    };
    tags.camera = CameraFields {
        make: present(exif::Tag::Make),
        model: present(exif::Tag::Model),
        iso: present(exif::Tag::PhotographicSensitivity),
        exposure_time: present(exif::Tag::ExposureTime),
        lens_model: present(exif::Tag::LensModel),
    };

    let mut text = String::new();
    for field in exif.fields() {
        text.push_str(&format!(
            "{} {} ",
            field.tag,
            field.display_value().with_unit(&exif)
        ));
    }
    tags.push_text(text.trim_end());

    Ok(())
}

fn has_value(field: &exif::Field) -> bool {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .iter()
            .any(|part| part.iter().any(|b| *b != 0 && !b.is_ascii_whitespace())),
        _ => true,
    }
}

fn find_xmp_packet(bytes: &[u8]) -> Option<&[u8]> {
    let start = find(bytes, XMP_OPEN)?;
    let end = find(&bytes[start..], XMP_CLOSE)? + start + XMP_CLOSE.len();
    Some(&bytes[start..end])
}

#[derive(Clone, Copy)]
enum XmpTarget {
    DigitalSourceType,
    CreatorTool,
}

fn xmp_target(local_name: &[u8]) -> Option<XmpTarget> {
    match local_name {
        b"DigitalSourceType" => Some(XmpTarget::DigitalSourceType),
        b"CreatorTool" => Some(XmpTarget::CreatorTool),
        _ => None,
    }
}

fn read_xmp(packet: &[u8], tags: &mut MetadataTagSet) -> Result<(), MetadataError> {
    let mut reader = quick_xml::Reader::from_reader(packet);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut pending: Option<XmpTarget> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                inspect_element(&e, tags)?;
                pending = xmp_target(e.local_name().as_ref());
            }
            Ok(Event::Empty(e)) => {
                inspect_element(&e, tags)?;
                pending = None;
            }
            Ok(Event::Text(te)) => {
                if let Some(target) = pending.take() {
                    let value = te
                        .unescape()
                        .map_err(|e| MetadataError::Xmp(e.to_string()))?;
                    assign(tags, target, value.trim());
                }
            }
            Ok(Event::End(_)) => pending = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(MetadataError::Xmp(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    tags.push_text(&String::from_utf8_lossy(packet));
    Ok(())
}

/// 属性形式: `Iptc4xmpExt:DigitalSourceType="..."` 或
/// `<Iptc4xmpExt:DigitalSourceType rdf:resource="..."/>`
fn inspect_element(e: &BytesStart<'_>, tags: &mut MetadataTagSet) -> Result<(), MetadataError> {
    let element_target = xmp_target(e.local_name().as_ref());

    if is_iptc_name(e.name().as_ref()) {
        tags.has_iptc = true;
    }

    for attr in e.attributes() {
        let attr = attr.map_err(|e| MetadataError::Xmp(e.to_string()))?;
        let key = attr.key.local_name();
        let target = match (xmp_target(key.as_ref()), key.as_ref()) {
            (Some(target), _) => Some(target),
            (None, b"resource") => element_target,
            _ => None,
        };
        if is_iptc_name(attr.key.as_ref()) {
            tags.has_iptc = true;
        }
        if let Some(target) = target {
            let value = attr
                .unescape_value()
                .map_err(|e| MetadataError::Xmp(e.to_string()))?;
            assign(tags, target, value.trim());
        }
    }
    Ok(())
}

fn is_iptc_name(qualified: &[u8]) -> bool {
    IPTC_XMP_PREFIXES
        .iter()
        .any(|prefix| qualified.starts_with(prefix))
}

fn assign(tags: &mut MetadataTagSet, target: XmpTarget, value: &str) {
    if value.is_empty() {
        return;
    }
    match target {
        XmpTarget::DigitalSourceType => tags.digital_source_type = Some(value.to_string()),
        XmpTarget::CreatorTool => tags.creator_tool = Some(value.to_string()),
    }
}

/// 查找 C2PA 声明并判断签名 / 哈希有效性
///
/// 有效性只看文本断言 ("claim signature valid" / "data hash valid")，
/// 不在这里重新验签。
fn scan_provenance(bytes: &[u8], tags: &mut MetadataTagSet) -> Option<ProvenanceClaim> {
    let head = &bytes[..bytes.len().min(C2PA_SCAN_WINDOW)];
    let label = find(head, b"c2pa");

    if let Some(pos) = label {
        let end = (pos + C2PA_TEXT_WINDOW).min(bytes.len());
        let text = printable_runs(&bytes[pos..end]);
        tags.push_text(&text);
    }

    let haystack = tags.text.to_lowercase();
    let creator_flag = tags
        .creator_tool
        .as_deref()
        .is_some_and(mentions_ai);

    if label.is_none() && !creator_flag && !haystack.contains("c2pa") {
        return None;
    }

    Some(ProvenanceClaim {
        claim_signature_valid: haystack.contains("claim signature valid"),
        data_hash_valid: haystack.contains("data hash valid"),
    })
}

/// "AI" 作为独立单词出现，避免命中 PAINT / MAIN 之类
fn mentions_ai(tool: &str) -> bool {
    tool.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == "AI")
}

fn printable_runs(bytes: &[u8]) -> String {
    bytes
        .split(|b| !(b.is_ascii_graphic() || *b == b' '))
        .filter(|run| run.len() >= MIN_PRINTABLE_RUN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
