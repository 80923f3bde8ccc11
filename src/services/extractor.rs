//! 文档文本提取服务 - 业务能力层
//!
//! 只负责"把上传的文件变成一段纯文本"，不关心表单状态
//!
//! ## 支持的格式
//! - `.txt`：原样使用
//! - `.docx`：读取 `word/document.xml`，按段落 / 文本块提取
//! - `.pptx`：按压缩包顺序读取 `ppt/slides/slideN.xml`，提取 `<a:t>` 文本
//!
//! `.doc` / `.ppt` 直接拒绝，不读取文件内容

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use tracing::{debug, error};
use zip::ZipArchive;

use crate::error::ExtractError;
use crate::models::document::{file_extension, DocumentKind};

/// docx 正文所在的压缩包条目
const DOCX_DOCUMENT_XML: &str = "word/document.xml";

static SLIDE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide\d+\.xml$").expect("slide path regex"));

static SLIDE_TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>").expect("text run regex"));

/// 根据文件名判断格式
///
/// 旧版格式和未知扩展名在这里就被拒绝，不会读取文件
pub fn detect_kind(file_name: &str) -> Result<DocumentKind, ExtractError> {
    let extension = file_extension(file_name);
    match DocumentKind::from_extension(&extension) {
        Some(kind) if kind.is_legacy() => Err(ExtractError::LegacyFormat { extension }),
        Some(kind) => Ok(kind),
        None => Err(ExtractError::Unsupported { extension }),
    }
}

/// 从内存中的文件内容提取文本
pub fn extract_document(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let kind = detect_kind(file_name)?;
    extract_bytes(kind, bytes)
}

/// 读取文件并提取文本
///
/// 读文件走 tokio::fs，解压和解析放到 blocking 线程池，顺序为 读取 → 解压 → 解析 → 校验
pub async fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = detect_kind(&file_name)?;

    debug!("读取文件: {}", path.display());
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!("读取文件 {} 失败: {}", path.display(), e);
        ExtractError::unreadable(kind.extension(), e)
    })?;

    tokio::task::spawn_blocking(move || extract_bytes(kind, &bytes))
        .await
        .map_err(|e| {
            error!("文档解析任务异常退出: {}", e);
            ExtractError::unreadable(kind.extension(), e)
        })?
}

/// 按格式提取文本
pub fn extract_bytes(kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractError> {
    let result = match kind {
        DocumentKind::PlainText => Ok(decode_plain_text(bytes)),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Pptx => extract_pptx(bytes),
        DocumentKind::LegacyDoc | DocumentKind::LegacyPpt => Err(ExtractError::LegacyFormat {
            extension: kind.extension().to_string(),
        }),
    };

    match &result {
        Ok(text) => debug!("{} 提取完成，共 {} 个字符", kind, text.chars().count()),
        Err(ExtractError::Unreadable { detail, .. }) => {
            error!("处理 {} 文件失败: {}", kind, detail)
        }
        Err(e) => debug!("{} 提取结果不可用: {}", kind, e),
    }

    result
}

/// 纯文本按 UTF-8 解码，非法字节替换为 U+FFFD，去掉 BOM
fn decode_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn open_archive<'a>(
    bytes: &'a [u8],
    extension: &str,
) -> Result<ZipArchive<Cursor<&'a [u8]>>, ExtractError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::unreadable(extension, e))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes, "docx")?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_DOCUMENT_XML)
        .map_err(|e| ExtractError::unreadable("docx", e))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::unreadable("docx", e))?;

    let text = docx_xml_to_text(&xml).map_err(|e| ExtractError::unreadable("docx", e))?;

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    Ok(text)
}

/// 把 WordprocessingML 转成纯文本
///
/// - 段落内的 `<w:t>` 直接拼接
/// - `<w:tab/>` → `\t`，`<w:br/>` / `<w:cr/>` → `\n`
/// - 每个段落后面追加一个空行
/// - 段落属性 `<w:pPr>` 中的制表位忽略
fn docx_xml_to_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut in_paragraph_props = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:pPr" => in_paragraph_props = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:pPr" => in_paragraph_props = false,
                b"w:p" => {
                    text.push_str(&paragraph);
                    text.push_str("\n\n");
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Empty(e) if !in_paragraph_props => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(t) if in_text => paragraph.push_str(&t.unescape()?),
            Event::CData(c) if in_text => paragraph.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }

    // 文档结构不完整时，保留最后一段
    text.push_str(&paragraph);
    Ok(text)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes, "pptx")?;

    let mut slides = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ExtractError::unreadable("pptx", e))?;
        if !SLIDE_PATH.is_match(entry.name()) {
            continue;
        }

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError::unreadable("pptx", e))?;
        debug!("读取幻灯片: {}", entry.name());
        slides.push(slide_xml_to_text(&xml));
    }

    let full_text = slides.join("\n\n");
    if full_text.trim().is_empty() {
        return Err(ExtractError::NoSlideText);
    }
    Ok(full_text)
}

/// 提取单页幻灯片中的文本块，用单个空格连接
fn slide_xml_to_text(xml: &str) -> String {
    SLIDE_TEXT_RUN
        .captures_iter(xml)
        .map(|caps| {
            let raw = &caps[1];
            let run = quick_xml::escape::unescape(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            run.trim().to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        build_zip(&[("[Content_Types].xml", "<Types/>"), (DOCX_DOCUMENT_XML, &xml)])
    }

    fn slide(runs: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r>{}</a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            runs
        )
    }

    #[test]
    fn test_plain_text_round_trip() {
        let content = "Photosynthesis converts light into chemical energy.\n\n  Indented line\twith tab\r\n";
        let text = extract_document("notes.txt", content.as_bytes()).unwrap();
        assert_eq!(text, content);
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let text = extract_document("bom.TXT", b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_legacy_doc_rejected_without_reading() {
        // 内容不是合法文件也没关系，根本不会读取
        let err = extract_document("notes.doc", b"\xD0\xCF\x11\xE0").unwrap_err();
        assert_eq!(
            err,
            ExtractError::LegacyFormat {
                extension: "doc".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "Legacy .doc files are not supported. Please save it as a .docx file and try again."
        );
    }

    #[test]
    fn test_legacy_ppt_message() {
        let err = detect_kind("slides.PPT").unwrap_err();
        assert!(err.to_string().contains("save it as a .pptx file"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract_document("paper.pdf", b"%PDF").unwrap_err();
        assert_eq!(
            err.to_string(),
            "File type \".pdf\" is not supported. Please upload a .txt, .docx, or .pptx file."
        );
    }

    #[test]
    fn test_pptx_runs_joined_with_single_space() {
        let bytes = build_zip(&[
            ("ppt/presentation.xml", "<p:presentation/>"),
            ("ppt/slides/slide1.xml", &slide("<a:t>Cell</a:t><a:t>Division</a:t>")),
        ]);
        let text = extract_document("biology.pptx", &bytes).unwrap();
        assert!(text.contains("Cell Division"));
    }

    #[test]
    fn test_pptx_slides_in_archive_order() {
        let bytes = build_zip(&[
            ("ppt/slides/slide2.xml", &slide("<a:t>Second</a:t>")),
            ("ppt/slides/_rels/slide2.xml.rels", "<a:t>ignored</a:t>"),
            ("ppt/slides/slide1.xml", &slide(r#"<a:t xml:space="preserve"> First &amp; foremost </a:t>"#)),
        ]);
        let text = extract_document("deck.pptx", &bytes).unwrap();
        assert_eq!(text, "Second\n\nFirst & foremost");
    }

    #[test]
    fn test_pptx_without_text_is_soft_error() {
        let bytes = build_zip(&[("ppt/slides/slide1.xml", &slide(""))]);
        let err = extract_document("images.pptx", &bytes).unwrap_err();
        assert_eq!(err, ExtractError::NoSlideText);
        assert!(err.is_soft());
    }

    #[test]
    fn test_docx_paragraphs() {
        let bytes = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Roman</w:t></w:r><w:r><w:t xml:space="preserve"> Empire</w:t></w:r></w:p><w:p><w:r><w:t>A</w:t><w:tab/><w:t>B &lt; C</w:t><w:br/><w:t>D</w:t></w:r></w:p>"#,
        );
        let text = extract_document("history.docx", &bytes).unwrap();
        assert_eq!(text, "Roman Empire\n\nA\tB < C\nD\n\n");
    }

    #[test]
    fn test_docx_whitespace_only_is_soft_error() {
        let bytes = docx_with_body(r#"<w:p><w:r><w:t xml:space="preserve">   </w:t></w:r></w:p><w:p/>"#);
        let err = extract_document("blank.docx", &bytes).unwrap_err();
        assert_eq!(err, ExtractError::EmptyDocument);
        assert!(err.is_soft());
    }

    #[test]
    fn test_corrupt_archive_is_hard_error() {
        let err = extract_document("broken.docx", b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
        assert!(!err.is_soft());
        assert_eq!(
            err.to_string(),
            "Could not read the .docx file. It might be corrupted or password-protected."
        );
    }

    #[test]
    fn test_docx_missing_document_xml() {
        let bytes = build_zip(&[("word/styles.xml", "<w:styles/>")]);
        let err = extract_document("odd.docx", &bytes).unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_extract_file_reads_from_disk() {
        let dir = std::env::temp_dir().join(format!("mcq_quiz_extract_{}", rand::random::<u64>()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("topic.txt");
        tokio::fs::write(&path, "Mitochondria").await.unwrap();

        let text = extract_file(&path).await.unwrap();
        assert_eq!(text, "Mitochondria");

        let missing = extract_file(&dir.join("missing.docx")).await.unwrap_err();
        assert!(matches!(missing, ExtractError::Unreadable { .. }));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
