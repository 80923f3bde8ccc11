/// 上传文档的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// 纯文本
    PlainText,
    /// Word（zip + XML）
    Docx,
    /// PowerPoint（zip + XML）
    Pptx,
    /// 旧版 Word 二进制格式
    LegacyDoc,
    /// 旧版 PowerPoint 二进制格式
    LegacyPpt,
}

/// 扩展名（小写）→ 文档格式
static EXTENSIONS: phf::Map<&'static str, DocumentKind> = phf::phf_map! {
    "txt" => DocumentKind::PlainText,
    "docx" => DocumentKind::Docx,
    "pptx" => DocumentKind::Pptx,
    "doc" => DocumentKind::LegacyDoc,
    "ppt" => DocumentKind::LegacyPpt,
};

impl DocumentKind {
    /// 从扩展名解析格式（不区分大小写）
    pub fn from_extension(extension: &str) -> Option<Self> {
        EXTENSIONS.get(extension.to_lowercase().as_str()).copied()
    }

    /// 标准扩展名
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::PlainText => "txt",
            DocumentKind::Docx => "docx",
            DocumentKind::Pptx => "pptx",
            DocumentKind::LegacyDoc => "doc",
            DocumentKind::LegacyPpt => "ppt",
        }
    }

    /// 是否为不支持的旧版二进制格式
    pub fn is_legacy(self) -> bool {
        matches!(self, DocumentKind::LegacyDoc | DocumentKind::LegacyPpt)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// 取文件名最后一个 `.` 之后的部分并转小写
///
/// 没有 `.` 时整个文件名都当作扩展名
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}
