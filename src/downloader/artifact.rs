use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use super::scanner::PresenceIndex;

pub const PDF_EXTENSION: &str = ".pdf";
pub const MD_EXTENSION: &str = ".md";
pub const MP3_EXTENSION: &str = ".mp3";

/// 专栏文章可以输出的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Document,
    MarkupText,
    Audio,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Document,
        ArtifactKind::MarkupText,
        ArtifactKind::Audio,
    ];

    pub const fn bit(self) -> u8 {
        match self {
            ArtifactKind::Document => 1,
            ArtifactKind::MarkupText => 1 << 1,
            ArtifactKind::Audio => 1 << 2,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Document => PDF_EXTENSION,
            ArtifactKind::MarkupText => MD_EXTENSION,
            ArtifactKind::Audio => MP3_EXTENSION,
        }
    }

    pub fn file_name(self, title: &str) -> String {
        format!("{}{}", title, self.extension())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Document => "PDF",
            ArtifactKind::MarkupText => "Markdown",
            ArtifactKind::Audio => "音频",
        };
        f.write_str(label)
    }
}

/// 格式集合，位掩码：PDF=1, Markdown=2, 音频=4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArtifactSet(u8);

impl ArtifactSet {
    pub const EMPTY: ArtifactSet = ArtifactSet(0);
    pub const ALL: ArtifactSet = ArtifactSet(0b111);

    /// 超出 0..=7 的掩码返回 None
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits & !Self::ALL.0 == 0).then_some(Self(bits))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, kind: ArtifactKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: ArtifactKind) {
        self.0 |= kind.bit();
    }

    /// `self & !other`
    pub fn difference(self, other: ArtifactSet) -> ArtifactSet {
        self & !other
    }

    pub fn iter(self) -> impl Iterator<Item = ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<ArtifactKind> for ArtifactSet {
    fn from(kind: ArtifactKind) -> Self {
        ArtifactSet(kind.bit())
    }
}

impl FromIterator<ArtifactKind> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = ArtifactKind>>(iter: I) -> Self {
        let mut set = ArtifactSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl BitOr for ArtifactSet {
    type Output = ArtifactSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        ArtifactSet(self.0 | rhs.0)
    }
}

impl BitAnd for ArtifactSet {
    type Output = ArtifactSet;

    fn bitand(self, rhs: Self) -> Self::Output {
        ArtifactSet(self.0 & rhs.0)
    }
}

// 补集限定在已定义的三种格式内
impl Not for ArtifactSet {
    type Output = ArtifactSet;

    fn not(self) -> Self::Output {
        ArtifactSet(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// 某篇文章在章节目录下已经存在的格式
pub fn present(index: &PresenceIndex, chapter_dir: &str, title: &str) -> ArtifactSet {
    ArtifactKind::ALL
        .into_iter()
        .filter(|kind| index.contains(chapter_dir, &kind.file_name(title)))
        .collect()
}

/// 还需要下载的格式，结果为空时调用方应跳过该文章的所有远程调用
pub fn needed(
    requested: ArtifactSet,
    chapter_dir: &str,
    title: &str,
    index: &PresenceIndex,
) -> ArtifactSet {
    requested.difference(present(index, chapter_dir, title))
}
