//! Per-locale static tables.
//!
//! Each locale is plain data selected at construction time; the API language
//! sent in the common query parameters comes from here too.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-Hans")]
    ZhHans,
    #[serde(rename = "id")]
    Id,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::ZhHans, Locale::Id];

    pub fn config(self) -> &'static LocaleConfig {
        match self {
            Locale::En => &EN,
            Locale::ZhHans => &ZH_HANS,
            Locale::Id => &ID,
        }
    }
}

impl FromStr for Locale {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "zh-hans" | "zh" | "cn" => Ok(Locale::ZhHans),
            "id" => Ok(Locale::Id),
            other => Err(SourceError::Other(format!("unsupported locale: {other}"))),
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config().lang)
    }
}

/// Genre entry; `-1` means "all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: &'static str,
    pub id: i32,
}

const fn tag(name: &'static str, id: i32) -> Tag {
    Tag { name, id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleConfig {
    /// Host-facing language code.
    pub lang: &'static str,
    /// Value sent as `lang`/`sys_lang` query parameters.
    pub api_lang: &'static str,
    pub sort_options: &'static [&'static str],
    pub statuses: &'static [&'static str],
    pub prices: &'static [&'static str],
    pub genres: &'static [Tag],
}

static EN: LocaleConfig = LocaleConfig {
    lang: "en",
    api_lang: "en",
    sort_options: &["Interest", "Popular", "Updated"],
    statuses: &["All", "Ongoing", "Completed"],
    prices: &["All", "Free", "Paid"],
    genres: &[
        tag("All", -1),
        tag("Action", 19),
        tag("Adventure", 22),
        tag("BL", 3),
        tag("Comedy", 14),
        tag("Eastern", 30),
        tag("Fantasy", 11),
        tag("GL", 16),
        tag("Harem", 15),
        tag("Historical", 12),
        tag("Horror", 23),
        tag("Mistery", 17),
        tag("Romance", 13),
        tag("Slice of Life", 21),
        tag("Suspense", 41),
        tag("Teen", 20),
    ],
};

static ZH_HANS: LocaleConfig = LocaleConfig {
    lang: "zh-Hans",
    api_lang: "cn",
    sort_options: &["为你推荐", "人气推荐", "更新时间"],
    statuses: &["全部", "连载中", "已完结"],
    prices: &["全部", "免费", "付费"],
    genres: &[
        tag("全部", -1),
        tag("校园", 18),
        tag("都市", 9),
        tag("耽美", 3),
        tag("少女", 20),
        tag("恋爱", 13),
        tag("奇幻", 11),
        tag("热血", 19),
        tag("冒险", 22),
        tag("古风", 12),
        tag("百合", 16),
        tag("玄幻", 30),
        tag("悬疑", 41),
        tag("科幻", 8),
    ],
};

static ID: LocaleConfig = LocaleConfig {
    lang: "id",
    api_lang: "id",
    sort_options: &["Kamu Mungkin Suka", "Populer", "Terbaru"],
    statuses: &["Semua", "Berlangsung", "Tamat"],
    prices: &["Semua", "Bebas", "Dibayar"],
    genres: &[
        tag("Semua", -1),
        tag("Aksi", 19),
        tag("Fantasi Timur", 30),
        tag("Fantasi", 11),
        tag("Historis", 12),
        tag("Horror", 23),
        tag("Kampus", 18),
        tag("Komedi", 14),
        tag("Menegangkan", 41),
        tag("Remaja", 20),
        tag("Romantis", 13),
    ],
};
