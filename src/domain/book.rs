use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 書籍のジャンル
///
/// 閉じた集合として定義し、網羅的なパターンマッチを強制する。
/// 永続化形式では大文字表記（`FICTION`など）を使う。未知の入力は
/// 解析境界で`UnknownGenre`として拒否する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    Science,
    History,
    Mystery,
    Biography,
}

impl Genre {
    /// 永続化形式の表記
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::Science => "SCIENCE",
            Genre::History => "HISTORY",
            Genre::Mystery => "MYSTERY",
            Genre::Biography => "BIOGRAPHY",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ジャンル解析の失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGenre(pub String);

impl FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FICTION" => Ok(Genre::Fiction),
            "SCIENCE" => Ok(Genre::Science),
            "HISTORY" => Ok(Genre::History),
            "MYSTERY" => Ok(Genre::Mystery),
            "BIOGRAPHY" => Ok(Genre::Biography),
            _ => Err(UnknownGenre(s.to_owned())),
        }
    }
}

/// 書籍エンティティ
///
/// 一度登録された後は実質的に不変（部分更新の操作は存在しない）。
/// 同一性はISBNで判定し、書籍レジストリのキーにもISBNを使う。
/// 借り手への逆参照は持たない。借り手の特定は会員レジストリの
/// 走査で導出される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: Genre,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        publication_year: i32,
        genre: Genre,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            publication_year,
            genre,
        }
    }
}
