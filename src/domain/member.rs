use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::errors::{BorrowError, ReturnError};

/// 会員1人あたりの最大貸出冊数
pub const MAX_BOOKS: usize = 5;

/// 貸出期間（日数）
pub const BORROW_DAYS: i64 = 14;

/// 会員エンティティ + 貸出/返却の状態機械
///
/// 各会員は自身の貸出集合（ISBN → 返却期限）を排他的に所有する。
/// 集合は`borrow_book`/`return_book`の遷移を通じてのみ変化し、
/// 外部には読み取り専用ビューだけを公開する。
///
/// 「今日」は常に引数として受け取る。状態機械の内部で時計を
/// 読むことはないため、延滞計算は決定的にテストできる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    member_id: String,
    name: String,
    borrowed_books: HashMap<String, NaiveDate>,
}

impl Member {
    pub fn new(member_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            borrowed_books: HashMap::new(),
        }
    }

    /// 永続化層からの復元用。貸出集合をそのまま受け取る。
    ///
    /// 不変条件（上限・二重貸出なし）の強制は読み込み経路の責務で、
    /// ここでは検証しない。
    pub fn from_parts(
        member_id: impl Into<String>,
        name: impl Into<String>,
        borrowed_books: HashMap<String, NaiveDate>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            borrowed_books,
        }
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 貸出集合の読み取り専用ビュー
    pub fn borrowed_books(&self) -> &HashMap<String, NaiveDate> {
        &self.borrowed_books
    }

    /// 追加で借りられるか（現在の貸出冊数が上限未満か）
    pub fn can_borrow(&self) -> bool {
        self.borrowed_books.len() < MAX_BOOKS
    }

    /// 書籍を借りる
    ///
    /// 事前条件：ISBNが空白でないこと、`can_borrow`がtrueであること。
    /// 既に借りているISBNを再度借りると返却期限は今日+14日に引き直される。
    ///
    /// # 戻り値
    /// 設定した返却期限
    ///
    /// # エラー
    /// 事前条件を満たさない場合は`BorrowError`（回復可能な局所シグナル）
    pub fn borrow_book(&mut self, isbn: &str, today: NaiveDate) -> Result<NaiveDate, BorrowError> {
        if isbn.trim().is_empty() {
            return Err(BorrowError::EmptyIsbn);
        }
        if !self.can_borrow() {
            return Err(BorrowError::LimitReached);
        }
        let due_date = today + Duration::days(BORROW_DAYS);
        self.borrowed_books.insert(isbn.to_owned(), due_date);
        Ok(due_date)
    }

    /// 書籍を返す
    ///
    /// # エラー
    /// そのISBNを借りていない場合は`ReturnError::NotBorrowed`
    pub fn return_book(&mut self, isbn: &str) -> Result<(), ReturnError> {
        self.borrowed_books
            .remove(isbn)
            .map(|_| ())
            .ok_or(ReturnError::NotBorrowed)
    }

    /// 指定ISBNの貸出が延滞しているか（今日が返却期限より厳密に後か）
    ///
    /// 借りていないISBNはfalse。
    pub fn is_overdue(&self, isbn: &str, today: NaiveDate) -> bool {
        self.borrowed_books
            .get(isbn)
            .is_some_and(|due| today > *due)
    }

    /// 延滞している貸出が1件でもあるか
    pub fn has_overdue_books(&self, today: NaiveDate) -> bool {
        self.borrowed_books.values().any(|due| today > *due)
    }

    /// 延滞レポート
    ///
    /// 返却期限を過ぎた貸出ごとに「ISBN: ..., Days overdue: ...」形式の
    /// 文字列を遅延生成する。延滞日数は返却期限から今日までの日数。
    pub fn overdue_report(&self, today: NaiveDate) -> impl Iterator<Item = String> + '_ {
        self.borrowed_books.iter().filter_map(move |(isbn, due)| {
            (today > *due).then(|| {
                let days_overdue = (today - *due).num_days();
                format!("ISBN: {isbn}, Days overdue: {days_overdue}")
            })
        })
    }
}
