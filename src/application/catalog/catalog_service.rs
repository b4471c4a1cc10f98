use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Book, Genre, Member};

use super::errors::{CatalogError, Result};

/// 書籍削除時の貸出記録の扱い
///
/// 元の実装は削除と貸出記録を突き合わせないため、削除後に会員の
/// 貸出集合へISBNへの参照が宙に浮いたまま残り得る。どちらの挙動を
/// 取るかは設定として明示的に選択させる。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// 貸出記録には触れない（従来挙動）
    #[default]
    KeepLoans,
    /// 削除時に該当ISBNの貸出を強制返却する
    CascadeReturn,
}

/// 蔵書目録サービス
///
/// 書籍・会員の両レジストリを排他的に所有し、レジストリ横断の
/// 不変条件を強制する唯一の経路：
/// - ISBNの重複登録なし
/// - 会員IDの重複登録なし
/// - 1つのISBNを同時に借りられるのは1会員まで
/// - 会員の貸出冊数は上限（5冊）以下
///
/// グローバル状態は持たない。呼び出し側がインスタンスを生成し、
/// 明示的に受け渡す。
#[derive(Debug, Clone, Default)]
pub struct CatalogService {
    books: HashMap<String, Book>,
    members: HashMap<String, Member>,
    removal_policy: RemovalPolicy,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(removal_policy: RemovalPolicy) -> Self {
        Self {
            removal_policy,
            ..Self::default()
        }
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    // ========================================================================
    // 書籍管理
    // ========================================================================

    /// 書籍を登録する
    ///
    /// # エラー
    /// 同じISBNが既に登録されている場合は`DuplicateBook`
    pub fn add_book(&mut self, book: Book) -> Result<()> {
        if self.books.contains_key(&book.isbn) {
            return Err(CatalogError::DuplicateBook(book.isbn));
        }
        self.books.insert(book.isbn.clone(), book);
        Ok(())
    }

    /// 書籍を削除する
    ///
    /// `RemovalPolicy::CascadeReturn`の場合は、削除に伴って全会員の
    /// 貸出集合から該当ISBNを取り除く。`KeepLoans`（既定）では
    /// 貸出記録に触れない。
    ///
    /// # エラー
    /// ISBNが未登録の場合は`BookNotFound`
    pub fn remove_book(&mut self, isbn: &str) -> Result<Book> {
        let book = self
            .books
            .remove(isbn)
            .ok_or_else(|| CatalogError::BookNotFound(isbn.to_owned()))?;

        if self.removal_policy == RemovalPolicy::CascadeReturn {
            for member in self.members.values_mut() {
                if member.return_book(isbn).is_ok() {
                    tracing::warn!(
                        isbn,
                        member_id = member.member_id(),
                        "removed book had an active loan; loan dropped"
                    );
                }
            }
        }

        Ok(book)
    }

    /// 著者名で検索する（大文字小文字を区別しない完全一致）
    pub fn search_by_author(&self, author: &str) -> Vec<&Book> {
        let needle = author.to_lowercase();
        self.books
            .values()
            .filter(|book| book.author.to_lowercase() == needle)
            .collect()
    }

    /// ジャンルで検索する
    pub fn search_by_genre(&self, genre: Genre) -> Vec<&Book> {
        self.books
            .values()
            .filter(|book| book.genre == genre)
            .collect()
    }

    /// 最も古い書籍（出版年が最小）。同年が複数ある場合はどれか1冊。
    pub fn oldest_book(&self) -> Option<&Book> {
        self.books.values().min_by_key(|book| book.publication_year)
    }

    /// 最も新しい書籍（出版年が最大）
    pub fn newest_book(&self) -> Option<&Book> {
        self.books.values().max_by_key(|book| book.publication_year)
    }

    /// ジャンルごとの冊数。存在するジャンルのみ含む（0冊の項目は作らない）。
    pub fn count_by_genre(&self) -> HashMap<Genre, usize> {
        let mut counts = HashMap::new();
        for book in self.books.values() {
            *counts.entry(book.genre).or_insert(0) += 1;
        }
        counts
    }

    /// 全書籍のスナップショット（順序不定）
    pub fn all_books(&self) -> Vec<Book> {
        self.books.values().cloned().collect()
    }

    /// 出版年の昇順に並べた全書籍のスナップショット
    pub fn all_books_sorted_by_year(&self) -> Vec<Book> {
        let mut books = self.all_books();
        books.sort_by_key(|book| book.publication_year);
        books
    }

    /// 貸出可能な書籍（どの会員の貸出集合にも現れないISBN）
    ///
    /// キャッシュは持たず、呼び出しごとに集合差で計算する。
    pub fn available_books(&self) -> Vec<&Book> {
        let borrowed: HashSet<&str> = self
            .members
            .values()
            .flat_map(|member| member.borrowed_books().keys())
            .map(String::as_str)
            .collect();

        self.books
            .values()
            .filter(|book| !borrowed.contains(book.isbn.as_str()))
            .collect()
    }

    // ========================================================================
    // 会員管理
    // ========================================================================

    /// 会員を登録する
    ///
    /// # エラー
    /// 同じ会員IDが既に登録されている場合は`DuplicateMember`
    pub fn add_member(&mut self, member: Member) -> Result<()> {
        if self.members.contains_key(member.member_id()) {
            return Err(CatalogError::DuplicateMember(member.member_id().to_owned()));
        }
        self.members.insert(member.member_id().to_owned(), member);
        Ok(())
    }

    /// 会員を取得する
    ///
    /// # エラー
    /// 未登録の場合は`MemberNotFound`
    pub fn get_member(&self, member_id: &str) -> Result<&Member> {
        self.members
            .get(member_id)
            .ok_or_else(|| CatalogError::MemberNotFound(member_id.to_owned()))
    }

    /// 全会員のスナップショット（順序不定）
    pub fn all_members(&self) -> Vec<Member> {
        self.members.values().cloned().collect()
    }

    // ========================================================================
    // 貸出・返却（レジストリ横断の不変条件を守る唯一の経路）
    // ========================================================================

    /// 書籍を貸し出す
    ///
    /// ビジネスルール：
    /// - 会員が存在すること
    /// - 書籍が存在すること
    /// - 会員の貸出冊数が上限（5冊）未満であること
    /// - そのISBNを誰も（本人も含め）借りていないこと
    ///
    /// 可用性の確認（全会員の貸出集合の線形走査）は二重貸出を防ぐ
    /// 唯一の仕組みであり、貸出の確定まで同一の`&mut self`メソッド内で
    /// 完結する。確認と確定の間に他の目録操作が割り込むことはない。
    ///
    /// # 戻り値
    /// 設定された返却期限
    pub fn borrow_book(
        &mut self,
        member_id: &str,
        isbn: &str,
        today: NaiveDate,
    ) -> Result<NaiveDate> {
        // 1. 会員の存在確認
        let member = self
            .members
            .get(member_id)
            .ok_or_else(|| CatalogError::MemberNotFound(member_id.to_owned()))?;

        // 2. 書籍の存在確認
        if !self.books.contains_key(isbn) {
            return Err(CatalogError::BookNotFound(isbn.to_owned()));
        }

        // 3. 貸出上限の確認
        if !member.can_borrow() {
            return Err(CatalogError::BookLimitExceeded);
        }

        // 4. 二重貸出の確認（全会員の貸出集合を線形走査）
        let already_borrowed = self
            .members
            .values()
            .any(|m| m.borrowed_books().contains_key(isbn));
        if already_borrowed {
            return Err(CatalogError::BookNotAvailable(isbn.to_owned()));
        }

        // 5. 貸出を確定する
        let member = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| CatalogError::MemberNotFound(member_id.to_owned()))?;
        member.borrow_book(isbn, today).map_err(|e| {
            CatalogError::InternalInconsistency(format!(
                "borrow transition refused after preconditions passed: {e:?}"
            ))
        })
    }

    /// 書籍を返却する
    ///
    /// ビジネスルール：
    /// - 会員が存在すること
    /// - その会員が該当ISBNを借りていること
    pub fn return_book(&mut self, member_id: &str, isbn: &str) -> Result<()> {
        let member = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| CatalogError::MemberNotFound(member_id.to_owned()))?;

        if !member.borrowed_books().contains_key(isbn) {
            return Err(CatalogError::BookNotBorrowed(isbn.to_owned()));
        }

        member.return_book(isbn).map_err(|e| {
            CatalogError::InternalInconsistency(format!(
                "return transition refused after preconditions passed: {e:?}"
            ))
        })
    }
}
