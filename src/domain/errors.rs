/// 貸出遷移のエラー
///
/// 会員ローカルの回復可能なシグナル。目録レベルのエラーとは区別され、
/// 目録側の事前条件を通過した後にこれが返った場合は内部不整合として
/// 扱われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowError {
    /// ISBNが空白
    EmptyIsbn,
    /// 貸出上限（5冊）に達している
    LimitReached,
}

/// 返却遷移のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnError {
    /// この会員はそのISBNを借りていない
    NotBorrowed,
}
