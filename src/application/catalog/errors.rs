use thiserror::Error;

/// 蔵書目録サービスのエラー
///
/// いずれも呼び出し側で回復可能なエラーとして表面化する。
/// プロセスを停止させるエラーは存在しない。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// 同じISBNの書籍が既に登録されている
    #[error("book with ISBN {0} already exists")]
    DuplicateBook(String),

    /// 同じIDの会員が既に登録されている
    #[error("member with ID {0} already exists")]
    DuplicateMember(String),

    /// 書籍が見つからない
    #[error("book not found with ISBN: {0}")]
    BookNotFound(String),

    /// 会員が見つからない
    #[error("member not found with ID: {0}")]
    MemberNotFound(String),

    /// 貸出上限（5冊）に達している
    #[error("member has reached the maximum number of borrowed books")]
    BookLimitExceeded,

    /// 他の会員が貸出中のため貸し出せない
    #[error("book {0} is already borrowed by another member")]
    BookNotAvailable(String),

    /// この会員が借りていない書籍の返却
    #[error("book {0} is not borrowed by this member")]
    BookNotBorrowed(String),

    /// 内部不整合（事前条件を満たしたのに状態遷移が拒否された）
    ///
    /// 黙殺せず、必ず呼び出し側に伝える。
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

/// 目録サービスのResult型
pub type Result<T> = std::result::Result<T, CatalogError>;
