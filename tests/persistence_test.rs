use std::fs;

use chrono::{Duration, NaiveDate};
use rusty_library_catalog::adapters::csv::{CsvStore, MEMBERS_HEADER};
use rusty_library_catalog::application::catalog::{CatalogService, RemovalPolicy};
use rusty_library_catalog::config::CatalogConfig;
use rusty_library_catalog::domain::{Book, Genre, Member};

/// テスト出力に診断ログを流すための初期化（RUST_LOGで制御）
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

/// 引用符・カンマ・コロンを含む意地の悪いデータで目録を組み立てる
fn populated_catalog() -> CatalogService {
    let mut catalog = CatalogService::new();
    catalog
        .add_book(Book::new(
            r#"The "Long, Long" Winter"#,
            r#"O'Brien, Patrick"#,
            "urn:isbn:111",
            2003,
            Genre::Biography,
        ))
        .unwrap();
    catalog
        .add_book(Book::new("Dune", "Frank Herbert", "222", 1965, Genre::Fiction))
        .unwrap();
    catalog
        .add_member(Member::new(r#"M,1 "vip""#, r#"Alice "Al" Smith, Jr."#))
        .unwrap();
    catalog.add_member(Member::new("M2", "Bob")).unwrap();
    catalog
        .borrow_book(r#"M,1 "vip""#, "urn:isbn:111", today())
        .unwrap();
    catalog.borrow_book("M2", "222", today()).unwrap();
    catalog
}

#[test]
fn test_save_then_load_reproduces_equal_entities() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();
    let catalog = populated_catalog();

    store.save_catalog(&catalog).unwrap();
    let loaded = store.load_catalog(RemovalPolicy::KeepLoans);

    let mut expected_books = catalog.all_books();
    expected_books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    let mut loaded_books = loaded.all_books();
    loaded_books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    assert_eq!(loaded_books, expected_books);

    let mut expected_members = catalog.all_members();
    expected_members.sort_by(|a, b| a.member_id().cmp(b.member_id()));
    let mut loaded_members = loaded.all_members();
    loaded_members.sort_by(|a, b| a.member_id().cmp(b.member_id()));
    assert_eq!(loaded_members, expected_members);
}

#[test]
fn test_save_load_save_is_byte_identical() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    store.save_catalog(&populated_catalog()).unwrap();
    let first_books = fs::read(store.books_path()).unwrap();
    let first_members = fs::read(store.members_path()).unwrap();

    let loaded = store.load_catalog(RemovalPolicy::KeepLoans);
    store.save_catalog(&loaded).unwrap();

    assert_eq!(fs::read(store.books_path()).unwrap(), first_books);
    assert_eq!(fs::read(store.members_path()).unwrap(), first_members);
}

#[test]
fn test_missing_files_load_as_empty_catalog() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("fresh")).unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);

    assert!(catalog.all_books().is_empty());
    assert!(catalog.all_members().is_empty());
}

#[test]
fn test_first_run_bootstrap_then_load_is_empty() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();
    store.ensure_files().unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);

    assert!(catalog.all_books().is_empty());
    assert!(catalog.all_members().is_empty());
}

#[test]
fn test_member_with_one_bad_due_date_keeps_rest_of_loans() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    // 2番目の貸出エントリだけ日付が壊れている
    fs::write(
        store.members_path(),
        format!(
            "{MEMBERS_HEADER}\n\
             \"M1\",\"Alice\",\"[{{\"\"isbn\"\":\"\"111\"\",\"\"due\"\":\"\"2026-08-10\"\"}},\
             {{\"\"isbn\"\":\"\"222\"\",\"\"due\"\":\"\"never\"\"}},\
             {{\"\"isbn\"\":\"\"333\"\",\"\"due\"\":\"\"2026-08-20\"\"}}]\"\n"
        ),
    )
    .unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);
    let member = catalog.get_member("M1").unwrap();

    assert_eq!(member.borrowed_books().len(), 2);
    assert!(member.borrowed_books().contains_key("111"));
    assert!(!member.borrowed_books().contains_key("222"));
    assert!(member.borrowed_books().contains_key("333"));
}

#[test]
fn test_legacy_member_lines_still_load() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    fs::write(
        store.members_path(),
        format!(
            "{MEMBERS_HEADER}\n\
             \"M1\",\"Alice\",\"urn\\:isbn\\:111:2026-08-10;222:2026-08-20\"\n"
        ),
    )
    .unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);
    let member = catalog.get_member("M1").unwrap();

    assert_eq!(member.borrowed_books().len(), 2);
    assert_eq!(
        member.borrowed_books().get("urn:isbn:111"),
        Some(&NaiveDate::from_ymd_opt(2026, 8, 10).unwrap())
    );

    // 旧形式で読んだものも、保存し直せば新形式で再読込できる
    store.save_catalog(&catalog).unwrap();
    let reloaded = store.load_catalog(RemovalPolicy::KeepLoans);
    assert_eq!(
        reloaded.get_member("M1").unwrap().borrowed_books(),
        member.borrowed_books()
    );
}

#[test]
fn test_duplicate_keys_are_skipped_on_load() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    fs::write(
        store.books_path(),
        "title,author,isbn,year,genre\n\
         \"Dune\",\"Frank Herbert\",111,1965,FICTION\n\
         \"Dune (again)\",\"Frank Herbert\",111,1984,FICTION\n",
    )
    .unwrap();
    fs::write(
        store.members_path(),
        format!(
            "{MEMBERS_HEADER}\n\
             \"M1\",\"Alice\",\"[]\"\n\
             \"M1\",\"Impostor\",\"[]\"\n"
        ),
    )
    .unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);

    let books = catalog.all_books();
    assert_eq!(books.len(), 1);
    // 最初のレコードが勝つ
    assert_eq!(books[0].publication_year, 1965);
    assert_eq!(catalog.get_member("M1").unwrap().name(), "Alice");
}

#[test]
fn test_double_borrow_in_file_is_reconciled_on_load() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    // 同じISBNを2人が持っているファイル（手編集を想定）
    fs::write(
        store.members_path(),
        format!(
            "{MEMBERS_HEADER}\n\
             \"M2\",\"Bob\",\"[{{\"\"isbn\"\":\"\"111\"\",\"\"due\"\":\"\"2026-09-01\"\"}}]\"\n\
             \"M1\",\"Alice\",\"[{{\"\"isbn\"\":\"\"111\"\",\"\"due\"\":\"\"2026-08-10\"\"}}]\"\n"
        ),
    )
    .unwrap();

    let catalog = store.load_catalog(RemovalPolicy::KeepLoans);

    // 会員ID順の決定的な解決：M1が残り、M2のエントリは落ちる
    assert!(
        catalog
            .get_member("M1")
            .unwrap()
            .borrowed_books()
            .contains_key("111")
    );
    assert!(catalog.get_member("M2").unwrap().borrowed_books().is_empty());
}

#[test]
fn test_cascade_return_policy_applies_after_load() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();
    let catalog = populated_catalog();
    store.save_catalog(&catalog).unwrap();

    let mut loaded = store.load_catalog(RemovalPolicy::CascadeReturn);
    loaded.remove_book("222").unwrap();

    assert!(loaded.get_member("M2").unwrap().borrowed_books().is_empty());
    // 貸出が消えたので再登録すればすぐ借りられる
    loaded
        .add_book(Book::new("Dune", "Frank Herbert", "222", 1965, Genre::Fiction))
        .unwrap();
    assert!(loaded.borrow_book("M2", "222", today()).is_ok());
}

#[test]
fn test_store_opened_from_config_uses_configured_directory() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = CatalogConfig {
        data_dir: dir.path().join("configured"),
        removal_policy: RemovalPolicy::CascadeReturn,
    };

    let store = CsvStore::from_config(&config).unwrap();
    store.ensure_files().unwrap();

    assert!(config.data_dir.join("books.csv").exists());
    let catalog = store.load_catalog(config.removal_policy);
    assert_eq!(catalog.removal_policy(), RemovalPolicy::CascadeReturn);
}

#[test]
fn test_overdue_survives_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path()).unwrap();

    let mut catalog = CatalogService::new();
    catalog
        .add_book(Book::new("Dune", "Frank Herbert", "111", 1965, Genre::Fiction))
        .unwrap();
    catalog.add_member(Member::new("M1", "Alice")).unwrap();
    catalog
        .borrow_book("M1", "111", today() - Duration::days(15))
        .unwrap();

    store.save_catalog(&catalog).unwrap();
    let loaded = store.load_catalog(RemovalPolicy::KeepLoans);

    let member = loaded.get_member("M1").unwrap();
    let report: Vec<String> = member.overdue_report(today()).collect();
    assert_eq!(report, vec!["ISBN: 111, Days overdue: 1".to_owned()]);
}
