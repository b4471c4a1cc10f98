use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::application::catalog::{CatalogService, RemovalPolicy};
use crate::config::CatalogConfig;
use crate::domain::{Book, MAX_BOOKS, Member};

use super::book_codec::{BOOKS_HEADER, decode_book, encode_book};
use super::errors::PersistError;
use super::member_codec::{MEMBERS_HEADER, decode_member, encode_member};

/// CSV persistence adapter.
///
/// Manages `books.csv` and `members.csv` under a data directory. Saves
/// are atomic replaces (write to `<file>.tmp`, rename over the target),
/// so a crash mid-write never corrupts the previous good file. Loads are
/// best-effort: bad lines are logged and skipped, a missing file is an
/// empty collection.
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    /// Open a store over the given directory, creating it if missing.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, PersistError> {
        Self::new(config.data_dir.clone())
    }

    pub fn books_path(&self) -> PathBuf {
        self.data_dir.join("books.csv")
    }

    pub fn members_path(&self) -> PathBuf {
        self.data_dir.join("members.csv")
    }

    /// Create header-only files for a first run, leaving existing files alone.
    pub fn ensure_files(&self) -> Result<(), PersistError> {
        for (path, header) in [
            (self.books_path(), BOOKS_HEADER),
            (self.members_path(), MEMBERS_HEADER),
        ] {
            if !path.exists() {
                write_atomic(&path, &format!("{header}\n"))?;
            }
        }
        Ok(())
    }

    /// Load all books.
    ///
    /// A missing or empty file yields an empty list. So does a file whose
    /// first line is not the expected header (diagnostic, no error
    /// escalation). Unreadable lines are logged and skipped.
    pub fn load_books(&self) -> Result<Vec<Book>, PersistError> {
        let path = self.books_path();
        let Some(content) = read_if_present(&path)? else {
            return Ok(Vec::new());
        };

        let mut lines = content.lines();
        match lines.next() {
            Some(header) if header.starts_with("title,author") => {}
            _ => {
                tracing::warn!(path = %path.display(), "invalid or empty books file");
                return Ok(Vec::new());
            }
        }

        let mut books = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match decode_book(line) {
                Ok(book) => books.push(book),
                Err(e) => tracing::warn!(line, error = %e, "skipping unreadable book record"),
            }
        }
        Ok(books)
    }

    /// Load all members, with the same failure policy as `load_books`.
    pub fn load_members(&self) -> Result<Vec<Member>, PersistError> {
        let path = self.members_path();
        let Some(content) = read_if_present(&path)? else {
            return Ok(Vec::new());
        };

        let mut lines = content.lines();
        match lines.next() {
            Some(header) if header.starts_with("memberId,name") => {}
            _ => {
                tracing::warn!(path = %path.display(), "invalid or empty members file");
                return Ok(Vec::new());
            }
        }

        let mut members = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match decode_member(line) {
                Ok(member) => members.push(member),
                Err(e) => tracing::warn!(line, error = %e, "skipping unreadable member record"),
            }
        }
        Ok(members)
    }

    /// Save all books (atomic replace).
    pub fn save_books(&self, books: &[Book]) -> Result<(), PersistError> {
        let mut out = String::from(BOOKS_HEADER);
        out.push('\n');
        for book in books {
            out.push_str(&encode_book(book));
            out.push('\n');
        }
        write_atomic(&self.books_path(), &out)
    }

    /// Save all members (atomic replace).
    pub fn save_members(&self, members: &[Member]) -> Result<(), PersistError> {
        let mut out = String::from(MEMBERS_HEADER);
        out.push('\n');
        for member in members {
            out.push_str(&encode_member(member));
            out.push('\n');
        }
        write_atomic(&self.members_path(), &out)
    }

    /// Assemble a catalog from both persisted registries.
    ///
    /// Never fails: an unreadable file is logged and falls back to an
    /// empty collection, so a broken disk still yields a usable (empty)
    /// catalog. Records whose key is already taken are skipped with a
    /// diagnostic. Loaded loan sets are reconciled against the catalog
    /// invariants (an ISBN held by at most one member, at most
    /// `MAX_BOOKS` per member) before insertion; conflicts are resolved
    /// deterministically in member-id order, entries in ISBN order, and
    /// every dropped entry is logged.
    pub fn load_catalog(&self, removal_policy: RemovalPolicy) -> CatalogService {
        let books = self.load_books().unwrap_or_else(|e| {
            tracing::error!(path = %self.books_path().display(), error = %e,
                "failed to read books file; starting empty");
            Vec::new()
        });
        let mut members = self.load_members().unwrap_or_else(|e| {
            tracing::error!(path = %self.members_path().display(), error = %e,
                "failed to read members file; starting empty");
            Vec::new()
        });
        sanitize_loans(&mut members);

        let mut catalog = CatalogService::with_policy(removal_policy);

        let mut books_loaded = 0usize;
        for book in books {
            let isbn = book.isbn.clone();
            match catalog.add_book(book) {
                Ok(()) => books_loaded += 1,
                Err(e) => tracing::warn!(%isbn, error = %e, "skipping book on load"),
            }
        }

        let mut members_loaded = 0usize;
        for member in members {
            let member_id = member.member_id().to_owned();
            match catalog.add_member(member) {
                Ok(()) => members_loaded += 1,
                Err(e) => tracing::warn!(%member_id, error = %e, "skipping member on load"),
            }
        }

        tracing::info!(books_loaded, members_loaded, "catalog loaded");
        catalog
    }

    /// Save the whole catalog.
    ///
    /// Books are sorted by ISBN and members by member id, so
    /// save → load → save produces byte-identical files.
    pub fn save_catalog(&self, catalog: &CatalogService) -> Result<(), PersistError> {
        let mut books = catalog.all_books();
        books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
        let mut members = catalog.all_members();
        members.sort_by(|a, b| a.member_id().cmp(b.member_id()));

        self.save_books(&books)?;
        self.save_members(&members)?;
        tracing::info!(books = books.len(), members = members.len(), "catalog saved");
        Ok(())
    }
}

/// Save a single member to its own record file (atomic replace).
pub fn save_member_record(member: &Member, path: impl AsRef<Path>) -> Result<(), PersistError> {
    write_atomic(path.as_ref(), &format!("{}\n", encode_member(member)))
}

/// Load a single member from its own record file.
///
/// Unlike the bulk loaders there is nothing to fall back to here, so a
/// missing file, an empty file or an unreadable record is an error.
pub fn load_member_record(path: impl AsRef<Path>) -> Result<Member, PersistError> {
    let path = path.as_ref();
    let Some(content) = read_if_present(path)? else {
        return Err(PersistError::MissingRecord(path.to_path_buf()));
    };
    match content.lines().next().map(str::trim) {
        Some(line) if !line.is_empty() => Ok(decode_member(line)?),
        _ => Err(PersistError::MissingRecord(path.to_path_buf())),
    }
}

/// Drop loaded loan entries that would violate the catalog invariants.
///
/// Members are visited in id order and each member's entries in ISBN
/// order, so which entry survives a conflict does not depend on hash
/// iteration order.
fn sanitize_loans(members: &mut [Member]) {
    members.sort_by(|a, b| a.member_id().cmp(b.member_id()));

    let mut claimed: HashSet<String> = HashSet::new();
    for member in members.iter_mut() {
        let mut isbns: Vec<String> = member.borrowed_books().keys().cloned().collect();
        isbns.sort();

        let mut kept = 0usize;
        for isbn in isbns {
            let over_limit = kept >= MAX_BOOKS;
            if over_limit || claimed.contains(&isbn) {
                let reason = if over_limit {
                    "over borrow limit"
                } else {
                    "already borrowed by another member"
                };
                tracing::warn!(
                    member_id = member.member_id(),
                    %isbn,
                    reason,
                    "dropping loan entry on load"
                );
                let _ = member.return_book(&isbn);
            } else {
                claimed.insert(isbn);
                kept += 1;
            }
        }
    }
}

/// Write to `<path>.tmp`, then rename over the target.
fn write_atomic(path: &Path, contents: &str) -> Result<(), PersistError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let write = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    })();
    if let Err(e) = write {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Read a file that may legitimately be absent; an empty file counts as
/// absent (mirrors the bootstrap's header-only files being "no data").
fn read_if_present(path: &Path) -> Result<Option<String>, PersistError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
