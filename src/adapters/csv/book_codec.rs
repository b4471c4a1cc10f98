use crate::domain::{Book, Genre};

use super::errors::ParseError;
use super::fields::{quote, split_line};

/// Header line of `books.csv`.
pub const BOOKS_HEADER: &str = "title,author,isbn,year,genre";

/// Encode one book as a single CSV record.
///
/// Title and author are individually quoted (embedded quotes doubled);
/// isbn, year and genre are written bare.
pub fn encode_book(book: &Book) -> String {
    format!(
        "{},{},{},{},{}",
        quote(&book.title),
        quote(&book.author),
        book.isbn,
        book.publication_year,
        book.genre
    )
}

/// Decode one CSV record into a book.
pub fn decode_book(line: &str) -> Result<Book, ParseError> {
    let [title, author, isbn, year, genre]: [String; 5] =
        split_line(line).try_into().map_err(|fields: Vec<String>| {
            ParseError::FieldCount {
                expected: 5,
                found: fields.len(),
            }
        })?;

    let publication_year: i32 = year
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidYear(year.clone()))?;
    let genre: Genre = genre
        .trim()
        .parse()
        .map_err(|_| ParseError::UnknownGenre(genre.clone()))?;

    Ok(Book {
        title,
        author,
        isbn: isbn.trim().to_owned(),
        publication_year,
        genre,
    })
}
