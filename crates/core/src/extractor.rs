use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// Column names probed, in order, when locating the text-bearing column of
/// a CSV file. Matching is case-insensitive.
pub const TEXT_COLUMN_CANDIDATES: [&str; 4] = ["text", "content", "body", "description"];

/// Supported source document types, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Csv,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }
}

pub trait PdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError>;
}

/// Page-by-page extraction via lopdf. A page whose text cannot be decoded
/// is skipped with a warning; only a document that fails to load at all is
/// an error.
#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut text = String::new();
        for (page_no, _page_id) in document.get_pages() {
            match document.extract_text(&[page_no]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push(' ');
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        page = page_no,
                        error = %error,
                        "skipping unreadable pdf page"
                    );
                }
            }
        }

        Ok(text)
    }
}

/// Extract the retrievable text units of one source file: a single string
/// for a PDF, one string per row for a CSV.
pub fn extract_units(path: &Path) -> Result<Vec<String>, IngestError> {
    match SourceKind::from_path(path) {
        Some(SourceKind::Pdf) => Ok(vec![LopdfExtractor.extract_text(path)?]),
        Some(SourceKind::Csv) => extract_csv_rows(path),
        None => Err(IngestError::UnsupportedSource(path.display().to_string())),
    }
}

/// One text unit per CSV row. The text column is auto-detected from the
/// header; when no candidate matches, every non-empty field of the row is
/// concatenated instead. Rows that fail to parse are skipped with a
/// warning.
pub fn extract_csv_rows(path: &Path) -> Result<Vec<String>, IngestError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let text_column = TEXT_COLUMN_CANDIDATES.iter().find_map(|candidate| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(candidate))
    });

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping unreadable csv row");
                continue;
            }
        };

        let text = match text_column {
            Some(index) => record.get(index).unwrap_or_default().to_string(),
            None => record
                .iter()
                .filter(|field| !field.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        rows.push(text);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn source_kind_is_detected_from_the_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a.pdf")), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_path(Path::new("a.PDF")), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_path(Path::new("b.csv")), Some(SourceKind::Csv));
        assert_eq!(SourceKind::from_path(Path::new("c.txt")), None);
        assert_eq!(SourceKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        let result = extract_units(Path::new("notes.docx"));
        assert!(matches!(result, Err(IngestError::UnsupportedSource(_))));
    }

    #[test]
    fn unreadable_pdf_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = LopdfExtractor.extract_text(&path);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn csv_text_column_is_detected_case_insensitively() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("cases.csv");
        fs::write(
            &path,
            "id,Description,year\n1,first case summary,1950\n2,second case summary,1973\n",
        )?;

        let rows = extract_csv_rows(&path)?;
        assert_eq!(rows, vec!["first case summary", "second case summary"]);
        Ok(())
    }

    #[test]
    fn csv_without_text_column_concatenates_fields() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("plain.csv");
        fs::write(&path, "a,b,c\nfoo,,bar\none,two,three\n")?;

        let rows = extract_csv_rows(&path)?;
        assert_eq!(rows, vec!["foo bar", "one two three"]);
        Ok(())
    }

    #[test]
    fn csv_rows_come_back_in_file_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("ordered.csv");
        fs::write(&path, "text\nrow one\nrow two\nrow three\n")?;

        let rows = extract_units(&path)?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "row one");
        assert_eq!(rows[2], "row three");
        Ok(())
    }
}
