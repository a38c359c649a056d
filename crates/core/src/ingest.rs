use crate::chunking::{build_chunks, normalize_text, options_for_source};
use crate::error::IngestError;
use crate::extractor::{extract_units, SourceKind};
use crate::models::{Chunk, IngestionReport, SkippedSource, SourceSummary};
use crate::store::write_chunk_batch;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Recursively list the supported source documents under `folder`, sorted
/// for deterministic processing order.
pub fn discover_source_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if SourceKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Run the full offline pipeline over a raw corpus directory: extract,
/// normalize, chunk, and persist one artifact per source file.
///
/// A source that cannot be processed is recorded as skipped and never
/// aborts the batch. An empty raw directory produces an empty report. All
/// rows of one CSV file share a single artifact with one running chunk-id
/// sequence.
pub fn ingest_corpus(raw_dir: &Path, processed_dir: &Path) -> Result<IngestionReport, IngestError> {
    let files = discover_source_files(raw_dir);

    if files.is_empty() {
        warn!(raw_dir = %raw_dir.display(), "no source documents found");
        return Ok(IngestionReport {
            sources: Vec::new(),
            skipped: Vec::new(),
            finished_at: Utc::now(),
        });
    }

    let mut sources = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        let outcome = (|| {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
                .to_string();

            let options = options_for_source(&file_name);
            let units = extract_units(&path)?;

            let mut chunks: Vec<Chunk> = Vec::new();
            let mut cursor = 0u64;
            for unit in units {
                let normalized = normalize_text(&unit);
                let (unit_chunks, next_cursor) =
                    build_chunks(&normalized, &file_name, &options, cursor)?;
                cursor = next_cursor;
                chunks.extend(unit_chunks);
            }

            write_chunk_batch(&chunks, &file_name, processed_dir)?;

            Ok::<_, IngestError>(SourceSummary {
                source: file_name,
                checksum: digest_file(&path)?,
                num_chunks: chunks.len(),
            })
        })();

        match outcome {
            Ok(summary) => {
                info!(source = %summary.source, chunks = summary.num_chunks, "ingested source");
                sources.push(summary);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping source");
                skipped.push(SkippedSource {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(IngestionReport {
        sources,
        skipped,
        finished_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::load_chunk_batches;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    /// Build a small single-page PDF whose extracted text is `text`.
    fn write_pdf(path: &Path, text: &str) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn discovery_is_recursive_and_filters_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;

        File::create(dir.path().join("a.pdf")).and_then(|mut f| f.write_all(b"%PDF"))?;
        File::create(nested.join("b.csv")).and_then(|mut f| f.write_all(b"text\nx"))?;
        File::create(dir.path().join("notes.txt")).and_then(|mut f| f.write_all(b"skip me"))?;

        let files = discover_source_files(dir.path());
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"abc")?;
        assert_eq!(digest_file(&path)?, digest_file(&path)?);
        Ok(())
    }

    #[test]
    fn empty_raw_dir_is_a_zero_work_report() -> Result<(), Box<dyn std::error::Error>> {
        let raw = tempdir()?;
        let processed = tempdir()?;

        let report = ingest_corpus(raw.path(), processed.path())?;
        assert!(report.sources.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.total_chunks(), 0);
        Ok(())
    }

    #[test]
    fn unreadable_sources_are_skipped_without_aborting() -> Result<(), Box<dyn std::error::Error>> {
        let raw = tempdir()?;
        let processed = tempdir()?;
        fs::write(raw.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;
        fs::write(raw.path().join("good.csv"), "text\na valid row of text\n")?;

        let report = ingest_corpus(raw.path(), processed.path())?;

        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].source, "good.csv");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("pdf parse error"));
        Ok(())
    }

    #[test]
    fn csv_rows_share_one_artifact_with_sequential_ids(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let raw = tempdir()?;
        let processed = tempdir()?;
        fs::write(
            raw.path().join("judgments.csv"),
            "id,description\n\
             1,the court held that the amendment was valid\n\
             2,the petition was dismissed with costs\n\
             3,bail was granted subject to conditions\n\
             4,the tribunal lacked jurisdiction over the dispute\n\
             5,the appeal succeeds and the order is set aside\n",
        )?;

        let report = ingest_corpus(raw.path(), processed.path())?;
        assert_eq!(report.sources.len(), 1);

        let batches = load_chunk_batches(processed.path())?;
        assert_eq!(batches.len(), 1, "all rows must share one artifact");

        let chunks = &batches[0].chunks;
        assert_eq!(chunks.len(), 5);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, index as u64 + 1);
            assert_eq!(chunk.source, "judgments.csv");
        }
        assert!(chunks[0].content.contains("amendment was valid"));
        assert!(chunks[4].content.contains("appeal succeeds"));
        Ok(())
    }

    #[test]
    fn constitution_pdf_chunks_at_article_boundaries() -> Result<(), Box<dyn std::error::Error>> {
        let raw = tempdir()?;
        let processed = tempdir()?;

        let filler =
            "the state shall not deny to any person equality before the law or the equal \
             protection of the laws within the territory. "
                .repeat(6);
        let text = format!("Article 1 {filler}Article 2 {filler}");
        write_pdf(&raw.path().join("constitution.pdf"), &text);

        let report = ingest_corpus(raw.path(), processed.path())?;
        assert_eq!(report.sources.len(), 1, "skipped: {:?}", report.skipped);

        let batches = load_chunk_batches(processed.path())?;
        let chunks = &batches[0].chunks;

        assert!(chunks.len() >= 2);
        for chunk in chunks {
            assert_eq!(chunk.source, "constitution.pdf");
            assert!(chunk.content.chars().count() <= 1_000);
        }
        assert!(
            chunks.iter().any(|chunk| chunk.content.starts_with("Article 2")),
            "expected a chunk opening at the Article 2 boundary: {:?}",
            chunks.iter().map(|c| &c.content[..40.min(c.content.len())]).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn page_artifacts_never_reach_the_artifacts() -> Result<(), Box<dyn std::error::Error>> {
        let raw = tempdir()?;
        let processed = tempdir()?;
        fs::write(
            raw.path().join("cases.csv"),
            "content\nsee the holding at Page 42 of the record\n",
        )?;

        ingest_corpus(raw.path(), processed.path())?;
        let batches = load_chunk_batches(processed.path())?;
        assert_eq!(
            batches[0].chunks[0].content,
            "see the holding at of the record"
        );
        Ok(())
    }
}
