//! Page splitting: one standalone PDF per source page, via `lopdf`.
//!
//! pdfium can read and render but not write a subset of a document, so
//! splitting works on the object graph directly. Each single-page document
//! is assembled from the objects its page reaches (content streams, fonts,
//! images, annotations) under a fresh page tree; attributes the page
//! inherits from its ancestors are copied onto it. The work per page is
//! proportional to that page's own objects, not to the size of the book.

use crate::error::FulltextError;
use crate::pipeline::page_file_name;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Page attributes a page may inherit from its `Pages` ancestors.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Upper bound on page-tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Split `source` into single-page PDFs named from `first_page` in `pdf_dir`.
pub fn write_single_page_pdfs(
    source: &Path,
    pdf_dir: &Path,
    first_page: u32,
) -> Result<Vec<PathBuf>, FulltextError> {
    let document = Document::load(source).map_err(|e| FulltextError::PdfRead {
        path: source.to_path_buf(),
        detail: e.to_string(),
    })?;

    let pages = document.get_pages();
    info!("Splitting {} ({} pages)", source.display(), pages.len());

    let mut written = Vec::with_capacity(pages.len());
    for (offset, page_id) in pages.values().enumerate() {
        let path = pdf_dir.join(page_file_name(first_page + offset as u32, "pdf"));
        let mut single = extract_page(&document, *page_id).map_err(|e| FulltextError::PdfRead {
            path: source.to_path_buf(),
            detail: format!("page {}: {}", offset + 1, e),
        })?;
        single.save(&path).map_err(|e| FulltextError::PdfWrite {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

/// A new document holding only the page `page_id` and what it references.
fn extract_page(document: &Document, page_id: ObjectId) -> Result<Document, lopdf::Error> {
    let mut page = document.get_dictionary(page_id)?.clone();
    for key in INHERITABLE {
        if page.get(key.as_bytes()).is_err() {
            if let Some(value) = inherited(document, &page, key) {
                page.set(key, value);
            }
        }
    }
    page.remove(b"Parent");

    let mut single = Document::with_version(document.version.clone());
    let mut pending = Vec::new();
    collect_references(&Object::Dictionary(page.clone()), &mut pending);
    let mut visited = BTreeSet::from([page_id]);

    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Ok(object) = document.get_object(id) else {
            continue;
        };
        // Links to other pages (annotation destinations, structure
        // parents) stay dangling instead of pulling the page tree in.
        if is_page_tree_node(object) {
            continue;
        }
        collect_references(object, &mut pending);
        single.objects.insert(id, object.clone());
    }

    let pages_id = (document.max_id + 1, 0);
    let catalog_id = (document.max_id + 2, 0);
    page.set("Parent", pages_id);
    single.objects.insert(page_id, Object::Dictionary(page));
    single.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    single.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    single.trailer.set("Root", catalog_id);
    single.max_id = catalog_id.0;

    single.renumber_objects();
    single.compress();
    Ok(single)
}

/// Value of `key` on the nearest ancestor of `page` that sets it.
fn inherited(document: &Document, page: &Dictionary, key: &str) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key.as_bytes()) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn is_page_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Page" || name == b"Pages")
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::Stream;

    /// Build a small PDF whose page `n` shows the text "Page n".
    fn sample_pdf(pages: u32) -> Document {
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

        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn splits_every_page_with_offset_numbering() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("book.pdf");
        sample_pdf(3).save(&source).unwrap();
        let out = tmp.path().join("pdf");
        std::fs::create_dir(&out).unwrap();

        let written = write_single_page_pdfs(&source, &out, 5).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["00000005.pdf", "00000006.pdf", "00000007.pdf"]);

        for path in &written {
            let single = Document::load(path).unwrap();
            assert_eq!(single.get_pages().len(), 1);
        }
    }

    fn page_content(doc: &Document) -> String {
        let page_id = *doc.get_pages().get(&1).unwrap();
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn kept_page_is_the_requested_one() {
        let doc = sample_pdf(3);
        let second = extract_page(&doc, doc.get_pages()[&2]).unwrap();
        assert_eq!(second.get_pages().len(), 1);
        let content = page_content(&second);
        assert!(content.contains("(Page 2)"), "got: {content}");
    }

    #[test]
    fn other_pages_are_not_copied() {
        let doc = sample_pdf(5);
        let third = extract_page(&doc, doc.get_pages()[&3]).unwrap();
        // page, its content stream, resources, font, pages node, catalog
        assert_eq!(third.objects.len(), 6);
        for object in third.objects.values() {
            if let Object::Stream(stream) = object {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let text = String::from_utf8_lossy(&data);
                assert!(!text.contains("(Page 1)") && !text.contains("(Page 4)"));
            }
        }
    }

    #[test]
    fn inherited_attributes_move_onto_the_page() {
        let doc = sample_pdf(2);
        let single = extract_page(&doc, doc.get_pages()[&1]).unwrap();
        let page_id = single.get_pages()[&1];
        let page = single.get_dictionary(page_id).unwrap();
        assert!(page.get(b"MediaBox").is_ok());
        let resources = page.get(b"Resources").and_then(Object::as_reference).unwrap();
        let fonts = single.get_dictionary(resources).unwrap().get(b"Font").unwrap();
        assert!(fonts.as_dict().unwrap().get(b"F1").is_ok());
    }

    #[test]
    fn unreadable_source_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("broken.pdf");
        std::fs::write(&source, b"not a pdf").unwrap();
        let err = write_single_page_pdfs(&source, tmp.path(), 1).unwrap_err();
        assert!(matches!(err, FulltextError::PdfRead { .. }));
    }
}
