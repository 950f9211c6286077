//! In-process merging with `lopdf`.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;
use tracing::debug;

use super::PdfBackend;
use crate::error::{PdfPairError, Result};
use crate::io::{PdfReader, PdfWriter, format_file_size};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merges documents in memory and writes them with [`PdfWriter`].
#[derive(Debug, Clone, Default)]
pub struct LopdfBackend {
    reader: PdfReader,
    writer: PdfWriter,
}

impl LopdfBackend {
    /// Create a backend with default reader and writer settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PdfBackend for LopdfBackend {
    type Document = Document;

    fn name(&self) -> &str {
        "lopdf"
    }

    fn open(&self, path: &Path) -> Result<Document> {
        let loaded = self.reader.load(path)?;
        debug!(
            pages = loaded.page_count,
            elapsed_ms = loaded.load_time.as_millis() as u64,
            "opened {}",
            path.display()
        );
        Ok(loaded.document)
    }

    fn append(&self, target: &mut Document, mut source: Document) -> Result<()> {
        // Renumber objects to avoid ID conflicts
        source.renumber_objects_with(target.max_id + 1);

        let mut page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfPairError::unexpected("source document has no pages"));
        }

        let pages_id = pages_root(target)?;
        for page_id in &page_ids {
            flatten_inherited(&mut source, *page_id, pages_id)?;
        }

        target.max_id = target.max_id.max(source.max_id);
        target.objects.extend(source.objects);
        add_pages_to_tree(target, pages_id, &mut page_ids)
    }

    fn save(&self, mut document: Document, path: &Path) -> Result<()> {
        let stats = self.writer.save(&mut document, path)?;
        debug!(
            size = %format_file_size(stats.file_size),
            elapsed_ms = stats.write_time.as_millis() as u64,
            "saved {}",
            path.display()
        );
        Ok(())
    }
}

/// Object id of the root `Pages` node.
fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|e| PdfPairError::unexpected(format!("Failed to get pages reference: {e}")))
}

/// Copy inheritable attributes onto the page itself and re-parent it under
/// `new_parent`, so it keeps its appearance once detached from its old tree.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId, new_parent: ObjectId) -> Result<()> {
    let mut inherited = Dictionary::new();
    {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| PdfPairError::unexpected(format!("Failed to get page: {e}")))?;

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        // Bounded walk in case of a cyclic tree.
        for _ in 0..64 {
            let Some(node_id) = parent else { break };
            let Ok(node) = doc.get_dictionary(node_id) else {
                break;
            };
            for key in INHERITABLE {
                if !page.has(key) && !inherited.has(key) {
                    if let Ok(value) = node.get(key) {
                        inherited.set(key.to_vec(), value.clone());
                    }
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| PdfPairError::unexpected(format!("Failed to get page: {e}")))?;
    for (key, value) in inherited.into_iter() {
        page.set(key, value);
    }
    page.set("Parent", Object::Reference(new_parent));

    Ok(())
}

/// Add pages to the merged document's page tree.
fn add_pages_to_tree(
    merged: &mut Document,
    pages_id: ObjectId,
    page_ids: &mut Vec<ObjectId>,
) -> Result<()> {
    let pages_dict = merged
        .get_object_mut(pages_id)
        .map_err(|e| PdfPairError::unexpected(format!("Failed to get pages object: {e}")))?;

    let Object::Dictionary(dict) = pages_dict else {
        return Err(PdfPairError::unexpected("Pages object is not a dictionary"));
    };

    let kids = dict
        .get_mut(b"Kids")
        .map_err(|_| PdfPairError::unexpected("Pages dictionary missing Kids array"))?;
    let Object::Array(kids_array) = kids else {
        return Err(PdfPairError::unexpected("Kids is not an array"));
    };

    let added = page_ids.len() as i64;
    kids_array.extend(page_ids.drain(..).map(Object::Reference));

    let current_count = dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    dict.set("Count", Object::Integer(current_count + added));

    Ok(())
}
