//! Metadata narrowing between loading and chunking

use crate::types::document::{Document, Metadata, PAGE_LABEL_KEY, SOURCE_KEY};

/// Keep only `source` and `page_label`; text, length and order are unchanged
pub fn filter_to_minimal_docs(docs: &[Document]) -> Vec<Document> {
    docs.iter()
        .map(|doc| {
            let metadata: Metadata = [SOURCE_KEY, PAGE_LABEL_KEY]
                .into_iter()
                .map(|key| {
                    let value = doc.metadata.get(key).cloned().unwrap_or_default();
                    (key.to_string(), value)
                })
                .collect();
            Document::new(doc.page_content.clone(), metadata)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::{PAGE_KEY, TOTAL_PAGES_KEY};

    #[test]
    fn test_keeps_only_source_and_page_label() {
        let docs = vec![
            Document::new(
                "first",
                Metadata::from([
                    (SOURCE_KEY.to_string(), "/data/a.pdf".to_string()),
                    (PAGE_LABEL_KEY.to_string(), "i".to_string()),
                    (PAGE_KEY.to_string(), "0".to_string()),
                    (TOTAL_PAGES_KEY.to_string(), "2".to_string()),
                    ("producer".to_string(), "Writer".to_string()),
                ]),
            ),
            Document::new("second", Metadata::new()),
        ];

        let filtered = filter_to_minimal_docs(&docs);

        assert_eq!(filtered.len(), docs.len());
        for (out, input) in filtered.iter().zip(&docs) {
            assert_eq!(out.page_content, input.page_content);
            let keys: Vec<&str> = out.metadata.keys().map(String::as_str).collect();
            assert_eq!(keys, vec![PAGE_LABEL_KEY, SOURCE_KEY]);
        }
        assert_eq!(filtered[0].source(), Some("/data/a.pdf"));
        assert_eq!(filtered[0].page_label(), Some("i"));
        assert_eq!(filtered[1].source(), Some(""));
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_to_minimal_docs(&[]).is_empty());
    }
}
