use std::collections::BTreeSet;

use super::{ValidationLevel, ValidationVerdict, VerdictBuilder};
use crate::documents::EmbeddedDocument;

/// Score a batch of embedded documents
///
/// Zero vectors are warnings. Mixed dimensionality is a hard error at every
/// level.
pub fn validate_embeddings(documents: &[EmbeddedDocument], level: ValidationLevel) -> ValidationVerdict {
    let mut verdict = VerdictBuilder::new(level);
    let mut dimensions = BTreeSet::new();

    for (idx, doc) in documents.iter().enumerate() {
        if doc.embedding.is_empty() {
            verdict.item(false);
            verdict.error(format!("Document {} ({}) has empty embedding", idx, doc.doc_type()));
            continue;
        }
        if doc.embedding.iter().any(|x| !x.is_finite()) {
            verdict.item(false);
            verdict.error(format!(
                "Document {} ({}) has non-finite embedding values",
                idx,
                doc.doc_type()
            ));
            continue;
        }
        if doc.is_dummy() {
            verdict.warning(format!(
                "Document {} ({}) has dummy embedding (all zeros)",
                idx,
                doc.doc_type()
            ));
        }
        dimensions.insert(doc.embedding.len());
        verdict.item(true);
    }

    if dimensions.len() > 1 {
        verdict.hard_error(format!("Inconsistent embedding dimensions: {:?}", dimensions));
    }

    verdict.finish()
}
