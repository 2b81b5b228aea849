//! Per-post entity extraction and deduplication
//!
//! Title and body are tagged separately and merged into one mapping keyed by
//! the stored entity text. Body spans are inserted last and therefore win
//! type conflicts with the title; person names are reduced to their last
//! name before keying, so "Ivan Petrov" and "Petrov" are one entity.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{EntityType, NewEntity, Post, TaggedSpan};
use crate::nlp::EntityTagger;

/// Merge the tagged spans of a post's title and body.
///
/// The result holds exactly one span per distinct stored text. Order is
/// lexicographic by text, which callers must not rely on.
pub fn merge_post_entities(
    tagger: &dyn EntityTagger,
    title: &str,
    text: &str,
) -> Result<Vec<TaggedSpan>> {
    let mut merged: BTreeMap<String, EntityType> = BTreeMap::new();

    for span in tagger.extract(title)? {
        insert_span(&mut merged, span);
    }
    for span in tagger.extract(text)? {
        insert_span(&mut merged, span);
    }

    Ok(merged
        .into_iter()
        .map(|(text, entity_type)| TaggedSpan { text, entity_type })
        .collect())
}

fn insert_span(merged: &mut BTreeMap<String, EntityType>, span: TaggedSpan) {
    let key = span.entity_type.stored_text(span.text.trim());
    if !key.is_empty() {
        merged.insert(key, span.entity_type);
    }
}

/// Extract the deduplicated entities of every post.
///
/// Each entity is stamped with its post's stored timestamp, which keeps the
/// entity watermark comparable with `posts.date`. A tagger error aborts the
/// whole batch.
pub fn extract_entities(tagger: &dyn EntityTagger, posts: &[Post]) -> Result<Vec<NewEntity>> {
    let mut entities = Vec::new();
    for post in posts {
        let merged = merge_post_entities(tagger, &post.title, &post.text)?;
        entities.extend(merged.into_iter().map(|span| NewEntity {
            post_id: post.post_id,
            entity_type: span.entity_type,
            date: post.date,
            text: span.text,
        }));
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Tagger that answers from a fixed table
    struct TableTagger(HashMap<&'static str, Vec<TaggedSpan>>);

    impl EntityTagger for TableTagger {
        fn extract(&self, text: &str) -> Result<Vec<TaggedSpan>> {
            Ok(self.0.get(text).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_repeated_mentions_collapse() {
        let tagger = TableTagger(HashMap::from([
            ("title", vec![TaggedSpan::new("Moscow", EntityType::Location)]),
            (
                "body",
                vec![
                    TaggedSpan::new("Moscow", EntityType::Location),
                    TaggedSpan::new("Moscow", EntityType::Location),
                ],
            ),
        ]));

        let merged = merge_post_entities(&tagger, "title", "body").expect("merge");
        assert_eq!(merged, vec![TaggedSpan::new("Moscow", EntityType::Location)]);
    }

    #[test]
    fn test_last_type_wins_within_title() {
        let tagger = TableTagger(HashMap::from([(
            "title",
            vec![
                TaggedSpan::new("Apple", EntityType::Misc),
                TaggedSpan::new("Apple", EntityType::Organization),
            ],
        )]));

        let merged = merge_post_entities(&tagger, "title", "").expect("merge");
        assert_eq!(merged, vec![TaggedSpan::new("Apple", EntityType::Organization)]);
    }

    #[test]
    fn test_blank_spans_skipped() {
        let tagger = TableTagger(HashMap::from([(
            "title",
            vec![TaggedSpan::new("   ", EntityType::Person)],
        )]));

        assert!(merge_post_entities(&tagger, "title", "").expect("merge").is_empty());
    }
}
