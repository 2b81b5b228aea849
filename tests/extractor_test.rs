mod common;

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use common::{at, post};
use news_dashboard::error::Result;
use news_dashboard::extractor::{extract_entities, merge_post_entities};
use news_dashboard::models::{EntityType, TaggedSpan};
use news_dashboard::nlp::EntityTagger;

/// Answers with a fixed span list per input text
struct ScriptedTagger(HashMap<String, Vec<TaggedSpan>>);

impl ScriptedTagger {
    fn new(script: &[(&str, Vec<TaggedSpan>)]) -> Self {
        Self(
            script
                .iter()
                .map(|(text, spans)| ((*text).to_string(), spans.clone()))
                .collect(),
        )
    }
}

impl EntityTagger for ScriptedTagger {
    fn extract(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        Ok(self.0.get(text).cloned().unwrap_or_default())
    }
}

#[test]
fn test_full_name_and_last_name_collapse() {
    let tagger = ScriptedTagger::new(&[
        (
            "Ivan Petrov visits Kazan",
            vec![
                TaggedSpan::new("Ivan Petrov", EntityType::Person),
                TaggedSpan::new("Kazan", EntityType::Location),
            ],
        ),
        (
            "Petrov praised Kazan",
            vec![
                TaggedSpan::new("Petrov", EntityType::Person),
                TaggedSpan::new("Kazan", EntityType::Location),
            ],
        ),
    ]);

    let mut merged =
        merge_post_entities(&tagger, "Ivan Petrov visits Kazan", "Petrov praised Kazan")
            .expect("merge");
    merged.sort_by(|a, b| a.text.cmp(&b.text));

    assert_eq!(
        merged,
        vec![
            TaggedSpan::new("Kazan", EntityType::Location),
            TaggedSpan::new("Petrov", EntityType::Person),
        ]
    );
}

#[test]
fn test_body_type_overrides_title_type() {
    let tagger = ScriptedTagger::new(&[
        ("Apple news", vec![TaggedSpan::new("Apple", EntityType::Misc)]),
        ("Apple shares rose", vec![TaggedSpan::new("Apple", EntityType::Organization)]),
    ]);

    let merged = merge_post_entities(&tagger, "Apple news", "Apple shares rose").expect("merge");
    assert_eq!(merged, vec![TaggedSpan::new("Apple", EntityType::Organization)]);
}

#[test]
fn test_extract_entities_stamps_post_fields() {
    let tagger = ScriptedTagger::new(&[("Kazan", vec![TaggedSpan::new("Kazan", EntityType::Location)])]);
    let posts = vec![
        post(10, "news", at(5, 8), "Kazan", ""),
        post(11, "news", at(6, 8), "", "no entities"),
    ];

    let entities = extract_entities(&tagger, &posts).expect("extract");
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].post_id, 10);
    assert_eq!(entities[0].date, at(5, 8));
    assert_eq!(entities[0].text, "Kazan");
}

fn span_strategy() -> impl Strategy<Value = TaggedSpan> {
    let texts = prop::sample::select(vec![
        "Moscow",
        "Kazan",
        "Ivan Petrov",
        "Petrov",
        "Anna Petrova",
        "Tinkoff Bank",
    ]);
    let types = prop::sample::select(EntityType::ALL.to_vec());
    (texts, types).prop_map(|(text, entity_type)| TaggedSpan::new(text, entity_type))
}

proptest! {
    #[test]
    fn prop_merge_is_deduplicated_and_body_wins(
        title_spans in prop::collection::vec(span_strategy(), 0..8),
        body_spans in prop::collection::vec(span_strategy(), 0..8),
    ) {
        let tagger = ScriptedTagger::new(&[
            ("title", title_spans.clone()),
            ("body", body_spans.clone()),
        ]);
        let merged = merge_post_entities(&tagger, "title", "body").expect("merge");

        let keys: HashSet<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(keys.len(), merged.len());

        // Expected type per key: last body occurrence, else last title occurrence
        let mut expected: HashMap<String, EntityType> = HashMap::new();
        for span in title_spans.iter().chain(body_spans.iter()) {
            expected.insert(span.entity_type.stored_text(&span.text), span.entity_type);
        }
        prop_assert_eq!(merged.len(), expected.len());
        for span in &merged {
            prop_assert_eq!(Some(&span.entity_type), expected.get(&span.text));
        }
    }

    #[test]
    fn prop_merge_is_deterministic(
        spans in prop::collection::vec(span_strategy(), 0..8),
    ) {
        let tagger = ScriptedTagger::new(&[("title", spans.clone()), ("body", spans)]);
        let first = merge_post_entities(&tagger, "title", "body").expect("merge");
        let second = merge_post_entities(&tagger, "title", "body").expect("merge");
        prop_assert_eq!(first, second);
    }
}
