use std::collections::HashSet;

use regex::Regex;
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;
use whatlang::{detect, Lang};

use crate::error::{DashboardError, Result};
use crate::models::{EntityType, TaggedSpan};

/// Named-entity recognizer port.
///
/// Implementations must be pure from the caller's point of view: the same
/// text always yields the same spans.
pub trait EntityTagger: Send + Sync {
    /// Tag `text`, returning normalized spans in reading order
    fn extract(&self, text: &str) -> Result<Vec<TaggedSpan>>;
}

const ORGANIZATION_MARKERS: &[&str] = &[
    "inc", "ltd", "llc", "corp", "corporation", "company", "bank", "group", "university",
    "ministry", "party", "agency", "council", "committee", "foundation", "ооо", "пао", "оао",
    "ао", "банк", "министерство", "университет", "партия", "агентство", "компания", "совет",
    "комитет", "фонд", "госдума",
];

const LOCATION_MARKERS: &[&str] = &[
    "city", "river", "street", "republic", "region", "oblast", "county", "область", "край",
    "город", "республика", "улица", "район",
];

const LOCATIVE_PREPOSITIONS: &[&str] = &[
    "in", "at", "from", "near", "across", "в", "во", "из", "на", "под", "около",
];

const PERSON_TITLES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "president", "minister", "mayor", "governor", "ceo", "senator",
    "президент", "министр", "глава", "губернатор", "мэр", "депутат", "господин",
];

/// Rule-based tagger for English and Russian news text.
///
/// Runs of capitalized words become spans; the span's neighbourhood and
/// marker words decide its category.
pub struct RuleBasedTagger {
    max_text_length: usize,
    url_regex: Regex,
    emoji_regex: Regex,
    token_regex: Regex,
    english_stopwords: HashSet<String>,
    russian_stopwords: HashSet<String>,
}

impl RuleBasedTagger {
    /// Create a tagger that reads at most `max_text_length` characters per text
    pub fn new(max_text_length: usize) -> Result<Self> {
        let url_regex = Regex::new(r"https?://\S+|www\.\S+")
            .map_err(|e| DashboardError::Tagger(format!("Failed to compile URL regex: {e}")))?;
        let emoji_regex = Regex::new(r"\p{Extended_Pictographic}")
            .map_err(|e| DashboardError::Tagger(format!("Failed to compile emoji regex: {e}")))?;
        // Words (with inner apostrophes, hyphens and ampersands) or single punctuation marks
        let token_regex = Regex::new(r"[\p{L}\p{N}]+(?:['’\-&][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]")
            .map_err(|e| DashboardError::Tagger(format!("Failed to compile token regex: {e}")))?;

        let english_stopwords: HashSet<String> = get(LANGUAGE::English)
            .iter()
            .map(ToString::to_string)
            .collect();
        let russian_stopwords: HashSet<String> = get(LANGUAGE::Russian)
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(Self {
            max_text_length,
            url_regex,
            emoji_regex,
            token_regex,
            english_stopwords,
            russian_stopwords,
        })
    }

    /// Normalize Unicode, drop URLs and emoji, and cap the length
    #[must_use]
    pub fn clean_text(&self, text: &str) -> String {
        let normalized: String = text.nfc().take(self.max_text_length).collect();
        let no_urls = self.url_regex.replace_all(&normalized, " ");
        self.emoji_regex.replace_all(&no_urls, " ").into_owned()
    }

    fn is_stopword(&self, lang: Option<Lang>, word: &str) -> bool {
        let lower = word.to_lowercase();
        match lang {
            Some(Lang::Eng) => self.english_stopwords.contains(&lower),
            Some(Lang::Rus) => self.russian_stopwords.contains(&lower),
            _ => self.english_stopwords.contains(&lower) || self.russian_stopwords.contains(&lower),
        }
    }

    fn classify(words: &[&str], preceding: Option<&str>) -> EntityType {
        let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let preceding = preceding.map(str::to_lowercase);
        let preceding = preceding.as_deref();

        if lowered.iter().any(|w| ORGANIZATION_MARKERS.contains(&w.as_str()))
            || (words.len() == 1 && is_acronym(words[0]))
        {
            return EntityType::Organization;
        }

        if preceding.is_some_and(|p| LOCATIVE_PREPOSITIONS.contains(&p))
            || lowered.iter().any(|w| LOCATION_MARKERS.contains(&w.as_str()))
        {
            return EntityType::Location;
        }

        if preceding.is_some_and(|p| PERSON_TITLES.contains(&p))
            || ((2..=3).contains(&words.len()) && words.iter().all(|w| is_title_case(w)))
        {
            return EntityType::Person;
        }

        EntityType::Misc
    }
}

impl EntityTagger for RuleBasedTagger {
    fn extract(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        let cleaned = self.clean_text(text);
        let lang = detect(&cleaned).map(|info| info.lang());
        let tokens: Vec<&str> = self.token_regex.find_iter(&cleaned).map(|m| m.as_str()).collect();

        let mut spans = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if !is_capitalized(tokens[i]) {
                i += 1;
                continue;
            }

            let run_start = i;
            while i < tokens.len() && is_capitalized(tokens[i]) {
                i += 1;
            }

            // "The", "In" and friends open sentences, not names
            let mut start = run_start;
            while start < i && self.is_stopword(lang, tokens[start]) {
                start += 1;
            }
            if start == i {
                continue;
            }

            // "President Putin": the title is a cue, not part of the name
            if i - start > 1 && PERSON_TITLES.contains(&tokens[start].to_lowercase().as_str()) {
                start += 1;
            }

            let words = &tokens[start..i];
            let preceding = start.checked_sub(1).map(|p| tokens[p]);
            spans.push(TaggedSpan::new(
                words.join(" "),
                Self::classify(words, preceding),
            ));
        }

        Ok(spans)
    }
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

fn is_title_case(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(char::is_uppercase)
        && chars.all(|c| !c.is_alphabetic() || c.is_lowercase())
}

fn is_acronym(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> RuleBasedTagger {
        RuleBasedTagger::new(10_000).expect("Failed to create tagger")
    }

    #[test]
    fn test_clean_text() {
        let tagger = tagger();

        let cleaned = tagger.clean_text("Read https://example.com now 😍");
        assert!(!cleaned.contains("https://"));
        assert!(!cleaned.contains('😍'));
        assert!(cleaned.contains("Read"));
    }

    #[test]
    fn test_clean_text_truncates() {
        let tagger = RuleBasedTagger::new(5).expect("Failed to create tagger");
        assert_eq!(tagger.clean_text("Москва и мир"), "Москв");
    }

    #[test]
    fn test_person_by_full_name() {
        let spans = tagger().extract("reports say Ivan Petrov opened a store").expect("extract");
        assert!(spans.contains(&TaggedSpan::new("Ivan Petrov", EntityType::Person)));
    }

    #[test]
    fn test_location_after_preposition() {
        let spans = tagger().extract("The office opened in Kazan last week").expect("extract");
        assert!(spans.contains(&TaggedSpan::new("Kazan", EntityType::Location)));
    }

    #[test]
    fn test_organization_markers_and_acronyms() {
        let spans = tagger()
            .extract("Shares of Tinkoff Bank fell after NASA announced delays")
            .expect("extract");
        assert!(spans.contains(&TaggedSpan::new("Tinkoff Bank", EntityType::Organization)));
        assert!(spans.contains(&TaggedSpan::new("NASA", EntityType::Organization)));
    }

    #[test]
    fn test_russian_text() {
        let spans = tagger()
            .extract("Президент Путин провел встречу в Москве с главой Сбербанка")
            .expect("extract");
        assert!(spans.contains(&TaggedSpan::new("Москве", EntityType::Location)));
        assert!(spans.contains(&TaggedSpan::new("Путин", EntityType::Person)));
    }

    #[test]
    fn test_leading_stopwords_dropped() {
        let spans = tagger().extract("The Guardian reported it").expect("extract");
        assert!(spans.iter().all(|s| !s.text.starts_with("The")));
        assert!(spans.iter().any(|s| s.text == "Guardian"));
    }

    #[test]
    fn test_no_entities() {
        let spans = tagger().extract("nothing capitalized here at all").expect("extract");
        assert!(spans.is_empty());
        assert!(tagger().extract("").expect("extract").is_empty());
    }
}
