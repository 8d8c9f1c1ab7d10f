//! Landmark and proximity-phrase extraction from free-text address fields.

use crate::corpus::Landmark;
use crate::domain::Address;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Landmark categories with the synonyms residents use for them.
pub const LANDMARK_TAXONOMY: &[(&str, &[&str])] = &[
    ("temple", &["temple", "mandir", "kovil", "devasthanam", "shrine"]),
    ("mosque", &["mosque", "masjid", "dargah"]),
    ("church", &["church", "chapel", "cathedral"]),
    ("school", &["school", "vidyalaya", "high school", "primary school"]),
    ("college", &["college", "university", "institute"]),
    ("hospital", &["hospital", "clinic", "medical", "dispensary"]),
    ("shop", &["shop", "store", "market", "bazaar", "stall"]),
    ("bank", &["bank", "atm"]),
    ("post_office", &["post office", "post", "po"]),
];

const PROXIMITY_PATTERNS: &[&str] = &[
    r"near\s+(\w+\s+\w+)",
    r"opp(?:osite)?\s+(\w+\s+\w+)",
    r"behind\s+(\w+\s+\w+)",
    r"next\s+to\s+(\w+\s+\w+)",
    r"beside\s+(\w+\s+\w+)",
];

const LANDMARK_POINTS: usize = 25;
const LANDMARK_CAP: usize = 50;
const PROXIMITY_POINTS: usize = 15;
const PROXIMITY_CAP: usize = 30;
const MATCH_POINTS: usize = 25;
const MATCH_CAP: usize = 50;

fn proximity_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PROXIMITY_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// A landmark mention extracted from address text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandmarkMention {
    pub category: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinguisticBreakdown {
    pub landmark_references: usize,
    pub proximity_patterns: usize,
    pub corpus_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinguisticAnalysis {
    pub score: f64,
    pub mentions: Vec<LandmarkMention>,
    pub proximity_phrases: usize,
    /// `category:name` of every corpus landmark the text refers to.
    pub matched_landmarks: Vec<String>,
    pub breakdown: LinguisticBreakdown,
}

/// Lowercased, space-joined free-text fields (empty fields dropped).
pub fn normalized_text(address: &Address) -> String {
    address
        .free_text()
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Finds every landmark mention: proximity phrases naming a category keyword
/// and standalone keywords.
pub fn extract_landmarks(text: &str) -> Vec<LandmarkMention> {
    let text = text.to_lowercase();
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut mentions = Vec::new();

    for (category, keywords) in LANDMARK_TAXONOMY {
        for keyword in keywords.iter() {
            if !text.contains(keyword) {
                continue;
            }

            for pattern in proximity_patterns() {
                for captures in pattern.captures_iter(&text) {
                    let phrase_contains_keyword = captures
                        .get(0)
                        .map(|whole| whole.as_str().contains(keyword))
                        .unwrap_or(false);
                    if let (true, Some(object)) = (phrase_contains_keyword, captures.get(1)) {
                        mentions.push(LandmarkMention {
                            category,
                            text: object.as_str().to_string(),
                        });
                    }
                }
            }

            if words.iter().any(|word| word.contains(keyword)) {
                mentions.push(LandmarkMention {
                    category,
                    text: keyword.to_string(),
                });
            }
        }
    }

    mentions
}

pub fn count_proximity_phrases(text: &str) -> usize {
    proximity_patterns()
        .iter()
        .map(|pattern| pattern.find_iter(text).count())
        .sum()
}

/// Cross-references text against the cell's landmark corpus. A landmark
/// matches when its full name appears, or any word of its name longer than
/// three characters does.
pub fn match_corpus_landmarks(text: &str, landmarks: &[Landmark]) -> Vec<String> {
    landmarks
        .iter()
        .filter(|landmark| {
            text.contains(landmark.name.as_str())
                || landmark
                    .name
                    .split_whitespace()
                    .any(|part| part.chars().count() > 3 && text.contains(part))
        })
        .map(|landmark| format!("{}:{}", landmark.kind, landmark.name))
        .collect()
}

pub fn analyze(address: &Address, landmarks: &[Landmark]) -> LinguisticAnalysis {
    let text = normalized_text(address);
    let mentions = extract_landmarks(&text);
    let proximity_phrases = count_proximity_phrases(&text);
    let matched_landmarks = match_corpus_landmarks(&text, landmarks);

    let landmark_points = (mentions.len() * LANDMARK_POINTS).min(LANDMARK_CAP);
    let proximity_points = (proximity_phrases * PROXIMITY_POINTS).min(PROXIMITY_CAP);
    let match_points = (matched_landmarks.len() * MATCH_POINTS).min(MATCH_CAP);
    let score = (landmark_points + proximity_points + match_points).min(100) as f64;

    LinguisticAnalysis {
        score,
        breakdown: LinguisticBreakdown {
            landmark_references: landmark_points,
            proximity_patterns: proximity_points,
            corpus_matches: match_points,
        },
        mentions,
        proximity_phrases,
        matched_landmarks,
    }
}
