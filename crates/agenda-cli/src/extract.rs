//! Offline request extractor driven by keywords.
//!
//! Stands in for the language-model collaborator when running from files. It
//! classifies intent by keyword, lifts a duration such as "45 minutes" or
//! "2 hours", and hands the engine the part of the body that looks like a
//! time ("tomorrow at 3pm", "Friday 12:30"). An explicit `When:` line wins.

use agenda_engine::collaborators::CollabResult;
use agenda_engine::{CollaboratorError, Extraction, Intent, MeetingCategory, RequestExtractor};
use chrono::{DateTime, Utc};

const SPAM_WORDS: &[&str] = &["unsubscribe", "lottery", "prize", "winner", "giveaway"];
const CANCEL_WORDS: &[&str] = &["cancel", "call off"];
const RESCHEDULE_WORDS: &[&str] = &["reschedule", "move", "push", "postpone"];
const TIME_ANCHORS: &[&str] = &[
    "today", "tomorrow", "next", "noon", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordExtractor;

impl RequestExtractor for KeywordExtractor {
    fn extract(&self, body: &str, _now: DateTime<Utc>) -> CollabResult<Extraction> {
        let text = body.trim();
        if text.is_empty() {
            return Err(CollaboratorError::Malformed("empty message body".to_string()));
        }
        let lower = text.to_lowercase();

        Ok(Extraction {
            intent: intent(&lower),
            time_phrase: time_phrase(text),
            duration_minutes: duration_minutes(&lower),
            category: Some(MeetingCategory::from_label(&lower)),
        })
    }
}

fn intent(lower: &str) -> Intent {
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(SPAM_WORDS) {
        Intent::Spam
    } else if has(CANCEL_WORDS) {
        Intent::Cancel
    } else if has(RESCHEDULE_WORDS) {
        Intent::Reschedule
    } else {
        Intent::Create
    }
}

fn time_phrase(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("when") && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }

    for sentence in text.split(['.', '?', '!', '\n']) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let Some(anchor) = words.iter().position(|w| is_anchor(w)) else {
            continue;
        };
        let phrase: Vec<&str> = words[anchor..]
            .iter()
            .copied()
            .take_while(|w| !w.eq_ignore_ascii_case("for"))
            .collect();
        return Some(phrase.join(" "));
    }
    None
}

fn is_anchor(word: &str) -> bool {
    let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    word.starts_with(|c: char| c.is_ascii_digit()) || TIME_ANCHORS.contains(&word.as_str())
}

fn duration_minutes(lower: &str) -> Option<u32> {
    if lower.contains("half an hour") {
        return Some(30);
    }
    let words: Vec<&str> = lower.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let unit = words.get(i + 1).copied().unwrap_or("");
        let unit = unit.trim_matches(|c: char| !c.is_alphabetic());
        let amount = match *word {
            "an" | "a" | "one" => Some(1),
            other => other.parse::<u32>().ok(),
        };
        let Some(amount) = amount else { continue };
        match unit {
            "min" | "mins" | "minute" | "minutes" => return Some(amount),
            "h" | "hr" | "hrs" | "hour" | "hours" => {
                if let Some(minutes) = amount.checked_mul(60) {
                    return Some(minutes);
                }
            }
            _ => {}
        }
    }
    None
}
