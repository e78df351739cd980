//! Deterministic intent routing
//!
//! Known commands are answered from the structured dashboard context without
//! touching the language model. Matching is case-insensitive substring
//! search against an ordered phrase table; the first hit wins. Every
//! response branch degrades to an explicit "data unavailable" sentence when
//! the backing field is absent.

use serde::Serialize;

use crate::context::{Brief, TimelineEvent};

/// A deterministically resolvable command category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKey {
    Status,
    PeopleCount,
    NearestPerson,
    RestrictedObjects,
    LastEvent,
}

/// Ordered intent table; entries and phrases are checked in this order
const INTENT_TABLE: &[(IntentKey, &[&str])] = &[
    (
        IntentKey::Status,
        &["status", "situation", "what's happening", "whats happening", "everything ok", "all clear"],
    ),
    (
        IntentKey::PeopleCount,
        &["how many people", "people count", "anyone there", "anybody there", "who is there"],
    ),
    (
        IntentKey::NearestPerson,
        &["nearest person", "closest person", "how close", "how far"],
    ),
    (
        IntentKey::RestrictedObjects,
        &["weapon", "knife", "dangerous", "restricted object", "anything dangerous"],
    ),
    (
        IntentKey::LastEvent,
        &["last event", "latest event", "recent event", "what happened"],
    ),
];

/// Match a command against the intent table
///
/// Case and surrounding whitespace are ignored. Returns `None` when no
/// phrase is contained in the command, sending the caller to the LLM path.
#[must_use]
pub fn match_intent(command: &str) -> Option<IntentKey> {
    let normalized = command.trim().to_lowercase();

    for (key, phrases) in INTENT_TABLE {
        for phrase in *phrases {
            if normalized.contains(phrase) {
                tracing::debug!(intent = ?key, phrase, "intent matched");
                return Some(*key);
            }
        }
    }

    None
}

/// Render the templated answer for a matched intent
///
/// Never fails: absent or malformed context fields produce an explicit
/// spoken fallback instead.
#[must_use]
pub fn build_response(
    intent: IntentKey,
    brief: Option<&Brief>,
    event: Option<&TimelineEvent>,
) -> String {
    match intent {
        IntentKey::Status => status_response(brief),
        IntentKey::PeopleCount => people_count_response(brief),
        IntentKey::NearestPerson => nearest_person_response(brief),
        IntentKey::RestrictedObjects => restricted_objects_response(brief),
        IntentKey::LastEvent => last_event_response(brief, event),
    }
}

fn status_response(brief: Option<&Brief>) -> String {
    let Some(brief) = brief else {
        return "Status data is unavailable right now.".to_string();
    };

    let level = brief.alert_level.as_deref().unwrap_or("unknown");
    let mut response = match brief.risk_score {
        Some(score) => format!("Alert level is {level} with a risk score of {score:.0}."),
        None => format!("Alert level is {level}."),
    };

    if let Some(count) = brief.person_count {
        let noun = if count == 1 { "person" } else { "people" };
        response.push_str(&format!(" {count} {noun} in view."));
    }

    response
}

fn people_count_response(brief: Option<&Brief>) -> String {
    match brief.and_then(|b| b.person_count) {
        Some(0) => "No people are currently in view.".to_string(),
        Some(1) => "There is one person in view.".to_string(),
        Some(count) => format!("There are {count} people in view."),
        None => "People count is unavailable right now.".to_string(),
    }
}

fn nearest_person_response(brief: Option<&Brief>) -> String {
    match brief.and_then(|b| b.nearest_person_m) {
        Some(distance) => format!("The nearest person is {distance:.2} meters away."),
        None => "No person is in range right now.".to_string(),
    }
}

fn restricted_objects_response(brief: Option<&Brief>) -> String {
    let Some(brief) = brief else {
        return "Object data is unavailable right now.".to_string();
    };

    if brief.objects_of_interest.is_empty() {
        "No restricted objects are in view.".to_string()
    } else {
        format!(
            "Restricted objects in view: {}.",
            brief.objects_of_interest.join(", ")
        )
    }
}

fn last_event_response(brief: Option<&Brief>, event: Option<&TimelineEvent>) -> String {
    if let Some(message) = event.and_then(|e| e.message.as_deref()) {
        return format!("The most recent event: {message}.");
    }

    match brief.and_then(|b| b.last_event.as_deref()) {
        Some(message) => format!("The most recent event: {message}."),
        None => "No recent events are on record.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_case_and_whitespace_insensitive() {
        assert_eq!(match_intent("What's the STATUS"), Some(IntentKey::Status));
        assert_eq!(match_intent("  how many PEOPLE are there  "), Some(IntentKey::PeopleCount));
        assert_eq!(match_intent("where is the NEAREST PERSON"), Some(IntentKey::NearestPerson));
        assert_eq!(match_intent("do you see a knife"), Some(IntentKey::RestrictedObjects));
        assert_eq!(match_intent("what happened today"), Some(IntentKey::LastEvent));
    }

    #[test]
    fn unknown_commands_fall_through() {
        assert_eq!(match_intent("tell me a joke"), None);
        assert_eq!(match_intent(""), None);
    }

    #[test]
    fn table_order_decides_ties() {
        // "status" appears before the last_event phrases, so a command
        // containing both resolves to Status
        assert_eq!(
            match_intent("status of what happened"),
            Some(IntentKey::Status)
        );
    }

    #[test]
    fn nearest_person_formats_two_decimals() {
        let brief = Brief {
            nearest_person_m: Some(2.5),
            ..Brief::default()
        };
        let response = build_response(IntentKey::NearestPerson, Some(&brief), None);
        assert!(response.contains("2.50 meters"));
    }

    #[test]
    fn nearest_person_absent_degrades() {
        let response = build_response(IntentKey::NearestPerson, Some(&Brief::default()), None);
        assert!(response.contains("No person is in range"));

        let response = build_response(IntentKey::NearestPerson, None, None);
        assert!(response.contains("No person is in range"));
    }

    #[test]
    fn status_with_full_brief() {
        let brief = Brief {
            alert_level: Some("elevated".to_string()),
            risk_score: Some(47.0),
            person_count: Some(3),
            ..Brief::default()
        };
        let response = build_response(IntentKey::Status, Some(&brief), None);
        assert!(response.contains("elevated"));
        assert!(response.contains("47"));
        assert!(response.contains("3 people"));
    }

    #[test]
    fn status_without_brief_degrades() {
        let response = build_response(IntentKey::Status, None, None);
        assert!(response.contains("unavailable"));
    }

    #[test]
    fn people_count_singular_plural() {
        let one = Brief { person_count: Some(1), ..Brief::default() };
        assert!(build_response(IntentKey::PeopleCount, Some(&one), None).contains("one person"));

        let none = Brief { person_count: Some(0), ..Brief::default() };
        assert!(build_response(IntentKey::PeopleCount, Some(&none), None).contains("No people"));

        assert!(build_response(IntentKey::PeopleCount, None, None).contains("unavailable"));
    }

    #[test]
    fn restricted_objects_lists_labels() {
        let brief = Brief {
            objects_of_interest: vec!["knife".to_string(), "scissors".to_string()],
            ..Brief::default()
        };
        let response = build_response(IntentKey::RestrictedObjects, Some(&brief), None);
        assert!(response.contains("knife, scissors"));

        let empty = build_response(IntentKey::RestrictedObjects, Some(&Brief::default()), None);
        assert!(empty.contains("No restricted objects"));
    }

    #[test]
    fn last_event_prefers_event_feed() {
        let brief = Brief {
            last_event: Some("from brief".to_string()),
            ..Brief::default()
        };
        let event = TimelineEvent {
            message: Some("from feed".to_string()),
        };

        let response = build_response(IntentKey::LastEvent, Some(&brief), Some(&event));
        assert!(response.contains("from feed"));

        let response = build_response(IntentKey::LastEvent, Some(&brief), None);
        assert!(response.contains("from brief"));

        let response = build_response(IntentKey::LastEvent, None, None);
        assert!(response.contains("No recent events"));
    }
}
