//! Plain-text subjects and bodies handed to the notifier.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::reconcile::TrackedItem;

const SIGNATURE: &str = "Best,\nAgenda";

/// A message ready for the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub subject: String,
    pub body: String,
}

/// Human-readable local time, e.g. "Tuesday, March 17 at 01:30 PM".
pub fn format_slot(slot: DateTime<Utc>, tz: Tz) -> String {
    slot.with_timezone(&tz)
        .format("%A, %B %d at %I:%M %p")
        .to_string()
}

fn alternatives_text(alternatives: &[DateTime<Utc>], tz: Tz) -> String {
    if alternatives.is_empty() {
        return "I'll need to check my schedule for next week.".to_string();
    }
    let mut text = String::from("Here are a few alternative times that work for me:\n");
    for slot in alternatives {
        text.push_str(&format!("- {}\n", format_slot(*slot, tz)));
    }
    text
}

pub fn booked(start: DateTime<Utc>, tz: Tz, rescheduled: bool) -> Reply {
    let (subject, verb) = if rescheduled {
        ("Rescheduled", "moved our meeting to")
    } else {
        ("Confirmed", "booked our meeting for")
    };
    Reply {
        subject: subject.to_string(),
        body: format!("Hi,\n\nI've {} {}.\n\n{}", verb, format_slot(start, tz), SIGNATURE),
    }
}

pub fn declined(conflict: &str, alternatives: &[DateTime<Utc>], tz: Tz) -> Reply {
    Reply {
        subject: "Re: Meeting".to_string(),
        body: format!(
            "Hi,\n\nUnfortunately that time doesn't work, it clashes with '{}'.\n\n{}\n{}",
            conflict,
            alternatives_text(alternatives, tz),
            SIGNATURE
        ),
    }
}

pub fn unresolved(alternatives: &[DateTime<Utc>], tz: Tz) -> Reply {
    Reply {
        subject: "Re: Meeting".to_string(),
        body: format!(
            "Hi,\n\nI couldn't work out which time you had in mind.\n\n{}\n{}",
            alternatives_text(alternatives, tz),
            SIGNATURE
        ),
    }
}

pub fn cancelled() -> Reply {
    Reply {
        subject: "Meeting Cancelled".to_string(),
        body: format!("Hi,\n\nI've removed it from the calendar.\n\n{}", SIGNATURE),
    }
}

pub fn vanished(item: &TrackedItem, alternatives: &[DateTime<Utc>], tz: Tz) -> Reply {
    Reply {
        subject: format!("Rescheduling: {}", item.label),
        body: format!(
            "Hi,\n\nApologies, but I have had to move our meeting ('{}') originally scheduled for {}.\n\n{}\nPlease let me know if one of these works for you.\n\n{}",
            item.label,
            format_slot(item.start, tz),
            alternatives_text(alternatives, tz),
            SIGNATURE
        ),
    }
}
