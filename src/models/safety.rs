//! Safety form models.
//!
//! Forms are filled in by technicians in the field; the client only views
//! them. Answers come back as free-form question/answer pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyForm {
    pub id: i64,
    pub title: String,
    #[serde(rename = "submittedBy")]
    pub submitted_by: Option<String>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(rename = "serviceOrderNumber")]
    pub service_order_number: Option<String>,
    #[serde(default)]
    pub answers: Vec<SafetyAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAnswer {
    pub question: String,
    pub answer: Option<String>,
}

impl SafetyForm {
    pub fn submitted_display(&self) -> String {
        let who = self.submitted_by.as_deref().unwrap_or("unknown");
        match self.submitted_at {
            Some(at) => format!("{} on {}", who, at.format("%b %d, %Y")),
            None => who.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_safety_form() {
        let json = r#"{
            "id": 9,
            "title": "Confined space entry checklist",
            "submittedBy": "jo@example.com",
            "submittedAt": "2024-11-01T08:15:00Z",
            "serviceOrderNumber": "OS-2024-0117",
            "answers": [
                {"question": "Gas test performed?", "answer": "yes"},
                {"question": "Observer assigned?", "answer": null}
            ]
        }"#;
        let form: SafetyForm = serde_json::from_str(json).expect("Failed to parse safety form");
        assert_eq!(form.answers.len(), 2);
        assert_eq!(form.submitted_display(), "jo@example.com on Nov 01, 2024");
    }
}
