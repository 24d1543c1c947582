//! Read-only presentation of a finished consultation.

use crate::session::{Report, ReportField, SessionDetail};
use chrono::{DateTime, Utc};
use std::fmt;

const MISSING: &str = "N/A";
const NO_NOTES: &str = "No notes available";

/// A consultation and its report with every display fallback applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportView {
    pub specialist: String,
    pub consulted: String,
    pub user: String,
    pub agent: String,
    pub notes: String,
    pub summary: String,
    pub symptoms: String,
    pub duration: String,
    pub severity: String,
    pub medications: String,
    pub recommendations: String,
}

impl ReportView {
    pub fn new(detail: &SessionDetail, now: DateTime<Utc>) -> Self {
        let empty = Report::default();
        let report = detail.report.as_ref().unwrap_or(&empty);

        Self {
            specialist: detail.selected_doctor.specialist.clone(),
            consulted: time_ago(detail.created_on, now),
            user: field_or_missing(report.user.as_ref()),
            agent: field_or_missing(report.agent.as_ref()),
            notes: detail
                .notes
                .clone()
                .unwrap_or_else(|| NO_NOTES.to_string()),
            summary: field_or_missing(report.summary.as_ref()),
            symptoms: field_or_missing(report.symptoms.as_ref()),
            duration: field_or_missing(report.duration.as_ref()),
            severity: field_or_missing(report.severity.as_ref()),
            medications: field_or_missing(report.medications_mentioned.as_ref()),
            recommendations: field_or_missing(report.recommendations.as_ref()),
        }
    }
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Medical AI Voice Assistant Report")?;
        writeln!(f)?;
        writeln!(f, "Session Info:")?;
        writeln!(f, "  Doctor Specialization: {}", self.specialist)?;
        writeln!(f, "  Consulted Date: {}", self.consulted)?;
        writeln!(f, "  User: {}", self.user)?;
        writeln!(f, "  Agent: {}", self.agent)?;
        writeln!(f)?;
        writeln!(f, "Report:\n  {}", self.notes)?;
        writeln!(f, "Summary:\n  {}", self.summary)?;
        writeln!(f, "Symptoms:\n  {}", self.symptoms)?;
        writeln!(f, "Duration: {}", self.duration)?;
        writeln!(f, "Severity: {}", self.severity)?;
        writeln!(f, "Medications Mentioned:\n  {}", self.medications)?;
        write!(f, "Recommendations:\n  {}", self.recommendations)
    }
}

fn field_or_missing(value: Option<&ReportField>) -> String {
    value
        .map(ReportField::display)
        .unwrap_or_else(|| MISSING.to_string())
}

/// Humanized distance from `then` to `now`, e.g. "3 hours ago".
///
/// Buckets follow the usual relative-time thresholds: 45 seconds, 45 minutes,
/// 22 hours, 26 days, 11 months.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    let minutes = (seconds as f64 / 60.0).round() as i64;
    let hours = (seconds as f64 / 3600.0).round() as i64;
    let days = (seconds as f64 / 86_400.0).round() as i64;
    let months = (days as f64 / 30.4).round() as i64;
    let years = (days as f64 / 365.0).round() as i64;

    match seconds {
        s if s < 45 => "a few seconds ago".to_string(),
        s if s < 90 => "a minute ago".to_string(),
        s if s < 45 * 60 => format!("{} minutes ago", minutes),
        s if s < 90 * 60 => "an hour ago".to_string(),
        s if s < 22 * 3600 => format!("{} hours ago", hours),
        s if s < 36 * 3600 => "a day ago".to_string(),
        _ if days < 26 => format!("{} days ago", days),
        _ if days < 45 => "a month ago".to_string(),
        _ if days < 320 => format!("{} months ago", months),
        _ if days < 548 => "a year ago".to_string(),
        _ => format!("{} years ago", years),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DoctorAgent;
    use chrono::Duration;

    fn detail(report: Option<Report>) -> SessionDetail {
        SessionDetail {
            id: 3,
            notes: None,
            session_id: "abc-123".to_string(),
            selected_doctor: DoctorAgent {
                id: 4,
                specialist: "Dermatologist".to_string(),
                description: String::new(),
                image: "/doctor4.png".to_string(),
                agent_prompt: None,
                voice_id: None,
            },
            created_on: "2025-03-01T10:00:00Z".parse().unwrap(),
            created_by: None,
            report,
        }
    }

    #[test]
    fn test_missing_report_falls_back_everywhere() {
        let d = detail(None);
        let view = ReportView::new(&d, d.created_on + Duration::hours(3));

        assert_eq!(view.specialist, "Dermatologist");
        assert_eq!(view.consulted, "3 hours ago");
        assert_eq!(view.notes, "No notes available");
        assert_eq!(view.summary, "N/A");
        assert_eq!(view.symptoms, "N/A");
        assert_eq!(view.recommendations, "N/A");
    }

    #[test]
    fn test_list_fields_are_comma_joined() {
        let report = Report {
            summary: Some(ReportField::from("Mild eczema")),
            symptoms: Some(ReportField::List(vec![
                ReportField::from("itching"),
                ReportField::from("dry skin"),
            ])),
            medications_mentioned: Some(ReportField::from("hydrocortisone")),
            ..Report::default()
        };
        let d = detail(Some(report));

        let view = ReportView::new(&d, d.created_on);

        assert_eq!(view.summary, "Mild eczema");
        assert_eq!(view.symptoms, "itching, dry skin");
        assert_eq!(view.medications, "hydrocortisone");
        assert_eq!(view.severity, "N/A");
        assert!(view.to_string().contains("Symptoms:\n  itching, dry skin"));
    }

    #[test]
    fn test_generated_report_with_numbers_and_lists_renders() {
        let report: Report = serde_json::from_value(serde_json::json!({
            "summary": "Tension headache",
            "duration": 3,
            "severity": ["moderate", "recurring"],
        }))
        .unwrap();
        let d = detail(Some(report));

        let view = ReportView::new(&d, d.created_on);

        assert_eq!(view.duration, "3");
        assert_eq!(view.severity, "moderate, recurring");
        assert!(view.to_string().contains("Duration: 3"));
    }

    #[test]
    fn test_time_ago_buckets() {
        let then: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();

        assert_eq!(time_ago(then, then + Duration::seconds(10)), "a few seconds ago");
        assert_eq!(time_ago(then, then + Duration::seconds(60)), "a minute ago");
        assert_eq!(time_ago(then, then + Duration::minutes(5)), "5 minutes ago");
        assert_eq!(time_ago(then, then + Duration::minutes(60)), "an hour ago");
        assert_eq!(time_ago(then, then + Duration::hours(30)), "a day ago");
        assert_eq!(time_ago(then, then + Duration::days(10)), "10 days ago");
        assert_eq!(time_ago(then, then + Duration::days(30)), "a month ago");
        assert_eq!(time_ago(then, then + Duration::days(91)), "3 months ago");
        assert_eq!(time_ago(then, then + Duration::days(400)), "a year ago");
        assert_eq!(time_ago(then, then + Duration::days(800)), "2 years ago");
    }
}
