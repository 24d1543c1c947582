use chrono::{DateTime, Utc};
use medvoice_core::session::{NewSession, Report, SessionDetail};

/// In-memory session records, in creation order.
#[derive(Debug)]
pub struct SessionStore {
    records: Vec<SessionDetail>,
    next_id: i64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Stores a new record under a fresh session id.
    pub fn create(
        &mut self,
        request: NewSession,
        created_by: Option<String>,
        now: DateTime<Utc>,
    ) -> SessionDetail {
        let record = SessionDetail {
            id: self.next_id,
            notes: Some(request.notes),
            session_id: uuid::Uuid::new_v4().to_string(),
            selected_doctor: request.selected_doctor,
            created_on: now,
            created_by,
            report: None,
        };
        self.next_id += 1;
        self.records.push(record.clone());
        record
    }

    /// The newest record with this session id.
    pub fn find(&self, session_id: &str) -> Option<&SessionDetail> {
        self.records
            .iter()
            .rev()
            .find(|record| record.session_id == session_id)
    }

    /// Records owned by `created_by`, newest first.
    pub fn list(&self, created_by: Option<&str>) -> Vec<SessionDetail> {
        self.records
            .iter()
            .rev()
            .filter(|record| record.created_by.as_deref() == created_by)
            .cloned()
            .collect()
    }

    /// Stores `report` on the newest record with this session id. Returns
    /// false when there is no such record.
    pub fn attach_report(&mut self, session_id: &str, report: Report) -> bool {
        match self
            .records
            .iter_mut()
            .rev()
            .find(|record| record.session_id == session_id)
        {
            Some(record) => {
                record.report = Some(report);
                true
            }
            None => false,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medvoice_core::session::DoctorAgent;

    fn request(specialist: &str) -> NewSession {
        NewSession {
            notes: "Back pain".to_string(),
            selected_doctor: DoctorAgent {
                id: 3,
                specialist: specialist.to_string(),
                description: String::new(),
                image: String::new(),
                agent_prompt: None,
                voice_id: None,
            },
        }
    }

    #[test]
    fn test_default_store_starts_ids_at_one() {
        let mut store = SessionStore::default();

        let record = store.create(request("Neurologist"), None, Utc::now());

        assert_eq!(record.id, 1);
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_create_assigns_increasing_ids_and_unique_session_ids() {
        let mut store = SessionStore::new();
        let now = Utc::now();

        let first = store.create(request("Orthopedist"), None, now);
        let second = store.create(request("Orthopedist"), None, now);

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(store.find(&second.session_id), Some(&second));
    }

    #[test]
    fn test_list_is_scoped_to_owner_and_newest_first() {
        let mut store = SessionStore::new();
        let now = Utc::now();
        let mine = Some("a@example.com".to_string());

        store.create(request("Orthopedist"), mine.clone(), now);
        store.create(request("Dentist"), Some("b@example.com".to_string()), now);
        store.create(request("Cardiologist"), mine, now);

        let listed = store.list(Some("a@example.com"));
        let specialists: Vec<_> = listed
            .iter()
            .map(|r| r.selected_doctor.specialist.as_str())
            .collect();
        assert_eq!(specialists, vec!["Cardiologist", "Orthopedist"]);
    }

    #[test]
    fn test_attach_report_to_unknown_session_stores_nothing() {
        let mut store = SessionStore::new();
        let record = store.create(request("Orthopedist"), None, Utc::now());

        assert!(!store.attach_report("missing", Report::default()));
        assert!(store.attach_report(&record.session_id, Report::default()));
        assert!(store.find(&record.session_id).unwrap().report.is_some());
    }
}
