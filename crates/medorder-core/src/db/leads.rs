//! Lead database operations.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{like_pattern, parse_stored, text, Database, DbError, DbResult, WhereClause};
use crate::models::{
    Address, Lead, LeadFilter, LeadPriority, LeadSource, LeadStatus, PageRequest,
};

const LEAD_COLUMNS: &str = r#"
    id, name, phone, email, disease, duration, patient_history, estimated_value,
    address_line1, address_line2, address_line3, address_line4, address_line5, address_line6,
    pincode, city, source, status, priority, assigned_to, created_by, notes,
    created_at, updated_at
"#;

impl Database {
    /// Insert a new lead.
    pub fn insert_lead(&self, lead: &Lead) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO leads ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, \
                 ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                LEAD_COLUMNS
            ),
            params![
                lead.id,
                lead.name,
                lead.phone,
                lead.email,
                lead.disease,
                lead.duration,
                lead.patient_history,
                lead.estimated_value,
                lead.address.address_line1,
                lead.address.address_line2,
                lead.address.address_line3,
                lead.address.address_line4,
                lead.address.address_line5,
                lead.address.address_line6,
                lead.address.pincode,
                lead.address.city,
                lead.source.as_str(),
                lead.status.as_str(),
                lead.priority.as_str(),
                lead.assigned_to,
                lead.created_by,
                lead.notes,
                lead.created_at,
                lead.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing lead.
    pub fn update_lead(&self, lead: &Lead) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE leads SET
                name = ?2, phone = ?3, email = ?4, disease = ?5, duration = ?6,
                patient_history = ?7, estimated_value = ?8,
                address_line1 = ?9, address_line2 = ?10, address_line3 = ?11,
                address_line4 = ?12, address_line5 = ?13, address_line6 = ?14,
                pincode = ?15, city = ?16, source = ?17, status = ?18, priority = ?19,
                assigned_to = ?20, notes = ?21, updated_at = ?22
            WHERE id = ?1
            "#,
            params![
                lead.id,
                lead.name,
                lead.phone,
                lead.email,
                lead.disease,
                lead.duration,
                lead.patient_history,
                lead.estimated_value,
                lead.address.address_line1,
                lead.address.address_line2,
                lead.address.address_line3,
                lead.address.address_line4,
                lead.address.address_line5,
                lead.address.address_line6,
                lead.address.pincode,
                lead.address.city,
                lead.source.as_str(),
                lead.status.as_str(),
                lead.priority.as_str(),
                lead.assigned_to,
                lead.notes,
                lead.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a lead by ID.
    pub fn get_lead(&self, id: &str) -> DbResult<Option<Lead>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS),
                [id],
                lead_row,
            )
            .optional()?
            .map(Lead::try_from)
            .transpose()
    }

    /// List leads matching a filter, newest first. Returns the page and the total count.
    ///
    /// Converted leads are left out unless the filter asks for them by status.
    pub fn list_leads(&self, filter: &LeadFilter, page: PageRequest) -> DbResult<(Vec<Lead>, u64)> {
        let mut clause = WhereClause::new();
        match filter.status {
            Some(status) => clause.push("status = ?", [text(status.as_str())]),
            None => clause.push("status <> 'CONVERTED'", []),
        }
        if let Some(priority) = filter.priority {
            clause.push("priority = ?", [text(priority.as_str())]);
        }
        if let Some(source) = filter.source {
            clause.push("source = ?", [text(source.as_str())]);
        }
        if let Some(assigned_to) = &filter.assigned_to {
            clause.push("assigned_to = ?", [text(assigned_to)]);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clause.push(
                "(name LIKE ? ESCAPE '\\' OR phone LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')",
                [like_pattern(search), like_pattern(search), like_pattern(search)],
            );
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM leads{}", clause.sql()),
            params_from_iter(clause.args()),
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads{} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            LEAD_COLUMNS,
            clause.sql()
        ))?;
        let rows = stmt.query_map(params_from_iter(clause.paged_args(page.limit, page.offset())), lead_row)?;

        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?.try_into()?);
        }
        Ok((leads, total as u64))
    }

    /// Set only the status of a lead.
    pub fn set_lead_status(&self, id: &str, status: LeadStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE leads SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a lead.
    pub fn delete_lead(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM leads WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct LeadRow {
    lead: Lead,
    source: String,
    status: String,
    priority: String,
}

fn lead_row(row: &Row<'_>) -> rusqlite::Result<LeadRow> {
    Ok(LeadRow {
        lead: Lead {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            email: row.get(3)?,
            disease: row.get(4)?,
            duration: row.get(5)?,
            patient_history: row.get(6)?,
            estimated_value: row.get(7)?,
            address: Address {
                address_line1: row.get(8)?,
                address_line2: row.get(9)?,
                address_line3: row.get(10)?,
                address_line4: row.get(11)?,
                address_line5: row.get(12)?,
                address_line6: row.get(13)?,
                pincode: row.get(14)?,
                city: row.get(15)?,
            },
            source: LeadSource::Other,
            status: LeadStatus::New,
            priority: LeadPriority::Medium,
            assigned_to: row.get(19)?,
            created_by: row.get(20)?,
            notes: row.get(21)?,
            created_at: row.get(22)?,
            updated_at: row.get(23)?,
        },
        source: row.get(16)?,
        status: row.get(17)?,
        priority: row.get(18)?,
    })
}

impl TryFrom<LeadRow> for Lead {
    type Error = DbError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let mut lead = row.lead;
        lead.source = parse_stored(&row.source, "lead source", LeadSource::parse)?;
        lead.status = parse_stored(&row.status, "lead status", LeadStatus::parse)?;
        lead.priority = parse_stored(&row.priority, "lead priority", LeadPriority::parse)?;
        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRole};

    fn setup_db() -> (Database, User, User) {
        let db = Database::open_in_memory().unwrap();
        let e = User::new("E".into(), "e@example.com".into(), "x".into(), UserRole::Employee);
        let f = User::new("F".into(), "f@example.com".into(), "x".into(), UserRole::Employee);
        db.insert_user(&e).unwrap();
        db.insert_user(&f).unwrap();
        (db, e, f)
    }

    fn page() -> PageRequest {
        PageRequest { page: 1, limit: 20 }
    }

    #[test]
    fn test_insert_and_get() {
        let (db, e, _) = setup_db();

        let mut lead = Lead::new("A".into(), "9990001111".into(), e.id.clone());
        lead.disease = Some("Psoriasis".into());
        lead.estimated_value = Some(5000);
        lead.address.city = Some("Pune".into());
        lead.source = LeadSource::Facebook;
        db.insert_lead(&lead).unwrap();

        let retrieved = db.get_lead(&lead.id).unwrap().unwrap();
        assert_eq!(retrieved, lead);
    }

    #[test]
    fn test_update_lead() {
        let (db, e, f) = setup_db();
        let mut lead = Lead::new("A".into(), "9990001111".into(), e.id.clone());
        db.insert_lead(&lead).unwrap();

        lead.status = LeadStatus::Qualified;
        lead.assigned_to = f.id.clone();
        assert!(db.update_lead(&lead).unwrap());

        let retrieved = db.get_lead(&lead.id).unwrap().unwrap();
        assert_eq!(retrieved.status, LeadStatus::Qualified);
        assert_eq!(retrieved.assigned_to, f.id);
    }

    #[test]
    fn test_list_hides_converted_by_default() {
        let (db, e, _) = setup_db();
        let open = Lead::new("Open".into(), "9990001111".into(), e.id.clone());
        let mut converted = Lead::new("Done".into(), "9990002222".into(), e.id.clone());
        converted.status = LeadStatus::Converted;
        db.insert_lead(&open).unwrap();
        db.insert_lead(&converted).unwrap();

        let (leads, total) = db.list_leads(&LeadFilter::default(), page()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(leads[0].id, open.id);

        let filter = LeadFilter {
            status: Some(LeadStatus::Converted),
            ..Default::default()
        };
        let (leads, _) = db.list_leads(&filter, page()).unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, converted.id);
    }

    #[test]
    fn test_list_filters_by_assignee_and_search() {
        let (db, e, f) = setup_db();
        let mut lead1 = Lead::new("Meera".into(), "9990001111".into(), e.id.clone());
        lead1.email = Some("meera@example.com".into());
        let lead2 = Lead::new("Kiran".into(), "9990002222".into(), f.id.clone());
        db.insert_lead(&lead1).unwrap();
        db.insert_lead(&lead2).unwrap();

        let filter = LeadFilter {
            assigned_to: Some(f.id.clone()),
            ..Default::default()
        };
        let (leads, _) = db.list_leads(&filter, page()).unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].assigned_to, f.id);

        let filter = LeadFilter {
            search: Some("0002".into()),
            ..Default::default()
        };
        let (leads, _) = db.list_leads(&filter, page()).unwrap();
        assert_eq!(leads[0].name, "Kiran");

        let filter = LeadFilter {
            search: Some("MEERA@".into()),
            ..Default::default()
        };
        let (leads, _) = db.list_leads(&filter, page()).unwrap();
        assert_eq!(leads[0].name, "Meera");
    }

    #[test]
    fn test_pagination() {
        let (db, e, _) = setup_db();
        for i in 0..5 {
            let lead = Lead::new(format!("Lead {}", i), format!("999000111{}", i), e.id.clone());
            db.insert_lead(&lead).unwrap();
        }

        let (leads, total) = db.list_leads(&LeadFilter::default(), PageRequest { page: 2, limit: 2 }).unwrap();
        assert_eq!(total, 5);
        assert_eq!(leads.len(), 2);

        let (leads, _) = db.list_leads(&LeadFilter::default(), PageRequest { page: 3, limit: 2 }).unwrap();
        assert_eq!(leads.len(), 1);
    }

    #[test]
    fn test_set_status_and_delete() {
        let (db, e, _) = setup_db();
        let lead = Lead::new("A".into(), "9990001111".into(), e.id.clone());
        db.insert_lead(&lead).unwrap();

        assert!(db.set_lead_status(&lead.id, LeadStatus::Lost).unwrap());
        assert_eq!(db.get_lead(&lead.id).unwrap().unwrap().status, LeadStatus::Lost);

        assert!(db.delete_lead(&lead.id).unwrap());
        assert!(db.get_lead(&lead.id).unwrap().is_none());
    }
}
