use chrono::Utc;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_day, parse_timestamp, Database};
use crate::domain::ports::ReportStore;
use crate::domain::weekend_manager::{
    Admission, AdmissionInquiry, Concern, ConcernKind, Discharge, EmployeeCallOff, ReportStatus,
    WeekendManagerReport,
};
use crate::utils::error::{ReportError, Result};

const SELECT_REPORT: &str = r#"
    SELECT id, creator_id, facility_id, date, name, clinical_manager,
           nighttime_supervisor, therapist, dietary_supervisor,
           friday_initial_census, friday_net_census, saturday_net_census,
           sunday_net_census, notes, status, submitted_at, created_at, updated_at
    FROM weekend_manager_reports
"#;

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<WeekendManagerReport> {
    let date: String = row.get("date")?;
    let status: String = row.get("status")?;
    let submitted_at: Option<String> = row.get("submitted_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(WeekendManagerReport {
        id: row.get("id")?,
        creator_id: row.get("creator_id")?,
        facility_id: row.get("facility_id")?,
        date: Some(parse_day(&date)?),
        name: row.get("name")?,
        clinical_manager: row.get("clinical_manager")?,
        nighttime_supervisor: row.get("nighttime_supervisor")?,
        therapist: row.get("therapist")?,
        dietary_supervisor: row.get("dietary_supervisor")?,
        friday_initial_census: row.get("friday_initial_census")?,
        friday_net_census: row.get("friday_net_census")?,
        saturday_net_census: row.get("saturday_net_census")?,
        sunday_net_census: row.get("sunday_net_census")?,
        notes: row.get("notes")?,
        status: status.parse().map_err(|e: ReportError| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
            )
        })?,
        submitted_at: submitted_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: Some(parse_timestamp(&created_at)?),
        updated_at: Some(parse_timestamp(&updated_at)?),
        ..WeekendManagerReport::default()
    })
}

fn load_children(conn: &Connection, report: &mut WeekendManagerReport) -> Result<()> {
    let Some(id) = report.id else {
        return Ok(());
    };

    let mut stmt = conn.prepare(
        "SELECT resident_name, room_number, admitted_from, notes FROM wmr_admissions \
         WHERE report_id = ?1 ORDER BY sort_order",
    )?;
    report.admissions = stmt
        .query_map(params![id], |row| {
            Ok(Admission {
                resident_name: row.get(0)?,
                room_number: row.get(1)?,
                admitted_from: row.get(2)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT resident_name, room_number, discharged_to, notes FROM wmr_discharges \
         WHERE report_id = ?1 ORDER BY sort_order",
    )?;
    report.discharges = stmt
        .query_map(params![id], |row| {
            Ok(Discharge {
                resident_name: row.get(0)?,
                room_number: row.get(1)?,
                discharged_to: row.get(2)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT prospect_name, referral_source, outcome FROM wmr_admission_inquiries \
         WHERE report_id = ?1 ORDER BY sort_order",
    )?;
    report.admission_inquiries = stmt
        .query_map(params![id], |row| {
            Ok(AdmissionInquiry {
                prospect_name: row.get(0)?,
                referral_source: row.get(1)?,
                outcome: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT employee_name, position, shift, replacement FROM wmr_employee_call_offs \
         WHERE report_id = ?1 ORDER BY sort_order",
    )?;
    report.employee_call_offs = stmt
        .query_map(params![id], |row| {
            Ok(EmployeeCallOff {
                employee_name: row.get(0)?,
                position: row.get(1)?,
                shift: row.get(2)?,
                replacement: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT kind, description, action_taken FROM wmr_concerns \
         WHERE report_id = ?1 ORDER BY kind, sort_order",
    )?;
    let concerns = stmt
        .query_map(params![id], |row| {
            let kind: String = row.get(0)?;
            let concern = Concern {
                description: row.get(1)?,
                action_taken: row.get(2)?,
            };
            Ok((kind, concern))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (kind, concern) in concerns {
        match ConcernKind::parse(&kind) {
            Some(kind) => report.concerns_mut(kind).push(concern),
            None => tracing::warn!(report_id = id, kind = %kind, "skipping concern with unknown kind"),
        }
    }

    Ok(())
}

fn write_children(conn: &Connection, id: i64, report: &WeekendManagerReport) -> Result<()> {
    for table in [
        "wmr_admissions",
        "wmr_discharges",
        "wmr_admission_inquiries",
        "wmr_employee_call_offs",
        "wmr_concerns",
    ] {
        conn.execute(&format!("DELETE FROM {} WHERE report_id = ?1", table), params![id])?;
    }

    for (i, a) in report.admissions.iter().enumerate() {
        conn.execute(
            "INSERT INTO wmr_admissions (report_id, sort_order, resident_name, room_number, admitted_from, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, i as i64, a.resident_name, a.room_number, a.admitted_from, a.notes],
        )?;
    }
    for (i, d) in report.discharges.iter().enumerate() {
        conn.execute(
            "INSERT INTO wmr_discharges (report_id, sort_order, resident_name, room_number, discharged_to, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, i as i64, d.resident_name, d.room_number, d.discharged_to, d.notes],
        )?;
    }
    for (i, q) in report.admission_inquiries.iter().enumerate() {
        conn.execute(
            "INSERT INTO wmr_admission_inquiries (report_id, sort_order, prospect_name, referral_source, outcome) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, i as i64, q.prospect_name, q.referral_source, q.outcome],
        )?;
    }
    for (i, c) in report.employee_call_offs.iter().enumerate() {
        conn.execute(
            "INSERT INTO wmr_employee_call_offs (report_id, sort_order, employee_name, position, shift, replacement) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, i as i64, c.employee_name, c.position, c.shift, c.replacement],
        )?;
    }
    for kind in ConcernKind::ALL {
        for (i, c) in report.concerns(kind).iter().enumerate() {
            conn.execute(
                "INSERT INTO wmr_concerns (report_id, kind, sort_order, description, action_taken) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, kind.as_str(), i as i64, c.description, c.action_taken],
            )?;
        }
    }
    Ok(())
}

fn find_in(conn: &Connection, id: i64) -> Result<Option<WeekendManagerReport>> {
    let sql = format!("{} WHERE id = ?1", SELECT_REPORT);
    let report = conn
        .query_row(&sql, params![id], report_from_row)
        .optional()?;
    match report {
        Some(mut report) => {
            load_children(conn, &mut report)?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}

/// Weekend manager reports and their nested records.
#[derive(Clone, Debug)]
pub struct SqliteReportStore {
    db: Database,
}

impl SqliteReportStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ReportStore for SqliteReportStore {
    fn insert(&self, report: &WeekendManagerReport) -> Result<WeekendManagerReport> {
        report.validate()?;
        let now = format_timestamp(Utc::now());
        let date = report.date.map(|d| d.to_string());

        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                    INSERT INTO weekend_manager_reports (
                        creator_id, facility_id, date, name, clinical_manager,
                        nighttime_supervisor, therapist, dietary_supervisor,
                        friday_initial_census, friday_net_census, saturday_net_census,
                        sunday_net_census, notes, status, submitted_at, created_at, updated_at
                    ) VALUES (
                        :creator_id, :facility_id, :date, :name, :clinical_manager,
                        :nighttime_supervisor, :therapist, :dietary_supervisor,
                        :friday_initial_census, :friday_net_census, :saturday_net_census,
                        :sunday_net_census, :notes, :status, :submitted_at, :now, :now
                    )
                "#,
                named_params! {
                    ":creator_id": report.creator_id,
                    ":facility_id": report.facility_id,
                    ":date": date,
                    ":name": report.name,
                    ":clinical_manager": report.clinical_manager,
                    ":nighttime_supervisor": report.nighttime_supervisor,
                    ":therapist": report.therapist,
                    ":dietary_supervisor": report.dietary_supervisor,
                    ":friday_initial_census": report.friday_initial_census,
                    ":friday_net_census": report.friday_net_census,
                    ":saturday_net_census": report.saturday_net_census,
                    ":sunday_net_census": report.sunday_net_census,
                    ":notes": report.notes,
                    ":status": report.status.as_str(),
                    ":submitted_at": report.submitted_at.map(format_timestamp),
                    ":now": now,
                },
            )?;
            let id = tx.last_insert_rowid();
            write_children(&tx, id, report)?;
            let saved = find_in(&tx, id)?
                .ok_or_else(|| ReportError::not_found("WeekendManagerReport", id))?;
            tx.commit()?;
            tracing::debug!(report_id = id, "weekend manager report created");
            Ok(saved)
        })
    }

    fn find(&self, id: i64) -> Result<Option<WeekendManagerReport>> {
        self.db.with_connection(|conn| find_in(conn, id))
    }

    fn update(&self, report: &WeekendManagerReport) -> Result<WeekendManagerReport> {
        let id = report.id.ok_or_else(|| ReportError::InvalidState {
            message: "cannot update a report that was never saved".to_string(),
        })?;
        report.validate()?;
        let now = format_timestamp(Utc::now());
        let date = report.date.map(|d| d.to_string());

        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                r#"
                    UPDATE weekend_manager_reports SET
                        creator_id = :creator_id,
                        facility_id = :facility_id,
                        date = :date,
                        name = :name,
                        clinical_manager = :clinical_manager,
                        nighttime_supervisor = :nighttime_supervisor,
                        therapist = :therapist,
                        dietary_supervisor = :dietary_supervisor,
                        friday_initial_census = :friday_initial_census,
                        friday_net_census = :friday_net_census,
                        saturday_net_census = :saturday_net_census,
                        sunday_net_census = :sunday_net_census,
                        notes = :notes,
                        status = :status,
                        submitted_at = :submitted_at,
                        updated_at = :now
                    WHERE id = :id
                "#,
                named_params! {
                    ":id": id,
                    ":creator_id": report.creator_id,
                    ":facility_id": report.facility_id,
                    ":date": date,
                    ":name": report.name,
                    ":clinical_manager": report.clinical_manager,
                    ":nighttime_supervisor": report.nighttime_supervisor,
                    ":therapist": report.therapist,
                    ":dietary_supervisor": report.dietary_supervisor,
                    ":friday_initial_census": report.friday_initial_census,
                    ":friday_net_census": report.friday_net_census,
                    ":saturday_net_census": report.saturday_net_census,
                    ":sunday_net_census": report.sunday_net_census,
                    ":notes": report.notes,
                    ":status": report.status.as_str(),
                    ":submitted_at": report.submitted_at.map(format_timestamp),
                    ":now": now,
                },
            )?;
            if changed == 0 {
                return Err(ReportError::not_found("WeekendManagerReport", id));
            }
            write_children(&tx, id, report)?;
            let saved = find_in(&tx, id)?
                .ok_or_else(|| ReportError::not_found("WeekendManagerReport", id))?;
            tx.commit()?;
            Ok(saved)
        })
    }

    fn delete(&self, id: i64) -> Result<bool> {
        self.db.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM weekend_manager_reports WHERE id = ?1",
                params![id],
            )?;
            Ok(removed > 0)
        })
    }

    fn count(&self) -> Result<usize> {
        self.db.with_connection(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM weekend_manager_reports", [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        })
    }

    fn last(&self) -> Result<Option<WeekendManagerReport>> {
        self.db.with_connection(|conn| {
            let id: Option<i64> = conn.query_row(
                "SELECT MAX(id) FROM weekend_manager_reports",
                [],
                |row| row.get(0),
            )?;
            match id {
                Some(id) => find_in(conn, id),
                None => Ok(None),
            }
        })
    }

    fn current_reports(&self, creator_id: i64) -> Result<Vec<WeekendManagerReport>> {
        let sql = format!(
            "{} WHERE creator_id = ?1 AND status = ?2 ORDER BY date DESC, id DESC",
            SELECT_REPORT
        );
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut reports = stmt
                .query_map(
                    params![creator_id, ReportStatus::Current.as_str()],
                    report_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for report in &mut reports {
                load_children(conn, report)?;
            }
            Ok(reports)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report(creator_id: i64, day: u32) -> WeekendManagerReport {
        WeekendManagerReport {
            facility_id: Some(3),
            date: NaiveDate::from_ymd_opt(2015, 10, day),
            name: Some("Dana Whitfield".into()),
            clinical_manager: Some("Marcus Lee".into()),
            nighttime_supervisor: Some("Priya Natarajan".into()),
            therapist: Some("Owen Baker".into()),
            dietary_supervisor: Some("Rosa Delgado".into()),
            friday_initial_census: Some(112),
            friday_net_census: Some(110),
            saturday_net_census: Some(111),
            sunday_net_census: Some(109),
            ..WeekendManagerReport::new(creator_id)
        }
    }

    fn store() -> SqliteReportStore {
        SqliteReportStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_insert_with_children_round_trips() {
        let store = store();
        let mut draft = report(1, 3);
        draft.admissions.push(Admission {
            resident_name: Some("Harold Finch".into()),
            room_number: Some("214B".into()),
            ..Admission::default()
        });
        draft.wmr_pharmacy_concerns.push(Concern {
            description: Some("Late delivery of evening meds".into()),
            action_taken: Some("Called pharmacy on-call".into()),
        });

        let saved = store.insert(&draft).unwrap();
        assert!(saved.id.is_some());
        assert!(saved.created_at.is_some());
        assert_eq!(saved.admissions, draft.admissions);
        assert_eq!(saved.wmr_pharmacy_concerns, draft.wmr_pharmacy_concerns);
        assert!(saved.wmr_therapy_concerns.is_empty());
    }

    #[test]
    fn test_insert_rejects_invalid_report() {
        let store = store();
        let mut draft = report(1, 3);
        draft.therapist = None;
        assert!(matches!(
            store.insert(&draft),
            Err(ReportError::ValidationError { .. })
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_replaces_children_and_delete_cascades() {
        let store = store();
        let mut draft = report(1, 3);
        draft.discharges.push(Discharge {
            resident_name: Some("Edna Moore".into()),
            ..Discharge::default()
        });
        let mut saved = store.insert(&draft).unwrap();

        saved.discharges.clear();
        saved.employee_call_offs.push(EmployeeCallOff {
            employee_name: Some("Lisa Park".into()),
            shift: Some("Night".into()),
            ..EmployeeCallOff::default()
        });
        let updated = store.update(&saved).unwrap();
        assert!(updated.discharges.is_empty());
        assert_eq!(updated.employee_call_offs.len(), 1);

        let id = updated.id.unwrap();
        assert!(store.delete(id).unwrap());
        assert!(store.find(id).unwrap().is_none());
        assert!(!store.delete(id).unwrap());

        let orphans: i64 = store
            .db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM wmr_employee_call_offs", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_current_reports_scope() {
        let store = store();
        let older = store.insert(&report(1, 3)).unwrap();
        let newer = store.insert(&report(1, 10)).unwrap();
        store.insert(&report(2, 10)).unwrap();

        let current = store.current_reports(1).unwrap();
        assert_eq!(current.iter().map(|r| r.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let mut submitted = newer.clone();
        submitted.submit().unwrap();
        store.update(&submitted).unwrap();

        let current = store.current_reports(1).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, older.id);
        assert_eq!(store.last().unwrap().unwrap().creator_id, Some(2));
    }
}
