//! Plain-text rendering for terminal output.

use chrono::{DateTime, Utc};
use tikit_client::{
    api::types::{CheckinRecord, Event, TemporarySessionGrant, UserProfile},
    state::CategoryFilter,
};

pub fn profile(profile: &UserProfile) -> String {
    let mut line = format!("{} <{}>", profile.full_name(), profile.email);
    if let Some(role) = &profile.role {
        line.push_str(&format!(" [{}]", role));
    }
    line
}

pub fn checkin(record: &CheckinRecord) -> String {
    let category = record
        .guest
        .registrant_type
        .as_ref()
        .map(|r| r.name.as_str())
        .unwrap_or("-");
    format!(
        "#{:<6} {:<28} {:<10} {}",
        record.id,
        record.guest.full_name(),
        category,
        record.created_at.as_deref().unwrap_or("")
    )
}

pub fn grant(grant: &TemporarySessionGrant, now: DateTime<Utc>) -> String {
    let remaining = grant.time_remaining(now);
    let mut lines = vec![
        format!("{} / {}", grant.event_name, grant.session_name),
        format!(
            "Código {} · ids evento={} sesión={}",
            grant.session_code, grant.event_id, grant.session_id
        ),
        format!(
            "Horario {} {} - {} {}",
            grant.start_date, grant.start_time, grant.end_date, grant.end_time
        ),
        format!(
            "Expira {} (quedan {}h {:02}m)",
            grant.expires_at.format("%Y-%m-%d %H:%M UTC"),
            remaining.num_hours(),
            remaining.num_minutes() % 60
        ),
        format!("Registrados: {}", grant.total_registered),
    ];
    for category in &grant.registrant_types {
        let attendance = category
            .attendance_percentage()
            .map(|p| format!("{:.0}%", p))
            .unwrap_or_else(|| "-".into());
        lines.push(format!(
            "  [{}] {} · {} registrados · asistencia {}",
            category.category_id(),
            category.display_name(),
            category.registered.unwrap_or(0),
            attendance
        ));
    }
    lines.join("\n")
}

pub fn filter(session_id: i64, filter: &CategoryFilter) -> String {
    if filter.all_selected {
        format!("Sesión {}: todas las categorías", session_id)
    } else {
        let ids = filter
            .registrant_type_ids()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Sesión {}: categorías {}", session_id, ids)
    }
}

pub fn event(event: &Event) -> String {
    let status = if event.is_active { "activo" } else { "inactivo" };
    format!("#{:<6} {:<40} {}", event.id, event.name, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tikit_client::api::types::{CheckinGuest, EventSessionRef, RegistrantTypeStat};

    #[test]
    fn grant_shows_remaining_time_and_categories() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let session = TemporarySessionGrant {
            session_id: 7,
            session_name: "Jornada".into(),
            session_code: "ABC123".into(),
            event_id: 3,
            event_name: "Expo Tikit".into(),
            issued_at: issued,
            expires_at: issued + Duration::hours(6),
            start_date: "2025-03-01".into(),
            end_date: "2025-03-01".into(),
            start_time: "09:00".into(),
            end_time: "13:00".into(),
            registrant_types: vec![RegistrantTypeStat {
                id: 1,
                name: "General".into(),
                price: 0.0,
                stock: None,
                used: None,
                available: None,
                is_active: true,
                registered: Some(40),
                checkins: Some(10),
                registrant_type: None,
            }],
            total_registered: 40,
        };
        let text = grant(&session, issued + Duration::minutes(90));
        assert!(text.contains("quedan 4h 30m"));
        assert!(text.contains("[1] General · 40 registrados · asistencia 25%"));
    }

    #[test]
    fn checkin_line_has_guest_name() {
        let record = CheckinRecord {
            id: 12,
            guest: CheckinGuest {
                id: 1,
                first_name: "Ana".into(),
                last_name: "Rojas".into(),
                email: "ana@example.com".into(),
                registrant_type: None,
            },
            event_session: EventSessionRef {
                id: 7,
                name: "Jornada".into(),
            },
            method: "qr".into(),
            latitude: None,
            longitude: None,
            created_at: Some("2025-03-01T09:00:00Z".into()),
            updated_at: None,
        };
        let line = checkin(&record);
        assert!(line.starts_with("#12"));
        assert!(line.contains("Ana Rojas"));
    }

    #[test]
    fn filter_summary() {
        assert_eq!(filter(7, &CategoryFilter::all()), "Sesión 7: todas las categorías");
        assert_eq!(
            filter(7, &CategoryFilter::only([3, 1])),
            "Sesión 7: categorías 1, 3"
        );
    }
}
