use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{keyed_entries, timestamp, Face};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// A security alert. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_details: Option<Face>,
    #[serde(default)]
    pub status: AlertStatus,
    /// Recipient as realtime events carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Recipient as history records carry it. Records may hold both keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Alert {
    pub fn has_recipient(&self) -> bool {
        self.user_id.is_some() || self.email.is_some()
    }

    pub fn is_addressed_to(&self, identity: &str) -> bool {
        [self.user_id.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|recipient| recipient.eq_ignore_ascii_case(identity))
    }

    /// Display order: newest first, then by content. Ids are left out so a
    /// keyed map and a list of the same alerts sort identically; they only
    /// separate alerts whose content is equal.
    pub fn recent_first(a: &Alert, b: &Alert) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.body.cmp(&b.body))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Alert history, normalized to a most-recent-first list whichever shape the
/// backend sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertHistory {
    #[serde(default, deserialize_with = "alerts_recent_first")]
    pub alerts: Vec<Alert>,
}

fn alerts_recent_first<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Alert>, D::Error> {
    let mut alerts: Vec<Alert> = keyed_entries::<_, Alert>(d)?
        .into_iter()
        .map(|(key, mut alert)| {
            if alert.id.is_none() {
                alert.id = key;
            }
            alert
        })
        .collect();
    alerts.sort_by(Alert::recent_first);
    Ok(alerts)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushAlertRequest {
    pub title: String,
    pub body: String,
    /// Push token of the device the alert is delivered to.
    pub token: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_details: Option<Face>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAlertData {
    pub alert_id: String,
    pub alert: Alert,
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYED: &str = r#"{"alerts":{
        "-Na1":{"title":"Gate","body":"Motion at gate","type":"external_notification","timestamp":"2024-05-01T10:00:00Z","status":"sent"},
        "-Na2":{"title":"Door","body":"Unknown face","type":"unauthorized_access","timestamp":"2024-05-01T12:00:00Z","status":"read"},
        "-Na3":{"title":"Garage","body":"Opened","type":"info","timestamp":1714557600000}
    }}"#;

    const LISTED: &str = r#"{"alerts":[
        {"id":"-Na3","title":"Garage","body":"Opened","type":"info","timestamp":"2024-05-01T10:00:00Z"},
        {"id":"-Na1","title":"Gate","body":"Motion at gate","type":"external_notification","timestamp":"2024-05-01T10:00:00Z","status":"sent"},
        {"id":"-Na2","title":"Door","body":"Unknown face","type":"unauthorized_access","timestamp":"2024-05-01T12:00:00Z","status":"read"}
    ]}"#;

    #[test]
    fn keyed_history_is_sorted_newest_first_with_ids_from_keys() {
        let history: AlertHistory = serde_json::from_str(KEYED).unwrap();
        let ids: Vec<_> = history.alerts.iter().map(|a| a.id.as_deref().unwrap()).collect();
        assert_eq!(ids, ["-Na2", "-Na1", "-Na3"]);
        assert_eq!(history.alerts[0].status, AlertStatus::Read);
        assert_eq!(history.alerts[1].status, AlertStatus::Sent);
    }

    #[test]
    fn map_and_list_shapes_normalize_to_the_same_order() {
        let keyed: AlertHistory = serde_json::from_str(KEYED).unwrap();
        let listed: AlertHistory = serde_json::from_str(LISTED).unwrap();
        assert_eq!(keyed, listed);
    }

    #[test]
    fn empty_history_shapes() {
        for body in [r#"{"alerts":{}}"#, r#"{"alerts":[]}"#, r#"{"alerts":null}"#, "{}"] {
            let history: AlertHistory = serde_json::from_str(body).unwrap();
            assert!(history.alerts.is_empty(), "{body}");
        }
    }

    fn titles(history: &AlertHistory) -> Vec<&str> {
        history.alerts.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn map_values_without_ids_sort_like_the_map() {
        let keyed: AlertHistory = serde_json::from_str(
            r#"{"alerts":{
                "k1":{"title":"A","body":"b","type":"info","timestamp":"2024-05-01T10:00:00Z"},
                "k2":{"title":"B","body":"b","type":"info","timestamp":"2024-05-01T10:00:00Z"},
                "k3":{"title":"C","body":"b","type":"info","timestamp":"2024-05-01T11:00:00Z"}
            }}"#,
        )
        .unwrap();
        let listed: AlertHistory = serde_json::from_str(
            r#"{"alerts":[
                {"title":"B","body":"b","type":"info","timestamp":"2024-05-01T10:00:00Z"},
                {"title":"A","body":"b","type":"info","timestamp":"2024-05-01T10:00:00Z"},
                {"title":"C","body":"b","type":"info","timestamp":"2024-05-01T11:00:00Z"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(titles(&keyed), ["C", "A", "B"]);
        assert_eq!(titles(&keyed), titles(&listed));
    }

    #[test]
    fn record_with_user_id_and_email_parses() {
        let history: AlertHistory = serde_json::from_str(
            r#"{"alerts":{"k1":{"title":"t","body":"b","type":"x","timestamp":0,
                "user_id":"uid-7","email":"A@B.com"}}}"#,
        )
        .unwrap();
        let alert = &history.alerts[0];
        assert!(alert.is_addressed_to("a@b.com"));
        assert!(alert.is_addressed_to("uid-7"));
        assert!(!alert.is_addressed_to("c@d.com"));
    }

    #[test]
    fn recipient_accepts_email_field() {
        let alert: Alert = serde_json::from_str(
            r#"{"title":"t","body":"b","type":"x","timestamp":0,"email":"A@B.com"}"#,
        )
        .unwrap();
        assert!(alert.is_addressed_to("a@b.com"));
        assert!(!alert.is_addressed_to("c@d.com"));
    }

    #[test]
    fn timestamp_is_written_as_rfc3339() {
        let alert: Alert =
            serde_json::from_str(r#"{"title":"t","body":"b","type":"x","timestamp":1714557600000}"#)
                .unwrap();
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00.000Z");
    }
}
