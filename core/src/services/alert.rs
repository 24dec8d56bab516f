use tracing::debug;

use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::session::{token_subject, SessionStore};
use crate::types::{Alert, AlertHistory, PushAlertData, PushAlertRequest};

#[derive(Clone)]
pub struct AlertService {
    api: ApiClient,
}

impl AlertService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Normally the backend raises alerts itself; exposed for tooling.
    pub fn push_alert(&self, input: &PushAlertRequest) -> Result<ApiResponse<PushAlertData>, ApiError> {
        self.api.send(self.api.endpoints().build_push_alert(input)?)
    }

    /// Alert history, most recent first, whichever shape the backend used.
    pub fn get_alert_history(&self) -> Result<ApiResponse<AlertHistory>, ApiError> {
        self.api.send(self.api.endpoints().build_alert_history())
    }
}

/// Alerts shown to one recipient: the loaded history plus whatever arrives
/// in realtime afterwards, newest first.
#[derive(Debug, Clone, Default)]
pub struct AlertFeed {
    recipient: String,
    alerts: Vec<Alert>,
}

impl AlertFeed {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            alerts: Vec::new(),
        }
    }

    /// Feed for the signed-in user. The token subject wins over the profile
    /// e-mail since that is what the backend stamps on pushed alerts.
    pub fn for_session(session: &SessionStore) -> Option<Self> {
        let snapshot = session.snapshot();
        let recipient = snapshot
            .access_token()
            .and_then(token_subject)
            .or_else(|| snapshot.user().map(|u| u.email.clone()))?;
        Some(Self::new(recipient))
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Replace the list with a fetched history. Alerts addressed to someone
    /// else are dropped; alerts with no recipient are kept.
    pub fn load(&mut self, history: AlertHistory) {
        self.alerts = history
            .alerts
            .into_iter()
            .filter(|a| !a.has_recipient() || a.is_addressed_to(&self.recipient))
            .collect();
    }

    /// Fetch the history through `service` and load it. An error envelope
    /// leaves the current list untouched and is returned as-is.
    pub fn refresh(&mut self, service: &AlertService) -> Result<ApiResponse<()>, ApiError> {
        let response = service.get_alert_history()?;
        Ok(response.map(|history| self.load(history)))
    }

    /// A realtime alert. It is prepended and `true` returned only when it is
    /// addressed to this feed's recipient; the caller then surfaces it.
    pub fn receive(&mut self, alert: Alert) -> bool {
        if !alert.is_addressed_to(&self.recipient) {
            debug!(user_id = ?alert.user_id, email = ?alert.email, "ignoring alert for another user");
            return false;
        }
        self.alerts.insert(0, alert);
        true
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::testing::{Harness, ScriptedTransport};
    use crate::types::{AlertStatus, User};

    const KEYED: &str = r#"{"status":"success","message":"","data":{"alerts":{
        "-Na1":{"title":"Gate","body":"Motion","type":"info","timestamp":"2024-05-01T10:00:00Z","user_id":"a@b.com"},
        "-Na2":{"title":"Door","body":"Unknown face","type":"unauthorized_access","timestamp":"2024-05-01T12:00:00Z"},
        "-Na3":{"title":"Other","body":"Not ours","type":"info","timestamp":"2024-05-01T13:00:00Z","email":"c@d.com"}
    }}}"#;

    fn alert(title: &str, recipient: Option<&str>) -> Alert {
        Alert {
            id: None,
            title: title.to_string(),
            body: String::new(),
            kind: "info".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
            location: None,
            face_details: None,
            status: AlertStatus::Sent,
            user_id: recipient.map(str::to_string),
            email: None,
        }
    }

    #[test]
    fn history_is_ordered_newest_first() {
        let h = Harness::new(vec![ScriptedTransport::ok(KEYED)]);
        let resp = AlertService::new(h.api.clone()).get_alert_history().unwrap();
        let titles: Vec<_> = resp.data().unwrap().alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["Other", "Door", "Gate"]);
    }

    #[test]
    fn refresh_filters_by_recipient() {
        let h = Harness::new(vec![ScriptedTransport::ok(KEYED)]);
        let mut feed = AlertFeed::new("a@b.com");
        assert!(feed.refresh(&AlertService::new(h.api.clone())).unwrap().is_success());

        let titles: Vec<_> = feed.alerts().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["Door", "Gate"]);
    }

    #[test]
    fn refresh_keeps_list_on_error_envelope() {
        let h = Harness::new(vec![ScriptedTransport::ok(
            r#"{"status":"error","message":"later","data":null}"#,
        )]);
        let mut feed = AlertFeed::new("a@b.com");
        feed.receive(alert("Kept", Some("a@b.com")));

        let resp = feed.refresh(&AlertService::new(h.api.clone())).unwrap();
        assert_eq!(resp.message(), "later");
        assert_eq!(feed.alerts().len(), 1);
    }

    #[test]
    fn receive_prepends_only_matching_alerts() {
        let mut feed = AlertFeed::new("A@B.com");
        assert!(feed.receive(alert("first", Some("a@b.com"))));
        assert!(!feed.receive(alert("stranger", Some("x@y.com"))));
        assert!(!feed.receive(alert("anonymous", None)));
        assert!(feed.receive(alert("second", Some("a@b.com"))));

        let titles: Vec<_> = feed.alerts().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[test]
    fn feed_recipient_comes_from_token_subject() {
        let h = Harness::new(vec![]);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"owner@home.test"}"#);
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{claims}.sig");
        let user = User {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            image_url: None,
        };
        h.api.session().set_auth_data(user, token).unwrap();

        let feed = AlertFeed::for_session(h.api.session()).unwrap();
        assert_eq!(feed.recipient(), "owner@home.test");
    }

    #[test]
    fn feed_falls_back_to_profile_email() {
        let h = Harness::new(vec![]);
        let user = User {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            image_url: None,
        };
        h.api.session().set_auth_data(user, "opaque".to_string()).unwrap();
        assert_eq!(AlertFeed::for_session(h.api.session()).unwrap().recipient(), "a@b.com");
    }

    #[test]
    fn no_feed_when_signed_out() {
        let h = Harness::new(vec![]);
        assert!(AlertFeed::for_session(h.api.session()).is_none());
    }
}
