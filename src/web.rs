//! Client for the installation's composition service.
//!
//! The service is the only remote dependency and the gallery floor does
//! not care about it: every request retries indefinitely, and each
//! failed attempt hands control back to the caller (`on_retry`) so the
//! drone comes on and scheduled behaviors keep running through an
//! outage of any length.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::error;

use crate::composition::Composition;
use crate::config::WebConfig;
use crate::error::{DeviceFault, Error};
use crate::tonerow::ToneRow;

/// One polled work item: a row somebody submitted, waiting to be played.
#[derive(Debug, Clone, Deserialize)]
pub struct RowAssignment {
    pub id: i64,
    #[serde(rename = "noteRow")]
    pub note_row: String,
}

/// The service sends a row as the text of a 12-element list. Anything
/// that does not parse into a valid row is the caller's cue to fall
/// back to a random one; nothing is repaired here.
pub fn parse_note_row(text: &str) -> Result<ToneRow, Error> {
    let values: Vec<i64> = serde_json::from_str(text).map_err(|_| Error::InvalidToneRow)?;
    let bytes: Vec<u8> = values
        .into_iter()
        .map(|v| u8::try_from(v).map_err(|_| Error::InvalidToneRow))
        .collect::<Result<_, _>>()?;
    ToneRow::new(&bytes)
}

pub struct WebService {
    agent: ureq::Agent,
    rows_url: String,
    update_url: String,
    notify_url: String,
}

impl WebService {
    pub fn new(config: &WebConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .build();
        let root = config.root_url.trim_end_matches('/');
        Self {
            agent,
            rows_url: format!("{root}/GetNewToneRows"),
            update_url: format!("{root}/UpdateToneRowByIds"),
            notify_url: format!("{root}/NotifyCompositionEnd"),
        }
    }

    /// Polls for new rows, blocking until the service answers. A
    /// reachable service with an undecodable or error answer counts as
    /// "no work" rather than an outage.
    pub fn fetch_rows(
        &self,
        mut on_retry: impl FnMut() -> Result<(), DeviceFault>,
    ) -> Result<Vec<RowAssignment>, DeviceFault> {
        let mut outage: Option<ureq::ErrorKind> = None;
        loop {
            match self.agent.get(&self.rows_url).query("type", "user").call() {
                Ok(response) => {
                    log_recovery(outage);
                    return Ok(match response.into_json() {
                        Ok(rows) => rows,
                        Err(e) => {
                            error!("undecodable tone row response: {e}");
                            Vec::new()
                        }
                    });
                }
                Err(ureq::Error::Status(code, _)) => {
                    log_recovery(outage);
                    error!("tone row service answered {code}");
                    return Ok(Vec::new());
                }
                Err(ureq::Error::Transport(transport)) => {
                    log_outage(&mut outage, &transport);
                }
            }
            on_retry()?;
        }
    }

    /// Announces the composition about to play: its id, the ISO-8601
    /// timestamp, and the generated `[notes, durations]` pair.
    pub fn announce_played(
        &self,
        comp: &Composition,
        on_retry: impl FnMut() -> Result<(), DeviceFault>,
    ) -> Result<(), DeviceFault> {
        let record = serde_json::json!([{
            "id": comp.id,
            "playedOn": Utc::now().to_rfc3339(),
            "twelveToneMatrix": comp.matrix_payload(),
        }]);
        self.post_with_retry(self.agent.post(&self.update_url), Some(&record), on_retry)
    }

    pub fn notify_composition_end(
        &self,
        id: i64,
        on_retry: impl FnMut() -> Result<(), DeviceFault>,
    ) -> Result<(), DeviceFault> {
        let request = self
            .agent
            .post(&self.notify_url)
            .query("id", &id.to_string());
        self.post_with_retry(request, None, on_retry)
    }

    fn post_with_retry(
        &self,
        request: ureq::Request,
        body: Option<&serde_json::Value>,
        mut on_retry: impl FnMut() -> Result<(), DeviceFault>,
    ) -> Result<(), DeviceFault> {
        let mut outage: Option<ureq::ErrorKind> = None;
        loop {
            let result = match body {
                Some(json) => request.clone().send_json(json),
                None => request.clone().call(),
            };
            match result {
                Ok(_) => {
                    log_recovery(outage);
                    return Ok(());
                }
                Err(ureq::Error::Status(code, _)) => {
                    log_recovery(outage);
                    error!("composition service answered {code}");
                    return Ok(());
                }
                Err(ureq::Error::Transport(transport)) => {
                    log_outage(&mut outage, &transport);
                }
            }
            on_retry()?;
        }
    }
}

/// First failure announces the outage; later failures only log when the
/// error changes shape, so a days-long outage does not flood the log.
fn log_outage(outage: &mut Option<ureq::ErrorKind>, transport: &ureq::Transport) {
    match outage {
        None => error!("cannot reach the composition service, please ensure there is internet: {transport}"),
        Some(kind) if *kind != transport.kind() => error!("{transport}"),
        _ => {}
    }
    *outage = Some(transport.kind());
}

fn log_recovery(outage: Option<ureq::ErrorKind>) {
    if outage.is_some() {
        error!("the installation should now be operating normally");
    }
}
