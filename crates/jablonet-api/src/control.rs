// Control endpoint (ovladani2.php)

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::JablonetClient;
use crate::error::Error;
use crate::models::ControlResponse;

pub(crate) const CONTROL_PATH: &str = "/app/ja100/ajax/ovladani2.php";

/// A single PGM control request, already resolved to wire names.
#[derive(Debug, Clone)]
pub struct ControlRequest {
    /// Point id as it appears in the status payload.
    pub point_id: String,
    /// Protocol-level name (`PGM_1`).
    pub state_name: String,
    /// Requested state, `0` or `1` for two-state outputs.
    pub target: u8,
    /// User control code. Sent in the form, never logged.
    pub code: SecretString,
}

impl JablonetClient {
    /// Send one control command.
    ///
    /// A wrong control code is *not* an error at this layer: the envelope
    /// still says `status: 200` and the rejection is reported through
    /// [`ControlResponse::authorization`].
    pub async fn send_control(
        &self,
        request: &ControlRequest,
        service_id: Option<&str>,
    ) -> Result<ControlResponse, Error> {
        let url = self.endpoint(CONTROL_PATH)?;
        let referer = self.device_page_url(service_id)?;
        let target = request.target.to_string();

        debug!(
            point = %request.point_id,
            section = %request.state_name,
            target = request.target,
            "sending control command"
        );

        let mut form = vec![
            ("section", request.state_name.as_str()),
            ("status", target.as_str()),
            ("code", request.code.expose_secret()),
            ("uid", request.point_id.as_str()),
        ];
        if let Some(id) = service_id {
            form.push(("service_id", id));
        }

        let body = self.post_envelope(url, &form, &referer).await?;
        serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_string(),
        })
    }
}
