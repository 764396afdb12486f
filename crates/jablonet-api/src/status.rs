// Status endpoint (stav.php)

use crate::client::JablonetClient;
use crate::error::Error;
use crate::models::StatusPayload;

pub(crate) const STATUS_PATH: &str = "/app/ja100/ajax/stav.php";

impl JablonetClient {
    /// Fetch the full panel status.
    ///
    /// Requires an established session. Returns [`Error::SessionExpired`]
    /// on `status: 300`; every other non-success outcome is one of the
    /// transport/envelope variants.
    pub async fn fetch_status(&self, service_id: Option<&str>) -> Result<StatusPayload, Error> {
        let url = self.endpoint(STATUS_PATH)?;
        let referer = self.device_page_url(service_id)?;

        // `heat` is the tab that carries thermometers and PGM outputs.
        let mut form = vec![("activeTab", "heat")];
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
