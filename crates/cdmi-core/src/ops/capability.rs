//! Static capability documents.
//!
//! The capability tree is not backed by any storage. It has a system root
//! node and one node per resource type:
//!
//! ```text
//! cdmi_capabilities/
//! ├── rootcontainer/
//! ├── container/
//! └── dataobject/
//! ```

use cdmi_http::body::CdmiResponseBody;
use cdmi_http::response::json_response;
use cdmi_model::error::CdmiError;
use cdmi_model::headers::CDMI_CAPABILITY;
use cdmi_model::representation::{COMPLETE, CapabilityRepresentation};
use http::StatusCode;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::gateway::{CdmiGateway, OperationRequest};

/// Capability nodes below the system root.
const LEVELS: [&str; 3] = ["rootcontainer", "container", "dataobject"];

/// Flags of one capability level.
fn level_capabilities(level: &str) -> Option<Map<String, Value>> {
    let flags = match level {
        "rootcontainer" => json!({
            "cdmi_list_children": true,
            "cdmi_create_container": true,
        }),
        "container" => json!({
            "cdmi_list_children": "true",
            "cdmi_read_metadata": "true",
            "cdmi_modify_metadata": "true",
            "cdmi_create_dataobject": "true",
            "cdmi_delete_container": "true",
            "cdmi_create_container": "true",
            "cdmi_copy_dataobject": "true",
        }),
        "dataobject" => json!({
            "cdmi_read_value": "true",
            "cdmi_read_metadata": "true",
            "cdmi_modify_value": "true",
            "cdmi_modify_metadata": "true",
            "cdmi_delete_dataobject": "true",
        }),
        _ => return None,
    };
    match flags {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn root_capabilities() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("cdmi_dataobjects".to_owned(), json!("true"));
    map.insert("cdmi_object_copy_from_local".to_owned(), json!("true"));
    map.insert("cdmi_multipart_mime".to_owned(), json!("true"));
    map.insert("cdmi_metadata_maxitems".to_owned(), json!(90));
    map.insert("cdmi_metadata_maxtotalsize".to_owned(), json!(368_640));
    map
}

#[allow(clippy::unused_async)]
impl CdmiGateway {
    /// Render the capability document addressed by the path.
    ///
    /// The level is the segment after the capability label (in container
    /// position of the decomposed path). No level selects the system root.
    /// An unknown level is answered with 404 and an empty JSON object.
    pub(crate) async fn handle_capability_read(
        &self,
        req: &OperationRequest,
    ) -> Result<http::Response<CdmiResponseBody>, CdmiError> {
        let account = req.ctx.path.account.as_deref().unwrap_or_default();
        let capability_id = self.config.cdmi_capability_id.as_str();
        let level = req.ctx.path.container.as_deref();
        debug!(account, level, "capability read");

        let Some(level) = level else {
            let repr = CapabilityRepresentation {
                object_type: CDMI_CAPABILITY.to_owned(),
                object_name: format!("{capability_id}/"),
                parent_uri: self.uri(&[account]),
                capabilities: root_capabilities(),
                children: LEVELS.iter().map(|l| format!("{l}/")).collect(),
                children_range: format!("0-{}", LEVELS.len() - 1),
                completion_status: COMPLETE.to_owned(),
            };
            return json_response(StatusCode::OK, CDMI_CAPABILITY, &repr);
        };

        let Some(capabilities) = level_capabilities(level) else {
            return json_response(StatusCode::NOT_FOUND, CDMI_CAPABILITY, &json!({}));
        };
        let repr = CapabilityRepresentation {
            object_type: CDMI_CAPABILITY.to_owned(),
            object_name: format!("{level}/"),
            parent_uri: self.uri(&[account, capability_id]),
            capabilities,
            children: Vec::new(),
            children_range: "0-0".to_owned(),
            completion_status: COMPLETE.to_owned(),
        };
        json_response(StatusCode::OK, CDMI_CAPABILITY, &repr)
    }
}
