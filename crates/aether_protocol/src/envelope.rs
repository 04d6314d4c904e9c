use crate::action::Action;
use crate::error::Result;

/// The request envelope handed down by the transport (spec §3, §6).
///
/// `data` is opaque at this layer; each handler decodes it into its own
/// request struct via [`crate::requests`].
#[derive(Debug, Clone)]
pub struct Envelope {
    pub action: Action,
    pub data: Vec<u8>,
    pub request_id: Option<u32>,
}

impl Envelope {
    pub fn decode(action_code: u8, data: Vec<u8>, request_id: Option<u32>) -> Result<Self> {
        let action = Action::try_from(action_code)?;
        Ok(Self {
            action,
            data,
            request_id,
        })
    }
}
