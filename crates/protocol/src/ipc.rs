//! Commands sent from the UI to the controller.
//!
//! The UI observes the controller through state subscription; it drives it
//! by sending `Op`s. Uses tagged enum serialization for TypeScript
//! compatibility:
//! ```json
//! {
//!   "type": "open",
//!   "payload": {
//!     "agent_type": "image_generation",
//!     "form_input": { "description": "lion" },
//!     "session_id": "session-1"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::execution_models::{AgentType, FormInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Open the workflow on the form, optionally prefilled.
    Open {
        agent_type: AgentType,
        #[serde(default)]
        form_input: FormInput,
        #[serde(default)]
        session_id: Option<String>,
    },

    /// Submit validated form input.
    Submit { form_input: FormInput },

    /// Abandon the running execution. Client-side only.
    Cancel,

    /// The user is done with the result.
    Continue,

    /// Close the workflow without continuing.
    Close,
}
