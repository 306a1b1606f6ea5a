//! Built-in system domain.
//!
//! Every registry carries this domain. Handlers report failures by raising
//! [`RaiseError`]; the system command handler turns it into an
//! [`ErrorRaised`] event on the [`ErrorLog`] aggregate.

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::compiler::{DomainDefinition, MessageGroup};
use crate::domain::Domain;
use crate::error::CompileError;
use crate::payload::{MessageDefinition, Payload};

pub const SYSTEM_DOMAIN_URI: &str = "cqrs/system/v1";

/// Requests that an error be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiseError {
    pub message: String,
}

impl MessageDefinition for RaiseError {
    const DOMAIN_URI: &'static str = SYSTEM_DOMAIN_URI;
}

/// A recorded error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRaised {
    pub message: String,
}

impl MessageDefinition for ErrorRaised {
    const DOMAIN_URI: &'static str = SYSTEM_DOMAIN_URI;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLog {
    pub count: u64,
    pub last: Option<String>,
}

impl Aggregate for ErrorLog {
    fn apply(&mut self, event: &dyn Payload) {
        if let Some(raised) = event.downcast_ref::<ErrorRaised>() {
            self.count += 1;
            self.last = Some(raised.message.clone());
        }
    }
}

pub fn system_domain() -> Result<Domain, CompileError> {
    DomainDefinition::new(SYSTEM_DOMAIN_URI)
        .aggregate::<ErrorLog>()
        .commands(MessageGroup::commands().message::<RaiseError>())
        .events(MessageGroup::events().message::<ErrorRaised>())
        .compile()
}
