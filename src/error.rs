//! Error types, gathered for callers that handle several at once.
//!
//! Each type lives next to the code that produces it. None of them is
//! fatal to the poll loop: the controller logs them and carries on.
//!
//! | Error | Raised by | Controller reaction |
//! |-------|-----------|---------------------|
//! | [`CredentialError`] | UID parsing | value rejected |
//! | [`ColorError`] | color parsing | enrollment aborts |
//! | [`RegistryError`] | registry writes | transition vetoed or enrollment aborts |
//! | [`EnrollError`] | enrollment dialogue | back to IDLE |
//! | [`BusError`] | event publish | event dropped |
//! | [`ConfigError`] | config file parsing | binary exits |

pub use crate::bus::BusError;
pub use crate::config::ConfigError;
pub use crate::credential::{ColorError, CredentialError};
pub use crate::enrollment::{EnrollError, EnrollStep};
pub use crate::registry::RegistryError;
