pub mod client;
pub mod naming;
pub mod publisher;
pub mod signer;

pub use client::{HttpIndexClient, IndexBackend, IndexError};
pub use naming::IndexName;
pub use publisher::{DocumentPublisher, IndexTarget};
pub use signer::{HeaderSigner, RequestSigner, SigningError, Unsigned};

use crate::config::types::AuthConfig;
use std::sync::Arc;

/// Build the request signer selected by the `auth` config section
pub fn signer_from_config(auth: &AuthConfig) -> Result<Arc<dyn RequestSigner>, SigningError> {
    let signer: Arc<dyn RequestSigner> = match auth {
        AuthConfig::None => Arc::new(Unsigned),
        AuthConfig::Header { name, value } => Arc::new(HeaderSigner::new(name, value)?),
    };
    Ok(signer)
}
