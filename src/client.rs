//! Client entry point.

use crate::config::ClientConfig;
use crate::error::DwsError;
use crate::http::{HttpClient, Transport};
use crate::input::FileInput;
use crate::workflow::Workflow;

/// Client for the Nutrient Document Web Services API.
///
/// Owns one connection pool. Build multi-step requests with
/// [`DwsClient::build`], or call the single-operation helpers (see
/// [`crate::direct`]) directly on the client.
///
/// ```rust,no_run
/// # fn main() -> Result<(), nutrient_dws::DwsError> {
/// use nutrient_dws::DwsClient;
/// use std::path::Path;
///
/// // Falls back to NUTRIENT_API_KEY when no key is given.
/// let client = DwsClient::new(None)?;
/// client.convert_to_pdf("report.docx", Some(Path::new("report.pdf")))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DwsClient {
    http: HttpClient,
}

impl DwsClient {
    /// Client with default settings.
    ///
    /// `api_key` overrides the `NUTRIENT_API_KEY` environment variable. A
    /// missing key is not an error here; the first request reports it.
    pub fn new(api_key: Option<&str>) -> Result<Self, DwsError> {
        let mut builder = ClientConfig::builder();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        Self::with_config(builder.build()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, DwsError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    /// Client over a custom [`Transport`]. The key is resolved from `config`
    /// and the environment as usual.
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        let api_key = config.resolve_api_key();
        Self {
            http: HttpClient::with_transport(config, api_key, transport),
        }
    }

    /// Start a workflow over one input.
    pub fn build(&self, input: impl Into<FileInput>) -> Workflow<'_> {
        Workflow::new(&self.http, input.into())
    }

    /// Start a workflow that concatenates `inputs` in order.
    pub fn build_merge<I>(&self, inputs: I) -> Result<Workflow<'_>, DwsError>
    where
        I: IntoIterator,
        I::Item: Into<FileInput>,
    {
        Workflow::merge(&self.http, inputs.into_iter().map(Into::into).collect())
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Release pooled connections. Later requests fail with
    /// [`DwsError::ClientClosed`]. Safe to call more than once.
    pub fn close(&mut self) {
        self.http.close();
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_closed()
    }
}
