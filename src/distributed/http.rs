//! Shipping fragments to remote sites over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{Communicator, QueryPlan, QueryProcessor};
use crate::config::Config;
use crate::execution::{ExecutionError, ExecutionResult};
use crate::protocol::xml;
use crate::relation::Relation;

/// Delivers one relation to a named site.
pub trait Transport: Send + Sync {
    fn send(&self, site: &str, relation: &Relation) -> ExecutionResult<()>;
}

/// POSTs the XML form of a relation to `{base_url}/query` of the site.
///
/// Uses a blocking client; call it from a plain thread or from
/// `spawn_blocking`, never directly on an async executor.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    sites: BTreeMap<String, String>,
}

impl HttpTransport {
    pub fn new(sites: BTreeMap<String, String>, timeout: Duration) -> ExecutionResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::Transport {
                site: String::new(),
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(HttpTransport { client, sites })
    }

    pub fn from_config(config: &Config) -> ExecutionResult<Self> {
        HttpTransport::new(config.sites.clone(), Duration::from_millis(config.http.timeout_ms))
    }

    /// Endpoint fragments for `site` are posted to.
    pub fn endpoint(&self, site: &str) -> ExecutionResult<String> {
        let base = self
            .sites
            .get(site)
            .ok_or_else(|| ExecutionError::UnknownSite(site.to_owned()))?;
        Ok(format!("{}/query", base.trim_end_matches('/')))
    }
}

impl Transport for HttpTransport {
    fn send(&self, site: &str, relation: &Relation) -> ExecutionResult<()> {
        let url = self.endpoint(site)?;
        let body = xml::to_xml_string(relation);
        let transport_error = |message: String| ExecutionError::Transport {
            site: site.to_owned(),
            message,
        };

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .map_err(|e| transport_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport_error(format!("{url} answered {status}")));
        }
        debug!(site = %site, url = %url, "fragment_sent");
        Ok(())
    }
}

/// Push-only communicator for sites running their own server.
///
/// Remote sites evaluate and forward on their own, so the processor never
/// sees a final answer: [`QueryProcessor::result`] is always `None`.
#[derive(Debug)]
pub struct HttpCommunicator<T> {
    transport: T,
}

impl<T: Transport> HttpCommunicator<T> {
    pub fn new(transport: T) -> Self {
        HttpCommunicator { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Communicator for HttpCommunicator<T> {
    fn query_processor(&self, plan: QueryPlan) -> Box<dyn QueryProcessor + '_> {
        Box::new(HttpQueryProcessor {
            transport: &self.transport,
            plan,
        })
    }
}

pub struct HttpQueryProcessor<'c, T> {
    transport: &'c T,
    plan: QueryPlan,
}

impl<T: Transport> QueryProcessor for HttpQueryProcessor<'_, T> {
    /// Send every fragment. All sends are attempted; the first failure is
    /// reported.
    fn run(&mut self) -> ExecutionResult<()> {
        let mut first_error = None;
        for (site, fragment) in self.plan.iter() {
            if let Err(e) = self.transport.send(site, fragment) {
                warn!(site = %site, error = %e, "fragment_undeliverable");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn result(&self) -> Option<&Relation> {
        None
    }
}
