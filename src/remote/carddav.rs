//! CardDAV access with a single PROPFIND over blocking reqwest.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::remote::Remote;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop>
    <card:address-data />
  </d:prop>
</d:propfind>"#;

/// CardDAV remote implementation
pub struct CardDavRemote {
    client: Client,
    url: String,
    username: String,
    password: String,
}

impl CardDavRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|source| Error::Fetch {
                url: config.url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn fetch_error(&self, source: reqwest::Error) -> Error {
        Error::Fetch {
            url: self.url.clone(),
            source,
        }
    }
}

impl Remote for CardDavRemote {
    fn fetch_address_data(&self) -> Result<String> {
        tracing::info!(url = %self.url, "fetching address book");

        let response = self
            .client
            .request(propfind(), &self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .header("Depth", "1")
            .body(PROPFIND_BODY)
            .send()
            .map_err(|e| self.fetch_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| self.fetch_error(e))?;
        tracing::debug!(bytes = body.len(), "received multistatus response");
        extract_address_data(&body)
    }
}

fn propfind() -> Method {
    Method::from_bytes(b"PROPFIND").expect("PROPFIND is a valid method token")
}

/// Concatenate every `prop/address-data` payload of a multistatus response.
pub fn extract_address_data(xml: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|err| Error::MalformedResponse(err.to_string()))?;

    let cards: Vec<String> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "address-data")
        .filter(|n| {
            n.parent_element()
                .map(|p| p.tag_name().name() == "prop")
                .unwrap_or(false)
        })
        .map(|n| {
            n.descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect::<String>()
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    Ok(cards.join("\n"))
}
