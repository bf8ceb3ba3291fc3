use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;
const USER_AGENT: &str = concat!("fixture_scout/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client for dataset downloads.
pub fn download_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build download client")
    })
}

pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = download_client()?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request {url} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {status} from {url}"));
    }
    let body = resp.bytes().context("failed reading body")?;
    Ok(body.to_vec())
}
