// Copyright (C) 2026 Marcus L. Hanestad <marlhan@proton.me>
//
// This file is part of Pagecast.
//
// Pagecast is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Pagecast is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Pagecast.  If not, see <https://www.gnu.org/licenses/>.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;
use log::trace;
use phone_proto::{Action, Reply};

const CONTROL_PORT: u16 = 80;
const CONTROL_PATH: &str = "/CGI/Execute";
const EXPECTED_CONTENT_TYPE: &str = "text/xml";

/// Why a phone was removed from the working set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The phone could not be reached, timed out, or answered non-2xx.
    #[error("transport: {0}")]
    Transport(String),
    /// The phone answered, but with an error report or a response this
    /// action does not expect.
    #[error("{kind}: {detail}")]
    Protocol { kind: String, detail: String },
}

impl ControlError {
    fn protocol(kind: &str, detail: impl Into<String>) -> Self {
        ControlError::Protocol {
            kind: kind.to_owned(),
            detail: detail.into(),
        }
    }
}

/// Issues one control request to one phone. No retries; retry policy, if
/// ever wanted, belongs to the caller.
pub struct ControlClient {
    http: reqwest::Client,
    credentials: Option<(String, String)>,
    port: u16,
}

impl ControlClient {
    pub fn new(timeout: Duration, credentials: Option<(String, String)>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            credentials,
            port: CONTROL_PORT,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_port(
        timeout: Duration,
        credentials: Option<(String, String)>,
        port: u16,
    ) -> Result<Self> {
        let mut client = Self::new(timeout, credentials)?;
        client.port = port;
        Ok(client)
    }

    /// Post `document` to `target`'s execute endpoint and classify the answer.
    pub async fn execute(
        &self,
        target: Ipv4Addr,
        action: Action,
        document: &str,
    ) -> Result<(), ControlError> {
        let url = format!("http://{target}:{}{CONTROL_PATH}", self.port);
        trace!("POST {url}: {document}");

        let mut request = self.http.post(&url).form(&[("XML", document)]);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|err| ControlError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Transport(format!("status {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            != EXPECTED_CONTENT_TYPE
        {
            return Err(ControlError::protocol("unexpected-content-type", content_type));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ControlError::Transport(err.to_string()))?;

        match phone_proto::classify(action, &body) {
            Ok(Reply::Ack) => Ok(()),
            Ok(Reply::ErrorReport { kind, data }) => Err(ControlError::Protocol { kind, detail: data }),
            Ok(Reply::ErrorCode { number }) => Err(ControlError::protocol("error-code", number)),
            Ok(Reply::Unexpected { root }) => {
                Err(ControlError::protocol("unexpected-response", root))
            }
            Err(err) => Err(ControlError::protocol("parse-error", err.to_string())),
        }
    }
}
