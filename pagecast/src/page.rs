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

use anyhow::Result;
use log::{error, info, warn};
use phone_proto::Action;

use crate::broadcast::broadcast;
use crate::control::ControlClient;
use crate::{pipeline, session, SessionParams};

/// What one page run amounted to; the caller decides the exit status.
#[derive(Debug)]
pub struct Summary {
    pub acknowledged: usize,
    pub removed: usize,
    /// The pipeline ran to end-of-stream.
    pub streamed: bool,
    /// The pipeline could not be constructed at all.
    pub build_failed: bool,
}

/// Page the targets: tell every phone to start receiving, stream the file
/// to whoever acknowledged, then tell the survivors to stop.
///
/// The stop fan-out covers the survivor set whenever the start fan-out
/// produced one, no matter how streaming went.
pub async fn run(params: &SessionParams, targets: &[Ipv4Addr]) -> Result<Summary> {
    let client = ControlClient::new(params.timeout, params.credentials())?;
    run_with_client(&client, params, targets).await
}

async fn run_with_client(
    client: &ControlClient,
    params: &SessionParams,
    targets: &[Ipv4Addr],
) -> Result<Summary> {
    let source = source_address(params)?;

    let document = phone_proto::start_media(
        &source.to_string(),
        params.port,
        params.codec.wire_name(),
        params.volume,
    );
    info!("Starting media stream on {} target(s)", targets.len());
    let (survivors, failures) =
        broadcast(targets, |target| client.execute(target, Action::Start, &document)).await;

    let mut summary = Summary {
        acknowledged: survivors.len(),
        removed: failures.len(),
        streamed: false,
        build_failed: false,
    };

    if survivors.is_empty() {
        warn!("No target acknowledged the start request, nothing to stream");
        return Ok(summary);
    }

    match pipeline::build(params, &survivors) {
        Ok(graph) => match session::run(graph).await {
            Ok(()) => {
                info!("Stream finished");
                summary.streamed = true;
            }
            Err(err) => error!("Streaming failed: {err}"),
        },
        Err(err) => {
            error!("Cannot stream: {err}");
            summary.build_failed = true;
        }
    }

    info!("Stopping media stream on {} target(s)", survivors.len());
    let document = phone_proto::stop_media();
    let _ = broadcast(&survivors, |target| {
        client.execute(target, Action::Stop, &document)
    })
    .await;

    Ok(summary)
}

/// The address every phone is told to receive from: the multicast group
/// when one was given, otherwise a local address shared by all targets.
fn source_address(params: &SessionParams) -> Result<Ipv4Addr> {
    if let Some(group) = params.multicast {
        return Ok(group);
    }
    local_ipv4().ok_or_else(|| anyhow::anyhow!("no usable local IPv4 address to stream from"))
}

fn local_ipv4() -> Option<Ipv4Addr> {
    for iface in pnet_datalink::interfaces() {
        if iface.is_loopback() || !iface.is_up() {
            continue;
        }
        for net in &iface.ips {
            if let ipnetwork::IpNetwork::V4(v4) = net {
                return Some(v4.ip());
            }
        }
    }
    None
}
