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
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use pagecast::{page, Codec, SessionParams};

/// Play a WAV file on a set of IP phones over RTP.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// WAV file to play
    file: PathBuf,

    /// Phones to page
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<Ipv4Addr>,

    /// Stream to this multicast group instead of one stream per phone
    #[arg(long, value_name = "GROUP")]
    multicast: Option<Ipv4Addr>,

    /// RTP destination port
    #[arg(long, default_value_t = 20480)]
    port: u16,

    /// Receive volume the phones are asked to use
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    #[arg(long, value_enum, default_value_t = Codec::G711)]
    codec: Codec,

    /// Username for phones that require authentication
    #[arg(long)]
    username: Option<String>,

    /// Password for phones that require authentication
    #[arg(long)]
    password: Option<String>,

    /// Control request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_module("pagecast", log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    if let Some(group) = args.multicast {
        if !group.is_multicast() {
            bail!("{group} is not a multicast address");
        }
    }

    gst::init()?;

    let params = SessionParams {
        multicast: args.multicast,
        port: args.port,
        volume: args.volume,
        codec: args.codec,
        username: args.username,
        password: args.password,
        timeout: Duration::from_secs(args.timeout),
        file: args.file,
    };

    let summary = page::run(&params, &args.targets).await?;

    if summary.acknowledged == 0 {
        bail!("no target acknowledged the start request");
    }
    if summary.build_failed {
        bail!("the audio pipeline could not be constructed");
    }

    Ok(())
}
