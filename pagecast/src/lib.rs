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

pub mod broadcast;
pub mod control;
pub mod page;
pub mod pipeline;
pub mod session;

/// Audio codec the phones are told to receive and the pipeline encodes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Codec {
    G711,
    G722,
}

impl Codec {
    /// Codec name as it appears in the control protocol.
    pub fn wire_name(self) -> &'static str {
        match self {
            Codec::G711 => "G.711",
            Codec::G722 => "G.722",
        }
    }

    pub fn sample_rate(self) -> i32 {
        match self {
            Codec::G711 => 8000,
            Codec::G722 => 16000,
        }
    }

    pub fn encoder(self) -> &'static str {
        match self {
            Codec::G711 => "mulawenc",
            Codec::G722 => "avenc_g722",
        }
    }

    pub fn payloader(self) -> &'static str {
        match self {
            Codec::G711 => "rtppcmupay",
            Codec::G722 => "rtpg722pay",
        }
    }

    /// Static RTP payload type assignment.
    pub fn payload_type(self) -> u32 {
        match self {
            Codec::G711 => 0,
            Codec::G722 => 9,
        }
    }
}

/// Everything one paging session needs, validated up front and never mutated.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub multicast: Option<Ipv4Addr>,
    pub port: u16,
    pub volume: Option<u8>,
    pub codec: Codec,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub file: PathBuf,
}

impl SessionParams {
    /// Basic credentials for the control client, present only when a
    /// non-empty username was supplied.
    pub fn credentials(&self) -> Option<(String, String)> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| (u.to_owned(), self.password.clone().unwrap_or_default()))
    }
}
