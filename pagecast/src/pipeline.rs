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

use gst::prelude::*;

use crate::{Codec, SessionParams};

// 20 ms in ns. min-ptime == max-ptime, so packet sizing never adapts.
const PACKET_TIME: i64 = 20_000_000;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A required element is missing from the local GStreamer install.
    #[error("required element '{0}' is not available")]
    MissingElement(&'static str),
    #[error("failed to assemble pipeline: {0}")]
    Assemble(#[from] gst::glib::BoolError),
}

/// Build the send pipeline for one paging session:
///
/// filesrc → wavparse → audioconvert → audioresample → capsfilter →
/// encoder → RTP payloader → network sink.
///
/// The caps filter pins the codec's sample rate and mono channel layout on
/// the resample→encode link. Nothing runs yet; execution belongs to
/// [`crate::session::run`].
pub fn build(params: &SessionParams, targets: &[Ipv4Addr]) -> Result<gst::Pipeline, BuildError> {
    let src = gst::ElementFactory::make("filesrc")
        .property("location", params.file.to_string_lossy().as_ref())
        .build()
        .map_err(|_| BuildError::MissingElement("filesrc"))?;
    let parse = gst::ElementFactory::make("wavparse")
        .build()
        .map_err(|_| BuildError::MissingElement("wavparse"))?;
    let convert = gst::ElementFactory::make("audioconvert")
        .build()
        .map_err(|_| BuildError::MissingElement("audioconvert"))?;
    let resample = gst::ElementFactory::make("audioresample")
        .build()
        .map_err(|_| BuildError::MissingElement("audioresample"))?;

    let capsfilter = gst::ElementFactory::make("capsfilter")
        .name("encoder_caps")
        .property("caps", audio_caps(params.codec))
        .build()
        .map_err(|_| BuildError::MissingElement("capsfilter"))?;

    let encode = gst::ElementFactory::make(params.codec.encoder())
        .build()
        .map_err(|_| BuildError::MissingElement(params.codec.encoder()))?;
    let pay = gst::ElementFactory::make(params.codec.payloader())
        .name("rtp_pay")
        .property("pt", params.codec.payload_type())
        .property("min-ptime", PACKET_TIME)
        .property("max-ptime", PACKET_TIME)
        .build()
        .map_err(|_| BuildError::MissingElement(params.codec.payloader()))?;

    let sink = match params.multicast {
        Some(group) => gst::ElementFactory::make("udpsink")
            .name("net_sink")
            .property("host", group.to_string())
            .property("port", params.port as i32)
            .property("auto-multicast", true)
            .build()
            .map_err(|_| BuildError::MissingElement("udpsink"))?,
        // One stream per phone, synchronized to the pipeline clock so the
        // copies stay phase-aligned.
        None => gst::ElementFactory::make("multiudpsink")
            .name("net_sink")
            .property("clients", client_list(targets, params.port))
            .property("sync", true)
            .build()
            .map_err(|_| BuildError::MissingElement("multiudpsink"))?,
    };

    let pipeline = gst::Pipeline::new();
    let elements = [
        &src,
        &parse,
        &convert,
        &resample,
        &capsfilter,
        &encode,
        &pay,
        &sink,
    ];
    pipeline.add_many(elements)?;
    gst::Element::link_many(elements)?;

    Ok(pipeline)
}

fn audio_caps(codec: Codec) -> gst::Caps {
    gst::Caps::builder("audio/x-raw")
        .field("rate", codec.sample_rate())
        .field("channels", 1i32)
        .build()
}

fn client_list(targets: &[Ipv4Addr], port: u16) -> String {
    targets
        .iter()
        .map(|target| format!("{target}:{port}"))
        .collect::<Vec<_>>()
        .join(",")
}
