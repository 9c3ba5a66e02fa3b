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

use futures::StreamExt;
use gst::prelude::*;
use log::{debug, error};

/// A stage faulted while the pipeline was running.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StageError {
    pub message: String,
    pub debug: Option<String>,
}

/// Drive the pipeline to completion.
///
/// Sets every stage playing, then waits on the bus for the first
/// end-of-stream or stage error; nothing else affects control flow. The
/// pipeline is dropped back to Null on every exit path, a failed start
/// included.
pub async fn run(pipeline: gst::Pipeline) -> Result<(), StageError> {
    let bus = pipeline.bus().expect("pipeline without bus");

    if let Err(err) = pipeline.set_state(gst::State::Playing) {
        shutdown(&pipeline);
        return Err(StageError {
            message: format!("failed to start pipeline: {err}"),
            debug: None,
        });
    }
    debug!("Pipeline playing");

    let mut messages = bus.stream();
    let outcome = loop {
        let Some(msg) = messages.next().await else {
            // The bus stream only ends when the pipeline goes away.
            break Ok(());
        };

        match msg.view() {
            gst::MessageView::Eos(..) => {
                debug!("End of stream");
                break Ok(());
            }
            gst::MessageView::Error(err) => {
                error!(
                    "Error from {:?}: {} ({:?})",
                    err.src().map(|s| s.path_string()),
                    err.error(),
                    err.debug()
                );
                break Err(StageError {
                    message: err.error().to_string(),
                    debug: err.debug().map(|d| d.to_string()),
                });
            }
            _ => (),
        }
    };
    drop(messages);

    shutdown(&pipeline);
    outcome
}

fn shutdown(pipeline: &gst::Pipeline) {
    if let Err(err) = pipeline.set_state(gst::State::Null) {
        error!("Failed to shut down pipeline: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(src: gst::Element, sink: gst::Element) -> gst::Pipeline {
        let pipeline = gst::Pipeline::new();
        pipeline.add_many([&src, &sink]).unwrap();
        gst::Element::link_many([&src, &sink]).unwrap();
        pipeline
    }

    #[tokio::test]
    async fn completes_on_end_of_stream() {
        gst::init().unwrap();

        let src = gst::ElementFactory::make("fakesrc")
            .property("num-buffers", 4i32)
            .build()
            .unwrap();
        let sink = gst::ElementFactory::make("fakesink").build().unwrap();
        let pipeline = linked(src, sink);

        assert!(run(pipeline.clone()).await.is_ok());
        assert_eq!(pipeline.current_state(), gst::State::Null);
    }

    #[tokio::test]
    async fn reports_stage_error_and_tears_down() {
        gst::init().unwrap();

        let src = gst::ElementFactory::make("filesrc")
            .property("location", "/nonexistent/page.wav")
            .build()
            .unwrap();
        let sink = gst::ElementFactory::make("fakesink").build().unwrap();
        let pipeline = linked(src, sink);

        assert!(run(pipeline.clone()).await.is_err());
        assert_eq!(pipeline.current_state(), gst::State::Null);
    }
}
