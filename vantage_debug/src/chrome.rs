// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use vantage_core::error::Origin;

use crate::recorder::{RecordedEvent, decode};

/// Thread lane per service, so each gets its own row in the viewer.
fn lane(origin: Origin) -> u32 {
    match origin {
        Origin::Observer => 1,
        Origin::Frame => 2,
        Origin::Scroll => 3,
        Origin::Mount => 4,
    }
}

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Host time ticks are already microseconds. Events that carry no time of
/// their own are placed at the most recent timestamp seen before them.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut cursor = 0_u64;

    for recorded in decode(bytes) {
        if let Some(at) = recorded.timestamp() {
            cursor = at.ticks();
        }
        match recorded {
            RecordedEvent::LoopState(e) => {
                let name = if e.running { "LoopStart" } else { "LoopStop" };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Loop",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(e.origin),
                    "s": "t",
                    "args": {
                        "subscribers": e.subscribers,
                    }
                }));
            }
            RecordedEvent::FrameDispatch(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameDispatch",
                    "cat": "Scheduler",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Frame),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "delta_us": e.delta.ticks(),
                        "subscribers": e.subscribers,
                    }
                }));
            }
            RecordedEvent::FrameSkipped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSkipped",
                    "cat": "Scheduler",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Frame),
                    "s": "t",
                    "args": {
                        "elapsed_us": e.elapsed.ticks(),
                        "interval_us": e.interval.ticks(),
                    }
                }));
            }
            RecordedEvent::SubscriberFault {
                origin,
                subscriber,
                message,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "SubscriberFault",
                    "cat": "Fault",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(origin),
                    "s": "p",
                    "args": {
                        "subscriber": subscriber,
                        "message": message,
                    }
                }));
            }
            RecordedEvent::ObserverCreated { key, pooled } => {
                events.push(json!({
                    "ph": "i",
                    "name": "ObserverCreated",
                    "cat": "Observer",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Observer),
                    "s": "t",
                    "args": {
                        "key": key,
                        "pooled": pooled,
                    }
                }));
            }
            RecordedEvent::IntersectionBatch {
                key,
                entries,
                delivered,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "IntersectionBatch",
                    "cat": "Observer",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Observer),
                    "s": "t",
                    "args": {
                        "key": key,
                        "entries": entries,
                        "delivered": delivered,
                    }
                }));
            }
            RecordedEvent::ScrollBroadcast(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "ScrollPosition",
                    "cat": "Scroll",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Scroll),
                    "args": {
                        "y": e.position,
                        "coalesced": e.coalesced,
                    }
                }));
            }
            RecordedEvent::Degraded { origin, api } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Degraded",
                    "cat": "Fault",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(origin),
                    "s": "g",
                    "args": {
                        "api": api,
                    }
                }));
            }
            RecordedEvent::MountTransition {
                component,
                from,
                to,
                ..
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{component}: {}", to.as_str()),
                    "cat": "Mount",
                    "ts": cursor,
                    "pid": 0,
                    "tid": lane(Origin::Mount),
                    "s": "t",
                    "args": {
                        "component": component,
                        "from": from.as_str(),
                        "to": to.as_str(),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
