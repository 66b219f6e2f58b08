// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::output::{OutputEvent, OutputKind};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// The output area: an append-only list of events until the next clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSurface {
    segments: Vec<OutputEvent>,
}

impl OutputSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: OutputEvent) {
        self.segments.push(event);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[OutputEvent] {
        &self.segments
    }

    /// Everything appended so far, streams interleaved in arrival order.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Text with stderr segments wrapped in red when `ansi` is set.
    pub fn render(&self, ansi: bool) -> String {
        let mut rendered = String::new();
        for segment in &self.segments {
            rendered.push_str(&paint(segment, ansi));
        }
        rendered
    }
}

/// Render one segment the way [`OutputSurface::render`] does.
pub fn paint(segment: &OutputEvent, ansi: bool) -> String {
    match segment.kind {
        OutputKind::Stderr if ansi => format!("{ANSI_RED}{}{ANSI_RESET}", segment.text),
        _ => segment.text.clone(),
    }
}
