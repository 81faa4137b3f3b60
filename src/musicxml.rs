//! MusicXML Export
//!
//! Writes a [`Score`] as a MusicXML 3.1 partwise document. Measures are cut
//! from the time signature; events crossing a barline, or lasting a length no
//! single note value can express, are split into tied pieces.

use crate::pitch::NamedPitch;
use crate::score::{Score, ScoreEvent, TICKS_PER_QUARTER};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PART_ID: &str = "P1";

/// Expressible note values in ticks, longest first, with their type and dot.
const NOTE_VALUES: [(u32, &str, bool); 8] = [
    (16, "whole", false),
    (12, "half", true),
    (8, "half", false),
    (6, "quarter", true),
    (4, "quarter", false),
    (3, "eighth", true),
    (2, "eighth", false),
    (1, "16th", false),
];

/// Errors when exporting a score.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Formatting the document failed.
    #[error("failed to format MusicXML: {0}")]
    Format(#[from] std::fmt::Error),

    /// Writing the file failed.
    #[error("failed to write {}: {}", .path.display(), .source)]
    Io {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Document-level metadata for the export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Work title.
    pub title: String,
    /// Name of the single part.
    pub part_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            title: "Transcription".to_string(),
            part_name: "Melody".to_string(),
        }
    }
}

/// Render `score` as a MusicXML string.
pub fn to_musicxml(score: &Score, options: &ExportOptions) -> Result<String, ExportError> {
    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#)?;
    writeln!(
        out,
        r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#
    )?;
    writeln!(out, r#"<score-partwise version="3.1">"#)?;
    writeln!(out, "  <work>")?;
    writeln!(out, "    <work-title>{}</work-title>", escape(&options.title))?;
    writeln!(out, "  </work>")?;
    writeln!(out, "  <identification>")?;
    writeln!(out, "    <encoding>")?;
    writeln!(
        out,
        "      <software>{} {}</software>",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "    </encoding>")?;
    writeln!(out, "  </identification>")?;
    writeln!(out, "  <part-list>")?;
    writeln!(out, r#"    <score-part id="{PART_ID}">"#)?;
    writeln!(out, "      <part-name>{}</part-name>", escape(&options.part_name))?;
    writeln!(out, "    </score-part>")?;
    writeln!(out, "  </part-list>")?;
    writeln!(out, r#"  <part id="{PART_ID}">"#)?;

    let mut part = PartWriter::new(&mut out, score);
    part.open_measure()?;
    part.write_header()?;
    for event in score.events() {
        part.write_event(event)?;
    }
    part.finish()?;

    writeln!(out, "  </part>")?;
    writeln!(out, "</score-partwise>")?;
    Ok(out)
}

/// Render `score` and write it to `path`.
pub fn write_musicxml<P: AsRef<Path>>(
    score: &Score,
    path: P,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let xml = to_musicxml(score, options)?;
    fs::write(path, xml).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {} events to {}", score.events().len(), path.display());
    Ok(())
}

/// Streams notes into measures, tracking the position inside the current one.
struct PartWriter<'a> {
    out: &'a mut String,
    score: &'a Score,
    measure_ticks: u32,
    number: u32,
    position: u32,
}

impl<'a> PartWriter<'a> {
    fn new(out: &'a mut String, score: &'a Score) -> Self {
        PartWriter {
            out,
            score,
            measure_ticks: score.time_signature().measure_ticks(),
            number: 0,
            position: 0,
        }
    }

    fn open_measure(&mut self) -> std::fmt::Result {
        self.number += 1;
        self.position = 0;
        writeln!(self.out, r#"    <measure number="{}">"#, self.number)
    }

    fn close_measure(&mut self) -> std::fmt::Result {
        writeln!(self.out, "    </measure>")
    }

    fn write_header(&mut self) -> std::fmt::Result {
        let ts = self.score.time_signature();
        let bpm = self.score.tempo().bpm;
        let out = &mut *self.out;
        writeln!(out, "      <attributes>")?;
        writeln!(out, "        <divisions>{TICKS_PER_QUARTER}</divisions>")?;
        writeln!(out, "        <time>")?;
        writeln!(out, "          <beats>{}</beats>", ts.beats)?;
        writeln!(out, "          <beat-type>{}</beat-type>", ts.beat_type)?;
        writeln!(out, "        </time>")?;
        writeln!(out, "        <clef>")?;
        writeln!(out, "          <sign>G</sign>")?;
        writeln!(out, "          <line>2</line>")?;
        writeln!(out, "        </clef>")?;
        writeln!(out, "      </attributes>")?;
        writeln!(out, r#"      <direction placement="above">"#)?;
        writeln!(out, "        <direction-type>")?;
        writeln!(out, "          <metronome>")?;
        writeln!(out, "            <beat-unit>quarter</beat-unit>")?;
        writeln!(out, "            <per-minute>{bpm}</per-minute>")?;
        writeln!(out, "          </metronome>")?;
        writeln!(out, "        </direction-type>")?;
        writeln!(out, r#"        <sound tempo="{bpm}"/>"#)?;
        writeln!(out, "      </direction>")
    }

    fn write_event(&mut self, event: &ScoreEvent) -> std::fmt::Result {
        let mut remaining = event.duration().ticks();
        let mut first = true;

        while remaining > 0 {
            if self.position == self.measure_ticks {
                self.close_measure()?;
                self.open_measure()?;
            }
            let room = self.measure_ticks - self.position;
            let mut span = remaining.min(room);
            remaining -= span;

            while span > 0 {
                let (ticks, kind, dotted) = note_value(span);
                span -= ticks;
                let tie = Tie {
                    stop: !first,
                    start: span > 0 || remaining > 0,
                };
                match event {
                    ScoreEvent::Chord(chord) => {
                        for (i, pitch) in chord.pitches.iter().enumerate() {
                            self.write_note(Some(*pitch), i > 0, ticks, kind, dotted, tie)?;
                        }
                    }
                    ScoreEvent::Rest(_) => {
                        self.write_note(None, false, ticks, kind, dotted, Tie::NONE)?;
                    }
                }
                self.position += ticks;
                first = false;
            }
        }
        Ok(())
    }

    fn write_note(
        &mut self,
        pitch: Option<NamedPitch>,
        chord: bool,
        ticks: u32,
        kind: &str,
        dotted: bool,
        tie: Tie,
    ) -> std::fmt::Result {
        let out = &mut *self.out;
        writeln!(out, "      <note>")?;
        if chord {
            writeln!(out, "        <chord/>")?;
        }
        match pitch {
            Some(p) => {
                writeln!(out, "        <pitch>")?;
                writeln!(out, "          <step>{}</step>", p.class.step().letter())?;
                if p.class.alter() != 0 {
                    writeln!(out, "          <alter>{}</alter>", p.class.alter())?;
                }
                writeln!(out, "          <octave>{}</octave>", p.octave)?;
                writeln!(out, "        </pitch>")?;
            }
            None => writeln!(out, "        <rest/>")?,
        }
        writeln!(out, "        <duration>{ticks}</duration>")?;
        if tie.stop {
            writeln!(out, r#"        <tie type="stop"/>"#)?;
        }
        if tie.start {
            writeln!(out, r#"        <tie type="start"/>"#)?;
        }
        writeln!(out, "        <voice>1</voice>")?;
        writeln!(out, "        <type>{kind}</type>")?;
        if dotted {
            writeln!(out, "        <dot/>")?;
        }
        if tie.stop || tie.start {
            writeln!(out, "        <notations>")?;
            if tie.stop {
                writeln!(out, r#"          <tied type="stop"/>"#)?;
            }
            if tie.start {
                writeln!(out, r#"          <tied type="start"/>"#)?;
            }
            writeln!(out, "        </notations>")?;
        }
        writeln!(out, "      </note>")
    }

    fn finish(&mut self) -> std::fmt::Result {
        if self.score.events().is_empty() {
            let out = &mut *self.out;
            writeln!(out, "      <note>")?;
            writeln!(out, r#"        <rest measure="yes"/>"#)?;
            writeln!(out, "        <duration>{}</duration>", self.measure_ticks)?;
            writeln!(out, "        <voice>1</voice>")?;
            writeln!(out, "      </note>")?;
        }
        self.close_measure()
    }
}

#[derive(Debug, Clone, Copy)]
struct Tie {
    stop: bool,
    start: bool,
}

impl Tie {
    const NONE: Tie = Tie { stop: false, start: false };
}

/// Longest expressible note value that fits in `ticks` (which must be > 0).
fn note_value(ticks: u32) -> (u32, &'static str, bool) {
    NOTE_VALUES
        .iter()
        .copied()
        .find(|(len, _, _)| *len <= ticks)
        .unwrap_or(NOTE_VALUES[NOTE_VALUES.len() - 1])
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
