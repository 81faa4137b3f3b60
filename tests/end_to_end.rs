//! Whole-pipeline runs and MusicXML export checks.

use roxmltree::{Document, Node, ParsingOptions};
use score_transcriber::config::Config;
use score_transcriber::pipeline::write_events_json;
use score_transcriber::{
    assemble, scale_for, to_musicxml, AudioBuffer, Duration, ExportOptions, NamedPitch,
    PitchMatrix, QuantizedChord, Score, ScoreEvent, Transcriber,
};
use std::f32::consts::PI;
use std::path::Path;

const SAMPLE_RATE: u32 = 22_050;

fn sine(freq: f32, secs: f32) -> Vec<f32> {
    sine_at(freq, secs, SAMPLE_RATE)
}

fn sine_at(freq: f32, secs: f32, rate: u32) -> Vec<f32> {
    let n = (rate as f32 * secs) as usize;
    (0..n)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / rate as f32).sin())
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn parse(xml: &str) -> Document<'_> {
    let opt = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, opt).expect("exported MusicXML must be well formed")
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children().find(|c| c.has_tag_name(tag)).and_then(|c| c.text())
}

fn tag_text<'a>(doc: &'a Document<'_>, tag: &str) -> Option<&'a str> {
    doc.descendants().find(|n| n.has_tag_name(tag)).and_then(|n| n.text())
}

/// Summed duration of the non-chord notes in each measure.
fn measure_lengths(doc: &Document<'_>) -> Vec<u32> {
    doc.descendants()
        .filter(|n| n.has_tag_name("measure"))
        .map(|m| {
            m.children()
                .filter(|n| n.has_tag_name("note"))
                .filter(|n| !n.children().any(|c| c.has_tag_name("chord")))
                .map(|n| child_text(n, "duration").unwrap().parse::<u32>().unwrap())
                .sum()
        })
        .collect()
}

fn tie_types<'a>(note: Node<'a, '_>) -> Vec<&'a str> {
    note.children()
        .filter(|c| c.has_tag_name("tie"))
        .filter_map(|c| c.attribute("type"))
        .collect()
}

fn chord(names: &[&str], ticks: u32) -> ScoreEvent {
    let pitches: Vec<NamedPitch> = names.iter().map(|n| n.parse().unwrap()).collect();
    ScoreEvent::Chord(QuantizedChord::new(pitches, Duration::from_ticks(ticks)))
}

fn transcriber(key: &str, threshold: u32) -> Transcriber {
    Transcriber::new(Config {
        key: key.to_string(),
        amplitude_threshold: threshold,
        ..Config::default()
    })
    .unwrap()
}

#[test]
fn silence_becomes_one_rest_under_any_key() {
    let audio = AudioBuffer {
        samples: vec![0.0; SAMPLE_RATE as usize * 2],
        sample_rate: SAMPLE_RATE,
    };

    for key in ["C major", "B- minor", "default", "not a key"] {
        let result = transcriber(key, 3).transcribe_samples(&audio).unwrap();
        let frames = 1 + audio.samples.len() / 512;
        let visited = frames.div_ceil(6);

        assert_eq!(result.raw_events.len(), visited);
        assert!(result.raw_events.iter().all(|e| e.is_rest()));

        let events = result.score.events();
        assert_eq!(events.len(), 1, "{key}");
        assert!(events[0].is_rest());
        assert_eq!(events[0].duration().ticks() as usize, visited);
    }
}

#[test]
fn sine_is_transcribed_as_in_key_a() {
    let audio = AudioBuffer { samples: sine(440.0, 1.5), sample_rate: SAMPLE_RATE };
    let result = transcriber("A minor", 30).transcribe_samples(&audio).unwrap();

    let chords: Vec<&QuantizedChord> =
        result.score.events().iter().filter_map(|e| e.as_chord()).collect();
    assert!(!chords.is_empty());
    assert!(chords
        .iter()
        .any(|c| c.pitches.iter().any(|p| p.to_string() == "A4")));

    let scale = scale_for("A minor");
    for c in &chords {
        for p in &c.pitches {
            assert!(scale.contains(&p.class.to_string()), "{p} not in A minor");
        }
    }

    // no two neighbouring chords share their pitch names
    for pair in result.score.events().windows(2) {
        if let (Some(a), Some(b)) = (pair[0].as_chord(), pair[1].as_chord()) {
            assert_ne!(a.pitch_names(), b.pitch_names());
        }
    }
    assert!(result.score.events().len() <= result.raw_events.len());
}

#[test]
fn wav_file_round_trip_to_musicxml() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tone.wav");
    let output = dir.path().join("tone.xml");
    write_wav(&input, &sine(440.0, 1.0));

    let transcriber = transcriber("A minor", 30);
    let result = transcriber.process(&input, &output).unwrap();
    assert!(!result.raw_events.is_empty());

    let xml = std::fs::read_to_string(&output).unwrap();
    let doc = parse(&xml);

    assert_eq!(tag_text(&doc, "divisions"), Some("4"));
    assert_eq!(tag_text(&doc, "beats"), Some("4"));
    assert_eq!(tag_text(&doc, "beat-type"), Some("4"));
    assert_eq!(tag_text(&doc, "per-minute"), Some("120"));
    assert_eq!(tag_text(&doc, "work-title"), Some("Transcription"));

    let has_a4 = doc.descendants().filter(|n| n.has_tag_name("pitch")).any(|p| {
        child_text(p, "step") == Some("A")
            && child_text(p, "alter").is_none()
            && child_text(p, "octave") == Some("4")
    });
    assert!(has_a4);

    // A minor has no accidentals
    assert!(doc.descendants().all(|n| !n.has_tag_name("alter")));

    let lengths = measure_lengths(&doc);
    let total: u32 = lengths.iter().sum();
    assert_eq!(total, result.score.total_duration().ticks());
    for len in &lengths[..lengths.len() - 1] {
        assert_eq!(*len, 16);
    }
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = transcriber("C major", 3)
        .process(dir.path().join("absent.wav"), dir.path().join("out.xml"))
        .unwrap_err();
    assert!(err.to_string().contains("absent.wav"));
}

#[test]
fn invalid_config_is_rejected() {
    let result = Transcriber::new(Config { skip_factor: 0, ..Config::default() });
    assert!(result.is_err());
}

#[test]
fn long_chord_is_tied_across_the_barline() {
    let score = assemble(vec![
        chord(&["C4", "E4"], 20),
        ScoreEvent::rest(Duration::from_ticks(3)),
    ]);
    let xml = to_musicxml(&score, &ExportOptions::default()).unwrap();
    let doc = parse(&xml);

    assert_eq!(measure_lengths(&doc), vec![16, 7]);

    let notes: Vec<Node<'_, '_>> = doc
        .descendants()
        .filter(|n| n.has_tag_name("note"))
        .collect();
    // 2 pitches x (whole + quarter) + 1 rest
    assert_eq!(notes.len(), 5);

    assert_eq!(tie_types(notes[0]), vec!["start"]);
    assert_eq!(tie_types(notes[1]), vec!["start"]);
    assert_eq!(tie_types(notes[2]), vec!["stop"]);
    assert_eq!(tie_types(notes[3]), vec!["stop"]);
    assert!(tie_types(notes[4]).is_empty());

    assert_eq!(child_text(notes[0], "type"), Some("whole"));
    assert_eq!(child_text(notes[2], "type"), Some("quarter"));
    assert!(notes[1].children().any(|c| c.has_tag_name("chord")));
    assert!(notes[4].children().any(|c| c.has_tag_name("rest")));
    assert!(notes[4].children().any(|c| c.has_tag_name("dot")));
}

#[test]
fn adjacent_rests_are_joined_on_assembly() {
    let score = assemble(vec![
        ScoreEvent::rest(Duration::TICK),
        ScoreEvent::rest(Duration::TICK),
        chord(&["G4"], 1),
        ScoreEvent::rest(Duration::TICK),
        chord(&["G4"], 1),
    ]);
    let ticks: Vec<u32> = score.events().iter().map(|e| e.duration().ticks()).collect();
    assert_eq!(ticks, vec![2, 1, 1, 1]);
    assert_eq!(score.time_signature().to_string(), "4/4");
    assert_eq!(score.tempo().bpm, 120);
}

#[test]
fn empty_score_still_has_a_measure() {
    let score: Score = assemble(Vec::new());
    let xml = to_musicxml(&score, &ExportOptions::default()).unwrap();
    let doc = parse(&xml);
    assert_eq!(doc.descendants().filter(|n| n.has_tag_name("measure")).count(), 1);
    assert_eq!(measure_lengths(&doc), vec![16]);
}

#[test]
fn spelled_accidentals_are_exported() {
    let score = assemble(vec![chord(&["B-3", "C-4", "F#4"], 4)]);
    let options = ExportOptions {
        title: "A & B".into(),
        ..Default::default()
    };
    let xml = to_musicxml(&score, &options).unwrap();
    let doc = parse(&xml);
    assert_eq!(tag_text(&doc, "work-title"), Some("A & B"));

    let pitches: Vec<(String, Option<String>, String)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("pitch"))
        .map(|p| {
            (
                child_text(p, "step").unwrap().to_string(),
                child_text(p, "alter").map(str::to_string),
                child_text(p, "octave").unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        pitches,
        vec![
            ("B".to_string(), Some("-1".to_string()), "3".to_string()),
            ("C".to_string(), Some("-1".to_string()), "4".to_string()),
            ("F".to_string(), Some("1".to_string()), "4".to_string()),
        ]
    );
}

#[test]
fn matrix_input_skips_audio_decoding() {
    let a4 = (440.0, 90.0);
    let silent = (0.0, 0.0);
    let columns: Vec<Vec<(f32, f32)>> = (0..12)
        .map(|t| if t < 6 { vec![a4, silent] } else { vec![silent, silent] })
        .collect();
    let matrix = PitchMatrix::from_columns(&columns).unwrap();

    let config = Config {
        key: "A minor".to_string(),
        skip_factor: 2,
        ..Config::default()
    };
    let result = Transcriber::new(config)
        .unwrap()
        .transcribe_matrix(&matrix, SAMPLE_RATE)
        .unwrap();

    assert_eq!(result.raw_events.len(), 6);
    let ticks: Vec<u32> = result.score.events().iter().map(|e| e.duration().ticks()).collect();
    assert_eq!(ticks, vec![3, 3]);
    assert!(result.score.events()[1].is_rest());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    write_events_json(&result.raw_events, &path).unwrap();
    let dumped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let dumped = dumped.as_array().unwrap();
    assert_eq!(dumped.len(), 6);
    assert_eq!(dumped[0]["pitches"][0], 440.0);
    assert!(dumped[5]["pitches"].as_array().unwrap().is_empty());
}

#[test]
fn pitchless_chord_is_exported_as_rest() {
    let score = assemble(vec![chord(&[], 4), ScoreEvent::rest(Duration::from_ticks(4))]);
    let xml = to_musicxml(&score, &ExportOptions::default()).unwrap();
    let doc = parse(&xml);

    assert_eq!(measure_lengths(&doc), vec![score.total_duration().ticks()]);
    let notes: Vec<Node<'_, '_>> = doc
        .descendants()
        .filter(|n| n.has_tag_name("note"))
        .collect();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].children().any(|c| c.has_tag_name("rest")));
    assert_eq!(child_text(notes[0], "type"), Some("half"));
}

#[test]
fn recording_rate_does_not_change_the_rhythm() {
    let transcriber = transcriber("A minor", 30);
    let results: Vec<_> = [22_050, 44_100]
        .into_iter()
        .map(|rate| {
            let audio = AudioBuffer { samples: sine_at(440.0, 2.0, rate), sample_rate: rate };
            transcriber.transcribe_samples(&audio).unwrap()
        })
        .collect();

    let (native, doubled) = (&results[0], &results[1]);
    assert_eq!(native.raw_events.len(), 15);
    assert_eq!(doubled.raw_events.len(), native.raw_events.len());
    assert_eq!(doubled.score.total_duration(), native.score.total_duration());
    for (a, b) in native.raw_events.iter().zip(&doubled.raw_events) {
        assert_eq!(a.time, b.time);
    }
    assert!(doubled
        .score
        .events()
        .iter()
        .filter_map(|e| e.as_chord())
        .any(|c| c.pitches.iter().any(|p| p.to_string() == "A4")));
}
