use imuse_midi::{
    prelude::*,
    sysex::imuse::{ImuseMessage, PartSetup},
};
use pretty_assertions::assert_eq;

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = tag.to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn single_track(events: &[u8]) -> Vec<u8> {
    let mut bytes = chunk(b"MThd", &[0x00, 0x00, 0x00, 0x01, 0x00, 0x60]);
    bytes.extend(chunk(b"MTrk", events));
    bytes
}

/// SOUN { GMD { MDhd, MThd, MTrk } }
fn sound_resource(events: &[u8]) -> Vec<u8> {
    let mut target = chunk(b"MDhd", &[0x80, 0x7F, 0xF0, 0x02, 0x00, 0x80, 0x00, 0x00]);
    target.extend(single_track(events));
    chunk(b"SOUN", &chunk(b"GMD ", &target))
}

const IMUSE_EVENTS: &[u8] = &[
    // alloc part on channel 2
    0x00, 0xF0, 0x14, 0x7D, 0x00, 0x02, //
    0x00, 0x01, 0x08, 0x00, 0x07, 0x0F, 0x0F, 0x00, //
    0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x02, 0x01, 0xF7, //
    // marker 0x12 on channel 0
    0x60, 0xF0, 0x06, 0x7D, 0x40, 0x00, 0x01, 0x02, 0xF7, //
    // a Roland message stays opaque
    0x00, 0xF0, 0x05, 0x41, 0x10, 0x42, 0x12, 0xF7, //
    0x00, 0xFF, 0x2F, 0x00,
];

#[test]
fn framed_file_round_trips() {
    let bytes = sound_resource(IMUSE_EVENTS);
    let file = MidiFile::parse(&bytes).unwrap();

    let framing = file.framing();
    assert_eq!(framing.container, Some(ChunkTag::SOUN));
    assert_eq!(framing.target, Some(Target::GeneralMidi));
    assert_eq!(
        framing.parameters,
        Some(SoundParameters {
            priority: 0x80,
            volume: 0x7F,
            pan: -16,
            transpose: 2,
            detune: 0,
            speed: 0x80,
            reserved: [0, 0],
        })
    );

    assert_eq!(file.to_bytes(WriteOptions::default()).unwrap(), bytes);
}

#[test]
fn stripping_the_framing_leaves_plain_smf() {
    let mut file = MidiFile::parse(&sound_resource(IMUSE_EVENTS)).unwrap();
    file.set_framing(Framing::default());
    assert_eq!(
        file.to_bytes(WriteOptions::default()).unwrap(),
        single_track(IMUSE_EVENTS)
    );
}

#[test]
fn imuse_sysex_is_decoded_inside_tracks() {
    let file = MidiFile::parse(&sound_resource(IMUSE_EVENTS)).unwrap();
    let sysex: Vec<&SysExMessage> = file.tracks()[0]
        .events()
        .iter()
        .filter_map(|e| match e.message() {
            Message::SysEx(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(sysex.len(), 3);

    assert_eq!(
        sysex[0].as_imuse(),
        Some(&ImuseMessage::AllocPart {
            channel: 2,
            part: PartSetup {
                flags: 1,
                priority: 0x80,
                volume: 0x7F,
                pan: -16,
                transpose: 2,
                detune: 0,
                pitch_bend_range: 2,
                program: 0x21,
            },
        })
    );
    assert_eq!(
        sysex[1].as_imuse(),
        Some(&ImuseMessage::Marker {
            channel: 0,
            marker: 0x12
        })
    );
    assert_eq!(sysex[2].manufacturer(), ManufacturerId::Standard(0x41));
    assert_eq!(sysex[2].as_imuse(), None);
}

#[test]
fn without_a_registry_everything_is_opaque() {
    let file = MidiFile::parse_with(&sound_resource(IMUSE_EVENTS), &SysexRegistry::empty()).unwrap();
    let Message::SysEx(marker) = file.tracks()[0].events()[1].message() else {
        panic!("expected a sysex message");
    };
    assert_eq!(
        marker.content(),
        &SysexContent::Opaque(vec![0x40, 0x00, 0x01, 0x02])
    );
    assert!(marker.is_terminated());
}

#[test]
fn second_generation_markers_are_wider() {
    let events: &[u8] = &[
        0x00, 0xF0, 0x07, 0x7D, 0x40, 0x01, 0x02, 0x03, 0x04, 0xF7, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let registry = SysexRegistry::with_imuse_generation(ImuseGeneration::V2);
    let file = MidiFile::parse_with(&single_track(events), &registry).unwrap();
    let Message::SysEx(marker) = file.tracks()[0].events()[0].message() else {
        panic!("expected a sysex message");
    };
    assert_eq!(
        marker.as_imuse(),
        Some(&ImuseMessage::MarkerV2 { marker: 0x1234 })
    );
    assert_eq!(
        file.to_bytes(WriteOptions::default()).unwrap(),
        single_track(events)
    );
}

#[test]
fn setup_checksum_mismatch_is_a_protocol_error() {
    // packed 01 02 03 04 sums to 10, so the checksum must be 0x76
    let events: &[u8] = &[0x00, 0xF0, 0x09, 0x7D, 0x10, 0x05, 0x01, 0x02, 0x03, 0x04, 0x75, 0xF7];
    let err = MidiFile::parse(&single_track(events)).unwrap_err();
    assert_eq!(
        err.parse_error(),
        Some(&ParseError::MalformedSysex(SysexError::Checksum {
            expected: 0x76,
            found: 0x75
        }))
    );

    let mut fixed = events.to_vec();
    fixed[10] = 0x76;
    fixed.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let file = MidiFile::parse(&single_track(&fixed)).unwrap();
    let Message::SysEx(setup) = file.tracks()[0].events()[0].message() else {
        panic!("expected a sysex message");
    };
    assert_eq!(
        setup.as_imuse(),
        Some(&ImuseMessage::ActiveSetup {
            channel: 5,
            setup: Nibbles::new(vec![0x12, 0x34]),
        })
    );
}

#[test]
fn bad_nibbles_are_protocol_errors() {
    // low half of the pair carries a high nibble
    let events: &[u8] = &[0x00, 0xF0, 0x06, 0x7D, 0x40, 0x00, 0x01, 0x12, 0xF7];
    let err = MidiFile::parse(&single_track(events)).unwrap_err();
    assert_eq!(
        err.parse_error(),
        Some(&ParseError::MalformedSysex(SysexError::NibbleLow {
            index: 1,
            byte: 0x12
        }))
    );
}

#[test]
fn framing_lengths_must_span_the_stream() {
    let mut bytes = sound_resource(IMUSE_EVENTS);
    bytes.push(0x00);
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert!(matches!(
        err.parse_error(),
        Some(ParseError::Container(ContainerError::LengthMismatch { .. }))
    ));
    assert_eq!(err.position(), 0);

    let mut bytes = chunk(b"XYZW", &[]);
    bytes.extend(single_track(IMUSE_EVENTS));
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(
        err.parse_error(),
        Some(&ParseError::Container(ContainerError::UnknownTag(
            ChunkTag::new(*b"XYZW")
        )))
    );
}

#[test]
fn wide_nibble_pairs_survive_a_rewrite() {
    // active setup on channel 3; the high byte 0x31 carries bit 5
    // packed 31 02 03 04 sums to 0x3A, so the checksum is 0x46
    let bytes = single_track(&[
        0x00, 0xF0, 0x09, 0x7D, 0x10, 0x03, 0x31, 0x02, 0x03, 0x04, 0x46, 0xF7, //
        0x00, 0xFF, 0x2F, 0x00,
    ]);
    let file = MidiFile::parse(&bytes).unwrap();
    let Message::SysEx(sysex) = file.tracks()[0].events()[0].message() else {
        panic!("expected a sysex message");
    };
    assert_eq!(
        sysex.as_imuse(),
        Some(&ImuseMessage::ActiveSetup {
            channel: 3,
            setup: Nibbles::new(vec![0x12, 0x34]),
        })
    );
    assert_eq!(file.to_bytes(WriteOptions::default()).unwrap(), bytes);
}
