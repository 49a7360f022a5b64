use crossbeam_channel::{Sender, unbounded};
use imuse_midi::prelude::*;
use pretty_assertions::assert_eq;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = tag.to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// Forwards each message with its arrival time
struct TimedSink {
    started: Instant,
    out: Sender<(u64, Duration, Message)>,
}

impl MidiSink for TimedSink {
    fn send(&mut self, ticks: u64, message: &Message) -> Result<(), SinkError> {
        self.out
            .send((ticks, self.started.elapsed(), message.clone()))
            .map_err(|_| SinkError::Closed)
    }
}

#[test]
fn two_tracks_play_in_time_order() {
    init_logging();

    // 96 ticks per quarter; the conductor sets 40 ms per quarter at tick 0
    let mut bytes = chunk(b"MThd", &[0x00, 0x01, 0x00, 0x02, 0x00, 0x60]);
    bytes.extend(chunk(
        b"MTrk",
        &[
            0x00, 0xFF, 0x51, 0x03, 0x00, 0x9C, 0x40, //
            0x81, 0x40, 0xFF, 0x2F, 0x00, // tick 192
        ],
    ));
    bytes.extend(chunk(
        b"MTrk",
        &[
            0x00, 0x91, 0x40, 0x50, // note on
            0x60, 0x40, 0x00, // note on, velocity 0, tick 96
            0x00, 0x91, 0x43, 0x50, // tick 96
            0x60, 0x81, 0x43, 0x00, // note off, tick 192
            0x00, 0xFF, 0x2F, 0x00,
        ],
    ));
    let file = MidiFile::parse(&bytes).unwrap();

    let (tx, rx) = unbounded();
    let sink = TimedSink {
        started: Instant::now(),
        out: tx,
    };
    let player = Player::new(&file, sink, PlayerConfig::default()).unwrap();
    assert_eq!(player.length(), 192);
    player.play().unwrap();
    assert!(player.wait(Duration::from_secs(5)).unwrap());
    drop(player.finish().unwrap());

    let arrivals: Vec<(u64, Duration, Message)> = rx.iter().collect();
    let ticks: Vec<u64> = arrivals.iter().map(|(t, _, _)| *t).collect();
    assert_eq!(ticks, vec![0, 0, 96, 96, 192, 192, 192]);

    // tempo first at tick 0 since the conductor is track 0
    assert_eq!(arrivals[0].2, Message::Meta(MetaMessage::Tempo(Tempo::new(40_000))));

    // every note on reaches the sink before its note off
    let offs = arrivals
        .iter()
        .position(|(_, _, m)| {
            matches!(m.as_channel_voice().map(|cv| *cv.event()), Some(VoiceEvent::NoteOff { .. }))
        })
        .unwrap();
    let last_on = arrivals
        .iter()
        .rposition(|(_, _, m)| {
            matches!(m.as_channel_voice().map(|cv| *cv.event()), Some(VoiceEvent::NoteOn { .. }))
        })
        .unwrap();
    assert!(last_on < offs);

    // 192 ticks at 40 ms a quarter is 80 ms; the initial tempo would take a second
    let end = arrivals[6].1;
    assert!(end >= Duration::from_millis(70), "{end:?}");
    assert!(end < Duration::from_millis(600), "{end:?}");
}

#[test]
fn recording_and_rewriting_a_performance() {
    init_logging();
    let mut track = Track::new();
    track.push(0, MetaMessage::Tempo(Tempo::new(20_000))).unwrap();
    track
        .push(
            48,
            ChannelVoiceMessage::new(
                Channel::Ten,
                VoiceEvent::NoteOn {
                    key: DataByte::new_unchecked(36),
                    velocity: DataByte::new_unchecked(127),
                },
            ),
        )
        .unwrap();
    track.push(96, MetaMessage::EndOfTrack).unwrap();
    let timing = Timing::new_ticks_per_quarter_note(96);
    let mut file = MidiFile::new(Format::SingleMultiChannel, timing);
    file.push_track(track).unwrap();

    let player = Player::new(&file, RecordingSink::new(), PlayerConfig::default()).unwrap();
    player.play().unwrap();
    assert!(player.wait(Duration::from_secs(5)).unwrap());
    let recorded = player.finish().unwrap().into_file(timing).unwrap();

    assert_eq!(
        recorded.to_bytes(WriteOptions::default()).unwrap(),
        file.to_bytes(WriteOptions::default()).unwrap()
    );
}

#[test]
fn scheduler_tempo_changes_keep_ticks_continuous() {
    let source = Arc::new(ManualTimeSource::new());
    let scheduler: Scheduler<()> = Scheduler::with_time_source(
        SchedulerConfig {
            ticks_per_quarter_note: 480,
            tempo: 500_000,
        },
        source.clone(),
        |_, _, _| {},
    )
    .unwrap();

    scheduler.start().unwrap();
    let mut last = 0;
    for (step, tempo) in [(250, 400_000), (100, 1_000_000), (333, 125_000), (10, 500_000)] {
        source.advance(Duration::from_millis(step));
        let before = scheduler.time_in_ticks();
        assert!(before >= last);
        scheduler.set_tempo(tempo).unwrap();
        assert_eq!(scheduler.time_in_ticks(), before, "tempo {tempo}");
        last = before;
    }
    scheduler.stop().unwrap();
}

#[test]
fn clock_counts_ticks_from_pulses() {
    let mut clock = Clock::new(ClockConfig::default()).unwrap();
    let (tx, rx) = unbounded();
    clock.on_tick(move |ticks| {
        let _ = tx.send(ticks);
    });
    clock.start().unwrap();
    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(first > 0);
    clock.stop().unwrap();
    assert!(!clock.is_running());
    assert!(clock.ticks() >= first);
}
