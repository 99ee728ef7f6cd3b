// End-to-end batch processing over synthetic TLOG buffers: a two-way
// formation, a straggler outside the window, a baro-only log, a malformed
// upload, and a flat ground recording.

use jumptrace::config::Config;
use jumptrace::metrics::Verdict;
use jumptrace::pipeline;
use jumptrace::store::Store;
use std::sync::Arc;

const T0_UNIX: u64 = 1_750_000_000;
const RATE_MS: u16 = 250;

struct LogBuilder {
    bytes: Vec<u8>,
    gps: bool,
    offset_ms: u32,
    alt_m: f64,
    lat_deg: f64,
    lon_deg: f64,
}

impl LogBuilder {
    fn new(start_unix: u64, gps: bool) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"TLOG");
        bytes.push(1);
        bytes.push(if gps { 1 } else { 0 });
        bytes.extend_from_slice(&RATE_MS.to_le_bytes());
        bytes.extend_from_slice(&start_unix.to_le_bytes());
        LogBuilder {
            bytes,
            gps,
            offset_ms: 0,
            alt_m: 4300.0,
            lat_deg: 52.3,
            lon_deg: 13.1,
        }
    }

    /// Appends `duration_sec` of samples descending at `descent_ms` while
    /// moving west over the ground at `ground_ms`.
    fn leg(&mut self, duration_sec: f64, descent_ms: f64, ground_ms: f64) -> &mut Self {
        let step_sec = f64::from(RATE_MS) / 1000.0;
        let steps = (duration_sec / step_sec).round() as u32;
        for _ in 0..steps {
            self.push_frame(ground_ms);
            self.offset_ms += u32::from(RATE_MS);
            self.alt_m -= descent_ms * step_sec;
            let lat_rad = self.lat_deg.to_radians();
            self.lon_deg -= ground_ms * step_sec / (111_320.0 * lat_rad.cos());
        }
        self
    }

    fn push_frame(&mut self, ground_ms: f64) {
        self.bytes.extend_from_slice(&self.offset_ms.to_le_bytes());
        self.bytes
            .extend_from_slice(&((self.alt_m * 100.0).round() as i32).to_le_bytes());
        if !self.gps {
            self.bytes.push(0);
            return;
        }
        self.bytes.push(0x03); // fix + velocity valid
        self.bytes
            .extend_from_slice(&((self.lat_deg * 1e7).round() as i32).to_le_bytes());
        self.bytes
            .extend_from_slice(&((self.lon_deg * 1e7).round() as i32).to_le_bytes());
        self.bytes
            .extend_from_slice(&((self.alt_m * 100.0).round() as i32).to_le_bytes());
        self.bytes
            .extend_from_slice(&((ground_ms * 100.0) as u16).to_le_bytes());
        self.bytes.extend_from_slice(&27_000u16.to_le_bytes()); // track 270 true
        self.bytes.extend_from_slice(&0i16.to_le_bytes());
    }

    fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// A full jump: level flight until `exit_offset_sec`, 55 s of freefall,
/// then a canopy ride.
fn jump_log(start_unix: u64, exit_offset_sec: f64, gps: bool) -> Vec<u8> {
    let mut builder = LogBuilder::new(start_unix, gps);
    builder
        .leg(exit_offset_sec, 0.0, 35.0)
        .leg(55.0, 52.0, 15.0)
        .leg(120.0, 5.0, 8.0);
    builder.build()
}

fn flat_log(start_unix: u64) -> Vec<u8> {
    let mut builder = LogBuilder::new(start_unix, false);
    builder.leg(300.0, 0.0, 0.0);
    builder.build()
}

#[tokio::test]
async fn mixed_batch_is_isolated_and_forms_one_group() {
    let config = Config::default();
    let store = Arc::new(Store::new());

    // Alice exits 30 s into her log; Bob's device started 20 s later and he
    // exits 10 s after her. Carol is on the next pass, 140 s behind.
    let alice = store.insert_log("tempo-1", "alice", true, jump_log(T0_UNIX, 30.0, true));
    let bob = store.insert_log("tempo-2", "bob", true, jump_log(T0_UNIX + 20, 20.0, false));
    let carol = store.insert_log("tempo-3", "carol", true, jump_log(T0_UNIX + 140, 30.0, true));
    let broken = store.insert_log("tempo-4", "dave", true, vec![0xff; 64]);
    let ground = store.insert_log("tempo-5", "erin", true, flat_log(T0_UNIX));

    pipeline::run_pass(&store, &config).await;

    let verdict = |id| {
        store
            .list_logs()
            .into_iter()
            .find(|l| l.id == id)
            .and_then(|l| l.verdict)
    };
    assert_eq!(verdict(alice), Some(Verdict::Valid));
    assert_eq!(verdict(bob), Some(Verdict::Valid));
    assert_eq!(verdict(carol), Some(Verdict::Valid));
    assert_eq!(verdict(broken), Some(Verdict::Malformed));
    assert_eq!(verdict(ground), Some(Verdict::NoExitDetected));

    // Alice and Bob cluster; Carol is outside the 60 s window, and the
    // malformed and flat logs never become candidates.
    let formations = store.list_formations();
    assert_eq!(formations.len(), 1);
    assert_eq!(formations[0].member_count, 2);
    assert_eq!(formations[0].base_jumper_id, "alice");

    // Re-running over the unchanged pool changes nothing.
    pipeline::run_pass(&store, &config).await;
    let formations = store.list_formations();
    assert_eq!(formations.len(), 1);
    assert_eq!(formations[0].member_count, 2);
}

#[tokio::test]
async fn formation_dataset_aligns_clocks_and_respects_privacy() {
    let config = Config::default();
    let store = Arc::new(Store::new());

    store.insert_log("tempo-1", "alice", true, jump_log(T0_UNIX, 30.0, true));
    store.insert_log("tempo-2", "bob", false, jump_log(T0_UNIX + 20, 20.0, false));
    pipeline::run_pass(&store, &config).await;

    let formations = store.list_formations();
    let formation = &formations[0];

    let dataset = store.formation_dataset(formation.id, Some("alice")).unwrap();
    assert_eq!(dataset.base_jumper_id, "alice");
    // Jump run heads west; detection jitter stays well inside a degree.
    let track = dataset.jump_run_track_deg_true.unwrap();
    assert!((track - 270.0).abs() < 1.0, "{track}");

    let alice_track = &dataset.participants[0];
    assert!(alice_track.is_base);
    assert!(alice_track.is_visible);
    let first = &alice_track.time_series[0];
    // Her log starts ~30 s before her own exit.
    assert!(first.time_offset_sec < -25.0);
    assert!(first.forward_m.is_some());

    // Bob is private: hidden from Alice, present for himself.
    let bob_view = &dataset.participants[1];
    assert!(!bob_view.is_visible);
    assert!(bob_view.time_series.is_empty());

    let own = store.formation_dataset(formation.id, Some("bob")).unwrap();
    let bob_own = &own.participants[1];
    assert!(bob_own.is_visible);
    assert!(!bob_own.time_series.is_empty());
    // Baro-only device: vertical channel only.
    assert!(bob_own.time_series[0].forward_m.is_none());
    // Bob's device clock started 20 s after Alice's; his first sample sits
    // 10 s before the group origin (Alice's exit at +30 s).
    assert!((bob_own.time_series[0].time_offset_sec + 10.0).abs() < 1.0);
}
