// Recurring batch worker. Each pass decodes/detects/measures every pending
// log independently (parallel tasks, nothing shared but the final store
// write), then runs one serialized clustering pass over the results.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::oneshot;

use crate::config::{Config, DecoderConfig, DetectorConfig};
use crate::decoder;
use crate::detector;
use crate::metrics::{self, JumpReport};
use crate::store::{JumpRecord, RawLog, Store};

/// Processes one raw log end to end. Pure with respect to shared state; the
/// caller commits the returned record in a single store write.
pub fn process_log(raw: &RawLog, decoder_cfg: &DecoderConfig, detector_cfg: &DetectorConfig) -> JumpRecord {
    let decoded = match decoder::decode(&raw.bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("log {} from device {} malformed: {e}", raw.id, raw.device_id);
            return JumpRecord {
                verdict: metrics::Verdict::Malformed,
                report: JumpReport::malformed(),
                decoded: None,
                events: detector::DetectedEvents::default(),
                processed_at: Utc::now(),
            };
        }
    };

    let nominal = decoder_cfg.nominal_sample_rate_hz;
    if decoded.sample_rate_hz < nominal / 2.0 || decoded.sample_rate_hz > nominal * 2.0 {
        warn!(
            "log {} sample rate {:.2} Hz deviates from nominal {:.2} Hz",
            raw.id, decoded.sample_rate_hz, nominal
        );
    }

    let events = detector::detect(&decoded, detector_cfg);
    let jump_metrics = metrics::compute(&events);
    let report = JumpReport::from_metrics(&decoded, &jump_metrics);
    JumpRecord {
        verdict: jump_metrics.verdict,
        report,
        decoded: Some(decoded),
        events,
        processed_at: Utc::now(),
    }
}

/// One processing pass: all pending logs in parallel, then clustering.
pub async fn run_pass(store: &Arc<Store>, config: &Config) {
    let pending = store.pending_logs();
    if pending.is_empty() {
        return;
    }
    info!("processing {} pending log(s)", pending.len());

    let mut handles = Vec::with_capacity(pending.len());
    for raw in pending {
        let decoder_cfg = config.decoder.clone();
        let detector_cfg = config.detector;
        handles.push(tokio::task::spawn_blocking(move || {
            let record = process_log(&raw, &decoder_cfg, &detector_cfg);
            (raw.id, record)
        }));
    }
    for handle in handles {
        match handle.await {
            Ok((log_id, record)) => store.commit_jump(log_id, record),
            // The log stays pending and is retried next cycle.
            Err(e) => error!("processing task failed: {e}"),
        }
    }

    let formed = store.cluster_pass(&config.formation);
    for id in formed {
        info!("formed formation {id}");
    }
}

/// Runs passes on the configured interval until the stop signal fires.
pub async fn run(store: Arc<Store>, config: Config, mut stop_rx: oneshot::Receiver<()>) {
    let interval = match config.pipeline.poll_interval() {
        Ok(interval) => interval,
        Err(e) => {
            error!("invalid poll interval, falling back to 30s: {e}");
            Duration::from_secs(30)
        }
    };
    loop {
        run_pass(&store, &config).await;
        let stopped = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            _ = &mut stop_rx => true,
        };
        if stopped {
            info!("pipeline stopped");
            return;
        }
    }
}
