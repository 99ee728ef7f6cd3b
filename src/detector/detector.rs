// Exit/deployment detection over the barometric altitude signal.
//
// The signal of interest is the descent rate (positive = losing altitude),
// taken over a short centered window so a single bad sample cannot flip a
// crossing on its own. A three-phase scan then finds the two transitions:
// aircraft -> freefall (rate climbs past the exit threshold and stays there
// for the freefall dwell) and freefall -> canopy (rate drops below the
// canopy threshold and stays there for the canopy dwell).

use crate::config::DetectorConfig;
use crate::decoder::{DecodedLog, Sample};

use super::events::{DetectedEvents, EventKind, JumpEvent};

/// Smoothed descent rate in m/s at every sample, positive while descending.
///
/// Rate at sample `i` is the altitude drop across the window centered on
/// `i`, divided by the window's actual time span. At the edges the window
/// shrinks to whatever is in range.
pub fn descent_rates(log: &DecodedLog, window_sec: f64) -> Vec<f64> {
    let samples = &log.samples;
    let half = window_sec / 2.0;
    let mut rates = Vec::with_capacity(samples.len());
    let mut lo = 0usize;
    let mut hi = 0usize;
    for s in samples.iter() {
        while samples[lo].offset_sec < s.offset_sec - half {
            lo += 1;
        }
        while hi + 1 < samples.len() && samples[hi + 1].offset_sec <= s.offset_sec + half {
            hi += 1;
        }
        let dt = samples[hi].offset_sec - samples[lo].offset_sec;
        if dt > 0.0 {
            rates.push((samples[lo].baro_alt_m - samples[hi].baro_alt_m) / dt);
        } else {
            rates.push(0.0);
        }
    }
    rates
}

/// Detects the exit and deployment instants of a jump log.
///
/// A flat signal yields no exit; a signal that never slows back down after
/// the exit (ground recording left running, cutaway) yields no deployment.
pub fn detect(log: &DecodedLog, config: &DetectorConfig) -> DetectedEvents {
    let mut events = DetectedEvents::default();
    if log.samples.len() < 2 {
        return events;
    }
    let rates = descent_rates(log, config.smoothing_window_sec);

    let exit_idx = match first_sustained(
        &log.samples,
        &rates,
        0,
        |r| r >= config.exit_rate_ms,
        config.freefall_dwell_sec,
    ) {
        Some(i) => i,
        None => return events,
    };
    events.exit = Some(event_at(log, exit_idx, EventKind::Exit));

    if let Some(deploy_idx) = first_sustained(
        &log.samples,
        &rates,
        exit_idx + 1,
        |r| r <= config.canopy_rate_ms,
        config.canopy_dwell_sec,
    ) {
        events.deployment = Some(event_at(log, deploy_idx, EventKind::Deployment));
    }
    events
}

fn event_at(log: &DecodedLog, idx: usize, kind: EventKind) -> JumpEvent {
    let sample = &log.samples[idx];
    JumpEvent {
        kind,
        timestamp: log.instant(sample.offset_sec),
        altitude_m: sample.baro_alt_m,
        offset_sec: sample.offset_sec,
    }
}

/// First index at or after `from` where `pred` holds on the rate and keeps
/// holding for at least `dwell_sec`. A run that `pred` breaks, or that the
/// log ends inside of, does not count.
fn first_sustained(
    samples: &[Sample],
    rates: &[f64],
    from: usize,
    pred: impl Fn(f64) -> bool,
    dwell_sec: f64,
) -> Option<usize> {
    let mut i = from;
    while i < samples.len() {
        if !pred(rates[i]) {
            i += 1;
            continue;
        }
        let mut k = i;
        loop {
            if !pred(rates[k]) {
                break;
            }
            if samples[k].offset_sec - samples[i].offset_sec >= dwell_sec {
                return Some(i);
            }
            k += 1;
            if k == samples.len() {
                // Log ended before the dwell completed.
                return None;
            }
        }
        i = k + 1;
    }
    None
}
