pub mod behavior;
pub mod device;
pub mod location;
pub mod social;
pub mod temporal;

use crate::anomaly::AnomalyDetector;
use crate::config::ScoringConfig;
use crate::events::{CheckSignal, VerificationRequest};
use crate::state::store::PlayerStore;

/// Run the five comprehensive-verification checks concurrently.
/// Every check always yields a signal; insufficient data lowers confidence.
pub async fn run_all(
    req:      &VerificationRequest,
    store:    &PlayerStore,
    detector: &AnomalyDetector,
    cfg:      &ScoringConfig,
) -> Vec<CheckSignal> {
    let (beh, loc, dev, tmp, soc) = tokio::join!(
        behavior::analyze(req, detector),
        location::analyze(req, cfg.impossible_speed_kmh),
        device::analyze(req, store),
        temporal::analyze(req),
        social::analyze(req, store),
    );

    vec![beh, loc, dev, tmp, soc]
}
