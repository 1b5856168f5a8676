#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use odb_rust::db::repository::ObservationDefinition;
use odb_rust::db::LocalRepository;
use odb_rust::execution::recorder::Caller;
use odb_rust::itc::FixedItcClient;
use odb_rust::models::{
    ConstraintSet, GmosCcdMode, GmosNorthFpu, GmosNorthGrating, GmosNorthLongSlit, GmosRoi,
    Observation, ObservingMode, PosAngleConstraint, ProgramId, ScienceBand, ScienceRequirements,
    Timestamp, Wavelength,
};
use odb_rust::sequence::TableSmartGcalOracle;
use odb_rust::services::DigestService;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// A complete GMOS-North long-slit observation definition, ready to
/// generate: R831 grating at 500 nm through the 0.50″ slit.
pub fn gmos_north_definition() -> ObservationDefinition {
    ObservationDefinition {
        program_id: ProgramId::new(1),
        title: "NGC 3372 long slit".to_string(),
        constraint_set: ConstraintSet::default(),
        pos_angle_constraint: PosAngleConstraint::default(),
        base_coordinates: None,
        observing_mode: Some(ObservingMode::GmosNorthLongSlit(GmosNorthLongSlit {
            grating: GmosNorthGrating::R831G5302,
            filter: None,
            fpu: GmosNorthFpu::LongSlit050,
            central_wavelength: Wavelength::from_nanometers(500.0).unwrap(),
            explicit_offsets: None,
            explicit_wavelength_dithers: None,
            ccd_mode: GmosCcdMode::default(),
            roi: GmosRoi::CentralSpectrum,
        })),
        science_requirements: ScienceRequirements {
            wavelength: Wavelength::from_nanometers(500.0),
            signal_to_noise: Some(100.0),
            signal_to_noise_at: None,
        },
        science_band: Some(ScienceBand::Band1),
        user_state: None,
        calibration_role: None,
    }
}

/// Fresh repository plus a digest service wired with the fixed ITC stub
/// (six 10-second exposures) and the bundled Smart GCAL table.
pub fn test_services() -> (Arc<LocalRepository>, DigestService) {
    let repo = Arc::new(LocalRepository::new());
    let digests = DigestService::new(
        "test-commit",
        Arc::new(TableSmartGcalOracle::gmos_north_defaults()),
        Arc::new(FixedItcClient::default_spectroscopy()),
    );
    (repo, digests)
}

/// Seed the repository with the standard GMOS-North observation.
pub async fn seeded_observation(repo: &LocalRepository) -> Observation {
    use odb_rust::db::repository::ObservationRepository;
    repo.create_observation(gmos_north_definition())
        .await
        .expect("seed observation")
}

pub fn staff() -> Caller {
    Caller::staff("telops")
}

pub fn ts(seconds: i64) -> Timestamp {
    Timestamp::from_microseconds(seconds * 1_000_000).expect("timestamp in range")
}
