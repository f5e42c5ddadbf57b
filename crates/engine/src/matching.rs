//! Spatial matcher and conflict detector
//!
//! Matches candidate points to registry border points by distance
//! within a tolerance. The contract is conservative: a source with more
//! than one candidate in tolerance is a conflict, reported and never
//! auto-resolved. Used by the point-import tool and by the pipeline to
//! wire staged front endpoints to border points.

use cadastre_core::{
    BorderPoint, CreateType, FeatureId, InProcessPoint, PointGeom, Provenance, RecordId,
};
use cadastre_store::Dataset;
use tracing::info;

/// One unambiguous source→target match
#[derive(Debug, Clone, PartialEq)]
pub struct PointMatch {
    /// Source point
    pub source: FeatureId,
    /// The single target within tolerance
    pub target: FeatureId,
    /// Distance between them, meters
    pub distance_m: f64,
}

/// A source with several targets in tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConflict {
    /// Source point
    pub source: FeatureId,
    /// Candidate targets ranked by distance, nearest first
    pub candidates: Vec<(FeatureId, f64)>,
}

/// Result of matching a set of sources against a set of targets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchReport {
    /// Sources with exactly one target in tolerance
    pub matched: Vec<PointMatch>,
    /// Sources with no target in tolerance
    pub unmatched: Vec<FeatureId>,
    /// Sources with several targets in tolerance
    pub conflicts: Vec<MatchConflict>,
}

impl MatchReport {
    /// Largest matched distance, rounded to 4 decimals
    ///
    /// This is the tightest tolerance that would still have produced
    /// every match; reported to help tune the configured tolerance.
    pub fn optimal_matching_distance(&self) -> Option<f64> {
        self.matched
            .iter()
            .map(|m| m.distance_m)
            .fold(None, |acc: Option<f64>, d| {
                Some(acc.map_or(d, |a| a.max(d)))
            })
            .map(|d| (d * 10_000.0).round() / 10_000.0)
    }
}

/// Match each source point against the targets within `tolerance_m`
pub fn match_points(
    sources: &[(FeatureId, PointGeom)],
    targets: &[(FeatureId, PointGeom)],
    tolerance_m: f64,
) -> MatchReport {
    let mut report = MatchReport::default();
    for (source_id, source_geom) in sources {
        let mut candidates: Vec<(FeatureId, f64)> = targets
            .iter()
            .map(|(id, geom)| (*id, source_geom.distance_m(geom)))
            .filter(|(_, d)| *d <= tolerance_m)
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        match candidates.len() {
            0 => report.unmatched.push(*source_id),
            1 => report.matched.push(PointMatch {
                source: *source_id,
                target: candidates[0].0,
                distance_m: candidates[0].1,
            }),
            _ => report.conflicts.push(MatchConflict {
                source: *source_id,
                candidates,
            }),
        }
    }
    report
}

/// What to do with matched and unmatched points during import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Only move matched registry points onto the incoming positions
    UpdateMatched,
    /// Only create registry points for unmatched incoming points
    CreateUnmatched,
    /// Both update matched and create unmatched
    UpdateAndCreate,
}

/// Result of an import run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportReport {
    /// Registry points updated in place
    pub updated: usize,
    /// Registry points created
    pub created: usize,
    /// The matching report the import acted on
    pub matching: MatchReport,
}

/// Import incoming points into the registry's active border points
///
/// Conflicting sources are reported through the matching report and
/// skipped in every mode.
pub fn import_points(
    ds: &mut Dataset,
    incoming: &[InProcessPoint],
    tolerance_m: f64,
    mode: ImportMode,
    record: RecordId,
    create_type: CreateType,
) -> ImportReport {
    let sources: Vec<(FeatureId, PointGeom)> =
        incoming.iter().map(|p| (p.id, p.geometry)).collect();
    let targets: Vec<(FeatureId, PointGeom)> = ds
        .points
        .iter()
        .filter(|(_, p)| p.is_active())
        .map(|(id, p)| (*id, p.geometry))
        .collect();
    let matching = match_points(&sources, &targets, tolerance_m);
    let mut report = ImportReport {
        matching,
        ..Default::default()
    };

    if matches!(mode, ImportMode::UpdateMatched | ImportMode::UpdateAndCreate) {
        for m in &report.matching.matched {
            let Some(src) = incoming.iter().find(|p| p.id == m.source) else {
                continue;
            };
            if ds.points.update(&m.target, |p| {
                p.geometry = src.geometry;
                if src.name.is_some() {
                    p.name = src.name.clone();
                }
                if src.class.is_some() {
                    p.class = src.class;
                }
            }) {
                report.updated += 1;
            }
        }
    }

    if matches!(mode, ImportMode::CreateUnmatched | ImportMode::UpdateAndCreate) {
        for source in &report.matching.unmatched {
            let Some(src) = incoming.iter().find(|p| p.id == *source) else {
                continue;
            };
            let point = BorderPoint {
                id: FeatureId::new(),
                geometry: src.geometry,
                name: src.name.clone(),
                class: src.class,
                provenance: Provenance::created(record, create_type),
            };
            ds.points.insert(point.id, point);
            report.created += 1;
        }
    }

    info!(
        updated = report.updated,
        created = report.created,
        conflicts = report.matching.conflicts.len(),
        "point import finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_core::{Coord, PointStatus, ProcessName};

    fn geom(x: f64, y: f64) -> PointGeom {
        PointGeom::new(Coord::from_meters(x, y))
    }

    fn staged(x: f64, y: f64, name: &str) -> InProcessPoint {
        InProcessPoint {
            id: FeatureId::new(),
            process: ProcessName::from_parts(15, 2024),
            geometry: geom(x, y),
            name: Some(name.to_string()),
            class: Some(3),
            status: PointStatus::New,
            recorded: false,
        }
    }

    fn registry_point(ds: &mut Dataset, x: f64, y: f64) -> FeatureId {
        let point = BorderPoint {
            id: FeatureId::new(),
            geometry: geom(x, y),
            name: None,
            class: None,
            provenance: Provenance::created(RecordId::new(), CreateType::Ordinary),
        };
        let id = point.id;
        ds.points.insert(id, point);
        id
    }

    #[test]
    fn test_single_candidate_matches() {
        let s = FeatureId::new();
        let t = FeatureId::new();
        let report = match_points(&[(s, geom(0.0, 0.0))], &[(t, geom(0.0, 0.03))], 0.05);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].target, t);
        assert!(report.unmatched.is_empty());
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_out_of_tolerance_is_unmatched() {
        let s = FeatureId::new();
        let report = match_points(
            &[(s, geom(0.0, 0.0))],
            &[(FeatureId::new(), geom(0.0, 1.0))],
            0.05,
        );
        assert_eq!(report.unmatched, vec![s]);
    }

    #[test]
    fn test_two_candidates_is_conflict() {
        let s = FeatureId::new();
        let near = FeatureId::new();
        let far = FeatureId::new();
        let report = match_points(
            &[(s, geom(0.0, 0.0))],
            &[(far, geom(0.0, 0.04)), (near, geom(0.0, 0.01))],
            0.05,
        );
        assert!(report.matched.is_empty());
        assert_eq!(report.conflicts.len(), 1);
        // Candidates ranked nearest first.
        assert_eq!(report.conflicts[0].candidates[0].0, near);
    }

    #[test]
    fn test_exact_tie_is_conflict() {
        let s = FeatureId::new();
        let report = match_points(
            &[(s, geom(0.0, 0.0))],
            &[
                (FeatureId::new(), geom(0.0, 0.02)),
                (FeatureId::new(), geom(0.0, -0.02)),
            ],
            0.05,
        );
        assert_eq!(report.conflicts.len(), 1);
    }

    #[test]
    fn test_optimal_matching_distance() {
        let report = match_points(
            &[
                (FeatureId::new(), geom(0.0, 0.0)),
                (FeatureId::new(), geom(10.0, 0.0)),
            ],
            &[
                (FeatureId::new(), geom(0.0, 0.012)),
                (FeatureId::new(), geom(10.0, 0.034)),
            ],
            0.05,
        );
        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.optimal_matching_distance(), Some(0.034));
    }

    #[test]
    fn test_optimal_distance_none_without_matches() {
        let report = match_points(&[], &[], 0.05);
        assert_eq!(report.optimal_matching_distance(), None);
    }

    #[test]
    fn test_import_update_matched() {
        let mut ds = Dataset::new();
        let target = registry_point(&mut ds, 0.0, 0.0);
        let incoming = vec![staged(0.0, 0.02, "P1")];
        let report = import_points(
            &mut ds,
            &incoming,
            0.05,
            ImportMode::UpdateMatched,
            RecordId::new(),
            CreateType::Ordinary,
        );
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
        let point = ds.points.get(&target).unwrap();
        assert_eq!(point.geometry, geom(0.0, 0.02));
        assert_eq!(point.name.as_deref(), Some("P1"));
    }

    #[test]
    fn test_import_create_unmatched() {
        let mut ds = Dataset::new();
        registry_point(&mut ds, 0.0, 0.0);
        let incoming = vec![staged(5.0, 5.0, "P2")];
        let record = RecordId::new();
        let report = import_points(
            &mut ds,
            &incoming,
            0.05,
            ImportMode::CreateUnmatched,
            record,
            CreateType::Ordinary,
        );
        assert_eq!(report.created, 1);
        let created = ds.points.find_one(|p| p.name.as_deref() == Some("P2")).unwrap();
        assert_eq!(created.provenance.created_by, Some(record));
    }

    #[test]
    fn test_import_skips_conflicts_in_every_mode() {
        let mut ds = Dataset::new();
        registry_point(&mut ds, 0.0, 0.01);
        registry_point(&mut ds, 0.0, -0.01);
        let incoming = vec![staged(0.0, 0.0, "P3")];
        let report = import_points(
            &mut ds,
            &incoming,
            0.05,
            ImportMode::UpdateAndCreate,
            RecordId::new(),
            CreateType::Ordinary,
        );
        assert_eq!(report.updated, 0);
        assert_eq!(report.created, 0);
        assert_eq!(report.matching.conflicts.len(), 1);
    }

    #[test]
    fn test_import_ignores_retired_targets() {
        let mut ds = Dataset::new();
        let target = registry_point(&mut ds, 0.0, 0.0);
        ds.points.update(&target, |p| {
            p.provenance.retired_by = Some(RecordId::new());
        });
        let incoming = vec![staged(0.0, 0.01, "P4")];
        let report = import_points(
            &mut ds,
            &incoming,
            0.05,
            ImportMode::UpdateMatched,
            RecordId::new(),
            CreateType::Ordinary,
        );
        assert_eq!(report.updated, 0);
        assert_eq!(report.matching.unmatched.len(), 1);
    }
}
