//! Nearest-hole matching
//!
//! Linear scan over every surveyed hole in registry order. At tens to low
//! hundreds of holes per project this costs microseconds; no spatial index
//! is kept, and every hole is always considered.

use super::registry::HoleRegistry;
use crate::config::defaults::{EARTH_RADIUS_M, MATCH_TIE_EPSILON};
use crate::types::{Hole, HoleCoordinates, Position};

/// Great-circle distance between two WGS84 points (meters).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Horizontal distance combined with elevation difference when the hole
/// collar elevation is known.
pub fn distance_3d(position: &Position, hole: &HoleCoordinates) -> f64 {
    let horizontal = haversine_m(
        position.latitude(),
        position.longitude(),
        hole.latitude,
        hole.longitude,
    );
    match hole.elevation {
        Some(elev) => horizontal.hypot(position.elevation() - elev),
        None => horizontal,
    }
}

/// Human-readable distance: `"15.3m"` below a kilometer, `"1.20km"` above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{distance_m:.1}m")
    } else {
        format!("{:.2}km", distance_m / 1000.0)
    }
}

/// Result of one matching pass.
///
/// "Nothing nearby" is an ordinary outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome<'a> {
    /// Closest hole lies within the radius
    Matched { hole: &'a Hole, distance_m: f64 },
    /// Closest hole lies outside the radius
    OutOfRange { nearest: &'a Hole, distance_m: f64 },
    /// Registry holds no surveyed hole
    NoCandidates,
}

impl<'a> MatchOutcome<'a> {
    pub fn matched(&self) -> Option<&'a Hole> {
        match self {
            MatchOutcome::Matched { hole, .. } => Some(hole),
            _ => None,
        }
    }
}

/// A hole with its distance from the query position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedHole<'a> {
    pub hole: &'a Hole,
    pub distance_m: f64,
}

/// Finds the registry hole closest to a position within a radius.
#[derive(Debug, Clone, Copy)]
pub struct NearestHoleMatcher {
    max_distance_m: f64,
}

impl NearestHoleMatcher {
    pub fn new(max_distance_m: f64) -> Self {
        Self { max_distance_m }
    }

    pub fn max_distance_m(&self) -> f64 {
        self.max_distance_m
    }

    /// Closest surveyed hole, classified against the radius.
    ///
    /// Equidistant holes (within a relative epsilon) resolve to the one
    /// appearing first in registry order.
    pub fn find<'a>(&self, position: &Position, registry: &'a HoleRegistry) -> MatchOutcome<'a> {
        let mut best: Option<(&'a Hole, f64)> = None;

        for (hole, coords) in registry.with_coordinates() {
            let d = haversine_m(
                position.latitude(),
                position.longitude(),
                coords.latitude,
                coords.longitude,
            );
            match best {
                Some((_, best_d)) if d >= best_d * (1.0 - MATCH_TIE_EPSILON) => {}
                _ => best = Some((hole, d)),
            }
        }

        match best {
            Some((hole, distance_m)) if distance_m <= self.max_distance_m => {
                MatchOutcome::Matched { hole, distance_m }
            }
            Some((nearest, distance_m)) => MatchOutcome::OutOfRange {
                nearest,
                distance_m,
            },
            None => MatchOutcome::NoCandidates,
        }
    }

    /// Surveyed holes sorted nearest first.
    ///
    /// `max_distance_m` filters by radius and `limit` truncates; exact ties
    /// keep registry order.
    pub fn rank<'a>(
        position: &Position,
        registry: &'a HoleRegistry,
        max_distance_m: Option<f64>,
        limit: Option<usize>,
    ) -> Vec<RankedHole<'a>> {
        let mut ranked: Vec<RankedHole<'a>> = registry
            .with_coordinates()
            .map(|(hole, coords)| RankedHole {
                hole,
                distance_m: haversine_m(
                    position.latitude(),
                    position.longitude(),
                    coords.latitude,
                    coords.longitude,
                ),
            })
            .filter(|r| max_distance_m.map_or(true, |max| r.distance_m <= max))
            .collect();

        ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        ranked
    }
}

/// `match(position, registry, maxDistanceMeters) -> Optional<Hole>`
pub fn match_hole<'a>(
    position: &Position,
    registry: &'a HoleRegistry,
    max_distance_m: f64,
) -> Option<&'a Hole> {
    NearestHoleMatcher::new(max_distance_m)
        .find(position, registry)
        .matched()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pos(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon, 0.0, Utc::now()).unwrap()
    }

    fn site() -> HoleRegistry {
        HoleRegistry::from_holes([
            Hole::new("A").with_coordinates(20.995293, 107.149251, None),
            Hole::new("B").with_coordinates(20.996000, 107.150000, None),
        ])
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.19 km on the mean sphere.
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
        assert_eq!(haversine_m(21.0, 105.0, 21.0, 105.0), 0.0);
    }

    #[test]
    fn test_matches_nearest_within_radius() {
        let registry = site();
        let outcome = NearestHoleMatcher::new(10.0).find(&pos(20.995300, 107.149260), &registry);
        match outcome {
            MatchOutcome::Matched { hole, distance_m } => {
                assert_eq!(hole.local_id, "A");
                assert!(distance_m < 2.0, "got {distance_m}");
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_nearest_beyond_radius_is_not_a_match() {
        let registry = site();
        let far = pos(21.0, 107.2);
        let outcome = NearestHoleMatcher::new(10.0).find(&far, &registry);
        assert!(matches!(outcome, MatchOutcome::OutOfRange { .. }));
        assert!(match_hole(&far, &registry, 10.0).is_none());
    }

    #[test]
    fn test_unsurveyed_holes_never_match() {
        let registry = HoleRegistry::from_holes([Hole::new("NOGPS").with_remote_id(1)]);
        let outcome = NearestHoleMatcher::new(1e9).find(&pos(0.0, 0.0), &registry);
        assert_eq!(outcome, MatchOutcome::NoCandidates);
    }

    #[test]
    fn test_tie_goes_to_registry_order() {
        // Mirror-image holes, equidistant from the query point.
        let registry = HoleRegistry::from_holes([
            Hole::new("EAST").with_coordinates(21.0, 105.00001, None),
            Hole::new("WEST").with_coordinates(21.0, 104.99999, None),
        ]);
        let hole = match_hole(&pos(21.0, 105.0), &registry, 10.0).unwrap();
        assert_eq!(hole.local_id, "EAST");

        let reversed = HoleRegistry::from_holes(registry.holes().iter().rev().cloned());
        let hole = match_hole(&pos(21.0, 105.0), &reversed, 10.0).unwrap();
        assert_eq!(hole.local_id, "WEST");
    }

    #[test]
    fn test_boundary_distance_is_inclusive() {
        let registry = site();
        let q = pos(20.995300, 107.149260);
        let d = haversine_m(20.995300, 107.149260, 20.995293, 107.149251);
        assert!(match_hole(&q, &registry, d).is_some());
    }

    #[test]
    fn test_scan_is_not_truncated() {
        let mut holes: Vec<Hole> = (0..5000)
            .map(|i| Hole::new(format!("H{i}")).with_coordinates(10.0, 100.0 + f64::from(i) * 0.01, None))
            .collect();
        holes.push(Hole::new("LAST").with_coordinates(30.0, 30.0, None));
        let registry = HoleRegistry::from_holes(holes);
        assert_eq!(match_hole(&pos(30.0, 30.00001), &registry, 10.0).unwrap().local_id, "LAST");
    }

    #[test]
    fn test_rank_sorts_filters_and_limits() {
        let registry = HoleRegistry::from_holes([
            Hole::new("FAR").with_coordinates(21.01, 105.0, None),
            Hole::new("NEAR").with_coordinates(21.0001, 105.0, None),
            Hole::new("MID").with_coordinates(21.001, 105.0, None),
            Hole::new("NOGPS"),
        ]);
        let q = pos(21.0, 105.0);

        let all = NearestHoleMatcher::rank(&q, &registry, None, None);
        let ids: Vec<&str> = all.iter().map(|r| r.hole.local_id.as_str()).collect();
        assert_eq!(ids, ["NEAR", "MID", "FAR"]);

        let close = NearestHoleMatcher::rank(&q, &registry, Some(500.0), Some(1));
        assert_eq!(close.len(), 1);
        assert_eq!(close[0].hole.local_id, "NEAR");
    }

    #[test]
    fn test_distance_3d_uses_elevation_when_known() {
        let p = Position::new(21.0, 105.0, 10.0, Utc::now()).unwrap();
        let flat = HoleCoordinates::checked(21.0, 105.0, None).unwrap();
        let raised = HoleCoordinates::checked(21.0, 105.0, Some(13.0)).unwrap();
        assert_eq!(distance_3d(&p, &flat), 0.0);
        assert!((distance_3d(&p, &raised) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(15.34), "15.3m");
        assert_eq!(format_distance(1200.0), "1.20km");
    }
}
