//! Geographic hotspot detection by coordinate rounding.
//!
//! Each geo-tagged issue is snapped to a grid cell by rounding latitude and
//! longitude to two decimal degrees (roughly 1.1 km at the equator). Cells
//! are ranked by how many issues they contain. There is no density
//! threshold and adjacent cells are never merged.
//!
//! Rounding is half away from zero on the scaled value, so an exact half
//! such as `0.125` falls in the `0.13` cell and `-0.125` in `-0.13`.

use civicsense_issue_models::{Coordinates, Issue, IssueCategory};
use civicsense_report_models::{Hotspot, HotspotLocation};

/// Grid cell key in hundredths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    lat: i64,
    lng: i64,
}

impl CellKey {
    #[allow(clippy::cast_possible_truncation)]
    fn of(location: Coordinates) -> Self {
        Self {
            lat: (location.latitude * 100.0).round() as i64,
            lng: (location.longitude * 100.0).round() as i64,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn location(self) -> HotspotLocation {
        HotspotLocation {
            lat: self.lat as f64 / 100.0,
            lng: self.lng as f64 / 100.0,
        }
    }
}

struct Cell {
    key: CellKey,
    issue_count: u64,
    categories: Vec<IssueCategory>,
}

/// Returns up to `limit` densest grid cells, densest first.
///
/// Issues without a location are ignored. Cells with equal counts keep the
/// order in which they were first seen.
#[must_use]
pub fn identify(issues: &[Issue], limit: usize) -> Vec<Hotspot> {
    let mut cells: Vec<Cell> = Vec::new();

    for issue in issues {
        let Some(location) = issue.location else {
            continue;
        };
        let key = CellKey::of(location);

        if let Some(cell) = cells.iter_mut().find(|c| c.key == key) {
            cell.issue_count += 1;
            if !cell.categories.contains(&issue.category) {
                cell.categories.push(issue.category);
            }
        } else {
            cells.push(Cell {
                key,
                issue_count: 1,
                categories: vec![issue.category],
            });
        }
    }

    cells.sort_by(|a, b| b.issue_count.cmp(&a.issue_count));

    cells
        .into_iter()
        .take(limit)
        .map(|cell| Hotspot {
            location: cell.key.location(),
            issue_count: cell.issue_count,
            categories: cell.categories,
        })
        .collect()
}
