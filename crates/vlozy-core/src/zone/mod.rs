//! Named rectangular zones on a canonical document image.

pub mod store;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::batch::{ERROR_COLUMN, FILE_NAME_COLUMN, STATUS_COLUMN};
use crate::error::{GeometryError, ZoneError};

pub use store::{load_zones, load_zones_file, save_zones, save_zones_file};

/// Names taken by columns the table export writes next to the zones.
pub const RESERVED_NAMES: [&str; 3] = [FILE_NAME_COLUMN, STATUS_COLUMN, ERROR_COLUMN];

/// A named rectangle on a canonical document image.
///
/// Zones are immutable once built; every constructor validates geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    name: String,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Zone {
    /// Create a zone, rejecting blank or reserved names and zero-sized
    /// rectangles. Surrounding whitespace is trimmed from the name.
    pub fn new(
        name: impl Into<String>,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, GeometryError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(GeometryError::EmptyName);
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(GeometryError::ReservedName(name));
        }
        if width == 0 || height == 0 {
            return Err(GeometryError::ZeroSize {
                name,
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(Self {
            name,
            left,
            top,
            width,
            height,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    /// Intersect the zone with an image of the given size.
    ///
    /// Returns `(x, y, width, height)` of the visible part, or
    /// `GeometryError::OutsideImage` when nothing of the zone is visible.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> Result<(u32, u32, u32, u32), GeometryError> {
        let right = self.right().min(image_width as u64);
        let bottom = self.bottom().min(image_height as u64);

        if self.left >= image_width || self.top >= image_height {
            return Err(self.outside(image_width, image_height));
        }

        let width = (right - self.left as u64) as u32;
        let height = (bottom - self.top as u64) as u32;
        Ok((self.left, self.top, width, height))
    }

    fn outside(&self, image_width: u32, image_height: u32) -> GeometryError {
        GeometryError::OutsideImage {
            name: self.name.clone(),
            image_width,
            image_height,
        }
    }
}

/// A rectangle as reported by a drawing surface, before it has a name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawnRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawnRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Attach a name, truncating coordinates toward zero.
    pub fn into_zone(self, name: impl Into<String>) -> Result<Zone, GeometryError> {
        let name = name.into();
        let (left, top) = (self.left.trunc() as i64, self.top.trunc() as i64);
        let (width, height) = (self.width.trunc() as i64, self.height.trunc() as i64);

        if left < 0 || top < 0 {
            return Err(GeometryError::NegativeOffset { name });
        }
        if width <= 0 || height <= 0 {
            return Err(GeometryError::ZeroSize {
                name,
                width,
                height,
            });
        }

        let clamp = |v: i64| v.min(u32::MAX as i64) as u32;
        Zone::new(name, clamp(left), clamp(top), clamp(width), clamp(height))
    }
}

/// An ordered set of uniquely named zones.
///
/// Zones are matched by name; the stored order fixes output column order
/// and extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl ZoneSet {
    /// Build a set, rejecting duplicate names.
    pub fn new(zones: Vec<Zone>) -> Result<Self, ZoneError> {
        let mut seen = HashSet::with_capacity(zones.len());
        for zone in &zones {
            if !seen.insert(zone.name()) {
                return Err(ZoneError::DuplicateName(zone.name().to_string()));
            }
        }
        Ok(Self { zones })
    }

    /// Pair drawn rectangles with names by position.
    ///
    /// The i-th rectangle receives the i-th name. The counts must be equal
    /// before any pairing is attempted.
    pub fn from_drawn<S: AsRef<str>>(rects: &[DrawnRect], names: &[S]) -> Result<Self, ZoneError> {
        if rects.len() != names.len() {
            return Err(ZoneError::CountMismatch {
                rects: rects.len(),
                names: names.len(),
            });
        }

        let zones = rects
            .iter()
            .zip(names)
            .map(|(rect, name)| rect.into_zone(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(zones)
    }

    /// Fail if any zone lies entirely outside an image of the given size.
    pub fn check_bounds(&self, image_width: u32, image_height: u32) -> Result<(), GeometryError> {
        for zone in &self.zones {
            zone.clip_to(image_width, image_height)?;
        }
        Ok(())
    }

    /// Zone names in stored order.
    pub fn names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn as_slice(&self) -> &[Zone] {
        &self.zones
    }
}

impl<'a> IntoIterator for &'a ZoneSet {
    type Item = &'a Zone;
    type IntoIter = std::slice::Iter<'a, Zone>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_width_rejected() {
        let err = Zone::new("invoice_no", 10, 10, 0, 30).unwrap_err();
        assert!(matches!(err, GeometryError::ZeroSize { width: 0, .. }));
    }

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(Zone::new("  ", 0, 0, 5, 5).unwrap_err(), GeometryError::EmptyName);
    }

    #[test]
    fn test_reserved_names_rejected() {
        for name in ["file_name", "status", "error"] {
            assert_eq!(
                Zone::new(name, 0, 0, 5, 5).unwrap_err(),
                GeometryError::ReservedName(name.to_string())
            );
        }
        assert!(Zone::new(" file_name ", 0, 0, 5, 5).is_err());
        assert!(Zone::new("file_name_2", 0, 0, 5, 5).is_ok());
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(Zone::new("  total ", 0, 0, 5, 5).unwrap().name(), "total");
    }

    #[test]
    fn test_from_drawn_rejects_reserved_name() {
        let rects = [DrawnRect::new(0.0, 0.0, 10.0, 10.0)];
        assert_eq!(
            ZoneSet::from_drawn(&rects, &["status"]).unwrap_err(),
            ZoneError::Geometry(GeometryError::ReservedName("status".to_string()))
        );
    }

    #[test]
    fn test_clip_partial_overlap() {
        let zone = Zone::new("total", 90, 40, 50, 30).unwrap();
        assert_eq!(zone.clip_to(100, 50).unwrap(), (90, 40, 10, 10));
    }

    #[test]
    fn test_clip_outside() {
        let zone = Zone::new("total", 100, 0, 10, 10).unwrap();
        assert!(matches!(
            zone.clip_to(100, 50),
            Err(GeometryError::OutsideImage { .. })
        ));
    }

    #[test]
    fn test_from_drawn_pairs_by_position() {
        let rects = [
            DrawnRect::new(10.7, 12.2, 100.9, 30.0),
            DrawnRect::new(0.0, 200.0, 50.0, 20.0),
        ];
        let set = ZoneSet::from_drawn(&rects, &["invoice_no", "total"]).unwrap();

        assert_eq!(set.names(), vec!["invoice_no", "total"]);
        assert_eq!(
            set.get("invoice_no").unwrap(),
            &Zone::new("invoice_no", 10, 12, 100, 30).unwrap()
        );
        assert_eq!(set.get("total").unwrap().top(), 200);
    }

    #[test]
    fn test_from_drawn_count_mismatch() {
        let rects = [DrawnRect::new(0.0, 0.0, 10.0, 10.0)];
        let err = ZoneSet::from_drawn(&rects, &["a", "b"]).unwrap_err();
        assert_eq!(err, ZoneError::CountMismatch { rects: 1, names: 2 });
    }

    #[test]
    fn test_from_drawn_negative_and_degenerate() {
        let rects = [DrawnRect::new(-1.0, 0.0, 10.0, 10.0)];
        assert!(matches!(
            ZoneSet::from_drawn(&rects, &["a"]),
            Err(ZoneError::Geometry(GeometryError::NegativeOffset { .. }))
        ));

        let rects = [DrawnRect::new(5.0, 5.0, 0.4, 10.0)];
        assert!(matches!(
            ZoneSet::from_drawn(&rects, &["a"]),
            Err(ZoneError::Geometry(GeometryError::ZeroSize { .. }))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let zones = vec![
            Zone::new("a", 0, 0, 1, 1).unwrap(),
            Zone::new("a", 5, 5, 1, 1).unwrap(),
        ];
        assert_eq!(ZoneSet::new(zones).unwrap_err(), ZoneError::DuplicateName("a".to_string()));
    }

    #[test]
    fn test_check_bounds() {
        let set = ZoneSet::new(vec![
            Zone::new("inside", 0, 0, 10, 10).unwrap(),
            Zone::new("outside", 500, 0, 10, 10).unwrap(),
        ])
        .unwrap();
        assert!(set.check_bounds(1000, 100).is_ok());
        assert!(set.check_bounds(200, 100).is_err());
    }
}
