use crate::prelude::EnergyDeposit;

/// Axis-aligned box around a set of deposits, in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// `None` for an empty slice.
    pub fn enclosing(deposits: &[EnergyDeposit]) -> Option<Self> {
        let first = deposits.first()?.position();
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for deposit in &deposits[1..] {
            let p = deposit.position();
            for axis in 0..3 {
                bbox.min[axis] = bbox.min[axis].min(p[axis]);
                bbox.max[axis] = bbox.max[axis].max(p[axis]);
            }
        }
        Some(bbox)
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn volume(&self) -> f64 {
        self.extent(0) * self.extent(1) * self.extent(2)
    }
}

/// Plane the electrons drift onto, given by a point and a normal.
#[derive(Debug, Clone, Copy)]
pub struct AnodePlane {
    point: [f64; 3],
    normal: [f64; 3],
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

impl AnodePlane {
    /// Plane at `x = anode_distance` with a fixed drift-axis normal.
    pub fn at_distance(anode_distance: f64) -> Self {
        Self {
            point: [anode_distance, 1.0, 1.0],
            normal: [5.0, 0.0, 0.0],
        }
    }

    /// Project `location` onto the plane along the normal.
    pub fn intercept(&self, location: [f64; 3]) -> [f64; 3] {
        let offset = [
            self.point[0] - location[0],
            self.point[1] - location[1],
            self.point[2] - location[2],
        ];
        let scale = dot(offset, self.normal) / dot(self.normal, self.normal);
        [
            location[0] + scale * self.normal[0],
            location[1] + scale * self.normal[1],
            location[2] + scale * self.normal[2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_covers_all_deposits() {
        let deposits = vec![
            EnergyDeposit::primary(1.0, -2.0, 3.0, 1.0),
            EnergyDeposit::primary(4.0, 5.0, -6.0, 1.0),
        ];
        let bbox = BoundingBox::enclosing(&deposits).unwrap();
        assert_eq!(bbox.min, [1.0, -2.0, -6.0]);
        assert_eq!(bbox.max, [4.0, 5.0, 3.0]);
        assert_eq!(bbox.volume(), 3.0 * 7.0 * 9.0);
        assert!(BoundingBox::enclosing(&[]).is_none());
    }

    #[test]
    fn intercept_keeps_transverse_coordinates() {
        let plane = AnodePlane::at_distance(100.0);
        let hit = plane.intercept([12.0, -3.5, 8.0]);
        assert!((hit[0] - 100.0).abs() < 1e-12);
        assert_eq!(hit[1], -3.5);
        assert_eq!(hit[2], 8.0);
    }
}
