use glam::{DMat3, DVec3};

/// Mass, center of mass and inertia tensor of a set of voxels
///
/// Stored as raw moments about a fixed reference point so that adding and
/// removing a voxel are exact inverses of each other:
///
/// - `mass`         = Σ m
/// - `first_moment` = Σ m·p
/// - `second_moment`= Σ m·(|p|²·I − p·pᵀ) + m/6·I
///
/// with `p` the voxel center relative to `reference`. The `m/6·I` term is a unit
/// cube's own inertia, which keeps the tensor positive-definite even for a
/// single voxel. Keeping `reference` near the ship keeps the parallel-axis
/// subtraction well conditioned at shipyard coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaData {
    reference: DVec3,
    mass: f64,
    first_moment: DVec3,
    second_moment: DMat3,
    voxel_count: usize,
}

impl InertiaData {
    pub fn new(reference: DVec3) -> Self {
        Self {
            reference,
            mass: 0.0,
            first_moment: DVec3::ZERO,
            second_moment: DMat3::ZERO,
            voxel_count: 0,
        }
    }

    /// Full recompute from voxel centers and masses
    pub fn from_voxels(reference: DVec3, voxels: impl IntoIterator<Item = (DVec3, f64)>) -> Self {
        let mut data = Self::new(reference);
        for (center, mass) in voxels {
            data.add_voxel(center, mass);
        }
        data
    }

    pub fn add_voxel(&mut self, center: DVec3, mass: f64) {
        if mass <= 0.0 {
            return;
        }
        self.accumulate(center, mass);
        self.voxel_count += 1;
    }

    pub fn remove_voxel(&mut self, center: DVec3, mass: f64) {
        if mass <= 0.0 || self.voxel_count == 0 {
            return;
        }
        self.voxel_count -= 1;
        if self.voxel_count == 0 {
            // Drop accumulated rounding residue instead of carrying it forward
            *self = Self::new(self.reference);
            return;
        }
        self.accumulate(center, -mass);
    }

    fn accumulate(&mut self, center: DVec3, mass: f64) {
        let p = center - self.reference;
        let own = DMat3::from_diagonal(DVec3::splat(mass / 6.0));
        self.mass += mass;
        self.first_moment += p * mass;
        self.second_moment += point_tensor(p) * mass + own;
    }

    pub fn reference(&self) -> DVec3 {
        self.reference
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count == 0 || self.mass <= 0.0
    }

    /// Mass-weighted mean voxel center in subspace; the reference when empty
    pub fn center_of_mass(&self) -> DVec3 {
        if self.is_empty() {
            return self.reference;
        }
        self.reference + self.first_moment / self.mass
    }

    /// Body-frame inertia tensor about the center of mass
    pub fn moment_of_inertia(&self) -> DMat3 {
        if self.is_empty() {
            return DMat3::ZERO;
        }
        let com_offset = self.first_moment / self.mass;
        self.second_moment - point_tensor(com_offset) * self.mass
    }

    /// Largest relative difference in mass, center of mass or tensor
    pub fn deviation_from(&self, other: &InertiaData) -> f64 {
        let scale = self.mass.abs().max(other.mass.abs()).max(1.0);
        let mass_dev = (self.mass - other.mass).abs() / scale;

        let length_scale = 1.0 + self.center_of_mass().abs().max_element();
        let com_dev = (self.center_of_mass() - other.center_of_mass()).abs().max_element() / length_scale;

        let a = self.moment_of_inertia();
        let b = other.moment_of_inertia();
        let tensor_scale = max_abs(&a).max(max_abs(&b)).max(1.0);
        let tensor_dev = max_abs(&(a - b)) / tensor_scale;

        mass_dev.max(com_dev).max(tensor_dev)
    }
}

/// `|p|²·I − p·pᵀ`
fn point_tensor(p: DVec3) -> DMat3 {
    let len_sq = p.length_squared();
    DMat3::from_diagonal(DVec3::splat(len_sq)) - outer(p, p)
}

fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

fn max_abs(m: &DMat3) -> f64 {
    m.to_cols_array().iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_symmetric(m: &DMat3) -> bool {
        let t = m.transpose();
        max_abs(&(*m - t)) <= 1e-9 * max_abs(m).max(1.0)
    }

    /// Sylvester's criterion
    fn is_positive_definite(m: &DMat3) -> bool {
        let a = m.to_cols_array_2d();
        let minor1 = a[0][0];
        let minor2 = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        minor1 > 0.0 && minor2 > 0.0 && m.determinant() > 0.0
    }

    #[test]
    fn test_single_voxel() {
        let mut data = InertiaData::new(DVec3::ZERO);
        data.add_voxel(DVec3::new(1.5, 2.5, 3.5), 60.0);

        assert_eq!(data.mass(), 60.0);
        assert_eq!(data.center_of_mass(), DVec3::new(1.5, 2.5, 3.5));
        let tensor = data.moment_of_inertia();
        let expected = DMat3::from_diagonal(DVec3::splat(10.0));
        assert!(max_abs(&(tensor - expected)) < 1e-9);
        assert!(is_positive_definite(&tensor));
    }

    #[test]
    fn test_two_voxels_parallel_axis() {
        let data = InertiaData::from_voxels(
            DVec3::ZERO,
            vec![(DVec3::new(-1.0, 0.0, 0.0), 1.0), (DVec3::new(1.0, 0.0, 0.0), 1.0)],
        );
        let tensor = data.moment_of_inertia();
        let own = 2.0 / 6.0;
        assert!((tensor.x_axis.x - own).abs() < 1e-12);
        assert!((tensor.y_axis.y - (2.0 + own)).abs() < 1e-12);
        assert!((tensor.z_axis.z - (2.0 + own)).abs() < 1e-12);
        assert_eq!(data.center_of_mass(), DVec3::ZERO);
    }

    #[test]
    fn test_symmetric_positive_definite_for_line_and_plane() {
        let line = InertiaData::from_voxels(
            DVec3::ZERO,
            (0..10).map(|i| (DVec3::new(i as f64 + 0.5, 0.5, 0.5), 10.0)),
        );
        let plane = InertiaData::from_voxels(
            DVec3::ZERO,
            (0..5).flat_map(|x| (0..5).map(move |z| (DVec3::new(x as f64, 0.0, z as f64), 3.0))),
        );
        for data in [line, plane] {
            let tensor = data.moment_of_inertia();
            assert!(is_symmetric(&tensor));
            assert!(is_positive_definite(&tensor));
        }
    }

    #[test]
    fn test_add_then_remove_restores_state() {
        let reference = DVec3::new(5_120_000.0, 64.0, 0.0);
        let mut data = InertiaData::from_voxels(
            reference,
            (0..20).map(|i| (reference + DVec3::new(i as f64 * 0.7, (i % 3) as f64, (i % 5) as f64), 50.0 + i as f64)),
        );
        let before = data;

        let extra = reference + DVec3::new(13.5, -4.5, 9.5);
        data.add_voxel(extra, 250.0);
        assert!(data.deviation_from(&before) > 1e-3);
        data.remove_voxel(extra, 250.0);

        assert!(data.deviation_from(&before) < 1e-9);
        assert_eq!(data.voxel_count(), before.voxel_count());
    }

    #[test]
    fn test_removing_last_voxel_empties() {
        let mut data = InertiaData::new(DVec3::ZERO);
        data.add_voxel(DVec3::ONE, 1.0);
        data.remove_voxel(DVec3::ONE, 1.0);
        assert!(data.is_empty());
        assert_eq!(data.mass(), 0.0);
        assert_eq!(data.moment_of_inertia(), DMat3::ZERO);
    }

    #[test]
    fn test_massless_voxels_ignored() {
        let mut data = InertiaData::new(DVec3::ZERO);
        data.add_voxel(DVec3::ONE, 0.0);
        assert!(data.is_empty());
        assert_eq!(data.voxel_count(), 0);
    }
}
