use crate::error::{CaseError, Result};
use crate::global_variables::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precision {
    Fp32,
    Fp16s,
    Fp16c,
}

impl Precision {
    pub fn bytes(&self) -> usize {
        match self {
            Precision::Fp32 => 4,
            Precision::Fp16s | Precision::Fp16c => 2,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "fp32" => Ok(Precision::Fp32),
            "fp16s" => Ok(Precision::Fp16s),
            "fp16c" => Ok(Precision::Fp16c),
            _ => Err(CaseError::invalid(
                "precision",
                format!("{value} is not one of fp32, fp16s, fp16c"),
            )),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VelocitySet {
    D2Q9,
    D3Q15,
    D3Q19,
    D3Q27,
}

impl VelocitySet {
    pub fn q(&self) -> usize {
        match self {
            VelocitySet::D2Q9 => 9,
            VelocitySet::D3Q15 => 15,
            VelocitySet::D3Q19 => 19,
            VelocitySet::D3Q27 => 27,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "d2q9" => Ok(VelocitySet::D2Q9),
            "d3q15" => Ok(VelocitySet::D3Q15),
            "d3q19" => Ok(VelocitySet::D3Q19),
            "d3q27" => Ok(VelocitySet::D3Q27),
            _ => Err(CaseError::invalid(
                "velocity_set",
                format!("{value} is not one of d2q9, d3q15, d3q19, d3q27"),
            )),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StorageScheme {
    pub precision: Precision,
    pub velocity_set: VelocitySet,
    /// Nx is kept a multiple of this value (workgroup size along x).
    pub alignment: usize,
}

impl StorageScheme {
    pub fn bytes_per_cell(&self) -> usize {
        self.velocity_set.q() * self.precision.bytes() + AUXILIARY_BYTES_PER_CELL
    }
}

impl Default for StorageScheme {
    fn default() -> Self {
        Self {
            precision: Precision::Fp16s,
            velocity_set: VelocitySet::D3Q19,
            alignment: 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridExtent {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridExtent {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    pub fn number_of_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let number_of_slices = self.nx * self.ny * k;
        let number_of_rows = self.nx * j;
        i + number_of_rows + number_of_slices
    }

    pub fn coordinates(&self, n: usize) -> [usize; D] {
        let plane = self.nx * self.ny;
        let k = n / plane;
        let rest = n % plane;
        [rest % self.nx, rest / self.nx, k]
    }

    pub fn size(&self) -> [Float; D] {
        [self.nx as Float, self.ny as Float, self.nz as Float]
    }

    pub fn center(&self) -> [Float; D] {
        [
            0.5 * self.nx as Float - 0.5,
            0.5 * self.ny as Float - 0.5,
            0.5 * self.nz as Float - 0.5,
        ]
    }

    /// Saturates instead of overflowing for grids no budget could hold.
    pub fn memory_bytes(&self, storage: &StorageScheme) -> u128 {
        [self.nx, self.ny, self.nz, storage.bytes_per_cell()]
            .iter()
            .fold(1u128, |product, &factor| product.saturating_mul(factor as u128))
    }

    pub fn memory_mb(&self, storage: &StorageScheme) -> Float {
        self.memory_bytes(storage) as Float / BYTES_PER_MB
    }
}

pub fn plan(
    aspect_ratio: [Float; D],
    memory_budget_mb: usize,
    storage: &StorageScheme,
) -> Result<GridExtent> {
    if aspect_ratio.iter().any(|a| !a.is_finite() || *a <= 0.0) {
        return Err(CaseError::invalid(
            "aspect_ratio",
            format!("components must be positive, got {aspect_ratio:?}"),
        ));
    }
    if memory_budget_mb == 0 {
        return Err(CaseError::invalid(
            "memory_budget_mb",
            "the budget must be positive",
        ));
    }
    if storage.alignment == 0 {
        return Err(CaseError::invalid("alignment", "must be at least 1"));
    }
    let [ax, ay, az] = aspect_ratio;
    let budget_bytes = memory_budget_mb as Float * BYTES_PER_MB;
    let bytes_per_unit_volume = storage.bytes_per_cell() as Float * ax * ay * az;
    let scaling = (budget_bytes / bytes_per_unit_volume).cbrt();
    let to_cells = |a: Float| ((scaling * a).floor() as usize).max(1);
    let alignment = storage.alignment;
    let nx = (to_cells(ax) / alignment * alignment).max(alignment);
    let extent = GridExtent::new(nx, to_cells(ay), to_cells(az));
    if extent.memory_bytes(storage) > (memory_budget_mb as u128) << 20 {
        return Err(CaseError::BudgetTooSmall {
            budget_mb: memory_budget_mb,
            nx: extent.nx,
            ny: extent.ny,
            nz: extent.nz,
            required_mb: extent.memory_mb(storage),
        });
    }
    Ok(extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bytes_per_cell_follows_storage_scheme() {
        assert_eq!(StorageScheme::default().bytes_per_cell(), 55);
        let storage = StorageScheme {
            precision: Precision::Fp32,
            velocity_set: VelocitySet::D3Q27,
            alignment: 1,
        };
        assert_eq!(storage.bytes_per_cell(), 125);
    }

    #[test]
    fn tall_box_under_one_gigabyte() {
        let storage = StorageScheme::default();
        let extent = plan([0.2, 1.0, 0.2], 1000, &storage).unwrap();
        assert_eq!(extent.nx, extent.nz);
        let ratio = extent.ny as Float / extent.nx as Float;
        assert!((ratio - 5.0).abs() < 0.05, "ratio = {ratio}");
        assert!(extent.memory_mb(&storage) <= 1000.0);
        assert!(extent.ny > 700);
    }

    #[test]
    fn alignment_rounds_nx_down() {
        let storage = StorageScheme {
            alignment: 64,
            ..StorageScheme::default()
        };
        let extent = plan([1.0, 1.0, 1.0], 100, &storage).unwrap();
        assert_eq!(extent.nx % 64, 0);
        assert!(extent.nx <= extent.ny);
    }

    #[test]
    fn non_positive_aspect_ratio_is_rejected() {
        let storage = StorageScheme::default();
        assert!(matches!(
            plan([0.0, 1.0, 1.0], 100, &storage),
            Err(CaseError::InvalidParameter { .. })
        ));
        assert!(matches!(
            plan([1.0, -1.0, 1.0], 100, &storage),
            Err(CaseError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let storage = StorageScheme::default();
        assert!(plan([1.0, 1.0, 1.0], 0, &storage).is_err());
    }

    #[test]
    fn budget_below_minimal_grid_is_fatal() {
        let storage = StorageScheme::default();
        let result = plan([1.0e9, 1.0, 1.0], 1, &storage);
        assert!(matches!(result, Err(CaseError::BudgetTooSmall { .. })));
    }

    #[test]
    fn degenerate_aspect_ratio_exceeds_any_budget() {
        let storage = StorageScheme::default();
        for aspect_ratio in [[1.0e-30, 1.0, 1.0], [1.0e-60, 1.0, 1.0], [1.0, 1.0e-45, 1.0]] {
            assert!(matches!(
                plan(aspect_ratio, 4000, &storage),
                Err(CaseError::BudgetTooSmall { .. })
            ));
        }
    }

    #[test]
    fn memory_saturates_for_huge_grids() {
        let extent = GridExtent::new(usize::MAX, usize::MAX, usize::MAX);
        assert_eq!(extent.memory_bytes(&StorageScheme::default()), u128::MAX);
    }

    #[test]
    fn coordinates_invert_index() {
        let extent = GridExtent::new(4, 3, 5);
        for n in 0..extent.number_of_cells() {
            let [i, j, k] = extent.coordinates(n);
            assert_eq!(extent.index(i, j, k), n);
        }
        assert_eq!(extent.coordinates(0), [0, 0, 0]);
        assert_eq!(extent.coordinates(4), [0, 1, 0]);
        assert_eq!(extent.coordinates(12), [0, 0, 1]);
    }

    proptest! {
        #[test]
        fn plan_never_exceeds_budget(
            ax in 0.05..5.0_f64,
            ay in 0.05..5.0_f64,
            az in 0.05..5.0_f64,
            budget in 1usize..4000,
        ) {
            let storage = StorageScheme::default();
            if let Ok(extent) = plan([ax, ay, az], budget, &storage) {
                prop_assert!(extent.memory_bytes(&storage) <= (budget as u128) << 20);
            }
        }

        #[test]
        fn larger_budget_never_shrinks_a_dimension(
            ax in 0.05..5.0_f64,
            ay in 0.05..5.0_f64,
            az in 0.05..5.0_f64,
            budget in 1usize..2000,
            extra in 0usize..2000,
        ) {
            let storage = StorageScheme::default();
            let small = plan([ax, ay, az], budget, &storage);
            let large = plan([ax, ay, az], budget + extra, &storage);
            if let (Ok(small), Ok(large)) = (small, large) {
                prop_assert!(large.nx >= small.nx);
                prop_assert!(large.ny >= small.ny);
                prop_assert!(large.nz >= small.nz);
            }
        }
    }
}
