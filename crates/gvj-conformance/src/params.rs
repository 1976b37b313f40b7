#![forbid(unsafe_code)]

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SizeTriple {
    pub n: i32,
    pub lda: i32,
    pub ldb: i32,
}

impl SizeTriple {
    #[must_use]
    pub const fn new(n: i32, lda: i32, ldb: i32) -> Self {
        Self { n, lda, ldb }
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.n >= 0 && self.lda >= self.n && self.ldb >= self.n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VariantTriple {
    pub itype: char,
    pub jobz: char,
    pub uplo: char,
}

impl VariantTriple {
    #[must_use]
    pub const fn new(itype: char, jobz: char, uplo: char) -> Self {
        Self { itype, jobz, uplo }
    }
}

/// The first two rows only exist to drive the invalid-size paths.
pub const CHECKIN_SIZE_TABLE: [SizeTriple; 5] = [
    // invalid
    SizeTriple::new(-1, 1, 1),
    SizeTriple::new(20, 5, 5),
    // valid
    SizeTriple::new(20, 30, 20),
    SizeTriple::new(35, 35, 35),
    SizeTriple::new(50, 50, 60),
];

pub const DAILY_SIZE_TABLE: [SizeTriple; 3] = [
    SizeTriple::new(192, 192, 192),
    SizeTriple::new(256, 270, 256),
    SizeTriple::new(300, 300, 310),
];

pub const VARIANT_TABLE: [VariantTriple; 6] = [
    VariantTriple::new('1', 'N', 'U'),
    VariantTriple::new('2', 'N', 'L'),
    VariantTriple::new('3', 'N', 'U'),
    VariantTriple::new('1', 'V', 'L'),
    VariantTriple::new('2', 'V', 'U'),
    VariantTriple::new('3', 'V', 'L'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeTier {
    #[default]
    Checkin,
    Daily,
}

impl SizeTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "checkin_lapack",
            Self::Daily => "daily_lapack",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "checkin" | "checkin_lapack" => Some(Self::Checkin),
            "daily" | "daily_lapack" => Some(Self::Daily),
            _ => None,
        }
    }

    #[must_use]
    pub fn size_table(self) -> &'static [SizeTriple] {
        match self {
            Self::Checkin => &CHECKIN_SIZE_TABLE,
            Self::Daily => &DAILY_SIZE_TABLE,
        }
    }
}

/// Size table × variant table, size-major, in declaration order.
#[must_use]
pub fn cross_product(tier: SizeTier) -> Vec<(SizeTriple, VariantTriple)> {
    tier.size_table()
        .iter()
        .flat_map(|size| VARIANT_TABLE.iter().map(move |variant| (*size, *variant)))
        .collect()
}
