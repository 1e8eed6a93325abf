use std::collections::BTreeSet;
use std::fmt;

/// Index of a texture image unit (`GL_TEXTURE0 + index`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureUnit(u32);

impl TextureUnit {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Value a `sampler2D` uniform takes to read from this unit.
    #[inline]
    pub fn sampler(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for TextureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TEXTURE{}", self.0)
    }
}

/// Every unit below the allocator's limit is in use.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnitsExhausted {
    pub limit: u32,
}

impl fmt::Display for UnitsExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all {} texture units are in use", self.limit)
    }
}

impl std::error::Error for UnitsExhausted {}

/// Hands out texture units unique among live allocations.
///
/// Released units are reused lowest first, so unit numbers stay bounded
/// across rebuilds. A replacement built while its predecessor is still alive
/// gets a disjoint set; the two sets alternate from one rebuild to the next.
#[derive(Debug, Default)]
pub struct TextureUnits {
    next: u32,
    free: BTreeSet<u32>,
    limit: Option<u32>,
}

impl TextureUnits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that refuses to go past `limit` units
    /// (`GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS`).
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn allocate(&mut self) -> Result<TextureUnit, UnitsExhausted> {
        if let Some(index) = self.free.pop_first() {
            return Ok(TextureUnit(index));
        }
        if let Some(limit) = self.limit {
            if self.next >= limit {
                return Err(UnitsExhausted { limit });
            }
        }
        let index = self.next;
        self.next += 1;
        Ok(TextureUnit(index))
    }

    /// Returns `unit` to the pool. Releasing a unit twice is a no-op.
    pub fn release(&mut self, unit: TextureUnit) {
        if unit.0 >= self.next {
            log::warn!("released {unit}, which was never allocated");
            return;
        }
        self.free.insert(unit.0);
    }

    /// Number of units currently handed out.
    pub fn in_use(&self) -> usize {
        self.next as usize - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_units_are_sequential() {
        let mut units = TextureUnits::new();
        let a = units.allocate().unwrap();
        let b = units.allocate().unwrap();
        let c = units.allocate().unwrap();
        assert_eq!([a.index(), b.index(), c.index()], [0, 1, 2]);
        assert_eq!(units.in_use(), 3);
    }

    #[test]
    fn released_units_are_reused_lowest_first() {
        let mut units = TextureUnits::new();
        let taken: Vec<_> = (0..4).map(|_| units.allocate().unwrap()).collect();
        units.release(taken[2]);
        units.release(taken[0]);

        assert_eq!(units.allocate().unwrap().index(), 0);
        assert_eq!(units.allocate().unwrap().index(), 2);
        assert_eq!(units.allocate().unwrap().index(), 4);
    }

    #[test]
    fn double_release_does_not_duplicate() {
        let mut units = TextureUnits::new();
        let a = units.allocate().unwrap();
        units.release(a);
        units.release(a);
        assert_eq!(units.in_use(), 0);
        assert_eq!(units.allocate().unwrap(), a);
        assert_eq!(units.allocate().unwrap().index(), 1);
    }

    #[test]
    fn limit_exhausts() {
        let mut units = TextureUnits::with_limit(2);
        units.allocate().unwrap();
        let b = units.allocate().unwrap();
        assert_eq!(units.allocate(), Err(UnitsExhausted { limit: 2 }));

        units.release(b);
        assert_eq!(units.allocate(), Ok(b));
    }

    #[test]
    fn never_allocated_release_is_ignored() {
        let mut units = TextureUnits::new();
        units.release(TextureUnit::new(7));
        assert_eq!(units.in_use(), 0);
        assert_eq!(units.allocate().unwrap().index(), 0);
    }

    #[test]
    fn sampler_value_matches_index() {
        assert_eq!(TextureUnit::new(5).sampler(), 5);
        assert_eq!(TextureUnit::new(3).to_string(), "TEXTURE3");
    }
}
