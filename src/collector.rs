//! Sources of candidate entries.
//!
//! A [`Collector`] reads one origin (installer registry, program directories,
//! a third-party store) and returns whatever it finds. Collectors never
//! deduplicate against each other; that is the job of
//! [`merge_results`](crate::merge::merge_results).

use crate::progress::ListProgress;
use crate::CandidateEntry;
use anyhow::Result;
use std::collections::HashSet;
use uuid::Uuid;

/// Product codes currently registered with the installer subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsiProductSet {
    products: HashSet<Uuid>,
}

impl MsiProductSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: Uuid) -> bool {
        self.products.insert(product)
    }

    pub fn contains(&self, product: &Uuid) -> bool {
        self.products.contains(product)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Uuid> for MsiProductSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().collect(),
        }
    }
}

/// Parses a product code in any of the usual GUID spellings
/// (`{...}`, hyphenated, simple).
pub fn parse_product_code(text: &str) -> Option<Uuid> {
    Uuid::parse_str(text.trim()).ok()
}

/// Enumerates the product codes known to the installer subsystem.
pub trait ProductEnumerator {
    fn enumerate(&self) -> Result<Vec<Uuid>>;
}

/// Installer subsystem for platforms that have none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProducts;

impl ProductEnumerator for NoProducts {
    fn enumerate(&self) -> Result<Vec<Uuid>> {
        Ok(Vec::new())
    }
}

/// What a collector may look at besides the system itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectContext<'a> {
    /// Present for collectors running on the calling thread only
    pub products: Option<&'a MsiProductSet>,
    /// Entries already found by more authoritative sources
    pub seed: &'a [CandidateEntry],
}

/// A producer of candidate entries from a single origin.
pub trait Collector: Send + Sync {
    fn display_name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    fn collect(
        &self,
        context: &CollectContext<'_>,
        progress: &mut dyn FnMut(&ListProgress),
    ) -> Result<Vec<CandidateEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_codes_parse_in_braced_and_plain_form() {
        let braced = parse_product_code("{0A6C4F5B-9F27-4C5E-8D3A-1B2C3D4E5F60}");
        let plain = parse_product_code(" 0a6c4f5b-9f27-4c5e-8d3a-1b2c3d4e5f60 ");

        assert!(braced.is_some());
        assert_eq!(braced, plain);
        assert_eq!(parse_product_code("not-a-guid"), None);
    }

    #[test]
    fn product_set_membership() {
        let product = Uuid::from_u128(7);
        let set: MsiProductSet = [product].into_iter().collect();

        assert!(set.contains(&product));
        assert!(!set.contains(&Uuid::from_u128(8)));
        assert_eq!(set.len(), 1);
    }
}
