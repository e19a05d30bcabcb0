//! Summary statistics over an index snapshot

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use crate::record::FirmwareImageRecord;
use crate::vendor::VendorFamily;

/// Image count for one vendor family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyCount {
    /// Family display name
    pub name: String,
    /// Images belonging to the family
    pub images: usize,
}

/// Summary of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Images in the index
    pub total_images: usize,
    /// Per-family counts, in family order. Each image counts toward at most
    /// one family.
    pub families: Vec<FamilyCount>,
    /// Images whose manufacturer code no family owns
    pub other_images: usize,
    /// Distinct manufacturer codes across the index
    pub manufacturer_codes: usize,
    /// Age of the cached index, if one is cached
    pub cache_age: Option<Duration>,
}

impl IndexStats {
    /// Compute statistics for `index` against `families`.
    ///
    /// Images are attributed by manufacturer code alone, to the first family
    /// in order that owns the code. URL keywords are not consulted.
    pub fn compute<'a>(
        index: &[FirmwareImageRecord],
        families: impl IntoIterator<Item = &'a VendorFamily>,
        cache_age: Option<Duration>,
    ) -> Self {
        let families: Vec<&VendorFamily> = families.into_iter().collect();
        let mut counts: Vec<FamilyCount> = families
            .iter()
            .map(|family| FamilyCount {
                name: family.name.clone(),
                images: 0,
            })
            .collect();

        let mut other_images: usize = 0;
        for record in index {
            let code = record.manufacturer_code;
            let owner = families
                .iter()
                .zip(counts.iter_mut())
                .find(|(family, _)| family.manufacturer_codes.contains(&code));
            match owner {
                Some((_, count)) => count.images = count.images.saturating_add(1),
                None => other_images = other_images.saturating_add(1),
            }
        }

        let manufacturer_codes = index
            .iter()
            .map(|record| record.manufacturer_code)
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            total_images: index.len(),
            families: counts,
            other_images,
            manufacturer_codes,
            cache_age,
        }
    }

    /// Image count for the family called `name`
    pub fn family(&self, name: &str) -> Option<usize> {
        self.families
            .iter()
            .find(|count| count.name == name)
            .map(|count| count.images)
    }
}
