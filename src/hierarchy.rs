use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::models::{Level, RawRecord, Scope};

pub const UNKNOWN_REGION: &str = "Unknown Region";
pub const UNKNOWN_DISTRICT: &str = "Unknown District";
pub const UNKNOWN_SUB_COUNTY: &str = "Unknown Sub-County";

const DISTRICT_REGIONS: &[(&str, &str)] = &[
    ("Agago", "Northern"),
    ("Amuru", "Northern"),
    ("Apac", "Northern"),
    ("Gulu", "Northern"),
    ("Kitgum", "Northern"),
    ("Kole", "Northern"),
    ("Lamwo", "Northern"),
    ("Lira", "Northern"),
    ("Nwoya", "Northern"),
    ("Omoro", "Northern"),
    ("Oyam", "Northern"),
    ("Pader", "Northern"),
    ("Arua", "West Nile"),
    ("Koboko", "West Nile"),
    ("Nebbi", "West Nile"),
    ("Yumbe", "West Nile"),
    ("Iganga", "Eastern"),
    ("Jinja", "Eastern"),
    ("Mbale", "Eastern"),
    ("Soroti", "Eastern"),
    ("Tororo", "Eastern"),
    ("Kampala", "Central"),
    ("Masaka", "Central"),
    ("Mpigi", "Central"),
    ("Mukono", "Central"),
    ("Wakiso", "Central"),
    ("Hoima", "Western"),
    ("Kabale", "Western"),
    ("Kabarole", "Western"),
    ("Kasese", "Western"),
    ("Mbarara", "Western"),
];

/// Where a school sits in the administrative hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestry {
    pub country: String,
    pub region: String,
    pub district: String,
    pub sub_county: String,
    pub school_id: String,
    pub school_name: String,
}

impl Ancestry {
    /// Name of the unit this school belongs to at `level`.
    pub fn name_at(&self, level: Level) -> &str {
        match level {
            Level::Country => &self.country,
            Level::Region => &self.region,
            Level::District => &self.district,
            Level::SubCounty => &self.sub_county,
            Level::School => &self.school_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HierarchyResolver {
    country: String,
    /// lowercase district → (canonical district, region)
    districts: HashMap<String, (String, String)>,
}

impl HierarchyResolver {
    pub fn new(config: &EngineConfig) -> Self {
        let mut districts: HashMap<String, (String, String)> = DISTRICT_REGIONS
            .iter()
            .map(|(district, region)| {
                (
                    district.to_lowercase(),
                    (district.to_string(), region.to_string()),
                )
            })
            .collect();
        for (district, region) in &config.district_regions {
            let district = district.trim();
            if district.is_empty() {
                continue;
            }
            districts.insert(
                district.to_lowercase(),
                (district.to_string(), region.trim().to_string()),
            );
        }

        Self {
            country: config.country_name.clone(),
            districts,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn is_known_district(&self, district: &str) -> bool {
        self.districts.contains_key(&district.trim().to_lowercase())
    }

    pub fn region_for(&self, district: &str) -> &str {
        self.districts
            .get(&district.trim().to_lowercase())
            .map_or(UNKNOWN_REGION, |(_, region)| region.as_str())
    }

    /// Canonical spelling of a district, or the unknown bucket for blanks.
    pub fn district_name(&self, district: &str) -> String {
        let trimmed = district.trim();
        if trimmed.is_empty() {
            return UNKNOWN_DISTRICT.to_string();
        }
        self.districts
            .get(&trimmed.to_lowercase())
            .map_or_else(|| trimmed.to_string(), |(canonical, _)| canonical.clone())
    }

    pub fn resolve(&self, district: &str, sub_county: Option<&str>) -> (String, String, String) {
        let district_name = self.district_name(district);
        let region = self.region_for(district).to_string();
        let sub_county = sub_county
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| UNKNOWN_SUB_COUNTY.to_string(), str::to_string);
        (region, district_name, sub_county)
    }

    pub fn ancestry(&self, record: &RawRecord) -> Ancestry {
        let (region, district, sub_county) = self.resolve(&record.district, record.sub_county());
        Ancestry {
            country: self.country.clone(),
            region,
            district,
            sub_county,
            school_id: record.school_id.trim().to_string(),
            school_name: record.school_name().to_string(),
        }
    }

    pub fn scope_contains(&self, scope: &Scope, record: &RawRecord) -> bool {
        if scope.level == Level::Country {
            return scope.name.is_empty() || scope.name.eq_ignore_ascii_case(&self.country);
        }
        let ancestry = self.ancestry(record);
        if scope.level == Level::School {
            return ancestry.school_id.eq_ignore_ascii_case(&scope.name)
                || ancestry.school_name.eq_ignore_ascii_case(&scope.name);
        }
        ancestry.name_at(scope.level).eq_ignore_ascii_case(&scope.name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::{ActivityModule, PayloadValue};

    fn record(district: &str, sub_county: Option<&str>) -> RawRecord {
        let mut payload = crate::models::Payload::new();
        if let Some(name) = sub_county {
            payload.insert("sub_county".into(), PayloadValue::Text(name.into()));
        }
        RawRecord {
            id: Uuid::new_v4(),
            module: ActivityModule::Visit,
            school_id: "SCH-1".into(),
            district: district.into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: "completed".into(),
            payload,
        }
    }

    #[test]
    fn known_districts_resolve_case_insensitively() {
        let resolver = HierarchyResolver::new(&EngineConfig::default());
        assert_eq!(resolver.region_for(" gulu "), "Northern");
        assert_eq!(resolver.district_name("GULU"), "Gulu");
    }

    #[test]
    fn gaps_fall_into_unknown_buckets() {
        let resolver = HierarchyResolver::new(&EngineConfig::default());
        let ancestry = resolver.ancestry(&record("Atlantis", None));
        assert_eq!(ancestry.region, UNKNOWN_REGION);
        assert_eq!(ancestry.district, "Atlantis");
        assert_eq!(ancestry.sub_county, UNKNOWN_SUB_COUNTY);

        let blank = resolver.ancestry(&record("  ", Some(" ")));
        assert_eq!(blank.district, UNKNOWN_DISTRICT);
        assert_eq!(blank.sub_county, UNKNOWN_SUB_COUNTY);
    }

    #[test]
    fn config_overrides_extend_the_table() {
        let mut config = EngineConfig::default();
        config
            .district_regions
            .insert("Atlantis".into(), "Lost Region".into());
        let resolver = HierarchyResolver::new(&config);
        assert_eq!(resolver.region_for("atlantis"), "Lost Region");
    }

    #[test]
    fn scope_membership_follows_ancestry() {
        let resolver = HierarchyResolver::new(&EngineConfig::default());
        let rec = record("Gulu", Some("Bardege"));
        assert!(resolver.scope_contains(&Scope::new(Level::Region, "northern"), &rec));
        assert!(resolver.scope_contains(&Scope::new(Level::District, "Gulu"), &rec));
        assert!(resolver.scope_contains(&Scope::new(Level::SubCounty, "bardege"), &rec));
        assert!(resolver.scope_contains(&Scope::new(Level::School, "sch-1"), &rec));
        assert!(!resolver.scope_contains(&Scope::new(Level::District, "Lira"), &rec));
        assert!(resolver.scope_contains(&Scope::country(), &rec));
    }
}
